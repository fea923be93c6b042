use sibyl_core::GLOBAL_SESSION_ID;

/// Who is asking. A request without a session id talks in the global session.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Request {
    pub session_id: Option<String>,
}

impl Request {
    pub fn new(session_id: impl Into<String>) -> Self {
        Self {
            session_id: Some(session_id.into()),
        }
    }

    pub fn global() -> Self {
        Self::default()
    }

    pub fn session_id(&self) -> &str {
        match self.session_id.as_deref() {
            Some(id) if !id.is_empty() => id,
            _ => GLOBAL_SESSION_ID,
        }
    }
}
