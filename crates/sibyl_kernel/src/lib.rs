pub mod command;
pub mod events;
pub mod gate;
mod interpreter;
pub mod kernel;
pub mod request;

pub use command::{CommandHandler, CommandRegistry};
pub use events::KernelEvent;
pub use gate::{GateGuard, RespondGate};
pub use kernel::{Kernel, Learned};
pub use request::Request;
