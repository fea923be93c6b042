//! Small text helpers shared by the interpreter and the substituters.

/// Split raw input into sentences on `.`, `?` and `!`.
///
/// Pieces are trimmed and empty pieces dropped. If nothing is left a single
/// empty sentence is returned, so callers always see at least one.
pub fn sentences(input: &str) -> Vec<String> {
    let found: Vec<String> = input
        .split(['.', '?', '!'])
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .collect();
    if found.is_empty() {
        vec![String::new()]
    } else {
        found
    }
}

/// Upper-case the first character and lower-case the rest.
pub fn capitalize(word: &str) -> String {
    let mut chars = word.chars();
    match chars.next() {
        Some(first) => first
            .to_uppercase()
            .chain(chars.flat_map(char::to_lowercase))
            .collect(),
        None => String::new(),
    }
}

/// Capitalize every whitespace-separated word and join them with single spaces.
pub fn capwords(text: &str) -> String {
    text.split_whitespace()
        .map(capitalize)
        .collect::<Vec<_>>()
        .join(" ")
}

/// Trim, then capitalize only the first word. The rest is left untouched.
pub fn capitalize_first_word(text: &str) -> String {
    let text = text.trim();
    match text.split_once(' ') {
        Some((first, rest)) => format!("{} {}", capitalize(first), rest),
        None => capitalize(text),
    }
}

/// Replace each run of whitespace with a single space.
pub fn collapse_whitespace(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    let mut in_run = false;
    for c in text.chars() {
        if c.is_whitespace() {
            if !in_run {
                out.push(' ');
            }
            in_run = true;
        } else {
            out.push(c);
            in_run = false;
        }
    }
    out
}

/// Join all lines with single spaces and trim the result.
pub fn single_line(text: &str) -> String {
    text.lines().collect::<Vec<_>>().join(" ").trim().to_string()
}
