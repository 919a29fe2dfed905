use std::error::Error;
use std::fmt;

/// InputValueError is used if some configuration option does not fulfill the posed
/// requirements, e.g., a refresh interval below the allowed minimum.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InputValueError {
    pub option: String,
    pub requirement: String,
}

impl InputValueError {
    pub fn new(option: &str, requirement: &str) -> InputValueError {
        InputValueError {
            option: option.to_owned(),
            requirement: requirement.to_owned(),
        }
    }
}

impl fmt::Display for InputValueError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "Invalid input value for {}: {}", self.option, self.requirement)
    }
}

impl Error for InputValueError {}

/// is_zero_width returns true for the invisible characters timing pages like to sprinkle into
/// their cells (zero-width space/joiners and the byte order mark).
fn is_zero_width(c: char) -> bool {
    matches!(c, '\u{200b}' | '\u{200c}' | '\u{200d}' | '\u{feff}')
}

/// clean_text normalizes a string scraped from a timing feed: zero-width characters are
/// removed, non-breaking spaces become plain spaces, the result is trimmed and inner runs of
/// whitespace are collapsed into a single space.
pub fn clean_text(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    let mut pending_space = false;

    for c in s.chars().filter(|&c| !is_zero_width(c)) {
        let c = if c == '\u{a0}' { ' ' } else { c };
        if c.is_whitespace() {
            pending_space = !out.is_empty();
            continue;
        }
        if pending_space {
            out.push(' ');
            pending_space = false;
        }
        out.push(c);
    }

    out
}

/// non_empty returns the cleaned string if anything is left after cleaning.
pub fn non_empty(s: Option<&str>) -> Option<String> {
    s.map(clean_text).filter(|s| !s.is_empty())
}
