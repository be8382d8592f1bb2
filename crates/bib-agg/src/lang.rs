//! Language name -> MARC/ISO 639-2 code lookup, used when a dialogue turn
//! names a language in prose ("books in French") rather than a code. Not
//! exhaustive — covers the languages this corpus actually sees.

use once_cell::sync::Lazy;
use std::collections::HashMap;

pub static NAME_TO_ISO: Lazy<HashMap<&'static str, &'static str>> = Lazy::new(|| {
    HashMap::from([
        ("english", "eng"),
        ("french", "fre"),
        ("german", "ger"),
        ("latin", "lat"),
        ("italian", "ita"),
        ("spanish", "spa"),
        ("greek", "grc"),
        ("dutch", "dut"),
        ("portuguese", "por"),
        ("russian", "rus"),
    ])
});

/// Case-insensitive lookup. Returns `None` for a name not in the table —
/// callers fall back to treating the input as an already-coded value.
pub fn iso_for_name(name: &str) -> Option<&'static str> {
    NAME_TO_ISO.get(name.to_lowercase().as_str()).copied()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn looks_up_case_insensitively() {
        assert_eq!(iso_for_name("French"), Some("fre"));
        assert_eq!(iso_for_name("FRENCH"), Some("fre"));
    }

    #[test]
    fn unknown_name_is_none() {
        assert_eq!(iso_for_name("klingon"), None);
    }
}
