//! Place/publisher/agent cleaning pipeline — spec.md §4.1.
//!
//! trim -> strip trailing `:,;/` -> remove surrounding brackets -> NFKC ->
//! collapse whitespace -> casefold. If the cleaned key is in the alias map,
//! substitute and tag `*_alias_map` (0.95); else `*_casefold_strip` (0.80).

use once_cell::sync::Lazy;
use regex::Regex;
use unicode_normalization::UnicodeNormalization;

use crate::model::normalized::{confidence, TextNormMethod};
use crate::model::{NormalizedAgent, NormalizedPlace, NormalizedPublisher};

use super::alias::AliasMap;

static TRAILING_PUNCT: Lazy<Regex> = Lazy::new(|| Regex::new(r"[:,;/]+\s*$").unwrap());
static WHITESPACE: Lazy<Regex> = Lazy::new(|| Regex::new(r"\s+").unwrap());

/// Shared cleaning pipeline. Returns `(display, key)` where `display` is the
/// cleaned-but-not-casefolded form (suitable for presentation) and `key` is
/// the casefolded NFKC key used for alias lookup and equality.
fn clean(raw: &str) -> (String, String) {
    let mut s = raw.trim().to_string();

    loop {
        let stripped = TRAILING_PUNCT.replace(&s, "").trim().to_string();
        if stripped == s {
            break;
        }
        s = stripped;
    }

    // Remove one layer of surrounding brackets, e.g. "[Paris]" -> "Paris".
    if s.len() >= 2 {
        let bytes = s.as_bytes();
        let pairs: [(u8, u8); 3] = [(b'[', b']'), (b'(', b')'), (b'{', b'}')];
        for (open, close) in pairs {
            if bytes[0] == open && bytes[bytes.len() - 1] == close {
                s = s[1..s.len() - 1].trim().to_string();
                break;
            }
        }
    }

    let nfkc: String = s.nfkc().collect();
    let display = WHITESPACE.replace_all(&nfkc, " ").trim().to_string();
    let key = display.to_lowercase();
    (display, key)
}

/// Result of the shared cleaning pipeline before it's wrapped into one of
/// the three `Normalized*` types (each of which differs only in its
/// `*_alias_map` / `*_casefold_strip` method tag).
struct Cleaned {
    value: Option<String>,
    display: String,
    confidence: f64,
    alias_hit: bool,
}

fn clean_and_lookup(raw: Option<&str>, aliases: &AliasMap) -> Cleaned {
    let raw = raw.unwrap_or("");
    if raw.trim().is_empty() {
        return Cleaned {
            value: None,
            display: String::new(),
            confidence: confidence::UNPARSED_OR_MISSING,
            alias_hit: false,
        };
    }

    let (display, key) = clean(raw);

    if let Some(canonical) = aliases.get(&key) {
        return Cleaned {
            value: Some(canonical.to_string()),
            display,
            confidence: confidence::ALIAS_MAP,
            alias_hit: true,
        };
    }

    Cleaned {
        value: Some(key),
        display,
        confidence: confidence::CASEFOLD_STRIP,
        alias_hit: false,
    }
}

pub fn normalize_place(
    raw: Option<&str>,
    aliases: &AliasMap,
    evidence_paths: Vec<String>,
) -> NormalizedPlace {
    let c = clean_and_lookup(raw, aliases);
    let method = if c.value.is_none() {
        TextNormMethod::Missing
    } else if c.alias_hit {
        TextNormMethod::PlaceAliasMap
    } else {
        TextNormMethod::PlaceCasefoldStrip
    };
    NormalizedPlace {
        value: c.value,
        display: c.display,
        confidence: c.confidence,
        method,
        evidence_paths,
        warnings: Vec::new(),
    }
}

pub fn normalize_publisher(
    raw: Option<&str>,
    aliases: &AliasMap,
    evidence_paths: Vec<String>,
) -> NormalizedPublisher {
    let c = clean_and_lookup(raw, aliases);
    let method = if c.value.is_none() {
        TextNormMethod::Missing
    } else if c.alias_hit {
        TextNormMethod::PublisherAliasMap
    } else {
        TextNormMethod::PublisherCasefoldStrip
    };
    NormalizedPublisher {
        value: c.value,
        display: c.display,
        confidence: c.confidence,
        method,
        evidence_paths,
        warnings: Vec::new(),
    }
}

/// Casefold/strip key only, with no alias lookup and no confidence/method
/// tracking — used by the indexer for `subjects.subject_norm`, which the
/// Schema Contract indexes on but which carries no alias map or confidence
/// column of its own (spec.md §4.2's schema contract lists `subject_norm`
/// alongside `place_norm`/`publisher_norm`/`agent_norm` but the `subjects`
/// table has no `*_confidence`/`*_method` columns to match).
pub fn casefold_key(raw: &str) -> Option<String> {
    if raw.trim().is_empty() {
        return None;
    }
    let (_, key) = clean(raw);
    Some(key)
}

pub fn normalize_agent(
    raw: Option<&str>,
    aliases: &AliasMap,
    evidence_paths: Vec<String>,
) -> NormalizedAgent {
    let c = clean_and_lookup(raw, aliases);
    let method = if c.value.is_none() {
        TextNormMethod::Missing
    } else if c.alias_hit {
        TextNormMethod::AgentAliasMap
    } else {
        TextNormMethod::AgentCasefoldStrip
    };
    NormalizedAgent {
        value: c.value,
        display: c.display,
        confidence: c.confidence,
        method,
        evidence_paths,
        warnings: Vec::new(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn place_cleaning_with_alias() {
        // spec.md §8 scenario 2: "Paris :" with {"paris":"paris"}.
        let aliases = AliasMap::load_from_str(r#"{"paris":"paris"}"#).unwrap();
        let n = normalize_place(Some("Paris :"), &aliases, vec![]);
        assert_eq!(n.value.as_deref(), Some("paris"));
        assert_eq!(n.display, "Paris");
        assert_eq!(n.method, TextNormMethod::PlaceAliasMap);
        assert_eq!(n.confidence, confidence::ALIAS_MAP);
    }

    #[test]
    fn place_cleaning_without_alias() {
        let n = normalize_place(Some("Paris :"), &AliasMap::empty(), vec![]);
        assert_eq!(n.value.as_deref(), Some("paris"));
        assert_eq!(n.method, TextNormMethod::PlaceCasefoldStrip);
        assert_eq!(n.confidence, confidence::CASEFOLD_STRIP);
    }

    #[test]
    fn strips_bracketed_place() {
        let n = normalize_place(Some("[Paris]"), &AliasMap::empty(), vec![]);
        assert_eq!(n.display, "Paris");
    }

    #[test]
    fn missing_place_is_tagged_missing() {
        let n = normalize_place(None, &AliasMap::empty(), vec![]);
        assert_eq!(n.method, TextNormMethod::Missing);
        assert!(n.value.is_none());
    }

    #[test]
    fn idempotent_on_display_form() {
        let aliases = AliasMap::empty();
        let first = normalize_place(Some("Paris :"), &aliases, vec![]);
        let second = normalize_place(Some(&first.display), &aliases, vec![]);
        assert_eq!(first.value, second.value);
    }

    #[test]
    fn publisher_and_agent_share_cleaning() {
        let aliases = AliasMap::empty();
        let pub_n = normalize_publisher(Some("J. Smith ;"), &aliases, vec![]);
        let agent_n = normalize_agent(Some("J. Smith ;"), &aliases, vec![]);
        assert_eq!(pub_n.value, agent_n.value);
        assert_eq!(pub_n.display, agent_n.display);
    }
}
