//! Alias map loading — spec.md §6.3 "Alias map: flat JSON, validated against
//! a schema at load".

use std::collections::HashMap;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::{CoreError, Result};

/// `{ raw_variant_key: canonical_key }`, both already casefolded/NFKC'd —
/// the caller is responsible for cleaning the lookup key the same way
/// before consulting the map (see `normalizer::text::clean_and_normalize`).
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct AliasMap(pub HashMap<String, String>);

impl AliasMap {
    pub fn empty() -> Self {
        Self(HashMap::new())
    }

    pub fn load_from_str(json: &str) -> Result<Self> {
        let raw: serde_json::Value = serde_json::from_str(json)
            .map_err(|e| CoreError::InvalidAliasMap(format!("not valid JSON: {e}")))?;
        let obj = raw
            .as_object()
            .ok_or_else(|| CoreError::InvalidAliasMap("alias map must be a flat JSON object".into()))?;

        let mut map = HashMap::with_capacity(obj.len());
        for (k, v) in obj {
            let v = v.as_str().ok_or_else(|| {
                CoreError::InvalidAliasMap(format!("value for key {k:?} is not a string"))
            })?;
            map.insert(k.clone(), v.to_string());
        }
        Ok(Self(map))
    }

    pub fn load_from_file(path: &Path) -> Result<Self> {
        let contents = std::fs::read_to_string(path)?;
        Self::load_from_str(&contents)
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.0.get(key).map(|s| s.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn loads_flat_map() {
        let m = AliasMap::load_from_str(r#"{"paris":"paris","londres":"london"}"#).unwrap();
        assert_eq!(m.get("paris"), Some("paris"));
        assert_eq!(m.get("londres"), Some("london"));
        assert_eq!(m.get("rome"), None);
    }

    #[test]
    fn rejects_non_object() {
        assert!(AliasMap::load_from_str(r#"["paris"]"#).is_err());
    }

    #[test]
    fn rejects_non_string_values() {
        assert!(AliasMap::load_from_str(r#"{"paris": 1}"#).is_err());
    }
}
