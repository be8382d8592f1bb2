use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EntityType {
    Person,
    Place,
    Publisher,
    Organization,
}

/// Which step of the lookup chain in spec.md §4.7 ultimately produced this
/// result. `None` means a terminal miss.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EnrichmentSource {
    Cache,
    IdMapping,
    NameSearch,
    None,
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct PersonInfo {
    #[serde(default)]
    pub birth_year: Option<i32>,
    #[serde(default)]
    pub death_year: Option<i32>,
    #[serde(default)]
    pub occupations: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct PlaceInfo {
    #[serde(default)]
    pub country: Option<String>,
    #[serde(default)]
    pub coordinates: Option<(f64, f64)>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EnrichmentResult {
    pub entity_type: EntityType,
    pub entity_value: String,
    pub normalized_key: String,
    #[serde(default)]
    pub wikidata_id: Option<String>,
    #[serde(default)]
    pub viaf_id: Option<String>,
    #[serde(default)]
    pub isni_id: Option<String>,
    #[serde(default)]
    pub loc_id: Option<String>,
    #[serde(default)]
    pub nli_id: Option<String>,
    #[serde(default)]
    pub person_info: Option<PersonInfo>,
    #[serde(default)]
    pub place_info: Option<PlaceInfo>,
    pub label: String,
    pub description: String,
    pub source: EnrichmentSource,
    pub confidence: f64,
    pub raw: serde_json::Value,
    pub fetched_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
}

impl EnrichmentResult {
    /// Terminal miss per spec.md §4.7 failure model: cache and each source
    /// independently fail through; this is the value returned when every
    /// step comes up empty.
    pub fn terminal_miss(entity_type: EntityType, entity_value: &str, normalized_key: &str) -> Self {
        let now = Utc::now();
        Self {
            entity_type,
            entity_value: entity_value.to_string(),
            normalized_key: normalized_key.to_string(),
            wikidata_id: None,
            viaf_id: None,
            isni_id: None,
            loc_id: None,
            nli_id: None,
            person_info: None,
            place_info: None,
            label: entity_value.to_string(),
            description: String::new(),
            source: EnrichmentSource::None,
            confidence: 0.0,
            raw: serde_json::Value::Null,
            fetched_at: now,
            expires_at: now,
        }
    }

    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        now >= self.expires_at
    }
}
