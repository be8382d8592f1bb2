use serde::{Deserialize, Serialize};

/// The closed set of aggregation intents the Aggregator recognizes
/// (spec.md §4.5). Each selects a fixed SQL template — never a
/// user-composed query.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AggregationIntent {
    TopPublishers,
    DateDistribution,
    LanguageBreakdown,
    PlaceDistribution,
    SubjectClusters,
    AgentBreakdown,
    CountOnly,
}

/// How `date_distribution` buckets years (spec.md §4.5 "by decade/century").
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DateBucket {
    Decade,
    Century,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AggregationBin {
    pub key: String,
    pub count: i64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sample_ids: Option<Vec<String>>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AggregationResult {
    pub intent: AggregationIntent,
    pub bins: Vec<AggregationBin>,
    pub total: i64,
}
