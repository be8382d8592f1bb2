pub mod aggregation;
pub mod candidate;
pub mod enrichment;
pub mod normalized;
pub mod plan;
pub mod record;
pub mod session;
pub mod sourced;

pub use aggregation::{AggregationBin, AggregationIntent, AggregationResult, DateBucket};
pub use candidate::{Candidate, CandidateSet, Evidence};
pub use enrichment::{EnrichmentResult, EnrichmentSource, EntityType, PersonInfo, PlaceInfo};
pub use normalized::{
    confidence, DateMethod, NormalizedAgent, NormalizedDate, NormalizedPlace, NormalizedPublisher,
    TextNormMethod,
};
pub use plan::{Filter, FilterField, FilterOp, FilterValue, Order, OrderDirection, QueryPlan};
pub use record::{Agent, CanonicalRecord, EnrichedRecord, Imprint, ImprintNorm, Language, Note, M2, Subject};
pub use session::{ActiveSubgroup, Goal, Message, MessageRole, Phase, Session};
pub use sourced::SourcedValue;
