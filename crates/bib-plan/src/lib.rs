//! NL-to-QueryPlan validation (Stage A), QueryPlan-to-SQL compilation
//! (Stage B), and the plan cache (spec.md §4.3).

pub mod cache;
pub mod compile;
pub mod error;
pub mod nl;

pub use cache::{FilePlanCacheStore, MemoryPlanCacheStore, PlanCache};
pub use compile::{compile as compile_plan, CompiledQuery, Param};
pub use error::{PlanError, Result};
pub use nl::{FixtureNlClient, HttpNlClient, NlPlanClient, ProposedPlan};
