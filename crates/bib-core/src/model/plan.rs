use serde::{Deserialize, Serialize};

use crate::error::{CoreError, Result};

/// The fields a [`Filter`] may reference. This is the closed variant the
/// Schema Contract (`crate::schema`) maps to SQL columns — `PlanUnsupported`
/// in spec.md §4.3 is raised for any field *not* in this enum or not present
/// in the live Schema Contract, never for an enum variant itself.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FilterField {
    Place,
    Publisher,
    Agent,
    DateRange,
    Language,
    Subject,
    Title,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FilterOp {
    Eq,
    In,
    Range,
    Contains,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(untagged)]
pub enum FilterValue {
    Scalar(String),
    List(Vec<String>),
    Range { start: i64, end: i64 },
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Filter {
    pub field: FilterField,
    pub op: FilterOp,
    pub value: FilterValue,
}

impl Filter {
    /// Shape checks from spec.md §3.1 — independent of the Schema Contract,
    /// which additionally checks that `field` is declared at all and that
    /// `Contains` only targets a full-text column.
    pub fn validate_shape(&self) -> Result<()> {
        match (self.op, &self.value) {
            (FilterOp::Range, FilterValue::Range { start, end }) => {
                if start > end {
                    return Err(CoreError::Validation(format!(
                        "range filter on {:?} has start {start} > end {end}",
                        self.field
                    )));
                }
                Ok(())
            }
            (FilterOp::Range, _) => Err(CoreError::Validation(format!(
                "RANGE filter on {:?} requires numeric start/end",
                self.field
            ))),
            (FilterOp::In, FilterValue::List(values)) => {
                if values.is_empty() {
                    return Err(CoreError::Validation(format!(
                        "IN filter on {:?} requires non-empty values",
                        self.field
                    )));
                }
                Ok(())
            }
            (FilterOp::In, _) => Err(CoreError::Validation(format!(
                "IN filter on {:?} requires a list of values",
                self.field
            ))),
            (FilterOp::Eq, FilterValue::Scalar(_)) => Ok(()),
            (FilterOp::Eq, _) => Err(CoreError::Validation(format!(
                "EQ filter on {:?} requires a scalar value",
                self.field
            ))),
            (FilterOp::Contains, FilterValue::Scalar(_)) => Ok(()),
            (FilterOp::Contains, _) => Err(CoreError::Validation(format!(
                "CONTAINS filter on {:?} requires a scalar value",
                self.field
            ))),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OrderDirection {
    Asc,
    Desc,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Order {
    pub field: FilterField,
    pub direction: OrderDirection,
}

/// The validated, versioned plan a free-text question compiles to. `version`
/// is always `"1.0"` today; the field exists so a future incompatible
/// QueryPlan shape can be rejected by callers pinned to an older version
/// rather than silently misinterpreted.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QueryPlan {
    pub version: String,
    pub intent: String,
    pub filters: Vec<Filter>,
    pub limit: u32,
    #[serde(default)]
    pub order: Option<Order>,
}

pub const QUERY_PLAN_VERSION: &str = "1.0";

impl QueryPlan {
    pub fn validate_shape(&self) -> Result<()> {
        if self.version != QUERY_PLAN_VERSION {
            return Err(CoreError::Validation(format!(
                "unsupported QueryPlan version {:?}",
                self.version
            )));
        }
        for filter in &self.filters {
            filter.validate_shape()?;
        }
        Ok(())
    }
}
