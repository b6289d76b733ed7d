use std::fmt;
use std::fmt::Display;

use serde::Deserialize;
use serde::Serialize;

/// Enum of all built-in aggregate functions
#[derive(Serialize, Deserialize, Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum AggregateFunction {
    /// count
    Count,
    /// sum
    Sum,
    /// min
    Min,
    /// max
    Max,
    /// avg
    Avg,
    /// exact count of distinct values
    DistinctCount,
}

impl AggregateFunction {
    /// Lower-case name used in explain output and metric pair names.
    pub fn name(&self) -> &'static str {
        match self {
            AggregateFunction::Count => "count",
            AggregateFunction::Sum => "sum",
            AggregateFunction::Min => "min",
            AggregateFunction::Max => "max",
            AggregateFunction::Avg => "avg",
            AggregateFunction::DistinctCount => "distinctcount",
        }
    }
}

impl Display for AggregateFunction {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}", format!("{self:?}").to_uppercase())
    }
}

#[derive(Serialize, Deserialize, Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct Bound {
    pub value: i64,
    pub inclusive: bool,
}

impl Bound {
    pub fn inclusive(value: i64) -> Self {
        Self {
            value,
            inclusive: true,
        }
    }

    pub fn exclusive(value: i64) -> Self {
        Self {
            value,
            inclusive: false,
        }
    }
}

/// Operation applied to a dictionary-encoded dimension value
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq, Hash)]
pub enum FilterOperation {
    Eq(i64),
    NotEq(i64),
    In(Vec<i64>),
    NotIn(Vec<i64>),
    Range {
        lower: Option<Bound>,
        upper: Option<Bound>,
    },
}

impl FilterOperation {
    pub fn matches(&self, v: i64) -> bool {
        match self {
            FilterOperation::Eq(x) => v == *x,
            FilterOperation::NotEq(x) => v != *x,
            FilterOperation::In(vals) => vals.contains(&v),
            FilterOperation::NotIn(vals) => !vals.contains(&v),
            FilterOperation::Range { lower, upper } => {
                let above = match lower {
                    None => true,
                    Some(b) if b.inclusive => v >= b.value,
                    Some(b) => v > b.value,
                };
                let below = match upper {
                    None => true,
                    Some(b) if b.inclusive => v <= b.value,
                    Some(b) => v < b.value,
                };

                above && below
            }
        }
    }
}

impl Display for FilterOperation {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        let join = |vals: &[i64]| {
            vals.iter()
                .map(|v| v.to_string())
                .collect::<Vec<_>>()
                .join(",")
        };
        match self {
            FilterOperation::Eq(v) => write!(f, "= {v}"),
            FilterOperation::NotEq(v) => write!(f, "!= {v}"),
            FilterOperation::In(vals) => write!(f, "IN ({})", join(vals)),
            FilterOperation::NotIn(vals) => write!(f, "NOT IN ({})", join(vals)),
            FilterOperation::Range { lower, upper } => {
                let l = match lower {
                    None => "(*".to_string(),
                    Some(b) if b.inclusive => format!("[{}", b.value),
                    Some(b) => format!("({}", b.value),
                };
                let u = match upper {
                    None => "*)".to_string(),
                    Some(b) if b.inclusive => format!("{}]", b.value),
                    Some(b) => format!("{})", b.value),
                };
                write!(f, "BETWEEN {l},{u}")
            }
        }
    }
}

/// Predicate on a single dimension column. A query filter is a conjunction of these.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq, Hash)]
pub struct DimensionFilter {
    pub column: String,
    pub operation: FilterOperation,
}

impl DimensionFilter {
    pub fn new(column: impl Into<String>, operation: FilterOperation) -> Self {
        Self {
            column: column.into(),
            operation,
        }
    }
}

impl Display for DimensionFilter {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{} {}", self.column, self.operation)
    }
}
