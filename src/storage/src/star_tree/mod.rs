//! Star-tree: a pre-aggregated index over combinations of dimension values.
//!
//! Every node covers a contiguous range of the tree's document store. Children of a node at
//! level `k` split its documents by the value of the `k`-th dimension of the split order; the
//! optional star child covers the same documents as its parent with that dimension collapsed, so a
//! query that does not constrain the dimension can skip it. Each node carries partial aggregates
//! for every metric of the tree, computed over exactly the documents it covers.

use std::fmt;

use arrow::array::Array;
use arrow::array::AsArray;
use arrow::array::Float64Array;
use arrow::compute::cast;
use arrow::datatypes::DataType;
use arrow::datatypes::Float64Type;
use arrow::record_batch::RecordBatch;
use common::query::AggregateFunction;
use serde::Deserialize;
use serde::Serialize;

use crate::error::Result;
use crate::error::StoreError;

mod builder;

pub use builder::StarTreeBuilder;
pub use builder::StarTreeConfig;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId(pub usize);

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Aggregate function applied to a column, precomputed by the tree. Rendered as `sum__revenue`,
/// `count__*`.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq, Hash)]
pub struct MetricPair {
    pub function: AggregateFunction,
    pub column: Option<String>,
}

impl MetricPair {
    pub fn new(function: AggregateFunction, column: Option<String>) -> Self {
        Self { function, column }
    }

    pub fn count_star() -> Self {
        Self::new(AggregateFunction::Count, None)
    }

    pub fn with_column(function: AggregateFunction, column: impl Into<String>) -> Self {
        Self::new(function, Some(column.into()))
    }
}

impl fmt::Display for MetricPair {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}__{}",
            self.function.name(),
            self.column.as_deref().unwrap_or("*")
        )
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum PartialAggregate {
    Count(i64),
    Sum(f64),
    Min(Option<f64>),
    Max(Option<f64>),
    Avg { sum: f64, count: i64 },
}

impl PartialAggregate {
    pub fn function(&self) -> AggregateFunction {
        match self {
            PartialAggregate::Count(_) => AggregateFunction::Count,
            PartialAggregate::Sum(_) => AggregateFunction::Sum,
            PartialAggregate::Min(_) => AggregateFunction::Min,
            PartialAggregate::Max(_) => AggregateFunction::Max,
            PartialAggregate::Avg { .. } => AggregateFunction::Avg,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NodeValue {
    Root,
    Value(i64),
    Star,
}

impl fmt::Display for NodeValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            NodeValue::Root => write!(f, "root"),
            NodeValue::Value(v) => write!(f, "{v}"),
            NodeValue::Star => write!(f, "*"),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct StarTreeNode {
    /// Number of dimensions bound on the path from the root. Children split on dimension `level`.
    pub level: usize,
    pub value: NodeValue,
    pub start_doc: usize,
    pub end_doc: usize,
    /// Aligned with [StarTree::metrics].
    pub aggregates: Vec<PartialAggregate>,
    /// Value children, ascending by value.
    pub children: Vec<NodeId>,
    pub star_child: Option<NodeId>,
}

impl StarTreeNode {
    pub fn is_leaf(&self) -> bool {
        self.children.is_empty() && self.star_child.is_none()
    }

    pub fn num_docs(&self) -> usize {
        self.end_doc.saturating_sub(self.start_doc)
    }
}

#[derive(Debug, Clone)]
pub struct StarTree {
    dimensions: Vec<String>,
    metrics: Vec<MetricPair>,
    nodes: Vec<StarTreeNode>,
    documents: RecordBatch,
}

impl StarTree {
    pub const ROOT: NodeId = NodeId(0);

    /// Assembles a tree from raw parts without validating it. Readers check node consistency
    /// when they touch a node.
    pub fn from_parts(
        dimensions: Vec<String>,
        metrics: Vec<MetricPair>,
        nodes: Vec<StarTreeNode>,
        documents: RecordBatch,
    ) -> Self {
        Self {
            dimensions,
            metrics,
            nodes,
            documents,
        }
    }

    pub fn dimensions(&self) -> &[String] {
        &self.dimensions
    }

    pub fn dimension_id(&self, column: &str) -> Option<usize> {
        self.dimensions.iter().position(|d| d == column)
    }

    pub fn metrics(&self) -> &[MetricPair] {
        &self.metrics
    }

    pub fn metric_id(&self, metric: &MetricPair) -> Option<usize> {
        self.metrics.iter().position(|m| m == metric)
    }

    pub fn node(&self, id: NodeId) -> Option<&StarTreeNode> {
        self.nodes.get(id.0)
    }

    pub fn num_nodes(&self) -> usize {
        self.nodes.len()
    }

    pub fn documents(&self) -> &RecordBatch {
        &self.documents
    }

    /// Raw documents covered by the node.
    pub fn node_documents(&self, node: &StarTreeNode) -> Result<RecordBatch> {
        if node.start_doc > node.end_doc || node.end_doc > self.documents.num_rows() {
            return Err(StoreError::Internal(format!(
                "star-tree node range {}..{} is outside of {} documents",
                node.start_doc,
                node.end_doc,
                self.documents.num_rows()
            )));
        }

        Ok(self.documents.slice(node.start_doc, node.num_docs()))
    }
}

fn metric_values(docs: &RecordBatch, column: &str) -> Result<Float64Array> {
    let arr = docs.column_by_name(column).ok_or_else(|| {
        StoreError::InvalidParameter(format!("metric column {column:?} not found"))
    })?;
    if !arr.data_type().is_numeric() {
        return Err(StoreError::InvalidParameter(format!(
            "metric column {column:?} has non-numeric type {}",
            arr.data_type()
        )));
    }

    Ok(cast(arr, &DataType::Float64)?
        .as_primitive::<Float64Type>()
        .clone())
}

/// Computes partial aggregates of `metrics` over all rows of `docs`.
pub fn compute_aggregates(
    docs: &RecordBatch,
    metrics: &[MetricPair],
) -> Result<Vec<PartialAggregate>> {
    metrics
        .iter()
        .map(|metric| {
            let column = match (&metric.function, &metric.column) {
                (AggregateFunction::Count, None) => {
                    return Ok(PartialAggregate::Count(docs.num_rows() as i64));
                }
                (_, Some(column)) => column.as_str(),
                (_, None) => {
                    return Err(StoreError::InvalidParameter(format!(
                        "metric {metric} requires a column"
                    )));
                }
            };

            let vals = metric_values(docs, column)?;
            let non_null = (vals.len() - vals.null_count()) as i64;
            Ok(match metric.function {
                AggregateFunction::Count => PartialAggregate::Count(non_null),
                AggregateFunction::Sum => {
                    PartialAggregate::Sum(arrow::compute::sum(&vals).unwrap_or(0.))
                }
                AggregateFunction::Min => PartialAggregate::Min(arrow::compute::min(&vals)),
                AggregateFunction::Max => PartialAggregate::Max(arrow::compute::max(&vals)),
                AggregateFunction::Avg => PartialAggregate::Avg {
                    sum: arrow::compute::sum(&vals).unwrap_or(0.),
                    count: non_null,
                },
                AggregateFunction::DistinctCount => {
                    return StoreError::nyi(format!("star-tree metric {metric}"));
                }
            })
        })
        .collect()
}
