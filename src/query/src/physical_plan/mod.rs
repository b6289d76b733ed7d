use std::fmt::Debug;

use arrow::record_batch::RecordBatch;
use serde::Serialize;
use storage::star_tree::NodeId;

use crate::error::Result;

pub mod aggregate;
pub mod executor;
pub mod explain;
pub mod expressions;
mod filter;
pub mod planner;
pub mod project;
pub mod results;
pub mod star_tree_project;

pub use aggregate::AggregationInfo;
pub use aggregate::AggregationOperator;
pub use explain::ExplainNode;
pub use results::AggregationResultsBlock;

/// Unit of work pulled from a project operator.
#[derive(Debug, Clone)]
pub enum ValueBlock {
    /// Documents that passed the filter, restricted to the projected columns.
    Documents(RecordBatch),
    /// Star-tree node whose pre-aggregates answer the query exactly for every document under it.
    StarTreeNode(NodeId),
}

impl ValueBlock {
    /// Documents the block stands for in scan accounting. A pre-aggregated node counts as one.
    pub fn num_docs(&self) -> usize {
        match self {
            ValueBlock::Documents(batch) => batch.num_rows(),
            ValueBlock::StarTreeNode(_) => 1,
        }
    }
}

/// Pull-based source of filtered, projected blocks for a single segment.
pub trait ProjectOperator: Send + Debug {
    /// Next non-empty block, `None` once the source is exhausted.
    fn next_block(&mut self) -> Result<Option<ValueBlock>>;
    fn num_columns_projected(&self) -> usize;
    fn execution_statistics(&self) -> ExecutionStatistics;
    fn explain(&self) -> ExplainNode;
}

#[derive(Serialize, Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ExecutionStatistics {
    pub num_docs_scanned: u64,
    pub num_entries_scanned_in_filter: u64,
    pub num_entries_scanned_post_filter: u64,
    pub num_total_docs: u64,
}

impl ExecutionStatistics {
    pub fn new(
        num_docs_scanned: u64,
        num_entries_scanned_in_filter: u64,
        num_entries_scanned_post_filter: u64,
        num_total_docs: u64,
    ) -> Self {
        Self {
            num_docs_scanned,
            num_entries_scanned_in_filter,
            num_entries_scanned_post_filter,
            num_total_docs,
        }
    }
}
