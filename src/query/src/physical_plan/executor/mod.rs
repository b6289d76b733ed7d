use std::sync::Arc;

use storage::StarTree;

use crate::error::Result;
use crate::physical_plan::expressions::aggregate::Accumulator;
use crate::physical_plan::expressions::aggregate::AggregationFunction;
use crate::physical_plan::ValueBlock;

mod default;
mod star_tree;

pub use default::DefaultAggregationExecutor;
pub use star_tree::StarTreeAggregationExecutor;

/// Folds value blocks into one accumulator per aggregation function.
pub trait AggregationExecutor: Send {
    fn name(&self) -> &'static str;
    fn aggregate(&mut self, block: &ValueBlock) -> Result<()>;
    /// Accumulators in aggregation function order.
    fn result(self: Box<Self>) -> Vec<Accumulator>;
}

/// Star-tree executor when the operator was planned over a star-tree, scan executor otherwise.
pub fn create_executor(
    functions: &[Arc<dyn AggregationFunction>],
    star_tree: Option<Arc<StarTree>>,
) -> Result<Box<dyn AggregationExecutor>> {
    let executor: Box<dyn AggregationExecutor> = match star_tree {
        Some(tree) => Box::new(StarTreeAggregationExecutor::try_new(functions.to_vec(), tree)?),
        None => Box::new(DefaultAggregationExecutor::new(functions.to_vec())),
    };

    Ok(executor)
}
