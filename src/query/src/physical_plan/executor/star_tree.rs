use std::sync::Arc;

use storage::star_tree::NodeId;
use storage::StarTree;

use crate::error::QueryError;
use crate::error::Result;
use crate::physical_plan::executor::default::aggregate_documents;
use crate::physical_plan::executor::AggregationExecutor;
use crate::physical_plan::expressions::aggregate::Accumulator;
use crate::physical_plan::expressions::aggregate::AggregationFunction;
use crate::physical_plan::ValueBlock;

/// Merges pre-aggregated star-tree nodes and aggregates documents of leaves the tree couldn't
/// answer on its own.
#[derive(Debug)]
pub struct StarTreeAggregationExecutor {
    functions: Vec<Arc<dyn AggregationFunction>>,
    accumulators: Vec<Accumulator>,
    tree: Arc<StarTree>,
    // function idx -> metric idx in the tree
    metric_ids: Vec<usize>,
}

impl StarTreeAggregationExecutor {
    pub fn try_new(functions: Vec<Arc<dyn AggregationFunction>>, tree: Arc<StarTree>) -> Result<Self> {
        let metric_ids = functions
            .iter()
            .map(|f| {
                let metric = f.star_tree_metric().ok_or_else(|| {
                    QueryError::Plan(format!(
                        "{} can't be answered from a star-tree",
                        f.to_explain_string()
                    ))
                })?;
                tree.metric_id(&metric)
                    .ok_or_else(|| QueryError::StarTree(format!("metric {metric} is missing")))
            })
            .collect::<Result<Vec<_>>>()?;
        let accumulators = functions.iter().map(|f| f.create_accumulator()).collect();

        Ok(Self {
            functions,
            accumulators,
            tree,
            metric_ids,
        })
    }

    fn merge_node(&mut self, id: NodeId) -> Result<()> {
        let node = self
            .tree
            .node(id)
            .ok_or_else(|| QueryError::StarTree(format!("node {id} not found")))?;
        if node.aggregates.len() != self.tree.metrics().len() {
            return Err(QueryError::StarTree(format!(
                "node {id} has {} aggregates, expected {}",
                node.aggregates.len(),
                self.tree.metrics().len()
            )));
        }

        for ((f, acc), metric_id) in self
            .functions
            .iter()
            .zip(self.accumulators.iter_mut())
            .zip(self.metric_ids.iter())
        {
            let partial = &node.aggregates[*metric_id];
            let metric = &self.tree.metrics()[*metric_id];
            if partial.function() != metric.function {
                return Err(QueryError::StarTree(format!(
                    "node {id} holds {} partial for metric {metric}",
                    partial.function().name()
                )));
            }
            f.merge(acc, &Accumulator::from(partial))?;
        }

        Ok(())
    }
}

impl AggregationExecutor for StarTreeAggregationExecutor {
    fn name(&self) -> &'static str {
        "star_tree"
    }

    fn aggregate(&mut self, block: &ValueBlock) -> Result<()> {
        match block {
            ValueBlock::Documents(batch) => {
                aggregate_documents(&self.functions, &mut self.accumulators, batch)
            }
            ValueBlock::StarTreeNode(id) => self.merge_node(*id),
        }
    }

    fn result(self: Box<Self>) -> Vec<Accumulator> {
        self.accumulators
    }
}
