use std::collections::BTreeMap;
use std::collections::VecDeque;
use std::sync::Arc;

use arrow::record_batch::RecordBatch;
use common::query::DimensionFilter;
use common::types::METRIC_QUERY_STAR_TREE_FALLBACK_LEAVES_TOTAL;
use common::types::METRIC_QUERY_STAR_TREE_NODES_TOTAL;
use metrics::counter;
use storage::star_tree::NodeId;
use storage::star_tree::NodeValue;
use storage::star_tree::StarTreeNode;
use storage::StarTree;
use tracing::trace;

use crate::error::QueryError;
use crate::error::Result;
use crate::physical_plan::explain::to_upper_camel_case;
use crate::physical_plan::explain::ExplainNode;
use crate::physical_plan::filter::filter_documents;
use crate::physical_plan::ExecutionStatistics;
use crate::physical_plan::ProjectOperator;
use crate::physical_plan::ValueBlock;

const EXPLAIN_NAME: &str = "STAR_TREE_PROJECT";

/// Walks a star-tree and yields the smallest set of blocks that covers every matching document
/// exactly once.
///
/// A node is emitted as [ValueBlock::StarTreeNode] when no filter touches a dimension below it,
/// so its pre-aggregates are exact. Otherwise the walk descends into value children matching the
/// filter on the node's split dimension, or into the star child when that dimension is
/// unconstrained. Leaves that still have unresolved filters are scanned document by document.
#[derive(Debug)]
pub struct StarTreeProjectOperator {
    tree: Arc<StarTree>,
    columns: Vec<String>,
    projection: Vec<usize>,
    // dimension id -> filters on that dimension
    predicates: BTreeMap<usize, Vec<DimensionFilter>>,
    batch_size: usize,
    queue: VecDeque<NodeId>,
    pending: VecDeque<RecordBatch>,
    num_docs_scanned: u64,
    num_entries_scanned_in_filter: u64,
}

impl StarTreeProjectOperator {
    pub fn try_new(
        tree: Arc<StarTree>,
        columns: Vec<String>,
        filters: Vec<DimensionFilter>,
        batch_size: usize,
    ) -> Result<Self> {
        if batch_size == 0 {
            return Err(QueryError::Plan("batch size must be positive".to_string()));
        }

        let schema = tree.documents().schema();
        let projection = columns
            .iter()
            .map(|col| {
                schema.index_of(col).map_err(|_| {
                    QueryError::Plan(format!("column {col:?} not found in star-tree documents"))
                })
            })
            .collect::<Result<Vec<_>>>()?;

        let mut predicates: BTreeMap<usize, Vec<DimensionFilter>> = BTreeMap::new();
        for filter in filters {
            let dim = tree.dimension_id(&filter.column).ok_or_else(|| {
                QueryError::Plan(format!(
                    "filter column {:?} is not a star-tree dimension",
                    filter.column
                ))
            })?;
            predicates.entry(dim).or_default().push(filter);
        }

        Ok(Self {
            tree,
            columns,
            projection,
            predicates,
            batch_size,
            queue: VecDeque::from([StarTree::ROOT]),
            pending: VecDeque::new(),
            num_docs_scanned: 0,
            num_entries_scanned_in_filter: 0,
        })
    }

    /// Filters on dimensions the path to a node at `level` hasn't bound yet.
    fn residual_filters(&self, level: usize) -> Vec<DimensionFilter> {
        self.predicates
            .range(level..)
            .flat_map(|(_, filters)| filters.iter().cloned())
            .collect()
    }

    fn scan_leaf(&mut self, node: &StarTreeNode, residual: &[DimensionFilter]) -> Result<()> {
        let docs = self
            .tree
            .node_documents(node)
            .map_err(|err| QueryError::StarTree(err.to_string()))?;
        self.num_entries_scanned_in_filter += (docs.num_rows() * residual.len()) as u64;
        let matched = filter_documents(&docs, residual)?.project(&self.projection)?;
        counter!(METRIC_QUERY_STAR_TREE_FALLBACK_LEAVES_TOTAL).increment(1);

        let mut offset = 0;
        while offset < matched.num_rows() {
            let len = self.batch_size.min(matched.num_rows() - offset);
            self.pending.push_back(matched.slice(offset, len));
            offset += len;
        }

        Ok(())
    }

    fn enqueue_children(&mut self, id: NodeId, node: &StarTreeNode) -> Result<()> {
        let Some(filters) = self.predicates.get(&node.level) else {
            match node.star_child {
                Some(star_id) => {
                    let star = child_node(&self.tree, id, node, star_id)?;
                    if star.value != NodeValue::Star {
                        return Err(QueryError::StarTree(format!(
                            "star child {star_id} holds {}",
                            star.value
                        )));
                    }
                    self.queue.push_back(star_id);
                }
                None => {
                    for child_id in &node.children {
                        value_child(&self.tree, id, node, *child_id)?;
                        self.queue.push_back(*child_id);
                    }
                }
            }
            return Ok(());
        };

        for child_id in &node.children {
            let value = value_child(&self.tree, id, node, *child_id)?;
            if filters.iter().all(|f| f.operation.matches(value)) {
                self.queue.push_back(*child_id);
            }
        }

        Ok(())
    }
}

fn node_by_id(tree: &StarTree, id: NodeId) -> Result<&StarTreeNode> {
    tree.node(id)
        .ok_or_else(|| QueryError::StarTree(format!("node {id} not found")))
}

/// Child one level below its parent. Children are allocated after their parent, so an id that
/// doesn't grow means a cycle.
fn child_node<'a>(
    tree: &'a StarTree,
    parent_id: NodeId,
    parent: &StarTreeNode,
    child_id: NodeId,
) -> Result<&'a StarTreeNode> {
    if child_id.0 <= parent_id.0 {
        return Err(QueryError::StarTree(format!(
            "node {parent_id} points back to node {child_id}"
        )));
    }
    let child = node_by_id(tree, child_id)?;
    if child.level != parent.level + 1 {
        return Err(QueryError::StarTree(format!(
            "child {child_id} of node {parent_id} is at level {}, expected {}",
            child.level,
            parent.level + 1
        )));
    }

    Ok(child)
}

fn value_child(
    tree: &StarTree,
    parent_id: NodeId,
    parent: &StarTreeNode,
    child_id: NodeId,
) -> Result<i64> {
    match child_node(tree, parent_id, parent, child_id)?.value {
        NodeValue::Value(v) => Ok(v),
        other => Err(QueryError::StarTree(format!(
            "value child {child_id} holds {other}"
        ))),
    }
}

impl ProjectOperator for StarTreeProjectOperator {
    fn next_block(&mut self) -> Result<Option<ValueBlock>> {
        loop {
            if let Some(batch) = self.pending.pop_front() {
                self.num_docs_scanned += batch.num_rows() as u64;
                return Ok(Some(ValueBlock::Documents(batch)));
            }

            let Some(id) = self.queue.pop_front() else {
                return Ok(None);
            };
            let tree = self.tree.clone();
            let node = node_by_id(&tree, id)?;
            let residual = self.residual_filters(node.level);

            if residual.is_empty() {
                trace!(node = %id, value = %node.value, docs = node.num_docs(), "pre-aggregated node");
                self.num_docs_scanned += 1;
                counter!(METRIC_QUERY_STAR_TREE_NODES_TOTAL).increment(1);
                return Ok(Some(ValueBlock::StarTreeNode(id)));
            }

            if node.is_leaf() {
                self.scan_leaf(node, &residual)?;
                continue;
            }

            if node.level >= tree.dimensions().len() {
                return Err(QueryError::StarTree(format!(
                    "node {id} at level {} has children past the last dimension",
                    node.level
                )));
            }
            self.enqueue_children(id, node)?;
        }
    }

    fn num_columns_projected(&self) -> usize {
        self.columns.len()
    }

    fn execution_statistics(&self) -> ExecutionStatistics {
        ExecutionStatistics::new(
            self.num_docs_scanned,
            self.num_entries_scanned_in_filter,
            self.num_docs_scanned * self.columns.len() as u64,
            self.tree
                .node(StarTree::ROOT)
                .map(|root| root.num_docs() as u64)
                .unwrap_or_default(),
        )
    }

    fn explain(&self) -> ExplainNode {
        let mut node = ExplainNode::new(to_upper_camel_case(EXPLAIN_NAME))
            .with_string_list("dimensions", self.tree.dimensions().to_vec())
            .with_string_list("columns", self.columns.clone());
        let filters = self
            .predicates
            .values()
            .flatten()
            .map(|f| f.to_string())
            .collect::<Vec<_>>();
        if !filters.is_empty() {
            node = node.with_string_list("filters", filters);
        }

        node.with_long("batchSize", self.batch_size as i64)
    }
}
