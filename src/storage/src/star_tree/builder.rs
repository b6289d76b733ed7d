use std::time::Instant;

use arrow::array::Array;
use arrow::array::AsArray;
use arrow::compute::concat_batches;
use arrow::compute::lexsort_to_indices;
use arrow::compute::take;
use arrow::compute::SortColumn;
use arrow::datatypes::DataType;
use arrow::datatypes::Int64Type;
use arrow::record_batch::RecordBatch;
use common::config;
use common::query::AggregateFunction;
use common::types::METRIC_STORE_STAR_TREE_BUILD_TIME_SECONDS;
use common::DEFAULT_MAX_LEAF_RECORDS;
use metrics::histogram;
use tracing::debug;

use crate::error::Result;
use crate::error::StoreError;
use crate::star_tree::compute_aggregates;
use crate::star_tree::MetricPair;
use crate::star_tree::NodeId;
use crate::star_tree::NodeValue;
use crate::star_tree::StarTree;
use crate::star_tree::StarTreeNode;

#[derive(Debug, Clone)]
pub struct StarTreeConfig {
    pub dimensions_split_order: Vec<String>,
    pub metrics: Vec<MetricPair>,
    pub max_leaf_records: usize,
    pub skip_star_node_creation: Vec<String>,
}

impl StarTreeConfig {
    pub fn new(dimensions_split_order: Vec<String>, metrics: Vec<MetricPair>) -> Self {
        Self {
            dimensions_split_order,
            metrics,
            max_leaf_records: DEFAULT_MAX_LEAF_RECORDS,
            skip_star_node_creation: vec![],
        }
    }

    pub fn with_max_leaf_records(mut self, max_leaf_records: usize) -> Self {
        self.max_leaf_records = max_leaf_records;
        self
    }

    pub fn with_skip_star_node_creation(mut self, dimensions: Vec<String>) -> Self {
        self.skip_star_node_creation = dimensions;
        self
    }

    /// Applies the engine-wide star-tree settings.
    pub fn with_config(self, cfg: &config::StarTree) -> Self {
        self.with_max_leaf_records(cfg.max_leaf_records)
            .with_skip_star_node_creation(cfg.skip_star_node_creation.clone())
    }
}

// node whose children are yet to be created
struct PendingNode {
    id: NodeId,
    docs: RecordBatch,
    offset: usize,
}

pub struct StarTreeBuilder {
    config: StarTreeConfig,
}

impl StarTreeBuilder {
    pub fn new(config: StarTreeConfig) -> Self {
        Self { config }
    }

    fn validate(&self, documents: &RecordBatch) -> Result<Vec<usize>> {
        if self.config.max_leaf_records == 0 {
            return Err(StoreError::InvalidParameter(
                "max_leaf_records must be positive".to_string(),
            ));
        }

        for metric in &self.config.metrics {
            if metric.function == AggregateFunction::DistinctCount {
                return StoreError::nyi(format!("star-tree metric {metric}"));
            }
        }

        let schema = documents.schema();
        self.config
            .dimensions_split_order
            .iter()
            .map(|name| {
                let idx = schema.index_of(name).map_err(|_| {
                    StoreError::InvalidParameter(format!("dimension {name:?} not found"))
                })?;
                let col = documents.column(idx);
                if col.data_type() != &DataType::Int64 {
                    return Err(StoreError::InvalidParameter(format!(
                        "dimension {name:?} must be Int64, got {}",
                        col.data_type()
                    )));
                }
                if col.null_count() > 0 {
                    return Err(StoreError::InvalidParameter(format!(
                        "dimension {name:?} contains nulls"
                    )));
                }
                Ok(idx)
            })
            .collect()
    }

    pub fn build(&self, documents: &RecordBatch) -> Result<StarTree> {
        let start_time = Instant::now();
        let dims = self.validate(documents)?;
        let metrics = &self.config.metrics;

        let sorted = sort_by_columns(documents, &dims)?;
        let mut total_docs = sorted.num_rows();
        let mut store = vec![sorted.clone()];
        let mut nodes = vec![StarTreeNode {
            level: 0,
            value: NodeValue::Root,
            start_doc: 0,
            end_doc: total_docs,
            aggregates: compute_aggregates(&sorted, metrics)?,
            children: vec![],
            star_child: None,
        }];

        let mut stack = vec![PendingNode {
            id: StarTree::ROOT,
            docs: sorted,
            offset: 0,
        }];

        while let Some(pending) = stack.pop() {
            let level = nodes[pending.id.0].level;
            if level >= dims.len() || pending.docs.num_rows() <= self.config.max_leaf_records {
                continue;
            }

            let values = pending.docs.column(dims[level]).as_primitive::<Int64Type>();
            let mut runs: Vec<(i64, usize, usize)> = vec![];
            for (idx, v) in values.values().iter().enumerate() {
                match runs.last_mut() {
                    Some((last, _, end)) if *last == *v => *end = idx + 1,
                    _ => runs.push((*v, idx, idx + 1)),
                }
            }

            for (value, start, end) in runs.iter().copied() {
                let docs = pending.docs.slice(start, end - start);
                let id = NodeId(nodes.len());
                nodes.push(StarTreeNode {
                    level: level + 1,
                    value: NodeValue::Value(value),
                    start_doc: pending.offset + start,
                    end_doc: pending.offset + end,
                    aggregates: compute_aggregates(&docs, metrics)?,
                    children: vec![],
                    star_child: None,
                });
                nodes[pending.id.0].children.push(id);
                stack.push(PendingNode {
                    id,
                    docs,
                    offset: pending.offset + start,
                });
            }

            let dim_name = &self.config.dimensions_split_order[level];
            if runs.len() > 1 && !self.config.skip_star_node_creation.contains(dim_name) {
                // same documents with this dimension collapsed, ordered by the remaining ones
                let docs = sort_by_columns(&pending.docs, &dims[level + 1..])?;
                let id = NodeId(nodes.len());
                let aggregates = nodes[pending.id.0].aggregates.clone();
                nodes.push(StarTreeNode {
                    level: level + 1,
                    value: NodeValue::Star,
                    start_doc: total_docs,
                    end_doc: total_docs + docs.num_rows(),
                    aggregates,
                    children: vec![],
                    star_child: None,
                });
                nodes[pending.id.0].star_child = Some(id);
                stack.push(PendingNode {
                    id,
                    docs: docs.clone(),
                    offset: total_docs,
                });
                total_docs += docs.num_rows();
                store.push(docs);
            }
        }

        let documents = concat_batches(&documents.schema(), &store)?;
        debug!(
            nodes = nodes.len(),
            documents = documents.num_rows(),
            "star-tree built"
        );
        histogram!(METRIC_STORE_STAR_TREE_BUILD_TIME_SECONDS).record(start_time.elapsed());

        Ok(StarTree::from_parts(
            self.config.dimensions_split_order.clone(),
            metrics.clone(),
            nodes,
            documents,
        ))
    }
}

fn sort_by_columns(batch: &RecordBatch, columns: &[usize]) -> Result<RecordBatch> {
    if columns.is_empty() || batch.num_rows() == 0 {
        return Ok(batch.clone());
    }

    let sort_columns = columns
        .iter()
        .map(|idx| SortColumn {
            values: batch.column(*idx).clone(),
            options: None,
        })
        .collect::<Vec<_>>();
    let indices = lexsort_to_indices(&sort_columns, None)?;
    let arrs = batch
        .columns()
        .iter()
        .map(|arr| take(arr.as_ref(), &indices, None))
        .collect::<std::result::Result<Vec<_>, _>>()?;

    Ok(RecordBatch::try_new(batch.schema(), arrs)?)
}
