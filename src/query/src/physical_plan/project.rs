use arrow::record_batch::RecordBatch;
use common::query::DimensionFilter;
use storage::Segment;
use tracing::trace;

use crate::error::QueryError;
use crate::error::Result;
use crate::physical_plan::explain::to_upper_camel_case;
use crate::physical_plan::explain::ExplainNode;
use crate::physical_plan::filter::filter_documents;
use crate::physical_plan::ExecutionStatistics;
use crate::physical_plan::ProjectOperator;
use crate::physical_plan::ValueBlock;

const EXPLAIN_NAME: &str = "PROJECT";

/// Scans every document of a segment in batches, applies the filters and projects the columns
/// the aggregations read.
#[derive(Debug)]
pub struct SegmentProjectOperator {
    segment_name: String,
    documents: RecordBatch,
    columns: Vec<String>,
    projection: Vec<usize>,
    filters: Vec<DimensionFilter>,
    batch_size: usize,
    offset: usize,
    num_docs_matched: u64,
    num_entries_scanned_in_filter: u64,
}

impl SegmentProjectOperator {
    pub fn try_new(
        segment: &Segment,
        columns: Vec<String>,
        filters: Vec<DimensionFilter>,
        batch_size: usize,
    ) -> Result<Self> {
        if batch_size == 0 {
            return Err(QueryError::Plan("batch size must be positive".to_string()));
        }

        let schema = segment.schema();
        let projection = columns
            .iter()
            .map(|col| {
                schema.index_of(col).map_err(|_| {
                    QueryError::Plan(format!(
                        "column {col:?} not found in segment {}",
                        segment.name()
                    ))
                })
            })
            .collect::<Result<Vec<_>>>()?;
        for filter in &filters {
            if schema.index_of(&filter.column).is_err() {
                return Err(QueryError::Plan(format!(
                    "filter column {:?} not found in segment {}",
                    filter.column,
                    segment.name()
                )));
            }
        }

        Ok(Self {
            segment_name: segment.name().to_string(),
            documents: segment.documents().clone(),
            columns,
            projection,
            filters,
            batch_size,
            offset: 0,
            num_docs_matched: 0,
            num_entries_scanned_in_filter: 0,
        })
    }
}

impl ProjectOperator for SegmentProjectOperator {
    fn next_block(&mut self) -> Result<Option<ValueBlock>> {
        while self.offset < self.documents.num_rows() {
            let len = self.batch_size.min(self.documents.num_rows() - self.offset);
            let chunk = self.documents.slice(self.offset, len);
            self.offset += len;

            self.num_entries_scanned_in_filter += (len * self.filters.len()) as u64;
            let matched = filter_documents(&chunk, &self.filters)?;
            if matched.num_rows() == 0 {
                continue;
            }

            trace!(
                segment = %self.segment_name,
                docs = matched.num_rows(),
                "documents block"
            );
            self.num_docs_matched += matched.num_rows() as u64;
            return Ok(Some(ValueBlock::Documents(matched.project(&self.projection)?)));
        }

        Ok(None)
    }

    fn num_columns_projected(&self) -> usize {
        self.columns.len()
    }

    fn execution_statistics(&self) -> ExecutionStatistics {
        ExecutionStatistics::new(
            self.num_docs_matched,
            self.num_entries_scanned_in_filter,
            self.num_docs_matched * self.columns.len() as u64,
            self.documents.num_rows() as u64,
        )
    }

    fn explain(&self) -> ExplainNode {
        let mut node = ExplainNode::new(to_upper_camel_case(EXPLAIN_NAME))
            .with_string("segment", self.segment_name.clone())
            .with_string_list("columns", self.columns.clone());
        if !self.filters.is_empty() {
            node = node.with_string_list(
                "filters",
                self.filters.iter().map(|f| f.to_string()).collect(),
            );
        }

        node.with_long("batchSize", self.batch_size as i64)
    }
}
