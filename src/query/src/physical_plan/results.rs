use std::sync::Arc;

use arrow::array::ArrayRef;
use arrow::datatypes::Field;
use arrow::datatypes::Schema;
use arrow::record_batch::RecordBatch;
use arrow::record_batch::RecordBatchOptions;
use datafusion_common::ScalarValue;

use crate::context::QueryContext;
use crate::error::QueryError;
use crate::error::Result;
use crate::physical_plan::expressions::aggregate::Accumulator;
use crate::physical_plan::expressions::aggregate::AggregationFunction;

/// Per-segment aggregation result: one accumulator per function, in function order.
#[derive(Debug, Clone)]
pub struct AggregationResultsBlock {
    functions: Vec<Arc<dyn AggregationFunction>>,
    results: Vec<Accumulator>,
    query_context: Arc<QueryContext>,
}

impl AggregationResultsBlock {
    pub fn try_new(
        functions: Vec<Arc<dyn AggregationFunction>>,
        results: Vec<Accumulator>,
        query_context: Arc<QueryContext>,
    ) -> Result<Self> {
        if functions.len() != results.len() {
            return Err(QueryError::Internal(format!(
                "{} aggregation functions but {} results",
                functions.len(),
                results.len()
            )));
        }

        Ok(Self {
            functions,
            results,
            query_context,
        })
    }

    pub fn functions(&self) -> &[Arc<dyn AggregationFunction>] {
        &self.functions
    }

    /// Intermediate results, mergeable with other segments' results.
    pub fn results(&self) -> &[Accumulator] {
        &self.results
    }

    pub fn query_context(&self) -> &Arc<QueryContext> {
        &self.query_context
    }

    pub fn final_results(&self) -> Result<Vec<ScalarValue>> {
        self.functions
            .iter()
            .zip(self.results.iter())
            .map(|(f, acc)| f.evaluate(acc))
            .collect()
    }

    /// Single row, one column per function named after its explain string.
    pub fn to_record_batch(&self) -> Result<RecordBatch> {
        let fields = self
            .functions
            .iter()
            .map(|f| Field::new(f.to_explain_string(), f.result_type(), true))
            .collect::<Vec<_>>();
        let arrays = self
            .final_results()?
            .iter()
            .map(|v| v.to_array_of_size(1))
            .collect::<std::result::Result<Vec<ArrayRef>, _>>()?;

        Ok(RecordBatch::try_new_with_options(
            Arc::new(Schema::new(fields)),
            arrays,
            &RecordBatchOptions::new().with_row_count(Some(1)),
        )?)
    }
}
