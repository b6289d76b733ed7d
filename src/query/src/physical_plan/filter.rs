use arrow::array::Array;
use arrow::array::AsArray;
use arrow::array::BooleanArray;
use arrow::compute;
use arrow::compute::filter_record_batch;
use arrow::datatypes::DataType;
use arrow::datatypes::Int64Type;
use arrow::record_batch::RecordBatch;
use common::query::DimensionFilter;

use crate::error::QueryError;
use crate::error::Result;

/// Conjunction of the filters over every row of the batch. Null dimension values never match.
pub fn evaluate_filters<'a>(
    batch: &RecordBatch,
    filters: impl IntoIterator<Item = &'a DimensionFilter>,
) -> Result<BooleanArray> {
    let mut mask = BooleanArray::from(vec![true; batch.num_rows()]);
    for filter in filters {
        let col = batch.column_by_name(&filter.column).ok_or_else(|| {
            QueryError::Execution(format!("filter column {:?} not found", filter.column))
        })?;
        if col.data_type() != &DataType::Int64 {
            return Err(QueryError::Execution(format!(
                "filter column {:?} must be Int64, got {}",
                filter.column,
                col.data_type()
            )));
        }

        let matched = col
            .as_primitive::<Int64Type>()
            .iter()
            .map(|v| Some(v.is_some_and(|v| filter.operation.matches(v))))
            .collect::<BooleanArray>();
        mask = compute::and(&mask, &matched)?;
    }

    Ok(mask)
}

/// Rows of the batch that match every filter.
pub fn filter_documents(batch: &RecordBatch, filters: &[DimensionFilter]) -> Result<RecordBatch> {
    if filters.is_empty() {
        return Ok(batch.clone());
    }

    let mask = evaluate_filters(batch, filters)?;
    Ok(filter_record_batch(batch, &mask)?)
}
