use std::sync::Arc;

use anyhow::anyhow;
use anyhow::bail;
use arrow::array::ArrayRef;
use arrow::array::BooleanArray;
use arrow::array::Float64Array;
use arrow::array::Int32Array;
use arrow::array::Int64Array;
use arrow::array::StringArray;
use arrow::compute::concat_batches;
use arrow::datatypes::DataType;
use arrow::datatypes::Field;
use arrow::datatypes::Schema;
use arrow::datatypes::SchemaRef;
use arrow::record_batch::RecordBatch;

use crate::segment::Segment;

fn split_row(line: &str) -> Vec<&str> {
    line.trim()
        .trim_start_matches('|')
        .trim_end_matches('|')
        .split('|')
        .map(|v| v.trim())
        .collect()
}

// header cell looks like `name(type)`
fn parse_field(cell: &str) -> anyhow::Result<Field> {
    let (name, typ) = cell
        .strip_suffix(')')
        .and_then(|v| v.split_once('('))
        .ok_or_else(|| anyhow!("header cell {cell:?} must look like name(type)"))?;
    let data_type = match typ {
        "i32" => DataType::Int32,
        "i64" => DataType::Int64,
        "f64" => DataType::Float64,
        "bool" | "boolean" => DataType::Boolean,
        "utf8" | "str" => DataType::Utf8,
        other => bail!("unsupported type {other:?}"),
    };

    Ok(Field::new(name.trim(), data_type, true))
}

fn parse_opt<T: std::str::FromStr>(v: &str) -> anyhow::Result<Option<T>>
where T::Err: std::error::Error + Send + Sync + 'static {
    if v.is_empty() {
        return Ok(None);
    }

    Ok(Some(v.parse::<T>()?))
}

fn build_batch(schema: &SchemaRef, rows: &[Vec<&str>]) -> anyhow::Result<RecordBatch> {
    let cols = schema
        .fields()
        .iter()
        .enumerate()
        .map(|(idx, field)| {
            let cells = rows.iter().map(|row| row[idx]);
            let arr: ArrayRef = match field.data_type() {
                DataType::Int32 => Arc::new(Int32Array::from(
                    cells.map(parse_opt::<i32>).collect::<anyhow::Result<Vec<_>>>()?,
                )),
                DataType::Int64 => Arc::new(Int64Array::from(
                    cells.map(parse_opt::<i64>).collect::<anyhow::Result<Vec<_>>>()?,
                )),
                DataType::Float64 => Arc::new(Float64Array::from(
                    cells.map(parse_opt::<f64>).collect::<anyhow::Result<Vec<_>>>()?,
                )),
                DataType::Boolean => Arc::new(BooleanArray::from(
                    cells.map(parse_opt::<bool>).collect::<anyhow::Result<Vec<_>>>()?,
                )),
                DataType::Utf8 => Arc::new(StringArray::from(
                    cells
                        .map(|v| if v.is_empty() { None } else { Some(v) })
                        .collect::<Vec<_>>(),
                )),
                _ => unreachable!(),
            };
            Ok(arr)
        })
        .collect::<anyhow::Result<Vec<_>>>()?;

    Ok(RecordBatch::try_new(schema.clone(), cols)?)
}

// Parses a markdown table into record batches.
//  * Header cells are `name(type)`, types: i32, i64, f64, bool, utf8
//  * Empty cells are nulls
//  * A row of empty cells (`||||`) starts a new batch
//
// # Example
//     let data = r#"
// | user_id(i64) | device(utf8) | v(i64) |
// |--------------|--------------|--------|
// | 0            | iphone       | 1      |
// ||||
// | 1            |              | 0      |
// "#;
//     let batches = parse_markdown_tables(data)?; // two batches
pub fn parse_markdown_tables(data: &str) -> anyhow::Result<Vec<RecordBatch>> {
    let mut lines = data.lines().map(|l| l.trim()).filter(|l| !l.is_empty());
    let header = lines.next().ok_or_else(|| anyhow!("empty table"))?;
    let fields = split_row(header)
        .into_iter()
        .map(parse_field)
        .collect::<anyhow::Result<Vec<_>>>()?;
    let schema = Arc::new(Schema::new(fields));
    // separator
    lines.next();

    let mut batches = vec![];
    let mut rows: Vec<Vec<&str>> = vec![];
    for line in lines {
        let cells = split_row(line);
        if cells.iter().all(|c| c.is_empty()) {
            if !rows.is_empty() {
                batches.push(build_batch(&schema, &rows)?);
                rows.clear();
            }
            continue;
        }
        if cells.len() != schema.fields().len() {
            bail!(
                "row {line:?} has {} cells, expected {}",
                cells.len(),
                schema.fields().len()
            );
        }
        rows.push(cells);
    }
    if !rows.is_empty() {
        batches.push(build_batch(&schema, &rows)?);
    }

    Ok(batches)
}

/// Segment holding all rows of a markdown table.
pub fn segment_from_markdown(name: &str, data: &str) -> anyhow::Result<Segment> {
    let batches = parse_markdown_tables(data)?;
    let schema = batches
        .first()
        .map(|b| b.schema())
        .ok_or_else(|| anyhow!("table has no rows"))?;

    Ok(Segment::new(name, concat_batches(&schema, &batches)?))
}
