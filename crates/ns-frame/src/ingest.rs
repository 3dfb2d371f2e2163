//! Parquet → [`Frame`] source columns.
//!
//! Every numeric or boolean top-level column is cast to `f64`; nulls become
//! `NaN`. Other columns (strings, lists, structs) are skipped.

use std::fs::File;
use std::path::Path;

use arrow::array::{Array, AsArray};
use arrow::compute::cast;
use arrow::datatypes::{DataType, Float64Type};
use arrow::record_batch::RecordBatch;
use indexmap::IndexMap;
use ns_core::{Error, Result};
use parquet::arrow::arrow_reader::ParquetRecordBatchReaderBuilder;

use crate::frame::Frame;

fn is_numeric(dt: &DataType) -> bool {
    matches!(
        dt,
        DataType::Boolean
            | DataType::Int8
            | DataType::Int16
            | DataType::Int32
            | DataType::Int64
            | DataType::UInt8
            | DataType::UInt16
            | DataType::UInt32
            | DataType::UInt64
            | DataType::Float16
            | DataType::Float32
            | DataType::Float64
    )
}

/// Read a Parquet file into Arrow RecordBatches.
pub fn read_parquet_batches(path: &Path) -> Result<Vec<RecordBatch>> {
    let file = File::open(path)?;
    let builder = ParquetRecordBatchReaderBuilder::try_new(file)
        .map_err(|e| Error::Parquet(format!("{}: {e}", path.display())))?;
    let reader = builder.build().map_err(|e| Error::Parquet(e.to_string()))?;
    reader
        .collect::<std::result::Result<Vec<_>, _>>()
        .map_err(|e| Error::Parquet(format!("{}: {e}", path.display())))
}

/// Collect numeric columns of `batches` as `f64` vectors, in schema order.
pub fn batches_to_columns(batches: &[RecordBatch]) -> Result<IndexMap<String, Vec<f64>>> {
    let mut out: IndexMap<String, Vec<f64>> = IndexMap::new();
    let Some(first) = batches.first() else {
        return Ok(out);
    };
    let schema = first.schema();
    for field in schema.fields() {
        if is_numeric(field.data_type()) {
            out.insert(field.name().clone(), Vec::new());
        } else {
            tracing::debug!(column = %field.name(), data_type = %field.data_type(), "skipping non-numeric column");
        }
    }

    for batch in batches {
        for (name, values) in out.iter_mut() {
            let array = batch
                .column_by_name(name)
                .ok_or_else(|| Error::MissingColumn(name.clone()))?;
            let as_f64 = cast(array.as_ref(), &DataType::Float64)
                .map_err(|e| Error::Parquet(format!("casting '{name}': {e}")))?;
            let prim = as_f64.as_primitive::<Float64Type>();
            values.reserve(prim.len());
            for i in 0..prim.len() {
                values.push(if prim.is_null(i) { f64::NAN } else { prim.value(i) });
            }
        }
    }
    Ok(out)
}

impl Frame {
    /// Load every numeric column of a Parquet file as a source column.
    pub fn from_parquet(path: &Path) -> Result<Self> {
        let batches = read_parquet_batches(path)?;
        let columns = batches_to_columns(&batches)?;
        tracing::info!(
            path = %path.display(),
            columns = columns.len(),
            rows = columns.values().next().map(Vec::len).unwrap_or(0),
            "parquet input loaded"
        );
        Frame::from_columns(columns)
    }
}
