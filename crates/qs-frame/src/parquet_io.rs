//! Parquet read/write for event tables.
//!
//! Numeric and boolean columns are read as `f64` (nulls become NaN). Other
//! column types are skipped; referencing one from an expression then fails
//! with [`FrameError::ColumnNotFound`].

use std::fs::File;
use std::path::Path;
use std::sync::Arc;

use arrow::array::{Array, ArrayRef, Float64Array};
use arrow::datatypes::{DataType, Field, Schema};
use arrow::record_batch::RecordBatch;
use parquet::arrow::ArrowWriter;
use parquet::arrow::arrow_reader::ParquetRecordBatchReaderBuilder;
use parquet::basic::Compression;
use parquet::file::properties::WriterProperties;

use crate::error::{FrameError, Result};
use crate::table::EventTable;

/// Read a Parquet file into an [`EventTable`].
pub fn read_table(path: &Path) -> Result<EventTable> {
    let file = File::open(path)?;
    let builder = ParquetRecordBatchReaderBuilder::try_new(file)?;

    let mut table = EventTable::new();
    for field in builder.schema().fields() {
        if is_readable(field.data_type()) {
            table.insert(field.name().clone(), Vec::new())?;
        } else {
            tracing::debug!(
                column = %field.name(),
                data_type = %field.data_type(),
                "skipping non-numeric column"
            );
        }
    }

    let reader = builder.build()?;
    for batch in reader {
        table.append(batch_to_table(&batch?)?)?;
    }
    Ok(table)
}

/// Write every column of `table` as a non-nullable `Float64` column.
pub fn write_table(path: &Path, table: &EventTable) -> Result<()> {
    let names = table.column_names();
    if names.is_empty() {
        return Err(FrameError::HistogramFill("cannot write a table without columns".into()));
    }

    let schema = Arc::new(Schema::new(
        names.iter().map(|n| Field::new(n.as_str(), DataType::Float64, false)).collect::<Vec<_>>(),
    ));
    let arrays = names
        .iter()
        .map(|n| Ok(Arc::new(Float64Array::from(table.column(n)?.to_vec())) as ArrayRef))
        .collect::<Result<Vec<_>>>()?;
    let batch = RecordBatch::try_new(Arc::clone(&schema), arrays)?;

    let props = WriterProperties::builder().set_compression(Compression::SNAPPY).build();
    let file = File::create(path)?;
    let mut writer = ArrowWriter::try_new(file, schema, Some(props))?;
    writer.write(&batch)?;
    writer.close()?;
    Ok(())
}

fn is_readable(dt: &DataType) -> bool {
    dt.is_numeric() || *dt == DataType::Boolean
}

fn batch_to_table(batch: &RecordBatch) -> Result<EventTable> {
    let schema = batch.schema();
    let mut table = EventTable::new();
    for (field, array) in schema.fields().iter().zip(batch.columns()) {
        if !is_readable(field.data_type()) {
            continue;
        }
        table.insert(field.name().clone(), column_to_f64(field.name(), array)?)?;
    }
    Ok(table)
}

fn column_to_f64(name: &str, array: &ArrayRef) -> Result<Vec<f64>> {
    let cast = arrow::compute::cast(array, &DataType::Float64)?;
    let values = cast.as_any().downcast_ref::<Float64Array>().ok_or_else(|| {
        FrameError::UnsupportedColumn {
            column: name.to_string(),
            data_type: array.data_type().to_string(),
        }
    })?;
    Ok(values.iter().map(|v| v.unwrap_or(f64::NAN)).collect())
}
