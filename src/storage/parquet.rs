use std::fs::File;
use std::path::Path;
use std::sync::Arc;

use chrono::{Duration, NaiveDate, NaiveDateTime, NaiveTime};
use parquet::{
    basic::{ConvertedType, Type as PhysicalType},
    data_type::{BoolType, ByteArray, ByteArrayType, DoubleType, Int32Type, Int64Type},
    file::{
        properties::WriterProperties,
        reader::{FileReader, SerializedFileReader},
        writer::SerializedFileWriter,
    },
    record::{reader::RowIter, Field},
    schema::{parser::parse_message_type, types::ColumnDescriptor},
};

use crate::types::error::{Error, Result};
use crate::types::{Chunk, Column, DataType, OutputSchema, Row, Value};

use super::{StorageReader, CHUNK_SIZE};

fn epoch() -> NaiveDate {
    NaiveDate::default()
}

fn epoch_time() -> NaiveDateTime {
    epoch().and_time(NaiveTime::MIN)
}

pub struct ParquetReader {
    iter: RowIter<'static>,
    schema: OutputSchema,
}

impl StorageReader for ParquetReader {
    fn next_chunk(&mut self) -> Result<Chunk> {
        let mut chunk = Chunk::default();

        for record in self.iter.by_ref() {
            let row = record
                .get_column_iter()
                .map(|(_, field)| field_to_value(field))
                .collect::<Result<Row>>()?;
            if row.len() != self.schema.len() {
                return Err(Error::Storage(format!(
                    "Expected {} columns, row has {}",
                    self.schema.len(),
                    row.len()
                )));
            }
            chunk.rows.push(row);

            if chunk.len() >= CHUNK_SIZE {
                break;
            }
        }

        Ok(chunk)
    }
}

impl ParquetReader {
    pub fn new(path: &Path, schema: OutputSchema) -> Result<ParquetReader> {
        let file = File::open(path).map_err(|e| {
            Error::Storage(format!("Could not open {} to read table data: {}", path.display(), e))
        })?;
        let reader = SerializedFileReader::new(file)?;
        Ok(ParquetReader {
            iter: reader.into_iter(),
            schema,
        })
    }

    pub fn read_metadata(path: &Path) -> Result<OutputSchema> {
        let file = File::open(path).map_err(|e| {
            Error::Storage(format!(
                "Could not open {} to read table metadata: {}",
                path.display(),
                e
            ))
        })?;
        let reader = SerializedFileReader::new(file)?;

        let columns = reader
            .metadata()
            .file_metadata()
            .schema_descr()
            .columns()
            .iter()
            .map(|descriptor| {
                Ok(Column::new(descriptor.name(), column_data_type(descriptor)?))
            })
            .collect::<Result<Vec<Column>>>()?;

        Ok(OutputSchema::new(columns))
    }
}

fn column_data_type(descriptor: &ColumnDescriptor) -> Result<DataType> {
    match (descriptor.physical_type(), descriptor.converted_type()) {
        (PhysicalType::BOOLEAN, _) => Ok(DataType::Boolean),
        (PhysicalType::INT32, ConvertedType::DATE) => Ok(DataType::Date),
        (PhysicalType::INT32, _) => Ok(DataType::Int),
        (PhysicalType::INT64, ConvertedType::TIMESTAMP_MILLIS)
        | (PhysicalType::INT64, ConvertedType::TIMESTAMP_MICROS) => Ok(DataType::Timestamp),
        (PhysicalType::INT64, _) => Ok(DataType::BigInt),
        (PhysicalType::FLOAT, _) | (PhysicalType::DOUBLE, _) => Ok(DataType::Double),
        (PhysicalType::BYTE_ARRAY, _) => Ok(DataType::Varchar),
        (physical, _) => Err(Error::Storage(format!(
            "Unsupported parquet column {} of type {}",
            descriptor.name(),
            physical
        ))),
    }
}

fn field_to_value(field: &Field) -> Result<Value> {
    let value = match field {
        Field::Null => Value::Null,
        Field::Bool(b) => Value::Bool(*b),
        Field::Byte(b) => Value::Int(*b as i32),
        Field::Short(s) => Value::Int(*s as i32),
        Field::Int(i) => Value::Int(*i),
        Field::Long(l) => Value::Long(*l),
        Field::UByte(b) => Value::Int(*b as i32),
        Field::UShort(s) => Value::Int(*s as i32),
        Field::UInt(i) => Value::Long(*i as i64),
        Field::Float(f) => Value::Double(*f as f64),
        Field::Double(d) => Value::Double(*d),
        Field::Str(s) => Value::Str(s.clone()),
        Field::Bytes(b) => Value::Str(String::from_utf8_lossy(b.data()).into_owned()),
        Field::Date(days) => epoch()
            .checked_add_signed(Duration::days(*days as i64))
            .map(Value::Date)
            .ok_or_else(|| Error::Storage(format!("Date out of range: {}", days)))?,
        Field::TimestampMillis(ms) => epoch_time()
            .checked_add_signed(Duration::milliseconds(*ms))
            .map(Value::Timestamp)
            .ok_or_else(|| Error::Storage(format!("Timestamp out of range: {}", ms)))?,
        Field::TimestampMicros(us) => epoch_time()
            .checked_add_signed(Duration::microseconds(*us))
            .map(Value::Timestamp)
            .ok_or_else(|| Error::Storage(format!("Timestamp out of range: {}", us)))?,
        other => {
            return Err(Error::Storage(format!(
                "Unsupported parquet value: {}",
                other
            )))
        }
    };
    Ok(value)
}

fn message_type(schema: &OutputSchema) -> String {
    let fields = schema
        .columns
        .iter()
        .map(|column| {
            let name = &column.name;
            match column.data_type.unwrap_or(DataType::Varchar) {
                DataType::Boolean => format!("OPTIONAL BOOLEAN {};", name),
                DataType::Int => format!("OPTIONAL INT32 {};", name),
                DataType::BigInt => format!("OPTIONAL INT64 {};", name),
                DataType::Double => format!("OPTIONAL DOUBLE {};", name),
                DataType::Varchar => format!("OPTIONAL BYTE_ARRAY {} (UTF8);", name),
                DataType::Date => format!("OPTIONAL INT32 {} (DATE);", name),
                DataType::Timestamp => format!("OPTIONAL INT64 {} (TIMESTAMP_MICROS);", name),
            }
        })
        .collect::<Vec<String>>()
        .join("\n  ");
    format!("message schema {{\n  {}\n}}", fields)
}

fn mismatch(column: &Column, value: &Value) -> Error {
    Error::Storage(format!(
        "Value {} does not fit column {} ({:?})",
        value, column.name, column.data_type
    ))
}

/// Non-null values of column `index`, converted with `convert`.
fn present<T>(
    rows: &[Row],
    index: usize,
    column: &Column,
    convert: impl Fn(&Value) -> Option<T>,
) -> Result<Vec<T>> {
    rows.iter()
        .map(|row| &row[index])
        .filter(|value| !value.is_null())
        .map(|value| convert(value).ok_or_else(|| mismatch(column, value)))
        .collect()
}

/// Writes `rows` as a single row group. Every column is OPTIONAL so NULLs
/// survive the round trip.
pub fn write_table(path: &Path, schema: &OutputSchema, rows: &[Row]) -> Result<()> {
    if let Some(row) = rows.iter().find(|row| row.len() != schema.len()) {
        return Err(Error::Storage(format!(
            "Row has {} values, schema has {} columns",
            row.len(),
            schema.len()
        )));
    }

    let message = message_type(schema);
    let parquet_schema = Arc::new(parse_message_type(&message)?);
    let properties = Arc::new(WriterProperties::builder().build());
    let mut writer = SerializedFileWriter::new(File::create(path)?, parquet_schema, properties)?;

    let mut row_group = writer.next_row_group()?;
    let mut index = 0;
    while let Some(mut column_writer) = row_group.next_column()? {
        let column = &schema.columns[index];
        let def_levels = rows
            .iter()
            .map(|row| if row[index].is_null() { 0 } else { 1 })
            .collect::<Vec<i16>>();

        match column.data_type.unwrap_or(DataType::Varchar) {
            DataType::Boolean => {
                let values = present(rows, index, column, |v| match v {
                    Value::Bool(b) => Some(*b),
                    _ => None,
                })?;
                column_writer
                    .typed::<BoolType>()
                    .write_batch(&values, Some(&def_levels), None)?;
            }
            DataType::Int => {
                let values = present(rows, index, column, |v| match v {
                    Value::Int(i) => Some(*i),
                    _ => None,
                })?;
                column_writer
                    .typed::<Int32Type>()
                    .write_batch(&values, Some(&def_levels), None)?;
            }
            DataType::BigInt => {
                let values = present(rows, index, column, Value::as_i64)?;
                column_writer
                    .typed::<Int64Type>()
                    .write_batch(&values, Some(&def_levels), None)?;
            }
            DataType::Double => {
                let values = present(rows, index, column, Value::as_f64)?;
                column_writer
                    .typed::<DoubleType>()
                    .write_batch(&values, Some(&def_levels), None)?;
            }
            DataType::Varchar => {
                let values = present(rows, index, column, |v| {
                    Some(ByteArray::from(v.to_string().as_str()))
                })?;
                column_writer
                    .typed::<ByteArrayType>()
                    .write_batch(&values, Some(&def_levels), None)?;
            }
            DataType::Date => {
                let values = present(rows, index, column, |v| match v {
                    Value::Date(d) => i32::try_from((*d - epoch()).num_days()).ok(),
                    _ => None,
                })?;
                column_writer
                    .typed::<Int32Type>()
                    .write_batch(&values, Some(&def_levels), None)?;
            }
            DataType::Timestamp => {
                let values = present(rows, index, column, |v| match v {
                    Value::Timestamp(ts) => (*ts - epoch_time()).num_microseconds(),
                    _ => None,
                })?;
                column_writer
                    .typed::<Int64Type>()
                    .write_batch(&values, Some(&def_levels), None)?;
            }
        }

        column_writer.close()?;
        index += 1;
    }
    row_group.close()?;
    writer.close()?;

    Ok(())
}
