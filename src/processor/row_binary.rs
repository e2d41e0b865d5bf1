//! RowBinary family processor.

use std::sync::{Arc, Mutex, PoisonError};

use zerocopy::FromBytes;
use zerocopy::byteorder::little_endian::{F32, F64, I16, I32, I64, U16, U32, U64};

use crate::column::{Column, DataType};
use crate::config::Config;
use crate::error::{Error, Result};
use crate::format::Format;
use crate::input::InputConnection;
use crate::record::Record;
use crate::value::Value;

use super::buffer::ReadBuffer;
use super::{CreateError, Processor, merge_header};

struct State {
    buffer: ReadBuffer,
    rows: u64,
    finished: bool,
}

/// Processor for `RowBinary` and `RowBinaryWithNamesAndTypes`.
///
/// Plain `RowBinary` carries no schema, so column hints are required.
pub struct RowBinaryProcessor {
    input: Box<dyn InputConnection>,
    columns: Arc<[Column]>,
    state: Mutex<State>,
}

impl RowBinaryProcessor {
    /// Bind to `input`, reading the header first for `RowBinaryWithNamesAndTypes`.
    pub fn new(
        config: &Config,
        input: Box<dyn InputConnection>,
        columns: Option<Vec<Column>>,
    ) -> core::result::Result<Self, CreateError> {
        let mut buffer = ReadBuffer::new(config.buffer_size);
        let columns = match resolve_columns(input.as_ref(), &mut buffer, config.format, columns) {
            Ok(columns) => columns,
            Err(error) => return Err(CreateError::new(error, input)),
        };

        Ok(Self {
            input,
            columns: columns.into(),
            state: Mutex::new(State {
                buffer,
                rows: 0,
                finished: false,
            }),
        })
    }

    fn read_record(&self, state: &mut State) -> Result<Option<Record>> {
        let input = self.input.as_ref();
        if !state.buffer.has_data(input)? {
            return Ok(None);
        }
        state.rows += 1;
        let mut values = Vec::with_capacity(self.columns.len());
        for column in self.columns.iter() {
            let value = read_value(&mut state.buffer, input, column).map_err(|e| match e {
                Error::Protocol(msg) => Error::Protocol(format!(
                    "row {}, column {}: {}",
                    state.rows,
                    column.name(),
                    msg
                )),
                other => other,
            })?;
            values.push(value);
        }
        Ok(Some(Record::new(Arc::clone(&self.columns), values)))
    }
}

impl Processor for RowBinaryProcessor {
    fn columns(&self) -> &[Column] {
        &self.columns
    }

    fn input(&self) -> &dyn InputConnection {
        self.input.as_ref()
    }

    fn next_record(&self) -> Result<Option<Record>> {
        let mut state = self.state.lock().unwrap_or_else(PoisonError::into_inner);
        if state.finished {
            return Ok(None);
        }
        let result = self.read_record(&mut state);
        if !matches!(result, Ok(Some(_))) {
            state.finished = true;
        }
        result
    }
}

fn resolve_columns(
    input: &dyn InputConnection,
    buffer: &mut ReadBuffer,
    format: Format,
    hints: Option<Vec<Column>>,
) -> Result<Vec<Column>> {
    let hints = hints.filter(|h| !h.is_empty());
    let columns = match format {
        Format::RowBinary => hints.ok_or_else(|| {
            Error::InvalidUsage("RowBinary needs column hints, the stream has no header".into())
        })?,
        Format::RowBinaryWithNamesAndTypes => {
            let header = read_header(input, buffer)?;
            merge_header(header, hints, true)?
        }
        other => {
            return Err(Error::InvalidUsage(format!(
                "{} is not a RowBinary format",
                other
            )));
        }
    };

    if let Some(column) = columns.iter().find(|c| !is_supported(c.data_type())) {
        return Err(Error::Unsupported(format!(
            "type {} of column {} cannot be read from RowBinary",
            column.type_name(),
            column.name()
        )));
    }
    Ok(columns)
}

fn is_supported(data_type: &DataType) -> bool {
    data_type.fixed_width().is_some() || *data_type == DataType::String
}

fn read_header(input: &dyn InputConnection, buffer: &mut ReadBuffer) -> Result<Vec<Column>> {
    let count = buffer.read_varint(input)?;
    let count = usize::try_from(count)
        .map_err(|_| Error::Protocol(format!("invalid column count: {}", count)))?;
    let mut names = Vec::new();
    for _ in 0..count {
        names.push(read_string(buffer, input)?);
    }
    let mut columns = Vec::with_capacity(names.len());
    for name in names {
        let type_name = read_string(buffer, input)?;
        columns.push(Column::of(name, &type_name));
    }
    Ok(columns)
}

fn read_string(buffer: &mut ReadBuffer, input: &dyn InputConnection) -> Result<String> {
    let bytes = buffer.read_prefixed(input)?;
    simdutf8::compat::from_utf8(bytes)
        .map(str::to_owned)
        .map_err(|e| Error::Decode(format!("invalid UTF-8: {}", e)))
}

fn read_value(
    buffer: &mut ReadBuffer,
    input: &dyn InputConnection,
    column: &Column,
) -> Result<Value> {
    if column.is_nullable() && buffer.read_u8(input)? != 0 {
        return Ok(Value::Null);
    }
    let value = match column.data_type() {
        DataType::Bool => Value::Bool(buffer.read_u8(input)? != 0),
        DataType::Int8 => Value::Int(i64::from(i8::from_le_bytes([buffer.read_u8(input)?]))),
        DataType::Int16 => {
            Value::Int(i64::from(I16::ref_from_bytes(buffer.take(input, 2)?)?.get()))
        }
        DataType::Int32 => {
            Value::Int(i64::from(I32::ref_from_bytes(buffer.take(input, 4)?)?.get()))
        }
        DataType::Int64 => Value::Int(I64::ref_from_bytes(buffer.take(input, 8)?)?.get()),
        DataType::UInt8 => Value::UInt(u64::from(buffer.read_u8(input)?)),
        DataType::UInt16 => {
            Value::UInt(u64::from(U16::ref_from_bytes(buffer.take(input, 2)?)?.get()))
        }
        DataType::UInt32 => {
            Value::UInt(u64::from(U32::ref_from_bytes(buffer.take(input, 4)?)?.get()))
        }
        DataType::UInt64 => Value::UInt(U64::ref_from_bytes(buffer.take(input, 8)?)?.get()),
        DataType::Float32 => {
            Value::Float(f64::from(F32::ref_from_bytes(buffer.take(input, 4)?)?.get()))
        }
        DataType::Float64 => Value::Float(F64::ref_from_bytes(buffer.take(input, 8)?)?.get()),
        DataType::String => Value::String(read_string(buffer, input)?),
        DataType::Other(name) => {
            return Err(Error::Unsupported(format!(
                "type {} cannot be read from RowBinary",
                name
            )));
        }
    };
    Ok(value)
}
