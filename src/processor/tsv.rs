//! TabSeparated family processor.

use std::borrow::Cow;
use std::sync::{Arc, Mutex, PoisonError};

use crate::column::{Column, default_columns};
use crate::config::{Config, Settings, TSV_NULL_REPRESENTATION};
use crate::error::{Error, Result};
use crate::format::Format;
use crate::input::InputConnection;
use crate::record::Record;
use crate::value::Value;

use super::buffer::ReadBuffer;
use super::{CreateError, Processor, merge_header};

const DEFAULT_NULL_REPRESENTATION: &[u8] = b"\\N";

struct State {
    buffer: ReadBuffer,
    rows: u64,
    finished: bool,
}

/// Processor for `TabSeparated`, `TabSeparatedRaw`, `TabSeparatedWithNames`
/// and `TabSeparatedWithNamesAndTypes`.
///
/// Without a header the columns come from the caller's hints, or
/// [`default_columns`] when there are none.
pub struct TabSeparatedProcessor {
    input: Box<dyn InputConnection>,
    columns: Arc<[Column]>,
    raw: bool,
    null_representation: Vec<u8>,
    state: Mutex<State>,
}

impl TabSeparatedProcessor {
    /// Bind to `input`, reading the header first if the format has one.
    pub fn new(
        config: &Config,
        input: Box<dyn InputConnection>,
        settings: &Settings,
        columns: Option<Vec<Column>>,
    ) -> core::result::Result<Self, CreateError> {
        let format = config.format;
        let raw = format == Format::TabSeparatedRaw;
        if !matches!(
            format,
            Format::TabSeparated
                | Format::TabSeparatedRaw
                | Format::TabSeparatedWithNames
                | Format::TabSeparatedWithNamesAndTypes
        ) {
            return Err(CreateError::new(
                Error::InvalidUsage(format!("{} is not a TabSeparated format", format)),
                input,
            ));
        }

        let null_representation = settings
            .get(TSV_NULL_REPRESENTATION)
            .map_or_else(|| DEFAULT_NULL_REPRESENTATION.to_vec(), |s| s.as_bytes().to_vec());

        let mut buffer = ReadBuffer::new(config.buffer_size);
        let columns = match resolve_columns(input.as_ref(), &mut buffer, format, columns) {
            Ok(columns) => columns,
            Err(error) => return Err(CreateError::new(error, input)),
        };

        Ok(Self {
            input,
            columns: columns.into(),
            raw,
            null_representation,
            state: Mutex::new(State {
                buffer,
                rows: 0,
                finished: false,
            }),
        })
    }

    fn read_record(&self, state: &mut State) -> Result<Option<Record>> {
        let Some(line) = state.buffer.read_line(self.input.as_ref())? else {
            return Ok(None);
        };
        state.rows += 1;
        let values = self.parse_line(line).map_err(|e| match e {
            Error::Decode(msg) => Error::Decode(format!("row {}: {}", state.rows, msg)),
            Error::Protocol(msg) => Error::Protocol(format!("row {}: {}", state.rows, msg)),
            other => other,
        })?;
        Ok(Some(Record::new(Arc::clone(&self.columns), values)))
    }

    fn parse_line(&self, line: &[u8]) -> Result<Vec<Value>> {
        let mut fields = line.split(|b| *b == b'\t');
        let mut values = Vec::with_capacity(self.columns.len());
        for column in self.columns.iter() {
            let field = fields.next().ok_or_else(|| {
                Error::Protocol(format!(
                    "expected {} fields, got {}",
                    self.columns.len(),
                    values.len()
                ))
            })?;
            values.push(self.decode_field(column, field)?);
        }
        if fields.next().is_some() {
            return Err(Error::Protocol(format!(
                "expected {} fields, got more",
                self.columns.len()
            )));
        }
        Ok(values)
    }

    fn decode_field(&self, column: &Column, field: &[u8]) -> Result<Value> {
        if column.is_nullable() && field == self.null_representation.as_slice() {
            return Ok(Value::Null);
        }
        if self.raw {
            Value::from_text(column, field)
        } else {
            Value::from_text(column, &unescape(field))
        }
    }
}

impl Processor for TabSeparatedProcessor {
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
    if !format.has_header() {
        return Ok(hints.unwrap_or_else(default_columns));
    }

    let names = read_header_line(input, buffer, "names")?;
    let header = if format.has_types() {
        let types = read_header_line(input, buffer, "types")?;
        if types.len() != names.len() {
            return Err(Error::Protocol(format!(
                "header has {} names but {} types",
                names.len(),
                types.len()
            )));
        }
        names
            .into_iter()
            .zip(types)
            .map(|(name, type_name)| Column::of(name, &type_name))
            .collect()
    } else {
        names
            .into_iter()
            .map(|name| Column::of(name, "String"))
            .collect()
    };

    merge_header(header, hints, format.has_types())
}

fn read_header_line(
    input: &dyn InputConnection,
    buffer: &mut ReadBuffer,
    what: &str,
) -> Result<Vec<String>> {
    let line = buffer
        .read_line(input)?
        .ok_or_else(|| Error::Protocol(format!("stream ended before the header {} row", what)))?;
    line.split(|b| *b == b'\t')
        .map(|field| {
            let field = unescape(field);
            simdutf8::compat::from_utf8(&field)
                .map(str::to_owned)
                .map_err(|e| {
                    Error::Protocol(format!("invalid UTF-8 in header {} row: {}", what, e))
                })
        })
        .collect()
}

/// Undo TabSeparated escaping. Unknown escapes are kept verbatim.
fn unescape(field: &[u8]) -> Cow<'_, [u8]> {
    if memchr::memchr(b'\\', field).is_none() {
        return Cow::Borrowed(field);
    }
    let mut out = Vec::with_capacity(field.len());
    let mut bytes = field.iter().copied();
    while let Some(b) = bytes.next() {
        if b != b'\\' {
            out.push(b);
            continue;
        }
        match bytes.next() {
            Some(b'b') => out.push(0x08),
            Some(b'f') => out.push(0x0c),
            Some(b'r') => out.push(b'\r'),
            Some(b'n') => out.push(b'\n'),
            Some(b't') => out.push(b'\t'),
            Some(b'0') => out.push(0),
            Some(b'\'') => out.push(b'\''),
            Some(b'\\') => out.push(b'\\'),
            Some(other) => {
                out.push(b'\\');
                out.push(other);
            }
            None => out.push(b'\\'),
        }
    }
    Cow::Owned(out)
}
