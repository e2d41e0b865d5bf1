//! Processors turn the bytes of an input connection into records.
//!
//! A processor owns the connection it reads from. Creating one may fail, in
//! which case the connection is handed back inside [`CreateError`] so the
//! caller can release it.

mod buffer;
mod row_binary;
mod tsv;

use std::fmt;

use crate::column::Column;
use crate::config::{Config, Settings};
use crate::error::{Error, Result};
use crate::format::Format;
use crate::input::InputConnection;
use crate::record::Record;

pub use row_binary::RowBinaryProcessor;
pub use tsv::TabSeparatedProcessor;

/// Deserializer bound to one input connection.
pub trait Processor: Send + Sync {
    /// Resolved columns, in stream order.
    fn columns(&self) -> &[Column];

    /// The owned input connection, for raw byte access and release.
    fn input(&self) -> &dyn InputConnection;

    /// Read the next record. `Ok(None)` marks the end of the stream.
    ///
    /// Records are produced once: after `None` or an error, every further
    /// call returns `Ok(None)`.
    fn next_record(&self) -> Result<Option<Record>>;
}

/// Failure to create a processor, carrying back the connection it was given.
pub struct CreateError {
    pub error: Error,
    pub input: Box<dyn InputConnection>,
}

impl CreateError {
    pub fn new(error: Error, input: Box<dyn InputConnection>) -> Self {
        Self { error, input }
    }
}

impl fmt::Debug for CreateError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CreateError")
            .field("error", &self.error)
            .field("input_closed", &self.input.is_closed())
            .finish()
    }
}

/// Builds a processor for a connection.
pub trait ProcessorFactory: Send + Sync {
    /// Bind a processor to `input`.
    ///
    /// `columns` are hints from the caller; formats with a header may
    /// resolve their own.
    fn create(
        &self,
        config: &Config,
        input: Box<dyn InputConnection>,
        settings: &Settings,
        columns: Option<Vec<Column>>,
    ) -> core::result::Result<Box<dyn Processor>, CreateError>;
}

/// Factory for the built-in processors, selected by [`Config::format`].
#[derive(Debug, Clone, Copy, Default)]
pub struct DefaultProcessorFactory;

impl ProcessorFactory for DefaultProcessorFactory {
    fn create(
        &self,
        config: &Config,
        input: Box<dyn InputConnection>,
        settings: &Settings,
        columns: Option<Vec<Column>>,
    ) -> core::result::Result<Box<dyn Processor>, CreateError> {
        match config.format {
            Format::TabSeparated
            | Format::TabSeparatedRaw
            | Format::TabSeparatedWithNames
            | Format::TabSeparatedWithNamesAndTypes => {
                let processor = TabSeparatedProcessor::new(config, input, settings, columns)?;
                Ok(Box::new(processor))
            }
            Format::RowBinary | Format::RowBinaryWithNamesAndTypes => {
                let processor = RowBinaryProcessor::new(config, input, columns)?;
                Ok(Box::new(processor))
            }
            other => Err(CreateError::new(
                Error::Unsupported(format!("no processor for format {}", other)),
                input,
            )),
        }
    }
}

/// Check that a header agrees with the caller's column hints.
///
/// Names and count must match. When the header carries no types, the hints
/// contribute theirs; otherwise the header types are what the stream uses.
fn merge_header(
    header: Vec<Column>,
    hints: Option<Vec<Column>>,
    header_has_types: bool,
) -> Result<Vec<Column>> {
    let Some(hints) = hints else {
        return Ok(header);
    };
    if hints.len() != header.len() {
        return Err(Error::InvalidUsage(format!(
            "expected {} columns but the stream has {}",
            hints.len(),
            header.len()
        )));
    }
    header
        .into_iter()
        .zip(hints)
        .map(|(from_header, hint)| {
            if from_header.name() != hint.name() {
                return Err(Error::InvalidUsage(format!(
                    "column name mismatch: expected {} but the stream has {}",
                    hint.name(),
                    from_header.name()
                )));
            }
            Ok(if header_has_types { from_header } else { hint })
        })
        .collect()
}
