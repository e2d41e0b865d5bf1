//! Streaming query response.

use std::marker::PhantomData;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use crate::column::Column;
use crate::config::{Config, Settings};
use crate::error::{Error, Result};
use crate::format::Format;
use crate::input::{ConnectionReader, InputConnection};
use crate::processor::{CreateError, DefaultProcessorFactory, Processor, ProcessorFactory};
use crate::record::{FromRecord, Record};
use crate::summary::ResponseSummary;

/// A response whose body is streamed from an input connection.
///
/// The response owns the connection (through its processor) until it is
/// closed. Closing drains whatever the caller left unread, then closes the
/// connection; it never fails and only the first call has any effect.
/// Dropping an open response closes it.
///
/// All methods take `&self`, so a response can be shared through an `Arc`
/// and closed by a supervising thread while another thread reads records.
///
/// # Example
///
/// ```
/// use std::sync::Arc;
/// use zero_stream::{BytesInput, Config, ResponseStream};
///
/// let response = ResponseStream::new(
///     Arc::new(Config::default()),
///     BytesInput::new("a\nb\n"),
/// )?;
/// let rows: Vec<(String,)> = response.records_as()?.collect::<Result<_, _>>()?;
/// assert_eq!(rows, vec![("a".to_string(),), ("b".to_string(),)]);
/// response.close();
/// # Ok::<(), zero_stream::Error>(())
/// ```
pub struct ResponseStream {
    config: Arc<Config>,
    processor: Option<Box<dyn Processor>>,
    summary: Arc<ResponseSummary>,
    query_id: String,
    closing: AtomicBool,
    closed: AtomicBool,
}

impl ResponseStream {
    /// Create a response with default settings, columns, summary and query id.
    pub fn new(config: Arc<Config>, input: impl InputConnection + 'static) -> Result<Self> {
        Self::builder(config, input).build()
    }

    /// Start building a response over `input`.
    pub fn builder(
        config: Arc<Config>,
        input: impl InputConnection + 'static,
    ) -> ResponseStreamBuilder {
        ResponseStreamBuilder {
            config,
            input: Box::new(input),
            settings: None,
            columns: None,
            summary: None,
            query_id: None,
            factory: None,
        }
    }

    /// Create a response, binding `input` with `factory`.
    ///
    /// If the factory fails, the connection is closed before the error is
    /// returned. A failure to close at that point is ignored.
    pub fn with_factory(
        factory: &dyn ProcessorFactory,
        config: Arc<Config>,
        input: Box<dyn InputConnection>,
        settings: Option<&Settings>,
        columns: Option<Vec<Column>>,
        summary: Option<Arc<ResponseSummary>>,
        query_id: Option<String>,
    ) -> Result<Self> {
        let empty = Settings::new();
        let settings = settings.unwrap_or(&empty);
        let processor = match factory.create(&config, input, settings, columns) {
            Ok(processor) => processor,
            Err(CreateError { error, input }) => {
                tracing::error!(
                    "failed to create stream response, closing input stream: {}",
                    error
                );
                if let Err(e) = input.close() {
                    tracing::debug!("failed to close input stream after create error: {}", e);
                }
                return Err(error);
            }
        };

        Ok(Self {
            config,
            processor: Some(processor),
            summary: summary.unwrap_or_else(ResponseSummary::empty),
            query_id: query_id.unwrap_or_default(),
            closing: AtomicBool::new(false),
            closed: AtomicBool::new(false),
        })
    }

    /// Whether the response has been closed.
    ///
    /// Becomes true once the connection close has been attempted, not when
    /// a close starts draining.
    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::Acquire)
    }

    fn is_closing(&self) -> bool {
        self.closing.load(Ordering::Acquire)
    }

    /// Query id, empty if none was given.
    pub fn query_id(&self) -> &str {
        &self.query_id
    }

    /// Execution summary, the shared empty summary if none was given.
    pub fn summary(&self) -> &Arc<ResponseSummary> {
        &self.summary
    }

    /// Declared format of the body.
    pub fn format(&self) -> Format {
        self.config.format
    }

    /// Configuration the response was created with.
    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Columns resolved by the processor.
    pub fn columns(&self) -> Result<&[Column]> {
        Ok(self.processor()?.columns())
    }

    /// The raw input connection, bypassing record deserialization.
    ///
    /// Reading bytes here and reading records from the same response are
    /// not meant to be mixed.
    pub fn input(&self) -> Result<&dyn InputConnection> {
        Ok(self.processor()?.input())
    }

    /// The raw input connection as a `std::io::Read`.
    pub fn reader(&self) -> Result<ConnectionReader<'_>> {
        Ok(ConnectionReader::new(self.input()?))
    }

    /// Lazy, single pass iterator over the records.
    ///
    /// Reaching the end does not close the response.
    pub fn records(&self) -> Result<Records<'_>> {
        let processor = self.processor.as_deref().ok_or_else(no_processor)?;
        Ok(Records {
            response: self,
            processor,
            done: false,
        })
    }

    /// Like [`records`](Self::records), mapping each record into `T`.
    pub fn records_as<T: FromRecord>(&self) -> Result<RecordsAs<'_, T>> {
        Ok(RecordsAs {
            records: self.records()?,
            _marker: PhantomData,
        })
    }

    /// Drain and close the connection.
    ///
    /// Returns true if this call performed the release, false if the
    /// response or its connection was already closed, or another thread is
    /// closing it. Drain and close failures are logged and swallowed. After
    /// the releasing call returns the response counts as closed whatever
    /// happened.
    pub fn close(&self) -> bool {
        if self.is_closed() {
            return false;
        }
        let Some(processor) = self.processor.as_deref() else {
            self.closing.store(true, Ordering::Release);
            self.closed.store(true, Ordering::Release);
            return false;
        };
        let input = processor.input();
        if input.is_closed() {
            return false;
        }
        // First closer wins; concurrent callers return while it drains
        if self
            .closing
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .is_err()
        {
            return false;
        }

        // Closing a live stream without reading it to the end leaves the
        // transport in a bad state on slow networks
        match input.skip(u64::MAX) {
            Ok(0) => {}
            Ok(skipped) => {
                tracing::debug!("{} bytes skipped before closing input stream", skipped);
            }
            Err(e) => {
                tracing::debug!("failed to skip reading input stream due to: {}", e);
            }
        }

        if let Err(e) = input.close() {
            tracing::warn!("failed to close input stream: {}", e);
        }
        self.closed.store(true, Ordering::Release);
        true
    }

    fn processor(&self) -> Result<&dyn Processor> {
        self.processor.as_deref().ok_or_else(no_processor)
    }
}

impl Drop for ResponseStream {
    fn drop(&mut self) {
        self.close();
    }
}

impl std::fmt::Debug for ResponseStream {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ResponseStream")
            .field("format", &self.config.format)
            .field("query_id", &self.query_id)
            .field("summary", &self.summary)
            .field("closed", &self.is_closed())
            .finish_non_exhaustive()
    }
}

fn no_processor() -> Error {
    Error::Unsupported(
        "no data processor available for deserialization, use the raw input instead".into(),
    )
}

/// Builder for [`ResponseStream`], created by [`ResponseStream::builder`].
pub struct ResponseStreamBuilder {
    config: Arc<Config>,
    input: Box<dyn InputConnection>,
    settings: Option<Settings>,
    columns: Option<Vec<Column>>,
    summary: Option<Arc<ResponseSummary>>,
    query_id: Option<String>,
    factory: Option<Box<dyn ProcessorFactory>>,
}

impl ResponseStreamBuilder {
    /// Settings for the processor. Defaults to the settings in the config.
    pub fn settings(mut self, settings: Settings) -> Self {
        self.settings = Some(settings);
        self
    }

    /// Column hints.
    pub fn columns(mut self, columns: Vec<Column>) -> Self {
        self.columns = Some(columns);
        self
    }

    /// Execution summary.
    pub fn summary(mut self, summary: impl Into<Arc<ResponseSummary>>) -> Self {
        self.summary = Some(summary.into());
        self
    }

    /// Query id.
    pub fn query_id(mut self, query_id: impl Into<String>) -> Self {
        self.query_id = Some(query_id.into());
        self
    }

    /// Processor factory. Defaults to [`DefaultProcessorFactory`].
    pub fn factory(mut self, factory: impl ProcessorFactory + 'static) -> Self {
        self.factory = Some(Box::new(factory));
        self
    }

    /// Bind the processor and create the response.
    pub fn build(self) -> Result<ResponseStream> {
        let factory: &dyn ProcessorFactory = match &self.factory {
            Some(factory) => factory.as_ref(),
            None => &DefaultProcessorFactory,
        };
        let settings = self.settings.as_ref().unwrap_or(&self.config.settings);
        ResponseStream::with_factory(
            factory,
            Arc::clone(&self.config),
            self.input,
            Some(settings),
            self.columns,
            self.summary,
            self.query_id,
        )
    }
}

/// Records of a [`ResponseStream`], see [`ResponseStream::records`].
///
/// Yields `Err(Error::Closed)` once if the response is closed, or starts
/// closing, underneath it.
/// Ends after the first error.
pub struct Records<'a> {
    response: &'a ResponseStream,
    processor: &'a dyn Processor,
    done: bool,
}

impl Records<'_> {
    /// Columns of the records.
    pub fn columns(&self) -> &[Column] {
        self.processor.columns()
    }
}

impl Iterator for Records<'_> {
    type Item = Result<Record>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.done {
            return None;
        }
        if self.response.is_closing() {
            self.done = true;
            return Some(Err(Error::Closed));
        }
        match self.processor.next_record() {
            Ok(Some(record)) => Some(Ok(record)),
            Ok(None) => {
                self.done = true;
                None
            }
            Err(e) => {
                self.done = true;
                // A read that raced with close reports whatever the transport did
                if self.response.is_closing() {
                    Some(Err(Error::Closed))
                } else {
                    Some(Err(e))
                }
            }
        }
    }
}

impl std::iter::FusedIterator for Records<'_> {}

/// Records mapped into `T`, see [`ResponseStream::records_as`].
pub struct RecordsAs<'a, T> {
    records: Records<'a>,
    _marker: PhantomData<fn() -> T>,
}

impl<T: FromRecord> Iterator for RecordsAs<'_, T> {
    type Item = Result<T>;

    fn next(&mut self) -> Option<Self::Item> {
        let item = self.records.next()?.and_then(T::from_record);
        if item.is_err() {
            self.records.done = true;
        }
        Some(item)
    }
}

impl<T: FromRecord> std::iter::FusedIterator for RecordsAs<'_, T> {}
