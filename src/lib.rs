//! Lifecycle management for streaming query responses.
//!
//! # Features
//!
//! - **Owned connections**: A [`ResponseStream`] owns its input connection and
//!   releases it exactly once, on [`close`](ResponseStream::close) or on drop
//! - **Drain before close**: Unread bytes are skipped before the connection is
//!   closed, so an abandoned response leaves the transport in a clean state
//! - **Concurrent close**: A supervisor may close a response while another
//!   thread iterates its records
//! - **Built-in processors**: TabSeparated and RowBinary families, or bring
//!   your own through [`ProcessorFactory`]
//!
//! # Example
//!
//! ```
//! use std::sync::Arc;
//! use zero_stream::{BytesInput, Column, Config, Format, ResponseStream};
//!
//! fn main() -> zero_stream::Result<()> {
//!     let config = Arc::new(Config::with_format(Format::TabSeparated));
//!     let response = ResponseStream::builder(config, BytesInput::new("1\talice\n2\tbob\n"))
//!         .columns(vec![Column::of("id", "UInt32"), Column::of("name", "String")])
//!         .query_id("q-1")
//!         .build()?;
//!
//!     for row in response.records_as::<(u32, String)>()? {
//!         let (id, name) = row?;
//!         println!("{}: {}", id, name);
//!     }
//!
//!     response.close();
//!     Ok(())
//! }
//! ```

pub mod column;
pub mod config;
pub mod error;
pub mod format;
pub mod input;
pub mod processor;
pub mod record;
pub mod response;
pub mod summary;
pub mod value;

pub use column::{Column, DataType, default_columns};
pub use config::{Config, Settings};
pub use error::{Error, Result};
pub use format::Format;
pub use input::{BytesInput, ConnectionReader, InputConnection, ReaderInput, SocketInput};
pub use processor::{CreateError, DefaultProcessorFactory, Processor, ProcessorFactory};
pub use record::{FromRecord, Record};
pub use response::{Records, RecordsAs, ResponseStream, ResponseStreamBuilder};
pub use summary::ResponseSummary;
pub use value::{FromValue, Value};
