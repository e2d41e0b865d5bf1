//! Execution summary attached to a response.

use std::sync::{Arc, LazyLock};

static EMPTY_SUMMARY: LazyLock<Arc<ResponseSummary>> =
    LazyLock::new(|| Arc::new(ResponseSummary::default()));

/// Execution statistics reported by the server for one query.
///
/// Immutable once attached to a response.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ResponseSummary {
    /// Rows read by the server
    pub read_rows: u64,
    /// Bytes read by the server
    pub read_bytes: u64,
    /// Rows written by the server
    pub written_rows: u64,
    /// Bytes written by the server
    pub written_bytes: u64,
    /// Estimated total rows to read
    pub total_rows_to_read: u64,
    /// Rows in the result
    pub result_rows: u64,
    /// Bytes in the result
    pub result_bytes: u64,
    /// Server-side elapsed time in nanoseconds
    pub elapsed_ns: u64,
}

impl ResponseSummary {
    /// The shared empty summary used when none is supplied.
    pub fn empty() -> Arc<ResponseSummary> {
        Arc::clone(&EMPTY_SUMMARY)
    }

    /// Returns true if all statistics are zero.
    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }
}
