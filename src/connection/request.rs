//! The FIFO request queue and the responses a caller observes per request.
use std::sync::Arc;

use crate::data::{Row, RowInfo};
use crate::protocol::backend::{CommandComplete, ErrorResponse};
use crate::statement::StatementName;

/// What kind of exchange is currently in flight, used to decide how to interpret
/// inbound frames and what `ReadyForQuery` means for bookkeeping (SPEC_FULL.md §4.6).
#[derive(Debug, Clone)]
pub(crate) enum RequestKind {
    SimpleQuery,
    Parse { name: StatementName },
    Describe { name: StatementName },
    BindExecute { name: StatementName, portal: String },
    Close { name: StatementName },
    Flush,
}

/// One item of the Connection's FIFO request queue.
pub(crate) struct PendingRequest {
    pub kind: RequestKind,
    pub row_info: Option<Arc<RowInfo>>,
}

/// A single response surfaced to the caller from [`crate::connection::Connection::wait_response`].
#[derive(Debug)]
pub enum Response {
    Row(Row),
    Completion(CommandComplete),
    /// The named statement's Parse/Describe step completed; carries no row data.
    PreparedStatementRef(StatementName),
    /// The in-flight request's `ReadyForQuery` was observed; no more responses remain
    /// for it.
    Ready,
}

/// A database-reported failure (`ErrorResponse`), distinct from client-raised errors.
#[derive(Debug, Clone)]
pub struct DatabaseError(pub ErrorResponse);

impl std::fmt::Display for DatabaseError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        self.0.fmt(f)
    }
}

impl std::error::Error for DatabaseError {}
