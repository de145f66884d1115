//! Prepared-statement identity and lifecycle (SPEC_FULL.md §4.5).
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;

use crate::data::RowInfo;

type AtomicId = AtomicU32;

/// A generated frontend object name (`q00001`-style), or the empty "unnamed"
/// statement/portal.
#[derive(Clone, PartialEq, Eq)]
pub struct Id(String);

impl Id {
    fn unnamed() -> Self {
        Self(String::new())
    }

    fn next(atomic: &AtomicId) -> Self {
        let id = atomic.fetch_add(1, Ordering::SeqCst);
        Self(format!("q{id:05}"))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn is_unnamed(&self) -> bool {
        self.0.is_empty()
    }
}

impl std::fmt::Display for Id {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

impl std::fmt::Debug for Id {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_tuple("Id").field(&self.0).finish()
    }
}

impl AsRef<str> for Id {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

macro_rules! delegate {
    ($name:ident) => {
        #[derive(Clone, PartialEq, Eq)]
        pub struct $name(Id);

        impl $name {
            pub(crate) fn unnamed() -> Self {
                Self(Id::unnamed())
            }

            pub(crate) fn next() -> Self {
                static ID: AtomicId = AtomicId::new(0);
                Self(Id::next(&ID))
            }

            /// Wrap a caller-chosen wire name, e.g. one passed to
            /// [`crate::connection::Connection::prepare`].
            pub(crate) fn named(name: &str) -> Self {
                Self(Id(name.to_string()))
            }
        }

        impl std::ops::Deref for $name {
            type Target = Id;

            fn deref(&self) -> &Self::Target {
                &self.0
            }
        }

        impl std::fmt::Debug for $name {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                f.debug_tuple(stringify!($name)).field(&self.0.0).finish()
            }
        }

        impl std::fmt::Display for $name {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                std::fmt::Display::fmt(&self.0, f)
            }
        }
    };
}

delegate!(StatementName);
delegate!(PortalName);

/// Where a [`PreparedStatement`] sits in its lifecycle (SPEC_FULL.md §4.5).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StatementState {
    /// `Parse` has not yet been sent.
    Draft,
    /// `Parse`/`ParseComplete` exchanged; parameter types not yet known.
    Prepared,
    /// `Describe`/`ParameterDescription`+`RowDescription` exchanged.
    Described,
    /// At least one `Bind`/`Execute` cycle has completed against this statement.
    Executed,
    /// `Close`/`CloseComplete` exchanged, or invalidated by a session change.
    Closed,
}

/// A named (or unnamed) prepared statement and its observed metadata.
///
/// Carries the `session_epoch` it was prepared under; [`PreparedStatement::is_valid`]
/// lets a [`crate::connection::Connection`] detect that a statement outlived a
/// reconnect and must be re-prepared rather than reused.
#[derive(Debug, Clone)]
pub struct PreparedStatement {
    name: StatementName,
    sql: Arc<str>,
    state: StatementState,
    session_epoch: u64,
    param_types: Vec<u32>,
    row_info: Option<Arc<RowInfo>>,
}

impl PreparedStatement {
    /// `name`: the wire statement name the caller chose, or `""` for the unnamed
    /// statement (implicitly closed at the next `Parse` against it).
    pub(crate) fn draft(name: &str, sql: impl Into<Arc<str>>, session_epoch: u64) -> Self {
        Self {
            name: if name.is_empty() { StatementName::unnamed() } else { StatementName::named(name) },
            sql: sql.into(),
            state: StatementState::Draft,
            session_epoch,
            param_types: Vec::new(),
            row_info: None,
        }
    }

    pub fn name(&self) -> &StatementName {
        &self.name
    }

    pub fn sql(&self) -> &str {
        &self.sql
    }

    pub fn state(&self) -> StatementState {
        self.state
    }

    pub fn param_types(&self) -> &[u32] {
        &self.param_types
    }

    pub fn row_info(&self) -> Option<&Arc<RowInfo>> {
        self.row_info.as_ref()
    }

    /// `true` iff this statement was prepared under the connection's current session;
    /// `false` means it must be re-prepared (see `connection_session_expired`).
    pub fn is_valid(&self, current_session_epoch: u64) -> bool {
        self.state != StatementState::Closed && self.session_epoch == current_session_epoch
    }

    pub(crate) fn mark_prepared(&mut self) {
        self.state = StatementState::Prepared;
    }

    pub(crate) fn mark_described(&mut self, param_types: Vec<u32>, row_info: Option<Arc<RowInfo>>) {
        self.param_types = param_types;
        self.row_info = row_info;
        self.state = StatementState::Described;
    }

    pub(crate) fn mark_executed(&mut self) {
        if self.state != StatementState::Closed {
            self.state = StatementState::Executed;
        }
    }

    pub(crate) fn mark_closed(&mut self) {
        self.state = StatementState::Closed;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unnamed_statement_renders_empty() {
        let stmt = PreparedStatement::draft("", "select 1", 0);
        assert!(stmt.name().is_unnamed());
        assert_eq!(stmt.name().as_str(), "");
    }

    #[test]
    fn caller_chosen_names_round_trip() {
        let stmt = PreparedStatement::draft("plus", "select $1 + $2", 0);
        assert_eq!(stmt.name().as_str(), "plus");
    }

    #[test]
    fn auto_generated_portal_names_are_sequential_and_distinct() {
        let a = PortalName::next();
        let b = PortalName::next();
        assert_ne!(a.as_str(), b.as_str());
        assert!(a.as_str().starts_with('q'));
    }

    #[test]
    fn session_epoch_mismatch_invalidates_statement() {
        let stmt = PreparedStatement::draft("plus", "select 1", 5);
        assert!(stmt.is_valid(5));
        assert!(!stmt.is_valid(6));
    }

    #[test]
    fn closed_statement_is_never_valid() {
        let mut stmt = PreparedStatement::draft("plus", "select 1", 1);
        stmt.mark_closed();
        assert!(!stmt.is_valid(1));
    }
}
