//! Selection change events.

use serde::{Deserialize, Serialize};

/// Origin of a selection mutation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum EventSource {
    /// Application code; the change must be pushed to the client.
    Server,
    /// A client action; the client already shows the change.
    Client,
}

impl EventSource {
    /// Returns `true` for client-sourced changes.
    pub fn is_client(self) -> bool {
        self == Self::Client
    }
}

/// An effective change of the selection.
///
/// Snapshots are consistent: `new_selection` equals `old_selection` minus
/// `removed` plus `added`, compared by identity.
#[derive(Debug, Clone, PartialEq)]
pub struct SelectionEvent<T> {
    pub added: Vec<T>,
    pub removed: Vec<T>,
    pub old_selection: Vec<T>,
    pub new_selection: Vec<T>,
    pub source: EventSource,
}

impl<T> SelectionEvent<T> {
    /// Returns `true` if the change came from the client.
    pub fn is_from_client(&self) -> bool {
        self.source.is_client()
    }
}
