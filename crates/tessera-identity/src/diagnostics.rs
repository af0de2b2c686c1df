//! Hooks for observing the document traffic of a context.

use std::fmt;

/// What a context asked of its backend.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DiagnosticEvent {
    /// Primary-key lookup. `tracked` is set when the identity map answered
    /// without touching the backend.
    Find {
        collection: String,
        id: String,
        tracked: bool,
        found: bool,
    },
    /// Full read of a collection.
    Scan { collection: String, documents: usize },
    /// Filtered read; `field` names the member the backend matched on.
    Query {
        collection: String,
        field: String,
        documents: usize,
    },
    /// One `save_changes` batch.
    Commit { operations: usize },
}

pub trait DiagnosticListener: fmt::Debug + Send + Sync {
    fn on_event(&self, event: &DiagnosticEvent);
}

/// Forwards every event to `tracing` at debug level.
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingDiagnostics;

impl DiagnosticListener for TracingDiagnostics {
    fn on_event(&self, event: &DiagnosticEvent) {
        match event {
            DiagnosticEvent::Find {
                collection,
                id,
                tracked,
                found,
            } => {
                tracing::debug!(%collection, %id, tracked, found, "find document");
            }
            DiagnosticEvent::Scan {
                collection,
                documents,
            } => {
                tracing::debug!(%collection, documents, "scan collection");
            }
            DiagnosticEvent::Query {
                collection,
                field,
                documents,
            } => {
                tracing::debug!(%collection, %field, documents, "query collection");
            }
            DiagnosticEvent::Commit { operations } => {
                tracing::debug!(operations, "commit changes");
            }
        }
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct NoOpDiagnostics;

impl DiagnosticListener for NoOpDiagnostics {
    fn on_event(&self, _event: &DiagnosticEvent) {}
}
