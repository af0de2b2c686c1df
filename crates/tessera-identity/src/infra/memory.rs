use std::collections::HashMap;
use std::sync::Arc;

use tokio::sync::RwLock;

use crate::domain::backend::{DocumentBackend, DocumentFilter, StoredDocument, WriteKind, WriteOp};
use crate::error::IdentityError;

type Collections = HashMap<String, Vec<StoredDocument>>;

/// Process-local backend. Clones share the same documents.
#[derive(Debug, Clone, Default)]
pub struct MemoryDocumentBackend {
    collections: Arc<RwLock<Collections>>,
}

impl MemoryDocumentBackend {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of documents stored in `collection`.
    pub async fn len(&self, collection: &str) -> usize {
        self.collections
            .read()
            .await
            .get(collection)
            .map_or(0, Vec::len)
    }

    pub async fn is_empty(&self, collection: &str) -> bool {
        self.len(collection).await == 0
    }
}

fn stamp_matches(document: &StoredDocument, expected: Option<&str>) -> bool {
    expected.is_none_or(|expected| document.stamp.as_deref() == Some(expected))
}

fn apply(collections: &mut Collections, op: WriteOp) -> Result<(), IdentityError> {
    let documents = collections.entry(op.collection.clone()).or_default();
    let position = documents
        .iter()
        .position(|d| d.id == op.document_id());
    let conflict = || IdentityError::ConcurrencyConflict {
        collection: op.collection.clone(),
        id: op.document_id().to_owned(),
    };

    match &op.kind {
        WriteKind::Insert(document) => {
            if position.is_some() {
                return Err(IdentityError::DuplicateKey {
                    collection: op.collection.clone(),
                    id: document.id.clone(),
                });
            }
            documents.push(document.clone());
        }
        WriteKind::Replace {
            document,
            expected_stamp,
        } => {
            let index = position.ok_or_else(conflict)?;
            if !stamp_matches(&documents[index], expected_stamp.as_deref()) {
                return Err(conflict());
            }
            documents[index] = document.clone();
        }
        WriteKind::Delete { expected_stamp, .. } => match position {
            None if expected_stamp.is_none() => {}
            None => return Err(conflict()),
            Some(index) => {
                if !stamp_matches(&documents[index], expected_stamp.as_deref()) {
                    return Err(conflict());
                }
                documents.remove(index);
            }
        },
    }
    Ok(())
}

impl DocumentBackend for MemoryDocumentBackend {
    async fn find(
        &self,
        collection: &str,
        id: &str,
    ) -> Result<Option<StoredDocument>, IdentityError> {
        Ok(self
            .collections
            .read()
            .await
            .get(collection)
            .and_then(|documents| documents.iter().find(|d| d.id == id).cloned()))
    }

    async fn scan(&self, collection: &str) -> Result<Vec<StoredDocument>, IdentityError> {
        Ok(self
            .collections
            .read()
            .await
            .get(collection)
            .cloned()
            .unwrap_or_default())
    }

    async fn query(
        &self,
        collection: &str,
        filter: &DocumentFilter,
    ) -> Result<Vec<StoredDocument>, IdentityError> {
        Ok(self
            .collections
            .read()
            .await
            .get(collection)
            .map(|documents| {
                documents
                    .iter()
                    .filter(|d| filter.matches(&d.body))
                    .cloned()
                    .collect()
            })
            .unwrap_or_default())
    }

    async fn write(&self, ops: Vec<WriteOp>) -> Result<(), IdentityError> {
        let mut collections = self.collections.write().await;
        // Apply to a copy so a failing op leaves nothing behind.
        let mut staged = collections.clone();
        let operations = ops.len();
        for op in ops {
            apply(&mut staged, op)?;
        }
        *collections = staged;
        tracing::debug!(operations, "wrote identity documents");
        Ok(())
    }
}
