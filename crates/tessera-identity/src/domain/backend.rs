#![allow(async_fn_in_trait)]

use crate::error::IdentityError;

/// A document as held by the backing store.
#[derive(Debug, Clone, PartialEq)]
pub struct StoredDocument {
    pub id: String,
    pub body: serde_json::Value,
    /// Concurrency stamp of this version, used to guard replace and delete.
    pub stamp: Option<String>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum WriteKind {
    /// Fails with `DuplicateKey` when the id is taken.
    Insert(StoredDocument),
    /// Fails with `ConcurrencyConflict` when the document is missing or its
    /// stamp differs from `expected_stamp`. `None` skips the stamp check.
    Replace {
        document: StoredDocument,
        expected_stamp: Option<String>,
    },
    /// A missing document is a no-op when `expected_stamp` is `None` and a
    /// conflict otherwise.
    Delete {
        id: String,
        expected_stamp: Option<String>,
    },
}

#[derive(Debug, Clone, PartialEq)]
pub struct WriteOp {
    pub collection: String,
    pub kind: WriteKind,
}

impl WriteOp {
    pub fn document_id(&self) -> &str {
        match &self.kind {
            WriteKind::Insert(document) | WriteKind::Replace { document, .. } => &document.id,
            WriteKind::Delete { id, .. } => id,
        }
    }
}

/// Server-side selection of documents by the content of one top-level field.
#[derive(Debug, Clone, PartialEq)]
pub enum DocumentFilter {
    /// `field` equals `value`, or `field` is an array holding `value`.
    Eq {
        field: String,
        value: serde_json::Value,
    },
    /// `field` is an array with an object element whose listed members all
    /// equal the given values.
    ElemMatch {
        field: String,
        members: serde_json::Map<String, serde_json::Value>,
    },
}

impl DocumentFilter {
    pub fn eq(field: &str, value: impl Into<serde_json::Value>) -> Self {
        Self::Eq {
            field: field.to_owned(),
            value: value.into(),
        }
    }

    pub fn elem_match<'a>(
        field: &str,
        members: impl IntoIterator<Item = (&'a str, serde_json::Value)>,
    ) -> Self {
        Self::ElemMatch {
            field: field.to_owned(),
            members: members
                .into_iter()
                .map(|(name, value)| (name.to_owned(), value))
                .collect(),
        }
    }

    pub fn field(&self) -> &str {
        match self {
            Self::Eq { field, .. } | Self::ElemMatch { field, .. } => field,
        }
    }

    /// Evaluate the filter against a document body.
    pub fn matches(&self, body: &serde_json::Value) -> bool {
        let Some(target) = body.get(self.field()) else {
            return false;
        };
        match self {
            Self::Eq { value, .. } => match target {
                serde_json::Value::Array(items) => target == value || items.contains(value),
                _ => target == value,
            },
            Self::ElemMatch { members, .. } => target.as_array().is_some_and(|items| {
                items.iter().any(|item| {
                    members
                        .iter()
                        .all(|(name, value)| item.get(name) == Some(value))
                })
            }),
        }
    }
}

/// Port to the document database.
pub trait DocumentBackend: Send + Sync + 'static {
    async fn find(
        &self,
        collection: &str,
        id: &str,
    ) -> Result<Option<StoredDocument>, IdentityError>;

    /// Every document in the collection, in insertion order.
    async fn scan(&self, collection: &str) -> Result<Vec<StoredDocument>, IdentityError>;

    /// Documents of the collection selected by `filter`, in insertion order.
    async fn query(
        &self,
        collection: &str,
        filter: &DocumentFilter,
    ) -> Result<Vec<StoredDocument>, IdentityError>;

    /// Apply the batch atomically: either every operation lands or none does.
    async fn write(&self, ops: Vec<WriteOp>) -> Result<(), IdentityError>;
}
