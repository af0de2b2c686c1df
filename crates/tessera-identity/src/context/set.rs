use std::collections::HashSet;
use std::marker::PhantomData;

use anyhow::Context as _;
use serde::Deserialize;

use crate::diagnostics::DiagnosticEvent;
use crate::domain::backend::{DocumentBackend, DocumentFilter, StoredDocument};
use crate::error::IdentityError;

use super::tracker::Tracked;
use super::{Document, IdentityContext};

/// Typed view over one collection of a context.
///
/// Predicate queries read the whole collection; [`DocumentSet::query`] lets
/// the backend select documents first. Either way results are merged with
/// the identity map and predicates run on the merged entities.
pub struct DocumentSet<'a, B, D> {
    context: &'a IdentityContext<B>,
    collection: &'a str,
    _marker: PhantomData<fn() -> D>,
}

impl<'a, B: DocumentBackend, D: Document> DocumentSet<'a, B, D> {
    pub(super) fn new(context: &'a IdentityContext<B>, collection: &'a str) -> Self {
        Self {
            context,
            collection,
            _marker: PhantomData,
        }
    }

    pub fn collection(&self) -> &str {
        self.collection
    }

    fn encode(entity: &D) -> Result<StoredDocument, IdentityError> {
        let body = serde_json::to_value(entity).context("encode identity document")?;
        Ok(StoredDocument {
            id: entity.id().to_string(),
            body,
            stamp: entity.concurrency_stamp().map(str::to_owned),
        })
    }

    fn decode(document: &StoredDocument) -> Result<D, IdentityError> {
        let entity = D::deserialize(&document.body)
            .with_context(|| format!("decode identity document {}", document.id))?;
        Ok(entity)
    }

    /// Stage an insert.
    pub async fn add(&self, entity: &D) -> Result<(), IdentityError> {
        let document = Self::encode(entity)?;
        self.context
            .tracker
            .lock()
            .await
            .stage_add(self.collection, document)
    }

    /// Stage a replace guarded by the stamp the context last saw for this
    /// document, or the entity's own stamp when it is not tracked.
    pub async fn update(&self, entity: &D) -> Result<(), IdentityError> {
        let document = Self::encode(entity)?;
        let mut tracker = self.context.tracker.lock().await;
        let expected = match tracker.lookup(self.collection, &document.id) {
            Tracked::Present(tracked) => tracked.stamp.clone(),
            _ => document.stamp.clone(),
        };
        tracker.stage_update(self.collection, document, expected)
    }

    /// Stage a replace guarded by an explicit stamp.
    pub async fn update_with_stamp(
        &self,
        entity: &D,
        expected_stamp: Option<String>,
    ) -> Result<(), IdentityError> {
        let document = Self::encode(entity)?;
        self.context
            .tracker
            .lock()
            .await
            .stage_update(self.collection, document, expected_stamp)
    }

    /// Stage a delete guarded by the entity's stamp.
    pub async fn remove(&self, entity: &D) -> Result<(), IdentityError> {
        let id = entity.id().to_string();
        let expected = entity.concurrency_stamp().map(str::to_owned);
        self.context
            .tracker
            .lock()
            .await
            .stage_remove(self.collection, &id, expected);
        Ok(())
    }

    /// Record in-memory edits to an entity this context already tracks, so
    /// the next save writes them. Returns `false` for untracked entities.
    pub async fn track(&self, entity: &D) -> Result<bool, IdentityError> {
        let document = Self::encode(entity)?;
        Ok(self
            .context
            .tracker
            .lock()
            .await
            .stage_tracked(self.collection, document))
    }

    pub async fn detach(&self, id: &D::Key) {
        self.context.detach(self.collection, &id.to_string()).await;
    }

    /// Primary-key lookup, answered from the identity map when possible.
    pub async fn find(&self, id: &D::Key) -> Result<Option<D>, IdentityError> {
        let id = id.to_string();
        {
            let tracker = self.context.tracker.lock().await;
            match tracker.lookup(self.collection, &id) {
                Tracked::Present(document) => {
                    self.context.emit(DiagnosticEvent::Find {
                        collection: self.collection.to_owned(),
                        id,
                        tracked: true,
                        found: true,
                    });
                    return Self::decode(document).map(Some);
                }
                Tracked::Deleted => return Ok(None),
                Tracked::Untracked => {}
            }
        }

        let found = self.context.backend.find(self.collection, &id).await?;
        self.context.emit(DiagnosticEvent::Find {
            collection: self.collection.to_owned(),
            id: id.clone(),
            tracked: false,
            found: found.is_some(),
        });
        let Some(document) = found else {
            return Ok(None);
        };
        let mut tracker = self.context.tracker.lock().await;
        tracker.attach(self.collection, document);
        match tracker.lookup(self.collection, &id) {
            Tracked::Present(document) => Self::decode(document).map(Some),
            _ => Ok(None),
        }
    }

    /// Entities read from the backend (all of them, or those `filter`
    /// selects) merged with the identity map and narrowed by `predicate`.
    ///
    /// Tracked documents replace their stored version, removed ones are
    /// skipped and staged inserts and edits the backend did not return are
    /// appended. Only documents that pass `predicate` get attached.
    async fn select(
        &self,
        filter: Option<&DocumentFilter>,
        predicate: impl Fn(&D) -> bool,
    ) -> Result<Vec<D>, IdentityError> {
        let loaded = match filter {
            Some(filter) => {
                let loaded = self.context.backend.query(self.collection, filter).await?;
                self.context.emit(DiagnosticEvent::Query {
                    collection: self.collection.to_owned(),
                    field: filter.field().to_owned(),
                    documents: loaded.len(),
                });
                loaded
            }
            None => {
                let loaded = self.context.backend.scan(self.collection).await?;
                self.context.emit(DiagnosticEvent::Scan {
                    collection: self.collection.to_owned(),
                    documents: loaded.len(),
                });
                loaded
            }
        };

        let mut tracker = self.context.tracker.lock().await;
        let mut seen = HashSet::with_capacity(loaded.len());
        let mut items = Vec::new();
        for document in loaded {
            seen.insert(document.id.clone());
            let tracked = match tracker.lookup(self.collection, &document.id) {
                Tracked::Deleted => continue,
                Tracked::Present(tracked) => Some(Self::decode(tracked)?),
                Tracked::Untracked => None,
            };
            match tracked {
                Some(entity) => {
                    if predicate(&entity) {
                        items.push(entity);
                    }
                }
                None => {
                    let entity = Self::decode(&document)?;
                    if predicate(&entity) {
                        items.push(entity);
                        tracker.attach(self.collection, document);
                    }
                }
            }
        }
        for document in tracker.staged(self.collection) {
            if seen.contains(&document.id) {
                continue;
            }
            let entity = Self::decode(document)?;
            if predicate(&entity) {
                items.push(entity);
            }
        }
        Ok(items)
    }

    fn single(
        mut items: impl Iterator<Item = D>,
        collection: &str,
    ) -> Result<Option<D>, IdentityError> {
        let first = items.next();
        if items.next().is_some() {
            return Err(IdentityError::NotUnique(format!(
                "more than one document in '{collection}' matches"
            )));
        }
        Ok(first)
    }

    /// Every entity in the collection as this context sees it.
    pub async fn to_list(&self) -> Result<Vec<D>, IdentityError> {
        self.select(None, |_| true).await
    }

    pub async fn filter(&self, predicate: impl Fn(&D) -> bool) -> Result<Vec<D>, IdentityError> {
        self.select(None, predicate).await
    }

    /// Entities the backend selects with `filter`, as this context sees them.
    ///
    /// `predicate` must express the same condition on the entity: it decides
    /// for tracked documents whose pending edits the backend has not seen.
    pub async fn query(
        &self,
        filter: &DocumentFilter,
        predicate: impl Fn(&D) -> bool,
    ) -> Result<Vec<D>, IdentityError> {
        self.select(Some(filter), predicate).await
    }

    pub async fn query_first(
        &self,
        filter: &DocumentFilter,
        predicate: impl Fn(&D) -> bool,
    ) -> Result<Option<D>, IdentityError> {
        Ok(self.query(filter, predicate).await?.into_iter().next())
    }

    /// The only entity `filter` selects, `None` when there is none.
    ///
    /// # Errors
    ///
    /// `NotUnique` when more than one entity matches.
    pub async fn query_single(
        &self,
        filter: &DocumentFilter,
        predicate: impl Fn(&D) -> bool,
    ) -> Result<Option<D>, IdentityError> {
        let items = self.query(filter, predicate).await?;
        Self::single(items.into_iter(), self.collection)
    }

    pub async fn first_or_default(
        &self,
        predicate: impl Fn(&D) -> bool,
    ) -> Result<Option<D>, IdentityError> {
        Ok(self.select(None, predicate).await?.into_iter().next())
    }

    /// The only match, `None` when nothing matches.
    ///
    /// # Errors
    ///
    /// `NotUnique` when more than one entity matches.
    pub async fn single_or_default(
        &self,
        predicate: impl Fn(&D) -> bool,
    ) -> Result<Option<D>, IdentityError> {
        let items = self.select(None, predicate).await?;
        Self::single(items.into_iter(), self.collection)
    }

    pub async fn any(&self, predicate: impl Fn(&D) -> bool) -> Result<bool, IdentityError> {
        Ok(!self.select(None, predicate).await?.is_empty())
    }

    pub async fn all(&self, predicate: impl Fn(&D) -> bool) -> Result<bool, IdentityError> {
        Ok(self.to_list().await?.iter().all(predicate))
    }

    pub async fn count(&self, predicate: impl Fn(&D) -> bool) -> Result<usize, IdentityError> {
        Ok(self.select(None, predicate).await?.len())
    }
}
