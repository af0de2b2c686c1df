use anyhow::Context as _;
use chrono::Utc;
use sea_orm::{
    ActiveValue::Set, ColumnTrait, ConnectionTrait, DatabaseConnection, DatabaseTransaction,
    DbBackend, DbErr, EntityTrait, QueryFilter, QueryOrder, SqlErr, TransactionError,
    TransactionTrait, Value,
    sea_query::{Expr, SimpleExpr},
};

use tessera_identity_schema::identity_documents;

use crate::domain::backend::{DocumentBackend, DocumentFilter, StoredDocument, WriteKind, WriteOp};
use crate::error::IdentityError;

// ── Document backend ─────────────────────────────────────────────────────────

/// Stores every document as a row of `identity_documents`.
#[derive(Clone)]
pub struct DbDocumentBackend {
    pub db: DatabaseConnection,
}

impl DocumentBackend for DbDocumentBackend {
    async fn find(
        &self,
        collection: &str,
        id: &str,
    ) -> Result<Option<StoredDocument>, IdentityError> {
        let model = identity_documents::Entity::find_by_id((collection.to_owned(), id.to_owned()))
            .one(&self.db)
            .await
            .context("find identity document")?;
        model.map(document_from_model).transpose()
    }

    async fn scan(&self, collection: &str) -> Result<Vec<StoredDocument>, IdentityError> {
        let models = identity_documents::Entity::find()
            .filter(identity_documents::Column::Collection.eq(collection))
            .order_by_asc(identity_documents::Column::CreatedAt)
            .order_by_asc(identity_documents::Column::Id)
            .all(&self.db)
            .await
            .context("scan identity documents")?;
        tracing::debug!(collection, documents = models.len(), "scanned identity documents");
        models.into_iter().map(document_from_model).collect()
    }

    async fn query(
        &self,
        collection: &str,
        filter: &DocumentFilter,
    ) -> Result<Vec<StoredDocument>, IdentityError> {
        let models = identity_documents::Entity::find()
            .filter(identity_documents::Column::Collection.eq(collection))
            .filter(filter_expr(self.db.get_database_backend(), filter))
            .order_by_asc(identity_documents::Column::CreatedAt)
            .order_by_asc(identity_documents::Column::Id)
            .all(&self.db)
            .await
            .context("query identity documents")?;
        tracing::debug!(
            collection,
            field = filter.field(),
            documents = models.len(),
            "queried identity documents"
        );
        models.into_iter().map(document_from_model).collect()
    }

    async fn write(&self, ops: Vec<WriteOp>) -> Result<(), IdentityError> {
        let operations = ops.len();
        self.db
            .transaction::<_, (), WriteFailure>(|txn| {
                Box::pin(async move {
                    for op in ops {
                        apply(txn, op).await?;
                    }
                    Ok(())
                })
            })
            .await
            .map_err(|e| match e {
                TransactionError::Transaction(WriteFailure::Conflict { collection, id }) => {
                    IdentityError::ConcurrencyConflict { collection, id }
                }
                TransactionError::Transaction(WriteFailure::Duplicate { collection, id }) => {
                    IdentityError::DuplicateKey { collection, id }
                }
                TransactionError::Transaction(WriteFailure::Encode(e)) => {
                    IdentityError::Internal(anyhow::Error::new(e).context("encode identity document"))
                }
                TransactionError::Transaction(WriteFailure::Db(e))
                | TransactionError::Connection(e) => {
                    IdentityError::Internal(anyhow::Error::new(e).context("write identity documents"))
                }
            })?;
        tracing::debug!(operations, "wrote identity documents");
        Ok(())
    }
}

// ── Filters ──────────────────────────────────────────────────────────────────

/// Member name as a quoted JSON path label, so any name is accepted.
fn label(name: &str) -> String {
    format!(".\"{}\"", name.replace('"', "\\\""))
}

fn bind(value: &serde_json::Value) -> Value {
    match value {
        serde_json::Value::String(s) => s.clone().into(),
        serde_json::Value::Bool(b) => (*b).into(),
        serde_json::Value::Number(n) => match n.as_i64() {
            Some(i) => i.into(),
            None => n.as_f64().unwrap_or_default().into(),
        },
        other => other.to_string().into(),
    }
}

/// Translate a document filter into a condition on the `body` column.
fn filter_expr(backend: DbBackend, filter: &DocumentFilter) -> SimpleExpr {
    let path = format!("${}", label(filter.field()));
    match (backend, filter) {
        (DbBackend::Sqlite, DocumentFilter::Eq { value, .. }) => Expr::cust_with_values(
            "EXISTS (SELECT 1 FROM json_each(body, ?) AS e WHERE e.value = ?)",
            [Value::from(path), bind(value)],
        ),
        (DbBackend::Sqlite, DocumentFilter::ElemMatch { members, .. }) => {
            let mut sql = String::from(
                "EXISTS (SELECT 1 FROM json_each(body, ?) AS e WHERE e.type = 'object'",
            );
            let mut values = vec![Value::from(path)];
            for (name, value) in members {
                sql.push_str(" AND json_extract(body, e.fullkey || ?) = ?");
                values.push(Value::from(label(name)));
                values.push(bind(value));
            }
            sql.push(')');
            Expr::cust_with_values(sql, values)
        }
        (DbBackend::Postgres, _) => {
            let candidate = match filter {
                DocumentFilter::Eq { value, .. } => value.clone(),
                DocumentFilter::ElemMatch { members, .. } => {
                    serde_json::Value::Array(vec![serde_json::Value::Object(members.clone())])
                }
            };
            Expr::cust_with_values(
                "CAST(body AS jsonb) -> ? @> CAST(? AS jsonb)",
                [
                    Value::from(filter.field().to_owned()),
                    Value::from(candidate.to_string()),
                ],
            )
        }
        (DbBackend::MySql, _) => {
            let candidate = match filter {
                DocumentFilter::Eq { value, .. } => value.clone(),
                DocumentFilter::ElemMatch { members, .. } => {
                    serde_json::Value::Object(members.clone())
                }
            };
            Expr::cust_with_values(
                "JSON_CONTAINS(body, ?, ?)",
                [Value::from(candidate.to_string()), Value::from(path)],
            )
        }
    }
}

/// Failure inside the write transaction; rolls the whole batch back.
#[derive(Debug, thiserror::Error)]
enum WriteFailure {
    #[error("document {collection}/{id} changed underneath the write")]
    Conflict { collection: String, id: String },
    #[error("document {collection}/{id} already exists")]
    Duplicate { collection: String, id: String },
    #[error(transparent)]
    Encode(#[from] serde_json::Error),
    #[error(transparent)]
    Db(#[from] DbErr),
}

async fn apply(txn: &DatabaseTransaction, op: WriteOp) -> Result<(), WriteFailure> {
    let conflict = || WriteFailure::Conflict {
        collection: op.collection.clone(),
        id: op.document_id().to_owned(),
    };
    let now = Utc::now();

    match &op.kind {
        WriteKind::Insert(document) => {
            let model = identity_documents::ActiveModel {
                collection: Set(op.collection.clone()),
                id: Set(document.id.clone()),
                body: Set(serde_json::to_string(&document.body)?),
                stamp: Set(document.stamp.clone()),
                created_at: Set(now),
                updated_at: Set(now),
            };
            match identity_documents::Entity::insert(model)
                .exec_without_returning(txn)
                .await
            {
                Ok(_) => {}
                Err(e) if matches!(e.sql_err(), Some(SqlErr::UniqueConstraintViolation(_))) => {
                    return Err(WriteFailure::Duplicate {
                        collection: op.collection.clone(),
                        id: document.id.clone(),
                    });
                }
                Err(e) => return Err(e.into()),
            }
        }
        WriteKind::Replace {
            document,
            expected_stamp,
        } => {
            let mut update = identity_documents::Entity::update_many()
                .col_expr(
                    identity_documents::Column::Body,
                    Expr::value(serde_json::to_string(&document.body)?),
                )
                .col_expr(
                    identity_documents::Column::Stamp,
                    Expr::value(document.stamp.clone()),
                )
                .col_expr(identity_documents::Column::UpdatedAt, Expr::value(now))
                .filter(identity_documents::Column::Collection.eq(op.collection.as_str()))
                .filter(identity_documents::Column::Id.eq(document.id.as_str()));
            if let Some(expected) = expected_stamp {
                update = update.filter(identity_documents::Column::Stamp.eq(expected.as_str()));
            }
            let result = update.exec(txn).await?;
            if result.rows_affected == 0 {
                return Err(conflict());
            }
        }
        WriteKind::Delete { id, expected_stamp } => {
            let mut delete = identity_documents::Entity::delete_many()
                .filter(identity_documents::Column::Collection.eq(op.collection.as_str()))
                .filter(identity_documents::Column::Id.eq(id.as_str()));
            if let Some(expected) = expected_stamp {
                delete = delete.filter(identity_documents::Column::Stamp.eq(expected.as_str()));
            }
            let result = delete.exec(txn).await?;
            if result.rows_affected == 0 && expected_stamp.is_some() {
                return Err(conflict());
            }
        }
    }
    Ok(())
}

fn document_from_model(model: identity_documents::Model) -> Result<StoredDocument, IdentityError> {
    let body = serde_json::from_str(&model.body)
        .with_context(|| format!("parse identity document {}/{}", model.collection, model.id))?;
    Ok(StoredDocument {
        id: model.id,
        body,
        stamp: model.stamp,
    })
}
