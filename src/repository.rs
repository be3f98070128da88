use async_trait::async_trait;
use serde_json::{Map, Value};
use sqlx::{PgPool, Postgres, QueryBuilder, Row, types::Json};
use std::sync::Arc;
use uuid::Uuid;

/// A stored record: a JSON object with server-owned `id`, `created_at` and
/// `updated_at` keys next to free-form content fields.
pub type Document = Map<String, Value>;

/// RepositoryError
///
/// Failures of the underlying document store. Always surfaced as HTTP 500.
#[derive(Debug, thiserror::Error)]
pub enum RepositoryError {
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("stored document is malformed: {0}")]
    Malformed(String),
}

// --- Query model ---

/// Comparison applied by a filter condition.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Op {
    Eq,
    Gt,
    Gte,
    Lt,
    Lte,
}

impl Op {
    pub fn as_sql(self) -> &'static str {
        match self {
            Op::Eq => " = ",
            Op::Gt => " > ",
            Op::Gte => " >= ",
            Op::Lt => " < ",
            Op::Lte => " <= ",
        }
    }
}

/// Typed right-hand side of a condition, already parsed from the query string.
#[derive(Debug, Clone, PartialEq)]
pub enum FilterValue {
    Text(String),
    Number(f64),
    Bool(bool),
    /// UTC instant in the fixed-width stored form, so byte order is time order.
    Date(String),
}

#[derive(Debug, Clone, PartialEq)]
pub struct Condition {
    pub field: String,
    pub op: Op,
    pub value: FilterValue,
}

/// Case-insensitive substring search over a fixed set of fields.
#[derive(Debug, Clone, PartialEq)]
pub struct Search {
    pub term: String,
    pub fields: Vec<String>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Sort {
    pub field: String,
    pub descending: bool,
}

impl Default for Sort {
    fn default() -> Self {
        Self {
            field: "created_at".to_string(),
            descending: true,
        }
    }
}

/// DocumentQuery
///
/// Everything a list call needs: conditions are ANDed, the search is ORed over
/// its fields, then sort and window.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct DocumentQuery {
    pub conditions: Vec<Condition>,
    pub search: Option<Search>,
    pub sort: Sort,
    pub skip: u64,
    pub limit: u64,
}

/// One window of a collection plus the number of matches across all windows.
#[derive(Debug, Clone)]
pub struct FoundDocuments {
    pub items: Vec<Document>,
    pub total: u64,
}

/// DocumentRepository
///
/// Contract for collection-scoped document access. Every content type goes
/// through this one trait; the collection name selects the data set.
///
/// `Send + Sync + async_trait` so the implementation can live behind
/// `Arc<dyn DocumentRepository>` in the shared state.
#[async_trait]
pub trait DocumentRepository: Send + Sync {
    /// Prepares the backing schema. No-op for stores that need none.
    async fn ensure_schema(&self) -> Result<(), RepositoryError>;

    async fn find(
        &self,
        collection: &str,
        query: &DocumentQuery,
    ) -> Result<FoundDocuments, RepositoryError>;

    async fn find_by_id(
        &self,
        collection: &str,
        id: Uuid,
    ) -> Result<Option<Document>, RepositoryError>;

    /// First document whose top-level `field` equals `value` as a string.
    async fn find_one_by(
        &self,
        collection: &str,
        field: &str,
        value: &str,
    ) -> Result<Option<Document>, RepositoryError>;

    /// Stores a fully prepared document (id and timestamps already set).
    async fn insert(&self, collection: &str, id: Uuid, doc: Document)
    -> Result<Document, RepositoryError>;

    /// Shallow-merges `patch` into the stored document. `None` if absent.
    async fn update(
        &self,
        collection: &str,
        id: Uuid,
        patch: Document,
    ) -> Result<Option<Document>, RepositoryError>;

    /// `true` when a document was removed.
    async fn delete(&self, collection: &str, id: Uuid) -> Result<bool, RepositoryError>;

    /// Atomically adds `by` to an integer field (missing counts as 0).
    async fn increment(
        &self,
        collection: &str,
        id: Uuid,
        field: &str,
        by: i64,
    ) -> Result<Option<Document>, RepositoryError>;
}

/// RepositoryState
///
/// The shared handle to the document store held by the application state.
pub type RepositoryState = Arc<dyn DocumentRepository>;

// --- Postgres implementation ---

/// PostgresRepository
///
/// Stores every collection in one JSONB table keyed by `(collection, id)`.
/// Field names and values always travel as bound parameters.
pub struct PostgresRepository {
    pool: PgPool,
}

impl PostgresRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

const SCHEMA: &str = r#"
CREATE TABLE IF NOT EXISTS documents (
    collection TEXT NOT NULL,
    id UUID NOT NULL,
    body JSONB NOT NULL,
    created_at TIMESTAMPTZ NOT NULL DEFAULT NOW(),
    updated_at TIMESTAMPTZ NOT NULL DEFAULT NOW(),
    PRIMARY KEY (collection, id)
)
"#;

const COLLECTION_INDEX: &str =
    "CREATE INDEX IF NOT EXISTS documents_collection_created_idx ON documents (collection, created_at DESC)";

/// Appends the WHERE clause shared by the page query and the count query.
fn push_filters(builder: &mut QueryBuilder<'_, Postgres>, collection: &str, query: &DocumentQuery) {
    builder.push(" WHERE collection = ");
    builder.push_bind(collection.to_string());

    for condition in &query.conditions {
        builder.push(" AND ");
        push_condition(builder, condition);
    }

    if let Some(search) = &query.search {
        if !search.fields.is_empty() {
            let pattern = format!("%{}%", escape_like(&search.term));
            builder.push(" AND (");
            for (i, field) in search.fields.iter().enumerate() {
                if i > 0 {
                    builder.push(" OR ");
                }
                // Arrays (e.g. tags) match against their JSON text.
                builder.push("COALESCE(body ->> ");
                builder.push_bind(field.clone());
                builder.push(", '') ILIKE ");
                builder.push_bind(pattern.clone());
            }
            builder.push(")");
        }
    }
}

fn push_condition(builder: &mut QueryBuilder<'_, Postgres>, condition: &Condition) {
    let field = condition.field.clone();
    match &condition.value {
        FilterValue::Text(text) => {
            // Exact string match, or membership when the stored value is an array.
            builder.push("((body ->> ");
            builder.push_bind(field.clone());
            builder.push(")");
            builder.push(condition.op.as_sql());
            builder.push_bind(text.clone());
            if condition.op == Op::Eq {
                builder.push(" OR (jsonb_typeof(body -> ");
                builder.push_bind(field.clone());
                builder.push(") = 'array' AND (body -> ");
                builder.push_bind(field);
                builder.push(") ? ");
                builder.push_bind(text.clone());
                builder.push(")");
            }
            builder.push(")");
        }
        FilterValue::Number(number) => {
            builder.push("(CASE WHEN jsonb_typeof(body -> ");
            builder.push_bind(field.clone());
            builder.push(") = 'number' THEN (body ->> ");
            builder.push_bind(field);
            builder.push(")::double precision");
            builder.push(condition.op.as_sql());
            builder.push_bind(*number);
            builder.push(" ELSE false END)");
        }
        FilterValue::Bool(flag) => {
            builder.push("(body -> ");
            builder.push_bind(field);
            builder.push(") = to_jsonb(");
            builder.push_bind(*flag);
            builder.push("::boolean)");
        }
        FilterValue::Date(date) => {
            builder.push("(body ->> ");
            builder.push_bind(field);
            builder.push(") COLLATE \"C\"");
            builder.push(condition.op.as_sql());
            builder.push_bind(date.clone());
        }
    }
}

fn escape_like(term: &str) -> String {
    term.replace('\\', "\\\\")
        .replace('%', "\\%")
        .replace('_', "\\_")
}

fn into_document(value: Value) -> Result<Document, RepositoryError> {
    match value {
        Value::Object(map) => Ok(map),
        other => Err(RepositoryError::Malformed(format!(
            "expected a JSON object, found {other}"
        ))),
    }
}

#[async_trait]
impl DocumentRepository for PostgresRepository {
    async fn ensure_schema(&self) -> Result<(), RepositoryError> {
        sqlx::query(SCHEMA).execute(&self.pool).await?;
        sqlx::query(COLLECTION_INDEX).execute(&self.pool).await?;
        Ok(())
    }

    /// find
    ///
    /// Two statements over the same WHERE clause: the windowed page and the total.
    async fn find(
        &self,
        collection: &str,
        query: &DocumentQuery,
    ) -> Result<FoundDocuments, RepositoryError> {
        let mut count: QueryBuilder<Postgres> = QueryBuilder::new("SELECT COUNT(*) FROM documents");
        push_filters(&mut count, collection, query);
        let total: i64 = count
            .build_query_scalar()
            .fetch_one(&self.pool)
            .await?;

        let mut page: QueryBuilder<Postgres> = QueryBuilder::new("SELECT body FROM documents");
        push_filters(&mut page, collection, query);

        let direction = if query.sort.descending { " DESC" } else { " ASC" };
        match query.sort.field.as_str() {
            "created_at" | "updated_at" => {
                page.push(format!(" ORDER BY {}{}", query.sort.field, direction));
            }
            field => {
                page.push(" ORDER BY body -> ");
                page.push_bind(field.to_string());
                page.push(direction);
                page.push(", created_at DESC");
            }
        }
        page.push(" LIMIT ");
        page.push_bind(i64::try_from(query.limit).unwrap_or(i64::MAX));
        page.push(" OFFSET ");
        page.push_bind(i64::try_from(query.skip).unwrap_or(i64::MAX));

        let rows = page.build().fetch_all(&self.pool).await?;
        let items = rows
            .into_iter()
            .map(|row| {
                let Json(body): Json<Value> = row.try_get("body")?;
                into_document(body)
            })
            .collect::<Result<Vec<_>, RepositoryError>>()?;

        Ok(FoundDocuments {
            items,
            total: total.max(0) as u64,
        })
    }

    async fn find_by_id(
        &self,
        collection: &str,
        id: Uuid,
    ) -> Result<Option<Document>, RepositoryError> {
        let body: Option<Json<Value>> =
            sqlx::query_scalar("SELECT body FROM documents WHERE collection = $1 AND id = $2")
                .bind(collection)
                .bind(id)
                .fetch_optional(&self.pool)
                .await?;
        body.map(|Json(v)| into_document(v)).transpose()
    }

    async fn find_one_by(
        &self,
        collection: &str,
        field: &str,
        value: &str,
    ) -> Result<Option<Document>, RepositoryError> {
        let body: Option<Json<Value>> = sqlx::query_scalar(
            "SELECT body FROM documents WHERE collection = $1 AND body ->> $2 = $3 ORDER BY created_at ASC LIMIT 1",
        )
        .bind(collection)
        .bind(field)
        .bind(value)
        .fetch_optional(&self.pool)
        .await?;
        body.map(|Json(v)| into_document(v)).transpose()
    }

    async fn insert(
        &self,
        collection: &str,
        id: Uuid,
        doc: Document,
    ) -> Result<Document, RepositoryError> {
        let Json(body): Json<Value> = sqlx::query_scalar(
            "INSERT INTO documents (collection, id, body, created_at, updated_at) VALUES ($1, $2, $3, NOW(), NOW()) RETURNING body",
        )
        .bind(collection)
        .bind(id)
        .bind(Json(Value::Object(doc)))
        .fetch_one(&self.pool)
        .await?;
        into_document(body)
    }

    /// update
    ///
    /// JSONB `||` merge: top-level keys in the patch replace stored ones. Last writer wins.
    async fn update(
        &self,
        collection: &str,
        id: Uuid,
        patch: Document,
    ) -> Result<Option<Document>, RepositoryError> {
        let body: Option<Json<Value>> = sqlx::query_scalar(
            "UPDATE documents SET body = body || $3, updated_at = NOW() WHERE collection = $1 AND id = $2 RETURNING body",
        )
        .bind(collection)
        .bind(id)
        .bind(Json(Value::Object(patch)))
        .fetch_optional(&self.pool)
        .await?;
        body.map(|Json(v)| into_document(v)).transpose()
    }

    async fn delete(&self, collection: &str, id: Uuid) -> Result<bool, RepositoryError> {
        let result = sqlx::query("DELETE FROM documents WHERE collection = $1 AND id = $2")
            .bind(collection)
            .bind(id)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    /// increment
    ///
    /// Single UPDATE statement; the row lock Postgres takes makes concurrent
    /// increments serialize without any application-side coordination. The sum
    /// is taken in `numeric` and clamped to the `bigint` range, matching the
    /// saturating add of the in-memory store.
    async fn increment(
        &self,
        collection: &str,
        id: Uuid,
        field: &str,
        by: i64,
    ) -> Result<Option<Document>, RepositoryError> {
        let body: Option<Json<Value>> = sqlx::query_scalar(
            r#"
            UPDATE documents
            SET body = jsonb_set(
                body,
                ARRAY[$3::text],
                to_jsonb(
                    LEAST(
                        GREATEST(
                            (CASE WHEN jsonb_typeof(body -> $3::text) = 'number'
                                  THEN (body ->> $3::text)::numeric ELSE 0 END) + $4,
                            -9223372036854775808
                        ),
                        9223372036854775807
                    )::bigint
                )
            )
            WHERE collection = $1 AND id = $2
            RETURNING body
            "#,
        )
        .bind(collection)
        .bind(id)
        .bind(field)
        .bind(by)
        .fetch_optional(&self.pool)
        .await?;
        body.map(|Json(v)| into_document(v)).transpose()
    }
}
