use async_trait::async_trait;
use serde_json::Value;
use std::cmp::Ordering;
use std::collections::HashMap;
use tokio::sync::RwLock;
use uuid::Uuid;

use crate::repository::{
    Condition, Document, DocumentQuery, DocumentRepository, FilterValue, FoundDocuments, Op,
    RepositoryError,
};

/// MemoryRepository
///
/// Process-local document store. Used for local runs without `DATABASE_URL` and
/// by the test suites. Semantics match `PostgresRepository`: the write lock is
/// the atomicity boundary for every mutation, including counter increments.
#[derive(Default)]
pub struct MemoryRepository {
    // collection -> documents in insertion order
    collections: RwLock<HashMap<String, Vec<(Uuid, Document)>>>,
}

impl MemoryRepository {
    pub fn new() -> Self {
        Self::default()
    }
}

fn matches(doc: &Document, query: &DocumentQuery) -> bool {
    if !query.conditions.iter().all(|c| condition_holds(doc, c)) {
        return false;
    }
    match &query.search {
        Some(search) if !search.fields.is_empty() => {
            let needle = search.term.to_lowercase();
            search
                .fields
                .iter()
                .any(|field| doc.get(field).is_some_and(|v| contains_text(v, &needle)))
        }
        _ => true,
    }
}

fn contains_text(value: &Value, needle: &str) -> bool {
    match value {
        Value::String(s) => s.to_lowercase().contains(needle),
        Value::Array(items) => items.iter().any(|item| contains_text(item, needle)),
        _ => false,
    }
}

fn condition_holds(doc: &Document, condition: &Condition) -> bool {
    let Some(stored) = doc.get(&condition.field) else {
        return false;
    };

    match (&condition.value, stored) {
        (FilterValue::Text(expected), Value::String(actual)) => {
            compare(actual.as_str().cmp(expected.as_str()), condition.op)
        }
        // Scalars compare by their JSON text, as `->>` does in Postgres.
        (FilterValue::Text(expected), Value::Number(actual)) => {
            compare(actual.to_string().as_str().cmp(expected.as_str()), condition.op)
        }
        (FilterValue::Text(expected), Value::Bool(actual)) => {
            let actual = if *actual { "true" } else { "false" };
            compare(actual.cmp(expected.as_str()), condition.op)
        }
        (FilterValue::Text(expected), Value::Array(items)) if condition.op == Op::Eq => items
            .iter()
            .any(|item| item.as_str() == Some(expected.as_str())),
        (FilterValue::Number(expected), Value::Number(actual)) => match actual.as_f64() {
            Some(actual) => actual
                .partial_cmp(expected)
                .is_some_and(|ordering| compare(ordering, condition.op)),
            None => false,
        },
        (FilterValue::Bool(expected), Value::Bool(actual)) => {
            condition.op == Op::Eq && actual == expected
        }
        (FilterValue::Date(expected), Value::String(actual)) => {
            compare(actual.as_str().cmp(expected.as_str()), condition.op)
        }
        _ => false,
    }
}

fn compare(ordering: Ordering, op: Op) -> bool {
    match op {
        Op::Eq => ordering == Ordering::Equal,
        Op::Gt => ordering == Ordering::Greater,
        Op::Gte => ordering != Ordering::Less,
        Op::Lt => ordering == Ordering::Less,
        Op::Lte => ordering != Ordering::Greater,
    }
}

/// Orders JSON values the way the list endpoint expects: missing/null first,
/// then booleans, numbers, strings.
fn order_values(a: Option<&Value>, b: Option<&Value>) -> Ordering {
    fn rank(value: Option<&Value>) -> u8 {
        match value {
            None | Some(Value::Null) => 0,
            Some(Value::Bool(_)) => 1,
            Some(Value::Number(_)) => 2,
            Some(Value::String(_)) => 3,
            Some(_) => 4,
        }
    }

    match (a, b) {
        (Some(Value::Bool(x)), Some(Value::Bool(y))) => x.cmp(y),
        (Some(Value::Number(x)), Some(Value::Number(y))) => {
            let x = x.as_f64().unwrap_or_default();
            let y = y.as_f64().unwrap_or_default();
            x.partial_cmp(&y).unwrap_or(Ordering::Equal)
        }
        (Some(Value::String(x)), Some(Value::String(y))) => x.cmp(y),
        _ => rank(a).cmp(&rank(b)),
    }
}

#[async_trait]
impl DocumentRepository for MemoryRepository {
    async fn ensure_schema(&self) -> Result<(), RepositoryError> {
        Ok(())
    }

    async fn find(
        &self,
        collection: &str,
        query: &DocumentQuery,
    ) -> Result<FoundDocuments, RepositoryError> {
        let collections = self.collections.read().await;
        let mut hits: Vec<&Document> = collections
            .get(collection)
            .map(|docs| docs.iter().map(|(_, doc)| doc).filter(|doc| matches(doc, query)).collect())
            .unwrap_or_default();

        let field = query.sort.field.as_str();
        hits.sort_by(|a, b| {
            let ordering = order_values(a.get(field), b.get(field));
            if query.sort.descending {
                ordering.reverse()
            } else {
                ordering
            }
        });

        let total = hits.len() as u64;
        let items = hits
            .into_iter()
            .skip(query.skip as usize)
            .take(query.limit as usize)
            .cloned()
            .collect();

        Ok(FoundDocuments { items, total })
    }

    async fn find_by_id(
        &self,
        collection: &str,
        id: Uuid,
    ) -> Result<Option<Document>, RepositoryError> {
        let collections = self.collections.read().await;
        Ok(collections
            .get(collection)
            .and_then(|docs| docs.iter().find(|(doc_id, _)| *doc_id == id))
            .map(|(_, doc)| doc.clone()))
    }

    async fn find_one_by(
        &self,
        collection: &str,
        field: &str,
        value: &str,
    ) -> Result<Option<Document>, RepositoryError> {
        let collections = self.collections.read().await;
        Ok(collections
            .get(collection)
            .and_then(|docs| {
                docs.iter()
                    .find(|(_, doc)| doc.get(field).and_then(Value::as_str) == Some(value))
            })
            .map(|(_, doc)| doc.clone()))
    }

    async fn insert(
        &self,
        collection: &str,
        id: Uuid,
        doc: Document,
    ) -> Result<Document, RepositoryError> {
        let mut collections = self.collections.write().await;
        collections
            .entry(collection.to_string())
            .or_default()
            .push((id, doc.clone()));
        Ok(doc)
    }

    async fn update(
        &self,
        collection: &str,
        id: Uuid,
        patch: Document,
    ) -> Result<Option<Document>, RepositoryError> {
        let mut collections = self.collections.write().await;
        let Some((_, doc)) = collections
            .get_mut(collection)
            .and_then(|docs| docs.iter_mut().find(|(doc_id, _)| *doc_id == id))
        else {
            return Ok(None);
        };
        doc.extend(patch);
        Ok(Some(doc.clone()))
    }

    async fn delete(&self, collection: &str, id: Uuid) -> Result<bool, RepositoryError> {
        let mut collections = self.collections.write().await;
        let Some(docs) = collections.get_mut(collection) else {
            return Ok(false);
        };
        let before = docs.len();
        docs.retain(|(doc_id, _)| *doc_id != id);
        Ok(docs.len() < before)
    }

    async fn increment(
        &self,
        collection: &str,
        id: Uuid,
        field: &str,
        by: i64,
    ) -> Result<Option<Document>, RepositoryError> {
        let mut collections = self.collections.write().await;
        let Some((_, doc)) = collections
            .get_mut(collection)
            .and_then(|docs| docs.iter_mut().find(|(doc_id, _)| *doc_id == id))
        else {
            return Ok(None);
        };
        let current = doc.get(field).and_then(Value::as_i64).unwrap_or(0);
        doc.insert(field.to_string(), Value::from(current.saturating_add(by)));
        Ok(Some(doc.clone()))
    }
}
