use chrono::Utc;
use serde::Serialize;
use serde_json::Value;
use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;
use uuid::Uuid;

use crate::{
    content_types::ContentTypeConfig,
    error::{ApiError, ApiResult, FieldError},
    query::build_list_request,
    repository::{Document, RepositoryError, RepositoryState},
    validation::{ValidationMode, format_instant, normalize_date},
};

/// Keys the server owns on every document; payload values are discarded.
pub const RESERVED_FIELDS: &[&str] = &["id", "created_at", "updated_at"];

/// Page
///
/// Result of a list call: one window of records plus what produced it.
#[derive(Debug, Clone, Serialize)]
pub struct Page {
    pub items: Vec<Document>,
    pub total: u64,
    pub page: u64,
    pub limit: u64,
    pub total_pages: u64,
    pub filters: BTreeMap<String, String>,
    pub search: Option<String>,
}

/// CrudController
///
/// The generic list/get/create/update/delete surface. One instance per content
/// type, each holding the shared repository and its own configuration. Cheap to
/// clone; used directly as the axum state of that type's routes.
#[derive(Clone)]
pub struct CrudController {
    repo: RepositoryState,
    config: Arc<ContentTypeConfig>,
}

fn now() -> Value {
    Value::String(format_instant(Utc::now()))
}

impl CrudController {
    pub fn new(repo: RepositoryState, config: ContentTypeConfig) -> Self {
        Self {
            repo,
            config: Arc::new(config),
        }
    }

    pub fn config(&self) -> &ContentTypeConfig {
        &self.config
    }

    /// Logs the store failure with the content type attached and wraps it.
    fn store_failure(&self, operation: &'static str) -> impl Fn(RepositoryError) -> ApiError + '_ {
        move |e| {
            tracing::error!(
                collection = self.config.collection,
                operation,
                error = ?e,
                "document store call failed"
            );
            ApiError::Repository(e)
        }
    }

    fn not_found(&self, key: &str) -> ApiError {
        ApiError::NotFound(format!("{} {} not found", self.config.name, key))
    }

    /// Unparsable ids can never match a stored document.
    fn parse_id(&self, raw: &str) -> ApiResult<Uuid> {
        Uuid::parse_str(raw.trim()).map_err(|_| self.not_found(raw))
    }

    /// Requires an object body, strips server-owned keys and runs the validator.
    fn prepare_payload(&self, payload: Value, mode: ValidationMode) -> ApiResult<Document> {
        let Value::Object(mut doc) = payload else {
            return Err(ApiError::Validation(vec![FieldError::new(
                "body",
                "must be a JSON object",
            )]));
        };
        for key in RESERVED_FIELDS {
            doc.remove(*key);
        }

        let errors = (self.config.validator)(&doc, mode);
        if !errors.is_empty() {
            tracing::debug!(
                collection = self.config.collection,
                errors = errors.len(),
                "payload rejected by validator"
            );
            return Err(ApiError::Validation(errors));
        }
        for field in self.config.date_fields() {
            if let Some(Value::String(raw)) = doc.get_mut(field) {
                if let Some(normalized) = normalize_date(raw) {
                    *raw = normalized;
                }
            }
        }
        Ok(doc)
    }

    /// list
    ///
    /// Pagination is capped at the type's maximum; unknown filters are dropped.
    pub async fn list(&self, params: &HashMap<String, String>) -> ApiResult<Page> {
        let request = build_list_request(params, &self.config);

        let found = self
            .repo
            .find(self.config.collection, &request.query)
            .await
            .map_err(self.store_failure("list"))?;

        Ok(Page {
            items: found.items,
            total: found.total,
            page: request.page,
            limit: request.limit,
            total_pages: found.total.div_ceil(request.limit),
            filters: request.applied_filters,
            search: request.search,
        })
    }

    pub async fn get(&self, id: &str) -> ApiResult<Document> {
        let uuid = self.parse_id(id)?;
        self.repo
            .find_by_id(self.config.collection, uuid)
            .await
            .map_err(self.store_failure("get"))?
            .ok_or_else(|| self.not_found(id))
    }

    pub async fn get_by_slug(&self, slug: &str) -> ApiResult<Document> {
        let Some(field) = self.config.slug_field else {
            return Err(self.not_found(slug));
        };
        self.repo
            .find_one_by(self.config.collection, field, slug)
            .await
            .map_err(self.store_failure("get_by_slug"))?
            .ok_or_else(|| self.not_found(slug))
    }

    /// create
    ///
    /// Defaults fill the gaps in the payload; id and timestamps are always ours.
    pub async fn create(&self, payload: Value) -> ApiResult<Document> {
        let body = self.prepare_payload(payload, ValidationMode::Create)?;

        let id = Uuid::new_v4();
        let timestamp = now();

        let mut doc = (self.config.defaults)();
        doc.extend(body);
        doc.insert("id".to_string(), Value::String(id.to_string()));
        doc.insert("created_at".to_string(), timestamp.clone());
        doc.insert("updated_at".to_string(), timestamp);

        let created = self
            .repo
            .insert(self.config.collection, id, doc)
            .await
            .map_err(self.store_failure("create"))?;

        tracing::info!(collection = self.config.collection, %id, "document created");
        Ok(created)
    }

    /// update
    ///
    /// Partial payload merged over the stored document; last writer wins.
    pub async fn update(&self, id: &str, payload: Value) -> ApiResult<Document> {
        let uuid = self.parse_id(id)?;
        let mut patch = self.prepare_payload(payload, ValidationMode::Update)?;
        patch.insert("updated_at".to_string(), now());

        let updated = self
            .repo
            .update(self.config.collection, uuid, patch)
            .await
            .map_err(self.store_failure("update"))?
            .ok_or_else(|| self.not_found(id))?;

        tracing::info!(collection = self.config.collection, id = %uuid, "document updated");
        Ok(updated)
    }

    /// delete
    ///
    /// Deleting an id that is already gone is a not-found, not a success.
    pub async fn delete(&self, id: &str) -> ApiResult<()> {
        let uuid = self.parse_id(id)?;
        let removed = self
            .repo
            .delete(self.config.collection, uuid)
            .await
            .map_err(self.store_failure("delete"))?;

        if !removed {
            return Err(self.not_found(id));
        }
        tracing::info!(collection = self.config.collection, id = %uuid, "document deleted");
        Ok(())
    }

    /// record_view
    ///
    /// Bumps the view counter through the store's atomic increment.
    pub async fn record_view(&self, id: &str) -> ApiResult<Document> {
        let Some(counter) = self.config.counter_field else {
            return Err(ApiError::NotFound(format!(
                "{} records do not track views",
                self.config.name
            )));
        };
        let uuid = self.parse_id(id)?;
        self.repo
            .increment(self.config.collection, uuid, counter, 1)
            .await
            .map_err(self.store_failure("record_view"))?
            .ok_or_else(|| self.not_found(id))
    }
}
