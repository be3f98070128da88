//! Per-type configuration consumed by the generic CRUD controller.

use serde_json::{Value, json};

use crate::{
    error::FieldError,
    repository::Document,
    validation::{Rules, ValidationMode},
};

/// Checks a payload and returns every failed rule. Empty means valid.
pub type Validator = fn(&Document, ValidationMode) -> Vec<FieldError>;

/// How a query-string filter is parsed and compared.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FilterKind {
    /// Exact string match; matches membership for string arrays.
    Text,
    Boolean,
    /// Equality plus `[gt]`, `[gte]`, `[lt]`, `[lte]` numeric bounds.
    NumberRange,
    /// Equality plus bounds over RFC 3339 / `YYYY-MM-DD` values.
    DateRange,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FilterSpec {
    pub field: &'static str,
    pub kind: FilterKind,
}

const fn filter(field: &'static str, kind: FilterKind) -> FilterSpec {
    FilterSpec { field, kind }
}

/// ContentTypeConfig
///
/// Everything that differs between content types: where it lives, how payloads
/// are checked, what clients may search, filter and sort on.
#[derive(Debug, Clone)]
pub struct ContentTypeConfig {
    /// Singular human name, used in messages ("article 42 not found").
    pub name: &'static str,
    pub collection: &'static str,
    /// Route prefix, e.g. `/api/blog/articles`.
    pub base_path: &'static str,
    pub validator: Validator,
    pub search_fields: &'static [&'static str],
    pub filters: &'static [FilterSpec],
    /// Sortable content fields in addition to `created_at` / `updated_at`.
    pub sort_fields: &'static [&'static str],
    pub default_limit: u64,
    pub max_limit: u64,
    /// Field used by the get-by-slug lookup, if the type has one.
    pub slug_field: Option<&'static str>,
    /// Denormalized view/click counter, if the type has one.
    pub counter_field: Option<&'static str>,
    /// Values applied on create when the payload leaves them out.
    pub defaults: fn() -> Document,
}

impl ContentTypeConfig {
    pub fn filter_spec(&self, field: &str) -> Option<&FilterSpec> {
        self.filters.iter().find(|spec| spec.field == field)
    }

    /// Fields filtered as dates; their stored values are kept in UTC form.
    pub fn date_fields(&self) -> impl Iterator<Item = &'static str> + '_ {
        self.filters
            .iter()
            .filter(|spec| spec.kind == FilterKind::DateRange)
            .map(|spec| spec.field)
    }

    pub fn is_sortable(&self, field: &str) -> bool {
        matches!(field, "created_at" | "updated_at") || self.sort_fields.contains(&field)
    }
}

const ARTICLE_FILTERS: &[FilterSpec] = &[
    filter("status", FilterKind::Text),
    filter("category", FilterKind::Text),
    filter("author", FilterKind::Text),
    filter("tags", FilterKind::Text),
    filter("featured", FilterKind::Boolean),
    filter("published_at", FilterKind::DateRange),
    filter("views", FilterKind::NumberRange),
];

const POSITION_FILTERS: &[FilterSpec] = &[
    filter("status", FilterKind::Text),
    filter("department", FilterKind::Text),
    filter("location", FilterKind::Text),
    filter("employment_type", FilterKind::Text),
    filter("closing_date", FilterKind::DateRange),
];

const PROJECT_FILTERS: &[FilterSpec] = &[
    filter("status", FilterKind::Text),
    filter("category", FilterKind::Text),
    filter("location", FilterKind::Text),
    filter("featured", FilterKind::Boolean),
    filter("year", FilterKind::NumberRange),
];

const STATUS_ONLY: &[FilterSpec] = &[filter("status", FilterKind::Text)];

pub const PUBLICATION_STATUSES: &[&str] = &["draft", "published", "archived"];
pub const POSITION_STATUSES: &[&str] = &["draft", "active", "archived"];
pub const TAXONOMY_STATUSES: &[&str] = &["active", "archived"];
pub const EMPLOYMENT_TYPES: &[&str] = &["full-time", "part-time", "contract", "internship"];

fn object(value: Value) -> Document {
    match value {
        Value::Object(map) => map,
        _ => Document::new(),
    }
}

// --- Articles ---

fn validate_article(doc: &Document, mode: ValidationMode) -> Vec<FieldError> {
    Rules::new(doc, mode)
        .required_text("title", 200)
        .slug("slug")
        .required_text("content", 100_000)
        .optional_text("excerpt", 500)
        .optional_text("author", 120)
        .optional_text("category", 120)
        .optional_text("cover_image", 1024)
        .text_list("tags")
        .one_of("status", PUBLICATION_STATUSES)
        .boolean("featured")
        .date("published_at")
        .integer_between("views", 0, i64::MAX)
        .finish()
}

pub fn articles() -> ContentTypeConfig {
    ContentTypeConfig {
        name: "article",
        collection: "articles",
        base_path: "/api/blog/articles",
        validator: validate_article,
        search_fields: &["title", "excerpt", "content", "author", "tags"],
        filters: ARTICLE_FILTERS,
        sort_fields: &["published_at", "title", "views"],
        default_limit: 10,
        max_limit: 50,
        slug_field: Some("slug"),
        counter_field: Some("views"),
        defaults: || {
            object(json!({ "status": "draft", "featured": false, "tags": [], "views": 0 }))
        },
    }
}

// --- Careers ---

fn validate_position(doc: &Document, mode: ValidationMode) -> Vec<FieldError> {
    Rules::new(doc, mode)
        .required_text("title", 200)
        .required_text("department", 120)
        .required_text("location", 200)
        .required_text("description", 50_000)
        .one_of("employment_type", EMPLOYMENT_TYPES)
        .text_list("requirements")
        .text_list("responsibilities")
        .text_list("benefits")
        .optional_text("salary_range", 120)
        .one_of("status", POSITION_STATUSES)
        .date("closing_date")
        .integer_between("views", 0, i64::MAX)
        .finish()
}

pub fn career_positions() -> ContentTypeConfig {
    ContentTypeConfig {
        name: "career position",
        collection: "career_positions",
        base_path: "/api/careers/positions",
        validator: validate_position,
        search_fields: &["title", "description", "location", "department"],
        filters: POSITION_FILTERS,
        sort_fields: &["title", "closing_date", "views"],
        default_limit: 20,
        max_limit: 100,
        slug_field: None,
        counter_field: Some("views"),
        defaults: || object(json!({ "status": "draft", "views": 0 })),
    }
}

fn validate_department(doc: &Document, mode: ValidationMode) -> Vec<FieldError> {
    Rules::new(doc, mode)
        .required_text("name", 100)
        .slug("slug")
        .optional_text("description", 2_000)
        .one_of("status", TAXONOMY_STATUSES)
        .finish()
}

pub fn career_departments() -> ContentTypeConfig {
    ContentTypeConfig {
        name: "career department",
        collection: "career_departments",
        base_path: "/api/careers/departments",
        validator: validate_department,
        search_fields: &["name", "description"],
        filters: STATUS_ONLY,
        sort_fields: &["name"],
        default_limit: 50,
        max_limit: 100,
        slug_field: Some("slug"),
        counter_field: None,
        defaults: || object(json!({ "status": "active" })),
    }
}

// --- Portfolio ---

fn validate_project(doc: &Document, mode: ValidationMode) -> Vec<FieldError> {
    Rules::new(doc, mode)
        .required_text("title", 200)
        .slug("slug")
        .required_text("category", 120)
        .required_text("description", 50_000)
        .optional_text("client", 200)
        .optional_text("location", 200)
        .optional_text("cover_image", 1024)
        .text_list("images")
        .integer_between("year", 1900, 2100)
        .non_negative_number("value")
        .boolean("featured")
        .one_of("status", PUBLICATION_STATUSES)
        .integer_between("views", 0, i64::MAX)
        .finish()
}

pub fn portfolio_projects() -> ContentTypeConfig {
    ContentTypeConfig {
        name: "portfolio project",
        collection: "portfolio_projects",
        base_path: "/api/portfolio/projects",
        validator: validate_project,
        search_fields: &["title", "description", "client", "location"],
        filters: PROJECT_FILTERS,
        sort_fields: &["title", "year", "value", "views"],
        default_limit: 12,
        max_limit: 48,
        slug_field: Some("slug"),
        counter_field: Some("views"),
        defaults: || object(json!({ "status": "draft", "featured": false, "views": 0 })),
    }
}

fn validate_category(doc: &Document, mode: ValidationMode) -> Vec<FieldError> {
    Rules::new(doc, mode)
        .required_text("name", 100)
        .slug("slug")
        .optional_text("description", 2_000)
        .integer_between("order", 0, 10_000)
        .one_of("status", TAXONOMY_STATUSES)
        .finish()
}

pub fn portfolio_categories() -> ContentTypeConfig {
    ContentTypeConfig {
        name: "portfolio category",
        collection: "portfolio_categories",
        base_path: "/api/portfolio/categories",
        validator: validate_category,
        search_fields: &["name", "description"],
        filters: STATUS_ONLY,
        sort_fields: &["name", "order"],
        default_limit: 50,
        max_limit: 100,
        slug_field: Some("slug"),
        counter_field: None,
        defaults: || object(json!({ "status": "active" })),
    }
}

/// Every content type the service exposes.
pub fn all() -> Vec<ContentTypeConfig> {
    vec![
        articles(),
        career_positions(),
        career_departments(),
        portfolio_projects(),
        portfolio_categories(),
    ]
}
