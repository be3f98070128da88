use serde::{Deserialize, Serialize};
use ts_rs::TS;
use utoipa::ToSchema;
use uuid::Uuid;

// --- Stored record shapes ---
//
// Records travel through the CRUD controller as JSON documents; these structs
// describe what each content type looks like once stored. They feed the OpenAPI
// schemas and the TypeScript bindings used by the admin panel.

/// Article
///
/// A blog post. Public once `status` is `published`.
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, Default, PartialEq)]
#[ts(export)]
pub struct Article {
    pub id: Uuid,
    pub title: String,
    pub slug: String,
    pub content: String,
    #[serde(default)]
    pub excerpt: Option<String>,
    #[serde(default)]
    pub author: Option<String>,
    #[serde(default)]
    pub category: Option<String>,
    #[serde(default)]
    pub cover_image: Option<String>,
    #[serde(default)]
    pub tags: Vec<String>,
    pub status: String,
    #[serde(default)]
    pub featured: bool,
    /// RFC 3339 or `YYYY-MM-DD`.
    #[serde(default)]
    pub published_at: Option<String>,
    #[serde(default)]
    pub views: i64,
    pub created_at: String,
    pub updated_at: String,
}

/// CareerPosition
///
/// An open role listed on the careers page.
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, Default, PartialEq)]
#[ts(export)]
pub struct CareerPosition {
    pub id: Uuid,
    pub title: String,
    pub department: String,
    pub location: String,
    pub description: String,
    /// "full-time" | "part-time" | "contract" | "internship"
    #[serde(default)]
    pub employment_type: Option<String>,
    #[serde(default)]
    pub requirements: Vec<String>,
    #[serde(default)]
    pub responsibilities: Vec<String>,
    #[serde(default)]
    pub benefits: Vec<String>,
    #[serde(default)]
    pub salary_range: Option<String>,
    pub status: String,
    #[serde(default)]
    pub closing_date: Option<String>,
    #[serde(default)]
    pub views: i64,
    pub created_at: String,
    pub updated_at: String,
}

/// CareerDepartment
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, Default, PartialEq)]
#[ts(export)]
pub struct CareerDepartment {
    pub id: Uuid,
    pub name: String,
    pub slug: String,
    #[serde(default)]
    pub description: Option<String>,
    pub status: String,
    pub created_at: String,
    pub updated_at: String,
}

/// PortfolioProject
///
/// A delivered construction/infrastructure project shown in the portfolio.
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, Default, PartialEq)]
#[ts(export)]
pub struct PortfolioProject {
    pub id: Uuid,
    pub title: String,
    pub slug: String,
    pub category: String,
    pub description: String,
    #[serde(default)]
    pub client: Option<String>,
    #[serde(default)]
    pub location: Option<String>,
    #[serde(default)]
    pub cover_image: Option<String>,
    #[serde(default)]
    pub images: Vec<String>,
    #[serde(default)]
    pub year: Option<i32>,
    /// Contract value.
    #[serde(default)]
    pub value: Option<f64>,
    #[serde(default)]
    pub featured: bool,
    pub status: String,
    #[serde(default)]
    pub views: i64,
    pub created_at: String,
    pub updated_at: String,
}

/// PortfolioCategory
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, Default, PartialEq)]
#[ts(export)]
pub struct PortfolioCategory {
    pub id: Uuid,
    pub name: String,
    pub slug: String,
    #[serde(default)]
    pub description: Option<String>,
    /// Display position in the portfolio filter bar.
    #[serde(default)]
    pub order: Option<i32>,
    pub status: String,
    pub created_at: String,
    pub updated_at: String,
}

// --- Request / response payloads ---

/// PresignedUploadRequest
///
/// Input for `POST /api/admin/uploads/presigned`.
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, Default)]
#[ts(export)]
pub struct PresignedUploadRequest {
    /// Original filename; only its extension is kept.
    #[schema(example = "site-photo.jpg")]
    pub filename: String,
    /// MIME type the upload is constrained to.
    #[schema(example = "image/jpeg")]
    pub file_type: String,
    /// Collection the media belongs to, used as a key prefix.
    #[schema(example = "portfolio_projects")]
    pub collection: String,
}

/// PresignedUploadResponse
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, Default)]
#[ts(export)]
pub struct PresignedUploadResponse {
    /// Time-limited URL for the PUT request.
    pub upload_url: String,
    /// Object key to store on the record once the upload finished.
    pub resource_key: String,
}

/// ListMeta
///
/// `meta` of a list response.
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, Default)]
#[ts(export)]
pub struct ListMeta {
    pub total: u64,
    pub page: u64,
    pub limit: u64,
    pub total_pages: u64,
    #[ts(type = "Record<string, string>")]
    pub filters: std::collections::BTreeMap<String, String>,
    pub search: Option<String>,
}
