/// Router Module Index
///
/// Routes are split by access level. Reads of published content are public;
/// every write sits behind the admin authentication layer.

/// Read-only endpoints for the public site (content lists, records, pages).
pub mod public;

/// Mutating endpoints for the admin panel. Requires an `AdminUser`.
pub mod admin;
