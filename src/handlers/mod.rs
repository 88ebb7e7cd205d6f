/// Handler Module Index
///
/// HTTP handlers grouped by surface. Admin handlers take a `SessionUser` (attached by
/// the role gate) and check their section before doing anything else; public handlers
/// read published rows only.
pub mod auth;
pub mod content;
pub mod dashboard;
pub mod media;
pub mod public;
pub mod users;
