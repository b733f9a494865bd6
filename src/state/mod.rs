/// State shared between the router and the backends
///
/// This module holds the plain data model that flows between
/// the catalog layer and the channel layer:
/// - Image references and catalog rows (data.rs)
///
/// Nothing in here is cached across calls; every value is resolved fresh.

pub mod data;
