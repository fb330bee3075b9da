//! Database repositories for data access layer
//
// Image repository (bulk insert for ingestion)
pub mod image;

pub use image::PgImageRepository;
