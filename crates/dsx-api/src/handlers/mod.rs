pub mod bulk_insert;
pub mod health;
pub mod process_zip;
