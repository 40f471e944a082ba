pub mod models;
mod queries;
mod sqlite;

pub use sqlite::{Catalog, Database};
