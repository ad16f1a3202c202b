//! Record loading: the loader trait, CSV exports, and header layout

pub mod csv_loader;
pub mod provider;
pub mod schema;

pub use csv_loader::CsvDirLoader;
pub use provider::{DataError, MemoryLoader, SentimentTrend, SeriesLoader};
pub use schema::{RecordSchema, SchemaError};
