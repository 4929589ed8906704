pub mod acquire;
pub mod config;
pub mod decode;
pub mod error;
pub mod export;
pub mod parse;
pub mod table;

pub use config::PipelineConfig;
pub use error::NormalizeError;
pub use table::{NormalizedTable, RawRow, RawTable, TableKind};
