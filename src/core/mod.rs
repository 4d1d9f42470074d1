pub mod config;
pub mod errors;

pub use config::{ FieldPair, PipelineConfig };
pub use errors::ProphoraError;
