pub mod accumulator;
pub mod config;
pub mod error;
pub mod error_utils;
pub mod tokenizer;
pub mod types;

pub use accumulator::*;
pub use config::*;
pub use error::*;
pub use error_utils::*;
pub use tokenizer::*;
pub use types::*;
