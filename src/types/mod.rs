//! Public types for the Lectern API.

mod options;
mod result;

pub use options::{GenerationOptions, ResponseFormat};
pub use result::{
    AudioUsage, BatchFailure, BatchItem, BatchResult, CACHE_PROVIDER, GenerationResult, TokenUsage,
};
