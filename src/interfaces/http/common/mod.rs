//! Shared HTTP building blocks: response envelope, error mapping, extractors

mod error;
mod response;
pub mod validated_json;

pub use response::{ApiResponse, PaginatedResponse};
pub use validated_json::ValidatedJson;
