pub mod client;
pub mod error;
pub mod queries;
#[cfg(test)]
pub mod memory;
pub mod students;
pub mod types;

pub use client::{HttpBackend, RestClient};
pub use error::ApiError;
pub use queries::StudentQueryKey;
pub use students::StudentApi;
