//! Async query cache for data fetching.
//!
//! Inspired by TanStack Query. A [`QueryClient`] owns one cache entry per key
//! and is shared by every view; a [`Query`] is a view's mounted observer of one
//! key, and a [`Mutation`] tracks a single write.
//!
//! # Example
//!
//! ```ignore
//! let api = student_api.clone();
//! let mut query = client.query(
//!   StudentQueryKey::Students { page: 1 },
//!   QueryOptions::default().keep_previous_data(),
//!   move |key| {
//!     let api = api.clone();
//!     async move { api.list(key.page(), None).await }
//!   },
//! );
//!
//! // In render
//! if query.is_loading() {
//!   render_skeleton();
//! } else if let Some(page) = query.data() {
//!   render_rows(&page);
//! }
//!
//! // Moving to another page keeps the old rows until the new ones arrive
//! query.set_key(StudentQueryKey::Students { page: 2 });
//! ```

mod client;
mod mutation;
mod observer;

pub use client::{QueryClient, QueryOptions, Subscription};
pub use mutation::{Mutation, MutationState};
pub use observer::Query;

use std::fmt::Debug;
use std::hash::Hash;

/// Identifies one cached request: the operation plus its parameters.
pub trait QueryKey: Clone + Eq + Hash + Debug + Send + Sync + 'static {
  /// Human readable description for logs
  fn description(&self) -> String;
}
