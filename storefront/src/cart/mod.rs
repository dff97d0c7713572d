//! Local cart.
//!
//! Per-identity persistent buckets with merge-on-add, change events, and
//! debounced quantity edits.

mod debounce;
mod store;

pub use debounce::QuantityDebouncer;
pub use store::{CartEvent, CartStore};
