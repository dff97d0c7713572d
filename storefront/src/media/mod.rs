//! Media resolution for configured products.
//!
//! Which image to show, and which orderable code applies, for a given
//! (product, configuration) pair. Lookups hit a two-level TTL cache and
//! degrade to fallback images instead of erroring.

mod cache;
mod preload;
mod resolver;

pub use cache::MediaCache;
pub use preload::{HttpPreloader, ImagePreloader, NoopPreloader, SharedPreloader};
pub use resolver::MediaResolver;
