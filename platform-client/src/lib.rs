//! Client for the hosted backend-as-a-service platform.
//!
//! The storefront delegates authentication, persistence and business-rule
//! enforcement to a remote platform; this crate is the typed boundary. The
//! [`PlatformApi`] trait covers the handful of reads and writes the engine
//! needs, [`RestPlatform`] speaks the platform's PostgREST-style HTTP
//! surface, and [`MemoryPlatform`] is an in-process implementation for tests
//! and offline development.

mod api;
mod config;
mod error;
mod memory;
mod rest;

pub use api::PlatformApi;
pub use config::ClientConfig;
pub use error::{ClientError, ClientResult};
pub use memory::MemoryPlatform;
pub use rest::RestPlatform;
