//! Storefront engine.
//!
//! Client-side logic for a configurable-product storefront: the combination
//! filter that drives which form controls are enabled, the two-level
//! derived-data cache for per-configuration images and product codes, the
//! locally persisted cart, the service-hours gate and order submission.
//!
//! All real state (users, orders, rate limits, time windows) is owned by the
//! hosted platform behind [`platform_client::PlatformApi`]; this crate is
//! deliberately UI-free and side-effect-light so every piece is unit
//! testable with an in-process platform, a fake clock and an in-memory
//! key-value store.

pub mod cart;
pub mod configurator;
pub mod core;
pub mod hours;
pub mod kv;
pub mod media;
pub mod onboarding;
pub mod orders;
pub mod utils;

pub use crate::core::{Engine, EngineConfig};
pub use crate::utils::{AppError, AppResult};
