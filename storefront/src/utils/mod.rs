//! Engine-wide utilities: errors, results, clock, logging.

pub mod clock;
pub mod error;
pub mod logger;
pub mod result;

pub use clock::{Clock, FakeClock, SystemClock};
pub use error::AppError;
pub use result::AppResult;
