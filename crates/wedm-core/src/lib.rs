//! wedm-core: shared foundation for the wire-EDM simulator.
//!
//! Contains:
//! - units (uom SI types + constructors for the µm/mm/µs scales used by the kernel)
//! - numeric (finite / sign guards + gap quantization)
//! - timing (wall-clock timers and real-time factor)
//! - error (shared error types)

pub mod error;
pub mod numeric;
pub mod timing;
pub mod units;

pub use error::{CoreError, CoreResult};
pub use numeric::*;
