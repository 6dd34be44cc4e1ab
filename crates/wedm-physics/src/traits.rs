//! The single update contract shared by every physics model.

use crate::record::SimRecord;
use crate::rng::SimRng;

/// A physical sub-model advanced once per base step.
///
/// Implementations mutate only the record fields they own and must not hold
/// on to the record beyond the call. Working buffers are allocated in the
/// constructor; `update` must not allocate.
pub trait ProcessModule {
    /// Model name for diagnostics.
    fn name(&self) -> &'static str;

    /// Advance the model by one base step.
    fn update(&mut self, record: &mut SimRecord, rng: &mut SimRng);

    /// Clear episode-scoped internal state (latches, memories). Caches that
    /// depend only on configuration may survive.
    fn reset(&mut self) {}
}
