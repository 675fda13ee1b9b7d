//! Single-flight submit guard.

use std::sync::atomic::{AtomicBool, Ordering};

use crate::error::Error;

/// Submit phase of a composer or editor.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SubmitState {
    Idle,
    Submitting,
}

/// Mutual exclusion for one screen's submit action.
///
/// `begin` flips Idle to Submitting and hands back a permit; dropping
/// the permit returns the state to Idle, however the submit ended.
#[derive(Debug, Default)]
pub struct SingleFlight {
    submitting: AtomicBool,
}

impl SingleFlight {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn state(&self) -> SubmitState {
        if self.submitting.load(Ordering::Acquire) {
            SubmitState::Submitting
        } else {
            SubmitState::Idle
        }
    }

    /// Claim the in-flight slot, or fail with `Error::Busy`.
    pub fn begin(&self) -> Result<FlightPermit<'_>, Error> {
        self.submitting
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .map_err(|_| Error::Busy)?;
        Ok(FlightPermit { flight: self })
    }
}

/// Proof that the holder owns the in-flight slot.
#[derive(Debug)]
pub struct FlightPermit<'a> {
    flight: &'a SingleFlight,
}

impl Drop for FlightPermit<'_> {
    fn drop(&mut self) {
        self.flight.submitting.store(false, Ordering::Release);
    }
}
