//! Capture-event correlation
//!
//! - **event**: the `CompositeEvent` record
//! - **correlator**: trigger handling and derived-field computation

pub mod correlator;
pub mod event;

pub use correlator::{
    micros_to_iso8601, CorrelateError, CorrelateResult, CorrelatorConfig, EventCorrelator,
};
pub use event::CompositeEvent;
