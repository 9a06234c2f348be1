//! Shared voltage and threshold levels.
//!
//! Every module receives an immutable [`Levels`] value at construction time.
//! The defaults follow common hardware modular conventions: gates swing
//! between 0 V and +5 V, triggers fire at 1.8 V, and no signal ever leaves
//! the ±12 V rails.

use serde::{Deserialize, Serialize};

/// Process-wide voltage conventions, injected rather than global so modules
/// stay independently testable.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Levels {
    /// Rising-edge detection level for trigger/gate/clock inputs.
    pub trigger_threshold: f64,

    /// Gate output voltage when active.
    pub gate_on: f64,

    /// Gate output voltage when inactive.
    pub gate_off: f64,

    /// Indicator light brightness when lit.
    pub led_on: f64,

    /// Indicator light brightness when dark.
    pub led_off: f64,

    /// Lower voltage rail.
    pub v_min: f64,

    /// Upper voltage rail.
    pub v_max: f64,
}

impl Default for Levels {
    fn default() -> Self {
        Self {
            trigger_threshold: 1.8,
            gate_on: 5.0,
            gate_off: 0.0,
            led_on: 1.0,
            led_off: 0.0,
            v_min: -12.0,
            v_max: 12.0,
        }
    }
}

impl Levels {
    /// Gate voltage for a boolean state.
    #[inline]
    pub fn gate(&self, active: bool) -> f64 {
        if active {
            self.gate_on
        } else {
            self.gate_off
        }
    }

    /// Clamp a voltage to the rails.
    #[inline]
    pub fn clamp_voltage(&self, v: f64) -> f64 {
        v.clamp(self.v_min, self.v_max)
    }
}
