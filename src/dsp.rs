//! Per-sample DSP building blocks.
//!
//! Small stateful processors shared by the modules: hysteretic edge
//! detectors, rate-limited slews, a one-shot pulse generator and a one-pole
//! RC lowpass. Everything here is allocation-free and bounded-time.

use crate::vector::{Float4, Mask4};
use std::f64::consts::PI;

/// Hysteretic rising-edge detector.
///
/// The latch starts *high* ("armed") so that a signal which is already high
/// on the very first sample does not produce a spurious trigger; the input
/// must fall to or below the low threshold before the next crossing fires.
#[derive(Debug, Clone, Copy)]
pub struct SchmittTrigger {
    high: bool,
}

impl SchmittTrigger {
    pub fn new() -> Self {
        Self { high: true }
    }

    pub fn reset(&mut self) {
        self.high = true;
    }

    /// Current latched state, usable as a level signal.
    #[inline]
    pub fn is_high(&self) -> bool {
        self.high
    }

    /// Returns true exactly on the sample of a low-to-high transition.
    #[inline]
    pub fn process(&mut self, v: f64, low: f64, high: f64) -> bool {
        let on = v >= high;
        let off = v <= low;
        let triggered = !self.high && on;
        self.high = on || (self.high && !off);
        triggered
    }
}

impl Default for SchmittTrigger {
    fn default() -> Self {
        Self::new()
    }
}

/// Four independent Schmitt trigger channels processed in lock-step.
///
/// Same arming policy as [`SchmittTrigger`]; unused lanes can be fed 0 V and
/// simply stay low after disarming.
#[derive(Debug, Clone, Copy)]
pub struct Schmitt4 {
    high: Mask4,
}

impl Schmitt4 {
    pub fn new() -> Self {
        Self { high: Mask4::ALL }
    }

    pub fn reset(&mut self) {
        self.high = Mask4::ALL;
    }

    #[inline]
    pub fn is_high(&self) -> Mask4 {
        self.high
    }

    /// Per-lane rising-edge events for this sample.
    #[inline]
    pub fn process(&mut self, v: Float4, low: f64, high: f64) -> Mask4 {
        let on = v.ge(Float4::splat(high));
        let off = v.le(Float4::splat(low));
        let triggered = (!self.high).and(on);
        self.high = on.or(self.high.and(!off));
        triggered
    }
}

impl Default for Schmitt4 {
    fn default() -> Self {
        Self::new()
    }
}

/// Rate-limited tracking of a target value.
///
/// Rates are in volts per second and must be non-negative; a rate of 0 holds
/// the output indefinitely. No voltage clamping is performed here.
#[derive(Debug, Clone, Copy, Default)]
pub struct SlewLimiter {
    out: f64,
    rise: f64,
    fall: f64,
}

impl SlewLimiter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_rise_fall(&mut self, rise: f64, fall: f64) {
        self.rise = rise;
        self.fall = fall;
    }

    #[inline]
    pub fn out(&self) -> f64 {
        self.out
    }

    pub fn reset(&mut self) {
        self.out = 0.0;
    }

    /// Move toward `target` by at most `rate * dt`, returning the new output.
    #[inline]
    pub fn process(&mut self, dt: f64, target: f64) -> f64 {
        self.out = target.clamp(self.out - self.fall * dt, self.out + self.rise * dt);
        self.out
    }
}

/// Four independent slew limiter channels.
#[derive(Debug, Clone, Copy, Default)]
pub struct Slew4 {
    out: Float4,
    rise: Float4,
    fall: Float4,
}

impl Slew4 {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_rise_fall(&mut self, rise: Float4, fall: Float4) {
        self.rise = rise;
        self.fall = fall;
    }

    #[inline]
    pub fn out(&self) -> Float4 {
        self.out
    }

    pub fn reset(&mut self) {
        self.out = Float4::ZERO;
    }

    #[inline]
    pub fn process(&mut self, dt: f64, target: Float4) -> Float4 {
        self.out = target.clamp(self.out - self.fall * dt, self.out + self.rise * dt);
        self.out
    }
}

/// One-shot pulse with a fixed duration in seconds.
#[derive(Debug, Clone, Copy, Default)]
pub struct PulseGenerator {
    remaining: f64,
}

impl PulseGenerator {
    /// Default ping/trigger pulse width.
    pub const DEFAULT_DURATION: f64 = 1e-3;

    pub fn new() -> Self {
        Self::default()
    }

    /// Start (or extend) a pulse. A shorter duration never cuts a running
    /// pulse short.
    pub fn trigger(&mut self, duration: f64) {
        if duration > self.remaining {
            self.remaining = duration;
        }
    }

    pub fn reset(&mut self) {
        self.remaining = 0.0;
    }

    /// Advance by one time step; true while the pulse is active.
    #[inline]
    pub fn process(&mut self, dt: f64) -> bool {
        if self.remaining > 0.0 {
            self.remaining -= dt;
            true
        } else {
            false
        }
    }
}

/// One-pole RC lowpass (bilinear transform).
#[derive(Debug, Clone, Copy, Default)]
pub struct RcFilter {
    c: f64,
    x1: f64,
    y1: f64,
}

impl RcFilter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the cutoff as a fraction of the sample rate
    /// (`f_norm = cutoff_hz * sample_time`).
    pub fn set_cutoff(&mut self, f_norm: f64) {
        self.c = 2.0 / (2.0 * PI * f_norm);
    }

    pub fn reset(&mut self) {
        self.x1 = 0.0;
        self.y1 = 0.0;
    }

    #[inline]
    pub fn process(&mut self, x: f64) {
        let y = (x + self.x1 - self.y1 * (1.0 - self.c)) / (1.0 + self.c);
        self.x1 = x;
        self.y1 = y;
    }

    #[inline]
    pub fn lowpass(&self) -> f64 {
        self.y1
    }

    #[inline]
    pub fn highpass(&self) -> f64 {
        self.x1 - self.y1
    }
}
