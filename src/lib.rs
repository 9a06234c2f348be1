//! # Voltaic: Audio-Rate Modules for Modular Synthesizer Hosts
//!
//! `voltaic` is a library of per-sample signal-processing modules in the
//! hardware modular tradition: comparators that count, a chaotic digital
//! oscillator pair, slew integrators with track/sample-and-hold, a pingable
//! state-variable filter, a two-row voltage sequencer and a multi-stage
//! window/envelope generator.
//!
//! Every module implements [`port::RackModule`]: the host owns the cabling
//! and calls [`tick`](port::RackModule::tick) once per audio frame with the
//! input voltages, and the module writes its output voltages back. Voltage
//! conventions (trigger thresholds, gate levels, rails) live in an injected
//! [`levels::Levels`] value.
//!
//! ## Quick Start
//!
//! ```rust
//! use voltaic::prelude::*;
//!
//! let mut osc = DigitalChaos::new(48000.0);
//! let inputs = PortValues::new();
//! let mut outputs = PortValues::new();
//!
//! // One second of free-running chaos.
//! for _ in 0..48000 {
//!     osc.tick(&inputs, &mut outputs);
//! }
//! let stepped = outputs.voltage(DigitalChaos::OUT_STEPPED);
//! assert!((0.0..=5.0).contains(&stepped));
//! ```

pub mod dsp;
pub mod levels;
pub mod modules;
pub mod port;
pub mod vector;

/// Prelude module for convenient imports
pub mod prelude {
    pub use crate::dsp::{PulseGenerator, RcFilter, Schmitt4, SchmittTrigger, Slew4, SlewLimiter};
    pub use crate::levels::Levels;
    pub use crate::modules::{
        ComparingCounter, DigitalChaos, DualIntegrator, NonlinearIntegrator, VoltageSequencer,
        WindowGenerators,
    };
    pub use crate::port::{
        LightDef, ModuleSpec, ParamDef, ParamId, PortDef, PortId, PortValues, RackModule,
        SignalKind,
    };
    pub use crate::vector::{Float4, Mask4};
}
