//! Module interface: signal conventions, port/parameter/light metadata and
//! the type-erased per-sample processing trait.
//!
//! A host owns the cabling; from a module's point of view every sample is a
//! read of input voltages and parameter values followed by a write of output
//! voltages (and, as a side effect, indicator light brightnesses).

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Unique identifier for a port within a module.
pub type PortId = u32;

/// Unique identifier for a parameter within a module.
pub type ParamId = u32;

/// Unique identifier for an indicator light within a module.
pub type LightId = u32;

/// Semantic signal classification following hardware modular conventions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SignalKind {
    /// Audio signal, AC-coupled, typically ±5V peak.
    Audio,

    /// Bipolar control voltage, ±5V.
    CvBipolar,

    /// Unipolar control voltage, 0–10V.
    CvUnipolar,

    /// Pitch CV following the 1V/octave standard.
    VoltPerOctave,

    /// Gate signal: low (0V) or high (+5V) while an event is active.
    Gate,

    /// Trigger signal: a short pulse marking an instantaneous event.
    Trigger,

    /// Clock signal: regular trigger pulses at tempo.
    Clock,
}

impl SignalKind {
    /// Typical voltage range (min, max) for this signal type.
    pub fn voltage_range(&self) -> (f64, f64) {
        match self {
            SignalKind::Audio => (-5.0, 5.0),
            SignalKind::CvBipolar => (-5.0, 5.0),
            SignalKind::CvUnipolar => (0.0, 10.0),
            SignalKind::VoltPerOctave => (-5.0, 5.0),
            SignalKind::Gate => (0.0, 5.0),
            SignalKind::Trigger => (0.0, 5.0),
            SignalKind::Clock => (0.0, 5.0),
        }
    }
}

/// Definition of a single input or output port.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PortDef {
    /// Unique identifier within the module.
    pub id: PortId,

    /// Human-readable name (e.g. "clock", "stepped").
    pub name: String,

    /// Signal type for validation and UI hints.
    pub kind: SignalKind,

    /// For inputs: internal source substituted when unpatched.
    pub normalled_to: Option<PortId>,
}

impl PortDef {
    pub fn new(id: PortId, name: impl Into<String>, kind: SignalKind) -> Self {
        Self {
            id,
            name: name.into(),
            kind,
            normalled_to: None,
        }
    }

    pub fn normalled_to(mut self, port: PortId) -> Self {
        self.normalled_to = Some(port);
        self
    }
}

/// Definition of a bounded floating-point control.
///
/// Knob voltages are stored raw; `display_value` maps them to the value a
/// panel would print (e.g. a rate knob at 3.0 V with `display_base = 2`
/// reads as 8 Hz).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ParamDef {
    pub id: ParamId,
    pub name: String,
    pub min: f64,
    pub max: f64,
    pub default: f64,

    /// Display unit suffix, e.g. "V", "Hz", "s".
    pub unit: Option<String>,

    /// Exponential display scaling: displayed = multiplier * base^value.
    /// `None` means linear: displayed = multiplier * value.
    pub display_base: Option<f64>,

    pub display_multiplier: f64,

    /// For discrete switches: one label per position, starting at `min`.
    pub labels: Option<Vec<String>>,
}

impl ParamDef {
    pub fn new(id: ParamId, name: impl Into<String>, min: f64, max: f64, default: f64) -> Self {
        Self {
            id,
            name: name.into(),
            min,
            max,
            default,
            unit: None,
            display_base: None,
            display_multiplier: 1.0,
            labels: None,
        }
    }

    pub fn with_unit(mut self, unit: impl Into<String>) -> Self {
        self.unit = Some(unit.into());
        self
    }

    pub fn exponential(mut self, base: f64) -> Self {
        self.display_base = Some(base);
        self
    }

    pub fn with_multiplier(mut self, multiplier: f64) -> Self {
        self.display_multiplier = multiplier;
        self
    }

    pub fn switch(mut self, labels: &[&str]) -> Self {
        self.labels = Some(labels.iter().map(|s| s.to_string()).collect());
        self
    }

    /// Clamp a raw value into this parameter's range.
    pub fn clamp(&self, value: f64) -> f64 {
        value.clamp(self.min, self.max)
    }

    /// The value a panel would display for a raw knob value.
    pub fn display_value(&self, value: f64) -> f64 {
        match self.display_base {
            Some(base) => self.display_multiplier * base.powf(value),
            None => self.display_multiplier * value,
        }
    }
}

/// Definition of an indicator light.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LightDef {
    pub id: LightId,
    pub name: String,

    /// Bi-color lights carry signed brightness.
    pub bipolar: bool,
}

impl LightDef {
    pub fn new(id: LightId, name: impl Into<String>) -> Self {
        Self {
            id,
            name: name.into(),
            bipolar: false,
        }
    }

    pub fn bipolar(mut self) -> Self {
        self.bipolar = true;
        self
    }
}

/// Full I/O specification of a module.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ModuleSpec {
    pub inputs: Vec<PortDef>,
    pub outputs: Vec<PortDef>,
    pub params: Vec<ParamDef>,
    pub lights: Vec<LightDef>,
}

impl ModuleSpec {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn input_by_name(&self, name: &str) -> Option<&PortDef> {
        self.inputs.iter().find(|p| p.name == name)
    }

    pub fn output_by_name(&self, name: &str) -> Option<&PortDef> {
        self.outputs.iter().find(|p| p.name == name)
    }

    pub fn param_by_id(&self, id: ParamId) -> Option<&ParamDef> {
        self.params.iter().find(|p| p.id == id)
    }

    pub fn param_by_name(&self, name: &str) -> Option<&ParamDef> {
        self.params.iter().find(|p| p.name == name)
    }

    /// Parameter values at their defaults, indexed by `ParamId`.
    ///
    /// Parameter ids are expected to be contiguous from 0, which every
    /// module in this crate follows.
    pub fn default_params(&self) -> Vec<f64> {
        let mut values = vec![0.0; self.params.len()];
        for p in &self.params {
            values[p.id as usize] = p.default;
        }
        values
    }
}

/// Runtime port voltages.
///
/// An absent input id means the port is unconnected; modules that normalize
/// an internal signal check presence via [`PortValues::get`].
#[derive(Debug, Clone, Default)]
pub struct PortValues {
    values: HashMap<PortId, f64>,
}

impl PortValues {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, id: PortId) -> Option<f64> {
        self.values.get(&id).copied()
    }

    pub fn get_or(&self, id: PortId, default: f64) -> f64 {
        self.values.get(&id).copied().unwrap_or(default)
    }

    /// Unconnected inputs read as 0 V.
    pub fn voltage(&self, id: PortId) -> f64 {
        self.get_or(id, 0.0)
    }

    pub fn set(&mut self, id: PortId, value: f64) {
        self.values.insert(id, value);
    }

    pub fn has(&self, id: PortId) -> bool {
        self.values.contains_key(&id)
    }

    pub fn remove(&mut self, id: PortId) {
        self.values.remove(&id);
    }

    pub fn clear(&mut self) {
        self.values.clear();
    }
}

/// Type-erased per-sample module interface.
///
/// The host calls [`tick`](RackModule::tick) exactly once per audio frame;
/// the call must not allocate, block or perform I/O.
pub trait RackModule: Send {
    /// The module's port/param/light specification.
    fn spec(&self) -> &ModuleSpec;

    /// Process one sample.
    fn tick(&mut self, inputs: &PortValues, outputs: &mut PortValues);

    /// Restore initial state (parameters are kept).
    fn reset(&mut self);

    /// Inform the module of the host sample rate.
    fn set_sample_rate(&mut self, sample_rate: f64);

    /// Current value of a parameter; 0.0 for unknown ids.
    fn param(&self, id: ParamId) -> f64;

    /// Set a parameter, clamped to its defined range.
    fn set_param(&mut self, id: ParamId, value: f64);

    /// Indicator light brightnesses, indexed by `LightId`.
    fn lights(&self) -> &[f64] {
        &[]
    }

    /// Module type identifier for host registries.
    fn type_id(&self) -> &'static str;

    /// Snapshot of the host-owned parameter values, keyed by name.
    fn save_params(&self) -> serde_json::Value {
        let map: serde_json::Map<String, serde_json::Value> = self
            .spec()
            .params
            .iter()
            .map(|p| (p.name.clone(), serde_json::json!(self.param(p.id))))
            .collect();
        serde_json::Value::Object(map)
    }

    /// Restore parameters from a [`save_params`](RackModule::save_params)
    /// snapshot. Unknown names are ignored; values are clamped as usual.
    fn load_params(&mut self, snapshot: &serde_json::Value) {
        let ids: Vec<(ParamId, String)> = self
            .spec()
            .params
            .iter()
            .map(|p| (p.id, p.name.clone()))
            .collect();
        for (id, name) in ids {
            if let Some(v) = snapshot.get(&name).and_then(|v| v.as_f64()) {
                self.set_param(id, v);
            }
        }
    }
}
