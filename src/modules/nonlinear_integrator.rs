//! Pingable state-variable filter core.
//!
//! A Chamberlin state-variable filter with simultaneous low, band, high and
//! notch outputs. A trigger input "pings" the filter by injecting a short
//! 6 V pulse into the signal path, and a tiny random perturbation rides the
//! input at all times so the filter self-oscillates when the band output is
//! patched back into the signal input.

use crate::dsp::{PulseGenerator, SchmittTrigger};
use crate::levels::Levels;
use crate::port::{
    ModuleSpec, ParamDef, ParamId, PortDef, PortId, PortValues, RackModule, SignalKind,
};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use std::f64::consts::PI;

/// Resonance volts to damping exponent, matched to the panel's 0..12 range.
const Q_SCALE: f64 = -0.05 * 108900.0 / 15330.0;

/// Ping amplitude injected while the pulse is high.
const PING_VOLTS: f64 = 6.0;

/// Self-oscillation seed amplitude.
const SEED_VOLTS: f64 = 1e-6;

pub struct NonlinearIntegrator {
    ping: SchmittTrigger,
    pulse: PulseGenerator,
    low: f64,
    band: f64,
    high: f64,
    notch: f64,
    rng: StdRng,
    sample_rate: f64,
    levels: Levels,
    params: Vec<f64>,
    spec: ModuleSpec,
}

impl NonlinearIntegrator {
    pub const IN_TRIG: PortId = 0;
    pub const IN_VOCT: PortId = 1;
    pub const IN_FREQ_CV: PortId = 2;
    pub const IN_RES_CV: PortId = 3;
    pub const IN_SIGNAL: PortId = 4;

    pub const OUT_LOW: PortId = 10;
    pub const OUT_BAND: PortId = 11;
    pub const OUT_HIGH: PortId = 12;
    pub const OUT_NOTCH: PortId = 13;

    pub const P_IN_LEVEL: ParamId = 0;
    pub const P_FREQ: ParamId = 1;
    pub const P_RES: ParamId = 2;
    pub const P_FREQ_CV_GAIN: ParamId = 3;
    pub const P_RES_CV_GAIN: ParamId = 4;

    pub fn new(sample_rate: f64) -> Self {
        Self::with_levels(sample_rate, Levels::default())
    }

    pub fn with_levels(sample_rate: f64, levels: Levels) -> Self {
        let spec = ModuleSpec {
            inputs: vec![
                PortDef::new(Self::IN_TRIG, "trigger", SignalKind::Trigger),
                PortDef::new(Self::IN_VOCT, "voct", SignalKind::VoltPerOctave),
                PortDef::new(Self::IN_FREQ_CV, "freq_cv", SignalKind::CvBipolar),
                PortDef::new(Self::IN_RES_CV, "res_cv", SignalKind::CvBipolar),
                PortDef::new(Self::IN_SIGNAL, "in", SignalKind::Audio),
            ],
            outputs: vec![
                PortDef::new(Self::OUT_LOW, "low", SignalKind::Audio),
                PortDef::new(Self::OUT_BAND, "band", SignalKind::Audio),
                PortDef::new(Self::OUT_HIGH, "high", SignalKind::Audio),
                PortDef::new(Self::OUT_NOTCH, "notch", SignalKind::Audio),
            ],
            params: vec![
                ParamDef::new(Self::P_IN_LEVEL, "in_level", 0.0, 1.0, 0.0),
                ParamDef::new(Self::P_FREQ, "freq", -4.0, 13.0, -4.0)
                    .with_unit("Hz")
                    .exponential(2.0),
                ParamDef::new(Self::P_RES, "resonance", 0.0, 12.0, 0.0)
                    .with_multiplier(1.0 / 12.0),
                ParamDef::new(Self::P_FREQ_CV_GAIN, "freq_cv_gain", -1.0, 1.0, 0.0),
                ParamDef::new(Self::P_RES_CV_GAIN, "res_cv_gain", -2.0, 2.0, 0.0)
                    .with_multiplier(0.5),
            ],
            lights: vec![],
        };
        let params = spec.default_params();
        Self {
            ping: SchmittTrigger::new(),
            pulse: PulseGenerator::new(),
            low: 0.0,
            band: 0.0,
            high: 0.0,
            notch: 0.0,
            rng: StdRng::seed_from_u64(0x5eed_cafe),
            sample_rate,
            levels,
            params,
            spec,
        }
    }
}

impl Default for NonlinearIntegrator {
    fn default() -> Self {
        Self::new(44100.0)
    }
}

impl RackModule for NonlinearIntegrator {
    fn spec(&self) -> &ModuleSpec {
        &self.spec
    }

    fn tick(&mut self, inputs: &PortValues, outputs: &mut PortValues) {
        let dt = 1.0 / self.sample_rate;
        let th = self.levels.trigger_threshold;

        if self.ping.process(inputs.voltage(Self::IN_TRIG), th, th) {
            self.pulse.trigger(PulseGenerator::DEFAULT_DURATION);
        }

        let seed = SEED_VOLTS * self.rng.gen_range(-1.0..1.0);
        let mut drive =
            inputs.voltage(Self::IN_SIGNAL) * self.params[Self::P_IN_LEVEL as usize] + seed;
        if self.pulse.process(dt) {
            drive += PING_VOLTS;
        }
        let drive = drive.clamp(self.levels.v_min, self.levels.v_max);

        let pitch = (inputs.voltage(Self::IN_FREQ_CV)
            * self.params[Self::P_FREQ_CV_GAIN as usize]
            + self.params[Self::P_FREQ as usize]
            + inputs.voltage(Self::IN_VOCT))
        .clamp(-4.0, 13.0);
        let res = (inputs.voltage(Self::IN_RES_CV) * self.params[Self::P_RES_CV_GAIN as usize]
            + self.params[Self::P_RES as usize])
            .clamp(0.0, 12.0);

        let f = 2.0 * (PI * dt * pitch.exp2()).sin();
        let q = 10.0_f64.powf(Q_SCALE * res);

        self.notch = q * self.band - drive;
        self.high = -(self.notch + self.low);
        self.band += f * self.high;
        self.low += f * self.band;
        self.low = self.low.clamp(self.levels.v_min, self.levels.v_max);
        self.band = self.band.clamp(self.levels.v_min, self.levels.v_max);
        self.high = self.high.clamp(self.levels.v_min, self.levels.v_max);
        self.notch = self.notch.clamp(self.levels.v_min, self.levels.v_max);

        outputs.set(Self::OUT_LOW, self.low);
        outputs.set(Self::OUT_BAND, self.band);
        outputs.set(Self::OUT_HIGH, self.high);
        outputs.set(Self::OUT_NOTCH, self.notch);
    }

    fn reset(&mut self) {
        self.ping.reset();
        self.pulse.reset();
        self.low = 0.0;
        self.band = 0.0;
        self.high = 0.0;
        self.notch = 0.0;
    }

    fn set_sample_rate(&mut self, sample_rate: f64) {
        self.sample_rate = sample_rate;
    }

    fn param(&self, id: ParamId) -> f64 {
        self.params.get(id as usize).copied().unwrap_or(0.0)
    }

    fn set_param(&mut self, id: ParamId, value: f64) {
        if let Some(def) = self.spec.param_by_id(id) {
            self.params[id as usize] = def.clamp(value);
        }
    }

    fn type_id(&self) -> &'static str {
        "nonlinear_integrator"
    }
}
