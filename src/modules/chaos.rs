//! Chaotic digital oscillator pair.
//!
//! Two exponential-FM oscillators (Clock and Data) feed an 8-bit shift
//! register: on every clock rising edge the register shifts right and takes
//! `data XOR lsb` into its top bit. The low three bits form an 8-level
//! stepped voltage, which is also available smoothed through a 20 Hz RC
//! lowpass; the raw XOR stream is the pulsed output. Both digital inputs
//! are normalled to the oscillators' own square waves, so the module
//! free-runs chaotically until patched.

use crate::dsp::{RcFilter, SchmittTrigger};
use crate::levels::Levels;
use crate::port::{
    ModuleSpec, ParamDef, ParamId, PortDef, PortId, PortValues, RackModule, SignalKind,
};
use crate::vector::Float4;

/// Cutoff of the smoothing filter in Hz.
const SMOOTH_CUTOFF: f64 = 20.0;

pub struct DigitalChaos {
    // Lanes 0/1: clock/data oscillator phase in [-0.5, 0.5).
    phases: Float4,
    clock: SchmittTrigger,
    shift_register: u8,
    smooth: RcFilter,
    sample_rate: f64,
    levels: Levels,
    params: Vec<f64>,
    spec: ModuleSpec,
}

impl DigitalChaos {
    pub const IN_FM1_CLOCK: PortId = 0;
    pub const IN_FM1_DATA: PortId = 1;
    pub const IN_FM2_CLOCK: PortId = 2;
    pub const IN_FM2_DATA: PortId = 3;
    pub const IN_VOCT_CLOCK: PortId = 4;
    pub const IN_DATA: PortId = 5;
    pub const IN_CLOCK: PortId = 6;
    pub const IN_VOCT_DATA: PortId = 7;

    pub const OUT_TRI_CLOCK: PortId = 10;
    pub const OUT_SQR_CLOCK: PortId = 11;
    pub const OUT_TRI_DATA: PortId = 12;
    pub const OUT_SQR_DATA: PortId = 13;
    pub const OUT_STEPPED: PortId = 14;
    pub const OUT_PULSED: PortId = 15;
    pub const OUT_SMOOTH: PortId = 16;

    pub const P_FREQ_CLOCK: ParamId = 0;
    pub const P_FREQ_DATA: ParamId = 1;
    pub const P_FM1_CLOCK_GAIN: ParamId = 2;
    pub const P_FM1_DATA_GAIN: ParamId = 3;
    pub const P_FM2_CLOCK_GAIN: ParamId = 4;
    pub const P_FM2_DATA_GAIN: ParamId = 5;

    pub fn new(sample_rate: f64) -> Self {
        Self::with_levels(sample_rate, Levels::default())
    }

    pub fn with_levels(sample_rate: f64, levels: Levels) -> Self {
        let spec = ModuleSpec {
            inputs: vec![
                PortDef::new(Self::IN_FM1_CLOCK, "clock_fm1", SignalKind::CvBipolar),
                PortDef::new(Self::IN_FM1_DATA, "data_fm1", SignalKind::CvBipolar),
                PortDef::new(Self::IN_FM2_CLOCK, "clock_fm2", SignalKind::CvBipolar),
                PortDef::new(Self::IN_FM2_DATA, "data_fm2", SignalKind::CvBipolar),
                PortDef::new(Self::IN_VOCT_CLOCK, "clock_voct", SignalKind::VoltPerOctave),
                PortDef::new(Self::IN_DATA, "data", SignalKind::Gate)
                    .normalled_to(Self::OUT_SQR_DATA),
                PortDef::new(Self::IN_CLOCK, "clock", SignalKind::Trigger)
                    .normalled_to(Self::OUT_SQR_CLOCK),
                PortDef::new(Self::IN_VOCT_DATA, "data_voct", SignalKind::VoltPerOctave),
            ],
            outputs: vec![
                PortDef::new(Self::OUT_TRI_CLOCK, "clock_tri", SignalKind::Audio),
                PortDef::new(Self::OUT_SQR_CLOCK, "clock_sqr", SignalKind::Audio),
                PortDef::new(Self::OUT_TRI_DATA, "data_tri", SignalKind::Audio),
                PortDef::new(Self::OUT_SQR_DATA, "data_sqr", SignalKind::Audio),
                PortDef::new(Self::OUT_STEPPED, "stepped", SignalKind::CvUnipolar),
                PortDef::new(Self::OUT_PULSED, "pulsed", SignalKind::Gate),
                PortDef::new(Self::OUT_SMOOTH, "smooth", SignalKind::CvUnipolar),
            ],
            params: vec![
                ParamDef::new(Self::P_FREQ_CLOCK, "clock_freq", -5.0, 15.0, 5.0)
                    .with_unit("Hz")
                    .exponential(2.0),
                ParamDef::new(Self::P_FREQ_DATA, "data_freq", -5.0, 15.0, 5.0)
                    .with_unit("Hz")
                    .exponential(2.0),
                ParamDef::new(Self::P_FM1_CLOCK_GAIN, "clock_fm1_gain", 0.0, 1.0, 0.0),
                ParamDef::new(Self::P_FM1_DATA_GAIN, "data_fm1_gain", -1.0, 1.0, 0.0),
                ParamDef::new(Self::P_FM2_CLOCK_GAIN, "clock_fm2_gain", -1.0, 1.0, 0.0),
                ParamDef::new(Self::P_FM2_DATA_GAIN, "data_fm2_gain", 0.0, 1.0, 0.0),
            ],
            lights: vec![],
        };
        let params = spec.default_params();
        Self {
            phases: Float4::ZERO,
            clock: SchmittTrigger::new(),
            shift_register: 0,
            smooth: RcFilter::new(),
            sample_rate,
            levels,
            params,
            spec,
        }
    }
}

impl Default for DigitalChaos {
    fn default() -> Self {
        Self::new(44100.0)
    }
}

impl RackModule for DigitalChaos {
    fn spec(&self) -> &ModuleSpec {
        &self.spec
    }

    fn tick(&mut self, inputs: &PortValues, outputs: &mut PortValues) {
        let dt = 1.0 / self.sample_rate;
        let th = self.levels.trigger_threshold;
        let gate_on = self.levels.gate_on;

        let cv = Float4::new(
            inputs.voltage(Self::IN_FM1_CLOCK),
            inputs.voltage(Self::IN_FM1_DATA),
            inputs.voltage(Self::IN_FM2_CLOCK),
            inputs.voltage(Self::IN_FM2_DATA),
        ) * Float4::new(
            self.params[Self::P_FM1_CLOCK_GAIN as usize],
            self.params[Self::P_FM1_DATA_GAIN as usize],
            self.params[Self::P_FM2_CLOCK_GAIN as usize],
            self.params[Self::P_FM2_DATA_GAIN as usize],
        );
        let pitches = Float4::new(
            self.params[Self::P_FREQ_CLOCK as usize]
                + cv[0]
                + cv[2]
                + inputs.voltage(Self::IN_VOCT_CLOCK),
            self.params[Self::P_FREQ_DATA as usize]
                + cv[1]
                + cv[3]
                + inputs.voltage(Self::IN_VOCT_DATA),
            0.0,
            0.0,
        );
        let freqs = pitches.clamp_scalar(-5.0, 15.0).exp2();

        self.phases += freqs * dt;
        self.phases = Float4::select(
            self.phases.ge(Float4::splat(0.5)),
            self.phases - Float4::splat(1.0),
            self.phases,
        );

        // (tri_clock, sqr_clock, tri_data, sqr_data)
        let wave = Float4::new(
            self.phases[0].abs(),
            self.phases[0],
            self.phases[1].abs(),
            self.phases[1],
        );
        let wave = ((wave - Float4::new(0.25, 0.0, 0.25, 0.0))
            * Float4::new(20.0, 1e5, 20.0, 1e5))
        .clamp_scalar(-gate_on, gate_on);

        let data_bit = inputs.get(Self::IN_DATA).unwrap_or(wave[3]) > th;
        let clock_v = inputs.get(Self::IN_CLOCK).unwrap_or(wave[1]);
        let xored = data_bit ^ (self.shift_register & 0x01 == 0x01);
        if self.clock.process(clock_v, th, th) {
            self.shift_register >>= 1;
            self.shift_register |= (xored as u8) << 7;
        }

        let stepped = 0.125 * gate_on * f64::from(self.shift_register & 0x07);
        self.smooth.set_cutoff(SMOOTH_CUTOFF * dt);
        self.smooth.process(stepped);

        outputs.set(Self::OUT_TRI_CLOCK, wave[0]);
        outputs.set(Self::OUT_SQR_CLOCK, wave[1]);
        outputs.set(Self::OUT_TRI_DATA, wave[2]);
        outputs.set(Self::OUT_SQR_DATA, wave[3]);
        outputs.set(Self::OUT_STEPPED, stepped);
        outputs.set(Self::OUT_PULSED, gate_on * f64::from(u8::from(xored)));
        outputs.set(Self::OUT_SMOOTH, self.smooth.lowpass());
    }

    fn reset(&mut self) {
        self.phases = Float4::ZERO;
        self.clock.reset();
        self.shift_register = 0;
        self.smooth.reset();
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
        "digital_chaos"
    }
}
