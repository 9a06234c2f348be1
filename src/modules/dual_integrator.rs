//! Dual slew integrator with track/sample-and-hold control.
//!
//! Two identical channels slew toward their inputs at an exponential,
//! CV-controlled rate. Each channel can freeze: in Track & Hold mode the
//! slew runs while the hold input is low; in Sample & Hold mode it runs
//! only on the sample where the hold input fires a rising edge. End
//! detectors watch the outputs against ±5 V and a comparator reports which
//! channel is higher.

use crate::dsp::{Schmitt4, Slew4};
use crate::levels::Levels;
use crate::port::{
    LightDef, ModuleSpec, ParamDef, ParamId, PortDef, PortId, PortValues, RackModule, SignalKind,
};
use crate::vector::{Float4, Mask4};

/// End detector hysteresis thresholds on the slewed outputs.
const END_LOW: f64 = -5.0;
const END_HIGH: f64 = 5.0;

/// Rate scale so the rate knob reads in Hz over the 10 V swing.
const RATE_SCALE: f64 = 20.0;

pub struct DualIntegrator {
    hold: Schmitt4,
    end: Schmitt4,
    slew: Slew4,
    sample_rate: f64,
    levels: Levels,
    params: Vec<f64>,
    lights: Vec<f64>,
    spec: ModuleSpec,
}

impl DualIntegrator {
    pub const IN_A: PortId = 0;
    pub const IN_B: PortId = 1;
    pub const IN_GATE_A: PortId = 2;
    pub const IN_GATE_B: PortId = 3;
    pub const IN_HOLD_A: PortId = 4;
    pub const IN_HOLD_B: PortId = 5;
    pub const IN_CV1_A: PortId = 6;
    pub const IN_CV1_B: PortId = 7;
    pub const IN_CV2_A: PortId = 8;
    pub const IN_CV2_B: PortId = 9;

    pub const OUT_A: PortId = 10;
    pub const OUT_B: PortId = 11;
    pub const OUT_END_A: PortId = 12;
    pub const OUT_END_B: PortId = 13;
    pub const OUT_COMPARE: PortId = 14;

    pub const P_MODE_A: ParamId = 0;
    pub const P_MODE_B: ParamId = 1;
    pub const P_CV_GAIN_A: ParamId = 2;
    pub const P_CV_GAIN_B: ParamId = 3;
    pub const P_RATE_A: ParamId = 4;
    pub const P_RATE_B: ParamId = 5;

    pub const L_OUT_A_POS: usize = 0;
    pub const L_OUT_A_NEG: usize = 1;
    pub const L_OUT_B_POS: usize = 2;
    pub const L_OUT_B_NEG: usize = 3;
    pub const L_HOLD_A: usize = 4;
    pub const L_HOLD_B: usize = 5;

    pub fn new(sample_rate: f64) -> Self {
        Self::with_levels(sample_rate, Levels::default())
    }

    pub fn with_levels(sample_rate: f64, levels: Levels) -> Self {
        let mut inputs = Vec::new();
        let mut outputs = Vec::new();
        let mut params = Vec::new();
        let mut lights = Vec::new();
        for ch in 0..2u32 {
            let tag = if ch == 0 { "a" } else { "b" };
            inputs.push(PortDef::new(Self::IN_A + ch, format!("in_{tag}"), SignalKind::Audio));
            inputs.push(PortDef::new(
                Self::IN_GATE_A + ch,
                format!("gate_{tag}"),
                SignalKind::Gate,
            ));
            inputs.push(PortDef::new(
                Self::IN_HOLD_A + ch,
                format!("hold_{tag}"),
                SignalKind::Gate,
            ));
            inputs.push(PortDef::new(
                Self::IN_CV1_A + ch,
                format!("cv1_{tag}"),
                SignalKind::CvBipolar,
            ));
            inputs.push(PortDef::new(
                Self::IN_CV2_A + ch,
                format!("cv2_{tag}"),
                SignalKind::CvBipolar,
            ));
            outputs.push(PortDef::new(Self::OUT_A + ch, format!("out_{tag}"), SignalKind::Audio));
            outputs.push(PortDef::new(
                Self::OUT_END_A + ch,
                format!("end_{tag}"),
                SignalKind::Gate,
            ));
            params.push(
                ParamDef::new(Self::P_MODE_A + ch, format!("mode_{tag}"), 0.0, 1.0, 0.0)
                    .switch(&["Track & Hold", "Sample & Hold"]),
            );
            params.push(ParamDef::new(
                Self::P_CV_GAIN_A + ch,
                format!("cv_gain_{tag}"),
                -1.0,
                1.0,
                0.0,
            ));
            params.push(
                ParamDef::new(Self::P_RATE_A + ch, format!("rate_{tag}"), -5.0, 13.5, 4.25)
                    .with_unit("Hz")
                    .exponential(2.0),
            );
            lights.push(LightDef::new(2 * ch, format!("out_{tag}_pos")));
            lights.push(LightDef::new(2 * ch + 1, format!("out_{tag}_neg")));
        }
        lights.push(LightDef::new(4, "hold_a".to_string()));
        lights.push(LightDef::new(5, "hold_b".to_string()));
        outputs.push(PortDef::new(Self::OUT_COMPARE, "compare", SignalKind::Gate));

        let spec = ModuleSpec {
            inputs,
            outputs,
            params,
            lights,
        };
        let params = spec.default_params();
        Self {
            hold: Schmitt4::new(),
            end: Schmitt4::new(),
            slew: Slew4::new(),
            sample_rate,
            levels,
            params,
            lights: vec![0.0; 6],
            spec,
        }
    }
}

impl Default for DualIntegrator {
    fn default() -> Self {
        Self::new(44100.0)
    }
}

impl RackModule for DualIntegrator {
    fn spec(&self) -> &ModuleSpec {
        &self.spec
    }

    fn tick(&mut self, inputs: &PortValues, outputs: &mut PortValues) {
        let dt = 1.0 / self.sample_rate;
        let th = self.levels.trigger_threshold;
        let gate_on = self.levels.gate_on;

        let hold_fired = self.hold.process(
            Float4::new(
                inputs.voltage(Self::IN_HOLD_A),
                inputs.voltage(Self::IN_HOLD_B),
                0.0,
                0.0,
            ),
            th,
            th,
        );
        let hold_high = self.hold.is_high();

        // Rate in Hz: 2^(cv1 * gain + cv2 + knob)
        let rate = (Float4::new(
            inputs.voltage(Self::IN_CV1_A),
            inputs.voltage(Self::IN_CV1_B),
            0.0,
            0.0,
        ) * Float4::new(
            self.params[Self::P_CV_GAIN_A as usize],
            self.params[Self::P_CV_GAIN_B as usize],
            0.0,
            0.0,
        ) + Float4::new(
            inputs.voltage(Self::IN_CV2_A),
            inputs.voltage(Self::IN_CV2_B),
            0.0,
            0.0,
        ) + Float4::new(
            self.params[Self::P_RATE_A as usize],
            self.params[Self::P_RATE_B as usize],
            0.0,
            0.0,
        ))
        .exp2();

        // Track & Hold slews while the hold input is low; Sample & Hold only
        // on the sample where the hold trigger fires.
        let sample_mode = [
            self.params[Self::P_MODE_A as usize] >= 0.5,
            self.params[Self::P_MODE_B as usize] >= 0.5,
        ];
        let mut active = Mask4::NONE;
        for ch in 0..2 {
            let on = if sample_mode[ch] {
                hold_fired.lane(ch)
            } else {
                !hold_high.lane(ch)
            };
            active.set_lane(ch, on);
        }
        let rate = rate * active.to_float() * RATE_SCALE;

        // An active gate replaces the signal with 0 V.
        let gates = Float4::new(
            inputs.voltage(Self::IN_GATE_A),
            inputs.voltage(Self::IN_GATE_B),
            0.0,
            0.0,
        );
        let raw = Float4::new(
            inputs.voltage(Self::IN_A),
            inputs.voltage(Self::IN_B),
            0.0,
            0.0,
        )
        .clamp_scalar(self.levels.v_min, self.levels.v_max);
        let input = Float4::select(gates.lt(Float4::splat(th)), raw, Float4::ZERO);

        self.slew.set_rise_fall(rate, rate);
        let out = self.slew.process(dt, input);
        self.end.process(out, END_LOW, END_HIGH);
        let end_high = self.end.is_high();

        outputs.set(
            Self::OUT_COMPARE,
            if out[0] > out[1] { gate_on } else { -gate_on },
        );
        for ch in 0..2 {
            outputs.set(Self::OUT_A + ch as u32, out[ch]);
            outputs.set(
                Self::OUT_END_A + ch as u32,
                if end_high.lane(ch) { -gate_on } else { gate_on },
            );
            self.lights[2 * ch] = (0.2 * out[ch]).max(0.0);
            self.lights[2 * ch + 1] = (-0.2 * out[ch]).max(0.0);
            self.lights[4 + ch] = if sample_mode[ch] != hold_high.lane(ch) {
                self.levels.led_on
            } else {
                self.levels.led_off
            };
        }
    }

    fn reset(&mut self) {
        self.hold.reset();
        self.end.reset();
        self.slew.reset();
        for l in &mut self.lights {
            *l = 0.0;
        }
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

    fn lights(&self) -> &[f64] {
        &self.lights
    }

    fn type_id(&self) -> &'static str {
        "dual_integrator"
    }
}
