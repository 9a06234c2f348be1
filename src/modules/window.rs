//! Multi-stage window and envelope generator.
//!
//! One six-stage machine (T1, T2, T3, Sustain, T4, End) drives four slewed
//! envelope lanes at once: DADSR, AHDSR, DAHR and ADASR. Each stage emits a
//! gate on its own output, timed stages advance when the ADASR lane reaches
//! its target, the sustain stage waits for the gate to drop, and the shape
//! control feeds each lane's own output back into its rate for LOG/LIN/EXP
//! curvature.

use crate::dsp::{Schmitt4, Slew4};
use crate::levels::Levels;
use crate::port::{
    ModuleSpec, ParamDef, ParamId, PortDef, PortId, PortValues, RackModule, SignalKind,
};
use crate::vector::{Float4, Mask4};

/// Full-scale envelope voltage.
const ENV_MAX: f64 = 10.0;

const STAGE_T1: u8 = 0;
const STAGE_T2: u8 = 1;
const STAGE_T3: u8 = 2;
const STAGE_SUSTAIN: u8 = 3;
const STAGE_T4: u8 = 4;
const STAGE_END: u8 = 5;

pub struct WindowGenerators {
    stage: u8,
    // Lanes 0/1: trigger, gate (incl. the manual button).
    trigger_gate: Schmitt4,
    envs: Slew4,
    // Lanes: DADSR, AHDSR, DAHR, ADASR.
    env_outs: Float4,
    env_targets: Float4,
    sample_rate: f64,
    levels: Levels,
    params: Vec<f64>,
    spec: ModuleSpec,
}

impl WindowGenerators {
    pub const IN_CV_T1: PortId = 0;
    pub const IN_CV_T2: PortId = 1;
    pub const IN_CV_T3: PortId = 2;
    pub const IN_CV_SUSTAIN: PortId = 3;
    pub const IN_CV_T4: PortId = 4;
    pub const IN_GATE: PortId = 5;
    pub const IN_TRIG: PortId = 6;
    pub const IN_CV_ALL: PortId = 7;

    pub const OUT_GATE_T1: PortId = 10;
    pub const OUT_GATE_T2: PortId = 11;
    pub const OUT_GATE_T3: PortId = 12;
    pub const OUT_GATE_SUSTAIN: PortId = 13;
    pub const OUT_GATE_T4: PortId = 14;
    pub const OUT_DADSR: PortId = 15;
    pub const OUT_AHDSR: PortId = 16;
    pub const OUT_DAHR: PortId = 17;
    pub const OUT_ADASR: PortId = 18;
    pub const OUT_END: PortId = 19;

    pub const P_T1: ParamId = 0;
    pub const P_T2: ParamId = 1;
    pub const P_T3: ParamId = 2;
    pub const P_SUSTAIN: ParamId = 3;
    pub const P_T4: ParamId = 4;
    pub const P_CV_GAIN_T1: ParamId = 5;
    pub const P_CV_GAIN_T2: ParamId = 6;
    pub const P_CV_GAIN_T3: ParamId = 7;
    pub const P_CV_GAIN_SUSTAIN: ParamId = 8;
    pub const P_CV_GAIN_T4: ParamId = 9;
    pub const P_SHAPE: ParamId = 10;
    pub const P_MANUAL_GATE: ParamId = 11;

    pub fn new(sample_rate: f64) -> Self {
        Self::with_levels(sample_rate, Levels::default())
    }

    pub fn with_levels(sample_rate: f64, levels: Levels) -> Self {
        let labels = ["t1", "t2", "t3", "sustain", "t4"];
        let mut inputs = Vec::new();
        let mut outputs = Vec::new();
        let mut params = Vec::new();
        for (i, label) in labels.iter().enumerate() {
            let i = i as u32;
            inputs.push(PortDef::new(i, format!("{label}_cv"), SignalKind::CvBipolar));
            outputs.push(PortDef::new(
                Self::OUT_GATE_T1 + i,
                format!("{label}_gate"),
                SignalKind::Gate,
            ));
            params.push(ParamDef::new(
                Self::P_CV_GAIN_T1 + i,
                format!("{label}_cv_gain"),
                -1.0,
                1.0,
                0.0,
            ));
            if i != 3 {
                // Time in volts; the panel reads 0.5 * 0.5^V seconds.
                params.push(
                    ParamDef::new(i, format!("{label}_time"), -6.0, 8.0, 1.0)
                        .with_unit("s")
                        .exponential(0.5)
                        .with_multiplier(0.5),
                );
            }
        }
        params.push(
            ParamDef::new(Self::P_SUSTAIN, "sustain_level", 0.0, ENV_MAX, 0.5 * ENV_MAX)
                .with_unit("V"),
        );
        params.push(ParamDef::new(Self::P_SHAPE, "shape", -1.0, 1.0, 0.0));
        params.push(ParamDef::new(Self::P_MANUAL_GATE, "manual_gate", 0.0, 1.0, 0.0));
        inputs.push(PortDef::new(Self::IN_GATE, "gate", SignalKind::Gate));
        inputs.push(PortDef::new(Self::IN_TRIG, "trigger", SignalKind::Trigger));
        inputs.push(PortDef::new(Self::IN_CV_ALL, "all_cv", SignalKind::CvBipolar));
        outputs.push(PortDef::new(Self::OUT_DADSR, "dadsr", SignalKind::CvUnipolar));
        outputs.push(PortDef::new(Self::OUT_AHDSR, "ahdsr", SignalKind::CvUnipolar));
        outputs.push(PortDef::new(Self::OUT_DAHR, "dahr", SignalKind::CvUnipolar));
        outputs.push(PortDef::new(Self::OUT_ADASR, "adasr", SignalKind::CvUnipolar));
        outputs.push(PortDef::new(Self::OUT_END, "end_gate", SignalKind::Gate));

        let spec = ModuleSpec {
            inputs,
            outputs,
            params,
            lights: vec![],
        };
        let params = spec.default_params();
        Self {
            stage: STAGE_END,
            trigger_gate: Schmitt4::new(),
            envs: Slew4::new(),
            env_outs: Float4::ZERO,
            env_targets: Float4::ZERO,
            sample_rate,
            levels,
            params,
            spec,
        }
    }

    /// Next stage, judged against the previous sample's slew results. The
    /// ADASR lane is the yardstick: it is the only lane that slews during
    /// every timed stage, so reaching its target means the stage is done.
    fn next_stage(&self, fired: Mask4) -> u8 {
        if fired.any() && self.stage > STAGE_T3 {
            return STAGE_T1;
        }
        if self.stage == STAGE_SUSTAIN {
            return STAGE_SUSTAIN + u8::from(!self.trigger_gate.is_high().lane(1));
        }
        if self.stage == STAGE_END {
            return STAGE_END;
        }
        self.stage + u8::from(self.env_outs[3] == self.env_targets[3])
    }

    fn targets(&self, sustain: f64) -> Float4 {
        match self.stage {
            STAGE_T1 => Float4::new(0.0, ENV_MAX, 0.0, ENV_MAX),
            STAGE_T2 => Float4::new(ENV_MAX, ENV_MAX, ENV_MAX, 0.0),
            STAGE_T3 => Float4::new(sustain, sustain, ENV_MAX, sustain),
            STAGE_SUSTAIN => Float4::new(sustain, sustain, 0.0, sustain),
            _ => Float4::ZERO,
        }
    }

    /// Time voltage to slew rate in V/s, with the global CV and the
    /// shape-scaled per-lane feedback folded in.
    fn rate(&self, volts: Float4, all_cv: f64, shape: f64) -> Float4 {
        (volts + Float4::splat(all_cv) + self.env_outs * shape)
            .clamp_scalar(-6.0, 8.0)
            .exp2()
            * (2.0 * ENV_MAX)
    }
}

impl Default for WindowGenerators {
    fn default() -> Self {
        Self::new(44100.0)
    }
}

impl RackModule for WindowGenerators {
    fn spec(&self) -> &ModuleSpec {
        &self.spec
    }

    fn tick(&mut self, inputs: &PortValues, outputs: &mut PortValues) {
        let dt = 1.0 / self.sample_rate;
        let th = self.levels.trigger_threshold;

        let fired = self.trigger_gate.process(
            Float4::new(
                inputs.voltage(Self::IN_TRIG),
                inputs.voltage(Self::IN_GATE)
                    + self.levels.gate_on * self.params[Self::P_MANUAL_GATE as usize],
                0.0,
                0.0,
            ),
            th,
            th,
        );

        let times = Float4::new(
            inputs.voltage(Self::IN_CV_T1),
            inputs.voltage(Self::IN_CV_T2),
            inputs.voltage(Self::IN_CV_T3),
            inputs.voltage(Self::IN_CV_T4),
        ) * Float4::new(
            self.params[Self::P_CV_GAIN_T1 as usize],
            self.params[Self::P_CV_GAIN_T2 as usize],
            self.params[Self::P_CV_GAIN_T3 as usize],
            self.params[Self::P_CV_GAIN_T4 as usize],
        ) + Float4::new(
            self.params[Self::P_T1 as usize],
            self.params[Self::P_T2 as usize],
            self.params[Self::P_T3 as usize],
            self.params[Self::P_T4 as usize],
        );
        let sustain = (inputs.voltage(Self::IN_CV_SUSTAIN)
            * self.params[Self::P_CV_GAIN_SUSTAIN as usize]
            + self.params[Self::P_SUSTAIN as usize])
            .clamp(0.0, ENV_MAX);
        let all_cv = inputs.voltage(Self::IN_CV_ALL);
        let shape = self.params[Self::P_SHAPE as usize];

        self.stage = self.next_stage(fired);
        self.env_targets = self.targets(sustain);

        // Rise lanes: (T2, T1, T2, T1 before T3 / T3 after).
        let rises = self.rate(
            Float4::new(
                times[1],
                times[0],
                times[1],
                times[if self.stage > STAGE_T2 { 2 } else { 0 }],
            ),
            all_cv,
            shape,
        );
        // Fall lanes: (T3|T4, T3|T4, T4, T2 before sustain / T4 after).
        let in_sustain = self.stage > STAGE_T3;
        let three_or_four = times[if in_sustain { 3 } else { 2 }];
        let falls = self.rate(
            Float4::new(
                three_or_four,
                three_or_four,
                times[3],
                times[if in_sustain { 3 } else { 1 }],
            ),
            all_cv,
            shape,
        );
        self.envs.set_rise_fall(rises, falls);
        self.env_outs = self
            .envs
            .process(dt, self.env_targets)
            .clamp_scalar(0.0, ENV_MAX);

        for i in 0..5u32 {
            outputs.set(
                Self::OUT_GATE_T1 + i,
                self.levels.gate(i == u32::from(self.stage)),
            );
        }
        outputs.set(Self::OUT_DADSR, self.env_outs[0]);
        outputs.set(Self::OUT_AHDSR, self.env_outs[1]);
        outputs.set(Self::OUT_DAHR, self.env_outs[2]);
        outputs.set(Self::OUT_ADASR, self.env_outs[3]);
        outputs.set(Self::OUT_END, self.levels.gate(self.stage == STAGE_END));
    }

    fn reset(&mut self) {
        self.stage = STAGE_END;
        self.trigger_gate.reset();
        self.envs.reset();
        self.env_outs = Float4::ZERO;
        self.env_targets = Float4::ZERO;
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
        "window_generators"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SR: f64 = 1000.0;

    fn tick(m: &mut WindowGenerators, inputs: &PortValues) -> PortValues {
        let mut outputs = PortValues::new();
        m.tick(inputs, &mut outputs);
        outputs
    }

    fn active_stage(out: &PortValues) -> Option<u32> {
        (0..5).find(|&i| out.voltage(WindowGenerators::OUT_GATE_T1 + i) > 2.5)
    }

    /// Ticks until the given stage gate goes high, with a sample budget.
    fn run_until_stage(
        m: &mut WindowGenerators,
        inputs: &PortValues,
        stage: u32,
        budget: usize,
    ) -> usize {
        for n in 0..budget {
            let out = tick(m, inputs);
            if active_stage(&out) == Some(stage) {
                return n;
            }
        }
        panic!("stage {stage} not reached within {budget} samples");
    }

    #[test]
    fn starts_in_end_stage() {
        let mut m = WindowGenerators::new(SR);
        let out = tick(&mut m, &PortValues::new());
        assert_eq!(active_stage(&out), None);
        assert_eq!(out.voltage(WindowGenerators::OUT_END), 5.0);
    }

    #[test]
    fn gate_walks_through_all_stages() {
        let mut m = WindowGenerators::new(SR);
        let idle = PortValues::new();
        tick(&mut m, &idle);
        let mut gated = PortValues::new();
        gated.set(WindowGenerators::IN_GATE, 5.0);

        // Default times are 1 V: 20 * 2^1 = 40 V/s, so a full 10 V lane takes
        // ~250 samples and a 5 V move ~125.
        let out = tick(&mut m, &gated);
        assert_eq!(active_stage(&out), Some(0));
        let n = run_until_stage(&mut m, &gated, 1, 300);
        assert!((245..=255).contains(&n), "{n}");
        let n = run_until_stage(&mut m, &gated, 2, 300);
        assert!((245..=255).contains(&n), "{n}");
        let n = run_until_stage(&mut m, &gated, 3, 200);
        assert!((120..=130).contains(&n), "{n}");

        // Sustain holds while the gate is up.
        for _ in 0..100 {
            let out = tick(&mut m, &gated);
            assert_eq!(active_stage(&out), Some(3));
        }
        let out = tick(&mut m, &idle);
        assert_eq!(active_stage(&out), Some(4));
        // Release runs until the ADASR lane falls from sustain to zero.
        for _ in 0..200 {
            tick(&mut m, &idle);
        }
        let out = tick(&mut m, &idle);
        assert_eq!(out.voltage(WindowGenerators::OUT_END), 5.0);
    }

    #[test]
    fn envelope_targets_per_stage() {
        let mut m = WindowGenerators::new(SR);
        let idle = PortValues::new();
        tick(&mut m, &idle);
        let mut gated = PortValues::new();
        gated.set(WindowGenerators::IN_GATE, 5.0);

        // During T1 the AHDSR and ADASR lanes rise, DADSR and DAHR wait.
        let mut out = tick(&mut m, &gated);
        for _ in 0..100 {
            out = tick(&mut m, &gated);
        }
        assert_eq!(out.voltage(WindowGenerators::OUT_DADSR), 0.0);
        assert!(out.voltage(WindowGenerators::OUT_AHDSR) > 0.0);
        assert_eq!(out.voltage(WindowGenerators::OUT_DAHR), 0.0);
        assert!(out.voltage(WindowGenerators::OUT_ADASR) > 0.0);

        // Deep in sustain every lane sits at its resting value.
        for _ in 0..2000 {
            out = tick(&mut m, &gated);
        }
        assert_eq!(active_stage(&out), Some(3));
        assert_eq!(out.voltage(WindowGenerators::OUT_DADSR), 5.0);
        assert_eq!(out.voltage(WindowGenerators::OUT_AHDSR), 5.0);
        assert_eq!(out.voltage(WindowGenerators::OUT_DAHR), 0.0);
        assert_eq!(out.voltage(WindowGenerators::OUT_ADASR), 5.0);
    }

    #[test]
    fn retrigger_from_sustain_restarts_the_window() {
        let mut m = WindowGenerators::new(SR);
        let idle = PortValues::new();
        tick(&mut m, &idle);
        let mut gated = PortValues::new();
        gated.set(WindowGenerators::IN_GATE, 5.0);
        tick(&mut m, &gated);
        run_until_stage(&mut m, &gated, 3, 2000);
        // Trigger fires while the gate stays high.
        gated.set(WindowGenerators::IN_TRIG, 5.0);
        let out = tick(&mut m, &gated);
        assert_eq!(active_stage(&out), Some(0));
    }

    #[test]
    fn trigger_is_ignored_during_timed_stages() {
        let mut m = WindowGenerators::new(SR);
        let idle = PortValues::new();
        tick(&mut m, &idle);
        let mut gated = PortValues::new();
        gated.set(WindowGenerators::IN_GATE, 5.0);
        tick(&mut m, &gated);
        for _ in 0..50 {
            tick(&mut m, &gated);
        }
        gated.set(WindowGenerators::IN_TRIG, 5.0);
        let out = tick(&mut m, &gated);
        // Still in T1: a retrigger would have restarted the lanes.
        assert_eq!(active_stage(&out), Some(0));
    }

    #[test]
    fn manual_gate_button_opens_the_window() {
        let mut m = WindowGenerators::new(SR);
        let idle = PortValues::new();
        tick(&mut m, &idle);
        m.set_param(WindowGenerators::P_MANUAL_GATE, 1.0);
        let out = tick(&mut m, &idle);
        assert_eq!(active_stage(&out), Some(0));
    }

    #[test]
    fn end_stage_is_terminal() {
        let mut m = WindowGenerators::new(SR);
        let idle = PortValues::new();
        for _ in 0..100 {
            let out = tick(&mut m, &idle);
            assert_eq!(out.voltage(WindowGenerators::OUT_END), 5.0);
        }
    }

    #[test]
    fn time_cv_shortens_a_stage() {
        let mut m = WindowGenerators::new(SR);
        m.set_param(WindowGenerators::P_CV_GAIN_T1, 1.0);
        let idle = PortValues::new();
        tick(&mut m, &idle);
        let mut gated = PortValues::new();
        gated.set(WindowGenerators::IN_GATE, 5.0);
        // +2 V on T1: 20 * 2^3 = 160 V/s, four times faster.
        gated.set(WindowGenerators::IN_CV_T1, 2.0);
        tick(&mut m, &gated);
        let n = run_until_stage(&mut m, &gated, 1, 300);
        assert!((58..=68).contains(&n), "{n}");
    }

    #[test]
    fn sustain_level_is_clamped() {
        let mut m = WindowGenerators::new(SR);
        m.set_param(WindowGenerators::P_CV_GAIN_SUSTAIN, 1.0);
        let idle = PortValues::new();
        tick(&mut m, &idle);
        let mut gated = PortValues::new();
        gated.set(WindowGenerators::IN_GATE, 5.0);
        gated.set(WindowGenerators::IN_CV_SUSTAIN, 100.0);
        tick(&mut m, &gated);
        run_until_stage(&mut m, &gated, 3, 2000);
        let out = tick(&mut m, &gated);
        assert_eq!(out.voltage(WindowGenerators::OUT_ADASR), 10.0);
    }
}
