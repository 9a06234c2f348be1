//! Eight-step, two-row voltage sequencer.
//!
//! Per-sample priority: a direction trigger flips the travel direction and a
//! vertical clock toggles the active row; a reset trigger forces step 0 and
//! pre-empts everything below; a select input (or its manual button) jumps
//! straight to that step and records it as the preset; a preset trigger
//! recalls the recorded step; finally, a clock edge advances one step with
//! wraparound, unless the hold gate is high.

use crate::dsp::{Schmitt4, SchmittTrigger};
use crate::levels::Levels;
use crate::port::{
    LightDef, ModuleSpec, ParamDef, ParamId, PortDef, PortId, PortValues, RackModule, SignalKind,
};
use crate::vector::Float4;

/// Whole-tone step of the stage voltage output.
const STAGE_VOLTS: f64 = 1.0 / 6.0;

const STEPS: usize = 8;

#[derive(Default)]
struct Change {
    reset: bool,
    select: bool,
    preset: bool,
    clock: bool,
}

impl Change {
    fn any(&self) -> bool {
        self.reset || self.select || self.preset || self.clock
    }
}

pub struct VoltageSequencer {
    step: usize,
    row: usize,
    backward: bool,
    preset: usize,
    // Lanes: direction, vertical clock, reset.
    triggers: Schmitt4,
    preset_trig: SchmittTrigger,
    clock: SchmittTrigger,
    levels: Levels,
    params: Vec<f64>,
    lights: Vec<f64>,
    spec: ModuleSpec,
}

impl VoltageSequencer {
    pub const IN_SELECT: PortId = 0; // ..7
    pub const IN_RESET: PortId = 8;
    pub const IN_PRESET: PortId = 9;
    pub const IN_HOLD: PortId = 10;
    pub const IN_DIRECTION: PortId = 11;
    pub const IN_CLOCK: PortId = 12;
    pub const IN_VCLOCK: PortId = 13;

    pub const OUT_GATE: PortId = 10; // ..17
    pub const OUT_ALL_GATES: PortId = 18;
    pub const OUT_A: PortId = 19;
    pub const OUT_B: PortId = 20;
    pub const OUT_A_MINUS_B: PortId = 21;
    pub const OUT_MIN: PortId = 22;
    pub const OUT_MAX: PortId = 23;
    pub const OUT_STAGE: PortId = 24;
    pub const OUT_ROW: PortId = 25;

    pub const P_ROW_A: ParamId = 0; // ..7
    pub const P_ROW_B: ParamId = 8; // ..15
    pub const P_SELECT: ParamId = 16; // ..23
    pub const P_CLOCK_ENABLE: ParamId = 24;
    pub const P_VCLOCK_ENABLE: ParamId = 25;

    pub const L_STEP: usize = 0; // ..7
    pub const L_ROW_A: usize = 8;
    pub const L_ROW_B: usize = 9;

    pub fn new(sample_rate: f64) -> Self {
        Self::with_levels(sample_rate, Levels::default())
    }

    pub fn with_levels(_sample_rate: f64, levels: Levels) -> Self {
        let mut inputs = Vec::new();
        let mut outputs = Vec::new();
        let mut params = Vec::new();
        let mut lights = Vec::new();
        for i in 0..STEPS as u32 {
            let n = i + 1;
            inputs.push(PortDef::new(
                Self::IN_SELECT + i,
                format!("select_{n}"),
                SignalKind::Trigger,
            ));
            outputs.push(PortDef::new(
                Self::OUT_GATE + i,
                format!("gate_{n}"),
                SignalKind::Gate,
            ));
            params.push(
                ParamDef::new(Self::P_ROW_A + i, format!("a_{n}"), 0.0, 5.0, 0.0).with_unit("V"),
            );
            params.push(
                ParamDef::new(Self::P_ROW_B + i, format!("b_{n}"), 0.0, 5.0, 0.0).with_unit("V"),
            );
            params.push(ParamDef::new(
                Self::P_SELECT + i,
                format!("select_{n}"),
                0.0,
                1.0,
                0.0,
            ));
            lights.push(LightDef::new(i, format!("step_{n}")));
        }
        inputs.push(PortDef::new(Self::IN_RESET, "reset", SignalKind::Trigger));
        inputs.push(PortDef::new(Self::IN_PRESET, "preset", SignalKind::Trigger));
        inputs.push(PortDef::new(Self::IN_HOLD, "hold", SignalKind::Gate));
        inputs.push(PortDef::new(
            Self::IN_DIRECTION,
            "direction",
            SignalKind::Trigger,
        ));
        inputs.push(PortDef::new(Self::IN_CLOCK, "clock", SignalKind::Clock));
        inputs.push(PortDef::new(Self::IN_VCLOCK, "vclock", SignalKind::Clock));
        outputs.push(PortDef::new(
            Self::OUT_ALL_GATES,
            "all_gates",
            SignalKind::Gate,
        ));
        outputs.push(PortDef::new(Self::OUT_A, "a", SignalKind::CvUnipolar));
        outputs.push(PortDef::new(Self::OUT_B, "b", SignalKind::CvUnipolar));
        outputs.push(PortDef::new(
            Self::OUT_A_MINUS_B,
            "a_minus_b",
            SignalKind::CvBipolar,
        ));
        outputs.push(PortDef::new(Self::OUT_MIN, "min", SignalKind::CvUnipolar));
        outputs.push(PortDef::new(Self::OUT_MAX, "max", SignalKind::CvUnipolar));
        outputs.push(PortDef::new(
            Self::OUT_STAGE,
            "stage",
            SignalKind::CvUnipolar,
        ));
        outputs.push(PortDef::new(Self::OUT_ROW, "row_ab", SignalKind::CvUnipolar));
        params.push(
            ParamDef::new(Self::P_CLOCK_ENABLE, "clock_enable", 0.0, 1.0, 0.0)
                .switch(&["OFF", "ON"]),
        );
        params.push(
            ParamDef::new(Self::P_VCLOCK_ENABLE, "vclock_enable", 0.0, 1.0, 0.0)
                .switch(&["OFF", "ON"]),
        );
        lights.push(LightDef::new(Self::L_ROW_A as u32, "row_a"));
        lights.push(LightDef::new(Self::L_ROW_B as u32, "row_b"));

        let spec = ModuleSpec {
            inputs,
            outputs,
            params,
            lights,
        };
        let params = spec.default_params();
        Self {
            step: 0,
            row: 0,
            backward: false,
            preset: 0,
            triggers: Schmitt4::new(),
            preset_trig: SchmittTrigger::new(),
            clock: SchmittTrigger::new(),
            levels,
            params,
            lights: vec![0.0; 10],
            spec,
        }
    }
}

impl Default for VoltageSequencer {
    fn default() -> Self {
        Self::new(44100.0)
    }
}

impl RackModule for VoltageSequencer {
    fn spec(&self) -> &ModuleSpec {
        &self.spec
    }

    fn tick(&mut self, inputs: &PortValues, outputs: &mut PortValues) {
        let th = self.levels.trigger_threshold;

        let fired = self.triggers.process(
            Float4::new(
                inputs.voltage(Self::IN_DIRECTION),
                self.params[Self::P_VCLOCK_ENABLE as usize] * inputs.voltage(Self::IN_VCLOCK),
                inputs.voltage(Self::IN_RESET),
                0.0,
            ),
            th,
            th,
        );
        if fired.lane(0) {
            self.backward = !self.backward;
        }
        if fired.lane(1) {
            self.row ^= 1;
        }

        let mut change = Change {
            reset: fired.lane(2),
            ..Change::default()
        };
        let mut next: i8 = 0;
        if !change.reset {
            // Level-sensitive stage select, lowest index wins.
            for i in 0..STEPS {
                let manual = 10.0 * self.params[Self::P_SELECT as usize + i];
                if inputs.voltage(Self::IN_SELECT + i as u32) + manual >= th {
                    self.preset = i;
                    change.select = true;
                    break;
                }
            }
            // A select hit short-circuits the preset trigger, so its edge
            // detector only advances on quiet samples.
            if change.select
                || self
                    .preset_trig
                    .process(inputs.voltage(Self::IN_PRESET), th, th)
            {
                next = self.preset as i8;
                change.preset = true;
            } else if inputs.voltage(Self::IN_HOLD) < th
                && self.clock.process(
                    self.params[Self::P_CLOCK_ENABLE as usize] * inputs.voltage(Self::IN_CLOCK),
                    th,
                    th,
                )
            {
                next = self.step as i8 + if self.backward { -1 } else { 1 };
                change.clock = true;
            }
        }
        if change.any() {
            self.step = next.rem_euclid(STEPS as i8) as usize;
        }

        for i in 0..STEPS {
            let active = i == self.step;
            outputs.set(Self::OUT_GATE + i as u32, self.levels.gate(active));
            self.lights[i] = if active {
                self.levels.led_on
            } else {
                self.levels.led_off
            };
        }
        outputs.set(Self::OUT_ALL_GATES, self.levels.gate(change.select));

        let a = self.params[Self::P_ROW_A as usize + self.step];
        let b = self.params[Self::P_ROW_B as usize + self.step];
        outputs.set(Self::OUT_A, a);
        outputs.set(Self::OUT_B, b);
        outputs.set(Self::OUT_A_MINUS_B, a - b);
        outputs.set(Self::OUT_MIN, a.min(b));
        outputs.set(Self::OUT_MAX, a.max(b));
        outputs.set(Self::OUT_STAGE, self.step as f64 * STAGE_VOLTS);
        outputs.set(Self::OUT_ROW, if self.row == 1 { b } else { a });

        self.lights[Self::L_ROW_A] = if self.row == 0 {
            self.levels.led_on
        } else {
            self.levels.led_off
        };
        self.lights[Self::L_ROW_B] = if self.row == 1 {
            self.levels.led_on
        } else {
            self.levels.led_off
        };
    }

    fn reset(&mut self) {
        self.step = 0;
        self.row = 0;
        self.backward = false;
        self.preset = 0;
        self.triggers.reset();
        self.preset_trig.reset();
        self.clock.reset();
        for l in &mut self.lights {
            *l = 0.0;
        }
    }

    fn set_sample_rate(&mut self, _sample_rate: f64) {}

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
        "voltage_sequencer"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tick(m: &mut VoltageSequencer, inputs: &PortValues) -> PortValues {
        let mut outputs = PortValues::new();
        m.tick(inputs, &mut outputs);
        outputs
    }

    fn current_step(out: &PortValues) -> usize {
        (0..STEPS)
            .find(|&i| out.voltage(VoltageSequencer::OUT_GATE + i as u32) > 2.5)
            .unwrap()
    }

    fn clock_once(m: &mut VoltageSequencer, base: &PortValues) -> PortValues {
        let mut inputs = base.clone();
        inputs.set(VoltageSequencer::IN_CLOCK, 0.0);
        tick(m, &inputs);
        inputs.set(VoltageSequencer::IN_CLOCK, 5.0);
        tick(m, &inputs)
    }

    #[test]
    fn clock_walks_all_steps_and_wraps() {
        let mut m = VoltageSequencer::new(48000.0);
        m.set_param(VoltageSequencer::P_CLOCK_ENABLE, 1.0);
        let base = PortValues::new();
        let out = tick(&mut m, &base);
        assert_eq!(current_step(&out), 0);
        for expect in [1, 2, 3, 4, 5, 6, 7, 0, 1] {
            let out = clock_once(&mut m, &base);
            assert_eq!(current_step(&out), expect);
            assert_eq!(
                out.voltage(VoltageSequencer::OUT_STAGE),
                expect as f64 * STAGE_VOLTS
            );
        }
    }

    #[test]
    fn clock_disabled_by_switch() {
        let mut m = VoltageSequencer::new(48000.0);
        let base = PortValues::new();
        tick(&mut m, &base);
        let out = clock_once(&mut m, &base);
        assert_eq!(current_step(&out), 0);
    }

    #[test]
    fn direction_trigger_reverses_travel() {
        let mut m = VoltageSequencer::new(48000.0);
        m.set_param(VoltageSequencer::P_CLOCK_ENABLE, 1.0);
        let base = PortValues::new();
        tick(&mut m, &base);
        let mut inputs = base.clone();
        inputs.set(VoltageSequencer::IN_DIRECTION, 5.0);
        tick(&mut m, &inputs);
        // Backward from step 0 wraps to 7.
        let out = clock_once(&mut m, &base);
        assert_eq!(current_step(&out), 7);
        let out = clock_once(&mut m, &base);
        assert_eq!(current_step(&out), 6);
    }

    #[test]
    fn hold_gate_blocks_the_clock() {
        let mut m = VoltageSequencer::new(48000.0);
        m.set_param(VoltageSequencer::P_CLOCK_ENABLE, 1.0);
        let base = PortValues::new();
        tick(&mut m, &base);
        let mut held = base.clone();
        held.set(VoltageSequencer::IN_HOLD, 5.0);
        let out = clock_once(&mut m, &held);
        assert_eq!(current_step(&out), 0);
        let out = clock_once(&mut m, &base);
        assert_eq!(current_step(&out), 1);
    }

    #[test]
    fn reset_trigger_forces_step_zero() {
        let mut m = VoltageSequencer::new(48000.0);
        m.set_param(VoltageSequencer::P_CLOCK_ENABLE, 1.0);
        let base = PortValues::new();
        tick(&mut m, &base);
        for _ in 0..3 {
            clock_once(&mut m, &base);
        }
        let mut inputs = base.clone();
        inputs.set(VoltageSequencer::IN_RESET, 5.0);
        // Reset wins even while a select input is held high.
        inputs.set(VoltageSequencer::IN_SELECT + 5, 5.0);
        let out = tick(&mut m, &inputs);
        assert_eq!(current_step(&out), 0);
        assert_eq!(out.voltage(VoltageSequencer::OUT_ALL_GATES), 0.0);
    }

    #[test]
    fn select_jumps_and_raises_all_gates() {
        let mut m = VoltageSequencer::new(48000.0);
        let base = PortValues::new();
        tick(&mut m, &base);
        let mut inputs = base.clone();
        inputs.set(VoltageSequencer::IN_SELECT + 5, 5.0);
        let out = tick(&mut m, &inputs);
        assert_eq!(current_step(&out), 5);
        // Level-sensitive: all-gates stays high while the select is held.
        assert_eq!(out.voltage(VoltageSequencer::OUT_ALL_GATES), 5.0);
        let out = tick(&mut m, &base);
        assert_eq!(out.voltage(VoltageSequencer::OUT_ALL_GATES), 0.0);
        assert_eq!(current_step(&out), 5);
    }

    #[test]
    fn lowest_select_index_wins() {
        let mut m = VoltageSequencer::new(48000.0);
        let base = PortValues::new();
        tick(&mut m, &base);
        let mut inputs = base.clone();
        inputs.set(VoltageSequencer::IN_SELECT + 2, 5.0);
        inputs.set(VoltageSequencer::IN_SELECT + 6, 5.0);
        let out = tick(&mut m, &inputs);
        assert_eq!(current_step(&out), 2);
    }

    #[test]
    fn manual_button_acts_as_select() {
        let mut m = VoltageSequencer::new(48000.0);
        let base = PortValues::new();
        tick(&mut m, &base);
        m.set_param(VoltageSequencer::P_SELECT + 3, 1.0);
        let out = tick(&mut m, &base);
        assert_eq!(current_step(&out), 3);
    }

    #[test]
    fn preset_trigger_recalls_last_selected_step() {
        let mut m = VoltageSequencer::new(48000.0);
        m.set_param(VoltageSequencer::P_CLOCK_ENABLE, 1.0);
        let base = PortValues::new();
        tick(&mut m, &base);
        let mut inputs = base.clone();
        inputs.set(VoltageSequencer::IN_SELECT + 4, 5.0);
        tick(&mut m, &inputs);
        // Walk away from the preset.
        clock_once(&mut m, &base);
        clock_once(&mut m, &base);
        let mut inputs = base.clone();
        inputs.set(VoltageSequencer::IN_PRESET, 5.0);
        let out = tick(&mut m, &inputs);
        assert_eq!(current_step(&out), 4);
    }

    #[test]
    fn vertical_clock_toggles_the_row() {
        let mut m = VoltageSequencer::new(48000.0);
        m.set_param(VoltageSequencer::P_VCLOCK_ENABLE, 1.0);
        m.set_param(VoltageSequencer::P_ROW_A, 1.0);
        m.set_param(VoltageSequencer::P_ROW_B, 4.0);
        let base = PortValues::new();
        let out = tick(&mut m, &base);
        assert_eq!(out.voltage(VoltageSequencer::OUT_ROW), 1.0);
        assert_eq!(m.lights()[VoltageSequencer::L_ROW_A], 1.0);
        let mut inputs = base.clone();
        inputs.set(VoltageSequencer::IN_VCLOCK, 5.0);
        let out = tick(&mut m, &inputs);
        assert_eq!(out.voltage(VoltageSequencer::OUT_ROW), 4.0);
        assert_eq!(m.lights()[VoltageSequencer::L_ROW_B], 1.0);
    }

    #[test]
    fn row_outputs_follow_the_current_step() {
        let mut m = VoltageSequencer::new(48000.0);
        m.set_param(VoltageSequencer::P_CLOCK_ENABLE, 1.0);
        m.set_param(VoltageSequencer::P_ROW_A + 1, 3.0);
        m.set_param(VoltageSequencer::P_ROW_B + 1, 5.0);
        let base = PortValues::new();
        tick(&mut m, &base);
        let out = clock_once(&mut m, &base);
        assert_eq!(out.voltage(VoltageSequencer::OUT_A), 3.0);
        assert_eq!(out.voltage(VoltageSequencer::OUT_B), 5.0);
        assert_eq!(out.voltage(VoltageSequencer::OUT_A_MINUS_B), -2.0);
        assert_eq!(out.voltage(VoltageSequencer::OUT_MIN), 3.0);
        assert_eq!(out.voltage(VoltageSequencer::OUT_MAX), 5.0);
    }

    #[test]
    fn reset_method_restores_initial_state() {
        let mut m = VoltageSequencer::new(48000.0);
        m.set_param(VoltageSequencer::P_CLOCK_ENABLE, 1.0);
        m.set_param(VoltageSequencer::P_VCLOCK_ENABLE, 1.0);
        let base = PortValues::new();
        tick(&mut m, &base);
        clock_once(&mut m, &base);
        let mut inputs = base.clone();
        inputs.set(VoltageSequencer::IN_VCLOCK, 5.0);
        tick(&mut m, &inputs);
        m.reset();
        let out = tick(&mut m, &base);
        assert_eq!(current_step(&out), 0);
        assert_eq!(m.lights()[VoltageSequencer::L_ROW_A], 1.0);
    }
}
