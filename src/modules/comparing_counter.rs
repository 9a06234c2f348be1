//! Comparator driving a whole-tone counter.
//!
//! The comparator gate goes high while `a_level * A > B + threshold`; every
//! rising edge of that gate advances the counter by a sixth of a volt. When
//! the counter reaches its (CV-controllable) ceiling it snaps back to zero
//! on the same sample.

use crate::dsp::SchmittTrigger;
use crate::levels::Levels;
use crate::port::{
    ModuleSpec, ParamDef, ParamId, PortDef, PortId, PortValues, RackModule, SignalKind,
};
use crate::vector::Float4;

/// Counter step per comparator edge, a whole tone in 1V/oct terms.
const STEP: f64 = 1.0 / 6.0;

/// Highest counter value, 31 whole tones.
const CEILING: f64 = STEP * 31.0;

pub struct ComparingCounter {
    counter: f64,
    trigger: SchmittTrigger,
    levels: Levels,
    params: Vec<f64>,
    spec: ModuleSpec,
}

impl ComparingCounter {
    pub const IN_A: PortId = 0;
    pub const IN_MAX_CV: PortId = 1;
    pub const IN_B: PortId = 2;

    pub const OUT_COMPARE: PortId = 10;
    pub const OUT_END: PortId = 11;
    pub const OUT_COUNTER: PortId = 12;

    pub const P_THRESHOLD: ParamId = 0;
    pub const P_COUNTER_MAX: ParamId = 1;
    pub const P_A_LEVEL: ParamId = 2;
    pub const P_MAX_CV_GAIN: ParamId = 3;

    pub fn new(sample_rate: f64) -> Self {
        Self::with_levels(sample_rate, Levels::default())
    }

    pub fn with_levels(_sample_rate: f64, levels: Levels) -> Self {
        let spec = ModuleSpec {
            inputs: vec![
                PortDef::new(Self::IN_A, "a", SignalKind::Audio),
                PortDef::new(Self::IN_MAX_CV, "counter_max_cv", SignalKind::CvBipolar),
                PortDef::new(Self::IN_B, "b", SignalKind::Audio),
            ],
            outputs: vec![
                PortDef::new(Self::OUT_COMPARE, "compare", SignalKind::Gate),
                PortDef::new(Self::OUT_END, "end", SignalKind::Gate),
                PortDef::new(Self::OUT_COUNTER, "counter", SignalKind::CvUnipolar),
            ],
            params: vec![
                ParamDef::new(Self::P_THRESHOLD, "threshold", -5.0, 5.0, 0.0).with_unit("V"),
                ParamDef::new(Self::P_COUNTER_MAX, "counter_max", 0.0, CEILING, 0.0)
                    .with_unit("V"),
                ParamDef::new(Self::P_A_LEVEL, "a_level", 0.0, 1.0, 0.0),
                ParamDef::new(Self::P_MAX_CV_GAIN, "counter_max_cv_gain", -1.0, 1.0, 0.0),
            ],
            lights: vec![],
        };
        let params = spec.default_params();
        Self {
            counter: 0.0,
            trigger: SchmittTrigger::new(),
            levels,
            params,
            spec,
        }
    }
}

impl Default for ComparingCounter {
    fn default() -> Self {
        Self::new(44100.0)
    }
}

impl RackModule for ComparingCounter {
    fn spec(&self) -> &ModuleSpec {
        &self.spec
    }

    fn tick(&mut self, inputs: &PortValues, outputs: &mut PortValues) {
        let th = self.levels.trigger_threshold;

        // y = x * a + b over (A, B, counter-max CV)
        let v = Float4::new(
            inputs.voltage(Self::IN_A),
            inputs.voltage(Self::IN_B),
            inputs.voltage(Self::IN_MAX_CV),
            0.0,
        ) * Float4::new(
            self.params[Self::P_A_LEVEL as usize],
            1.0,
            self.params[Self::P_MAX_CV_GAIN as usize],
            0.0,
        ) + Float4::new(
            0.0,
            self.params[Self::P_THRESHOLD as usize],
            self.params[Self::P_COUNTER_MAX as usize],
            0.0,
        );

        let cmp = self.levels.gate(v[0] > v[1]);
        if self.trigger.process(cmp, th, th) {
            self.counter += STEP;
        }
        if self.counter >= v[2].clamp(0.0, CEILING) {
            self.counter = 0.0;
        }

        outputs.set(Self::OUT_COMPARE, cmp);
        outputs.set(Self::OUT_COUNTER, self.counter);
        // END is only high while the comparator is high and the counter sits
        // at zero.
        outputs.set(
            Self::OUT_END,
            self.levels.gate(self.trigger.is_high() && self.counter == 0.0),
        );
    }

    fn reset(&mut self) {
        self.counter = 0.0;
        self.trigger.reset();
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

    fn type_id(&self) -> &'static str {
        "comparing_counter"
    }
}
