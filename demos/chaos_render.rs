//! Offline render of the chaotic oscillator pair.
//!
//! Runs `DigitalChaos` free-running for a few seconds, prints its port
//! specification as JSON and a short summary of the signals it produced.
//!
//! ```sh
//! cargo run --example chaos_render
//! ```

use voltaic::prelude::*;

fn main() {
    let sample_rate = 48000.0;
    let seconds = 4;

    let mut osc = DigitalChaos::new(sample_rate);
    // Detune the data oscillator against the clock so the register
    // sees a shifting bit pattern.
    osc.set_param(DigitalChaos::P_FREQ_CLOCK, 6.0);
    osc.set_param(DigitalChaos::P_FREQ_DATA, 4.3);

    match serde_json::to_string_pretty(osc.spec()) {
        Ok(json) => println!("{json}"),
        Err(e) => eprintln!("spec serialization failed: {e}"),
    }

    let inputs = PortValues::new();
    let mut outputs = PortValues::new();

    let mut stepped_histogram = [0u64; 8];
    let mut smooth_min = f64::INFINITY;
    let mut smooth_max = f64::NEG_INFINITY;
    let mut pulses = 0u64;
    let mut last_pulsed = false;

    for _ in 0..(sample_rate as usize * seconds) {
        osc.tick(&inputs, &mut outputs);

        let stepped = outputs.voltage(DigitalChaos::OUT_STEPPED);
        let level = (stepped / (0.125 * 5.0)).round() as usize;
        stepped_histogram[level.min(7)] += 1;

        let smooth = outputs.voltage(DigitalChaos::OUT_SMOOTH);
        smooth_min = smooth_min.min(smooth);
        smooth_max = smooth_max.max(smooth);

        let pulsed = outputs.voltage(DigitalChaos::OUT_PULSED) > 2.5;
        if pulsed && !last_pulsed {
            pulses += 1;
        }
        last_pulsed = pulsed;
    }

    println!("\nrendered {seconds}s at {sample_rate} Hz");
    println!("stepped level histogram (samples per 8-state level):");
    for (level, count) in stepped_histogram.iter().enumerate() {
        println!("  {level}: {count}");
    }
    println!("smooth range: {smooth_min:.3} V .. {smooth_max:.3} V");
    println!("pulsed rising edges: {pulses}");
}
