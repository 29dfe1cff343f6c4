// src/main.rs

use shredsynth::nodes::{SinOsc, params};
use shredsynth::{Engine, EngineConfig, Suspend, Value};

/// ===============================
/// Main
/// ===============================

fn main() {
    let sample_rate = 48_000.0;
    let block_frames = 512;
    let blocks = 8;

    // --------------------------------
    // Graph
    // --------------------------------

    let mut engine = Engine::new(EngineConfig::default().with_sample_rate(sample_rate));

    let osc = engine.add_node(SinOsc::new().with_freq(220.0).with_amplitude(0.3));
    let dac = engine.dac();
    if let Err(err) = engine.connect(osc, dac) {
        eprintln!("failed to connect oscillator: {err}");
        return;
    }

    // --------------------------------
    // Shreds
    // --------------------------------

    // Hops through a fixed scale every 50 ms
    let scale = [220.0, 247.5, 275.0, 293.3, 330.0, 366.7, 412.5, 440.0];
    let mut step = 0;
    engine.spork_fn(move |engine, _| {
        let freq = scale[step % scale.len()];
        engine.graph_mut().set_param(osc, params::FREQ, freq);
        step += 1;
        Suspend::ticks(engine.ms(50.0))
    });

    // Producer/consumer pair sharing an event
    let beat = engine.create_event();
    engine.spork_fn(move |engine, input| {
        if let Value::Int(count) = input {
            println!("beat {} received at tick {}", count, engine.now());
        }
        Suspend::WaitOn(beat)
    });

    let mut count = 0i64;
    engine.spork_fn(move |engine, _| {
        if count > 0 {
            engine.signal(beat, count);
        }
        count += 1;
        if count > 6 {
            return Suspend::Done;
        }
        Suspend::ticks(engine.ms(10.0))
    });

    // --------------------------------
    // Run a few blocks
    // --------------------------------

    println!("Starting engine sanity test…");

    let mut block = vec![0.0; block_frames * engine.config().output_channels];
    for index in 0..blocks {
        match engine.render(&mut block) {
            Ok(frames) => {
                let peak = block.iter().fold(0.0f32, |peak, s| peak.max(s.abs()));
                println!(
                    "--- Block {} --- {} frames, now = {}, peak = {:.3}",
                    index,
                    frames,
                    engine.now(),
                    peak
                );
            }
            Err(err) => {
                eprintln!("render failed: {err}");
                return;
            }
        }
    }

    let stats = engine.stats();
    println!(
        "Sanity test completed: {} shreds alive, {} sporked, {} resumptions.",
        engine.shred_count(),
        stats.sporked,
        stats.resumed
    );
}
