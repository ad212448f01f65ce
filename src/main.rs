//! Tempo Graph - demo host for the node graph engine
//!
//! Builds a small tempo-synced patch, renders it on a dedicated thread
//! against a steady transport and edits it live from the main thread.
//!
//! Usage: `tempo_graph [config.json]`. Set `RUST_LOG` to control logging.

use std::error::Error;
use std::thread;
use std::time::Duration;

use tempo_graph::engine::TrapAllocator;
use tempo_graph::{
    create, register_standard_nodes, EngineConfig, NodeRegistry, PinValue, SteadyTransport,
};
use tracing_subscriber::EnvFilter;

/// Lets the engine catch nodes that allocate while rendering.
#[global_allocator]
static ALLOCATOR: TrapAllocator = TrapAllocator::system();

const TEMPO_BPM: f64 = 120.0;
const RUN_TIME: Duration = Duration::from_secs(2);

fn main() -> Result<(), Box<dyn Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let config = match std::env::args().nth(1) {
        Some(path) => EngineConfig::from_json(&std::fs::read_to_string(&path)?)?,
        None => EngineConfig::default(),
    };

    let mut registry = NodeRegistry::new();
    register_standard_nodes(&mut registry)?;
    let (mut controller, mut engine) = create(config.clone(), registry)?;

    // Beat-synced sine blips through a synced tremolo.
    let beat = controller.add_node("BeatTrigger")?;
    let osc = controller.add_node("SineOscillator")?;
    let env = controller.add_node("DecayEnvelope")?;
    let tremolo = controller.add_node("Tremolo")?;
    let gain = controller.add_node("Gain")?;

    controller.connect(beat, "On Beat", osc, "Reset")?;
    controller.connect(beat, "On Beat", env, "Trigger")?;
    controller.connect(osc, "Out Audio", tremolo, "In Audio")?;
    controller.connect(tremolo, "Out Audio", gain, "In Audio")?;
    controller.set_input(beat, "Subdivision", PinValue::Int(2))?;
    controller.set_input(tremolo, "Sync", PinValue::Bool(true))?;
    controller.set_input(tremolo, "Rate", PinValue::Float(4.0))?;
    controller.set_input(gain, "Gain Level", PinValue::Float(0.5))?;
    controller.add_output(gain, "Out Audio")?;
    controller.add_output(env, "Out Audio")?;
    controller.commit()?;

    let block_size = config.block_size;
    let sample_rate = config.sample_rate;
    let render = thread::Builder::new()
        .name("render".into())
        .spawn(move || {
            let mut transport = SteadyTransport::new(sample_rate, TEMPO_BPM);
            transport.play();
            let block_time = Duration::from_secs_f64(block_size as f64 / sample_rate as f64);
            let mut peak = 0.0f32;
            let mut blocks = 0u64;
            while !engine.is_shut_down() {
                let ctx = transport.next_block(block_size);
                let outputs = engine.render_block(&ctx);
                for channel in outputs.channels() {
                    peak = channel.iter().fold(peak, |p, s| p.max(s.abs()));
                }
                blocks += 1;
                thread::sleep(block_time);
            }
            (blocks, peak)
        })?;

    let steps = 8;
    for step in 0..steps {
        thread::sleep(RUN_TIME / steps);
        let level = 0.2 + 0.1 * step as f32;
        controller.set_input(gain, "Gain Level", PinValue::Float(level))?;
        for event in controller.poll() {
            tracing::debug!(?event, "engine event");
        }
    }

    controller.shutdown(Duration::from_secs(1))?;
    match render.join() {
        Ok((blocks, peak)) => tracing::info!(blocks, peak, "render thread finished"),
        Err(_) => tracing::error!("render thread panicked"),
    }
    Ok(())
}
