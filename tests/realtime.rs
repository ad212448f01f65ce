//! Realtime behavior of the render thread: no allocation in steady state,
//! faulting of misbehaving nodes and live editing across threads.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::Duration;

use tempo_graph::dsp::{
    Inputs, NodeCategory, NodeDescriptor, Outputs, PinDefinition, PinKind, VertexInterface,
};
use tempo_graph::engine::{rt_guard, TrapAllocator, ViolationKind};
use tempo_graph::{
    create, register_standard_nodes, BlockContext, EngineConfig, EngineEvent, GraphController,
    GraphError, Node, NodeInfo, NodeRegistry, PinValue, RenderEngine, SteadyTransport,
};

#[global_allocator]
static ALLOCATOR: TrapAllocator = TrapAllocator::system();

const FRAMES: usize = 128;

/// Grows a buffer every block.
struct Leaky {
    history: Vec<f32>,
}

impl Node for Leaky {
    fn initialize(&mut self, _sample_rate: f32, _block_size: usize) {}
    fn reset(&mut self) {}
    fn process(&mut self, _ctx: &BlockContext, inputs: &Inputs<'_>, outputs: &mut Outputs<'_>) {
        self.history.extend_from_slice(inputs.audio(0));
        outputs.audio_mut(0).fill(1.0);
    }
}

fn registry() -> NodeRegistry {
    let mut registry = NodeRegistry::new();
    register_standard_nodes(&mut registry).unwrap();
    registry
        .register(NodeDescriptor::new(
            NodeInfo {
                class_name: "Leaky",
                display_name: "Leaky",
                description: "allocates while processing",
                author: "tests",
                category: NodeCategory::Utility,
                major_version: 0,
                minor_version: 1,
            },
            VertexInterface::new(
                vec![PinDefinition::audio_input("In", "")],
                vec![PinDefinition::output("Out", "", PinKind::Audio)],
            ),
            || -> Box<dyn Node> { Box::new(Leaky { history: Vec::new() }) },
        ))
        .unwrap();
    registry
}

fn engine() -> (GraphController, RenderEngine) {
    let config = EngineConfig {
        block_size: FRAMES,
        ..EngineConfig::default()
    };
    create(config, registry()).unwrap()
}

/// Every built-in node type, wired together.
fn build_patch(controller: &mut GraphController) {
    let beat = controller.add_node("BeatTrigger").unwrap();
    let osc = controller.add_node("SineOscillator").unwrap();
    let env = controller.add_node("DecayEnvelope").unwrap();
    let tremolo = controller.add_node("Tremolo").unwrap();
    let gain = controller.add_node("Gain").unwrap();
    let mixer = controller.add_node("Mixer").unwrap();
    let stereo = controller.add_node("StereoGain").unwrap();

    controller.connect(beat, "On Beat", osc, "Reset").unwrap();
    controller.connect(beat, "On Beat", env, "Trigger").unwrap();
    controller.connect(osc, "Out Audio", tremolo, "In Audio").unwrap();
    controller.connect(tremolo, "Out Audio", gain, "In Audio").unwrap();
    controller.connect(gain, "Out Audio", mixer, "In 1").unwrap();
    controller.connect(env, "Out Audio", mixer, "In 2").unwrap();
    controller.connect(mixer, "Out", stereo, "In Left").unwrap();
    controller.connect(osc, "Out Audio", stereo, "In Right").unwrap();
    controller.connect_delayed(env, "Fired", beat, "Enabled").unwrap();
    controller.set_input(tremolo, "Sync", PinValue::Bool(true)).unwrap();
    controller.add_output(stereo, "Out Left").unwrap();
    controller.add_output(stereo, "Out Right").unwrap();
}

#[test]
fn steady_state_render_does_not_allocate() {
    let (mut controller, mut engine) = engine();
    build_patch(&mut controller);
    controller.commit().unwrap();

    let mut transport = SteadyTransport::new(48000.0, 120.0);
    transport.play();
    for _ in 0..4 {
        engine.render_block(&transport.next_block(FRAMES));
    }

    let contexts: Vec<BlockContext> = (0..500).map(|_| transport.next_block(FRAMES)).collect();
    let guard = rt_guard::arm();
    for ctx in &contexts {
        let out = engine.render_block(ctx);
        std::hint::black_box(out.channel(0));
    }
    assert_eq!(guard.trips(), 0);
    drop(guard);

    assert!(controller.poll().iter().all(|e| !matches!(e, EngineEvent::RealtimeViolation { .. })));
}

#[test]
fn parameter_changes_do_not_allocate_on_render() {
    let (mut controller, mut engine) = engine();
    let osc = controller.add_node("SineOscillator").unwrap();
    controller.add_output(osc, "Out Audio").unwrap();
    controller.commit().unwrap();
    let ctx = BlockContext::new(FRAMES, 48000.0);
    engine.render_block(&ctx);

    for step in 0..50 {
        controller
            .set_input(osc, "Frequency", PinValue::Float(100.0 + step as f32))
            .unwrap();
        controller.fire_trigger(osc, "Reset").unwrap();
        let guard = rt_guard::arm();
        engine.render_block(&ctx);
        assert_eq!(guard.trips(), 0);
    }
}

#[test]
fn allocating_node_is_silenced_and_reported() {
    let (mut controller, mut engine) = engine();
    let osc = controller.add_node("SineOscillator").unwrap();
    let leaky = controller.add_node("Leaky").unwrap();
    let gain = controller.add_node("Gain").unwrap();
    controller.connect(osc, "Out Audio", leaky, "In").unwrap();
    controller.connect(leaky, "Out", gain, "In Audio").unwrap();
    controller.add_output(gain, "Out Audio").unwrap();
    controller.add_output(osc, "Out Audio").unwrap();
    controller.commit().unwrap();

    let ctx = BlockContext::new(FRAMES, 48000.0);
    for _ in 0..3 {
        let out = engine.render_block(&ctx);
        assert!(out.channel(0).iter().all(|&s| s == 0.0));
        assert!(out.channel(1).iter().any(|&s| s != 0.0));
    }

    let violations: Vec<_> = controller
        .poll()
        .into_iter()
        .filter_map(|e| match e {
            EngineEvent::RealtimeViolation { node, kind } => Some((node, kind)),
            _ => None,
        })
        .collect();
    assert_eq!(violations.len(), 1);
    assert_eq!(violations[0].0, leaky);
    assert!(matches!(violations[0].1, ViolationKind::Allocation { count } if count > 0));
    assert!(matches!(
        controller.faults().as_slice(),
        [GraphError::RealtimeViolation { node, .. }] if *node == leaky
    ));
}

#[test]
fn live_editing_while_rendering() {
    let (mut controller, mut engine) = engine();
    let osc = controller.add_node("SineOscillator").unwrap();
    let gain = controller.add_node("Gain").unwrap();
    controller.connect(osc, "Out Audio", gain, "In Audio").unwrap();
    controller.add_output(gain, "Out Audio").unwrap();
    controller.commit().unwrap();

    let violation = Arc::new(AtomicBool::new(false));
    let seen = Arc::clone(&violation);
    let render = thread::spawn(move || {
        let mut transport = SteadyTransport::new(48000.0, 120.0);
        transport.play();
        let mut blocks = 0u64;
        while !engine.is_shut_down() {
            let ctx = transport.next_block(FRAMES);
            let guard = rt_guard::arm();
            let out = engine.render_block(&ctx);
            if out.channels().any(|c| c.iter().any(|s| !s.is_finite())) {
                seen.store(true, Ordering::Relaxed);
            }
            // Releasing retired memory happens on the control thread, so
            // the only trips here would come from the engine itself.
            if guard.trips() > 0 {
                seen.store(true, Ordering::Relaxed);
            }
            drop(guard);
            blocks += 1;
            thread::sleep(Duration::from_micros(200));
        }
        blocks
    });

    for round in 0..40 {
        let tremolo = controller.add_node("Tremolo").unwrap();
        controller.disconnect(gain, "In Audio").unwrap();
        controller.connect(osc, "Out Audio", tremolo, "In Audio").unwrap();
        controller.connect(tremolo, "Out Audio", gain, "In Audio").unwrap();
        controller
            .set_input(gain, "Gain Level", PinValue::Float(round as f32 / 40.0))
            .unwrap();
        controller.commit().unwrap();
        thread::sleep(Duration::from_millis(1));

        controller.remove_node(tremolo).unwrap();
        controller.connect(osc, "Out Audio", gain, "In Audio").unwrap();
        controller.commit().unwrap();
        controller.poll();
        thread::sleep(Duration::from_millis(1));
    }

    controller.shutdown(Duration::from_secs(5)).unwrap();
    let blocks = render.join().unwrap();
    assert!(blocks > 0);
    assert!(!violation.load(Ordering::Relaxed));
    assert_eq!(controller.graph().node_count(), 2);
}
