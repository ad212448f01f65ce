//! Render engine.
//!
//! Lives on the real-time thread. Each call to [`RenderEngine::render_block`]
//! applies queued commands, then walks the current execution plan and runs
//! every node once. Nothing here allocates, frees, locks or logs: retired
//! memory is handed back to the control thread and problems are reported as
//! events.

use std::panic::{self, AssertUnwindSafe};
use std::sync::Arc;

use crate::dsp::{BlockContext, Inputs, Outputs, PinBuffer};

use super::channels::RenderHandle;
use super::commands::{EngineCommand, EngineEvent, Retired};
use super::plan::ExecutionPlan;
use super::rt_guard::{self, ViolationKind};
use super::slot::NodeSlot;

/// Drives the execution plan once per audio block.
pub struct RenderEngine {
    channels: RenderHandle,
    /// Node arena, indexed like the control-side graph. Never resized.
    slots: Vec<Option<Box<NodeSlot>>>,
    plan: Option<Arc<ExecutionPlan>>,
    /// Zeros read by unconnected audio inputs.
    silence: Box<[f32]>,
    block_size: usize,
    shut_down: bool,
}

impl RenderEngine {
    pub(crate) fn new(channels: RenderHandle, max_nodes: usize, block_size: usize) -> Self {
        let mut slots = Vec::with_capacity(max_nodes);
        slots.resize_with(max_nodes, || None);
        Self {
            channels,
            slots,
            plan: None,
            silence: vec![0.0; block_size].into_boxed_slice(),
            block_size,
            shut_down: false,
        }
    }

    /// Maximum frames per block.
    pub fn block_size(&self) -> usize {
        self.block_size
    }

    /// Generation of the plan currently rendering.
    pub fn plan_generation(&self) -> Option<u64> {
        self.plan.as_ref().map(|plan| plan.generation())
    }

    /// Returns true once a shutdown command has been applied.
    pub fn is_shut_down(&self) -> bool {
        self.shut_down
    }

    // ========================================================================
    // Audio Processing
    // ========================================================================

    /// Renders one block and returns the designated graph outputs.
    ///
    /// `ctx.frames` larger than the configured block size is clamped.
    pub fn render_block(&mut self, ctx: &BlockContext) -> RenderedOutputs<'_> {
        let ctx = BlockContext {
            frames: ctx.frames.min(self.block_size),
            ..*ctx
        };

        self.apply_commands();

        if self.shut_down {
            return RenderedOutputs {
                plan: None,
                slots: &self.slots,
                silence: &self.silence[..ctx.frames],
            };
        }

        if ctx.transport.jumped {
            self.reset_nodes();
        }

        let Self {
            channels,
            slots,
            plan,
            silence,
            ..
        } = self;
        let Some(plan) = plan.as_deref() else {
            return RenderedOutputs {
                plan: None,
                slots,
                silence: &silence[..ctx.frames],
            };
        };
        let silence = &silence[..ctx.frames];

        // Triggers fired last block are over.
        for step in &plan.steps {
            if let Some(slot) = slots[step.node.index()].as_deref_mut() {
                slot.clear_triggers();
            }
        }

        for step in &plan.steps {
            let index = step.node.index();
            let Some(mut slot) = slots[index].take() else {
                continue;
            };
            if !slot.faulted {
                let slot_ref: &mut NodeSlot = &mut slot;
                let inputs = Inputs::new(&step.inputs, slots, &slot_ref.inputs, silence);
                let mut outputs = Outputs::new(&mut slot_ref.outputs, ctx.frames);
                let node = &mut slot_ref.node;

                let guard = rt_guard::arm();
                let result =
                    panic::catch_unwind(AssertUnwindSafe(|| node.process(&ctx, &inputs, &mut outputs)));
                let trips = guard.trips();
                drop(guard);

                let violation = match result {
                    Err(_) => Some(ViolationKind::Panic),
                    Ok(()) if trips > 0 => Some(ViolationKind::Allocation { count: trips }),
                    Ok(()) => None,
                };
                if let Some(kind) = violation {
                    slot.fault();
                    channels.send_event_lossy(EngineEvent::RealtimeViolation {
                        node: slot.id(),
                        kind,
                    });
                }
            }
            slots[index] = Some(slot);
        }

        // Latched control-thread triggers last exactly one block.
        for step in &plan.steps {
            if let Some(slot) = slots[step.node.index()].as_deref_mut() {
                slot.inputs.clear_latched();
            }
        }

        for tap in &plan.delay_taps {
            let value = slots[tap.src]
                .as_deref()
                .and_then(|slot| slot.outputs.get(tap.src_pin))
                .and_then(PinBuffer::value);
            if let (Some(value), Some(dst)) = (value, slots[tap.dst].as_deref_mut()) {
                dst.inputs.set_delayed(tap.dst_pin, value);
            }
        }

        RenderedOutputs {
            plan: Some(plan),
            slots,
            silence,
        }
    }

    fn reset_nodes(&mut self) {
        for slot in self.slots.iter_mut().flatten() {
            if slot.faulted {
                continue;
            }
            let node = &mut slot.node;
            let guard = rt_guard::arm();
            let result = panic::catch_unwind(AssertUnwindSafe(|| node.reset()));
            let trips = guard.trips();
            drop(guard);

            let violation = match result {
                Err(_) => Some(ViolationKind::Panic),
                Ok(()) if trips > 0 => Some(ViolationKind::Allocation { count: trips }),
                Ok(()) => None,
            };
            if let Some(kind) = violation {
                slot.fault();
                self.channels.send_event_lossy(EngineEvent::RealtimeViolation {
                    node: slot.id(),
                    kind,
                });
            }
        }
    }

    // ========================================================================
    // Command Handling
    // ========================================================================

    /// Applies every queued command. Only called at block boundaries.
    fn apply_commands(&mut self) {
        while let Some(command) = self.channels.recv_command() {
            if self.shut_down {
                // Late commands may carry nodes; send them back for release.
                if let EngineCommand::InsertNode(slot) = command {
                    self.retire(Retired::Node(slot));
                }
                continue;
            }
            match command {
                EngineCommand::InsertNode(slot) => {
                    let index = slot.id().index();
                    if index < self.slots.len() {
                        if let Some(previous) = self.slots[index].replace(slot) {
                            self.retire(Retired::Node(previous));
                        }
                    } else {
                        self.retire(Retired::Node(slot));
                    }
                }
                EngineCommand::PublishPlan(plan) => {
                    let generation = plan.generation();
                    if let Some(previous) = self.plan.replace(plan) {
                        self.retire(Retired::Plan(previous));
                    }
                    self.channels
                        .send_event_lossy(EngineEvent::PlanInstalled { generation });
                }
                EngineCommand::RemoveNode(node) => {
                    let index = node.index();
                    let matches = self
                        .slots
                        .get(index)
                        .and_then(|slot| slot.as_deref())
                        .is_some_and(|slot| slot.id() == node);
                    if matches {
                        if let Some(slot) = self.slots[index].take() {
                            self.retire(Retired::Node(slot));
                        }
                    }
                }
                EngineCommand::SetInput { node, pin, value } => {
                    if let Some(slot) = self.slot_mut(node) {
                        slot.inputs.set_literal(pin, value);
                    }
                }
                EngineCommand::FireTrigger { node, pin, frame } => {
                    if let Some(slot) = self.slot_mut(node) {
                        slot.inputs.latch(pin, frame);
                    }
                }
                EngineCommand::ResetNodes => self.reset_nodes(),
                EngineCommand::Shutdown => {
                    self.shut_down = true;
                    if let Some(plan) = self.plan.take() {
                        self.retire(Retired::Plan(plan));
                    }
                    for index in 0..self.slots.len() {
                        if let Some(slot) = self.slots[index].take() {
                            self.retire(Retired::Node(slot));
                        }
                    }
                    self.channels.send_event_lossy(EngineEvent::ShutdownComplete);
                }
            }
        }
    }

    fn slot_mut(&mut self, node: crate::graph::NodeId) -> Option<&mut NodeSlot> {
        self.slots
            .get_mut(node.index())
            .and_then(|slot| slot.as_deref_mut())
            .filter(|slot| slot.id() == node)
    }

    /// Hands memory back to the control thread.
    ///
    /// The controller empties the queue before every send, so it has room
    /// for everything one batch of commands retires. Only if that fails is
    /// the item dropped here.
    fn retire(&mut self, item: Retired) {
        if let Err(item) = self.channels.retire(item) {
            drop(item);
        }
    }
}

/// The audio of the designated graph outputs for one block.
pub struct RenderedOutputs<'a> {
    plan: Option<&'a ExecutionPlan>,
    slots: &'a [Option<Box<NodeSlot>>],
    silence: &'a [f32],
}

impl<'a> RenderedOutputs<'a> {
    /// Number of designated outputs.
    pub fn len(&self) -> usize {
        self.plan.map_or(0, |plan| plan.outputs.len())
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Frames in this block.
    pub fn frames(&self) -> usize {
        self.silence.len()
    }

    /// Samples of output `index`; silence for faulted or missing nodes.
    pub fn channel(&self, index: usize) -> &'a [f32] {
        let tap = self.plan.and_then(|plan| plan.outputs.get(index));
        let buffer = tap.and_then(|tap| {
            self.slots
                .get(tap.node)
                .and_then(|slot| slot.as_deref())
                .and_then(|slot| slot.outputs.get(tap.pin))
        });
        match buffer {
            Some(PinBuffer::Audio(samples)) => &samples[..self.frames()],
            _ => self.silence,
        }
    }

    /// All outputs in designation order.
    pub fn channels(&self) -> impl Iterator<Item = &'a [f32]> + '_ {
        (0..self.len()).map(move |index| self.channel(index))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dsp::{
        NodeCategory, NodeDescriptor, NodeInfo, NodeRegistry, PinDefinition, PinKind, PinValue,
        TransportState, VertexInterface,
    };
    use crate::engine::{create, EngineConfig, GraphController};
    use crate::nodes::register_standard_nodes;

    /// Writes a constant and counts its calls.
    #[derive(Default)]
    struct Constant {
        calls: u32,
    }

    impl crate::dsp::Node for Constant {
        fn initialize(&mut self, _sample_rate: f32, _block_size: usize) {}
        fn reset(&mut self) {
            self.calls = 0;
        }
        fn process(&mut self, _ctx: &BlockContext, _inputs: &Inputs<'_>, outputs: &mut Outputs<'_>) {
            self.calls += 1;
            outputs.audio_mut(0).fill(self.calls as f32);
        }
    }

    #[derive(Default)]
    struct Allocating;

    impl crate::dsp::Node for Allocating {
        fn initialize(&mut self, _sample_rate: f32, _block_size: usize) {}
        fn reset(&mut self) {}
        fn process(&mut self, _ctx: &BlockContext, _inputs: &Inputs<'_>, outputs: &mut Outputs<'_>) {
            let scratch = std::hint::black_box(vec![0.5f32; 8]);
            outputs.audio_mut(0).fill(scratch[0]);
        }
    }

    #[derive(Default)]
    struct Panicking;

    impl crate::dsp::Node for Panicking {
        fn initialize(&mut self, _sample_rate: f32, _block_size: usize) {}
        fn reset(&mut self) {}
        fn process(&mut self, _ctx: &BlockContext, _inputs: &Inputs<'_>, outputs: &mut Outputs<'_>) {
            outputs.audio_mut(0).fill(1.0);
            panic!("boom");
        }
    }

    fn info(class_name: &'static str) -> NodeInfo {
        NodeInfo {
            class_name,
            display_name: class_name,
            description: "",
            author: "",
            category: NodeCategory::Utility,
            major_version: 1,
            minor_version: 0,
        }
    }

    fn source_interface() -> VertexInterface {
        VertexInterface::new(vec![], vec![PinDefinition::output("Out", "", PinKind::Audio)])
    }

    fn engine() -> (GraphController, RenderEngine) {
        let mut registry = NodeRegistry::new();
        register_standard_nodes(&mut registry).unwrap();
        registry
            .register(NodeDescriptor::new(info("Constant"), source_interface(), || -> Box<dyn crate::dsp::Node> {
                Box::new(Constant::default())
            }))
            .unwrap();
        registry
            .register(NodeDescriptor::new(info("Allocating"), source_interface(), || -> Box<dyn crate::dsp::Node> {
                Box::new(Allocating)
            }))
            .unwrap();
        registry
            .register(NodeDescriptor::new(info("Panicking"), source_interface(), || -> Box<dyn crate::dsp::Node> {
                Box::new(Panicking)
            }))
            .unwrap();
        let config = EngineConfig {
            block_size: 16,
            max_nodes: 16,
            ..EngineConfig::default()
        };
        create(config, registry).unwrap()
    }

    fn ctx(frames: usize) -> BlockContext {
        BlockContext::new(frames, 48000.0)
    }

    #[test]
    fn test_no_plan_renders_nothing() {
        let (_controller, mut engine) = engine();
        let out = engine.render_block(&ctx(16));
        assert!(out.is_empty());
        assert_eq!(out.frames(), 16);
        assert_eq!(engine.plan_generation(), None);
    }

    #[test]
    fn test_plan_installed_at_block_boundary() {
        let (mut controller, mut engine) = engine();
        let node = controller.add_node("Constant").unwrap();
        controller.add_output(node, "Out").unwrap();
        controller.commit().unwrap();
        assert_eq!(engine.plan_generation(), None);

        let out = engine.render_block(&ctx(16));
        assert_eq!(out.len(), 1);
        assert_eq!(out.channel(0), &[1.0; 16]);
        assert_eq!(engine.plan_generation(), Some(1));

        let events = controller.poll();
        assert_eq!(events, vec![EngineEvent::PlanInstalled { generation: 1 }]);
        assert_eq!(controller.installed_generation(), Some(1));
    }

    #[test]
    fn test_frames_clamped_to_block_size() {
        let (mut controller, mut engine) = engine();
        let node = controller.add_node("Constant").unwrap();
        controller.add_output(node, "Out").unwrap();
        controller.commit().unwrap();
        assert_eq!(engine.render_block(&ctx(64)).frames(), 16);
        assert_eq!(engine.render_block(&ctx(5)).channel(0), &[2.0; 5]);
    }

    #[test]
    fn test_allocating_node_is_faulted_and_silenced() {
        let (mut controller, mut engine) = engine();
        let bad = controller.add_node("Allocating").unwrap();
        let good = controller.add_node("Constant").unwrap();
        controller.add_output(bad, "Out").unwrap();
        controller.add_output(good, "Out").unwrap();
        controller.commit().unwrap();

        {
            let out = engine.render_block(&ctx(16));
            assert_eq!(out.channel(0), &[0.0; 16]);
            assert_eq!(out.channel(1), &[1.0; 16]);
        }
        let events = controller.poll();
        assert!(events.iter().any(|e| matches!(
            e,
            EngineEvent::RealtimeViolation { node, kind: ViolationKind::Allocation { .. } } if *node == bad
        )));
        assert!(controller.is_faulted(bad));
        assert!(!controller.is_faulted(good));

        // Faulted nodes are skipped from now on.
        assert_eq!(engine.render_block(&ctx(16)).channel(0), &[0.0; 16]);
        assert!(controller.poll().is_empty());
    }

    #[test]
    fn test_panicking_node_is_faulted() {
        let (mut controller, mut engine) = engine();
        let bad = controller.add_node("Panicking").unwrap();
        let gain = controller.add_node("Gain").unwrap();
        controller.connect(bad, "Out", gain, "In Audio").unwrap();
        controller.add_output(gain, "Out Audio").unwrap();
        controller.commit().unwrap();

        assert_eq!(engine.render_block(&ctx(16)).channel(0), &[0.0; 16]);
        let events = controller.poll();
        assert!(events.contains(&EngineEvent::RealtimeViolation {
            node: bad,
            kind: ViolationKind::Panic,
        }));
    }

    #[test]
    fn test_transport_jump_resets_nodes() {
        let (mut controller, mut engine) = engine();
        let node = controller.add_node("Constant").unwrap();
        controller.add_output(node, "Out").unwrap();
        controller.commit().unwrap();
        engine.render_block(&ctx(4));
        engine.render_block(&ctx(4));

        let jumped = BlockContext::with_transport(
            4,
            48000.0,
            TransportState {
                jumped: true,
                ..TransportState::playing_at(120.0)
            },
        );
        assert_eq!(engine.render_block(&jumped).channel(0), &[1.0; 4]);
    }

    #[test]
    fn test_set_input_applies_next_block() {
        let (mut controller, mut engine) = engine();
        let src = controller.add_node("Constant").unwrap();
        let gain = controller.add_node("Gain").unwrap();
        controller.connect(src, "Out", gain, "In Audio").unwrap();
        controller.set_input(gain, "Gain Level", PinValue::Float(0.0)).unwrap();
        controller.add_output(gain, "Out Audio").unwrap();
        controller.commit().unwrap();
        assert_eq!(engine.render_block(&ctx(4)).channel(0), &[0.0; 4]);

        controller.set_input(gain, "Gain Level", PinValue::Float(2.0)).unwrap();
        assert_eq!(engine.render_block(&ctx(4)).channel(0), &[4.0; 4]);
    }

    #[test]
    fn test_shutdown_retires_everything() {
        let (mut controller, mut engine) = engine();
        let node = controller.add_node("Constant").unwrap();
        controller.add_output(node, "Out").unwrap();
        controller.commit().unwrap();

        let render = std::thread::spawn(move || {
            while !engine.is_shut_down() {
                engine.render_block(&ctx(16));
                std::thread::sleep(std::time::Duration::from_millis(1));
            }
            assert!(engine.render_block(&ctx(16)).is_empty());
            engine.plan_generation()
        });

        controller.shutdown(std::time::Duration::from_secs(5)).unwrap();
        assert_eq!(render.join().unwrap(), None);
        assert!(controller.published_plan().is_none());
        assert_eq!(controller.add_node("Gain"), Err(crate::error::GraphError::ShutDown));
    }
}
