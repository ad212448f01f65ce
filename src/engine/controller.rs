//! Control-thread side of the engine.
//!
//! [`GraphController`] owns the topology and the node registry. Edits are
//! validated immediately and staged; [`GraphController::commit`] compiles a
//! new plan and publishes it, together with any new node instances, to the
//! render thread in one ordered batch.

use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

use crate::dsp::{NodeRegistry, PinDirection, PinKind, PinValue};
use crate::error::{GraphError, Result};
use crate::graph::{Graph, NodeId};

use super::channels::{ControlHandle, EngineChannels};
use super::commands::{EngineCommand, EngineEvent};
use super::config::EngineConfig;
use super::plan::ExecutionPlan;
use super::render::RenderEngine;
use super::rt_guard::ViolationKind;
use super::scheduler;
use super::slot::NodeSlot;

/// Creates a connected controller/render-engine pair.
///
/// Keep the controller on the control thread and move the engine to the
/// render thread.
pub fn create(config: EngineConfig, registry: NodeRegistry) -> Result<(GraphController, RenderEngine)> {
    config.validate()?;
    let channels = EngineChannels::new(
        config.command_capacity,
        config.event_capacity,
        config.retire_capacity(),
    );
    let (control, render) = channels.split();
    let engine = RenderEngine::new(render, config.max_nodes, config.block_size);
    tracing::info!(
        sample_rate = config.sample_rate,
        block_size = config.block_size,
        max_nodes = config.max_nodes,
        "engine created"
    );
    let controller = GraphController {
        graph: Graph::new(config.max_nodes),
        registry,
        config,
        channels: control,
        pending_inserts: Vec::new(),
        pending_removals: Vec::new(),
        deferred: Vec::new(),
        generation: 0,
        published: None,
        installed_generation: None,
        undelivered: Vec::new(),
        faults: Vec::new(),
        shut_down: false,
    };
    Ok((controller, engine))
}

/// Control-thread handle for editing and publishing the graph.
pub struct GraphController {
    graph: Graph,
    registry: NodeRegistry,
    config: EngineConfig,
    channels: ControlHandle,
    /// Nodes added since the last commit.
    pending_inserts: Vec<NodeId>,
    /// Committed nodes removed since the last commit.
    pending_removals: Vec<NodeId>,
    /// Commands that must follow the next plan.
    deferred: Vec<EngineCommand>,
    generation: u64,
    published: Option<Arc<ExecutionPlan>>,
    installed_generation: Option<u64>,
    /// Events collected while sending, handed out by the next `poll`.
    undelivered: Vec<EngineEvent>,
    faults: Vec<(NodeId, ViolationKind)>,
    shut_down: bool,
}

impl GraphController {
    pub fn graph(&self) -> &Graph {
        &self.graph
    }

    pub fn registry(&self) -> &NodeRegistry {
        &self.registry
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// The most recently published plan.
    pub fn published_plan(&self) -> Option<&Arc<ExecutionPlan>> {
        self.published.as_ref()
    }

    /// Generation of the last plan the render thread reported as installed.
    pub fn installed_generation(&self) -> Option<u64> {
        self.installed_generation
    }

    /// Returns true if there are edits that have not been committed.
    pub fn has_pending_edits(&self) -> bool {
        !self.pending_inserts.is_empty() || !self.pending_removals.is_empty()
    }

    fn ensure_running(&self) -> Result<()> {
        if self.shut_down {
            Err(GraphError::ShutDown)
        } else {
            Ok(())
        }
    }

    fn is_committed(&self, id: NodeId) -> bool {
        !self.pending_inserts.contains(&id)
    }

    // ========================================================================
    // Topology Edits
    // ========================================================================

    /// Adds a node of a registered type. Takes effect at the next commit.
    pub fn add_node(&mut self, class: &str) -> Result<NodeId> {
        self.ensure_running()?;
        let descriptor = self.registry.lookup(class)?;
        let id = self.graph.add_node(descriptor)?;
        self.pending_inserts.push(id);
        tracing::debug!(node = %id, class, "node added");
        Ok(id)
    }

    /// Removes a node and its connections. Takes effect at the next commit.
    pub fn remove_node(&mut self, id: NodeId) -> Result<()> {
        self.ensure_running()?;
        self.graph.remove_node(id)?;
        if let Some(position) = self.pending_inserts.iter().position(|n| *n == id) {
            self.pending_inserts.remove(position);
        } else {
            self.pending_removals.push(id);
        }
        tracing::debug!(node = %id, "node removed");
        Ok(())
    }

    /// Connects an output pin to an input pin.
    pub fn connect(&mut self, src: NodeId, src_pin: &str, dst: NodeId, dst_pin: &str) -> Result<()> {
        self.ensure_running()?;
        self.graph
            .connect(src, src_pin, dst, dst_pin)
            .inspect_err(|err| tracing::debug!(%src, src_pin, %dst, dst_pin, %err, "edge rejected"))
    }

    /// Connects a scalar output to an input through a one-block delay.
    pub fn connect_delayed(
        &mut self,
        src: NodeId,
        src_pin: &str,
        dst: NodeId,
        dst_pin: &str,
    ) -> Result<()> {
        self.ensure_running()?;
        self.graph
            .connect_delayed(src, src_pin, dst, dst_pin)
            .inspect_err(|err| tracing::debug!(%src, src_pin, %dst, dst_pin, %err, "delayed edge rejected"))
    }

    /// Removes the connection feeding an input.
    pub fn disconnect(&mut self, dst: NodeId, dst_pin: &str) -> Result<()> {
        self.ensure_running()?;
        self.graph.disconnect(dst, dst_pin).map(|_| ())
    }

    /// Exposes an audio output to the host. Returns its output slot.
    pub fn add_output(&mut self, node: NodeId, pin: &str) -> Result<usize> {
        self.ensure_running()?;
        self.graph.add_output(node, pin)
    }

    // ========================================================================
    // Parameter Changes
    // ========================================================================

    /// Sets the value an unconnected scalar input reads.
    ///
    /// For committed nodes the change is queued immediately and applied at
    /// the next block boundary.
    pub fn set_input(&mut self, node: NodeId, pin: &str, value: PinValue) -> Result<()> {
        self.ensure_running()?;
        self.collect_feedback();
        let committed = self.is_committed(node);
        if committed && self.channels.command_slots_available() == 0 {
            return Err(GraphError::QueueFull);
        }
        let index = self.graph.set_input(node, pin, value)?;
        if committed {
            self.send(EngineCommand::SetInput {
                node,
                pin: index,
                value,
            })?;
        }
        Ok(())
    }

    /// Fires an unconnected trigger input for exactly one block.
    ///
    /// Triggers on nodes that are not committed yet fire in the first block
    /// after the commit.
    pub fn fire_trigger(&mut self, node: NodeId, pin: &str) -> Result<()> {
        self.ensure_running()?;
        let index = self.graph.pin_index(node, PinDirection::Input, pin)?;
        let kind = self.graph.node(node)?.interface().inputs()[index].kind;
        if kind != PinKind::Trigger {
            return Err(GraphError::TypeMismatch {
                expected: PinKind::Trigger,
                found: kind,
            });
        }
        if self.graph.source_of(node, index).is_some() {
            return Err(GraphError::PinAlreadyBound {
                node,
                pin: pin.to_string(),
            });
        }
        let command = EngineCommand::FireTrigger {
            node,
            pin: index,
            frame: 0,
        };
        if self.is_committed(node) {
            self.collect_feedback();
            self.send(command)
        } else {
            self.deferred.push(command);
            Ok(())
        }
    }

    /// Asks the render thread to reset every node's DSP state.
    pub fn reset_nodes(&mut self) -> Result<()> {
        self.ensure_running()?;
        self.collect_feedback();
        self.send(EngineCommand::ResetNodes)
    }

    fn send(&mut self, command: EngineCommand) -> Result<()> {
        self.channels
            .send_command(command)
            .map_err(|_| GraphError::QueueFull)
    }

    // ========================================================================
    // Plan Publication
    // ========================================================================

    /// Compiles the topology and publishes it to the render thread.
    ///
    /// New node instances are built and initialized here, sent ahead of the
    /// plan that references them; removed nodes are released after the plan
    /// that no longer references them. If compilation fails nothing is sent
    /// and the previously published plan keeps rendering.
    pub fn commit(&mut self) -> Result<Arc<ExecutionPlan>> {
        self.ensure_running()?;
        let plan = scheduler::compile(&self.graph, self.generation + 1)
            .inspect_err(|err| tracing::warn!(%err, "plan compilation failed"))?;

        self.collect_feedback();
        let needed = self.pending_inserts.len() + 1 + self.pending_removals.len() + self.deferred.len();
        if self.channels.command_slots_available() < needed {
            return Err(GraphError::QueueFull);
        }

        let plan = Arc::new(plan);
        for id in std::mem::take(&mut self.pending_inserts) {
            let entry = self.graph.node(id)?;
            let slot = NodeSlot::for_entry(entry, self.config.sample_rate, self.config.block_size);
            self.send(EngineCommand::InsertNode(Box::new(slot)))?;
        }
        self.send(EngineCommand::PublishPlan(Arc::clone(&plan)))?;
        for id in std::mem::take(&mut self.pending_removals) {
            self.send(EngineCommand::RemoveNode(id))?;
        }
        for command in std::mem::take(&mut self.deferred) {
            self.send(command)?;
        }

        self.graph.release_pending();
        self.generation = plan.generation();
        self.published = Some(Arc::clone(&plan));
        tracing::info!(
            generation = plan.generation(),
            nodes = plan.len(),
            outputs = plan.outputs().len(),
            "plan published"
        );
        Ok(plan)
    }

    // ========================================================================
    // Render Feedback
    // ========================================================================

    /// Returns the events received from the render thread since the last
    /// call and frees retired memory.
    ///
    /// Realtime violations are logged and recorded; see [`faults`](Self::faults).
    pub fn poll(&mut self) -> Vec<EngineEvent> {
        self.collect_feedback();
        std::mem::take(&mut self.undelivered)
    }

    /// Empties the event and retire queues.
    ///
    /// Runs before every send so the render thread always finds room to hand
    /// memory back, even if the host never polls.
    fn collect_feedback(&mut self) {
        while let Some(event) = self.channels.recv_event() {
            match event {
                EngineEvent::PlanInstalled { generation } => {
                    self.installed_generation = Some(generation);
                    tracing::debug!(generation, "plan installed");
                }
                EngineEvent::RealtimeViolation { node, kind } => {
                    let class = self.graph.node(node).map(|e| e.class_name()).unwrap_or("<removed>");
                    tracing::error!(%node, class, %kind, "node violated the realtime contract and was silenced");
                    self.faults.push((node, kind));
                }
                EngineEvent::ShutdownComplete => {
                    tracing::debug!("render thread acknowledged shutdown");
                }
            }
            self.undelivered.push(event);
        }
        let released = self.channels.release_retired();
        if released > 0 {
            tracing::trace!(released, "released retired resources");
        }
    }

    /// Realtime violations reported so far, as errors.
    pub fn faults(&self) -> Vec<GraphError> {
        self.faults
            .iter()
            .map(|&(node, kind)| GraphError::RealtimeViolation { node, kind })
            .collect()
    }

    /// Returns true if the node has been silenced for a realtime violation.
    pub fn is_faulted(&self, node: NodeId) -> bool {
        self.faults.iter().any(|(n, _)| *n == node)
    }

    /// Stops the render side and releases every node on this thread.
    ///
    /// Waits at most `timeout` for the render thread to finish its current
    /// block and acknowledge. The render thread must keep calling
    /// `render_block` (or be dropped) for this to complete.
    pub fn shutdown(&mut self, timeout: Duration) -> Result<()> {
        self.ensure_running()?;
        let deadline = Instant::now() + timeout;

        let mut command = Some(EngineCommand::Shutdown);
        while let Some(cmd) = command.take() {
            if let Err(cmd) = self.channels.send_command(cmd) {
                if Instant::now() >= deadline {
                    return Err(GraphError::ShutdownTimeout(timeout));
                }
                self.poll();
                thread::sleep(Duration::from_millis(1));
                command = Some(cmd);
            }
        }

        loop {
            let acknowledged = self
                .poll()
                .iter()
                .any(|e| matches!(e, EngineEvent::ShutdownComplete));
            if acknowledged || self.channels.is_render_gone() {
                break;
            }
            if Instant::now() >= deadline {
                tracing::warn!(?timeout, "render thread did not acknowledge shutdown");
                return Err(GraphError::ShutdownTimeout(timeout));
            }
            thread::sleep(Duration::from_millis(1));
        }

        self.shut_down = true;
        self.published = None;
        self.channels.release_retired();
        tracing::info!("engine shut down");
        Ok(())
    }
}
