//! Execution planner.
//!
//! Compiles the topology into an [`ExecutionPlan`] with a depth-first
//! topological sort. Roots are visited in node insertion order and each
//! node's producers in input-pin order, so identical topologies built in the
//! same order always yield identical plans. Runs on the control thread only.

use crate::error::{GraphError, Result};
use crate::graph::{Graph, NodeEntry, NodeId};

use super::plan::{DelayTap, ExecutionPlan, InputBinding, OutputTap, PlanStep};

#[derive(Clone, Copy, PartialEq, Eq)]
enum Mark {
    Unvisited,
    Visiting,
    Visited,
}

/// Builds the execution plan for the current topology.
///
/// Fails with `UnboundRequiredInput` if any input has neither a connection
/// nor a value, and with `CycleDetected` if the undelayed edges contain a
/// cycle.
pub fn compile(graph: &Graph, generation: u64) -> Result<ExecutionPlan> {
    let arena_len = graph.arena_len();

    // Input bindings per arena index.
    let mut bindings: Vec<Vec<InputBinding>> = vec![Vec::new(); arena_len];
    let nodes = graph.nodes();
    for entry in &nodes {
        bindings[entry.id().index()] = vec![InputBinding::Unbound; entry.interface().inputs().len()];
    }
    let mut delay_taps = Vec::new();
    for conn in graph.connections() {
        let binding = &mut bindings[conn.dst.index()][conn.dst_pin];
        if conn.delayed {
            *binding = InputBinding::Delayed;
            delay_taps.push(DelayTap {
                src: conn.src.index(),
                src_pin: conn.src_pin,
                dst: conn.dst.index(),
                dst_pin: conn.dst_pin,
            });
        } else {
            *binding = InputBinding::Connected {
                node: conn.src.index(),
                pin: conn.src_pin,
            };
        }
    }

    for entry in &nodes {
        check_required_inputs(entry, &bindings[entry.id().index()])?;
    }

    let mut sorter = Sorter {
        graph,
        bindings: &bindings,
        marks: vec![Mark::Unvisited; arena_len],
        order: Vec::with_capacity(nodes.len()),
        stack: Vec::new(),
    };
    for entry in &nodes {
        sorter.visit(entry.id())?;
    }

    let steps = sorter
        .order
        .into_iter()
        .map(|node| PlanStep {
            node,
            inputs: bindings[node.index()].clone(),
        })
        .collect();
    let outputs = graph
        .outputs()
        .iter()
        .map(|o| OutputTap {
            node: o.node.index(),
            pin: o.pin,
        })
        .collect();

    Ok(ExecutionPlan {
        generation,
        steps,
        delay_taps,
        outputs,
    })
}

fn check_required_inputs(entry: &NodeEntry, bindings: &[InputBinding]) -> Result<()> {
    for (index, pin) in entry.interface().inputs().iter().enumerate() {
        let has_value = entry.literals().get(index).copied().flatten().is_some();
        if pin.is_required() && bindings[index] == InputBinding::Unbound && !has_value {
            return Err(GraphError::UnboundRequiredInput {
                node: entry.id(),
                pin: pin.name.to_string(),
            });
        }
    }
    Ok(())
}

struct Sorter<'a> {
    graph: &'a Graph,
    bindings: &'a [Vec<InputBinding>],
    marks: Vec<Mark>,
    order: Vec<NodeId>,
    /// Nodes being visited, each with the next input pin to look at.
    stack: Vec<(NodeId, usize)>,
}

impl Sorter<'_> {
    /// Emits `root` after all of its producers, depth first.
    ///
    /// Walks an explicit stack, so long chains cost heap rather than call
    /// depth.
    fn visit(&mut self, root: NodeId) -> Result<()> {
        if self.marks[root.index()] != Mark::Unvisited {
            return Ok(());
        }
        let (graph, bindings) = (self.graph, self.bindings);
        self.marks[root.index()] = Mark::Visiting;
        self.stack.push((root, 0));

        while let Some((node, cursor)) = self.stack.last_mut() {
            let node = *node;
            let inputs = &bindings[node.index()];
            let mut producer = None;
            while producer.is_none() && *cursor < inputs.len() {
                if let InputBinding::Connected { node: index, .. } = inputs[*cursor] {
                    producer = graph.id_at(index);
                }
                *cursor += 1;
            }

            match producer {
                Some(producer) => match self.marks[producer.index()] {
                    Mark::Visited => {}
                    Mark::Visiting => {
                        self.stack.clear();
                        return Err(GraphError::CycleDetected {
                            from: producer,
                            to: node,
                        });
                    }
                    Mark::Unvisited => {
                        self.marks[producer.index()] = Mark::Visiting;
                        self.stack.push((producer, 0));
                    }
                },
                None => {
                    self.stack.pop();
                    self.marks[node.index()] = Mark::Visited;
                    self.order.push(node);
                }
            }
        }
        Ok(())
    }
}
