//! Control-side graph topology.
//!
//! Node entries live in a dense arena addressed by index; connections refer to
//! nodes by [`NodeId`] and to pins by index within the node's vertex
//! interface. Every edit validates fully before touching state, so a rejected
//! edit leaves the topology exactly as it was.

use std::fmt;
use std::sync::Arc;

use crate::dsp::{NodeDescriptor, NodeFactory, PinDirection, PinKind, PinValue, VertexInterface};
use crate::error::{GraphError, Result};

/// Handle to a node in the graph.
///
/// The generation distinguishes a live node from an earlier, removed node that
/// occupied the same arena index.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId {
    index: u32,
    generation: u32,
}

impl NodeId {
    pub(crate) fn new(index: usize, generation: u32) -> Self {
        Self {
            index: index as u32,
            generation,
        }
    }

    /// Arena index of the node.
    pub fn index(&self) -> usize {
        self.index as usize
    }

    pub fn generation(&self) -> u32 {
        self.generation
    }
}

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}.{}", self.index, self.generation)
    }
}

/// A connection from an output pin to an input pin.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Connection {
    /// Producing node.
    pub src: NodeId,
    /// Output pin index on the producing node.
    pub src_pin: usize,
    /// Consuming node.
    pub dst: NodeId,
    /// Input pin index on the consuming node.
    pub dst_pin: usize,
    /// One-block-delayed control tap. Not a scheduling dependency.
    pub delayed: bool,
}

/// An audio output pin exposed to the host.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct GraphOutput {
    pub node: NodeId,
    pub pin: usize,
}

/// A node in the topology.
#[derive(Clone, Debug)]
pub struct NodeEntry {
    id: NodeId,
    /// Insertion sequence, used as the scheduler's tie-break.
    seq: u64,
    class_name: &'static str,
    interface: Arc<VertexInterface>,
    factory: NodeFactory,
    /// Control-thread values for unconnected scalar inputs.
    literals: Vec<Option<PinValue>>,
}

impl NodeEntry {
    pub fn id(&self) -> NodeId {
        self.id
    }

    pub fn seq(&self) -> u64 {
        self.seq
    }

    pub fn class_name(&self) -> &'static str {
        self.class_name
    }

    pub fn interface(&self) -> &Arc<VertexInterface> {
        &self.interface
    }

    pub(crate) fn factory(&self) -> NodeFactory {
        self.factory
    }

    /// Values set on scalar inputs with [`Graph::set_input`].
    pub fn literals(&self) -> &[Option<PinValue>] {
        &self.literals
    }
}

/// The directed graph of node instances and connections.
#[derive(Debug)]
pub struct Graph {
    nodes: Vec<Option<NodeEntry>>,
    generations: Vec<u32>,
    /// Indices that may be handed out again.
    free: Vec<usize>,
    /// Indices freed since the last commit. Held back until the render side
    /// has been told to drop the old node.
    pending_free: Vec<usize>,
    connections: Vec<Connection>,
    outputs: Vec<GraphOutput>,
    next_seq: u64,
    capacity: usize,
}

impl Graph {
    /// Creates an empty graph that can hold at most `capacity` nodes.
    pub fn new(capacity: usize) -> Self {
        Self {
            nodes: Vec::with_capacity(capacity),
            generations: Vec::with_capacity(capacity),
            free: Vec::new(),
            pending_free: Vec::new(),
            connections: Vec::new(),
            outputs: Vec::new(),
            next_seq: 0,
            capacity,
        }
    }

    /// Maximum number of nodes.
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Number of live nodes.
    pub fn node_count(&self) -> usize {
        self.nodes.iter().filter(|n| n.is_some()).count()
    }

    /// Length of the arena, including vacant indices.
    pub fn arena_len(&self) -> usize {
        self.nodes.len()
    }

    /// Returns true if the id refers to a live node.
    pub fn contains(&self, id: NodeId) -> bool {
        self.node(id).is_ok()
    }

    /// Looks up a live node.
    pub fn node(&self, id: NodeId) -> Result<&NodeEntry> {
        self.nodes
            .get(id.index())
            .and_then(Option::as_ref)
            .filter(|entry| entry.id == id)
            .ok_or(GraphError::UnknownNode(id))
    }

    fn node_mut(&mut self, id: NodeId) -> Result<&mut NodeEntry> {
        self.nodes
            .get_mut(id.index())
            .and_then(Option::as_mut)
            .filter(|entry| entry.id == id)
            .ok_or(GraphError::UnknownNode(id))
    }

    /// Id of the live node at an arena index.
    pub fn id_at(&self, index: usize) -> Option<NodeId> {
        self.nodes.get(index).and_then(Option::as_ref).map(|entry| entry.id)
    }

    /// Live nodes in insertion order.
    pub fn nodes(&self) -> Vec<&NodeEntry> {
        let mut nodes: Vec<&NodeEntry> = self.nodes.iter().flatten().collect();
        nodes.sort_by_key(|entry| entry.seq);
        nodes
    }

    /// All connections, in the order they were made.
    pub fn connections(&self) -> &[Connection] {
        &self.connections
    }

    /// Audio outputs exposed to the host, in designation order.
    pub fn outputs(&self) -> &[GraphOutput] {
        &self.outputs
    }

    /// The connection feeding an input, if any.
    pub fn source_of(&self, dst: NodeId, dst_pin: usize) -> Option<&Connection> {
        self.connections
            .iter()
            .find(|c| c.dst == dst && c.dst_pin == dst_pin)
    }

    // ========================================================================
    // Graph Modification Methods
    // ========================================================================

    /// Adds an instance of a node type.
    pub fn add_node(&mut self, descriptor: &NodeDescriptor) -> Result<NodeId> {
        let index = match self.free.pop() {
            Some(index) => index,
            None if self.nodes.len() < self.capacity => {
                self.nodes.push(None);
                self.generations.push(0);
                self.nodes.len() - 1
            }
            None => return Err(GraphError::GraphFull(self.capacity)),
        };

        let id = NodeId::new(index, self.generations[index]);
        let literals = descriptor
            .interface
            .inputs()
            .iter()
            .map(|pin| pin.default_value())
            .collect();
        self.nodes[index] = Some(NodeEntry {
            id,
            seq: self.next_seq,
            class_name: descriptor.class_name(),
            interface: Arc::clone(&descriptor.interface),
            factory: descriptor.factory,
            literals,
        });
        self.next_seq += 1;
        Ok(id)
    }

    /// Removes a node together with every connection and output touching it.
    pub fn remove_node(&mut self, id: NodeId) -> Result<()> {
        self.node(id)?;
        let index = id.index();
        self.nodes[index] = None;
        self.generations[index] = self.generations[index].wrapping_add(1);
        self.pending_free.push(index);
        self.connections.retain(|c| c.src != id && c.dst != id);
        self.outputs.retain(|o| o.node != id);
        Ok(())
    }

    /// Connects an output pin to an input pin.
    ///
    /// Fails with `TypeMismatch` if the pin kinds differ, `CycleDetected` if
    /// the edge would close a cycle and `PinAlreadyBound` if the input already
    /// has a source.
    pub fn connect(&mut self, src: NodeId, src_pin: &str, dst: NodeId, dst_pin: &str) -> Result<()> {
        let (src_index, dst_index) = self.check_edge(src, src_pin, dst, dst_pin)?;
        if src == dst || self.reaches(dst, src) {
            return Err(GraphError::CycleDetected { from: src, to: dst });
        }
        self.check_unbound(dst, dst_index, dst_pin)?;
        self.connections.push(Connection {
            src,
            src_pin: src_index,
            dst,
            dst_pin: dst_index,
            delayed: false,
        });
        Ok(())
    }

    /// Connects a scalar output to a scalar input through a one-block delay.
    ///
    /// The consumer reads the value the producer wrote in the previous block,
    /// so delayed edges may close feedback loops.
    pub fn connect_delayed(
        &mut self,
        src: NodeId,
        src_pin: &str,
        dst: NodeId,
        dst_pin: &str,
    ) -> Result<()> {
        let (src_index, dst_index) = self.check_edge(src, src_pin, dst, dst_pin)?;
        let kind = self.node(src)?.interface.outputs()[src_index].kind;
        if !kind.is_scalar() {
            return Err(GraphError::TypeMismatch {
                expected: PinKind::Float,
                found: kind,
            });
        }
        self.check_unbound(dst, dst_index, dst_pin)?;
        self.connections.push(Connection {
            src,
            src_pin: src_index,
            dst,
            dst_pin: dst_index,
            delayed: true,
        });
        Ok(())
    }

    /// Removes the connection feeding an input.
    pub fn disconnect(&mut self, dst: NodeId, dst_pin: &str) -> Result<Connection> {
        let index = self.pin_index(dst, PinDirection::Input, dst_pin)?;
        let position = self
            .connections
            .iter()
            .position(|c| c.dst == dst && c.dst_pin == index)
            .ok_or_else(|| GraphError::NotConnected {
                node: dst,
                pin: dst_pin.to_string(),
            })?;
        Ok(self.connections.remove(position))
    }

    /// Sets the value an unconnected scalar input reads.
    ///
    /// Returns the pin index.
    pub fn set_input(&mut self, id: NodeId, pin: &str, value: PinValue) -> Result<usize> {
        let index = self.pin_index(id, PinDirection::Input, pin)?;
        let entry = self.node_mut(id)?;
        let kind = entry.interface.inputs()[index].kind;
        if kind != value.kind() {
            return Err(GraphError::TypeMismatch {
                expected: kind,
                found: value.kind(),
            });
        }
        entry.literals[index] = Some(value);
        Ok(index)
    }

    /// Exposes an audio output pin to the host. Returns its output slot.
    pub fn add_output(&mut self, id: NodeId, pin: &str) -> Result<usize> {
        let index = self.pin_index(id, PinDirection::Output, pin)?;
        let kind = self.node(id)?.interface.outputs()[index].kind;
        if kind != PinKind::Audio {
            return Err(GraphError::TypeMismatch {
                expected: PinKind::Audio,
                found: kind,
            });
        }
        self.outputs.push(GraphOutput { node: id, pin: index });
        Ok(self.outputs.len() - 1)
    }

    /// Makes indices freed since the last commit available again.
    pub(crate) fn release_pending(&mut self) {
        self.free.append(&mut self.pending_free);
    }

    // ========================================================================
    // Validation
    // ========================================================================

    /// Resolves a pin name to its index.
    pub fn pin_index(&self, id: NodeId, direction: PinDirection, pin: &str) -> Result<usize> {
        self.node(id)?
            .interface
            .pin(direction, pin)
            .map(|(index, _)| index)
            .ok_or_else(|| GraphError::UnknownPin {
                node: id,
                pin: pin.to_string(),
                direction,
            })
    }

    /// Resolves both pins and checks that their kinds agree.
    fn check_edge(
        &self,
        src: NodeId,
        src_pin: &str,
        dst: NodeId,
        dst_pin: &str,
    ) -> Result<(usize, usize)> {
        let src_index = self.pin_index(src, PinDirection::Output, src_pin)?;
        let dst_index = self.pin_index(dst, PinDirection::Input, dst_pin)?;
        let found = self.node(src)?.interface.outputs()[src_index].kind;
        let expected = self.node(dst)?.interface.inputs()[dst_index].kind;
        if found != expected {
            return Err(GraphError::TypeMismatch { expected, found });
        }
        Ok((src_index, dst_index))
    }

    fn check_unbound(&self, dst: NodeId, dst_index: usize, dst_pin: &str) -> Result<()> {
        if self.source_of(dst, dst_index).is_some() {
            return Err(GraphError::PinAlreadyBound {
                node: dst,
                pin: dst_pin.to_string(),
            });
        }
        Ok(())
    }

    /// Returns true if `to` is reachable from `from` over undelayed edges.
    fn reaches(&self, from: NodeId, to: NodeId) -> bool {
        let mut visited = vec![false; self.nodes.len()];
        let mut stack = vec![from];
        while let Some(node) = stack.pop() {
            if node == to {
                return true;
            }
            if std::mem::replace(&mut visited[node.index()], true) {
                continue;
            }
            stack.extend(
                self.connections
                    .iter()
                    .filter(|c| !c.delayed && c.src == node)
                    .map(|c| c.dst),
            );
        }
        false
    }
}
