//! Node registry for managing node types.
//!
//! The registry is the central catalog of node types. Collaborators register
//! a descriptor (info, vertex interface, factory) once; the topology then
//! instantiates nodes by class name.

use std::collections::HashMap;
use std::sync::Arc;

use super::node::{Node, NodeClass, NodeInfo};
use super::vertex::VertexInterface;
use crate::error::{GraphError, Result};

/// Factory function type for creating node instances.
pub type NodeFactory = fn() -> Box<dyn Node>;

/// Everything needed to instantiate a node type.
#[derive(Clone, Debug)]
pub struct NodeDescriptor {
    pub info: NodeInfo,
    /// Shared read-only by every instance of the type.
    pub interface: Arc<VertexInterface>,
    pub factory: NodeFactory,
}

impl NodeDescriptor {
    /// Creates a descriptor from its parts.
    pub fn new(info: NodeInfo, interface: VertexInterface, factory: NodeFactory) -> Self {
        Self {
            info,
            interface: Arc::new(interface),
            factory,
        }
    }

    /// Builds the descriptor of a [`NodeClass`].
    pub fn of<N: NodeClass>() -> Self {
        Self::new(N::INFO, N::interface(), create_node::<N>)
    }

    /// The class name this descriptor registers under.
    pub fn class_name(&self) -> &'static str {
        self.info.class_name
    }

    /// Creates a fresh, uninitialized instance.
    pub fn instantiate(&self) -> Box<dyn Node> {
        (self.factory)()
    }
}

/// Central registry of available node types.
///
/// # Example
///
/// ```ignore
/// let mut registry = NodeRegistry::new();
/// registry.register_class::<Gain>()?;
/// registry.register_class::<Tremolo>()?;
///
/// let tremolo = registry.lookup("Tremolo")?;
/// assert_eq!(tremolo.interface.inputs().len(), 5);
/// ```
#[derive(Clone, Debug, Default)]
pub struct NodeRegistry {
    descriptors: HashMap<&'static str, NodeDescriptor>,
    /// Class names in registration order, for stable listings.
    order: Vec<&'static str>,
}

impl NodeRegistry {
    /// Creates a new empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a node type.
    ///
    /// Registering the same class again with an identical interface is a
    /// no-op. A different interface under an existing class name fails with
    /// [`GraphError::InterfaceConflict`] and keeps the original entry.
    pub fn register(&mut self, descriptor: NodeDescriptor) -> Result<()> {
        let class = descriptor.class_name();
        descriptor
            .interface
            .validate()
            .map_err(|reason| GraphError::InvalidInterface {
                class: class.to_string(),
                reason,
            })?;

        if let Some(existing) = self.descriptors.get(class) {
            if existing.interface == descriptor.interface {
                tracing::debug!(class, "node type already registered");
                return Ok(());
            }
            return Err(GraphError::InterfaceConflict(class.to_string()));
        }

        tracing::debug!(
            class,
            inputs = descriptor.interface.inputs().len(),
            outputs = descriptor.interface.outputs().len(),
            "registered node type"
        );
        self.order.push(class);
        self.descriptors.insert(class, descriptor);
        Ok(())
    }

    /// Registers a [`NodeClass`] implementation.
    pub fn register_class<N: NodeClass>(&mut self) -> Result<()> {
        self.register(NodeDescriptor::of::<N>())
    }

    /// Looks up a node type by class name.
    pub fn lookup(&self, class: &str) -> Result<&NodeDescriptor> {
        self.descriptors
            .get(class)
            .ok_or_else(|| GraphError::UnknownNodeType(class.to_string()))
    }

    /// Returns the vertex interface of a node type.
    pub fn interface(&self, class: &str) -> Result<Arc<VertexInterface>> {
        self.lookup(class).map(|d| Arc::clone(&d.interface))
    }

    /// Creates a new instance of a node type.
    pub fn create(&self, class: &str) -> Result<Box<dyn Node>> {
        self.lookup(class).map(NodeDescriptor::instantiate)
    }

    /// Info of every registered type, in registration order.
    pub fn list(&self) -> impl Iterator<Item = &NodeInfo> + '_ {
        self.order
            .iter()
            .filter_map(|class| self.descriptors.get(class))
            .map(|d| &d.info)
    }

    /// Returns the number of registered node types.
    pub fn len(&self) -> usize {
        self.descriptors.len()
    }

    /// Returns true if no node types are registered.
    pub fn is_empty(&self) -> bool {
        self.descriptors.is_empty()
    }

    /// Checks if a node type with the given class name is registered.
    pub fn contains(&self, class: &str) -> bool {
        self.descriptors.contains_key(class)
    }
}

fn create_node<N: NodeClass>() -> Box<dyn Node> {
    Box::new(N::default())
}
