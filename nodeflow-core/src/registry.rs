//! Node Type Registry
//!
//! The registry maps namespaced type names (`"math/operation"`) to
//! factories, and owns any resources shared by all instances of those types.
//! It is constructed explicitly and shared between graphs through an `Arc`;
//! both tables sit behind `parking_lot` locks so registration and lookups
//! only need `&self`.
//!
//! Registering a name twice replaces the first entry.

use std::any::Any;
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use indexmap::IndexMap;
use parking_lot::RwLock;

use crate::behavior::{Capabilities, NodeBehavior};
use crate::error::{GraphError, GraphResult};
use crate::graph::{Node, SlotDescriptor, SlotType};
use crate::Value;

type Factory = dyn Fn(&mut NodeShape) -> Box<dyn NodeBehavior> + Send + Sync;

/// Slots and properties a factory declares for a fresh instance.
#[derive(Debug, Clone, Default)]
pub struct NodeShape {
    /// Input slots, in index order.
    pub inputs: Vec<SlotDescriptor>,
    /// Output slots, in index order.
    pub outputs: Vec<SlotDescriptor>,
    /// Default property values.
    pub properties: IndexMap<String, Value>,
}

impl NodeShape {
    /// Declare the next input slot.
    pub fn input(&mut self, name: impl Into<String>, slot_type: impl Into<SlotType>) -> &mut Self {
        self.inputs.push(SlotDescriptor::new(name, slot_type));
        self
    }

    /// Declare the next output slot.
    pub fn output(&mut self, name: impl Into<String>, slot_type: impl Into<SlotType>) -> &mut Self {
        self.outputs.push(SlotDescriptor::new(name, slot_type));
        self
    }

    /// Declare a property and its default. Declaring a name twice keeps
    /// the last value.
    pub fn property(&mut self, name: impl Into<String>, value: impl Into<Value>) -> &mut Self {
        self.properties.insert(name.into(), value.into());
        self
    }
}

/// A registered node type.
pub struct NodeType {
    name: String,
    title: String,
    description: String,
    size: Option<[f32; 2]>,
    factory: Arc<Factory>,
    capabilities: Capabilities,
}

impl NodeType {
    /// Describe a type. The default title is the last segment of the name.
    pub fn new<F>(name: impl Into<String>, factory: F) -> Self
    where
        F: Fn(&mut NodeShape) -> Box<dyn NodeBehavior> + Send + Sync + 'static,
    {
        let name = name.into();
        let title = name.rsplit('/').next().unwrap_or(&name).to_string();
        Self {
            name,
            title,
            description: String::new(),
            size: None,
            factory: Arc::new(factory),
            capabilities: Capabilities::NONE,
        }
    }

    /// Override the title derived from the name.
    pub fn with_title(mut self, title: impl Into<String>) -> Self {
        self.title = title.into();
        self
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    /// Size given to fresh instances and to loaded nodes whose record has
    /// none.
    pub fn with_size(mut self, size: [f32; 2]) -> Self {
        self.size = Some(size);
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn title(&self) -> &str {
        &self.title
    }

    pub fn description(&self) -> &str {
        &self.description
    }

    /// Resolved when the type is registered.
    pub fn capabilities(&self) -> Capabilities {
        self.capabilities
    }

    fn instantiate(&self) -> Node {
        let mut shape = NodeShape::default();
        let behavior = (self.factory)(&mut shape);
        let mut node = Node::new(self.name.clone(), self.title.clone(), self.capabilities, behavior);
        for input in shape.inputs {
            node.add_input(input);
        }
        for output in shape.outputs {
            node.add_output(output);
        }
        node.properties = shape.properties;
        if let Some(size) = self.size {
            node.size = size;
        }
        node
    }
}

impl fmt::Debug for NodeType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("NodeType")
            .field("name", &self.name)
            .field("title", &self.title)
            .field("capabilities", &self.capabilities)
            .finish()
    }
}

/// Catalog of node types plus shared resources.
#[derive(Default)]
pub struct Registry {
    types: RwLock<HashMap<String, Arc<NodeType>>>,
    resources: RwLock<HashMap<String, Arc<dyn Any + Send + Sync>>>,
}

impl Registry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a factory under `name` with default metadata.
    pub fn register<F>(&self, name: impl Into<String>, factory: F) -> Capabilities
    where
        F: Fn(&mut NodeShape) -> Box<dyn NodeBehavior> + Send + Sync + 'static,
    {
        self.register_type(NodeType::new(name, factory))
    }

    /// Register a fully described type.
    ///
    /// The factory is run once here on a scratch shape to read the type's
    /// capabilities, which are then cached for every instance.
    pub fn register_type(&self, mut node_type: NodeType) -> Capabilities {
        let prototype = (node_type.factory)(&mut NodeShape::default());
        node_type.capabilities = prototype.capabilities();

        let capabilities = node_type.capabilities;
        let name = node_type.name.clone();
        let replaced = self
            .types
            .write()
            .insert(name.clone(), Arc::new(node_type))
            .is_some();

        if replaced {
            tracing::debug!(node_type = %name, "node type re-registered, previous entry replaced");
        } else {
            tracing::debug!(node_type = %name, ?capabilities, "node type registered");
        }
        capabilities
    }

    /// Instantiate a node of the named type with its declared slots and
    /// properties.
    pub fn create(&self, name: &str) -> GraphResult<Node> {
        let node_type = self
            .types
            .read()
            .get(name)
            .cloned()
            .ok_or_else(|| GraphError::UnknownType(name.to_string()))?;
        Ok(node_type.instantiate())
    }

    pub fn contains(&self, name: &str) -> bool {
        self.types.read().contains_key(name)
    }

    pub fn get(&self, name: &str) -> Option<Arc<NodeType>> {
        self.types.read().get(name).cloned()
    }

    /// Registered type names, sorted.
    pub fn type_names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.types.read().keys().cloned().collect();
        names.sort();
        names
    }

    /// Remove a type. Existing instances keep working.
    pub fn unregister(&self, name: &str) -> bool {
        self.types.write().remove(name).is_some()
    }

    /// Store a resource shared by every node, replacing any previous value
    /// under the same name.
    pub fn insert_resource<T>(&self, name: impl Into<String>, resource: T)
    where
        T: Any + Send + Sync,
    {
        self.resources.write().insert(name.into(), Arc::new(resource));
    }

    /// Fetch a shared resource, if present and of type `T`.
    pub fn resource<T>(&self, name: &str) -> Option<Arc<T>>
    where
        T: Any + Send + Sync,
    {
        let resource = self.resources.read().get(name).cloned()?;
        resource.downcast::<T>().ok()
    }

    /// Drop every shared resource. Nodes holding their own `Arc` keep theirs
    /// alive until they release it.
    pub fn teardown(&self) {
        let released = {
            let mut resources = self.resources.write();
            let count = resources.len();
            resources.clear();
            count
        };
        tracing::info!(released, "registry resources torn down");
    }
}

impl fmt::Debug for Registry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Registry")
            .field("types", &self.type_names())
            .field("resources", &self.resources.read().len())
            .finish()
    }
}
