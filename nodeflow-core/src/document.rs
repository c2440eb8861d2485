//! Graph Documents
//!
//! Persistable snapshots of a graph's structure: node records and link
//! records, as JSON or MessagePack.
//!
//! # Loading
//!
//! Loading is all-or-nothing on structure but lenient per node:
//!
//! - Duplicate node or link IDs, and links naming a node ID the document
//!   does not contain, make the whole document malformed. Nothing is changed.
//! - A node whose type is not registered is skipped and reported as
//!   `UnknownType`. Links touching it are dropped without further errors.
//! - A link that no longer validates (missing slot, incompatible types) is
//!   skipped and reported.
//! - A node whose `on_configure` fails keeps whatever state it has and is
//!   reported as `Serialization`. The rest of the document still loads.
//!
//! Runtime state (output values, clock, run state) is not persisted.

use std::collections::HashSet;
use std::sync::Arc;

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

use crate::config::GraphConfig;
use crate::error::{GraphError, GraphResult, Hook};
use crate::graph::{Graph, Link, LinkId, Node, NodeFlags, NodeId, NodeMode, SlotDescriptor};
use crate::registry::Registry;
use crate::Value;

/// Format version written into new documents.
pub const DOCUMENT_VERSION: u32 = 1;

fn default_version() -> u32 {
    DOCUMENT_VERSION
}

/// A serialized graph.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GraphDocument {
    #[serde(default = "default_version")]
    pub version: u32,
    #[serde(default)]
    pub last_node_id: u64,
    #[serde(default)]
    pub last_link_id: u64,
    #[serde(default)]
    pub nodes: Vec<NodeRecord>,
    #[serde(default)]
    pub links: Vec<LinkRecord>,
}

impl GraphDocument {
    pub fn to_json(&self) -> GraphResult<String> {
        Ok(serde_json::to_string(self)?)
    }

    pub fn to_json_pretty(&self) -> GraphResult<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    pub fn from_json(json: &str) -> GraphResult<Self> {
        Ok(serde_json::from_str(json)?)
    }

    /// Encode as MessagePack with field names, so records keep their
    /// node-supplied extra fields.
    pub fn to_msgpack(&self) -> GraphResult<Vec<u8>> {
        Ok(rmp_serde::to_vec_named(self)?)
    }

    pub fn from_msgpack(bytes: &[u8]) -> GraphResult<Self> {
        Ok(rmp_serde::from_slice(bytes)?)
    }

    /// Check the structural rules that make a document unloadable.
    fn validate(&self) -> GraphResult<()> {
        if self.version > DOCUMENT_VERSION {
            return Err(GraphError::MalformedDocument(format!(
                "unsupported document version {}",
                self.version
            )));
        }
        // an id at the top of the range would leave the counters nothing to hand out
        if self.last_node_id == u64::MAX || self.last_link_id == u64::MAX {
            return Err(GraphError::MalformedDocument("id counter at u64::MAX".to_string()));
        }

        let mut node_ids = HashSet::with_capacity(self.nodes.len());
        for record in &self.nodes {
            if record.id == NodeId::UNASSIGNED {
                return Err(GraphError::MalformedDocument("node id 0 is reserved".to_string()));
            }
            if record.id.raw() == u64::MAX {
                return Err(GraphError::MalformedDocument(format!("node id {} out of range", record.id)));
            }
            if !node_ids.insert(record.id) {
                return Err(GraphError::MalformedDocument(format!("duplicate node id {}", record.id)));
            }
        }

        let mut link_ids = HashSet::with_capacity(self.links.len());
        for record in &self.links {
            if record.id.raw() == u64::MAX {
                return Err(GraphError::MalformedDocument(format!("link id {} out of range", record.id)));
            }
            if !link_ids.insert(record.id) {
                return Err(GraphError::MalformedDocument(format!("duplicate link id {}", record.id)));
            }
            for endpoint in [record.origin_id, record.target_id] {
                if !node_ids.contains(&endpoint) {
                    return Err(GraphError::MalformedDocument(format!(
                        "link {} refers to node {} which is not in the document",
                        record.id, endpoint
                    )));
                }
            }
        }
        Ok(())
    }
}

/// One node in a [`GraphDocument`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NodeRecord {
    pub id: NodeId,
    #[serde(rename = "type")]
    pub type_name: String,
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub pos: [f32; 2],
    /// Absent means the type's declared size.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub size: Option<[f32; 2]>,
    #[serde(default)]
    pub flags: NodeFlags,
    #[serde(default)]
    pub mode: NodeMode,
    #[serde(default)]
    pub properties: IndexMap<String, Value>,
    #[serde(default)]
    pub inputs: Vec<SlotDescriptor>,
    #[serde(default)]
    pub outputs: Vec<SlotDescriptor>,
    /// Whatever the node's `on_serialize` hook added.
    #[serde(flatten)]
    pub extra: serde_json::Map<String, Value>,
}

impl NodeRecord {
    fn from_node(node: &Node) -> Self {
        Self {
            id: node.id(),
            type_name: node.type_name().to_string(),
            title: node.title.clone(),
            pos: node.pos,
            size: Some(node.size),
            flags: node.flags.clone(),
            mode: node.mode,
            properties: node.properties.clone(),
            inputs: node.inputs().iter().map(|slot| slot.descriptor()).collect(),
            outputs: node.outputs().iter().map(|slot| slot.descriptor()).collect(),
            extra: serde_json::Map::new(),
        }
    }

    /// Overlay the record onto a freshly created node. Properties the record
    /// does not mention keep their type defaults; a slot list the record
    /// leaves empty keeps the type's layout.
    fn apply_to(&self, node: &mut Node) {
        if !self.title.is_empty() {
            node.title = self.title.clone();
        }
        node.pos = self.pos;
        if let Some(size) = self.size {
            node.size = size;
        }
        node.flags = self.flags.clone();
        node.mode = self.mode;
        for (name, value) in &self.properties {
            node.properties.insert(name.clone(), value.clone());
        }

        let inputs = if self.inputs.is_empty() {
            node.inputs().iter().map(|slot| slot.descriptor()).collect()
        } else {
            self.inputs.clone()
        };
        let outputs = if self.outputs.is_empty() {
            node.outputs().iter().map(|slot| slot.descriptor()).collect()
        } else {
            self.outputs.clone()
        };
        node.replace_slots(inputs, outputs);
    }
}

/// One link in a [`GraphDocument`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct LinkRecord {
    pub id: LinkId,
    pub origin_id: NodeId,
    pub origin_slot: usize,
    pub target_id: NodeId,
    pub target_slot: usize,
}

impl From<&Link> for LinkRecord {
    fn from(link: &Link) -> Self {
        Self {
            id: link.id,
            origin_id: link.origin_id,
            origin_slot: link.origin_slot,
            target_id: link.target_id,
            target_slot: link.target_slot,
        }
    }
}

/// Per-entry problems met while loading a document that otherwise loaded.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct LoadReport {
    pub errors: Vec<GraphError>,
}

impl LoadReport {
    pub fn is_clean(&self) -> bool {
        self.errors.is_empty()
    }
}

impl Graph {
    /// Snapshot the graph. Each node's `on_serialize` hook may adjust its
    /// own record.
    pub fn to_document(&self) -> GraphDocument {
        let nodes = self
            .nodes
            .values()
            .map(|node| {
                let mut record = NodeRecord::from_node(node);
                if let Some(behavior) = node.behavior() {
                    behavior.on_serialize(&mut record);
                }
                record
            })
            .collect();

        GraphDocument {
            version: DOCUMENT_VERSION,
            last_node_id: self.last_node_id,
            last_link_id: self.last_link_id,
            nodes,
            links: self.links.values().map(LinkRecord::from).collect(),
        }
    }

    /// Build a new graph from a document, with the default configuration.
    pub fn from_document(registry: Arc<Registry>, document: &GraphDocument) -> GraphResult<(Graph, LoadReport)> {
        Self::from_document_with_config(registry, GraphConfig::default(), document)
    }

    pub fn from_document_with_config(
        registry: Arc<Registry>,
        config: GraphConfig,
        document: &GraphDocument,
    ) -> GraphResult<(Graph, LoadReport)> {
        document.validate()?;

        let mut graph = Graph::with_config(registry, config)?;
        let mut report = LoadReport::default();
        let mut skipped: HashSet<NodeId> = HashSet::new();

        for record in &document.nodes {
            let mut node = match graph.registry.create(&record.type_name) {
                Ok(node) => node,
                Err(err) => {
                    tracing::warn!(node = %record.id, node_type = %record.type_name, "unknown node type, node skipped");
                    skipped.insert(record.id);
                    report.errors.push(err);
                    continue;
                }
            };
            record.apply_to(&mut node);
            graph.insert_node(record.id, node);
        }
        graph.last_node_id = graph.last_node_id.max(document.last_node_id);

        for record in &document.links {
            if skipped.contains(&record.origin_id) || skipped.contains(&record.target_id) {
                tracing::debug!(link = %record.id, "link to skipped node dropped");
                continue;
            }
            if let Err(err) = graph.create_link(
                record.id,
                record.origin_id,
                record.origin_slot,
                record.target_id,
                record.target_slot,
            ) {
                tracing::warn!(link = %record.id, error = %err, "link skipped");
                report.errors.push(err);
            }
        }
        graph.last_link_id = graph.last_link_id.max(document.last_link_id);

        for record in document.nodes.iter().filter(|r| !skipped.contains(&r.id)) {
            let configured = graph.invoke_hook(record.id, Hook::Configure, |behavior, ctx| {
                behavior.on_configure(ctx, record)
            });
            if let Err(err) = configured {
                report.errors.push(GraphError::Serialization {
                    node: record.id,
                    message: err.to_string(),
                });
            }
        }

        tracing::info!(
            nodes = graph.node_count(),
            links = graph.link_count(),
            errors = report.errors.len(),
            "graph document loaded"
        );
        Ok((graph, report))
    }

    /// Replace this graph's contents with a document's.
    ///
    /// The document is built into a fresh graph first; on a structural error
    /// this graph is left untouched. Otherwise the current nodes are stopped
    /// and removed, and the loaded graph takes their place in the stopped
    /// state.
    pub fn load_document(&mut self, document: &GraphDocument) -> GraphResult<LoadReport> {
        let (loaded, report) =
            Self::from_document_with_config(self.registry.clone(), self.config.clone(), document)?;
        self.stop();
        self.clear();
        *self = loaded;
        Ok(report)
    }
}
