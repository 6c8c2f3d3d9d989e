//! In-Memory Signal Tree
//!
//! The tree is loaded once from a VSS JSON document and then mutated in
//! place by `set` operations. Branches group signals and carry no value;
//! leaves carry a datatype, an optional value, and the timestamp of the
//! last assignment (0 until a value is first set).
//!
//! Child declaration order from the source document is preserved, so
//! wildcard leaf enumeration returns leaves in spec order.
//!
//! # Node Shape
//!
//! A branch in the document looks like:
//!
//! ```json
//! { "type": "branch", "description": "...", "children": { "Speed": { ... } } }
//! ```
//!
//! and a leaf:
//!
//! ```json
//! { "type": "sensor", "datatype": "Int32", "unit": "km/h", "uuid": "..." }
//! ```
//!
//! Fields this module does not model (min, max, enum, ...) are kept verbatim
//! and round-trip through metadata responses.

use serde_json::{Map, Value};
use uuid::Uuid;

use crate::error::ServerError;
use crate::signals::datatype::DataType;
use crate::signals::path::VssPath;

/// Role of a signal leaf
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EntryKind {
    Sensor,
    Actuator,
    Attribute,
}

impl EntryKind {
    fn parse(tag: &str) -> Option<Self> {
        match tag {
            "sensor" => Some(Self::Sensor),
            "actuator" => Some(Self::Actuator),
            "attribute" => Some(Self::Attribute),
            _ => None,
        }
    }

    fn as_str(&self) -> &'static str {
        match self {
            Self::Sensor => "sensor",
            Self::Actuator => "actuator",
            Self::Attribute => "attribute",
        }
    }
}

/// A signal leaf
#[derive(Debug, Clone)]
pub struct Signal {
    pub uuid: String,
    pub datatype: DataType,
    pub entry_kind: EntryKind,
    pub unit: Option<String>,
    pub description: Option<String>,
    /// Spec fields not modeled explicitly, preserved for metadata output
    pub extra: Map<String, Value>,
    pub value: Option<Value>,
    /// Unix second of the last assignment, 0 if never set
    pub timestamp: i64,
}

/// An interior grouping node
#[derive(Debug, Clone)]
pub struct Branch {
    pub uuid: Option<String>,
    pub description: Option<String>,
    pub extra: Map<String, Value>,
    /// Children in declaration order of the source document
    pub children: Vec<(String, Node)>,
}

impl Branch {
    fn empty() -> Self {
        Self {
            uuid: None,
            description: None,
            extra: Map::new(),
            children: Vec::new(),
        }
    }

    pub fn child(&self, name: &str) -> Option<&Node> {
        self.children
            .iter()
            .find(|(child_name, _)| child_name == name)
            .map(|(_, node)| node)
    }

    fn child_mut(&mut self, name: &str) -> Option<&mut Node> {
        self.children
            .iter_mut()
            .find(|(child_name, _)| child_name == name)
            .map(|(_, node)| node)
    }
}

/// One node of the tree
#[derive(Debug, Clone)]
pub enum Node {
    Branch(Branch),
    Signal(Signal),
}

impl Node {
    /// Build a node from its JSON representation in the spec document
    fn from_spec(name: &str, value: &Value) -> Result<Self, ServerError> {
        let obj = value.as_object().ok_or_else(|| {
            ServerError::spec_load(format!("node {} is not a JSON object", name))
        })?;

        let type_tag = obj.get("type").and_then(Value::as_str);
        let is_branch = type_tag == Some("branch")
            || (type_tag.is_none() && obj.contains_key("children"));

        if is_branch {
            let mut branch = Branch::empty();
            for (key, field) in obj {
                match key.as_str() {
                    "type" | "children" => {}
                    "uuid" => branch.uuid = field.as_str().map(str::to_string),
                    "description" => branch.description = field.as_str().map(str::to_string),
                    _ => {
                        branch.extra.insert(key.clone(), field.clone());
                    }
                }
            }
            if let Some(children) = obj.get("children") {
                let children = children.as_object().ok_or_else(|| {
                    ServerError::spec_load(format!("children of {} is not an object", name))
                })?;
                for (child_name, child_value) in children {
                    let child = Node::from_spec(child_name, child_value)?;
                    branch.children.push((child_name.clone(), child));
                }
            }
            return Ok(Node::Branch(branch));
        }

        let entry_kind = type_tag.and_then(EntryKind::parse).ok_or_else(|| {
            ServerError::spec_load(format!(
                "node {} has unsupported type {:?}",
                name, type_tag
            ))
        })?;
        let datatype_tag = obj
            .get("datatype")
            .and_then(Value::as_str)
            .ok_or_else(|| ServerError::spec_load(format!("signal {} has no datatype", name)))?;
        let datatype = DataType::parse(datatype_tag).ok_or_else(|| {
            ServerError::spec_load(format!(
                "signal {} has unsupported datatype {}",
                name, datatype_tag
            ))
        })?;

        let mut signal = Signal {
            uuid: String::new(),
            datatype,
            entry_kind,
            unit: None,
            description: None,
            extra: Map::new(),
            value: None,
            timestamp: 0,
        };
        for (key, field) in obj {
            match key.as_str() {
                "type" | "datatype" => {}
                "uuid" => signal.uuid = field.as_str().unwrap_or_default().to_string(),
                "unit" => signal.unit = field.as_str().map(str::to_string),
                "description" => signal.description = field.as_str().map(str::to_string),
                "value" => signal.value = Some(field.clone()),
                _ => {
                    signal.extra.insert(key.clone(), field.clone());
                }
            }
        }
        if signal.uuid.is_empty() {
            signal.uuid = Uuid::new_v4().simple().to_string();
        }
        Ok(Node::Signal(signal))
    }

    /// Render this node and its full subtree back to JSON
    pub fn to_json(&self) -> Value {
        match self {
            Node::Branch(branch) => {
                let mut children = Map::new();
                for (name, child) in &branch.children {
                    children.insert(name.clone(), child.to_json());
                }
                branch_json(branch, Value::Object(children))
            }
            Node::Signal(signal) => signal_json(signal),
        }
    }

    /// View this node as a signal leaf
    pub fn as_signal(&self) -> Option<&Signal> {
        match self {
            Node::Signal(signal) => Some(signal),
            Node::Branch(_) => None,
        }
    }
}

fn branch_json(branch: &Branch, children: Value) -> Value {
    let mut obj = Map::new();
    obj.insert("type".into(), Value::from("branch"));
    if let Some(uuid) = &branch.uuid {
        obj.insert("uuid".into(), Value::from(uuid.clone()));
    }
    if let Some(description) = &branch.description {
        obj.insert("description".into(), Value::from(description.clone()));
    }
    for (key, value) in &branch.extra {
        obj.insert(key.clone(), value.clone());
    }
    obj.insert("children".into(), children);
    Value::Object(obj)
}

fn signal_json(signal: &Signal) -> Value {
    let mut obj = Map::new();
    obj.insert("type".into(), Value::from(signal.entry_kind.as_str()));
    obj.insert("datatype".into(), Value::from(signal.datatype.to_string()));
    obj.insert("uuid".into(), Value::from(signal.uuid.clone()));
    if let Some(unit) = &signal.unit {
        obj.insert("unit".into(), Value::from(unit.clone()));
    }
    if let Some(description) = &signal.description {
        obj.insert("description".into(), Value::from(description.clone()));
    }
    for (key, value) in &signal.extra {
        obj.insert(key.clone(), value.clone());
    }
    if let Some(value) = &signal.value {
        obj.insert("value".into(), value.clone());
    }
    obj.insert("timestamp".into(), Value::from(signal.timestamp));
    Value::Object(obj)
}

/// The signal tree, rooted at an anonymous branch
#[derive(Debug, Clone)]
pub struct SignalTree {
    root: Branch,
}

impl SignalTree {
    /// Parse a VSS JSON document into a tree
    ///
    /// The document's top-level object holds the root branch's children.
    pub fn from_slice(bytes: &[u8]) -> Result<Self, ServerError> {
        let doc: Value = serde_json::from_slice(bytes)
            .map_err(|e| ServerError::spec_load(e.to_string()))?;
        let top = doc
            .as_object()
            .ok_or_else(|| ServerError::spec_load("document root is not a JSON object"))?;

        let mut root = Branch::empty();
        for (name, value) in top {
            let node = Node::from_spec(name, value)?;
            root.children.push((name.clone(), node));
        }
        Ok(Self { root })
    }

    /// An empty tree, replaced by the first successful load
    pub fn empty() -> Self {
        Self {
            root: Branch::empty(),
        }
    }

    /// Look up the node at an exact (wildcard-free) segment list
    pub fn node(&self, segments: &[String]) -> Option<&Node> {
        let mut branch = &self.root;
        for (idx, segment) in segments.iter().enumerate() {
            let child = branch.child(segment)?;
            if idx == segments.len() - 1 {
                return Some(child);
            }
            match child {
                Node::Branch(next) => branch = next,
                Node::Signal(_) => return None,
            }
        }
        None
    }

    /// Mutable signal lookup for `set`
    pub fn signal_mut(&mut self, segments: &[String]) -> Option<&mut Signal> {
        let mut branch = &mut self.root;
        for (idx, segment) in segments.iter().enumerate() {
            let child = branch.child_mut(segment)?;
            if idx == segments.len() - 1 {
                return match child {
                    Node::Signal(signal) => Some(signal),
                    Node::Branch(_) => None,
                };
            }
            match child {
                Node::Branch(next) => branch = next,
                Node::Signal(_) => return None,
            }
        }
        None
    }

    /// Mutable node lookup for metadata patching
    pub fn node_mut(&mut self, segments: &[String]) -> Option<&mut Node> {
        let mut branch = &mut self.root;
        for (idx, segment) in segments.iter().enumerate() {
            let child = branch.child_mut(segment)?;
            if idx == segments.len() - 1 {
                return Some(child);
            }
            match child {
                Node::Branch(next) => branch = next,
                Node::Signal(_) => return None,
            }
        }
        None
    }

    /// Produce the normalized query form of a wildcard-free path
    ///
    /// Every interior branch is followed through its `children` indirection,
    /// e.g. `Vehicle.Acceleration.Vertical` becomes
    /// `$.Vehicle.children.Acceleration.children.Vertical`. Fails with
    /// `InvalidPath` when a segment is absent or a non-branch is used as an
    /// interior node.
    pub fn normalize(&self, path: &VssPath) -> Result<String, ServerError> {
        let segments = path.segments();
        let mut query = String::from("$");
        let mut branch = &self.root;
        for (idx, segment) in segments.iter().enumerate() {
            let child = branch.child(segment).ok_or_else(|| {
                ServerError::invalid_path(format!("{} does not exist in the tree", path))
            })?;
            query.push('.');
            query.push_str(segment);
            match child {
                Node::Branch(next) => {
                    if idx < segments.len() - 1 {
                        query.push_str(".children");
                        branch = next;
                    }
                }
                Node::Signal(_) => {
                    if idx < segments.len() - 1 {
                        return Err(ServerError::invalid_path(format!(
                            "{} is not a branch in {}",
                            segment, path
                        )));
                    }
                }
            }
        }
        Ok(query)
    }

    /// Expand a path to the signal leaves it covers, in declaration order
    ///
    /// A `*` segment matches every child at its position. A path naming a
    /// branch yields every leaf underneath it; a path naming a leaf yields
    /// that leaf. An unknown path yields an empty list, which callers
    /// surface as path-not-found. Using a leaf as an interior node is an
    /// `InvalidPath` error.
    pub fn leaves(&self, path: &VssPath) -> Result<Vec<(VssPath, &Signal)>, ServerError> {
        let mut found = Vec::new();
        collect_leaves(
            NodeRef::Branch(&self.root),
            path.segments(),
            &mut Vec::new(),
            &mut found,
            path,
        )?;
        Ok(found)
    }
}

#[derive(Clone, Copy)]
enum NodeRef<'a> {
    Branch(&'a Branch),
    Signal(&'a Signal),
}

impl<'a> NodeRef<'a> {
    fn of(node: &'a Node) -> Self {
        match node {
            Node::Branch(branch) => NodeRef::Branch(branch),
            Node::Signal(signal) => NodeRef::Signal(signal),
        }
    }
}

fn collect_leaves<'a>(
    node: NodeRef<'a>,
    remaining: &[String],
    prefix: &mut Vec<String>,
    found: &mut Vec<(VssPath, &'a Signal)>,
    full_path: &VssPath,
) -> Result<(), ServerError> {
    match remaining.first() {
        None => {
            // Path fully consumed: a leaf matches itself, a branch yields
            // every leaf descendant.
            match node {
                NodeRef::Signal(signal) => {
                    found.push((VssPath::from_segments(prefix.clone()), signal));
                }
                NodeRef::Branch(branch) => {
                    for (name, child) in &branch.children {
                        prefix.push(name.clone());
                        collect_leaves(NodeRef::of(child), remaining, prefix, found, full_path)?;
                        prefix.pop();
                    }
                }
            }
            Ok(())
        }
        Some(segment) => {
            let branch = match node {
                NodeRef::Branch(branch) => branch,
                NodeRef::Signal(_) => {
                    return Err(ServerError::invalid_path(format!(
                        "{} uses a signal as a branch",
                        full_path
                    )));
                }
            };
            if segment == "*" {
                for (name, child) in &branch.children {
                    prefix.push(name.clone());
                    collect_leaves(NodeRef::of(child), &remaining[1..], prefix, found, full_path)?;
                    prefix.pop();
                }
                return Ok(());
            }
            match branch.child(segment) {
                Some(child) => {
                    prefix.push(segment.clone());
                    collect_leaves(NodeRef::of(child), &remaining[1..], prefix, found, full_path)?;
                    prefix.pop();
                    Ok(())
                }
                // Unknown segment contributes no leaves.
                None => Ok(()),
            }
        }
    }
}

impl SignalTree {
    /// Metadata projection: the chain from root to `path`
    ///
    /// Each ancestor's `children` map contains only the traversed child;
    /// the final node carries its full subtree. Returns JSON `null` when
    /// the path does not resolve.
    pub fn metadata_chain(&self, path: &VssPath) -> Value {
        let segments = path.segments();
        let mut nodes: Vec<&Node> = Vec::with_capacity(segments.len());
        let mut branch = &self.root;
        for (idx, segment) in segments.iter().enumerate() {
            let child = match branch.child(segment) {
                Some(child) => child,
                None => return Value::Null,
            };
            nodes.push(child);
            if idx < segments.len() - 1 {
                match child {
                    Node::Branch(next) => branch = next,
                    Node::Signal(_) => return Value::Null,
                }
            }
        }

        let last = match nodes.last() {
            Some(node) => node,
            None => return Value::Null,
        };
        let mut rendered = last.to_json();

        // Wrap outward: every ancestor keeps only the traversed child.
        for idx in (0..segments.len()).rev() {
            let mut keyed = Map::new();
            keyed.insert(segments[idx].clone(), rendered);
            if idx == 0 {
                return Value::Object(keyed);
            }
            let parent = match nodes[idx - 1] {
                Node::Branch(parent) => parent,
                // Interior signals were rejected during the walk above.
                Node::Signal(_) => return Value::Null,
            };
            rendered = branch_json(parent, Value::Object(keyed));
        }
        Value::Null
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn sample_tree() -> SignalTree {
        let doc = json!({
            "Vehicle": {
                "type": "branch",
                "description": "High-level vehicle data",
                "children": {
                    "Speed": {
                        "type": "sensor",
                        "datatype": "Int32",
                        "unit": "km/h",
                        "uuid": "1efc9a11"
                    },
                    "Acceleration": {
                        "type": "branch",
                        "children": {
                            "Lateral": { "type": "sensor", "datatype": "Float", "uuid": "a1" },
                            "Longitudinal": { "type": "sensor", "datatype": "Float", "uuid": "a2" },
                            "Vertical": { "type": "sensor", "datatype": "Float", "uuid": "a3" }
                        }
                    }
                }
            }
        });
        SignalTree::from_slice(doc.to_string().as_bytes()).unwrap()
    }

    #[test]
    fn test_load_and_lookup() {
        let tree = sample_tree();
        let path = VssPath::parse("Vehicle.Speed").unwrap();
        let node = tree.node(path.segments()).unwrap();
        let signal = node.as_signal().unwrap();
        assert_eq!(signal.uuid, "1efc9a11");
        assert_eq!(signal.datatype, DataType::Int32);
        assert_eq!(signal.timestamp, 0);
    }

    #[test]
    fn test_missing_uuid_is_synthesized() {
        let doc = json!({
            "Cabin": {
                "type": "branch",
                "children": {
                    "DoorCount": { "type": "attribute", "datatype": "UInt8" }
                }
            }
        });
        let tree = SignalTree::from_slice(doc.to_string().as_bytes()).unwrap();
        let path = VssPath::parse("Cabin.DoorCount").unwrap();
        let signal = tree.node(path.segments()).unwrap().as_signal().unwrap().clone();
        assert!(!signal.uuid.is_empty());
    }

    #[test]
    fn test_load_rejects_unknown_datatype() {
        let doc = json!({
            "Vehicle": {
                "type": "branch",
                "children": {
                    "Odd": { "type": "sensor", "datatype": "complex128" }
                }
            }
        });
        assert!(SignalTree::from_slice(doc.to_string().as_bytes()).is_err());
    }

    #[test]
    fn test_normalize_inserts_children() {
        let tree = sample_tree();
        let path = VssPath::parse("Vehicle.Acceleration.Vertical").unwrap();
        assert_eq!(
            tree.normalize(&path).unwrap(),
            "$.Vehicle.children.Acceleration.children.Vertical"
        );
    }

    #[test]
    fn test_normalize_rejects_unknown_segment() {
        let tree = sample_tree();
        let path = VssPath::parse("Vehicle.No.Such").unwrap();
        assert!(tree.normalize(&path).is_err());
    }

    #[test]
    fn test_leaves_of_single_signal() {
        let tree = sample_tree();
        let path = VssPath::parse("Vehicle.Speed").unwrap();
        let leaves = tree.leaves(&path).unwrap();
        assert_eq!(leaves.len(), 1);
        assert_eq!(leaves[0].0.to_string(), "Vehicle.Speed");
    }

    #[test]
    fn test_leaves_of_wildcard_in_declaration_order() {
        let tree = sample_tree();
        let path = VssPath::parse("Vehicle.Acceleration.*").unwrap();
        let leaves = tree.leaves(&path).unwrap();
        let names: Vec<String> = leaves.iter().map(|(p, _)| p.to_string()).collect();
        assert_eq!(
            names,
            vec![
                "Vehicle.Acceleration.Lateral",
                "Vehicle.Acceleration.Longitudinal",
                "Vehicle.Acceleration.Vertical"
            ]
        );
    }

    #[test]
    fn test_leaves_of_branch_recurse() {
        let tree = sample_tree();
        let path = VssPath::parse("Vehicle").unwrap();
        let leaves = tree.leaves(&path).unwrap();
        assert_eq!(leaves.len(), 4);
        assert_eq!(leaves[0].0.to_string(), "Vehicle.Speed");
    }

    #[test]
    fn test_leaves_of_unknown_path_is_empty() {
        let tree = sample_tree();
        let path = VssPath::parse("Vehicle.No.Such").unwrap();
        assert!(tree.leaves(&path).unwrap().is_empty());
    }

    #[test]
    fn test_metadata_chain_shape() {
        let tree = sample_tree();
        let path = VssPath::parse("Vehicle.Acceleration.Vertical").unwrap();
        let meta = tree.metadata_chain(&path);

        let vehicle = &meta["Vehicle"];
        assert_eq!(vehicle["type"], "branch");
        // Only the traversed child is present on the chain.
        let children = vehicle["children"].as_object().unwrap();
        assert_eq!(children.len(), 1);
        let vertical = &children["Acceleration"]["children"]["Vertical"];
        assert_eq!(vertical["datatype"], "Float");
    }

    #[test]
    fn test_metadata_chain_null_for_unknown() {
        let tree = sample_tree();
        let path = VssPath::parse("Vehicle.No.Such").unwrap();
        assert!(tree.metadata_chain(&path).is_null());
    }
}
