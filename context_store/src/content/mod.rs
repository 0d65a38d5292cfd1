//! Content - a context node holding one message and linking to its history.
//!
//! A node has:
//! - **Root value**: the primary payload (read with [`Content::value`])
//! - **Properties**: a tree of named values addressed by dot paths
//! - **Predecessor**: an optional, immutable link to the previous turn
//!
//! Reading a property that is not held locally falls back to the predecessor
//! chain, and so do the root value, role and name. Writing never touches the
//! predecessor.

mod role;

pub use role::*;

use serde::de::DeserializeOwned;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::sync::Arc;

use crate::error::ContentError;
use crate::value::{self, split_path, Map, Value};

/// Key under which the root value appears in paths and serialized form.
pub const VALUE_KEY: &str = "value";
/// Key holding the node's [`Role`].
pub const ROLE_KEY: &str = "role";
/// Key holding the node's name (for example a function-call name).
pub const NAME_KEY: &str = "name";
/// Key under which the predecessor appears in paths and serialized form.
pub const PREDECESSOR_KEY: &str = "predecessor";
/// Deepest predecessor nesting the canonical JSON form holds.
pub const MAX_JSON_DEPTH: usize = 64;

/// A context node.
///
/// Every read falls back to the predecessor chain when the node holds nothing
/// itself; the `own_*` accessors read the node alone.
#[derive(Clone, Default)]
pub struct Content {
    value: Option<Value>,
    properties: Map,
    predecessor: Option<Arc<Content>>,
}

impl Content {
    /// Create an empty node.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a node with the given root value.
    pub fn from_value(value: impl Into<Value>) -> Self {
        let mut content = Self::new();
        content.set(value);
        content
    }

    /// The root value of the nearest node in the chain that holds one.
    pub fn value(&self) -> Option<&Value> {
        self.ancestors().find_map(|node| node.value.as_ref())
    }

    /// The root value held by this node itself.
    pub fn own_value(&self) -> Option<&Value> {
        self.value.as_ref()
    }

    /// Set the root value.
    ///
    /// Strings holding a JSON object are stored as a mapping. `Null` clears
    /// the root value.
    pub fn set(&mut self, value: impl Into<Value>) -> &mut Self {
        self.replace_value(value.into());
        self
    }

    /// Builder form of [`Content::set`].
    pub fn with_value(mut self, value: impl Into<Value>) -> Self {
        self.set(value);
        self
    }

    /// Set the root value and return the previous one.
    pub fn replace_value(&mut self, value: Value) -> Option<Value> {
        let value = value.structuralize();
        let new = (!value.is_null()).then_some(value);
        std::mem::replace(&mut self.value, new)
    }

    /// Remove and return the root value.
    pub fn take_value(&mut self) -> Option<Value> {
        self.value.take()
    }

    /// The root value as display text: strings verbatim, structured data as
    /// JSON, nothing as the empty string.
    pub fn string_value(&self) -> String {
        self.value().map(ToString::to_string).unwrap_or_default()
    }

    /// Write a value at a dot path (builder form).
    pub fn with(mut self, path: &str, value: impl Into<Value>) -> Self {
        self.set_property(path, value);
        self
    }

    /// Write a value at a dot path.
    ///
    /// `"value"` (or the empty path) addresses the root value. Writing a
    /// content node at `"predecessor"` links it, `Null` unlinks; any other
    /// write under `"predecessor"` is ignored since predecessors are read-only.
    pub fn set_property(&mut self, path: &str, value: impl Into<Value>) -> &mut Self {
        let value = value.into().structuralize();
        if path.is_empty() {
            self.replace_value(value);
            return self;
        }

        match split_path(path) {
            (VALUE_KEY, None) => {
                self.replace_value(value);
            }
            (VALUE_KEY, Some(rest)) => {
                let root = self.value.get_or_insert_with(Value::default);
                value::insert_below(root, rest, value);
            }
            (PREDECESSOR_KEY, None) => match value {
                Value::Content(predecessor) => self.predecessor = Some(Arc::new(*predecessor)),
                Value::Null => self.predecessor = None,
                _ => {}
            },
            (PREDECESSOR_KEY, Some(_)) => {}
            _ => value::insert(&mut self.properties, path, value),
        }
        self
    }

    /// Read the value at a dot path, falling back to the predecessor chain.
    ///
    /// `"value.…"` reads below the root value and `"predecessor.…"` reads
    /// from the predecessor explicitly.
    pub fn property(&self, path: &str) -> Option<&Value> {
        if path.is_empty() {
            return self.value();
        }
        match split_path(path) {
            (VALUE_KEY, None) => self.value(),
            (VALUE_KEY, Some(rest)) => self.value()?.get_path(rest),
            (PREDECESSOR_KEY, rest) => self.predecessor()?.property(rest?),
            _ => self
                .ancestors()
                .find_map(|node| value::lookup(&node.properties, path)),
        }
    }

    /// Read the value at a dot path held by this node only.
    pub fn own_property(&self, path: &str) -> Option<&Value> {
        if path.is_empty() {
            return self.own_value();
        }
        match split_path(path) {
            (VALUE_KEY, None) => self.own_value(),
            (VALUE_KEY, Some(rest)) => self.own_value()?.get_path(rest),
            (PREDECESSOR_KEY, _) => self.property(path),
            _ => value::lookup(&self.properties, path),
        }
    }

    /// Whether a non-null value is reachable at the path.
    pub fn has_property(&self, path: &str) -> bool {
        self.property(path).is_some_and(|v| !v.is_null())
    }

    /// Read and convert the value at a path.
    ///
    /// Returns `Ok(None)` when nothing is stored there and an error when the
    /// stored value has the wrong shape.
    pub fn property_as<T: DeserializeOwned>(&self, path: &str) -> Result<Option<T>, ContentError> {
        self.property(path)
            .map(|value| {
                value.deserialize_into().map_err(|source| ContentError::Conversion {
                    path: path.to_string(),
                    source,
                })
            })
            .transpose()
    }

    /// Remove and return the locally held value at a path.
    pub fn remove_property(&mut self, path: &str) -> Option<Value> {
        match split_path(path) {
            (VALUE_KEY, None) | ("", None) => self.take_value(),
            (VALUE_KEY, Some(rest)) => match self.value.as_mut()? {
                Value::Object(map) => value::remove(map, rest),
                Value::Content(content) => content.remove_property(rest),
                _ => None,
            },
            (PREDECESSOR_KEY, _) => None,
            _ => value::remove(&mut self.properties, path),
        }
    }

    /// The role of the nearest node in the chain that has one;
    /// [`Role::Empty`] when none does or the role is unrecognized.
    pub fn role(&self) -> Role {
        parse_role(self.property(ROLE_KEY))
    }

    /// The role held by this node itself.
    pub fn own_role(&self) -> Role {
        parse_role(self.properties.get(ROLE_KEY))
    }

    /// Set the node's role. [`Role::Empty`] removes it, so the inherited
    /// role shows again.
    pub fn set_role(&mut self, role: Role) -> &mut Self {
        if role.is_empty() {
            self.properties.remove(ROLE_KEY);
        } else {
            self.properties
                .insert(ROLE_KEY.to_string(), Value::from(role.as_str()));
        }
        self
    }

    /// Builder form of [`Content::set_role`].
    pub fn with_role(mut self, role: Role) -> Self {
        self.set_role(role);
        self
    }

    /// The name of the nearest node in the chain that has one.
    pub fn name(&self) -> Option<&str> {
        self.property(NAME_KEY).and_then(Value::as_str)
    }

    /// The name held by this node itself.
    pub fn own_name(&self) -> Option<&str> {
        self.properties.get(NAME_KEY).and_then(Value::as_str)
    }

    /// Set the node's name.
    pub fn set_name(&mut self, name: impl Into<String>) -> &mut Self {
        self.properties
            .insert(NAME_KEY.to_string(), Value::String(name.into()));
        self
    }

    /// Builder form of [`Content::set_name`].
    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.set_name(name);
        self
    }

    /// The previous turn, if any.
    pub fn predecessor(&self) -> Option<&Content> {
        self.predecessor.as_deref()
    }

    /// The shared handle to the previous turn, for linking it elsewhere
    /// without copying.
    pub fn shared_predecessor(&self) -> Option<&Arc<Content>> {
        self.predecessor.as_ref()
    }

    /// Link a finished node as this node's predecessor.
    ///
    /// The predecessor is frozen behind an [`Arc`]; it can be shared with
    /// other nodes but never changed through them, so the chain stays acyclic.
    pub fn set_predecessor(&mut self, predecessor: impl Into<Arc<Content>>) -> &mut Self {
        self.predecessor = Some(predecessor.into());
        self
    }

    /// Builder form of [`Content::set_predecessor`].
    pub fn with_predecessor(mut self, predecessor: impl Into<Arc<Content>>) -> Self {
        self.set_predecessor(predecessor);
        self
    }

    /// Unlink and return the predecessor.
    pub fn take_predecessor(&mut self) -> Option<Arc<Content>> {
        self.predecessor.take()
    }

    /// Iterate over this node and its predecessors, newest first.
    pub fn ancestors(&self) -> Ancestors<'_> {
        Ancestors { next: Some(self) }
    }

    /// The conversation ending at this node, oldest first.
    pub fn history(&self) -> Vec<&Content> {
        let mut turns: Vec<_> = self.ancestors().collect();
        turns.reverse();
        turns
    }

    /// Number of nodes in the chain ending at this node.
    pub fn depth(&self) -> usize {
        self.ancestors().count()
    }

    /// Canonical JSON form of the node, including reserved keys and the
    /// predecessor chain.
    ///
    /// Only the newest [`MAX_JSON_DEPTH`] nodes of the chain are included;
    /// [`Content::to_json`] rejects longer chains instead.
    pub fn to_json_value(&self) -> serde_json::Value {
        let nodes: Vec<&Content> = self.ancestors().take(MAX_JSON_DEPTH).collect();

        let mut json = None;
        for node in nodes.into_iter().rev() {
            let mut object = node.local_json();
            if let Some(predecessor) = json.take() {
                object.insert(PREDECESSOR_KEY.to_string(), predecessor);
            }
            json = Some(serde_json::Value::Object(object));
        }
        json.unwrap_or_default()
    }

    /// Canonical JSON bytes of the whole chain.
    pub fn to_json(&self) -> Result<Vec<u8>, ContentError> {
        self.check_json_depth()?;
        Ok(serde_json::to_vec(&self.to_json_value())?)
    }

    /// Parse canonical JSON bytes back into a node chain.
    pub fn from_json(bytes: &[u8]) -> Result<Self, ContentError> {
        let json: serde_json::Value = serde_json::from_slice(bytes)?;
        Ok(Self::from_json_value(json))
    }

    /// Build a node from its canonical JSON form. Non-object JSON becomes the
    /// root value of an otherwise empty node.
    pub fn from_json_value(json: serde_json::Value) -> Self {
        let mut nodes = Vec::new();
        let mut next = Some(json);
        while let Some(json) = next.take() {
            let (node, predecessor) = Self::node_from_json(json);
            nodes.push(node);
            next = predecessor;
        }

        let mut chain: Option<Content> = None;
        for mut node in nodes.into_iter().rev() {
            if let Some(predecessor) = chain.take() {
                node.predecessor = Some(Arc::new(predecessor));
            }
            chain = Some(node);
        }
        chain.unwrap_or_default()
    }

    fn node_from_json(json: serde_json::Value) -> (Self, Option<serde_json::Value>) {
        let serde_json::Value::Object(object) = json else {
            return (Self::from_value(Value::from(json)), None);
        };

        let mut content = Self::new();
        let mut predecessor = None;
        for (key, value) in object {
            match key.as_str() {
                VALUE_KEY => content.value = Some(Value::from(value)).filter(|v| !v.is_null()),
                PREDECESSOR_KEY => predecessor = Some(value).filter(serde_json::Value::is_object),
                _ => {
                    content.properties.insert(key, Value::from(value));
                }
            }
        }
        (content, predecessor)
    }

    fn local_json(&self) -> serde_json::Map<String, serde_json::Value> {
        let mut object = serde_json::Map::new();
        if let Some(value) = &self.value {
            object.insert(VALUE_KEY.to_string(), value.to_json());
        }
        for (key, value) in &self.properties {
            object.insert(key.clone(), value.to_json());
        }
        object
    }

    fn check_json_depth(&self) -> Result<(), ContentError> {
        let depth = self.depth();
        if depth > MAX_JSON_DEPTH {
            return Err(ContentError::TooDeep {
                depth,
                max: MAX_JSON_DEPTH,
            });
        }
        Ok(())
    }

    /// The data a prompt template sees.
    ///
    /// Properties of the whole chain are merged oldest first so that newer
    /// values shadow older ones, matching [`Content::property`]. The root
    /// value is [`Content::value`]; the predecessor is included in its
    /// canonical form.
    pub fn template_data(&self) -> serde_json::Value {
        let mut merged = serde_json::Map::new();
        for node in self.history() {
            for (key, value) in &node.properties {
                merge_json(&mut merged, key, value.to_json());
            }
        }

        if let Some(value) = self.value() {
            merged.insert(VALUE_KEY.to_string(), value.to_json());
        }
        if let Some(predecessor) = &self.predecessor {
            merged.insert(PREDECESSOR_KEY.to_string(), predecessor.to_json_value());
        }
        serde_json::Value::Object(merged)
    }
}

fn parse_role(value: Option<&Value>) -> Role {
    value
        .and_then(Value::as_str)
        .and_then(|role| role.parse().ok())
        .unwrap_or_default()
}

/// Deep-merge `value` into `target[key]`; mappings merge key by key, anything
/// else replaces.
fn merge_json(target: &mut serde_json::Map<String, serde_json::Value>, key: &str, value: serde_json::Value) {
    match (target.get_mut(key), value) {
        (Some(serde_json::Value::Object(existing)), serde_json::Value::Object(incoming)) => {
            for (inner_key, inner_value) in incoming {
                merge_json(existing, &inner_key, inner_value);
            }
        }
        (_, value) => {
            target.insert(key.to_string(), value);
        }
    }
}

/// Iterator over a node and its predecessors, newest first.
pub struct Ancestors<'a> {
    next: Option<&'a Content>,
}

impl<'a> Iterator for Ancestors<'a> {
    type Item = &'a Content;

    fn next(&mut self) -> Option<Self::Item> {
        let current = self.next?;
        self.next = current.predecessor();
        Some(current)
    }
}

/// Unlinks the chain node by node; a long history would otherwise be dropped
/// recursively.
impl Drop for Content {
    fn drop(&mut self) {
        let mut next = self.predecessor.take();
        while let Some(predecessor) = next {
            next = match Arc::try_unwrap(predecessor) {
                Ok(mut content) => content.predecessor.take(),
                Err(_) => None,
            };
        }
    }
}

impl PartialEq for Content {
    fn eq(&self, other: &Self) -> bool {
        let mut left = self.ancestors();
        let mut right = other.ancestors();
        loop {
            match (left.next(), right.next()) {
                (None, None) => return true,
                (Some(a), Some(b)) => {
                    if a.value != b.value || a.properties != b.properties {
                        return false;
                    }
                    if let (Some(pa), Some(pb)) = (&a.predecessor, &b.predecessor) {
                        if Arc::ptr_eq(pa, pb) {
                            return true;
                        }
                    }
                }
                _ => return false,
            }
        }
    }
}

impl std::fmt::Debug for Content {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Content")
            .field("value", &self.value)
            .field("properties", &self.properties)
            .field("predecessors", &ChainDebug(self.predecessor()))
            .finish()
    }
}

/// Prints a predecessor chain as a flat list.
struct ChainDebug<'a>(Option<&'a Content>);

impl std::fmt::Debug for ChainDebug<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let nodes = self.0.into_iter().flat_map(Content::ancestors);
        f.debug_list()
            .entries(nodes.map(|node| (&node.value, &node.properties)))
            .finish()
    }
}

impl std::fmt::Display for Content {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self.value() {
            Some(value) => write!(f, "{}", value),
            None => Ok(()),
        }
    }
}

impl Serialize for Content {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        if let Err(err) = self.check_json_depth() {
            return Err(<S::Error as serde::ser::Error>::custom(err));
        }
        self.to_json_value().serialize(serializer)
    }
}

impl<'de> Deserialize<'de> for Content {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        serde_json::Value::deserialize(deserializer).map(Self::from_json_value)
    }
}
