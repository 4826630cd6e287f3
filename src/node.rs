//! The markup tree consumed by the renderer.
//!
//! Nodes are plain immutable values. Decorations (`attribute`, `style`) wrap
//! the receiver in a new node instead of copying attribute or style lists, so
//! a chain of `n` decoration calls costs `O(n)` to build. The renderer
//! flattens the chain once when it reaches it.

use std::fmt;

use serde::de::{MapAccess, Visitor};
use serde::ser::SerializeMap;
use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::style::StyleEntry;

/// Insertion-ordered attribute list.
///
/// Setting an existing name replaces the value in place, so the attribute
/// keeps the position it was first written at. `class` is special-cased by
/// [`AttributeMap::merge`], which concatenates class lists instead of
/// replacing them.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AttributeMap {
    entries: Vec<(String, String)>,
}

impl AttributeMap {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn get(&self, name: &str) -> Option<&str> {
        self.entries
            .iter()
            .find(|(n, _)| n == name)
            .map(|(_, v)| v.as_str())
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.entries.iter().map(|(n, v)| (n.as_str(), v.as_str()))
    }

    /// Set `name`, replacing any previous value.
    pub fn set(&mut self, name: impl Into<String>, value: impl Into<String>) {
        let name = name.into();
        let value = value.into();
        match self.entries.iter_mut().find(|(n, _)| *n == name) {
            Some(slot) => slot.1 = value,
            None => self.entries.push((name, value)),
        }
    }

    /// Append space-separated class names, skipping ones already present.
    pub fn append_classes(&mut self, classes: &str) {
        let Some(slot) = self.entries.iter_mut().find(|(n, _)| n == "class") else {
            let deduped = dedup_classes("", classes);
            if !deduped.is_empty() {
                self.entries.push(("class".to_string(), deduped));
            }
            return;
        };
        let merged = dedup_classes(&slot.1, classes);
        slot.1 = merged;
    }

    /// Layer `other` on top of `self`: values from `other` win, except
    /// `class`, whose names are appended.
    pub fn merge(&mut self, other: &AttributeMap) {
        for (name, value) in &other.entries {
            if name == "class" {
                self.append_classes(value);
            } else {
                self.set(name.as_str(), value.as_str());
            }
        }
    }
}

fn dedup_classes(existing: &str, extra: &str) -> String {
    let mut out = String::with_capacity(existing.len() + extra.len() + 1);
    let classes = existing.split_ascii_whitespace();
    for class in classes.chain(extra.split_ascii_whitespace()) {
        if out.split(' ').any(|c| c == class) {
            continue;
        }
        if !out.is_empty() {
            out.push(' ');
        }
        out.push_str(class);
    }
    out
}

impl<K: Into<String>, V: Into<String>> FromIterator<(K, V)> for AttributeMap {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        let mut map = AttributeMap::new();
        for (k, v) in iter {
            map.set(k, v);
        }
        map
    }
}

impl Serialize for AttributeMap {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.entries.len()))?;
        for (name, value) in &self.entries {
            map.serialize_entry(name, value)?;
        }
        map.end()
    }
}

struct AttributeMapVisitor;

impl<'de> Visitor<'de> for AttributeMapVisitor {
    type Value = AttributeMap;

    fn expecting(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str("a map of attribute names to string values")
    }

    fn visit_map<A: MapAccess<'de>>(self, mut access: A) -> Result<AttributeMap, A::Error> {
        let mut map = AttributeMap::new();
        while let Some((name, value)) = access.next_entry::<String, String>()? {
            map.set(name, value);
        }
        Ok(map)
    }
}

impl<'de> Deserialize<'de> for AttributeMap {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        deserializer.deserialize_map(AttributeMapVisitor)
    }
}

/// An HTML element with its own attributes and at most one child node
/// (use [`Node::Array`] or [`Node::Tuple`] for several children).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Element {
    pub tag: String,
    #[serde(default, skip_serializing_if = "AttributeMap::is_empty")]
    pub attributes: AttributeMap,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub child: Option<Box<Node>>,
}

impl Element {
    pub fn new(tag: impl Into<String>) -> Self {
        Self {
            tag: tag.into(),
            attributes: AttributeMap::new(),
            child: None,
        }
    }

    pub fn with_attribute(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.attributes.set(name, value);
        self
    }

    pub fn with_child(mut self, child: impl Into<Node>) -> Self {
        self.child = Some(Box::new(child.into()));
        self
    }
}

/// One of two alternative subtrees; exactly one is rendered.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Conditional {
    First(Box<Node>),
    Second(Box<Node>),
}

/// A node of the markup tree.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Node {
    Element(Element),
    /// Text content, escaped on output
    Text(String),
    /// Bytes written verbatim; the caller is responsible for their safety
    Raw(#[serde(with = "raw_bytes")] Vec<u8>),
    /// Attributes applied to the first element(s) inside `inner`
    Attributes {
        inner: Box<Node>,
        attributes: AttributeMap,
    },
    /// Style entries turned into classes on the element(s) inside `inner`
    Styled {
        inner: Box<Node>,
        styles: Vec<StyleEntry>,
    },
    Array(Vec<Node>),
    /// Fixed group of siblings; attributes never leak between members
    Tuple(Vec<Node>),
    Conditional(Conditional),
    Empty,
}

impl Node {
    /// `<tag>child</tag>`
    pub fn element(tag: impl Into<String>, child: impl Into<Node>) -> Node {
        Node::Element(Element::new(tag).with_child(child))
    }

    /// An element with no content, e.g. `<br>` or `<div></div>`.
    pub fn void(tag: impl Into<String>) -> Node {
        Node::Element(Element::new(tag))
    }

    pub fn text(text: impl Into<String>) -> Node {
        Node::Text(text.into())
    }

    pub fn raw(bytes: impl Into<Vec<u8>>) -> Node {
        Node::Raw(bytes.into())
    }

    pub fn array(items: impl IntoIterator<Item = Node>) -> Node {
        Node::Array(items.into_iter().collect())
    }

    pub fn tuple(items: impl IntoIterator<Item = Node>) -> Node {
        Node::Tuple(items.into_iter().collect())
    }

    pub fn first(node: impl Into<Node>) -> Node {
        Node::Conditional(Conditional::First(Box::new(node.into())))
    }

    pub fn second(node: impl Into<Node>) -> Node {
        Node::Conditional(Conditional::Second(Box::new(node.into())))
    }

    /// `then` when `condition` holds, `otherwise` when it doesn't.
    pub fn either(condition: bool, then: impl Into<Node>, otherwise: impl Into<Node>) -> Node {
        if condition {
            Node::first(then)
        } else {
            Node::second(otherwise)
        }
    }

    pub fn optional(node: Option<Node>) -> Node {
        node.unwrap_or(Node::Empty)
    }

    pub fn attribute(self, name: impl Into<String>, value: impl Into<String>) -> Node {
        let mut attributes = AttributeMap::new();
        attributes.set(name, value);
        self.attributes(attributes)
    }

    pub fn attributes(self, attributes: AttributeMap) -> Node {
        Node::Attributes {
            inner: Box::new(self),
            attributes,
        }
    }

    pub fn style(self, entry: StyleEntry) -> Node {
        self.styles([entry])
    }

    pub fn styles(self, entries: impl IntoIterator<Item = StyleEntry>) -> Node {
        Node::Styled {
            inner: Box::new(self),
            styles: entries.into_iter().collect(),
        }
    }

    pub fn is_empty(&self) -> bool {
        matches!(self, Node::Empty)
    }
}

impl Default for Node {
    fn default() -> Self {
        Node::Empty
    }
}

impl From<Element> for Node {
    fn from(element: Element) -> Self {
        Node::Element(element)
    }
}

impl From<&str> for Node {
    fn from(text: &str) -> Self {
        Node::Text(text.to_string())
    }
}

impl From<String> for Node {
    fn from(text: String) -> Self {
        Node::Text(text)
    }
}

impl From<Vec<Node>> for Node {
    fn from(items: Vec<Node>) -> Self {
        Node::Array(items)
    }
}

impl<T: Into<Node>> From<Option<T>> for Node {
    fn from(node: Option<T>) -> Self {
        node.map_or(Node::Empty, Into::into)
    }
}

macro_rules! tuple_into_node {
    ($($name:ident),+) => {
        impl<$($name: Into<Node>),+> From<($($name,)+)> for Node {
            #[allow(non_snake_case)]
            fn from(($($name,)+): ($($name,)+)) -> Self {
                Node::Tuple(vec![$($name.into()),+])
            }
        }
    };
}

tuple_into_node!(A, B);
tuple_into_node!(A, B, C);
tuple_into_node!(A, B, C, D);
tuple_into_node!(A, B, C, D, E);
tuple_into_node!(A, B, C, D, E, F);

/// `Raw` bytes travel as a string in serialized trees.
mod raw_bytes {
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(bytes: &[u8], serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&String::from_utf8_lossy(bytes))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Vec<u8>, D::Error> {
        String::deserialize(deserializer).map(String::into_bytes)
    }
}
