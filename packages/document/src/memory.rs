//! In-memory document tree
//!
//! Nodes live in an arena and are never freed; removing a node only detaches
//! it, so handles held by the engine stay valid and can be tested with
//! [`DocumentTree::is_attached`].

use crate::selector::Selector;
use crate::tree::{DomEvent, DocumentTree, NodeId, NodeKind};
use darkdom_parser::{parse_fragment, serialize, Attribute, Element, MarkupNode, ParseResult};
use tracing::{trace, warn};

#[derive(Debug, Clone)]
struct NodeData {
    kind: NodeKind,
    attributes: Vec<Attribute>,
    /// Content of text, comment and declaration nodes
    content: String,
    self_closing: bool,
    hidden: bool,
    parent: Option<NodeId>,
    children: Vec<NodeId>,
}

impl NodeData {
    fn new(kind: NodeKind) -> Self {
        Self {
            kind,
            attributes: Vec::new(),
            content: String::new(),
            self_closing: false,
            hidden: false,
            parent: None,
            children: Vec::new(),
        }
    }
}

/// An event recorded by [`MemoryDocument::trigger`]
#[derive(Debug, Clone, PartialEq)]
pub struct RecordedEvent {
    pub node: NodeId,
    pub event: DomEvent,
}

#[derive(Debug, Clone)]
pub struct MemoryDocument {
    nodes: Vec<NodeData>,
    root: NodeId,
    events: Vec<RecordedEvent>,
}

impl MemoryDocument {
    pub fn new() -> Self {
        Self {
            nodes: vec![NodeData::new(NodeKind::Document)],
            root: NodeId(0),
            events: Vec::new(),
        }
    }

    /// Build a document whose body is `markup`
    pub fn parse(markup: &str) -> ParseResult<Self> {
        let mut doc = Self::new();
        let root = doc.root;
        doc.append_markup(root, markup)?;
        Ok(doc)
    }

    /// Parse `markup` and append the resulting nodes to `parent`
    pub fn append_markup(&mut self, parent: NodeId, markup: &str) -> ParseResult<Vec<NodeId>> {
        let created = self.create_from_markup(markup)?;
        for &node in &created {
            self.attach(parent, None, node);
        }
        Ok(created)
    }

    pub fn events(&self) -> &[RecordedEvent] {
        &self.events
    }

    /// Nodes that received an event called `name`, in firing order
    pub fn events_named(&self, name: &str) -> Vec<NodeId> {
        self.events
            .iter()
            .filter(|e| e.event.name == name)
            .map(|e| e.node)
            .collect()
    }

    pub fn clear_events(&mut self) {
        self.events.clear();
    }

    /// Convenience for tests: first match of `selector` anywhere in the document
    pub fn query(&self, selector: &str) -> Option<NodeId> {
        self.select(None, selector).into_iter().next()
    }

    fn data(&self, node: NodeId) -> &NodeData {
        &self.nodes[node.0]
    }

    fn data_mut(&mut self, node: NodeId) -> &mut NodeData {
        &mut self.nodes[node.0]
    }

    fn alloc(&mut self, data: NodeData) -> NodeId {
        self.nodes.push(data);
        NodeId(self.nodes.len() - 1)
    }

    fn build(&mut self, node: MarkupNode) -> NodeId {
        match node {
            MarkupNode::Element(element) => {
                let mut data = NodeData::new(NodeKind::Element(element.tag));
                data.attributes = element.attributes;
                data.self_closing = element.self_closing;
                let id = self.alloc(data);
                for child in element.children {
                    let child_id = self.build(child);
                    self.attach(id, None, child_id);
                }
                id
            }
            MarkupNode::Text { content } => {
                let mut data = NodeData::new(NodeKind::Text);
                data.content = content;
                self.alloc(data)
            }
            MarkupNode::Comment { content } => {
                let mut data = NodeData::new(NodeKind::Comment);
                data.content = content;
                self.alloc(data)
            }
            MarkupNode::Declaration { content } => {
                let mut data = NodeData::new(NodeKind::Declaration);
                data.content = content;
                self.alloc(data)
            }
        }
    }

    /// Insert `node` under `parent` at `index` (or at the end)
    fn attach(&mut self, parent: NodeId, index: Option<usize>, node: NodeId) {
        self.detach(node);
        let children = &mut self.data_mut(parent).children;
        match index {
            Some(i) if i <= children.len() => children.insert(i, node),
            _ => children.push(node),
        }
        self.data_mut(node).parent = Some(parent);
    }

    fn detach(&mut self, node: NodeId) {
        if let Some(parent) = self.data_mut(node).parent.take() {
            self.data_mut(parent).children.retain(|c| *c != node);
        }
    }

    fn to_markup(&self, node: NodeId) -> MarkupNode {
        let data = self.data(node);
        match &data.kind {
            NodeKind::Element(tag) => MarkupNode::Element(Element {
                tag: tag.clone(),
                attributes: data.attributes.clone(),
                children: data.children.iter().map(|c| self.to_markup(*c)).collect(),
                self_closing: data.self_closing,
            }),
            NodeKind::Text => MarkupNode::text(data.content.clone()),
            NodeKind::Comment => MarkupNode::comment(data.content.clone()),
            NodeKind::Declaration => MarkupNode::Declaration {
                content: data.content.clone(),
            },
            NodeKind::Document => MarkupNode::text(self.inner_markup(node)),
        }
    }

    fn collect_matches(&self, node: NodeId, selector: &Selector, out: &mut Vec<NodeId>) {
        for &child in &self.data(node).children {
            if selector.matches(self, child) {
                out.push(child);
            }
            self.collect_matches(child, selector, out);
        }
    }
}

impl Default for MemoryDocument {
    fn default() -> Self {
        Self::new()
    }
}

impl DocumentTree for MemoryDocument {
    fn root(&self) -> NodeId {
        self.root
    }

    fn select(&self, context: Option<NodeId>, selector: &str) -> Vec<NodeId> {
        let parsed = match Selector::parse(selector) {
            Ok(parsed) => parsed,
            Err(e) => {
                warn!(selector, error = %e, "Ignoring invalid selector");
                return Vec::new();
            }
        };
        let mut out = Vec::new();
        self.collect_matches(context.unwrap_or(self.root), &parsed, &mut out);
        out
    }

    fn matches(&self, node: NodeId, selector: &str) -> bool {
        Selector::parse(selector)
            .map(|parsed| parsed.matches(self, node))
            .unwrap_or(false)
    }

    fn kind(&self, node: NodeId) -> NodeKind {
        self.data(node).kind.clone()
    }

    fn parent(&self, node: NodeId) -> Option<NodeId> {
        self.data(node).parent
    }

    fn children(&self, node: NodeId) -> Vec<NodeId> {
        self.data(node).children.clone()
    }

    fn attr(&self, node: NodeId, name: &str) -> Option<String> {
        self.data(node)
            .attributes
            .iter()
            .find(|a| a.name == name)
            .map(|a| a.value.clone().unwrap_or_default())
    }

    fn set_attr(&mut self, node: NodeId, name: &str, value: &str) {
        let attributes = &mut self.data_mut(node).attributes;
        match attributes.iter_mut().find(|a| a.name == name) {
            Some(existing) => existing.value = Some(value.to_string()),
            None => attributes.push(Attribute {
                name: name.to_string(),
                value: Some(value.to_string()),
            }),
        }
    }

    fn remove_attr(&mut self, node: NodeId, name: &str) {
        self.data_mut(node).attributes.retain(|a| a.name != name);
    }

    fn text(&self, node: NodeId) -> String {
        let data = self.data(node);
        match data.kind {
            NodeKind::Text => data.content.clone(),
            NodeKind::Element(_) | NodeKind::Document => data
                .children
                .iter()
                .map(|c| self.text(*c))
                .collect(),
            NodeKind::Comment | NodeKind::Declaration => String::new(),
        }
    }

    fn inner_markup(&self, node: NodeId) -> String {
        let children: Vec<MarkupNode> = self
            .data(node)
            .children
            .iter()
            .map(|c| self.to_markup(*c))
            .collect();
        serialize(&children)
    }

    fn outer_markup(&self, node: NodeId) -> String {
        serialize(&[self.to_markup(node)])
    }

    fn wrap_markup(&self, node: NodeId, inner: &str, omit: &[&str]) -> String {
        let data = self.data(node);
        match &data.kind {
            NodeKind::Element(tag) => {
                let element = Element {
                    tag: tag.clone(),
                    attributes: data
                        .attributes
                        .iter()
                        .filter(|a| !omit.contains(&a.name.as_str()))
                        .cloned()
                        .collect(),
                    children: vec![MarkupNode::text(inner)],
                    self_closing: data.self_closing && inner.is_empty(),
                };
                serialize(&[MarkupNode::Element(element)])
            }
            _ => inner.to_string(),
        }
    }

    fn is_attached(&self, node: NodeId) -> bool {
        let mut current = Some(node);
        while let Some(n) = current {
            if n == self.root {
                return true;
            }
            current = self.data(n).parent;
        }
        false
    }

    fn create_from_markup(&mut self, markup: &str) -> ParseResult<Vec<NodeId>> {
        let nodes = parse_fragment(markup)?;
        let created: Vec<NodeId> = nodes.into_iter().map(|n| self.build(n)).collect();
        trace!(count = created.len(), "Created nodes from markup");
        Ok(created)
    }

    fn insert_after(&mut self, anchor: NodeId, nodes: &[NodeId]) {
        let Some(parent) = self.data(anchor).parent else {
            return;
        };
        let mut index = self
            .data(parent)
            .children
            .iter()
            .position(|c| *c == anchor)
            .map_or(0, |i| i + 1);
        for &node in nodes {
            self.attach(parent, Some(index), node);
            index += 1;
        }
    }

    fn replace_with(&mut self, old: NodeId, nodes: &[NodeId]) {
        self.insert_after(old, nodes);
        self.detach(old);
    }

    fn hide(&mut self, node: NodeId) {
        self.data_mut(node).hidden = true;
    }

    fn is_hidden(&self, node: NodeId) -> bool {
        self.data(node).hidden
    }

    fn remove(&mut self, node: NodeId) {
        self.detach(node);
    }

    fn trigger(&mut self, node: NodeId, event: DomEvent) {
        trace!(node = %node, event = %event.name, "Event triggered");
        self.events.push(RecordedEvent { node, event });
    }
}
