use darkdom_parser::ParseResult;
use std::fmt;

/// Handle to a node owned by a [`DocumentTree`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId(pub(crate) usize);

impl NodeId {
    pub fn index(self) -> usize {
        self.0
    }
}

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "node#{}", self.0)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NodeKind {
    Document,
    Element(String),
    Text,
    Comment,
    Declaration,
}

impl NodeKind {
    pub fn is_element(&self) -> bool {
        matches!(self, NodeKind::Element(_))
    }

    pub fn tag(&self) -> Option<&str> {
        match self {
            NodeKind::Element(tag) => Some(tag),
            _ => None,
        }
    }
}

/// A named event fired on a node
#[derive(Debug, Clone, PartialEq)]
pub struct DomEvent {
    pub name: String,
    /// Node the event originated from, if any
    pub target: Option<NodeId>,
    /// Event that caused this one to be forwarded
    pub source_event: Option<Box<DomEvent>>,
}

impl DomEvent {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            target: None,
            source_event: None,
        }
    }

    pub fn with_target(mut self, target: NodeId) -> Self {
        self.target = Some(target);
        self
    }

    pub fn with_source(mut self, source: DomEvent) -> Self {
        self.source_event = Some(Box::new(source));
        self
    }
}

/// Query and mutation primitives the engine needs from a document tree.
///
/// Selectors passed to [`select`](Self::select) and [`matches`](Self::matches)
/// use the CSS subset implemented by [`crate::Selector`]; implementations
/// return no matches for selectors they cannot parse.
pub trait DocumentTree {
    fn root(&self) -> NodeId;

    /// Descendants of `context` (or of the root) matching `selector`, in document order
    fn select(&self, context: Option<NodeId>, selector: &str) -> Vec<NodeId>;

    fn matches(&self, node: NodeId, selector: &str) -> bool;

    fn kind(&self, node: NodeId) -> NodeKind;

    fn parent(&self, node: NodeId) -> Option<NodeId>;

    fn children(&self, node: NodeId) -> Vec<NodeId>;

    fn attr(&self, node: NodeId, name: &str) -> Option<String>;

    fn set_attr(&mut self, node: NodeId, name: &str, value: &str);

    fn remove_attr(&mut self, node: NodeId, name: &str);

    /// Text content (for text nodes, the text itself)
    fn text(&self, node: NodeId) -> String;

    fn inner_markup(&self, node: NodeId) -> String;

    fn outer_markup(&self, node: NodeId) -> String;

    /// Outer markup of `node` with `inner` as its body and without the `omit` attributes
    fn wrap_markup(&self, node: NodeId, inner: &str, omit: &[&str]) -> String;

    /// Is the node reachable from the document root?
    fn is_attached(&self, node: NodeId) -> bool;

    /// Build detached nodes from markup; text-only markup yields a text node
    fn create_from_markup(&mut self, markup: &str) -> ParseResult<Vec<NodeId>>;

    fn insert_after(&mut self, anchor: NodeId, nodes: &[NodeId]);

    fn replace_with(&mut self, old: NodeId, nodes: &[NodeId]);

    fn hide(&mut self, node: NodeId);

    fn is_hidden(&self, node: NodeId) -> bool;

    /// Detach the node (and its subtree) from its parent
    fn remove(&mut self, node: NodeId);

    fn trigger(&mut self, node: NodeId, event: DomEvent);

    /// Ancestors from the parent upwards, excluding the document node
    fn ancestors(&self, node: NodeId) -> Vec<NodeId> {
        let mut out = Vec::new();
        let mut current = self.parent(node);
        while let Some(parent) = current {
            if self.kind(parent) == NodeKind::Document {
                break;
            }
            out.push(parent);
            current = self.parent(parent);
        }
        out
    }

    /// First node anywhere in the document whose attribute `name` equals `value`
    fn find_by_attr(&self, name: &str, value: &str) -> Option<NodeId> {
        self.select(None, &format!("[{}=\"{}\"]", name, value))
            .into_iter()
            .next()
    }
}
