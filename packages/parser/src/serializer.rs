use crate::ast::*;

/// Serializer converts a markup AST back to markup text
///
/// Text and raw-text bodies are written exactly as stored. Attribute values are
/// always double-quoted, so a fragment written with double quotes serializes
/// back to the same bytes.
#[derive(Debug, Default)]
pub struct Serializer {
    output: String,
}

impl Serializer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn finish(self) -> String {
        self.output
    }

    pub fn write_nodes(&mut self, nodes: &[MarkupNode]) {
        for node in nodes {
            self.write_node(node);
        }
    }

    pub fn write_node(&mut self, node: &MarkupNode) {
        match node {
            MarkupNode::Element(element) => self.write_element(element),
            MarkupNode::Text { content } => self.output.push_str(content),
            MarkupNode::Comment { content } => {
                self.output.push_str("<!--");
                self.output.push_str(content);
                self.output.push_str("-->");
            }
            MarkupNode::Declaration { content } => self.output.push_str(content),
        }
    }

    pub fn write_element(&mut self, element: &Element) {
        self.write_open_tag(element);
        if element.self_closing || element.is_void() {
            return;
        }
        self.write_nodes(&element.children);
        self.write_close_tag(&element.tag);
    }

    pub fn write_open_tag(&mut self, element: &Element) {
        self.output.push('<');
        self.output.push_str(&element.tag);
        self.write_attributes(&element.attributes);
        if element.self_closing {
            self.output.push_str("/>");
        } else {
            self.output.push('>');
        }
    }

    pub fn write_attributes(&mut self, attributes: &[Attribute]) {
        for attr in attributes {
            self.output.push(' ');
            self.output.push_str(&attr.name);
            if let Some(value) = &attr.value {
                self.output.push_str("=\"");
                self.output.push_str(&escape_attr(value));
                self.output.push('"');
            }
        }
    }

    pub fn write_close_tag(&mut self, tag: &str) {
        self.output.push_str("</");
        self.output.push_str(tag);
        self.output.push('>');
    }
}

fn escape_attr(value: &str) -> String {
    value.replace('"', "&quot;")
}

/// Serialize a list of sibling nodes
pub fn serialize(nodes: &[MarkupNode]) -> String {
    let mut serializer = Serializer::new();
    serializer.write_nodes(nodes);
    serializer.finish()
}
