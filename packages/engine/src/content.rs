//! Content scanner: turns a watched node's free-form children into content
//! text with placeholders for inline sub-components

use crate::model::ContentData;
use crate::scope::Scope;
use darkdom_document::{NodeId, NodeKind};

#[derive(Debug, Clone, Copy, Default)]
pub struct ContentScanOptions {
    /// Capture inline scripts instead of treating them as markup
    pub script_context: bool,
    /// Take the whole node, minus its identity, as one content block
    pub entire_as_content: bool,
    /// The scanning definition declares no sub-components
    pub no_components: bool,
}

/// Scan the children of `target` (or `target` itself for `entire_as_content`)
pub fn scan_contents(
    scope: &mut Scope<'_>,
    target: NodeId,
    options: &ContentScanOptions,
) -> ContentData {
    let mut data = ContentData {
        has_outer: options.entire_as_content,
        ..Default::default()
    };
    if options.entire_as_content {
        let copy = Visit {
            strip_identity: true,
            ignore_marks: true,
        };
        visit(scope, target, options, &mut data, copy);
    } else {
        for child in scope.doc.children(target) {
            visit(scope, child, options, &mut data, Visit::default());
        }
    }
    data
}

/// Treat the visited node as an identity-free copy of the watched subtree
#[derive(Debug, Clone, Copy, Default)]
struct Visit {
    /// Drop the connect attribute of this node
    strip_identity: bool,
    /// Mounted marks don't survive the copy
    ignore_marks: bool,
}

fn visit(
    scope: &mut Scope<'_>,
    node: NodeId,
    options: &ContentScanOptions,
    data: &mut ContentData,
    mode: Visit,
) {
    let tag = match scope.doc.kind(node) {
        NodeKind::Text => {
            let text = scope.doc.text(node);
            if text.chars().any(|c| !c.is_whitespace()) {
                data.text.push_str(&text);
            }
            return;
        }
        NodeKind::Element(tag) => tag,
        NodeKind::Comment | NodeKind::Declaration | NodeKind::Document => return,
    };

    let connect = scope.rt.config.connect_attr.clone();
    if options.script_context
        && tag.eq_ignore_ascii_case("script")
        && scope.doc.attr(node, "type").as_deref() == Some(scope.rt.config.script_type.as_str())
    {
        data.script.push_str(&scope.doc.inner_markup(node));
        return;
    }

    let marked = !mode.ignore_marks && scope.rt.mounted.contains(&node);

    if options.no_components
        && (!options.script_context || scope.doc.select(Some(node), "script").is_empty())
    {
        if !marked {
            data.text.push_str(&literal_markup(scope, node, &connect, mode.strip_identity));
        }
        return;
    }

    let buffered = if mode.strip_identity {
        None
    } else {
        scope
            .id_of(node)
            .and_then(|id| scope.rt.content_buffer.remove(&id).map(|model| (id, model)))
    };
    if let Some((id, model)) = buffered {
        data.text.push_str(&scope.rt.config.placeholder(&id));
        data.index.insert(id, model);
    } else if !marked {
        let mut inner = ContentData::default();
        let child_mode = Visit {
            strip_identity: false,
            ignore_marks: mode.ignore_marks,
        };
        for child in scope.doc.children(node) {
            visit(scope, child, &ContentScanOptions::default(), &mut inner, child_mode);
        }
        let stripped = [connect.as_str()];
        let omit: &[&str] = if mode.strip_identity { &stripped } else { &[] };
        data.text.push_str(&scope.doc.wrap_markup(node, &inner.text, omit));
        data.index.extend(inner.index);
    }
}

fn literal_markup(scope: &Scope<'_>, node: NodeId, connect: &str, strip_identity: bool) -> String {
    if strip_identity {
        let inner = scope.doc.inner_markup(node);
        scope.doc.wrap_markup(node, &inner, &[connect])
    } else {
        scope.doc.outer_markup(node)
    }
}
