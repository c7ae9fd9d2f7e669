//! Event forwarding from generated nodes back to watched nodes

use crate::scope::Scope;
use darkdom_document::{DomEvent, NodeId};
use regex::Regex;
use tracing::debug;

/// A forwarding rule installed on a generated node
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Listener {
    pub event: String,
    /// Selector the event target must match; empty matches anything
    pub sub_selector: String,
    pub subject: String,
    pub root_id: String,
}

/// Event name, then the optional sub-selector
pub(crate) const EVENT_SPEC_PATTERN: &str = r"(\S+)\s*(.*)";

/// Split `"click .btn"` into the event name and the sub-selector
pub fn split_event_spec<'s>(pattern: &Regex, spec: &'s str) -> (&'s str, &'s str) {
    match pattern.captures(spec) {
        Some(caps) => {
            let name = caps.get(1).map_or("", |m| m.as_str());
            let selector = caps.get(2).map_or("", |m| m.as_str().trim_end());
            (name, selector)
        }
        None => ("", ""),
    }
}

/// Install the definition's forwards of the guard owning `generated`'s id
pub fn register_events(scope: &mut Scope<'_>, generated: NodeId) {
    let Some(id) = scope.doc.attr(generated, "id") else {
        return;
    };
    let Some(guard) = scope.rt.registry.guard(&id) else {
        return;
    };
    let listeners: Vec<Listener> = guard
        .definition()
        .forwards()
        .iter()
        .map(|(spec, subject)| {
            let (event, sub_selector) = split_event_spec(&scope.rt.event_spec, spec);
            Listener {
                event: event.to_string(),
                sub_selector: sub_selector.to_string(),
                subject: subject.clone(),
                root_id: id.clone(),
            }
        })
        .collect();
    if listeners.is_empty() {
        scope.rt.listeners.remove(&generated);
    } else {
        scope.rt.listeners.insert(generated, listeners);
    }
}

/// Bubble `name` from `target` up to the first generated node with a matching
/// listener and forward it; returns whether any listener handled it
pub fn dispatch_event(scope: &mut Scope<'_>, target: NodeId, name: &str) -> bool {
    let event = DomEvent::new(name).with_target(target);
    let mut current = Some(target);
    while let Some(node) = current {
        let matched = scope.rt.listeners.get(&node).and_then(|listeners| {
            listeners
                .iter()
                .find(|listener| {
                    listener.event == name
                        && (listener.sub_selector.is_empty()
                            || scope.doc.matches(target, &listener.sub_selector))
                })
                .cloned()
        });
        if let Some(listener) = matched {
            forward(scope, &listener, &event);
            return true;
        }
        current = scope.doc.parent(node);
    }
    false
}

fn forward(scope: &mut Scope<'_>, listener: &Listener, event: &DomEvent) {
    let Some(guard) = scope.rt.registry.guard(&listener.root_id) else {
        return;
    };
    let targets = match scope.watched_node(&listener.root_id) {
        Some(watched) => vec![watched],
        None => {
            let mut roots = guard.roots();
            roots.dedup();
            roots
        }
    };
    debug!(
        id = %listener.root_id,
        subject = %listener.subject,
        event = %event.name,
        "Forwarding event"
    );
    guard.trigger_event(scope, &targets, &listener.subject, event);
}
