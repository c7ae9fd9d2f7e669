//! Refresh of watched nodes and garbage collection of stale ids

use crate::differ::{compare_model, compare_states};
use crate::dispatch::{trigger_update, Change};
use crate::error::DarkResult;
use crate::render;
use crate::scope::Scope;
use darkdom_document::NodeId;
use std::collections::HashSet;
use tracing::{debug, instrument};

/// Rescan `node`, diff it against its snapshot and dispatch the differences.
///
/// Nodes already refreshed earlier in the same sweep (a handler updating a
/// node that is being updated) are skipped.
#[instrument(skip(scope))]
pub fn update_target(scope: &mut Scope<'_>, node: NodeId, only_states: bool) -> DarkResult<()> {
    if !scope.rt.sweep.enter(node) {
        debug!(node = %node, "Already refreshed in this sweep");
        return Ok(());
    }
    let result = refresh(scope, node, only_states);
    scope.rt.sweep.leave();
    result
}

fn refresh(scope: &mut Scope<'_>, node: NodeId, only_states: bool) -> DarkResult<()> {
    let Some(id) = scope.id_of(node) else {
        return Ok(());
    };
    if !scope.doc.is_attached(node) {
        if !only_states {
            trigger_update(scope, Some(&id), None, Change::remove())?;
        }
        return Ok(());
    }
    let Some(guard) = scope.rt.registry.guard(&id) else {
        return Ok(());
    };
    let Some(origin) = scope.rt.registry.model(&id).cloned() else {
        return Ok(());
    };

    if only_states {
        let fresh = guard.scan_root(scope, node, true)?;
        let mut merged = origin.clone();
        for (name, value) in fresh.state {
            merged.state.insert(name, value);
        }
        compare_states(scope, &origin, &merged)?;
        scope.rt.registry.set_model(id, merged);
    } else {
        // scanned outside the guard buffer
        let mut fresh = guard.scan_root(scope, node, false)?;
        scope.rt.mounted.insert(node);
        render::render_root(scope, &mut fresh)?;
        compare_model(scope, &origin, Some(&fresh))?;
    }
    Ok(())
}

/// Mark every id with attached output or an attached watched node, then
/// release the rest through their guards; returns the released ids
#[instrument(skip(scope))]
pub fn gc(scope: &mut Scope<'_>) -> Vec<String> {
    let connect = scope.rt.config.connect_attr.clone();
    let generated_attr = scope.rt.config.generated_attr.clone();

    let mut live: HashSet<String> = HashSet::new();
    for node in scope.doc.select(None, &format!("[{}]", connect)) {
        live.extend(scope.doc.attr(node, &connect));
    }
    for node in scope.doc.select(None, &format!("[{}]", generated_attr)) {
        live.extend(scope.doc.attr(node, "id"));
    }

    let released = scope.rt.registry.collect_garbage(|id| live.contains(id));
    for id in &released {
        match scope.rt.registry.guard(id) {
            Some(guard) => guard.gc(scope, id),
            None => scope.rt.registry.unregister(id),
        }
    }

    let doc = &*scope.doc;
    let rt = &mut *scope.rt;
    let registry = &rt.registry;
    rt.listeners
        .retain(|_, listeners| listeners.iter().all(|l| registry.guard(&l.root_id).is_some()));
    rt.mounted.retain(|node| {
        doc.is_attached(*node)
            || doc
                .attr(*node, &connect)
                .map_or(false, |id| registry.contains(&id))
    });
    rt.source_ids.retain(|node, _| doc.is_attached(*node));
    rt.sweep.retain(|node| doc.is_attached(node));
    // deposits no content scan claimed
    rt.content_buffer.clear();

    if !released.is_empty() {
        debug!(count = released.len(), "Released stale ids");
    }
    released
}
