//! Runtime state shared by every guard, and the borrowed view passed through
//! scans, renders and handlers

use crate::config::EngineConfig;
use crate::dispatch::{self, Changes, UpdateOutcome};
use crate::error::DarkResult;
use crate::events::{Listener, EVENT_SPEC_PATTERN};
use crate::ids::{IdGenerator, SequentialIds};
use crate::lifecycle::Lifecycle;
use crate::model::Model;
use crate::registry::Registry;
use crate::render;
use crate::script::{LogScriptRunner, ScriptRunner};
use crate::update;
use darkdom_document::{DocumentTree, DomEvent, NodeId};
use regex::Regex;
use std::collections::{HashMap, HashSet};

/// Everything an engine owns besides the document
pub struct Runtime {
    pub(crate) config: EngineConfig,
    pub(crate) registry: Registry,
    pub(crate) ids: Box<dyn IdGenerator>,
    pub(crate) scripts: Box<dyn ScriptRunner>,
    pub(crate) placeholder: Regex,
    pub(crate) event_spec: Regex,
    /// Models deposited by content-flagged guards for the parent's content scan
    pub(crate) content_buffer: HashMap<String, Model>,
    /// Watched nodes that have been scanned into a parent model or mounted
    pub(crate) mounted: HashSet<NodeId>,
    /// Ids of nodes scanned by source guards
    pub(crate) source_ids: HashMap<NodeId, String>,
    pub(crate) listeners: HashMap<NodeId, Vec<Listener>>,
    pub(crate) sweep: SweepFence,
}

impl Runtime {
    pub fn new(config: EngineConfig) -> DarkResult<Self> {
        let placeholder = Regex::new(&config.placeholder_pattern())?;
        let event_spec = Regex::new(EVENT_SPEC_PATTERN)?;
        let ids = SequentialIds::new(config.id_prefix.clone());
        Ok(Self {
            config,
            registry: Registry::new(),
            ids: Box::new(ids),
            scripts: Box::new(LogScriptRunner),
            placeholder,
            event_spec,
            content_buffer: HashMap::new(),
            mounted: HashSet::new(),
            source_ids: HashMap::new(),
            listeners: HashMap::new(),
            sweep: SweepFence::default(),
        })
    }
}

/// Suppresses re-processing a node touched twice within one update sweep
#[derive(Debug, Default)]
pub(crate) struct SweepFence {
    generation: u64,
    depth: usize,
    last_seen: HashMap<NodeId, u64>,
}

impl SweepFence {
    /// Enter `node` for processing; false if it was already handled in this sweep
    pub(crate) fn enter(&mut self, node: NodeId) -> bool {
        if self.depth == 0 {
            self.generation += 1;
        } else if self.last_seen.get(&node) == Some(&self.generation) {
            return false;
        }
        self.last_seen.insert(node, self.generation);
        self.depth += 1;
        true
    }

    pub(crate) fn leave(&mut self) {
        self.depth = self.depth.saturating_sub(1);
    }

    pub(crate) fn forget(&mut self, node: NodeId) {
        self.last_seen.remove(&node);
    }

    pub(crate) fn retain(&mut self, keep: impl Fn(NodeId) -> bool) {
        self.last_seen.retain(|node, _| keep(*node));
    }

    #[cfg(test)]
    pub(crate) fn len(&self) -> usize {
        self.last_seen.len()
    }
}

/// Mutable view of the document and runtime
pub struct Scope<'a> {
    pub(crate) doc: &'a mut dyn DocumentTree,
    pub(crate) rt: &'a mut Runtime,
}

impl<'a> Scope<'a> {
    pub fn new(doc: &'a mut dyn DocumentTree, rt: &'a mut Runtime) -> Self {
        Self { doc, rt }
    }

    pub fn document(&self) -> &dyn DocumentTree {
        &*self.doc
    }

    pub fn document_mut(&mut self) -> &mut dyn DocumentTree {
        &mut *self.doc
    }

    pub fn registry(&self) -> &Registry {
        &self.rt.registry
    }

    pub fn config(&self) -> &EngineConfig {
        &self.rt.config
    }

    pub fn next_id(&mut self) -> String {
        self.rt.ids.next_id()
    }

    /// Id on a watched node
    pub fn id_of(&self, node: NodeId) -> Option<String> {
        self.doc.attr(node, &self.rt.config.connect_attr)
    }

    pub fn is_generated(&self, node: NodeId) -> bool {
        self.doc.attr(node, &self.rt.config.generated_attr).is_some()
    }

    /// Watched node carrying `id`; falls back to the owning guard's roots so
    /// detached nodes are still found
    pub fn watched_node(&self, id: &str) -> Option<NodeId> {
        let connect = &self.rt.config.connect_attr;
        self.doc.find_by_attr(connect, id).or_else(|| {
            self.rt.registry.guard(id).and_then(|guard| {
                guard
                    .roots()
                    .into_iter()
                    .find(|node| self.doc.attr(*node, connect).as_deref() == Some(id))
            })
        })
    }

    /// Attached generated node for `id`
    pub fn generated_node(&self, id: &str) -> Option<NodeId> {
        self.doc
            .select(None, &format!("[id=\"{}\"]", id))
            .into_iter()
            .find(|node| self.is_generated(*node))
    }

    pub(crate) fn notify(&mut self, node: Option<NodeId>, lifecycle: Lifecycle) {
        if let Some(node) = node {
            let name = lifecycle.event_name(&self.rt.config);
            self.doc.trigger(node, DomEvent::new(name).with_target(node));
        }
    }

    /// Apply the default re-render/remove behavior for `changes`; lets a
    /// custom handler fall through to it
    pub fn default_update(&mut self, changes: &Changes) -> DarkResult<UpdateOutcome> {
        match self.rt.registry.guard(&changes.root_id) {
            Some(guard) => dispatch::default_update(self, &guard, changes),
            None => Ok(UpdateOutcome::Continue),
        }
    }

    pub fn render_model(&mut self, model: &mut Model) -> DarkResult<String> {
        render::render_model(self, model)
    }

    /// Full refresh of a watched node followed by a GC sweep
    pub fn update_node(&mut self, node: NodeId) -> DarkResult<()> {
        update::update_target(self, node, false)?;
        update::gc(self);
        Ok(())
    }

    /// States-only refresh of a watched node
    pub fn update_states(&mut self, node: NodeId) -> DarkResult<()> {
        update::update_target(self, node, true)
    }

    pub fn gc(&mut self) -> Vec<String> {
        update::gc(self)
    }
}
