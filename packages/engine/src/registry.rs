//! Id-keyed registry of guards, snapshots, source overrides and handlers

use crate::definition::UpdateHandler;
use crate::dispatch::Subject;
use crate::guard::Guard;
use crate::model::{Model, ModelSet};
use indexmap::IndexMap;
use std::collections::{HashMap, HashSet};
use std::rc::Rc;
use tracing::trace;

pub type HandlerMap = IndexMap<Subject, UpdateHandler>;

/// The four id-keyed maps behind an engine.
///
/// An id is owned by at most one guard; [`Registry::unregister`] purges it from
/// every map at once.
#[derive(Default)]
pub struct Registry {
    guards: HashMap<String, Rc<Guard>>,
    models: HashMap<String, Model>,
    sources: HashMap<String, ModelSet>,
    handlers: HashMap<String, HandlerMap>,
}

impl Registry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn guard(&self, id: &str) -> Option<Rc<Guard>> {
        self.guards.get(id).cloned()
    }

    /// Record `guard` as the owner of `id`, returning the previous owner
    pub fn set_guard(&mut self, id: impl Into<String>, guard: Rc<Guard>) -> Option<Rc<Guard>> {
        self.guards.insert(id.into(), guard)
    }

    pub fn model(&self, id: &str) -> Option<&Model> {
        self.models.get(id)
    }

    pub fn set_model(&mut self, id: impl Into<String>, model: Model) {
        self.models.insert(id.into(), model);
    }

    pub fn remove_model(&mut self, id: &str) -> Option<Model> {
        self.models.remove(id)
    }

    pub fn source(&self, id: &str) -> Option<&ModelSet> {
        self.sources.get(id)
    }

    pub fn has_source(&self, id: &str) -> bool {
        self.sources.contains_key(id)
    }

    pub fn set_source(&mut self, id: impl Into<String>, source: ModelSet) {
        self.sources.insert(id.into(), source);
    }

    pub fn handlers(&self, id: &str) -> Option<&HandlerMap> {
        self.handlers.get(id)
    }

    pub fn set_handler(&mut self, id: impl Into<String>, subject: Subject, handler: UpdateHandler) {
        self.handlers
            .entry(id.into())
            .or_default()
            .insert(subject, handler);
    }

    /// Is any map holding an entry for `id`?
    pub fn contains(&self, id: &str) -> bool {
        self.guards.contains_key(id)
            || self.models.contains_key(id)
            || self.sources.contains_key(id)
            || self.handlers.contains_key(id)
    }

    /// Every id known to the registry, sorted
    pub fn ids(&self) -> Vec<String> {
        let mut ids: Vec<String> = self
            .guards
            .keys()
            .chain(self.models.keys())
            .chain(self.sources.keys())
            .chain(self.handlers.keys())
            .cloned()
            .collect::<HashSet<_>>()
            .into_iter()
            .collect();
        ids.sort();
        ids
    }

    /// Purge `id` from all four maps
    pub fn unregister(&mut self, id: &str) {
        trace!(id, "Unregistering id");
        self.guards.remove(id);
        self.models.remove(id);
        self.sources.remove(id);
        self.handlers.remove(id);
    }

    /// Is `model` owned by a source-only guard?
    pub fn is_source_model(&self, model: &Model) -> bool {
        model
            .id
            .as_deref()
            .and_then(|id| self.guards.get(id))
            .map_or(false, |guard| guard.is_source())
    }

    fn is_source_id(&self, id: &str) -> bool {
        self.guards.get(id).map_or(false, |guard| guard.is_source())
    }

    /// Ids a sweep should release.
    ///
    /// Marks every id satisfying `is_reachable`, then collects the unmarked
    /// ones that are not owned by a source-only guard. Nothing is mutated;
    /// callers unregister the returned ids afterwards.
    pub fn collect_garbage<F>(&self, is_reachable: F) -> Vec<String>
    where
        F: Fn(&str) -> bool,
    {
        let ids = self.ids();
        let live: HashSet<&str> = ids
            .iter()
            .map(String::as_str)
            .filter(|id| is_reachable(id))
            .collect();

        ids.iter()
            .filter(|id| !live.contains(id.as_str()))
            .filter(|id| !self.is_source_id(id))
            .cloned()
            .collect()
    }
}
