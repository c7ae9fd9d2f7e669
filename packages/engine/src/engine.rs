//! Engine facade: owns the document and runtime and exposes the node-level API

use crate::config::EngineConfig;
use crate::definition::UpdateHandler;
use crate::dispatch::{Changes, Subject, UpdateOutcome};
use crate::error::DarkResult;
use crate::events;
use crate::guard::{Guard, GuardContext};
use crate::ids::IdGenerator;
use crate::merge;
use crate::model::{Model, ModelSet};
use crate::registry::Registry;
use crate::scope::{Runtime, Scope};
use crate::script::ScriptRunner;
use crate::value::StateValue;
use darkdom_document::{DocumentTree, NodeId};
use std::rc::Rc;
use tracing::{debug, instrument};

pub struct Engine<D: DocumentTree> {
    document: D,
    runtime: Runtime,
}

impl<D: DocumentTree> Engine<D> {
    pub fn new(document: D) -> DarkResult<Self> {
        Self::with_config(document, EngineConfig::default())
    }

    pub fn with_config(document: D, config: EngineConfig) -> DarkResult<Self> {
        Ok(Self {
            document,
            runtime: Runtime::new(config)?,
        })
    }

    pub fn with_id_generator(mut self, ids: impl IdGenerator + 'static) -> Self {
        self.runtime.ids = Box::new(ids);
        self
    }

    pub fn with_script_runner(mut self, runner: impl ScriptRunner + 'static) -> Self {
        self.runtime.scripts = Box::new(runner);
        self
    }

    pub fn document(&self) -> &D {
        &self.document
    }

    pub fn document_mut(&mut self) -> &mut D {
        &mut self.document
    }

    pub fn into_document(self) -> D {
        self.document
    }

    pub fn registry(&self) -> &Registry {
        &self.runtime.registry
    }

    pub fn config(&self) -> &EngineConfig {
        &self.runtime.config
    }

    pub fn scope(&mut self) -> Scope<'_> {
        Scope::new(&mut self.document, &mut self.runtime)
    }

    /// Run `f` with a scope over this engine
    pub fn with_scope<R>(&mut self, f: impl FnOnce(&mut Scope<'_>) -> R) -> R {
        let mut scope = self.scope();
        f(&mut scope)
    }

    pub fn watch(&mut self, guard: &Rc<Guard>, selector: &str) -> Vec<String> {
        guard.watch(&mut self.scope(), selector)
    }

    pub fn mount(&mut self, guard: &Rc<Guard>) -> DarkResult<()> {
        guard.mount(&mut self.scope())
    }

    pub fn unmount(&mut self, guard: &Guard) {
        guard.unmount(&mut self.scope())
    }

    pub fn update(&mut self, guard: &Guard) -> DarkResult<()> {
        guard.update(&mut self.scope())
    }

    /// Guard owning the id on `node`
    pub fn guard_of(&self, node: NodeId) -> Option<Rc<Guard>> {
        let id = self.document.attr(node, &self.runtime.config.connect_attr)?;
        self.runtime.registry.guard(&id)
    }

    pub fn id_of(&self, node: NodeId) -> Option<String> {
        self.document.attr(node, &self.runtime.config.connect_attr)
    }

    pub fn mount_node(&mut self, node: NodeId) -> DarkResult<()> {
        match self.guard_of(node) {
            Some(guard) => guard.mount_root(&mut self.scope(), node),
            None => Ok(()),
        }
    }

    pub fn unmount_node(&mut self, node: NodeId) {
        if let Some(guard) = self.guard_of(node) {
            guard.unmount_root(&mut self.scope(), node);
        }
    }

    /// Unmount and unregister `node`
    pub fn reset_node(&mut self, node: NodeId) {
        if let Some(guard) = self.guard_of(node) {
            let mut scope = self.scope();
            guard.unmount_root(&mut scope, node);
            guard.unregister_root(&mut scope, node);
        }
    }

    /// Current value of state `name` read from the watched node
    pub fn get_state(&mut self, node: NodeId, name: &str) -> Option<StateValue> {
        let guard = self.guard_of(node)?;
        let scope = self.scope();
        let accessor = guard.state_accessor(&scope, name)?;
        let value = accessor.read(&*scope.doc, node);
        (!value.is_null()).then_some(value)
    }

    /// Write state `name` on the watched node, optionally followed by a
    /// states-only refresh
    pub fn set_state(
        &mut self,
        node: NodeId,
        name: &str,
        value: StateValue,
        update: bool,
    ) -> DarkResult<()> {
        let Some(guard) = self.guard_of(node) else {
            return Ok(());
        };
        let mut scope = self.scope();
        if let Some(accessor) = guard.state_accessor(&scope, name) {
            accessor.write(&mut *scope.doc, node, &value);
        }
        if update {
            scope.update_states(node)?;
        }
        Ok(())
    }

    /// States-only refresh of `node`
    pub fn update_states(&mut self, node: NodeId) -> DarkResult<()> {
        self.scope().update_states(node)
    }

    /// Full refresh of `node` followed by a GC sweep
    pub fn update_node(&mut self, node: NodeId) -> DarkResult<()> {
        self.scope().update_node(node)
    }

    pub fn gc(&mut self) -> Vec<String> {
        self.scope().gc()
    }

    /// Register a handler for `subject` on the id of `node` only
    pub fn respond(
        &mut self,
        node: NodeId,
        subject: Subject,
        handler: impl Fn(&mut Scope<'_>, &Changes) -> DarkResult<UpdateOutcome> + 'static,
    ) {
        if let Some(id) = self.id_of(node) {
            let handler: UpdateHandler = Rc::new(handler);
            self.runtime.registry.set_handler(id, subject, handler);
        }
    }

    /// Store a source override for `node`, built by `f` from the current
    /// override or a fresh scan of the node's source selector
    #[instrument(skip(self, f))]
    pub fn feed_source(&mut self, node: NodeId, f: impl FnOnce(Model) -> Model) -> DarkResult<()> {
        let Some(id) = self.id_of(node) else {
            return Ok(());
        };
        let Some(guard) = self.guard_of(node) else {
            return Ok(());
        };
        let mut scope = self.scope();

        let current = match scope.rt.registry.source(&id).cloned() {
            Some(source) => Some(source),
            None => {
                let selector = guard
                    .state_accessor(&scope, &scope.rt.config.source_state.clone())
                    .map(|accessor| accessor.read(&*scope.doc, node))
                    .and_then(|value| value.as_str().map(String::from))
                    .unwrap_or_default();
                guard.scan_source(&mut scope, &selector)?
            }
        };

        let unique = !matches!(current, Some(ModelSet::Many(_)));
        let start = match current {
            None => Model::default(),
            Some(ModelSet::Single(model)) => model,
            Some(ModelSet::Many(models)) => {
                let mut folded = Model::default();
                for model in &models {
                    merge::merge_source_model(&scope.rt.registry, &mut folded, model, None);
                }
                folded
            }
        };

        let mut fed = f(start);
        fix_user_data(&mut scope, &mut fed, &guard);
        let fed = if unique {
            ModelSet::Single(fed)
        } else {
            ModelSet::Many(vec![fed])
        };
        scope.rt.registry.set_source(id.as_str(), fed);
        debug!(id = %id, "Stored source override");
        Ok(())
    }

    /// Bubble a named event from `target` through generated nodes and forward
    /// it to the watched side; returns whether a listener handled it
    pub fn dispatch_event(&mut self, target: NodeId, name: &str) -> bool {
        events::dispatch_event(&mut self.scope(), target, name)
    }
}

/// Give fed data ids and guards so it merges like scanned source models
fn fix_user_data(scope: &mut Scope<'_>, data: &mut Model, guard: &Rc<Guard>) {
    if data.id.is_none() {
        let id = scope.next_id();
        scope.rt.registry.set_guard(id.clone(), guard.clone());
        data.id = Some(id);
    }
    for (name, definition) in guard.definition().components() {
        if let Some(set) = data.component_data.get_mut(name) {
            for item in set.iter_mut() {
                let source_guard = Guard::new(definition.clone(), GuardContext::source());
                fix_user_data(scope, item, &source_guard);
            }
        }
    }
    let options = guard.options();
    data.content_data.has_outer = options.source_as_content || options.entire_as_content;
}
