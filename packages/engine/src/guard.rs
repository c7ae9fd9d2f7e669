//! Guards bind a definition to the watched nodes found within a context
//!
//! A guard owns its roots (watched nodes), a buffer of scanned models waiting
//! to be handed to a parent scan, local state overrides that shadow the
//! definition's, and per-instance specs telling nested guards what to watch.

use crate::config::ComponentOptions;
use crate::content::{scan_contents, ContentScanOptions};
use crate::definition::{ComponentDefinition, StateAccessor};
use crate::dispatch::{self, Changes, UpdateOutcome};
use crate::error::DarkResult;
use crate::events;
use crate::lifecycle::Lifecycle;
use crate::merge;
use crate::model::{Model, ModelSet};
use crate::render;
use crate::scope::Scope;
use crate::value::is_truthy;
use darkdom_document::{DocumentTree, DomEvent, NodeId};
use darkdom_parser::decorate_root;
use indexmap::IndexMap;
use std::cell::RefCell;
use std::collections::HashMap;
use std::rc::Rc;
use tracing::{debug, info, instrument};

pub type ConfigureFn = Rc<dyn Fn(&Rc<Guard>, &mut Scope<'_>) -> DarkResult<()>>;
pub type ForwardFn = Rc<dyn Fn(&DomEvent, &[NodeId], &mut dyn DocumentTree)>;

/// What a nested guard watches inside its parent's node
#[derive(Clone)]
pub enum WatchSpec {
    Selector(String),
    Configure(ConfigureFn),
}

impl WatchSpec {
    pub fn configure(
        configure: impl Fn(&Rc<Guard>, &mut Scope<'_>) -> DarkResult<()> + 'static,
    ) -> Self {
        WatchSpec::Configure(Rc::new(configure))
    }
}

impl From<&str> for WatchSpec {
    fn from(selector: &str) -> Self {
        WatchSpec::Selector(selector.to_string())
    }
}

/// How a forwarded subject reaches the watched side
#[derive(Clone)]
pub enum ForwardSpec {
    /// `"<event> <sub-selector>"` triggered on the watched targets
    Selector(String),
    Func(ForwardFn),
}

impl ForwardSpec {
    pub fn func(f: impl Fn(&DomEvent, &[NodeId], &mut dyn DocumentTree) + 'static) -> Self {
        ForwardSpec::Func(Rc::new(f))
    }
}

impl From<&str> for ForwardSpec {
    fn from(spec: &str) -> Self {
        ForwardSpec::Selector(spec.to_string())
    }
}

/// Where a guard was created
#[derive(Debug, Clone, Default)]
pub struct GuardContext {
    /// Id of the model being scanned when this guard was created
    pub model_id: Option<String>,
    /// Node selections are scoped to
    pub node: Option<NodeId>,
    pub is_source: bool,
}

impl GuardContext {
    pub fn source() -> Self {
        Self {
            is_source: true,
            ..Default::default()
        }
    }
}

pub struct Guard {
    definition: Rc<ComponentDefinition>,
    options: ComponentOptions,
    context: GuardContext,
    states: RefCell<IndexMap<String, StateAccessor>>,
    specs: RefCell<HashMap<String, WatchSpec>>,
    forwards: RefCell<HashMap<String, ForwardSpec>>,
    roots: RefCell<Vec<NodeId>>,
    buffer: RefCell<Vec<Model>>,
    source: Option<Rc<Guard>>,
}

impl Guard {
    pub fn new(definition: Rc<ComponentDefinition>, context: GuardContext) -> Rc<Self> {
        let options = definition.options().clone();
        let source = (options.enable_source && !context.is_source).then(|| {
            let source_options = ComponentOptions {
                enable_source: false,
                entire_as_content: options.source_as_content || options.entire_as_content,
                ..options.clone()
            };
            Rc::new(Self::build(
                definition.clone(),
                source_options,
                GuardContext::source(),
                None,
            ))
        });
        Rc::new(Self::build(definition, options, context, source))
    }

    fn build(
        definition: Rc<ComponentDefinition>,
        options: ComponentOptions,
        context: GuardContext,
        source: Option<Rc<Guard>>,
    ) -> Self {
        Self {
            definition,
            options,
            context,
            states: RefCell::new(IndexMap::new()),
            specs: RefCell::new(HashMap::new()),
            forwards: RefCell::new(HashMap::new()),
            roots: RefCell::new(Vec::new()),
            buffer: RefCell::new(Vec::new()),
            source,
        }
    }

    pub fn definition(&self) -> &Rc<ComponentDefinition> {
        &self.definition
    }

    pub fn options(&self) -> &ComponentOptions {
        &self.options
    }

    pub fn context(&self) -> &GuardContext {
        &self.context
    }

    pub fn is_source(&self) -> bool {
        self.context.is_source
    }

    /// Watched nodes, in registration order
    pub fn roots(&self) -> Vec<NodeId> {
        self.roots.borrow().clone()
    }

    /// Nested source guard, when source fallback is enabled
    pub fn source(&self) -> Option<&Rc<Guard>> {
        self.source.as_ref()
    }

    /// Override a state accessor for this guard only
    pub fn state(&self, name: impl Into<String>, accessor: impl Into<StateAccessor>) -> &Self {
        self.states.borrow_mut().insert(name.into(), accessor.into());
        self
    }

    /// Tell the nested guard for sub-component `name` what to watch
    pub fn component(&self, name: impl Into<String>, spec: impl Into<WatchSpec>) -> &Self {
        self.specs.borrow_mut().insert(name.into(), spec.into());
        self
    }

    pub fn forward(&self, subject: impl Into<String>, spec: impl Into<ForwardSpec>) -> &Self {
        self.forwards.borrow_mut().insert(subject.into(), spec.into());
        self
    }

    /// Local override, then the definition, then the engine's source state
    pub fn state_accessor(&self, scope: &Scope<'_>, name: &str) -> Option<StateAccessor> {
        if let Some(accessor) = self.states.borrow().get(name) {
            return Some(accessor.clone());
        }
        if let Some(accessor) = self.definition.states().get(name) {
            return Some(accessor.clone());
        }
        let config = scope.config();
        (name == config.source_state).then(|| StateAccessor::attr(config.source_attr.as_str()))
    }

    fn state_accessors(&self, scope: &Scope<'_>) -> IndexMap<String, StateAccessor> {
        let config = scope.config();
        let mut accessors = IndexMap::new();
        accessors.insert(
            config.source_state.clone(),
            StateAccessor::attr(config.source_attr.as_str()),
        );
        for (name, accessor) in self.definition.states() {
            accessors.insert(name.clone(), accessor.clone());
        }
        for (name, accessor) in self.states.borrow().iter() {
            accessors.insert(name.clone(), accessor.clone());
        }
        accessors
    }

    fn select_targets(&self, scope: &Scope<'_>, selector: &str) -> Vec<NodeId> {
        let mut targets = scope.doc.select(self.context.node, selector);
        if self.options.unique {
            targets.truncate(1);
        }
        targets
    }

    /// Register every match of `selector` as a root; returns their ids
    pub fn watch(self: &Rc<Self>, scope: &mut Scope<'_>, selector: &str) -> Vec<String> {
        let targets = self.select_targets(scope, selector);
        self.watch_nodes(scope, &targets)
    }

    pub fn watch_nodes(self: &Rc<Self>, scope: &mut Scope<'_>, nodes: &[NodeId]) -> Vec<String> {
        nodes
            .iter()
            .filter_map(|node| self.register_root(scope, *node))
            .collect()
    }

    /// Unregister matches of `selector`, or every root
    pub fn unwatch(&self, scope: &mut Scope<'_>, selector: Option<&str>) {
        let targets = match selector {
            Some(selector) => self.select_targets(scope, selector),
            None => self.roots(),
        };
        for node in targets {
            self.unregister_root(scope, node);
        }
    }

    pub fn register_root(self: &Rc<Self>, scope: &mut Scope<'_>, node: NodeId) -> Option<String> {
        if scope.is_generated(node) {
            return None;
        }
        let id = if self.context.is_source {
            match scope.rt.source_ids.get(&node) {
                Some(id) => id.clone(),
                None => {
                    let id = scope.next_id();
                    scope.rt.source_ids.insert(node, id.clone());
                    id
                }
            }
        } else {
            match scope.id_of(node) {
                Some(id) => id,
                None => {
                    let id = scope.next_id();
                    scope.doc.set_attr(node, &scope.rt.config.connect_attr, &id);
                    id
                }
            }
        };

        if let Some(previous) = scope.rt.registry.set_guard(id.clone(), self.clone()) {
            if !Rc::ptr_eq(&previous, self) {
                previous.forget_root(node);
            }
        }
        let mut roots = self.roots.borrow_mut();
        if !roots.contains(&node) {
            roots.push(node);
        }
        Some(id)
    }

    fn forget_root(&self, node: NodeId) {
        self.roots.borrow_mut().retain(|root| *root != node);
    }

    fn owns(&self, scope: &Scope<'_>, id: &str) -> bool {
        scope
            .rt
            .registry
            .guard(id)
            .map_or(false, |guard| std::ptr::eq(Rc::as_ptr(&guard), self))
    }

    /// Drop `node` and purge its id, if this guard owns it
    pub fn unregister_root(&self, scope: &mut Scope<'_>, node: NodeId) {
        if self.context.is_source {
            self.forget_root(node);
            return;
        }
        let Some(id) = scope.id_of(node) else {
            return;
        };
        if !self.owns(scope, &id) {
            return;
        }
        scope.doc.remove_attr(node, &scope.rt.config.connect_attr);
        scope.rt.registry.unregister(&id);
        scope.rt.mounted.remove(&node);
        scope.rt.sweep.forget(node);
        self.forget_root(node);
        debug!(id = %id, "Unregistered root");
    }

    pub fn mount(self: &Rc<Self>, scope: &mut Scope<'_>) -> DarkResult<()> {
        for node in self.roots() {
            self.mount_root(scope, node)?;
        }
        Ok(())
    }

    /// Scan, render and insert generated output after `node`, then run its scripts
    #[instrument(skip(self, scope))]
    pub fn mount_root(self: &Rc<Self>, scope: &mut Scope<'_>, node: NodeId) -> DarkResult<()> {
        if scope.is_generated(node) || scope.rt.mounted.contains(&node) {
            return Ok(());
        }
        scope.notify(Some(node), Lifecycle::WillMount);

        let mut model = self.scan_root(scope, node, false)?;
        render::render_root(scope, &mut model)?;
        let markup = self.create_root(scope, &model)?;
        let created = scope.doc.create_from_markup(&markup)?;
        scope.doc.hide(node);
        scope.doc.insert_after(node, &created);
        self.listen(scope, &model);
        scope.rt.mounted.insert(node);
        render::run_script(scope, &model)?;

        scope.notify(Some(node), Lifecycle::Rendered);
        scope.notify(Some(node), Lifecycle::Mounted);
        info!(id = ?model.id, "Mounted");
        Ok(())
    }

    pub fn unmount(&self, scope: &mut Scope<'_>) {
        for node in self.roots() {
            self.unmount_root(scope, node);
        }
    }

    /// Release nested roots, remove generated output and forget the snapshot
    pub fn unmount_root(&self, scope: &mut Scope<'_>, node: NodeId) {
        let nested_selector = format!("[{}]", scope.rt.config.connect_attr);
        for child in scope.doc.select(Some(node), &nested_selector) {
            let owner = scope
                .id_of(child)
                .and_then(|child_id| scope.rt.registry.guard(&child_id));
            if let Some(owner) = owner {
                owner.unregister_root(scope, child);
            }
        }
        if let Some(id) = scope.id_of(node) {
            if let Some(generated) = scope.generated_node(&id) {
                scope.doc.remove(generated);
                scope.rt.listeners.remove(&generated);
            }
            scope.rt.registry.remove_model(&id);
            debug!(id = %id, "Unmounted root");
        }
        scope.rt.mounted.remove(&node);
    }

    pub fn buffer(self: &Rc<Self>, scope: &mut Scope<'_>) -> DarkResult<()> {
        for node in self.roots() {
            self.buffer_root(scope, node)?;
        }
        Ok(())
    }

    /// Scan `node` into the buffer without rendering
    pub fn buffer_root(self: &Rc<Self>, scope: &mut Scope<'_>, node: NodeId) -> DarkResult<()> {
        if scope.is_generated(node) {
            return Ok(());
        }
        let model = self.scan_root(scope, node, false)?;
        self.buffer.borrow_mut().push(model);
        scope.rt.mounted.insert(node);
        Ok(())
    }

    /// Refresh every root
    pub fn update(&self, scope: &mut Scope<'_>) -> DarkResult<()> {
        for node in self.roots() {
            scope.update_node(node)?;
        }
        Ok(())
    }

    /// Release `id`: unregister the root carrying it, or purge the registry directly
    pub fn gc(&self, scope: &mut Scope<'_>, id: &str) {
        let root = self
            .roots()
            .into_iter()
            .find(|node| scope.id_of(*node).as_deref() == Some(id));
        match root {
            Some(node) => self.unregister_root(scope, node),
            None => scope.rt.registry.unregister(id),
        }
    }

    /// Build the model of `node`
    pub fn scan_root(
        self: &Rc<Self>,
        scope: &mut Scope<'_>,
        node: NodeId,
        only_states: bool,
    ) -> DarkResult<Model> {
        let is_source = self.context.is_source;
        let id = if is_source {
            self.register_root(scope, node)
        } else {
            scope.id_of(node)
        };

        let mut model = Model {
            id,
            ..Default::default()
        };
        if !is_source {
            model.context = self.context.model_id.clone();
        }
        for (name, accessor) in self.state_accessors(scope) {
            let value = accessor.read(&*scope.doc, node);
            model.state.insert(name, value);
        }
        if !only_states {
            self.scan_components(scope, &mut model, node)?;
        }

        if !is_source && self.source.is_some() {
            let source_state = &scope.rt.config.source_state;
            let wants_source = model.state.get(source_state).map_or(false, is_truthy)
                || model
                    .id
                    .as_deref()
                    .map_or(false, |id| scope.rt.registry.has_source(id));
            if wants_source {
                self.merge_source(scope, &mut model, only_states)?;
            }
        }
        Ok(model)
    }

    fn scan_components(
        self: &Rc<Self>,
        scope: &mut Scope<'_>,
        model: &mut Model,
        node: NodeId,
    ) -> DarkResult<()> {
        let mut component_data = IndexMap::new();
        for (name, definition) in self.definition.components() {
            let child = Guard::new(
                definition.clone(),
                GuardContext {
                    model_id: model.id.clone(),
                    node: Some(node),
                    is_source: self.context.is_source,
                },
            );
            let spec = self.specs.borrow().get(name).cloned();
            match spec {
                Some(WatchSpec::Selector(selector)) => {
                    child.watch(scope, &selector);
                }
                Some(WatchSpec::Configure(configure)) => configure(&child, scope)?,
                None => {}
            }
            child.buffer(scope)?;
            if self.definition.is_content(name) {
                child.buffer_content(scope);
            } else {
                component_data.insert(name.clone(), child.release_model());
            }
        }
        model.component_data = component_data;

        let options = ContentScanOptions {
            script_context: !self.options.disable_script,
            entire_as_content: self.options.entire_as_content,
            no_components: self.definition.components().next().is_none(),
        };
        model.content_data = scan_contents(scope, node, &options);
        Ok(())
    }

    fn merge_source(
        self: &Rc<Self>,
        scope: &mut Scope<'_>,
        model: &mut Model,
        only_states: bool,
    ) -> DarkResult<()> {
        let stored = model
            .id
            .as_deref()
            .and_then(|id| scope.rt.registry.source(id).cloned());
        let source = match stored {
            Some(source) => Some(source),
            None => {
                let selector = model
                    .state
                    .get(&scope.rt.config.source_state)
                    .and_then(|value| value.as_str())
                    .unwrap_or_default()
                    .to_string();
                self.scan_source(scope, &selector)?
            }
        };
        let Some(source) = source else {
            return Ok(());
        };

        let context = model.context.clone();
        if only_states {
            for item in source.iter() {
                merge::merge_source_states(model, item, context.as_deref());
            }
        } else {
            merge::merge_source(&scope.rt.registry, model, &source, context.as_deref());
        }
        Ok(())
    }

    /// Scan the subtree matched by `selector` through the source guard
    pub fn scan_source(
        &self,
        scope: &mut Scope<'_>,
        selector: &str,
    ) -> DarkResult<Option<ModelSet>> {
        let Some(source_guard) = &self.source else {
            return Ok(None);
        };
        if selector.is_empty() {
            return Ok(None);
        }
        let targets = source_guard.select_targets(scope, selector);
        source_guard.watch_nodes(scope, &targets);
        let scanned = source_guard.buffer(scope);
        let set = source_guard.release_model();
        source_guard.roots.borrow_mut().clear();
        scanned?;
        debug!(selector, count = set.len(), "Scanned source");
        Ok(Some(set))
    }

    /// Take the buffer: the first model when `unique`, else all of them
    pub fn release_model(&self) -> ModelSet {
        let models = self.buffer.take();
        if self.options.unique {
            ModelSet::Single(models.into_iter().next().unwrap_or_default())
        } else {
            ModelSet::Many(models)
        }
    }

    /// Hand buffered models to the parent's content scan
    fn buffer_content(&self, scope: &mut Scope<'_>) {
        for model in self.buffer.take() {
            if let Some(id) = model.id.clone() {
                scope.rt.content_buffer.insert(id, model);
            }
        }
    }

    pub fn render(&self, model: &Model) -> String {
        match &self.options.render {
            Some(render) => render(model),
            None => render::default_render(model),
        }
    }

    /// Render `model` and mark the output with its id and the generated marker
    pub fn create_root(&self, scope: &Scope<'_>, model: &Model) -> DarkResult<String> {
        let markup = self.render(model);
        let generated = scope.rt.config.generated_attr.as_str();
        let decorated = match model.id.as_deref() {
            Some(id) => decorate_root(&markup, &[(generated, "true"), ("id", id)])?,
            None => decorate_root(&markup, &[(generated, "true")])?,
        };
        Ok(decorated)
    }

    /// Wire event forwarding on the generated nodes of `model` and its children
    pub fn listen(&self, scope: &mut Scope<'_>, model: &Model) {
        if let Some(generated) = model.id.as_deref().and_then(|id| scope.generated_node(id)) {
            events::register_events(scope, generated);
        }
        for set in model.component_data.values() {
            for child in set.iter() {
                self.listen(scope, child);
            }
        }
        for child in model.content_data.index.values() {
            self.listen(scope, child);
        }
    }

    /// Forward `subject` to the watched `targets`
    pub fn trigger_event(
        &self,
        scope: &mut Scope<'_>,
        targets: &[NodeId],
        subject: &str,
        event: &DomEvent,
    ) {
        let spec = self.forwards.borrow().get(subject).cloned();
        match spec {
            None => {}
            Some(ForwardSpec::Func(forward)) => forward(event, targets, &mut *scope.doc),
            Some(ForwardSpec::Selector(spec)) => {
                let (name, sub_selector) =
                    events::split_event_spec(&scope.rt.event_spec, &spec);
                let targets: Vec<NodeId> = if sub_selector.is_empty() {
                    targets.to_vec()
                } else {
                    targets
                        .iter()
                        .flat_map(|target| scope.doc.select(Some(*target), sub_selector))
                        .collect()
                };
                for target in targets {
                    let forwarded = DomEvent::new(name)
                        .with_target(target)
                        .with_source(event.clone());
                    scope.doc.trigger(target, forwarded);
                }
            }
        }
    }

    /// Dispatch `changes` through the resolved handler
    pub fn trigger_update(
        &self,
        scope: &mut Scope<'_>,
        changes: &Changes,
    ) -> DarkResult<UpdateOutcome> {
        let subject = changes.subject();
        match dispatch::resolve_handler(scope, self, &changes.root_id, &subject) {
            Some(handler) => handler(scope, changes),
            None => dispatch::default_update(scope, self, changes),
        }
    }
}
