//! Component definitions: state accessors, sub-components, forwarded events
//! and update handlers

use crate::config::ComponentOptions;
use crate::dispatch::{Changes, Subject, UpdateOutcome};
use crate::error::DarkResult;
use crate::guard::{Guard, GuardContext};
use crate::scope::Scope;
use crate::value::{normalize, StateValue};
use darkdom_document::{DocumentTree, NodeId};
use indexmap::{IndexMap, IndexSet};
use std::rc::Rc;

pub type StateGetterFn = Rc<dyn Fn(&dyn DocumentTree, NodeId) -> Option<StateValue>>;
pub type StateSetterFn = Rc<dyn Fn(&mut dyn DocumentTree, NodeId, &StateValue)>;

/// Handles one update subject; may return [`UpdateOutcome::Abort`] to stop the
/// remaining facet checks of the node
pub type UpdateHandler = Rc<dyn Fn(&mut Scope<'_>, &Changes) -> DarkResult<UpdateOutcome>>;

#[derive(Clone)]
pub enum StateGetter {
    Attr(String),
    Func(StateGetterFn),
}

#[derive(Clone)]
pub enum StateSetter {
    Attr(String),
    Func(StateSetterFn),
}

/// How a state is read from (and optionally written to) a watched node
#[derive(Clone)]
pub struct StateAccessor {
    getter: StateGetter,
    setter: Option<StateSetter>,
}

impl StateAccessor {
    /// Read and write the same attribute
    pub fn attr(name: impl Into<String>) -> Self {
        let name = name.into();
        Self {
            getter: StateGetter::Attr(name.clone()),
            setter: Some(StateSetter::Attr(name)),
        }
    }

    pub fn getter(
        getter: impl Fn(&dyn DocumentTree, NodeId) -> Option<StateValue> + 'static,
    ) -> Self {
        Self {
            getter: StateGetter::Func(Rc::new(getter)),
            setter: None,
        }
    }

    pub fn pair(getter: StateGetter, setter: Option<StateSetter>) -> Self {
        Self { getter, setter }
    }

    pub fn with_setter(
        mut self,
        setter: impl Fn(&mut dyn DocumentTree, NodeId, &StateValue) + 'static,
    ) -> Self {
        self.setter = Some(StateSetter::Func(Rc::new(setter)));
        self
    }

    /// Current value, `Null` when unset or falsy
    pub fn read(&self, doc: &dyn DocumentTree, node: NodeId) -> StateValue {
        let raw = match &self.getter {
            StateGetter::Attr(name) => doc.attr(node, name).map(StateValue::String),
            StateGetter::Func(getter) => getter(doc, node),
        };
        normalize(raw)
    }

    /// Returns false when the accessor is read-only
    pub fn write(&self, doc: &mut dyn DocumentTree, node: NodeId, value: &StateValue) -> bool {
        match &self.setter {
            Some(StateSetter::Attr(name)) => {
                match value {
                    StateValue::Null => doc.remove_attr(node, name),
                    StateValue::String(s) => doc.set_attr(node, name, s),
                    other => doc.set_attr(node, name, &other.to_string()),
                }
                true
            }
            Some(StateSetter::Func(setter)) => {
                setter(doc, node, value);
                true
            }
            None => false,
        }
    }
}

impl From<&str> for StateAccessor {
    fn from(name: &str) -> Self {
        StateAccessor::attr(name)
    }
}

/// Declarative description of a component.
///
/// Definitions are built once and shared behind `Rc`; every watch of a
/// definition goes through a [`Guard`] created from it.
#[derive(Clone, Default)]
pub struct ComponentDefinition {
    options: ComponentOptions,
    states: IndexMap<String, StateAccessor>,
    components: IndexMap<String, Rc<ComponentDefinition>>,
    contents: IndexSet<String>,
    forwards: IndexMap<String, String>,
    handlers: IndexMap<Subject, UpdateHandler>,
}

impl ComponentDefinition {
    pub fn new(options: ComponentOptions) -> Self {
        Self {
            options,
            ..Default::default()
        }
    }

    pub fn set(mut self, options: ComponentOptions) -> Self {
        self.options = options;
        self
    }

    pub fn state(mut self, name: impl Into<String>, accessor: impl Into<StateAccessor>) -> Self {
        self.states.insert(name.into(), accessor.into());
        self
    }

    /// Sub-component whose models are returned as named component data
    pub fn contain(mut self, name: impl Into<String>, definition: Rc<ComponentDefinition>) -> Self {
        let name = name.into();
        self.contents.shift_remove(&name);
        self.components.insert(name, definition);
        self
    }

    /// Sub-component rendered inline inside the content text
    pub fn contain_content(
        mut self,
        name: impl Into<String>,
        definition: Rc<ComponentDefinition>,
    ) -> Self {
        let name = name.into();
        self.contents.insert(name.clone());
        self.components.insert(name, definition);
        self
    }

    /// Sub-component built from the previously declared one, if any
    pub fn contain_with(
        self,
        name: impl Into<String>,
        factory: impl FnOnce(Option<&Rc<ComponentDefinition>>) -> Rc<ComponentDefinition>,
    ) -> Self {
        let name = name.into();
        let definition = factory(self.components.get(&name));
        if self.contents.contains(&name) {
            self.contain_content(name, definition)
        } else {
            self.contain(name, definition)
        }
    }

    /// Forward `"<event> <sub-selector>"` on the generated node to `subject`
    pub fn forward(mut self, spec: impl Into<String>, subject: impl Into<String>) -> Self {
        self.forwards.insert(spec.into(), subject.into());
        self
    }

    pub fn response(
        mut self,
        subject: Subject,
        handler: impl Fn(&mut Scope<'_>, &Changes) -> DarkResult<UpdateOutcome> + 'static,
    ) -> Self {
        self.handlers.insert(subject, Rc::new(handler));
        self
    }

    pub fn options(&self) -> &ComponentOptions {
        &self.options
    }

    pub fn component(&self, name: &str) -> Option<&Rc<ComponentDefinition>> {
        self.components.get(name)
    }

    pub fn components(&self) -> impl Iterator<Item = (&String, &Rc<ComponentDefinition>)> {
        self.components.iter()
    }

    pub fn is_content(&self, name: &str) -> bool {
        self.contents.contains(name)
    }

    pub fn states(&self) -> &IndexMap<String, StateAccessor> {
        &self.states
    }

    pub fn forwards(&self) -> &IndexMap<String, String> {
        &self.forwards
    }

    pub fn handlers(&self) -> &IndexMap<Subject, UpdateHandler> {
        &self.handlers
    }

    /// A top-level guard with no context node
    pub fn create_guard(self: &Rc<Self>) -> Rc<Guard> {
        Guard::new(self.clone(), GuardContext::default())
    }
}
