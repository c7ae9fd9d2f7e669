//! Update subjects, change records and handler dispatch

use crate::definition::UpdateHandler;
use crate::error::{DarkError, DarkResult};
use crate::guard::Guard;
use crate::lifecycle::Lifecycle;
use crate::model::{Model, ModelSet};
use crate::scope::Scope;
use crate::value::StateValue;
use darkdom_document::NodeId;
use indexmap::IndexMap;
use std::fmt;
use std::str::FromStr;
use tracing::{debug, trace};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum UpdateKind {
    State,
    Content,
    Component,
    Remove,
}

impl UpdateKind {
    pub fn as_str(self) -> &'static str {
        match self {
            UpdateKind::State => "state",
            UpdateKind::Content => "content",
            UpdateKind::Component => "component",
            UpdateKind::Remove => "remove",
        }
    }
}

/// Key of an update handler: `"<type>"` or `"<type>:<name>"`
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Subject {
    pub kind: UpdateKind,
    pub name: Option<String>,
}

impl Subject {
    pub fn state(name: impl Into<String>) -> Self {
        Self::named(UpdateKind::State, name)
    }

    pub fn component(name: impl Into<String>) -> Self {
        Self::named(UpdateKind::Component, name)
    }

    pub fn content() -> Self {
        Self::kind(UpdateKind::Content)
    }

    pub fn remove() -> Self {
        Self::kind(UpdateKind::Remove)
    }

    pub fn kind(kind: UpdateKind) -> Self {
        Self { kind, name: None }
    }

    pub fn named(kind: UpdateKind, name: impl Into<String>) -> Self {
        Self {
            kind,
            name: Some(name.into()),
        }
    }

    /// The same subject without its name
    pub fn general(&self) -> Self {
        Self::kind(self.kind)
    }
}

impl fmt::Display for Subject {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.name {
            Some(name) => write!(f, "{}:{}", self.kind.as_str(), name),
            None => f.write_str(self.kind.as_str()),
        }
    }
}

impl FromStr for Subject {
    type Err = DarkError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (kind, name) = match s.split_once(':') {
            Some((kind, name)) => (kind, Some(name)),
            None => (s, None),
        };
        let kind = match kind {
            "state" => UpdateKind::State,
            "content" => UpdateKind::Content,
            "component" => UpdateKind::Component,
            "remove" => UpdateKind::Remove,
            _ => return Err(DarkError::InvalidSubject(s.to_string())),
        };
        match name {
            Some("") => Err(DarkError::InvalidSubject(s.to_string())),
            Some(name) => Ok(Self::named(kind, name)),
            None => Ok(Self::kind(kind)),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum ChangeValue {
    None,
    State(StateValue),
    Content(String),
    Component(ModelSet),
}

impl ChangeValue {
    pub fn as_state(&self) -> Option<&StateValue> {
        match self {
            ChangeValue::State(value) => Some(value),
            _ => None,
        }
    }

    pub fn as_content(&self) -> Option<&str> {
        match self {
            ChangeValue::Content(text) => Some(text),
            _ => None,
        }
    }

    pub fn as_component(&self) -> Option<&ModelSet> {
        match self {
            ChangeValue::Component(set) => Some(set),
            _ => None,
        }
    }
}

/// One detected difference, handed to update handlers
#[derive(Debug, Clone)]
pub struct Changes {
    pub kind: UpdateKind,
    pub name: Option<String>,
    pub old_value: ChangeValue,
    pub new_value: ChangeValue,
    /// New model; `None` when the node went away
    pub model: Option<Model>,
    /// Generated node, when it is in the document
    pub root: Option<NodeId>,
    pub root_id: String,
}

impl Changes {
    pub fn subject(&self) -> Subject {
        Subject {
            kind: self.kind,
            name: self.name.clone(),
        }
    }
}

/// Difference before the dispatcher attaches model and node context
#[derive(Debug, Clone)]
pub struct Change {
    pub kind: UpdateKind,
    pub name: Option<String>,
    pub old_value: ChangeValue,
    pub new_value: ChangeValue,
}

impl Change {
    pub fn remove() -> Self {
        Self {
            kind: UpdateKind::Remove,
            name: None,
            old_value: ChangeValue::None,
            new_value: ChangeValue::None,
        }
    }

    pub fn state(name: &str, old: StateValue, new: StateValue) -> Self {
        Self {
            kind: UpdateKind::State,
            name: Some(name.to_string()),
            old_value: ChangeValue::State(old),
            new_value: ChangeValue::State(new),
        }
    }

    pub fn content(old: Option<&str>, new: Option<&str>) -> Self {
        let wrap = |text: Option<&str>| {
            text.map_or(ChangeValue::None, |t| ChangeValue::Content(t.to_string()))
        };
        Self {
            kind: UpdateKind::Content,
            name: None,
            old_value: wrap(old),
            new_value: wrap(new),
        }
    }

    pub fn component(name: Option<&str>, old: Option<&ModelSet>, new: Option<&ModelSet>) -> Self {
        let wrap = |set: Option<&ModelSet>| {
            set.map_or(ChangeValue::None, |s| ChangeValue::Component(s.clone()))
        };
        Self {
            kind: UpdateKind::Component,
            name: name.map(String::from),
            old_value: wrap(old),
            new_value: wrap(new),
        }
    }
}

/// Result of an update handler
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UpdateOutcome {
    /// Nothing was re-rendered; let the caller carry on
    Continue,
    /// Handled; skip the remaining facet checks of this node
    Abort,
}

fn lookup(
    handlers: &IndexMap<Subject, UpdateHandler>,
    subject: &Subject,
) -> Option<UpdateHandler> {
    if subject.name.is_some() {
        if let Some(handler) = handlers.get(subject) {
            return Some(handler.clone());
        }
    }
    handlers.get(&subject.general()).cloned()
}

/// Resolve a handler: id-specific `type:name`, id-specific `type`, then the
/// definition's at the same two granularities
pub fn resolve_handler(
    scope: &Scope<'_>,
    guard: &Guard,
    id: &str,
    subject: &Subject,
) -> Option<UpdateHandler> {
    scope
        .rt
        .registry
        .handlers(id)
        .and_then(|handlers| lookup(handlers, subject))
        .or_else(|| lookup(guard.definition().handlers(), subject))
}

/// Re-render or remove the generated node when no handler claimed the change
pub fn default_update(
    scope: &mut Scope<'_>,
    guard: &Guard,
    changes: &Changes,
) -> DarkResult<UpdateOutcome> {
    match (&changes.model, changes.root) {
        (None, root) => {
            if let Some(root) = root {
                scope.doc.remove(root);
            }
            Ok(UpdateOutcome::Abort)
        }
        (Some(model), Some(root)) => {
            let markup = guard.create_root(scope, model)?;
            let nodes = scope.doc.create_from_markup(&markup)?;
            scope.doc.replace_with(root, &nodes);
            guard.listen(scope, model);
            debug!(
                id = %changes.root_id,
                subject = %changes.subject(),
                "Re-rendered generated node"
            );
            Ok(UpdateOutcome::Abort)
        }
        (Some(_), None) => Ok(UpdateOutcome::Continue),
    }
}

/// Dispatch one change for `id`, wrapped in `willUpdate`/`updated`
/// notifications on the watched node
pub fn trigger_update(
    scope: &mut Scope<'_>,
    id: Option<&str>,
    model: Option<&Model>,
    change: Change,
) -> DarkResult<UpdateOutcome> {
    let Some(id) = id else {
        return Ok(UpdateOutcome::Continue);
    };
    let watched = scope.watched_node(id);
    let removal = model.is_none() || change.kind == UpdateKind::Remove;

    scope.notify(watched, Lifecycle::WillUpdate);

    let changes = Changes {
        kind: change.kind,
        name: change.name,
        old_value: change.old_value,
        new_value: change.new_value,
        model: model.cloned(),
        root: scope.generated_node(id),
        root_id: id.to_string(),
    };
    trace!(id, subject = %changes.subject(), "Dispatching update");

    let outcome = match scope.rt.registry.guard(id) {
        Some(guard) => guard.trigger_update(scope, &changes)?,
        None if removal => {
            if let Some(root) = changes.root {
                scope.doc.remove(root);
            }
            UpdateOutcome::Abort
        }
        None => UpdateOutcome::Continue,
    };

    if removal {
        scope.notify(watched, Lifecycle::Removed);
    } else if outcome == UpdateOutcome::Abort {
        scope.notify(watched, Lifecycle::Rendered);
    }
    scope.notify(watched, Lifecycle::Updated);

    Ok(outcome)
}
