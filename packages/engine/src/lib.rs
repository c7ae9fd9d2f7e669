//! # DarkDOM
//!
//! Components defined as transformations from hand-authored markup (the
//! watched node) into generated output. The watched node stays the source of
//! truth: on every refresh it is rescanned into a [`Model`], diffed against
//! the last snapshot, and each difference is dispatched to an overridable
//! update handler instead of re-rendering everything.
//!
//! ```ignore
//! let item = Rc::new(ComponentDefinition::default().state("label", "label"));
//! let list = Rc::new(
//!     ComponentDefinition::new(ComponentOptions::default().with_render(|m| render_list(m)))
//!         .contain("items", item),
//! );
//! let guard = list.create_guard();
//! guard.component("items", "x-item");
//!
//! let mut engine = Engine::new(MemoryDocument::parse(markup)?)?;
//! engine.watch(&guard, "x-list");
//! engine.mount(&guard)?;
//! ```

pub mod config;
pub mod content;
pub mod definition;
pub mod differ;
pub mod dispatch;
pub mod engine;
pub mod error;
pub mod events;
pub mod guard;
pub mod ids;
pub mod lifecycle;
pub mod merge;
pub mod model;
pub mod registry;
pub mod render;
pub mod scope;
pub mod script;
pub mod update;
pub mod value;

#[cfg(test)]
mod tests_merge;
#[cfg(test)]
mod tests_update;

pub use config::{ComponentOptions, EngineConfig, RenderFn};
pub use definition::{ComponentDefinition, StateAccessor, StateGetter, StateSetter, UpdateHandler};
pub use dispatch::{Change, ChangeValue, Changes, Subject, UpdateKind, UpdateOutcome};
pub use engine::Engine;
pub use error::{DarkError, DarkResult};
pub use guard::{ForwardSpec, Guard, GuardContext, WatchSpec};
pub use ids::{IdGenerator, SequentialIds};
pub use lifecycle::Lifecycle;
pub use model::{ContentData, Model, ModelSet, RenderedSet};
pub use registry::Registry;
pub use scope::{Runtime, Scope};
pub use script::{LogScriptRunner, ScriptRunner};
pub use value::StateValue;

pub use darkdom_document::{DocumentTree, DomEvent, MemoryDocument, NodeId};
