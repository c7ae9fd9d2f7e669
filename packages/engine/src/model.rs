//! The scanned representation of a watched node

use crate::value::StateValue;
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

/// One scanned watched node, or a source model fed by the author
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Model {
    pub id: Option<String>,
    /// Id of the enclosing model
    pub context: Option<String>,
    pub state: IndexMap<String, StateValue>,
    pub component_data: IndexMap<String, ModelSet>,
    pub content_data: ContentData,
    /// Resolved content, set by render
    #[serde(skip_serializing_if = "Option::is_none")]
    pub content: Option<String>,
    /// Rendered sub-components, set by render
    #[serde(skip_serializing_if = "Option::is_none")]
    pub component: Option<IndexMap<String, RenderedSet>>,
}

impl Model {
    pub fn with_id(id: impl Into<String>) -> Self {
        Self {
            id: Some(id.into()),
            ..Default::default()
        }
    }

    pub fn with_state(mut self, name: impl Into<String>, value: impl Into<StateValue>) -> Self {
        self.state.insert(name.into(), value.into());
        self
    }

    pub fn with_component(mut self, name: impl Into<String>, set: ModelSet) -> Self {
        self.component_data.insert(name.into(), set);
        self
    }

    pub fn with_text(mut self, text: impl Into<String>) -> Self {
        self.content_data.text = text.into();
        self
    }

    pub fn id(&self) -> Option<&str> {
        self.id.as_deref()
    }

    /// State value, `None` when unset
    pub fn state(&self, name: &str) -> Option<&StateValue> {
        self.state.get(name).filter(|v| !v.is_null())
    }

    pub fn is_rendered(&self) -> bool {
        self.component.is_some()
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ContentData {
    /// Content markup with `{{<connect>=<id>}}` placeholders
    pub text: String,
    /// Models referenced by placeholders, in document order
    pub index: IndexMap<String, Model>,
    pub script: String,
    /// Whole subtree was taken as content
    pub has_outer: bool,
}

/// Models scanned for one named sub-component
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ModelSet {
    Many(Vec<Model>),
    Single(Model),
}

impl ModelSet {
    pub fn len(&self) -> usize {
        match self {
            ModelSet::Many(models) => models.len(),
            ModelSet::Single(_) => 1,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn is_many(&self) -> bool {
        matches!(self, ModelSet::Many(_))
    }

    pub fn as_slice(&self) -> &[Model] {
        match self {
            ModelSet::Many(models) => models,
            ModelSet::Single(model) => std::slice::from_ref(model),
        }
    }

    pub fn as_mut_slice(&mut self) -> &mut [Model] {
        match self {
            ModelSet::Many(models) => models,
            ModelSet::Single(model) => std::slice::from_mut(model),
        }
    }

    pub fn into_vec(self) -> Vec<Model> {
        match self {
            ModelSet::Many(models) => models,
            ModelSet::Single(model) => vec![model],
        }
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Model> {
        self.as_slice().iter()
    }

    pub fn iter_mut(&mut self) -> std::slice::IterMut<'_, Model> {
        self.as_mut_slice().iter_mut()
    }
}

/// Render output for one named sub-component
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum RenderedSet {
    One(String),
    Many(Vec<String>),
}

impl RenderedSet {
    /// All outputs concatenated, for render functions that don't care about the shape
    pub fn join(&self) -> String {
        match self {
            RenderedSet::One(markup) => markup.clone(),
            RenderedSet::Many(items) => items.concat(),
        }
    }

    pub fn as_one(&self) -> Option<&str> {
        match self {
            RenderedSet::One(markup) => Some(markup),
            RenderedSet::Many(_) => None,
        }
    }

    pub fn as_many(&self) -> &[String] {
        match self {
            RenderedSet::One(_) => &[],
            RenderedSet::Many(items) => items,
        }
    }
}
