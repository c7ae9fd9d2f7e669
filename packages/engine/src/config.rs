use crate::error::DarkResult;
use crate::model::Model;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::Path;
use std::rc::Rc;

pub const DEFAULT_CONFIG_NAME: &str = "darkdom.config.json";

/// Marker attributes and naming conventions shared by every guard of an engine
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EngineConfig {
    /// Attribute carrying the id on a watched node
    #[serde(default = "default_connect_attr")]
    pub connect_attr: String,

    /// Attribute marking generated output
    #[serde(default = "default_generated_attr")]
    pub generated_attr: String,

    #[serde(default = "default_id_prefix")]
    pub id_prefix: String,

    /// `type` of inline script elements captured by the content scanner
    #[serde(default = "default_script_type")]
    pub script_type: String,

    #[serde(default = "default_event_prefix")]
    pub event_prefix: String,

    /// Name of the state every definition carries for source fallback
    #[serde(default = "default_source_state")]
    pub source_state: String,

    #[serde(default = "default_source_attr")]
    pub source_attr: String,
}

fn default_connect_attr() -> String {
    "dd-connect".to_string()
}

fn default_generated_attr() -> String {
    "dd-autogen".to_string()
}

fn default_id_prefix() -> String {
    "_brightRoot_".to_string()
}

fn default_script_type() -> String {
    "text/darkscript".to_string()
}

fn default_event_prefix() -> String {
    "darkdom:".to_string()
}

fn default_source_state() -> String {
    "source".to_string()
}

fn default_source_attr() -> String {
    "source-selector".to_string()
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            connect_attr: default_connect_attr(),
            generated_attr: default_generated_attr(),
            id_prefix: default_id_prefix(),
            script_type: default_script_type(),
            event_prefix: default_event_prefix(),
            source_state: default_source_state(),
            source_attr: default_source_attr(),
        }
    }
}

impl EngineConfig {
    pub fn from_json(source: &str) -> DarkResult<Self> {
        Ok(serde_json::from_str(source)?)
    }

    /// Load config from a directory, falling back to defaults when no file exists
    pub fn load(dir: &Path) -> DarkResult<Self> {
        let config_path = dir.join(DEFAULT_CONFIG_NAME);

        if config_path.exists() {
            let content = std::fs::read_to_string(&config_path)?;
            Self::from_json(&content)
        } else {
            Ok(Self::default())
        }
    }

    /// Token standing in for a buffered content model inside content text
    pub fn placeholder(&self, id: &str) -> String {
        format!("{{{{{}={}}}}}", self.connect_attr, id)
    }

    pub(crate) fn placeholder_pattern(&self) -> String {
        format!(r"\{{\{{{}=(\w+)\}}\}}", regex::escape(&self.connect_attr))
    }
}

/// Renders a finished model into markup
pub type RenderFn = Rc<dyn Fn(&Model) -> String>;

/// Per-definition switches
#[derive(Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ComponentOptions {
    /// Only the first match of a watch selector is taken
    pub unique: bool,
    pub enable_source: bool,
    pub disable_script: bool,
    /// Scan the whole watched subtree as one content block
    pub entire_as_content: bool,
    pub source_as_content: bool,
    #[serde(skip)]
    pub render: Option<RenderFn>,
}

impl ComponentOptions {
    pub fn with_render(mut self, render: impl Fn(&Model) -> String + 'static) -> Self {
        self.render = Some(Rc::new(render));
        self
    }
}

impl fmt::Debug for ComponentOptions {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ComponentOptions")
            .field("unique", &self.unique)
            .field("enable_source", &self.enable_source)
            .field("disable_script", &self.disable_script)
            .field("entire_as_content", &self.entire_as_content)
            .field("source_as_content", &self.source_as_content)
            .field("render", &self.render.is_some())
            .finish()
    }
}
