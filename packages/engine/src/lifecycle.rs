use crate::config::EngineConfig;

/// Notifications fired on a watched node
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Lifecycle {
    WillMount,
    Rendered,
    Mounted,
    WillUpdate,
    Updated,
    Removed,
}

impl Lifecycle {
    pub fn name(self) -> &'static str {
        match self {
            Lifecycle::WillMount => "willMount",
            Lifecycle::Rendered => "rendered",
            Lifecycle::Mounted => "mounted",
            Lifecycle::WillUpdate => "willUpdate",
            Lifecycle::Updated => "updated",
            Lifecycle::Removed => "removed",
        }
    }

    /// Full event name, e.g. `darkdom:mounted`
    pub fn event_name(self, config: &EngineConfig) -> String {
        format!("{}{}", config.event_prefix, self.name())
    }
}
