use crate::error::DarkResult;
use darkdom_document::{DocumentTree, NodeId};
use tracing::debug;

/// Executes inline scripts extracted from watched nodes.
///
/// Called once per mounted model carrying script text, with the generated
/// node as context.
pub trait ScriptRunner {
    fn run(
        &mut self,
        id: &str,
        script: &str,
        context: Option<NodeId>,
        doc: &mut dyn DocumentTree,
    ) -> DarkResult<()>;
}

/// Default runner: scripts are only logged
#[derive(Debug, Default)]
pub struct LogScriptRunner;

impl ScriptRunner for LogScriptRunner {
    fn run(
        &mut self,
        id: &str,
        script: &str,
        context: Option<NodeId>,
        _doc: &mut dyn DocumentTree,
    ) -> DarkResult<()> {
        debug!(id, context = ?context, len = script.len(), "Skipping inline script");
        Ok(())
    }
}

impl<F> ScriptRunner for F
where
    F: FnMut(&str, &str, Option<NodeId>, &mut dyn DocumentTree) -> DarkResult<()>,
{
    fn run(
        &mut self,
        id: &str,
        script: &str,
        context: Option<NodeId>,
        doc: &mut dyn DocumentTree,
    ) -> DarkResult<()> {
        self(id, script, context, doc)
    }
}
