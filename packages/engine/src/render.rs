//! Render emission: resolve sub-component output and content placeholders

use crate::error::DarkResult;
use crate::model::{Model, ModelSet, RenderedSet};
use crate::scope::Scope;
use indexmap::IndexMap;
use tracing::trace;

/// Output used when a definition has no render function
pub fn default_render(model: &Model) -> String {
    format!("<span>{}</span>", model.content.as_deref().unwrap_or_default())
}

/// Render sub-components and content of `model` in place and store it as the
/// snapshot for its id
pub fn render_root(scope: &mut Scope<'_>, model: &mut Model) -> DarkResult<()> {
    let mut rendered = IndexMap::new();
    for (name, set) in model.component_data.iter_mut() {
        let output = match set {
            ModelSet::Single(child) => RenderedSet::One(render_model(scope, child)?),
            ModelSet::Many(children) => RenderedSet::Many(
                children
                    .iter_mut()
                    .map(|child| render_model(scope, child))
                    .collect::<DarkResult<Vec<_>>>()?,
            ),
        };
        rendered.insert(name.clone(), output);
    }
    model.component = Some(rendered);
    model.content = Some(resolve_content(scope, model)?);

    if let Some(id) = &model.id {
        trace!(id = %id, "Stored rendered snapshot");
        scope.rt.registry.set_model(id.clone(), model.clone());
    }
    Ok(())
}

/// Substitute every placeholder with the rendered output of its model;
/// unknown ids resolve to nothing
fn resolve_content(scope: &mut Scope<'_>, model: &mut Model) -> DarkResult<String> {
    let text = model.content_data.text.clone();
    let matches: Vec<(usize, usize, String)> = scope
        .rt
        .placeholder
        .captures_iter(&text)
        .filter_map(|caps| {
            let whole = caps.get(0)?;
            Some((whole.start(), whole.end(), caps[1].to_string()))
        })
        .collect();

    let mut content = String::with_capacity(text.len());
    let mut last = 0;
    for (start, end, id) in matches {
        content.push_str(&text[last..start]);
        if let Some(child) = model.content_data.index.get_mut(&id) {
            content.push_str(&render_model(scope, child)?);
        }
        last = end;
    }
    content.push_str(&text[last..]);
    Ok(content)
}

/// Generated markup for a nested model; empty when its id has no guard
pub fn render_model(scope: &mut Scope<'_>, model: &mut Model) -> DarkResult<String> {
    let Some(guard) = model.id.as_deref().and_then(|id| scope.rt.registry.guard(id)) else {
        return Ok(String::new());
    };
    if !model.is_rendered() {
        render_root(scope, model)?;
    }
    guard.create_root(scope, model)
}

/// Run inline scripts of `model`, then of its content and component models
pub fn run_script(scope: &mut Scope<'_>, model: &Model) -> DarkResult<()> {
    if !model.content_data.script.is_empty() {
        let id = model.id.clone().unwrap_or_default();
        let context = scope.generated_node(&id);
        scope
            .rt
            .scripts
            .run(&id, &model.content_data.script, context, &mut *scope.doc)?;
    }
    for child in model.content_data.index.values() {
        run_script(scope, child)?;
    }
    for set in model.component_data.values() {
        for child in set.iter() {
            run_script(scope, child)?;
        }
    }
    Ok(())
}
