//! Source merge: fill the unset fields of a model from a source model

use crate::model::{Model, ModelSet};
use crate::registry::Registry;
use crate::value::is_unset;

/// Merge a single or list source into `target`; a list is applied item by item
pub fn merge_source(
    registry: &Registry,
    target: &mut Model,
    source: &ModelSet,
    context: Option<&str>,
) {
    for item in source.iter() {
        merge_source_model(registry, target, item, context);
    }
}

/// Adopt the source id when missing, reset the context, and copy states the
/// target doesn't have
pub fn merge_source_states(target: &mut Model, source: &Model, context: Option<&str>) {
    if target.id.is_none() {
        target.id = source.id.clone();
    }
    target.context = context.map(String::from);
    for (name, value) in &source.state {
        if is_unset(target.state.get(name)) {
            target.state.insert(name.clone(), value.clone());
        }
    }
}

pub fn merge_source_model(
    registry: &Registry,
    target: &mut Model,
    source: &Model,
    context: Option<&str>,
) {
    merge_source_states(target, source, context);

    let source_content = &source.content_data;
    if !source_content.text.is_empty()
        && (target.content_data.text.is_empty() || target.content_data.has_outer)
    {
        target.content_data.text = source_content.text.clone();
        target.content_data.index.extend(
            source_content
                .index
                .iter()
                .map(|(id, model)| (id.clone(), model.clone())),
        );
    }

    for (name, source_set) in &source.component_data {
        merge_source_components(registry, target, name, source_set);
    }
}

fn merge_source_components(
    registry: &Registry,
    target: &mut Model,
    name: &str,
    source_set: &ModelSet,
) {
    let context = target.id.clone();
    let context = context.as_deref();

    match source_set {
        ModelSet::Many(sources) => {
            let existing = target
                .component_data
                .get_mut(name)
                .map(|set| std::mem::replace(set, ModelSet::Many(Vec::new())).into_vec());
            let mut merged: Vec<Model> = existing
                .unwrap_or_default()
                .into_iter()
                .filter(|model| !registry.is_source_model(model))
                .collect();
            for (i, source) in sources.iter().enumerate() {
                match merged.get_mut(i) {
                    Some(slot) => merge_source_model(registry, slot, source, context),
                    None => {
                        let mut fresh = Model::default();
                        merge_source_model(registry, &mut fresh, source, context);
                        merged.push(fresh);
                    }
                }
            }
            target
                .component_data
                .insert(name.to_string(), ModelSet::Many(merged));
        }
        ModelSet::Single(source) => match target.component_data.get_mut(name) {
            Some(ModelSet::Single(existing)) if !registry.is_source_model(existing) => {
                merge_source_model(registry, existing, source, context);
            }
            Some(ModelSet::Single(existing)) => *existing = source.clone(),
            _ => {
                let mut fresh = Model::default();
                merge_source_model(registry, &mut fresh, source, context);
                target
                    .component_data
                    .insert(name.to_string(), ModelSet::Single(fresh));
            }
        },
    }
}
