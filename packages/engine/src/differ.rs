//! Structural diff between a stored snapshot and a rescanned model

use crate::dispatch::{trigger_update, Change, UpdateOutcome};
use crate::error::DarkResult;
use crate::model::{ContentData, Model, ModelSet};
use crate::scope::Scope;
use crate::value::loose_eq;
use serde_json::Value;

/// Compare `origin` with `new` facet by facet, dispatching an update per
/// detected change
pub fn compare_model(scope: &mut Scope<'_>, origin: &Model, new: Option<&Model>) -> DarkResult<()> {
    let new = match new {
        Some(new) if new.id.is_some() => new,
        _ => {
            trigger_update(scope, origin.id.as_deref(), None, Change::remove())?;
            return Ok(());
        }
    };

    if origin.id.is_none() {
        // a nested model that just appeared is reported on its parent
        let parent_id = new.context.clone();
        let parent = parent_id
            .as_deref()
            .and_then(|id| scope.rt.registry.model(id).cloned());
        trigger_update(
            scope,
            parent_id.as_deref(),
            parent.as_ref(),
            Change::component(None, None, None),
        )?;
        return Ok(());
    }

    if compare_states(scope, origin, new)? == UpdateOutcome::Abort {
        return Ok(());
    }

    if compare_contents(scope, &origin.content_data, &new.content_data)? {
        let change = Change::content(origin.content.as_deref(), new.content.as_deref());
        if trigger_update(scope, new.id.as_deref(), Some(new), change)? == UpdateOutcome::Abort {
            return Ok(());
        }
    }

    for (name, new_set) in &new.component_data {
        let origin_set = origin.component_data.get(name);
        if compare_components(scope, origin_set, new_set)? {
            let change = Change::component(Some(name), origin_set, Some(new_set));
            if trigger_update(scope, new.id.as_deref(), Some(new), change)? == UpdateOutcome::Abort
            {
                return Ok(());
            }
        }
    }
    Ok(())
}

/// Dispatch `state:<name>` for every key whose value loosely differs
pub fn compare_states(
    scope: &mut Scope<'_>,
    origin: &Model,
    new: &Model,
) -> DarkResult<UpdateOutcome> {
    for (name, value) in &new.state {
        let old = origin.state.get(name).unwrap_or(&Value::Null);
        if loose_eq(old, value) {
            continue;
        }
        let change = Change::state(name, old.clone(), value.clone());
        if trigger_update(scope, new.id.as_deref(), Some(new), change)? == UpdateOutcome::Abort {
            return Ok(UpdateOutcome::Abort);
        }
    }
    Ok(UpdateOutcome::Continue)
}

/// Has the content changed? Nested placeholder models are diffed on the way
pub fn compare_contents(
    scope: &mut Scope<'_>,
    origin: &ContentData,
    new: &ContentData,
) -> DarkResult<bool> {
    if origin.text.len() != new.text.len() {
        return Ok(true);
    }
    for (id, new_model) in &new.index {
        match origin.index.get(id) {
            Some(origin_model) => compare_model(scope, origin_model, Some(new_model))?,
            None => return Ok(true),
        }
    }
    Ok(origin.text != new.text)
}

/// Has the named set changed? Lists are compared by position; a length or id
/// mismatch marks the whole set changed
pub fn compare_components(
    scope: &mut Scope<'_>,
    origin: Option<&ModelSet>,
    new: &ModelSet,
) -> DarkResult<bool> {
    match new {
        ModelSet::Single(new_model) => {
            let empty = Model::default();
            let origin_model = match origin {
                Some(ModelSet::Single(model)) => model,
                _ => &empty,
            };
            compare_model(scope, origin_model, Some(new_model))?;
            Ok(false)
        }
        ModelSet::Many(new_models) => {
            let origin_models = origin.map_or(&[][..], ModelSet::as_slice);
            let larger = origin_models.len().max(new_models.len());
            for i in 0..larger {
                match (origin_models.get(i), new_models.get(i)) {
                    (Some(o), Some(n)) if o.id == n.id => compare_model(scope, o, Some(n))?,
                    _ => return Ok(true),
                }
            }
            Ok(false)
        }
    }
}
