/// Refresh, diff and handler dispatch
use crate::test_fixtures::*;
use crate::*;

#[cfg(test)]
mod update_tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use std::cell::{Cell, RefCell};
    use std::rc::Rc;

    const FOLDER_OF_THREE: &str = concat!(
        r#"<x-folder mode="unfold">"#,
        "<hd>Title</hd>",
        "<x-item>Apple</x-item>",
        "<x-item>Banana</x-item>",
        "<x-item>Cherry</x-item>",
        "<p>Body text</p>",
        "</x-folder>",
    );

    fn folded() -> String {
        MOUNTED_FOLDER.replace(r#"data-mode="unfold""#, r#"data-mode="fold""#)
    }

    fn set_mode(engine: &mut Engine<MemoryDocument>, node: NodeId, mode: &str) {
        engine.document_mut().set_attr(node, "mode", mode);
    }

    #[test]
    fn test_unchanged_node_dispatches_nothing() {
        let (mut engine, _guard, node) = mount_folder(folder_definition(), FOLDER);

        engine.update_node(node).expect("Failed to update");

        assert!(engine.document().events_named("darkdom:willUpdate").is_empty());
        assert_eq!(
            generated_markup(&mut engine, "_brightRoot_1").as_deref(),
            Some(MOUNTED_FOLDER)
        );
    }

    #[test]
    fn test_state_change_rerenders() {
        let (mut engine, _guard, node) = mount_folder(folder_definition(), FOLDER);

        set_mode(&mut engine, node, "fold");
        engine.update_node(node).expect("Failed to update");

        assert_eq!(generated_markup(&mut engine, "_brightRoot_1"), Some(folded()));
        let names: Vec<&str> = engine
            .document()
            .events()
            .iter()
            .filter(|e| e.node == node)
            .map(|e| e.event.name.as_str())
            .skip(3)
            .collect();
        assert_eq!(
            names,
            vec!["darkdom:willUpdate", "darkdom:rendered", "darkdom:updated"]
        );
    }

    #[test]
    fn test_guard_update_refreshes_every_root() {
        let markup = format!("{}{}", FOLDER, FOLDER.replace("Title", "Second"));
        let (mut engine, guard, _node) = mount_folder(folder_definition(), &markup);
        let folders = engine.document().select(None, "x-folder");
        assert_eq!(folders.len(), 2);

        for folder in &folders {
            set_mode(&mut engine, *folder, "fold");
        }
        engine.update(&guard).expect("Failed to update");

        for folder in folders {
            let id = engine.id_of(folder).expect("No id");
            let output = generated_markup(&mut engine, &id).expect("No output");
            assert!(output.contains(r#"data-mode="fold""#));
        }
    }

    #[test]
    fn test_states_only_refresh_keeps_content() {
        let (mut engine, _guard, node) = mount_folder(folder_definition(), FOLDER);

        engine
            .set_state(node, "mode", "fold".into(), true)
            .expect("Failed to set state");

        assert_eq!(generated_markup(&mut engine, "_brightRoot_1"), Some(folded()));
        let snapshot = engine.registry().model("_brightRoot_1").expect("No snapshot");
        assert_eq!(state_str(snapshot, "mode"), "fold");
        assert_eq!(snapshot.content_data.text, "<p>Body text</p>");
    }

    #[test]
    fn test_states_only_refresh_ignores_content() {
        let (mut engine, _guard, node) = mount_folder(folder_definition(), FOLDER);

        engine
            .document_mut()
            .append_markup(node, "<p>More</p>")
            .expect("Failed to append");
        engine.update_states(node).expect("Failed to update states");

        assert!(engine.document().events_named("darkdom:willUpdate").is_empty());
        assert_eq!(
            generated_markup(&mut engine, "_brightRoot_1").as_deref(),
            Some(MOUNTED_FOLDER)
        );
    }

    #[test]
    fn test_content_change_rerenders() {
        let (mut engine, _guard, node) = mount_folder(folder_definition(), FOLDER);

        engine
            .document_mut()
            .append_markup(node, "<p>More</p>")
            .expect("Failed to append");
        engine.update_node(node).expect("Failed to update");

        let expected = MOUNTED_FOLDER.replace("</p></div>", "</p><p>More</p></div>");
        assert_eq!(generated_markup(&mut engine, "_brightRoot_1"), Some(expected));
    }

    #[test]
    fn test_nested_item_change_rerenders_only_the_item() {
        let (mut engine, _guard, node) = mount_folder(folder_definition(), FOLDER);
        let apple = engine.document().query("x-item").expect("No item");
        let children = engine.document().children(apple);
        for child in children {
            engine.document_mut().remove(child);
        }
        engine
            .document_mut()
            .append_markup(apple, "Apricot")
            .expect("Failed to append");

        engine.update_node(node).expect("Failed to update");

        assert_eq!(engine.document().events_named("darkdom:willUpdate"), vec![apple]);
        let expected = MOUNTED_FOLDER.replace(">Apple<", ">Apricot<");
        assert_eq!(generated_markup(&mut engine, "_brightRoot_1"), Some(expected));
    }

    #[test]
    fn test_list_shrink_dispatches_one_component_update() {
        let lengths: Rc<RefCell<Vec<(Option<usize>, Option<usize>)>>> = Rc::default();
        let calls = Calls::default();
        let seen = lengths.clone();
        let definition = folder_definition()
            .response(Subject::component("items"), move |scope, changes| {
                seen.borrow_mut().push((
                    changes.old_value.as_component().map(ModelSet::len),
                    changes.new_value.as_component().map(ModelSet::len),
                ));
                scope.default_update(changes)
            })
            .response(
                Subject::kind(UpdateKind::State),
                record(&calls, "state", UpdateOutcome::Continue),
            )
            .response(Subject::content(), record(&calls, "content", UpdateOutcome::Continue))
            .response(
                Subject::kind(UpdateKind::Component),
                record(&calls, "component", UpdateOutcome::Continue),
            );
        let (mut engine, _guard, node) = mount_folder(definition, FOLDER_OF_THREE);

        let items = engine.document().select(None, "x-item");
        engine.document_mut().remove(items[1]);
        engine.document_mut().remove(items[2]);
        engine.update_node(node).expect("Failed to update");

        assert_eq!(*lengths.borrow(), vec![(Some(3), Some(1))]);
        assert!(calls.borrow().is_empty());

        let output = generated_markup(&mut engine, "_brightRoot_1").expect("No output");
        assert!(output.contains(r#"<ul><li dd-autogen="true" id="_brightRoot_3">Apple</li></ul>"#));
        assert!(!engine.registry().contains("_brightRoot_4"));
        assert!(!engine.registry().contains("_brightRoot_5"));
        assert_eq!(engine.id_of(items[1]), None);
    }

    #[test]
    fn test_list_growth_rerenders_parent() {
        let (mut engine, _guard, node) = mount_folder(folder_definition(), FOLDER);

        engine
            .document_mut()
            .append_markup(node, "<x-item>Cherry</x-item>")
            .expect("Failed to append");
        engine.update_node(node).expect("Failed to update");

        let output = generated_markup(&mut engine, "_brightRoot_1").expect("No output");
        assert!(output.contains(r#"<li dd-autogen="true" id="_brightRoot_5">Cherry</li></ul>"#));
        // the new item is a sub-component, not content
        assert!(output.ends_with("<p>Body text</p></div>"));
    }

    #[test]
    fn test_definition_named_handler_beats_general() {
        let calls = Calls::default();
        let definition = folder_definition()
            .response(
                Subject::kind(UpdateKind::State),
                record(&calls, "def-general", UpdateOutcome::Abort),
            )
            .response(Subject::state("mode"), record(&calls, "def-named", UpdateOutcome::Abort));
        let (mut engine, _guard, node) = mount_folder(definition, FOLDER);

        set_mode(&mut engine, node, "fold");
        engine.update_node(node).expect("Failed to update");

        assert_eq!(*calls.borrow(), vec!["def-named:state:mode"]);
        // the handler claimed the change without rendering
        assert_eq!(
            generated_markup(&mut engine, "_brightRoot_1").as_deref(),
            Some(MOUNTED_FOLDER)
        );
    }

    #[test]
    fn test_id_general_handler_beats_definition_named() {
        let calls = Calls::default();
        let definition = folder_definition()
            .response(Subject::state("mode"), record(&calls, "def-named", UpdateOutcome::Abort));
        let (mut engine, _guard, node) = mount_folder(definition, FOLDER);
        engine.respond(
            node,
            Subject::kind(UpdateKind::State),
            record(&calls, "id-general", UpdateOutcome::Abort),
        );

        set_mode(&mut engine, node, "fold");
        engine.update_node(node).expect("Failed to update");

        assert_eq!(*calls.borrow(), vec!["id-general:state:mode"]);
    }

    #[test]
    fn test_id_named_handler_wins() {
        let calls = Calls::default();
        let (mut engine, _guard, node) = mount_folder(folder_definition(), FOLDER);
        engine.respond(
            node,
            Subject::kind(UpdateKind::State),
            record(&calls, "id-general", UpdateOutcome::Abort),
        );
        engine.respond(
            node,
            Subject::state("mode"),
            record(&calls, "id-named", UpdateOutcome::Abort),
        );

        set_mode(&mut engine, node, "fold");
        engine.update_node(node).expect("Failed to update");

        assert_eq!(*calls.borrow(), vec!["id-named:state:mode"]);
    }

    #[test]
    fn test_unrelated_id_handlers_fall_back_to_definition() {
        let calls = Calls::default();
        let definition = folder_definition()
            .response(Subject::state("mode"), record(&calls, "def-named", UpdateOutcome::Abort));
        let (mut engine, _guard, node) = mount_folder(definition, FOLDER);
        engine.respond(
            node,
            Subject::content(),
            record(&calls, "id-content", UpdateOutcome::Abort),
        );

        set_mode(&mut engine, node, "fold");
        engine.update_node(node).expect("Failed to update");

        assert_eq!(*calls.borrow(), vec!["def-named:state:mode"]);
    }

    fn state_and_content_calls(state_outcome: UpdateOutcome) -> Vec<String> {
        let calls = Calls::default();
        let definition = folder_definition()
            .response(Subject::state("mode"), record(&calls, "h", state_outcome))
            .response(Subject::content(), record(&calls, "h", UpdateOutcome::Continue));
        let (mut engine, _guard, node) = mount_folder(definition, FOLDER);

        set_mode(&mut engine, node, "fold");
        engine
            .document_mut()
            .append_markup(node, "<p>More</p>")
            .expect("Failed to append");
        engine.update_node(node).expect("Failed to update");

        let recorded = calls.borrow().clone();
        recorded
    }

    #[test]
    fn test_abort_skips_remaining_facets() {
        assert_eq!(state_and_content_calls(UpdateOutcome::Abort), vec!["h:state:mode"]);
    }

    #[test]
    fn test_continue_reaches_next_facet() {
        assert_eq!(
            state_and_content_calls(UpdateOutcome::Continue),
            vec!["h:state:mode", "h:content"]
        );
    }

    #[test]
    fn test_handler_refreshing_its_own_node_is_fenced() {
        let count = Rc::new(Cell::new(0));
        let counter = count.clone();
        let definition = folder_definition().response(
            Subject::state("mode"),
            move |scope: &mut Scope<'_>, changes: &Changes| {
                counter.set(counter.get() + 1);
                if let Some(watched) = scope.watched_node(&changes.root_id) {
                    scope.update_node(watched)?;
                }
                scope.default_update(changes)
            },
        );
        let (mut engine, _guard, node) = mount_folder(definition, FOLDER);

        set_mode(&mut engine, node, "fold");
        engine.update_node(node).expect("Failed to update");

        assert_eq!(count.get(), 1);
        assert_eq!(generated_markup(&mut engine, "_brightRoot_1"), Some(folded()));

        // a later sweep may refresh the node again
        set_mode(&mut engine, node, "unfold");
        engine.update_node(node).expect("Failed to update");
        assert_eq!(count.get(), 2);
    }

    #[test]
    fn test_removed_node_is_reported_once_and_purged() {
        let calls = Calls::default();
        let seen = calls.clone();
        let definition = folder_definition().response(
            Subject::remove(),
            move |scope: &mut Scope<'_>, changes: &Changes| {
                assert!(changes.model.is_none());
                assert!(changes.root.is_some());
                seen.borrow_mut().push(changes.subject().to_string());
                scope.default_update(changes)
            },
        );
        let (mut engine, _guard, node) = mount_folder(definition, FOLDER);

        engine.document_mut().remove(node);
        engine.update_node(node).expect("Failed to update");

        assert_eq!(*calls.borrow(), vec!["remove"]);
        assert_eq!(engine.document().events_named("darkdom:removed"), vec![node]);
        assert_eq!(engine.document().select(None, ".folder").len(), 0);
        assert_eq!(engine.registry().ids(), Vec::<String>::new());
    }

    #[test]
    fn test_states_only_refresh_ignores_removal() {
        let (mut engine, _guard, node) = mount_folder(folder_definition(), FOLDER);

        engine.document_mut().remove(node);
        engine.update_states(node).expect("Failed to update states");

        assert!(engine.document().events_named("darkdom:removed").is_empty());
        assert!(engine.registry().contains("_brightRoot_1"));
    }

    fn labelled_list() -> Rc<Guard> {
        let item = Rc::new(
            ComponentDefinition::new(ComponentOptions::default().with_render(|m| {
                match state_str(m, "label") {
                    "bad" => "<li><b>".to_string(),
                    label => format!("<li>{}</li>", label),
                }
            }))
            .state("label", "label"),
        );
        let options = ComponentOptions::default()
            .with_render(|m| format!("<ul>{}</ul>", rendered(m, "items")));
        let list = Rc::new(ComponentDefinition::new(options).contain("items", item));
        let guard = list.create_guard();
        guard.component("items", "x-item");
        guard
    }

    #[test]
    fn test_failed_render_does_not_stick() {
        init_tracing();
        let doc = MemoryDocument::parse(r#"<x-list><x-item label="a"></x-item></x-list>"#)
            .expect("Failed to parse fixture");
        let mut engine = Engine::new(doc).expect("Failed to create engine");
        let guard = labelled_list();
        engine.watch(&guard, "x-list");
        engine.mount(&guard).expect("Failed to mount");
        let list = engine.document().query("x-list").expect("No list");
        let item = engine.document().query("x-item").expect("No item");

        engine.document_mut().set_attr(item, "label", "bad");
        let result = engine.update_node(list);
        assert!(matches!(result, Err(DarkError::Parse(_))), "got {:?}", result);
        assert_eq!(
            generated_markup(&mut engine, "_brightRoot_2").as_deref(),
            Some(r#"<li dd-autogen="true" id="_brightRoot_2">a</li>"#)
        );

        engine.document_mut().set_attr(item, "label", "good");
        engine.update_node(list).expect("Failed to update after the fix");
        assert_eq!(
            generated_markup(&mut engine, "_brightRoot_2").as_deref(),
            Some(r#"<li dd-autogen="true" id="_brightRoot_2">good</li>"#)
        );

        engine.update_node(list).expect("Failed to update");
        assert_eq!(engine.document().events_named("darkdom:updated"), vec![item]);
    }
}
