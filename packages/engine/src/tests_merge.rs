/// Source merging and fed source data
use crate::merge::{merge_source, merge_source_model, merge_source_states};
use crate::test_fixtures::*;
use crate::*;

#[cfg(test)]
mod merge_tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use serde_json::json;
    use std::rc::Rc;

    fn registry_with_source(id: &str) -> Registry {
        let mut registry = Registry::new();
        let definition = Rc::new(ComponentDefinition::default());
        registry.set_guard(id, Guard::new(definition, GuardContext::source()));
        registry
    }

    #[test]
    fn test_states_fill_only_unset() {
        let mut target = Model::with_id("t").with_state("a", 1);
        let source = Model::with_id("s").with_state("a", 2).with_state("b", 3);

        merge_source_states(&mut target, &source, Some("parent"));

        assert_eq!(target.id(), Some("t"));
        assert_eq!(target.context.as_deref(), Some("parent"));
        assert_eq!(target.state("a"), Some(&json!(1)));
        assert_eq!(target.state("b"), Some(&json!(3)));
    }

    #[test]
    fn test_null_state_is_overwritten() {
        let mut target = Model::with_id("t").with_state("a", StateValue::Null);
        let source = Model::with_id("s").with_state("a", "from source");

        merge_source_states(&mut target, &source, None);

        assert_eq!(target.state("a"), Some(&json!("from source")));
    }

    #[test]
    fn test_id_adopted_when_missing() {
        let mut target = Model::default();
        merge_source_states(&mut target, &Model::with_id("s"), None);
        assert_eq!(target.id(), Some("s"));
    }

    #[test]
    fn test_content_adopted_only_when_empty_or_outer() {
        let registry = Registry::new();
        let mut source = Model::with_id("s").with_text("<b>source</b>{{dd-connect=c1}}");
        source.content_data.index.insert("c1".into(), Model::with_id("c1"));

        let mut empty = Model::with_id("t");
        merge_source_model(&registry, &mut empty, &source, None);
        assert_eq!(empty.content_data.text, "<b>source</b>{{dd-connect=c1}}");
        assert!(empty.content_data.index.contains_key("c1"));

        let mut written = Model::with_id("t").with_text("own");
        merge_source_model(&registry, &mut written, &source, None);
        assert_eq!(written.content_data.text, "own");
        assert!(written.content_data.index.is_empty());

        let mut outer = Model::with_id("t").with_text("own");
        outer.content_data.has_outer = true;
        merge_source_model(&registry, &mut outer, &source, None);
        assert_eq!(outer.content_data.text, "<b>source</b>{{dd-connect=c1}}");
    }

    #[test]
    fn test_empty_source_content_keeps_target() {
        let registry = Registry::new();
        let mut target = Model::with_id("t").with_text("own");
        target.content_data.has_outer = true;
        merge_source_model(&registry, &mut target, &Model::with_id("s"), None);
        assert_eq!(target.content_data.text, "own");
    }

    #[test]
    fn test_list_components_merge_by_position() {
        let registry = Registry::new();
        let mut target = Model::with_id("t").with_component(
            "items",
            ModelSet::Many(vec![Model::with_id("i1").with_state("x", "keep")]),
        );
        let source = Model::with_id("s").with_component(
            "items",
            ModelSet::Many(vec![
                Model::with_id("s1").with_state("x", "src").with_state("y", "y1"),
                Model::with_id("s2").with_state("x", "second"),
            ]),
        );

        merge_source_model(&registry, &mut target, &source, None);

        let items = target.component_data["items"].as_slice();
        assert_eq!(items.len(), 2);
        assert_eq!(items[0].id(), Some("i1"));
        assert_eq!(items[0].state("x"), Some(&json!("keep")));
        assert_eq!(items[0].state("y"), Some(&json!("y1")));
        assert_eq!(items[1].id(), Some("s2"));
        assert_eq!(items[1].context.as_deref(), Some("t"));
        assert_eq!(items[1].state("x"), Some(&json!("second")));
    }

    #[test]
    fn test_stale_source_items_are_dropped_before_merge() {
        let registry = registry_with_source("old");
        let mut target = Model::with_id("t").with_component(
            "items",
            ModelSet::Many(vec![Model::with_id("old").with_text("stale")]),
        );
        let source = Model::with_id("s").with_component(
            "items",
            ModelSet::Many(vec![Model::with_id("s1").with_text("fresh")]),
        );

        merge_source_model(&registry, &mut target, &source, None);

        let items = target.component_data["items"].as_slice();
        assert_eq!(items.len(), 1);
        assert_eq!(items[0].id(), Some("s1"));
        assert_eq!(items[0].content_data.text, "fresh");
    }

    #[test]
    fn test_single_component_merge() {
        let registry = registry_with_source("src");
        let source = Model::with_id("s")
            .with_component("hd", ModelSet::Single(Model::with_id("h2").with_text("from source")));

        let mut own = Model::with_id("t")
            .with_component("hd", ModelSet::Single(Model::with_id("h1").with_state("k", "v")));
        merge_source_model(&registry, &mut own, &source, None);
        match &own.component_data["hd"] {
            ModelSet::Single(header) => {
                assert_eq!(header.id(), Some("h1"));
                assert_eq!(header.state("k"), Some(&json!("v")));
                assert_eq!(header.content_data.text, "from source");
            }
            other => panic!("Expected a single header, got {:?}", other),
        }

        let mut sourced = Model::with_id("t")
            .with_component("hd", ModelSet::Single(Model::with_id("src").with_text("stale")));
        merge_source_model(&registry, &mut sourced, &source, None);
        assert_eq!(
            sourced.component_data["hd"],
            ModelSet::Single(Model::with_id("h2").with_text("from source"))
        );

        let mut missing = Model::with_id("t");
        merge_source_model(&registry, &mut missing, &source, None);
        match &missing.component_data["hd"] {
            ModelSet::Single(header) => {
                assert_eq!(header.id(), Some("h2"));
                assert_eq!(header.context.as_deref(), Some("t"));
            }
            other => panic!("Expected a single header, got {:?}", other),
        }
    }

    #[test]
    fn test_list_source_applies_each_item() {
        let registry = Registry::new();
        let mut target = Model::with_id("t");
        let source = ModelSet::Many(vec![
            Model::with_id("a").with_state("k", 1),
            Model::with_id("b").with_state("k", 2).with_state("j", 3),
        ]);

        merge_source(&registry, &mut target, &source, None);

        assert_eq!(target.state("k"), Some(&json!(1)));
        assert_eq!(target.state("j"), Some(&json!(3)));
    }

    const SOURCED: &str = concat!(
        r#"<div class="source-data"><h1 level="2">The header A</h1></div>"#,
        r#"<x-folder mode="unfold">"#,
        r#"<hd source-selector=".source-data h1"></hd>"#,
        "<x-item>Apple</x-item>",
        "<p>Body text</p>",
        "</x-folder>",
    );

    fn sourced_folder() -> ComponentDefinition {
        folder_definition().contain_with("hd", |_| {
            let mut options = header_definition().options().clone();
            options.enable_source = true;
            Rc::new(ComponentDefinition::new(options).state("level", "level"))
        })
    }

    #[test]
    fn test_mount_merges_source_content() {
        let (mut engine, _guard, _node) = mount_folder(sourced_folder(), SOURCED);

        let output = generated_markup(&mut engine, "_brightRoot_1").expect("No output");
        assert!(output.contains(r#"<h1 dd-autogen="true" id="_brightRoot_2">The header A</h1>"#));

        let header = engine.registry().model("_brightRoot_2").expect("No header snapshot");
        assert_eq!(state_str(header, "level"), "2");
        assert_eq!(state_str(header, "source"), ".source-data h1");
        assert_eq!(header.context.as_deref(), Some("_brightRoot_1"));

        let source_guard = engine.registry().guard("_brightRoot_3").expect("No source guard");
        assert!(source_guard.is_source());
        // source nodes carry no connect attribute
        let h1 = engine.document().query(".source-data h1").expect("No source node");
        assert_eq!(engine.id_of(h1), None);
    }

    #[test]
    fn test_fed_source_replaces_scanned_source() {
        let (mut engine, _guard, node) = mount_folder(sourced_folder(), SOURCED);
        let hd = engine.document().query("hd").expect("No header");

        engine
            .feed_source(hd, |mut model| {
                assert_eq!(model.content_data.text, "The header A");
                model.content_data.text = "The header B".into();
                model
            })
            .expect("Failed to feed source");
        engine.update_node(node).expect("Failed to update");

        let output = generated_markup(&mut engine, "_brightRoot_1").expect("No output");
        assert!(output.contains(r#"<h1 dd-autogen="true" id="_brightRoot_2">The header B</h1>"#));
        assert_eq!(engine.document().events_named("darkdom:willUpdate"), vec![hd]);
    }

    #[test]
    fn test_feed_source_builds_on_previous_feed() {
        let (mut engine, _guard, node) = mount_folder(sourced_folder(), SOURCED);
        let hd = engine.document().query("hd").expect("No header");

        engine
            .feed_source(hd, |mut model| {
                model.content_data.text = "First".into();
                model
            })
            .expect("Failed to feed source");
        engine
            .feed_source(hd, |mut model| {
                assert_eq!(model.content_data.text, "First");
                model.state.insert("level".into(), json!("3"));
                model
            })
            .expect("Failed to feed source");
        engine.update_node(node).expect("Failed to update");

        let header = engine.registry().model("_brightRoot_2").expect("No header snapshot");
        assert_eq!(header.content_data.text, "First");
        // the watched node has no level, so the fed one fills it
        assert_eq!(state_str(header, "level"), "3");
    }

    #[test]
    fn test_feed_without_selector_creates_source() {
        let markup = SOURCED.replace(r#" source-selector=".source-data h1""#, "");
        let (mut engine, _guard, node) = mount_folder(sourced_folder(), &markup);
        let hd = engine.document().query("hd").expect("No header");

        engine
            .feed_source(hd, |model| {
                assert_eq!(model, Model::default());
                model.with_text("Fed header")
            })
            .expect("Failed to feed source");
        engine.update_node(node).expect("Failed to update");

        let output = generated_markup(&mut engine, "_brightRoot_1").expect("No output");
        assert!(output.contains(r#"<h1 dd-autogen="true" id="_brightRoot_2">Fed header</h1>"#));
        assert!(engine.registry().has_source("_brightRoot_2"));
    }

    const BOX: &str = concat!(
        r#"<div class="src"><i a="1"></i><i b="2"></i></div>"#,
        r#"<x-box source-selector=".src i"></x-box>"#,
    );

    fn box_definition(calls: &Calls) -> ComponentDefinition {
        let options = ComponentOptions {
            enable_source: true,
            ..Default::default()
        };
        ComponentDefinition::new(options)
            .state("a", "a")
            .state("b", "b")
            .response(
                Subject::kind(UpdateKind::State),
                record(calls, "box", UpdateOutcome::Continue),
            )
    }

    fn mount_box(
        definition: ComponentDefinition,
        markup: &str,
    ) -> (Engine<MemoryDocument>, NodeId) {
        init_tracing();
        let doc = MemoryDocument::parse(markup).expect("Failed to parse fixture");
        let mut engine = Engine::new(doc).expect("Failed to create engine");
        let guard = Rc::new(definition).create_guard();
        engine.watch(&guard, "x-box");
        engine.mount(&guard).expect("Failed to mount");
        let node = engine.document().query("x-box").expect("No box");
        (engine, node)
    }

    #[test]
    fn test_states_only_refresh_merges_every_source_item() {
        let calls = Calls::default();
        let (mut engine, node) = mount_box(box_definition(&calls), BOX);

        let snapshot = engine.registry().model("_brightRoot_1").expect("No snapshot");
        assert_eq!(state_str(snapshot, "a"), "1");
        assert_eq!(state_str(snapshot, "b"), "2");

        engine.update_states(node).expect("Failed to update states");
        assert!(calls.borrow().is_empty());
        let snapshot = engine.registry().model("_brightRoot_1").expect("No snapshot");
        assert_eq!(state_str(snapshot, "a"), "1");
        assert_eq!(state_str(snapshot, "b"), "2");

        engine.update_node(node).expect("Failed to update");
        assert!(calls.borrow().is_empty());
    }

    #[test]
    fn test_states_only_refresh_sees_source_changes() {
        let calls = Calls::default();
        let (mut engine, node) = mount_box(box_definition(&calls), BOX);
        let second = engine.document().select(None, ".src i")[1];

        engine.document_mut().set_attr(second, "b", "3");
        engine.update_states(node).expect("Failed to update states");

        assert_eq!(*calls.borrow(), vec!["box:state:b"]);
        let snapshot = engine.registry().model("_brightRoot_1").expect("No snapshot");
        assert_eq!(state_str(snapshot, "a"), "1");
        assert_eq!(state_str(snapshot, "b"), "3");
    }

    #[test]
    fn test_own_state_shadows_source_on_states_only_refresh() {
        let calls = Calls::default();
        let markup = BOX.replace("<x-box ", r#"<x-box b="own" "#);
        let (mut engine, node) = mount_box(box_definition(&calls), &markup);
        let second = engine.document().select(None, ".src i")[1];

        engine.document_mut().set_attr(second, "b", "3");
        engine.update_states(node).expect("Failed to update states");

        assert!(calls.borrow().is_empty());
        let snapshot = engine.registry().model("_brightRoot_1").expect("No snapshot");
        assert_eq!(state_str(snapshot, "b"), "own");
    }

    const EMPHASIS: &str = concat!(
        r#"<div class="src"><em class="k">Hi <b>there</b></em></div>"#,
        r#"<x-box source-selector=".src em"></x-box>"#,
    );

    #[test]
    fn test_source_children_become_content() {
        let options = ComponentOptions {
            enable_source: true,
            ..Default::default()
        };
        let (mut engine, _node) = mount_box(ComponentDefinition::new(options), EMPHASIS);

        let snapshot = engine.registry().model("_brightRoot_1").expect("No snapshot");
        assert_eq!(snapshot.content_data.text, "Hi <b>there</b>");
        assert_eq!(
            generated_markup(&mut engine, "_brightRoot_1").as_deref(),
            Some(r#"<span dd-autogen="true" id="_brightRoot_1">Hi <b>there</b></span>"#)
        );
    }

    #[test]
    fn test_source_as_content_takes_the_whole_source_node() {
        let options = ComponentOptions {
            enable_source: true,
            source_as_content: true,
            ..Default::default()
        };
        let (mut engine, node) = mount_box(ComponentDefinition::new(options), EMPHASIS);

        let snapshot = engine.registry().model("_brightRoot_1").expect("No snapshot");
        assert_eq!(snapshot.content_data.text, r#"<em class="k">Hi <b>there</b></em>"#);
        assert!(!snapshot.content_data.has_outer);
        assert_eq!(
            generated_markup(&mut engine, "_brightRoot_1").as_deref(),
            Some(concat!(
                r#"<span dd-autogen="true" id="_brightRoot_1">"#,
                r#"<em class="k">Hi <b>there</b></em>"#,
                "</span>",
            ))
        );

        // the source node is scanned as one block and stays unmarked
        let em = engine.document().query(".src em").expect("No source node");
        assert_eq!(engine.id_of(em), None);
        engine.update_node(node).expect("Failed to update");
        assert!(engine.document().events_named("darkdom:willUpdate").is_empty());
    }
}
