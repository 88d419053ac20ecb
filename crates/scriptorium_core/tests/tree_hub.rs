mod common;

use common::{event_names, FakeProjectManager};
use scriptorium_core::{
    CoreEvent, FieldValue, ItemRole, ProjectId, ProjectRegistry, ProjectTemplate, TreeField,
    WordMeter,
};

fn starter() -> (ProjectRegistry<FakeProjectManager>, ProjectId) {
    let mut registry = ProjectRegistry::new(FakeProjectManager::default());
    let project_id = registry.create(ProjectTemplate::Starter, None).unwrap();
    (registry, project_id)
}

#[test]
fn added_items_land_at_the_end_of_the_document() {
    let (mut registry, project_id) = starter();
    let events = registry.events().subscribe();

    let item_id = registry.tree().add_item(project_id, 1, "Chapter 2").unwrap();

    let cache = registry.tree().load_cache(project_id).unwrap();
    assert_eq!(cache.len(), 3);
    assert_eq!(cache.position(item_id), Some(2));
    assert_eq!(cache.children_count(0).unwrap(), 2);
    assert_eq!(
        event_names(&events),
        vec!["item_added", "project_not_saved_anymore", "project_modified"]
    );
}

#[test]
fn field_write_refreshes_the_supplied_cache() {
    let (mut registry, project_id) = starter();
    let mut tree = registry.tree();
    let mut cache = tree.load_cache(project_id).unwrap();
    let item_id = cache.items()[1].item_id();
    assert_eq!(
        tree.cached_field(&mut cache, 1, ItemRole::Name).unwrap(),
        FieldValue::from("Chapter 1")
    );

    tree.set_item_field(
        project_id,
        item_id,
        TreeField::Title,
        FieldValue::from("Opening"),
        Some(&mut cache),
    )
    .unwrap();

    assert_eq!(
        tree.cached_field(&mut cache, 1, ItemRole::Name).unwrap(),
        FieldValue::from("Opening")
    );
}

#[test]
fn indent_write_rebuilds_the_structure() {
    let (mut registry, project_id) = starter();
    let mut tree = registry.tree();
    let mut cache = tree.load_cache(project_id).unwrap();
    let item_id = cache.items()[1].item_id();

    tree.set_item_field(
        project_id,
        item_id,
        TreeField::Indent,
        FieldValue::Integer(0),
        Some(&mut cache),
    )
    .unwrap();

    assert_eq!(cache.children_count(0).unwrap(), 0);
    assert_eq!(cache.parent(1).unwrap(), None);
}

#[test]
fn mismatched_value_is_rejected_without_events() {
    let (mut registry, project_id) = starter();
    let item_id = registry.tree().load_cache(project_id).unwrap().items()[1].item_id();
    let events = registry.events().subscribe();

    let err = registry
        .tree()
        .set_item_field(
            project_id,
            item_id,
            TreeField::WordCount,
            FieldValue::from("many"),
            None,
        )
        .unwrap_err();

    assert_eq!(err.code(), "type_mismatch");
    assert_eq!(event_names(&events), vec!["error"]);
    assert!(registry.is_not_modified_once(project_id));
}

#[test]
fn field_change_event_carries_the_role() {
    let (mut registry, project_id) = starter();
    let item_id = registry.tree().load_cache(project_id).unwrap().items()[0].item_id();
    let events = registry.events().subscribe();

    registry
        .tree()
        .set_item_field(project_id, item_id, TreeField::Label, FieldValue::from("todo"), None)
        .unwrap();

    assert_eq!(
        events.try_iter().next(),
        Some(CoreEvent::ItemFieldChanged {
            project_id,
            item_id,
            role: Some(ItemRole::Label),
        })
    );
}

#[test]
fn word_counts_flow_back_into_the_tree() {
    let (mut registry, project_id) = starter();
    let mut tree = registry.tree();
    let mut cache = tree.load_cache(project_id).unwrap();
    let item_id = cache.items()[1].item_id();
    tree.set_item_field(
        project_id,
        item_id,
        TreeField::Content,
        FieldValue::from("# Night\n\nThe **rain** fell."),
        None,
    )
    .unwrap();
    assert_eq!(
        tree.cached_field(&mut cache, 1, ItemRole::WordCount).unwrap(),
        FieldValue::Integer(0)
    );

    let mut meter = WordMeter::new();
    tree.count_text(&mut meter, project_id, item_id, false, true)
        .unwrap();
    let reports = meter.wait_idle();
    assert_eq!(reports.len(), 1);
    tree.apply_counts(&reports[0], Some(&mut cache)).unwrap();

    assert_eq!(
        tree.cached_field(&mut cache, 1, ItemRole::WordCount).unwrap(),
        FieldValue::Integer(4)
    );
    assert_eq!(
        tree.item_field(project_id, item_id, TreeField::CharCount)
            .unwrap()
            .as_integer(),
        Some(reports[0].counts.characters)
    );
}

#[test]
fn index_past_the_end_is_reported() {
    let (mut registry, project_id) = starter();
    let tree = registry.tree();
    let mut cache = tree.load_cache(project_id).unwrap();

    let err = tree
        .cached_field(&mut cache, 5, ItemRole::Name)
        .unwrap_err();

    assert_eq!(err.code(), "index_out_of_range");
}

#[test]
fn project_root_write_refreshes_the_supplied_cache() {
    let (mut registry, project_id) = starter();
    let mut tree = registry.tree();
    let mut cache = tree.load_cache(project_id).unwrap();
    let item_id = cache.items()[1].item_id();
    assert!(!cache.items()[1].is_project_root());

    tree.set_item_field(
        project_id,
        item_id,
        TreeField::ProjectRoot,
        FieldValue::Bool(true),
        Some(&mut cache),
    )
    .unwrap();

    assert!(cache.items()[1].is_project_root());
}

#[test]
fn committed_write_marks_the_project_modified_even_if_rebuild_fails() {
    let (mut registry, project_id) = starter();
    let mut cache = registry.tree().load_cache(project_id).unwrap();
    let root_id = cache.items()[0].item_id();
    let chapter_id = cache.items()[1].item_id();
    registry
        .connection(project_id)
        .unwrap()
        .execute(
            "UPDATE tbl_tree SET l_indent = 'deep' WHERE l_tree_id = ?1;",
            [root_id],
        )
        .unwrap();
    let events = registry.events().subscribe();

    let err = registry
        .tree()
        .set_item_field(
            project_id,
            chapter_id,
            TreeField::SortOrder,
            FieldValue::Integer(5000),
            Some(&mut cache),
        )
        .unwrap_err();

    assert_eq!(err.code(), "type_mismatch");
    assert!(!registry.is_project_saved(project_id));
    assert_eq!(
        registry
            .tree()
            .item_field(project_id, chapter_id, TreeField::SortOrder)
            .unwrap(),
        FieldValue::Integer(5000)
    );
    let names = event_names(&events);
    assert_eq!(names[0], "item_field_changed");
    assert!(names.contains(&"project_modified".to_string()));
}
