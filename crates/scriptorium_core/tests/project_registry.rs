mod common;

use common::{event_names, FakeProjectManager};
use scriptorium_core::{
    CoreEvent, HubError, ProjectRegistry, ProjectTemplate, SqliteProjectManager,
};
use std::path::{Path, PathBuf};

#[test]
fn active_project_heals_against_the_open_list() {
    let mut registry = ProjectRegistry::new(FakeProjectManager::with_projects(&[3, 7]));

    registry.set_active_project(Some(9));
    assert_eq!(registry.active_project(), Some(3));

    registry.set_active_project(Some(7));
    assert_eq!(registry.active_project(), Some(7));
    assert!(registry.is_active(7));

    registry.close(7).unwrap();
    assert_eq!(registry.active_project(), Some(3));

    registry.close(3).unwrap();
    assert_eq!(registry.active_project(), None);
}

#[test]
fn only_open_project_is_always_active() {
    let registry = ProjectRegistry::new(FakeProjectManager::with_projects(&[7]));

    registry.set_active_project(None);

    assert_eq!(registry.active_project(), Some(7));
}

#[test]
fn project_is_never_both_unmodified_and_unsaved() {
    let mut registry = ProjectRegistry::new(FakeProjectManager::default());
    let project_id = registry.create(ProjectTemplate::Empty, None).unwrap();

    assert!(registry.is_not_modified_once(project_id));
    assert!(registry.is_project_saved(project_id));

    registry.set_project_name(project_id, "Novel").unwrap();
    assert!(!registry.is_not_modified_once(project_id));
    assert!(!registry.is_project_saved(project_id));
    assert_eq!(registry.projects_not_saved(), &[project_id]);
    assert_eq!(registry.project_name(project_id), "Novel");

    registry
        .save_as(project_id, "sqlite", Path::new("/tmp/novel.sqlite"))
        .unwrap();
    assert!(registry.is_project_saved(project_id));
    assert!(!registry.is_not_modified_once(project_id));
    assert!(registry.projects_not_modified_once().is_empty());
}

#[test]
fn saving_without_path_fails_and_broadcasts_the_error() {
    let mut registry = ProjectRegistry::new(FakeProjectManager::default());
    let project_id = registry.create(ProjectTemplate::Empty, None).unwrap();
    let events = registry.events().subscribe();

    let err = registry.save(project_id).unwrap_err();

    assert!(matches!(err, HubError::NoPath(id) if id == project_id));
    assert_eq!(err.code(), "path_dont_exist");
    let received: Vec<CoreEvent> = events.try_iter().collect();
    assert!(matches!(
        received.as_slice(),
        [CoreEvent::Error { code, project_id: Some(id), .. }]
            if code == "path_dont_exist" && *id == project_id
    ));
}

#[test]
fn close_all_stops_at_the_first_refusal() {
    let manager = FakeProjectManager::with_projects(&[3, 7, 8]).failing_close(7);
    let mut registry = ProjectRegistry::new(manager);
    let events = registry.events().subscribe();

    let err = registry.close_all().unwrap_err();

    assert_eq!(err.code(), "project_manager_failed");
    assert_eq!(registry.project_ids(), vec![7, 8]);
    assert!(!registry.is_project_to_be_closed(7));
    let names = event_names(&events);
    assert!(names.contains(&"project_closed".to_string()));
    assert!(!names.contains(&"all_projects_closed".to_string()));
}

#[test]
fn close_announces_before_and_after() {
    let mut registry = ProjectRegistry::new(FakeProjectManager::with_projects(&[1]));
    let events = registry.events().subscribe();

    registry.close(1).unwrap();

    assert_eq!(
        event_names(&events),
        vec![
            "project_to_be_closed",
            "project_closed",
            "project_count_changed",
        ]
    );
    assert_eq!(registry.project_count(), 0);
}

#[test]
fn opening_a_project_announces_it_and_makes_it_active() {
    let mut registry = ProjectRegistry::new(FakeProjectManager::with_projects(&[0]));
    let events = registry.events().subscribe();

    let project_id = registry.open(Path::new("/tmp/novel.sqlite")).unwrap();

    assert_eq!(registry.active_project(), Some(project_id));
    assert_eq!(registry.last_loaded(), Some(project_id));
    assert!(registry.is_not_modified_once(project_id));
    assert!(registry.is_url_already_loaded(Path::new("/tmp/novel.sqlite")));
    assert_eq!(
        event_names(&events),
        vec![
            "project_loaded",
            "project_count_changed",
            "active_project_changed",
        ]
    );
}

#[test]
fn saving_a_backup_elsewhere_demotes_it() {
    let mut registry = ProjectRegistry::new(FakeProjectManager::default());
    let project_id = registry
        .open(Path::new("/tmp/novel_2024-03-01-093000.sqlite"))
        .unwrap();
    assert!(registry.is_backup(project_id));
    let events = registry.events().subscribe();

    registry
        .save_as(project_id, "sqlite", Path::new("/tmp/novel.sqlite"))
        .unwrap();

    assert!(!registry.is_backup(project_id));
    let received: Vec<CoreEvent> = events.try_iter().collect();
    assert!(received.contains(&CoreEvent::ProjectIsBackupChanged {
        project_id,
        is_backup: false,
    }));
    assert!(received.contains(&CoreEvent::ProjectPathChanged {
        project_id,
        path: Some(PathBuf::from("/tmp/novel.sqlite")),
    }));
}

#[test]
fn failed_reads_leave_a_last_error() {
    let registry = ProjectRegistry::new(FakeProjectManager::with_projects(&[0]));

    assert_eq!(registry.path(99), None);
    assert_eq!(registry.project_type(99), "");

    let last = registry.last_error().unwrap();
    assert_eq!(last.code, "project_not_found");
    assert_eq!(last.project_id, Some(99));

    registry.clear_last_error();
    assert_eq!(registry.path(0), None);
    assert!(registry.last_error().is_none());
}

#[test]
fn starter_template_seeds_a_root_and_a_chapter() {
    let mut registry = ProjectRegistry::new(FakeProjectManager::default());
    let project_id = registry.create(ProjectTemplate::Starter, None).unwrap();

    let cache = registry.tree().load_cache(project_id).unwrap();

    assert_eq!(cache.len(), 2);
    assert!(cache.items()[0].is_project_root());
    assert_eq!(cache.children_count(0).unwrap(), 1);
    assert!(registry.is_not_modified_once(project_id));
}

#[test]
fn sqlite_projects_round_trip_through_disk() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("novel.sqlite");

    let mut registry = ProjectRegistry::new(SqliteProjectManager::new());
    let created = registry
        .create(ProjectTemplate::Starter, Some(&path))
        .unwrap();
    let unique_id = registry.unique_id(created);
    assert!(!unique_id.is_empty());
    registry.set_lang_code(created, "en_US").unwrap();
    registry.save(created).unwrap();
    registry.close(created).unwrap();

    let reopened = registry.open(&path).unwrap();
    assert_eq!(registry.lang_code(reopened), "en_US");
    assert_eq!(registry.unique_id(reopened), unique_id);
    assert_eq!(registry.path(reopened), Some(path));
}

#[test]
fn sqlite_manager_rejects_unusable_paths() {
    let dir = tempfile::tempdir().unwrap();
    let file = dir.path().join("plain.txt");
    std::fs::write(&file, "not a directory").unwrap();

    let mut registry = ProjectRegistry::new(SqliteProjectManager::new());
    let project_id = registry.create(ProjectTemplate::Empty, None).unwrap();

    let missing_dir = dir.path().join("missing").join("novel.sqlite");
    let err = registry
        .save_as(project_id, "sqlite", &missing_dir)
        .unwrap_err();
    assert_eq!(err.code(), "path_dont_exist");

    let under_file = file.join("novel.sqlite");
    let err = registry
        .save_as(project_id, "sqlite", &under_file)
        .unwrap_err();
    assert_eq!(err.code(), "path_not_a_directory");

    let err = registry.open(&dir.path().join("absent.sqlite")).unwrap_err();
    assert_eq!(err.code(), "path_dont_exist");
    assert_eq!(registry.project_count(), 1);
}

#[test]
fn failed_first_save_closes_the_created_project() {
    let dir = tempfile::tempdir().unwrap();
    let target = dir.path().join("missing").join("novel.sqlite");
    let mut registry = ProjectRegistry::new(SqliteProjectManager::new());

    let err = registry
        .create(ProjectTemplate::Starter, Some(&target))
        .unwrap_err();

    assert_eq!(err.code(), "path_dont_exist");
    assert_eq!(registry.project_count(), 0);
    assert!(registry.projects_not_modified_once().is_empty());
    assert_eq!(registry.active_project(), None);
}

#[test]
fn save_as_on_unknown_project_reports_once_without_last_error() {
    let mut registry = ProjectRegistry::new(FakeProjectManager::with_projects(&[0]));
    let events = registry.events().subscribe();

    let err = registry
        .save_as(9, "sqlite", Path::new("/tmp/novel.sqlite"))
        .unwrap_err();

    assert_eq!(err.code(), "project_not_found");
    assert!(registry.last_error().is_none());
    assert_eq!(event_names(&events), vec!["error"]);
}
