use governor_core::{
    parse_event_at, EventRepository, JsonEventRepository, NewEvent, RepoError,
};
use std::collections::HashSet;
use std::sync::Arc;
use std::thread;

fn standup(title: &str) -> NewEvent {
    NewEvent::new(title, parse_event_at("2025.03.10", "09.30").unwrap())
}

fn sorted_ids(repo: &JsonEventRepository) -> Vec<String> {
    let mut ids: Vec<String> = repo.list().into_iter().map(|event| event.id).collect();
    ids.sort();
    ids
}

#[test]
fn add_assigns_monotonic_ids_even_after_delete() {
    let dir = tempfile::tempdir().unwrap();
    let repo = JsonEventRepository::open(dir.path().join("events.json")).unwrap();

    assert_eq!(repo.add(standup("one")).unwrap(), "ev1");
    assert_eq!(repo.add(standup("two")).unwrap(), "ev2");
    assert!(repo.delete("ev2"));
    assert_eq!(repo.add(standup("three")).unwrap(), "ev3");
    assert_eq!(sorted_ids(&repo), vec!["ev1", "ev3"]);
}

#[test]
fn get_returns_stored_fields_and_none_for_unknown() {
    let repo = JsonEventRepository::in_memory();
    assert!(repo.path().is_none());
    let mut event = standup("Standup");
    event.location = "Room 1".to_string();
    event.notes = "bring coffee".to_string();
    let id = repo.add(event.clone()).unwrap();

    let loaded = repo.get(&id).unwrap();
    assert_eq!(loaded.id, id);
    assert_eq!(loaded.title, "Standup");
    assert_eq!(loaded.at, event.at);
    assert_eq!(loaded.location, "Room 1");
    assert_eq!(loaded.notes, "bring coffee");
    assert!(repo.get("ev99").is_none());
}

#[test]
fn reload_restores_same_events_and_counter() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("events.json");

    let repo = JsonEventRepository::open(&path).unwrap();
    repo.add(standup("one")).unwrap();
    repo.add(standup("two")).unwrap();
    repo.add(standup("three")).unwrap();
    repo.delete("ev2");
    let mut before = repo.list();
    before.sort_by(|a, b| a.id.cmp(&b.id));

    let reopened = JsonEventRepository::open(&path).unwrap();
    let mut after = reopened.list();
    after.sort_by(|a, b| a.id.cmp(&b.id));

    assert_eq!(before, after);
    assert_eq!(reopened.next_id(), 4);
    assert_eq!(reopened.add(standup("four")).unwrap(), "ev4");
}

#[test]
fn load_sets_counter_past_highest_suffix() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("events.json");
    std::fs::write(
        &path,
        r#"[
  {"ID": "ev3", "Title": "a", "At": "2025-03-10T09:30:00+00:00", "Location": "", "Notes": ""},
  {"ID": "ev10", "Title": "b", "At": "2025-03-11T09:30:00+00:00"},
  {"ID": "imported", "Title": "c", "At": "2025-03-12T09:30:00+00:00", "Location": "x", "Notes": "y", "VisibleFrom": "2025-03-01"}
]"#,
    )
    .unwrap();

    let repo = JsonEventRepository::open(&path).unwrap();
    assert_eq!(repo.len(), 3);
    assert_eq!(repo.get("ev10").unwrap().location, "");
    assert!(repo.get("imported").unwrap().visible_from.is_some());
    assert_eq!(repo.add(standup("next")).unwrap(), "ev11");
}

#[test]
fn missing_file_is_empty_and_malformed_file_fails() {
    let dir = tempfile::tempdir().unwrap();
    let repo = JsonEventRepository::open(dir.path().join("absent.json")).unwrap();
    assert!(repo.is_empty());
    assert_eq!(repo.next_id(), 1);

    let bad = dir.path().join("bad.json");
    std::fs::write(&bad, "{ not json").unwrap();
    let err = JsonEventRepository::open(&bad).err().expect("malformed file must fail");
    assert!(matches!(err, RepoError::Corrupt { .. }));
}

#[test]
fn persisted_file_uses_capitalized_field_names() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("events.json");
    let repo = JsonEventRepository::open(&path).unwrap();
    repo.add(standup("Standup")).unwrap();

    let content = std::fs::read_to_string(&path).unwrap();
    for key in ["\"ID\"", "\"Title\"", "\"At\"", "\"Location\"", "\"Notes\""] {
        assert!(content.contains(key), "missing {key} in {content}");
    }
    assert!(!content.contains("VisibleFrom"));
}

#[test]
fn failed_add_persist_rolls_back_insertion() {
    let dir = tempfile::tempdir().unwrap();
    let data_dir = dir.path().join("data");
    std::fs::create_dir(&data_dir).unwrap();
    let repo = JsonEventRepository::open(data_dir.join("events.json")).unwrap();
    repo.add(standup("kept")).unwrap();

    std::fs::remove_dir_all(&data_dir).unwrap();
    let err = repo.add(standup("lost")).unwrap_err();
    assert!(matches!(err, RepoError::Io { .. }));
    assert_eq!(sorted_ids(&repo), vec!["ev1"]);
    assert!(repo.get("ev2").is_none());

    std::fs::create_dir(&data_dir).unwrap();
    let id = repo.add(standup("after")).unwrap();
    assert_eq!(id, "ev3");
}

#[test]
fn failed_delete_persist_keeps_removal() {
    let dir = tempfile::tempdir().unwrap();
    let data_dir = dir.path().join("data");
    std::fs::create_dir(&data_dir).unwrap();
    let repo = JsonEventRepository::open(data_dir.join("events.json")).unwrap();
    repo.add(standup("doomed")).unwrap();

    std::fs::remove_dir_all(&data_dir).unwrap();
    assert!(repo.delete("ev1"));
    assert!(repo.get("ev1").is_none());
    assert!(repo.is_empty());
}

#[test]
fn delete_unknown_id_leaves_repository_unchanged() {
    let repo = JsonEventRepository::in_memory();
    repo.add(standup("one")).unwrap();

    assert!(!repo.delete("ev7"));
    assert!(repo.delete("ev1"));
    assert!(!repo.delete("ev1"));
    assert!(repo.is_empty());
    assert_eq!(repo.next_id(), 2);
}

#[test]
fn concurrent_adds_get_distinct_ids_and_all_reach_disk() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("events.json");
    let repo = Arc::new(JsonEventRepository::open(&path).unwrap());

    let handles: Vec<_> = (0..8)
        .map(|worker| {
            let repo = Arc::clone(&repo);
            thread::spawn(move || {
                (0..10)
                    .map(|n| repo.add(standup(&format!("w{worker}-{n}"))).unwrap())
                    .collect::<Vec<_>>()
            })
        })
        .collect();

    let ids: HashSet<String> = handles
        .into_iter()
        .flat_map(|handle| handle.join().unwrap())
        .collect();
    assert_eq!(ids.len(), 80);

    let reopened = JsonEventRepository::open(&path).unwrap();
    assert_eq!(reopened.len(), 80);
    assert_eq!(reopened.next_id(), 81);
}

#[test]
fn deleted_latest_id_is_not_reissued_after_restart() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("events.json");

    let repo = JsonEventRepository::open(&path).unwrap();
    repo.add(standup("a")).unwrap();
    repo.add(standup("b")).unwrap();
    assert!(repo.delete("ev2"));
    drop(repo);

    let reopened = JsonEventRepository::open(&path).unwrap();
    assert_eq!(reopened.path(), Some(path.as_path()));
    assert_eq!(reopened.next_id(), 3);
    assert_eq!(reopened.add(standup("c")).unwrap(), "ev3");
    assert!(dir.path().join("events.json.seq").exists());
}

#[test]
fn counter_sidecar_ahead_of_event_file_wins() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("events.json");
    std::fs::write(
        &path,
        r#"[{"ID": "ev1", "Title": "a", "At": "2025-03-10T09:30:00+00:00"}]"#,
    )
    .unwrap();
    std::fs::write(dir.path().join("events.json.seq"), r#"{"NextId": 9}"#).unwrap();

    let repo = JsonEventRepository::open(&path).unwrap();
    assert_eq!(repo.add(standup("next")).unwrap(), "ev9");
}

#[test]
fn malformed_counter_sidecar_fails_open() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("events.json");
    std::fs::write(dir.path().join("events.json.seq"), "nine").unwrap();

    let err = JsonEventRepository::open(&path).err().expect("bad sidecar must fail");
    assert!(matches!(err, RepoError::Corrupt { .. }));
}

#[test]
fn maximal_id_suffix_exhausts_counter_instead_of_overflowing() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("events.json");
    std::fs::write(
        &path,
        r#"[{"ID": "ev18446744073709551615", "Title": "edge", "At": "2025-03-10T09:30:00+00:00"}]"#,
    )
    .unwrap();

    let repo = JsonEventRepository::open(&path).unwrap();
    assert_eq!(repo.next_id(), u64::MAX);
    let err = repo.add(standup("one too many")).unwrap_err();
    assert!(matches!(err, RepoError::IdsExhausted));
    assert_eq!(repo.len(), 1);
}
