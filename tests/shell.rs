mod common;

use std::sync::Arc;

use common::*;
use edudav::shell::ShellState;
use edudav::vfs::VirtualPath;

fn shell(backend: &Arc<FakeBackend>) -> ShellState {
    let teacher = session("u1", &[]);
    ShellState::new(Arc::new(table(backend)), ctx(&teacher))
}

#[tokio::test]
async fn test_put_then_get_round_trips_through_backend() {
    let backend = course_fixture();
    let mut state = shell(&backend);
    let dir = tempfile::tempdir().unwrap();
    let local = dir.path().join("notes.txt");
    let fetched = dir.path().join("fetched.txt");
    std::fs::write(&local, b"photosynthesis").unwrap();

    state.execute("cd /courses/Biology/sub").await.unwrap();
    assert_eq!(state.cwd(), &VirtualPath::parse("/courses/Biology/sub"));

    state
        .execute(&format!("put '{}'", local.display()))
        .await
        .unwrap();
    let stored = backend.find_by_name("notes.txt").unwrap();
    assert_eq!(stored.parent.as_deref(), Some("d-sub"));

    state
        .execute(&format!("get notes.txt '{}'", fetched.display()))
        .await
        .unwrap();
    assert_eq!(std::fs::read(&fetched).unwrap(), b"photosynthesis");
}

#[tokio::test]
async fn test_cd_into_file_fails() {
    let backend = course_fixture();
    let mut state = shell(&backend);

    assert!(state.execute("cd /courses/Biology/old.txt").await.is_err());
    assert!(state.execute("cd /courses/Nowhere").await.is_err());
    assert_eq!(state.cwd(), &VirtualPath::root());
}

#[tokio::test]
async fn test_edit_commands() {
    let backend = course_fixture();
    let mut state = shell(&backend);

    state.execute("cd /courses/Biology").await.unwrap();
    state.execute("mkdir labs").await.unwrap();
    state.execute("touch labs/plan.txt").await.unwrap();
    state.execute("mv old.txt archive.txt").await.unwrap();
    assert_eq!(backend.object("f-old").unwrap().name, "archive.txt");

    state.execute("rm labs/plan.txt").await.unwrap();
    assert!(backend.find_by_name("plan.txt").is_none());

    // the current directory cannot be removed from inside itself
    assert!(state.execute("rm /courses/Biology").await.is_err());
    assert!(state.execute("ls -l").await.is_ok());
}

#[tokio::test]
async fn test_listing_feeds_completion() {
    let backend = course_fixture();
    let mut state = shell(&backend);

    state.execute("ls /courses").await.unwrap();
    let entries = state
        .completion_cache()
        .get_entries("/courses")
        .unwrap();
    let names: Vec<&str> = entries.iter().map(|e| e.name.as_str()).collect();
    assert_eq!(names, vec!["Biology", "Chemistry"]);
    assert!(entries.iter().all(|e| e.is_dir));
}

#[tokio::test]
async fn test_unknown_command() {
    let backend = course_fixture();
    let mut state = shell(&backend);

    let err = state.execute("frobnicate").await.unwrap_err();
    assert!(err.to_string().contains("Unknown command"));
    assert!(state.execute("exit").await.is_err());
}
