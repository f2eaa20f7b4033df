//! Integration tests for the Git storage layout.
//!
//! These tests check what branchfs writes with an independent reader
//! (raw `git2`), and that repositories created by other tools can be
//! mounted and read.

use std::collections::BTreeMap;
use std::path::Path;

use tempfile::TempDir;

use branchfs::core::config::Config;
use branchfs::core::paths::repository_dir;
use branchfs::core::types::{RepoName, SessionInfo};
use branchfs::engine::CommitRequest;
use branchfs::Provider;

// =============================================================================
// Test Helpers
// =============================================================================

fn provider(root: &Path) -> Provider {
    Provider::new(Config::default().with_root(root)).expect("provider")
}

fn session() -> SessionInfo {
    SessionInfo::new("alice")
        .unwrap()
        .with_id("tab-1")
        .unwrap()
}

/// Create `<root>/<name>.git` with one commit on `main`, the way another
/// Git tool would.
fn foreign_repo(root: &Path, name: &str) -> git2::Oid {
    let repo = git2::Repository::init_bare(root.join(format!("{}.git", name))).unwrap();
    let blob = repo.blob(b"# Existing\n").unwrap();

    let mut docs = repo.treebuilder(None).unwrap();
    docs.insert("readme.md", blob, 0o100644).unwrap();
    let docs = docs.write().unwrap();

    let mut root_tree = repo.treebuilder(None).unwrap();
    root_tree.insert("docs", docs, 0o040000).unwrap();
    let tree = repo.find_tree(root_tree.write().unwrap()).unwrap();

    let sig = git2::Signature::new("Other Tool", "other@example.com", &git2::Time::new(1_700_000_000, 0))
        .unwrap();
    repo.commit(Some("refs/heads/main"), &sig, &sig, "Import", &tree, &[])
        .unwrap()
}

// =============================================================================
// Layout
// =============================================================================

#[test]
fn created_repository_is_bare_with_default_branch() {
    let temp = TempDir::new().unwrap();
    let provider = provider(temp.path());
    provider
        .create_repository(&RepoName::new("bpmn").unwrap(), session())
        .unwrap();

    let dir = repository_dir(temp.path(), &RepoName::new("bpmn").unwrap());
    let repo = git2::Repository::open_bare(&dir).unwrap();
    assert!(repo.is_bare());

    let master = repo.find_reference("refs/heads/master").unwrap();
    let commit = master.peel_to_commit().unwrap();
    assert_eq!(commit.parent_count(), 0);
    assert_eq!(commit.tree().unwrap().len(), 0);
}

#[test]
fn mutations_are_single_parent_commits_with_author() {
    let temp = TempDir::new().unwrap();
    let provider = provider(temp.path());
    provider
        .create_repository(&RepoName::new("bpmn").unwrap(), session())
        .unwrap();

    let request = CommitRequest::new("Add readme", session());
    let first = provider
        .write("default://master@bpmn/docs/readme.txt", b"hello", &request)
        .unwrap();
    let second = provider
        .write("default://master@bpmn/docs/readme.txt", b"hello again", &request)
        .unwrap();

    let repo = git2::Repository::open_bare(repository_dir(
        temp.path(),
        &RepoName::new("bpmn").unwrap(),
    ))
    .unwrap();
    let commit = repo
        .find_commit(git2::Oid::from_str(second.commit.as_str()).unwrap())
        .unwrap();

    assert_eq!(commit.parent_count(), 1);
    assert_eq!(commit.parent_id(0).unwrap().to_string(), first.commit.as_str());
    assert_eq!(commit.author().name(), Some("alice"));
    assert_eq!(commit.author().email(), Some("alice@branchfs.local"));

    let entry = commit
        .tree()
        .unwrap()
        .get_path(Path::new("docs/readme.txt"))
        .unwrap();
    let blob = repo.find_blob(entry.id()).unwrap();
    assert_eq!(blob.content(), b"hello again");
}

#[test]
fn trailers_are_readable_by_git() {
    let temp = TempDir::new().unwrap();
    let provider = provider(temp.path());
    provider
        .create_repository(&RepoName::new("bpmn").unwrap(), session())
        .unwrap();

    let request = CommitRequest::new("Add diagram", session());
    provider
        .write("default://master@bpmn/a.bpmn", b"<xml/>", &request)
        .unwrap();
    let mut metadata = BTreeMap::new();
    metadata.insert("Ticket".to_string(), "BPMN-42".to_string());
    let (_, version) = provider
        .save_and_rename(
            "default://master@bpmn/a.bpmn",
            "b.bpmn",
            &metadata,
            b"<xml v='2'/>",
            &request,
        )
        .unwrap();

    let repo = git2::Repository::open_bare(repository_dir(
        temp.path(),
        &RepoName::new("bpmn").unwrap(),
    ))
    .unwrap();
    let commit = repo
        .find_commit(git2::Oid::from_str(version.commit.as_str()).unwrap())
        .unwrap();
    let message = commit.message().unwrap();
    assert!(message.starts_with("Add diagram\n\n"));

    let trailers = git2::message_trailers_strs(message).unwrap();
    let pairs: Vec<(String, String)> = trailers
        .iter()
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .collect();
    assert!(pairs.contains(&("Session-Id".to_string(), "tab-1".to_string())));
    assert!(pairs.contains(&("Ticket".to_string(), "BPMN-42".to_string())));
}

// =============================================================================
// Foreign repositories
// =============================================================================

#[test]
fn mounts_repository_created_elsewhere() {
    let temp = TempDir::new().unwrap();
    let import = foreign_repo(temp.path(), "legacy");
    let provider = provider(temp.path());

    let content = provider
        .read_all("default://main@legacy/docs/readme.md")
        .unwrap();
    assert_eq!(content, b"# Existing\n");

    let history = provider
        .history("default://main@legacy/docs/readme.md")
        .unwrap();
    assert_eq!(history.len(), 1);
    assert_eq!(history[0].commit.as_str(), import.to_string());
    assert_eq!(history[0].author.user(), "Other Tool");
    assert_eq!(history[0].author.email(), Some("other@example.com"));
    assert_eq!(history[0].message, "Import");
    assert!(history[0].metadata.is_empty());
}

#[test]
fn writes_on_foreign_repository_extend_its_branch() {
    let temp = TempDir::new().unwrap();
    let import = foreign_repo(temp.path(), "legacy");
    let provider = provider(temp.path());

    let version = provider
        .write(
            "default://main@legacy/docs/notes.md",
            b"notes",
            &CommitRequest::new("Add notes", session()),
        )
        .unwrap();

    let repo = git2::Repository::open_bare(temp.path().join("legacy.git")).unwrap();
    let tip = repo
        .find_reference("refs/heads/main")
        .unwrap()
        .peel_to_commit()
        .unwrap();
    assert_eq!(tip.id().to_string(), version.commit.as_str());
    assert_eq!(tip.parent_id(0).unwrap(), import);

    let names: Vec<String> = provider
        .list("default://main@legacy/docs")
        .unwrap()
        .filter_map(|p| p.name().map(str::to_string))
        .collect();
    assert_eq!(names, vec!["notes.md", "readme.md"]);
}
