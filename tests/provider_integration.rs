//! Integration tests for the provider facade.
//!
//! Each test runs against real bare repositories in a temporary registry
//! root and checks both the returned values and the branch tip.

use std::collections::BTreeMap;
use std::sync::{Arc, Mutex};
use std::thread;
use std::time::Duration;

use tempfile::TempDir;

use branchfs::core::config::Config;
use branchfs::core::ops::BranchLock;
use branchfs::core::types::{BranchName, Oid, RepoName, SessionInfo};
use branchfs::engine::{CancelToken, CommitRequest, MutationEvent, MutationOp};
use branchfs::observe::PathChange;
use branchfs::{ErrorKind, FsError, Provider};

// =============================================================================
// Test Helpers
// =============================================================================

struct Fixture {
    _temp: TempDir,
    provider: Provider,
}

impl Fixture {
    fn new() -> Self {
        Self::with_config(|config| config)
    }

    fn with_lock_timeout(timeout: Duration) -> Self {
        Self::with_config(|config| config.with_lock_timeout(timeout))
    }

    fn with_config(adjust: impl FnOnce(Config) -> Config) -> Self {
        let temp = TempDir::new().expect("create temp dir");
        let config = adjust(Config::default().with_root(temp.path()));
        let provider = Provider::new(config).expect("provider");
        provider
            .create_repository(&repo(), session())
            .expect("create repository");
        Self {
            _temp: temp,
            provider,
        }
    }

    fn tip(&self) -> Oid {
        self.provider
            .filesystem(&repo(), &master())
            .unwrap()
            .tip()
            .unwrap()
    }

    fn write(&self, relative: &str, content: &[u8]) -> Oid {
        self.provider
            .write(&uri(relative), content, &request("write"))
            .unwrap()
            .commit
    }
}

fn repo() -> RepoName {
    RepoName::new("bpmn").unwrap()
}

fn master() -> BranchName {
    BranchName::new("master").unwrap()
}

fn session() -> SessionInfo {
    SessionInfo::new("alice").unwrap().with_id("s-1").unwrap()
}

fn request(message: &str) -> CommitRequest {
    CommitRequest::new(message, session())
}

fn uri(relative: &str) -> String {
    format!("default://master@bpmn/{}", relative)
}

// =============================================================================
// Reads and writes
// =============================================================================

mod read_write {
    use super::*;

    #[test]
    fn readme_rename_scenario() {
        let fx = Fixture::new();
        fx.write("docs/readme.txt", b"hello");

        let (renamed, _) = fx
            .provider
            .rename(&uri("docs/readme.txt"), "readme2.txt", &request("rename"))
            .unwrap();

        assert_eq!(renamed.to_path_string(), "master@/docs/readme2.txt");
        assert_eq!(
            fx.provider.read_all(&uri("docs/readme2.txt")).unwrap(),
            b"hello"
        );
        let err = fx.provider.read_all(&uri("docs/readme.txt")).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::NotFound);
    }

    #[test]
    fn write_returns_record_for_new_tip() {
        let fx = Fixture::new();
        let before = fx.tip();
        let version = fx
            .provider
            .write(&uri("a.txt"), b"a", &request("Add a"))
            .unwrap();

        assert_ne!(version.commit, before);
        assert_eq!(fx.tip(), version.commit);
        assert_eq!(version.message, "Add a");
        assert_eq!(version.author.user(), "alice");
        assert_eq!(version.author.id(), Some("s-1"));
        assert_eq!(version.author.email(), Some("alice@branchfs.local"));

        let history = fx.provider.history(&uri("a.txt")).unwrap();
        assert_eq!(history.last(), Some(&version));
    }

    #[test]
    fn write_creates_parent_directories() {
        let fx = Fixture::new();
        fx.write("a/b/c/file.txt", b"deep");

        let stat = fx.provider.stat(&uri("a/b")).unwrap();
        assert!(stat.is_directory);
        assert!(fx.provider.exists(&uri("a/b/c/file.txt")).unwrap());
    }

    #[test]
    fn write_through_file_is_not_a_directory() {
        let fx = Fixture::new();
        fx.write("a.txt", b"a");
        let before = fx.tip();

        let err = fx
            .provider
            .write(&uri("a.txt/b.txt"), b"b", &request("nested"))
            .unwrap_err();
        assert!(matches!(err, FsError::NotADirectory { .. }));
        assert_eq!(fx.tip(), before);
    }

    #[test]
    fn write_onto_directory_is_rejected() {
        let fx = Fixture::new();
        fx.write("docs/readme.txt", b"a");

        let err = fx
            .provider
            .write(&uri("docs"), b"b", &request("overwrite dir"))
            .unwrap_err();
        assert!(matches!(err, FsError::IsDirectory { .. }));
    }

    #[test]
    fn read_directory_is_directory_error() {
        let fx = Fixture::new();
        fx.write("docs/readme.txt", b"a");
        assert!(matches!(
            fx.provider.read_all(&uri("docs")),
            Err(FsError::IsDirectory { .. })
        ));
    }

    #[test]
    fn list_file_is_not_a_directory() {
        let fx = Fixture::new();
        fx.write("a.txt", b"a");
        assert!(matches!(
            fx.provider.list(&uri("a.txt")),
            Err(FsError::NotADirectory { .. })
        ));
    }

    #[test]
    fn stat_reports_size_and_last_change() {
        let fx = Fixture::new();
        let first = fx.write("a.txt", b"12345");
        fx.write("b.txt", b"other");

        let stat = fx.provider.stat(&uri("a.txt")).unwrap();
        assert!(!stat.is_directory);
        assert_eq!(stat.size, 5);
        assert_eq!(stat.last_modifying_commit, Some(first));
    }

    #[test]
    fn malformed_address_touches_nothing() {
        let fx = Fixture::new();
        let before = fx.tip();
        let err = fx
            .provider
            .write("default://bpmn/no-branch", b"x", &request("bad"))
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::MalformedAddress);
        assert_eq!(fx.tip(), before);
    }

    #[test]
    fn unknown_branch_is_reported() {
        let fx = Fixture::new();
        let err = fx
            .provider
            .read_all("default://ghost@bpmn/a.txt")
            .unwrap_err();
        assert!(matches!(err, FsError::BranchNotFound { .. }));
    }
}

// =============================================================================
// Rename, save-and-rename, delete, copy
// =============================================================================

mod structure {
    use super::*;

    #[test]
    fn rename_to_existing_name_leaves_tip_unchanged() {
        let fx = Fixture::new();
        fx.write("docs/a.txt", b"a");
        fx.write("docs/b.txt", b"b");
        let before = fx.tip();

        let err = fx
            .provider
            .rename(&uri("docs/a.txt"), "b.txt", &request("clash"))
            .unwrap_err();
        assert!(matches!(err, FsError::DuplicateName { .. }));
        assert_eq!(fx.tip(), before);

        let err = fx
            .provider
            .rename(&uri("docs/a.txt"), "a.txt", &request("same"))
            .unwrap_err();
        assert!(matches!(err, FsError::DuplicateName { .. }));
        assert_eq!(fx.tip(), before);
    }

    #[test]
    fn rename_rejects_invalid_names() {
        let fx = Fixture::new();
        fx.write("a.txt", b"a");
        let before = fx.tip();

        for name in ["", "..", "a/b", "x\0y"] {
            let err = fx
                .provider
                .rename(&uri("a.txt"), name, &request("bad name"))
                .unwrap_err();
            assert!(
                matches!(err, FsError::InvalidName(_)),
                "{name:?} should be invalid, got {err:?}"
            );
        }
        assert_eq!(fx.tip(), before);
    }

    #[test]
    fn git_directory_names_are_invalid_everywhere() {
        let fx = Fixture::new();
        fx.write("a.txt", b"a");
        fx.write("d/b.txt", b"b");
        let before = fx.tip();

        let assert_invalid = |result: Result<(), FsError>, what: &str| {
            let err = result.unwrap_err();
            assert_eq!(err.kind(), ErrorKind::InvalidName, "{what}: {err:?}");
        };

        for target in [".git", ".GIT", "a/.git/x.txt", "a/.Git/x.txt", "GIT~1/x.txt"] {
            assert_invalid(
                fx.provider
                    .write(&uri(target), b"x", &request("write"))
                    .map(|_| ()),
                target,
            );
            assert_invalid(
                fx.provider
                    .copy(&uri("a.txt"), &uri(target), &request("copy"))
                    .map(|_| ()),
                target,
            );
        }

        for name in [".git", ".GIT", ".git."] {
            assert_invalid(
                fx.provider
                    .rename(&uri("d/b.txt"), name, &request("rename"))
                    .map(|_| ()),
                name,
            );
            assert_invalid(
                fx.provider
                    .save_and_rename(&uri("d/b.txt"), name, &BTreeMap::new(), b"v2", &request("save"))
                    .map(|_| ()),
                name,
            );
        }

        assert_eq!(fx.tip(), before);
        assert_eq!(fx.provider.read_all(&uri("d/b.txt")).unwrap(), b"b");
    }

    #[test]
    fn rename_directory_moves_children() {
        let fx = Fixture::new();
        fx.write("docs/a.txt", b"a");
        fx.write("docs/sub/b.txt", b"b");

        fx.provider
            .rename(&uri("docs"), "manual", &request("move dir"))
            .unwrap();

        assert_eq!(fx.provider.read_all(&uri("manual/sub/b.txt")).unwrap(), b"b");
        assert!(!fx.provider.exists(&uri("docs")).unwrap());
    }

    #[test]
    fn save_and_rename_is_one_commit_with_metadata() {
        let fx = Fixture::new();
        let base = fx.write("a.bpmn", b"v1");

        let mut metadata = BTreeMap::new();
        metadata.insert("Ticket".to_string(), "BPMN-7".to_string());
        let (renamed, version) = fx
            .provider
            .save_and_rename(&uri("a.bpmn"), "b.bpmn", &metadata, b"v2", &request("Save as b"))
            .unwrap();

        assert_eq!(renamed.relative_path(), "b.bpmn");
        assert_eq!(version.metadata, metadata);
        assert_eq!(version.message, "Save as b");
        assert_eq!(fx.provider.read_all(&uri("b.bpmn")).unwrap(), b"v2");
        assert!(!fx.provider.exists(&uri("a.bpmn")).unwrap());

        let history = fx.provider.history(&uri("b.bpmn")).unwrap();
        let last = history.last().unwrap();
        assert_eq!(last.commit, version.commit);

        let git = fx
            .provider
            .registry()
            .get(&repo())
            .unwrap()
            .git()
            .unwrap();
        assert_eq!(git.commit_info(&version.commit).unwrap().parents, vec![base]);
    }

    #[test]
    fn save_and_rename_rejects_reserved_metadata() {
        let fx = Fixture::new();
        fx.write("a.bpmn", b"v1");
        let before = fx.tip();

        let mut metadata = BTreeMap::new();
        metadata.insert("Session-Id".to_string(), "forged".to_string());
        let err = fx
            .provider
            .save_and_rename(&uri("a.bpmn"), "b.bpmn", &metadata, b"v2", &request("x"))
            .unwrap_err();
        assert!(matches!(err, FsError::InvalidMetadata { .. }));
        assert_eq!(fx.tip(), before);
    }

    #[test]
    fn delete_removes_entry_and_prunes_empty_parents() {
        let fx = Fixture::new();
        fx.write("docs/only.txt", b"x");
        fx.write("keep.txt", b"k");

        fx.provider
            .delete(&uri("docs/only.txt"), &request("delete"))
            .unwrap();

        assert!(!fx.provider.exists(&uri("docs/only.txt")).unwrap());
        assert!(!fx.provider.exists(&uri("docs")).unwrap());
        assert!(fx.provider.exists(&uri("keep.txt")).unwrap());
    }

    #[test]
    fn delete_missing_is_not_found() {
        let fx = Fixture::new();
        let before = fx.tip();
        let err = fx
            .provider
            .delete(&uri("ghost.txt"), &request("delete"))
            .unwrap_err();
        assert!(matches!(err, FsError::NotFound { .. }));
        assert_eq!(fx.tip(), before);
    }

    #[test]
    fn copy_within_branch_keeps_source() {
        let fx = Fixture::new();
        fx.write("a.txt", b"same");

        let (copied, _) = fx
            .provider
            .copy(&uri("a.txt"), &uri("backup/a.txt"), &request("copy"))
            .unwrap();

        assert_eq!(copied.relative_path(), "backup/a.txt");
        assert_eq!(fx.provider.read_all(&uri("a.txt")).unwrap(), b"same");
        assert_eq!(fx.provider.read_all(&uri("backup/a.txt")).unwrap(), b"same");
    }

    #[test]
    fn copy_onto_existing_is_duplicate() {
        let fx = Fixture::new();
        fx.write("a.txt", b"a");
        fx.write("b.txt", b"b");
        assert!(matches!(
            fx.provider.copy(&uri("a.txt"), &uri("b.txt"), &request("copy")),
            Err(FsError::DuplicateName { .. })
        ));
    }

    #[test]
    fn copy_to_other_branch_is_foreign() {
        let fx = Fixture::new();
        fx.write("a.txt", b"a");
        fx.provider
            .create_branch(&repo(), &BranchName::new("draft").unwrap(), Some(&master()), &request("branch"))
            .unwrap();

        let err = fx
            .provider
            .copy(&uri("a.txt"), "default://draft@bpmn/a.txt", &request("copy"))
            .unwrap_err();
        assert!(matches!(err, FsError::ForeignPath { .. }));
    }
}

// =============================================================================
// History
// =============================================================================

mod history {
    use super::*;

    #[test]
    fn versions_are_oldest_first_and_skip_unrelated_commits() {
        let fx = Fixture::new();
        let v1 = fx.write("a.txt", b"1");
        fx.write("b.txt", b"unrelated");
        let v2 = fx.write("a.txt", b"2");

        let history = fx.provider.history(&uri("a.txt")).unwrap();
        let commits: Vec<Oid> = history.into_iter().map(|v| v.commit).collect();
        assert_eq!(commits, vec![v1, v2]);
    }

    #[test]
    fn rewriting_same_content_is_not_a_change() {
        let fx = Fixture::new();
        let v1 = fx.write("a.txt", b"same");
        fx.write("a.txt", b"same");

        let history = fx.provider.history(&uri("a.txt")).unwrap();
        assert_eq!(history.len(), 1);
        assert_eq!(history[0].commit, v1);
    }

    #[test]
    fn deleted_path_keeps_its_history() {
        let fx = Fixture::new();
        let v1 = fx.write("a.txt", b"1");
        let deleted = fx
            .provider
            .delete(&uri("a.txt"), &request("remove"))
            .unwrap();

        let history = fx.provider.history(&uri("a.txt")).unwrap();
        let commits: Vec<Oid> = history.into_iter().map(|v| v.commit).collect();
        assert_eq!(commits, vec![v1, deleted.commit]);
    }

    #[test]
    fn session_id_round_trips_through_history() {
        let fx = Fixture::new();
        fx.write("a.txt", b"1");
        let history = fx.provider.history(&uri("a.txt")).unwrap();
        assert_eq!(history[0].author.id(), Some("s-1"));
        assert_eq!(history[0].message, "write");
    }
}

// =============================================================================
// Branches and repositories
// =============================================================================

mod branches {
    use super::*;

    #[test]
    fn branch_from_tip_shares_content_then_diverges() {
        let fx = Fixture::new();
        fx.write("a.txt", b"base");
        let draft = BranchName::new("draft").unwrap();
        fx.provider
            .create_branch(&repo(), &draft, Some(&master()), &request("branch"))
            .unwrap();

        fx.provider
            .write("default://draft@bpmn/a.txt", b"draft", &request("edit"))
            .unwrap();

        assert_eq!(fx.provider.read_all(&uri("a.txt")).unwrap(), b"base");
        assert_eq!(
            fx.provider.read_all("default://draft@bpmn/a.txt").unwrap(),
            b"draft"
        );
        assert_eq!(fx.provider.branches(&repo()).unwrap(), vec![draft, master()]);
    }

    #[test]
    fn empty_branch_starts_with_empty_root() {
        let fx = Fixture::new();
        fx.write("a.txt", b"a");
        let fs = fx
            .provider
            .create_branch(&repo(), &BranchName::new("empty").unwrap(), None, &request("branch"))
            .unwrap();
        assert_eq!(fs.list(&fs.root()).unwrap().len(), 0);
    }

    #[test]
    fn existing_branch_is_rejected() {
        let fx = Fixture::new();
        let err = fx
            .provider
            .create_branch(&repo(), &master(), None, &request("again"))
            .unwrap_err();
        assert!(matches!(err, FsError::BranchExists { .. }));
    }

    #[test]
    fn existing_repository_is_rejected() {
        let fx = Fixture::new();
        let err = fx
            .provider
            .create_repository(&repo(), session())
            .unwrap_err();
        assert!(matches!(err, FsError::RepositoryExists { .. }));
    }

    #[test]
    fn unmounted_handle_fails_fast() {
        let fx = Fixture::new();
        fx.write("a.txt", b"a");
        let fs = fx.provider.filesystem(&repo(), &master()).unwrap();
        let snapshot = fs.snapshot().unwrap();

        fx.provider.registry().unmount(&repo()).unwrap();

        let path = fs.path("a.txt").unwrap();
        assert!(matches!(
            fs.read_all(&path),
            Err(FsError::RepositoryUnavailable { .. })
        ));
        assert!(matches!(
            snapshot.read_all(&path),
            Err(FsError::RepositoryUnavailable { .. })
        ));
        assert!(matches!(
            fx.provider.engine().write(&fs, &path, b"b", &request("late")),
            Err(FsError::RepositoryUnavailable { .. })
        ));

        // A fresh lookup mounts the repository again.
        assert_eq!(fx.provider.read_all(&uri("a.txt")).unwrap(), b"a");
    }
}

// =============================================================================
// Snapshots
// =============================================================================

mod snapshots {
    use super::*;

    #[test]
    fn snapshot_does_not_see_later_commits() {
        let fx = Fixture::new();
        fx.write("a.txt", b"old");
        let fs = fx.provider.filesystem(&repo(), &master()).unwrap();
        let snapshot = fs.snapshot().unwrap();

        fx.write("a.txt", b"new");
        fx.write("b.txt", b"b");

        let a = fs.path("a.txt").unwrap();
        assert_eq!(snapshot.read_all(&a).unwrap(), b"old");
        assert_eq!(snapshot.list(&fs.root()).unwrap().len(), 1);
        assert_eq!(fs.read_all(&a).unwrap(), b"new");
    }

    #[test]
    fn listing_reports_its_commit() {
        let fx = Fixture::new();
        let tip = fx.write("a.txt", b"a");
        let listing = fx.provider.list(&uri("")).unwrap();
        assert_eq!(listing.commit(), &tip);
    }
}

// =============================================================================
// Expected base, lock timeout, cancellation
// =============================================================================

mod coordination {
    use super::*;

    #[test]
    fn stale_expected_base_is_concurrent_modification() {
        let fx = Fixture::new();
        let seen = fx.write("a.txt", b"1");
        fx.write("a.txt", b"2");
        let before = fx.tip();

        let err = fx
            .provider
            .write(&uri("a.txt"), b"3", &request("stale").expecting(seen))
            .unwrap_err();
        assert!(matches!(err, FsError::ConcurrentModification { .. }));
        assert!(err.is_retryable());
        assert_eq!(fx.tip(), before);
    }

    #[test]
    fn current_expected_base_succeeds() {
        let fx = Fixture::new();
        let seen = fx.write("a.txt", b"1");
        let version = fx
            .provider
            .write(&uri("a.txt"), b"2", &request("fresh").expecting(seen))
            .unwrap();
        assert_eq!(fx.tip(), version.commit);
    }

    #[test]
    fn held_lock_times_out_as_busy() {
        let fx = Fixture::with_lock_timeout(Duration::from_millis(100));
        let before = fx.tip();
        let handle = fx.provider.registry().get(&repo()).unwrap();
        let _held = BranchLock::try_acquire(handle.paths(), &master()).unwrap();

        let err = fx
            .provider
            .write(&uri("a.txt"), b"a", &request("blocked"))
            .unwrap_err();
        assert!(matches!(err, FsError::Busy { .. }));
        assert!(err.is_retryable());
        assert_eq!(fx.tip(), before);
    }

    #[test]
    fn other_branch_is_not_blocked() {
        let fx = Fixture::with_lock_timeout(Duration::from_millis(100));
        let draft = BranchName::new("draft").unwrap();
        fx.provider
            .create_branch(&repo(), &draft, None, &request("branch"))
            .unwrap();
        let handle = fx.provider.registry().get(&repo()).unwrap();
        let _held = BranchLock::try_acquire(handle.paths(), &master()).unwrap();

        fx.provider
            .write("default://draft@bpmn/a.txt", b"a", &request("free"))
            .unwrap();
    }

    #[test]
    fn cancelled_request_creates_nothing() {
        let fx = Fixture::new();
        let before = fx.tip();
        let token = CancelToken::new();
        token.cancel();

        let err = fx
            .provider
            .write(&uri("a.txt"), b"a", &request("never").with_cancel(token))
            .unwrap_err();
        assert!(matches!(err, FsError::Cancelled));
        assert_eq!(fx.tip(), before);
    }

    #[test]
    fn cancel_while_waiting_for_lock() {
        let fx = Fixture::with_lock_timeout(Duration::from_secs(30));
        let before = fx.tip();
        let handle = fx.provider.registry().get(&repo()).unwrap();
        let _held = BranchLock::try_acquire(handle.paths(), &master()).unwrap();

        let token = CancelToken::new();
        let canceller = {
            let token = token.clone();
            thread::spawn(move || {
                thread::sleep(Duration::from_millis(100));
                token.cancel();
            })
        };

        let err = fx
            .provider
            .write(&uri("a.txt"), b"a", &request("waiting").with_cancel(token))
            .unwrap_err();
        canceller.join().unwrap();

        assert!(matches!(err, FsError::Cancelled));
        assert_eq!(fx.tip(), before);
    }
}

// =============================================================================
// Events and observers
// =============================================================================

mod signals {
    use super::*;

    #[test]
    fn each_call_emits_started_then_one_terminal_event() {
        let fx = Fixture::new();
        let events: Arc<Mutex<Vec<MutationEvent>>> = Arc::default();
        let sink = Arc::clone(&events);
        fx.provider
            .engine()
            .add_listener(move |event: &MutationEvent| sink.lock().unwrap().push(event.clone()));

        fx.write("a.txt", b"a");
        let _ = fx
            .provider
            .rename(&uri("missing.txt"), "b.txt", &request("fail"));

        let events = events.lock().unwrap();
        assert_eq!(events.len(), 4);
        assert!(matches!(events[0], MutationEvent::Started { op: MutationOp::Write, .. }));
        assert!(matches!(events[1], MutationEvent::Succeeded { op: MutationOp::Write, .. }));
        assert!(matches!(events[2], MutationEvent::Started { op: MutationOp::Rename, .. }));
        match &events[3] {
            MutationEvent::Failed { op, kind, .. } => {
                assert_eq!(*op, MutationOp::Rename);
                assert_eq!(*kind, ErrorKind::NotFound);
            }
            other => panic!("expected failure, got {other:?}"),
        }
    }

    #[test]
    fn observed_rename_moves_view_and_notifies_in_order() {
        let fx = Fixture::new();
        fx.write("docs/readme.txt", b"hello");

        let observed = fx.provider.observe(&uri("docs/readme.txt")).unwrap();
        let other_view = observed.view();
        let calls: Arc<Mutex<Vec<String>>> = Arc::default();
        for label in ["first", "second"] {
            let calls = Arc::clone(&calls);
            observed.subscribe(move |change: &PathChange| {
                calls
                    .lock()
                    .unwrap()
                    .push(format!("{label}:{}", change.current.relative_path()));
            });
        }

        let fs = fx.provider.filesystem(&repo(), &master()).unwrap();
        fx.provider
            .engine()
            .rename_observed(&fs, &observed, "readme2.txt", &request("rename"))
            .unwrap();

        assert_eq!(
            *calls.lock().unwrap(),
            vec!["first:docs/readme2.txt", "second:docs/readme2.txt"]
        );
        assert_eq!(observed.current().relative_path(), "docs/readme2.txt");
        assert_eq!(observed.original().relative_path(), "docs/readme.txt");

        // Diverged views keep one identity until reconciled.
        assert_eq!(other_view.id(), observed.id());
        assert_eq!(other_view.current().relative_path(), "docs/readme.txt");
        assert!(other_view.reconcile(&observed).unwrap());
        assert_eq!(other_view.current(), observed.current());
    }

    #[test]
    fn failed_observed_rename_leaves_view() {
        let fx = Fixture::new();
        fx.write("a.txt", b"a");
        fx.write("b.txt", b"b");
        let observed = fx.provider.observe(&uri("a.txt")).unwrap();
        let fs = fx.provider.filesystem(&repo(), &master()).unwrap();

        assert!(fx
            .provider
            .engine()
            .rename_observed(&fs, &observed, "b.txt", &request("clash"))
            .is_err());
        assert!(!observed.is_moved());
    }
}
