use std::cell::RefCell;
use std::fs;
use std::path::{Path, PathBuf};
use tempfile::tempdir;

use saprotect_core::hasher::fingerprint_bytes;
use saprotect_core::storage::Database;
use saprotect_core::{
    AppConfig, Error, ProgressReporter, RemediationEngine, Resolution, ScanEngine,
    SilentReporter, Status,
};

/// Layout:
///   root/
///     a.txt            ("hello")
///     sub/
///       b.txt          ("bravo")
///       deeper/c.bin   (4KB + 1 of 0xAA, spans two chunks)
fn create_test_tree(root: &Path) {
    fs::create_dir_all(root.join("sub/deeper")).unwrap();
    fs::write(root.join("a.txt"), "hello").unwrap();
    fs::write(root.join("sub/b.txt"), "bravo").unwrap();
    fs::write(root.join("sub/deeper/c.bin"), vec![0xAAu8; 4097]).unwrap();
}

fn key(path: &Path) -> String {
    path.to_string_lossy().into_owned()
}

fn scan(db: &Database, root: &Path, add_only: bool) -> Result<saprotect_core::ScanResult, Error> {
    ScanEngine::new(&AppConfig::default()).scan(db, &[root.to_path_buf()], add_only, &SilentReporter)
}

fn remediate(db: &Database, target: &Path, resolution: Resolution) -> saprotect_core::RemediationResult {
    RemediationEngine::new(&AppConfig::default())
        .remediate(db, &[target.to_path_buf()], resolution, &SilentReporter)
        .unwrap()
}

#[test]
fn test_first_scan_records_every_file_as_new() {
    let tmp = tempdir().unwrap();
    let root = tmp.path().join("scan_root");
    create_test_tree(&root);
    let db = Database::open_in_memory().unwrap();

    let result = scan(&db, &root, false).unwrap();
    assert_eq!(result.files_scanned, 3);
    assert!(result.failures.is_empty());
    assert_eq!(result.session.files_added, 3);
    assert_eq!(result.session.files_updated, 0);
    assert_eq!(result.session.files_mismatched, 0);

    let record = db.find_record(&key(&root.join("a.txt"))).unwrap().unwrap();
    assert_eq!(record.status, Status::New);
    assert_eq!(record.hash, fingerprint_bytes(b"hello"));
    assert_eq!(record.filename, "a.txt");

    let big = db
        .find_record(&key(&root.join("sub/deeper/c.bin")))
        .unwrap()
        .unwrap();
    assert_eq!(big.hash, fingerprint_bytes(&vec![0xAAu8; 4097]));
}

#[test]
fn test_concrete_hello_world_scenario() {
    let tmp = tempdir().unwrap();
    let root = tmp.path().join("scan_root");
    fs::create_dir_all(&root).unwrap();
    let file = root.join("a.txt");
    fs::write(&file, "hello").unwrap();
    let f0 = fingerprint_bytes(b"hello");
    let f1 = fingerprint_bytes(b"world");
    let db = Database::open_in_memory().unwrap();

    scan(&db, &root, false).unwrap();
    let record = db.find_record(&key(&file)).unwrap().unwrap();
    assert_eq!((record.status, record.hash.as_str()), (Status::New, f0.as_str()));

    scan(&db, &root, false).unwrap();
    let record = db.find_record(&key(&file)).unwrap().unwrap();
    assert_eq!(record.status, Status::Ok);
    assert_eq!(record.old_hash.as_deref(), Some(f0.as_str()));
    assert_eq!(record.hash, f0);

    fs::write(&file, "world").unwrap();
    let result = scan(&db, &root, false).unwrap();
    assert_eq!(result.session.files_mismatched, 1);
    let record = db.find_record(&key(&file)).unwrap().unwrap();
    assert_eq!(record.status, Status::Mismatch);
    assert_eq!(record.old_hash.as_deref(), Some(f0.as_str()));
    assert_eq!(record.hash, f1);

    let remediation = remediate(&db, &file, Resolution::KeepOld);
    assert_eq!(remediation.remediated, vec![file.clone()]);
    assert_eq!(db.get_status(&key(&file)).unwrap(), Some(Status::RemediateOld));

    fs::write(&file, "hello").unwrap();
    scan(&db, &root, false).unwrap();
    assert_eq!(db.get_status(&key(&file)).unwrap(), Some(Status::Ok));
}

#[test]
fn test_scan_refuses_while_mismatch_pending() {
    let tmp = tempdir().unwrap();
    let root = tmp.path().join("scan_root");
    create_test_tree(&root);
    let db = Database::open_in_memory().unwrap();
    scan(&db, &root, false).unwrap();

    fs::write(root.join("a.txt"), "tampered").unwrap();
    scan(&db, &root, false).unwrap();
    let before = db.all_records().unwrap();
    let sessions_before = db.list_sessions(100).unwrap().len();

    // Add a new file too: nothing may be recorded while the gate is closed
    fs::write(root.join("new.txt"), "new").unwrap();
    match scan(&db, &root, false) {
        Err(Error::PendingMismatch(count)) => assert_eq!(count, 1),
        other => panic!("expected PendingMismatch, got {:?}", other.map(|r| r.files_scanned)),
    }
    assert!(matches!(
        ScanEngine::new(&AppConfig::default()).scan_path(&db, &root, true, &SilentReporter),
        Err(Error::PendingMismatch(1))
    ));
    assert_eq!(db.all_records().unwrap(), before);
    assert_eq!(db.list_sessions(100).unwrap().len(), sessions_before);
}

#[test]
fn test_unchanged_tree_stays_ok() {
    let tmp = tempdir().unwrap();
    let root = tmp.path().join("scan_root");
    create_test_tree(&root);
    let db = Database::open_in_memory().unwrap();

    for _ in 0..4 {
        scan(&db, &root, false).unwrap();
    }
    let records = db.all_records().unwrap();
    assert_eq!(records.len(), 3);
    assert!(records.iter().all(|r| r.status == Status::Ok));

    let result = scan(&db, &root, false).unwrap();
    assert_eq!(result.session.files_added, 0);
    assert_eq!(result.session.files_updated, 3);
}

#[test]
fn test_remediate_new_accepts_changed_content() {
    let tmp = tempdir().unwrap();
    let root = tmp.path().join("scan_root");
    create_test_tree(&root);
    let db = Database::open_in_memory().unwrap();
    scan(&db, &root, false).unwrap();

    let b = root.join("sub/b.txt");
    fs::write(&b, "changed on purpose").unwrap();
    scan(&db, &root, false).unwrap();

    // Directory remediation: one mismatch resolved, the rest reported as skipped
    let result = remediate(&db, &root, Resolution::KeepNew);
    assert_eq!(result.remediated, vec![b.clone()]);
    assert_eq!(result.skipped.len(), 2);
    assert!(result
        .skipped
        .iter()
        .all(|(_, status)| *status == Some(Status::Ok)));

    scan(&db, &root, false).unwrap();
    let record = db.find_record(&key(&b)).unwrap().unwrap();
    assert_eq!(record.status, Status::Ok);
    assert_eq!(record.hash, fingerprint_bytes(b"changed on purpose"));
}

#[test]
fn test_remediate_old_with_unreverted_content_mismatches_again() {
    let tmp = tempdir().unwrap();
    let root = tmp.path().join("scan_root");
    create_test_tree(&root);
    let db = Database::open_in_memory().unwrap();
    scan(&db, &root, false).unwrap();

    let a = root.join("a.txt");
    fs::write(&a, "still tampered").unwrap();
    scan(&db, &root, false).unwrap();
    remediate(&db, &a, Resolution::KeepOld);

    let result = scan(&db, &root, false).unwrap();
    assert_eq!(result.session.files_mismatched, 1);
    let record = db.find_record(&key(&a)).unwrap().unwrap();
    assert_eq!(record.status, Status::Mismatch);
    assert_eq!(record.old_hash, Some(fingerprint_bytes(b"hello")));
}

#[test]
fn test_remediation_of_clean_file_is_a_reported_no_op() {
    let tmp = tempdir().unwrap();
    let root = tmp.path().join("scan_root");
    create_test_tree(&root);
    let untracked = tmp.path().join("untracked.txt");
    fs::write(&untracked, "x").unwrap();
    let db = Database::open_in_memory().unwrap();
    scan(&db, &root, false).unwrap();
    let before = db.all_records().unwrap();

    let result = RemediationEngine::new(&AppConfig::default())
        .remediate(
            &db,
            &[
                root.join("a.txt"),
                tmp.path().join("does-not-exist"),
                untracked.clone(),
            ],
            Resolution::KeepOld,
            &SilentReporter,
        )
        .unwrap();
    assert!(result.remediated.is_empty());
    assert_eq!(
        result.skipped,
        vec![(root.join("a.txt"), Some(Status::New)), (untracked, None)]
    );
    assert_eq!(db.all_records().unwrap(), before);
}

#[test]
fn test_add_only_does_not_refresh_existing_records() {
    let tmp = tempdir().unwrap();
    let root = tmp.path().join("scan_root");
    create_test_tree(&root);
    let db = Database::open_in_memory().unwrap();
    scan(&db, &root, false).unwrap();
    let before = db.all_records().unwrap();

    // Changed content would be a mismatch in a normal scan
    fs::write(root.join("a.txt"), "changed").unwrap();
    fs::write(root.join("sub/fresh.txt"), "fresh").unwrap();

    let result = scan(&db, &root, true).unwrap();
    assert_eq!(result.files_scanned, 4);
    assert_eq!(result.files_skipped, 3);
    assert_eq!(result.session.files_added, 1);

    let after = db.all_records().unwrap();
    assert_eq!(after.len(), 4);
    for old in &before {
        let now = after.iter().find(|r| r.path == old.path).unwrap();
        assert_eq!(now, old);
    }
    let fresh = db
        .find_record(&key(&root.join("sub/fresh.txt")))
        .unwrap()
        .unwrap();
    assert_eq!(fresh.status, Status::New);
}

#[test]
fn test_file_target_visits_exactly_that_file() {
    let tmp = tempdir().unwrap();
    let root = tmp.path().join("scan_root");
    create_test_tree(&root);
    let db = Database::open_in_memory().unwrap();

    let scanned = ScanEngine::new(&AppConfig::default())
        .scan_path(&db, &root.join("sub/b.txt"), false, &SilentReporter)
        .unwrap();
    assert_eq!(scanned.files_scanned, 1);
    let records = db.all_records().unwrap();
    assert_eq!(records.len(), 1);
    assert_eq!(records[0].path, key(&root.join("sub/b.txt")));
    // scan_path leaves session history alone
    assert!(db.latest_session().unwrap().is_none());
}

#[test]
fn test_session_history_and_missing_targets() {
    let tmp = tempdir().unwrap();
    let root = tmp.path().join("scan_root");
    create_test_tree(&root);
    let db = Database::open_in_memory().unwrap();

    let result = ScanEngine::new(&AppConfig::default())
        .scan(
            &db,
            &[tmp.path().join("nope"), root.join("a.txt")],
            false,
            &SilentReporter,
        )
        .unwrap();
    assert_eq!(result.files_scanned, 1);
    scan(&db, &root, false).unwrap();

    let history = db.list_sessions(10).unwrap();
    assert_eq!(history.len(), 2);
    assert_eq!(history[0].files_scanned, 3);
    assert_eq!(history[1].files_scanned, 1);
    assert!(history[0].start >= history[1].end);
}

#[test]
fn test_ignore_patterns_are_honored() {
    let tmp = tempdir().unwrap();
    let root = tmp.path().join("scan_root");
    create_test_tree(&root);
    let db = Database::open_in_memory().unwrap();
    let config = AppConfig {
        ignore_patterns: vec!["*.bin".to_string()],
        ..AppConfig::default()
    };

    let result = ScanEngine::new(&config)
        .scan(&db, &[root.clone()], false, &SilentReporter)
        .unwrap();
    assert_eq!(result.files_scanned, 2);
    assert!(db
        .find_record(&key(&root.join("sub/deeper/c.bin")))
        .unwrap()
        .is_none());
}

#[derive(Default)]
struct RecordingReporter {
    hashed: RefCell<Vec<(PathBuf, Status)>>,
    failed: RefCell<Vec<PathBuf>>,
}

impl ProgressReporter for RecordingReporter {
    fn on_file_hashed(&self, path: &Path, status: Status, _files_scanned: usize) {
        self.hashed.borrow_mut().push((path.to_path_buf(), status));
    }

    fn on_file_failed(&self, path: &Path, _error: &str) {
        self.failed.borrow_mut().push(path.to_path_buf());
    }
}

#[test]
fn test_reporter_sees_each_file() {
    let tmp = tempdir().unwrap();
    let root = tmp.path().join("scan_root");
    create_test_tree(&root);
    let db = Database::open_in_memory().unwrap();
    let reporter = RecordingReporter::default();

    ScanEngine::new(&AppConfig::default())
        .scan(&db, &[root.clone()], false, &reporter)
        .unwrap();
    let hashed = reporter.hashed.borrow();
    assert_eq!(hashed.len(), 3);
    assert!(hashed.iter().all(|(_, status)| *status == Status::New));
    assert!(reporter.failed.borrow().is_empty());
}

#[cfg(unix)]
#[test]
fn test_unreadable_entries_are_skipped_not_fatal() {
    use std::os::unix::fs::symlink;

    let tmp = tempdir().unwrap();
    let root = tmp.path().join("scan_root");
    create_test_tree(&root);
    // Dangling link: the walk reports it, the scan carries on
    symlink(tmp.path().join("gone"), root.join("dangling")).unwrap();
    let db = Database::open_in_memory().unwrap();
    let reporter = RecordingReporter::default();

    let result = ScanEngine::new(&AppConfig::default())
        .scan(&db, &[root.clone()], false, &reporter)
        .unwrap();
    assert_eq!(result.failures.len(), 1);
    assert_eq!(result.failures[0].path, root.join("dangling"));
    assert_eq!(reporter.failed.borrow().len(), 1);
    assert_eq!(db.all_records().unwrap().len(), 3);
}

#[cfg(unix)]
#[test]
fn test_symlinked_directories_are_followed() {
    use std::os::unix::fs::symlink;

    let tmp = tempdir().unwrap();
    let root = tmp.path().join("scan_root");
    let elsewhere = tmp.path().join("elsewhere");
    create_test_tree(&root);
    fs::create_dir_all(&elsewhere).unwrap();
    fs::write(elsewhere.join("linked.txt"), "linked").unwrap();
    symlink(&elsewhere, root.join("link")).unwrap();
    let db = Database::open_in_memory().unwrap();

    let result = scan(&db, &root, false).unwrap();
    assert_eq!(result.files_scanned, 4);
    assert!(db
        .find_record(&key(&root.join("link/linked.txt")))
        .unwrap()
        .is_some());
}

/// Deletes `victim` as soon as `trigger` has been hashed, so the walk still
/// yields it but the fingerprint cannot open it.
struct VanishingReporter {
    trigger: PathBuf,
    victim: PathBuf,
    failed: RefCell<Vec<PathBuf>>,
}

impl ProgressReporter for VanishingReporter {
    fn on_file_hashed(&self, path: &Path, _status: Status, _files_scanned: usize) {
        if path == self.trigger {
            fs::remove_file(&self.victim).unwrap();
        }
    }

    fn on_file_failed(&self, path: &Path, _error: &str) {
        self.failed.borrow_mut().push(path.to_path_buf());
    }
}

#[test]
fn test_file_vanishing_before_fingerprint_is_skipped() {
    let tmp = tempdir().unwrap();
    let root = tmp.path().join("scan_root");
    fs::create_dir_all(&root).unwrap();
    fs::write(root.join("a.txt"), "alpha").unwrap();
    fs::write(root.join("b.txt"), "bravo").unwrap();
    fs::write(root.join("c.txt"), "charlie").unwrap();
    let db = Database::open_in_memory().unwrap();
    let reporter = VanishingReporter {
        trigger: root.join("a.txt"),
        victim: root.join("b.txt"),
        failed: RefCell::default(),
    };

    let result = ScanEngine::new(&AppConfig::default())
        .scan(&db, &[root.clone()], false, &reporter)
        .unwrap();
    assert_eq!(result.files_scanned, 3);
    assert_eq!(result.failures.len(), 1);
    assert_eq!(result.failures[0].path, root.join("b.txt"));
    assert_eq!(*reporter.failed.borrow(), vec![root.join("b.txt")]);

    assert!(db.find_record(&key(&root.join("b.txt"))).unwrap().is_none());
    let c = db.find_record(&key(&root.join("c.txt"))).unwrap().unwrap();
    assert_eq!(c.hash, fingerprint_bytes(b"charlie"));
    assert_eq!(db.all_records().unwrap().len(), 2);
    assert_eq!(result.session.files_added, 2);
}

#[cfg(target_os = "linux")]
#[test]
fn test_non_utf8_names_are_never_merged() {
    use std::ffi::OsStr;
    use std::os::unix::ffi::OsStrExt;

    let tmp = tempdir().unwrap();
    let root = tmp.path().join("scan_root");
    fs::create_dir_all(&root).unwrap();
    fs::write(root.join(OsStr::from_bytes(b"a\xfe")), "one").unwrap();
    fs::write(root.join(OsStr::from_bytes(b"a\xff")), "two").unwrap();
    fs::write(root.join("plain.txt"), "three").unwrap();
    let db = Database::open_in_memory().unwrap();

    let result = scan(&db, &root, false).unwrap();
    assert_eq!(result.files_scanned, 3);
    assert_eq!(result.failures.len(), 2);
    assert!(result
        .failures
        .iter()
        .all(|failure| failure.error.contains("not valid UTF-8")));

    let records = db.all_records().unwrap();
    assert_eq!(records.len(), 1);
    assert_eq!(records[0].status, Status::New);
    assert_eq!(db.count_by_status(Status::Mismatch).unwrap(), 0);

    // No false mismatch: the next scan is not gated
    let again = scan(&db, &root, false).unwrap();
    assert_eq!(again.session.files_mismatched, 0);
    assert_eq!(db.get_status(&key(&root.join("plain.txt"))).unwrap(), Some(Status::Ok));
}
