use assert_cmd::cargo_bin;
use assert_cmd::prelude::*;
use predicates::prelude::*;
use std::process::Command;

#[cfg(not(feature = "storage-rocksdb"))]
#[test]
fn test_rocksdb_fallback_warning() {
    let mut cmd = Command::new(cargo_bin!("momo-checkout"));
    cmd.args(["pay", "--phone", "250788123456", "--amount", "6000", "--simulate", "approve"])
        .args(["--poll-interval-ms", "5", "--db-path", "some_db"]);

    cmd.assert()
        .success()
        .stderr(predicate::str::contains(
            "'storage-rocksdb' feature is not enabled. Falling back to in-memory journal.",
        ));
}

#[cfg(feature = "storage-rocksdb")]
#[test]
fn test_rocksdb_no_fallback_warning() {
    let dir = tempfile::tempdir().unwrap();
    let db_path = dir.path().join("journal");

    let mut cmd = Command::new(cargo_bin!("momo-checkout"));
    cmd.args(["pay", "--phone", "250788123456", "--amount", "6000", "--simulate", "approve"])
        .args(["--poll-interval-ms", "5", "--db-path"])
        .arg(&db_path);

    cmd.assert()
        .success()
        .stderr(predicate::str::contains("WARNING").not());
}
