//! Runs every file under `filetests/`.

use std::path::Path;

use mathl_filetests::run_directory;

#[test]
fn test_all_filetests() {
    let dir = Path::new(env!("CARGO_MANIFEST_DIR")).join("filetests");
    let failures = run_directory(&dir).unwrap();

    for (path, msg) in &failures {
        eprintln!("FAIL {}\n{}\n", path, msg);
    }
    assert!(failures.is_empty(), "{} filetest(s) failed", failures.len());
}
