use std::path::Path;

use spectra_cpu_validation::{load_test_file, run_test_case, vector_files};

/// Replays every vector in `dir`, returning (cases run, failure messages).
fn replay_dir(dir: &Path) -> Option<(usize, Vec<String>)> {
    let files = vector_files(dir).expect("Failed to read test data directory")?;
    let mut total = 0;
    let mut failures = Vec::new();
    for path in &files {
        let cases = load_test_file(path)
            .unwrap_or_else(|e| panic!("Failed to parse {}: {e}", path.display()));
        total += cases.len();
        failures.extend(cases.iter().filter_map(|tc| run_test_case(tc).err()));
    }
    Some((total, failures))
}

/// SingleStepTests/z80 v1 vectors, unpacked under `test_data/z80/v1`.
#[test]
fn test_single_step_vectors() {
    let dir = Path::new("test_data/z80/v1");
    let Some((total, failures)) = replay_dir(dir) else {
        eprintln!("skipping: {} not found", dir.display());
        return;
    };

    for failure in failures.iter().take(20) {
        eprintln!("{failure}");
    }
    assert!(
        failures.is_empty(),
        "{} of {} single-step vectors failed",
        failures.len(),
        total
    );
}
