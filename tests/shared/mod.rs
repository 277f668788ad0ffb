use std::path::{Path, PathBuf};
use std::process::{Command, Output};

use failure::Error;
use serde::de::DeserializeOwned;

pub fn resource(name: &str) -> PathBuf {
    Path::new(env!("CARGO_MANIFEST_DIR")).join("tests/resources").join(name)
}

/// Runs the `saddle-search` binary from inside `cwd`.
pub fn saddle_search(cwd: &Path, args: &[&str]) -> Output {
    Command::new(env!("CARGO_BIN_EXE_saddle-search"))
        .current_dir(cwd)
        .args(args)
        .output()
        .unwrap()
}

pub fn read_json<T: DeserializeOwned>(path: &Path) -> Result<T, Error> {
    Ok(serde_json::from_reader(std::fs::File::open(path)?)?)
}

/// Index of the closest Müller-Brown minimum.
pub fn nearest_minimum(point: [f64; 3]) -> usize {
    use saddle_dimer::test_functions::MullerBrown;

    let sqdist = |&(x, y, _): &(f64, f64, f64)| (point[0] - x).powi(2) + (point[1] - y).powi(2);
    let mut best = 0;
    for (i, min) in MullerBrown::MINIMA.iter().enumerate() {
        if sqdist(min) < sqdist(&MullerBrown::MINIMA[best]) {
            best = i;
        }
    }
    best
}
