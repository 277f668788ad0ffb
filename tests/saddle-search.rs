#[macro_use] extern crate saddle_assert_close;

use std::fs;

use saddle_dimer::Termination;
use saddle_dimer::test_functions::MullerBrown;
use saddle_tasks::{run_saddle_search, MepFile, SaddleFile, ValidatedSettings, YamlRead};
use tempdir::TempDir;

mod shared;

#[test]
fn double_well_from_cli() {
    let tmp = TempDir::new("saddle-search").unwrap();
    let config = shared::resource("double-well.yaml");
    let output = shared::saddle_search(tmp.path(), &[config.to_str().unwrap(), "-o", "out"]);
    assert!(output.status.success(), "{}", String::from_utf8_lossy(&output.stdout));

    let out = tmp.path().join("out");
    let saddle: SaddleFile = shared::read_json(&out.join("saddle.json")).unwrap();
    assert_eq!(saddle.termination, Termination::SaddleFound);
    assert_close!(abs=1e-4, &saddle.center[0][..], &[0.0; 3][..]);
    assert_close!(abs=1e-4, saddle.energy, 1.0);
    assert!(saddle.curvature < 0.0);
    // the unstable mode is x
    assert_close!(abs=1e-3, saddle.orientation[0][0].abs(), 1.0);

    let mep: MepFile = shared::read_json(&out.join("mep.json")).unwrap();
    assert_close!(abs=1e-3, mep.forward_barrier, 1.0);
    assert_close!(abs=1e-3, mep.backward_barrier, 1.0);
    assert!(mep.forward.position[0][0] * mep.backward.position[0][0] < 0.0);

    assert!(out.join("trace.json").exists());
    assert!(out.join("saddle.log").exists());
}

#[test]
fn existing_output_requires_force() {
    let tmp = TempDir::new("saddle-search").unwrap();
    let config = shared::resource("double-well.yaml");
    let config = config.to_str().unwrap();

    assert!(shared::saddle_search(tmp.path(), &[config, "-o", "out"]).status.success());
    assert!(!shared::saddle_search(tmp.path(), &[config, "-o", "out"]).status.success());
    assert!(shared::saddle_search(tmp.path(), &[config, "-o", "out", "--force"]).status.success());
}

#[test]
fn invalid_config_is_an_error() {
    let tmp = TempDir::new("saddle-search").unwrap();
    let config = tmp.path().join("bad.yaml");
    fs::write(&config, "potential: {double-well: {z-stiffness: -1.0}}\ncenter: [[0, 0, 0]]\n").unwrap();

    let output = shared::saddle_search(tmp.path(), &[config.to_str().unwrap(), "-o", "out"]);
    assert!(!output.status.success());
    assert!(!tmp.path().join("out/saddle.json").exists());
}

#[test]
fn exhausted_budget_exits_nonzero() {
    let tmp = TempDir::new("saddle-search").unwrap();
    let config = tmp.path().join("short.yaml");
    fs::write(&config, "\
potential: {double-well: {}}
center: [[0.2, -0.1, 0.1]]
seed: 1
dimer: {max-iterations: 2, force-sq-tol: 1.0e-12}
").unwrap();

    let output = shared::saddle_search(tmp.path(), &[config.to_str().unwrap(), "-o", "out"]);
    assert_eq!(output.status.code(), Some(saddle_tasks::entry_points::EXIT_NO_SADDLE));

    // results are still written
    let saddle: SaddleFile = shared::read_json(&tmp.path().join("out/saddle.json")).unwrap();
    assert_eq!(saddle.termination, Termination::StepBudgetExceeded);
    assert_eq!(saddle.iterations, 2);
    assert!(!tmp.path().join("out/mep.json").exists());
}

#[test]
fn muller_brown_path_connects_two_minima() {
    let tmp = TempDir::new("saddle-search").unwrap();
    let settings = {
        let file = fs::File::open(shared::resource("muller-brown.yaml")).unwrap();
        ValidatedSettings::from_reader(file).unwrap()
    };
    let outcome = run_saddle_search(&settings, tmp.path()).unwrap();

    let (x, y, energy) = MullerBrown::SADDLES[1];
    assert_eq!(outcome.saddle.termination, Termination::SaddleFound);
    assert_close!(abs=2e-3, &outcome.saddle.center[0][..], &[x, y, 0.0][..]);
    assert_close!(abs=0.05, outcome.saddle.energy, energy);

    let mep = outcome.mep.unwrap();
    assert!(mep.forward_barrier > 0.0);
    assert!(mep.backward_barrier > 0.0);

    let ends = [mep.forward.position[0], mep.backward.position[0]];
    assert_ne!(shared::nearest_minimum(ends[0]), shared::nearest_minimum(ends[1]));

    let written: MepFile = shared::read_json(&tmp.path().join("mep.json")).unwrap();
    assert_eq!(written.forward.path.len(), mep.forward.path.len());
}
