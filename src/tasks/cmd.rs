/* ************************************************************************ **
** This file is part of saddle, and is licensed under EITHER the MIT        **
** license or the Apache 2.0 license, at your option.                       **
**                                                                          **
**     http://www.apache.org/licenses/LICENSE-2.0                           **
**     http://opensource.org/licenses/MIT                                   **
** ************************************************************************ */

use crate::FailResult;
use crate::potential;

use std::fmt;
use std::fs;
use std::io;
use std::path::Path;

use serde::Serialize;
use saddle_dimer::{Builder, Failure, Never, Termination, TraceEntry};
use saddle_dimer::mep::{self, Direction, MepOutput};
use saddle_tasks_config::ValidatedSettings;

/// Contents of `saddle.json`.
#[derive(Serialize, Deserialize)]
#[derive(Debug, Clone)]
#[serde(rename_all = "kebab-case")]
pub struct SaddleFile {
    pub termination: Termination,
    pub iterations: u64,
    pub energy: f64,
    pub curvature: f64,
    pub saddle_tolerance: f64,
    pub center: Vec<[f64; 3]>,
    pub plus: Vec<[f64; 3]>,
    pub minus: Vec<[f64; 3]>,
    pub orientation: Vec<[f64; 3]>,
    pub force: Vec<[f64; 3]>,
    pub num_evaluations: u64,
}

/// Contents of `mep.json`.
#[derive(Serialize, Deserialize)]
#[derive(Debug, Clone)]
#[serde(rename_all = "kebab-case")]
pub struct MepFile {
    pub saddle_energy: f64,
    /// Saddle energy minus the energy at the end of the forward path.
    pub forward_barrier: f64,
    pub backward_barrier: f64,
    pub forward: MepOutput,
    pub backward: MepOutput,
}

#[derive(Debug, Clone)]
pub struct SearchOutcome {
    pub saddle: SaddleFile,
    pub trace: Vec<TraceEntry>,
    /// `None` if disabled, or if the search did not converge.
    pub mep: Option<MepFile>,
}

/// Run a saddle search (and possibly the MEP walks), writing results into `outdir`.
///
/// A search that runs out of iterations is not an error; check `termination`.
pub fn run_saddle_search(settings: &ValidatedSettings, outdir: &Path) -> FailResult<SearchOutcome> {
    let ValidatedSettings(settings) = settings;
    fs::create_dir_all(outdir)?;
    write_json(&outdir.join("settings.json"), settings)?;

    let potential = potential::from_config(&settings.potential);

    let mut builder = Builder::new(settings.dimer.clone());
    builder.basic_output_fn(|args: fmt::Arguments<'_>| info!("{}", args));
    if let Some(stop_condition) = &settings.stop_condition {
        builder.stop_condition(stop_condition.to_function());
    }
    if let Some(seed) = settings.seed {
        builder.seed(seed);
    }
    if settings.exclude_translations {
        for axis in 0..3 {
            let mut mode = vec![[0.0; 3]; settings.center.len()];
            for row in &mut mode {
                row[axis] = 1.0;
            }
            builder.exclude_mode(&mode);
        }
    }
    builder.orthogonal_search(settings.orthogonal_search);

    info!("Searching for a saddle ({} movable particles)", settings.center.len());
    let orientation = settings.orientation.as_ref().map(|x| &x[..]);
    let output = {
        builder.run(&settings.center, orientation, potential.force_query())
            .map_err(|e| report_failure(outdir, "saddle search", e))?
    };

    let saddle = SaddleFile {
        termination: output.termination,
        iterations: output.iterations,
        energy: output.energy,
        curvature: output.curvature,
        saddle_tolerance: output.saddle_tolerance(),
        center: output.center.clone(),
        plus: output.plus.clone(),
        minus: output.minus.clone(),
        orientation: output.orientation.clone(),
        force: output.force.clone(),
        num_evaluations: output.num_evaluations,
    };
    write_json(&outdir.join("saddle.json"), &saddle)?;
    write_json(&outdir.join("trace.json"), &output.trace)?;

    let mep = match &settings.mep {
        None => None,
        Some(_) if saddle.termination != Termination::SaddleFound => {
            warn!("Not walking the MEP from an unconverged saddle.");
            None
        },
        Some(params) => {
            let walk = |direction| {
                mep::walk(params, &saddle.center, &saddle.orientation, direction, potential.force_query())
                    .map_err(|e| report_failure(outdir, "MEP walk", e))
            };
            let forward = walk(Direction::Forward)?;
            let backward = walk(Direction::Backward)?;

            let file = MepFile {
                saddle_energy: saddle.energy,
                forward_barrier: saddle.energy - forward.energy,
                backward_barrier: saddle.energy - backward.energy,
                forward,
                backward,
            };
            info!(" Forward barrier: {}", file.forward_barrier);
            info!("Backward barrier: {}", file.backward_barrier);
            write_json(&outdir.join("mep.json"), &file)?;
            Some(file)
        },
    };

    Ok(SearchOutcome { saddle, trace: output.trace, mep })
}

// Saves the last known position (if any) to 'failed-center.json', and produces the error.
fn report_failure(outdir: &Path, what: &str, failure: Failure<Never>) -> failure::Error {
    if let Some(position) = &failure.best_position {
        let path = outdir.join("failed-center.json");
        match write_json(&path, position) {
            Ok(()) => warn!("Last center written to {}", path.display()),
            Err(e) => warn!("Could not save the last center: {}", e),
        }
    }
    format_err!("{} failed: {}", what, failure)
}

fn write_json(path: &Path, value: &impl Serialize) -> FailResult<()> {
    let file = fs::File::create(path)?;
    serde_json::to_writer_pretty(io::BufWriter::new(file), value)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use saddle_tasks_config::{DimerParams, LennardJones, Lift, MepParams, PotentialKind, Settings};
    use tempdir::TempDir;

    fn double_well() -> Settings {
        Settings {
            potential: PotentialKind::DoubleWell(Lift::default()),
            center: vec![[0.2, -0.1, 0.1]],
            orientation: None,
            seed: Some(1),
            dimer: DimerParams { force_sq_tol: 1e-12, ..DimerParams::default() },
            stop_condition: None,
            exclude_translations: false,
            orthogonal_search: false,
            mep: Some(MepParams::default()),
        }
    }

    #[test]
    fn writes_results() {
        let tmp = TempDir::new("saddle-cmd").unwrap();
        let settings = double_well().validate().unwrap();
        let outcome = run_saddle_search(&settings, tmp.path()).unwrap();

        assert_eq!(outcome.saddle.termination, Termination::SaddleFound);
        assert_close!(abs=1e-4, &outcome.saddle.center[0][..], &[0.0; 3][..]);
        assert_eq!(outcome.trace.len() as u64, outcome.saddle.iterations);

        let mep = outcome.mep.unwrap();
        assert_close!(abs=1e-3, mep.forward_barrier, 1.0);
        assert_close!(abs=1e-3, mep.backward_barrier, 1.0);

        for name in &["settings.json", "saddle.json", "trace.json", "mep.json"] {
            assert!(tmp.path().join(name).exists(), "{} missing", name);
        }
        let file: SaddleFile = serde_json::from_reader(fs::File::open(tmp.path().join("saddle.json")).unwrap()).unwrap();
        assert_eq!(file.termination, Termination::SaddleFound);
        assert_close!(abs=1e-14, file.center, outcome.saddle.center);
        assert_close!(abs=1e-14, file.orientation, outcome.saddle.orientation);
    }

    #[test]
    fn unconverged_search_skips_mep() {
        let tmp = TempDir::new("saddle-cmd").unwrap();
        let settings = Settings {
            dimer: DimerParams { max_iterations: 2, ..DimerParams::default() },
            ..double_well()
        };
        let outcome = run_saddle_search(&settings.validate().unwrap(), tmp.path()).unwrap();
        assert_eq!(outcome.saddle.termination, Termination::StepBudgetExceeded);
        assert!(outcome.mep.is_none());
        assert!(!tmp.path().join("mep.json").exists());
    }

    #[test]
    fn unphysical_start_saves_position() {
        let tmp = TempDir::new("saddle-cmd").unwrap();
        let settings = Settings {
            potential: PotentialKind::LennardJones(LennardJones {
                epsilon: 1.0,
                sigma: 1.0,
                fixed: vec![[0.0; 3]],
                overlap: 0.5,
            }),
            center: vec![[0.1, 0.0, 0.0]],
            mep: None,
            ..double_well()
        };
        let result = run_saddle_search(&settings.validate().unwrap(), tmp.path());
        assert!(result.is_err());
        assert!(tmp.path().join("failed-center.json").exists());
    }
}
