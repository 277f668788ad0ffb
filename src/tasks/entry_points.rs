/* ************************************************************************ **
** This file is part of saddle, and is licensed under EITHER the MIT        **
** license or the Apache 2.0 license, at your option.                       **
**                                                                          **
**     http://www.apache.org/licenses/LICENSE-2.0                           **
**     http://opensource.org/licenses/MIT                                   **
** ************************************************************************ */

use crate::FailResult;
use crate::cmd::run_saddle_search;
use crate::ui::logging::GlobalLogger;

use std::ffi::OsStr;
use std::fs;
use std::path::{Path, PathBuf};
use clap::{App, Arg};
use saddle_dimer::Termination;
use saddle_tasks_config::{ValidatedSettings, YamlRead};

/// Exit status when the search used up its iterations without finding a saddle.
pub const EXIT_NO_SADDLE: i32 = 2;

fn wrap_result_main<F>(main: F)
where F: FnOnce() -> FailResult<i32>,
{
    let code = main().unwrap_or_else(|e| {
        for cause in e.causes() {
            error!("{}", cause);
        }

        if std::env::var_os("RUST_BACKTRACE") == Some(OsStr::new("1").to_owned()) {
            error!("{}", e.backtrace());
        } else {
            error!("\
                (If you found the above error message to be particularly lacking in \
                detail, try again with RUST_BACKTRACE=1)\
            ");
        }
        std::process::exit(1);
    });
    if code != 0 {
        std::process::exit(code);
    }
}

fn exit_status(termination: Termination) -> i32 {
    match termination {
        Termination::SaddleFound => 0,
        Termination::StepBudgetExceeded => EXIT_NO_SADDLE,
    }
}

// Refuses to clobber an existing directory unless `force` is set.
fn prepare_outdir(path: &Path, force: bool) -> FailResult<()> {
    if path.exists() {
        if !force {
            bail!("{}: already exists (use --force to replace it)", path.display());
        }
        fs::remove_dir_all(path)?;
    }
    fs::create_dir_all(path)?;
    Ok(())
}

// -------------------------------------------------------------------------------------

pub fn saddle_search() {
    wrap_result_main(|| {
        let matches = {
            App::new("saddle-search")
                .about("Find a first-order saddle point with the dimer method")
                .arg(Arg::with_name("config")
                    .required(true)
                    .value_name("CONFIG")
                    .help("settings yaml"))
                .arg(Arg::with_name("outdir")
                    .short("o")
                    .long("output")
                    .required(true)
                    .takes_value(true)
                    .value_name("OUTDIR")
                    .help("output directory"))
                .arg(Arg::with_name("force")
                    .short("f")
                    .long("force")
                    .help("replace an existing output directory"))
                .arg(Arg::with_name("verbose")
                    .short("v")
                    .long("verbose")
                    .multiple(true)
                    .help("log every rotation"))
                .get_matches()
        };

        let config = PathBuf::from(matches.value_of_os("config").unwrap_or_default());
        let outdir = PathBuf::from(matches.value_of_os("outdir").unwrap_or_default());

        prepare_outdir(&outdir, matches.is_present("force"))?;
        GlobalLogger::default()
            .path(outdir.join("saddle.log"))
            .verbosity(matches.occurrences_of("verbose") as i32)
            .apply()?;

        let settings = {
            let file = fs::File::open(&config)
                .map_err(|e| format_err!("{}: {}", config.display(), e))?;
            ValidatedSettings::from_reader(file)?
        };

        let outcome = run_saddle_search(&settings, &outdir)?;
        match outcome.saddle.termination {
            Termination::SaddleFound => info!(
                "Saddle found after {} iterations: energy {}, curvature {}",
                outcome.saddle.iterations, outcome.saddle.energy, outcome.saddle.curvature,
            ),
            Termination::StepBudgetExceeded => warn!(
                "No saddle within {} iterations (tolerance {})",
                outcome.saddle.iterations, outcome.saddle.saddle_tolerance,
            ),
        }
        Ok(exit_status(outcome.saddle.termination))
    });
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempdir::TempDir;

    #[test]
    fn outdir_is_not_clobbered() {
        let tmp = TempDir::new("saddle-entry").unwrap();
        let outdir = tmp.path().join("out");

        prepare_outdir(&outdir, false).unwrap();
        fs::write(outdir.join("marker"), "x").unwrap();
        assert!(prepare_outdir(&outdir, false).is_err());
        assert!(outdir.join("marker").exists());

        prepare_outdir(&outdir, true).unwrap();
        assert!(outdir.is_dir());
        assert!(!outdir.join("marker").exists());
    }

    #[test]
    fn budget_exhaustion_is_a_failure() {
        assert_eq!(exit_status(Termination::SaddleFound), 0);
        assert_ne!(exit_status(Termination::StepBudgetExceeded), 0);
        assert_ne!(exit_status(Termination::StepBudgetExceeded), 1);
    }
}
