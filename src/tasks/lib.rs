/* ************************************************************************ **
** This file is part of saddle, and is licensed under EITHER the MIT        **
** license or the Apache 2.0 license, at your option.                       **
**                                                                          **
**     http://www.apache.org/licenses/LICENSE-2.0                           **
**     http://opensource.org/licenses/MIT                                   **
** ************************************************************************ */

//! Everything between the command line and `saddle_dimer`.

#[macro_use] extern crate log;
#[macro_use] extern crate failure;
#[macro_use] extern crate serde_derive;
#[cfg(test)] #[macro_use] extern crate saddle_assert_close;

pub type FailResult<T> = Result<T, failure::Error>;

mod ui;
mod potential;
mod cmd;
pub mod entry_points;

pub use crate::cmd::{run_saddle_search, SaddleFile, MepFile, SearchOutcome};
pub use saddle_tasks_config::{Settings, ValidatedSettings, YamlRead};
