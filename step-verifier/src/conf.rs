// Copyright 2022-2023 VMware, Inc.
// SPDX-License-Identifier: BSD-2-Clause

//! Solver selection and the sessions launched for each query.

use std::path::PathBuf;

use embed::session::Session;
use smtlib::conf::{CvcConf, SolverCmd, Z3Conf};
use smtlib::path::solver_path;
use smtlib::proc::SolverError;

/// The type of solver being used
#[allow(missing_docs)]
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum SolverType {
    Z3,
    Cvc5,
}

/// How to launch a solver for each query, and where to save query scripts.
#[derive(Debug, Clone)]
pub struct SolverConf {
    solver_type: SolverType,
    timeout_ms: Option<usize>,
    seed: usize,
    smt_dir: Option<PathBuf>,
}

impl SolverConf {
    /// Configuration for `solver_type` with no timeout.
    pub fn new(solver_type: SolverType) -> Self {
        SolverConf {
            solver_type,
            timeout_ms: None,
            seed: 0,
            smt_dir: None,
        }
    }

    /// Set the solver timeout. None disables the timeout.
    pub fn timeout_ms(&mut self, timeout_ms: Option<usize>) -> &mut Self {
        self.timeout_ms = timeout_ms;
        self
    }

    /// Set the solver's random seed (0 keeps the solver's default).
    pub fn seed(&mut self, seed: usize) -> &mut Self {
        self.seed = seed;
        self
    }

    /// Save the script of every query into `dir`.
    pub fn smt_dir(&mut self, dir: Option<PathBuf>) -> &mut Self {
        self.smt_dir = dir;
        self
    }

    /// The command that launches the configured solver.
    pub fn cmd(&self) -> SolverCmd {
        match self.solver_type {
            SolverType::Z3 => {
                let mut conf = Z3Conf::new(&solver_path("z3"));
                conf.timeout_ms(self.timeout_ms);
                if self.seed != 0 {
                    conf.options()
                        .option("smt.random_seed", format!("{}", self.seed));
                    conf.options()
                        .option("sat.random_seed", format!("{}", self.seed));
                }
                conf.done()
            }
            SolverType::Cvc5 => {
                let mut conf = CvcConf::new_cvc5(&solver_path("cvc5"));
                conf.timeout_ms(self.timeout_ms);
                if self.seed != 0 {
                    conf.options().option("seed", format!("{}", self.seed));
                }
                conf.done()
            }
        }
    }

    /// Launch a solver for a new query.
    pub fn session(&self) -> Result<Session, SolverError> {
        let cmd = self.cmd();
        log::debug!("launching {}", cmd.cmdline());
        Session::with_solver(cmd)
    }

    /// Save a finished query's script if a script directory is configured.
    pub fn save(&self, session: &Session) {
        let Some(dir) = &self.smt_dir else { return };
        match session.save_script(dir) {
            Ok(path) => log::info!("saved query to {}", path.display()),
            Err(err) => log::warn!("could not save query to {}: {err}", dir.display()),
        }
    }
}
