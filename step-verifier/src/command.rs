// Copyright 2022-2023 VMware, Inc.
// SPDX-License-Identifier: BSD-2-Clause

//! The step-verifier binary's command-line interface.

use std::io::{self, Write};
use std::path::PathBuf;
use std::{fs, process};

use clap::Args;
use embed::induction::InductionContext;
use embed::session::Session;
use logic::sorts::SortError;
use logic::syntax::Module;
use thiserror::Error;

use crate::conf::{self, SolverConf};
use crate::verify::{verify_module, VerifyError};

#[derive(clap::ValueEnum, Copy, Clone, Debug, PartialEq, Eq)]
enum SolverType {
    Z3,
    Cvc5,
}

#[derive(Args, Clone, Debug, PartialEq, Eq)]
struct SolverArgs {
    // --solver and --smt are global, meaning they are allowed even after
    // subcommands
    #[arg(value_enum, long, default_value_t = SolverType::Z3, global = true)]
    /// Solver to use
    solver: SolverType,

    #[arg(long, global = true)]
    /// Save the smt2 script of every query into this directory
    smt: Option<PathBuf>,

    #[arg(long, default_value_t = 600, global = true)]
    /// SMT solver timeout in seconds
    timeout: usize,

    #[arg(long, default_value_t = 0, global = true)]
    /// SMT solver random seed
    solver_seed: usize,
}

impl SolverArgs {
    fn get_solver_conf(&self) -> SolverConf {
        let solver_type = match self.solver {
            SolverType::Z3 => conf::SolverType::Z3,
            SolverType::Cvc5 => conf::SolverType::Cvc5,
        };
        let mut conf = SolverConf::new(solver_type);
        conf.timeout_ms(Some(self.timeout * 1000))
            .seed(self.solver_seed)
            .smt_dir(self.smt.clone());
        conf
    }
}

#[derive(clap::Subcommand, Clone, Debug, PartialEq, Eq)]
enum Command {
    /// Check that every conjecture is an inductive invariant.
    Check {
        #[command(flatten)]
        solver: SolverArgs,
        /// File name for a JSON module
        file: String,
    },
    /// Load and re-print a module (for debugging)
    Print {
        /// File name for a JSON module
        file: String,
    },
    /// Print the SMT-LIB encoding of one step of the module
    Smt {
        /// File name for a JSON module
        file: String,
    },
}

impl Command {
    fn file(&self) -> &str {
        match self {
            Command::Check { file, .. } => file,
            Command::Print { file } => file,
            Command::Smt { file } => file,
        }
    }
}

/// An error that stops a command.
#[derive(Error, Debug)]
pub enum AppError {
    /// The input file could not be read
    #[error("could not read {path}: {source}")]
    #[allow(missing_docs)]
    Read { path: String, source: io::Error },
    /// The input file is not a module
    #[error("could not parse module: {0}")]
    Parse(#[from] serde_json::Error),
    /// The module is not well sorted
    #[error("sort checking error: {0}")]
    Sort(#[from] SortError),
    /// Verification failed or could not be carried out
    #[error(transparent)]
    Verify(#[from] VerifyError),
    /// Output could not be written
    #[error(transparent)]
    Io(#[from] io::Error),
}

#[derive(clap::Parser, Debug)]
#[command(about, long_about=None)]
/// Entrypoint for the step-verifier binary, including all commands.
pub struct App {
    #[command(subcommand)]
    /// Command to run
    command: Command,
}

impl App {
    /// Run the command, writing its output to `out`.
    pub fn run<W: Write>(&self, out: &mut W) -> Result<(), AppError> {
        let path = self.command.file();
        let json = fs::read_to_string(path).map_err(|source| AppError::Read {
            path: path.to_string(),
            source,
        })?;
        let m = Module::from_json(&json)?;
        m.check()?;

        match &self.command {
            Command::Print { .. } => write!(out, "{m}")?,
            Command::Smt { .. } => {
                let ind = InductionContext::new(Session::new(), &m).map_err(VerifyError::from)?;
                writeln!(out, "{}", ind.ctx.session().render())?;
            }
            Command::Check { solver, .. } => {
                verify_module(&solver.get_solver_conf(), &m)?;
                writeln!(out, "verifies!")?;
            }
        }
        Ok(())
    }

    /// Run the application, exiting with a nonzero status on failure.
    pub fn exec(self) {
        let stdout = io::stdout();
        if let Err(err) = self.run(&mut stdout.lock()) {
            match err {
                AppError::Verify(VerifyError::Failed(fails)) => {
                    eprintln!("verification errors:");
                    for fail in &fails.fails {
                        eprintln!("{fail}");
                    }
                }
                err => eprintln!("{err}"),
            }
            process::exit(1);
        }
    }
}
