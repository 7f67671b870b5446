// Copyright 2022-2023 VMware, Inc.
// SPDX-License-Identifier: BSD-2-Clause

//! Construct launch and option configurations for Z3 and CVC5.

/// The full invocation of a solver binary.
#[derive(Debug, Clone)]
pub struct SolverCmd {
    /// Binary to launch
    pub cmd: String,
    /// Arguments to pass
    pub args: Vec<String>,
    /// SMT options to send on startup
    pub options: Vec<(String, String)>,
}

impl SolverCmd {
    fn new<I>(cmd: &str, args: I) -> Self
    where
        I: IntoIterator<Item = &'static str>,
    {
        SolverCmd {
            cmd: cmd.to_string(),
            args: args.into_iter().map(|s| s.to_string()).collect(),
            options: vec![],
        }
    }

    /// Set an option, replacing an earlier setting of the same option.
    pub fn option<S: AsRef<str>>(&mut self, name: &str, val: S) {
        self.options.retain(|(n, _)| n != name);
        self.options
            .push((name.to_string(), val.as_ref().to_string()));
    }

    /// Build the command line string, for printing purposes.
    pub fn cmdline(&self) -> String {
        let args: Vec<_> = self
            .args
            .iter()
            .map(|a| {
                if a.contains(' ') {
                    format!("\"{a}\"")
                } else {
                    a.clone()
                }
            })
            .collect();
        format!("{} {}", &self.cmd, args.join(" "))
    }
}

/// Builder for creating a Z3 [`SolverCmd`].
#[derive(Debug, Clone)]
pub struct Z3Conf(SolverCmd);

impl Z3Conf {
    /// Create a Z3Conf with some default options. Uses `cmd` as the path to Z3.
    pub fn new(cmd: &str) -> Self {
        let mut cmd = SolverCmd::new(cmd, ["-in", "-smt2"]);
        cmd.option("produce-models", "true");
        cmd.option("model.completion", "true");
        let mut conf = Self(cmd);
        conf.timeout_ms(None);
        conf
    }

    /// Set the SMT timeout option. None uses Z3's default (no limit).
    pub fn timeout_ms(&mut self, ms: Option<usize>) {
        let ms = ms.unwrap_or(4294967295);
        self.0.option("timeout", format!("{ms}"));
    }

    /// Get access to the raw options of the solver.
    pub fn options(&mut self) -> &mut SolverCmd {
        &mut self.0
    }

    /// Get the final command to run the solver.
    pub fn done(self) -> SolverCmd {
        self.0
    }
}

/// Builder for a CVC5 [`SolverCmd`].
#[derive(Debug, Clone)]
pub struct CvcConf(SolverCmd);

impl CvcConf {
    /// Create a new CVC5 builder with some default options.
    pub fn new_cvc5(cmd: &str) -> Self {
        let mut cmd = SolverCmd::new(cmd, ["-q", "--lang", "smt2"]);
        cmd.option("interactive", "false");
        cmd.option("incremental", "true");
        cmd.option("produce-models", "true");
        cmd.option("seed", "1");
        Self(cmd)
    }

    /// Set a per-query time limit. None sets no time limit.
    pub fn timeout_ms(&mut self, ms: Option<usize>) {
        let ms = ms.unwrap_or(0);
        self.0.option("tlimit-per", format!("{ms}"));
    }

    /// Get access to the raw options of the solver.
    pub fn options(&mut self) -> &mut SolverCmd {
        &mut self.0
    }

    /// Get the final command to run the solver.
    pub fn done(self) -> SolverCmd {
        self.0
    }
}
