// Copyright 2022-2023 VMware, Inc.
// SPDX-License-Identifier: BSD-2-Clause

//! Locate solver binaries.

use std::{env, path::Path};

/// Get the right invocation of the solver with binary name bin.
///
/// First checks if the solver environment variable is set (eg, Z3_BIN), which
/// takes first priority. Then checks for the binary in the `solvers`
/// directory at the root of the workspace. Finally falls back to just using
/// bin as-is (that is, relying on $PATH).
pub fn solver_path(bin: &str) -> String {
    let var = bin.to_uppercase() + "_BIN";
    if let Some(val) = env::var_os(var) {
        return val.to_string_lossy().into();
    }
    let bin = if env::consts::OS == "windows" && !bin.ends_with(".exe") {
        bin.to_owned() + ".exe"
    } else {
        bin.to_owned()
    };
    let workspace_bin = Path::new(env!("CARGO_MANIFEST_DIR"))
        .parent()
        .map(|root| root.join("solvers").join(&bin));
    match workspace_bin {
        Some(path) if path.exists() => path.to_string_lossy().into(),
        _ => bin,
    }
}

#[cfg(test)]
mod tests {
    use super::solver_path;

    #[test]
    fn test_env_override() {
        std::env::set_var("FAKESOLVER_BIN", "/opt/fake/bin/fakesolver");
        assert_eq!(solver_path("fakesolver"), "/opt/fake/bin/fakesolver");
        assert!(solver_path("nosuchsolver").ends_with("nosuchsolver")
            || solver_path("nosuchsolver").ends_with("nosuchsolver.exe"));
    }
}
