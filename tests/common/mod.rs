use assert_cmd::{Command, cargo::cargo_bin_cmd};
use std::path::Path;
use std::process::Output;

// The library scenario suite never spawns the binary.
#[allow(dead_code)]
pub fn buildward_cmd(cwd: &Path) -> Command {
    let mut cmd = cargo_bin_cmd!("buildward");
    cmd.arg("-C").arg(cwd);
    cmd
}

/// Runs `buildward run <args> -- sh -c <script>` in `cwd`.
#[allow(dead_code)]
pub fn run_script(cwd: &Path, args: &[&str], script: &str) -> Output {
    let mut cmd = buildward_cmd(cwd);
    cmd.arg("run")
        .args(args)
        .arg("--")
        .arg("sh")
        .arg("-c")
        .arg(script);
    cmd.output().expect("failed to run `buildward run`")
}

// Library scenario tests use the same shell wrapper as the tool under test.
#[allow(dead_code)]
pub fn sh(script: &str) -> Vec<String> {
    vec!["sh".to_string(), "-c".to_string(), script.to_string()]
}
