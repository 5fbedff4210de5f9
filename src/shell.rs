use anyhow::{Context, Result};
use std::path::Path;
use std::process::Command;

pub struct Shell;

impl Shell {
    /// Run a local program and return its trimmed stdout.
    pub fn exec_local(
        program: &str,
        args: &[&str],
        cwd: Option<&Path>,
        dry_run: bool,
    ) -> Result<String> {
        if dry_run {
            println!("   [DRY RUN] Local: {} {}", program, args.join(" "));
            return Ok(String::new());
        }

        let mut cmd = Command::new(program);
        cmd.args(args);
        if let Some(dir) = cwd {
            cmd.current_dir(dir);
        }

        log::debug!("exec: {} {}", program, args.join(" "));
        let output = cmd
            .output()
            .with_context(|| format!("Failed to exec local command: {}", program))?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            let stdout = String::from_utf8_lossy(&output.stdout);
            return Err(anyhow::anyhow!(
                "Command failed (Exit: {:?}): STDERR: [{}] STDOUT: [{}]",
                output.status.code(),
                stderr.trim(),
                stdout.trim()
            ));
        }

        Ok(String::from_utf8_lossy(&output.stdout).trim().to_string())
    }

    /// Like `exec_local`, but a non-zero exit is not an error. Returns stdout
    /// and stderr joined.
    pub fn probe_local(program: &str, args: &[&str]) -> Result<String> {
        let output = Command::new(program)
            .args(args)
            .output()
            .with_context(|| format!("Failed to exec local command: {}", program))?;

        let mut text = String::from_utf8_lossy(&output.stdout).to_string();
        text.push_str(&String::from_utf8_lossy(&output.stderr));
        Ok(text)
    }
}
