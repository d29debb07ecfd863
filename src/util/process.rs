//! Subprocess execution utilities.

use std::ffi::OsStr;
use std::path::{Path, PathBuf};
use std::process::{Command, ExitStatus, Output, Stdio};

use anyhow::{bail, Context, Result};

/// Builder for subprocess execution.
#[derive(Debug, Clone)]
pub struct ProcessBuilder {
    program: PathBuf,
    args: Vec<String>,
    env: Vec<(String, String)>,
    cwd: Option<PathBuf>,
}

impl ProcessBuilder {
    /// Create a new process builder for the given program.
    pub fn new(program: impl AsRef<Path>) -> Self {
        ProcessBuilder {
            program: program.as_ref().to_path_buf(),
            args: Vec::new(),
            env: Vec::new(),
            cwd: None,
        }
    }

    /// Add a single argument.
    pub fn arg(mut self, arg: impl AsRef<OsStr>) -> Self {
        self.args.push(arg.as_ref().to_string_lossy().into_owned());
        self
    }

    /// Add multiple arguments.
    pub fn args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<OsStr>,
    {
        self.args.extend(
            args.into_iter()
                .map(|s| s.as_ref().to_string_lossy().into_owned()),
        );
        self
    }

    /// Set an environment variable.
    pub fn env(mut self, key: impl AsRef<str>, value: impl AsRef<str>) -> Self {
        self.env
            .push((key.as_ref().to_string(), value.as_ref().to_string()));
        self
    }

    /// Set multiple environment variables, in order.
    pub fn envs<'a, I>(mut self, vars: I) -> Self
    where
        I: IntoIterator<Item = &'a (String, String)>,
    {
        self.env.extend(vars.into_iter().cloned());
        self
    }

    /// Set the working directory.
    pub fn cwd(mut self, cwd: impl AsRef<Path>) -> Self {
        self.cwd = Some(cwd.as_ref().to_path_buf());
        self
    }

    /// Get the program path.
    pub fn get_program(&self) -> &Path {
        &self.program
    }

    /// Get the arguments.
    pub fn get_args(&self) -> &[String] {
        &self.args
    }

    /// Build the Command.
    fn build_command(&self) -> Command {
        let mut cmd = Command::new(&self.program);
        cmd.args(&self.args);

        for (key, value) in &self.env {
            cmd.env(key, value);
        }

        if let Some(ref cwd) = self.cwd {
            cmd.current_dir(cwd);
        }

        cmd
    }

    /// Execute the command with captured output and wait for completion.
    pub fn exec(&self) -> Result<Output> {
        let mut cmd = self.build_command();
        cmd.stdout(Stdio::piped());
        cmd.stderr(Stdio::piped());

        let output = cmd
            .output()
            .with_context(|| format!("failed to spawn `{}`", self.program.display()))?;

        Ok(output)
    }

    /// Execute with captured output and require success.
    pub fn exec_and_check(&self) -> Result<Output> {
        let output = self.exec()?;
        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            bail!(
                "`{}` failed with exit code {:?}\n{}",
                self.display_command(),
                output.status.code(),
                stderr
            );
        }
        Ok(output)
    }

    /// Execute with inherited stdio and return the exit status.
    pub fn status(&self) -> Result<ExitStatus> {
        let mut cmd = self.build_command();
        let status = cmd
            .status()
            .with_context(|| format!("failed to execute `{}`", self.program.display()))?;
        Ok(status)
    }

    /// Execute with inherited stdio and require success.
    pub fn status_and_check(&self) -> Result<()> {
        let status = self.status()?;
        if !status.success() {
            bail!(
                "`{}` failed with exit code {:?}",
                self.display_command(),
                status.code()
            );
        }
        Ok(())
    }

    /// Display the command for error messages.
    pub fn display_command(&self) -> String {
        let mut parts = vec![self.program.display().to_string()];
        parts.extend(self.args.iter().cloned());
        parts.join(" ")
    }
}

/// Find an executable in PATH.
pub fn find_executable(name: &str) -> Option<PathBuf> {
    which::which(name).ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_process_builder() {
        let output = ProcessBuilder::new("echo").arg("hello").exec().unwrap();

        assert!(output.status.success());
        let stdout = String::from_utf8_lossy(&output.stdout);
        assert!(stdout.trim() == "hello" || stdout.contains("hello"));
    }

    #[test]
    fn test_display_command() {
        let pb = ProcessBuilder::new("make").args(["-j4", "install"]);

        assert_eq!(pb.display_command(), "make -j4 install");
    }

    #[test]
    fn test_env_ordering_preserved() {
        let pb = ProcessBuilder::new("env")
            .env("KEELSON_A", "1")
            .envs(&[("KEELSON_B".to_string(), "2".to_string())]);

        let output = pb.exec().unwrap();
        let stdout = String::from_utf8_lossy(&output.stdout);
        assert!(stdout.contains("KEELSON_A=1"));
        assert!(stdout.contains("KEELSON_B=2"));
    }
}
