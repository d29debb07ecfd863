//! Build step execution.
//!
//! Steps run through a [`CommandRunner`] so orchestration logic can be
//! unit-tested without spawning real subprocesses. Placeholders
//! (`${prefix}`, `${src}`, `${jobs}`) are expanded here, and well-known
//! tool names honor their override environment variables (`MAKE`, `TAR`).

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};

use crate::build::env::EnvironmentOverlay;
use crate::core::recipe::Step;
use crate::util::fs::{ensure_dir, symlink, write_string};
use crate::util::process::ProcessBuilder;

/// Executes a prepared command, blocking until it exits.
pub trait CommandRunner {
    /// Run the command; non-zero exit is an error.
    fn run(&self, cmd: &ProcessBuilder) -> Result<()>;
}

/// The real runner: inherits stdio so build output streams to the user.
#[derive(Debug, Default)]
pub struct SystemRunner;

impl CommandRunner for SystemRunner {
    fn run(&self, cmd: &ProcessBuilder) -> Result<()> {
        cmd.status_and_check()
    }
}

/// Everything a step needs to execute.
pub struct StepContext<'a> {
    /// Working directory for commands and relative paths.
    pub cwd: &'a Path,
    /// The package's extracted source tree.
    pub source_dir: &'a Path,
    /// The install root.
    pub prefix: &'a Path,
    /// Job-parallelism count, for `${jobs}`.
    pub jobs: usize,
    /// Environment seen by spawned commands.
    pub overlay: &'a EnvironmentOverlay,
}

impl StepContext<'_> {
    fn expand(&self, input: &str) -> String {
        input
            .replace("${prefix}", &self.prefix.display().to_string())
            .replace("${src}", &self.source_dir.display().to_string())
            .replace("${jobs}", &self.jobs.to_string())
    }

    fn expand_path(&self, input: &Path) -> PathBuf {
        let expanded = self.expand(&input.display().to_string());
        let path = PathBuf::from(expanded);
        if path.is_absolute() {
            path
        } else {
            self.cwd.join(path)
        }
    }
}

/// Execute one step. The rendered failing command is attached as context
/// so it surfaces in the diagnostic line.
pub fn run_step(step: &Step, cx: &StepContext<'_>, runner: &dyn CommandRunner) -> Result<()> {
    match step {
        Step::Run { program, args } => {
            let program = resolve_tool(&cx.expand(program));
            let cmd = cx
                .overlay
                .apply(ProcessBuilder::new(&program))
                .args(args.iter().map(|a| cx.expand(a)))
                .cwd(cx.cwd);
            runner
                .run(&cmd)
                .with_context(|| format!("command failed: {}", cmd.display_command()))
        }
        Step::Patch { file, strip } => {
            let file = cx.expand_path(file);
            let cmd = cx
                .overlay
                .apply(ProcessBuilder::new("patch"))
                .arg(format!("-p{strip}"))
                .arg("-i")
                .arg(&file)
                .cwd(cx.source_dir);
            runner
                .run(&cmd)
                .with_context(|| format!("patch failed: {}", file.display()))
        }
        Step::Symlink { target, link } => {
            let target = cx.expand_path(target);
            let link = cx.expand_path(link);
            if let Some(parent) = link.parent() {
                ensure_dir(parent)?;
            }
            symlink(&target, &link).with_context(|| {
                format!(
                    "failed to link {} -> {}",
                    link.display(),
                    target.display()
                )
            })
        }
        Step::Write { path, contents } => {
            let path = cx.expand_path(path);
            write_string(&path, &cx.expand(contents))
        }
    }
}

/// Run a step sequence in order, stopping at the first failure.
pub fn run_steps(
    steps: &[Step],
    cx: &StepContext<'_>,
    runner: &dyn CommandRunner,
) -> Result<()> {
    for step in steps {
        run_step(step, cx, runner)?;
    }
    Ok(())
}

/// Honor tool-override environment variables for well-known build tools.
fn resolve_tool(program: &str) -> String {
    let override_var = match program {
        "make" => "MAKE",
        "tar" => "TAR",
        _ => return program.to_string(),
    };
    match std::env::var(override_var) {
        Ok(value) if !value.is_empty() => value,
        _ => program.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::RefCell;
    use tempfile::TempDir;

    /// Records rendered commands instead of executing them.
    #[derive(Default)]
    pub struct RecordingRunner {
        pub commands: RefCell<Vec<String>>,
    }

    impl CommandRunner for RecordingRunner {
        fn run(&self, cmd: &ProcessBuilder) -> Result<()> {
            self.commands.borrow_mut().push(cmd.display_command());
            Ok(())
        }
    }

    fn overlay() -> EnvironmentOverlay {
        EnvironmentOverlay::for_prefix(Path::new("/opt/boot"))
    }

    #[test]
    fn test_run_step_expands_placeholders() {
        let tmp = TempDir::new().unwrap();
        let overlay = overlay();
        let cx = StepContext {
            cwd: tmp.path(),
            source_dir: tmp.path(),
            prefix: Path::new("/opt/boot"),
            jobs: 4,
            overlay: &overlay,
        };

        let runner = RecordingRunner::default();
        let step = Step::Run {
            program: "sh".to_string(),
            args: vec![
                "configure".to_string(),
                "--prefix=${prefix}".to_string(),
                "-j${jobs}".to_string(),
            ],
        };
        run_step(&step, &cx, &runner).unwrap();

        let commands = runner.commands.borrow();
        assert_eq!(commands.as_slice(), ["sh configure --prefix=/opt/boot -j4"]);
    }

    #[test]
    fn test_patch_step_uses_source_dir() {
        let tmp = TempDir::new().unwrap();
        let overlay = overlay();
        let src = tmp.path().join("src");
        let cx = StepContext {
            cwd: tmp.path(),
            source_dir: &src,
            prefix: Path::new("/opt/boot"),
            jobs: 1,
            overlay: &overlay,
        };

        let runner = RecordingRunner::default();
        let step = Step::Patch {
            file: PathBuf::from("fix.diff"),
            strip: 0,
        };
        run_step(&step, &cx, &runner).unwrap();

        let commands = runner.commands.borrow();
        assert!(commands[0].starts_with("patch -p0 -i"));
        assert!(commands[0].contains("fix.diff"));
    }

    #[test]
    fn test_write_and_symlink_steps() {
        let tmp = TempDir::new().unwrap();
        let overlay = overlay();
        let cx = StepContext {
            cwd: tmp.path(),
            source_dir: tmp.path(),
            prefix: tmp.path(),
            jobs: 1,
            overlay: &overlay,
        };
        let runner = RecordingRunner::default();

        run_step(
            &Step::Write {
                path: PathBuf::from("share/note.txt"),
                contents: "prefix is ${prefix}\n".to_string(),
            },
            &cx,
            &runner,
        )
        .unwrap();

        let written = std::fs::read_to_string(tmp.path().join("share/note.txt")).unwrap();
        assert_eq!(written, format!("prefix is {}\n", tmp.path().display()));

        run_step(
            &Step::Symlink {
                target: PathBuf::from("share/note.txt"),
                link: PathBuf::from("bin/note"),
            },
            &cx,
            &runner,
        )
        .unwrap();
        assert!(tmp.path().join("bin/note").exists());
    }

    #[test]
    fn test_resolve_tool_passthrough() {
        // No override set for arbitrary tools
        assert_eq!(resolve_tool("sh"), "sh");
    }
}
