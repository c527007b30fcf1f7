//! Executable Entry Points
//!
//! Runs a skill shipped as an executable file inside its package. The
//! arguments go to stdin as one JSON object; stdout is the result.

use std::path::{Path, PathBuf};
use std::process::Stdio;

use anyhow::{Context, bail};
use async_trait::async_trait;
use serde_json::Value;
use tokio::io::AsyncWriteExt;
use tokio::process::Command;

use crate::skill::{Arguments, EntryPoint};

/// Entry point that spawns an executable per invocation
#[derive(Clone, Debug)]
pub struct ProcessEntryPoint {
    program: PathBuf,
    working_dir: PathBuf,
}

impl ProcessEntryPoint {
    pub fn new(program: impl Into<PathBuf>) -> Self {
        let program = program.into();
        let working_dir = program
            .parent()
            .map_or_else(|| PathBuf::from("."), Path::to_path_buf);
        Self {
            program,
            working_dir,
        }
    }

    pub fn program(&self) -> &Path {
        &self.program
    }
}

#[async_trait]
impl EntryPoint for ProcessEntryPoint {
    async fn call(&self, args: Arguments) -> anyhow::Result<Value> {
        let input = serde_json::to_vec(&args)?;

        let mut child = Command::new(&self.program)
            .current_dir(&self.working_dir)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()
            .with_context(|| format!("failed to start {}", self.program.display()))?;

        let stdin = child.stdin.take();
        let feed = async move {
            let Some(mut stdin) = stdin else {
                return Ok(());
            };
            // Programs that ignore their input may close stdin early
            match stdin.write_all(&input).await {
                Err(e) if e.kind() != std::io::ErrorKind::BrokenPipe => Err(e),
                _ => Ok(()),
            }
        };

        // Feed stdin while stdout drains
        let (fed, output) = tokio::join!(feed, child.wait_with_output());
        let output = output?;
        fed?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            let stderr = stderr.trim();
            if stderr.is_empty() {
                bail!("{} exited with {}", self.program.display(), output.status);
            }
            bail!("{stderr}");
        }

        let stdout = String::from_utf8_lossy(&output.stdout);
        let stdout = stdout.trim();
        Ok(serde_json::from_str(stdout).unwrap_or_else(|_| Value::String(stdout.to_string())))
    }
}

/// Whether `path` is a file this platform can execute
pub fn is_executable(path: &Path) -> bool {
    let Ok(metadata) = path.metadata() else {
        return false;
    };
    if !metadata.is_file() {
        return false;
    }

    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        metadata.permissions().mode() & 0o111 != 0
    }

    #[cfg(not(unix))]
    {
        true
    }
}
