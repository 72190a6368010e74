//! Throwaway shell scripts for driving real processes in tests.

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use tempfile::TempDir;
use taskstream::Task;

/// A `#!/bin/sh` script in its own temporary directory.
///
/// The directory (and the script) is removed when the value is dropped.
pub struct ScriptFile {
    _dir: TempDir,
    path: PathBuf,
}

impl ScriptFile {
    /// Write `commands`, one per line, after a `#!/bin/sh` header.
    pub fn new<I, S>(commands: I) -> Result<Self>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let dir = tempfile::tempdir().context("creating script dir")?;
        let path = dir.path().join("script.sh");

        let mut body = String::from("#!/bin/sh\n");
        for cmd in commands {
            body.push_str(cmd.as_ref());
            body.push('\n');
        }
        fs::write(&path, body).with_context(|| format!("writing {:?}", path))?;
        make_executable(&path)?;

        Ok(Self { _dir: dir, path })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// A task running the script through `sh`.
    ///
    /// Preferred in tests that run in parallel: executing a freshly written
    /// file directly can fail with `ETXTBSY` while another thread forks.
    pub fn task(&self) -> Task {
        Task::new("sh").arg(&self.path)
    }

    /// A task executing the script file itself.
    pub fn executable_task(&self) -> Task {
        Task::new(&self.path)
    }
}

#[cfg(unix)]
fn make_executable(path: &Path) -> Result<()> {
    use std::os::unix::fs::PermissionsExt;

    let mut perms = fs::metadata(path)?.permissions();
    perms.set_mode(0o755);
    fs::set_permissions(path, perms).with_context(|| format!("chmod {:?}", path))
}

#[cfg(not(unix))]
fn make_executable(_path: &Path) -> Result<()> {
    Ok(())
}
