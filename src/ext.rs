use std::{
  io::{self, Write},
  path::Path,
  process::{Command, ExitStatus, Stdio},
};

use anyhow::{Context, Result};
use tempfile::NamedTempFile;

#[extend::ext]
pub impl ExitStatus {
  fn check_success(&self) -> Result<()> {
    if !self.success() {
      anyhow::bail!("exited with non-zero status {self}");
    }

    Ok(())
  }
}

#[extend::ext]
pub impl Command {
  /// Runs the command to completion with stdin closed, forwarding its stderr
  /// to ours. Returns the exit status together with the captured stdout.
  ///
  /// The only error is a failure to start the process at all.
  fn capture_stdout(&mut self) -> io::Result<(ExitStatus, String)> {
    let output = self.stdin(Stdio::null()).output()?;

    // Best effort, a closed stderr must not turn a finished trial into a failure.
    let _ = io::stderr().write_all(&output.stderr);

    Ok((output.status, String::from_utf8_lossy(&output.stdout).into_owned()))
  }

  /// Runs the command, capturing only stdout, returning an error on non-zero
  /// exit.
  fn status_stdout(&mut self) -> Result<String> {
    let (status, stdout) = self.capture_stdout().context("output")?;
    status.check_success()?;

    Ok(stdout)
  }
}

#[extend::ext]
pub impl Path {
  /// Replaces the file at this path with `contents` in one step. The data is
  /// written to a temporary file in the same directory which is then renamed
  /// over the target, so readers never observe a partial write.
  fn write_atomic(&self, contents: &[u8]) -> Result<()> {
    let dir = match self.parent() {
      Some(parent) if !parent.as_os_str().is_empty() => parent,
      _ => Path::new("."),
    };

    let mut file = NamedTempFile::new_in(dir).with_context(|| format!("tempfile in {dir:?}"))?;
    file.write_all(contents).context("write")?;
    file.as_file().sync_all().context("sync")?;
    file.persist(self).with_context(|| format!("persist {self:?}"))?;

    Ok(())
  }
}
