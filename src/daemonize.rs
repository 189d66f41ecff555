//! `--daemon` support (SPEC_FULL.md §D, spec §6): fork+setsid+chdir("/") on
//! POSIX via `nix`; on non-POSIX, run in-process and write a PID file to the
//! platform temp dir.

use crate::error::{CanControllerError, Result};

#[cfg(unix)]
pub fn daemonize() -> Result<()> {
    use nix::unistd::{chdir, fork, setsid, ForkResult};

    match unsafe { fork() }.map_err(|e| CanControllerError::Config(format!("fork failed: {e}")))? {
        ForkResult::Parent { .. } => std::process::exit(0),
        ForkResult::Child => {
            setsid().map_err(|e| CanControllerError::Config(format!("setsid failed: {e}")))?;
            chdir("/").map_err(|e| CanControllerError::Config(format!("chdir failed: {e}")))?;
            write_pid_file()
        }
    }
}

#[cfg(not(unix))]
pub fn daemonize() -> Result<()> {
    write_pid_file()
}

fn write_pid_file() -> Result<()> {
    let path = std::env::temp_dir().join("can_controller_node.pid");
    std::fs::write(&path, format!("{}", std::process::id())).map_err(|e| CanControllerError::Config(format!("failed to write pid file: {e}")))?;
    tracing::info!(path = %path.display(), "daemonized");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pid_file_contains_current_process_id() {
        write_pid_file().unwrap();
        let path = std::env::temp_dir().join("can_controller_node.pid");
        let contents = std::fs::read_to_string(&path).unwrap();
        assert_eq!(contents, std::process::id().to_string());
        std::fs::remove_file(&path).ok();
    }
}
