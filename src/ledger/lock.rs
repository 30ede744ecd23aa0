use crate::config::LockWait;
use fs2::FileExt;
use std::fs::OpenOptions;
use std::io;
use std::path::Path;
use std::thread;
use std::time::Instant;

/// Waits until no other process holds `path` open exclusively.
///
/// Returns `Ok(true)` when the file is free (or does not exist yet) and
/// `Ok(false)` once `wait.timeout()` has passed. Errors other than lock
/// contention are returned as they are.
pub fn wait_until_writable(path: &Path, wait: &LockWait) -> io::Result<bool> {
    if !path.is_file() {
        return Ok(true);
    }

    let start = Instant::now();
    loop {
        match try_exclusive(path) {
            Ok(()) => return Ok(true),
            Err(err) if is_contention(&err) => {
                log::info!(
                    "{} is already opened. Waiting user to close...",
                    path.display()
                );
                if start.elapsed() >= wait.timeout() {
                    log::debug!(
                        "Timeout of {} minutes has passed for {}",
                        wait.timeout_mins,
                        path.display()
                    );
                    return Ok(false);
                }
                thread::sleep(wait.retry());
            }
            Err(err) => return Err(err),
        }
    }
}

fn try_exclusive(path: &Path) -> io::Result<()> {
    let file = OpenOptions::new().read(true).write(true).open(path)?;
    file.try_lock_exclusive()?;
    file.unlock()
}

fn is_contention(err: &io::Error) -> bool {
    matches!(
        err.kind(),
        io::ErrorKind::PermissionDenied | io::ErrorKind::WouldBlock
    ) || err.raw_os_error() == fs2::lock_contended_error().raw_os_error()
}
