use std::fs::File;
use std::io;
use std::os::unix::fs::MetadataExt;
use std::path::Path;

use nix::errno::Errno;
use nix::fcntl::{Flock, FlockArg};

use crate::interrupt;

/// An exclusive `flock` on the sentinel file.
pub(super) struct FileLock(Flock<File>);

pub(super) enum Attempt {
    Acquired(FileLock),
    Contended(File),
}

pub(super) fn try_lock(file: File) -> io::Result<Attempt> {
    match Flock::lock(file, FlockArg::LockExclusiveNonblock) {
        Ok(lock) => Ok(Attempt::Acquired(FileLock(lock))),
        Err((file, Errno::EWOULDBLOCK)) => Ok(Attempt::Contended(file)),
        Err((_, errno)) => Err(errno.into()),
    }
}

/// Wait for the lock. A signal that set the interrupt flag aborts the wait.
pub(super) fn lock_blocking(mut file: File) -> io::Result<FileLock> {
    loop {
        match Flock::lock(file, FlockArg::LockExclusive) {
            Ok(lock) => return Ok(FileLock(lock)),
            Err((_, Errno::EINTR)) if interrupt::is_interrupted() => {
                return Err(io::Error::new(
                    io::ErrorKind::Interrupted,
                    "interrupted while waiting for lock",
                ));
            }
            Err((retry, Errno::EINTR)) => file = retry,
            Err((_, errno)) => return Err(errno.into()),
        }
    }
}

/// Whether `path` still names the locked file.
pub(super) fn same_file(lock: &FileLock, path: &Path) -> bool {
    let held = match lock.0.metadata() {
        Ok(m) => m,
        Err(_) => return false,
    };
    match path.metadata() {
        Ok(current) => held.dev() == current.dev() && held.ino() == current.ino(),
        Err(_) => false,
    }
}

pub(super) fn unlock(lock: FileLock) -> io::Result<()> {
    lock.0.unlock().map(drop).map_err(|(_, errno)| errno.into())
}
