use std::fs::File;
use std::io;
use std::mem;
use std::os::windows::io::AsRawHandle;
use std::path::Path;

use winapi::shared::winerror::ERROR_LOCK_VIOLATION;
use winapi::um::fileapi::{
    GetFileInformationByHandle, LockFileEx, UnlockFileEx, BY_HANDLE_FILE_INFORMATION,
};
use winapi::um::minwinbase::{LOCKFILE_EXCLUSIVE_LOCK, LOCKFILE_FAIL_IMMEDIATELY, OVERLAPPED};
use winapi::um::winnt::HANDLE;

/// An exclusive byte-range lock over the whole sentinel file.
pub(super) struct FileLock(File);

pub(super) enum Attempt {
    Acquired(FileLock),
    Contended(File),
}

fn lock_file(file: &File, flags: u32) -> io::Result<()> {
    // SAFETY: the handle is owned by `file` and stays open for the call;
    // a zeroed OVERLAPPED is the documented way to lock from offset 0.
    let ok = unsafe {
        let mut overlapped: OVERLAPPED = mem::zeroed();
        LockFileEx(
            file.as_raw_handle() as HANDLE,
            flags,
            0,
            !0,
            !0,
            &mut overlapped,
        )
    };
    if ok == 0 {
        Err(io::Error::last_os_error())
    } else {
        Ok(())
    }
}

pub(super) fn try_lock(file: File) -> io::Result<Attempt> {
    match lock_file(&file, LOCKFILE_EXCLUSIVE_LOCK | LOCKFILE_FAIL_IMMEDIATELY) {
        Ok(()) => Ok(Attempt::Acquired(FileLock(file))),
        Err(e) if e.raw_os_error() == Some(ERROR_LOCK_VIOLATION as i32) => {
            Ok(Attempt::Contended(file))
        }
        Err(e) => Err(e),
    }
}

pub(super) fn lock_blocking(file: File) -> io::Result<FileLock> {
    lock_file(&file, LOCKFILE_EXCLUSIVE_LOCK)?;
    Ok(FileLock(file))
}

fn file_id(file: &File) -> Option<(u32, u64)> {
    // SAFETY: `info` is a plain-old-data out parameter.
    unsafe {
        let mut info: BY_HANDLE_FILE_INFORMATION = mem::zeroed();
        if GetFileInformationByHandle(file.as_raw_handle() as HANDLE, &mut info) == 0 {
            return None;
        }
        let index = ((info.nFileIndexHigh as u64) << 32) | info.nFileIndexLow as u64;
        Some((info.dwVolumeSerialNumber, index))
    }
}

/// Whether `path` still names the locked file.
pub(super) fn same_file(lock: &FileLock, path: &Path) -> bool {
    let current = match File::open(path) {
        Ok(f) => f,
        Err(_) => return false,
    };
    match (file_id(&lock.0), file_id(&current)) {
        (Some(a), Some(b)) => a == b,
        _ => false,
    }
}

pub(super) fn unlock(lock: FileLock) -> io::Result<()> {
    // SAFETY: as in `lock_file`.
    let ok = unsafe {
        let mut overlapped: OVERLAPPED = mem::zeroed();
        UnlockFileEx(lock.0.as_raw_handle() as HANDLE, 0, !0, !0, &mut overlapped)
    };
    if ok == 0 {
        Err(io::Error::last_os_error())
    } else {
        Ok(())
    }
}
