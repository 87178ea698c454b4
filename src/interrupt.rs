//! Operator interruption (Ctrl-C / SIGTERM).
//!
//! Handlers only set a flag; long-running steps poll it between units of
//! work and unwind through their normal cleanup paths.

use std::io::{self, Read, Write};
use std::sync::atomic::{AtomicBool, Ordering};

static INTERRUPTED: AtomicBool = AtomicBool::new(false);

/// Exit status used after an interruption.
pub const EXIT_INTERRUPTED: i32 = 130;

const COPY_CHUNK: usize = 64 * 1024;

/// Install SIGINT/SIGTERM handlers.
///
/// `SA_RESTART` is deliberately not set so a blocking lock wait returns
/// `EINTR` and can observe the flag.
#[cfg(unix)]
pub fn install_handlers() -> nix::Result<()> {
    use nix::sys::signal::{sigaction, SaFlags, SigAction, SigHandler, SigSet, Signal};

    let action = SigAction::new(
        SigHandler::Handler(handle_interrupt),
        SaFlags::empty(),
        SigSet::empty(),
    );

    // SAFETY: the handler only stores to an atomic, which is async-signal-safe.
    unsafe {
        sigaction(Signal::SIGINT, &action)?;
        sigaction(Signal::SIGTERM, &action)?;
    }

    Ok(())
}

#[cfg(not(unix))]
pub fn install_handlers() -> std::io::Result<()> {
    Ok(())
}

#[cfg(unix)]
extern "C" fn handle_interrupt(_: i32) {
    INTERRUPTED.store(true, Ordering::SeqCst);
}

/// Whether an interruption has been requested.
pub fn is_interrupted() -> bool {
    INTERRUPTED.load(Ordering::SeqCst)
}

/// Copy `reader` to `writer` in fixed-size chunks, polling `interrupted`
/// before each one.
///
/// Stops with [`io::ErrorKind::Interrupted`] once `interrupted` returns true.
/// `EINTR` from the reader is retried, so that kind only ever signals a stop.
pub fn copy_interruptible<R, W, F>(reader: &mut R, writer: &mut W, interrupted: F) -> io::Result<u64>
where
    R: Read + ?Sized,
    W: Write + ?Sized,
    F: Fn() -> bool,
{
    let mut buf = vec![0u8; COPY_CHUNK];
    let mut total = 0u64;

    loop {
        if interrupted() {
            return Err(io::Error::new(io::ErrorKind::Interrupted, "interrupted by operator"));
        }

        let n = match reader.read(&mut buf) {
            Ok(0) => return Ok(total),
            Ok(n) => n,
            Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
            Err(e) => return Err(e),
        };

        writer.write_all(&buf[..n])?;
        total += n as u64;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::Cell;
    use std::io::Cursor;

    #[test]
    fn test_install_handlers() {
        assert!(install_handlers().is_ok());
    }

    #[test]
    fn test_copy_runs_to_end() {
        let data = vec![7u8; COPY_CHUNK * 2 + 10];
        let mut out = Vec::new();

        let copied = copy_interruptible(&mut Cursor::new(&data), &mut out, || false).unwrap();
        assert_eq!(copied, data.len() as u64);
        assert_eq!(out, data);
    }

    #[test]
    fn test_copy_stops_between_chunks() {
        let data = vec![7u8; COPY_CHUNK * 4];
        let mut out = Vec::new();
        let polls = Cell::new(0);

        let result = copy_interruptible(&mut Cursor::new(&data), &mut out, || {
            polls.set(polls.get() + 1);
            polls.get() > 1
        });

        assert_eq!(result.unwrap_err().kind(), io::ErrorKind::Interrupted);
        assert_eq!(out.len(), COPY_CHUNK);
    }

    #[test]
    fn test_not_interrupted_by_default() {
        assert!(!is_interrupted());
    }
}
