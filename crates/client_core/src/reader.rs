//! Background reader turning inbound link bytes into session commands.

use std::{
    io::{self, BufRead},
    sync::{
        atomic::{AtomicBool, Ordering},
        Arc,
    },
    thread::{self, JoinHandle},
};

use crossbeam_channel::Sender;
use tracing::{debug, info, warn};

use crate::session::SessionCommand;

/// Spawns the reader thread.
///
/// `reader` must return within a bounded time (a read timeout surfaces as `TimedOut` or
/// `WouldBlock`) so that clearing `alive` stops the thread promptly. Bytes of a line split across
/// timeouts are kept until the newline arrives.
pub fn spawn_line_reader<R>(
    reader: R,
    commands: Sender<SessionCommand>,
    alive: Arc<AtomicBool>,
) -> io::Result<JoinHandle<()>>
where
    R: BufRead + Send + 'static,
{
    thread::Builder::new()
        .name("motion-link-reader".to_string())
        .spawn(move || read_lines(reader, &commands, &alive))
}

fn read_lines<R: BufRead>(mut reader: R, commands: &Sender<SessionCommand>, alive: &AtomicBool) {
    let mut pending = Vec::new();

    while alive.load(Ordering::Acquire) {
        match reader.read_until(b'\n', &mut pending) {
            Ok(0) => {
                if !pending.is_empty() {
                    forward_line(&mut pending, commands);
                }
                info!("motion link closed");
                return;
            }
            Ok(_) => {
                if pending.last() == Some(&b'\n') && !forward_line(&mut pending, commands) {
                    debug!("session gone; stopping reader");
                    return;
                }
            }
            Err(err)
                if matches!(
                    err.kind(),
                    io::ErrorKind::TimedOut | io::ErrorKind::WouldBlock | io::ErrorKind::Interrupted
                ) => {}
            Err(err) => {
                warn!(%err, "motion link read failed; stopping reader");
                return;
            }
        }
    }

    debug!("reader stopped");
}

/// Returns `false` once the session side has hung up.
fn forward_line(pending: &mut Vec<u8>, commands: &Sender<SessionCommand>) -> bool {
    let line = String::from_utf8_lossy(pending).trim().to_string();
    pending.clear();
    if line.is_empty() {
        return true;
    }

    debug!(%line, "inbound line");
    commands.send(SessionCommand::Inbound(line)).is_ok()
}

#[cfg(test)]
#[path = "tests/reader_tests.rs"]
mod tests;
