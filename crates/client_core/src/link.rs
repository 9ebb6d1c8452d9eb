//! Outbound side of the motion link.

use std::io::{self, Write};

use shared::{error::RobotError, protocol::LinkMessage};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum LinkError {
    #[error("motion link is not connected")]
    NotConnected,
    #[error("failed to write to motion link: {0}")]
    Write(#[from] io::Error),
}

impl From<&LinkError> for RobotError {
    fn from(value: &LinkError) -> Self {
        RobotError::LinkUnavailable(value.to_string())
    }
}

/// Fire-and-forget command sink. Implementations do not retry.
pub trait MotionLink: Send {
    fn send(&mut self, message: &LinkMessage) -> Result<(), LinkError>;

    fn is_connected(&self) -> bool {
        true
    }
}

impl<T: MotionLink + ?Sized> MotionLink for Box<T> {
    fn send(&mut self, message: &LinkMessage) -> Result<(), LinkError> {
        (**self).send(message)
    }

    fn is_connected(&self) -> bool {
        (**self).is_connected()
    }
}

/// Stand-in used when no controller is attached; every send fails.
pub struct MissingMotionLink;

impl MotionLink for MissingMotionLink {
    fn send(&mut self, _message: &LinkMessage) -> Result<(), LinkError> {
        Err(LinkError::NotConnected)
    }

    fn is_connected(&self) -> bool {
        false
    }
}

/// Writes each message as one newline-terminated line.
pub struct LineLink<W> {
    writer: W,
}

impl<W: Write + Send> LineLink<W> {
    pub fn new(writer: W) -> Self {
        Self { writer }
    }

    pub fn into_inner(self) -> W {
        self.writer
    }
}

impl<W: Write + Send> MotionLink for LineLink<W> {
    fn send(&mut self, message: &LinkMessage) -> Result<(), LinkError> {
        self.writer.write_all(message.to_line().as_bytes())?;
        self.writer.flush()?;
        Ok(())
    }
}

#[cfg(test)]
#[path = "tests/link_tests.rs"]
mod tests;
