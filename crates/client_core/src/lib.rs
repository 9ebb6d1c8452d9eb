//! Robot session core: controller state, motion link seam, and the worker that serializes every
//! mutation through one queue.

pub mod controller;
pub mod link;
pub mod reader;
pub mod session;

pub use controller::{ControllerError, Playback, ProgramState, RobotController};
pub use link::{LineLink, LinkError, MissingMotionLink, MotionLink};
pub use reader::spawn_line_reader;
pub use session::{
    Session, SessionCommand, SessionEvent, SessionHandle, SessionOptions, SubmitError,
};
