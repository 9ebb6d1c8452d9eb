//! Worker thread that owns the [`RobotController`].
//!
//! Local commands and inbound link lines share one queue, so every mutation of the session state
//! happens on the worker in arrival order.

use std::{
    io::{self, BufRead},
    path::PathBuf,
    sync::{
        atomic::{AtomicBool, Ordering},
        Arc,
    },
    thread::{self, JoinHandle},
    time::Duration,
};

use crossbeam_channel::{bounded, Receiver, Sender, TrySendError};
use shared::{
    domain::{Axis, Pose, Preset, Tuning},
    error::RobotError,
    protocol::{LinkMessage, ProtocolError},
};
use storage::{ProgramDocument, ProgramStore};
use thiserror::Error;
use tracing::{debug, error, info, warn};

use crate::{controller::RobotController, link::MotionLink, reader::spawn_line_reader};

const DEFAULT_QUEUE_CAPACITY: usize = 256;
const DEFAULT_EVENT_CAPACITY: usize = 1024;

#[derive(Debug, Clone, PartialEq)]
pub enum SessionCommand {
    SetJoints { angle1: f64, angle2: f64, z: f64 },
    SetAxis { axis: Axis, value: f64 },
    Jog { axis: Axis, delta: f64 },
    MoveTo { x: f64, y: f64, z: f64 },
    ApplyPreset(Preset),
    TeachSave,
    DeletePosition(usize),
    ClearProgram,
    RunProgram,
    SaveProgramFile,
    SetSpeed(u32),
    SetAcceleration(u32),
    /// Raw line received from the motion link.
    Inbound(String),
    Shutdown,
}

impl SessionCommand {
    fn name(&self) -> &'static str {
        match self {
            SessionCommand::SetJoints { .. } => "set_joints",
            SessionCommand::SetAxis { .. } => "set_axis",
            SessionCommand::Jog { .. } => "jog",
            SessionCommand::MoveTo { .. } => "move_to",
            SessionCommand::ApplyPreset(_) => "apply_preset",
            SessionCommand::TeachSave => "teach_save",
            SessionCommand::DeletePosition(_) => "delete_position",
            SessionCommand::ClearProgram => "clear_program",
            SessionCommand::RunProgram => "run_program",
            SessionCommand::SaveProgramFile => "save_program_file",
            SessionCommand::SetSpeed(_) => "set_speed",
            SessionCommand::SetAcceleration(_) => "set_acceleration",
            SessionCommand::Inbound(_) => "inbound",
            SessionCommand::Shutdown => "shutdown",
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum SessionEvent {
    PoseUpdated(Pose),
    PositionSaved { index: usize, pose: Pose },
    ProgramChanged(Vec<Pose>),
    TuningChanged(Tuning),
    PlaybackStarted { steps: usize },
    PlaybackStep { index: usize, pose: Pose },
    PlaybackFinished,
    PlaybackCancelled { completed: usize },
    ProgramFileSaved { path: PathBuf, positions: usize },
    Error(RobotError),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum SubmitError {
    #[error("session command queue is full; retry")]
    QueueFull,
    #[error("session worker is not running")]
    Disconnected,
}

#[derive(Debug, Clone)]
pub struct SessionOptions {
    /// Pause after each playback step.
    pub settle: Duration,
    pub queue_capacity: usize,
    pub event_capacity: usize,
    /// Push the current joints and tuning to the link when the session starts.
    pub initial_sync: bool,
}

impl Default for SessionOptions {
    fn default() -> Self {
        Self {
            settle: Duration::ZERO,
            queue_capacity: DEFAULT_QUEUE_CAPACITY,
            event_capacity: DEFAULT_EVENT_CAPACITY,
            initial_sync: true,
        }
    }
}

pub struct Session;

impl Session {
    pub fn spawn<L>(
        controller: RobotController,
        link: L,
        store: ProgramStore,
        options: SessionOptions,
    ) -> io::Result<SessionHandle>
    where
        L: MotionLink + 'static,
    {
        let (cmd_tx, cmd_rx) = bounded(options.queue_capacity.max(1));
        let (event_tx, event_rx) = bounded(options.event_capacity.max(1));
        let cancel = Arc::new(AtomicBool::new(false));
        let alive = Arc::new(AtomicBool::new(true));

        let worker = SessionWorker {
            persisted: controller.document(),
            controller,
            link: Box::new(link),
            store,
            commands: cmd_rx,
            events: event_tx,
            cancel: Arc::clone(&cancel),
            alive: Arc::clone(&alive),
            settle: options.settle,
        };
        let initial_sync = options.initial_sync;
        let worker = thread::Builder::new()
            .name("robot-session".to_string())
            .spawn(move || worker.run(initial_sync))?;

        Ok(SessionHandle {
            commands: cmd_tx,
            events: event_rx,
            cancel,
            alive,
            worker: Some(worker),
            reader: None,
        })
    }
}

pub struct SessionHandle {
    commands: Sender<SessionCommand>,
    events: Receiver<SessionEvent>,
    cancel: Arc<AtomicBool>,
    alive: Arc<AtomicBool>,
    worker: Option<JoinHandle<RobotController>>,
    reader: Option<JoinHandle<()>>,
}

impl SessionHandle {
    pub fn submit(&self, command: SessionCommand) -> Result<(), SubmitError> {
        let name = command.name();
        match self.commands.try_send(command) {
            Ok(()) => {
                debug!(command = name, "queued session command");
                Ok(())
            }
            Err(TrySendError::Full(_)) => Err(SubmitError::QueueFull),
            Err(TrySendError::Disconnected(_)) => Err(SubmitError::Disconnected),
        }
    }

    pub fn events(&self) -> &Receiver<SessionEvent> {
        &self.events
    }

    /// Starts feeding inbound lines from `reader` into the session queue.
    pub fn attach_reader<R>(&mut self, reader: R) -> io::Result<()>
    where
        R: BufRead + Send + 'static,
    {
        let handle = spawn_line_reader(reader, self.commands.clone(), Arc::clone(&self.alive))?;
        self.reader = Some(handle);
        Ok(())
    }

    /// Asks a running playback to stop before its next step.
    pub fn stop_playback(&self) {
        self.cancel.store(true, Ordering::Release);
    }

    /// Stops the worker and the reader and returns the final controller state. Program changes not
    /// yet written are saved to the store before the worker exits.
    pub fn shutdown(mut self) -> Option<RobotController> {
        self.alive.store(false, Ordering::Release);
        self.cancel.store(true, Ordering::Release);
        let _ = self.commands.send(SessionCommand::Shutdown);

        let controller = self.worker.take().and_then(|worker| match worker.join() {
            Ok(controller) => Some(controller),
            Err(_) => {
                error!("session worker panicked");
                None
            }
        });
        if let Some(reader) = self.reader.take() {
            if reader.join().is_err() {
                error!("motion link reader panicked");
            }
        }
        controller
    }
}

impl Drop for SessionHandle {
    fn drop(&mut self) {
        self.alive.store(false, Ordering::Release);
        self.cancel.store(true, Ordering::Release);
    }
}

struct SessionWorker {
    controller: RobotController,
    link: Box<dyn MotionLink>,
    store: ProgramStore,
    /// Document as last read from or written to the store.
    persisted: ProgramDocument,
    commands: Receiver<SessionCommand>,
    events: Sender<SessionEvent>,
    cancel: Arc<AtomicBool>,
    alive: Arc<AtomicBool>,
    settle: Duration,
}

impl SessionWorker {
    fn run(mut self, initial_sync: bool) -> RobotController {
        info!(
            geometry = self.controller.geometry().convention().name(),
            connected = self.link.is_connected(),
            "session worker ready"
        );
        if initial_sync {
            self.initial_sync();
        }
        self.publish(SessionEvent::PoseUpdated(self.controller.current()));
        self.publish(SessionEvent::ProgramChanged(self.program_snapshot()));

        while let Ok(command) = self.commands.recv() {
            if matches!(command, SessionCommand::Shutdown) {
                break;
            }
            self.handle(command);
        }

        self.persist_on_exit();
        info!("session worker stopped");
        self.controller
    }

    fn initial_sync(&mut self) {
        let pose = self.controller.current();
        let tuning = self.controller.tuning();
        self.send(&LinkMessage::joint(Axis::J1, pose.angle1));
        self.send(&LinkMessage::joint(Axis::J2, pose.angle2));
        self.send(&LinkMessage::Speed(tuning.speed));
        self.send(&LinkMessage::Accel(tuning.acceleration));
    }

    fn handle(&mut self, command: SessionCommand) {
        match command {
            SessionCommand::SetJoints { angle1, angle2, z } => {
                self.move_joints(|controller| controller.apply_joint_pose(angle1, angle2, z));
            }
            SessionCommand::SetAxis { axis, value } => {
                self.move_joints(|controller| controller.set_axis(axis, value));
            }
            SessionCommand::Jog { axis, delta } => {
                self.move_joints(|controller| controller.jog(axis, delta));
            }
            SessionCommand::ApplyPreset(preset) => {
                self.move_joints(|controller| controller.apply_preset(preset));
            }
            SessionCommand::MoveTo { x, y, z } => {
                let before = self.controller.current();
                match self.controller.apply_cartesian_target(x, y, z) {
                    Ok(pose) => {
                        self.send_changed_axes(&before, &pose);
                        self.publish(SessionEvent::PoseUpdated(pose));
                    }
                    Err(err) => {
                        debug!(x, y, "cartesian target rejected");
                        self.publish(SessionEvent::Error(err.into()));
                    }
                }
            }
            SessionCommand::TeachSave => self.teach_save(),
            SessionCommand::DeletePosition(index) => {
                if self.controller.delete_position(index).is_some() {
                    self.publish(SessionEvent::ProgramChanged(self.program_snapshot()));
                } else {
                    debug!(index, "delete ignored; no such position");
                }
            }
            SessionCommand::ClearProgram => self.clear_program(),
            SessionCommand::RunProgram => self.run_program(),
            SessionCommand::SaveProgramFile => self.save_program_file(),
            SessionCommand::SetSpeed(value) => {
                let speed = self.controller.set_speed(value);
                self.send(&LinkMessage::Speed(speed));
                self.publish(SessionEvent::TuningChanged(self.controller.tuning()));
            }
            SessionCommand::SetAcceleration(value) => {
                let acceleration = self.controller.set_acceleration(value);
                self.send(&LinkMessage::Accel(acceleration));
                self.publish(SessionEvent::TuningChanged(self.controller.tuning()));
            }
            SessionCommand::Inbound(line) => self.handle_inbound(&line),
            SessionCommand::Shutdown => {}
        }
    }

    /// Applies values reported by the controller. Axis and tuning updates are not echoed back.
    fn handle_inbound(&mut self, line: &str) {
        let message = match line.parse::<LinkMessage>() {
            Ok(message) => message,
            Err(ProtocolError::Empty) => return,
            Err(err) => {
                warn!(%line, %err, "ignoring malformed inbound line");
                self.publish(SessionEvent::Error(RobotError::Malformed(format!(
                    "{line}: {err}"
                ))));
                return;
            }
        };

        match message {
            LinkMessage::Joint { axis, value } => {
                let pose = self.controller.set_axis(axis, value);
                self.publish(SessionEvent::PoseUpdated(pose));
            }
            LinkMessage::Speed(value) => {
                self.controller.set_speed(value);
                self.publish(SessionEvent::TuningChanged(self.controller.tuning()));
            }
            LinkMessage::Accel(value) => {
                self.controller.set_acceleration(value);
                self.publish(SessionEvent::TuningChanged(self.controller.tuning()));
            }
            LinkMessage::SavePos => self.teach_save(),
            LinkMessage::RunProg => self.run_program(),
            LinkMessage::ClearProg => self.clear_program(),
            LinkMessage::RunProgram
            | LinkMessage::ClearProgram
            | LinkMessage::SaveProgram { .. }
            | LinkMessage::PositionSaved { .. } => {
                debug!(%message, "controller echo");
            }
        }
    }

    fn move_joints(&mut self, apply: impl FnOnce(&mut RobotController) -> Pose) {
        let before = self.controller.current();
        let pose = apply(&mut self.controller);
        self.send_changed_axes(&before, &pose);
        self.publish(SessionEvent::PoseUpdated(pose));
    }

    fn teach_save(&mut self) {
        let index = self.controller.teach_save();
        let Some(pose) = self.controller.program().get(index).copied() else {
            return;
        };
        self.send(&LinkMessage::position_saved(index, &pose));
        self.publish(SessionEvent::PositionSaved { index, pose });
        self.publish(SessionEvent::ProgramChanged(self.program_snapshot()));
    }

    fn clear_program(&mut self) {
        self.controller.clear_program();
        self.send(&LinkMessage::ClearProgram);
        self.publish(SessionEvent::ProgramChanged(Vec::new()));
    }

    fn save_program_file(&mut self) {
        let document = self.controller.document();
        match self.store.save(&document, self.controller.records_tuning()) {
            Ok(()) => {
                let positions = document.program.len();
                self.persisted = document;
                self.send(&LinkMessage::SaveProgram { count: positions });
                self.publish(SessionEvent::ProgramFileSaved {
                    path: self.store.path().to_path_buf(),
                    positions,
                });
            }
            Err(err) => {
                warn!(%err, "failed to save program file");
                self.publish(SessionEvent::Error(RobotError::from(&err)));
            }
        }
    }

    fn persist_on_exit(&mut self) {
        let document = self.controller.document();
        if document == self.persisted {
            return;
        }
        match self.store.save(&document, self.controller.records_tuning()) {
            Ok(()) => {
                info!(positions = document.program.len(), "program saved at session end");
                self.persisted = document;
            }
            Err(err) => error!(%err, "failed to save program at session end"),
        }
    }

    fn run_program(&mut self) {
        let playback = match self.controller.begin_playback() {
            Ok(playback) => playback,
            Err(err) => {
                info!("playback requested with an empty program");
                self.publish(SessionEvent::Error(err.into()));
                return;
            }
        };

        self.cancel.store(false, Ordering::Release);
        let steps = playback.total();
        info!(steps, "playback started");
        self.send(&LinkMessage::RunProgram);
        self.publish(SessionEvent::PlaybackStarted { steps });

        let mut completed = 0;
        for (index, target) in playback.enumerate() {
            if self.cancel.load(Ordering::Acquire) || !self.alive.load(Ordering::Acquire) {
                break;
            }

            let before = self.controller.current();
            let pose = self
                .controller
                .apply_joint_pose(target.angle1, target.angle2, target.z);
            self.send_changed_axes(&before, &pose);
            self.publish(SessionEvent::PlaybackStep { index, pose });
            completed += 1;

            if !self.settle.is_zero() {
                thread::sleep(self.settle);
            }
        }

        self.controller.finish_playback();
        if completed == steps {
            info!(steps, "playback finished");
            self.publish(SessionEvent::PlaybackFinished);
        } else {
            info!(completed, steps, "playback cancelled");
            self.publish(SessionEvent::PlaybackCancelled { completed });
        }
    }

    fn send_changed_axes(&mut self, before: &Pose, after: &Pose) {
        for axis in after.changed_axes(before) {
            self.send(&LinkMessage::joint(axis, after.joint(axis)));
        }
    }

    /// Send failures are reported and otherwise ignored; local state is kept.
    fn send(&mut self, message: &LinkMessage) {
        if !self.link.is_connected() {
            debug!(%message, "no motion link attached; command dropped");
            return;
        }
        match self.link.send(message) {
            Ok(()) => debug!(%message, "sent command"),
            Err(err) => {
                warn!(%message, %err, "motion link send failed");
                self.publish(SessionEvent::Error(RobotError::from(&err)));
            }
        }
    }

    fn publish(&self, event: SessionEvent) {
        match self.events.try_send(event) {
            Ok(()) => {}
            Err(TrySendError::Full(_)) => debug!("session event queue full; dropping event"),
            Err(TrySendError::Disconnected(_)) => {}
        }
    }

    fn program_snapshot(&self) -> Vec<Pose> {
        self.controller.program().positions().to_vec()
    }
}

#[cfg(test)]
#[path = "tests/session_tests.rs"]
mod tests;
