//! Line commands of the interactive teach console and rendering of session events.

use std::fmt::Write as _;

use clap::{builder::RangedU64ValueParser, CommandFactory, Parser, Subcommand, ValueEnum};
use client_core::{SessionCommand, SessionEvent};
use shared::{
    domain::{Axis, Pose, Preset, DEFAULT_Z},
    error::ErrorReport,
};

/// One line typed at the console.
#[derive(Parser, Debug)]
#[command(name = "console", no_binary_name = true)]
struct ConsoleLine {
    #[command(subcommand)]
    command: LineCommand,
}

#[derive(Subcommand, Debug)]
enum LineCommand {
    /// Set joint 1 (degrees).
    J1 {
        #[arg(allow_negative_numbers = true, value_parser = finite)]
        angle: f64,
    },
    /// Set joint 2 (degrees).
    J2 {
        #[arg(allow_negative_numbers = true, value_parser = finite)]
        angle: f64,
    },
    /// Set the height (mm).
    Z {
        #[arg(allow_negative_numbers = true, value_parser = finite)]
        height: f64,
    },
    /// Set all joints at once.
    Joints {
        #[arg(allow_negative_numbers = true, value_parser = finite)]
        j1: f64,
        #[arg(allow_negative_numbers = true, value_parser = finite)]
        j2: f64,
        #[arg(allow_negative_numbers = true, value_parser = finite)]
        z: f64,
    },
    /// Step one axis.
    Jog {
        #[arg(value_enum, ignore_case = true)]
        axis: AxisArg,
        #[arg(allow_negative_numbers = true, value_parser = finite)]
        delta: f64,
    },
    /// Move to a Cartesian target; the height defaults to 100.
    Move {
        #[arg(allow_negative_numbers = true, value_parser = finite)]
        x: f64,
        #[arg(allow_negative_numbers = true, value_parser = finite)]
        y: f64,
        #[arg(allow_negative_numbers = true, value_parser = finite)]
        z: Option<f64>,
    },
    /// Go to a named start position.
    Preset {
        #[arg(value_enum, ignore_case = true)]
        name: PresetArg,
    },
    /// Record the current pose.
    Save,
    /// Remove a position by its listed number.
    Delete {
        #[arg(value_parser = RangedU64ValueParser::<usize>::new().range(1..))]
        position: usize,
    },
    /// Remove every position.
    Clear,
    /// Play the program back.
    Run,
    /// Stop a running playback.
    Stop,
    /// Write the program file.
    Write,
    /// Motion speed (500..4000).
    Speed { value: u32 },
    /// Motion acceleration (500..4000).
    Accel { value: u32 },
    /// Inject a line as if the controller sent it.
    Inbound {
        #[arg(required = true, trailing_var_arg = true, allow_hyphen_values = true)]
        line: Vec<String>,
    },
    /// Leave the console.
    #[command(alias = "exit")]
    Quit,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum AxisArg {
    J1,
    J2,
    Z,
}

impl From<AxisArg> for Axis {
    fn from(value: AxisArg) -> Self {
        match value {
            AxisArg::J1 => Axis::J1,
            AxisArg::J2 => Axis::J2,
            AxisArg::Z => Axis::Z,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum PresetArg {
    /// Joints at zero, position re-derived.
    Zero,
    /// The recorded home pose.
    Home,
}

impl From<PresetArg> for Preset {
    fn from(value: PresetArg) -> Self {
        match value {
            PresetArg::Zero => Preset::JointZero,
            PresetArg::Home => Preset::RecordedHome,
        }
    }
}

fn finite(raw: &str) -> Result<f64, String> {
    match raw.parse::<f64>() {
        Ok(value) if value.is_finite() => Ok(value),
        _ => Err(format!("'{raw}' is not a finite number")),
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum ConsoleCommand {
    Session(SessionCommand),
    StopPlayback,
    Quit,
}

/// Parses one console line. Blank lines yield `None`; `help` comes back as a
/// [`clap::error::ErrorKind::DisplayHelp`] error carrying the rendered help.
pub fn parse_line(line: &str) -> Result<Option<ConsoleCommand>, clap::Error> {
    let mut words = line.split_whitespace();
    let Some(verb) = words.next() else {
        return Ok(None);
    };
    let args = std::iter::once(verb.to_ascii_lowercase()).chain(words.map(str::to_string));
    let parsed = ConsoleLine::try_parse_from(args)?;

    let command = match parsed.command {
        LineCommand::J1 { angle } => set_axis(Axis::J1, angle),
        LineCommand::J2 { angle } => set_axis(Axis::J2, angle),
        LineCommand::Z { height } => set_axis(Axis::Z, height),
        LineCommand::Joints { j1, j2, z } => ConsoleCommand::Session(SessionCommand::SetJoints {
            angle1: j1,
            angle2: j2,
            z,
        }),
        LineCommand::Jog { axis, delta } => ConsoleCommand::Session(SessionCommand::Jog {
            axis: axis.into(),
            delta,
        }),
        LineCommand::Move { x, y, z } => ConsoleCommand::Session(SessionCommand::MoveTo {
            x,
            y,
            z: z.unwrap_or(DEFAULT_Z),
        }),
        LineCommand::Preset { name } => {
            ConsoleCommand::Session(SessionCommand::ApplyPreset(name.into()))
        }
        LineCommand::Save => ConsoleCommand::Session(SessionCommand::TeachSave),
        LineCommand::Delete { position } => {
            ConsoleCommand::Session(SessionCommand::DeletePosition(position - 1))
        }
        LineCommand::Clear => ConsoleCommand::Session(SessionCommand::ClearProgram),
        LineCommand::Run => ConsoleCommand::Session(SessionCommand::RunProgram),
        LineCommand::Stop => ConsoleCommand::StopPlayback,
        LineCommand::Write => ConsoleCommand::Session(SessionCommand::SaveProgramFile),
        LineCommand::Speed { value } => ConsoleCommand::Session(SessionCommand::SetSpeed(value)),
        LineCommand::Accel { value } => {
            ConsoleCommand::Session(SessionCommand::SetAcceleration(value))
        }
        LineCommand::Inbound { line } => {
            ConsoleCommand::Session(SessionCommand::Inbound(line.join(" ")))
        }
        LineCommand::Quit => ConsoleCommand::Quit,
    };

    Ok(Some(command))
}

/// Command overview printed when the console starts.
pub fn help() -> String {
    ConsoleLine::command().render_help().to_string()
}

fn set_axis(axis: Axis, value: f64) -> ConsoleCommand {
    ConsoleCommand::Session(SessionCommand::SetAxis { axis, value })
}

pub fn describe_pose(pose: &Pose) -> String {
    format!(
        "J1={:.2} J2={:.2} Z={:.2} | X={:.2} Y={:.2}",
        pose.angle1, pose.angle2, pose.z, pose.x, pose.y
    )
}

pub fn describe_program(positions: &[Pose]) -> String {
    if positions.is_empty() {
        return "program: empty".to_string();
    }

    let mut out = format!("program: {} position(s)", positions.len());
    for (index, pose) in positions.iter().enumerate() {
        let _ = write!(
            out,
            "\n  Pos {}: J1={:.2} J2={:.2} Z={:.2}",
            index + 1,
            pose.angle1,
            pose.angle2,
            pose.z
        );
    }
    out
}

pub fn describe_event(event: &SessionEvent) -> String {
    match event {
        SessionEvent::PoseUpdated(pose) => describe_pose(pose),
        SessionEvent::PositionSaved { index, .. } => format!("position {} saved", index + 1),
        SessionEvent::ProgramChanged(positions) => describe_program(positions),
        SessionEvent::TuningChanged(tuning) => {
            format!("speed={} accel={}", tuning.speed, tuning.acceleration)
        }
        SessionEvent::PlaybackStarted { steps } => format!("running program ({steps} steps)"),
        SessionEvent::PlaybackStep { index, pose } => {
            format!("step {}: {}", index + 1, describe_pose(pose))
        }
        SessionEvent::PlaybackFinished => "program finished".to_string(),
        SessionEvent::PlaybackCancelled { completed } => {
            format!("program stopped after {completed} step(s)")
        }
        SessionEvent::ProgramFileSaved { path, positions } => {
            format!("saved {positions} position(s) to {}", path.display())
        }
        SessionEvent::Error(err) => format!("error {}", ErrorReport::from(err)),
    }
}

#[cfg(test)]
#[path = "tests/console_tests.rs"]
mod tests;
