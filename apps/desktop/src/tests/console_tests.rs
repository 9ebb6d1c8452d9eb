use std::path::PathBuf;

use clap::error::ErrorKind;
use shared::{domain::Tuning, error::RobotError};

use super::*;

fn session(line: &str) -> SessionCommand {
    match parse_line(line) {
        Ok(Some(ConsoleCommand::Session(command))) => command,
        other => panic!("expected a session command for '{line}', got {other:?}"),
    }
}

#[test]
fn blank_lines_are_skipped() {
    assert!(matches!(parse_line("   "), Ok(None)));
}

fn error_kind(line: &str) -> ErrorKind {
    match parse_line(line) {
        Err(err) => err.kind(),
        other => panic!("expected '{line}' to be rejected, got {other:?}"),
    }
}

#[test]
fn axis_commands_accept_negative_values() {
    assert_eq!(
        session("j2 -45.5"),
        SessionCommand::SetAxis {
            axis: Axis::J2,
            value: -45.5
        }
    );
    assert_eq!(
        session("Z 20"),
        SessionCommand::SetAxis {
            axis: Axis::Z,
            value: 20.0
        }
    );
}

#[test]
fn move_defaults_height_when_omitted() {
    assert_eq!(
        session("move 200 -50"),
        SessionCommand::MoveTo {
            x: 200.0,
            y: -50.0,
            z: DEFAULT_Z
        }
    );
    assert_eq!(
        session("move 200 -50 30"),
        SessionCommand::MoveTo {
            x: 200.0,
            y: -50.0,
            z: 30.0
        }
    );
}

#[test]
fn delete_uses_displayed_position_numbers() {
    assert_eq!(session("delete 2"), SessionCommand::DeletePosition(1));
    assert_eq!(error_kind("delete 0"), ErrorKind::ValueValidation);
}

#[test]
fn program_and_tuning_commands() {
    assert_eq!(session("save"), SessionCommand::TeachSave);
    assert_eq!(session("run"), SessionCommand::RunProgram);
    assert_eq!(session("write"), SessionCommand::SaveProgramFile);
    assert_eq!(session("speed 1500"), SessionCommand::SetSpeed(1500));
    assert_eq!(session("accel 800"), SessionCommand::SetAcceleration(800));
    assert_eq!(
        session("jog j1 -5"),
        SessionCommand::Jog {
            axis: Axis::J1,
            delta: -5.0
        }
    );
    assert_eq!(
        session("preset home"),
        SessionCommand::ApplyPreset(Preset::RecordedHome)
    );
    assert_eq!(
        session("preset ZERO"),
        SessionCommand::ApplyPreset(Preset::JointZero)
    );
    assert!(matches!(
        parse_line("stop"),
        Ok(Some(ConsoleCommand::StopPlayback))
    ));
    assert!(matches!(parse_line("exit"), Ok(Some(ConsoleCommand::Quit))));
}

#[test]
fn inbound_keeps_the_raw_line() {
    assert_eq!(
        session("inbound POS_SAVED:1,J1=1,J2=2,Z=3"),
        SessionCommand::Inbound("POS_SAVED:1,J1=1,J2=2,Z=3".to_string())
    );
}

#[test]
fn bad_input_is_reported() {
    assert_eq!(error_kind("fly 10"), ErrorKind::InvalidSubcommand);
    assert_eq!(error_kind("joints 1 2"), ErrorKind::MissingRequiredArgument);
    assert_eq!(error_kind("j1 NaN"), ErrorKind::ValueValidation);
    assert_eq!(error_kind("jog wrist 1"), ErrorKind::InvalidValue);
    assert_eq!(error_kind("speed fast"), ErrorKind::ValueValidation);
    assert_eq!(error_kind("inbound"), ErrorKind::MissingRequiredArgument);
}

#[test]
fn help_lists_the_commands() {
    assert_eq!(error_kind("help"), ErrorKind::DisplayHelp);
    let text = help();
    for command in ["jog", "move", "preset", "delete", "inbound", "quit"] {
        assert!(text.contains(command), "help should mention {command}:\n{text}");
    }
}

#[test]
fn program_listing_numbers_from_one() {
    let pose = Pose {
        angle1: 10.0,
        angle2: -20.5,
        z: 100.0,
        x: 0.0,
        y: 0.0,
    };
    assert_eq!(describe_program(&[]), "program: empty");
    assert_eq!(
        describe_program(&[pose]),
        "program: 1 position(s)\n  Pos 1: J1=10.00 J2=-20.50 Z=100.00"
    );
}

#[test]
fn events_render_for_the_operator() {
    assert_eq!(
        describe_event(&SessionEvent::TuningChanged(Tuning::default())),
        "speed=500 accel=500"
    );
    assert_eq!(
        describe_event(&SessionEvent::ProgramFileSaved {
            path: PathBuf::from("robot_program.json"),
            positions: 3
        }),
        "saved 3 position(s) to robot_program.json"
    );
    assert_eq!(
        describe_event(&SessionEvent::Error(RobotError::EmptyProgram)),
        "error EmptyProgram: program has no saved positions"
    );
}
