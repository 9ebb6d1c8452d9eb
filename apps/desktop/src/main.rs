use std::{
    io::{self, BufRead},
    path::PathBuf,
    thread,
    time::Duration,
};

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use client_core::{
    MissingMotionLink, MotionLink, RobotController, Session, SessionOptions,
};
use kinematics::KinematicsModel;
use shared::{
    domain::{JointLimits, LinkGeometry},
    error::ErrorReport,
};
use storage::{LoadSource, ProgramStore};
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

mod config;
mod console;
mod serial;

use config::{load_settings, GeometryKind, Settings, DEFAULT_CONFIG_FILE};
use console::{describe_event, help, parse_line, ConsoleCommand};

#[derive(Parser, Debug)]
#[command(about = "Teach and play back programs for a two-link SCARA arm")]
struct Cli {
    #[arg(long, default_value = DEFAULT_CONFIG_FILE)]
    config: PathBuf,
    /// Serial port of the motion controller; overrides the settings file.
    #[arg(long)]
    port: Option<String>,
    #[arg(long)]
    program: Option<PathBuf>,
    #[arg(long, value_enum)]
    geometry: Option<GeometryKind>,
    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Interactive teach console (default).
    Console,
    /// Print the Cartesian position of a joint pair.
    Fk {
        #[arg(allow_negative_numbers = true)]
        angle1: f64,
        #[arg(allow_negative_numbers = true)]
        angle2: f64,
    },
    /// Print the joint pair reaching a Cartesian point.
    Ik {
        #[arg(allow_negative_numbers = true)]
        x: f64,
        #[arg(allow_negative_numbers = true)]
        y: f64,
    },
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with_writer(io::stderr)
        .init();

    let cli = Cli::parse();
    let mut settings = load_settings(&cli.config);
    if let Some(port) = cli.port {
        settings.serial_port = Some(port);
    }
    if let Some(program) = cli.program {
        settings.program_path = program;
    }
    if let Some(geometry) = cli.geometry {
        settings.geometry = geometry;
    }

    let geometry = resolve_geometry(&settings);

    match cli.command.unwrap_or(Command::Console) {
        Command::Fk { angle1, angle2 } => {
            let model = KinematicsModel::new(geometry);
            let (x, y) = model.forward(angle1, angle2);
            println!("x={x:.4} y={y:.4}");
        }
        Command::Ik { x, y } => {
            let model = KinematicsModel::new(geometry);
            match model.inverse(x, y) {
                Ok(solution) => println!(
                    "angle1={:.4} angle2={:.4}",
                    solution.angle1, solution.angle2
                ),
                Err(unreachable) => println!("{unreachable}"),
            }
        }
        Command::Console => run_console(&settings, geometry)?,
    }

    Ok(())
}

fn resolve_geometry(settings: &Settings) -> LinkGeometry {
    settings.link_geometry().unwrap_or_else(|err| {
        let report = ErrorReport::from(err);
        warn!(%report, "using the {:?} preset", settings.geometry);
        settings.geometry.geometry()
    })
}

fn run_console(settings: &Settings, geometry: LinkGeometry) -> Result<()> {
    let store = ProgramStore::new(&settings.program_path);
    let loaded = store.load();
    if let LoadSource::Fallback(err) = &loaded.source {
        println!("program file ignored ({err}); starting with an empty program");
    }
    let controller = RobotController::new(geometry, JointLimits::default())
        .with_document(loaded.document);

    let mut reader = None;
    let link: Box<dyn MotionLink> = match settings.serial_port.as_deref() {
        Some(path) => match serial::open(
            path,
            settings.baud_rate,
            Duration::from_millis(settings.read_timeout_ms),
        ) {
            Ok(connection) => {
                reader = Some(connection.reader);
                Box::new(connection.link)
            }
            Err(err) => {
                warn!(port = path, %err, "motion link unavailable; continuing offline");
                Box::new(MissingMotionLink)
            }
        },
        None => {
            info!("no serial port configured; running offline");
            Box::new(MissingMotionLink)
        }
    };

    let options = SessionOptions {
        settle: Duration::from_millis(settings.settle_ms),
        ..SessionOptions::default()
    };
    let mut handle =
        Session::spawn(controller, link, store, options).context("failed to start session worker")?;
    if let Some(reader) = reader {
        handle
            .attach_reader(reader)
            .context("failed to start motion link reader")?;
    }

    let events = handle.events().clone();
    let printer = thread::Builder::new()
        .name("console-events".to_string())
        .spawn(move || {
            while let Ok(event) = events.recv() {
                println!("{}", describe_event(&event));
            }
        })
        .context("failed to start event printer")?;

    println!("{}", help());
    for line in io::stdin().lock().lines() {
        let line = line.context("failed to read console input")?;
        match parse_line(&line) {
            Ok(None) => {}
            Ok(Some(ConsoleCommand::Session(command))) => {
                if let Err(err) = handle.submit(command) {
                    println!("{err}");
                }
            }
            Ok(Some(ConsoleCommand::StopPlayback)) => handle.stop_playback(),
            Ok(Some(ConsoleCommand::Quit)) => break,
            Err(err) => println!("{err}"),
        }
    }

    handle.shutdown();
    if printer.join().is_err() {
        warn!("event printer panicked");
    }
    Ok(())
}
