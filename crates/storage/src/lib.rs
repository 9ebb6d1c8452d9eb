//! Teach-mode position program and its durable JSON record.

use std::{
    fs, io,
    path::{Path, PathBuf},
};

use serde::{Deserialize, Serialize};
use shared::{
    domain::{Pose, Tuning},
    error::RobotError,
};
use thiserror::Error;
use tracing::{info, warn};

pub const DEFAULT_PROGRAM_FILE: &str = "robot_program.json";

#[derive(Debug, Error)]
pub enum StorageError {
    #[error("malformed program record: {0}")]
    Malformed(String),
    #[error("failed to access program file '{}': {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("failed to encode program record: {0}")]
    Encode(#[from] serde_json::Error),
}

impl From<&StorageError> for RobotError {
    fn from(value: &StorageError) -> Self {
        match value {
            StorageError::Malformed(reason) => RobotError::Malformed(reason.clone()),
            other => RobotError::Io(other.to_string()),
        }
    }
}

/// Ordered sequence of saved poses. Indices are positional and shift on delete.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PositionProgram {
    positions: Vec<Pose>,
}

impl PositionProgram {
    pub fn new() -> Self {
        Self::default()
    }

    /// Wraps poses read back from storage without re-deriving or rounding them.
    pub fn from_positions(positions: Vec<Pose>) -> Self {
        Self { positions }
    }

    /// Appends a two-decimal snapshot of `pose` and returns its index.
    pub fn save(&mut self, pose: &Pose) -> usize {
        self.positions.push(pose.rounded());
        self.positions.len() - 1
    }

    /// Removes the entry at `index`. Out-of-range indices leave the program untouched.
    pub fn delete(&mut self, index: usize) -> Option<Pose> {
        if index < self.positions.len() {
            Some(self.positions.remove(index))
        } else {
            None
        }
    }

    pub fn clear(&mut self) {
        self.positions.clear();
    }

    pub fn len(&self) -> usize {
        self.positions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.positions.is_empty()
    }

    pub fn get(&self, index: usize) -> Option<&Pose> {
        self.positions.get(index)
    }

    pub fn positions(&self) -> &[Pose] {
        &self.positions
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Pose> {
        self.positions.iter()
    }

    /// Durable record of the program; tuning is included only when given.
    pub fn serialize(&self, tuning: Option<Tuning>) -> ProgramRecord {
        ProgramRecord {
            positions: self.positions.clone(),
            speed: tuning.map(|tuning| tuning.speed),
            acceleration: tuning.map(|tuning| tuning.acceleration),
        }
    }

    pub fn deserialize(record: ProgramRecord) -> ProgramDocument {
        let defaults = Tuning::default();
        ProgramDocument {
            program: Self::from_positions(record.positions),
            tuning: Tuning {
                speed: record.speed.unwrap_or(defaults.speed),
                acceleration: record.acceleration.unwrap_or(defaults.acceleration),
            },
        }
    }
}

/// On-disk shape of a program file.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProgramRecord {
    pub positions: Vec<Pose>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub speed: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub acceleration: Option<u32>,
}

impl ProgramRecord {
    pub fn from_json(raw: &str) -> Result<Self, StorageError> {
        serde_json::from_str(raw).map_err(|err| StorageError::Malformed(err.to_string()))
    }

    pub fn to_json(&self) -> Result<String, StorageError> {
        Ok(serde_json::to_string_pretty(self)?)
    }
}

/// A program together with the tuning that was valid when it was recorded.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ProgramDocument {
    pub program: PositionProgram,
    pub tuning: Tuning,
}

impl ProgramDocument {
    pub fn from_json(raw: &str) -> Result<Self, StorageError> {
        ProgramRecord::from_json(raw).map(PositionProgram::deserialize)
    }

    /// Parses `raw`, falling back to an empty program with default tuning when it is unusable.
    pub fn from_json_or_default(raw: &str) -> (Self, Option<StorageError>) {
        match Self::from_json(raw) {
            Ok(document) => (document, None),
            Err(err) => (Self::default(), Some(err)),
        }
    }

    pub fn to_json(&self, include_tuning: bool) -> Result<String, StorageError> {
        self.program
            .serialize(include_tuning.then_some(self.tuning))
            .to_json()
    }
}

#[derive(Debug)]
pub enum LoadSource {
    File,
    Missing,
    Fallback(StorageError),
}

#[derive(Debug)]
pub struct LoadedProgram {
    pub document: ProgramDocument,
    pub source: LoadSource,
}

/// Program file on disk.
#[derive(Debug, Clone)]
pub struct ProgramStore {
    path: PathBuf,
}

impl ProgramStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Loads the program. A missing or unreadable file yields defaults, never an error.
    pub fn load(&self) -> LoadedProgram {
        let raw = match fs::read_to_string(&self.path) {
            Ok(raw) => raw,
            Err(err) if err.kind() == io::ErrorKind::NotFound => {
                info!(path = %self.path.display(), "no program file yet; starting empty");
                return LoadedProgram {
                    document: ProgramDocument::default(),
                    source: LoadSource::Missing,
                };
            }
            Err(source) => {
                let err = StorageError::Io {
                    path: self.path.clone(),
                    source,
                };
                warn!(%err, "program file unreadable; falling back to defaults");
                return LoadedProgram {
                    document: ProgramDocument::default(),
                    source: LoadSource::Fallback(err),
                };
            }
        };

        match ProgramDocument::from_json_or_default(&raw) {
            (document, None) => {
                info!(
                    path = %self.path.display(),
                    positions = document.program.len(),
                    "loaded program file"
                );
                LoadedProgram {
                    document,
                    source: LoadSource::File,
                }
            }
            (document, Some(err)) => {
                warn!(path = %self.path.display(), %err, "program file malformed; falling back to defaults");
                LoadedProgram {
                    document,
                    source: LoadSource::Fallback(err),
                }
            }
        }
    }

    pub fn save(&self, document: &ProgramDocument, include_tuning: bool) -> Result<(), StorageError> {
        let encoded = document.to_json(include_tuning)?;
        ensure_parent_dir_exists(&self.path)?;

        let staging = staging_path(&self.path);
        fs::write(&staging, encoded).map_err(|source| StorageError::Io {
            path: staging.clone(),
            source,
        })?;
        if let Err(source) = fs::rename(&staging, &self.path) {
            let _ = fs::remove_file(&staging);
            return Err(StorageError::Io {
                path: self.path.clone(),
                source,
            });
        }

        info!(
            path = %self.path.display(),
            positions = document.program.len(),
            "saved program file"
        );
        Ok(())
    }
}

fn ensure_parent_dir_exists(path: &Path) -> Result<(), StorageError> {
    let Some(parent) = path.parent() else {
        return Ok(());
    };
    if parent.as_os_str().is_empty() {
        return Ok(());
    }

    fs::create_dir_all(parent).map_err(|source| StorageError::Io {
        path: parent.to_path_buf(),
        source,
    })
}

fn staging_path(path: &Path) -> PathBuf {
    let mut name = path.file_name().map(|name| name.to_os_string()).unwrap_or_default();
    name.push(".tmp");
    path.with_file_name(name)
}

#[cfg(test)]
#[path = "tests/lib_tests.rs"]
mod tests;
