use std::fs;

use shared::domain::{Pose, Tuning};
use storage::{LoadSource, PositionProgram, ProgramDocument, ProgramStore, DEFAULT_PROGRAM_FILE};

fn taught_pose(angle1: f64, angle2: f64) -> Pose {
    Pose {
        angle1,
        angle2,
        z: 100.0,
        x: 0.0,
        y: 0.0,
    }
}

#[test]
fn teach_save_reload_edit_cycle() {
    let dir = tempfile::tempdir().expect("tempdir");
    let store = ProgramStore::new(dir.path().join(DEFAULT_PROGRAM_FILE));

    let mut program = PositionProgram::new();
    program.save(&taught_pose(10.0, 20.0));
    program.save(&taught_pose(30.0, -40.0));
    program.save(&taught_pose(50.0, 60.0));
    let tuning = Tuning {
        speed: 2000,
        acceleration: 1000,
    };
    store
        .save(&ProgramDocument { program, tuning }, true)
        .expect("first save");

    let raw = fs::read_to_string(store.path()).expect("read back");
    let value: serde_json::Value = serde_json::from_str(&raw).expect("valid json");
    assert_eq!(value["positions"].as_array().map(Vec::len), Some(3));
    assert_eq!(value["speed"], 2000);
    assert_eq!(value["acceleration"], 1000);

    let mut reloaded = store.load().document;
    assert_eq!(reloaded.tuning, tuning);
    reloaded.program.delete(1);
    store.save(&reloaded, false).expect("second save");

    let raw = fs::read_to_string(store.path()).expect("read back");
    assert!(!raw.contains("speed"));

    let loaded = store.load();
    assert!(matches!(loaded.source, LoadSource::File));
    let angles: Vec<f64> = loaded.document.program.iter().map(|pose| pose.angle1).collect();
    assert_eq!(angles, vec![10.0, 50.0]);
    assert_eq!(loaded.document.tuning, Tuning::default());
}

#[test]
fn program_written_by_another_tool_without_tuning_loads_with_defaults() {
    let dir = tempfile::tempdir().expect("tempdir");
    let path = dir.path().join("offset_program.json");
    fs::write(
        &path,
        r#"{"positions": [{"angle1": 0.0, "angle2": 0.0, "z": 100.0, "x": -2.57, "y": 18.76}]}"#,
    )
    .expect("write");

    let loaded = ProgramStore::new(&path).load();
    assert!(matches!(loaded.source, LoadSource::File));
    assert_eq!(loaded.document.program.len(), 1);
    assert_eq!(loaded.document.tuning, Tuning::default());
}
