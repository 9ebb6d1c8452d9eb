use std::collections::HashMap;

use super::*;

fn env_of(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
    let map: HashMap<String, String> = pairs
        .iter()
        .map(|(key, value)| (key.to_string(), value.to_string()))
        .collect();
    move |key| map.get(key).cloned()
}

#[test]
fn defaults_match_the_bench_setup() {
    let settings = Settings::default();
    assert_eq!(settings.serial_port, None);
    assert_eq!(settings.baud_rate, 115_200);
    assert_eq!(settings.read_timeout_ms, 100);
    assert_eq!(settings.program_path, PathBuf::from("robot_program.json"));
    assert_eq!(settings.geometry, GeometryKind::Direct);
    assert_eq!(settings.settle_ms, 0);
}

#[test]
fn file_values_override_defaults() {
    let mut settings = Settings::default();
    apply_file(
        &mut settings,
        r#"
serial_port = "/dev/ttyUSB0"
baud_rate = 57600
geometry = "offset"
settle_ms = 250
"#,
    );
    assert_eq!(settings.serial_port.as_deref(), Some("/dev/ttyUSB0"));
    assert_eq!(settings.baud_rate, 57_600);
    assert_eq!(settings.geometry, GeometryKind::Offset);
    assert_eq!(settings.settle_ms, 250);
    assert_eq!(settings.read_timeout_ms, 100);
}

#[test]
fn unreadable_file_keeps_defaults() {
    let mut settings = Settings::default();
    apply_file(&mut settings, "baud_rate = \"fast\"");
    assert_eq!(settings, Settings::default());
}

#[test]
fn environment_wins_over_file() {
    let mut settings = Settings::default();
    apply_file(&mut settings, "serial_port = \"COM11\"\nsettle_ms = 10");
    apply_env(
        &mut settings,
        env_of(&[
            ("APP__SERIAL_PORT", "COM3"),
            ("APP__SETTLE_MS", "75"),
            ("APP__PROGRAM_PATH", "programs/pick.json"),
            ("APP__GEOMETRY", "Offset"),
        ]),
    );
    assert_eq!(settings.serial_port.as_deref(), Some("COM3"));
    assert_eq!(settings.settle_ms, 75);
    assert_eq!(settings.program_path, PathBuf::from("programs/pick.json"));
    assert_eq!(settings.geometry, GeometryKind::Offset);
}

#[test]
fn invalid_environment_values_are_ignored() {
    let mut settings = Settings::default();
    apply_env(
        &mut settings,
        env_of(&[
            ("APP__BAUD_RATE", "lots"),
            ("APP__GEOMETRY", "delta"),
            ("APP__SERIAL_PORT", "  "),
        ]),
    );
    assert_eq!(settings, Settings::default());
}

#[test]
fn missing_settings_file_yields_defaults() {
    let dir = tempfile::tempdir().expect("tempdir");
    let settings = load_settings(&dir.path().join("absent.toml"));
    assert_eq!(settings.baud_rate, Settings::default().baud_rate);
}

#[test]
fn geometry_kinds_select_the_arm_presets() {
    assert_eq!(GeometryKind::Direct.geometry(), LinkGeometry::scara_mm());
    assert_eq!(GeometryKind::Offset.geometry(), LinkGeometry::scara_offset_cm());
}

#[test]
fn link_overrides_adjust_the_preset() {
    let mut settings = Settings::default();
    apply_file(&mut settings, "geometry = \"offset\"\nlink_l2 = 20.0\nelbow_offset_deg = 120.0");
    let geometry = settings.link_geometry().expect("valid overrides");
    assert_eq!(geometry.l1(), 9.51);
    assert_eq!(geometry.l2(), 20.0);
    assert_eq!(geometry.convention(), Convention::Offset { theta_deg: 120.0 });
}

#[test]
fn elbow_offset_is_ignored_for_the_direct_arm() {
    let settings = Settings {
        elbow_offset_deg: Some(90.0),
        ..Settings::default()
    };
    assert_eq!(settings.link_geometry(), Ok(LinkGeometry::scara_mm()));
}

#[test]
fn invalid_link_override_is_rejected() {
    let mut settings = Settings::default();
    apply_env(&mut settings, env_of(&[("APP__LINK_L1", "-4")]));
    assert_eq!(
        settings.link_geometry(),
        Err(GeometryError::NonPositiveLink { link: 1, value: -4.0 })
    );
}
