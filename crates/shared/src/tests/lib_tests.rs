use crate::{
    domain::{Axis, AxisRange, JointLimits, LinkGeometry, Pose, Preset, Tuning, RECORDED_HOME},
    error::{ErrorCode, ErrorReport, GeometryError, RobotError},
    protocol::{LinkMessage, ProtocolError},
};

fn pose(angle1: f64, angle2: f64, z: f64) -> Pose {
    Pose {
        angle1,
        angle2,
        z,
        x: 0.0,
        y: 0.0,
    }
}

#[test]
fn rejects_non_positive_links() {
    assert_eq!(
        LinkGeometry::direct(0.0, 220.0),
        Err(GeometryError::NonPositiveLink { link: 1, value: 0.0 })
    );
    assert!(LinkGeometry::direct(90.0, -1.0).is_err());
    assert!(LinkGeometry::offset(9.51, 22.31, f64::NAN).is_err());
    assert!(LinkGeometry::direct(90.0, 220.0).is_ok());
}

#[test]
fn reach_is_the_link_annulus() {
    assert_eq!(LinkGeometry::scara_mm().reach(), (130.0, 310.0));
}

#[test]
fn axis_range_clamps_and_rejects_inverted_bounds() {
    let range = AxisRange::new(-150.0, 150.0).expect("range");
    assert_eq!(range.clamp(200.0), 150.0);
    assert_eq!(range.clamp(-151.0), -150.0);
    assert_eq!(range.clamp(f64::NAN), -150.0);
    assert!(AxisRange::new(10.0, 0.0).is_err());
}

#[test]
fn default_limits_match_the_controller_sliders() {
    let limits = JointLimits::default();
    assert_eq!((limits.j1.min(), limits.j1.max()), (-90.0, 266.0));
    assert_eq!((limits.j2.min(), limits.j2.max()), (-150.0, 150.0));
    assert_eq!((limits.z.min(), limits.z.max()), (0.0, 150.0));
}

#[test]
fn rounded_snapshot_keeps_two_decimals() {
    let snapshot = Pose {
        angle1: 12.3456,
        angle2: -0.004,
        z: 99.999,
        x: 310.0,
        y: 1.235_1,
    }
    .rounded();
    assert_eq!(snapshot.angle1, 12.35);
    assert_eq!(snapshot.angle2, 0.0);
    assert_eq!(snapshot.z, 100.0);
    assert_eq!(snapshot.y, 1.24);
}

#[test]
fn changed_axes_ignores_cartesian_fields() {
    let before = pose(0.0, 0.0, 100.0);
    let mut after = pose(0.0, 10.0, 100.0);
    after.x = 42.0;
    assert_eq!(after.changed_axes(&before), vec![Axis::J2]);
}

#[test]
fn tuning_is_clamped_into_controller_range() {
    assert_eq!(Tuning::clamp_value(10), 500);
    assert_eq!(Tuning::clamp_value(9000), 4000);
    assert_eq!(Tuning::default().speed, 500);
}

#[test]
fn presets_share_joints_but_only_home_carries_literal_cartesian_values() {
    assert_eq!(Preset::JointZero.joints(), Preset::RecordedHome.joints());
    assert_eq!(Preset::JointZero.recorded_pose(), None);
    assert_eq!(Preset::RecordedHome.recorded_pose(), Some(RECORDED_HOME));
    assert_eq!((RECORDED_HOME.x, RECORDED_HOME.y), (0.0, 0.0));
}

#[test]
fn encodes_axis_and_control_lines() {
    assert_eq!(LinkMessage::joint(Axis::J1, 12.5).to_line(), "J1:12.50\n");
    assert_eq!(LinkMessage::joint(Axis::Z, 100.0).to_line(), "Z:100.00\n");
    assert_eq!(LinkMessage::Speed(500).to_line(), "SPEED:500\n");
    assert_eq!(LinkMessage::Accel(1200).to_line(), "ACCEL:1200\n");
    assert_eq!(LinkMessage::RunProgram.to_line(), "RUN_PROGRAM\n");
    assert_eq!(LinkMessage::ClearProgram.to_line(), "CLEAR_PROGRAM\n");
    assert_eq!(
        LinkMessage::SaveProgram { count: 3 }.to_line(),
        "SAVE_PROGRAM:3\n"
    );
}

#[test]
fn position_saved_uses_one_based_numbering() {
    let message = LinkMessage::position_saved(0, &pose(10.0, -20.5, 100.0));
    assert_eq!(message.to_string(), "POS_SAVED:1,J1=10.00,J2=-20.50,Z=100.00");
}

#[test]
fn parses_inbound_vocabulary() {
    assert_eq!(
        "J2:-45.5\r\n".parse::<LinkMessage>(),
        Ok(LinkMessage::joint(Axis::J2, -45.5))
    );
    assert_eq!("SAVE_POS".parse::<LinkMessage>(), Ok(LinkMessage::SavePos));
    assert_eq!("RUN_PROG".parse::<LinkMessage>(), Ok(LinkMessage::RunProg));
    assert_eq!("CLEAR_PROG".parse::<LinkMessage>(), Ok(LinkMessage::ClearProg));
    assert_eq!("SPEED:750.4".parse::<LinkMessage>(), Ok(LinkMessage::Speed(750)));
    assert_eq!(
        "POS_SAVED:2,J1=1.5,J2=2,Z=3".parse::<LinkMessage>(),
        Ok(LinkMessage::PositionSaved {
            number: 2,
            angle1: 1.5,
            angle2: 2.0,
            z: 3.0,
        })
    );
}

#[test]
fn rejects_unknown_and_invalid_lines() {
    assert_eq!("   ".parse::<LinkMessage>(), Err(ProtocolError::Empty));
    assert_eq!(
        "HELLO".parse::<LinkMessage>(),
        Err(ProtocolError::UnknownToken("HELLO".to_string()))
    );
    assert!(matches!(
        "J1:abc".parse::<LinkMessage>(),
        Err(ProtocolError::InvalidValue { .. })
    ));
    assert!(matches!(
        "J1:inf".parse::<LinkMessage>(),
        Err(ProtocolError::InvalidValue { .. })
    ));
    assert!(matches!(
        "SPEED:-5".parse::<LinkMessage>(),
        Err(ProtocolError::InvalidValue { .. })
    ));
    assert!(matches!(
        "POS_SAVED:1,J1=1,J2=2".parse::<LinkMessage>(),
        Err(ProtocolError::MissingField { field: "Z", .. })
    ));
}

#[test]
fn error_report_carries_snake_case_code() {
    let report = ErrorReport::from(&RobotError::Unreachable { x: 400.0, y: 0.0 });
    assert_eq!(report.code, ErrorCode::Unreachable);
    assert_eq!(
        serde_json::to_value(&report).expect("json")["code"],
        "unreachable"
    );
}

#[test]
fn geometry_errors_report_invalid_geometry() {
    let report = ErrorReport::from(GeometryError::InvalidOffset(f64::INFINITY));
    assert_eq!(report.code, ErrorCode::InvalidGeometry);
    assert_eq!(
        serde_json::to_value(&report).expect("json")["code"],
        "invalid_geometry"
    );
    assert_eq!(
        report.to_string(),
        "InvalidGeometry: offset angle must be finite, got inf"
    );
}
