//! Each model writes only the record fields it owns.

use std::sync::Arc;

use wedm_physics::{
    ControlMode, DielectricConfig, DielectricModule, IgnitionConfig, IgnitionModule,
    MaterialConfig, MaterialRemovalModule, MechanicsConfig, MechanicsModule, ProcessGeometry,
    ProcessModule, ProcessTables, SimRecord, SparkState, SparkStatus, WireConfig,
    WireThermalModule, seeded_rng,
};

fn frozen_record() -> SimRecord {
    SimRecord {
        time_us: 1234,
        time_since_servo_us: 234,
        voltage: Some(80.0),
        current: Some(215.0),
        target_voltage: Some(80.0),
        current_mode: Some("I13".parse().expect("mode")),
        on_time_us: Some(3.0),
        off_time_us: Some(20.0),
        servo_delta: 2.0,
        target_position_um: 5000.0,
        workpiece_position_um: 140.0,
        wire_position_um: 100.0,
        wire_velocity_um_per_s: 50.0,
        wire_unwind_velocity_um_per_us: 0.1,
        wire_temperature_k: vec![300.0; 60],
        wire_mean_temperature_k: Some(300.0),
        spark_status: SparkStatus {
            state: SparkState::Spark,
            location_mm: Some(3.3),
            duration_us: 0,
        },
        last_crater_volume_um3: 9000.0,
        debris_volume_um3: 2.0e5,
        debris_density: 0.01,
        cavity_volume_um3: 1.0e8,
        flow_condition: 0.8,
        dielectric_temperature_k: 293.15,
        ..Default::default()
    }
}

fn tables() -> Arc<ProcessTables> {
    Arc::new(ProcessTables::builtin())
}

#[test]
fn ignition_writes_only_electrical_state() {
    let mut m = IgnitionModule::new(IgnitionConfig::default(), ProcessGeometry::default(), tables())
        .expect("ignition");
    let before = frozen_record();
    let mut after = before.clone();
    m.update(&mut after, &mut seeded_rng(1));

    let mut expected = before.clone();
    expected.voltage = after.voltage;
    expected.current = after.current;
    expected.spark_status = after.spark_status;
    expected.is_short_circuit = after.is_short_circuit;
    assert_eq!(expected, after);
    assert_eq!(after.spark_status.duration_us, 1);
}

#[test]
fn material_writes_only_workpiece_and_crater() {
    let mut m =
        MaterialRemovalModule::new(MaterialConfig::default(), ProcessGeometry::default(), tables())
            .expect("material");
    let before = frozen_record();
    let mut after = before.clone();
    m.update(&mut after, &mut seeded_rng(1));

    let mut expected = before.clone();
    expected.workpiece_position_um = after.workpiece_position_um;
    expected.last_crater_volume_um3 = after.last_crater_volume_um3;
    assert_eq!(expected, after);
    assert!(after.workpiece_position_um >= before.workpiece_position_um);
}

#[test]
fn dielectric_writes_only_dielectric_state() {
    let mut m =
        DielectricModule::new(DielectricConfig::default(), ProcessGeometry::default(), 293.15)
            .expect("dielectric");
    let before = frozen_record();
    let mut after = before.clone();
    m.update(&mut after, &mut seeded_rng(1));

    let mut expected = before.clone();
    expected.debris_volume_um3 = after.debris_volume_um3;
    expected.debris_density = after.debris_density;
    expected.cavity_volume_um3 = after.cavity_volume_um3;
    expected.flow_condition = after.flow_condition;
    expected.dielectric_temperature_k = after.dielectric_temperature_k;
    assert_eq!(expected, after);
}

#[test]
fn wire_writes_only_thermal_state() {
    let mut m = WireThermalModule::new(WireConfig::default(), ProcessGeometry::default())
        .expect("wire");
    let before = frozen_record();
    let mut after = before.clone();
    m.update(&mut after, &mut seeded_rng(1));

    let mut expected = before.clone();
    expected.wire_temperature_k = after.wire_temperature_k.clone();
    expected.wire_mean_temperature_k = after.wire_mean_temperature_k;
    expected.time_in_critical_temp_us = after.time_in_critical_temp_us;
    expected.is_wire_broken = after.is_wire_broken;
    assert_eq!(expected, after);
    assert_eq!(after.wire_temperature_k.len(), before.wire_temperature_k.len());
}

#[test]
fn mechanics_writes_only_wire_kinematics() {
    for mode in [ControlMode::Position, ControlMode::Velocity] {
        let mut m = MechanicsModule::new(MechanicsConfig {
            mode,
            ..Default::default()
        })
        .expect("mechanics");
        let before = frozen_record();
        let mut after = before.clone();
        m.update(&mut after, &mut seeded_rng(1));

        let mut expected = before.clone();
        expected.wire_position_um = after.wire_position_um;
        expected.wire_velocity_um_per_s = after.wire_velocity_um_per_s;
        assert_eq!(expected, after);
    }
}

#[test]
fn modules_report_distinct_names() {
    let modules: Vec<Box<dyn ProcessModule>> = vec![
        Box::new(
            IgnitionModule::new(IgnitionConfig::default(), ProcessGeometry::default(), tables())
                .expect("ignition"),
        ),
        Box::new(
            MaterialRemovalModule::new(MaterialConfig::default(), ProcessGeometry::default(), tables())
                .expect("material"),
        ),
        Box::new(
            DielectricModule::new(DielectricConfig::default(), ProcessGeometry::default(), 293.15)
                .expect("dielectric"),
        ),
        Box::new(
            WireThermalModule::new(WireConfig::default(), ProcessGeometry::default()).expect("wire"),
        ),
        Box::new(MechanicsModule::new(MechanicsConfig::default()).expect("mechanics")),
    ];
    let mut names: Vec<_> = modules.iter().map(|m| m.name()).collect();
    names.sort_unstable();
    names.dedup();
    assert_eq!(names.len(), 5);
}
