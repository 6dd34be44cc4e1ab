use std::sync::Arc;

use proptest::prelude::*;
use wedm_physics::{CurrentMode, ProcessTables, SparkState};
use wedm_sim::{Command, SimConfig, WireEdmSim};

proptest! {
    #![proptest_config(ProptestConfig::with_cases(16))]

    #[test]
    fn episode_invariants_hold(
        seed in any::<u64>(),
        gap in 2.0_f64..80.0,
        mode in 1_u8..=19,
        on_time in 1.0_f64..10.0,
        off_time in 0.0_f64..50.0,
    ) {
        let mut config = SimConfig::default();
        config.process.initial_wire_position_um = config.process.initial_workpiece_position_um - gap;
        let mut sim = WireEdmSim::new(config, Arc::new(ProcessTables::builtin()), seed).unwrap();
        let n = sim.wire().n_segments();
        let cmd = Command {
            current_mode: CurrentMode::new(mode).unwrap(),
            on_time_us: on_time,
            off_time_us: off_time,
            ..Default::default()
        };

        let mut prev = SparkState::Idle;
        let mut prev_workpiece = sim.record().workpiece_position_um;
        for _ in 0..2000 {
            let out = sim.step(&cmd).unwrap();
            let r = sim.record();
            prop_assert!(prev.can_transition_to(out.spark_state));
            prop_assert!((0.0..=1.0).contains(&r.debris_density));
            prop_assert!((0.0..=1.0).contains(&r.flow_condition));
            prop_assert_eq!(r.wire_temperature_k.len(), n);
            prop_assert!(r.workpiece_position_um >= prev_workpiece);
            prev = out.spark_state;
            prev_workpiece = r.workpiece_position_um;
            if out.terminated {
                break;
            }
        }
    }
}
