use midnight_drive_core::{CollisionRect, InputIntents, ObstacleView, TrafficView, Vec2};
use midnight_drive_system_vehicle::{VehicleSimulation, VehicleState, VehicleTuning};
use proptest::prelude::*;

fn intents() -> impl Strategy<Value = InputIntents> {
    (any::<bool>(), any::<bool>(), any::<bool>(), any::<bool>(), any::<bool>()).prop_map(
        |(accelerate, brake, steer_left, steer_right, drift)| InputIntents {
            accelerate,
            brake,
            steer_left,
            steer_right,
            drift,
        },
    )
}

proptest! {
    #[test]
    fn accelerating_never_exceeds_max_speed(
        dts in prop::collection::vec(0.0_f32..=3.0, 1..200),
        steer in any::<bool>(),
    ) {
        let tuning = VehicleTuning::default();
        let mut car = VehicleSimulation::new(tuning);
        let input = InputIntents { accelerate: true, steer_left: steer, ..InputIntents::default() };
        for dt in dts {
            let _ = car.step(input, dt, ObstacleView::empty(), &TrafficView::default());
            prop_assert!(car.state().speed <= tuning.max_speed);
        }
    }

    #[test]
    fn braking_never_drops_below_reverse_max(dts in prop::collection::vec(0.0_f32..=3.0, 1..200)) {
        let tuning = VehicleTuning::default();
        let mut car = VehicleSimulation::new(tuning);
        let input = InputIntents { brake: true, ..InputIntents::default() };
        for dt in dts {
            let _ = car.step(input, dt, ObstacleView::empty(), &TrafficView::default());
            prop_assert!(car.state().speed >= tuning.reverse_max);
        }
    }

    #[test]
    fn coasting_decays_monotonically_to_rest(speed in -0.4_f32..=1.2, dt in 0.1_f32..=3.0) {
        let tuning = VehicleTuning::default();
        let mut car = VehicleSimulation::with_state(
            tuning,
            VehicleState { speed, ..VehicleState::default() },
        );
        let bound = (speed.abs() / (tuning.friction * dt)).ceil() as usize + 1;
        let mut previous = speed.abs();
        for _ in 0..bound {
            let _ = car.step(InputIntents::default(), dt, ObstacleView::empty(), &TrafficView::default());
            let current = car.state().speed.abs();
            prop_assert!(current <= previous);
            previous = current;
        }
        prop_assert_eq!(car.state().speed, 0.0);
    }

    #[test]
    fn car_never_ends_a_frame_inside_a_building(
        start_x in -30.0_f32..30.0,
        start_z in prop_oneof![-40.0_f32..-8.0, 8.0_f32..40.0],
        heading in -3.2_f32..3.2,
        inputs in prop::collection::vec((intents(), 0.0_f32..=3.0), 1..300),
    ) {
        let buildings = [CollisionRect::new(0.0, 0.0, 5.0, 5.0)];
        let obstacles = ObstacleView::new(&buildings, &[], &[]);
        let mut car = VehicleSimulation::with_state(
            VehicleTuning::default(),
            VehicleState::spawn_at(Vec2::new(start_x, start_z), heading),
        );
        for (input, dt) in inputs {
            let _ = car.step(input, dt, obstacles, &TrafficView::default());
            prop_assert!(!buildings[0].strictly_contains(car.state().position));
        }
    }
}
