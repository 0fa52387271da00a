use midnight_drive_core::{Axis, RoadRect, Vec2};
use midnight_drive_system_traffic::{Traffic, TrafficTuning, TRAFFIC_PALETTE_SIZE};
use proptest::prelude::*;

fn roads() -> Vec<RoadRect> {
    vec![
        RoadRect::new(0.0, 0.0, 400.0, 14.0),
        RoadRect::new(100.0, 0.0, 14.0, 300.0),
        RoadRect::new(-50.0, 50.0, 40.0, 14.0),
    ]
}

#[test]
fn spawns_configured_count_on_long_roads_only() {
    let traffic = Traffic::spawn(&roads(), TrafficTuning::default());
    let view = traffic.view();
    assert_eq!(view.len(), 24);

    for agent in view.iter() {
        assert!(agent.color_index < TRAFFIC_PALETTE_SIZE);
        match agent.axis {
            Axis::Horizontal => {
                assert!((agent.position.y.abs() - 3.5).abs() < 1e-5);
                assert!(agent.position.x.abs() <= 400.0 * 0.35);
            }
            Axis::Vertical => {
                assert!((agent.position.x - 100.0).abs() - 3.5 < 1e-5);
                assert!(agent.position.y.abs() <= 300.0 * 0.35);
            }
        }
    }
}

#[test]
fn round_robin_uses_every_eligible_road() {
    let traffic = Traffic::spawn(&roads(), TrafficTuning::default());
    let view = traffic.view();
    let horizontal = view
        .iter()
        .filter(|agent| agent.axis == Axis::Horizontal)
        .count();
    assert_eq!(horizontal, 12);
}

#[test]
fn equal_seeds_spawn_equal_traffic() {
    let first = Traffic::spawn(&roads(), TrafficTuning::default());
    let second = Traffic::spawn(&roads(), TrafficTuning::default());
    assert_eq!(first, second);

    let reseeded = Traffic::spawn(
        &roads(),
        TrafficTuning {
            seed: 99,
            ..TrafficTuning::default()
        },
    );
    assert_ne!(first, reseeded);
}

#[test]
fn no_eligible_road_yields_empty_traffic() {
    let short = vec![RoadRect::new(0.0, 0.0, 50.0, 14.0)];
    let traffic = Traffic::spawn(&short, TrafficTuning::default());
    assert!(traffic.is_empty());
    assert!(traffic.view().is_empty());
    assert!(!traffic.is_near_any_agent(Vec2::ZERO, 1_000.0));
}

#[test]
fn proximity_query_matches_view() {
    let traffic = Traffic::spawn(&roads(), TrafficTuning::default());
    let view = traffic.view();
    let first = view.iter().next().expect("agent");
    assert!(traffic.is_near_any_agent(first.position + Vec2::new(0.5, 0.0), 3.2));
    assert!(view.is_near_any_agent(first.position, 0.1));
}

proptest! {
    #[test]
    fn agents_stay_on_their_road(seed in any::<u64>(), dts in prop::collection::vec(0.0_f32..=3.0, 1..400)) {
        let tuning = TrafficTuning { seed, ..TrafficTuning::default() };
        let mut traffic = Traffic::spawn(&roads(), tuning);
        let lanes: Vec<f32> = traffic.lane_offsets().collect();
        for dt in dts {
            traffic.step(dt);
        }
        for (agent, lane) in traffic.view().iter().zip(lanes) {
            let (along, across, half) = match agent.axis {
                Axis::Horizontal => (agent.position.x, agent.position.y, 200.0),
                Axis::Vertical => (agent.position.y, agent.position.x - 100.0, 150.0),
            };
            prop_assert_eq!(across, lane);
            prop_assert!(along.abs() <= half * 0.7 + 0.55 * 3.0);
        }
    }
}
