use std::time::Duration;

use midnight_drive_simulation::FrameStep;
use proptest::prelude::*;

proptest! {
    #[test]
    fn normalized_step_is_always_bounded(nanos in 0_u64..5_000_000_000, fps in 1.0_f32..240.0) {
        let step = FrameStep::from_elapsed(Duration::from_nanos(nanos), fps, 3.0);
        prop_assert!(step.dt >= 0.0 && step.dt <= 3.0);
        prop_assert!((step.sec - nanos as f32 / 1e9).abs() < 1e-3);
    }

    #[test]
    fn step_grows_with_elapsed_time(a in 0_u64..100_000_000, b in 0_u64..100_000_000) {
        let (short, long) = if a <= b { (a, b) } else { (b, a) };
        let first = FrameStep::from_elapsed(Duration::from_nanos(short), 60.0, 3.0);
        let second = FrameStep::from_elapsed(Duration::from_nanos(long), 60.0, 3.0);
        prop_assert!(first.dt <= second.dt);
    }
}
