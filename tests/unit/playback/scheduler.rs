use super::*;
use crate::foundation::core::PoseIndex;

#[derive(Default)]
struct Recorder {
    poses: Vec<usize>,
}

impl PoseTarget for Recorder {
    fn render_pose(&mut self, transform: &TransformState) {
        self.poses.push(transform.current_pose.get());
    }
}

fn ms(v: u64) -> Duration {
    Duration::from_millis(v)
}

#[test]
fn starts_stopped_and_play_is_idempotent() {
    let mut sched = AnimationScheduler::new(63);
    assert_eq!(sched.state(), PlaybackState::Stopped);
    assert_eq!(sched.handle(), None);

    sched.play(ms(0));
    let first = sched.handle();
    assert_eq!(sched.state(), PlaybackState::Playing);
    sched.play(ms(10));
    assert_eq!(sched.handle(), first);
    assert_eq!(sched.next_deadline(), Some(ms(63)));
}

#[test]
fn ticks_walk_the_cycle_and_return_to_zero() {
    let mut sched = AnimationScheduler::new(63);
    let mut t = TransformState::default();
    let mut rec = Recorder::default();

    sched.play(ms(0));
    assert_eq!(sched.tick(ms(62), &mut t, &mut rec), 0);
    for n in 1..=6u64 {
        assert_eq!(sched.tick(ms(63 * n), &mut t, &mut rec), 1);
    }
    assert_eq!(rec.poses, vec![0, 1, 2, 3, 4, 0]);
}

#[test]
fn stop_mid_sequence_draws_once_and_cancels() {
    let mut sched = AnimationScheduler::new(50);
    let mut t = TransformState::default();
    let mut rec = Recorder::default();

    sched.play(ms(0));
    sched.tick(ms(100), &mut t, &mut rec);
    assert_eq!(rec.poses, vec![0, 1]);

    sched.stop(&t, &mut rec);
    assert_eq!(sched.state(), PlaybackState::Stopped);
    assert_eq!(rec.poses, vec![0, 1, 2]);
    assert_eq!(t.current_pose.get(), 2);

    assert_eq!(sched.tick(ms(10_000), &mut t, &mut rec), 0);
    assert_eq!(rec.poses.len(), 3);
}

#[test]
fn seek_stops_clamps_and_renders() {
    let mut sched = AnimationScheduler::new(50);
    let mut t = TransformState::default();
    let mut rec = Recorder::default();

    sched.seek(-1, &mut t, &mut rec);
    assert_eq!(t.current_pose, PoseIndex::FIRST);
    assert_eq!(rec.poses, vec![0]);

    sched.play(ms(0));
    t.current_pose = PoseIndex::LAST;
    sched.seek(1, &mut t, &mut rec);
    assert_eq!(sched.state(), PlaybackState::Stopped);
    assert_eq!(t.current_pose, PoseIndex::FIRST);
    assert_eq!(rec.poses, vec![0, 4, 0]);

    sched.seek(3, &mut t, &mut rec);
    assert_eq!(t.current_pose.get(), 3);
}

#[test]
fn set_rate_while_playing_restarts_timer_without_moving_pose() {
    let mut sched = AnimationScheduler::new(63);
    let mut t = TransformState::default();
    let mut rec = Recorder::default();

    sched.play(ms(0));
    sched.tick(ms(63), &mut t, &mut rec);
    let before = sched.handle();

    sched.set_rate(30, ms(70)).unwrap();
    assert_eq!(sched.delay_ms(), 33);
    assert_ne!(sched.handle(), before);
    assert_eq!(sched.state(), PlaybackState::Playing);
    assert_eq!(sched.next_deadline(), Some(ms(103)));
    assert_eq!(t.current_pose.get(), 1);

    assert_eq!(sched.tick(ms(102), &mut t, &mut rec), 0);
    assert_eq!(sched.tick(ms(103), &mut t, &mut rec), 1);
    assert_eq!(sched.tick(ms(136), &mut t, &mut rec), 1);
    assert_eq!(rec.poses, vec![0, 1, 2]);
}

#[test]
fn set_rate_while_stopped_only_changes_delay() {
    let mut sched = AnimationScheduler::new(63);
    sched.set_rate(10, ms(0)).unwrap();
    assert_eq!(sched.delay_ms(), 100);
    assert_eq!(sched.state(), PlaybackState::Stopped);
    assert!(sched.set_rate(0, ms(0)).is_err());
    assert_eq!(sched.delay_ms(), 100);
}

#[test]
fn long_stall_catches_up_a_bounded_number_of_ticks() {
    let mut sched = AnimationScheduler::new(10);
    let mut t = TransformState::default();
    let mut rec = Recorder::default();

    sched.play(ms(0));
    assert_eq!(sched.tick(ms(1_000), &mut t, &mut rec), MAX_CATCH_UP);
    assert_eq!(sched.next_deadline(), Some(ms(1_010)));
}

#[test]
fn toggle_flips_state() {
    let mut sched = AnimationScheduler::new(10);
    let t = TransformState::default();
    let mut rec = Recorder::default();
    assert_eq!(sched.toggle(ms(0), &t, &mut rec), PlaybackState::Playing);
    assert_eq!(sched.toggle(ms(5), &t, &mut rec), PlaybackState::Stopped);
    assert_eq!(rec.poses, vec![0]);
    assert_eq!(PlaybackState::Stopped.name(), "stopped");
}
