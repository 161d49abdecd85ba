use std::path::PathBuf;
use std::time::Duration;

use football_terminal::events::{self, MatchEvent};
use football_terminal::simulate::{
    ActionKind, Playback, ball_position, load_actions, match_clock, simulate_events, visible_actions,
};

fn fixture_events() -> Vec<MatchEvent> {
    let mut path = PathBuf::from(env!("CARGO_MANIFEST_DIR"));
    path.push("tests");
    path.push("fixtures");
    path.push("data");
    events::load_match_events(&path, 9001).expect("fixture should load")
}

#[test]
fn actions_are_timed_across_periods() {
    let actions = load_actions(&fixture_events()).expect("actions");
    assert_eq!(actions.len(), 12);
    assert_eq!(actions[0].time_sec, 0.0);
    assert!(actions.windows(2).all(|w| w[0].time_sec <= w[1].time_sec));

    let carries = actions.iter().filter(|a| a.kind == ActionKind::Carry).count();
    let shots = actions.iter().filter(|a| a.kind == ActionKind::Shot).count();
    assert_eq!(carries, 1);
    assert_eq!(shots, 3);

    // Second-half clocks restart, so they sit after the first half's last action.
    let last = actions.last().expect("last action");
    assert_eq!(last.period, 2);
    assert!((last.time_sec - 1319.0).abs() < 1e-9);
    assert_eq!(last.clock, 47 * 60);
}

#[test]
fn no_actions_is_an_error() {
    let events: Vec<MatchEvent> = fixture_events()
        .into_iter()
        .filter(|e| e.type_name() == "Pressure")
        .collect();
    assert!(load_actions(&events).is_err());
}

#[test]
fn playhead_reveals_actions_and_ball() {
    let actions = load_actions(&fixture_events()).expect("actions");
    assert_eq!(visible_actions(&actions, -1.0).len(), 0);
    assert!(ball_position(&actions, -1.0).is_none());

    let first_two = visible_actions(&actions, 4.5);
    assert_eq!(first_two.len(), 2);
    let ball = ball_position(&actions, 4.5).expect("ball");
    assert_eq!((ball.x, ball.y), (50.0, 30.0));
    assert_eq!(match_clock(&actions, 4.5), 5);

    assert_eq!(visible_actions(&actions, 1e9).len(), actions.len());
}

#[test]
fn playback_speed_and_seek() {
    let actions = load_actions(&fixture_events()).expect("actions");
    let mut playback = Playback::for_actions(&actions);
    assert!((playback.end - 1319.0).abs() < 1e-9);
    assert_eq!(playback.speed(), 1.0);

    playback.tick();
    assert_eq!(playback.frame, 0.0);

    playback.toggle();
    playback.cycle_speed();
    assert_eq!(playback.speed(), 2.0);
    playback.tick();
    assert!((playback.frame - 1.0).abs() < 1e-12);
    playback.cycle_speed();
    assert_eq!(playback.speed(), 0.5);

    playback.seek(5000.0);
    assert_eq!(playback.frame, playback.end);
    playback.seek_by(-10_000.0);
    assert_eq!(playback.frame, 0.0);
    assert_eq!(playback.progress(), 0.0);
}

#[test]
fn replay_prints_each_event_and_sleeps_between() {
    let events = fixture_events();
    let mut out: Vec<u8> = Vec::new();
    let mut pauses: Vec<Duration> = Vec::new();
    let count = simulate_events(&events, &mut out, |d| pauses.push(d)).expect("replay");
    assert_eq!(count, 20);
    assert_eq!(pauses.len(), 19);
    assert_eq!(pauses[0], Duration::from_secs(1));
    assert!(pauses.iter().any(|d| d.is_zero()));

    let text = String::from_utf8(out).expect("utf8");
    let lines: Vec<&str> = text.lines().collect();
    assert_eq!(lines.len(), 20);
    assert_eq!(lines[0], "[00:00:00.000] Starting XI by N/A");
    assert_eq!(lines[1], "[00:00:01.000] Pass by Alice");
}

#[test]
fn replay_rejects_bad_timestamps() {
    let mut events = fixture_events();
    events[3].timestamp = "later".to_string();
    let mut out: Vec<u8> = Vec::new();
    assert!(simulate_events(&events, &mut out, |_| {}).is_err());
}
