use std::fs;
use std::path::PathBuf;

use football_terminal::events::{self, TYPE_PASS, parse_events_json};
use football_terminal::features;
use football_terminal::matches::{load_match_index, match_label, parse_matches_json};

fn data_dir() -> PathBuf {
    let mut path = PathBuf::from(env!("CARGO_MANIFEST_DIR"));
    path.push("tests");
    path.push("fixtures");
    path.push("data");
    path
}

fn read_fixture(rel: &str) -> String {
    fs::read_to_string(data_dir().join(rel)).expect("fixture file should be readable")
}

#[test]
fn parses_event_fixture() {
    let events = parse_events_json(&read_fixture("events/9001.json")).expect("fixture should parse");
    assert_eq!(events.len(), 20);

    let first_pass = &events[1];
    assert_eq!(first_pass.type_name(), TYPE_PASS);
    assert_eq!(first_pass.team_name(), Some("Reds"));
    assert_eq!(first_pass.player_name(), Some("Alice"));
    assert_eq!(first_pass.pass_recipient(), Some("Bob"));
    assert!(first_pass.pass_completed());
    let end = first_pass.pass_end().expect("pass end");
    assert_eq!((end.x, end.y), (45.0, 38.0));

    let incomplete = events.iter().find(|e| e.id == "e6").expect("e6");
    assert!(!incomplete.pass_completed());
    assert!(incomplete.pass_recipient().is_none());

    let goal = events.iter().find(|e| e.id == "e10").expect("e10");
    assert_eq!(goal.shot_outcome(), Some("Goal"));
    assert!((goal.xg() - 0.3).abs() < 1e-12);
    assert_eq!(goal.shot_end().map(|p| p.x), Some(120.0));

    let lineup = &events[0];
    assert!(lineup.player_name().is_none());
    assert_eq!(lineup.xg(), 0.0);
}

#[test]
fn null_location_component_drops_the_point() {
    let events = events::load_match_events(&data_dir(), 9001).expect("load events");
    let broken = events.iter().find(|e| e.id == "e19").expect("e19");
    assert!(broken.location().is_none());
    assert_eq!(events::filter_pass_events(&events).len(), 9);
}

#[test]
fn missing_event_file_reports_path() {
    let err = events::load_match_events(&data_dir(), 404).expect_err("missing file");
    assert!(format!("{err:#}").contains("404.json"));
}

#[test]
fn empty_or_null_payloads_parse_to_nothing() {
    assert!(parse_events_json("").expect("empty").is_empty());
    assert!(parse_events_json("null").expect("null").is_empty());
    assert!(parse_matches_json(" null ").expect("null").is_empty());
    assert!(parse_events_json("{not json").is_err());
}

#[test]
fn extracts_pass_records_from_fixture() {
    let events = events::load_match_events(&data_dir(), 9001).expect("load events");
    let passes = features::extract_passes(&events);
    assert_eq!(passes.len(), 8);
    assert_eq!(passes.iter().filter(|p| !p.completed).count(), 1);

    let first = passes[0];
    assert!((first.distance - features::calculate_distance(30.0, 40.0, 45.0, 38.0)).abs() < 1e-12);
    assert!((first.angle - (-2.0_f64).atan2(15.0)).abs() < 1e-12);
    assert_eq!(first.minute, 0);
}

#[test]
fn match_index_filters_and_sorts() {
    let matches_dir = data_dir().join("matches");
    let all = load_match_index(&matches_dir, &[]).expect("index");
    let ids: Vec<u64> = all.iter().map(|m| m.match_id).collect();
    assert_eq!(ids, vec![9001, 9002, 7001]);

    let la_liga = load_match_index(&matches_dir, &["La Liga".to_string()]).expect("index");
    assert_eq!(la_liga.len(), 2);
    assert_eq!(la_liga[0].home_team, "Reds");
    assert_eq!(la_liga[0].away_score, Some(1));
    assert_eq!(match_label(&la_liga[0]), "Reds vs Blues (2021-02-01)");
}
