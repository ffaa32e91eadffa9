// End-to-end replay tests: a synthetic one-hour race goes through the session cache and
// the replay engine, and the resulting frames and standings are checked.

use std::f64::consts::TAU;

use gridreplay::session::{
    CircuitInfo, DriverInfo, EventInfo, LapRecord, ResultRecord, SessionRecord, TelemetryChunk,
    TelemetrySample,
};
use gridreplay::{
    CachedSource, Compound, FileCache, GridReplayError, InMemorySource, ReplayConfig, Session,
    SessionKey, SessionReplay, SessionSource,
};
use tempfile::TempDir;

const RACE_START: f64 = 3000.;
const RACE_LENGTH: f64 = 3600.;
const LAP_LENGTH: f64 = 90.;
const FIELD: u32 = 20;
const RETIRED_DRIVER: u32 = 5;
const RETIREMENT_TIME: f64 = 1200.;

fn key() -> SessionKey {
    SessionKey::new(2025, "Monza", "R")
}

/// Twenty cars lapping a circle every 90 s, in driver-number order. Driver 5 retires
/// 1200 s in while running fifth; driver 10 stops for tyres on lap 20.
fn synthetic_race() -> Session {
    let mut records = vec![
        SessionRecord::Event(EventInfo {
            key: key(),
            event_name: "Italian Grand Prix".to_string(),
        }),
        SessionRecord::Circuit(CircuitInfo { rotation_deg: 0. }),
    ];

    for driver_number in 1..=FIELD {
        let retires = driver_number == RETIRED_DRIVER;
        let end = if retires {
            RACE_START + RETIREMENT_TIME
        } else {
            RACE_START + RACE_LENGTH
        };

        records.push(SessionRecord::Driver(DriverInfo {
            driver_number,
            abbreviation: format!("D{:02}", driver_number),
            team_name: format!("Team {}", (driver_number + 1) / 2),
            team_colour: "3671C6".to_string(),
        }));

        let mut lap_number = 1;
        let mut lap_start = RACE_START;
        while lap_start <= end {
            let mut lap = LapRecord::new(driver_number, lap_number);
            lap.position = Some(driver_number);
            lap.lap_start_s = Some(lap_start);
            lap.lap_time_s = Some(LAP_LENGTH + driver_number as f64 / 100.);
            lap.compound = Some(if lap_number < 20 { "MEDIUM" } else { "HARD" }.to_string());
            if driver_number == 10 && lap_number == 19 {
                lap.pit_in_s = Some(lap_start + 85.);
            }
            if driver_number == 10 && lap_number == 20 {
                lap.pit_out_s = Some(lap_start + 15.);
            }
            records.push(SessionRecord::Lap(lap));
            lap_number += 1;
            lap_start += LAP_LENGTH;
        }

        let phase = driver_number as f64 * 0.01;
        let samples = (0..)
            .map(|i| RACE_START + i as f64)
            .take_while(|t| *t <= end)
            .map(|t| {
                let angle = TAU * ((t - RACE_START) / LAP_LENGTH) - phase;
                TelemetrySample {
                    session_time_s: t,
                    x: 1000. * angle.cos(),
                    y: 1000. * angle.sin(),
                    lap_number: ((t - RACE_START) / LAP_LENGTH).floor() as u32 + 1,
                }
            })
            .collect();
        records.push(SessionRecord::Telemetry(TelemetryChunk {
            driver_number,
            samples,
        }));

        let status = match driver_number {
            RETIRED_DRIVER => "Retired",
            FIELD => "+1 Lap",
            _ => "Finished",
        };
        records.push(SessionRecord::Result(ResultRecord {
            driver_number,
            status: status.to_string(),
            grid_position: Some(driver_number),
            position: (!retires).then_some(driver_number),
        }));
    }

    Session::from_records(key(), records).unwrap()
}

fn cached_replay(temp_dir: &TempDir) -> SessionReplay {
    let cache = FileCache::new(temp_dir.path().to_path_buf()).unwrap();
    let mut source = CachedSource::new(InMemorySource::from_sessions(vec![synthetic_race()]), cache);
    let session = source.load(&key()).unwrap();
    SessionReplay::build(&session, &ReplayConfig::default()).unwrap()
}

#[test]
fn test_one_hour_race_through_cache() {
    let temp_dir = TempDir::new().unwrap();
    let replay = cached_replay(&temp_dir);

    assert_eq!(replay.race_duration(), RACE_LENGTH);
    assert_eq!(replay.frame_count(), 36001);
    assert_eq!(replay.event_name(), "Italian Grand Prix");
    assert_eq!(replay.frame_at(0).unwrap().drivers.len(), FIELD as usize);
    // outline is lap 1 of driver 1, one sample per second
    assert_eq!(replay.track_outline().len(), LAP_LENGTH as usize);

    // a second load is served from disk only
    let cache = FileCache::new(temp_dir.path().to_path_buf()).unwrap();
    let mut offline = CachedSource::new(InMemorySource::default(), cache);
    let reloaded = offline.load(&key()).unwrap();
    assert_eq!(reloaded, synthetic_race());
}

#[test]
fn test_retirement_sorts_after_finishers() {
    let temp_dir = TempDir::new().unwrap();
    let replay = cached_replay(&temp_dir);

    let before = replay.leaderboard_at(1100.);
    assert_eq!(before[4].driver_number, RETIRED_DRIVER);
    assert!(!before[4].is_dnf);

    let after = replay.leaderboard_at(1500.);
    assert_eq!(after.len(), FIELD as usize);
    let last = after.last().unwrap();
    assert_eq!(last.driver_number, RETIRED_DRIVER);
    assert!(last.is_dnf);
    assert!(after[..after.len() - 1].iter().all(|s| !s.is_dnf));
    assert_eq!(after[4].driver_number, 6);

    let frame = replay.frame_at_time(1500.).unwrap();
    let retired = frame.driver(RETIRED_DRIVER).unwrap();
    assert!(!retired.active);
    assert_eq!(
        retired.position,
        replay
            .frame_at_time(RETIREMENT_TIME + 100.)
            .unwrap()
            .driver(RETIRED_DRIVER)
            .unwrap()
            .position
    );

    assert_eq!(retired.position, replay.trace(RETIRED_DRIVER).unwrap().last_point());
}

#[test]
fn test_ranks_contiguous_over_the_race() {
    let temp_dir = TempDir::new().unwrap();
    let replay = cached_replay(&temp_dir);

    let mut previous_lap = 0;
    for minute in 0..=60 {
        let t = minute as f64 * 60.;
        let standings = replay.leaderboard_at(t);
        let ranks = standings.iter().map(|s| s.rank).collect::<Vec<_>>();
        assert_eq!(ranks, (1..=FIELD).collect::<Vec<_>>(), "at {}s", t);

        let lap = replay.lap_for_time(t);
        assert!(lap >= previous_lap);
        previous_lap = lap;
    }
    assert_eq!(replay.lap_for_time(RACE_LENGTH), replay.total_laps());
}

#[test]
fn test_pit_stop_and_tyre_change() {
    let temp_dir = TempDir::new().unwrap();
    let replay = cached_replay(&temp_dir);

    let windows = replay.pit_windows(10);
    assert_eq!(windows.len(), 1);
    let window = windows[0];
    // lap 19 starts at 18 * 90 s
    assert_eq!(window.start_time, 18. * LAP_LENGTH + 85.);
    assert_eq!(window.end_time, 19. * LAP_LENGTH + 15.);

    let driver_10 = |t: f64| {
        replay
            .leaderboard_at(t)
            .into_iter()
            .find(|s| s.driver_number == 10)
            .unwrap()
    };
    assert!(driver_10(window.start_time).is_pitting);
    assert!(driver_10(window.end_time).is_pitting);
    assert!(!driver_10(window.end_time + 1.).is_pitting);
    assert_eq!(driver_10(window.start_time).compound, Compound::Medium);
    assert_eq!(driver_10(window.end_time).compound, Compound::Hard);
}

#[test]
fn test_position_timeline_queries() {
    let temp_dir = TempDir::new().unwrap();
    let replay = cached_replay(&temp_dir);

    assert_eq!(replay.position_at(3, 0.), Some(3));
    assert_eq!(replay.position_at(3, 2000.), Some(3));
    assert_eq!(replay.position_at(RETIRED_DRIVER, 3000.), Some(5));
    assert_eq!(replay.position_at(99, 100.), None);
}

#[test]
fn test_hand_written_dataset() {
    let temp_dir = TempDir::new().unwrap();
    let path = temp_dir.path().join("2024_spa_r.jsonl");
    let dataset = [
        r#"{"Event":{"key":{"year":2024,"location":"Spa","session_type":"R"},"event_name":"Belgian Grand Prix"}}"#,
        r#"{"Circuit":{"rotation_deg":90.0}}"#,
        r#"{"Driver":{"driver_number":44,"abbreviation":"HAM","team_name":"Mercedes","team_colour":"27F4D2"}}"#,
        r#"{"Driver":{"driver_number":63,"abbreviation":"RUS"}}"#,
        r#"{"Lap":{"driver_number":44,"lap_number":1,"position":2,"compound":"soft","lap_start_s":100.0,"lap_time_s":110.5}}"#,
        r#"{"Lap":{"driver_number":63,"lap_number":1,"position":1,"compound":"MEDIUM","lap_start_s":100.0}}"#,
        r#"{"Result":{"driver_number":44,"status":"Finished","grid_position":2,"position":1}}"#,
        r#"{"Result":{"driver_number":63,"status":"Disqualified","grid_position":1}}"#,
        r#"{"Telemetry":{"driver_number":44,"samples":[{"session_time_s":100.0,"x":1.0,"y":0.0,"lap_number":1},{"session_time_s":110.0,"x":2.0,"y":0.0,"lap_number":1}]}}"#,
        r#"{"Telemetry":{"driver_number":63,"samples":[{"session_time_s":100.0,"x":5.0,"y":0.0,"lap_number":1},{"session_time_s":105.0,"x":6.0,"y":0.0,"lap_number":1}]}}"#,
    ]
    .join("\n");
    std::fs::write(&path, dataset).unwrap();

    let cache = FileCache::new(temp_dir.path().to_path_buf()).unwrap();
    assert_eq!(
        cache.list_available_sessions().unwrap(),
        vec![SessionKey::new(2024, "Spa", "R")]
    );

    let session = FileCache::load_file(&path).unwrap();
    assert_eq!(session.drivers[&63].team_name, "Unknown");
    let replay = SessionReplay::build(&session, &ReplayConfig::default()).unwrap();

    assert_eq!(replay.race_duration(), 10.);
    assert_eq!(replay.frame_count(), 101);
    // rotated a quarter turn
    let start = replay.trace(44).unwrap().points()[0];
    assert!(start.x.abs() < 1e-9 && (start.y - 1.).abs() < 1e-9);

    let at_start = replay.leaderboard_at(0.);
    assert_eq!(at_start[0].abbreviation, "RUS");
    assert_eq!(at_start[1].compound, Compound::Soft);

    // RUS disqualified once its telemetry ends
    let later = replay.leaderboard_at(8.);
    assert_eq!(later[0].abbreviation, "HAM");
    assert!(later[1].is_dnf);
}

#[test]
fn test_corrupt_dataset_reports_line() {
    let temp_dir = TempDir::new().unwrap();
    let cache = FileCache::new(temp_dir.path().to_path_buf()).unwrap();
    std::fs::write(
        cache.file_path_for(&key()),
        "{\"Event\":{\"key\":{\"year\":2025,\"location\":\"Monza\",\"session_type\":\"R\"},\"event_name\":\"x\"}}\nnot json\n",
    )
    .unwrap();

    let result = cache.load(&key());
    assert!(matches!(
        result,
        Err(GridReplayError::SessionParseError { line: 2, .. })
    ));
}
