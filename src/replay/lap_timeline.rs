use itertools::Itertools;
use log::{debug, warn};

use crate::session::{LapRecord, Session};

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct LapTimelineEntry {
    /// Replay-relative seconds
    pub start_time: f64,
    pub end_time: f64,
    pub lap_number: u32,
}

/// Maps replay time to the lap the race leader is on.
///
/// Entries are contiguous and ordered: each lap ends where the next one starts and the
/// last lap ends at the latest telemetry timestamp of the session.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct LapTimeline {
    entries: Vec<LapTimelineEntry>,
}

impl LapTimeline {
    /// Build from the lap-start timestamps of whoever led each lap.
    ///
    /// When no lap was led by anyone (no position data), the laps of the lowest-numbered
    /// driver with lap-start timestamps are used instead.
    pub fn build(session: &Session, global_start: f64, session_end: f64) -> Self {
        let timed = session
            .laps
            .iter()
            .filter(|lap| lap.lap_start_s.is_some_and(f64::is_finite))
            .collect::<Vec<_>>();

        let mut source_laps = timed
            .iter()
            .filter(|lap| lap.position == Some(1))
            .copied()
            .collect::<Vec<&LapRecord>>();
        if source_laps.is_empty() {
            let Some(fallback) = timed.first().map(|lap| lap.driver_number) else {
                warn!("No lap start times in {}, lap counter unavailable", session.key);
                return Self::default();
            };
            debug!("No leader laps found, using laps of driver {}", fallback);
            source_laps = timed
                .iter()
                .filter(|lap| lap.driver_number == fallback)
                .copied()
                .collect();
        }

        // start times strictly increase with lap number
        let mut starts: Vec<(f64, u32)> = Vec::new();
        for lap in source_laps
            .into_iter()
            .sorted_by_key(|lap| lap.lap_number)
            .dedup_by(|a, b| a.lap_number == b.lap_number)
        {
            let start_time = lap.lap_start_s.unwrap_or_default() - global_start;
            if let Some((previous_start, previous_lap)) = starts.last()
                && start_time <= *previous_start
            {
                debug!(
                    "Dropping lap {} of driver {}: starts at {:.3}s, not after lap {}",
                    lap.lap_number, lap.driver_number, start_time, previous_lap
                );
                continue;
            }
            starts.push((start_time, lap.lap_number));
        }

        let entries = starts
            .iter()
            .enumerate()
            .map(|(i, (start_time, lap_number))| {
                let end_time = match starts.get(i + 1) {
                    Some((next_start, _)) => *next_start,
                    None => session_end.max(*start_time),
                };
                LapTimelineEntry {
                    start_time: *start_time,
                    end_time,
                    lap_number: *lap_number,
                }
            })
            .collect();

        Self { entries }
    }

    pub fn entries(&self) -> &[LapTimelineEntry] {
        &self.entries
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Lap the leader is on at replay time `t`.
    ///
    /// Clamps to the first lap before the timeline starts and to the last lap after it
    /// ends; 0 when no lap data exists.
    pub fn lap_for_time(&self, t: f64) -> u32 {
        let Some(first) = self.entries.first() else {
            return 0;
        };
        let index = self.entries.partition_point(|entry| entry.start_time <= t);
        if index == 0 {
            return first.lap_number;
        }
        self.entries[index - 1].lap_number
    }

    pub fn last_lap(&self) -> u32 {
        self.entries.last().map(|e| e.lap_number).unwrap_or(0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::replay::fixtures::{SessionFixture, lap, three_car_race};
    use proptest::prelude::*;

    #[test]
    fn test_leader_timeline() {
        let session = three_car_race();
        let timeline = LapTimeline::build(&session, 100., 300.);

        assert_eq!(
            timeline.entries(),
            &[
                LapTimelineEntry {
                    start_time: 0.,
                    end_time: 100.,
                    lap_number: 1
                },
                LapTimelineEntry {
                    start_time: 100.,
                    end_time: 200.,
                    lap_number: 2
                },
                LapTimelineEntry {
                    start_time: 200.,
                    end_time: 300.,
                    lap_number: 3
                },
            ]
        );
    }

    #[test]
    fn test_lap_for_time_boundaries() {
        let timeline = LapTimeline::build(&three_car_race(), 100., 300.);

        assert_eq!(timeline.lap_for_time(0.), 1);
        assert_eq!(timeline.lap_for_time(99.9), 1);
        assert_eq!(timeline.lap_for_time(100.), 2);
        assert_eq!(timeline.lap_for_time(250.), 3);
        assert_eq!(timeline.lap_for_time(300.), 3);
        assert_eq!(timeline.lap_for_time(10_000.), 3);
        assert_eq!(timeline.lap_for_time(-5.), 1);
        assert_eq!(timeline.last_lap(), 3);
    }

    #[test]
    fn test_fallback_without_leader_rows() {
        let session = SessionFixture::new()
            .lap(lap(44, 2, None, Some(160.)))
            .lap(lap(44, 1, None, Some(60.)))
            .lap(lap(63, 1, None, Some(61.)))
            .lap(lap(63, 2, None, Some(170.)))
            .lap(lap(63, 3, None, Some(280.)))
            .build();
        let timeline = LapTimeline::build(&session, 50., 400.);

        // driver 44 has the lowest number with lap start times
        assert_eq!(timeline.entries().len(), 2);
        assert_eq!(timeline.entries()[0].start_time, 10.);
        assert_eq!(timeline.entries()[1].end_time, 400.);
    }

    #[test]
    fn test_empty_timeline() {
        let session = SessionFixture::new().lap(lap(1, 1, Some(1), None)).build();
        let timeline = LapTimeline::build(&session, 0., 100.);
        assert!(timeline.is_empty());
        assert_eq!(timeline.lap_for_time(50.), 0);
    }

    #[test]
    fn test_out_of_order_leader_laps_are_dropped() {
        // lap 3 led by a driver whose start time lies before lap 2
        let session = SessionFixture::new()
            .lap(lap(1, 1, Some(1), Some(0.)))
            .lap(lap(1, 2, Some(1), Some(100.)))
            .lap(lap(2, 3, Some(1), Some(90.)))
            .lap(lap(1, 4, Some(1), Some(300.)))
            .build();
        let timeline = LapTimeline::build(&session, 0., 400.);

        assert_eq!(
            timeline
                .entries()
                .iter()
                .map(|e| (e.lap_number, e.start_time, e.end_time))
                .collect::<Vec<_>>(),
            vec![(1, 0., 100.), (2, 100., 300.), (4, 300., 400.)]
        );
        assert_eq!(timeline.lap_for_time(95.), 1);
        assert_eq!(timeline.lap_for_time(250.), 2);
        assert_eq!(timeline.lap_for_time(350.), 4);
    }

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(100))]

        #[test]
        fn prop_lap_for_time_is_monotonic(
            lap_lengths in proptest::collection::vec(60.0f64..120.0, 1..30),
            mut query_times in proptest::collection::vec(-100.0f64..5000.0, 2..50),
        ) {
            let mut fixture = SessionFixture::new();
            let mut start = 1000.;
            for (i, length) in lap_lengths.iter().enumerate() {
                fixture = fixture.lap(lap(1, i as u32 + 1, Some(1), Some(start)));
                start += length;
            }
            let session = fixture.build();
            let timeline = LapTimeline::build(&session, 1000., start - 1000.);

            query_times.sort_by(f64::total_cmp);
            let laps = query_times.iter().map(|t| timeline.lap_for_time(*t)).collect::<Vec<_>>();
            prop_assert!(laps.windows(2).all(|w| w[0] <= w[1]));
            prop_assert_eq!(timeline.lap_for_time(1e9), lap_lengths.len() as u32);
        }
    }
}
