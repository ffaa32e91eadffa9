use std::collections::BTreeMap;

use crate::session::Session;

use super::track::DriverTrace;

/// Length of the last segment of a driver that has laps but no telemetry
const NO_TELEMETRY_TAIL_S: f64 = 200.0;

/// A driver's official classification for the duration of one lap
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct PositionSegment {
    /// Replay-relative seconds, half-open `[start_time, end_time)`
    pub start_time: f64,
    pub end_time: f64,
    pub position: u32,
    pub lap_number: u32,
}

/// Per-driver classification over replay time, built from lap start timestamps
#[derive(Clone, Debug, Default, PartialEq)]
pub struct PositionTimeline {
    segments: BTreeMap<u32, Vec<PositionSegment>>,
}

impl PositionTimeline {
    /// `traces` must already be replay-relative.
    pub fn build(
        session: &Session,
        traces: &BTreeMap<u32, DriverTrace>,
        global_start: f64,
        default_slot: u32,
    ) -> Self {
        let mut segments = BTreeMap::new();

        for driver_number in session.driver_numbers() {
            let timed = session
                .driver_laps(driver_number)
                .filter_map(|lap| {
                    lap.lap_start_s
                        .filter(|t| t.is_finite())
                        .map(|start| (start - global_start, lap))
                })
                .collect::<Vec<_>>();

            if timed.is_empty() {
                let grid = session
                    .results
                    .get(&driver_number)
                    .and_then(|r| r.grid_position)
                    .filter(|p| *p > 0)
                    .unwrap_or(default_slot);
                segments.insert(
                    driver_number,
                    vec![PositionSegment {
                        start_time: 0.,
                        end_time: 1.,
                        position: grid,
                        lap_number: 0,
                    }],
                );
                continue;
            }

            let last_end = match traces.get(&driver_number) {
                Some(trace) => trace.last_time(),
                None => timed[timed.len() - 1].0 + NO_TELEMETRY_TAIL_S,
            };

            let driver_segments = timed
                .iter()
                .enumerate()
                .filter_map(|(i, (start_time, lap))| {
                    let end_time = timed.get(i + 1).map(|(next, _)| *next).unwrap_or(last_end);
                    lap.position.map(|position| PositionSegment {
                        start_time: *start_time,
                        end_time,
                        position,
                        lap_number: lap.lap_number,
                    })
                })
                .collect();
            segments.insert(driver_number, driver_segments);
        }

        Self { segments }
    }

    pub fn segments(&self, driver_number: u32) -> &[PositionSegment] {
        self.segments
            .get(&driver_number)
            .map(Vec::as_slice)
            .unwrap_or_default()
    }

    /// Classification of a driver at replay time `t`.
    ///
    /// `None` before the first segment and for unknown drivers; the last segment's
    /// position once the driver's timeline has ended.
    pub fn position_at(&self, driver_number: u32, t: f64) -> Option<u32> {
        let segments = self.segments(driver_number);
        let index = segments.partition_point(|s| s.start_time <= t);
        if index == 0 {
            return None;
        }
        Some(segments[index - 1].position)
    }
}
