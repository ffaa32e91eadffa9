// Driver traces and track outline in the shared, rotated world frame

use std::collections::BTreeMap;

use itertools::Itertools;
use log::{debug, info, warn};
use serde::{Deserialize, Serialize};

use crate::errors::GridReplayError;
use crate::session::{Session, TelemetrySample};

/// A point in the rotated world frame
#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct WorldPoint {
    pub x: f64,
    pub y: f64,
}

impl WorldPoint {
    pub fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }

    /// Standard counter-clockwise 2D rotation by `angle_rad`
    pub fn rotated(self, angle_rad: f64) -> Self {
        let (sin, cos) = angle_rad.sin_cos();
        Self {
            x: self.x * cos - self.y * sin,
            y: self.x * sin + self.y * cos,
        }
    }

    /// Linear interpolation towards `other` by `t` in [0, 1]
    pub fn lerp(self, other: Self, t: f64) -> Self {
        Self {
            x: self.x + (other.x - self.x) * t,
            y: self.y + (other.y - self.y) * t,
        }
    }
}

/// Position trace of one driver.
///
/// Timestamps are strictly increasing. They are session-absolute when built and become
/// replay-relative once the replay shifts every trace by the global start.
#[derive(Clone, Debug, PartialEq)]
pub struct DriverTrace {
    pub driver_number: u32,
    timestamps: Vec<f64>,
    points: Vec<WorldPoint>,
    laps: Vec<u32>,
}

impl DriverTrace {
    /// Clean and rotate raw telemetry.
    ///
    /// Samples are sorted by time; non-finite samples and samples that do not advance
    /// the clock are dropped. Fails when nothing usable remains.
    pub fn from_samples(
        driver_number: u32,
        samples: &[TelemetrySample],
        rotation_rad: f64,
    ) -> Result<Self, GridReplayError> {
        let usable = samples
            .iter()
            .filter(|s| s.session_time_s.is_finite() && s.x.is_finite() && s.y.is_finite())
            .sorted_by(|a, b| a.session_time_s.total_cmp(&b.session_time_s))
            .collect::<Vec<_>>();

        let mut trace = Self {
            driver_number,
            timestamps: Vec::with_capacity(usable.len()),
            points: Vec::with_capacity(usable.len()),
            laps: Vec::with_capacity(usable.len()),
        };
        for sample in usable {
            if trace
                .timestamps
                .last()
                .is_some_and(|last| sample.session_time_s <= *last)
            {
                continue;
            }
            trace.timestamps.push(sample.session_time_s);
            trace
                .points
                .push(WorldPoint::new(sample.x, sample.y).rotated(rotation_rad));
            trace.laps.push(sample.lap_number);
        }

        if trace.timestamps.is_empty() {
            return Err(GridReplayError::InvalidTelemetry {
                driver_number,
                reason: format!("none of {} samples are usable", samples.len()),
            });
        }
        let dropped = samples.len() - trace.timestamps.len();
        if dropped > 0 {
            debug!(
                "Driver {}: dropped {} malformed or duplicate samples",
                driver_number, dropped
            );
        }
        Ok(trace)
    }

    pub fn len(&self) -> usize {
        self.timestamps.len()
    }

    pub fn is_empty(&self) -> bool {
        self.timestamps.is_empty()
    }

    pub fn timestamps(&self) -> &[f64] {
        &self.timestamps
    }

    pub fn points(&self) -> &[WorldPoint] {
        &self.points
    }

    pub fn laps(&self) -> &[u32] {
        &self.laps
    }

    pub fn first_time(&self) -> f64 {
        self.timestamps[0]
    }

    pub fn last_time(&self) -> f64 {
        self.timestamps[self.timestamps.len() - 1]
    }

    pub fn last_point(&self) -> WorldPoint {
        self.points[self.points.len() - 1]
    }

    pub fn last_lap(&self) -> u32 {
        self.laps[self.laps.len() - 1]
    }

    /// Shift every timestamp by `-offset`
    pub(crate) fn shift(&mut self, offset: f64) {
        for t in self.timestamps.iter_mut() {
            *t -= offset;
        }
    }

    /// Index of the first sample at or after `t` (`len()` when `t` is past the end)
    pub fn lower_bound(&self, t: f64) -> usize {
        self.timestamps.partition_point(|ts| *ts < t)
    }

    /// Piecewise-linear position at `t`, clamped to the first and last samples
    pub fn position_at(&self, t: f64) -> WorldPoint {
        let index = self.lower_bound(t);
        if index == 0 {
            return self.points[0];
        }
        if index >= self.len() {
            return self.last_point();
        }
        let (t0, t1) = (self.timestamps[index - 1], self.timestamps[index]);
        let fraction = (t - t0) / (t1 - t0);
        self.points[index - 1].lerp(self.points[index], fraction)
    }
}

/// Build a trace for every driver with laps and usable telemetry.
///
/// Drivers without laps or telemetry are skipped silently; drivers whose telemetry
/// cannot be used are logged and skipped.
pub fn build_driver_traces(session: &Session) -> BTreeMap<u32, DriverTrace> {
    let rotation = session.circuit.rotation_rad();
    let mut traces = BTreeMap::new();

    for driver_number in session.driver_numbers() {
        let abbreviation = &session.drivers[&driver_number].abbreviation;
        if session.driver_laps(driver_number).next().is_none() {
            debug!("Skipping {}: no lap data", abbreviation);
            continue;
        }
        let samples = match session.telemetry.get(&driver_number) {
            Some(samples) if !samples.is_empty() => samples,
            _ => {
                debug!("Skipping {}: no telemetry", abbreviation);
                continue;
            }
        };

        match DriverTrace::from_samples(driver_number, samples, rotation) {
            Ok(trace) => {
                traces.insert(driver_number, trace);
            }
            Err(e) => warn!("Skipping {}: {}", abbreviation, e),
        }
    }

    info!("Loaded {} drivers", traces.len());
    traces
}

/// Track outline from the telemetry of the fastest lap of the session
pub fn build_track_outline(session: &Session) -> Vec<WorldPoint> {
    let Some(fastest) = session.fastest_lap() else {
        warn!("No timed laps in {}, track outline unavailable", session.key);
        return Vec::new();
    };

    let rotation = session.circuit.rotation_rad();
    let outline = session
        .telemetry
        .get(&fastest.driver_number)
        .into_iter()
        .flatten()
        .filter(|s| {
            s.lap_number == fastest.lap_number
                && s.session_time_s.is_finite()
                && s.x.is_finite()
                && s.y.is_finite()
        })
        .sorted_by(|a, b| a.session_time_s.total_cmp(&b.session_time_s))
        .map(|s| WorldPoint::new(s.x, s.y).rotated(rotation))
        .collect::<Vec<_>>();

    if outline.len() < 2 {
        warn!(
            "Fastest lap {} of driver {} has no telemetry, track outline unavailable",
            fastest.lap_number, fastest.driver_number
        );
        return Vec::new();
    }
    info!("Track loaded: {} points", outline.len());
    outline
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::session::{CircuitInfo, LapRecord, SessionKey, SessionRecord, TelemetryChunk};
    use std::f64::consts::FRAC_PI_2;

    fn sample(t: f64, x: f64, y: f64, lap: u32) -> TelemetrySample {
        TelemetrySample {
            session_time_s: t,
            x,
            y,
            lap_number: lap,
        }
    }

    fn assert_close(a: WorldPoint, b: WorldPoint) {
        assert!(
            (a.x - b.x).abs() < 1e-9 && (a.y - b.y).abs() < 1e-9,
            "{:?} != {:?}",
            a,
            b
        );
    }

    #[test]
    fn test_rotation() {
        assert_close(
            WorldPoint::new(1., 0.).rotated(FRAC_PI_2),
            WorldPoint::new(0., 1.),
        );
        assert_close(
            WorldPoint::new(2., 3.).rotated(0.),
            WorldPoint::new(2., 3.),
        );
    }

    #[test]
    fn test_trace_cleaning() {
        let samples = vec![
            sample(2., 20., 0., 1),
            sample(1., 10., 0., 1),
            sample(2., 99., 99., 1),
            sample(f64::NAN, 0., 0., 1),
            sample(3., f64::INFINITY, 0., 1),
            sample(4., 40., 0., 2),
        ];
        let trace = DriverTrace::from_samples(7, &samples, 0.).unwrap();
        assert_eq!(trace.timestamps(), &[1., 2., 4.]);
        assert_eq!(trace.laps(), &[1, 1, 2]);
        assert_eq!(trace.last_lap(), 2);
        assert!(trace.timestamps().windows(2).all(|w| w[0] < w[1]));
    }

    #[test]
    fn test_trace_without_usable_samples() {
        let result = DriverTrace::from_samples(7, &[sample(f64::NAN, 0., 0., 1)], 0.);
        assert!(matches!(
            result,
            Err(GridReplayError::InvalidTelemetry { driver_number: 7, .. })
        ));
    }

    #[test]
    fn test_position_interpolation_and_clamping() {
        let samples = vec![sample(10., 0., 0., 1), sample(20., 100., 50., 1)];
        let trace = DriverTrace::from_samples(1, &samples, 0.).unwrap();

        assert_close(trace.position_at(5.), WorldPoint::new(0., 0.));
        assert_close(trace.position_at(15.), WorldPoint::new(50., 25.));
        assert_close(trace.position_at(20.), WorldPoint::new(100., 50.));
        assert_close(trace.position_at(25.), WorldPoint::new(100., 50.));
    }

    fn session_with(records: Vec<SessionRecord>) -> Session {
        Session::from_records(SessionKey::new(2025, "Monza", "R"), records).unwrap()
    }

    #[test]
    fn test_build_driver_traces_skips_unusable_drivers() {
        let session = session_with(vec![
            SessionRecord::Circuit(CircuitInfo { rotation_deg: 90. }),
            SessionRecord::Lap(LapRecord::new(1, 1)),
            SessionRecord::Lap(LapRecord::new(2, 1)),
            SessionRecord::Lap(LapRecord::new(3, 1)),
            SessionRecord::Telemetry(TelemetryChunk {
                driver_number: 1,
                samples: vec![sample(0., 1., 0., 1), sample(1., 2., 0., 1)],
            }),
            // no laps for driver 4
            SessionRecord::Telemetry(TelemetryChunk {
                driver_number: 4,
                samples: vec![sample(0., 1., 0., 1)],
            }),
            SessionRecord::Telemetry(TelemetryChunk {
                driver_number: 3,
                samples: vec![sample(f64::NAN, 1., 0., 1)],
            }),
        ]);

        let traces = build_driver_traces(&session);
        assert_eq!(traces.keys().copied().collect::<Vec<_>>(), vec![1]);
        assert_close(traces[&1].points()[0], WorldPoint::new(0., 1.));
    }

    #[test]
    fn test_track_outline_from_fastest_lap() {
        let mut slow = LapRecord::new(1, 1);
        slow.lap_time_s = Some(90.);
        let mut fast = LapRecord::new(1, 2);
        fast.lap_time_s = Some(80.);
        let session = session_with(vec![
            SessionRecord::Lap(slow),
            SessionRecord::Lap(fast),
            SessionRecord::Telemetry(TelemetryChunk {
                driver_number: 1,
                samples: vec![
                    sample(0., 0., 0., 1),
                    sample(95., 5., 5., 2),
                    sample(90., 1., 1., 2),
                    sample(100., 9., 9., 2),
                ],
            }),
        ]);

        let outline = build_track_outline(&session);
        assert_eq!(
            outline,
            vec![
                WorldPoint::new(1., 1.),
                WorldPoint::new(5., 5.),
                WorldPoint::new(9., 9.)
            ]
        );
    }

    #[test]
    fn test_track_outline_without_lap_times() {
        let session = session_with(vec![SessionRecord::Lap(LapRecord::new(1, 1))]);
        assert!(build_track_outline(&session).is_empty());
    }
}
