use std::collections::BTreeMap;

use serde::Serialize;

use super::lap_timeline::LapTimeline;
use super::track::{DriverTrace, WorldPoint};

/// Guards the frame count against `duration / interval` landing just under an integer
const FRAME_COUNT_EPSILON: f64 = 1e-9;

#[derive(Clone, Copy, Debug, PartialEq, Serialize)]
pub struct DriverFrame {
    pub driver_number: u32,
    pub position: WorldPoint,
    pub lap: u32,
    /// False once the driver's telemetry has ended (retired or finished)
    pub active: bool,
}

/// Snapshot of every car at one instant of the replay
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct Frame {
    /// Replay-relative seconds
    pub time: f64,
    /// Leader lap
    pub lap: u32,
    /// Ordered by driver number
    pub drivers: Vec<DriverFrame>,
}

impl Frame {
    pub fn driver(&self, driver_number: u32) -> Option<&DriverFrame> {
        self.drivers
            .iter()
            .find(|d| d.driver_number == driver_number)
    }
}

/// Number of frames covering `[0, duration]` at `interval`, both ends included
pub fn frame_count(duration: f64, interval: f64) -> usize {
    if !(duration >= 0.) || !(interval > 0.) {
        return 0;
    }
    (duration / interval + FRAME_COUNT_EPSILON).floor() as usize + 1
}

/// Walks one trace forward as frame times increase
struct TraceCursor<'a> {
    trace: &'a DriverTrace,
    next: usize,
}

impl<'a> TraceCursor<'a> {
    fn new(trace: &'a DriverTrace) -> Self {
        Self { trace, next: 0 }
    }

    fn sample(&mut self, t: f64) -> DriverFrame {
        let timestamps = self.trace.timestamps();
        let points = self.trace.points();
        let laps = self.trace.laps();

        while self.next < timestamps.len() && timestamps[self.next] < t {
            self.next += 1;
        }

        let (position, lap, active) = if self.next == 0 {
            (points[0], laps[0], true)
        } else if self.next >= timestamps.len() {
            // exactly on the last sample still counts as covered
            let active = t <= self.trace.last_time();
            (self.trace.last_point(), self.trace.last_lap(), active)
        } else {
            let i = self.next;
            let (t0, t1) = (timestamps[i - 1], timestamps[i]);
            let fraction = (t - t0) / (t1 - t0);
            (points[i - 1].lerp(points[i], fraction), laps[i - 1], true)
        };

        DriverFrame {
            driver_number: self.trace.driver_number,
            position,
            lap,
            active,
        }
    }
}

/// Resample replay-relative traces onto `t = k * interval` for `k` in `0..frame_count`.
///
/// Drivers are interpolated piecewise-linearly, held at their first sample before their
/// trace starts and frozen (inactive) at their last sample once it ends.
pub fn build_frames(
    traces: &BTreeMap<u32, DriverTrace>,
    duration: f64,
    interval: f64,
    lap_timeline: &LapTimeline,
) -> Vec<Frame> {
    if traces.is_empty() {
        return Vec::new();
    }

    let mut cursors = traces.values().map(TraceCursor::new).collect::<Vec<_>>();
    (0..frame_count(duration, interval))
        .map(|k| {
            let time = k as f64 * interval;
            Frame {
                time,
                lap: lap_timeline.lap_for_time(time),
                drivers: cursors.iter_mut().map(|c| c.sample(time)).collect(),
            }
        })
        .collect()
}
