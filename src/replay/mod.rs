// Replay engine: everything derived from a loaded session, built once and queried per frame

pub mod classification;
pub mod frames;
pub mod lap_timeline;
pub mod pit_windows;
pub mod position_timeline;
pub mod track;

use std::collections::BTreeMap;
use std::sync::{Mutex, PoisonError};

use log::{info, warn};

use crate::config::ReplayConfig;
use crate::errors::GridReplayError;
use crate::session::{DriverInfo, Session, SessionKey};

use classification::{ClassificationResolver, LeaderboardSnapshot, Standing};
use frames::{Frame, build_frames};
use lap_timeline::LapTimeline;
use pit_windows::{PitWindow, build_pit_windows};
use position_timeline::PositionTimeline;
use track::{DriverTrace, WorldPoint, build_driver_traces, build_track_outline};

/// A fully built replay of one session.
///
/// Every time argument is replay-relative: 0 is the earliest telemetry sample of any driver
/// and [`SessionReplay::race_duration`] the latest. Queries outside that range are clamped.
#[derive(Debug)]
pub struct SessionReplay {
    key: SessionKey,
    event_name: String,
    drivers: BTreeMap<u32, DriverInfo>,
    traces: BTreeMap<u32, DriverTrace>,
    track_outline: Vec<WorldPoint>,
    frames: Vec<Frame>,
    frame_interval: f64,
    race_duration: f64,
    lap_timeline: LapTimeline,
    pit_windows: BTreeMap<u32, Vec<PitWindow>>,
    position_timeline: PositionTimeline,
    classification: ClassificationResolver,
    debounce_window: f64,
    last_leaderboard: Mutex<Option<LeaderboardSnapshot>>,
}

impl SessionReplay {
    pub fn build(session: &Session, config: &ReplayConfig) -> Result<Self, GridReplayError> {
        config.validate()?;
        info!("Loading {}", session.key);

        let mut traces = build_driver_traces(session);
        let global_start = traces
            .values()
            .map(DriverTrace::first_time)
            .min_by(f64::total_cmp)
            .unwrap_or_default();
        let global_end = traces
            .values()
            .map(DriverTrace::last_time)
            .max_by(f64::total_cmp)
            .unwrap_or(global_start);
        traces
            .values_mut()
            .for_each(|trace| trace.shift(global_start));
        let race_duration = global_end - global_start;

        if traces.is_empty() {
            warn!("No driver telemetry in {}, replay will be empty", session.key);
        }

        let lap_timeline = LapTimeline::build(session, global_start, race_duration);
        let frames = build_frames(
            &traces,
            race_duration,
            config.frame_interval_s,
            &lap_timeline,
        );
        info!("Generated {} frames", frames.len());

        let classification = ClassificationResolver::new(session);
        let position_timeline = PositionTimeline::build(
            session,
            &traces,
            global_start,
            classification.default_slot(),
        );

        Ok(Self {
            key: session.key.clone(),
            event_name: session.event_name.clone(),
            drivers: session.drivers.clone(),
            track_outline: build_track_outline(session),
            pit_windows: build_pit_windows(session, global_start, config.pit_fallback_duration_s),
            traces,
            frames,
            frame_interval: config.frame_interval_s,
            race_duration,
            lap_timeline,
            position_timeline,
            classification,
            debounce_window: config.debounce_window_s,
            last_leaderboard: Mutex::new(None),
        })
    }

    pub fn session_key(&self) -> &SessionKey {
        &self.key
    }

    pub fn event_name(&self) -> &str {
        &self.event_name
    }

    pub fn frame_count(&self) -> usize {
        self.frames.len()
    }

    pub fn frame_interval(&self) -> f64 {
        self.frame_interval
    }

    pub fn race_duration(&self) -> f64 {
        self.race_duration
    }

    pub fn total_laps(&self) -> u32 {
        self.lap_timeline.last_lap()
    }

    fn clamp_time(&self, t: f64) -> f64 {
        if t.is_nan() {
            return 0.;
        }
        t.clamp(0., self.race_duration)
    }

    /// Frame at `index`, clamped to the last frame. `None` only when there are no frames.
    pub fn frame_at(&self, index: usize) -> Option<&Frame> {
        let last = self.frames.len().checked_sub(1)?;
        self.frames.get(index.min(last))
    }

    /// Index of the frame shown at replay time `t`
    pub fn frame_index_at(&self, t: f64) -> usize {
        let t = self.clamp_time(t);
        let index = (t / self.frame_interval + 1e-9).floor() as usize;
        index.min(self.frames.len().saturating_sub(1))
    }

    pub fn frame_at_time(&self, t: f64) -> Option<&Frame> {
        self.frame_at(self.frame_index_at(t))
    }

    /// Leaderboard at replay time `t`, always computed fresh
    pub fn leaderboard_at(&self, t: f64) -> Vec<Standing> {
        self.classification
            .leaderboard_at(self.clamp_time(t), &self.traces, &self.pit_windows)
    }

    /// Leaderboard at `t`, reusing the last computed standings while `t` stays within the
    /// debounce window of the time they were computed for and the rank order is unchanged.
    pub fn debounced_leaderboard_at(&self, t: f64) -> Vec<Standing> {
        let t = self.clamp_time(t);
        let order = self.classification.order_at(t, &self.traces);
        let mut cached = self
            .last_leaderboard
            .lock()
            .unwrap_or_else(PoisonError::into_inner);

        if let Some(snapshot) = cached.as_ref()
            && (t - snapshot.computed_at).abs() <= self.debounce_window
            && snapshot.order == order
        {
            return snapshot.standings.clone();
        }

        let standings = self.leaderboard_at(t);
        *cached = Some(LeaderboardSnapshot {
            computed_at: t,
            standings: standings.clone(),
            order,
        });
        standings
    }

    pub fn last_leaderboard(&self) -> Option<LeaderboardSnapshot> {
        self.last_leaderboard
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    pub fn lap_for_time(&self, t: f64) -> u32 {
        self.lap_timeline.lap_for_time(self.clamp_time(t))
    }

    pub fn lap_timeline(&self) -> &LapTimeline {
        &self.lap_timeline
    }

    /// Official classification of a driver at `t`, from lap-start timestamps
    pub fn position_at(&self, driver_number: u32, t: f64) -> Option<u32> {
        self.position_timeline
            .position_at(driver_number, self.clamp_time(t))
    }

    pub fn pit_windows(&self, driver_number: u32) -> &[PitWindow] {
        self.pit_windows
            .get(&driver_number)
            .map(Vec::as_slice)
            .unwrap_or_default()
    }

    pub fn trace(&self, driver_number: u32) -> Option<&DriverTrace> {
        self.traces.get(&driver_number)
    }

    pub fn driver(&self, driver_number: u32) -> Option<&DriverInfo> {
        self.drivers.get(&driver_number)
    }

    pub fn track_outline(&self) -> &[WorldPoint] {
        &self.track_outline
    }
}
