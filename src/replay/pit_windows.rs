use std::collections::BTreeMap;

use log::debug;

use crate::session::Session;

/// Seconds a car is assumed to spend in the pit lane when no pit-out time was recorded
pub const DEFAULT_PIT_DURATION_S: f64 = 25.0;

/// Interval a driver spends in the pit lane, replay-relative and inclusive at both ends
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct PitWindow {
    pub start_time: f64,
    pub end_time: f64,
}

impl PitWindow {
    pub fn contains(&self, t: f64) -> bool {
        self.start_time <= t && t <= self.end_time
    }

    pub fn duration(&self) -> f64 {
        self.end_time - self.start_time
    }
}

/// One window per pit-in event.
///
/// The window closes at the pit-out time recorded on the following lap when that time is
/// after the pit-in, otherwise `fallback_duration_s` after the pit-in.
pub fn build_pit_windows(
    session: &Session,
    global_start: f64,
    fallback_duration_s: f64,
) -> BTreeMap<u32, Vec<PitWindow>> {
    let mut windows: BTreeMap<u32, Vec<PitWindow>> = BTreeMap::new();

    for driver_number in session.driver_numbers() {
        let laps = session.driver_laps(driver_number).collect::<Vec<_>>();
        let driver_windows = windows.entry(driver_number).or_default();

        for lap in &laps {
            let Some(pit_in) = lap.pit_in_s.filter(|t| t.is_finite()) else {
                continue;
            };
            let start_time = pit_in - global_start;

            let pit_out = laps
                .iter()
                .find(|next| next.lap_number == lap.lap_number + 1)
                .and_then(|next| next.pit_out_s)
                .filter(|t| t.is_finite())
                .map(|t| t - global_start)
                .filter(|end| *end > start_time);

            driver_windows.push(PitWindow {
                start_time,
                end_time: pit_out.unwrap_or(start_time + fallback_duration_s),
            });
        }
    }

    debug!(
        "Total pit stops found in session: {}",
        windows.values().map(Vec::len).sum::<usize>()
    );
    windows
}
