// Point-in-time leaderboard: reconciles lap classification, grid, results and pit timing

use std::collections::BTreeMap;

use serde::Serialize;

use crate::session::{Compound, DriverInfo, ResultRecord, Session};

use super::pit_windows::PitWindow;
use super::track::DriverTrace;

/// Offset pushing retired drivers below every running driver
const DNF_SORT_OFFSET: u64 = 2000;

/// Final status of a driver as reported in the session results
#[derive(Clone, Debug, PartialEq)]
pub struct DriverStatus {
    pub status: String,
    pub is_dnf: bool,
    pub grid_position: Option<u32>,
    pub final_position: Option<u32>,
}

impl DriverStatus {
    pub fn from_result(result: &ResultRecord) -> Self {
        Self {
            status: result.status.clone(),
            is_dnf: Self::is_dnf_status(&result.status),
            grid_position: result.grid_position,
            final_position: result.position,
        }
    }

    /// Anything other than "Finished" or a lapped finish ("+1 Lap") is a DNF
    pub fn is_dnf_status(status: &str) -> bool {
        !status.trim().eq_ignore_ascii_case("finished") && !status.contains('+')
    }
}

/// Tyre compound per driver and lap
#[derive(Clone, Debug, Default, PartialEq)]
pub struct CompoundMap {
    compounds: BTreeMap<(u32, u32), Compound>,
}

impl CompoundMap {
    pub fn from_session(session: &Session) -> Self {
        let compounds = session
            .laps
            .iter()
            .map(|lap| {
                let compound = lap
                    .compound
                    .as_deref()
                    .map(Compound::from_label)
                    .unwrap_or_default();
                ((lap.driver_number, lap.lap_number), compound)
            })
            .collect();
        Self { compounds }
    }

    pub fn get(&self, driver_number: u32, lap_number: u32) -> Compound {
        self.compounds
            .get(&(driver_number, lap_number))
            .copied()
            .unwrap_or_default()
    }
}

/// One leaderboard row
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct Standing {
    pub rank: u32,
    pub driver_number: u32,
    pub abbreviation: String,
    pub team: String,
    pub team_colour: String,
    pub lap: u32,
    pub compound: Compound,
    pub is_dnf: bool,
    pub is_pitting: bool,
}

/// Driver number and sort key of one leaderboard row, in rank order
pub type RankKey = (u32, u64);

/// Standings computed for one replay time
#[derive(Clone, Debug, PartialEq)]
pub struct LeaderboardSnapshot {
    pub computed_at: f64,
    pub standings: Vec<Standing>,
    /// Ordering the standings were ranked by
    pub order: Vec<RankKey>,
}

/// Lap a driver is on at replay time `t`: 0 before their telemetry starts, their last
/// recorded lap after it ends
fn lap_at(trace: &DriverTrace, t: f64) -> u32 {
    if t < trace.first_time() {
        return 0;
    }
    if t > trace.last_time() {
        return trace.last_lap();
    }
    trace.laps()[trace.lower_bound(t)]
}

struct Placement {
    sort_key: u64,
    lap: u32,
    show_dnf: bool,
}

#[derive(Clone, Debug)]
pub struct ClassificationResolver {
    drivers: BTreeMap<u32, DriverInfo>,
    statuses: BTreeMap<u32, DriverStatus>,
    /// Official classification at the end of (driver, lap)
    lap_positions: BTreeMap<(u32, u32), u32>,
    compounds: CompoundMap,
    default_slot: u32,
}

impl ClassificationResolver {
    pub fn new(session: &Session) -> Self {
        let statuses = session
            .results
            .iter()
            .map(|(driver_number, result)| (*driver_number, DriverStatus::from_result(result)))
            .collect::<BTreeMap<_, _>>();
        let lap_positions = session
            .laps
            .iter()
            .filter_map(|lap| {
                lap.position
                    .map(|position| ((lap.driver_number, lap.lap_number), position))
            })
            .collect();

        Self {
            drivers: session.drivers.clone(),
            default_slot: statuses.len() as u32 + 1,
            statuses,
            lap_positions,
            compounds: CompoundMap::from_session(session),
        }
    }

    /// Position used for drivers with no usable classification: one past the field
    pub fn default_slot(&self) -> u32 {
        self.default_slot
    }

    pub fn status(&self, driver_number: u32) -> Option<&DriverStatus> {
        self.statuses.get(&driver_number)
    }

    pub fn compounds(&self) -> &CompoundMap {
        &self.compounds
    }

    fn grid_or_default(&self, status: &DriverStatus) -> u32 {
        status
            .grid_position
            .filter(|p| *p > 0)
            .unwrap_or(self.default_slot)
    }

    fn placement(
        &self,
        driver_number: u32,
        status: &DriverStatus,
        trace: &DriverTrace,
        t: f64,
    ) -> Placement {
        let lap = lap_at(trace, t);
        let past_end = t > trace.last_time();

        let display_position = if past_end {
            status.final_position.unwrap_or(self.default_slot)
        } else if lap <= 1 {
            self.grid_or_default(status)
        } else {
            self.lap_positions
                .get(&(driver_number, lap - 1))
                .copied()
                .unwrap_or_else(|| self.grid_or_default(status))
        };

        let show_dnf = status.is_dnf && past_end;
        let sort_key = if show_dnf {
            DNF_SORT_OFFSET + u64::from(display_position)
        } else {
            u64::from(display_position)
        };
        Placement {
            sort_key,
            lap,
            show_dnf,
        }
    }

    /// Rank order at replay time `t` without building the rows
    pub fn order_at(&self, t: f64, traces: &BTreeMap<u32, DriverTrace>) -> Vec<RankKey> {
        let mut order = self
            .statuses
            .iter()
            .filter_map(|(driver_number, status)| {
                let trace = traces.get(driver_number)?;
                let placement = self.placement(*driver_number, status, trace, t);
                Some((*driver_number, placement.sort_key))
            })
            .collect::<Vec<_>>();
        order.sort_by_key(|(_, sort_key)| *sort_key);
        order
    }

    /// Leaderboard at replay time `t`.
    ///
    /// Ranks are always `1..=N` over the drivers that have both a result record and a
    /// trace. Retired drivers keep their last known place once their telemetry ends but
    /// sort after every running or finished driver.
    pub fn leaderboard_at(
        &self,
        t: f64,
        traces: &BTreeMap<u32, DriverTrace>,
        pit_windows: &BTreeMap<u32, Vec<PitWindow>>,
    ) -> Vec<Standing> {
        let mut rows = self
            .statuses
            .iter()
            .filter_map(|(driver_number, status)| {
                let trace = traces.get(driver_number)?;
                let placement = self.placement(*driver_number, status, trace, t);

                let is_pitting = pit_windows
                    .get(driver_number)
                    .is_some_and(|windows| windows.iter().any(|w| w.contains(t)));
                let driver = self.drivers.get(driver_number);

                let standing = Standing {
                    rank: 0,
                    driver_number: *driver_number,
                    abbreviation: driver
                        .map(|d| d.abbreviation.clone())
                        .unwrap_or_else(|| driver_number.to_string()),
                    team: driver.map(|d| d.team_name.clone()).unwrap_or_default(),
                    team_colour: driver.map(|d| d.team_colour.clone()).unwrap_or_default(),
                    lap: placement.lap,
                    compound: self.compounds.get(*driver_number, placement.lap),
                    is_dnf: placement.show_dnf,
                    is_pitting,
                };
                Some((placement.sort_key, standing))
            })
            .collect::<Vec<_>>();

        // statuses iterate in driver order, so the stable sort breaks ties by number
        rows.sort_by_key(|(sort_key, _)| *sort_key);
        rows.into_iter()
            .enumerate()
            .map(|(i, (_, standing))| Standing {
                rank: i as u32 + 1,
                ..standing
            })
            .collect()
    }
}
