// Session data model: the typed, cleaned tables loaded from a session data source

pub mod cache;
pub mod source;

use std::collections::BTreeMap;
use std::fmt::Display;

use log::debug;
use serde::{Deserialize, Serialize};

use crate::errors::GridReplayError;

pub use cache::FileCache;
pub use source::{CachedSource, InMemorySource, SessionSource};

/// Identifies one recorded session, e.g. the 2025 Monza race.
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct SessionKey {
    pub year: u32,
    pub location: String,
    /// Session identifier as used by the data provider ("R", "Q", "FP1", ...)
    pub session_type: String,
}

impl SessionKey {
    pub fn new(year: u32, location: impl Into<String>, session_type: impl Into<String>) -> Self {
        Self {
            year,
            location: location.into(),
            session_type: session_type.into(),
        }
    }

    /// Filesystem-safe name used for cached datasets, e.g. `2025_monza_r`
    pub fn cache_name(&self) -> String {
        format!("{}_{}_{}", self.year, self.location, self.session_type)
            .to_lowercase()
            .chars()
            .map(|c| if c.is_alphanumeric() { c } else { '_' })
            .collect()
    }
}

impl Display for SessionKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} {} {}", self.location, self.year, self.session_type)
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct EventInfo {
    pub key: SessionKey,
    pub event_name: String,
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct CircuitInfo {
    /// Rotation that aligns the circuit-local telemetry with the canonical map
    /// orientation, in degrees as published by the provider.
    pub rotation_deg: f64,
}

impl CircuitInfo {
    pub fn rotation_rad(&self) -> f64 {
        self.rotation_deg.to_radians()
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct DriverInfo {
    pub driver_number: u32,
    pub abbreviation: String,
    #[serde(default = "unknown_team")]
    pub team_name: String,
    /// Hex RGB without the leading `#`
    #[serde(default = "white")]
    pub team_colour: String,
}

fn unknown_team() -> String {
    "Unknown".to_string()
}

fn white() -> String {
    "FFFFFF".to_string()
}

impl DriverInfo {
    /// Placeholder info for a driver that only shows up in laps, results or telemetry
    pub fn placeholder(driver_number: u32) -> Self {
        Self {
            driver_number,
            abbreviation: driver_number.to_string(),
            team_name: unknown_team(),
            team_colour: white(),
        }
    }

    /// Team colour as RGB, white when the hex string is malformed
    pub fn colour_rgb(&self) -> [u8; 3] {
        parse_hex_colour(&self.team_colour).unwrap_or([255, 255, 255])
    }
}

/// Parses `RRGGBB`, with or without a leading `#`
pub fn parse_hex_colour(hex: &str) -> Option<[u8; 3]> {
    let hex = hex.trim().trim_start_matches('#');
    if hex.len() != 6 || !hex.is_ascii() {
        return None;
    }
    let channel = |i: usize| u8::from_str_radix(&hex[i..i + 2], 16).ok();
    Some([channel(0)?, channel(2)?, channel(4)?])
}

/// One lap of one driver. All timestamps are session-absolute seconds.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct LapRecord {
    pub driver_number: u32,
    pub lap_number: u32,
    /// Official classification at the end of this lap
    #[serde(default)]
    pub position: Option<u32>,
    #[serde(default)]
    pub compound: Option<String>,
    #[serde(default)]
    pub lap_time_s: Option<f64>,
    #[serde(default)]
    pub lap_start_s: Option<f64>,
    #[serde(default)]
    pub pit_in_s: Option<f64>,
    #[serde(default)]
    pub pit_out_s: Option<f64>,
}

impl LapRecord {
    pub fn new(driver_number: u32, lap_number: u32) -> Self {
        Self {
            driver_number,
            lap_number,
            position: None,
            compound: None,
            lap_time_s: None,
            lap_start_s: None,
            pit_in_s: None,
            pit_out_s: None,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ResultRecord {
    pub driver_number: u32,
    /// Provider status text: "Finished", "+1 Lap", "Retired", "Accident", ...
    pub status: String,
    #[serde(default)]
    pub grid_position: Option<u32>,
    /// Final classification
    #[serde(default)]
    pub position: Option<u32>,
}

#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct TelemetrySample {
    pub session_time_s: f64,
    pub x: f64,
    pub y: f64,
    pub lap_number: u32,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct TelemetryChunk {
    pub driver_number: u32,
    pub samples: Vec<TelemetrySample>,
}

/// One line of a session dataset
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub enum SessionRecord {
    Event(EventInfo),
    Circuit(CircuitInfo),
    Driver(DriverInfo),
    Lap(LapRecord),
    Result(ResultRecord),
    Telemetry(TelemetryChunk),
}

/// Tyre compound label
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Compound {
    Soft,
    Medium,
    Hard,
    Intermediate,
    Wet,
    #[default]
    Unknown,
}

impl Compound {
    pub const ALL: [Compound; 6] = [
        Compound::Soft,
        Compound::Medium,
        Compound::Hard,
        Compound::Intermediate,
        Compound::Wet,
        Compound::Unknown,
    ];

    /// Parses a provider label, case-insensitively. Anything unrecognised is `Unknown`.
    pub fn from_label(label: &str) -> Self {
        match label.trim().to_uppercase().as_str() {
            "SOFT" => Compound::Soft,
            "MEDIUM" => Compound::Medium,
            "HARD" => Compound::Hard,
            "INTERMEDIATE" => Compound::Intermediate,
            "WET" => Compound::Wet,
            _ => Compound::Unknown,
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            Compound::Soft => "SOFT",
            Compound::Medium => "MEDIUM",
            Compound::Hard => "HARD",
            Compound::Intermediate => "INTERMEDIATE",
            Compound::Wet => "WET",
            Compound::Unknown => "UNKNOWN",
        }
    }
}

impl Display for Compound {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.label())
    }
}

/// Complete dataset for one session. Read-only once loaded.
#[derive(Clone, Debug, PartialEq)]
pub struct Session {
    pub key: SessionKey,
    pub event_name: String,
    pub circuit: CircuitInfo,
    pub drivers: BTreeMap<u32, DriverInfo>,
    /// Sorted by driver number, then lap number
    pub laps: Vec<LapRecord>,
    pub results: BTreeMap<u32, ResultRecord>,
    /// Raw telemetry in provider order; cleaning happens in the track builder
    pub telemetry: BTreeMap<u32, Vec<TelemetrySample>>,
}

impl Session {
    /// Assemble a session from dataset records.
    ///
    /// Drivers referenced by laps, results or telemetry without a `Driver` record get
    /// placeholder info. Duplicate (driver, lap) rows keep the first occurrence.
    pub fn from_records(
        key: SessionKey,
        records: impl IntoIterator<Item = SessionRecord>,
    ) -> Result<Self, GridReplayError> {
        let mut event_name = None;
        let mut circuit = CircuitInfo::default();
        let mut drivers = BTreeMap::new();
        let mut laps: BTreeMap<(u32, u32), LapRecord> = BTreeMap::new();
        let mut results = BTreeMap::new();
        let mut telemetry: BTreeMap<u32, Vec<TelemetrySample>> = BTreeMap::new();

        for record in records {
            match record {
                SessionRecord::Event(event) => event_name = Some(event.event_name),
                SessionRecord::Circuit(info) => circuit = info,
                SessionRecord::Driver(driver) => {
                    drivers.insert(driver.driver_number, driver);
                }
                SessionRecord::Lap(lap) => {
                    let lap_key = (lap.driver_number, lap.lap_number);
                    if laps.contains_key(&lap_key) {
                        debug!(
                            "Ignoring duplicate lap {} for driver {}",
                            lap.lap_number, lap.driver_number
                        );
                        continue;
                    }
                    laps.insert(lap_key, lap);
                }
                SessionRecord::Result(result) => {
                    results.insert(result.driver_number, result);
                }
                SessionRecord::Telemetry(chunk) => {
                    telemetry
                        .entry(chunk.driver_number)
                        .or_default()
                        .extend(chunk.samples);
                }
            }
        }

        if laps.is_empty() && results.is_empty() && telemetry.is_empty() {
            return Err(GridReplayError::EmptySession {
                session: key.to_string(),
                reason: "no laps, results or telemetry".to_string(),
            });
        }

        let referenced = laps
            .keys()
            .map(|(driver, _)| *driver)
            .chain(results.keys().copied())
            .chain(telemetry.keys().copied())
            .collect::<Vec<_>>();
        for driver_number in referenced {
            drivers
                .entry(driver_number)
                .or_insert_with(|| DriverInfo::placeholder(driver_number));
        }

        Ok(Self {
            event_name: event_name.unwrap_or_else(|| key.to_string()),
            key,
            circuit,
            drivers,
            laps: laps.into_values().collect(),
            results,
            telemetry,
        })
    }

    /// Flatten the session back into dataset records, in a stable order
    pub fn to_records(&self) -> Vec<SessionRecord> {
        let mut records = vec![
            SessionRecord::Event(EventInfo {
                key: self.key.clone(),
                event_name: self.event_name.clone(),
            }),
            SessionRecord::Circuit(self.circuit),
        ];
        records.extend(self.drivers.values().cloned().map(SessionRecord::Driver));
        records.extend(self.results.values().cloned().map(SessionRecord::Result));
        records.extend(self.laps.iter().cloned().map(SessionRecord::Lap));
        records.extend(self.telemetry.iter().map(|(driver_number, samples)| {
            SessionRecord::Telemetry(TelemetryChunk {
                driver_number: *driver_number,
                samples: samples.clone(),
            })
        }));
        records
    }

    /// Laps of a single driver in lap order
    pub fn driver_laps(&self, driver_number: u32) -> impl Iterator<Item = &LapRecord> {
        self.laps
            .iter()
            .filter(move |lap| lap.driver_number == driver_number)
    }

    pub fn driver_numbers(&self) -> Vec<u32> {
        self.drivers.keys().copied().collect()
    }

    /// Lap with the lowest recorded lap time across the field
    pub fn fastest_lap(&self) -> Option<&LapRecord> {
        self.laps
            .iter()
            .filter(|lap| lap.lap_time_s.is_some_and(|t| t.is_finite() && t > 0.))
            .min_by(|a, b| {
                a.lap_time_s
                    .unwrap_or(f64::INFINITY)
                    .total_cmp(&b.lap_time_s.unwrap_or(f64::INFINITY))
            })
    }
}
