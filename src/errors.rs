// Error types for gridreplay

use snafu::Snafu;
use std::io;

#[derive(Debug, Snafu)]
pub enum GridReplayError {
    // Errors while loading a session from its source
    #[snafu(display("Session {session} is not available from the data source"))]
    SessionNotFound { session: String },
    #[snafu(display("Unable to load session {session}: {reason}"))]
    SessionLoadError { session: String, reason: String },
    #[snafu(display("Invalid record in session {session} at line {line}"))]
    SessionParseError {
        session: String,
        line: usize,
        source: io::Error,
    },
    #[snafu(display("Session {session} has no usable data: {reason}"))]
    EmptySession { session: String, reason: String },
    #[snafu(display("Unusable telemetry for driver {driver_number}: {reason}"))]
    InvalidTelemetry { driver_number: u32, reason: String },

    // Errors for the session cache
    #[snafu(display("Could not find a cache directory for session datasets"))]
    NoCacheDir,
    #[snafu(display("Session cache I/O error: {operation}"))]
    CacheIOError {
        operation: String,
        source: io::Error,
    },

    // Config management errors
    #[snafu(display("Could not find application data directory to save config file"))]
    NoConfigDir,
    #[snafu(display("Error reading or writing config file"))]
    ConfigIOError { source: io::Error },
    #[snafu(display("Error serializing config file"))]
    ConfigSerializeError { source: serde_json::Error },
    #[snafu(display("Invalid configuration: {field} - {reason}"))]
    InvalidConfig { field: String, reason: String },

    // User input validation errors
    #[snafu(display("Invalid user input: {field} - {reason}"))]
    InvalidUserInput { field: String, reason: String },

    // UI errors
    #[snafu(display("Could not start the replay viewer: {reason}"))]
    ViewerError { reason: String },
}
