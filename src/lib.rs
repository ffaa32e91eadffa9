// Library interface for gridreplay
// The binary and integration tests both go through these modules

pub mod config;
pub mod errors;
pub mod playback;
pub mod replay;
pub mod session;
pub mod ui;
mod writer;

// Re-export commonly used types
pub use config::ReplayConfig;
pub use errors::GridReplayError;
pub use playback::{Playback, PlaybackCommand};
pub use replay::SessionReplay;
pub use replay::classification::{LeaderboardSnapshot, RankKey, Standing};
pub use replay::frames::{DriverFrame, Frame};
pub use session::{
    CachedSource, Compound, FileCache, InMemorySource, Session, SessionKey, SessionSource,
};
