// Playback state of the viewer: where the cursor is, how fast it moves

pub const MIN_SPEED: f64 = 0.25;
pub const MAX_SPEED: f64 = 64.0;
/// Frames jumped by a single skip
pub const SKIP_FRAMES: i64 = 10;

/// User input understood by the playback controller
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum PlaybackCommand {
    TogglePause,
    SkipForward,
    SkipBackward,
    Faster,
    Slower,
}

#[derive(Clone, Debug, PartialEq)]
pub struct Playback {
    /// Fractional frame index
    cursor: f64,
    frame_count: usize,
    frame_interval: f64,
    paused: bool,
    speed: f64,
}

impl Playback {
    pub fn new(frame_count: usize, frame_interval: f64, speed: f64) -> Self {
        Self {
            cursor: 0.,
            frame_count,
            frame_interval,
            paused: false,
            speed: speed.clamp(MIN_SPEED, MAX_SPEED),
        }
    }

    fn last_frame(&self) -> f64 {
        self.frame_count.saturating_sub(1) as f64
    }

    pub fn frame_index(&self) -> usize {
        (self.cursor + 1e-9).floor() as usize
    }

    /// Replay time of the current cursor position
    pub fn time(&self) -> f64 {
        self.frame_index() as f64 * self.frame_interval
    }

    pub fn is_paused(&self) -> bool {
        self.paused
    }

    pub fn speed(&self) -> f64 {
        self.speed
    }

    pub fn is_finished(&self) -> bool {
        self.cursor >= self.last_frame()
    }

    /// Move forward by `dt` seconds of wall-clock time. Pauses on the last frame.
    pub fn advance(&mut self, dt: f64) {
        if self.paused || !(dt > 0.) {
            return;
        }
        self.cursor += dt * self.speed / self.frame_interval;
        if self.cursor >= self.last_frame() {
            self.cursor = self.last_frame();
            self.paused = true;
        }
    }

    pub fn apply(&mut self, command: PlaybackCommand) {
        match command {
            PlaybackCommand::TogglePause => self.toggle_pause(),
            PlaybackCommand::SkipForward => self.skip(SKIP_FRAMES),
            PlaybackCommand::SkipBackward => self.skip(-SKIP_FRAMES),
            PlaybackCommand::Faster => self.faster(),
            PlaybackCommand::Slower => self.slower(),
        }
    }

    pub fn toggle_pause(&mut self) {
        self.paused = !self.paused;
    }

    pub fn skip(&mut self, frames: i64) {
        self.cursor = (self.cursor + frames as f64).clamp(0., self.last_frame());
    }

    pub fn faster(&mut self) {
        self.speed = (self.speed * 2.).min(MAX_SPEED);
    }

    pub fn slower(&mut self) {
        self.speed = (self.speed / 2.).max(MIN_SPEED);
    }

    pub fn seek_frame(&mut self, index: usize) {
        self.cursor = (index as f64).min(self.last_frame());
    }

    pub fn seek_time(&mut self, t: f64) {
        if t.is_nan() {
            return;
        }
        self.cursor = (t / self.frame_interval).clamp(0., self.last_frame());
    }
}
