use egui::{Color32, Frame, Key, Margin, RichText, Vec2b};
use egui_plot::{Line, PlotPoint, PlotPoints, Points, Text};

use crate::{
    playback::{Playback, PlaybackCommand},
    replay::{SessionReplay, frames::Frame as ReplayFrame},
};

use super::{INACTIVE_GREY, PALETTE_ORANGE, leaderboard::LeaderboardPanel, team_colour};

const CAR_RADIUS: f32 = 5.;
const LABEL_OFFSET: f64 = 120.;

/// Keys understood by the replay screen
fn key_commands(input: &egui::InputState) -> Vec<PlaybackCommand> {
    [
        (Key::Space, PlaybackCommand::TogglePause),
        (Key::ArrowRight, PlaybackCommand::SkipForward),
        (Key::ArrowLeft, PlaybackCommand::SkipBackward),
        (Key::ArrowUp, PlaybackCommand::Faster),
        (Key::ArrowDown, PlaybackCommand::Slower),
    ]
    .into_iter()
    .filter(|(key, _)| input.key_pressed(*key))
    .map(|(_, command)| command)
    .collect()
}

fn format_race_time(t: f64) -> String {
    let total = t.max(0.) as u64;
    format!("{:02}:{:02}:{:02}", total / 3600, (total / 60) % 60, total % 60)
}

/// A loaded replay with its playback state
pub(crate) struct ReplayScreen {
    replay: SessionReplay,
    playback: Playback,
    leaderboard: LeaderboardPanel,
}

impl ReplayScreen {
    pub(crate) fn new(replay: SessionReplay, speed: f64, leaderboard: LeaderboardPanel) -> Self {
        let playback = Playback::new(replay.frame_count(), replay.frame_interval(), speed);
        Self {
            replay,
            playback,
            leaderboard,
        }
    }

    pub(crate) fn playback_speed(&self) -> f64 {
        self.playback.speed()
    }

    /// Draw one UI frame. Returns true when the user asked to quit.
    pub(crate) fn show(&mut self, ctx: &egui::Context) -> bool {
        let (commands, quit, dt) = ctx.input(|i| {
            (
                key_commands(i),
                i.key_pressed(Key::Escape),
                i.stable_dt as f64,
            )
        });
        for command in commands {
            self.playback.apply(command);
        }
        self.playback.advance(dt);

        let Some(frame) = self.replay.frame_at(self.playback.frame_index()) else {
            egui::CentralPanel::default().show(ctx, |ui| {
                ui.centered_and_justified(|ui| {
                    ui.label(
                        RichText::new(format!("No telemetry to replay for {}", self.replay.event_name()))
                            .color(PALETTE_ORANGE),
                    );
                });
            });
            return quit;
        };
        let standings = self.replay.debounced_leaderboard_at(frame.time);

        egui::SidePanel::left("Leaderboard")
            .frame(Frame::default().inner_margin(Margin::same(8)))
            .resizable(false)
            .min_width(180.)
            .show(ctx, |ui| self.leaderboard.show(ui, &standings));

        egui::TopBottomPanel::bottom("PlaybackControls")
            .frame(Frame::default().inner_margin(Margin::same(6)))
            .show(ctx, |ui| {
                ui.horizontal(|ui| {
                    ui.label(RichText::new(self.replay.event_name()).color(Color32::WHITE).strong());
                    ui.separator();
                    ui.label(
                        RichText::new(format!(
                            "Lap {}/{}",
                            frame.lap,
                            self.replay.total_laps()
                        ))
                        .color(Color32::WHITE),
                    );
                    ui.label(RichText::new(format_race_time(frame.time)).color(Color32::WHITE));
                    ui.separator();
                    ui.label(
                        RichText::new(format!("Speed {}x", self.playback.speed()))
                            .color(Color32::WHITE),
                    );
                    if self.playback.is_paused() {
                        ui.label(RichText::new("PAUSED").color(PALETTE_ORANGE).strong());
                    }
                });

                let mut index = self.playback.frame_index();
                let last = self.replay.frame_count().saturating_sub(1);
                ui.spacing_mut().slider_width = ui.available_width() - 20.;
                if ui
                    .add(egui::Slider::new(&mut index, 0..=last).show_value(false))
                    .changed()
                {
                    self.playback.seek_frame(index);
                }
            });

        egui::CentralPanel::default().show(ctx, |ui| self.show_track(ui, frame));

        if !self.playback.is_paused() {
            ctx.request_repaint();
        }
        quit
    }

    fn show_track(&self, ui: &mut egui::Ui, frame: &ReplayFrame) {
        egui_plot::Plot::new("track_map")
            .data_aspect(1.)
            .show_axes(false)
            .show_grid(false)
            .show_background(false)
            .show_x(false)
            .show_y(false)
            .allow_drag(Vec2b::new(true, true))
            .show(ui, |plot_ui| {
                let outline = self.replay.track_outline();
                if !outline.is_empty() {
                    plot_ui.line(
                        Line::new(
                            "Track",
                            PlotPoints::new(outline.iter().map(|p| [p.x, p.y]).collect()),
                        )
                        .color(INACTIVE_GREY)
                        .width(6.),
                    );
                }

                for car in &frame.drivers {
                    let (abbreviation, colour) = match self.replay.driver(car.driver_number) {
                        Some(driver) => (driver.abbreviation.as_str(), team_colour(&driver.team_colour)),
                        None => ("?", Color32::WHITE),
                    };
                    let colour = if car.active { colour } else { INACTIVE_GREY };

                    plot_ui.points(
                        Points::new(
                            abbreviation,
                            PlotPoints::new(vec![[car.position.x, car.position.y]]),
                        )
                        .color(colour)
                        .radius(CAR_RADIUS),
                    );
                    plot_ui.text(
                        Text::new(
                            abbreviation,
                            PlotPoint::new(car.position.x, car.position.y + LABEL_OFFSET),
                            RichText::new(abbreviation).color(colour).small(),
                        ),
                    );
                }
            });
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_race_time_format() {
        assert_eq!(format_race_time(0.), "00:00:00");
        assert_eq!(format_race_time(3725.9), "01:02:05");
        assert_eq!(format_race_time(-4.), "00:00:00");
    }
}
