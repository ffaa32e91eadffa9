pub(crate) mod leaderboard;
pub(crate) mod menu;
pub(crate) mod replay_view;

use std::path::PathBuf;

use egui::{Color32, RichText, Visuals, style::Widgets};
use log::{error, info};

use crate::{
    GridReplayError,
    config::ReplayConfig,
    replay::SessionReplay,
    session::{FileCache, SessionKey, SessionSource, parse_hex_colour},
};

use leaderboard::LeaderboardPanel;
use menu::{MenuAction, MenuForm};
use replay_view::ReplayScreen;

pub(crate) const PALETTE_BLACK: Color32 = Color32::from_rgb(12, 12, 12);
pub(crate) const PALETTE_BROWN: Color32 = Color32::from_rgb(72, 30, 20);
pub(crate) const PALETTE_MAROON: Color32 = Color32::from_rgb(155, 57, 34);
pub(crate) const PALETTE_ORANGE: Color32 = Color32::from_rgb(242, 97, 63);
pub(crate) const INACTIVE_GREY: Color32 = Color32::from_rgb(110, 110, 110);

/// Team colour from a hex string, white when it cannot be parsed
pub(crate) fn team_colour(hex: &str) -> Color32 {
    let [r, g, b] = parse_hex_colour(hex).unwrap_or([255, 255, 255]);
    Color32::from_rgb(r, g, b)
}

pub(crate) enum UiState {
    Menu(MenuForm),
    Loading { key: SessionKey },
    Error { message: String },
    Replay(Box<ReplayScreen>),
}

/// Window application: the session menu and the replay of the selected session
pub struct GridReplayApp {
    ui_state: UiState,
    source: Box<dyn SessionSource>,
    config: ReplayConfig,
    icon_dir: PathBuf,
}

impl GridReplayApp {
    pub fn new(
        source: Box<dyn SessionSource>,
        config: ReplayConfig,
        initial: Option<SessionReplay>,
        icon_dir: PathBuf,
        cc: &eframe::CreationContext<'_>,
    ) -> Self {
        egui_extras::install_image_loaders(&cc.egui_ctx);
        cc.egui_ctx.set_visuals(Visuals {
            dark_mode: true,
            hyperlink_color: PALETTE_MAROON,
            faint_bg_color: PALETTE_BLACK,
            extreme_bg_color: PALETTE_BROWN,
            panel_fill: PALETTE_BLACK,
            button_frame: true,
            widgets: Widgets::dark(),
            striped: false,
            ..Default::default()
        });

        let ui_state = match initial {
            Some(replay) => UiState::Replay(Box::new(ReplayScreen::new(
                replay,
                config.playback_speed,
                LeaderboardPanel::new(icon_dir.clone()),
            ))),
            None => UiState::Menu(MenuForm::new(&*source)),
        };
        Self {
            ui_state,
            source,
            config,
            icon_dir,
        }
    }

    fn load(&mut self, key: &SessionKey) -> Result<ReplayScreen, GridReplayError> {
        let session = self.source.load(key)?;
        let replay = SessionReplay::build(&session, &self.config)?;
        Ok(ReplayScreen::new(
            replay,
            self.config.playback_speed,
            LeaderboardPanel::new(self.icon_dir.clone()),
        ))
    }

    fn load_file(&mut self, path: &std::path::Path) -> Result<ReplayScreen, GridReplayError> {
        let session = FileCache::load_file(path)?;
        let replay = SessionReplay::build(&session, &self.config)?;
        Ok(ReplayScreen::new(
            replay,
            self.config.playback_speed,
            LeaderboardPanel::new(self.icon_dir.clone()),
        ))
    }

    fn show_error(&mut self, ctx: &egui::Context, message: &str) {
        let mut back = false;
        egui::CentralPanel::default().show(ctx, |ui| {
            ui.vertical_centered(|ui| {
                ui.add_space(40.);
                ui.label(RichText::new(message).color(PALETTE_ORANGE).size(16.));
                ui.add_space(10.);
                back = ui.button("Back to menu").clicked();
            });
        });
        if back {
            self.ui_state = UiState::Menu(MenuForm::new(&*self.source));
        }
    }
}

impl eframe::App for GridReplayApp {
    fn on_exit(&mut self, _gl: Option<&eframe::glow::Context>) {
        if let UiState::Replay(screen) = &self.ui_state {
            self.config.playback_speed = screen.playback_speed();
        }
        if let Err(e) = self.config.save() {
            error!("Error while saving config file: {}", e);
        }
    }

    fn update(&mut self, ctx: &egui::Context, _frame: &mut eframe::Frame) {
        match &mut self.ui_state {
            UiState::Menu(form) => {
                let action = egui::CentralPanel::default()
                    .show(ctx, |ui| form.show(ui))
                    .inner;
                match action {
                    MenuAction::None => {}
                    MenuAction::Load(key) => self.ui_state = UiState::Loading { key },
                    MenuAction::OpenFile(path) => {
                        info!("Loading session file {:?}", path);
                        self.ui_state = match self.load_file(&path) {
                            Ok(screen) => UiState::Replay(Box::new(screen)),
                            Err(e) => UiState::Error {
                                message: format!("Could not load {:?}: {}", path, e),
                            },
                        };
                    }
                }
            }
            UiState::Loading { key } => {
                let key = key.clone();
                egui::CentralPanel::default().show(ctx, |ui| {
                    ui.centered_and_justified(|ui| {
                        ui.label(RichText::new(format!("Loading {}...", key)).color(Color32::WHITE));
                    });
                });
                self.ui_state = match self.load(&key) {
                    Ok(screen) => UiState::Replay(Box::new(screen)),
                    Err(e) => UiState::Error {
                        message: format!("Could not load {}: {}", key, e),
                    },
                };
                ctx.request_repaint();
            }
            UiState::Error { message } => {
                let message = message.clone();
                self.show_error(ctx, &message);
            }
            UiState::Replay(screen) => {
                if screen.show(ctx) {
                    ctx.send_viewport_cmd(egui::ViewportCommand::Close);
                }
            }
        }
    }
}

/// Open the viewer window, on `initial` when given and on the session menu otherwise.
/// Blocks until the window is closed.
pub fn run_viewer(
    source: Box<dyn SessionSource>,
    config: ReplayConfig,
    initial: Option<SessionReplay>,
    icon_dir: PathBuf,
) -> Result<(), GridReplayError> {
    let mut native_options = eframe::NativeOptions::default();
    native_options.viewport = native_options
        .viewport
        .with_inner_size(egui::Vec2::new(1280., 800.))
        .with_title("gridreplay");

    eframe::run_native(
        "gridreplay",
        native_options,
        Box::new(move |cc| {
            Ok(Box::new(GridReplayApp::new(
                source, config, initial, icon_dir, cc,
            )))
        }),
    )
    .map_err(|e| GridReplayError::ViewerError {
        reason: e.to_string(),
    })
}
