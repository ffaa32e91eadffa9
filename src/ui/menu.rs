use std::path::PathBuf;

use egui::{Color32, Layout, RichText, Ui};
use egui_dropdown::DropDownBox;
use log::warn;

use crate::{
    GridReplayError,
    session::{SessionKey, SessionSource},
};

use super::PALETTE_ORANGE;

pub(crate) enum MenuAction {
    None,
    Load(SessionKey),
    OpenFile(PathBuf),
}

/// Session selection form shown before a replay is loaded
pub(crate) struct MenuForm {
    location: String,
    year: String,
    session_type: String,
    selected_cached: String,
    cached: Vec<SessionKey>,
    error: Option<String>,
}

impl MenuForm {
    pub(crate) fn new(source: &dyn SessionSource) -> Self {
        let cached = source.available_sessions().unwrap_or_else(|e| {
            warn!("Could not list cached sessions: {}", e);
            Vec::new()
        });
        Self {
            location: String::new(),
            year: String::new(),
            session_type: "R".to_string(),
            selected_cached: String::new(),
            cached,
            error: None,
        }
    }

    /// Session key typed in the form
    pub(crate) fn session_key(&self) -> Result<SessionKey, GridReplayError> {
        let year = self
            .year
            .trim()
            .parse::<u32>()
            .map_err(|_| GridReplayError::InvalidUserInput {
                field: "year".to_string(),
                reason: "Year must be a number!".to_string(),
            })?;
        if self.location.trim().is_empty() {
            return Err(GridReplayError::InvalidUserInput {
                field: "location".to_string(),
                reason: "Location is required".to_string(),
            });
        }
        if self.session_type.trim().is_empty() {
            return Err(GridReplayError::InvalidUserInput {
                field: "session".to_string(),
                reason: "Session type is required".to_string(),
            });
        }
        Ok(SessionKey::new(
            year,
            self.location.trim(),
            self.session_type.trim(),
        ))
    }

    /// Copy a cached session picked from the dropdown into the text fields
    fn apply_cached_selection(&mut self) {
        if let Some(key) = self
            .cached
            .iter()
            .find(|k| k.to_string() == self.selected_cached)
        {
            self.location = key.location.clone();
            self.year = key.year.to_string();
            self.session_type = key.session_type.clone();
        }
    }

    pub(crate) fn show(&mut self, ui: &mut Ui) -> MenuAction {
        let mut action = MenuAction::None;

        ui.vertical_centered(|ui| {
            ui.add_space(30.);
            ui.heading(RichText::new("Select a session").color(Color32::WHITE));
            ui.add_space(20.);

            egui::Grid::new("session_form")
                .num_columns(2)
                .spacing([10., 8.])
                .show(ui, |ui| {
                    ui.label(RichText::new("Location: ").color(Color32::WHITE));
                    ui.text_edit_singleline(&mut self.location);
                    ui.end_row();

                    ui.label(RichText::new("Year: ").color(Color32::WHITE));
                    ui.text_edit_singleline(&mut self.year);
                    ui.end_row();

                    ui.label(RichText::new("Session: ").color(Color32::WHITE));
                    ui.text_edit_singleline(&mut self.session_type);
                    ui.end_row();

                    if !self.cached.is_empty() {
                        ui.label(RichText::new("Cached: ").color(Color32::WHITE));
                        let previous = self.selected_cached.clone();
                        ui.add(
                            DropDownBox::from_iter(
                                self.cached.iter().map(|k| k.to_string()),
                                "cached_sessions_dropbox",
                                &mut self.selected_cached,
                                |ui, text| ui.selectable_label(false, text),
                            )
                            .filter_by_input(false),
                        );
                        if previous != self.selected_cached {
                            self.apply_cached_selection();
                        }
                        ui.end_row();
                    }
                });

            ui.add_space(15.);
            ui.with_layout(Layout::top_down(egui::Align::Center), |ui| {
                if ui.button("▶ Start replay").clicked() {
                    match self.session_key() {
                        Ok(key) => {
                            self.error = None;
                            action = MenuAction::Load(key);
                        }
                        Err(GridReplayError::InvalidUserInput { reason, .. }) => {
                            self.error = Some(reason)
                        }
                        Err(e) => self.error = Some(e.to_string()),
                    }
                }
                if ui.button("📂 Open session file").clicked()
                    && let Some(path) = rfd::FileDialog::new()
                        .add_filter("session dataset", &["jsonl"])
                        .pick_file()
                {
                    action = MenuAction::OpenFile(path);
                }
            });

            if let Some(error) = &self.error {
                ui.add_space(10.);
                ui.label(RichText::new(error).color(PALETTE_ORANGE));
            }
        });

        action
    }
}
