use std::collections::HashMap;
use std::path::PathBuf;

use egui::{Color32, Image, RichText, Ui, Vec2};
use log::debug;

use crate::{replay::classification::Standing, session::Compound};

use super::{INACTIVE_GREY, PALETTE_ORANGE, team_colour};

const ICON_SIZE: f32 = 16.;

/// Icon image file for a compound, `None` for compounds drawn as text
pub(crate) fn icon_file_name(compound: Compound) -> Option<&'static str> {
    match compound {
        Compound::Soft => Some("softs.png"),
        Compound::Medium => Some("mediums.png"),
        Compound::Hard => Some("hards.png"),
        Compound::Intermediate => Some("intermediates.png"),
        Compound::Wet => Some("wets.png"),
        Compound::Unknown => None,
    }
}

/// Lazily resolved compound icons. Lookups that found no file are cached too.
pub(crate) struct CompoundIconCache {
    icon_dir: PathBuf,
    icons: HashMap<Compound, Option<String>>,
}

impl CompoundIconCache {
    pub(crate) fn new(icon_dir: PathBuf) -> Self {
        Self {
            icon_dir,
            icons: HashMap::new(),
        }
    }

    /// Image URI of the icon for `compound`
    pub(crate) fn icon_uri(&mut self, compound: Compound) -> Option<String> {
        let icon_dir = &self.icon_dir;
        self.icons
            .entry(compound)
            .or_insert_with(|| {
                let path = icon_dir.join(icon_file_name(compound)?);
                if !path.is_file() {
                    debug!("No icon for {} at {:?}", compound, path);
                    return None;
                }
                Some(format!("file://{}", path.display()))
            })
            .clone()
    }

    pub(crate) fn resolved_count(&self) -> usize {
        self.icons.len()
    }
}

pub(crate) struct LeaderboardPanel {
    icons: CompoundIconCache,
}

impl LeaderboardPanel {
    pub(crate) fn new(icon_dir: PathBuf) -> Self {
        Self {
            icons: CompoundIconCache::new(icon_dir),
        }
    }

    pub(crate) fn show(&mut self, ui: &mut Ui, standings: &[Standing]) {
        ui.heading(RichText::new("Leaderboard").color(Color32::WHITE));
        ui.separator();

        egui::Grid::new("leaderboard")
            .num_columns(4)
            .spacing([8., 4.])
            .show(ui, |ui| {
                for standing in standings {
                    let text_colour = if standing.is_dnf {
                        INACTIVE_GREY
                    } else {
                        Color32::WHITE
                    };
                    let abbreviation_colour = if standing.is_dnf {
                        INACTIVE_GREY
                    } else {
                        team_colour(&standing.team_colour)
                    };

                    ui.label(RichText::new(format!("{:>2}.", standing.rank)).color(text_colour));
                    ui.label(
                        RichText::new(&standing.abbreviation)
                            .color(abbreviation_colour)
                            .strong(),
                    );

                    if standing.is_dnf {
                        ui.label(RichText::new("DNF").color(INACTIVE_GREY));
                    } else if let Some(uri) = self.icons.icon_uri(standing.compound) {
                        ui.add(Image::new(uri).fit_to_exact_size(Vec2::splat(ICON_SIZE)));
                    } else {
                        ui.label(RichText::new(standing.compound.label()).color(text_colour).small());
                    }

                    if standing.is_pitting {
                        ui.label(RichText::new("PIT").color(PALETTE_ORANGE).strong());
                    } else {
                        ui.label("");
                    }
                    ui.end_row();
                }
            });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_icons_resolved_lazily() {
        let dir = TempDir::new().unwrap();
        std::fs::write(dir.path().join("softs.png"), b"png").unwrap();
        let mut cache = CompoundIconCache::new(dir.path().to_path_buf());
        assert_eq!(cache.resolved_count(), 0);

        let uri = cache.icon_uri(Compound::Soft).unwrap();
        assert!(uri.starts_with("file://"));
        assert!(uri.ends_with("softs.png"));
        assert_eq!(cache.resolved_count(), 1);

        // cached: removing the file does not change the answer
        std::fs::remove_file(dir.path().join("softs.png")).unwrap();
        assert_eq!(cache.icon_uri(Compound::Soft), Some(uri));
        assert_eq!(cache.resolved_count(), 1);
    }

    #[test]
    fn test_missing_icons_cached_as_none() {
        let dir = TempDir::new().unwrap();
        let mut cache = CompoundIconCache::new(dir.path().to_path_buf());

        assert_eq!(cache.icon_uri(Compound::Hard), None);
        std::fs::write(dir.path().join("hards.png"), b"png").unwrap();
        assert_eq!(cache.icon_uri(Compound::Hard), None);
        assert_eq!(cache.icon_uri(Compound::Unknown), None);
        assert_eq!(cache.resolved_count(), 2);
    }

    #[test]
    fn test_icon_file_names() {
        assert_eq!(icon_file_name(Compound::Intermediate), Some("intermediates.png"));
        assert_eq!(icon_file_name(Compound::Wet), Some("wets.png"));
        assert_eq!(icon_file_name(Compound::Unknown), None);
    }
}
