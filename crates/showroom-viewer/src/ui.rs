//! Showroom panels.
//!
//! A browser bar lists every car with previous/next arrows and a button to
//! start or stop customizing. The paint panel, shown while a car is selected,
//! offers the catalog swatches, a free color picker, a color text field and a
//! texture file picker. Load failures show up in the browser bar with a retry
//! button.

use bevy::{prelude::*, tasks::IoTaskPool};
use bevy_egui::{EguiContexts, EguiPlugin, EguiPrimaryContextPass, egui};
use leafwing_input_manager::prelude::*;
use showroom::{EntityId, Rgb, TextureData};

use crate::{input::ShowroomAction, paint::decode_texture, session::ShowroomSession};

// ============================================================================
// Plugin
// ============================================================================

/// Plugin for the showroom panels.
pub struct ShowroomUiPlugin;

impl Plugin for ShowroomUiPlugin {
    fn build(&self, app: &mut App) {
        app.add_plugins(EguiPlugin::default())
            .init_resource::<UiVisible>()
            .init_resource::<PaintPanelVisible>()
            .init_resource::<PaintInputState>()
            .init_resource::<TexturePicker>()
            .add_systems(Update, (toggle_ui_visible, poll_texture_picker))
            .add_systems(
                EguiPrimaryContextPass,
                showroom_ui_system.run_if(|visible: Res<UiVisible>| visible.0),
            );
    }
}

/// Resource controlling whether the panels are visible.
#[derive(Resource)]
pub struct UiVisible(pub bool);

impl Default for UiVisible {
    fn default() -> Self {
        Self(true)
    }
}

/// Whether the paint panel is open. Set by the stage.
#[derive(Resource, Default)]
pub struct PaintPanelVisible(pub bool);

/// State of the paint inputs that outlives a frame.
#[derive(Resource)]
struct PaintInputState {
    custom: [u8; 3],
    color_text: String,
}

impl Default for PaintInputState {
    fn default() -> Self {
        Self {
            custom: [200, 200, 200],
            color_text: String::new(),
        }
    }
}

fn toggle_ui_visible(
    query: Query<&ActionState<ShowroomAction>>,
    mut visible: ResMut<UiVisible>,
) {
    let Ok(action_state) = query.single() else {
        return;
    };
    if action_state.just_pressed(&ShowroomAction::ToggleUi) {
        visible.0 = !visible.0;
    }
}

// ============================================================================
// Texture picker
// ============================================================================

/// File dialog for choosing a paint texture.
///
/// The dialog runs on the IO task pool; the chosen file's bytes come back over
/// a channel and are polled every frame.
#[derive(Resource)]
pub struct TexturePicker {
    is_open: bool,
    error: Option<String>,
    result_rx: async_channel::Receiver<Option<Vec<u8>>>,
    result_tx: async_channel::Sender<Option<Vec<u8>>>,
}

impl Default for TexturePicker {
    fn default() -> Self {
        let (result_tx, result_rx) = async_channel::bounded(1);
        Self {
            is_open: false,
            error: None,
            result_rx,
            result_tx,
        }
    }
}

impl TexturePicker {
    /// Open the file dialog unless it is already open.
    pub fn open(&mut self) {
        if self.is_open {
            return;
        }
        self.is_open = true;
        self.error = None;

        let tx = self.result_tx.clone();
        IoTaskPool::get()
            .spawn(async move {
                let file = rfd::AsyncFileDialog::new()
                    .set_title("Choose a paint texture")
                    .add_filter("Images", &["png", "jpg", "jpeg"])
                    .pick_file()
                    .await;
                let bytes = match file {
                    Some(file) => Some(file.read().await),
                    None => None,
                };
                let _ = tx.send(bytes).await;
            })
            .detach();
    }
}

/// Check that picked bytes decode as a paint texture.
fn check_texture(bytes: &[u8]) -> Result<(), String> {
    let texture = TextureData::new(bytes).map_err(|e| e.to_string())?;
    decode_texture(&texture).map(|_| ())
}

/// Hand picked texture bytes to the session if they decode.
fn poll_texture_picker(
    mut picker: ResMut<TexturePicker>,
    mut session: ResMut<ShowroomSession>,
) {
    while let Ok(result) = picker.result_rx.try_recv() {
        picker.is_open = false;
        let Some(bytes) = result else {
            continue;
        };
        if let Err(e) = check_texture(&bytes) {
            tracing::debug!("Rejected texture file: {e}");
            picker.error = Some(format!("Cannot use this file: {e}"));
            continue;
        }
        session.set_texture(bytes);
    }
}

// ============================================================================
// Panels
// ============================================================================

/// A request made from the panels, applied after drawing.
#[derive(Debug, Clone, PartialEq)]
enum UiAction {
    Prev,
    Next,
    JumpTo(usize),
    Select,
    Deselect,
    Retry(EntityId),
    SetRgb(Rgb),
    SetColor(String),
    PickTexture,
}

fn swatch_color(rgb: Rgb) -> egui::Color32 {
    egui::Color32::from_rgb(rgb.r, rgb.g, rgb.b)
}

/// Render the browser bar and paint panel.
fn showroom_ui_system(
    mut contexts: EguiContexts,
    mut session: ResMut<ShowroomSession>,
    paint_panel: Res<PaintPanelVisible>,
    mut inputs: ResMut<PaintInputState>,
    mut picker: ResMut<TexturePicker>,
) -> Result {
    let ctx = contexts.ctx_mut()?;
    let mut actions = Vec::new();

    let viewer = session.viewer();
    let viewed = viewer.viewed_index();
    let viewed_entity = viewer.viewed();

    egui::Window::new("Showroom")
        .title_bar(false)
        .resizable(false)
        .anchor(egui::Align2::CENTER_BOTTOM, [0.0, -16.0])
        .show(ctx, |ui| {
            ui.horizontal(|ui| {
                if ui.add_enabled(viewer.can_prev(), egui::Button::new("<")).clicked() {
                    actions.push(UiAction::Prev);
                }
                for (index, entity) in viewer.registry().iter().enumerate() {
                    if ui
                        .selectable_label(index == viewed, entity.display_name.as_str())
                        .clicked()
                    {
                        actions.push(UiAction::JumpTo(index));
                    }
                }
                if ui.add_enabled(viewer.can_next(), egui::Button::new(">")).clicked() {
                    actions.push(UiAction::Next);
                }

                ui.separator();
                if viewer.selected_index() == Some(viewed) {
                    if ui.button("Done").clicked() {
                        actions.push(UiAction::Deselect);
                    }
                } else if ui.button("Customize").clicked() {
                    actions.push(UiAction::Select);
                }
            });

            let loads = session.loads();
            if loads.is_loading(&viewed_entity.id) {
                ui.horizontal(|ui| {
                    ui.spinner();
                    ui.label(format!("Loading {}...", viewed_entity.display_name));
                });
            }
            for entity in viewer.registry().iter() {
                let Some(error) = loads.failure(&entity.id) else {
                    continue;
                };
                ui.horizontal(|ui| {
                    ui.colored_label(egui::Color32::RED, error.to_string());
                    if ui.button("Retry").clicked() {
                        actions.push(UiAction::Retry(entity.id.clone()));
                    }
                });
            }
        });

    if paint_panel.0
        && let Some(selected) = viewer.selected()
    {
        egui::Window::new(format!("Paint: {}", selected.display_name))
            .resizable(false)
            .anchor(egui::Align2::RIGHT_TOP, [-16.0, 16.0])
            .show(ctx, |ui| {
                ui.horizontal(|ui| {
                    for rgb in session.paint().palette() {
                        let swatch = egui::Button::new("")
                            .fill(swatch_color(*rgb))
                            .min_size(egui::vec2(28.0, 28.0));
                        if ui.add(swatch).on_hover_text(rgb.to_string()).clicked() {
                            inputs.custom = rgb.to_array();
                            actions.push(UiAction::SetRgb(*rgb));
                        }
                    }
                });

                ui.horizontal(|ui| {
                    ui.label("Custom:");
                    if ui.color_edit_button_srgb(&mut inputs.custom).changed() {
                        let [r, g, b] = inputs.custom;
                        actions.push(UiAction::SetRgb(Rgb::new(r, g, b)));
                    }
                });

                ui.horizontal(|ui| {
                    let response = ui.add(
                        egui::TextEdit::singleline(&mut inputs.color_text)
                            .desired_width(140.0)
                            .hint_text("rgb(200, 0, 0) or #c80000"),
                    );
                    let submitted =
                        response.lost_focus() && ui.input(|i| i.key_pressed(egui::Key::Enter));
                    if submitted || ui.button("Apply").clicked() {
                        actions.push(UiAction::SetColor(inputs.color_text.clone()));
                    }
                });

                ui.separator();
                ui.horizontal(|ui| {
                    if picker.is_open {
                        ui.spinner();
                        ui.label("Choosing texture...");
                    } else if ui.button("Texture...").clicked() {
                        actions.push(UiAction::PickTexture);
                    }
                });
                if let Some(error) = &picker.error {
                    ui.colored_label(egui::Color32::RED, error.as_str());
                }
            });
    }

    for action in actions {
        match action {
            UiAction::Prev => {
                session.prev();
            }
            UiAction::Next => {
                session.next();
            }
            UiAction::JumpTo(index) => {
                session.jump_to(index);
            }
            UiAction::Select => {
                session.select();
            }
            UiAction::Deselect => {
                session.deselect();
            }
            UiAction::Retry(id) => {
                session.retry_load(&id);
            }
            UiAction::SetRgb(rgb) => {
                session.set_rgb(rgb);
            }
            UiAction::SetColor(text) => {
                if session.set_color(&text).is_none() {
                    tracing::debug!("Color field ignored: '{text}'");
                }
            }
            UiAction::PickTexture => picker.open(),
        }
    }

    Ok(())
}
