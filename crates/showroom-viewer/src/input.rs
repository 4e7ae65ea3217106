//! Input action definitions for browsing and customizing.
//!
//! Defines every action using `leafwing-input-manager` so bindings live in one
//! place. Keyboard actions are suspended while egui has keyboard focus, and
//! camera drags are suspended while the pointer is over a panel.

use bevy::prelude::*;
use bevy_egui::EguiContexts;
use leafwing_input_manager::{plugin::InputManagerSystem, prelude::*};

// ============================================================================
// Actions
// ============================================================================

/// Actions available in the showroom.
#[derive(Actionlike, PartialEq, Eq, Hash, Clone, Copy, Debug, Reflect)]
pub enum ShowroomAction {
    /// View the previous car (Left arrow).
    Prev,
    /// View the next car (Right arrow).
    Next,
    /// Select the viewed car for customizing (Enter).
    Select,
    /// Clear the selection (Backspace).
    Deselect,
    /// Show or hide the panels (Tab).
    ToggleUi,
    /// Hold to orbit the camera (left mouse button).
    Drag,
    /// Mouse motion while dragging.
    #[actionlike(DualAxis)]
    Orbit,
    /// Zoom with the scroll wheel.
    #[actionlike(Axis)]
    Zoom,
}

/// Create the default input map.
pub fn default_input_map() -> InputMap<ShowroomAction> {
    InputMap::default()
        .with(ShowroomAction::Prev, KeyCode::ArrowLeft)
        .with(ShowroomAction::Next, KeyCode::ArrowRight)
        .with(ShowroomAction::Select, KeyCode::Enter)
        .with(ShowroomAction::Select, KeyCode::NumpadEnter)
        .with(ShowroomAction::Deselect, KeyCode::Backspace)
        .with(ShowroomAction::ToggleUi, KeyCode::Tab)
        .with(ShowroomAction::Drag, MouseButton::Left)
        .with_dual_axis(ShowroomAction::Orbit, MouseMove::default())
        .with_axis(ShowroomAction::Zoom, MouseScrollAxis::Y)
}

// ============================================================================
// Plugin
// ============================================================================

/// Plugin that registers the action type and input focus management.
pub struct InputPlugin;

impl Plugin for InputPlugin {
    fn build(&self, app: &mut App) {
        app.add_plugins(InputManagerPlugin::<ShowroomAction>::default())
            .add_systems(
                PreUpdate,
                manage_input_focus.after(InputManagerSystem::Update),
            );
    }
}

// ============================================================================
// Input focus management
// ============================================================================

/// Actions bound to the keyboard.
const KEYBOARD_ACTIONS: &[ShowroomAction] = &[
    ShowroomAction::Prev,
    ShowroomAction::Next,
    ShowroomAction::Select,
    ShowroomAction::Deselect,
];

/// Actions bound to the mouse that act on the 3D view.
const POINTER_ACTIONS: &[ShowroomAction] = &[
    ShowroomAction::Drag,
    ShowroomAction::Orbit,
    ShowroomAction::Zoom,
];

fn set_actions(
    action_state: &mut ActionState<ShowroomAction>,
    actions: &[ShowroomAction],
    enabled: bool,
) {
    for action in actions {
        if enabled {
            action_state.enable_action(action);
        } else {
            action_state.disable_action(action);
        }
    }
}

/// Keep egui and the 3D view from both reacting to the same input.
///
/// `ToggleUi` is always kept enabled. A drag that started in the 3D view
/// keeps orbiting even if the pointer passes over a panel.
fn manage_input_focus(
    mut query: Query<&mut ActionState<ShowroomAction>>,
    mut contexts: EguiContexts,
) {
    let (egui_wants_kb, egui_wants_pointer) = contexts.ctx_mut().ok().map_or(
        (false, false),
        |ctx| (ctx.wants_keyboard_input(), ctx.is_pointer_over_area()),
    );

    for mut action_state in &mut query {
        action_state.enable_action(&ShowroomAction::ToggleUi);
        set_actions(&mut action_state, KEYBOARD_ACTIONS, !egui_wants_kb);

        let dragging = action_state.pressed(&ShowroomAction::Drag);
        set_actions(
            &mut action_state,
            POINTER_ACTIONS,
            dragging || !egui_wants_pointer,
        );
    }
}
