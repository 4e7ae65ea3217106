//! The showroom session as a Bevy resource.
//!
//! Keyboard actions and UI clicks go to the [`Showroom`]; the commands it
//! queues are carried out by [`crate::stage`] in the same frame.

use bevy::prelude::*;
use leafwing_input_manager::prelude::*;
use showroom::Showroom;

use crate::{
    input::ShowroomAction,
    stage::{execute_stage_commands, poll_loads},
};

/// Plugin that drives the showroom session.
pub struct SessionPlugin;

impl Plugin for SessionPlugin {
    fn build(&self, app: &mut App) {
        app.add_systems(Startup, open_showroom).add_systems(
            Update,
            (handle_actions, poll_loads, execute_stage_commands).chain(),
        );
    }
}

/// The running showroom.
#[derive(Resource, Deref, DerefMut)]
pub struct ShowroomSession(pub Showroom);

/// Log navigation and stage the opening scene.
fn open_showroom(mut session: ResMut<ShowroomSession>) {
    let registry = session.registry().clone();
    session.on_view_changed(move |event| {
        if let Some(entity) = registry.get(event.current) {
            tracing::info!("Viewing {}", entity.display_name);
        }
    });
    session.on_selected(|event| {
        tracing::info!("Customizing {}", event.entity.display_name);
    });
    session.on_deselected(|_| tracing::info!("Back to browsing"));
    session.on_load_failed(|failure| {
        tracing::debug!("{} can be retried from the panel", failure.entity);
    });

    session.open();
}

/// Apply keyboard navigation and selection.
fn handle_actions(
    query: Query<&ActionState<ShowroomAction>>,
    mut session: ResMut<ShowroomSession>,
) {
    let Ok(action_state) = query.single() else {
        return;
    };

    if action_state.just_pressed(&ShowroomAction::Prev) {
        session.prev();
    }
    if action_state.just_pressed(&ShowroomAction::Next) {
        session.next();
    }
    if action_state.just_pressed(&ShowroomAction::Select) {
        session.select();
    }
    if action_state.just_pressed(&ShowroomAction::Deselect) {
        session.deselect();
    }
}
