//! 3D car configurator using Bevy.
//!
//! Browse a line-up of cars, or a set of themed scenes with one car each, then
//! select a car to repaint it with a palette color, a custom color or an
//! image texture.

mod camera;
mod input;
mod launch_params;
mod paint;
mod session;
mod stage;
mod tween;
mod ui;

use bevy::light::light_consts::lux;
use bevy::prelude::*;
use camera::{OrbitCamera, OrbitCameraPlugin};
use input::{InputPlugin, default_input_map};
use paint::PaintPlugin;
use session::{SessionPlugin, ShowroomSession};
use showroom::{Framing, Layout};
use stage::{DEFAULT_BACKGROUND, StagePlugin};
use ui::ShowroomUiPlugin;

/// Radius of the carousel floor, in meters.
const FLOOR_RADIUS: f32 = 40.0;

/// Plugin for the main application.
pub struct AppPlugin;

impl Plugin for AppPlugin {
    fn build(&self, app: &mut App) {
        app.add_plugins((
            InputPlugin,
            OrbitCameraPlugin,
            SessionPlugin,
            StagePlugin,
            PaintPlugin,
            ShowroomUiPlugin,
        ))
        .add_systems(Startup, setup_scene);
    }
}

/// Spawn the camera, the key light and, for the carousel, a floor.
fn setup_scene(
    mut commands: Commands,
    session: Res<ShowroomSession>,
    mut meshes: ResMut<Assets<Mesh>>,
    mut materials: ResMut<Assets<StandardMaterial>>,
) {
    let orbit = OrbitCamera::framing(Vec3::ZERO, Framing::Overview.offset());
    commands.spawn((
        Camera3d::default(),
        orbit.transform(),
        orbit,
        default_input_map(),
    ));

    commands.spawn((
        DirectionalLight {
            illuminance: lux::OVERCAST_DAY,
            shadows_enabled: true,
            ..default()
        },
        Transform::from_xyz(4.0, 10.0, 6.0).looking_at(Vec3::ZERO, Vec3::Y),
    ));

    if session.layout() == Layout::Carousel {
        commands.spawn((
            Mesh3d(meshes.add(Circle::new(FLOOR_RADIUS))),
            MeshMaterial3d(materials.add(StandardMaterial {
                base_color: Color::srgb(0.18, 0.18, 0.2),
                perceptual_roughness: 0.6,
                ..default()
            })),
            Transform::from_rotation(Quat::from_rotation_x(-std::f32::consts::FRAC_PI_2)),
        ));
    }

    tracing::info!("Scene setup complete - arrows to browse, Enter to customize");
}

fn main() {
    // Initialize tracing for native platforms.
    #[cfg(not(target_family = "wasm"))]
    {
        use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};
        tracing_subscriber::registry()
            .with(tracing_subscriber::fmt::layer())
            .with(
                tracing_subscriber::EnvFilter::try_from_default_env()
                    .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
            )
            .init();
    }

    // Initialize tracing for WASM (logs to browser console).
    #[cfg(target_family = "wasm")]
    {
        console_error_panic_hook::set_once();
        tracing_wasm::set_as_global_default();
    }

    let params = launch_params::parse();
    let showroom = match params.showroom() {
        Ok(showroom) => showroom,
        Err(e) => {
            tracing::error!("Could not open the showroom: {e}");
            return;
        }
    };

    let mut app = App::new();

    #[allow(unused_mut)]
    let mut window = Window {
        title: "showroom".to_string(),
        resolution: (1920, 1080).into(),
        position: WindowPosition::Centered(MonitorSelection::Primary),
        ..Default::default()
    };

    // WASM: Fit canvas to parent element and prevent browser event handling.
    #[cfg(target_family = "wasm")]
    {
        window.fit_canvas_to_parent = true;
        window.prevent_default_event_handling = true;
    }

    app.add_plugins(DefaultPlugins.set(WindowPlugin {
        primary_window: Some(window),
        ..Default::default()
    }))
    .insert_resource(ClearColor(DEFAULT_BACKGROUND))
    .insert_resource(ShowroomSession(showroom))
    .add_plugins(AppPlugin)
    .run();
}
