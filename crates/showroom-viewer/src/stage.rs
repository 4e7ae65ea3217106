//! Bevy implementation of the showroom stage.
//!
//! [`Stage`] carries out [`StageCommand`]s against the ECS world: car models
//! and scene environments are glTF scenes loaded through the `AssetServer`,
//! fog goes on the camera, and drives are per-car animations. Load progress is
//! polled every frame and reported back to the session, which decides whether
//! a finished load is still wanted.
//!
//! Every car spawned for a load carries its [`LoadTicket`]. When a newer load
//! for the same entity starts, the old car is despawned straight away. A car
//! that has been cleared from the stage keeps driving off and is despawned,
//! together with its environment, when the drive ends.

use std::{collections::HashMap, sync::Arc};

use bevy::{
    asset::{LoadState, RecursiveDependencyLoadState},
    ecs::system::SystemParam,
    gltf::Gltf,
    prelude::*,
};
use showroom::{
    EntityId, Environment, Error, Fog, Framing, LoadOutcome, LoadTicket, PartId, Placement,
    Presentation, Rgb, StageCommand, TextureData,
};

use crate::{
    camera::{CameraFlights, OrbitCamera},
    paint::{PaintDirty, PaintJobs, PartPaint, decode_texture},
    session::ShowroomSession,
    tween::Tween,
    ui::PaintPanelVisible,
};

// ============================================================================
// Constants
// ============================================================================

/// Background color when no scene sets its own; matches [`Fog::WORLD`].
pub const DEFAULT_BACKGROUND: Color = Color::srgb_u8(30, 30, 30);

/// Catalog light intensities are relative; one unit is this many lumens.
const LIGHT_UNIT_LUMENS: f32 = 10_000.0;

/// Headlight output in lumens.
const HEADLIGHT_LUMENS: f32 = 400_000.0;
/// Headlight reach in meters.
const HEADLIGHT_RANGE: f32 = 40.0;

// ============================================================================
// Plugin
// ============================================================================

/// Plugin for stage upkeep: load polling, drives and scene teardown.
pub struct StagePlugin;

impl Plugin for StagePlugin {
    fn build(&self, app: &mut App) {
        app.init_resource::<StageState>().add_systems(
            Update,
            (
                animate_drives,
                despawn_departed,
                sync_fog.run_if(resource_changed::<StageState>),
            )
                .chain(),
        );
    }
}

// ============================================================================
// Components and state
// ============================================================================

/// A car model spawned for one load of a registry entity.
#[derive(Component, Debug)]
pub struct CarModel {
    pub entity: Arc<showroom::Entity>,
    pub ticket: LoadTicket,
}

/// A glTF scene whose asset has not finished loading.
///
/// Parse errors are only reported on the file itself, so the whole glTF is
/// watched alongside the scene taken from it.
#[derive(Component, Debug)]
pub struct LoadingModel {
    gltf: Handle<Gltf>,
    handle: Handle<Scene>,
    asset: String,
}

/// Where a model load stands.
#[derive(Debug, Clone, PartialEq, Eq)]
enum LoadProgress {
    Pending,
    Ready,
    Failed(String),
}

impl LoadProgress {
    fn of(state: Option<LoadState>) -> Self {
        match state {
            Some(LoadState::Loaded) => Self::Ready,
            Some(LoadState::Failed(e)) => Self::Failed(e.to_string()),
            _ => Self::Pending,
        }
    }

    fn of_dependencies(state: Option<RecursiveDependencyLoadState>) -> Self {
        match state {
            Some(RecursiveDependencyLoadState::Loaded) => Self::Ready,
            Some(RecursiveDependencyLoadState::Failed(e)) => Self::Failed(e.to_string()),
            _ => Self::Pending,
        }
    }

    /// Combine the file, scene and dependency states of one model.
    ///
    /// Any failure wins; otherwise the model is ready once its scene is.
    fn combine(gltf: Self, scene: Self, dependencies: Self) -> Self {
        [gltf, scene.clone(), dependencies]
            .into_iter()
            .find(|progress| matches!(progress, Self::Failed(_)))
            .unwrap_or(match scene {
                Self::Ready => Self::Ready,
                _ => Self::Pending,
            })
    }
}

/// Part of a scene environment: its model or one of its lights.
#[derive(Component, Debug)]
pub struct SceneEnvironment {
    pub id: EntityId,
}

/// Marks a car or environment that has been cleared from the stage.
///
/// Despawned once no departing car with the same id is still driving.
#[derive(Component, Debug)]
pub struct Departing {
    id: EntityId,
}

/// A car moving between two points.
#[derive(Component, Debug)]
pub struct Drive {
    from: Vec3,
    to: Vec3,
    tween: Tween,
}

/// What is currently on stage.
#[derive(Resource, Default)]
pub struct StageState {
    /// The live car for each entity id.
    cars: HashMap<EntityId, Entity>,
    /// The environment model and lights for each entity id.
    environments: HashMap<EntityId, Vec<Entity>>,
    /// Resting transform for each entity id.
    placements: HashMap<EntityId, Transform>,
    /// Fog of the environment on stage.
    fog: Option<(EntityId, Fog)>,
    /// The last decoded paint texture, shared by every part it is applied to.
    texture: Option<(TextureData, Handle<Image>)>,
}

impl StageState {
    /// Fog to render: the staged environment's, or the bare showroom's.
    pub fn active_fog(&self) -> Fog {
        self.fog.as_ref().map_or(Fog::WORLD, |(_, fog)| *fog)
    }
}

pub fn rgb_color(rgb: Rgb) -> Color {
    Color::srgb_u8(rgb.r, rgb.g, rgb.b)
}

fn placement_transform(placement: &Placement) -> Transform {
    Transform {
        translation: placement.position,
        rotation: placement.rotation_quat(),
        scale: placement.scale,
    }
}

// ============================================================================
// Presentation
// ============================================================================

/// Everything needed to carry out stage commands.
#[derive(SystemParam)]
pub struct Stage<'w, 's> {
    commands: Commands<'w, 's>,
    asset_server: Res<'w, AssetServer>,
    images: ResMut<'w, Assets<Image>>,
    state: ResMut<'w, StageState>,
    paint_jobs: ResMut<'w, PaintJobs>,
    flights: ResMut<'w, CameraFlights>,
    paint_panel: ResMut<'w, PaintPanelVisible>,
}

impl Stage<'_, '_> {
    fn spawn_scene(&mut self, asset: &str, bundle: impl Bundle) -> Entity {
        let gltf: Handle<Gltf> = self.asset_server.load(asset.to_string());
        let handle: Handle<Scene> = self
            .asset_server
            .load(GltfAssetLabel::Scene(0).from_asset(asset.to_string()));
        self.commands
            .spawn((
                bundle,
                SceneRoot(handle.clone()),
                LoadingModel {
                    gltf,
                    handle,
                    asset: asset.to_string(),
                },
            ))
            .id()
    }

    fn mark_painted(&mut self, entity: &EntityId) {
        if let Some(&car) = self.state.cars.get(entity) {
            self.commands.entity(car).try_insert(PaintDirty);
        }
    }
}

impl Presentation for Stage<'_, '_> {
    fn load_asset(&mut self, entity: &Arc<showroom::Entity>, ticket: LoadTicket) {
        if let Some(old) = self.state.cars.remove(&entity.id) {
            tracing::debug!("Replacing the model of {}", entity.id);
            self.commands.entity(old).try_despawn();
        }

        let transform = self
            .state
            .placements
            .get(&entity.id)
            .copied()
            .unwrap_or_default();
        let car = self.spawn_scene(
            &entity.asset_ref,
            (
                Name::new(entity.display_name.clone()),
                CarModel {
                    entity: Arc::clone(entity),
                    ticket,
                },
                transform,
            ),
        );

        if entity.capabilities.headlights {
            self.commands.entity(car).with_children(|parent| {
                for headlight in &entity.headlights {
                    parent.spawn((
                        SpotLight {
                            intensity: HEADLIGHT_LUMENS,
                            range: HEADLIGHT_RANGE,
                            outer_angle: 0.6,
                            inner_angle: 0.3,
                            shadows_enabled: false,
                            ..default()
                        },
                        Transform::from_translation(headlight.position)
                            .looking_at(headlight.target, Vec3::Y),
                    ));
                }
            });
        }

        tracing::info!("Loading {} from {}", entity.display_name, entity.asset_ref);
        self.state.cars.insert(entity.id.clone(), car);
    }

    fn apply_transform(&mut self, entity: &EntityId, placement: &Placement) {
        let transform = placement_transform(placement);
        self.state.placements.insert(entity.clone(), transform);
        if let Some(&car) = self.state.cars.get(entity) {
            self.commands.entity(car).try_insert(transform);
        }
    }

    fn set_part_color(&mut self, entity: &EntityId, part: &PartId, color: Rgb) {
        self.paint_jobs
            .set(entity, part, PartPaint::Color(rgb_color(color)));
        self.mark_painted(entity);
    }

    fn set_part_texture(&mut self, entity: &EntityId, part: &PartId, texture: &TextureData) {
        let handle = match &self.state.texture {
            Some((cached, handle)) if cached == texture => handle.clone(),
            _ => match decode_texture(texture) {
                Ok(image) => {
                    let handle = self.images.add(image);
                    self.state.texture = Some((texture.clone(), handle.clone()));
                    handle
                }
                Err(e) => {
                    tracing::warn!("Ignoring texture for {entity}: {e}");
                    return;
                }
            },
        };
        self.paint_jobs
            .set(entity, part, PartPaint::Texture(handle));
        self.mark_painted(entity);
    }

    fn move_camera_to(&mut self, target: Vec3, framing: Framing, duration_secs: f32) {
        self.flights.request(target, framing, duration_secs);
    }

    fn spawn_environment(&mut self, entity: &EntityId, environment: &Environment) {
        for old in self.state.environments.remove(entity).into_iter().flatten() {
            self.commands.entity(old).try_despawn();
        }

        let root = self.spawn_scene(
            &environment.asset_ref,
            (
                Name::new(format!("{entity} environment")),
                SceneEnvironment { id: entity.clone() },
                Transform::from_scale(environment.scale)
                    .with_rotation(Quat::from_rotation_y(environment.yaw)),
            ),
        );

        let mut spawned = vec![root];
        for light in &environment.lights {
            let id = self
                .commands
                .spawn((
                    SceneEnvironment { id: entity.clone() },
                    PointLight {
                        color: rgb_color(light.color),
                        intensity: light.intensity * LIGHT_UNIT_LUMENS,
                        range: light.range,
                        shadows_enabled: false,
                        ..default()
                    },
                    Transform::from_translation(light.position),
                ))
                .id();
            spawned.push(id);
        }

        tracing::info!("Staging environment {}", environment.asset_ref);
        self.state.environments.insert(entity.clone(), spawned);
        self.state.fog = Some((entity.clone(), environment.fog));
    }

    fn clear_environment(&mut self, entity: &EntityId) {
        let departing = self
            .state
            .environments
            .remove(entity)
            .into_iter()
            .flatten()
            .chain(self.state.cars.remove(entity));
        for departed in departing {
            self.commands
                .entity(departed)
                .try_insert(Departing { id: entity.clone() });
        }

        if self
            .state
            .fog
            .as_ref()
            .is_some_and(|(owner, _)| owner == entity)
        {
            self.state.fog = None;
        }
    }

    fn drive(&mut self, entity: &EntityId, from: Vec3, to: Vec3, duration_secs: f32) {
        let Some(&car) = self.state.cars.get(entity) else {
            tracing::debug!("No car on stage for {entity} to drive");
            return;
        };
        let mut transform = self
            .state
            .placements
            .get(entity)
            .copied()
            .unwrap_or_default();
        transform.translation = from;
        self.commands.entity(car).try_insert((
            transform,
            Drive {
                from,
                to,
                tween: Tween::new(duration_secs),
            },
        ));
    }

    fn show_paint_panel(&mut self, visible: bool) {
        self.paint_panel.0 = visible;
    }
}

// ============================================================================
// Systems
// ============================================================================

/// Carry out every command the session queued.
pub fn execute_stage_commands(mut session: ResMut<ShowroomSession>, mut stage: Stage) {
    for command in session.drain_commands() {
        stage.execute(command);
    }
}

/// Report finished loads to the session.
///
/// Stale cars are despawned. A failed car stays in place, empty, until it is
/// retried.
pub fn poll_loads(
    mut commands: Commands,
    asset_server: Res<AssetServer>,
    mut session: ResMut<ShowroomSession>,
    query: Query<(Entity, &LoadingModel, Option<&CarModel>)>,
) {
    for (entity, loading, car) in &query {
        let progress = LoadProgress::combine(
            LoadProgress::of(asset_server.get_load_state(loading.gltf.id())),
            LoadProgress::of(asset_server.get_load_state(loading.handle.id())),
            LoadProgress::of_dependencies(
                asset_server.get_recursive_dependency_load_state(loading.handle.id()),
            ),
        );
        let result = match progress {
            LoadProgress::Pending => continue,
            LoadProgress::Ready => Ok(()),
            LoadProgress::Failed(message) => Err(Error::AssetLoadFailure {
                asset: loading.asset.clone(),
                message,
            }),
        };
        commands.entity(entity).remove::<LoadingModel>();

        let Some(car) = car else {
            if let Err(e) = result {
                tracing::warn!("Environment unavailable: {e}");
            }
            continue;
        };

        match session.finish_load(&car.ticket, result) {
            LoadOutcome::Applied => {
                tracing::info!("Loaded {}", car.entity.display_name);
            }
            LoadOutcome::Stale => {
                commands.entity(entity).try_despawn();
            }
            LoadOutcome::Failed => {}
        }
    }
}

/// Move driving cars once they have loaded.
fn animate_drives(
    mut commands: Commands,
    time: Res<Time>,
    mut query: Query<(Entity, &mut Transform, &mut Drive), Without<LoadingModel>>,
) {
    for (entity, mut transform, mut drive) in &mut query {
        let t = drive.tween.advance(time.delta_secs());
        transform.translation = drive.from.lerp(drive.to, t);
        if drive.tween.is_finished() {
            commands.entity(entity).remove::<Drive>();
        }
    }
}

/// Despawn cleared cars and environments once their car has driven off.
fn despawn_departed(
    mut commands: Commands,
    departing: Query<(Entity, &Departing)>,
    driving: Query<&CarModel, (With<Departing>, With<Drive>)>,
) {
    for (entity, departed) in &departing {
        let still_driving = driving.iter().any(|car| car.entity.id == departed.id);
        if !still_driving {
            commands.entity(entity).try_despawn();
        }
    }
}

/// Match the camera fog and background to the environment on stage.
fn sync_fog(
    mut commands: Commands,
    state: Res<StageState>,
    mut clear_color: ResMut<ClearColor>,
    camera: Query<Entity, With<OrbitCamera>>,
) {
    let Ok(camera) = camera.single() else {
        return;
    };

    let fog = state.active_fog();
    let color = rgb_color(fog.color);
    commands.entity(camera).insert(DistanceFog {
        color,
        falloff: FogFalloff::Linear {
            start: fog.near,
            end: fog.far,
        },
        ..default()
    });
    clear_color.0 = color;
}
