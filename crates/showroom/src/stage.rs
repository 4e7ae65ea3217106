//! Stage choreography.
//!
//! The director turns viewer and paint events into [`StageCommand`]s: what to
//! load, where to put it, where the camera goes and what gets repainted. An
//! adapter implementing [`Presentation`] carries the commands out against a
//! real renderer. The director itself never renders.
//!
//! ## Layouts
//!
//! - **Carousel**: every car is loaded up front and parked on a circle. Viewing
//!   a car swings the camera over to it; selecting zooms in.
//! - **Scenes**: only the viewed entity is on stage, together with its
//!   environment. Switching drives the old car out, tears its scene down,
//!   stages the new one and drives the new car in.

use std::sync::Arc;

use glam::{Vec2, Vec3};
use serde::Deserialize;

use crate::{
    layout::{CAROUSEL_RADIUS, points_on_circle},
    loading::{LoadTicket, LoadTracker},
    paint::{ColorChoice, Rgb, TextureData},
    registry::{Entity, EntityId, Environment, PartId, Placement, Registry},
    viewer::{Selected, ViewChanged, Viewer},
};

// ============================================================================
// Constants
// ============================================================================

/// How far off-stage a car starts and ends its drive, along X.
pub const DRIVE_DISTANCE: f32 = 50.0;

/// Duration of a drive in or out, in seconds.
pub const DRIVE_DURATION_SECS: f32 = 5.0;

// ============================================================================
// Layout and framing
// ============================================================================

/// How entities share the stage.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Layout {
    /// All cars at once, parked on a circle.
    #[default]
    Carousel,
    /// One scene at a time.
    Scenes,
}

/// Camera framing relative to the entity it looks at.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Framing {
    /// Wide shot used while browsing.
    Overview,
    /// Close shot used while customizing.
    Focus,
}

impl Framing {
    /// Camera offset from the target.
    #[must_use]
    pub fn offset(self) -> Vec3 {
        match self {
            Framing::Overview => Vec3::new(5.0, 5.0, 6.0),
            Framing::Focus => Vec3::new(3.0, 1.5, 3.5),
        }
    }

    /// Length of the camera move into this framing, in seconds.
    #[must_use]
    pub fn duration_secs(self) -> f32 {
        match self {
            Framing::Overview => 2.0,
            Framing::Focus => 1.5,
        }
    }
}

// ============================================================================
// Commands
// ============================================================================

/// A presentation instruction.
#[derive(Debug, Clone, PartialEq)]
pub enum StageCommand {
    /// Load an entity's car model. Report completion with the ticket.
    LoadAsset {
        entity: Arc<Entity>,
        ticket: LoadTicket,
    },
    /// Position, scale and rotate a loaded model.
    ApplyTransform {
        entity: EntityId,
        placement: Placement,
    },
    /// Paint one part a solid color.
    SetPartColor {
        entity: EntityId,
        part: PartId,
        color: Rgb,
    },
    /// Paint one part with an image.
    SetPartTexture {
        entity: EntityId,
        part: PartId,
        texture: TextureData,
    },
    /// Animate the camera to frame a point. A zero duration snaps.
    MoveCamera {
        target: Vec3,
        framing: Framing,
        duration_secs: f32,
    },
    /// Load a scene's surroundings: model, fog and lights.
    SpawnEnvironment {
        entity: EntityId,
        environment: Environment,
    },
    /// Remove a scene and its car once any drive-out has finished.
    ClearEnvironment { entity: EntityId },
    /// Animate a car arriving, starting as soon as it is loaded.
    DriveIn {
        entity: EntityId,
        from: Vec3,
        to: Vec3,
        duration_secs: f32,
    },
    /// Animate a car leaving.
    DriveOut {
        entity: EntityId,
        from: Vec3,
        to: Vec3,
        duration_secs: f32,
    },
    /// Show or hide the paint controls.
    ShowPaintPanel { visible: bool },
}

/// Operations a renderer offers to the stage.
pub trait Presentation {
    fn load_asset(&mut self, entity: &Arc<Entity>, ticket: LoadTicket);

    fn apply_transform(&mut self, entity: &EntityId, placement: &Placement);

    fn set_part_color(&mut self, entity: &EntityId, part: &PartId, color: Rgb);

    fn set_part_texture(&mut self, entity: &EntityId, part: &PartId, texture: &TextureData);

    fn move_camera_to(&mut self, target: Vec3, framing: Framing, duration_secs: f32);

    fn spawn_environment(&mut self, entity: &EntityId, environment: &Environment);

    fn clear_environment(&mut self, entity: &EntityId);

    /// Animate a car between two positions.
    fn drive(&mut self, entity: &EntityId, from: Vec3, to: Vec3, duration_secs: f32);

    fn show_paint_panel(&mut self, visible: bool);

    /// Carry out one command.
    fn execute(&mut self, command: StageCommand) {
        match command {
            StageCommand::LoadAsset { entity, ticket } => self.load_asset(&entity, ticket),
            StageCommand::ApplyTransform { entity, placement } => {
                self.apply_transform(&entity, &placement);
            }
            StageCommand::SetPartColor {
                entity,
                part,
                color,
            } => self.set_part_color(&entity, &part, color),
            StageCommand::SetPartTexture {
                entity,
                part,
                texture,
            } => self.set_part_texture(&entity, &part, &texture),
            StageCommand::MoveCamera {
                target,
                framing,
                duration_secs,
            } => self.move_camera_to(target, framing, duration_secs),
            StageCommand::SpawnEnvironment {
                entity,
                environment,
            } => self.spawn_environment(&entity, &environment),
            StageCommand::ClearEnvironment { entity } => self.clear_environment(&entity),
            StageCommand::DriveIn {
                entity,
                from,
                to,
                duration_secs,
            }
            | StageCommand::DriveOut {
                entity,
                from,
                to,
                duration_secs,
            } => self.drive(&entity, from, to, duration_secs),
            StageCommand::ShowPaintPanel { visible } => self.show_paint_panel(visible),
        }
    }
}

// ============================================================================
// Director
// ============================================================================

/// Translates state changes into stage commands for one layout.
#[derive(Debug, Clone)]
pub struct StageDirector {
    layout: Layout,
    /// Carousel parking spots, one per registry entry.
    parking: Vec<Vec3>,
}

impl StageDirector {
    #[must_use]
    pub fn new(layout: Layout, registry: &Registry) -> Self {
        let parking = match layout {
            Layout::Carousel => points_on_circle(Vec2::ZERO, CAROUSEL_RADIUS, registry.len()),
            Layout::Scenes => Vec::new(),
        };
        Self { layout, parking }
    }

    #[must_use]
    pub fn layout(&self) -> Layout {
        self.layout
    }

    /// Where the entity at `index` stands once staged.
    ///
    /// In the carousel the configured position is an offset from the
    /// entity's parking spot.
    #[must_use]
    pub fn placement(&self, index: usize, entity: &Entity) -> Placement {
        match self.parking.get(index) {
            Some(spot) => entity.placement.at(*spot + entity.placement.position),
            None => entity.placement,
        }
    }

    /// Commands that set up the initial stage.
    pub fn opening(&self, viewer: &Viewer, loads: &mut LoadTracker) -> Vec<StageCommand> {
        let mut commands = Vec::new();
        let viewed = viewer.viewed_index();

        match self.layout {
            Layout::Carousel => {
                for (index, entity) in viewer.registry().iter().enumerate() {
                    commands.extend(self.load(index, entity, loads));
                }
            }
            Layout::Scenes => {
                commands.extend(self.stage_scene(viewed, viewer.viewed(), loads));
            }
        }

        commands.push(self.camera(viewed, viewer.viewed(), Framing::Overview, 0.0));
        commands.push(StageCommand::ShowPaintPanel { visible: false });
        commands
    }

    /// Commands for a change of the viewed entity.
    pub fn view_changed(
        &self,
        event: &ViewChanged,
        viewer: &Viewer,
        loads: &mut LoadTracker,
    ) -> Vec<StageCommand> {
        let registry = viewer.registry();
        let (Some(prev), Some(current)) = (registry.get(event.prev), registry.get(event.current))
        else {
            return Vec::new();
        };

        let mut commands = Vec::new();
        if self.layout == Layout::Scenes {
            let spot = self.placement(event.prev, prev).position;
            commands.push(StageCommand::DriveOut {
                entity: prev.id.clone(),
                from: spot,
                to: spot + Vec3::X * DRIVE_DISTANCE,
                duration_secs: DRIVE_DURATION_SECS,
            });
            commands.push(StageCommand::ClearEnvironment {
                entity: prev.id.clone(),
            });
            loads.forget(&prev.id);
            commands.extend(self.stage_scene(event.current, current, loads));
        }

        commands.push(self.camera(
            event.current,
            current,
            Framing::Overview,
            Framing::Overview.duration_secs(),
        ));
        commands
    }

    /// Commands for a new selection.
    #[must_use]
    pub fn selected(&self, event: &Selected) -> Vec<StageCommand> {
        vec![
            self.camera(
                event.index,
                &event.entity,
                Framing::Focus,
                Framing::Focus.duration_secs(),
            ),
            StageCommand::ShowPaintPanel { visible: true },
        ]
    }

    /// Commands for clearing the selection.
    #[must_use]
    pub fn deselected(&self, viewer: &Viewer) -> Vec<StageCommand> {
        vec![
            self.camera(
                viewer.viewed_index(),
                viewer.viewed(),
                Framing::Overview,
                Framing::Overview.duration_secs(),
            ),
            StageCommand::ShowPaintPanel { visible: false },
        ]
    }

    /// Commands that apply a paint choice to an entity's colorable parts.
    ///
    /// Entities lacking the matching capability are left alone.
    #[must_use]
    pub fn paint(&self, choice: &ColorChoice, entity: &Entity) -> Vec<StageCommand> {
        match choice {
            ColorChoice::SolidColor(color) if entity.capabilities.colorable => entity
                .colorable_parts
                .iter()
                .map(|part| StageCommand::SetPartColor {
                    entity: entity.id.clone(),
                    part: part.clone(),
                    color: *color,
                })
                .collect(),
            ColorChoice::Texture(texture) if entity.capabilities.textured => entity
                .colorable_parts
                .iter()
                .map(|part| StageCommand::SetPartTexture {
                    entity: entity.id.clone(),
                    part: part.clone(),
                    texture: texture.clone(),
                })
                .collect(),
            _ => {
                tracing::debug!("{} does not accept this paint", entity.id);
                Vec::new()
            }
        }
    }

    /// Load and place one entity's car.
    pub fn load(
        &self,
        index: usize,
        entity: &Arc<Entity>,
        loads: &mut LoadTracker,
    ) -> [StageCommand; 2] {
        [
            StageCommand::LoadAsset {
                entity: Arc::clone(entity),
                ticket: loads.begin(&entity.id),
            },
            StageCommand::ApplyTransform {
                entity: entity.id.clone(),
                placement: self.placement(index, entity),
            },
        ]
    }

    fn stage_scene(
        &self,
        index: usize,
        entity: &Arc<Entity>,
        loads: &mut LoadTracker,
    ) -> Vec<StageCommand> {
        let mut commands = Vec::new();
        if let Some(environment) = &entity.environment {
            commands.push(StageCommand::SpawnEnvironment {
                entity: entity.id.clone(),
                environment: environment.clone(),
            });
        }
        commands.extend(self.load(index, entity, loads));

        let spot = self.placement(index, entity).position;
        commands.push(StageCommand::DriveIn {
            entity: entity.id.clone(),
            from: spot - Vec3::X * DRIVE_DISTANCE,
            to: spot,
            duration_secs: DRIVE_DURATION_SECS,
        });
        commands
    }

    fn camera(
        &self,
        index: usize,
        entity: &Entity,
        framing: Framing,
        duration_secs: f32,
    ) -> StageCommand {
        StageCommand::MoveCamera {
            target: self.placement(index, entity).position,
            framing,
            duration_secs,
        }
    }
}
