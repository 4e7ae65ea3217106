//! Painting car parts.
//!
//! Paint is kept per entity and part in [`PaintJobs`], and applied to a car
//! whenever it is marked [`PaintDirty`]: after a paint change, and again when
//! its scene finishes spawning. A part is matched by the `Name` of a mesh
//! entity or of its parent node. Each painted mesh gets its own copy of its
//! material so repainting one car never bleeds into another.

use std::collections::HashMap;

use bevy::{
    asset::RenderAssetUsages,
    image::{CompressedImageFormats, ImageSampler, ImageType},
    prelude::*,
    scene::SceneInstanceReady,
};
use showroom::{EntityId, PartId, TextureData};

use crate::stage::CarModel;

/// Plugin for applying paint to car parts.
pub struct PaintPlugin;

impl Plugin for PaintPlugin {
    fn build(&self, app: &mut App) {
        app.init_resource::<PaintJobs>()
            .add_systems(Update, apply_paint)
            .add_observer(on_car_scene_ready);
    }
}

/// How one part is painted.
#[derive(Debug, Clone)]
pub enum PartPaint {
    Color(Color),
    Texture(Handle<Image>),
}

/// The current paint of every painted part.
#[derive(Resource, Default)]
pub struct PaintJobs {
    parts: HashMap<EntityId, HashMap<PartId, PartPaint>>,
}

impl PaintJobs {
    pub fn set(&mut self, entity: &EntityId, part: &PartId, paint: PartPaint) {
        self.parts
            .entry(entity.clone())
            .or_default()
            .insert(part.clone(), paint);
    }

    fn find(&self, entity: &EntityId, name: &str) -> Option<&PartPaint> {
        self.parts.get(entity)?.get(name)
    }
}

/// Marks a car whose paint needs applying.
#[derive(Component, Debug)]
pub struct PaintDirty;

/// Marks a mesh whose material is a private copy.
#[derive(Component, Debug)]
struct OwnMaterial;

/// Decode encoded image bytes for use as a paint texture.
pub fn decode_texture(texture: &TextureData) -> Result<Image, String> {
    let Some(mime_type) = texture.format().mime_type() else {
        return Err("unsupported image format, expected PNG or JPEG".to_string());
    };
    Image::from_buffer(
        texture.bytes(),
        ImageType::MimeType(mime_type),
        CompressedImageFormats::NONE,
        true,
        ImageSampler::Default,
        RenderAssetUsages::RENDER_WORLD,
    )
    .map_err(|e| e.to_string())
}

/// Repaint a car once its scene hierarchy exists.
fn on_car_scene_ready(
    trigger: On<SceneInstanceReady>,
    mut commands: Commands,
    cars: Query<(), With<CarModel>>,
) {
    let entity = trigger.event_target();
    if cars.contains(entity) {
        commands.entity(entity).try_insert(PaintDirty);
    }
}

/// Apply stored paint to the parts of dirty cars.
#[allow(clippy::too_many_arguments)]
fn apply_paint(
    mut commands: Commands,
    jobs: Res<PaintJobs>,
    mut materials: ResMut<Assets<StandardMaterial>>,
    cars: Query<(Entity, &CarModel), With<PaintDirty>>,
    children: Query<&Children>,
    names: Query<&Name>,
    parents: Query<&ChildOf>,
    mut meshes: Query<(&mut MeshMaterial3d<StandardMaterial>, Has<OwnMaterial>)>,
) {
    for (car, model) in &cars {
        commands.entity(car).remove::<PaintDirty>();

        let mut painted = 0;
        for descendant in children.iter_descendants(car) {
            let Ok((mut material, owned)) = meshes.get_mut(descendant) else {
                continue;
            };
            let own_name = names.get(descendant).ok();
            let parent_name = parents
                .get(descendant)
                .ok()
                .and_then(|child_of| names.get(child_of.parent()).ok());
            let Some(paint) = [own_name, parent_name]
                .into_iter()
                .flatten()
                .find_map(|name| jobs.find(&model.entity.id, name.as_str()))
            else {
                continue;
            };

            if !owned {
                let copy = materials.get(&material.0).cloned().unwrap_or_default();
                material.0 = materials.add(copy);
                commands.entity(descendant).insert(OwnMaterial);
            }
            let mut slot = materials.get_mut(&material.0);
            let Some(standard) = slot.as_deref_mut() else {
                continue;
            };
            match paint {
                PartPaint::Color(color) => {
                    standard.base_color = *color;
                    standard.base_color_texture = None;
                }
                PartPaint::Texture(image) => {
                    standard.base_color = Color::WHITE;
                    standard.base_color_texture = Some(image.clone());
                }
            }
            painted += 1;
        }

        if painted > 0 {
            tracing::debug!("Painted {painted} meshes of {}", model.entity.id);
        }
    }
}
