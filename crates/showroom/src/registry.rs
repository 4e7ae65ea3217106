//! Entity registry: the ordered list of cars and scenes on show.
//!
//! Entities are immutable once the registry is built. The registry is never
//! empty, so index 0 is always a valid viewer position.

use std::{borrow::Borrow, collections::BTreeSet, fmt, sync::Arc};

use glam::{EulerRot, Quat, Vec3};

use crate::{
    error::{Error, Result},
    paint::Rgb,
};

// ============================================================================
// Identifiers
// ============================================================================

/// Stable identifier of a registry entity.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct EntityId(String);

impl EntityId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for EntityId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Name of a mesh in the model whose material may be repainted.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct PartId(String);

impl PartId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Borrow<str> for PartId {
    fn borrow(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for PartId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

// ============================================================================
// Entity description
// ============================================================================

/// Where and how a model sits in the world.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Placement {
    pub position: Vec3,
    pub scale: Vec3,
    /// Euler angles in radians, applied X then Y then Z.
    pub rotation: Vec3,
}

impl Default for Placement {
    fn default() -> Self {
        Self {
            position: Vec3::ZERO,
            scale: Vec3::ONE,
            rotation: Vec3::ZERO,
        }
    }
}

impl Placement {
    /// The rotation as a quaternion.
    #[must_use]
    pub fn rotation_quat(&self) -> Quat {
        Quat::from_euler(
            EulerRot::XYZ,
            self.rotation.x,
            self.rotation.y,
            self.rotation.z,
        )
    }

    /// The same placement moved to another position.
    #[must_use]
    pub fn at(self, position: Vec3) -> Self {
        Self { position, ..self }
    }
}

/// What an entity supports. Replaces per-model subclasses.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Capabilities {
    /// Parts accept solid colors.
    pub colorable: bool,
    /// Parts accept image textures.
    pub textured: bool,
    /// Spotlights are spawned at the configured headlight positions.
    pub headlights: bool,
}

impl Default for Capabilities {
    fn default() -> Self {
        Self {
            colorable: true,
            textured: true,
            headlights: false,
        }
    }
}

/// A headlight spotlight, in model-local coordinates.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Headlight {
    pub position: Vec3,
    pub target: Vec3,
}

/// Linear distance fog.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Fog {
    pub color: Rgb,
    pub near: f32,
    pub far: f32,
}

impl Fog {
    /// Fog of the bare showroom, in the background color.
    pub const WORLD: Self = Self {
        color: Rgb::new(30, 30, 30),
        near: 4.0,
        far: 30.0,
    };
}

/// A point light belonging to a scene environment.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PointLightSpec {
    pub color: Rgb,
    /// Intensity in the units the catalog was authored in.
    pub intensity: f32,
    pub range: f32,
    pub position: Vec3,
}

/// Surroundings staged together with a scene's car.
#[derive(Debug, Clone, PartialEq)]
pub struct Environment {
    pub asset_ref: String,
    /// Also used as the clear color.
    pub fog: Fog,
    pub lights: Vec<PointLightSpec>,
    pub scale: Vec3,
    /// Rotation about the vertical axis, in radians.
    pub yaw: f32,
}

/// A car or scene on show.
#[derive(Debug, Clone, PartialEq)]
pub struct Entity {
    pub id: EntityId,
    pub display_name: String,
    /// Path of the car model, relative to the asset root.
    pub asset_ref: String,
    pub colorable_parts: BTreeSet<PartId>,
    pub placement: Placement,
    pub capabilities: Capabilities,
    pub headlights: Vec<Headlight>,
    /// Present for scene entities.
    pub environment: Option<Environment>,
}

impl Entity {
    /// Create a car entity with default placement and capabilities.
    pub fn new(
        id: impl Into<String>,
        display_name: impl Into<String>,
        asset_ref: impl Into<String>,
    ) -> Self {
        Self {
            id: EntityId::new(id),
            display_name: display_name.into(),
            asset_ref: asset_ref.into(),
            colorable_parts: BTreeSet::new(),
            placement: Placement::default(),
            capabilities: Capabilities::default(),
            headlights: Vec::new(),
            environment: None,
        }
    }

    /// Add a colorable part.
    #[must_use]
    pub fn with_part(mut self, part: impl Into<String>) -> Self {
        self.colorable_parts.insert(PartId::new(part));
        self
    }

    #[must_use]
    pub fn with_placement(mut self, placement: Placement) -> Self {
        self.placement = placement;
        self
    }

    #[must_use]
    pub fn with_capabilities(mut self, capabilities: Capabilities) -> Self {
        self.capabilities = capabilities;
        self
    }

    #[must_use]
    pub fn with_environment(mut self, environment: Environment) -> Self {
        self.environment = Some(environment);
        self
    }

    /// Returns true if this entity brings its own surroundings.
    #[must_use]
    pub fn is_scene(&self) -> bool {
        self.environment.is_some()
    }
}

// ============================================================================
// Registry
// ============================================================================

/// Ordered, non-empty, immutable collection of entities.
///
/// Cloning is cheap; clones share the same entities.
#[derive(Debug, Clone)]
pub struct Registry {
    entities: Arc<[Arc<Entity>]>,
}

impl Registry {
    /// Build a registry. Fails on an empty list or duplicate ids.
    pub fn new(entities: Vec<Entity>) -> Result<Self> {
        if entities.is_empty() {
            return Err(Error::catalog("the registry needs at least one entity"));
        }

        let mut seen = BTreeSet::new();
        for entity in &entities {
            if !seen.insert(&entity.id) {
                return Err(Error::catalog(format!(
                    "duplicate entity id '{}'",
                    entity.id
                )));
            }
        }

        Ok(Self {
            entities: entities.into_iter().map(Arc::new).collect(),
        })
    }

    /// Number of entities. Always at least one.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entities.len()
    }

    /// Always false; kept for API symmetry with `len`.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entities.is_empty()
    }

    /// Entity at `index`, if in range.
    #[must_use]
    pub fn get(&self, index: usize) -> Option<&Arc<Entity>> {
        self.entities.get(index)
    }

    /// Entity at `index`, or `OutOfRangeIndex`.
    pub fn try_get(&self, index: usize) -> Result<&Arc<Entity>> {
        self.entities.get(index).ok_or(Error::OutOfRangeIndex {
            index,
            len: self.len(),
        })
    }

    /// Index of the entity with the given id.
    #[must_use]
    pub fn position(&self, id: &EntityId) -> Option<usize> {
        self.entities.iter().position(|entity| &entity.id == id)
    }

    /// Entity with the given id.
    #[must_use]
    pub fn find(&self, id: &EntityId) -> Option<&Arc<Entity>> {
        self.position(id).and_then(|index| self.get(index))
    }

    pub fn iter(&self) -> impl Iterator<Item = &Arc<Entity>> {
        self.entities.iter()
    }
}

impl std::ops::Index<usize> for Registry {
    type Output = Arc<Entity>;

    fn index(&self, index: usize) -> &Self::Output {
        &self.entities[index]
    }
}
