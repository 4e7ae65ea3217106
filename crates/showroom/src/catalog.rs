//! Catalog configuration.
//!
//! A catalog lists the entities on show, the layout they are shown in and the
//! paint swatches on offer. Catalogs are written in TOML:
//!
//! ```toml
//! layout = "carousel"
//! palette = ["rgb(30, 30, 30)", "#c80000"]
//!
//! [[entities]]
//! id = "corvette-c7"
//! name = "Chevrolet Corvette C7"
//! asset = "models/chevrolet_corvette_c7.glb"
//! parts = ["CarBody_1_Car_Paint_0_1"]
//! scale = [0.5, 0.5, 0.5]
//! rotation = [0.0, 1.5707964, 0.0]
//! ```
//!
//! Two catalogs are built in: [`Catalog::carousel`] and [`Catalog::scenes`].

use std::{f32::consts::FRAC_PI_2, path::Path};

use glam::Vec3;
use serde::Deserialize;

use crate::{
    error::{Error, Result},
    paint::{DEFAULT_PALETTE, Rgb},
    registry::{
        Capabilities, Entity, EntityId, Environment, Fog, Headlight, Placement, PointLightSpec,
        Registry,
    },
    stage::Layout,
};

/// A validated catalog, ready to drive a showroom.
#[derive(Debug, Clone)]
pub struct Catalog {
    pub layout: Layout,
    pub palette: Vec<Rgb>,
    pub registry: Registry,
}

impl Catalog {
    /// Read and validate a TOML catalog file.
    pub fn load_from_path(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path).map_err(|source| Error::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let catalog = Self::parse(&text)?;
        tracing::info!(
            "Loaded catalog {} ({} entities, {:?} layout)",
            path.display(),
            catalog.registry.len(),
            catalog.layout
        );
        Ok(catalog)
    }

    /// Parse and validate a TOML catalog.
    pub fn parse(text: &str) -> Result<Self> {
        toml::from_str::<CatalogConfig>(text)?.build()
    }

    /// Built-in catalog for a layout.
    pub fn builtin(layout: Layout) -> Result<Self> {
        match layout {
            Layout::Carousel => Self::carousel(),
            Layout::Scenes => Self::scenes(),
        }
    }

    /// Three cars parked on a circle.
    pub fn carousel() -> Result<Self> {
        let entities = vec![corvette(0.5), lotus_elise(), bmw_m4(1.0)];
        Self::from_builtin(Layout::Carousel, entities)
    }

    /// Two themed scenes, each with its own car.
    pub fn scenes() -> Result<Self> {
        let mut horror_car = corvette(0.7);
        horror_car.id = EntityId::new("horror-scene");
        horror_car.display_name = "Horror".to_string();
        horror_car.placement.position = Vec3::new(0.0, -0.1, 0.0);
        horror_car.capabilities.headlights = true;
        horror_car.headlights = vec![
            Headlight {
                position: Vec3::new(1.9, 0.6, 0.55),
                target: Vec3::new(10.0, 0.0, 0.55),
            },
            Headlight {
                position: Vec3::new(1.9, 0.6, -0.55),
                target: Vec3::new(10.0, 0.0, -0.55),
            },
        ];
        let horror = horror_car.with_environment(Environment {
            asset_ref: "scenes/horror-scene.gltf".to_string(),
            fog: Fog {
                color: Rgb::new(220, 35, 0),
                near: 3.0,
                far: 35.0,
            },
            lights: vec![
                point_light(Rgb::new(0xff, 0x24, 0x24), 15.0, Vec3::new(10.0, 8.0, 0.0)),
                point_light(Rgb::new(0xff, 0x4b, 0x24), 8.0, Vec3::new(4.0, 8.0, 0.0)),
                point_light(Rgb::new(0xff, 0x4b, 0x24), 8.0, Vec3::new(8.0, 8.0, 0.0)),
            ],
            scale: Vec3::ONE,
            yaw: 0.0,
        });

        let mut scifi_car = bmw_m4(1.2);
        scifi_car.id = EntityId::new("scifi-scene");
        scifi_car.display_name = "Sci-fi".to_string();
        let white = Rgb::new(255, 255, 255);
        let scifi = scifi_car.with_environment(Environment {
            asset_ref: "scenes/scifi-scene.gltf".to_string(),
            fog: Fog {
                color: Rgb::new(0, 170, 220),
                near: 2.0,
                far: 45.0,
            },
            lights: vec![
                point_light(white, 50.0, Vec3::new(-15.0, 5.0, 0.0)),
                point_light(white, 50.0, Vec3::new(0.0, 5.0, 0.0)),
                point_light(white, 50.0, Vec3::new(15.0, 5.0, 0.0)),
            ],
            scale: Vec3::new(2.0, 1.0, 2.0),
            yaw: FRAC_PI_2,
        });

        Self::from_builtin(Layout::Scenes, vec![horror, scifi])
    }

    fn from_builtin(layout: Layout, entities: Vec<Entity>) -> Result<Self> {
        Ok(Self {
            layout,
            palette: DEFAULT_PALETTE.to_vec(),
            registry: Registry::new(entities)?,
        })
    }
}

fn corvette(scale: f32) -> Entity {
    Entity::new(
        "corvette-c7",
        "Chevrolet Corvette C7",
        "models/chevrolet_corvette_c7.glb",
    )
    .with_part("CarBody_1_Car_Paint_0_1")
    .with_placement(Placement {
        scale: Vec3::splat(scale),
        rotation: Vec3::new(0.0, FRAC_PI_2, 0.0),
        ..Placement::default()
    })
}

fn lotus_elise() -> Entity {
    Entity::new("lotus-elise", "Loctus Elise", "models/loctus_elise.glb")
        .with_part("LOTUS-def3Layer1_CARcarros_0")
        .with_placement(Placement {
            scale: Vec3::splat(0.8),
            rotation: Vec3::new(0.0, -FRAC_PI_2, 0.0),
            ..Placement::default()
        })
}

fn bmw_m4(scale: f32) -> Entity {
    Entity::new("bmw-m4-csl", "BMW M4 CSL 2023", "models/bmw_m4_csl_2023.glb")
        .with_part("M4xNME_fender_L_M4xNME_Paint_0")
        .with_part("M4xNME_body_M4xNME_Paint_0")
        .with_placement(Placement {
            scale: Vec3::splat(scale),
            rotation: Vec3::new(0.0, FRAC_PI_2, 0.0),
            ..Placement::default()
        })
}

fn point_light(color: Rgb, intensity: f32, position: Vec3) -> PointLightSpec {
    PointLightSpec {
        color,
        intensity,
        range: 100.0,
        position,
    }
}

// ============================================================================
// File format
// ============================================================================

/// Catalog file contents, before validation.
#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct CatalogConfig {
    #[serde(default)]
    pub layout: Layout,
    /// Color strings; the default swatches are used when empty.
    #[serde(default)]
    pub palette: Vec<String>,
    pub entities: Vec<EntityConfig>,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct EntityConfig {
    pub id: String,
    pub name: String,
    pub asset: String,
    #[serde(default)]
    pub parts: Vec<String>,
    #[serde(default)]
    pub position: [f32; 3],
    #[serde(default = "unit_scale")]
    pub scale: [f32; 3],
    #[serde(default)]
    pub rotation: [f32; 3],
    #[serde(default)]
    pub capabilities: CapabilitiesConfig,
    #[serde(default)]
    pub headlights: Vec<HeadlightConfig>,
    pub environment: Option<EnvironmentConfig>,
}

fn unit_scale() -> [f32; 3] {
    [1.0; 3]
}

#[derive(Debug, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct CapabilitiesConfig {
    pub colorable: bool,
    pub textured: bool,
    pub headlights: bool,
}

impl Default for CapabilitiesConfig {
    fn default() -> Self {
        let defaults = Capabilities::default();
        Self {
            colorable: defaults.colorable,
            textured: defaults.textured,
            headlights: defaults.headlights,
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct HeadlightConfig {
    pub position: [f32; 3],
    pub target: [f32; 3],
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct EnvironmentConfig {
    pub asset: String,
    pub fog: FogConfig,
    #[serde(default)]
    pub lights: Vec<LightConfig>,
    #[serde(default = "unit_scale")]
    pub scale: [f32; 3],
    #[serde(default)]
    pub yaw: f32,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct FogConfig {
    pub color: String,
    pub near: f32,
    pub far: f32,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct LightConfig {
    pub color: String,
    pub intensity: f32,
    #[serde(default = "default_light_range")]
    pub range: f32,
    pub position: [f32; 3],
}

fn default_light_range() -> f32 {
    100.0
}

impl CatalogConfig {
    /// Validate and convert into a [`Catalog`].
    pub fn build(self) -> Result<Catalog> {
        let palette = if self.palette.is_empty() {
            DEFAULT_PALETTE.to_vec()
        } else {
            self.palette
                .iter()
                .map(String::as_str)
                .map(Rgb::parse)
                .collect::<Result<Vec<_>>>()?
        };

        let entities = self
            .entities
            .into_iter()
            .map(EntityConfig::build)
            .collect::<Result<Vec<_>>>()?;

        Ok(Catalog {
            layout: self.layout,
            palette,
            registry: Registry::new(entities)?,
        })
    }
}

/// A finite vector, or a catalog error naming `what`.
fn finite_vec3(values: [f32; 3], id: &str, what: &str) -> Result<Vec3> {
    let vector = Vec3::from_array(values);
    if vector.is_finite() {
        Ok(vector)
    } else {
        Err(Error::catalog(format!("entity '{id}' has a non-finite {what}")))
    }
}

impl EntityConfig {
    fn build(self) -> Result<Entity> {
        if self.id.trim().is_empty() {
            return Err(Error::catalog("entity ids must not be empty"));
        }
        if self.asset.trim().is_empty() {
            return Err(Error::catalog(format!("entity '{}' has no asset", self.id)));
        }
        let scale = Vec3::from_array(self.scale);
        if !scale.is_finite() || scale.min_element() <= 0.0 {
            return Err(Error::catalog(format!(
                "entity '{}' has a non-positive scale",
                self.id
            )));
        }

        let position = finite_vec3(self.position, &self.id, "position")?;
        let rotation = finite_vec3(self.rotation, &self.id, "rotation")?;
        let headlights = self
            .headlights
            .iter()
            .map(|headlight| {
                let position = finite_vec3(headlight.position, &self.id, "headlight position")?;
                let target = finite_vec3(headlight.target, &self.id, "headlight target")?;
                Ok(Headlight { position, target })
            })
            .collect::<Result<Vec<_>>>()?;

        let environment = self
            .environment
            .map(|environment| environment.build(&self.id))
            .transpose()?;

        let mut entity = Entity::new(self.id, self.name, self.asset)
            .with_placement(Placement {
                position,
                scale,
                rotation,
            })
            .with_capabilities(Capabilities {
                colorable: self.capabilities.colorable,
                textured: self.capabilities.textured,
                headlights: self.capabilities.headlights,
            });
        for part in self.parts {
            entity = entity.with_part(part);
        }
        entity.headlights = headlights;
        entity.environment = environment;
        Ok(entity)
    }
}

impl EnvironmentConfig {
    fn build(self, id: &str) -> Result<Environment> {
        let fog_ok =
            self.fog.near >= 0.0 && self.fog.near < self.fog.far && self.fog.far.is_finite();
        if !fog_ok {
            return Err(Error::catalog(format!(
                "entity '{id}' fog needs 0 <= near < far"
            )));
        }
        let lights = self
            .lights
            .iter()
            .map(|light| {
                let intensity_ok = light.intensity >= 0.0 && light.intensity.is_finite();
                let range_ok = light.range > 0.0 && light.range.is_finite();
                if !(intensity_ok && range_ok) {
                    return Err(Error::catalog(format!(
                        "entity '{id}' has a light with a bad intensity or range"
                    )));
                }
                Ok(PointLightSpec {
                    color: Rgb::parse(&light.color)?,
                    intensity: light.intensity,
                    range: light.range,
                    position: finite_vec3(light.position, id, "light position")?,
                })
            })
            .collect::<Result<Vec<_>>>()?;

        let scale = Vec3::from_array(self.scale);
        if !scale.is_finite() || scale.min_element() <= 0.0 {
            return Err(Error::catalog(format!(
                "entity '{id}' has a non-positive scene scale"
            )));
        }
        if !self.yaw.is_finite() {
            return Err(Error::catalog(format!("entity '{id}' has a non-finite yaw")));
        }

        Ok(Environment {
            asset_ref: self.asset,
            fog: Fog {
                color: Rgb::parse(&self.fog.color)?,
                near: self.fog.near,
                far: self.fog.far,
            },
            lights,
            scale,
            yaw: self.yaw,
        })
    }
}

#[cfg(test)]
mod tests {
    use std::io::Write;

    use super::*;
    use crate::registry::{EntityId, PartId};

    const SCENES_TOML: &str = r##"
layout = "scenes"
palette = ["rgb(30, 30, 30)", "#c80000"]

[[entities]]
id = "horror"
name = "Horror"
asset = "models/chevrolet_corvette_c7.glb"
parts = ["CarBody_1_Car_Paint_0_1"]
position = [0.0, -0.1, 0.0]
scale = [0.7, 0.7, 0.7]
capabilities = { textured = false, headlights = true }
headlights = [{ position = [1.9, 0.6, 0.5], target = [10.0, 0.0, 0.5] }]

[entities.environment]
asset = "scenes/horror-scene.gltf"
fog = { color = "rgb(220, 35, 0)", near = 3.0, far = 35.0 }
lights = [{ color = "#FF2424", intensity = 15.0, position = [10.0, 8.0, 0.0] }]
"##;

    #[test]
    fn test_parse_scenes_catalog() {
        let catalog = Catalog::parse(SCENES_TOML).unwrap();

        assert_eq!(catalog.layout, Layout::Scenes);
        assert_eq!(catalog.palette, [Rgb::new(30, 30, 30), Rgb::new(200, 0, 0)]);

        let entity = &catalog.registry[0];
        assert_eq!(entity.id, EntityId::new("horror"));
        assert!(
            entity
                .colorable_parts
                .contains(&PartId::new("CarBody_1_Car_Paint_0_1"))
        );
        assert_eq!(entity.placement.position, Vec3::new(0.0, -0.1, 0.0));
        assert!(entity.capabilities.colorable);
        assert!(!entity.capabilities.textured);
        assert!(entity.capabilities.headlights);
        assert_eq!(entity.headlights.len(), 1);

        let environment = entity.environment.as_ref().unwrap();
        assert_eq!(environment.fog.color, Rgb::new(220, 35, 0));
        assert_eq!(environment.lights[0].color, Rgb::new(255, 36, 36));
        assert!((environment.lights[0].range - 100.0).abs() < f32::EPSILON);
        assert_eq!(environment.scale, Vec3::ONE);
    }

    #[test]
    fn test_defaults_when_omitted() {
        let catalog = Catalog::parse(
            r#"
[[entities]]
id = "plain"
name = "Plain"
asset = "models/plain.glb"
"#,
        )
        .unwrap();

        assert_eq!(catalog.layout, Layout::Carousel);
        assert_eq!(catalog.palette, DEFAULT_PALETTE);
        let entity = &catalog.registry[0];
        assert_eq!(entity.placement, Placement::default());
        assert_eq!(entity.capabilities, Capabilities::default());
        assert!(entity.environment.is_none());
    }

    #[test]
    fn test_rejects_empty_catalog() {
        assert!(matches!(
            Catalog::parse("entities = []"),
            Err(Error::Catalog { .. })
        ));
    }

    #[test]
    fn test_rejects_bad_values() {
        let bad_scale = r#"
[[entities]]
id = "a"
name = "A"
asset = "models/a.glb"
scale = [1.0, 0.0, 1.0]
"#;
        assert!(matches!(Catalog::parse(bad_scale), Err(Error::Catalog { .. })));

        let bad_fog = r#"
[[entities]]
id = "a"
name = "A"
asset = "models/a.glb"
[entities.environment]
asset = "scenes/a.gltf"
fog = { color = "rgb(0, 0, 0)", near = 10.0, far = 5.0 }
"#;
        assert!(matches!(Catalog::parse(bad_fog), Err(Error::Catalog { .. })));

        let bad_color = r#"
palette = ["mauve"]
[[entities]]
id = "a"
name = "A"
asset = "models/a.glb"
"#;
        assert!(matches!(
            Catalog::parse(bad_color),
            Err(Error::InvalidColorInput { .. })
        ));

        let unknown_field = r#"
[[entities]]
id = "a"
name = "A"
asset = "models/a.glb"
colour = "red"
"#;
        assert!(matches!(
            Catalog::parse(unknown_field),
            Err(Error::Catalog { .. })
        ));
    }

    #[test]
    fn test_rejects_non_finite_values() {
        let bad_position = r#"
[[entities]]
id = "a"
name = "A"
asset = "models/a.glb"
position = [inf, 0.0, 0.0]
"#;
        assert!(matches!(
            Catalog::parse(bad_position),
            Err(Error::Catalog { .. })
        ));

        let bad_headlight = r#"
[[entities]]
id = "a"
name = "A"
asset = "models/a.glb"
headlights = [{ position = [0.0, nan, 0.0], target = [1.0, 0.0, 0.0] }]
"#;
        assert!(matches!(
            Catalog::parse(bad_headlight),
            Err(Error::Catalog { .. })
        ));

        let light = |fields: &str| {
            format!(
                r#"
[[entities]]
id = "a"
name = "A"
asset = "models/a.glb"
[entities.environment]
asset = "scenes/a.gltf"
fog = {{ color = "rgb(0, 0, 0)", near = 1.0, far = 5.0 }}
lights = [{{ color = "rgb(255, 255, 255)", {fields} }}]
"#
            )
        };
        for fields in [
            "intensity = nan, position = [0.0, 1.0, 0.0]",
            "intensity = inf, position = [0.0, 1.0, 0.0]",
            "intensity = 1.0, range = inf, position = [0.0, 1.0, 0.0]",
            "intensity = 1.0, range = nan, position = [0.0, 1.0, 0.0]",
            "intensity = 1.0, position = [0.0, -inf, 0.0]",
        ] {
            assert!(
                matches!(Catalog::parse(&light(fields)), Err(Error::Catalog { .. })),
                "accepted {fields}"
            );
        }
        assert!(Catalog::parse(&light("intensity = 1.0, position = [0.0, 1.0, 0.0]")).is_ok());

        let bad_fog = r#"
[[entities]]
id = "a"
name = "A"
asset = "models/a.glb"
[entities.environment]
asset = "scenes/a.gltf"
fog = { color = "rgb(0, 0, 0)", near = 1.0, far = inf }
"#;
        assert!(matches!(Catalog::parse(bad_fog), Err(Error::Catalog { .. })));

        let bad_yaw = r#"
[[entities]]
id = "a"
name = "A"
asset = "models/a.glb"
[entities.environment]
asset = "scenes/a.gltf"
fog = { color = "rgb(0, 0, 0)", near = 1.0, far = 5.0 }
yaw = nan
"#;
        assert!(matches!(Catalog::parse(bad_yaw), Err(Error::Catalog { .. })));
    }

    #[test]
    fn test_load_from_path() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("catalog.toml");
        let mut file = std::fs::File::create(&path).unwrap();
        file.write_all(SCENES_TOML.as_bytes()).unwrap();

        let catalog = Catalog::load_from_path(&path).unwrap();
        assert_eq!(catalog.registry.len(), 1);
    }

    #[test]
    fn test_load_missing_file() {
        let dir = tempfile::tempdir().unwrap();
        let result = Catalog::load_from_path(&dir.path().join("missing.toml"));
        assert!(matches!(result, Err(Error::Io { .. })));
    }

    #[test]
    fn test_builtin_catalogs() {
        let carousel = Catalog::builtin(Layout::Carousel).unwrap();
        assert_eq!(carousel.layout, Layout::Carousel);
        let names: Vec<_> = carousel
            .registry
            .iter()
            .map(|e| e.display_name.as_str())
            .collect();
        assert_eq!(names, ["Chevrolet Corvette C7", "Loctus Elise", "BMW M4 CSL 2023"]);
        assert!(carousel.registry.iter().all(|e| !e.is_scene()));
        assert_eq!(carousel.registry[2].colorable_parts.len(), 2);

        let scenes = Catalog::builtin(Layout::Scenes).unwrap();
        assert_eq!(scenes.layout, Layout::Scenes);
        assert_eq!(scenes.registry.len(), 2);
        assert!(scenes.registry.iter().all(|e| e.is_scene()));
        let scifi = scenes.registry[1].environment.as_ref().unwrap();
        assert_eq!(scifi.scale, Vec3::new(2.0, 1.0, 2.0));
        assert_eq!(scifi.lights.len(), 3);
    }
}
