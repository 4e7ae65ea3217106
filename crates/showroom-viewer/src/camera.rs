//! Orbit camera.
//!
//! The camera circles a focus point. Dragging orbits, scrolling zooms within
//! [`MIN_DISTANCE`]..=[`MAX_DISTANCE`], and the elevation is kept above the
//! ground plane. Stage moves fly the camera to a new framing with a
//! smootherstep ease; user input is ignored while a flight is running.

use std::f32::consts::{PI, TAU};

use bevy::prelude::*;
use leafwing_input_manager::prelude::*;
use showroom::Framing;

use crate::{input::ShowroomAction, tween::Tween};

// ============================================================================
// Constants
// ============================================================================

/// Closest the camera may get to its focus, in meters.
pub const MIN_DISTANCE: f32 = 5.0;
/// Farthest the camera may get from its focus, in meters.
pub const MAX_DISTANCE: f32 = 7.0;
/// Lowest elevation above the horizon, in radians.
pub const MIN_ELEVATION: f32 = 0.1;
/// Highest elevation above the horizon, in radians.
pub const MAX_ELEVATION: f32 = 1.4;

/// Radians of orbit per pixel of mouse motion.
const ORBIT_SENSITIVITY: f32 = 0.005;
/// Meters of zoom per scroll line.
const ZOOM_STEP: f32 = 0.25;

// ============================================================================
// Plugin
// ============================================================================

/// Plugin for the orbit camera.
pub struct OrbitCameraPlugin;

impl Plugin for OrbitCameraPlugin {
    fn build(&self, app: &mut App) {
        app.init_resource::<CameraFlights>().add_systems(
            Update,
            (start_flights, fly_camera, orbit_input, sync_camera_transform).chain(),
        );
    }
}

// ============================================================================
// Orbit state
// ============================================================================

/// Spherical camera position around a focus point.
#[derive(Component, Debug, Clone, Copy, PartialEq)]
pub struct OrbitCamera {
    pub focus: Vec3,
    /// Angle around the vertical axis, measured from +Z towards +X.
    pub yaw: f32,
    /// Angle above the horizontal plane.
    pub elevation: f32,
    pub distance: f32,
}

impl OrbitCamera {
    /// Frame `target` from `offset`, clamped to the orbit limits.
    pub fn framing(target: Vec3, offset: Vec3) -> Self {
        let distance = offset.length().max(f32::EPSILON);
        Self {
            focus: target,
            yaw: offset.x.atan2(offset.z),
            elevation: (offset.y / distance)
                .asin()
                .clamp(MIN_ELEVATION, MAX_ELEVATION),
            distance: distance.clamp(MIN_DISTANCE, MAX_DISTANCE),
        }
    }

    /// World-space camera position.
    pub fn translation(&self) -> Vec3 {
        let (sin_yaw, cos_yaw) = self.yaw.sin_cos();
        let (sin_elev, cos_elev) = self.elevation.sin_cos();
        self.focus + self.distance * Vec3::new(cos_elev * sin_yaw, sin_elev, cos_elev * cos_yaw)
    }

    pub fn transform(&self) -> Transform {
        Transform::from_translation(self.translation()).looking_at(self.focus, Vec3::Y)
    }

    /// Interpolate towards `other`, turning the short way round.
    pub fn lerp(&self, other: &Self, t: f32) -> Self {
        let mut yaw_delta = (other.yaw - self.yaw).rem_euclid(TAU);
        if yaw_delta > PI {
            yaw_delta -= TAU;
        }
        Self {
            focus: self.focus.lerp(other.focus, t),
            yaw: self.yaw + yaw_delta * t,
            elevation: self.elevation + (other.elevation - self.elevation) * t,
            distance: self.distance + (other.distance - self.distance) * t,
        }
    }

    fn orbit(&mut self, delta: Vec2) {
        self.yaw = (self.yaw - delta.x * ORBIT_SENSITIVITY).rem_euclid(TAU);
        self.elevation =
            (self.elevation + delta.y * ORBIT_SENSITIVITY).clamp(MIN_ELEVATION, MAX_ELEVATION);
    }

    fn zoom(&mut self, lines: f32) {
        self.distance = (self.distance - lines * ZOOM_STEP).clamp(MIN_DISTANCE, MAX_DISTANCE);
    }
}

// ============================================================================
// Flights
// ============================================================================

/// Pending camera moves.
///
/// Only the latest request matters; it replaces any flight in progress.
#[derive(Resource, Default)]
pub struct CameraFlights {
    pending: Option<FlightRequest>,
}

#[derive(Debug, Clone, Copy)]
struct FlightRequest {
    target: Vec3,
    framing: Framing,
    duration_secs: f32,
}

impl CameraFlights {
    /// Request a flight to frame `target`. A zero duration snaps.
    pub fn request(&mut self, target: Vec3, framing: Framing, duration_secs: f32) {
        self.pending = Some(FlightRequest {
            target,
            framing,
            duration_secs,
        });
    }
}

/// An in-progress camera flight.
#[derive(Component, Debug)]
struct CameraFlight {
    from: OrbitCamera,
    to: OrbitCamera,
    tween: Tween,
}

fn start_flights(
    mut commands: Commands,
    mut flights: ResMut<CameraFlights>,
    query: Query<(Entity, &OrbitCamera)>,
) {
    let Some(request) = flights.pending.take() else {
        return;
    };
    let Ok((entity, orbit)) = query.single() else {
        return;
    };

    let to = OrbitCamera::framing(request.target, request.framing.offset());
    commands.entity(entity).insert(CameraFlight {
        from: *orbit,
        to,
        tween: Tween::new(request.duration_secs),
    });
}

fn fly_camera(
    mut commands: Commands,
    time: Res<Time>,
    mut query: Query<(Entity, &mut OrbitCamera, &mut CameraFlight)>,
) {
    for (entity, mut orbit, mut flight) in &mut query {
        let t = flight.tween.advance(time.delta_secs());
        *orbit = flight.from.lerp(&flight.to, t);
        if flight.tween.is_finished() {
            commands.entity(entity).remove::<CameraFlight>();
        }
    }
}

// ============================================================================
// User input
// ============================================================================

/// Orbit with a mouse drag and zoom with the wheel.
fn orbit_input(
    mut query: Query<(&mut OrbitCamera, &ActionState<ShowroomAction>), Without<CameraFlight>>,
) {
    let Ok((mut orbit, action_state)) = query.single_mut() else {
        return;
    };

    if action_state.pressed(&ShowroomAction::Drag) {
        let delta = action_state.axis_pair(&ShowroomAction::Orbit);
        if delta != Vec2::ZERO {
            orbit.orbit(delta);
        }
    }

    let zoom = action_state.value(&ShowroomAction::Zoom);
    if zoom != 0.0 {
        orbit.zoom(zoom);
    }
}

fn sync_camera_transform(mut query: Query<(&OrbitCamera, &mut Transform), Changed<OrbitCamera>>) {
    for (orbit, mut transform) in &mut query {
        *transform = orbit.transform();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_framing_keeps_direction_and_clamps_distance() {
        let target = Vec3::new(20.0, 0.0, 0.0);
        let offset = Vec3::new(5.0, 5.0, 6.0);
        let orbit = OrbitCamera::framing(target, offset);

        assert!((orbit.distance - MAX_DISTANCE).abs() < f32::EPSILON);
        let direction = (orbit.translation() - target).normalize();
        assert!((direction - offset.normalize()).length() < 1e-5);
    }

    #[test]
    fn test_framing_stays_above_ground() {
        let orbit = OrbitCamera::framing(Vec3::ZERO, Vec3::new(6.0, -2.0, 0.0));
        assert!((orbit.elevation - MIN_ELEVATION).abs() < f32::EPSILON);
        assert!(orbit.translation().y > 0.0);
    }

    #[test]
    fn test_lerp_turns_short_way() {
        let a = OrbitCamera {
            focus: Vec3::ZERO,
            yaw: 0.1,
            elevation: 0.5,
            distance: 6.0,
        };
        let b = OrbitCamera {
            yaw: TAU - 0.1,
            ..a
        };
        let mid = a.lerp(&b, 0.5);
        assert!(mid.yaw.abs() < 1e-5);
        assert_eq!(a.lerp(&b, 0.0), a);
    }

    #[test]
    fn test_orbit_and_zoom_respect_limits() {
        let mut orbit = OrbitCamera::framing(Vec3::ZERO, Vec3::new(0.0, 3.0, 5.0));
        orbit.orbit(Vec2::new(0.0, 10_000.0));
        assert!((orbit.elevation - MAX_ELEVATION).abs() < f32::EPSILON);
        orbit.orbit(Vec2::new(0.0, -10_000.0));
        assert!((orbit.elevation - MIN_ELEVATION).abs() < f32::EPSILON);

        orbit.zoom(100.0);
        assert!((orbit.distance - MIN_DISTANCE).abs() < f32::EPSILON);
        orbit.zoom(-100.0);
        assert!((orbit.distance - MAX_DISTANCE).abs() < f32::EPSILON);
    }
}
