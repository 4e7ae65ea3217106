//! Placement helpers for laying out several cars at once.

use glam::{Vec2, Vec3};

/// Radius of the circle cars are parked on in the carousel layout.
pub const CAROUSEL_RADIUS: f32 = 20.0;

/// Evenly spaced points on a horizontal circle.
///
/// `center` is in the ground plane (x, z). The first point sits on the +X
/// axis and the rest follow counter-clockwise when viewed from above. All
/// points have y = 0.
#[must_use]
pub fn points_on_circle(center: Vec2, radius: f32, count: usize) -> Vec<Vec3> {
    if count == 0 {
        return Vec::new();
    }

    #[allow(clippy::cast_precision_loss)]
    let step = std::f32::consts::TAU / count as f32;
    (0..count)
        .map(|i| {
            #[allow(clippy::cast_precision_loss)]
            let angle = i as f32 * step;
            Vec3::new(
                center.x + radius * angle.cos(),
                0.0,
                center.y + radius * angle.sin(),
            )
        })
        .collect()
}
