//! Timed easing shared by the camera and drive animations.

/// Smoother step interpolation (Ken Perlin's improved version).
///
/// Has zero first and second derivative at both endpoints.
pub fn smootherstep(t: f32) -> f32 {
    let t = t.clamp(0.0, 1.0);
    t * t * t * (t * (t * 6.0 - 15.0) + 10.0)
}

/// Progress through a fixed-length animation.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Tween {
    elapsed: f32,
    duration: f32,
}

impl Tween {
    pub fn new(duration_secs: f32) -> Self {
        Self {
            elapsed: 0.0,
            duration: duration_secs.max(0.0),
        }
    }

    /// Advance by `dt` seconds and return the eased progress in `[0, 1]`.
    pub fn advance(&mut self, dt: f32) -> f32 {
        self.elapsed += dt;
        self.eased()
    }

    /// Eased progress without advancing.
    pub fn eased(&self) -> f32 {
        if self.duration <= 0.0 {
            return 1.0;
        }
        smootherstep(self.elapsed / self.duration)
    }

    pub fn is_finished(&self) -> bool {
        self.elapsed >= self.duration
    }
}
