//! Pinhole camera snapshot and per-raster-point ray generation.

use embrush_math::{Dir3, Point2, Point3, Vec3};

/// A ray in 3D space defined by origin and unit direction.
#[derive(Debug, Clone, Copy)]
pub struct Ray {
    /// Origin point of the ray (the camera position for stroke rays).
    pub origin: Point3,
    /// Unit direction of the ray.
    pub direction: Dir3,
}

impl Ray {
    /// Create a new ray from origin and direction.
    ///
    /// The direction will be normalized.
    pub fn new(origin: Point3, direction: Vec3) -> Self {
        Self {
            origin,
            direction: Dir3::new_normalize(direction),
        }
    }

    /// Evaluate the ray at parameter `t`: `origin + t * direction`.
    #[inline]
    pub fn at(&self, t: f64) -> Point3 {
        self.origin + t * self.direction.as_ref()
    }
}

/// Canvas dimensions in pixels.
#[derive(Debug, Clone, Copy)]
pub struct Viewport {
    /// Width in pixels.
    pub width: u32,
    /// Height in pixels.
    pub height: u32,
}

/// Value snapshot of the camera for one embedding call.
///
/// Recomputed per frame by the view layer; the embedding treats it as
/// immutable for the duration of one stroke. The basis is orthonormal
/// and right-handed with `w` pointing *backward*: the camera looks
/// along `-w`.
#[derive(Debug, Clone, Copy)]
pub struct CameraFrame {
    /// Camera position in world space.
    pub position: Point3,
    /// Basis vector along the raster x axis.
    pub u: Vec3,
    /// Basis vector along the raster y axis.
    pub v: Vec3,
    /// Basis vector opposite the view direction.
    pub w: Vec3,
    /// Vertical field of view in radians.
    pub fov_y: f64,
    /// Near clip distance.
    pub near: f64,
    /// Far clip distance.
    pub far: f64,
}

impl CameraFrame {
    /// Cast a world-space ray through a raster position.
    ///
    /// The raster origin is the bottom-left corner of the canvas. The
    /// camera-space sample point is
    ///
    /// ```text
    /// sx = -w/2 + x
    /// sy = -h/2 + y
    /// sz = -(h/2) / tan(fov_y / 2)
    /// ```
    ///
    /// and the world direction is `normalize(u*sx + v*sy + w*sz)`.
    /// Pure: identical inputs always yield the identical unit vector.
    pub fn cast_ray(&self, raster: &Point2, viewport: &Viewport) -> Ray {
        let w = viewport.width as f64;
        let h = viewport.height as f64;
        let sx = -w * 0.5 + raster.x;
        let sy = -h * 0.5 + raster.y;
        let sz = -(h * 0.5) / (self.fov_y * 0.5).tan();
        Ray::new(self.position, self.u * sx + self.v * sy + self.w * sz)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fixtures::downward_camera;
    use approx::assert_relative_eq;

    #[test]
    fn test_center_pixel_looks_forward() {
        let cam = downward_camera(100.0, 1000.0);
        let vp = Viewport {
            width: 100,
            height: 100,
        };
        let ray = cam.cast_ray(&Point2::new(50.0, 50.0), &vp);
        // The view direction is -w
        assert_relative_eq!(
            (ray.direction.into_inner() + cam.w).norm(),
            0.0,
            epsilon = 1e-12
        );
    }

    #[test]
    fn test_cast_ray_is_deterministic() {
        let cam = downward_camera(50.0, 1000.0);
        let vp = Viewport {
            width: 640,
            height: 480,
        };
        let p = Point2::new(123.0, 456.0);
        let a = cam.cast_ray(&p, &vp);
        let b = cam.cast_ray(&p, &vp);
        assert_eq!(a.direction.into_inner(), b.direction.into_inner());
        assert_eq!(a.origin, b.origin);
    }

    #[test]
    fn test_offset_pixel_direction() {
        // fov 90 deg, square viewport: a pixel at the vertical edge of
        // the canvas makes a 45 degree angle with the view axis.
        let cam = downward_camera(10.0, 1000.0);
        let vp = Viewport {
            width: 100,
            height: 100,
        };
        let ray = cam.cast_ray(&Point2::new(50.0, 100.0), &vp);
        let cosine = ray.direction.dot(&-cam.w);
        assert_relative_eq!(cosine, (2.0f64).sqrt() / 2.0, epsilon = 1e-12);
    }

    #[test]
    fn test_ray_at() {
        let ray = Ray::new(Point3::new(1.0, 2.0, 3.0), Vec3::new(0.0, 0.0, 2.0));
        let p = ray.at(4.0);
        assert_relative_eq!((p - Point3::new(1.0, 2.0, 7.0)).norm(), 0.0, epsilon = 1e-12);
    }
}
