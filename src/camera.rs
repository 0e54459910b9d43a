use crate::point::Point3;
use crate::ray::Ray;
use crate::utils;
use crate::vector::Vector3;

use serde::Deserialize;
use std::convert;

#[derive(Deserialize)]
#[serde(from = "CameraDescription")]
pub struct Camera {
    origin: Point3,
    lower_left_corner: Point3,
    horizontal: Vector3,
    vertical: Vector3,
    u: Vector3,
    v: Vector3,
    lens_radius: f64,
}

// The scene-file-facing shape of a camera: the eye position, look-at
// target, and lens parameters a scene author actually writes, rather than
// the precomputed basis Camera renders with.
#[derive(Deserialize)]
struct CameraDescription {
    pos: Point3,
    look_at: Point3,
    up: Vector3,
    vertical_fov: f64,
    aspect: f64,
    aperture: f64,
    focus_dist: f64,
}

impl convert::From<CameraDescription> for Camera {
    fn from(d: CameraDescription) -> Camera {
        Camera::new(
            &d.pos,
            &d.look_at,
            &d.up,
            d.vertical_fov,
            d.aspect,
            d.aperture,
            d.focus_dist,
        )
    }
}

impl Camera {
    pub fn new(
        pos: &Point3,
        look_at: &Point3,
        up: &Vector3,
        vertical_fov: f64,
        aspect: f64,
        aperture: f64,
        focus_dist: f64,
    ) -> Camera {
        let theta = vertical_fov * (std::f64::consts::PI / 180.0_f64);
        let half_height = (theta / 2.0_f64).tan();
        let half_width = aspect * half_height;

        let w = (*pos - *look_at).normalized();
        let u = up.cross(w).normalized();
        let v = w.cross(u);

        Camera {
            origin: *pos,
            lower_left_corner: *pos
                - (half_width * focus_dist * u)
                - (half_height * focus_dist * v)
                - (w * focus_dist),
            horizontal: 2.0_f64 * half_width * focus_dist * u,
            vertical: 2.0_f64 * half_height * focus_dist * v,
            u: u,
            v: v,
            lens_radius: aperture / 2.0_f64,
        }
    }

    pub fn get_ray(&self, s: f64, t: f64) -> Ray {
        let ray_disk = self.lens_radius * utils::random_unit_disk();
        let offset = self.u * ray_disk.x() + self.v * ray_disk.y();

        Ray::new(
            self.origin + offset,
            self.lower_left_corner + (self.horizontal * s) + (self.vertical * t)
                - self.origin
                - offset,
        )
    }
}

#[cfg(test)]
mod camera_tests {
    use super::*;

    #[test]
    fn get_ray_originates_at_the_camera_position_with_zero_aperture() {
        let cam = Camera::new(
            &Point3::new(0.0, 0.0, 0.0),
            &Point3::new(0.0, 0.0, -1.0),
            &Vector3::new(0.0, 1.0, 0.0),
            90.0,
            1.0,
            0.0,
            1.0,
        );
        let r = cam.get_ray(0.5, 0.5);
        assert_eq!(r.origin.x(), 0.0);
        assert_eq!(r.origin.y(), 0.0);
        assert_eq!(r.origin.z(), 0.0);
    }

    #[test]
    fn a_centered_ray_points_roughly_towards_the_look_at_direction() {
        let cam = Camera::new(
            &Point3::new(0.0, 0.0, 0.0),
            &Point3::new(0.0, 0.0, -5.0),
            &Vector3::new(0.0, 1.0, 0.0),
            90.0,
            1.0,
            0.0,
            1.0,
        );
        let r = cam.get_ray(0.5, 0.5);
        let dir = r.dir.normalized();
        assert!(dir.z() < 0.0);
        assert!(dir.x().abs() < 1e-6);
        assert!(dir.y().abs() < 1e-6);
    }
}
