use crate::color::RGB;
use crate::point::Point3;
use crate::utils;
use crate::vector::Vector3;

use std::f64;

// sample_l(p) returns (incident radiance, direction toward the light in
// world space, distance to the sample point, sampling pdf).
pub enum Light {
    Point(PointLight),
    Directional(DirectionalLight),
    DiffuseArea(DiffuseAreaLight),
}

pub struct PointLight {
    pub position: Point3,
    pub intensity: RGB,
}

pub struct DirectionalLight {
    pub direction: Vector3, // points from the scene towards the light
    pub radiance: RGB,
}

pub struct DiffuseAreaLight {
    pub position: Point3,
    pub radius: f64,
    pub radiance: RGB,
}

impl Light {
    pub fn sample_l(&self, p: &Point3) -> (RGB, Vector3, f64, f64) {
        match self {
            Light::Point(l) => {
                let to_light = l.position - *p;
                let dist = to_light.length();
                let dir = to_light / dist;
                let falloff = dist * dist;
                (l.intensity / utils::float_max(falloff, 1e-9_f64), dir, dist, 1.0_f64)
            }
            Light::Directional(l) => (l.radiance, l.direction, f64::MAX, 1.0_f64),
            Light::DiffuseArea(l) => l.sample_l(p),
        }
    }

    pub fn is_delta_light(&self) -> bool {
        match self {
            Light::Point(_) => true,
            Light::Directional(_) => true,
            Light::DiffuseArea(_) => false,
        }
    }
}

impl DiffuseAreaLight {
    // Samples the solid angle subtended by the light's bounding sphere
    // from `p`, following the same cone-sampling construction the teacher
    // uses for importance-sampling spherical lights (utils::random_to_sphere).
    fn sample_l(&self, p: &Point3) -> (RGB, Vector3, f64, f64) {
        let to_center = self.position - *p;
        let distance_squared = to_center.squared_length();
        let distance = distance_squared.sqrt();

        if distance <= self.radius {
            // Inside the light: fall back to uniform direction, degenerate case.
            let dir = utils::unit_sphere_random();
            return (self.radiance, dir, distance, 1.0_f64 / (4.0_f64 * f64::consts::PI));
        }

        let onb = utils::OrthonormalBasis::new(&(to_center / distance));
        let local_dir = utils::random_to_sphere(self.radius, distance_squared);
        let dir = onb.local(&local_dir);

        let cos_theta_max =
            (1.0_f64 - self.radius * self.radius / distance_squared)
                .max(0.0_f64)
                .sqrt();
        let solid_angle = 2.0_f64 * f64::consts::PI * (1.0_f64 - cos_theta_max);
        let pdf = if solid_angle > 0.0_f64 {
            1.0_f64 / solid_angle
        } else {
            0.0_f64
        };

        (self.radiance, dir.normalized(), distance, pdf)
    }
}

#[cfg(test)]
mod light_tests {
    use super::*;

    #[test]
    fn point_light_intensity_falls_off_with_squared_distance() {
        let l = Light::Point(PointLight {
            position: Point3::new(0.0, 0.0, 2.0),
            intensity: RGB::new(4.0, 4.0, 4.0),
        });
        let (radiance, _, dist, _) = l.sample_l(&Point3::origin());
        assert_eq!(dist, 2.0);
        assert!((radiance.r() - 1.0).abs() < 1e-9);
    }

    #[test]
    fn directional_light_is_a_delta_light_at_effectively_infinite_distance() {
        let l = Light::Directional(DirectionalLight {
            direction: Vector3::new(0.0, 1.0, 0.0),
            radiance: RGB::new(1.0, 1.0, 1.0),
        });
        assert!(l.is_delta_light());
        let (_, _, dist, pdf) = l.sample_l(&Point3::origin());
        assert_eq!(dist, f64::MAX);
        assert_eq!(pdf, 1.0);
    }

    #[test]
    fn diffuse_area_light_is_not_a_delta_light() {
        let l = Light::DiffuseArea(DiffuseAreaLight {
            position: Point3::new(0.0, 5.0, 0.0),
            radius: 1.0,
            radiance: RGB::new(10.0, 10.0, 10.0),
        });
        assert!(!l.is_delta_light());
        let (_, dir, dist, pdf) = l.sample_l(&Point3::origin());
        assert!(dist > 0.0);
        assert!(pdf > 0.0);
        assert!(dir.length() > 0.0);
    }
}
