use crate::color::RGB;
use crate::utils;
use crate::utils::OrthonormalBasis;
use crate::vector::Vector3;

use rand;
use std::f64;

// All directions passed to and returned from a BSDF are in the local
// shading frame, where z is the surface normal. `f`/`sample_f`/
// `get_emission` are the full contract; closed over a small enum rather
// than `dyn Trait` since the integrator calls them on every bounce.
pub enum BSDF {
    Diffuse(Diffuse),
    Mirror(Mirror),
    Glass(Glass),
    Emissive(Emissive),
}

pub struct Diffuse {
    pub albedo: RGB,
}

pub struct Mirror {
    pub reflectance: RGB,
}

pub struct Glass {
    pub transmittance: RGB,
    pub reflectance: RGB,
    pub refractive_index: f64,
}

pub struct Emissive {
    pub radiance: RGB,
}

impl BSDF {
    pub fn f(&self, w_out: &Vector3, w_in: &Vector3) -> RGB {
        match self {
            BSDF::Diffuse(d) => {
                if w_out.z() > 0.0_f64 && w_in.z() > 0.0_f64 {
                    d.albedo * (1.0_f64 / f64::consts::PI)
                } else {
                    RGB::black()
                }
            }
            // Delta distributions have zero measure under a fixed (w_out, w_in)
            // pair; their entire contribution is returned through sample_f.
            BSDF::Mirror(_) => RGB::black(),
            BSDF::Glass(_) => RGB::black(),
            BSDF::Emissive(_) => RGB::black(),
        }
    }

    pub fn sample_f(&self, w_out: &Vector3) -> (RGB, Vector3, f64) {
        match self {
            BSDF::Diffuse(d) => {
                let onb = OrthonormalBasis::new(&Vector3::new(0.0, 0.0, 1.0));
                let w_in = onb.local(&utils::random_cosine_direction());
                let pdf = cosine_pdf(&w_in);
                if pdf <= 0.0_f64 {
                    (RGB::black(), w_in, 1.0_f64)
                } else {
                    (self.f(w_out, &w_in), w_in, pdf)
                }
            }
            BSDF::Mirror(m) => {
                let w_in = Vector3::new(-w_out.x(), -w_out.y(), w_out.z());
                let cos_theta = w_in.z().abs();
                let f = if cos_theta > 0.0_f64 {
                    m.reflectance * (1.0_f64 / cos_theta)
                } else {
                    RGB::black()
                };
                (f, w_in, 1.0_f64)
            }
            BSDF::Glass(g) => g.sample_f(w_out),
            BSDF::Emissive(_) => (RGB::black(), Vector3::new(0.0, 0.0, 1.0), 1.0_f64),
        }
    }

    pub fn get_emission(&self) -> RGB {
        match self {
            BSDF::Emissive(e) => e.radiance,
            _ => RGB::black(),
        }
    }

    pub fn is_delta(&self) -> bool {
        matches!(self, BSDF::Mirror(_) | BSDF::Glass(_))
    }
}

fn cosine_pdf(dir: &Vector3) -> f64 {
    let cosine = dir.z();
    if cosine <= 0.0_f64 {
        0.0_f64
    } else {
        cosine / f64::consts::PI
    }
}

fn reflect(v: Vector3, n: Vector3) -> Vector3 {
    v - 2.0_f64 * v.dot(n) * n
}

fn refract(v: Vector3, n: Vector3, refracted_index: f64) -> Vector3 {
    let cos_theta = (-v).dot(n);
    let r_out_parallel = refracted_index * (v + cos_theta * n);
    let r_out_perp = (-(1.0_f64 - r_out_parallel.squared_length()).sqrt()) * n;
    r_out_parallel + r_out_perp
}

fn schlick(cosine: f64, index: f64) -> f64 {
    let mut r0 = (1.0_f64 - index) / (1.0_f64 + index);
    r0 = r0 * r0;
    r0 + (1.0_f64 - r0) * (1.0_f64 - cosine).powi(5)
}

impl Glass {
    // Local-frame z-up is treated as the geometric normal; Schlick's
    // approximation chooses between reflection and refraction.
    fn sample_f(&self, w_out: &Vector3) -> (RGB, Vector3, f64) {
        let z_up = Vector3::new(0.0, 0.0, 1.0);
        let (etai_over_etat, normal_for_use) = if w_out.z() > 0.0_f64 {
            (1.0_f64 / self.refractive_index, z_up)
        } else {
            (self.refractive_index, -z_up)
        };

        let unit_direction = (-*w_out).normalized();
        let cos_theta = utils::float_min((-unit_direction).dot(normal_for_use), 1.0_f64);
        let sin_theta = (1.0_f64 - cos_theta * cos_theta).sqrt();

        let (w_in, attenuation) = if etai_over_etat * sin_theta > 1.0_f64 {
            (reflect(unit_direction, normal_for_use), self.reflectance)
        } else {
            let reflect_prob = schlick(cos_theta, etai_over_etat);
            if rand::random::<f64>() < reflect_prob {
                (reflect(unit_direction, normal_for_use), self.reflectance)
            } else {
                (
                    refract(unit_direction, normal_for_use, etai_over_etat),
                    self.transmittance,
                )
            }
        };

        let cos_out = w_in.z().abs();
        let f = if cos_out > 0.0_f64 {
            attenuation * (1.0_f64 / cos_out)
        } else {
            RGB::black()
        };
        (f, w_in, 1.0_f64)
    }
}

#[cfg(test)]
mod bsdf_tests {
    use super::*;

    #[test]
    fn diffuse_f_is_zero_below_the_horizon() {
        let d = BSDF::Diffuse(Diffuse {
            albedo: RGB::new(0.5, 0.5, 0.5),
        });
        let w_out = Vector3::new(0.0, 0.0, 1.0);
        let w_in = Vector3::new(0.0, 0.0, -1.0);
        let f = d.f(&w_out, &w_in);
        assert_eq!(f.r(), 0.0);
    }

    #[test]
    fn diffuse_sample_f_stays_in_the_upper_hemisphere() {
        let d = BSDF::Diffuse(Diffuse {
            albedo: RGB::new(1.0, 1.0, 1.0),
        });
        let w_out = Vector3::new(0.0, 0.0, 1.0);
        for _ in 0..100 {
            let (_, w_in, pdf) = d.sample_f(&w_out);
            assert!(w_in.z() >= 0.0);
            assert!(pdf >= 0.0);
        }
    }

    #[test]
    fn mirror_reflects_about_the_local_normal() {
        let m = BSDF::Mirror(Mirror {
            reflectance: RGB::new(1.0, 1.0, 1.0),
        });
        let w_out = Vector3::new(0.3, 0.4, 0.8);
        let (_, w_in, pdf) = m.sample_f(&w_out);
        assert!((w_in.x() + w_out.x()).abs() < 1e-9);
        assert!((w_in.y() + w_out.y()).abs() < 1e-9);
        assert!((w_in.z() - w_out.z()).abs() < 1e-9);
        assert_eq!(pdf, 1.0);
    }

    #[test]
    fn emissive_bsdf_reports_its_radiance() {
        let e = BSDF::Emissive(Emissive {
            radiance: RGB::new(4.0, 4.0, 4.0),
        });
        assert_eq!(e.get_emission().r(), 4.0);
    }
}
