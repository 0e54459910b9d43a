use rand;

// A source of uniform [0,1)^2 samples. Thread-local instances let worker
// threads draw independently without sharing mutable PRNG state.
pub trait Sampler2D {
    fn get_sample(&mut self) -> (f64, f64);
}

pub struct UniformSampler2D;

impl UniformSampler2D {
    pub fn new() -> UniformSampler2D {
        UniformSampler2D
    }
}

impl Sampler2D for UniformSampler2D {
    fn get_sample(&mut self) -> (f64, f64) {
        (rand::random::<f64>(), rand::random::<f64>())
    }
}

#[cfg(test)]
mod uniform_sampler_2d_tests {
    use super::*;

    #[test]
    fn samples_land_in_the_unit_square() {
        let mut sampler = UniformSampler2D::new();
        for _ in 0..1000 {
            let (u, v) = sampler.get_sample();
            assert!(u >= 0.0 && u < 1.0);
            assert!(v >= 0.0 && v < 1.0);
        }
    }
}
