use crate::color::RGB;

// 255.99 rather than 255.0 keeps values that round to exactly 1.0 after
// gamma correction from landing one unit short of white at 254.
const COLOR_SPACE: f64 = 255.99_f64;

// Holds the final per-pixel radiance estimate written by the integrator,
// plus how many samples each pixel actually took -- useful for inspecting
// how the adaptive sampler spent its budget across the image.
pub struct SampleBuffer {
    width: u32,
    height: u32,
    pixels: Vec<RGB>,
    sample_counts: Vec<u32>,
}

impl SampleBuffer {
    pub fn new(width: u32, height: u32) -> SampleBuffer {
        SampleBuffer {
            width: width,
            height: height,
            pixels: vec![RGB::black(); (width * height) as usize],
            sample_counts: vec![0_u32; (width * height) as usize],
        }
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    fn index(&self, x: u32, y: u32) -> usize {
        ((y * self.width) + x) as usize
    }

    pub fn set(&mut self, x: u32, y: u32, spectrum: RGB, samples: u32) {
        let idx = self.index(x, y);
        self.pixels[idx] = spectrum;
        self.sample_counts[idx] = samples;
    }

    pub fn get(&self, x: u32, y: u32) -> (RGB, u32) {
        let idx = self.index(x, y);
        (self.pixels[idx], self.sample_counts[idx])
    }

    pub fn total_samples(&self) -> u64 {
        self.sample_counts.iter().map(|&s| s as u64).sum()
    }

    // Gamma-2.0 corrects and quantizes to 8-bit RGB, row-major top-to-bottom,
    // ready for a PNG encoder.
    pub fn to_ldr_bytes(&self) -> Vec<u8> {
        let mut data = Vec::with_capacity((self.width * self.height * 3_u32) as usize);
        for y in 0..self.height {
            for x in 0..self.width {
                let (col, _) = self.get(x, y);
                let gamma_corrected = RGB::new(col.r().max(0.0).sqrt(), col.g().max(0.0).sqrt(), col.b().max(0.0).sqrt());
                data.push((crate::utils::clamp(gamma_corrected.r(), 0.0, 1.0) * COLOR_SPACE) as u8);
                data.push((crate::utils::clamp(gamma_corrected.g(), 0.0, 1.0) * COLOR_SPACE) as u8);
                data.push((crate::utils::clamp(gamma_corrected.b(), 0.0, 1.0) * COLOR_SPACE) as u8);
            }
        }
        data
    }
}

#[cfg(test)]
mod sample_buffer_tests {
    use super::*;

    #[test]
    fn a_fresh_buffer_is_entirely_black() {
        let buf = SampleBuffer::new(4, 4);
        let (col, samples) = buf.get(2, 2);
        assert!(col.is_black());
        assert_eq!(samples, 0);
    }

    #[test]
    fn set_and_get_round_trip() {
        let mut buf = SampleBuffer::new(2, 2);
        buf.set(1, 0, RGB::new(0.5, 0.25, 0.75), 12);
        let (col, samples) = buf.get(1, 0);
        assert_eq!(col.r(), 0.5);
        assert_eq!(samples, 12);
    }

    #[test]
    fn white_pixel_quantizes_to_the_top_of_the_color_space() {
        let mut buf = SampleBuffer::new(1, 1);
        buf.set(0, 0, RGB::new(1.0, 1.0, 1.0), 1);
        let bytes = buf.to_ldr_bytes();
        assert_eq!(bytes, vec![255, 255, 255]);
    }

    #[test]
    fn total_samples_sums_every_pixel() {
        let mut buf = SampleBuffer::new(2, 1);
        buf.set(0, 0, RGB::black(), 3);
        buf.set(1, 0, RGB::black(), 7);
        assert_eq!(buf.total_samples(), 10);
    }
}
