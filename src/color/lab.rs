//! CIE L*a*b* to RGB conversion.
//!
//! # Encodings
//!
//! ```text
//!                L*                  a*, b*
//! CIELab  8 bit  v * 100 / 255       signed byte
//! ICC/ITU 8 bit  v * 100 / 255       v - 128
//! CIELab 16 bit  v * 100 / 65535     signed short / 256
//! ICC/ITU 16 bit v * 100 / 65280     (v - 32768) / 256
//! ```
//!
//! CIELab is taken relative to D65, the ICC and ITU variants to D50. The
//! path is Lab -> XYZ -> linear sRGB -> gamma-encoded sRGB; D50 input uses
//! the Bradford-adapted matrix.

use crate::format::tiff::Photometric;

/// Reference white of the Lab data.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Illuminant {
    D50,
    D65,
}

impl Illuminant {
    fn white_point(self) -> [f64; 3] {
        match self {
            Illuminant::D50 => [0.96422, 1.0, 0.82521],
            Illuminant::D65 => [0.95047, 1.0, 1.08883],
        }
    }

    fn xyz_to_linear_srgb(self) -> [[f64; 3]; 3] {
        match self {
            Illuminant::D65 => [
                [3.2404542, -1.5371385, -0.4985314],
                [-0.9692660, 1.8760108, 0.0415560],
                [0.0556434, -0.2040259, 1.0572252],
            ],
            Illuminant::D50 => [
                [3.1338561, -1.6168667, -0.4906146],
                [-0.9787684, 1.9161415, 0.0334540],
                [0.0719453, -0.2289914, 1.4052427],
            ],
        }
    }
}

/// How L*, a* and b* are stored.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LabEncoding {
    Cie,
    Icc,
    Itu,
}

impl LabEncoding {
    pub fn from_photometric(photometric: Photometric) -> Option<Self> {
        match photometric {
            Photometric::CieLab => Some(LabEncoding::Cie),
            Photometric::IccLab => Some(LabEncoding::Icc),
            Photometric::ItuLab => Some(LabEncoding::Itu),
            _ => None,
        }
    }

    pub fn illuminant(self) -> Illuminant {
        match self {
            LabEncoding::Cie => Illuminant::D65,
            LabEncoding::Icc | LabEncoding::Itu => Illuminant::D50,
        }
    }

    /// Decode stored values to (L*, a*, b*).
    fn decode(self, bits: u16, l: u32, a: u32, b: u32) -> [f64; 3] {
        match (self, bits) {
            (LabEncoding::Cie, 8) => [
                l as f64 * 100.0 / 255.0,
                a as u8 as i8 as f64,
                b as u8 as i8 as f64,
            ],
            (_, 8) => [
                l as f64 * 100.0 / 255.0,
                a as f64 - 128.0,
                b as f64 - 128.0,
            ],
            (LabEncoding::Cie, _) => [
                l as f64 * 100.0 / 65535.0,
                a as u16 as i16 as f64 / 256.0,
                b as u16 as i16 as f64 / 256.0,
            ],
            _ => [
                l as f64 * 100.0 / 65280.0,
                (a as f64 - 32768.0) / 256.0,
                (b as f64 - 32768.0) / 256.0,
            ],
        }
    }
}

/// Convert L*a*b* to gamma-encoded sRGB in `0.0..=1.0`.
pub fn lab_to_rgb(l: f64, a: f64, b: f64, illuminant: Illuminant) -> [f64; 3] {
    const EPSILON: f64 = 6.0 / 29.0;

    let finv = |t: f64| {
        if t > EPSILON {
            t * t * t
        } else {
            3.0 * EPSILON * EPSILON * (t - 4.0 / 29.0)
        }
    };

    let fy = (l + 16.0) / 116.0;
    let fx = fy + a / 500.0;
    let fz = fy - b / 200.0;

    let [wx, wy, wz] = illuminant.white_point();
    let xyz = [wx * finv(fx), wy * finv(fy), wz * finv(fz)];

    let matrix = illuminant.xyz_to_linear_srgb();
    let gamma = |c: f64| {
        let c = c.clamp(0.0, 1.0);
        if c <= 0.0031308 {
            12.92 * c
        } else {
            1.055 * c.powf(1.0 / 2.4) - 0.055
        }
    };

    matrix.map(|row| gamma(row[0] * xyz[0] + row[1] * xyz[1] + row[2] * xyz[2]))
}

/// Lab to RGB for one image.
#[derive(Debug, Clone, Copy)]
pub struct LabConverter {
    encoding: LabEncoding,
    bits: u16,
}

impl LabConverter {
    pub fn new(encoding: LabEncoding, bits: u16) -> Self {
        Self { encoding, bits }
    }

    fn convert(&self, l: u32, a: u32, b: u32) -> [f64; 3] {
        let [l, a, b] = self.encoding.decode(self.bits, l, a, b);
        lab_to_rgb(l, a, b, self.encoding.illuminant())
    }

    /// Convert 8-bit chunky pixels in place; samples past the third are kept.
    pub fn convert_row_u8(&self, row: &mut [u8], samples_per_pixel: usize) {
        for pixel in row.chunks_exact_mut(samples_per_pixel.max(3)) {
            let rgb = self.convert(pixel[0] as u32, pixel[1] as u32, pixel[2] as u32);
            for (slot, value) in pixel.iter_mut().zip(rgb) {
                *slot = (value * 255.0).round() as u8;
            }
        }
    }

    /// Convert 16-bit chunky pixels in place.
    pub fn convert_row_u16(&self, row: &mut [u16], samples_per_pixel: usize) {
        for pixel in row.chunks_exact_mut(samples_per_pixel.max(3)) {
            let rgb = self.convert(pixel[0] as u32, pixel[1] as u32, pixel[2] as u32);
            for (slot, value) in pixel.iter_mut().zip(rgb) {
                *slot = (value * 65535.0).round() as u16;
            }
        }
    }
}
