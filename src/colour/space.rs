//! Colour-space tagging and the RGB <-> UCS per-pixel transforms
//!
//! The uniform colour space is CIE L*a*b* under a D65 white point, reached from
//! sRGB through linearisation and the sRGB -> XYZ matrix. Every transform here is
//! a fixed per-pixel function with no data-dependent branching beyond the
//! piecewise transfer curves, so conversions are deterministic and a round trip
//! RGB -> UCS -> RGB reproduces the input to well within one level.

use std::fmt;
use std::str::FromStr;

use crate::io::error::{MosaicError, Result, invalid_parameter};
use crate::spatial::buffer::PixelBuffer;

/// Number of discrete levels per channel used for histograms
pub const LEVELS: usize = 256;

/// Nominal (min, max) of each UCS channel: L*, a*, b*
pub const UCS_CHANNEL_RANGES: [(f64, f64); 3] = [(0.0, 100.0), (-128.0, 128.0), (-128.0, 128.0)];

/// Nominal (min, max) of each RGB channel
pub const RGB_CHANNEL_RANGE: (f64, f64) = (0.0, 255.0);

#[rustfmt::skip]
const SRGB_TO_XYZ: [[f64; 3]; 3] = [
    [0.412_456_4, 0.357_576_1, 0.180_437_5],
    [0.212_672_9, 0.715_152_2, 0.072_175_0],
    [0.019_333_9, 0.119_192_0, 0.950_304_1],
];

#[rustfmt::skip]
const XYZ_TO_SRGB: [[f64; 3]; 3] = [
    [ 3.240_454_2, -1.537_138_5, -0.498_531_4],
    [-0.969_266_0,  1.876_010_8,  0.041_556_0],
    [ 0.055_643_4, -0.204_025_9,  1.057_225_2],
];

/// D65 reference white in XYZ
const WHITE_D65: [f64; 3] = [0.950_47, 1.0, 1.088_83];

// 6**3 / 29**3 and 29**3 / 3**3
const EPSILON: f64 = 216.0 / 24_389.0;
const KAPPA: f64 = 24_389.0 / 27.0;

/// Colour space a pixel buffer is expressed in
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum ColourSpace {
    /// Additive sRGB with channels in [0, 255]
    #[default]
    Rgb,
    /// Perceptually uniform CIE L*a*b* (D65)
    Ucs,
}

impl ColourSpace {
    /// The space a conversion from `self` leads to
    pub const fn other(self) -> Self {
        match self {
            Self::Rgb => Self::Ucs,
            Self::Ucs => Self::Rgb,
        }
    }

    /// Nominal value range of a channel in this space
    pub fn channel_range(self, channel: usize) -> (f64, f64) {
        match self {
            Self::Rgb => RGB_CHANNEL_RANGE,
            Self::Ucs => UCS_CHANNEL_RANGES
                .get(channel)
                .copied()
                .unwrap_or(RGB_CHANNEL_RANGE),
        }
    }

    /// Map a channel value onto one of the [`LEVELS`] histogram levels
    ///
    /// Values outside the nominal range clamp to the first or last level.
    pub fn quantize(self, channel: usize, value: f64) -> usize {
        let (lo, hi) = self.channel_range(channel);
        let top = (LEVELS - 1) as f64;
        let scaled = ((value - lo) / (hi - lo) * top).round();
        if scaled.is_nan() {
            return 0;
        }
        scaled.clamp(0.0, top) as usize
    }

    /// Channel value at the centre of a histogram level
    pub fn dequantize(self, channel: usize, level: usize) -> f64 {
        let (lo, hi) = self.channel_range(channel);
        let top = (LEVELS - 1) as f64;
        (level.min(LEVELS - 1) as f64 / top).mul_add(hi - lo, lo)
    }
}

impl fmt::Display for ColourSpace {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Rgb => write!(f, "rgb"),
            Self::Ucs => write!(f, "ucs"),
        }
    }
}

impl FromStr for ColourSpace {
    type Err = MosaicError;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_lowercase().as_str() {
            "rgb" => Ok(Self::Rgb),
            "ucs" => Ok(Self::Ucs),
            _ => Err(invalid_parameter(
                "colour_space",
                &s,
                &"expected 'rgb' or 'ucs'",
            )),
        }
    }
}

/// Convert an RGB buffer to the uniform colour space
///
/// # Errors
///
/// Returns [`MosaicError::InvalidConversion`] if the buffer is already UCS
pub fn to_ucs(buffer: &PixelBuffer) -> Result<PixelBuffer> {
    convert(buffer, ColourSpace::Ucs)
}

/// Convert a UCS buffer back to RGB
///
/// # Errors
///
/// Returns [`MosaicError::InvalidConversion`] if the buffer is already RGB
pub fn to_rgb(buffer: &PixelBuffer) -> Result<PixelBuffer> {
    convert(buffer, ColourSpace::Rgb)
}

fn convert(buffer: &PixelBuffer, target: ColourSpace) -> Result<PixelBuffer> {
    if buffer.space() == target {
        return Err(MosaicError::InvalidConversion {
            from: buffer.space(),
            to: target,
        });
    }
    let transform = match target {
        ColourSpace::Ucs => rgb_to_ucs,
        ColourSpace::Rgb => ucs_to_rgb,
    };
    Ok(buffer.map_pixels(transform, target))
}

/// Convert one sRGB pixel with channels in [0, 255] to L*a*b*
pub fn rgb_to_ucs(rgb: [f64; 3]) -> [f64; 3] {
    let linear = rgb.map(|v| linearize(v / 255.0));
    let xyz = mul_vec(&SRGB_TO_XYZ, linear);
    let [fx, fy, fz] = [0, 1, 2].map(|i| lab_forward(component(xyz, i) / component(WHITE_D65, i)));
    [
        116.0f64.mul_add(fy, -16.0),
        500.0 * (fx - fy),
        200.0 * (fy - fz),
    ]
}

/// Convert one L*a*b* pixel to sRGB with channels in [0, 255]
///
/// Output is not clamped; out-of-gamut colours may leave [0, 255].
pub fn ucs_to_rgb([l, a, b]: [f64; 3]) -> [f64; 3] {
    let fy = (l + 16.0) / 116.0;
    let fx = a / 500.0 + fy;
    let fz = fy - b / 200.0;
    let xyz = [
        lab_inverse(fx) * WHITE_D65[0],
        lab_inverse(fy) * WHITE_D65[1],
        lab_inverse(fz) * WHITE_D65[2],
    ];
    mul_vec(&XYZ_TO_SRGB, xyz).map(|v| delinearize(v) * 255.0)
}

fn linearize(v: f64) -> f64 {
    if v <= 0.040_45 {
        v / 12.92
    } else {
        ((v + 0.055) / 1.055).powf(2.4)
    }
}

fn delinearize(v: f64) -> f64 {
    if v <= 0.003_130_8 {
        v * 12.92
    } else {
        1.055f64.mul_add(v.powf(1.0 / 2.4), -0.055)
    }
}

fn lab_forward(t: f64) -> f64 {
    if t > EPSILON {
        t.cbrt()
    } else {
        KAPPA.mul_add(t, 16.0) / 116.0
    }
}

fn lab_inverse(f: f64) -> f64 {
    let cube = f * f * f;
    if cube > EPSILON {
        cube
    } else {
        116.0f64.mul_add(f, -16.0) / KAPPA
    }
}

fn mul_vec(matrix: &[[f64; 3]; 3], v: [f64; 3]) -> [f64; 3] {
    matrix.map(|row| row[0].mul_add(v[0], row[1].mul_add(v[1], row[2] * v[2])))
}

const fn component(v: [f64; 3], i: usize) -> f64 {
    match i {
        0 => v[0],
        1 => v[1],
        _ => v[2],
    }
}
