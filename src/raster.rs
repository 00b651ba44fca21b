use base64::{Engine as _, engine::general_purpose};
use image::{ExtendedColorType, ImageEncoder, codecs::png::PngEncoder};

use crate::{error::InferenceError, triton::InferOutput};

/// An 8-bit height x width x channel pixel buffer.
#[derive(Debug, Clone, PartialEq)]
pub struct Raster {
    pub width: u32,
    pub height: u32,
    pub color: ExtendedColorType,
    pub pixels: Vec<u8>,
}

/// Drops every dimension of size one.
pub fn squeeze(shape: &[usize]) -> Vec<usize> {
    shape.iter().copied().filter(|&dim| dim != 1).collect()
}

impl Raster {
    pub fn from_output(output: &InferOutput) -> Result<Self, InferenceError> {
        Self::from_tensor(&output.shape, output.as_u8()?)
    }

    pub fn from_tensor(shape: &[usize], pixels: Vec<u8>) -> Result<Self, InferenceError> {
        let expected = shape
            .iter()
            .try_fold(1usize, |acc, &dim| acc.checked_mul(dim))
            .ok_or_else(|| InferenceError::Tensor(format!("shape {shape:?} overflows")))?;
        if expected != pixels.len() {
            return Err(InferenceError::Tensor(format!(
                "shape {shape:?} holds {expected} values but {} were returned",
                pixels.len()
            )));
        }

        let squeezed = squeeze(shape);
        let (height, width, color) = match squeezed.as_slice() {
            [h, w] => (*h, *w, ExtendedColorType::L8),
            [h, w, 3] => (*h, *w, ExtendedColorType::Rgb8),
            [h, w, 4] => (*h, *w, ExtendedColorType::Rgba8),
            _ => {
                return Err(InferenceError::Tensor(format!(
                    "shape {shape:?} does not squeeze to an HxW, HxWx3 or HxWx4 image"
                )));
            }
        };
        if height == 0 || width == 0 {
            return Err(InferenceError::Tensor(format!("empty image shape {shape:?}")));
        }

        let height = u32::try_from(height)
            .map_err(|_| InferenceError::Tensor(format!("image height {height} too large")))?;
        let width = u32::try_from(width)
            .map_err(|_| InferenceError::Tensor(format!("image width {width} too large")))?;

        Ok(Self {
            width,
            height,
            color,
            pixels,
        })
    }

    pub fn encode_png(&self) -> Result<Vec<u8>, InferenceError> {
        let mut png = Vec::new();
        PngEncoder::new(&mut png).write_image(&self.pixels, self.width, self.height, self.color)?;
        Ok(png)
    }

    pub fn to_base64_png(&self) -> Result<String, InferenceError> {
        Ok(general_purpose::STANDARD.encode(self.encode_png()?))
    }
}
