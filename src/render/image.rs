use std::cell::OnceCell;
use std::sync::Arc;

use crate::foundation::error::{AnimaticError, AnimaticResult};

/// A decoded, premultiplied RGBA8 image resource.
///
/// Constructed by the factory from arbitrary encoded bytes; the engine wraps
/// it in an `Rc` when it caches the asset and re-emits it in draw commands.
pub struct RenderImage {
    pub width: u32,
    pub height: u32,
    /// Tightly packed, row-major, premultiplied alpha.
    pub rgba8_premul: Vec<u8>,
    cpu_pixmap: OnceCell<Arc<vello_cpu::Pixmap>>,
    #[cfg(feature = "gpu")]
    gpu_image: OnceCell<vello::peniko::ImageData>,
}

impl std::fmt::Debug for RenderImage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RenderImage")
            .field("width", &self.width)
            .field("height", &self.height)
            .finish_non_exhaustive()
    }
}

impl RenderImage {
    /// Wrap already-premultiplied RGBA8 bytes.
    pub fn from_premul_rgba8(width: u32, height: u32, rgba8_premul: Vec<u8>) -> Self {
        Self {
            width,
            height,
            rgba8_premul,
            cpu_pixmap: OnceCell::new(),
            #[cfg(feature = "gpu")]
            gpu_image: OnceCell::new(),
        }
    }

    /// The image as a CPU-rasterizer pixmap, built once and reused across
    /// frames by the painter/software nodes.
    pub(crate) fn cpu_pixmap(&self) -> AnimaticResult<Arc<vello_cpu::Pixmap>> {
        if let Some(pm) = self.cpu_pixmap.get() {
            return Ok(pm.clone());
        }
        let pm = Arc::new(pixmap_from_premul_bytes(
            &self.rgba8_premul,
            self.width,
            self.height,
        )?);
        let _ = self.cpu_pixmap.set(pm.clone());
        Ok(pm)
    }

    /// The image as GPU-pipeline image data, built once and reused across
    /// frames by the GPU node.
    #[cfg(feature = "gpu")]
    pub(crate) fn gpu_image(&self) -> vello::peniko::ImageData {
        if let Some(img) = self.gpu_image.get() {
            return img.clone();
        }
        let img = vello::peniko::ImageData {
            data: vello::peniko::Blob::from(self.rgba8_premul.clone()),
            format: vello::peniko::ImageFormat::Rgba8,
            alpha_type: vello::peniko::ImageAlphaType::AlphaPremultiplied,
            width: self.width,
            height: self.height,
        };
        let _ = self.gpu_image.set(img.clone());
        img
    }
}

/// Decode arbitrary encoded image bytes via the platform codec set of the
/// `image` crate. Malformed or unrecognized data is reported as absence,
/// never as an error.
pub(crate) fn decode_image(bytes: &[u8]) -> Option<RenderImage> {
    let dyn_img = match image::load_from_memory(bytes) {
        Ok(img) => img,
        Err(err) => {
            tracing::debug!(?err, "image decode failed");
            return None;
        }
    };
    let rgba = dyn_img.to_rgba8();
    let (width, height) = rgba.dimensions();
    let mut data = rgba.into_raw();
    premultiply_rgba8_in_place(&mut data);
    Some(RenderImage::from_premul_rgba8(width, height, data))
}

pub(crate) fn premultiply_rgba8_in_place(rgba: &mut [u8]) {
    for px in rgba.chunks_exact_mut(4) {
        let a = px[3] as u16;
        if a == 0 {
            px[0] = 0;
            px[1] = 0;
            px[2] = 0;
            continue;
        }
        px[0] = ((px[0] as u16 * a + 127) / 255) as u8;
        px[1] = ((px[1] as u16 * a + 127) / 255) as u8;
        px[2] = ((px[2] as u16 * a + 127) / 255) as u8;
    }
}

fn pixmap_from_premul_bytes(
    bytes: &[u8],
    width: u32,
    height: u32,
) -> AnimaticResult<vello_cpu::Pixmap> {
    let w: u16 = width
        .try_into()
        .map_err(|_| AnimaticError::render("image width exceeds u16"))?;
    let h: u16 = height
        .try_into()
        .map_err(|_| AnimaticError::render("image height exceeds u16"))?;
    if bytes.len()
        != (width as usize)
            .saturating_mul(height as usize)
            .saturating_mul(4)
    {
        return Err(AnimaticError::render("image byte len mismatch"));
    }
    let mut pixels = Vec::<vello_cpu::peniko::color::PremulRgba8>::with_capacity(
        (width as usize) * (height as usize),
    );
    for px in bytes.chunks_exact(4) {
        pixels.push(vello_cpu::peniko::color::PremulRgba8::from_u8_array([
            px[0], px[1], px[2], px[3],
        ]));
    }
    Ok(vello_cpu::Pixmap::from_parts_with_opacity(
        pixels, w, h, true,
    ))
}

#[cfg(test)]
mod tests {
    use std::io::Cursor;

    use super::*;

    #[test]
    fn decode_png_dimensions_and_premul() {
        let src_rgba = vec![100u8, 50u8, 200u8, 128u8];
        let img = image::RgbaImage::from_raw(1, 1, src_rgba).unwrap();

        let mut buf = Vec::new();
        image::DynamicImage::ImageRgba8(img)
            .write_to(&mut Cursor::new(&mut buf), image::ImageFormat::Png)
            .unwrap();

        let decoded = decode_image(&buf).unwrap();
        assert_eq!(decoded.width, 1);
        assert_eq!(decoded.height, 1);
        assert_eq!(
            decoded.rgba8_premul.as_slice(),
            &[
                ((100u16 * 128 + 127) / 255) as u8,
                ((50u16 * 128 + 127) / 255) as u8,
                ((200u16 * 128 + 127) / 255) as u8,
                128u8
            ]
        );
    }

    #[test]
    fn decode_malformed_bytes_is_absent_not_fatal() {
        assert!(decode_image(b"not an image").is_none());
        assert!(decode_image(&[]).is_none());
    }

    #[test]
    fn cpu_pixmap_matches_dimensions() {
        let img = RenderImage::from_premul_rgba8(2, 1, vec![0u8; 8]);
        let pm = img.cpu_pixmap().unwrap();
        assert_eq!(pm.width(), 2);
        assert_eq!(pm.height(), 1);
    }
}
