use crate::{
    blend::{self, BlendMode},
    error::{TokenmillError, TokenmillResult},
};

/// A 2D pixel buffer: premultiplied RGBA8, row-major, tightly packed.
///
/// All drawing primitives composite in premultiplied space; straight-alpha
/// data enters through [`Surface::from_rgba8_straight`] and leaves through
/// [`Surface::to_rgba8_straight`].
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Surface {
    width: u32,
    height: u32,
    data: Vec<u8>,
}

impl Surface {
    /// A fully transparent surface.
    pub fn new(width: u32, height: u32) -> TokenmillResult<Self> {
        let len = buffer_len(width, height)?;
        Ok(Self {
            width,
            height,
            data: vec![0u8; len],
        })
    }

    /// An opaque surface filled with a straight RGBA color.
    pub fn filled(width: u32, height: u32, rgba: [u8; 4]) -> TokenmillResult<Self> {
        let mut surface = Self::new(width, height)?;
        surface.fill(rgba);
        Ok(surface)
    }

    pub fn from_premul_rgba8(width: u32, height: u32, data: Vec<u8>) -> TokenmillResult<Self> {
        let len = buffer_len(width, height)?;
        if data.len() != len {
            return Err(TokenmillError::validation(
                "surface buffer must match width*height*4",
            ));
        }
        Ok(Self {
            width,
            height,
            data,
        })
    }

    pub fn from_rgba8_straight(
        width: u32,
        height: u32,
        mut data: Vec<u8>,
    ) -> TokenmillResult<Self> {
        let len = buffer_len(width, height)?;
        if data.len() != len {
            return Err(TokenmillError::validation(
                "surface buffer must match width*height*4",
            ));
        }
        premultiply_rgba8_in_place(&mut data);
        Ok(Self {
            width,
            height,
            data,
        })
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    /// Raw premultiplied RGBA8 bytes.
    pub fn data(&self) -> &[u8] {
        &self.data
    }

    pub fn pixel(&self, x: u32, y: u32) -> blend::PremulRgba8 {
        let idx = ((y as usize) * (self.width as usize) + (x as usize)) * 4;
        [
            self.data[idx],
            self.data[idx + 1],
            self.data[idx + 2],
            self.data[idx + 3],
        ]
    }

    /// Straight-alpha copy of the buffer, for encoders that expect it.
    pub fn to_rgba8_straight(&self) -> Vec<u8> {
        let mut out = self.data.clone();
        for px in out.chunks_exact_mut(4) {
            let a = px[3] as u16;
            if a == 0 || a == 255 {
                continue;
            }
            for c in px.iter_mut().take(3) {
                *c = ((u16::from(*c) * 255 + a / 2) / a).min(255) as u8;
            }
        }
        out
    }

    /// Overwrite every pixel with an opaque straight RGBA color.
    pub fn fill(&mut self, rgba: [u8; 4]) {
        let px = premul_px(rgba);
        for chunk in self.data.chunks_exact_mut(4) {
            chunk.copy_from_slice(&px);
        }
    }

    /// Source-over `src` at integer offset `(x, y)`, clipping to bounds.
    pub fn draw_over(&mut self, src: &Surface, x: i64, y: i64) {
        let dw = i64::from(self.width);
        let dh = i64::from(self.height);
        let sw = i64::from(src.width);
        let sh = i64::from(src.height);

        let x0 = x.max(0);
        let y0 = y.max(0);
        let x1 = (x + sw).min(dw);
        let y1 = (y + sh).min(dh);
        if x0 >= x1 || y0 >= y1 {
            return;
        }

        for dy in y0..y1 {
            let sy = dy - y;
            for dx in x0..x1 {
                let sx = dx - x;
                let s_idx = ((sy * sw + sx) as usize) * 4;
                let d_idx = ((dy * dw + dx) as usize) * 4;
                let s = [
                    src.data[s_idx],
                    src.data[s_idx + 1],
                    src.data[s_idx + 2],
                    src.data[s_idx + 3],
                ];
                let d = [
                    self.data[d_idx],
                    self.data[d_idx + 1],
                    self.data[d_idx + 2],
                    self.data[d_idx + 3],
                ];
                let out = blend::over(d, s, 1.0);
                self.data[d_idx..d_idx + 4].copy_from_slice(&out);
            }
        }
    }

    /// Destination-out erase using `mask`'s alpha channel; dimensions must match.
    pub fn erase(&mut self, mask: &Surface) -> TokenmillResult<()> {
        if self.width != mask.width || self.height != mask.height {
            return Err(TokenmillError::validation(
                "erase expects a mask with matching dimensions",
            ));
        }
        blend::erase_in_place(&mut self.data, &mask.data)
    }

    /// Apply `layer` over the whole surface with the given blend mode and
    /// opacity; dimensions must match.
    pub fn blend_layer(
        &mut self,
        mode: BlendMode,
        layer: &Surface,
        opacity: f32,
    ) -> TokenmillResult<()> {
        if self.width != layer.width || self.height != layer.height {
            return Err(TokenmillError::validation(
                "blend_layer expects a layer with matching dimensions",
            ));
        }
        blend::blend_in_place(mode, &mut self.data, &layer.data, opacity)
    }

    /// Source-over an anti-aliased filled circle in a straight RGBA color.
    ///
    /// Coverage at each pixel center is `clamp(radius - distance + 0.5, 0, 1)`,
    /// which gives a one-pixel smoothed rim.
    pub fn fill_circle(&mut self, cx: f32, cy: f32, radius: f32, rgba: [u8; 4]) {
        if radius <= 0.0 {
            return;
        }
        let x0 = ((cx - radius - 1.0).floor().max(0.0)) as u32;
        let y0 = ((cy - radius - 1.0).floor().max(0.0)) as u32;
        let x1 = (((cx + radius + 1.0).ceil()) as i64).clamp(0, i64::from(self.width)) as u32;
        let y1 = (((cy + radius + 1.0).ceil()) as i64).clamp(0, i64::from(self.height)) as u32;

        for y in y0..y1 {
            for x in x0..x1 {
                let dx = (x as f32 + 0.5) - cx;
                let dy = (y as f32 + 0.5) - cy;
                let dist = (dx * dx + dy * dy).sqrt();
                let coverage = (radius - dist + 0.5).clamp(0.0, 1.0);
                if coverage <= 0.0 {
                    continue;
                }
                let idx = ((y as usize) * (self.width as usize) + (x as usize)) * 4;
                let d = [
                    self.data[idx],
                    self.data[idx + 1],
                    self.data[idx + 2],
                    self.data[idx + 3],
                ];
                let out = blend::over(d, premul_px(rgba), coverage);
                self.data[idx..idx + 4].copy_from_slice(&out);
            }
        }
    }

    /// Resample to `width` x `height` with a high-quality filter.
    ///
    /// Lanczos3 keeps downscales free of the aliasing artifacts nearest or
    /// plain bilinear filtering would introduce. Filtering runs on the
    /// premultiplied data, which is the interpolation-safe representation.
    pub fn resampled(&self, width: u32, height: u32) -> TokenmillResult<Surface> {
        if width == 0 || height == 0 {
            return Err(TokenmillError::validation(
                "resample target dimensions must be > 0",
            ));
        }
        if width == self.width && height == self.height {
            return Ok(self.clone());
        }

        let img = image::RgbaImage::from_raw(self.width, self.height, self.data.clone())
            .ok_or_else(|| TokenmillError::validation("surface buffer size mismatch"))?;
        let resized =
            image::imageops::resize(&img, width, height, image::imageops::FilterType::Lanczos3);
        Surface::from_premul_rgba8(width, height, resized.into_raw())
    }
}

fn buffer_len(width: u32, height: u32) -> TokenmillResult<usize> {
    if width == 0 || height == 0 {
        return Err(TokenmillError::validation(
            "surface dimensions must be > 0",
        ));
    }
    (width as usize)
        .checked_mul(height as usize)
        .and_then(|v| v.checked_mul(4))
        .ok_or_else(|| TokenmillError::validation("surface buffer size overflow"))
}

fn premul_px(rgba: [u8; 4]) -> blend::PremulRgba8 {
    let a = u16::from(rgba[3]);
    if a == 255 {
        return rgba;
    }
    [
        ((u16::from(rgba[0]) * a + 127) / 255) as u8,
        ((u16::from(rgba[1]) * a + 127) / 255) as u8,
        ((u16::from(rgba[2]) * a + 127) / 255) as u8,
        rgba[3],
    ]
}

pub(crate) fn premultiply_rgba8_in_place(rgba: &mut [u8]) {
    for px in rgba.chunks_exact_mut(4) {
        let a = px[3] as u16;
        if a == 255 {
            continue;
        }
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
