use crate::{
    assets::TokenAssets,
    blend::BlendMode,
    blur,
    error::{TokenmillError, TokenmillResult},
    framing::TOKEN_SIZE,
    surface::Surface,
};

/// Soften parameters for the border layers: a ~3px Gaussian.
const BORDER_BLUR_SIGMA: f32 = 3.0;
const BORDER_BLUR_RADIUS: u32 = 6;

/// Composite a framed 512x512 image with the six mask/shading layers into
/// the final token.
///
/// Deterministic: identical inputs produce byte-identical output. The framed
/// image must be exactly 512x512 and every layer must match; anything else
/// is a validation error.
pub fn composite(
    framed: &Surface,
    assets: &TokenAssets,
    background_rgba: [u8; 4],
) -> TokenmillResult<Surface> {
    if framed.width() != TOKEN_SIZE || framed.height() != TOKEN_SIZE {
        return Err(TokenmillError::validation(format!(
            "composite expects a {TOKEN_SIZE}x{TOKEN_SIZE} framed image, got {}x{}",
            framed.width(),
            framed.height()
        )));
    }
    for (name, layer) in [
        ("erase_base", &assets.erase_base),
        ("erase_inner", &assets.erase_inner),
        ("erase_outer", &assets.erase_outer),
        ("erase_center", &assets.erase_center),
        ("shading_inner", &assets.shading_inner),
        ("shading_outer", &assets.shading_outer),
    ] {
        if layer.width() != TOKEN_SIZE || layer.height() != TOKEN_SIZE {
            return Err(TokenmillError::validation(format!(
                "layer '{name}' must be {TOKEN_SIZE}x{TOKEN_SIZE}, got {}x{}",
                layer.width(),
                layer.height()
            )));
        }
    }

    // One softened copy feeds both border layers.
    let blurred = blur::blur(framed, BORDER_BLUR_RADIUS, BORDER_BLUR_SIGMA)?;

    // Base: background, image, then carve the circular silhouette.
    let mut base = Surface::filled(TOKEN_SIZE, TOKEN_SIZE, background_rgba)?;
    base.draw_over(framed, 0, 0);
    base.erase(&assets.erase_base)?;

    // Inner border ring: tinted and lit from the softened image.
    let mut inner = blurred.clone();
    apply_border_shading(&mut inner, &assets.shading_inner)?;
    inner.erase(&assets.erase_inner)?;

    // Outer border ring; its erase happens after combining.
    let mut outer = blurred;
    apply_border_shading(&mut outer, &assets.shading_outer)?;

    // Combine the rings, then drop everything outside the ring and inside
    // the token face.
    let mut border = Surface::new(TOKEN_SIZE, TOKEN_SIZE)?;
    border.draw_over(&outer, 0, 0);
    border.draw_over(&inner, 0, 0);
    border.erase(&assets.erase_center)?;
    border.erase(&assets.erase_outer)?;

    base.draw_over(&border, 0, 0);
    Ok(base)
}

/// The two-pass border tint: "color" at 50%, then "overlay" at 90%.
fn apply_border_shading(layer: &mut Surface, shading: &Surface) -> TokenmillResult<()> {
    layer.blend_layer(BlendMode::Color, shading, 0.5)?;
    layer.blend_layer(BlendMode::Overlay, shading, 0.9)
}
