//! Burns a date/time caption into a captured frame.
//!
//! The caption is white with a black drop shadow, anchored at one of the
//! four image corners, and always drawn on a copy of the source buffer.

use gtk4::cairo;
use image::RgbaImage;
use thiserror::Error;

/// Corner anchor for the burned-in caption.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum StampCorner {
    TopLeft,
    TopRight,
    BottomLeft,
    #[default]
    BottomRight,
}

/// Distance between the caption and the anchoring image edges.
pub const STAMP_MARGIN: f64 = 10.0;
/// Shadow offset below and right of the caption glyphs.
pub const STAMP_SHADOW_OFFSET: f64 = 2.0;
const STAMP_FONT_FAMILY: &str = "Sans";
const STAMP_FONT_SIZE: f64 = 16.0;

#[derive(Debug, Error)]
pub enum StampError {
    #[error("failed to build caption surface: {message}")]
    Surface { message: String },
    #[error("failed to render caption: {message}")]
    Render { message: String },
}

pub type StampResult<T> = std::result::Result<T, StampError>;

/// Render `text` onto a copy of `image` at the given corner. The input
/// buffer is never mutated.
pub fn stamp_timestamp(
    image: &RgbaImage,
    corner: StampCorner,
    text: &str,
) -> StampResult<RgbaImage> {
    let width = image.width();
    let height = image.height();
    if width == 0 || height == 0 {
        return Err(StampError::Surface {
            message: format!("image too small to caption: {width}x{height}"),
        });
    }

    let mut surface = rgba_image_to_surface(image)?;

    {
        let context = cairo::Context::new(&surface).map_err(render_error)?;
        context.select_font_face(
            STAMP_FONT_FAMILY,
            cairo::FontSlant::Normal,
            cairo::FontWeight::Bold,
        );
        context.set_font_size(STAMP_FONT_SIZE);

        let extents = context.text_extents(text).map_err(render_error)?;
        let (x, y) = caption_origin(
            corner,
            extents.width(),
            extents.height(),
            f64::from(width),
            f64::from(height),
        );
        // cairo positions text at the baseline, not the caption box corner
        let origin_x = x - extents.x_bearing();
        let origin_y = y - extents.y_bearing();

        context.set_source_rgb(0.0, 0.0, 0.0);
        context.move_to(origin_x + STAMP_SHADOW_OFFSET, origin_y + STAMP_SHADOW_OFFSET);
        context.show_text(text).map_err(render_error)?;

        context.set_source_rgb(1.0, 1.0, 1.0);
        context.move_to(origin_x, origin_y);
        context.show_text(text).map_err(render_error)?;
    }

    surface_to_rgba_image(&mut surface, width, height)
}

fn render_error(err: cairo::Error) -> StampError {
    StampError::Render {
        message: err.to_string(),
    }
}

/// Top-left corner of the caption box, clamped so that neither the glyphs
/// nor the shadow leave the image.
fn caption_origin(
    corner: StampCorner,
    text_width: f64,
    text_height: f64,
    image_width: f64,
    image_height: f64,
) -> (f64, f64) {
    let (x, y) = match corner {
        StampCorner::TopLeft => (STAMP_MARGIN, STAMP_MARGIN),
        StampCorner::TopRight => (image_width - text_width - STAMP_MARGIN, STAMP_MARGIN),
        StampCorner::BottomLeft => (STAMP_MARGIN, image_height - text_height - STAMP_MARGIN),
        StampCorner::BottomRight => (
            image_width - text_width - STAMP_MARGIN,
            image_height - text_height - STAMP_MARGIN,
        ),
    };

    let max_x = (image_width - text_width - STAMP_SHADOW_OFFSET).max(0.0);
    let max_y = (image_height - text_height - STAMP_SHADOW_OFFSET).max(0.0);
    (x.clamp(0.0, max_x), y.clamp(0.0, max_y))
}

fn rgba_image_to_surface(image: &RgbaImage) -> StampResult<cairo::ImageSurface> {
    let width = i32::try_from(image.width()).map_err(|_| surface_error("width overflow"))?;
    let height = i32::try_from(image.height()).map_err(|_| surface_error("height overflow"))?;

    let mut surface = cairo::ImageSurface::create(cairo::Format::ARgb32, width, height)
        .map_err(|err| surface_error(&err.to_string()))?;
    let stride = usize::try_from(surface.stride()).map_err(|_| surface_error("invalid stride"))?;

    {
        let mut data = surface
            .data()
            .map_err(|err| surface_error(&err.to_string()))?;
        let src = image.as_raw();
        let row_len = image.width() as usize * 4;

        for (row, src_row) in src.chunks_exact(row_len).enumerate() {
            let dst_row = &mut data[row * stride..row * stride + row_len];
            for (src_pixel, dst_pixel) in
                src_row.chunks_exact(4).zip(dst_row.chunks_exact_mut(4))
            {
                let [r, g, b, a] = [src_pixel[0], src_pixel[1], src_pixel[2], src_pixel[3]];
                // ARgb32 is premultiplied, little-endian BGRA in memory
                match a {
                    0 => dst_pixel.copy_from_slice(&[0, 0, 0, 0]),
                    255 => dst_pixel.copy_from_slice(&[b, g, r, 255]),
                    _ => {
                        let alpha = u16::from(a);
                        let premul =
                            |channel: u8| ((u16::from(channel) * alpha + 127) / 255) as u8;
                        dst_pixel.copy_from_slice(&[premul(b), premul(g), premul(r), a]);
                    }
                }
            }
        }
    }

    surface.flush();
    Ok(surface)
}

fn surface_to_rgba_image(
    surface: &mut cairo::ImageSurface,
    width: u32,
    height: u32,
) -> StampResult<RgbaImage> {
    surface.flush();
    let stride = usize::try_from(surface.stride()).map_err(|_| surface_error("invalid stride"))?;
    let data = surface
        .data()
        .map_err(|err| surface_error(&err.to_string()))?;

    let row_len = width as usize * 4;
    let mut pixels = vec![0u8; row_len * height as usize];

    for row in 0..height as usize {
        let src_row = &data[row * stride..row * stride + row_len];
        let dst_row = &mut pixels[row * row_len..(row + 1) * row_len];
        for (src_pixel, dst_pixel) in src_row.chunks_exact(4).zip(dst_row.chunks_exact_mut(4)) {
            let [b, g, r, a] = [src_pixel[0], src_pixel[1], src_pixel[2], src_pixel[3]];
            match a {
                0 => dst_pixel.copy_from_slice(&[0, 0, 0, 0]),
                255 => dst_pixel.copy_from_slice(&[r, g, b, 255]),
                _ => {
                    let alpha = u16::from(a);
                    let unpremul = |channel: u8| {
                        ((u16::from(channel) * 255 + alpha / 2) / alpha).min(255) as u8
                    };
                    dst_pixel.copy_from_slice(&[unpremul(r), unpremul(g), unpremul(b), a]);
                }
            }
        }
    }

    RgbaImage::from_raw(width, height, pixels).ok_or_else(|| surface_error("pixel copy mismatch"))
}

fn surface_error(message: &str) -> StampError {
    StampError::Surface {
        message: message.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const ALL_CORNERS: [StampCorner; 4] = [
        StampCorner::TopLeft,
        StampCorner::TopRight,
        StampCorner::BottomLeft,
        StampCorner::BottomRight,
    ];

    fn checkered(width: u32, height: u32) -> RgbaImage {
        RgbaImage::from_fn(width, height, |x, y| {
            if (x + y) % 2 == 0 {
                image::Rgba([200, 30, 90, 255])
            } else {
                image::Rgba([10, 120, 250, 255])
            }
        })
    }

    #[test]
    fn caption_origin_stays_inside_small_and_large_images() {
        // text box measured for a typical caption at the stamp font size
        let (text_width, text_height) = (170.0, 12.0);
        for (image_width, image_height) in [(50.0, 50.0), (4000.0, 3000.0)] {
            for corner in ALL_CORNERS {
                let (x, y) = caption_origin(corner, text_width, text_height, image_width, image_height);
                assert!(x >= 0.0, "{corner:?} x origin left of image");
                assert!(y >= 0.0, "{corner:?} y origin above image");
                assert!(
                    x + text_width + STAMP_SHADOW_OFFSET <= image_width || x == 0.0,
                    "{corner:?} caption overflows the right edge"
                );
                assert!(
                    y + text_height + STAMP_SHADOW_OFFSET <= image_height || y == 0.0,
                    "{corner:?} caption overflows the bottom edge"
                );
            }
        }
    }

    #[test]
    fn caption_origin_respects_margins_when_space_allows() {
        let (x, y) = caption_origin(StampCorner::TopLeft, 170.0, 12.0, 1920.0, 1080.0);
        assert_eq!((x, y), (STAMP_MARGIN, STAMP_MARGIN));

        let (x, y) = caption_origin(StampCorner::BottomRight, 170.0, 12.0, 1920.0, 1080.0);
        assert_eq!((x, y), (1920.0 - 170.0 - STAMP_MARGIN, 1080.0 - 12.0 - STAMP_MARGIN));
    }

    #[test]
    fn surface_round_trip_preserves_opaque_pixels() {
        let source = checkered(31, 17);
        let mut surface = rgba_image_to_surface(&source).expect("surface should build");
        let restored =
            surface_to_rgba_image(&mut surface, 31, 17).expect("surface should convert back");
        assert_eq!(restored, source);
    }

    #[test]
    fn stamp_copies_instead_of_mutating_the_input() {
        let source = checkered(640, 480);
        let before = source.clone();

        let stamped = stamp_timestamp(&source, StampCorner::BottomRight, "2026-08-07 12:00:00")
            .expect("stamp should succeed");

        assert_eq!(source, before);
        assert_eq!(stamped.dimensions(), source.dimensions());
        assert_ne!(stamped, source);
    }

    #[test]
    fn stamp_handles_all_corners_of_a_tiny_image() {
        let source = checkered(50, 50);
        for corner in ALL_CORNERS {
            let stamped = stamp_timestamp(&source, corner, "2026-08-07 12:00:00")
                .expect("stamping a tiny image should still succeed");
            assert_eq!(stamped.dimensions(), (50, 50));
        }
    }

    #[test]
    fn stamp_rejects_an_empty_image() {
        let source = RgbaImage::new(0, 0);
        let err = stamp_timestamp(&source, StampCorner::TopLeft, "caption")
            .expect_err("empty image cannot be captioned");
        assert!(matches!(err, StampError::Surface { .. }));
    }
}
