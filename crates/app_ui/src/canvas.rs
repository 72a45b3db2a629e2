//! egui painter behind the core `Renderer` trait

use app_core::{FontSpec, ImageRecord, Rect, Renderer, Rgb, ScaleCache, ScaleKey, TextAlign};
use egui::{pos2, vec2, Align2, Color32, ColorImage, FontId, LayerId, Painter, TextureHandle, TextureOptions};
use image::imageops::{self, FilterType};
use std::convert::Infallible;

/// Textures built for the current viewport, shared across frames
pub type TextureCache = ScaleCache<TextureHandle>;

/// Number of scaled textures kept alive
pub const TEXTURE_CACHE_CAPACITY: usize = 64;

/// Paints one frame onto the egui background layer.
///
/// Coordinates are egui points; textures are sized in physical pixels so
/// thumbnails stay sharp on high-DPI screens.
pub struct EguiCanvas<'a> {
    ctx: &'a egui::Context,
    painter: Painter,
    textures: &'a mut TextureCache,
    images_drawn: usize,
}

impl<'a> EguiCanvas<'a> {
    pub fn new(ctx: &'a egui::Context, textures: &'a mut TextureCache) -> Self {
        let size = ctx.screen_rect().size();
        textures.set_viewport(size.x, size.y);
        Self {
            painter: ctx.layer_painter(LayerId::background()),
            ctx,
            textures,
            images_drawn: 0,
        }
    }

    pub fn images_drawn(&self) -> usize {
        self.images_drawn
    }

    fn texture_for(&mut self, record: &ImageRecord, dest: Rect) -> TextureHandle {
        let ppp = self.ctx.pixels_per_point();
        let key = ScaleKey::new(record.hash, dest.width * ppp, dest.height * ppp);
        let ctx = self.ctx;

        self.textures
            .get_or_insert_with(key, |key| Ok::<_, Infallible>(upload(ctx, record, key)))
            .map(TextureHandle::clone)
            .unwrap_or_else(|never| match never {})
    }
}

/// Resize the decoded pixels to the target size and hand them to egui
fn upload(ctx: &egui::Context, record: &ImageRecord, key: ScaleKey) -> TextureHandle {
    let source = record.handle.pixels();
    let name = format!("image-{:016x}-{}x{}", key.image, key.width, key.height);

    // Never upscale on the CPU; the GPU sampler handles enlargement.
    let image = if key.width < source.width() && key.height < source.height() {
        let scaled = imageops::resize(source, key.width, key.height, FilterType::Triangle);
        ColorImage::from_rgba_unmultiplied([scaled.width() as usize, scaled.height() as usize], scaled.as_raw())
    } else {
        ColorImage::from_rgba_unmultiplied([source.width() as usize, source.height() as usize], source.as_raw())
    };

    tracing::trace!("Uploading texture {}", name);
    ctx.load_texture(name, image, TextureOptions::LINEAR)
}

pub fn color32(color: Rgb) -> Color32 {
    Color32::from_rgb(color.r(), color.g(), color.b())
}

fn to_egui(rect: Rect) -> egui::Rect {
    egui::Rect::from_min_size(pos2(rect.x, rect.y), vec2(rect.width, rect.height))
}

impl Renderer for EguiCanvas<'_> {
    fn clear(&mut self, color: Rgb) {
        self.painter.rect_filled(self.ctx.screen_rect(), 0.0, color32(color));
    }

    fn draw_image(&mut self, record: &ImageRecord, dest: Rect, opacity: u8) {
        let target = to_egui(dest);
        if opacity == 0 || !self.ctx.screen_rect().intersects(target) {
            return;
        }

        let texture = self.texture_for(record, dest);
        let uv = egui::Rect::from_min_max(pos2(0.0, 0.0), pos2(1.0, 1.0));
        self.painter
            .image(texture.id(), target, uv, Color32::from_white_alpha(opacity));
        self.images_drawn += 1;
    }

    fn draw_text(&mut self, text: &str, position: (f32, f32), color: Rgb, font: FontSpec) {
        let anchor = match font.align {
            TextAlign::Left => Align2::LEFT_TOP,
            TextAlign::Center => Align2::CENTER_TOP,
        };
        self.painter.text(
            pos2(position.0, position.1),
            anchor,
            text,
            FontId::proportional(font.size),
            color32(color),
        );
    }

    fn present(&mut self) {
        // Submission happens after egui tessellates the frame.
        tracing::trace!("Frame painted with {} images", self.images_drawn);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use app_core::{Catalog, ImageHandle};
    use image::{Rgba, RgbaImage};

    fn catalog() -> Catalog {
        let mut catalog = Catalog::new();
        let pixels = RgbaImage::from_pixel(64, 32, Rgba([10, 20, 30, 255]));
        catalog.push(ImageHandle::new(pixels), 64, 32, "wide", 7);
        catalog
    }

    fn frame(ctx: &egui::Context, cache: &mut TextureCache, record: &ImageRecord, dest: Rect, opacity: u8) -> usize {
        let mut drawn = 0;
        let _ = ctx.run(egui::RawInput::default(), |ctx| {
            let mut canvas = EguiCanvas::new(ctx, cache);
            canvas.clear(Rgb::BLACK);
            canvas.draw_image(record, dest, opacity);
            canvas.draw_text("wide", (10.0, 10.0), Rgb::WHITE, FontSpec::CAPTION);
            canvas.present();
            drawn = canvas.images_drawn();
        });
        drawn
    }

    #[test]
    fn test_textures_are_reused_between_frames() {
        let ctx = egui::Context::default();
        let mut cache = TextureCache::new(TEXTURE_CACHE_CAPACITY);
        let catalog = catalog();
        let record = catalog.get(0).unwrap();
        let dest = Rect::new(10.0, 10.0, 32.0, 16.0);

        assert_eq!(frame(&ctx, &mut cache, record, dest, 255), 1);
        assert_eq!(frame(&ctx, &mut cache, record, dest, 128), 1);

        let stats = cache.stats();
        assert_eq!(stats.misses, 1);
        assert_eq!(stats.hits, 1);
    }

    #[test]
    fn test_invisible_images_are_skipped() {
        let ctx = egui::Context::default();
        let mut cache = TextureCache::new(TEXTURE_CACHE_CAPACITY);
        let catalog = catalog();
        let record = catalog.get(0).unwrap();

        assert_eq!(frame(&ctx, &mut cache, record, Rect::new(10.0, 10.0, 32.0, 16.0), 0), 0);
        assert_eq!(frame(&ctx, &mut cache, record, Rect::new(-5000.0, 10.0, 32.0, 16.0), 255), 0);
        assert_eq!(cache.stats().entries, 0);
    }

    #[test]
    fn test_color_conversion() {
        assert_eq!(color32(Rgb([1, 2, 3])), Color32::from_rgb(1, 2, 3));
    }
}
