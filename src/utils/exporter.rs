use std::path::Path;

use image::{DynamicImage, ImageFormat, ImageResult, RgbaImage};

use crate::canvas::document::Document;
use crate::render::compositor::Compositor;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ExportFormat {
    PNG,
    JPEG,
    TIFF,
}

impl ExportFormat {
    pub fn label(&self) -> &'static str {
        match self {
            ExportFormat::PNG => "PNG",
            ExportFormat::JPEG => "JPEG",
            ExportFormat::TIFF => "TIFF",
        }
    }

    pub fn extension(&self) -> &'static str {
        match self {
            ExportFormat::PNG => "png",
            ExportFormat::JPEG => "jpg",
            ExportFormat::TIFF => "tiff",
        }
    }

    /// Guess from a file extension, case-insensitively.
    pub fn from_path(path: &Path) -> Option<Self> {
        let ext = path.extension()?.to_str()?.to_ascii_lowercase();
        match ext.as_str() {
            "png" => Some(ExportFormat::PNG),
            "jpg" | "jpeg" => Some(ExportFormat::JPEG),
            "tif" | "tiff" => Some(ExportFormat::TIFF),
            _ => None,
        }
    }

    fn image_format(&self) -> ImageFormat {
        match self {
            ExportFormat::PNG => ImageFormat::Png,
            ExportFormat::JPEG => ImageFormat::Jpeg,
            ExportFormat::TIFF => ImageFormat::Tiff,
        }
    }
}

/// Export the flattened document (all visible layers composited) to an image file.
pub fn export_document(doc: &Document, path: &Path, format: ExportFormat) -> ImageResult<()> {
    let flat = Compositor::new().flatten(doc.layers(), doc.canvas_size());
    save_image(flat, path, format)
}

/// Write an RGBA image; JPEG drops the alpha channel.
pub fn save_image(img: RgbaImage, path: &Path, format: ExportFormat) -> ImageResult<()> {
    match format {
        ExportFormat::JPEG => DynamicImage::ImageRgba8(img)
            .to_rgb8()
            .save_with_format(path, format.image_format()),
        _ => img.save_with_format(path, format.image_format()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::canvas::tile::{Pixel, TileCoord};

    #[test]
    fn format_is_guessed_from_extension() {
        assert_eq!(ExportFormat::from_path(Path::new("a/b.PNG")), Some(ExportFormat::PNG));
        assert_eq!(ExportFormat::from_path(Path::new("x.jpeg")), Some(ExportFormat::JPEG));
        assert_eq!(ExportFormat::from_path(Path::new("x.tif")), Some(ExportFormat::TIFF));
        assert_eq!(ExportFormat::from_path(Path::new("x.cmc")), None);
        assert_eq!(ExportFormat::from_path(Path::new("noext")), None);
    }

    #[test]
    fn png_export_round_trips_pixels() {
        let mut doc = Document::with_canvas_size(8, 4);
        if let Some(layer) = doc.layers_mut().active_layer_mut() {
            layer
                .tiles_mut()
                .get_or_create_tile(TileCoord::new(0, 0))
                .set_pixel_at(2, 1, Pixel::new(10, 20, 30, 255));
        }
        let path = std::env::temp_dir().join(format!("rusty_canvas_export_{}.png", std::process::id()));
        export_document(&doc, &path, ExportFormat::PNG).expect("export");

        let img = image::open(&path).expect("reopen").to_rgba8();
        let _ = std::fs::remove_file(&path);
        assert_eq!(img.dimensions(), (8, 4));
        assert_eq!(img.get_pixel(2, 1).0, [10, 20, 30, 255]);
        assert_eq!(img.get_pixel(0, 0).0, [0, 0, 0, 0]);
    }
}
