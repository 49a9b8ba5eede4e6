use std::path::Path;

use image::ImageResult;

use crate::brush_engine::brush::BrushEngine;
use crate::brush_engine::brush_options::BrushOptions;
use crate::brush_engine::stroke::{CanvasPoint, ToolType};
use crate::canvas::document::Document;
use crate::canvas::history::StrokeCommand;
use crate::canvas::layer::LayerId;
use crate::canvas::tile::{Tile, TileCoord};
use crate::format::{self, CmcError};
use crate::render::compositor::Compositor;
use crate::render::tile_cache::{TextureHandle, TextureUploader, TileCache};
use crate::settings::EngineSettings;
use crate::utils::color::Color;
use crate::utils::exporter::{self, ExportFormat};

/// One open document plus the tool state and brush engine that drive it.
///
/// This is the surface an input layer talks to: pointer events become
/// `stroke_*` calls, menu actions become `undo`/`save`/`open`.
pub struct PaintSession {
    settings: EngineSettings,
    document: Document,
    engine: BrushEngine,
    options: BrushOptions,
    stroke_layer: Option<LayerId>,
    compositor: Compositor,
    tile_cache: TileCache,
}

impl Default for PaintSession {
    fn default() -> Self {
        Self::new()
    }
}

impl PaintSession {
    pub fn new() -> Self {
        Self::with_settings(EngineSettings::default())
    }

    pub fn with_settings(settings: EngineSettings) -> Self {
        let document = Document::with_settings(
            crate::canvas::document::DEFAULT_CANVAS_SIZE.0,
            crate::canvas::document::DEFAULT_CANVAS_SIZE.1,
            &settings,
        );
        Self {
            engine: BrushEngine::with_spacing(settings.dab_spacing),
            tile_cache: TileCache::new(settings.tile_cache_capacity),
            settings,
            document,
            options: BrushOptions::default(),
            stroke_layer: None,
            compositor: Compositor::new(),
        }
    }

    pub fn settings(&self) -> &EngineSettings {
        &self.settings
    }

    pub fn document(&self) -> &Document {
        &self.document
    }

    pub fn document_mut(&mut self) -> &mut Document {
        &mut self.document
    }

    pub fn options(&self) -> &BrushOptions {
        &self.options
    }

    pub fn tool(&self) -> ToolType {
        self.options.tool
    }

    pub fn set_tool(&mut self, tool: ToolType) {
        self.options.tool = tool;
    }

    pub fn color(&self) -> Color {
        self.options.color
    }

    pub fn set_color(&mut self, color: Color) {
        self.options.color = color;
    }

    pub fn brush_size(&self) -> f32 {
        self.options.size()
    }

    pub fn set_brush_size(&mut self, size: f32) {
        self.options.set_size(size);
    }

    pub fn brush_hardness(&self) -> f32 {
        self.options.hardness()
    }

    pub fn set_brush_hardness(&mut self, hardness: f32) {
        self.options.set_hardness(hardness);
    }

    pub fn is_stroking(&self) -> bool {
        self.engine.is_active()
    }

    /// Replace the document with a blank one. Any active stroke is dropped.
    pub fn new_document(&mut self, width: u32, height: u32, dpi: u32) {
        self.reset_stroke();
        let mut document = Document::with_settings(width, height, &self.settings);
        document.set_dpi(dpi);
        self.document = document;
        self.tile_cache.clear(&mut ());
        log::debug!("new document {width}x{height} @ {dpi} dpi");
    }

    /// Pointer down. Returns whether a stroke started: only brush tools paint,
    /// and only on an unlocked active layer.
    pub fn stroke_started(&mut self, x: f32, y: f32, pressure: f32) -> bool {
        if !self.options.tool.uses_brush() {
            return false;
        }
        let Some(layer) = self.document.layers().active_layer() else {
            return false;
        };
        if layer.locked {
            return false;
        }

        let stroke = self.options.stroke_for(layer.id());
        if !self.engine.begin_stroke(layer, stroke) {
            return false;
        }
        self.stroke_layer = Some(layer.id());
        self.engine
            .add_point(self.document.layers_mut(), CanvasPoint::new(x, y, pressure));
        true
    }

    pub fn stroke_updated(&mut self, x: f32, y: f32, pressure: f32) {
        if !self.engine.is_active() {
            return;
        }
        self.engine
            .add_point(self.document.layers_mut(), CanvasPoint::new(x, y, pressure));
    }

    /// Pointer up: record the stroke for undo and mark the document dirty.
    pub fn stroke_ended(&mut self) {
        if !self.engine.is_active() {
            return;
        }
        let affected = self.engine.end_stroke();
        let before = self.engine.take_before_snapshots();

        if let Some(layer_id) = self.stroke_layer.take() {
            if !affected.is_empty() {
                for &coord in &affected {
                    self.tile_cache.invalidate(coord);
                }
                let command = StrokeCommand::new(self.document.layers(), layer_id, affected, before);
                self.document.push_command(Box::new(command));
            }
        }
        self.document.set_dirty(true);
    }

    /// Abort the active stroke without recording it.
    pub fn stroke_cancelled(&mut self) {
        self.reset_stroke();
    }

    /// Ignored while a stroke is in progress.
    pub fn undo(&mut self) {
        if self.engine.is_active() || !self.document.history().can_undo() {
            return;
        }
        self.document.undo();
        self.tile_cache.invalidate_all();
    }

    /// Ignored while a stroke is in progress.
    pub fn redo(&mut self) {
        if self.engine.is_active() || !self.document.history().can_redo() {
            return;
        }
        self.document.redo();
        self.tile_cache.invalidate_all();
    }

    pub fn can_undo(&self) -> bool {
        self.document.history().can_undo()
    }

    pub fn can_redo(&self) -> bool {
        self.document.history().can_redo()
    }

    pub fn is_dirty(&self) -> bool {
        self.document.is_dirty()
    }

    pub fn file_path(&self) -> Option<&Path> {
        self.document.file_path()
    }

    /// Save to `path` and make it the document's path.
    pub fn save(&mut self, path: impl AsRef<Path>) -> Result<(), CmcError> {
        let path = path.as_ref();
        format::save(&self.document, path)?;
        self.document.set_file_path(Some(path.to_path_buf()));
        self.document.set_dirty(false);
        Ok(())
    }

    /// Replace the document with the one stored at `path`. On failure the
    /// current document is kept.
    pub fn open(&mut self, path: impl AsRef<Path>) -> Result<(), CmcError> {
        let mut loaded = format::load(path)?;
        loaded.history_mut().set_memory_limit(self.settings.history_memory_limit);
        self.reset_stroke();
        self.document = loaded;
        self.tile_cache.clear(&mut ());
        Ok(())
    }

    pub fn export(&self, path: &Path, format: ExportFormat) -> ImageResult<()> {
        exporter::export_document(&self.document, path, format)
    }

    /// Texture for the composited tile at `coord`, (re)uploaded through
    /// `uploader` when it is missing or stale.
    pub fn tile_texture<U: TextureUploader + ?Sized>(
        &mut self,
        coord: TileCoord,
        uploader: &mut U,
    ) -> TextureHandle {
        if let Some(handle) = self.tile_cache.fresh_handle(coord) {
            return handle;
        }
        let mut tile = Tile::new(coord);
        tile.set_data(self.compositor.composite_tile(self.document.layers(), coord));
        self.tile_cache.get_or_upload(&tile, uploader)
    }

    pub fn tile_cache(&self) -> &TileCache {
        &self.tile_cache
    }

    fn reset_stroke(&mut self) {
        if self.engine.is_active() {
            self.engine.cancel_stroke();
        }
        self.stroke_layer = None;
    }
}
