use std::path::{Path, PathBuf};

use super::history::{History, HistoryCommand};
use super::layer_stack::LayerStack;
use crate::settings::EngineSettings;

/// A4 at 300 DPI.
pub const DEFAULT_CANVAS_SIZE: (u32, u32) = (2480, 3508);
pub const DEFAULT_DPI: u32 = 300;

/// Root document: canvas geometry, layers and undo history.
pub struct Document {
    canvas_size: (u32, u32),
    dpi: u32,
    layers: LayerStack,
    history: History,
    file_path: Option<PathBuf>,
    dirty: bool,
}

impl Default for Document {
    fn default() -> Self {
        Self::new()
    }
}

impl Document {
    /// Default-sized document with one empty layer.
    pub fn new() -> Self {
        Self::with_canvas_size(DEFAULT_CANVAS_SIZE.0, DEFAULT_CANVAS_SIZE.1)
    }

    pub fn with_canvas_size(width: u32, height: u32) -> Self {
        Self::with_settings(width, height, &EngineSettings::default())
    }

    pub fn with_settings(width: u32, height: u32, settings: &EngineSettings) -> Self {
        let mut layers = LayerStack::new();
        layers.add_layer("Layer 1");
        Self {
            canvas_size: (width, height),
            dpi: DEFAULT_DPI,
            layers,
            history: History::new(settings.history_memory_limit),
            file_path: None,
            dirty: false,
        }
    }

    /// (width, height) in pixels.
    pub fn canvas_size(&self) -> (u32, u32) {
        self.canvas_size
    }

    /// Display metadata only; does not affect tile geometry.
    pub fn dpi(&self) -> u32 {
        self.dpi
    }

    pub fn set_dpi(&mut self, dpi: u32) {
        self.dpi = dpi;
    }

    pub fn layers(&self) -> &LayerStack {
        &self.layers
    }

    pub fn layers_mut(&mut self) -> &mut LayerStack {
        &mut self.layers
    }

    pub fn history(&self) -> &History {
        &self.history
    }

    pub fn history_mut(&mut self) -> &mut History {
        &mut self.history
    }

    pub fn file_path(&self) -> Option<&Path> {
        self.file_path.as_deref()
    }

    pub fn set_file_path(&mut self, path: Option<PathBuf>) {
        self.file_path = path;
    }

    pub fn is_dirty(&self) -> bool {
        self.dirty
    }

    pub fn set_dirty(&mut self, dirty: bool) {
        self.dirty = dirty;
    }

    /// Apply and record a command against this document's layers.
    pub fn push_command(&mut self, command: Box<dyn HistoryCommand>) {
        self.history.push(command, &mut self.layers);
        self.dirty = true;
    }

    pub fn undo(&mut self) {
        if self.history.can_undo() {
            self.history.undo(&mut self.layers);
            self.dirty = true;
        }
    }

    pub fn redo(&mut self) {
        if self.history.can_redo() {
            self.history.redo(&mut self.layers);
            self.dirty = true;
        }
    }
}
