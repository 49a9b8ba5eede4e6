use std::collections::{HashMap, VecDeque};

use super::layer::LayerId;
use super::layer_stack::LayerStack;
use super::tile::{Tile, TileCoord, TILE_BYTES};

/// Default retention budget for undo data.
pub const DEFAULT_HISTORY_MEMORY: usize = 256 * 1024 * 1024;

/// Per-tile state captured on one side of a stroke. `None` means the tile
/// did not exist (or held no pixels).
pub type TileStates = HashMap<TileCoord, Option<Tile>>;

/// An undoable action. Commands act on the layer stack they are handed, so
/// they never hold references into the document.
pub trait HistoryCommand {
    fn undo(&mut self, layers: &mut LayerStack);
    fn redo(&mut self, layers: &mut LayerStack);
    /// Bytes of snapshot data retained by this command.
    fn memory_usage(&self) -> usize;
    fn description(&self) -> &str;
}

/// Undo/redo stacks bounded by total command memory.
pub struct History {
    undo_stack: VecDeque<Box<dyn HistoryCommand>>,
    redo_stack: Vec<Box<dyn HistoryCommand>>,
    max_memory: usize,
    current_memory: usize,
}

impl Default for History {
    fn default() -> Self {
        Self::new(DEFAULT_HISTORY_MEMORY)
    }
}

impl History {
    pub fn new(max_memory: usize) -> Self {
        Self {
            undo_stack: VecDeque::new(),
            redo_stack: Vec::new(),
            max_memory,
            current_memory: 0,
        }
    }

    /// Apply `command` (via `redo`), record it, and drop the redo branch.
    pub fn push(&mut self, mut command: Box<dyn HistoryCommand>, layers: &mut LayerStack) {
        command.redo(layers);
        self.current_memory += command.memory_usage();
        self.undo_stack.push_back(command);

        for dropped in self.redo_stack.drain(..) {
            self.current_memory = self.current_memory.saturating_sub(dropped.memory_usage());
        }

        self.trim_to_memory_limit();
    }

    pub fn undo(&mut self, layers: &mut LayerStack) {
        if let Some(mut command) = self.undo_stack.pop_back() {
            command.undo(layers);
            self.redo_stack.push(command);
        }
    }

    pub fn redo(&mut self, layers: &mut LayerStack) {
        if let Some(mut command) = self.redo_stack.pop() {
            command.redo(layers);
            self.undo_stack.push_back(command);
        }
    }

    pub fn can_undo(&self) -> bool {
        !self.undo_stack.is_empty()
    }

    pub fn can_redo(&self) -> bool {
        !self.redo_stack.is_empty()
    }

    pub fn clear(&mut self) {
        self.undo_stack.clear();
        self.redo_stack.clear();
        self.current_memory = 0;
    }

    pub fn undo_count(&self) -> usize {
        self.undo_stack.len()
    }

    pub fn redo_count(&self) -> usize {
        self.redo_stack.len()
    }

    pub fn memory_usage(&self) -> usize {
        self.current_memory
    }

    pub fn memory_limit(&self) -> usize {
        self.max_memory
    }

    /// Change the budget, evicting old entries if it is now exceeded.
    pub fn set_memory_limit(&mut self, max_memory: usize) {
        self.max_memory = max_memory;
        self.trim_to_memory_limit();
    }

    /// Description of the command `undo` would revert.
    pub fn undo_description(&self) -> Option<&str> {
        self.undo_stack.back().map(|c| c.description())
    }

    /// Forget the oldest undo entries until the budget is met.
    fn trim_to_memory_limit(&mut self) {
        while self.current_memory > self.max_memory {
            let Some(oldest) = self.undo_stack.pop_front() else {
                break;
            };
            let freed = oldest.memory_usage();
            self.current_memory = self.current_memory.saturating_sub(freed);
            log::debug!(
                "history evicted '{}' ({} bytes), {} bytes retained",
                oldest.description(),
                freed,
                self.current_memory
            );
        }
    }
}

/// Undo record for one finished brush stroke.
///
/// Built after the stroke has already been rasterized, so the first `redo`
/// (issued by [`History::push`]) is a no-op.
pub struct StrokeCommand {
    layer_id: LayerId,
    coords: Vec<TileCoord>,
    before: TileStates,
    after: TileStates,
    first_redo: bool,
}

impl StrokeCommand {
    /// Capture the "after" state of every affected tile from `layers`.
    pub fn new(
        layers: &LayerStack,
        layer_id: LayerId,
        affected: Vec<TileCoord>,
        before: TileStates,
    ) -> Self {
        let after = match layers.layer_by_id(layer_id) {
            Some(layer) => affected
                .iter()
                .map(|&coord| {
                    let state = layer.tiles().tile_at(coord).filter(|t| !t.is_empty()).cloned();
                    (coord, state)
                })
                .collect(),
            None => HashMap::new(),
        };
        Self {
            layer_id,
            coords: affected,
            before,
            after,
            first_redo: true,
        }
    }

    pub fn layer_id(&self) -> LayerId {
        self.layer_id
    }

    pub fn affected_tiles(&self) -> &[TileCoord] {
        &self.coords
    }

    fn apply(&self, layers: &mut LayerStack, states: &TileStates) {
        let Some(layer) = layers.layer_by_id_mut(self.layer_id) else {
            log::debug!("stroke target layer {} no longer exists", self.layer_id);
            return;
        };
        let tiles = layer.tiles_mut();
        for &coord in &self.coords {
            match states.get(&coord) {
                Some(Some(tile)) => {
                    let mut restored = tile.clone();
                    restored.set_dirty(true);
                    tiles.insert_tile(restored);
                }
                _ => {
                    tiles.remove_tile(coord);
                }
            }
        }
    }
}

impl HistoryCommand for StrokeCommand {
    fn undo(&mut self, layers: &mut LayerStack) {
        self.apply(layers, &self.before);
    }

    fn redo(&mut self, layers: &mut LayerStack) {
        if self.first_redo {
            self.first_redo = false;
            return;
        }
        self.apply(layers, &self.after);
    }

    fn memory_usage(&self) -> usize {
        let stored = self
            .before
            .values()
            .chain(self.after.values())
            .filter(|t| t.is_some())
            .count();
        stored * TILE_BYTES
    }

    fn description(&self) -> &str {
        "Brush stroke"
    }
}
