use super::layer::{Layer, LayerId};

/// Ordered collection of layers. Index 0 is the bottom (rendered first).
#[derive(Clone, Debug)]
pub struct LayerStack {
    layers: Vec<Layer>,
    active_layer_id: LayerId,
    next_id: LayerId,
}

impl Default for LayerStack {
    fn default() -> Self {
        Self::new()
    }
}

impl LayerStack {
    /// An empty stack. Documents always add a first layer right away.
    pub fn new() -> Self {
        Self {
            layers: Vec::new(),
            active_layer_id: 0,
            next_id: 1,
        }
    }

    /// Add a new empty layer on top and make it active.
    pub fn add_layer(&mut self, name: &str) -> &mut Layer {
        let id = self.allocate_id();
        self.layers.push(Layer::new(id, name));
        self.active_layer_id = id;
        let top = self.layers.len() - 1;
        &mut self.layers[top]
    }

    /// Insert a layer at `index` (clamped to the valid range).
    ///
    /// Refused (returns `None`) when the id is in use or was handed out
    /// before, so ids stay unique for the stack's lifetime.
    pub fn insert_layer(&mut self, index: usize, layer: Layer) -> Option<&mut Layer> {
        if layer.id() < self.next_id {
            log::warn!("refusing to insert layer with stale id {}", layer.id());
            return None;
        }
        Some(self.place_layer(index, layer))
    }

    /// Rebuild path for loaders. Only ids currently present are refused.
    pub(crate) fn restore_layer(&mut self, index: usize, layer: Layer) -> Option<&mut Layer> {
        if self.index_of(layer.id()).is_some() {
            return None;
        }
        Some(self.place_layer(index, layer))
    }

    /// Remove a layer by id. Refused (returns `None`) for the last remaining layer.
    pub fn remove_layer(&mut self, id: LayerId) -> Option<Layer> {
        let index = self.index_of(id)?;
        if self.layers.len() == 1 {
            log::warn!("refusing to remove the last layer ({id})");
            return None;
        }
        let removed = self.layers.remove(index);
        if self.active_layer_id == id {
            if let Some(top) = self.layers.last() {
                self.active_layer_id = top.id();
            }
        }
        Some(removed)
    }

    /// Move the layer at `from` to `to` (clamped). Invalid `from` is ignored.
    pub fn move_layer(&mut self, from: usize, to: usize) {
        if from >= self.layers.len() {
            return;
        }
        let to = to.min(self.layers.len() - 1);
        if from == to {
            return;
        }
        let layer = self.layers.remove(from);
        self.layers.insert(to, layer);
    }

    /// Deep copy a layer and insert it directly above the source.
    pub fn duplicate_layer(&mut self, id: LayerId) -> Option<&mut Layer> {
        let index = self.index_of(id)?;
        let new_id = self.allocate_id();
        let copy = self.layers[index].duplicate(new_id);
        Some(self.place_layer(index + 1, copy))
    }

    pub fn layer_by_id(&self, id: LayerId) -> Option<&Layer> {
        self.layers.iter().find(|l| l.id() == id)
    }

    pub fn layer_by_id_mut(&mut self, id: LayerId) -> Option<&mut Layer> {
        self.layers.iter_mut().find(|l| l.id() == id)
    }

    pub fn layer_at(&self, index: usize) -> Option<&Layer> {
        self.layers.get(index)
    }

    pub fn layer_at_mut(&mut self, index: usize) -> Option<&mut Layer> {
        self.layers.get_mut(index)
    }

    pub fn index_of(&self, id: LayerId) -> Option<usize> {
        self.layers.iter().position(|l| l.id() == id)
    }

    pub fn count(&self) -> usize {
        self.layers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.layers.is_empty()
    }

    /// Bottom-to-top (rendering order).
    pub fn iter(&self) -> std::slice::Iter<'_, Layer> {
        self.layers.iter()
    }

    pub fn layers(&self) -> &[Layer] {
        &self.layers
    }

    pub fn active_layer_id(&self) -> LayerId {
        self.active_layer_id
    }

    /// Select the active layer. Unknown ids are ignored.
    pub fn set_active_layer_id(&mut self, id: LayerId) -> bool {
        if self.index_of(id).is_none() {
            return false;
        }
        self.active_layer_id = id;
        true
    }

    pub fn active_layer(&self) -> Option<&Layer> {
        self.layer_by_id(self.active_layer_id)
    }

    pub fn active_layer_mut(&mut self) -> Option<&mut Layer> {
        self.layer_by_id_mut(self.active_layer_id)
    }

    /// The id the next new layer will receive.
    pub fn peek_next_id(&self) -> LayerId {
        self.next_id
    }

    /// Restore the allocator. Never goes at or below an id already in use.
    pub fn set_next_id(&mut self, next: LayerId) {
        let floor = self
            .layers
            .iter()
            .map(|l| l.id().saturating_add(1))
            .max()
            .unwrap_or(1);
        self.next_id = next.max(floor);
    }

    /// Drop every layer, keeping the id allocator so ids are never reused.
    pub(crate) fn take_layers(&mut self) -> Vec<Layer> {
        self.active_layer_id = 0;
        std::mem::take(&mut self.layers)
    }

    /// The allocator is advanced past the placed id so it is never handed out again.
    fn place_layer(&mut self, index: usize, layer: Layer) -> &mut Layer {
        let index = index.min(self.layers.len());
        self.next_id = self.next_id.max(layer.id().saturating_add(1));
        if self.layers.is_empty() {
            self.active_layer_id = layer.id();
        }
        self.layers.insert(index, layer);
        &mut self.layers[index]
    }

    fn allocate_id(&mut self) -> LayerId {
        let id = self.next_id;
        self.next_id += 1;
        id
    }
}
