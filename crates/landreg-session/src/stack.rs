//! Ordered layer container with change notification for points layers.

use std::collections::{HashSet, VecDeque};

use nalgebra::{DMatrix, DVector};

use crate::layer::{ImageLayer, InteractionMode, PointsLayer};

/// Identifies a layer for the lifetime of the stack that created it.
///
/// Ids stay valid across reordering.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct LayerId(u64);

/// Either kind of layer a stack can hold.
#[derive(Clone, Debug)]
pub enum Layer {
    /// An image layer.
    Image(ImageLayer),
    /// A points layer.
    Points(PointsLayer),
}

impl Layer {
    /// Display name of the layer.
    pub fn name(&self) -> &str {
        match self {
            Layer::Image(layer) => &layer.name,
            Layer::Points(layer) => &layer.name,
        }
    }

    fn ndim(&self) -> usize {
        match self {
            Layer::Image(layer) => layer.ndim,
            Layer::Points(layer) => layer.ndim,
        }
    }
}

/// Notification that a subscribed points layer changed observably.
///
/// Point insertion, point removal and transform assignment all raise the
/// same event; consumers introspect the layer to decide what to do.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct LayerEvent {
    /// The layer that changed.
    pub layer: LayerId,
}

/// Errors from layer lookup and mutation.
#[derive(thiserror::Error, Debug)]
pub enum LayerError {
    /// No layer with this id exists in the stack.
    #[error("no layer with id {id:?} in the stack")]
    UnknownLayer {
        /// The offending id.
        id: LayerId,
    },

    /// The layer exists but is not an image layer.
    #[error("layer {id:?} is not an image layer")]
    NotAnImage {
        /// The offending id.
        id: LayerId,
    },

    /// The layer exists but is not a points layer.
    #[error("layer {id:?} is not a points layer")]
    NotPoints {
        /// The offending id.
        id: LayerId,
    },

    /// A point's dimensionality disagrees with its layer.
    #[error("expected a {expected}-dimensional point, got {got} coordinates")]
    PointDimension {
        /// Dimensionality of the layer.
        expected: usize,
        /// Dimensionality of the rejected point.
        got: usize,
    },

    /// A point index is out of range.
    #[error("point index {index} out of range for a layer with {len} points")]
    PointIndex {
        /// The rejected index.
        index: usize,
        /// Number of points in the layer.
        len: usize,
    },

    /// A transform's shape does not fit the layer's dimensionality.
    #[error("expected a {expected}x{expected} homogeneous transform, got {rows}x{cols}")]
    TransformShape {
        /// Required number of rows and columns.
        expected: usize,
        /// Rows of the rejected matrix.
        rows: usize,
        /// Columns of the rejected matrix.
        cols: usize,
    },
}

struct Slot {
    id: LayerId,
    layer: Layer,
}

/// An ordered collection of layers.
///
/// The vector order is the stacking order: index 0 renders at the bottom and
/// the last index on top. Mutations of points layers go through the stack so
/// that subscribers observe them; events queue in FIFO order and are drained
/// with [`pop_event`](LayerStack::pop_event).
#[derive(Default)]
pub struct LayerStack {
    slots: Vec<Slot>,
    subscribed: HashSet<LayerId>,
    events: VecDeque<LayerEvent>,
    next_id: u64,
}

impl LayerStack {
    /// Create an empty stack.
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of layers.
    pub fn len(&self) -> usize {
        self.slots.len()
    }

    /// Whether the stack holds no layers.
    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }

    /// Append an image layer at the top of the stacking order.
    pub fn add_image(&mut self, layer: ImageLayer) -> LayerId {
        self.insert(Layer::Image(layer))
    }

    /// Append a points layer at the top of the stacking order.
    pub fn add_points(&mut self, layer: PointsLayer) -> LayerId {
        self.insert(Layer::Points(layer))
    }

    fn insert(&mut self, layer: Layer) -> LayerId {
        let id = LayerId(self.next_id);
        self.next_id += 1;
        self.slots.push(Slot { id, layer });
        id
    }

    fn position(&self, id: LayerId) -> Result<usize, LayerError> {
        self.slots
            .iter()
            .position(|slot| slot.id == id)
            .ok_or(LayerError::UnknownLayer { id })
    }

    /// Stacking position of a layer, bottom first.
    pub fn index_of(&self, id: LayerId) -> Result<usize, LayerError> {
        self.position(id)
    }

    /// Ids in stacking order, bottom first.
    pub fn order(&self) -> Vec<LayerId> {
        self.slots.iter().map(|slot| slot.id).collect()
    }

    /// Iterate over layers in stacking order.
    pub fn iter(&self) -> impl Iterator<Item = (LayerId, &Layer)> {
        self.slots.iter().map(|slot| (slot.id, &slot.layer))
    }

    /// Look up a layer of either kind.
    pub fn get(&self, id: LayerId) -> Result<&Layer, LayerError> {
        let index = self.position(id)?;
        Ok(&self.slots[index].layer)
    }

    /// Look up an image layer.
    pub fn image(&self, id: LayerId) -> Result<&ImageLayer, LayerError> {
        match self.get(id)? {
            Layer::Image(layer) => Ok(layer),
            Layer::Points(_) => Err(LayerError::NotAnImage { id }),
        }
    }

    /// Look up a points layer.
    pub fn points(&self, id: LayerId) -> Result<&PointsLayer, LayerError> {
        match self.get(id)? {
            Layer::Points(layer) => Ok(layer),
            Layer::Image(_) => Err(LayerError::NotPoints { id }),
        }
    }

    fn points_mut(&mut self, id: LayerId) -> Result<&mut PointsLayer, LayerError> {
        let index = self.position(id)?;
        match &mut self.slots[index].layer {
            Layer::Points(layer) => Ok(layer),
            Layer::Image(_) => Err(LayerError::NotPoints { id }),
        }
    }

    /// Move a layer to the top of the stacking order.
    pub fn move_to_top(&mut self, id: LayerId) -> Result<(), LayerError> {
        let index = self.position(id)?;
        let slot = self.slots.remove(index);
        self.slots.push(slot);
        Ok(())
    }

    /// Start queueing [`LayerEvent`]s for a points layer.
    pub fn subscribe(&mut self, id: LayerId) -> Result<(), LayerError> {
        self.points(id)?;
        self.subscribed.insert(id);
        Ok(())
    }

    /// Stop queueing events for a points layer.
    pub fn unsubscribe(&mut self, id: LayerId) -> Result<(), LayerError> {
        self.points(id)?;
        self.subscribed.remove(&id);
        Ok(())
    }

    /// Whether events are queued for this layer.
    pub fn is_subscribed(&self, id: LayerId) -> bool {
        self.subscribed.contains(&id)
    }

    fn notify(&mut self, id: LayerId) {
        if self.subscribed.contains(&id) {
            self.events.push_back(LayerEvent { layer: id });
        }
    }

    /// Append a point to a points layer.
    pub fn add_point(&mut self, id: LayerId, point: DVector<f64>) -> Result<(), LayerError> {
        let layer = self.points_mut(id)?;
        if point.len() != layer.ndim {
            return Err(LayerError::PointDimension {
                expected: layer.ndim,
                got: point.len(),
            });
        }
        layer.data.push(point);
        self.notify(id);
        Ok(())
    }

    /// Remove the point at `index` from a points layer.
    pub fn remove_point(&mut self, id: LayerId, index: usize) -> Result<(), LayerError> {
        let layer = self.points_mut(id)?;
        if index >= layer.data.len() {
            return Err(LayerError::PointIndex {
                index,
                len: layer.data.len(),
            });
        }
        layer.data.remove(index);
        self.notify(id);
        Ok(())
    }

    /// Replace a layer's transform attribute.
    ///
    /// Valid for both layer kinds; subscribed points layers raise an event.
    pub fn set_affine(&mut self, id: LayerId, affine: DMatrix<f64>) -> Result<(), LayerError> {
        let index = self.position(id)?;
        let expected = self.slots[index].layer.ndim() + 1;
        if affine.nrows() != expected || affine.ncols() != expected {
            return Err(LayerError::TransformShape {
                expected,
                rows: affine.nrows(),
                cols: affine.ncols(),
            });
        }
        match &mut self.slots[index].layer {
            Layer::Image(layer) => layer.affine = affine,
            Layer::Points(layer) => layer.affine = affine,
        }
        self.notify(id);
        Ok(())
    }

    /// Switch a points layer's interaction mode.
    pub fn set_mode(&mut self, id: LayerId, mode: InteractionMode) -> Result<(), LayerError> {
        self.points_mut(id)?.mode = mode;
        Ok(())
    }

    /// Set or clear a points layer's selected flag.
    pub fn set_selected(&mut self, id: LayerId, selected: bool) -> Result<(), LayerError> {
        self.points_mut(id)?.selected = selected;
        Ok(())
    }

    /// Clear the selected flag on every points layer.
    pub fn unselect_all(&mut self) {
        for slot in &mut self.slots {
            if let Layer::Points(layer) = &mut slot.layer {
                layer.selected = false;
            }
        }
    }

    /// Take the oldest queued event, if any.
    pub fn pop_event(&mut self) -> Option<LayerEvent> {
        self.events.pop_front()
    }

    /// Number of queued events.
    pub fn pending_events(&self) -> usize {
        self.events.len()
    }

    /// Drop all queued events.
    pub fn clear_events(&mut self) {
        self.events.clear();
    }
}
