//! Layer records held by a [`LayerStack`](crate::LayerStack).

use nalgebra::{DMatrix, DVector};

/// Face color given to reference landmark points (matplotlib C0).
pub const REFERENCE_FACE_COLOR: [f64; 4] = [0.122, 0.467, 0.706, 1.0];

/// Face color given to moving landmark points (matplotlib C1).
pub const MOVING_FACE_COLOR: [f64; 4] = [1.0, 0.498, 0.055, 1.0];

/// How a points layer responds to pointer input.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum InteractionMode {
    /// Clicks append new points.
    Add,
    /// Clicks pan and zoom the view; the layer data is inert.
    #[default]
    PanZoom,
}

/// A displayed image with a homogeneous transform attribute.
///
/// The pixel data itself lives outside the registration core; the session
/// only reads and writes the transform and the stacking position.
#[derive(Clone, Debug)]
pub struct ImageLayer {
    /// Display name.
    pub name: String,
    /// Spatial dimensionality of the image.
    pub ndim: usize,
    /// Homogeneous `(ndim + 1) x (ndim + 1)` transform into world space.
    pub affine: DMatrix<f64>,
}

impl ImageLayer {
    /// Create an image layer with an identity transform.
    pub fn new(name: impl Into<String>, ndim: usize) -> Self {
        Self {
            name: name.into(),
            ndim,
            affine: DMatrix::identity(ndim + 1, ndim + 1),
        }
    }
}

/// An ordered sequence of landmark points with display attributes.
#[derive(Clone, Debug)]
pub struct PointsLayer {
    /// Display name.
    pub name: String,
    /// Spatial dimensionality of every point in `data`.
    pub ndim: usize,
    /// Point coordinates in layer-local (data) space.
    pub data: Vec<DVector<f64>>,
    /// Whether this is the layer currently receiving user input.
    pub selected: bool,
    /// Pointer behavior.
    pub mode: InteractionMode,
    /// Homogeneous `(ndim + 1) x (ndim + 1)` transform into world space.
    pub affine: DMatrix<f64>,
    /// RGBA face color applied to newly added points.
    pub face_color: [f64; 4],
}

impl PointsLayer {
    /// Create an empty, unselected points layer with an identity transform.
    pub fn new(name: impl Into<String>, ndim: usize) -> Self {
        Self {
            name: name.into(),
            ndim,
            data: Vec::new(),
            selected: false,
            mode: InteractionMode::PanZoom,
            affine: DMatrix::identity(ndim + 1, ndim + 1),
            face_color: [1.0, 1.0, 1.0, 1.0],
        }
    }
}
