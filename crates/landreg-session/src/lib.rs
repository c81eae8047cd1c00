#![deny(missing_docs)]
#![doc = env!("CARGO_PKG_DESCRIPTION")]

mod layer;
mod session;
mod stack;

pub use crate::layer::{
    ImageLayer, InteractionMode, PointsLayer, MOVING_FACE_COLOR, REFERENCE_FACE_COLOR,
};
pub use crate::session::{AlignmentSession, Effect, SessionError, SessionState};
pub use crate::stack::{Layer, LayerError, LayerEvent, LayerId, LayerStack};

pub use landreg_estimate::ModelFamily;
