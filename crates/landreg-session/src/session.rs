//! Correspondence session driving landmark collection and estimation.

use nalgebra::{DMatrix, DVector};

use landreg_estimate::{estimate_transform, EstimateError, ModelFamily};

use crate::layer::{InteractionMode, PointsLayer, MOVING_FACE_COLOR, REFERENCE_FACE_COLOR};
use crate::stack::{LayerError, LayerId, LayerStack};

/// Where the session sits in the landmark collection loop.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SessionState {
    /// Collecting points on the reference side.
    AwaitingReference,
    /// Collecting points on the moving side.
    AwaitingMoving,
    /// Finished; the session no longer reacts to anything.
    Terminated,
}

/// A single mutation a transition asks to be applied to the stack.
///
/// Transitions compute effects without touching the stack; the session
/// applies them afterwards, in order.
#[derive(Clone, Debug, PartialEq)]
pub enum Effect {
    /// Set or clear a points layer's selected flag.
    SetSelected {
        /// Target layer.
        layer: LayerId,
        /// New flag value.
        selected: bool,
    },
    /// Switch a points layer's interaction mode.
    SetMode {
        /// Target layer.
        layer: LayerId,
        /// New mode.
        mode: InteractionMode,
    },
    /// Move a layer to the top of the stacking order.
    RaiseToTop {
        /// Target layer.
        layer: LayerId,
    },
    /// Replace a layer's transform attribute.
    SetTransform {
        /// Target layer.
        layer: LayerId,
        /// New homogeneous transform.
        transform: DMatrix<f64>,
    },
}

/// Errors from session construction and event handling.
#[derive(thiserror::Error, Debug)]
pub enum SessionError {
    /// The two images to align disagree in dimensionality.
    #[error("reference image is {reference}-dimensional but moving image is {moving}-dimensional")]
    DimensionMismatch {
        /// Dimensionality of the reference image.
        reference: usize,
        /// Dimensionality of the moving image.
        moving: usize,
    },

    /// A layer lookup or mutation failed.
    #[error(transparent)]
    Layer(#[from] LayerError),

    /// The collected correspondences did not pin down a transform.
    #[error(transparent)]
    Estimate(#[from] EstimateError),
}

/// An interactive alignment session over two image layers.
///
/// The session owns the [`LayerStack`] for its whole lifetime, so nothing
/// else can mutate the layers while landmarks are being collected;
/// [`finish`](AlignmentSession::finish) hands the stack back.
///
/// Starting a session creates one empty points layer per image, colored
/// distinctly and placed above its image in the stacking order, then makes
/// the reference side active. Each point added or removed on the active
/// side drives the state machine: once the reference side leads, collection
/// swaps to the moving side; once the moving side catches up, the session
/// fits a transform of the chosen family and applies the composition of the
/// reference image's transform with the fitted one to the moving image and
/// its points layer.
pub struct AlignmentSession {
    stack: LayerStack,
    state: SessionState,
    model: ModelFamily,
    ndim: usize,
    reference_image: LayerId,
    moving_image: LayerId,
    reference_points: LayerId,
    moving_points: LayerId,
}

impl AlignmentSession {
    /// Start a session aligning `moving` onto `reference`.
    ///
    /// Takes ownership of the stack. Both ids must refer to image layers of
    /// equal dimensionality.
    ///
    /// # Example
    ///
    /// ```
    /// use landreg_session::{AlignmentSession, ImageLayer, LayerStack, ModelFamily, SessionState};
    ///
    /// let mut stack = LayerStack::new();
    /// let fixed = stack.add_image(ImageLayer::new("fixed", 2));
    /// let mobile = stack.add_image(ImageLayer::new("mobile", 2));
    /// let session = AlignmentSession::start(stack, fixed, mobile, ModelFamily::Affine)?;
    /// assert_eq!(session.state(), SessionState::AwaitingReference);
    /// # Ok::<(), landreg_session::SessionError>(())
    /// ```
    pub fn start(
        mut stack: LayerStack,
        reference: LayerId,
        moving: LayerId,
        model: ModelFamily,
    ) -> Result<Self, SessionError> {
        let reference_layer = stack.image(reference)?;
        let (reference_name, reference_ndim, reference_affine) = (
            reference_layer.name.clone(),
            reference_layer.ndim,
            reference_layer.affine.clone(),
        );
        let moving_layer = stack.image(moving)?;
        let (moving_name, moving_ndim, moving_affine) = (
            moving_layer.name.clone(),
            moving_layer.ndim,
            moving_layer.affine.clone(),
        );
        if reference_ndim != moving_ndim {
            return Err(SessionError::DimensionMismatch {
                reference: reference_ndim,
                moving: moving_ndim,
            });
        }

        // One landmark layer per image, inheriting the image's transform so
        // picked points land on the displayed pixels.
        let mut reference_pts = PointsLayer::new(format!("{reference_name}_pts"), reference_ndim);
        reference_pts.affine = reference_affine;
        reference_pts.face_color = REFERENCE_FACE_COLOR;
        let reference_points = stack.add_points(reference_pts);

        let mut moving_pts = PointsLayer::new(format!("{moving_name}_pts"), moving_ndim);
        moving_pts.affine = moving_affine;
        moving_pts.face_color = MOVING_FACE_COLOR;
        let moving_points = stack.add_points(moving_pts);

        stack.subscribe(reference_points)?;
        stack.subscribe(moving_points)?;

        for id in [moving, moving_points, reference, reference_points] {
            stack.move_to_top(id)?;
        }

        stack.unselect_all();
        stack.set_selected(reference_points, true)?;
        stack.set_mode(reference_points, InteractionMode::Add)?;

        log::debug!(
            "session started: aligning {moving_name:?} onto {reference_name:?} ({model:?})"
        );

        Ok(Self {
            stack,
            state: SessionState::AwaitingReference,
            model,
            ndim: reference_ndim,
            reference_image: reference,
            moving_image: moving,
            reference_points,
            moving_points,
        })
    }

    /// Current state.
    pub fn state(&self) -> SessionState {
        self.state
    }

    /// Model family chosen at start.
    pub fn model(&self) -> ModelFamily {
        self.model
    }

    /// Dimensionality shared by both images.
    pub fn ndim(&self) -> usize {
        self.ndim
    }

    /// Id of the reference image layer.
    pub fn reference_image(&self) -> LayerId {
        self.reference_image
    }

    /// Id of the moving image layer.
    pub fn moving_image(&self) -> LayerId {
        self.moving_image
    }

    /// Id of the reference landmark layer created at start.
    pub fn reference_points(&self) -> LayerId {
        self.reference_points
    }

    /// Id of the moving landmark layer created at start.
    pub fn moving_points(&self) -> LayerId {
        self.moving_points
    }

    /// Read access to the owned stack.
    pub fn stack(&self) -> &LayerStack {
        &self.stack
    }

    /// Append a landmark to a points layer and handle whatever follows.
    pub fn add_point(&mut self, layer: LayerId, point: DVector<f64>) -> Result<(), SessionError> {
        self.stack.add_point(layer, point)?;
        self.process_events()
    }

    /// Remove the landmark at `index` and handle whatever follows.
    pub fn remove_point(&mut self, layer: LayerId, index: usize) -> Result<(), SessionError> {
        self.stack.remove_point(layer, index)?;
        self.process_events()
    }

    /// Replace a layer's transform attribute and handle whatever follows.
    pub fn set_transform(
        &mut self,
        layer: LayerId,
        transform: DMatrix<f64>,
    ) -> Result<(), SessionError> {
        self.stack.set_affine(layer, transform)?;
        self.process_events()
    }

    /// Decide how the session reacts to a change on `changed`.
    ///
    /// Pure with respect to the stack: the returned effects describe every
    /// mutation the transition wants, and nothing is applied here. Events
    /// from any layer but the active side's points layer are the expected
    /// re-entrant case and yield no effects, checked before anything else.
    ///
    /// # Errors
    ///
    /// Estimation failures surface unchanged; the session stays in the
    /// pre-estimation state so more or better landmarks can be collected.
    pub fn transition(
        &self,
        changed: LayerId,
    ) -> Result<(SessionState, Vec<Effect>), SessionError> {
        match self.state {
            SessionState::Terminated => Ok((SessionState::Terminated, Vec::new())),
            SessionState::AwaitingReference => {
                if changed != self.reference_points {
                    log::debug!("ignoring change on inactive layer {changed:?}");
                    return Ok((self.state, Vec::new()));
                }
                let n_reference = self.stack.points(self.reference_points)?.data.len();
                let n_moving = self.stack.points(self.moving_points)?.data.len();
                if n_reference < self.ndim + 1 || n_reference <= n_moving {
                    return Ok((SessionState::AwaitingReference, Vec::new()));
                }
                log::debug!("reference side has {n_reference} points, collecting moving points");
                let effects = vec![
                    Effect::SetSelected {
                        layer: self.reference_points,
                        selected: false,
                    },
                    Effect::SetSelected {
                        layer: self.moving_points,
                        selected: true,
                    },
                    Effect::RaiseToTop {
                        layer: self.moving_image,
                    },
                    Effect::RaiseToTop {
                        layer: self.moving_points,
                    },
                    Effect::SetMode {
                        layer: self.moving_points,
                        mode: InteractionMode::Add,
                    },
                ];
                Ok((SessionState::AwaitingMoving, effects))
            }
            SessionState::AwaitingMoving => {
                if changed != self.moving_points {
                    log::debug!("ignoring change on inactive layer {changed:?}");
                    return Ok((self.state, Vec::new()));
                }
                let n_reference = self.stack.points(self.reference_points)?.data.len();
                let n_moving = self.stack.points(self.moving_points)?.data.len();
                if n_moving != n_reference {
                    return Ok((SessionState::AwaitingMoving, Vec::new()));
                }

                let mut effects = Vec::new();
                if n_reference > self.ndim {
                    let reference_data = &self.stack.points(self.reference_points)?.data;
                    let moving_data = &self.stack.points(self.moving_points)?.data;
                    let fitted = estimate_transform(reference_data, moving_data, self.model)?;
                    let composed = &self.stack.image(self.reference_image)?.affine * fitted;
                    log::debug!(
                        "fitted {:?} transform from {n_reference} correspondences",
                        self.model
                    );
                    effects.push(Effect::SetTransform {
                        layer: self.moving_image,
                        transform: composed.clone(),
                    });
                    effects.push(Effect::SetTransform {
                        layer: self.moving_points,
                        transform: composed,
                    });
                }
                effects.extend([
                    Effect::SetSelected {
                        layer: self.moving_points,
                        selected: false,
                    },
                    Effect::SetSelected {
                        layer: self.reference_points,
                        selected: true,
                    },
                    Effect::RaiseToTop {
                        layer: self.reference_image,
                    },
                    Effect::RaiseToTop {
                        layer: self.reference_points,
                    },
                    Effect::SetMode {
                        layer: self.reference_points,
                        mode: InteractionMode::Add,
                    },
                ]);
                Ok((SessionState::AwaitingReference, effects))
            }
        }
    }

    fn apply_effects(&mut self, effects: Vec<Effect>) -> Result<(), SessionError> {
        for effect in effects {
            match effect {
                Effect::SetSelected { layer, selected } => {
                    self.stack.set_selected(layer, selected)?;
                }
                Effect::SetMode { layer, mode } => self.stack.set_mode(layer, mode)?,
                Effect::RaiseToTop { layer } => self.stack.move_to_top(layer)?,
                Effect::SetTransform { layer, transform } => {
                    self.stack.set_affine(layer, transform)?;
                }
            }
        }
        Ok(())
    }

    /// Drain queued layer events, transitioning once per event.
    ///
    /// Each event is handled to completion before the next is popped, so
    /// events raised while applying effects are seen only after the state
    /// has already moved on.
    fn process_events(&mut self) -> Result<(), SessionError> {
        while let Some(event) = self.stack.pop_event() {
            let (next, effects) = self.transition(event.layer)?;
            self.state = next;
            self.apply_effects(effects)?;
        }
        Ok(())
    }

    /// Terminate the session and hand the stack back.
    ///
    /// Detaches both landmark layers from change notification and puts them
    /// into pan/zoom mode. The layers themselves stay in the stack.
    pub fn finish(mut self) -> Result<LayerStack, SessionError> {
        self.stack.unsubscribe(self.reference_points)?;
        self.stack.unsubscribe(self.moving_points)?;
        self.stack
            .set_mode(self.reference_points, InteractionMode::PanZoom)?;
        self.stack
            .set_mode(self.moving_points, InteractionMode::PanZoom)?;
        self.stack.clear_events();
        self.state = SessionState::Terminated;
        log::debug!("session finished");
        Ok(self.stack)
    }
}
