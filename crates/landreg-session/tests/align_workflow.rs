use approx::assert_relative_eq;
use landreg_estimate::EstimateError;
use landreg_session::{
    AlignmentSession, ImageLayer, InteractionMode, LayerId, LayerStack, ModelFamily, SessionError,
    SessionState, MOVING_FACE_COLOR, REFERENCE_FACE_COLOR,
};
use nalgebra::{dvector, DMatrix};

const REFERENCE_LANDMARKS: [[f64; 2]; 3] = [[0.0, 0.0], [1.0, 0.0], [0.0, 1.0]];
const MOVING_LANDMARKS: [[f64; 2]; 3] = [[5.0, -1.0], [6.0, -1.0], [5.0, 0.0]];

/// Stack with a scaled reference image and an untransformed moving image.
fn two_image_stack() -> (LayerStack, LayerId, LayerId) {
    let mut stack = LayerStack::new();
    let reference = stack.add_image(ImageLayer::new("fixed", 2));
    let moving = stack.add_image(ImageLayer::new("mobile", 2));
    let scale = DMatrix::from_row_slice(3, 3, &[2.0, 0.0, 0.0, 0.0, 2.0, 0.0, 0.0, 0.0, 1.0]);
    stack.set_affine(reference, scale).unwrap();
    (stack, reference, moving)
}

fn add_all(session: &mut AlignmentSession, layer: LayerId, points: &[[f64; 2]]) {
    for point in points {
        session.add_point(layer, dvector![point[0], point[1]]).unwrap();
    }
}

fn assert_matrix_eq(actual: &DMatrix<f64>, expected: &DMatrix<f64>) {
    assert_eq!(actual.shape(), expected.shape());
    for i in 0..actual.nrows() {
        for j in 0..actual.ncols() {
            assert_relative_eq!(actual[(i, j)], expected[(i, j)], epsilon = 1e-9);
        }
    }
}

/// The reference image transform composed with the fit that undoes the
/// (5, -1) shift between the landmark sets above.
fn expected_composed() -> DMatrix<f64> {
    DMatrix::from_row_slice(3, 3, &[2.0, 0.0, -10.0, 0.0, 2.0, 2.0, 0.0, 0.0, 1.0])
}

#[test]
fn test_start_wires_landmark_layers() {
    let (stack, reference, moving) = two_image_stack();
    let session = AlignmentSession::start(stack, reference, moving, ModelFamily::Affine).unwrap();

    assert_eq!(session.state(), SessionState::AwaitingReference);
    assert_eq!(
        session.stack().order(),
        vec![
            session.moving_image(),
            session.moving_points(),
            session.reference_image(),
            session.reference_points(),
        ]
    );

    let reference_pts = session.stack().points(session.reference_points()).unwrap();
    assert_eq!(reference_pts.name, "fixed_pts");
    assert!(reference_pts.data.is_empty());
    assert!(reference_pts.selected);
    assert_eq!(reference_pts.mode, InteractionMode::Add);
    assert_eq!(reference_pts.face_color, REFERENCE_FACE_COLOR);
    // Landmark layers inherit their image's transform.
    let reference_affine = &session.stack().image(reference).unwrap().affine;
    assert_matrix_eq(&reference_pts.affine, reference_affine);

    let moving_pts = session.stack().points(session.moving_points()).unwrap();
    assert_eq!(moving_pts.name, "mobile_pts");
    assert!(!moving_pts.selected);
    assert_eq!(moving_pts.mode, InteractionMode::PanZoom);
    assert_eq!(moving_pts.face_color, MOVING_FACE_COLOR);
}

#[test]
fn test_full_alignment_round() {
    let (stack, reference, moving) = two_image_stack();
    let mut session =
        AlignmentSession::start(stack, reference, moving, ModelFamily::Affine).unwrap();
    let reference_points = session.reference_points();
    let moving_points = session.moving_points();

    // Three reference landmarks swap collection to the moving side.
    add_all(&mut session, reference_points, &REFERENCE_LANDMARKS);
    assert_eq!(session.state(), SessionState::AwaitingMoving);
    assert_eq!(
        session.stack().order(),
        vec![reference, reference_points, moving, moving_points]
    );
    assert!(!session.stack().points(reference_points).unwrap().selected);
    let moving_pts = session.stack().points(moving_points).unwrap();
    assert!(moving_pts.selected);
    assert_eq!(moving_pts.mode, InteractionMode::Add);

    // Matching moving landmarks trigger the fit and swap back.
    add_all(&mut session, moving_points, &MOVING_LANDMARKS);
    assert_eq!(session.state(), SessionState::AwaitingReference);
    let expected = expected_composed();
    assert_matrix_eq(&session.stack().image(moving).unwrap().affine, &expected);
    assert_matrix_eq(
        &session.stack().points(moving_points).unwrap().affine,
        &expected,
    );
    assert!(session.stack().points(reference_points).unwrap().selected);
    assert_eq!(
        session.stack().order(),
        vec![moving, moving_points, reference, reference_points]
    );
    assert_eq!(session.stack().pending_events(), 0);

    // A stray extra moving landmark changes nothing: the moving side is no
    // longer active and the counts disagree anyway.
    session
        .add_point(moving_points, dvector![9.0, 9.0])
        .unwrap();
    assert_eq!(session.state(), SessionState::AwaitingReference);
    assert_matrix_eq(&session.stack().image(moving).unwrap().affine, &expected);
}

#[test]
fn test_programmatic_transform_set_does_not_retrigger() {
    let (stack, reference, moving) = two_image_stack();
    let mut session =
        AlignmentSession::start(stack, reference, moving, ModelFamily::Affine).unwrap();
    let reference_points = session.reference_points();
    let moving_points = session.moving_points();
    add_all(&mut session, reference_points, &REFERENCE_LANDMARKS);
    add_all(&mut session, moving_points, &MOVING_LANDMARKS);
    assert_eq!(session.state(), SessionState::AwaitingReference);

    // Simulate the transform-application step firing one more change event.
    let nudged = DMatrix::from_row_slice(3, 3, &[1.0, 0.0, 4.0, 0.0, 1.0, 4.0, 0.0, 0.0, 1.0]);
    session.set_transform(moving_points, nudged.clone()).unwrap();

    assert_eq!(session.state(), SessionState::AwaitingReference);
    // The nudge stays: no estimation overwrote it.
    assert_matrix_eq(
        &session.stack().points(moving_points).unwrap().affine,
        &nudged,
    );
    assert_matrix_eq(
        &session.stack().image(moving).unwrap().affine,
        &expected_composed(),
    );
}

#[test]
fn test_estimation_failure_keeps_moving_side_active() {
    let (stack, reference, moving) = two_image_stack();
    let mut session =
        AlignmentSession::start(stack, reference, moving, ModelFamily::Similarity).unwrap();
    let reference_points = session.reference_points();
    let moving_points = session.moving_points();
    add_all(&mut session, reference_points, &REFERENCE_LANDMARKS);
    add_all(
        &mut session,
        moving_points,
        &[[0.0, 0.0], [1.0, 1.0]],
    );

    // The third moving landmark completes a collinear set; the fit fails and
    // nothing moves.
    let result = session.add_point(moving_points, dvector![2.0, 2.0]);
    assert!(matches!(
        result,
        Err(SessionError::Estimate(
            EstimateError::DegenerateConfiguration { .. }
        ))
    ));
    assert_eq!(session.state(), SessionState::AwaitingMoving);
    assert!(session.stack().points(moving_points).unwrap().selected);
    let identity = DMatrix::identity(3, 3);
    assert_matrix_eq(&session.stack().image(moving).unwrap().affine, &identity);

    // Replacing the bad landmark recovers the session.
    session.remove_point(moving_points, 2).unwrap();
    assert_eq!(session.state(), SessionState::AwaitingMoving);
    session.add_point(moving_points, dvector![1.0, 0.0]).unwrap();
    assert_eq!(session.state(), SessionState::AwaitingReference);
    assert!(session.stack().points(reference_points).unwrap().selected);
}

#[test]
fn test_deletions_leave_session_waiting() {
    let (stack, reference, moving) = two_image_stack();
    let mut session =
        AlignmentSession::start(stack, reference, moving, ModelFamily::Affine).unwrap();
    let reference_points = session.reference_points();
    let moving_points = session.moving_points();

    add_all(&mut session, reference_points, &[[0.0, 0.0], [1.0, 0.0]]);
    session.remove_point(reference_points, 1).unwrap();
    assert_eq!(session.state(), SessionState::AwaitingReference);

    // Reaching the threshold still works after the deletion.
    add_all(&mut session, reference_points, &[[1.0, 0.0], [0.0, 1.0]]);
    assert_eq!(session.state(), SessionState::AwaitingMoving);

    // Deleting reference landmarks now goes to the inactive side: ignored.
    session.remove_point(reference_points, 0).unwrap();
    assert_eq!(session.state(), SessionState::AwaitingMoving);

    // The moving side catching up to the shrunken reference set swaps back
    // without fitting anything.
    add_all(&mut session, moving_points, &[[0.0, 0.0], [1.0, 1.0]]);
    assert_eq!(session.state(), SessionState::AwaitingReference);
    let identity = DMatrix::identity(3, 3);
    assert_matrix_eq(&session.stack().image(moving).unwrap().affine, &identity);
}

#[test]
fn test_finish_detaches_and_neutralizes() {
    let (stack, reference, moving) = two_image_stack();
    let mut session =
        AlignmentSession::start(stack, reference, moving, ModelFamily::Affine).unwrap();
    let reference_points = session.reference_points();
    let moving_points = session.moving_points();
    add_all(&mut session, reference_points, &REFERENCE_LANDMARKS);
    add_all(&mut session, moving_points, &MOVING_LANDMARKS);

    let mut stack = session.finish().unwrap();
    assert_eq!(stack.len(), 4);
    assert_eq!(
        stack.points(reference_points).unwrap().mode,
        InteractionMode::PanZoom
    );
    assert_eq!(
        stack.points(moving_points).unwrap().mode,
        InteractionMode::PanZoom
    );
    // The fitted transform survives termination.
    assert_matrix_eq(&stack.image(moving).unwrap().affine, &expected_composed());

    // Further edits raise no events for anyone.
    stack.add_point(reference_points, dvector![7.0, 7.0]).unwrap();
    assert_eq!(stack.pending_events(), 0);
}

#[test]
fn test_three_dimensional_round() {
    let mut stack = LayerStack::new();
    let reference = stack.add_image(ImageLayer::new("fixed", 3));
    let moving = stack.add_image(ImageLayer::new("mobile", 3));
    let mut session =
        AlignmentSession::start(stack, reference, moving, ModelFamily::Euclidean).unwrap();
    let reference_points = session.reference_points();
    let moving_points = session.moving_points();

    let reference_landmarks = [
        dvector![0.0, 0.0, 0.0],
        dvector![1.0, 0.0, 0.0],
        dvector![0.0, 1.0, 0.0],
        dvector![0.0, 0.0, 1.0],
    ];
    for point in &reference_landmarks {
        session.add_point(reference_points, point.clone()).unwrap();
    }
    assert_eq!(session.state(), SessionState::AwaitingMoving);

    let shift = dvector![2.0, -1.0, 0.5];
    for point in &reference_landmarks {
        session.add_point(moving_points, point + &shift).unwrap();
    }
    assert_eq!(session.state(), SessionState::AwaitingReference);

    let expected = DMatrix::from_row_slice(
        4,
        4,
        &[
            1.0, 0.0, 0.0, -2.0, //
            0.0, 1.0, 0.0, 1.0, //
            0.0, 0.0, 1.0, -0.5, //
            0.0, 0.0, 0.0, 1.0,
        ],
    );
    assert_matrix_eq(&session.stack().image(moving).unwrap().affine, &expected);
}
