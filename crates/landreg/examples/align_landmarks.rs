use argh::FromArgs;
use nalgebra::{DMatrix, DVector};

use landreg::estimate::{transform_points, ModelFamily};
use landreg::session::{AlignmentSession, ImageLayer, LayerStack};

fn parse_model(value: &str) -> Result<ModelFamily, String> {
    match value {
        "affine" => Ok(ModelFamily::Affine),
        "euclidean" => Ok(ModelFamily::Euclidean),
        "similarity" => Ok(ModelFamily::Similarity),
        other => Err(format!("unknown model family: {other}")),
    }
}

#[derive(FromArgs)]
/// Headless landmark alignment: picks matching landmark pairs on two
/// synthetic images and drives a full session round.
struct Args {
    /// model family to fit: affine, euclidean or similarity
    #[argh(option, default = "ModelFamily::Affine", from_str_fn(parse_model))]
    model: ModelFamily,

    /// number of landmark pairs to pick
    #[argh(option, default = "6")]
    landmarks: usize,
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    env_logger::init();
    let args: Args = argh::from_env();

    let mut stack = LayerStack::new();
    let fixed = stack.add_image(ImageLayer::new("fixed", 2));
    let mobile = stack.add_image(ImageLayer::new("mobile", 2));

    // Ground-truth pose of the mobile image relative to the fixed one; the
    // session should recover its inverse.
    let theta: f64 = 0.25;
    let truth = DMatrix::from_row_slice(
        3,
        3,
        &[
            theta.cos(), -theta.sin(), 12.5, //
            theta.sin(), theta.cos(), -4.0, //
            0.0, 0.0, 1.0,
        ],
    );

    let reference_landmarks: Vec<DVector<f64>> = (0..args.landmarks)
        .map(|_| DVector::from_fn(2, |_, _| rand::random::<f64>() * 100.0))
        .collect();
    let moving_landmarks = transform_points(&truth, &reference_landmarks);

    let mut session = AlignmentSession::start(stack, fixed, mobile, args.model)?;
    let reference_points = session.reference_points();
    let moving_points = session.moving_points();

    for point in &reference_landmarks {
        session.add_point(reference_points, point.clone())?;
    }
    println!(
        "collected {} reference landmarks, session is {:?}",
        args.landmarks,
        session.state()
    );

    for point in &moving_landmarks {
        session.add_point(moving_points, point.clone())?;
    }
    println!(
        "collected {} moving landmarks, session is {:?}",
        args.landmarks,
        session.state()
    );

    let fitted = session.stack().image(mobile)?.affine.clone();
    println!("fitted transform:{fitted}");
    if let Some(expected) = truth.try_inverse() {
        println!("inverse of ground truth:{expected}");
    }

    let pulled_back = transform_points(&fitted, &moving_landmarks);
    let rms = (pulled_back
        .iter()
        .zip(reference_landmarks.iter())
        .map(|(a, b)| (a - b).norm_squared())
        .sum::<f64>()
        / args.landmarks as f64)
        .sqrt();
    println!("residual rms after alignment: {rms:.3e}");

    let stack = session.finish()?;
    println!("session finished with {} layers in the stack", stack.len());

    Ok(())
}
