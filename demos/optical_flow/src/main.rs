use argh::FromArgs;
use serde::Serialize;
use std::path::{Path, PathBuf};

use varflow::{
    image::{Image, ImageSize},
    optflow::{FlowEstimator, FlowField, FlowParams},
};

#[derive(FromArgs)]
/// Estimate the optical flow between two images
struct Args {
    /// path to the first image
    #[argh(positional)]
    image1: PathBuf,

    /// path to the second image
    #[argh(positional)]
    image2: PathBuf,

    /// json file with solver parameters, flags below override it
    #[argh(option)]
    config: Option<PathBuf>,

    /// smoothness weight
    #[argh(option)]
    alpha: Option<f32>,

    /// pyramid downsampling ratio
    #[argh(option)]
    ratio: Option<f32>,

    /// smallest pyramid level side
    #[argh(option)]
    min_width: Option<usize>,

    /// outer fixed-point iterations
    #[argh(option)]
    outer: Option<usize>,

    /// inner fixed-point iterations
    #[argh(option)]
    inner: Option<usize>,

    /// conjugate gradient iterations
    #[argh(option)]
    cg: Option<usize>,

    /// run on the color channels instead of grayscale
    #[argh(switch)]
    color: bool,

    /// where to write the second image warped onto the first
    #[argh(option, default = "PathBuf::from(\"warped.png\")")]
    output: PathBuf,

    /// optional json file receiving the flow field
    #[argh(option)]
    flow_output: Option<PathBuf>,
}

#[derive(Serialize)]
struct FlowDump {
    width: usize,
    height: usize,
    u: Vec<f32>,
    v: Vec<f32>,
}

fn load_params(args: &Args) -> Result<FlowParams, Box<dyn std::error::Error>> {
    let mut params = match &args.config {
        Some(path) => serde_json::from_str(&std::fs::read_to_string(path)?)?,
        None => FlowParams::default(),
    };

    if let Some(alpha) = args.alpha {
        params = params.with_alpha(alpha);
    }
    if let Some(ratio) = args.ratio {
        params = params.with_ratio(ratio);
    }
    if let Some(min_width) = args.min_width {
        params = params.with_min_width(min_width);
    }
    if let Some(outer) = args.outer {
        params = params.with_outer_iterations(outer);
    }
    if let Some(inner) = args.inner {
        params = params.with_inner_iterations(inner);
    }
    if let Some(cg) = args.cg {
        params = params.with_cg_iterations(cg);
    }

    Ok(params)
}

fn to_f32<const C: usize>(
    size: ImageSize,
    data: Vec<u8>,
) -> Result<Image<f32, C>, Box<dyn std::error::Error>> {
    let image = Image::<u8, C>::new(size, data)?;
    Ok(image.cast_and_scale::<f32>(1.0 / 255.0)?)
}

fn to_u8<const C: usize>(image: &Image<f32, C>) -> Result<Vec<u8>, Box<dyn std::error::Error>> {
    let scaled = Image::<f32, C>::new(
        image.size(),
        image
            .as_slice()
            .iter()
            .map(|v| (v.clamp(0.0, 1.0) * 255.0).round())
            .collect(),
    )?;
    Ok(scaled.cast_and_scale::<u8>(1)?.into_vec())
}

fn image_size(img: &image::DynamicImage) -> ImageSize {
    ImageSize {
        width: img.width() as usize,
        height: img.height() as usize,
    }
}

fn log_flow_stats(flow: &FlowField) {
    let (mean_u, mean_v) = flow.mean();
    log::info!(
        "flow {}: mean ({mean_u:.3}, {mean_v:.3}), max displacement {:.3}",
        flow.size(),
        flow.max_magnitude()
    );
}

fn write_flow(path: &Path, flow: FlowField) -> Result<(), Box<dyn std::error::Error>> {
    let size = flow.size();
    let (u, v) = flow.into_parts();
    let dump = FlowDump {
        width: size.width,
        height: size.height,
        u: u.into_vec(),
        v: v.into_vec(),
    };
    std::fs::write(path, serde_json::to_string(&dump)?)?;
    Ok(())
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    env_logger::init();

    let args: Args = argh::from_env();
    let params = load_params(&args)?;
    log::info!("parameters: {}", serde_json::to_string(&params)?);

    let estimator = FlowEstimator::new(params)?;

    let img1 = image::open(&args.image1)?;
    let img2 = image::open(&args.image2)?;
    let size = image_size(&img1);

    let now = std::time::Instant::now();

    let (flow, warped) = if args.color {
        let image1 = to_f32::<3>(size, img1.to_rgb8().into_raw())?;
        let image2 = to_f32::<3>(image_size(&img2), img2.to_rgb8().into_raw())?;
        let output = estimator.estimate(&image1, &image2)?;
        let warped = image::RgbImage::from_raw(
            size.width as u32,
            size.height as u32,
            to_u8(&output.warped)?,
        )
        .map(image::DynamicImage::from);
        (output.flow, warped)
    } else {
        let image1 = to_f32::<1>(size, img1.to_luma8().into_raw())?;
        let image2 = to_f32::<1>(image_size(&img2), img2.to_luma8().into_raw())?;
        let output = estimator.estimate(&image1, &image2)?;
        let warped = image::GrayImage::from_raw(
            size.width as u32,
            size.height as u32,
            to_u8(&output.warped)?,
        )
        .map(image::DynamicImage::from);
        (output.flow, warped)
    };

    log::info!("estimation took {:?}", now.elapsed());
    log_flow_stats(&flow);

    let warped = warped.ok_or("warped buffer does not match the image size")?;
    warped.save(&args.output)?;
    log::info!("warped image written to {}", args.output.display());

    if let Some(path) = &args.flow_output {
        write_flow(path, flow)?;
        log::info!("flow written to {}", path.display());
    }

    Ok(())
}
