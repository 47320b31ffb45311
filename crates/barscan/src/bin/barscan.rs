//! `barscan` command-line tool.
//!
//! `barscan prepare` shows what a recognition engine would be handed for a
//! still image: the oriented luminance and the thresholded bitmap.

use std::error::Error;
use std::path::PathBuf;

use barscan::decode::{BinarizerKind, StrategyKind};
use barscan::prepare::{bitmap_image, gray_image, prepare, CropRect, PrepareParams};
use barscan::scanner::{LensFacing, ScanConfig};
use clap::{Args, Parser, Subcommand, ValueEnum};
use image::ImageReader;
use log::LevelFilter;

#[derive(Parser, Debug)]
#[command(name = "barscan", version, about = "Barcode scanning pipeline tools")]
struct Cli {
    /// JSON config (`ScanConfig`); flags given on the command line win.
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Log level override (error, warn, info, debug, trace).
    #[arg(long, global = true)]
    log_level: Option<LevelFilter>,

    /// Emit JSON logs (requires the `tracing` feature).
    #[arg(long, global = true)]
    json_logs: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Orient and binarize an image the way a camera frame would be.
    Prepare(PrepareArgs),
}

#[derive(Args, Debug)]
struct PrepareArgs {
    /// Input image; converted to 8-bit luma.
    input: PathBuf,

    /// Where to write the bitmap PNG.
    #[arg(short, long)]
    output: PathBuf,

    /// Also write the oriented luminance PNG here.
    #[arg(long)]
    luminance: Option<PathBuf>,

    /// Frame rotation in degrees (0, 90, 180, 270).
    #[arg(long, default_value_t = 0)]
    rotate: i32,

    /// Treat the image as coming from a front camera.
    #[arg(long)]
    mirror: bool,

    /// Crop after orientation, as `x,y,width,height`.
    #[arg(long, value_parser = parse_crop)]
    crop: Option<CropRect>,

    #[arg(long, value_enum)]
    strategy: Option<StrategyArg>,

    #[arg(long, value_enum)]
    binarizer: Option<BinarizerArg>,

    /// Number of consecutive frames to run through the strategy.
    #[arg(long, default_value_t = 1)]
    frames: usize,
}

#[derive(Clone, Copy, Debug, ValueEnum)]
enum StrategyArg {
    Normal,
    Inverted,
    Mixed,
}

impl From<StrategyArg> for StrategyKind {
    fn from(arg: StrategyArg) -> Self {
        match arg {
            StrategyArg::Normal => StrategyKind::Normal,
            StrategyArg::Inverted => StrategyKind::Inverted,
            StrategyArg::Mixed => StrategyKind::Mixed,
        }
    }
}

#[derive(Clone, Copy, Debug, ValueEnum)]
enum BinarizerArg {
    Global,
    Block,
}

impl From<BinarizerArg> for BinarizerKind {
    fn from(arg: BinarizerArg) -> Self {
        match arg {
            BinarizerArg::Global => BinarizerKind::Global,
            BinarizerArg::Block => BinarizerKind::Block,
        }
    }
}

fn parse_crop(s: &str) -> Result<CropRect, String> {
    let parts = s
        .split(',')
        .map(|p| p.trim().parse::<usize>())
        .collect::<Result<Vec<_>, _>>()
        .map_err(|e| format!("invalid crop `{s}`: {e}"))?;
    match parts[..] {
        [x, y, width, height] => Ok(CropRect {
            x,
            y,
            width,
            height,
        }),
        _ => Err(format!("crop needs four values x,y,width,height, got `{s}`")),
    }
}

fn main() -> Result<(), Box<dyn Error>> {
    let cli = Cli::parse();
    let config = match &cli.config {
        Some(path) => ScanConfig::load_json(path)?,
        None => ScanConfig::default(),
    };
    init_logging(cli.log_level.unwrap_or(config.level_filter()), cli.json_logs);

    match cli.command {
        Command::Prepare(args) => run_prepare(args, &config),
    }
}

fn init_logging(level: LevelFilter, json: bool) {
    #[cfg(feature = "tracing")]
    {
        let _ = tracing_log::LogTracer::init();
        if std::env::var_os("RUST_LOG").is_none() {
            std::env::set_var("RUST_LOG", level.as_str().to_ascii_lowercase());
        }
        barscan::core::init_tracing(json);
    }
    #[cfg(not(feature = "tracing"))]
    {
        if json {
            eprintln!("--json-logs needs the `tracing` feature; using plain logs");
        }
        let _ = barscan::core::init_with_level(level);
    }
}

fn run_prepare(args: PrepareArgs, config: &ScanConfig) -> Result<(), Box<dyn Error>> {
    let decode = &config.options.decode;
    let params = PrepareParams {
        rotation_degrees: args.rotate,
        mirrored: args.mirror || config.options.lens_facing == LensFacing::Front,
        crop: args.crop,
        strategy: args.strategy.map(Into::into).unwrap_or(decode.strategy),
        binarizer: args.binarizer.map(Into::into).unwrap_or(decode.binarizer),
        frames: args.frames,
    };

    let img = ImageReader::open(&args.input)?.decode()?.to_luma8();
    let prepared = prepare(&img, &params)?;

    bitmap_image(&prepared.bitmap).save(&args.output)?;
    if let Some(path) = &args.luminance {
        gray_image(&prepared.luminance).save(path)?;
    }
    println!(
        "wrote {}x{} {:?} bitmap ({} dark) to {}",
        prepared.bitmap.width(),
        prepared.bitmap.height(),
        params.strategy,
        prepared.bitmap.count_dark(),
        args.output.display()
    );
    Ok(())
}
