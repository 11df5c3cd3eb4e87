use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result, bail};
use clap::{Args, Parser, Subcommand};
use pda_core::{Frame, FrameWindow, Image};
use pda_track::{Event, StartGeometry, TrackerConfig, compose_start, write_csv};
use serde::{Deserialize, Serialize};

const FRAME_EXTENSIONS: [&str; 6] = ["png", "bmp", "tif", "tiff", "jpg", "jpeg"];

#[derive(Parser, Debug)]
#[command(name = "pda_track")]
#[command(about = "Detect pipette and particle geometry and track aspiration fronts")]
struct Cli {
    #[command(subcommand)]
    cmd: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Detect the start geometry of a single frame.
    #[command(name = "detect")]
    Detect(DetectArgs),
    /// Track the deformation front over a directory of frames.
    #[command(name = "track")]
    Track(TrackArgs),
}

#[derive(Args, Debug, Clone)]
struct DetectArgs {
    #[arg(long, required = true)]
    frame: PathBuf,
    /// JSON tracker configuration; missing keys keep their defaults.
    #[arg(long)]
    config: Option<PathBuf>,
    /// Geometry JSON output; printed to stdout when omitted.
    #[arg(long)]
    out: Option<PathBuf>,
}

#[derive(Args, Debug, Clone)]
struct TrackArgs {
    /// Directory with one image per frame, ordered by file name.
    #[arg(long, required = true)]
    frames: PathBuf,
    /// Files to skip before the event starts.
    #[arg(long, default_value_t = 0)]
    skip: usize,
    /// Number of frames in the event; all remaining when omitted.
    #[arg(long)]
    count: Option<usize>,
    /// Experiment frame number of the first event frame; defaults to `skip`.
    #[arg(long)]
    first_frame: Option<usize>,
    /// Start geometry JSON from `detect`; detected on the first frame when omitted.
    #[arg(long)]
    geometry: Option<PathBuf>,
    /// Front row of the first frame, overriding the measured one.
    #[arg(long)]
    start_row: Option<i32>,
    #[arg(long)]
    config: Option<PathBuf>,
    #[arg(long, required = true)]
    out: PathBuf,
    /// Tracking summary JSON.
    #[arg(long)]
    summary: Option<PathBuf>,
}

#[derive(Debug, Serialize, Deserialize)]
struct DetectReport {
    frame: PathBuf,
    geometry: StartGeometry,
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let cli = Cli::parse();

    match cli.cmd {
        Command::Detect(args) => run_detect(args),
        Command::Track(args) => run_track(args),
    }
}

fn run_detect(args: DetectArgs) -> Result<()> {
    let cfg = load_config(args.config.as_deref())?;
    let frame = load_frame(&args.frame)?;
    let geometry = compose_start(&frame, &cfg)
        .with_context(|| format!("detecting start geometry in {}", args.frame.display()))?;

    let report = DetectReport {
        frame: args.frame,
        geometry,
    };
    match args.out {
        Some(path) => write_json(&path, &report),
        None => {
            let text = serde_json::to_string_pretty(&report).context("serializing json")?;
            println!("{text}");
            Ok(())
        }
    }
}

fn run_track(args: TrackArgs) -> Result<()> {
    let cfg = load_config(args.config.as_deref())?;
    let paths = frame_paths(&args.frames, args.skip, args.count)?;
    tracing::info!(frames = paths.len(), dir = %args.frames.display(), "loading frames");

    let frames = paths
        .iter()
        .map(|p| load_frame(p))
        .collect::<Result<Vec<_>>>()?;
    let window = FrameWindow::new(frames).context("frames differ in size")?;

    let first_frame = args.first_frame.unwrap_or(args.skip);
    let mut event = Event::new(window, first_frame, cfg).context("creating event")?;

    match &args.geometry {
        Some(path) => {
            let report: DetectReport = read_json(path)?;
            event.set_geometry(report.geometry);
        }
        None => {
            event
                .predict_start()
                .context("detecting start geometry on the first frame")?;
        }
    }
    if event.geometry().is_some_and(StartGeometry::is_fallback) {
        tracing::warn!("particle circle is a fallback guess; check the geometry before trusting dL");
    }

    event.track(args.start_row).context("tracking deformation front")?;

    let rows = event.export_rows()?;
    let file = fs::File::create(&args.out)
        .with_context(|| format!("creating {}", args.out.display()))?;
    write_csv(&rows, std::io::BufWriter::new(file))
        .with_context(|| format!("writing {}", args.out.display()))?;
    tracing::info!(rows = rows.len(), out = %args.out.display(), "export written");

    if let Some(path) = &args.summary {
        write_json(path, &event.summary()?)?;
    }
    Ok(())
}

fn load_config(path: Option<&Path>) -> Result<TrackerConfig> {
    match path {
        Some(p) => TrackerConfig::load(p).with_context(|| format!("loading config {}", p.display())),
        None => Ok(TrackerConfig::default()),
    }
}

fn frame_paths(dir: &Path, skip: usize, count: Option<usize>) -> Result<Vec<PathBuf>> {
    let mut paths = fs::read_dir(dir)
        .with_context(|| format!("listing frames in {}", dir.display()))?
        .filter_map(|entry| entry.ok().map(|e| e.path()))
        .filter(|p| {
            p.extension()
                .and_then(|e| e.to_str())
                .is_some_and(|e| FRAME_EXTENSIONS.contains(&e.to_ascii_lowercase().as_str()))
        })
        .collect::<Vec<_>>();
    paths.sort();

    let selected: Vec<_> = paths
        .into_iter()
        .skip(skip)
        .take(count.unwrap_or(usize::MAX))
        .collect();
    if selected.is_empty() {
        bail!("no frames found in {} after skipping {skip}", dir.display());
    }
    Ok(selected)
}

fn load_frame(path: &Path) -> Result<Frame> {
    let dyn_img = image::open(path).with_context(|| format!("opening frame {}", path.display()))?;
    let (w, h) = (dyn_img.width() as usize, dyn_img.height() as usize);

    if dyn_img.color().has_color() {
        let data = dyn_img
            .to_rgb8()
            .pixels()
            .map(|p| p.0)
            .collect::<Vec<[u8; 3]>>();
        let img = Image::from_vec(w, h, data)
            .with_context(|| format!("constructing rgb frame from {}", path.display()))?;
        Ok(Frame::Rgb(img))
    } else {
        let img = Image::from_vec(w, h, dyn_img.to_luma8().into_raw())
            .with_context(|| format!("constructing gray frame from {}", path.display()))?;
        Ok(Frame::Gray(img))
    }
}

fn write_json(path: &Path, value: &impl Serialize) -> Result<()> {
    let bytes = serde_json::to_vec_pretty(value).context("serializing json")?;
    fs::write(path, bytes).with_context(|| format!("writing json {}", path.display()))
}

fn read_json<T: for<'de> Deserialize<'de>>(path: &Path) -> Result<T> {
    let data = fs::read(path).with_context(|| format!("reading {}", path.display()))?;
    serde_json::from_slice(&data).with_context(|| format!("parsing json {}", path.display()))
}
