use std::path::PathBuf;

use anyhow::Context as _;
use clap::{Parser, Subcommand, ValueEnum};

use imseq::{ExportKind, ExportOptions, Selector, load_project_file};

#[derive(Parser, Debug)]
#[command(name = "imseq", version)]
struct Cli {
    #[command(subcommand)]
    cmd: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Print the length and shape of a serialized sequence.
    Info(InfoArgs),
    /// Print summary statistics for a single frame.
    Frame(FrameArgs),
    /// Export the frame stream to an output container.
    Export(ExportArgs),
}

#[derive(Parser, Debug)]
struct InfoArgs {
    /// Serialized sequence JSON.
    #[arg(long = "in")]
    in_path: PathBuf,
}

#[derive(Parser, Debug)]
struct FrameArgs {
    /// Serialized sequence JSON.
    #[arg(long = "in")]
    in_path: PathBuf,

    /// Frame index (0-based).
    #[arg(long)]
    frame: usize,
}

#[derive(Parser, Debug)]
struct ExportArgs {
    /// Serialized sequence JSON.
    #[arg(long = "in")]
    in_path: PathBuf,

    /// Output file path.
    #[arg(long)]
    out: PathBuf,

    /// Output container kind.
    #[arg(long, value_enum, default_value_t = FormatChoice::Hdf5)]
    format: FormatChoice,

    /// Fill NaN-marked gaps from nearby timepoints before export.
    #[arg(long)]
    fill_gaps: bool,

    /// Rescale each frame's dynamic range to the full target depth.
    #[arg(long)]
    scale_values: bool,

    /// Channel labels stored as container metadata (HDF5 output only).
    #[arg(long)]
    channel_names: Vec<String>,

    /// Export only frames [start, stop) of the time axis.
    #[arg(long)]
    start: Option<isize>,
    #[arg(long)]
    stop: Option<isize>,
}

#[derive(Clone, Copy, Debug, ValueEnum)]
enum FormatChoice {
    Tiff16,
    Tiff8,
    Hdf5,
}

impl std::fmt::Display for FormatChoice {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(match self {
            Self::Tiff16 => "tiff16",
            Self::Tiff8 => "tiff8",
            Self::Hdf5 => "hdf5",
        })
    }
}

impl From<FormatChoice> for ExportKind {
    fn from(choice: FormatChoice) -> Self {
        match choice {
            FormatChoice::Tiff16 => ExportKind::Tiff16,
            FormatChoice::Tiff8 => ExportKind::Tiff8,
            FormatChoice::Hdf5 => ExportKind::Hdf5,
        }
    }
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    match cli.cmd {
        Command::Info(args) => info(args),
        Command::Frame(args) => frame(args),
        Command::Export(args) => export(args),
    }
}

fn info(args: InfoArgs) -> anyhow::Result<()> {
    let seq = load_project_file(&args.in_path)
        .with_context(|| format!("failed to load '{}'", args.in_path.display()))?;
    let shape = seq.shape()?;
    println!("frames: {}", shape.frames);
    println!(
        "shape: ({}, {}, {}, {}, {})",
        shape.frames, shape.planes, shape.rows, shape.columns, shape.channels
    );
    Ok(())
}

fn frame(args: FrameArgs) -> anyhow::Result<()> {
    let seq = load_project_file(&args.in_path)
        .with_context(|| format!("failed to load '{}'", args.in_path.display()))?;
    let frame = seq.frame_at(args.frame)?;
    let finite: Vec<f64> = frame.iter().copied().filter(|v| v.is_finite()).collect();
    let min = finite.iter().copied().fold(f64::INFINITY, f64::min);
    let max = finite.iter().copied().fold(f64::NEG_INFINITY, f64::max);
    let mean = if finite.is_empty() {
        f64::NAN
    } else {
        finite.iter().sum::<f64>() / finite.len() as f64
    };
    let s = frame.shape();
    println!("shape: ({}, {}, {}, {})", s[0], s[1], s[2], s[3]);
    println!("min: {min}");
    println!("max: {max}");
    println!("mean: {mean}");
    println!("nan: {}", frame.len() - finite.len());
    Ok(())
}

fn export(args: ExportArgs) -> anyhow::Result<()> {
    let mut seq = load_project_file(&args.in_path)
        .with_context(|| format!("failed to load '{}'", args.in_path.display()))?;
    if args.start.is_some() || args.stop.is_some() {
        seq = seq.slice(
            imseq::IndexSpec::all().with_time(Selector::range(args.start, args.stop)),
        )?;
    }
    let options = ExportOptions {
        fill_gaps: args.fill_gaps,
        scale_values: args.scale_values,
        channel_names: if args.channel_names.is_empty() {
            None
        } else {
            Some(args.channel_names.clone())
        },
    };
    let kind = ExportKind::from(args.format);
    match kind {
        ExportKind::Hdf5 => export_hdf5(seq.as_ref(), &args.out, kind, &options),
        ExportKind::Tiff16 | ExportKind::Tiff8 => {
            anyhow::bail!("TIFF export requires an external encoder sink");
        }
    }
}

#[cfg(feature = "hdf5")]
fn export_hdf5(
    seq: &dyn imseq::Sequence,
    out: &std::path::Path,
    kind: ExportKind,
    options: &ExportOptions,
) -> anyhow::Result<()> {
    let mut sink = imseq::Hdf5Sink::create(out, options.channel_names.clone())?;
    imseq::export_frames(seq, kind, &mut sink, options)?;
    println!("wrote {}", out.display());
    Ok(())
}

#[cfg(not(feature = "hdf5"))]
fn export_hdf5(
    _seq: &dyn imseq::Sequence,
    _out: &std::path::Path,
    _kind: ExportKind,
    _options: &ExportOptions,
) -> anyhow::Result<()> {
    anyhow::bail!("HDF5 export requires building with the `hdf5` feature");
}
