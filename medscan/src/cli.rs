use clap::{Args, Parser, Subcommand, ValueEnum};
use scan_effect::{ScanPreset, augment::AugmentationKind};
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(name = "medscan", version, about = "Radiograph image effects and preprocessing")]
pub struct Cli {
    /// Config file, defaults to the platform config dir
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Apply a preset to one image
    Process(ProcessArgs),

    /// Apply a preset to every supported image in a directory
    Batch(BatchArgs),

    /// Print the quality report for an image
    Quality(QualityArgs),

    /// Resize and normalize an image for model input
    Preprocess(PreprocessArgs),

    /// Crop an image to the detected lung region
    LungCrop(LungCropArgs),

    /// Write an augmented copy of an image
    Augment(AugmentArgs),

    /// List the available presets
    Presets,
}

#[derive(Args, Debug)]
pub struct ProcessArgs {
    pub input: PathBuf,

    #[arg(short, long)]
    pub output: Option<PathBuf>,

    #[arg(short, long, value_enum)]
    pub preset: Option<PresetArg>,

    /// Print the result as a data url instead of writing a file
    #[arg(long)]
    pub data_url: bool,
}

#[derive(Args, Debug)]
pub struct BatchArgs {
    pub dir: PathBuf,

    #[arg(short, long)]
    pub output: Option<PathBuf>,

    #[arg(short, long, value_enum)]
    pub preset: Option<PresetArg>,
}

#[derive(Args, Debug)]
pub struct QualityArgs {
    pub input: PathBuf,

    #[arg(long)]
    pub json: bool,
}

#[derive(Args, Debug)]
pub struct PreprocessArgs {
    pub input: PathBuf,

    #[arg(short, long)]
    pub output: Option<PathBuf>,

    /// Square target size in pixels
    #[arg(long)]
    pub size: Option<u32>,

    /// Letterbox instead of stretching
    #[arg(long)]
    pub keep_aspect: bool,
}

#[derive(Args, Debug)]
pub struct LungCropArgs {
    pub input: PathBuf,

    #[arg(short, long)]
    pub output: Option<PathBuf>,

    /// Fraction of the region size added on each side
    #[arg(long)]
    pub padding: Option<f32>,
}

#[derive(Args, Debug)]
pub struct AugmentArgs {
    pub input: PathBuf,

    #[arg(short, long)]
    pub output: Option<PathBuf>,

    #[arg(short, long, value_enum, required_unless_present = "random")]
    pub kind: Option<KindArg>,

    #[arg(short, long, default_value_t = 0.5)]
    pub intensity: f32,

    #[arg(long)]
    pub seed: Option<u64>,

    /// Chain this many random augmentations instead of one kind
    #[arg(long, conflicts_with = "kind")]
    pub random: Option<usize>,
}

#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq)]
pub enum PresetArg {
    None,
    Xray,
    Invert,
    Grayscale,
    Equalize,
    Clahe,
    XrayEnhanced,
    Blur,
}

impl From<PresetArg> for ScanPreset {
    fn from(preset: PresetArg) -> Self {
        match preset {
            PresetArg::None => ScanPreset::None,
            PresetArg::Xray => ScanPreset::Xray,
            PresetArg::Invert => ScanPreset::Invert,
            PresetArg::Grayscale => ScanPreset::Grayscale,
            PresetArg::Equalize => ScanPreset::Equalize,
            PresetArg::Clahe => ScanPreset::Clahe,
            PresetArg::XrayEnhanced => ScanPreset::XrayEnhanced,
            PresetArg::Blur => ScanPreset::Blur,
        }
    }
}

#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq)]
pub enum KindArg {
    Rotation,
    Flip,
    Brightness,
    Contrast,
    Noise,
    Blur,
    Zoom,
    Translation,
}

impl From<KindArg> for AugmentationKind {
    fn from(kind: KindArg) -> Self {
        match kind {
            KindArg::Rotation => AugmentationKind::Rotation,
            KindArg::Flip => AugmentationKind::Flip,
            KindArg::Brightness => AugmentationKind::Brightness,
            KindArg::Contrast => AugmentationKind::Contrast,
            KindArg::Noise => AugmentationKind::Noise,
            KindArg::Blur => AugmentationKind::Blur,
            KindArg::Zoom => AugmentationKind::Zoom,
            KindArg::Translation => AugmentationKind::Translation,
        }
    }
}
