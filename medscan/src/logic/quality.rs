use super::util;
use crate::{cli::QualityArgs, config::Config};
use anyhow::Result;
use scan_effect::quality::{self, QualityReport};
use serde::Serialize;

#[derive(Serialize, Debug)]
struct QualitySummary {
    file: String,
    width: u32,
    height: u32,
    is_valid: bool,
    issues: Vec<String>,
    quality_score: f64,
    mean_intensity: f64,
    contrast: f64,
    sharpness: f64,
}

impl QualitySummary {
    fn new(file: String, (width, height): (u32, u32), report: QualityReport) -> Self {
        Self {
            file,
            width,
            height,
            is_valid: report.is_valid,
            issues: report.issues.iter().map(|issue| issue.to_string()).collect(),
            quality_score: report.quality_score,
            mean_intensity: report.mean_intensity,
            contrast: report.contrast,
            sharpness: report.sharpness,
        }
    }
}

pub fn quality(args: QualityArgs, conf: &Config) -> Result<()> {
    let image = util::load_image(&args.input, &conf.upload_limits())?;
    let report = quality::assess(&image, &conf.quality_thresholds())?;
    let summary = QualitySummary::new(util::file_name(&args.input), image.dimensions(), report);

    if args.json {
        println!("{}", serde_json::to_string_pretty(&summary)?);
    } else {
        print!("{}", render(&summary));
    }

    Ok(())
}

fn render(summary: &QualitySummary) -> String {
    let mut text = format!(
        "{} ({}x{})\n  valid:     {}\n  score:     {:.3}\n  mean:      {:.1}\n  contrast:  {:.1}\n  sharpness: {:.1}\n",
        summary.file,
        summary.width,
        summary.height,
        summary.is_valid,
        summary.quality_score,
        summary.mean_intensity,
        summary.contrast,
        summary.sharpness,
    );

    for issue in &summary.issues {
        text.push_str(&format!("  - {issue}\n"));
    }

    text
}
