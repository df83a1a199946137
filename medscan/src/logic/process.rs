use super::util;
use crate::{
    cli::{BatchArgs, PresetArg, ProcessArgs},
    config::Config,
};
use anyhow::{Context, Result, anyhow, bail};
use clap::ValueEnum;
use rayon::prelude::*;
use scan_effect::{ScanPreset, Workbench, XrayConfig, workbench::Processed};
use std::{
    fs,
    path::{Path, PathBuf},
    time::Instant,
};

pub fn process(args: ProcessArgs, conf: &Config) -> Result<()> {
    let preset = resolve_preset(args.preset, conf)?;
    let bytes = util::read_file(&args.input)?;

    let mut bench = Workbench::new(conf.upload_limits());
    bench
        .upload(&util::file_name(&args.input), &bytes)
        .with_context(|| format!("{} rejected", args.input.display()))?;

    let processed = apply_preset(&mut bench, preset, conf)?;

    if args.data_url {
        println!("{}", processed.data_url);
        return Ok(());
    }

    let output = args
        .output
        .unwrap_or_else(|| util::output_path(&args.input, conf, &conf.processing.output_suffix));
    util::write_png(&output, &processed.png)?;
    log::info!("{} -> {} ({})", args.input.display(), output.display(), preset.name());

    Ok(())
}

pub fn batch(args: BatchArgs, conf: &Config) -> Result<()> {
    let preset = resolve_preset(args.preset, conf)?;
    let limits = conf.upload_limits();

    let mut inputs = fs::read_dir(&args.dir)
        .with_context(|| format!("read dir {} failed", args.dir.display()))?
        .filter_map(|entry| entry.ok().map(|entry| entry.path()))
        .filter(|path| path.is_file() && limits.is_allowed(&util::file_name(path)))
        .filter(|path| {
            let previous = is_previous_output(path, &conf.processing.output_suffix);
            if previous {
                log::debug!("skip previous output {}", path.display());
            }
            !previous
        })
        .collect::<Vec<_>>();
    inputs.sort();

    if inputs.is_empty() {
        bail!("no supported images in {}", args.dir.display());
    }

    let out_dir = match args.output {
        Some(dir) => dir,
        None if !conf.processing.output_dir.is_empty() => PathBuf::from(&conf.processing.output_dir),
        None => args.dir.clone(),
    };
    fs::create_dir_all(&out_dir)
        .with_context(|| format!("create dir {} failed", out_dir.display()))?;

    let start = Instant::now();
    let results = inputs
        .par_iter()
        .map(|input| {
            let output = util::output_in_dir(input, &out_dir, &conf.processing.output_suffix);
            (input, process_one(input, &output, preset, conf))
        })
        .collect::<Vec<_>>();

    let mut failed = 0;
    for (input, result) in &results {
        if let Err(e) = result {
            failed += 1;
            log::warn!("{}: {e:?}", input.display());
        }
    }

    log::info!(
        "processed {}/{} images with {} in {:.2?}",
        results.len() - failed,
        results.len(),
        preset.name(),
        start.elapsed()
    );

    if failed == results.len() {
        bail!("all {failed} images failed");
    }

    Ok(())
}

pub fn presets() {
    for preset in ScanPreset::all_presets() {
        let arg = PresetArg::value_variants()
            .iter()
            .find(|arg| ScanPreset::from(**arg) == *preset)
            .and_then(|arg| arg.to_possible_value());

        match arg {
            Some(value) => println!("{:<14} {}", value.get_name(), preset.name()),
            None => println!("{}", preset.name()),
        }
    }
}

fn process_one(input: &Path, output: &Path, preset: ScanPreset, conf: &Config) -> Result<()> {
    let bytes = util::read_file(input)?;
    let mut bench = Workbench::new(conf.upload_limits());
    bench.upload(&util::file_name(input), &bytes)?;

    let processed = apply_preset(&mut bench, preset, conf)?;
    util::write_png(output, &processed.png)?;
    log::debug!("{} -> {}", input.display(), output.display());

    Ok(())
}

fn is_previous_output(path: &Path, suffix: &str) -> bool {
    !suffix.is_empty()
        && path
            .file_stem()
            .is_some_and(|stem| stem.to_string_lossy().ends_with(suffix))
}

/// The X-Ray preset picks up the configured contrast.
fn apply_preset<'a>(
    bench: &'a mut Workbench,
    preset: ScanPreset,
    conf: &Config,
) -> Result<&'a Processed> {
    let processed = match preset {
        ScanPreset::Xray => {
            bench.apply(&XrayConfig::new().with_contrast(conf.processing.xray_contrast))?
        }
        _ => bench.apply_preset(preset)?,
    };

    Ok(processed)
}

fn resolve_preset(arg: Option<PresetArg>, conf: &Config) -> Result<ScanPreset> {
    let arg = match arg {
        Some(arg) => arg,
        None => PresetArg::from_str(&conf.processing.default_preset, true).map_err(|e| {
            anyhow!("invalid default_preset `{}`: {e}", conf.processing.default_preset)
        })?,
    };

    Ok(arg.into())
}
