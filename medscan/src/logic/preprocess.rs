use super::util;
use crate::{
    cli::{LungCropArgs, PreprocessArgs},
    config::Config,
};
use anyhow::Result;
use image::{RgbaImage, imageops::FilterType};
use scan_effect::preprocess::{self, PreprocessConfig};

pub fn preprocess(args: PreprocessArgs, conf: &Config) -> Result<()> {
    let image = util::load_image(&args.input, &conf.upload_limits())?;
    let config = preprocess_config(&args, conf);

    let input = preprocess::prepare_model_input(&image, &config)?;
    for (channel, (mean, std)) in ["r", "g", "b"].iter().zip(input.channel_stats()) {
        log::info!("tensor {channel}: mean {mean:.4}, std {std:.4}");
    }

    let resized = resized_image(&image, &config)?;
    let output = args
        .output
        .unwrap_or_else(|| util::output_path(&args.input, conf, "_preprocessed"));
    util::save_image(&output, &resized)?;
    log::info!(
        "{} -> {} ({}x{})",
        args.input.display(),
        output.display(),
        input.width,
        input.height
    );

    Ok(())
}

pub fn lung_crop(args: LungCropArgs, conf: &Config) -> Result<()> {
    let image = util::load_image(&args.input, &conf.upload_limits())?;
    let padding = args.padding.unwrap_or(conf.preprocess.lung_padding);

    let cropped = preprocess::crop_to_lung_region(&image, padding)?;
    if cropped.dimensions() == image.dimensions() {
        log::warn!("no lung region found in {}", args.input.display());
    }

    let output = args
        .output
        .unwrap_or_else(|| util::output_path(&args.input, conf, "_lung"));
    util::save_image(&output, &cropped)?;
    log::info!(
        "{} -> {} ({}x{})",
        args.input.display(),
        output.display(),
        cropped.width(),
        cropped.height()
    );

    Ok(())
}

fn preprocess_config(args: &PreprocessArgs, conf: &Config) -> PreprocessConfig {
    let mut config = conf.preprocess_config();
    if let Some(size) = args.size {
        config = config.with_target_width(size).with_target_height(size);
    }

    if args.keep_aspect {
        config = config.with_keep_aspect(true);
    }

    config
}

fn resized_image(image: &RgbaImage, config: &PreprocessConfig) -> Result<RgbaImage> {
    if config.keep_aspect {
        return Ok(preprocess::resize_with_aspect_ratio(
            image,
            config.target_width,
            config.target_height,
        )?);
    }

    Ok(image::imageops::resize(
        image,
        config.target_width,
        config.target_height,
        FilterType::Triangle,
    ))
}
