use super::util;
use crate::{cli::AugmentArgs, config::Config};
use anyhow::{Result, bail};
use scan_effect::{
    Effect,
    augment::{self, AugmentConfig, AugmentationKind},
};

pub fn augment(args: AugmentArgs, conf: &Config) -> Result<()> {
    let image = util::load_image(&args.input, &conf.upload_limits())?;

    let (augmented, tag) = match (args.random, args.kind) {
        (Some(count), _) => (
            augment::random_augmentation(image, count, args.seed)?,
            "random".to_string(),
        ),
        (None, Some(kind)) => {
            let kind = AugmentationKind::from(kind);
            let mut config = AugmentConfig::new(kind).with_intensity(args.intensity);
            if let Some(seed) = args.seed {
                config = config.with_seed(seed);
            }

            (config.apply(image)?, kind.name().to_string())
        }
        (None, None) => bail!("either --kind or --random is required"),
    };

    let output = args
        .output
        .unwrap_or_else(|| util::output_path(&args.input, conf, &format!("_{tag}")));
    util::save_image(&output, &augmented)?;
    log::info!("{} -> {} ({tag})", args.input.display(), output.display());

    Ok(())
}
