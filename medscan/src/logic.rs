//! Subcommand handlers.

use crate::{cli::Command, config::Config};
use anyhow::Result;

mod augment;
mod preprocess;
mod process;
mod quality;
mod util;

pub fn dispatch(command: Command, conf: &Config) -> Result<()> {
    match command {
        Command::Process(args) => process::process(args, conf),
        Command::Batch(args) => process::batch(args, conf),
        Command::Quality(args) => quality::quality(args, conf),
        Command::Preprocess(args) => preprocess::preprocess(args, conf),
        Command::LungCrop(args) => preprocess::lung_crop(args, conf),
        Command::Augment(args) => augment::augment(args, conf),
        Command::Presets => {
            process::presets();
            Ok(())
        }
    }
}
