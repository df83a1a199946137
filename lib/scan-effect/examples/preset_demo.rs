use image::ImageReader;
use scan_effect::{Effect, ScanPreset};
use std::path::Path;

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let output_dir = Path::new("tmp");
    std::fs::create_dir_all(output_dir)?;

    let img = ImageReader::open("data/test.png")?.decode()?.to_rgba8();

    for preset in ScanPreset::all_presets() {
        let Some(effect) = preset.effect() else {
            continue;
        };

        let out = effect.apply(img.clone())?;
        let filename = format!("preset_{}.png", preset.name().to_lowercase().replace(' ', "_"));
        out.save(output_dir.join(&filename))?;
        println!("✓ {:<16} -> tmp/{filename}", preset.name());
    }

    Ok(())
}
