use image::ImageReader;
use scan_effect::{Effect, ScanEffect, xray::XrayConfig};
use std::path::Path;

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let output_dir = Path::new("tmp");
    std::fs::create_dir_all(output_dir)?;

    let img_path = Path::new("data/test.png");
    let img = ImageReader::open(img_path)?.decode()?.to_rgba8();

    for contrast in [1.0, 1.5, 2.0] {
        let effect = ScanEffect::Xray(XrayConfig::new().with_contrast(contrast));
        let out = effect.apply(img.clone())?;

        let filename = format!("xray_{contrast:.1}.png");
        out.save(output_dir.join(&filename))?;
        println!("✓ Generated {filename}");
    }

    println!("\n✓ X-ray effects applied successfully!");
    println!("  Images saved to: tmp/");

    Ok(())
}
