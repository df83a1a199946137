use image::{Rgba, RgbaImage};

fn main() -> Result<(), Box<dyn std::error::Error>> {
    std::fs::create_dir_all("data")?;

    // Dark film with two bright elliptical fields, roughly a chest radiograph
    let (width, height) = (512u32, 512u32);
    let mut img = RgbaImage::new(width, height);

    for y in 0..height {
        for x in 0..width {
            let field = |cx: f32, cy: f32| {
                let dx = (x as f32 - cx) / 90.0;
                let dy = (y as f32 - cy) / 170.0;
                dx * dx + dy * dy
            };

            let inside = field(170.0, 256.0).min(field(342.0, 256.0));
            let base = if inside < 1.0 {
                (210.0 - inside * 80.0) as u8
            } else {
                (20 + (x + y) % 16) as u8
            };

            img.put_pixel(x, y, Rgba([base, base, base, 255]));
        }
    }

    img.save("data/test.png")?;
    println!("Created data/test.png");

    Ok(())
}
