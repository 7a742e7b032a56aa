use std::path::Path;

use anyhow::Result;
use image::{Rgb, RgbImage};
use rand::Rng;
use tracing::info;

const IMAGE_COUNT: usize = 100;

/// Dimension bounds in pixels, upper bound exclusive.
const MIN_DIMENSION: u32 = 300;
const MAX_DIMENSION: u32 = 2000;

fn main() -> Result<()> {
    shared::log::init();

    generate_images(Path::new("."), IMAGE_COUNT)?;
    info!("Generated {IMAGE_COUNT} test images");

    Ok(())
}

/// Writes `count` randomly sized, randomly colored JPEGs named
/// `test_<i>.jpg` into `dir`.
fn generate_images(dir: &Path, count: usize) -> Result<()> {
    let mut rng = rand::thread_rng();

    for i in 0..count {
        let width = rng.gen_range(MIN_DIMENSION..MAX_DIMENSION);
        let height = rng.gen_range(MIN_DIMENSION..MAX_DIMENSION);

        let image = RgbImage::from_fn(width, height, |_, _| {
            Rgb([rng.gen(), rng.gen(), rng.gen()])
        });
        image.save(dir.join(format!("test_{i}.jpg")))?;
    }

    Ok(())
}
