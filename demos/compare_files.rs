//! Example: Comparing an image file against a reference directory.
//!
//! Runs the pixel comparator directly, without a page, and prints the outcome
//! for every reference image.
//!
//! # Usage
//!
//! ```bash
//! cargo run --example compare_files -- ./images ./screenshot.png
//! ```

use email_image_match::{PixelComparator, ReferenceImageSet};
use std::env;

fn main() -> email_image_match::Result<()> {
    let mut args = env::args().skip(1);
    let images_dir = args.next().unwrap_or_else(|| "./images".to_string());
    let candidate_path = args
        .next()
        .expect("usage: compare_files <images_dir> <candidate_image>");

    let references = ReferenceImageSet::load(&images_dir)?;
    if references.is_empty() {
        println!("No reference images in {images_dir}");
        return Ok(());
    }

    let candidate = std::fs::read(&candidate_path).expect("candidate image readable");
    let comparator = PixelComparator::default();

    println!("Comparing {candidate_path} against {} references", references.len());

    for reference in &references {
        let outcome = comparator.compare_encoded(&candidate, reference.decoded());
        println!(
            "  {:<40} {:>6.2}%  {}",
            reference.path().display(),
            outcome.match_rate * 100.0,
            outcome.reason
        );
    }

    Ok(())
}
