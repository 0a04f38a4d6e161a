//! Example: Running the full matcher with tracing enabled.
//!
//! A directory of screenshots stands in for a rendered page: every image file is
//! treated as one `<img>` element whose rendered size is its pixel size.
//!
//! # Usage
//!
//! ```bash
//! # Optional: put these in a .env file instead
//! export IMAGES_DIR=./images
//! export IMAGE_MATCH_THRESHOLD=0.8
//! # Set log level (trace, debug, info, warn, error)
//! export RUST_LOG=email_image_match=debug
//!
//! cargo run --example with_tracing -- ./page-images
//! ```

use email_image_match::page::{BoundingBox, PageSurface};
use email_image_match::triage::MessageAction;
use email_image_match::{Error, ImageMatcher, MatchConfig, ReferenceImageSet, Result};
use std::env;
use std::path::PathBuf;
use tracing_subscriber::fmt::format::FmtSpan;
use tracing_subscriber::EnvFilter;

/// Treats image files in a directory as page elements.
struct DirectoryPage {
    files: Vec<PathBuf>,
}

impl DirectoryPage {
    fn open(dir: &str) -> std::io::Result<Self> {
        let mut files: Vec<PathBuf> = std::fs::read_dir(dir)?
            .filter_map(|entry| entry.ok().map(|e| e.path()))
            .filter(|path| path.is_file())
            .collect();
        files.sort();
        Ok(Self { files })
    }
}

impl PageSurface for DirectoryPage {
    type Element = PathBuf;

    async fn image_elements(&self) -> Result<Vec<PathBuf>> {
        Ok(self.files.clone())
    }

    async fn evaluate_script(&self, _script: &str) -> Result<String> {
        // Files are always fully "loaded"
        Ok(self.files.len().to_string())
    }

    async fn bounding_box(&self, element: &PathBuf) -> Result<Option<BoundingBox>> {
        Ok(image::image_dimensions(element)
            .ok()
            .map(|(w, h)| BoundingBox::new(f64::from(w), f64::from(h))))
    }

    async fn screenshot(&self, element: &PathBuf) -> Result<Vec<u8>> {
        std::fs::read(element).map_err(|e| Error::Capture {
            message: e.to_string(),
        })
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("email_image_match=info")),
        )
        .with_span_events(FmtSpan::CLOSE)
        .with_target(true)
        .with_thread_ids(false)
        .with_file(false)
        .with_line_number(false)
        .init();

    let page_dir = env::args().nth(1).unwrap_or_else(|| "./page".to_string());

    let config = MatchConfig::from_env()?;
    tracing::debug!(?config, "Configuration loaded");

    let references = ReferenceImageSet::load(&config.images_dir)?;
    let page = DirectoryPage::open(&page_dir).expect("page directory readable");
    let matcher = ImageMatcher::new(config);

    let result = matcher.find_target_image(&page, &references).await;

    match MessageAction::from(&result) {
        MessageAction::FollowAndDelete {
            reference_path,
            match_rate,
        } => {
            let element = result.into_target().map(|hit| hit.element.handle);
            println!(
                "\nMatched {} ({:.1}%) on {:?}: follow link and delete",
                reference_path.display(),
                match_rate * 100.0,
                element
            );
        }
        MessageAction::RestoreUnread => println!("\nNo target image: restore unread"),
    }

    Ok(())
}
