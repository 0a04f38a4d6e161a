//! Candidate scanner: finds on-page images worth comparing.
//!
//! Scanning is lazy. [`scan`] returns a [`Stream`] that does no page work until it
//! is first polled, and each further poll inspects elements only until the next
//! candidate is found. A consumer that stops polling stops the scan.
//!
//! Elements whose rendered size is far from every reference image are skipped
//! before any screenshot is taken; screenshots, decoding and pixel comparison are
//! the expensive part of a match attempt.

use crate::codec::{self, RasterImage};
use crate::page::{BoundingBox, PageSurface};
use crate::reference::ReferenceImageSet;
use futures::stream::{self, Stream};
use std::time::Duration;
use tracing::{debug, instrument, warn};

/// Relative tolerance between a rendered box and a reference's native size.
///
/// Accounts for CSS scaling of rendered images.
pub const SIZE_TOLERANCE: f64 = 0.5;

/// Default per-element wait for image loading.
pub const DEFAULT_LOAD_TIMEOUT: Duration = Duration::from_millis(1000);

/// An on-page element handle together with its box at scan time.
#[derive(Debug, Clone)]
pub struct CandidateElement<E> {
    /// Handle owned by the page automation layer.
    pub handle: E,
    /// Rendered size when the element was scanned.
    pub bounding_box: BoundingBox,
}

/// A candidate that passed the size filter, with its decoded screenshot.
#[derive(Debug, Clone)]
pub struct Candidate<E> {
    /// The element the screenshot was taken of.
    pub element: CandidateElement<E>,
    /// The decoded screenshot.
    pub raster: RasterImage,
}

/// Returns `true` if `bounding_box` is within [`SIZE_TOLERANCE`] of at least one
/// reference image on both axes. Bounds are inclusive.
#[must_use]
pub fn passes_size_filter(bounding_box: &BoundingBox, references: &ReferenceImageSet) -> bool {
    references.iter().any(|reference| {
        within_tolerance(bounding_box.width, f64::from(reference.width()))
            && within_tolerance(bounding_box.height, f64::from(reference.height()))
    })
}

fn within_tolerance(rendered: f64, native: f64) -> bool {
    rendered >= native * (1.0 - SIZE_TOLERANCE) && rendered <= native * (1.0 + SIZE_TOLERANCE)
}

/// Builds the in-page script that waits for every `<img>` to settle.
///
/// Each image resolves on `load`, on `error`, or after `timeout`, whichever comes
/// first. The script evaluates to the number of images it waited on.
#[must_use]
pub fn image_load_script(timeout: Duration) -> String {
    let timeout_ms = timeout.as_millis();
    format!(
        r"(async () => {{
  const images = Array.from(document.images);
  await Promise.all(images.map((img) => img.complete ? null : new Promise((resolve) => {{
    const done = () => resolve(null);
    img.addEventListener('load', done, {{ once: true }});
    img.addEventListener('error', done, {{ once: true }});
    setTimeout(done, {timeout_ms});
  }})));
  return images.length;
}})()"
    )
}

/// Scans `page` for image elements that could plausibly match a reference.
///
/// Yields candidates in document order. Failures never end the stream early with
/// an error: a failed enumeration produces an empty scan, and an element whose
/// layout query, screenshot or decode fails is skipped.
pub fn scan<'a, P: PageSurface>(
    page: &'a P,
    references: &'a ReferenceImageSet,
    load_timeout: Duration,
) -> impl Stream<Item = Candidate<P::Element>> + 'a {
    // `None` until the first poll enumerates the page.
    stream::unfold(None, move |state: Option<ScanState<P::Element>>| async move {
        let mut state = match state {
            Some(state) => state,
            None => ScanState {
                elements: prepare(page, load_timeout).await.into_iter(),
                index: 0,
            },
        };

        while let Some(handle) = state.elements.next() {
            let index = state.index;
            state.index += 1;

            if let Some(candidate) = inspect(page, references, handle, index).await {
                return Some((candidate, Some(state)));
            }
        }

        None
    })
}

struct ScanState<E> {
    elements: std::vec::IntoIter<E>,
    index: usize,
}

/// Enumerates image elements and waits for them to finish loading.
#[instrument(name = "scanner::scan", skip_all)]
async fn prepare<P: PageSurface>(page: &P, load_timeout: Duration) -> Vec<P::Element> {
    let elements = match page.image_elements().await {
        Ok(elements) => elements,
        Err(e) => {
            warn!(error = %e, "Failed to enumerate image elements");
            return Vec::new();
        }
    };

    debug!(element_count = elements.len(), "Found image elements");

    if elements.is_empty() {
        return elements;
    }

    // The script bounds each image itself; this guards against a stalled evaluation.
    let guard = load_timeout * 2;
    let script = image_load_script(load_timeout);
    match tokio::time::timeout(guard, page.evaluate_script(&script)).await {
        Ok(Ok(waited)) => debug!(waited = %waited, "Images settled"),
        Ok(Err(e)) => warn!(error = %e, "Image load wait failed, scanning anyway"),
        Err(_) => warn!(
            timeout_ms = u64::try_from(guard.as_millis()).unwrap_or(u64::MAX),
            "Image load wait timed out, scanning anyway"
        ),
    }

    elements
}

/// Applies the layout and size checks to one element and captures it if it passes.
async fn inspect<P: PageSurface>(
    page: &P,
    references: &ReferenceImageSet,
    handle: P::Element,
    index: usize,
) -> Option<Candidate<P::Element>> {
    let bounding_box = match page.bounding_box(&handle).await {
        Ok(Some(bounding_box)) if !bounding_box.is_empty() => bounding_box,
        Ok(_) => {
            debug!(candidate_index = index, "Element not laid out, skipping");
            return None;
        }
        Err(e) => {
            debug!(candidate_index = index, error = %e, "Bounding box query failed, skipping");
            return None;
        }
    };

    if !passes_size_filter(&bounding_box, references) {
        debug!(
            candidate_index = index,
            width = bounding_box.width,
            height = bounding_box.height,
            "Element size rules out every reference"
        );
        return None;
    }

    let bytes = match page.screenshot(&handle).await {
        Ok(bytes) => bytes,
        Err(e) => {
            warn!(candidate_index = index, error = %e, "Screenshot failed, skipping element");
            return None;
        }
    };

    let raster = match codec::decode(&bytes) {
        Ok(raster) => raster,
        Err(e) => {
            warn!(candidate_index = index, error = %e, "Screenshot decode failed, skipping element");
            return None;
        }
    };

    debug!(
        candidate_index = index,
        width = raster.width(),
        height = raster.height(),
        "Captured candidate"
    );

    Some(Candidate {
        element: CandidateElement {
            handle,
            bounding_box,
        },
        raster,
    })
}
