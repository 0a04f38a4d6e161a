//! The page automation surface consumed by the scanner.
//!
//! The crate never drives a browser itself. Callers implement [`PageSurface`] on top
//! of whatever automation layer they use (CDP, WebDriver, ...) and hand a reference
//! to the matcher for the duration of one scan.
//!
//! # Example
//!
//! ```
//! use email_image_match::page::{BoundingBox, PageSurface};
//! use email_image_match::Result;
//!
//! /// A page with no images at all.
//! struct BlankPage;
//!
//! impl PageSurface for BlankPage {
//!     type Element = u32;
//!
//!     async fn image_elements(&self) -> Result<Vec<u32>> {
//!         Ok(Vec::new())
//!     }
//!
//!     async fn evaluate_script(&self, _script: &str) -> Result<String> {
//!         Ok("0".into())
//!     }
//!
//!     async fn bounding_box(&self, _element: &u32) -> Result<Option<BoundingBox>> {
//!         Ok(None)
//!     }
//!
//!     async fn screenshot(&self, _element: &u32) -> Result<Vec<u8>> {
//!         Ok(Vec::new())
//!     }
//! }
//! ```

use crate::error::Result;
use std::future::Future;

/// Rendered size of an element, in CSS pixels.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BoundingBox {
    /// Rendered width.
    pub width: f64,
    /// Rendered height.
    pub height: f64,
}

impl BoundingBox {
    /// Creates a bounding box.
    #[must_use]
    pub fn new(width: f64, height: f64) -> Self {
        Self { width, height }
    }

    /// Returns `true` if the box covers no area.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        !(self.width > 0.0 && self.height > 0.0)
    }
}

/// Capabilities the matcher needs from a live, rendered page.
///
/// Element handles are owned by the page; the matcher only borrows them while
/// inspecting an element and hands the matching one back to the caller.
pub trait PageSurface: Sync {
    /// Opaque handle to an on-page element.
    type Element: Send + Sync;

    /// Returns every image element currently in the DOM, in document order.
    fn image_elements(&self) -> impl Future<Output = Result<Vec<Self::Element>>> + Send;

    /// Evaluates `script` in the page's own execution context.
    ///
    /// The script may evaluate to a promise; implementations await it and
    /// return the settled value rendered as a string.
    fn evaluate_script(&self, script: &str) -> impl Future<Output = Result<String>> + Send;

    /// Returns the element's rendered box, or `None` if it is not laid out.
    fn bounding_box(
        &self,
        element: &Self::Element,
    ) -> impl Future<Output = Result<Option<BoundingBox>>> + Send;

    /// Captures a screenshot of just this element as encoded image bytes.
    fn screenshot(&self, element: &Self::Element) -> impl Future<Output = Result<Vec<u8>>> + Send;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_bounding_box_empty() {
        assert!(BoundingBox::new(0.0, 10.0).is_empty());
        assert!(BoundingBox::new(10.0, 0.0).is_empty());
        assert!(BoundingBox::new(f64::NAN, 10.0).is_empty());
        assert!(!BoundingBox::new(0.5, 0.5).is_empty());
    }
}
