//! Scroll anchoring for the message list.
//!
//! The list is "anchored" while the viewport sits within
//! [`SCROLL_ANCHOR_THRESHOLD_PX`] of the bottom. New messages from other
//! people only move an anchored viewport.

/// Distance from the bottom, in pixels, that still counts as "at the bottom".
pub const SCROLL_ANCHOR_THRESHOLD_PX: f64 = 30.0;

/// Live scroll metrics of the message list container.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ScrollMetrics {
    /// Pixels scrolled from the top.
    pub scroll_top: f64,
    /// Total content height.
    pub scroll_height: f64,
    /// Visible height.
    pub client_height: f64,
}

impl ScrollMetrics {
    #[must_use]
    pub fn new(scroll_top: f64, scroll_height: f64, client_height: f64) -> Self {
        Self { scroll_top, scroll_height, client_height }
    }

    /// Pixels between the bottom of the viewport and the end of the content.
    /// Never negative, so overscroll counts as zero.
    #[must_use]
    pub fn distance_from_bottom(&self) -> f64 {
        (self.scroll_height - self.scroll_top - self.client_height).max(0.0)
    }

    #[must_use]
    pub fn is_anchored(&self) -> bool {
        self.distance_from_bottom() <= SCROLL_ANCHOR_THRESHOLD_PX
    }
}

#[cfg(test)]
#[path = "scroll_test.rs"]
mod tests;
