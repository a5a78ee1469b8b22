use sluice_core::models::TransportResponse;
use sluice_core::traits::ValidityPredicate;

pub const DEFAULT_NOT_FOUND_MARKER: &str = "<title>Not Found - Item - Classic wow database</title>";
pub const DEFAULT_MARKER_WINDOW: usize = 256;

/// Treats a page as "not found" when a marker shows up near the top of the body.
///
/// Only the first `window` bytes are searched; the marker must fit entirely
/// inside them.
#[derive(Debug, Clone)]
pub struct MarkerPredicate {
    marker: String,
    window: usize,
}

impl MarkerPredicate {
    pub fn new(marker: impl Into<String>, window: usize) -> Self {
        Self {
            marker: marker.into(),
            window,
        }
    }

    fn prefix<'a>(&self, body: &'a str) -> &'a str {
        let mut end = self.window.min(body.len());
        while !body.is_char_boundary(end) {
            end -= 1;
        }
        &body[..end]
    }
}

impl Default for MarkerPredicate {
    fn default() -> Self {
        Self::new(DEFAULT_NOT_FOUND_MARKER, DEFAULT_MARKER_WINDOW)
    }
}

impl ValidityPredicate for MarkerPredicate {
    fn is_valid_result(&self, response: &TransportResponse) -> bool {
        !self.prefix(&response.body).contains(self.marker.as_str())
    }
}
