//! Filter identifiers understood by the remote filter service.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// The filters the remote endpoint implements, in filter-bar order.
///
/// The wire name of each variant is its lowercase form; that string is what
/// goes into the `filter` field of a filter request and what the preview
/// strip keys on.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, clap::ValueEnum,
)]
#[serde(rename_all = "lowercase")]
pub enum FilterKind {
    Grayscale,
    Sepia,
    Invert,
    Brightness,
    Contrast,
    Saturate,
}

impl FilterKind {
    /// All filters, in the order the filter bar presents them. Preview
    /// generation populates in this order.
    pub const ALL: [FilterKind; 6] = [
        FilterKind::Grayscale,
        FilterKind::Sepia,
        FilterKind::Invert,
        FilterKind::Brightness,
        FilterKind::Contrast,
        FilterKind::Saturate,
    ];

    /// The wire name sent to the remote endpoint.
    pub fn as_str(&self) -> &'static str {
        match self {
            FilterKind::Grayscale => "grayscale",
            FilterKind::Sepia => "sepia",
            FilterKind::Invert => "invert",
            FilterKind::Brightness => "brightness",
            FilterKind::Contrast => "contrast",
            FilterKind::Saturate => "saturate",
        }
    }
}

impl fmt::Display for FilterKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.pad(self.as_str())
    }
}

impl FromStr for FilterKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        FilterKind::ALL
            .iter()
            .find(|k| k.as_str() == s)
            .copied()
            .ok_or_else(|| format!("unknown filter: {}", s))
    }
}
