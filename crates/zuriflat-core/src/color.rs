//! Stable color assignment shared by every view.
//!
//! A listing's identity color depends only on its rank in the ordered top
//! list, so the map, scatter, list, radar and contribution views all paint the
//! same listing the same way without coordinating with each other.

use std::fmt;

use crate::ListingId;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Color(&'static str);

impl Color {
    pub const fn hex(self) -> &'static str {
        self.0
    }
}

impl fmt::Display for Color {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.0)
    }
}

/// Palette for ranks 0..=4 of the top recommendations.
pub const TOP_COLORS: [Color; 5] = [
    Color("#e41a1c"),
    Color("#377eb8"),
    Color("#4daf4a"),
    Color("#ff7f00"),
    Color("#984ea3"),
];

/// Any listing outside the top list.
pub const NEUTRAL: Color = Color("#999999");

pub const SELECTION: Color = Color("#f39c12");
pub const BRUSHED: Color = Color("#3498db");

pub const CLUSTER_COLORS: [Color; 8] = [
    Color("#8dd3c7"),
    Color("#ffffb3"),
    Color("#bebada"),
    Color("#fb8072"),
    Color("#80b1d3"),
    Color("#fdb462"),
    Color("#b3de69"),
    Color("#fccde5"),
];

pub mod opacity {
    pub const NORMAL: f32 = 0.7;
    pub const SELECTED: f32 = 1.0;
    pub const BRUSHED: f32 = 0.9;
    pub const DIMMED: f32 = 0.3;
}

/// Palette entry for a rank, or [`NEUTRAL`] when there is none or it is out of range.
pub fn top_color(rank: Option<usize>) -> Color {
    rank.and_then(|r| TOP_COLORS.get(r).copied())
        .unwrap_or(NEUTRAL)
}

/// Identity color of `id` given the ordered top list.
pub fn color_for(id: &ListingId, top: &[ListingId]) -> Color {
    top_color(top.iter().position(|t| t == id))
}

pub fn cluster_color(cluster_id: u32) -> Color {
    CLUSTER_COLORS[cluster_id as usize % CLUSTER_COLORS.len()]
}
