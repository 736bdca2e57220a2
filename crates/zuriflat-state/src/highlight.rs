//! Render emphasis resolution shared by every view.

use zuriflat_core::color::{self, Color, opacity};
use zuriflat_core::{ListingId, color_for};

use crate::{Brush, Selection};

/// Why a listing stands out, in strict precedence order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Emphasis {
    Selected,
    Brushed,
    /// Member of the top list at this rank.
    Top(usize),
    Default,
}

impl Emphasis {
    /// Selection > brush > top-recommendation membership > default.
    pub fn resolve(id: &ListingId, selection: &Selection, brush: &Brush, top: &[ListingId]) -> Self {
        if selection.contains(id) {
            Emphasis::Selected
        } else if brush.contains(id) {
            Emphasis::Brushed
        } else if let Some(rank) = top.iter().position(|t| t == id) {
            Emphasis::Top(rank)
        } else {
            Emphasis::Default
        }
    }
}

/// How a view should paint one listing.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Style {
    pub emphasis: Emphasis,
    /// Emphasis color (selection / brush / identity).
    pub color: Color,
    /// Rank-based identity color, independent of selection and brushing.
    pub identity: Color,
    pub opacity: f32,
}

impl Style {
    pub fn resolve(id: &ListingId, selection: &Selection, brush: &Brush, top: &[ListingId]) -> Self {
        let emphasis = Emphasis::resolve(id, selection, brush, top);
        let identity = color_for(id, top);
        let (color, alpha) = match emphasis {
            Emphasis::Selected => (color::SELECTION, opacity::SELECTED),
            Emphasis::Brushed => (color::BRUSHED, opacity::BRUSHED),
            Emphasis::Top(_) => (identity, opacity::NORMAL),
            Emphasis::Default if brush.is_active() => (identity, opacity::DIMMED),
            Emphasis::Default => (identity, opacity::NORMAL),
        };
        Self {
            emphasis,
            color,
            identity,
            opacity: alpha,
        }
    }
}
