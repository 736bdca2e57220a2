//! Plain-text rendering of dashboard panels.

use std::fmt::Write;

use zuriflat_core::{Listing, ListingsPage, RatingAck};
use zuriflat_host::panels::{
    CalibrationView, ContributionView, DetailView, MapView, RadarView, RankedList, ScatterView,
};
use zuriflat_state::{Emphasis, Style};

const NAME_WIDTH: usize = 36;
const BAR_WIDTH: usize = 20;

/// Short emphasis marker: `*` selected, `~` brushed, `#n` top rank.
pub fn badge(style: &Style) -> String {
    let mark = match style.emphasis {
        Emphasis::Selected => "*".to_string(),
        Emphasis::Brushed => "~".to_string(),
        Emphasis::Top(rank) => format!("#{}", rank + 1),
        Emphasis::Default => String::new(),
    };
    format!("{mark:>3} {}", style.color)
}

fn truncate(s: &str, width: usize) -> String {
    if s.chars().count() <= width {
        return s.to_string();
    }
    let head: String = s.chars().take(width.saturating_sub(1)).collect();
    format!("{head}…")
}

pub fn listing_line(listing: &Listing) -> String {
    format!(
        "{:>10}  {:<width$}  {:>7.0} CHF  {:>5.1} km  {:>4} reviews  {}",
        listing.id,
        truncate(&listing.name, NAME_WIDTH),
        listing.price,
        listing.distance_from_center,
        listing.number_of_reviews,
        listing.room_type,
        width = NAME_WIDTH,
    )
}

pub fn render_listings(page: &ListingsPage) -> String {
    let mut out = String::new();
    let _ = writeln!(
        out,
        "{} of {} listings (page {})",
        page.apartments.len(),
        page.total,
        page.page
    );
    for listing in &page.apartments {
        let _ = writeln!(out, "{}", listing_line(listing));
    }
    out
}

pub fn render_ranked(list: &RankedList) -> String {
    let mut out = String::new();
    let model = if list.model_trained {
        "personal model"
    } else {
        "not yet calibrated"
    };
    let _ = writeln!(
        out,
        "Recommendations ({model}, {} ratings)",
        list.ratings_count
    );
    for row in &list.rows {
        let rated = row
            .rating
            .map(|r| format!("  rated {}", r.get()))
            .unwrap_or_default();
        let _ = writeln!(
            out,
            "{}  {:>6.2}  {}{rated}",
            badge(&row.style),
            row.score,
            listing_line(&row.listing)
        );
    }
    out
}

pub fn render_map(map: &MapView) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "Map: {} of {} listings", map.markers.len(), map.total);
    for marker in &map.markers {
        let cluster = marker
            .cluster
            .map(|(id, color)| format!("cluster {id} {color}"))
            .unwrap_or_else(|| "-".to_string());
        let _ = writeln!(
            out,
            "{}  ({:.4}, {:.4})  {:<18}  {}",
            badge(&marker.style),
            marker.listing.latitude,
            marker.listing.longitude,
            cluster,
            marker.listing.id
        );
    }
    for c in &map.centroids {
        let _ = writeln!(
            out,
            "  centroid {}: ({:.4}, {:.4}) size {}",
            c.cluster_id, c.latitude, c.longitude, c.size
        );
    }
    if let Some(err) = &map.clusters_error {
        let _ = writeln!(out, "  clusters unavailable: {err}");
    }
    out
}

pub fn render_scatter(scatter: &ScatterView) -> String {
    let mut out = String::new();
    let _ = write!(out, "Scatter: {} vs {}", scatter.x_label, scatter.y_label);
    if let Some(var) = &scatter.explained_variance {
        let pct: Vec<String> = var.iter().map(|v| format!("{:.1}%", v * 100.0)).collect();
        let _ = write!(out, " (explained {})", pct.join(", "));
    }
    out.push('\n');
    for p in &scatter.points {
        let _ = writeln!(
            out,
            "{}  {:>10.3}  {:>10.3}  {}",
            badge(&p.style),
            p.x,
            p.y,
            p.id
        );
    }
    out
}

fn bar(value: f64) -> String {
    let filled = (value.clamp(0.0, 1.0) * BAR_WIDTH as f64).round() as usize;
    format!("{}{}", "#".repeat(filled), ".".repeat(BAR_WIDTH - filled))
}

pub fn render_radar(radar: &RadarView) -> String {
    let mut out = String::new();
    for series in &radar.series {
        let _ = writeln!(out, "{} {} ({})", series.color, series.name, series.id);
        for (axis, value) in radar.axes.iter().zip(series.values) {
            let _ = writeln!(out, "  {axis:<13} {} {value:.2}", bar(value));
        }
    }
    out
}

pub fn render_contributions(view: &ContributionView) -> String {
    let mut out = String::new();
    for b in &view.bars {
        let _ = writeln!(
            out,
            "{} {} ({}): score {:.2} = {:.2} intercept",
            b.color, b.name, b.id, b.predicted_score, b.intercept
        );
        for c in &b.contributions {
            let _ = writeln!(
                out,
                "  {:<24} {:>+8.3}  (coef {:+.3}, z {:+.2})",
                c.feature_name, c.contribution, c.coefficient, c.normalized_value
            );
        }
    }
    out
}

pub fn render_detail(detail: &DetailView) -> String {
    let l = &detail.listing;
    let mut out = String::new();
    let _ = writeln!(out, "=== {} ===", l.name);
    let _ = writeln!(out, "{}", badge(&detail.style));
    let rows: [(&str, String); 10] = [
        ("id", l.id.to_string()),
        ("host", l.host_name.clone().unwrap_or_default()),
        ("neighbourhood", l.neighbourhood.clone()),
        ("room type", l.room_type.clone()),
        ("price", format!("{:.0} CHF", l.price)),
        ("distance", format!("{:.2} km", l.distance_from_center)),
        ("minimum nights", l.minimum_nights.to_string()),
        ("reviews", l.number_of_reviews.to_string()),
        ("last review", l.last_review.clone().unwrap_or_default()),
        ("availability", format!("{} days/year", l.availability_365)),
    ];
    for (label, value) in rows.iter().filter(|(_, v)| !v.is_empty()) {
        let _ = writeln!(out, "  {label:<16} {value}");
    }
    if let Some(r) = detail.rating {
        let _ = writeln!(out, "  {:<16} {}", "your rating", r.get());
    }
    out
}

pub fn render_calibration(view: &CalibrationView) -> String {
    let mut out = String::new();
    let _ = writeln!(
        out,
        "Calibration sample: rated {} of {}{}",
        view.rated,
        view.listings.len(),
        if view.model_trained {
            " (model trained)"
        } else {
            ""
        }
    );
    for listing in &view.listings {
        let _ = writeln!(out, "{}", listing_line(listing));
    }
    out
}

pub fn render_ack(ack: &RatingAck) -> String {
    format!("rating recorded ({} this session)", ack.ratings_count)
}
