use zuriflat_core::Listing;

/// Radar axes in drawing order.
pub const AXES: [&str; 5] = [
    "Price",
    "Proximity",
    "Reviews",
    "Availability",
    "Flexibility",
];

const PRICE_SCALE: f64 = 1000.0;
const DISTANCE_SCALE_KM: f64 = 10.0;
const REVIEWS_SCALE: f64 = 100.0;
const AVAILABILITY_SCALE: f64 = 365.0;
const MIN_NIGHTS_SCALE: f64 = 30.0;

/// Normalise a listing onto the radar axes; every value is in `[0, 1]`, higher is better.
pub fn axes(listing: &Listing) -> [f64; 5] {
    [
        1.0 - listing.price / PRICE_SCALE,
        1.0 - listing.distance_from_center / DISTANCE_SCALE_KM,
        f64::from(listing.number_of_reviews) / REVIEWS_SCALE,
        f64::from(listing.availability_365) / AVAILABILITY_SCALE,
        1.0 - f64::from(listing.minimum_nights) / MIN_NIGHTS_SCALE,
    ]
    .map(|v| if v.is_finite() { v.clamp(0.0, 1.0) } else { 0.0 })
}
