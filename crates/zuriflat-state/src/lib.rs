pub mod filter;
pub mod focus;
pub mod highlight;
pub mod index;
pub mod ledger;
pub mod notify;
pub mod projection;
pub mod selection;
pub mod state;
pub mod top;
pub mod view;

pub use filter::{DraftField, FilterModel};
pub use focus::DetailFocus;
pub use highlight::{Emphasis, Style};
pub use index::ListingIndex;
pub use ledger::RatingLedger;
pub use notify::{Notifier, Slice, SubscriptionId};
pub use projection::ProjectionSettings;
pub use selection::{Brush, BrushGesture, Selection};
pub use state::DashboardState;
pub use top::TopRecommendations;
pub use view::ViewKind;
