//! View coordinator: routes shared model state into each dashboard view and
//! each view's interactions back into the models.

pub mod dashboard;
pub mod panels;
pub mod radar;

pub use dashboard::{Dashboard, RateError, ViewEvent};
pub use panels::Panel;
