use zuriflat_core::{ProjectionMode, ProjectionParams};

/// Scatter view settings: mode, attribute pair, and outlier filtering.
#[derive(Debug, Clone, PartialEq)]
pub struct ProjectionSettings {
    pub mode: ProjectionMode,
    pub attributes: Vec<String>,
    pub filter_outliers: bool,
}

impl Default for ProjectionSettings {
    fn default() -> Self {
        Self {
            mode: ProjectionMode::Raw,
            attributes: vec!["price".to_string(), "distance_from_center".to_string()],
            filter_outliers: false,
        }
    }
}

impl ProjectionSettings {
    /// Read parameters, or `None` while no attribute is chosen (the read is disabled).
    pub fn params(&self) -> Option<ProjectionParams> {
        if self.attributes.is_empty() {
            return None;
        }
        Some(ProjectionParams {
            attributes: self.attributes.clone(),
            mode: self.mode,
            filter_outliers: self.filter_outliers,
        })
    }
}
