use std::fmt;

/// The views that can originate a brush gesture.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ViewKind {
    RankedList,
    Map,
    Scatter,
}

impl ViewKind {
    pub fn as_str(self) -> &'static str {
        match self {
            ViewKind::RankedList => "ranked_list",
            ViewKind::Map => "map",
            ViewKind::Scatter => "scatter",
        }
    }
}

impl fmt::Display for ViewKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
