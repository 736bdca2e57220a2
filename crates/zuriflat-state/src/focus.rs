use zuriflat_core::ListingId;

/// Which single listing, if any, is under detailed inspection.
///
/// Focus only says what is inspected; loading it is the detail view's own
/// cached read.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct DetailFocus {
    focused: Option<ListingId>,
}

impl DetailFocus {
    /// Focus `id`, replacing any prior focus. A blank id is a no-op.
    pub fn open(&mut self, id: &ListingId) -> bool {
        if id.is_empty() {
            return false;
        }
        let changed = self.focused.as_ref() != Some(id);
        self.focused = Some(id.clone());
        changed
    }

    pub fn close(&mut self) -> bool {
        self.focused.take().is_some()
    }

    pub fn focused(&self) -> Option<&ListingId> {
        self.focused.as_ref()
    }

    pub fn is_open(&self) -> bool {
        self.focused.is_some()
    }
}
