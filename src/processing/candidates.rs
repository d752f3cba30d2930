use crate::core::LocationFix;

/// Coarse-mode candidates collected during one session.
///
/// Append-only; insertion order is kept but carries no meaning beyond the
/// selector's scan order. Owned by a single session, so no locking.
#[derive(Debug, Clone, Default)]
pub struct CandidateStore {
    fixes: Vec<LocationFix>,
}

impl CandidateStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&mut self, fix: LocationFix) {
        self.fixes.push(fix);
    }

    pub fn all(&self) -> &[LocationFix] {
        &self.fixes
    }

    pub fn len(&self) -> usize {
        self.fixes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fixes.is_empty()
    }
}
