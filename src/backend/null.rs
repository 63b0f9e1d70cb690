use super::{BackendError, SearchBackend, SearchHit};

/// Backend that never returns candidates. Stands in when retrieval is
/// disabled.
#[derive(Debug, Default, Clone, Copy)]
pub struct NullSearchBackend;

impl SearchBackend for NullSearchBackend {
    fn search(&self, _query: &str, _limit: usize) -> Result<Vec<SearchHit>, BackendError> {
        Ok(Vec::new())
    }
}
