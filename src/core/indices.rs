use hashbrown::HashMap;

use crate::types::{Band, Mode, QsoId};

/// Key to the ids stored under it, in log order.
pub type VecIndex<K> = HashMap<K, Vec<QsoId>>;

/// Scope of the default dupe rule: same callsign, band and mode.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct DupeKey {
    /// Uppercased callsign.
    pub call: String,
    /// Band derived from the frequency.
    pub band: Band,
    /// Operating mode.
    pub mode: Mode,
}

impl DupeKey {
    /// Normalizes the callsign and builds the key.
    pub fn new(call: &str, band: Band, mode: &Mode) -> Self {
        Self {
            call: call.trim().to_ascii_uppercase(),
            band,
            mode: mode.clone(),
        }
    }
}

pub(crate) fn remove_from_vec_index<K>(index: &mut VecIndex<K>, key: &K, id: QsoId)
where
    K: std::hash::Hash + Eq,
{
    if let Some(ids) = index.get_mut(key) {
        if let Some(pos) = ids.iter().position(|x| *x == id) {
            ids.remove(pos);
        }
        if ids.is_empty() {
            index.remove(key);
        }
    }
}
