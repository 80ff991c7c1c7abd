use crate::filter::Filter;

/// Entry of a list-valued function payload, matched by its declared key
/// field(s) during merges.
pub trait ListData: Clone {
    /// Do the key fields of `self` and `other` match?
    fn key_matches(&self, other: &Self) -> bool;

    /// Does the filter's selector pick this entry? A filter without a
    /// selector (or with an empty one) selects every entry.
    fn selected_by(&self, filter: &Filter) -> bool;
}

/// Canonical apply-update contract for list-valued data: a delete filter
/// removes the entries it selects; otherwise a partial filter upserts each
/// incoming entry by key; otherwise the incoming collection replaces the
/// old one wholesale.
pub fn update_list<T: ListData>(
    existing: Vec<T>,
    incoming: &[T],
    partial: Option<&Filter>,
    delete: Option<&Filter>,
) -> Vec<T> {
    if let Some(filter) = delete {
        return existing.into_iter().filter(|entry| !entry.selected_by(filter)).collect();
    }

    if partial.is_some() {
        let mut merged = existing;
        for entry in incoming {
            match merged.iter_mut().find(|existing| existing.key_matches(entry)) {
                Some(slot) => *slot = entry.clone(),
                None => merged.push(entry.clone()),
            }
        }
        return merged;
    }

    incoming.to_vec()
}
