use std::collections::HashMap;

use super::record::{Identity, PersistedRecord, Reconcilable};

/// An incoming record together with its index in the submitted list.
#[derive(Debug)]
pub struct Planned<'a, R> {
    pub position: usize,
    pub record: &'a R,
}

/// What it takes to turn the persisted set into the incoming one.
pub struct Diff<'a, R: Reconcilable> {
    /// Records without a matching stored row, in incoming order.
    pub to_create: Vec<Planned<'a, R>>,
    /// Records matched to their stored row, in incoming order.
    pub to_update: Vec<(Planned<'a, R>, R::Row)>,
    /// Stored rows no incoming record refers to, in persisted order.
    pub to_delete: Vec<R::Row>,
    /// Positions of earlier duplicates of a stored key; the last occurrence
    /// won. Duplicates of a key with no stored row are not listed here: each
    /// of them is in `to_create`.
    pub superseded: Vec<usize>,
}

/// Partition `incoming` against `persisted` by exact key equality.
///
/// A persisted identity that does not match any stored row (the row was
/// removed, or the key belongs elsewhere) cannot be updated and is planned as
/// a create. When a stored key occurs more than once, only its last
/// occurrence is kept; earlier positions are reported in [`Diff::superseded`].
/// Every record holding a key with no stored row becomes its own create.
pub fn diff<'a, R: Reconcilable>(incoming: &'a [R], persisted: Vec<R::Row>) -> Diff<'a, R> {
    let index: HashMap<R::Key, usize> = persisted
        .iter()
        .enumerate()
        .map(|(i, row)| (row.key(), i))
        .collect();

    let identities: Vec<Identity<R::Key>> = incoming.iter().map(Reconcilable::identity).collect();

    let mut last_occurrence: HashMap<&R::Key, usize> = HashMap::new();
    for (position, identity) in identities.iter().enumerate() {
        if let Some(key) = identity.key()
            && index.contains_key(key)
        {
            last_occurrence.insert(key, position);
        }
    }

    let mut slots: Vec<Option<R::Row>> = persisted.into_iter().map(Some).collect();
    let mut to_create = Vec::new();
    let mut to_update = Vec::new();
    let mut superseded = Vec::new();

    for (position, (record, identity)) in incoming.iter().zip(&identities).enumerate() {
        let planned = Planned { position, record };
        let Some(key) = identity.key() else {
            to_create.push(planned);
            continue;
        };
        match last_occurrence.get(key) {
            None => to_create.push(planned),
            Some(&winner) if winner != position => superseded.push(position),
            Some(_) => {
                // Each stored key has exactly one winning position.
                if let Some(row) = slots[index[key]].take() {
                    to_update.push((planned, row));
                }
            }
        }
    }

    let to_delete = slots.into_iter().flatten().collect();

    Diff {
        to_create,
        to_update,
        to_delete,
        superseded,
    }
}
