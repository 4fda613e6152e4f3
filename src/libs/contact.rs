use crate::libs::error::BindError;
use crate::libs::spatial::SpatialIndex;
use crate::libs::structure::{Residue, Structure};
use fxhash::FxHashSet;

/// Default contact radius in Ångström
pub const CONTACT_RADIUS: f64 = 3.5;

/// Residues within `distance` positions along the chain of any fragment
/// residue, the fragment included.
pub fn exclusion_zone(
    fragment: &[&Residue],
    structure: &Structure,
    distance: usize,
) -> FxHashSet<usize> {
    fragment
        .iter()
        .flat_map(|res| structure.chain_neighbors(res, distance))
        .map(|res| res.position)
        .collect()
}

/// Positions of the residues touching `fragment`.
///
/// Every accepted atom of the fragment queries `index` for atoms within
/// `radius`; the parents of the hits count as contacts unless they fall in the
/// fragment's exclusion zone (the fragment and `exclusion` chain neighbours on
/// each side). `index` must have been built over `structure.atoms()`.
pub fn find_contacts<S: SpatialIndex + ?Sized>(
    fragment: &[&Residue],
    structure: &Structure,
    index: &S,
    radius: f64,
    exclusion: usize,
) -> Result<FxHashSet<usize>, BindError> {
    if fragment.is_empty() {
        return Err(BindError::EmptyFragment);
    }

    let atoms = structure.atoms();
    let mut contacts = FxHashSet::default();
    for res in fragment {
        for atom in structure.residue_atoms(res) {
            if !atom.is_accepted() {
                continue;
            }
            for idx in index.query(atom.coord, radius) {
                let hit = &atoms[idx];
                if hit.is_accepted() {
                    contacts.insert(hit.residue);
                }
            }
        }
    }

    let excluded = exclusion_zone(fragment, structure, exclusion);
    contacts.retain(|position| !excluded.contains(position));

    Ok(contacts)
}
