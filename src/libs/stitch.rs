use crate::libs::error::BindError;
use crate::libs::structure::{Fragment, Residue, Structure};

/// Splits position-sorted contacts into contiguous fragments.
///
/// Neighbouring entries stay in one fragment when they share a chain and at
/// most `max_gap` positions are missing between them; the missing residues are
/// read from the structure and inserted. Fragments shorter than
/// `min_fragment_length` are dropped.
///
/// Examples with `max_gap = 1`, `min_fragment_length = 3`:
///
/// ```text
/// [1, 3, 4] -> [1, 2, 3, 4]
/// [1, 3]    -> (too short)
/// [1, 5]    -> (both too short)
/// ```
pub fn stitch<'a>(
    contacts: &[(usize, &'a Residue)],
    structure: &'a Structure,
    max_gap: usize,
    min_fragment_length: usize,
) -> Result<Vec<Fragment<'a>>, BindError> {
    let mut fragments = Vec::new();

    let Some(&(first_index, first)) = contacts.first() else {
        return Ok(fragments);
    };

    let mut current_index = first_index;
    let mut current = first;
    let mut working: Fragment<'a> = vec![first];

    for &(new_index, new) in &contacts[1..] {
        let same_chain = new.same_chain(current);
        if same_chain && new_index <= current_index {
            return Err(BindError::UnsortedContacts {
                previous: current_index,
                next: new_index,
            });
        }

        // Positions of different chains may be in any order
        let gap = new_index.abs_diff(current_index).saturating_sub(1);
        if !same_chain || gap > max_gap {
            if working.len() >= min_fragment_length {
                fragments.push(working);
            }
            working = vec![new];
        } else {
            if gap > 0 {
                working.extend(structure.between(current, new));
            }
            working.push(new);
        }

        current_index = new_index;
        current = new;
    }

    if working.len() >= min_fragment_length {
        fragments.push(working);
    }

    Ok(fragments)
}
