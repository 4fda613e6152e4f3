//! Finds CDR-like windows in a structure and the regions they contact.

use crate::libs::contact::{find_contacts, CONTACT_RADIUS};
use crate::libs::error::BindError;
use crate::libs::pair::{BoundPair, FragmentRecord};
use crate::libs::signal::InteractionSignal;
use crate::libs::spatial::{NeighborSearch, SpatialIndex};
use crate::libs::stitch::stitch;
use crate::libs::structure::{Atom, Residue, Structure};
use rayon::prelude::*;

#[derive(Debug, Clone)]
pub struct ScanConfig {
    pub fragment_length: usize,
    pub contact_radius: f64,
    /// Chain neighbours on each side excluded from contacts
    pub exclusion_distance: usize,
    pub max_gap: usize,
    pub min_fragment_length: usize,
}

impl Default for ScanConfig {
    fn default() -> Self {
        Self {
            fragment_length: 4,
            contact_radius: CONTACT_RADIUS,
            exclusion_distance: 1,
            max_gap: 1,
            min_fragment_length: 3,
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct ScanResult {
    /// One pair per window with every contact as target
    pub complete: Vec<BoundPair>,
    /// One pair per contiguous target fragment
    pub fragmented: Vec<BoundPair>,
}

/// Checks that the structure and the signal describe the same residues.
pub fn check_alignment<I: InteractionSignal + ?Sized>(
    structure: &Structure,
    signal: &I,
) -> Result<(), BindError> {
    let residues = structure.residues();
    if residues.len() != signal.dim() {
        return Err(BindError::SignalMismatch {
            residues: residues.len(),
            signal: signal.dim(),
        });
    }

    if let Some(codes) = signal.residue_codes() {
        for (res, &code) in residues.iter().zip(codes.iter()) {
            if res.code != code {
                return Err(BindError::ResidueCodeMismatch {
                    position: res.position,
                    structure: res.code,
                    signal: code,
                });
            }
        }
    }

    Ok(())
}

/// Scans every window of `config.fragment_length` residues flagged by
/// `signal`, using a grid index over the accepted atoms of `structure`.
pub fn scan<I>(structure: &Structure, signal: &I, config: &ScanConfig) -> Result<ScanResult, BindError>
where
    I: InteractionSignal + Sync + ?Sized,
{
    let index = NeighborSearch::new(structure.atoms(), config.contact_radius, Atom::is_accepted);
    scan_with_index(structure, signal, &index, config)
}

pub fn scan_with_index<I, S>(
    structure: &Structure,
    signal: &I,
    index: &S,
    config: &ScanConfig,
) -> Result<ScanResult, BindError>
where
    I: InteractionSignal + Sync + ?Sized,
    S: SpatialIndex + Sync + ?Sized,
{
    if config.fragment_length == 0 {
        return Err(BindError::InvalidFragmentLength(0));
    }
    check_alignment(structure, signal)?;

    let len = config.fragment_length;
    let size = signal.dim();
    let windows: Vec<usize> = if size < len {
        vec![]
    } else {
        (0..=size - len)
            .filter(|&start| signal.is_candidate(start, start + len - 1))
            .collect()
    };
    log::debug!(
        "{}: {} of {} windows are CDR-like",
        structure.id,
        windows.len(),
        (size + 1).saturating_sub(len)
    );

    let per_window = windows
        .par_iter()
        .map(|&start| find_targets(structure, index, start, config))
        .collect::<Result<Vec<_>, BindError>>()?;

    let mut result = ScanResult::default();
    for (complete, fragmented) in per_window.into_iter().flatten() {
        result.complete.push(complete);
        result.fragmented.extend(fragmented);
    }

    log::info!(
        "{}: {} bound pairs, {} fragmented",
        structure.id,
        result.complete.len(),
        result.fragmented.len()
    );

    Ok(result)
}

/// Pairs for the window starting at `start`, or `None` without contacts.
fn find_targets<S: SpatialIndex + ?Sized>(
    structure: &Structure,
    index: &S,
    start: usize,
    config: &ScanConfig,
) -> Result<Option<(BoundPair, Vec<BoundPair>)>, BindError> {
    let cdr = structure.window(start, config.fragment_length);
    let contacts = find_contacts(
        &cdr,
        structure,
        index,
        config.contact_radius,
        config.exclusion_distance,
    )?;
    if contacts.is_empty() {
        return Ok(None);
    }

    let mut sorted: Vec<(usize, &Residue)> = contacts
        .into_iter()
        .map(|position| (position, &structure.residues()[position]))
        .collect();
    sorted.sort_unstable_by_key(|&(position, _)| position);

    let cdr_record = FragmentRecord::from_residues(&structure.id, &cdr);

    let all: Vec<&Residue> = sorted.iter().map(|&(_, res)| res).collect();
    let complete = BoundPair::Positive {
        cdr: cdr_record.clone(),
        target: FragmentRecord::from_residues(&structure.id, &all),
    };

    let fragmented = stitch(
        &sorted,
        structure,
        config.max_gap,
        config.min_fragment_length,
    )?
    .into_iter()
    .map(|fragment| BoundPair::Positive {
        cdr: cdr_record.clone(),
        target: FragmentRecord::from_residues(&structure.id, &fragment),
    })
    .collect();

    Ok(Some((complete, fragmented)))
}
