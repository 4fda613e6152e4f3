use std::fmt;

/// Contract and precondition failures raised by the scanning and sampling code.
///
/// Data-quality rejections (duplicate proposals, too-similar negatives) are not
/// errors and never show up here.
#[derive(Debug, Clone, PartialEq)]
pub enum BindError {
    /// A fragment that must contain at least one residue was empty
    EmptyFragment,
    /// Contacts of one chain were not sorted by structure position
    UnsortedContacts {
        previous: usize,
        next: usize,
    },
    /// The structure and the interaction signal disagree on the residue count
    SignalMismatch {
        residues: usize,
        signal: usize,
    },
    /// The one-letter code listed by the signal differs from the structure's
    ResidueCodeMismatch {
        position: usize,
        structure: char,
        signal: char,
    },
    InvalidFragmentLength(usize),
    /// A residue address points outside the structure
    PositionOutOfRange {
        position: usize,
        len: usize,
    },
    /// Negatives were requested from an empty positive set
    EmptyPositives,
    /// The round budget ran out before enough negatives were accepted
    NonConvergence {
        accepted: usize,
        target: usize,
        rounds: usize,
    },
    /// A sequence holds characters the aligner cannot score
    InvalidSequence(String),
}

impl fmt::Display for BindError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BindError::EmptyFragment => write!(f, "Fragment must contain at least one residue"),
            BindError::UnsortedContacts { previous, next } => write!(
                f,
                "Contacts must be sorted by position within a chain: {} followed by {}",
                previous, next
            ),
            BindError::SignalMismatch { residues, signal } => write!(
                f,
                "Structure has {} residues but the interaction signal has dimension {}",
                residues, signal
            ),
            BindError::ResidueCodeMismatch {
                position,
                structure,
                signal,
            } => write!(
                f,
                "Residue {} is '{}' in the structure but '{}' in the interaction signal",
                position, structure, signal
            ),
            BindError::InvalidFragmentLength(len) => {
                write!(f, "Fragment length must be positive, got {}", len)
            }
            BindError::PositionOutOfRange { position, len } => write!(
                f,
                "Residue position {} is out of range for a structure with {} residues",
                position, len
            ),
            BindError::EmptyPositives => {
                write!(f, "Cannot generate negatives from an empty set of positives")
            }
            BindError::NonConvergence {
                accepted,
                target,
                rounds,
            } => write!(
                f,
                "Stopped after {} rounds with {} of {} negatives accepted",
                rounds, accepted, target
            ),
            BindError::InvalidSequence(seq) => write!(f, "Cannot align sequence \"{}\"", seq),
        }
    }
}

impl std::error::Error for BindError {}
