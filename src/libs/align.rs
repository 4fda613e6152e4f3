use crate::libs::error::BindError;
use bio::alignment::pairwise;
use bio::scores::blosum62;

/// Similarity of two residue sequences; lower means less similar.
pub trait Aligner {
    fn score(&self, a: &str, b: &str) -> anyhow::Result<f64>;
}

/// Global alignment scored with BLOSUM62 and affine gaps.
///
/// A gap of length `k` costs `gap_open + k * gap_extend`.
#[derive(Debug, Clone, Copy)]
pub struct Blosum62Aligner {
    pub gap_open: i32,
    pub gap_extend: i32,
}

impl Default for Blosum62Aligner {
    fn default() -> Self {
        Self {
            gap_open: -5,
            gap_extend: -1,
        }
    }
}

impl Blosum62Aligner {
    pub fn new(gap_open: i32, gap_extend: i32) -> Self {
        Self {
            gap_open,
            gap_extend,
        }
    }
}

fn check_sequence(seq: &str) -> Result<&[u8], BindError> {
    let bytes = seq.as_bytes();
    if bytes.iter().all(|&b| b.is_ascii_uppercase() || b == b'*') {
        Ok(bytes)
    } else {
        Err(BindError::InvalidSequence(seq.to_string()))
    }
}

impl Aligner for Blosum62Aligner {
    fn score(&self, a: &str, b: &str) -> anyhow::Result<f64> {
        let x = check_sequence(a)?;
        let y = check_sequence(b)?;

        let mut aligner =
            pairwise::Aligner::with_capacity(x.len(), y.len(), self.gap_open, self.gap_extend, blosum62);
        let alignment = aligner.global(x, y);

        Ok(alignment.score as f64)
    }
}
