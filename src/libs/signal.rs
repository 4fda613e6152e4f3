//! Interaction signal over residue pairs.
//!
//! `M[x][y]` with `M < -1` or `M > 0` marks the window `x..=y` as resembling a
//! known binding loop; the magnitude counts how many such loops were found and
//! is not used for filtering.

use anyhow::{anyhow, bail};
use std::io::{BufRead, Read};

pub trait InteractionSignal {
    /// Number of rows, which equals the number of columns
    fn dim(&self) -> usize;

    fn value(&self, row: usize, col: usize) -> i32;

    /// One-letter codes per index, when the source lists them
    fn residue_codes(&self) -> Option<Vec<char>> {
        None
    }

    /// Whether the window `start..=end` is a CDR-like fragment
    fn is_candidate(&self, start: usize, end: usize) -> bool {
        let v = self.value(start, end);
        v > 0 || v < -1
    }
}

/// One line of the ids file: `chain pdb_index code`
#[derive(Debug, Clone, PartialEq)]
pub struct ResidueId {
    pub chain: String,
    pub pdb_index: String,
    pub code: char,
}

#[derive(Debug, Clone)]
pub struct InteractionMatrix {
    dim: usize,
    values: Vec<i32>,
    ids: Vec<ResidueId>,
}

impl InteractionMatrix {
    /// Square matrix in row-major order.
    pub fn new(dim: usize, values: Vec<i32>) -> anyhow::Result<Self> {
        if values.len() != dim * dim {
            bail!(
                "Matrix of dimension {} needs {} values, got {}",
                dim,
                dim * dim,
                values.len()
            );
        }
        Ok(Self {
            dim,
            values,
            ids: vec![],
        })
    }

    pub fn with_ids(mut self, ids: Vec<ResidueId>) -> anyhow::Result<Self> {
        if ids.len() != self.dim {
            bail!(
                "Listed {} residue ids for a matrix of dimension {}",
                ids.len(),
                self.dim
            );
        }
        self.ids = ids;
        Ok(self)
    }

    pub fn ids(&self) -> &[ResidueId] {
        &self.ids
    }

    /// Reads the ids file and the raw little-endian `i32` matrix whose
    /// dimension is the number of ids.
    pub fn from_files(ids_file: &str, matrix_file: &str) -> anyhow::Result<Self> {
        let ids = parse_ids(crate::reader(ids_file)?)?;

        let mut bytes = vec![];
        crate::reader(matrix_file)?.read_to_end(&mut bytes)?;
        let values = parse_matrix(&bytes, ids.len())?;

        Self::new(ids.len(), values)?.with_ids(ids)
    }
}

impl InteractionSignal for InteractionMatrix {
    fn dim(&self) -> usize {
        self.dim
    }

    fn value(&self, row: usize, col: usize) -> i32 {
        self.values[row * self.dim + col]
    }

    fn residue_codes(&self) -> Option<Vec<char>> {
        if self.ids.is_empty() {
            None
        } else {
            Some(self.ids.iter().map(|id| id.code).collect())
        }
    }
}

pub fn parse_ids<R: BufRead>(reader: R) -> anyhow::Result<Vec<ResidueId>> {
    let mut ids = vec![];
    for (i, line) in reader.lines().enumerate() {
        let line = line?;
        if line.trim().is_empty() {
            continue;
        }
        let fields: Vec<&str> = line.split_whitespace().collect();
        if fields.len() < 3 {
            bail!("Line {} of the ids file has {} fields: {}", i + 1, fields.len(), line);
        }
        let code = fields[2]
            .chars()
            .next()
            .ok_or_else(|| anyhow!("Empty residue code at line {}", i + 1))?;
        ids.push(ResidueId {
            chain: fields[0].to_string(),
            pdb_index: fields[1].to_string(),
            code,
        });
    }
    Ok(ids)
}

pub fn parse_matrix(bytes: &[u8], dim: usize) -> anyhow::Result<Vec<i32>> {
    if bytes.len() != dim * dim * 4 {
        bail!(
            "Matrix file holds {} bytes, expected {} for {} residues",
            bytes.len(),
            dim * dim * 4,
            dim
        );
    }
    Ok(bytes
        .chunks_exact(4)
        .map(|b| i32::from_le_bytes([b[0], b[1], b[2], b[3]]))
        .collect())
}
