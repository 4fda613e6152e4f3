//! Bound pairs and their tab-separated dataset form.

use crate::libs::structure::{Residue, Structure};
use anyhow::{anyhow, bail, Context};
use std::io::{BufRead, Write};

pub const HEADER: [&str; 12] = [
    "cdr_resnames",
    "cdr_bp_id_str",
    "cdr_pdb_id",
    "target_length",
    "target_resnames",
    "target_bp_id_str",
    "target_pdb_id",
    "binding_observed",
    "similarity_score",
    "original_cdr_resnames",
    "original_cdr_bp_id_str",
    "original_cdr_pdb_id",
];

/// A fragment as persisted: its sequence, its source structure and the
/// positions of its residues in that structure.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct FragmentRecord {
    pub pdb_id: String,
    pub resnames: String,
    pub positions: Vec<usize>,
}

impl FragmentRecord {
    pub fn from_residues(pdb_id: &str, residues: &[&Residue]) -> Self {
        Self {
            pdb_id: pdb_id.to_string(),
            resnames: Structure::sequence(residues),
            positions: Structure::address(residues),
        }
    }

    pub fn len(&self) -> usize {
        self.positions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.positions.is_empty()
    }

    /// Address string, e.g. `[12, 13, 14]`
    pub fn id_str(&self) -> String {
        serde_json::to_string(&self.positions).unwrap_or_default()
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum BoundPair {
    /// Observed in a structure
    Positive {
        cdr: FragmentRecord,
        target: FragmentRecord,
    },
    /// The CDR of a positive replaced by another positive's CDR
    Negative {
        cdr: FragmentRecord,
        target: FragmentRecord,
        original_cdr: FragmentRecord,
        similarity_score: f64,
    },
}

impl BoundPair {
    pub fn cdr(&self) -> &FragmentRecord {
        match self {
            BoundPair::Positive { cdr, .. } | BoundPair::Negative { cdr, .. } => cdr,
        }
    }

    pub fn target(&self) -> &FragmentRecord {
        match self {
            BoundPair::Positive { target, .. } | BoundPair::Negative { target, .. } => target,
        }
    }

    pub fn binding_observed(&self) -> bool {
        matches!(self, BoundPair::Positive { .. })
    }

    pub fn similarity_score(&self) -> Option<f64> {
        match self {
            BoundPair::Positive { .. } => None,
            BoundPair::Negative {
                similarity_score, ..
            } => Some(*similarity_score),
        }
    }

    pub fn original_cdr(&self) -> Option<&FragmentRecord> {
        match self {
            BoundPair::Positive { .. } => None,
            BoundPair::Negative { original_cdr, .. } => Some(original_cdr),
        }
    }

    /// Sequence key used for deduplication
    pub fn key(&self) -> (String, String) {
        (self.cdr().resnames.clone(), self.target().resnames.clone())
    }

    pub fn to_line(&self) -> String {
        let cdr = self.cdr();
        let target = self.target();
        let (score, original) = match self {
            BoundPair::Positive { .. } => (String::new(), ["".to_string(), "".into(), "".into()]),
            BoundPair::Negative {
                original_cdr,
                similarity_score,
                ..
            } => (
                similarity_score.to_string(),
                [
                    original_cdr.resnames.clone(),
                    original_cdr.id_str(),
                    original_cdr.pdb_id.clone(),
                ],
            ),
        };

        [
            cdr.resnames.clone(),
            cdr.id_str(),
            cdr.pdb_id.clone(),
            target.len().to_string(),
            target.resnames.clone(),
            target.id_str(),
            target.pdb_id.clone(),
            (self.binding_observed() as u8).to_string(),
            score,
            original[0].clone(),
            original[1].clone(),
            original[2].clone(),
        ]
        .join("\t")
    }

    pub fn from_line(line: &str) -> anyhow::Result<Self> {
        let fields: Vec<&str> = line.split('\t').collect();
        if fields.len() < HEADER.len() {
            bail!(
                "Expected {} columns, found {}: {}",
                HEADER.len(),
                fields.len(),
                line
            );
        }

        let cdr = parse_record(fields[0], fields[1], fields[2])?;
        let target = parse_record(fields[4], fields[5], fields[6])?;

        match fields[7] {
            "1" => Ok(BoundPair::Positive { cdr, target }),
            "0" => {
                let similarity_score = fields[8]
                    .parse::<f64>()
                    .with_context(|| format!("Negative without a similarity score: {}", line))?;
                let original_cdr = parse_record(fields[9], fields[10], fields[11])?;
                Ok(BoundPair::Negative {
                    cdr,
                    target,
                    original_cdr,
                    similarity_score,
                })
            }
            other => Err(anyhow!("binding_observed must be 0 or 1, got '{}'", other)),
        }
    }
}

fn parse_record(resnames: &str, id_str: &str, pdb_id: &str) -> anyhow::Result<FragmentRecord> {
    let positions: Vec<usize> = serde_json::from_str(id_str)
        .with_context(|| format!("Invalid residue address '{}'", id_str))?;
    if positions.len() != resnames.chars().count() {
        bail!(
            "Address {} does not match sequence '{}'",
            id_str,
            resnames
        );
    }
    Ok(FragmentRecord {
        pdb_id: pdb_id.to_string(),
        resnames: resnames.to_string(),
        positions,
    })
}

pub fn write_pairs<W: Write + ?Sized>(writer: &mut W, pairs: &[BoundPair]) -> anyhow::Result<()> {
    writeln!(writer, "{}", HEADER.join("\t"))?;
    for pair in pairs {
        writeln!(writer, "{}", pair.to_line())?;
    }
    Ok(())
}

/// Reads a dataset; the first line must be the header.
pub fn read_pairs<R: BufRead>(reader: R) -> anyhow::Result<Vec<BoundPair>> {
    let mut pairs = vec![];
    let mut lines = reader.lines();

    match lines.next() {
        Some(header) => {
            let header = header?;
            if !header.starts_with(HEADER[0]) {
                bail!("Missing header line, found: {}", header);
            }
        }
        None => return Ok(pairs),
    }

    for (i, line) in lines.enumerate() {
        let line = line?;
        if line.trim().is_empty() {
            continue;
        }
        let pair = BoundPair::from_line(&line).with_context(|| format!("Line {}", i + 2))?;
        pairs.push(pair);
    }

    Ok(pairs)
}
