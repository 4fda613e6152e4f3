//! In-memory model of a parsed structure.
//!
//! Residues are stored in the order the structure source reports them, and
//! that order is the index space shared with the interaction signal. A residue's
//! `position` is its zero-based index in [`Structure::residues`]; lists of
//! positions are the addresses persisted in datasets.

use crate::libs::error::BindError;
use lazy_static::lazy_static;
use std::collections::HashMap;
use std::ops::Range;

lazy_static! {
    static ref THREE_TO_ONE: HashMap<&'static str, char> = {
        let pairs = [
            ("ALA", 'A'),
            ("ARG", 'R'),
            ("ASN", 'N'),
            ("ASP", 'D'),
            ("CYS", 'C'),
            ("GLN", 'Q'),
            ("GLU", 'E'),
            ("GLY", 'G'),
            ("HIS", 'H'),
            ("ILE", 'I'),
            ("LEU", 'L'),
            ("LYS", 'K'),
            ("MET", 'M'),
            ("PHE", 'F'),
            ("PRO", 'P'),
            ("SER", 'S'),
            ("THR", 'T'),
            ("TRP", 'W'),
            ("TYR", 'Y'),
            ("VAL", 'V'),
        ];
        pairs.into_iter().collect()
    };
}

/// One-letter amino-acid code of a residue name, `X` when unknown.
///
/// ```
/// assert_eq!(pepbind::libs::structure::one_letter("TRP"), 'W');
/// assert_eq!(pepbind::libs::structure::one_letter("hoh"), 'X');
/// ```
pub fn one_letter(name: &str) -> char {
    THREE_TO_ONE
        .get(name.trim().to_ascii_uppercase().as_str())
        .copied()
        .unwrap_or('X')
}

#[derive(Debug, Clone, PartialEq)]
pub struct Atom {
    pub serial: usize,
    pub name: String,
    pub element: String,
    pub alt_loc: Option<char>,
    pub coord: [f64; 3],
    /// Position of the parent residue
    pub residue: usize,
}

impl Atom {
    /// An atom is disordered when it was recorded with an alternate location.
    pub fn is_disordered(&self) -> bool {
        self.alt_loc.is_some()
    }

    pub fn alt_location(&self) -> Option<char> {
        self.alt_loc
    }

    pub fn coordinates(&self) -> [f64; 3] {
        self.coord
    }

    /// Ordered atoms, and the primary location `A` of disordered ones.
    pub fn is_accepted(&self) -> bool {
        !self.is_disordered() || self.alt_loc == Some('A')
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Residue {
    pub position: usize,
    pub chain: String,
    /// Index of the chain run this residue belongs to
    pub chain_index: usize,
    /// Index within its own chain
    pub chain_position: usize,
    pub serial: isize,
    pub insertion: Option<String>,
    pub name: String,
    pub code: char,
    pub atoms: Range<usize>,
}

impl Residue {
    pub fn same_chain(&self, other: &Residue) -> bool {
        self.chain_index == other.chain_index
    }
}

/// A contiguous run of residues within one chain, borrowed from its structure.
pub type Fragment<'a> = Vec<&'a Residue>;

#[derive(Debug, Clone, Default)]
pub struct Structure {
    pub id: String,
    residues: Vec<Residue>,
    atoms: Vec<Atom>,
    /// Residue position ranges, one per chain run
    chains: Vec<Range<usize>>,
}

impl Structure {
    pub fn residues(&self) -> &[Residue] {
        &self.residues
    }

    pub fn atoms(&self) -> &[Atom] {
        &self.atoms
    }

    pub fn residue(&self, position: usize) -> Option<&Residue> {
        self.residues.get(position)
    }

    pub fn residue_atoms(&self, residue: &Residue) -> &[Atom] {
        &self.atoms[residue.atoms.clone()]
    }

    pub fn chain_count(&self) -> usize {
        self.chains.len()
    }

    /// Residues of the same chain whose chain-local index lies within
    /// `distance` of `residue`, the residue itself included.
    pub fn chain_neighbors(&self, residue: &Residue, distance: usize) -> &[Residue] {
        let chain = &self.chains[residue.chain_index];
        let start = residue.position.saturating_sub(distance).max(chain.start);
        let end = (residue.position + distance + 1).min(chain.end);
        &self.residues[start..end]
    }

    /// Residues strictly between two residues of the same chain.
    pub fn between(&self, first: &Residue, last: &Residue) -> &[Residue] {
        if !first.same_chain(last) || last.position <= first.position + 1 {
            return &[];
        }
        &self.residues[first.position + 1..last.position]
    }

    pub fn window(&self, start: usize, len: usize) -> Fragment<'_> {
        self.residues[start..start + len].iter().collect()
    }

    /// Serializes a fragment as the list of its residue positions.
    pub fn address(fragment: &[&Residue]) -> Vec<usize> {
        fragment.iter().map(|res| res.position).collect()
    }

    /// Rebuilds a fragment from positions produced by [`Structure::address`].
    pub fn reconstruct(&self, positions: &[usize]) -> Result<Fragment<'_>, BindError> {
        positions
            .iter()
            .map(|&position| {
                self.residues
                    .get(position)
                    .ok_or(BindError::PositionOutOfRange {
                        position,
                        len: self.residues.len(),
                    })
            })
            .collect()
    }

    pub fn sequence(fragment: &[&Residue]) -> String {
        fragment.iter().map(|res| res.code).collect()
    }
}

/// Builds a [`Structure`] residue by residue; atoms attach to the last residue.
///
/// ```
/// use pepbind::libs::structure::StructureBuilder;
///
/// let mut builder = StructureBuilder::new("1abc");
/// builder.residue("A", 1, None, "GLY");
/// builder.atom(1, "CA", "C", None, [0.0, 0.0, 0.0]);
/// builder.residue("A", 2, None, "TRP");
/// builder.atom(2, "CA", "C", None, [3.8, 0.0, 0.0]);
/// let structure = builder.build();
///
/// assert_eq!(structure.residues().len(), 2);
/// assert_eq!(structure.residues()[1].code, 'W');
/// ```
#[derive(Debug, Default)]
pub struct StructureBuilder {
    structure: Structure,
}

impl StructureBuilder {
    pub fn new(id: &str) -> Self {
        Self {
            structure: Structure {
                id: id.to_string(),
                ..Default::default()
            },
        }
    }

    /// Appends a residue and returns its position. A chain id that differs
    /// from the previous residue's opens a new chain run.
    pub fn residue(
        &mut self,
        chain: &str,
        serial: isize,
        insertion: Option<&str>,
        name: &str,
    ) -> usize {
        let s = &mut self.structure;
        let position = s.residues.len();

        let new_chain = match s.residues.last() {
            Some(prev) => prev.chain != chain,
            None => true,
        };
        if new_chain {
            s.chains.push(position..position);
        }
        let chain_index = s.chains.len() - 1;
        let chain_range = &mut s.chains[chain_index];
        let chain_position = position - chain_range.start;
        chain_range.end = position + 1;

        let atom_start = s.atoms.len();
        s.residues.push(Residue {
            position,
            chain: chain.to_string(),
            chain_index,
            chain_position,
            serial,
            insertion: insertion.map(|e| e.to_string()),
            name: name.to_string(),
            code: one_letter(name),
            atoms: atom_start..atom_start,
        });

        position
    }

    /// Appends an atom to the last residue.
    ///
    /// # Panics
    ///
    /// Panics when no residue has been added yet.
    pub fn atom(
        &mut self,
        serial: usize,
        name: &str,
        element: &str,
        alt_loc: Option<char>,
        coord: [f64; 3],
    ) {
        let s = &mut self.structure;
        let residue = s
            .residues
            .last_mut()
            .expect("atoms must be added after their residue");
        s.atoms.push(Atom {
            serial,
            name: name.to_string(),
            element: element.to_string(),
            alt_loc,
            coord,
            residue: residue.position,
        });
        residue.atoms.end = s.atoms.len();
    }

    pub fn build(self) -> Structure {
        self.structure
    }
}
