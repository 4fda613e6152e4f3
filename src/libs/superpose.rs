//! Bound pairs as PDB files.
//!
//! The CDR is written as chain `C` and the target as chain `T`. For a
//! negative, the donated CDR is first moved onto the original CDR by a
//! least-squares fit of their Cα atoms.

use crate::libs::pair::{BoundPair, FragmentRecord};
use crate::libs::pdb::StructureCache;
use crate::libs::structure::{Atom, Fragment, Residue, Structure};
use anyhow::{anyhow, bail};
use nalgebra::{Matrix3, Vector3};
use std::fmt::Write as _;

/// Rigid transform minimizing the RMSD of `moving` onto `fixed`
#[derive(Debug, Clone)]
pub struct Superposition {
    rotation: Matrix3<f64>,
    fixed_centroid: Vector3<f64>,
    moving_centroid: Vector3<f64>,
    pub rmsd: f64,
}

fn centroid(points: &[Vector3<f64>]) -> Vector3<f64> {
    points.iter().sum::<Vector3<f64>>() / points.len() as f64
}

impl Superposition {
    /// Kabsch fit of paired points.
    pub fn fit(fixed: &[[f64; 3]], moving: &[[f64; 3]]) -> anyhow::Result<Self> {
        if fixed.len() != moving.len() {
            bail!(
                "Cannot superimpose {} points onto {}",
                moving.len(),
                fixed.len()
            );
        }
        if fixed.is_empty() {
            bail!("Cannot superimpose empty point sets");
        }

        let p: Vec<Vector3<f64>> = moving.iter().map(|&c| Vector3::from(c)).collect();
        let q: Vec<Vector3<f64>> = fixed.iter().map(|&c| Vector3::from(c)).collect();
        let moving_centroid = centroid(&p);
        let fixed_centroid = centroid(&q);

        // covariance of the centered sets
        let mut h = Matrix3::zeros();
        for (a, b) in p.iter().zip(q.iter()) {
            h += (a - moving_centroid) * (b - fixed_centroid).transpose();
        }

        let svd = h.svd(true, true);
        let u = svd.u.ok_or_else(|| anyhow!("SVD failed"))?;
        let v_t = svd.v_t.ok_or_else(|| anyhow!("SVD failed"))?;
        let v = v_t.transpose();

        // no reflections
        let d = (v * u.transpose()).determinant().signum();
        let correction = Matrix3::from_diagonal(&Vector3::new(1.0, 1.0, d));
        let rotation = v * correction * u.transpose();

        let mut superposition = Self {
            rotation,
            fixed_centroid,
            moving_centroid,
            rmsd: 0.0,
        };

        let sum_sq: f64 = moving
            .iter()
            .zip(fixed.iter())
            .map(|(&m, &f)| (Vector3::from(superposition.apply(m)) - Vector3::from(f)).norm_squared())
            .sum();
        superposition.rmsd = (sum_sq / fixed.len() as f64).sqrt();

        Ok(superposition)
    }

    pub fn apply(&self, point: [f64; 3]) -> [f64; 3] {
        let moved = self.rotation * (Vector3::from(point) - self.moving_centroid) + self.fixed_centroid;
        [moved.x, moved.y, moved.z]
    }
}

/// Residues of a record, checked against its sequence.
pub fn fragment_of<'a>(
    record: &FragmentRecord,
    structure: &'a Structure,
) -> anyhow::Result<Fragment<'a>> {
    let fragment = structure.reconstruct(&record.positions)?;
    let sequence = Structure::sequence(&fragment);
    if sequence != record.resnames {
        bail!(
            "{} at {} reads {}, expected {}",
            structure.id,
            record.id_str(),
            sequence,
            record.resnames
        );
    }
    Ok(fragment)
}

fn alpha_carbons(fragment: &[&Residue], structure: &Structure) -> anyhow::Result<Vec<[f64; 3]>> {
    fragment
        .iter()
        .map(|res| {
            structure
                .residue_atoms(res)
                .iter()
                .find(|a| a.name == "CA" && a.is_accepted())
                .map(Atom::coordinates)
                .ok_or_else(|| {
                    anyhow!(
                        "{}: residue {}{} has no CA atom",
                        structure.id,
                        res.chain,
                        res.serial
                    )
                })
        })
        .collect()
}

/// Atom name in columns 13-16, where one-letter elements start at column 14
fn pdb_atom_name(atom: &Atom) -> String {
    if atom.name.len() < 4 && atom.element.len() <= 1 {
        format!(" {:<3}", atom.name)
    } else {
        format!("{:<4}", atom.name)
    }
}

/// Writes a chain of residues as ATOM records followed by TER.
fn write_chain<F>(
    out: &mut String,
    serial: &mut usize,
    chain: char,
    fragment: &[&Residue],
    structure: &Structure,
    transform: F,
) where
    F: Fn([f64; 3]) -> [f64; 3],
{
    let mut last = None;
    for res in fragment {
        let insertion = res
            .insertion
            .as_deref()
            .and_then(|i| i.chars().next())
            .unwrap_or(' ');
        for atom in structure.residue_atoms(res).iter().filter(|a| a.is_accepted()) {
            let [x, y, z] = transform(atom.coordinates());
            let _ = writeln!(
                out,
                "ATOM  {:>5} {}{}{:>3} {}{:>4}{}   {:>8.3}{:>8.3}{:>8.3}{:>6.2}{:>6.2}          {:>2}",
                *serial % 100_000,
                pdb_atom_name(atom),
                atom.alt_location().unwrap_or(' '),
                res.name,
                chain,
                res.serial,
                insertion,
                x,
                y,
                z,
                1.0,
                0.0,
                atom.element
            );
            *serial += 1;
        }
        last = Some((res, insertion));
    }
    if let Some((res, insertion)) = last {
        let _ = writeln!(
            out,
            "TER   {:>5}      {:>3} {}{:>4}{}",
            *serial % 100_000,
            res.name,
            chain,
            res.serial,
            insertion
        );
        *serial += 1;
    }
}

/// PDB text of a bound pair, with structures taken from `cache`.
pub fn pair_to_pdb(pair: &BoundPair, cache: &mut StructureCache) -> anyhow::Result<String> {
    let cdr_structure = cache.get(&pair.cdr().pdb_id)?;
    let target_structure = cache.get(&pair.target().pdb_id)?;
    let cdr = fragment_of(pair.cdr(), &cdr_structure)?;
    let target = fragment_of(pair.target(), &target_structure)?;

    let superposition = match pair {
        BoundPair::Positive { .. } => None,
        BoundPair::Negative { original_cdr, .. } => {
            let original_structure = cache.get(&original_cdr.pdb_id)?;
            let original = fragment_of(original_cdr, &original_structure)?;
            let fixed = alpha_carbons(&original, &original_structure)?;
            let moving = alpha_carbons(&cdr, &cdr_structure)?;
            let sup = Superposition::fit(&fixed, &moving)?;
            log::debug!(
                "{} onto {}: RMSD {:.3}",
                pair.cdr().resnames,
                original_cdr.resnames,
                sup.rmsd
            );
            Some(sup)
        }
    };

    let mut out = String::new();
    let mut serial = 1;
    write_chain(&mut out, &mut serial, 'C', &cdr, &cdr_structure, |p| {
        match &superposition {
            Some(sup) => sup.apply(p),
            None => p,
        }
    });
    write_chain(&mut out, &mut serial, 'T', &target, &target_structure, |p| p);
    out.push_str("END\n");

    Ok(out)
}

/// File name of the `row`-th pair of a dataset
pub fn pair_filename(row: usize, pair: &BoundPair) -> String {
    format!(
        "{:05}_{}_{}_{}.pdb",
        row,
        if pair.binding_observed() { "pos" } else { "neg" },
        pair.cdr().pdb_id,
        pair.target().pdb_id
    )
}
