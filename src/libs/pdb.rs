//! Reads PDB and mmCIF files into a [`Structure`].

use crate::libs::structure::{Structure, StructureBuilder};
use anyhow::{anyhow, bail};
use fxhash::FxHashSet;
use lru::LruCache;
use pdbtbx::{Format, ReadOptions};
use std::io::Read;
use std::num::NonZeroUsize;
use std::path::{Path, PathBuf};
use std::rc::Rc;

/// Extensions tried, in order, when looking up a structure by id
pub const EXTENSIONS: [&str; 4] = ["pdb", "pdb.gz", "cif", "cif.gz"];

/// `.cif` and `.mmcif` are mmCIF, anything else is PDB. A trailing `.gz` is
/// ignored.
pub fn guess_format(path: &str) -> Format {
    let name = path.strip_suffix(".gz").unwrap_or(path).to_ascii_lowercase();
    match Path::new(&name).extension().and_then(|e| e.to_str()) {
        Some("cif") | Some("mmcif") => Format::Mmcif,
        _ => Format::Pdb,
    }
}

/// Structure id from a file name: `dir/5waq.pdb.gz` gives `5waq`.
pub fn id_from_path(path: &str) -> String {
    let name = Path::new(path)
        .file_name()
        .and_then(|n| n.to_str())
        .unwrap_or(path);
    name.split('.').next().unwrap_or(name).to_string()
}

/// Loads the first model of a structure file.
pub fn load_structure(path: &str, id: &str) -> anyhow::Result<Structure> {
    let mut content = String::new();
    crate::reader(path)?.read_to_string(&mut content)?;
    parse_structure(&content, id, guess_format(path))
}

pub fn parse_structure(content: &str, id: &str, format: Format) -> anyhow::Result<Structure> {
    let (pdb, errors) = ReadOptions::default()
        .set_level(pdbtbx::StrictnessLevel::Loose)
        .set_format(format)
        .read_raw(std::io::BufReader::new(std::io::Cursor::new(
            content.as_bytes(),
        )))
        .map_err(|e| anyhow!("Failed to parse {}: {:?}", id, e))?;

    if !errors.is_empty() {
        log::debug!("{}: {} warnings while parsing", id, errors.len());
    }

    let model = match pdb.models().next() {
        Some(model) => model,
        None => bail!("{} contains no model", id),
    };
    if pdb.model_count() > 1 {
        log::debug!("{}: using the first of {} models", id, pdb.model_count());
    }

    let mut builder = StructureBuilder::new(id);
    for chain in model.chains() {
        for residue in chain.residues() {
            let name = residue.name().unwrap_or("UNK");
            builder.residue(
                chain.id(),
                residue.serial_number(),
                residue.insertion_code(),
                name,
            );

            // Atoms shared by all conformers are listed once
            let mut seen = FxHashSet::default();
            for conformer in residue.conformers() {
                let alt_loc = conformer
                    .alternative_location()
                    .and_then(|a| a.chars().next());
                for atom in conformer.atoms() {
                    if !seen.insert((atom.serial_number(), alt_loc)) {
                        continue;
                    }
                    let (x, y, z) = atom.pos();
                    builder.atom(
                        atom.serial_number(),
                        atom.name(),
                        atom.element().map(|e| e.symbol()).unwrap_or("?"),
                        alt_loc,
                        [x, y, z],
                    );
                }
            }
        }
    }

    let structure = builder.build();
    log::debug!(
        "{}: {} chains, {} residues, {} atoms",
        id,
        structure.chain_count(),
        structure.residues().len(),
        structure.atoms().len()
    );
    Ok(structure)
}

/// Structures of a directory by id, keeping the most recently used ones in
/// memory.
pub struct StructureCache {
    dir: PathBuf,
    cache: LruCache<String, Rc<Structure>>,
}

impl StructureCache {
    pub fn new<P: AsRef<Path>>(dir: P, capacity: usize) -> Self {
        let capacity = NonZeroUsize::new(capacity).unwrap_or(NonZeroUsize::MIN);
        Self {
            dir: dir.as_ref().to_path_buf(),
            cache: LruCache::new(capacity),
        }
    }

    /// First existing `{dir}/{id}.{ext}`, also trying the lowercased id.
    pub fn locate(&self, id: &str) -> Option<PathBuf> {
        let lower = id.to_ascii_lowercase();
        [id, lower.as_str()]
            .iter()
            .flat_map(|name| {
                EXTENSIONS
                    .iter()
                    .map(move |ext| self.dir.join(format!("{}.{}", name, ext)))
            })
            .find(|path| path.is_file())
    }

    pub fn get(&mut self, id: &str) -> anyhow::Result<Rc<Structure>> {
        if let Some(structure) = self.cache.get(id) {
            return Ok(Rc::clone(structure));
        }

        let path = self
            .locate(id)
            .ok_or_else(|| anyhow!("No structure file for {} in {}", id, self.dir.display()))?;
        log::debug!("Loading {}", path.display());
        let structure = Rc::new(load_structure(&path.to_string_lossy(), id)?);
        self.cache.put(id.to_string(), Rc::clone(&structure));
        Ok(structure)
    }

    pub fn len(&self) -> usize {
        self.cache.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cache.is_empty()
    }
}
