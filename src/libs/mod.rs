pub mod align;
pub mod contact;
pub mod error;
pub mod io;
pub mod negative;
pub mod pair;
pub mod pdb;
pub mod scan;
pub mod signal;
pub mod spatial;
pub mod stitch;
pub mod structure;
pub mod superpose;
