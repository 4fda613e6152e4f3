use clap::*;
use pepbind::libs::pair::write_pairs;
use pepbind::libs::pdb::{id_from_path, load_structure};
use pepbind::libs::scan::{scan, ScanConfig};
use pepbind::libs::signal::InteractionMatrix;
use std::io::Write;

// Create clap subcommand arguments
pub fn make_subcommand() -> Command {
    Command::new("scan")
        .about("Finds bound pairs in one structure")
        .after_help(
            r###"
Scans every window of --len residues. A window is CDR-like when its entry in
the interaction matrix, row = first residue and column = last residue, is
above 0 or below -1. Residues of the structure with an accepted atom within
--radius Å of an accepted atom of the window are its target, except the
window itself and its chain neighbours.

Inputs:
* <structure>: PDB or mmCIF file, optionally gzipped. Only the first model is used.
* <ids>: one line per residue: `chain pdb_index code`
* <matrix>: raw little-endian i32 values, n x n for n ids

Outputs:
* --outfile: one row per window with all contacts as the target
* --fragmented: one row per contiguous target fragment. Gaps of up to
  --max-gap residues are filled, fragments shorter than --min-len are dropped

Examples:
1. Scan with default settings:
   pepbind scan 5waq.pdb 5waq.ids 5waq.bmat -o 5waq.tsv

2. Also write fragmented targets:
   pepbind scan 5waq.pdb 5waq.ids 5waq.bmat -o 5waq.tsv --fragmented 5waq.frag.tsv

"###,
        )
        .arg(
            Arg::new("structure")
                .required(true)
                .index(1)
                .help("Structure file"),
        )
        .arg(
            Arg::new("ids")
                .required(true)
                .index(2)
                .help("Residue ids of the interaction matrix"),
        )
        .arg(
            Arg::new("matrix")
                .required(true)
                .index(3)
                .help("Binary interaction matrix"),
        )
        .arg(
            Arg::new("pdb_id")
                .long("pdb-id")
                .num_args(1)
                .help("Structure id written to the rows. Defaults to the file name"),
        )
        .arg(
            Arg::new("len")
                .long("len")
                .short('l')
                .value_parser(value_parser!(usize))
                .default_value("4")
                .help("CDR window length"),
        )
        .arg(
            Arg::new("radius")
                .long("radius")
                .value_parser(value_parser!(f64))
                .default_value("3.5")
                .help("Contact distance in Å"),
        )
        .arg(
            Arg::new("exclusion")
                .long("exclusion")
                .value_parser(value_parser!(usize))
                .default_value("1")
                .help("Chain neighbours on each side of the window never counted as contacts"),
        )
        .arg(
            Arg::new("max_gap")
                .long("max-gap")
                .value_parser(value_parser!(usize))
                .default_value("1")
                .help("Largest gap filled within a target fragment"),
        )
        .arg(
            Arg::new("min_len")
                .long("min-len")
                .value_parser(value_parser!(usize))
                .default_value("3")
                .help("Shortest target fragment kept"),
        )
        .arg(
            Arg::new("fragmented")
                .long("fragmented")
                .num_args(1)
                .help("Output filename for fragmented targets"),
        )
        .arg(
            Arg::new("outfile")
                .long("outfile")
                .short('o')
                .num_args(1)
                .default_value("stdout")
                .help("Output filename. [stdout] for screen"),
        )
}

// command implementation
pub fn execute(args: &ArgMatches) -> anyhow::Result<()> {
    let structure_file = args.get_one::<String>("structure").unwrap();
    let ids_file = args.get_one::<String>("ids").unwrap();
    let matrix_file = args.get_one::<String>("matrix").unwrap();
    let pdb_id = match args.get_one::<String>("pdb_id") {
        Some(id) => id.to_string(),
        None => id_from_path(structure_file),
    };

    let config = ScanConfig {
        fragment_length: *args.get_one::<usize>("len").unwrap(),
        contact_radius: *args.get_one::<f64>("radius").unwrap(),
        exclusion_distance: *args.get_one::<usize>("exclusion").unwrap(),
        max_gap: *args.get_one::<usize>("max_gap").unwrap(),
        min_fragment_length: *args.get_one::<usize>("min_len").unwrap(),
    };
    if config.contact_radius <= 0.0 {
        anyhow::bail!("--radius must be positive");
    }

    //----------------------------
    // Loading
    //----------------------------
    let structure = load_structure(structure_file, &pdb_id)?;
    let matrix = InteractionMatrix::from_files(ids_file, matrix_file)?;

    //----------------------------
    // Scanning
    //----------------------------
    let result = scan(&structure, &matrix, &config)?;

    //----------------------------
    // Output
    //----------------------------
    let mut writer = pepbind::writer(args.get_one::<String>("outfile").unwrap())?;
    write_pairs(&mut writer, &result.complete)?;
    writer.flush()?;

    if let Some(fragmented) = args.get_one::<String>("fragmented") {
        let mut writer = pepbind::writer(fragmented)?;
        write_pairs(&mut writer, &result.fragmented)?;
        writer.flush()?;
    }

    Ok(())
}
