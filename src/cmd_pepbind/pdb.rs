use clap::*;
use pepbind::libs::pair::read_pairs;
use pepbind::libs::pdb::StructureCache;
use pepbind::libs::superpose::{pair_filename, pair_to_pdb};
use std::io::Write;
use std::path::Path;

// Create clap subcommand arguments
pub fn make_subcommand() -> Command {
    Command::new("pdb")
        .about("Writes each bound pair as a PDB file")
        .after_help(
            r###"
Each row becomes one PDB file with the CDR as chain C and the target as
chain T. For a negative, the CDR is first superimposed onto the original CDR
by a least-squares fit of the Cα atoms, so it sits where the original CDR
bound the target.

Structures are looked up in --pdb-dir as <id>.pdb, <id>.pdb.gz, <id>.cif or
<id>.cif.gz.

Files are named <row>_<pos|neg>_<cdr id>_<target id>.pdb.

Examples:
1. Write all pairs and list the files:
   pepbind pdb combined.tsv --pdb-dir pdbs/ --outdir pairs/ --filenames-out pairs.lst

"###,
        )
        .arg(
            Arg::new("infile")
                .required(true)
                .index(1)
                .help("Bound pairs"),
        )
        .arg(
            Arg::new("pdb_dir")
                .long("pdb-dir")
                .required(true)
                .num_args(1)
                .help("Directory of structure files"),
        )
        .arg(
            Arg::new("outdir")
                .long("outdir")
                .num_args(1)
                .default_value(".")
                .help("Output directory"),
        )
        .arg(
            Arg::new("cache")
                .long("cache")
                .value_parser(value_parser!(usize))
                .default_value("64")
                .help("Structures kept in memory"),
        )
        .arg(
            Arg::new("filenames_out")
                .long("filenames-out")
                .num_args(1)
                .help("Write the names of all written files to this file"),
        )
}

// command implementation
pub fn execute(args: &ArgMatches) -> anyhow::Result<()> {
    let infile = args.get_one::<String>("infile").unwrap();
    let pdb_dir = args.get_one::<String>("pdb_dir").unwrap();
    let outdir = Path::new(args.get_one::<String>("outdir").unwrap());
    let capacity = *args.get_one::<usize>("cache").unwrap();

    let pairs = read_pairs(pepbind::reader(infile)?)?;
    std::fs::create_dir_all(outdir)?;

    let mut cache = StructureCache::new(pdb_dir, capacity);
    let mut filenames = vec![];
    for (row, pair) in pairs.iter().enumerate() {
        let text = pair_to_pdb(pair, &mut cache)?;
        let filename = outdir.join(pair_filename(row, pair));
        std::fs::write(&filename, text)?;
        filenames.push(filename.to_string_lossy().to_string());

        if filenames.len() % 10 == 0 {
            log::info!(
                "Saved {} PDB files so far, last was {}",
                filenames.len(),
                filenames[filenames.len() - 1]
            );
        }
    }
    log::info!("Saved {} PDB files", filenames.len());

    if let Some(outfile) = args.get_one::<String>("filenames_out") {
        let mut writer = pepbind::writer(outfile)?;
        for filename in &filenames {
            writeln!(writer, "{}", filename)?;
        }
        writer.flush()?;
    }

    Ok(())
}
