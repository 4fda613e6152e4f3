extern crate clap;
use clap::*;

mod cmd_pepbind;

fn main() -> anyhow::Result<()> {
    let app = Command::new("pepbind")
        .version(crate_version!())
        .author(crate_authors!())
        .about("`pepbind` - Peptide binding datasets from protein structures")
        .propagate_version(true)
        .arg_required_else_help(true)
        .color(ColorChoice::Auto)
        .arg(
            Arg::new("verbose")
                .long("verbose")
                .short('v')
                .action(ArgAction::Count)
                .global(true)
                .help("More log messages: -v for progress, -vv for details"),
        )
        .subcommand(cmd_pepbind::scan::make_subcommand())
        .subcommand(cmd_pepbind::negatives::make_subcommand())
        .subcommand(cmd_pepbind::pdb::make_subcommand())
        .after_help(
            r###"Subcommand groups:

* Positives:
    * scan      - Bound pairs of one structure from its interaction matrix

* Negatives:
    * negatives - Recombine positives into dissimilar non-binding pairs

* Structures:
    * pdb       - Write each bound pair as a PDB file

Log messages go to stderr; RUST_LOG overrides -v.

"###,
        );

    let matches = app.get_matches();

    let level = match matches.get_count("verbose") {
        0 => "warn",
        1 => "info",
        _ => "debug",
    };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(level))
        .format_timestamp(None)
        .init();

    match matches.subcommand() {
        Some(("scan", sub_matches)) => cmd_pepbind::scan::execute(sub_matches),
        Some(("negatives", sub_matches)) => cmd_pepbind::negatives::execute(sub_matches),
        Some(("pdb", sub_matches)) => cmd_pepbind::pdb::execute(sub_matches),
        _ => unreachable!(),
    }?;

    Ok(())
}
