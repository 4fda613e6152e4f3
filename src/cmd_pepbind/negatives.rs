use clap::*;
use pepbind::libs::align::Blosum62Aligner;
use pepbind::libs::negative::{generate, CheckpointSink, FileCheckpoint, NoCheckpoint, SamplerConfig};
use pepbind::libs::pair::{read_pairs, write_pairs};
use std::io::Write;

// Create clap subcommand arguments
pub fn make_subcommand() -> Command {
    Command::new("negatives")
        .about("Generates negative bound pairs by recombining positives")
        .after_help(
            r###"
Each proposal keeps the target of one positive and takes the CDR of another.
It is accepted when

    align(new CDR, original CDR) + align(target, donor's target) < --threshold

with global BLOSUM62 alignments. Pairs already in the input or proposed
before are never proposed again. Rounds of proposals continue until -k
negatives are accepted.

The output holds all positives followed by exactly -k negatives.

Checkpoints:
* Every 10 rounds, starting with the first, the negatives accepted so far are
  written to `.tmp.negatives_<count>.tsv` in --checkpoint-dir.
* --no-checkpoint disables them.

Examples:
1. As many negatives as positives:
   pepbind negatives positives.tsv -o combined.tsv

2. Merge several scans and give up after 100 rounds:
   pepbind negatives 1mhp.tsv 5waq.tsv -k 500 --max-rounds 100 -o combined.tsv

"###,
        )
        .arg(
            Arg::new("infiles")
                .required(true)
                .num_args(1..)
                .index(1)
                .help("Positive bound pairs, concatenated in order"),
        )
        .arg(
            Arg::new("k")
                .short('k')
                .value_parser(value_parser!(usize))
                .help("Number of negatives. Defaults to the number of positives"),
        )
        .arg(
            Arg::new("seed")
                .long("seed")
                .value_parser(value_parser!(u64))
                .default_value("42")
                .help("Random seed"),
        )
        .arg(
            Arg::new("threshold")
                .long("threshold")
                .value_parser(value_parser!(f64))
                .default_value("0")
                .allow_negative_numbers(true)
                .help("Proposals scoring below this are accepted"),
        )
        .arg(
            Arg::new("gap_open")
                .long("gap-open")
                .value_parser(value_parser!(i32))
                .default_value("-5")
                .allow_negative_numbers(true)
                .help("Gap opening score"),
        )
        .arg(
            Arg::new("gap_extend")
                .long("gap-extend")
                .value_parser(value_parser!(i32))
                .default_value("-1")
                .allow_negative_numbers(true)
                .help("Gap extension score"),
        )
        .arg(
            Arg::new("max_rounds")
                .long("max-rounds")
                .value_parser(value_parser!(usize))
                .help("Fail after this many rounds"),
        )
        .arg(
            Arg::new("checkpoint_dir")
                .long("checkpoint-dir")
                .num_args(1)
                .default_value(".")
                .help("Directory of checkpoint files"),
        )
        .arg(
            Arg::new("no_checkpoint")
                .long("no-checkpoint")
                .action(ArgAction::SetTrue)
                .conflicts_with("checkpoint_dir")
                .help("Don't write checkpoint files"),
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
    let config = SamplerConfig {
        k: args.get_one::<usize>("k").copied(),
        seed: *args.get_one::<u64>("seed").unwrap(),
        threshold: *args.get_one::<f64>("threshold").unwrap(),
        max_rounds: args.get_one::<usize>("max_rounds").copied(),
        ..Default::default()
    };
    let aligner = Blosum62Aligner::new(
        *args.get_one::<i32>("gap_open").unwrap(),
        *args.get_one::<i32>("gap_extend").unwrap(),
    );

    let mut positives = vec![];
    for infile in args.get_many::<String>("infiles").unwrap() {
        let pairs = read_pairs(pepbind::reader(infile)?)?;
        log::info!("Read {} bound pairs from {}", pairs.len(), infile);
        positives.extend(pairs);
    }

    let mut sink: Box<dyn CheckpointSink> = if args.get_flag("no_checkpoint") {
        Box::new(NoCheckpoint)
    } else {
        let dir = args.get_one::<String>("checkpoint_dir").unwrap();
        std::fs::create_dir_all(dir)?;
        Box::new(FileCheckpoint::new(dir))
    };

    let combined = generate(&positives, &aligner, config, sink.as_mut())?;

    let mut writer = pepbind::writer(args.get_one::<String>("outfile").unwrap())?;
    write_pairs(&mut writer, &combined)?;
    writer.flush()?;

    Ok(())
}
