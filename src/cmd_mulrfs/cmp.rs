use anyhow::anyhow;
use clap::*;
use mulrfs::libs::multree::distance::compare_restricted;
use mulrfs::libs::phylo::tree::Tree;
use std::io::Write;

// Create clap subcommand arguments
pub fn make_subcommand() -> Command {
    Command::new("cmp")
        .about("Normalized RF distance between paired trees")
        .after_help(
            r###"
Compares the i-th tree of the first file with the i-th tree of the second
file, after restricting both to their shared leaf set. If the first file
holds a single tree it is compared against every tree of the second file.

Output is CSV, one row per pair:

    index,nl,i1,i2,fn,fp,rf

* nl: number of shared leaves
* i1/i2: internal edges of tree 1/2 after restriction
* fn/fp: edges of tree 1/2 missing from the other
* rf: normalized RF distance, (fn+fp)/(2*nl-6); NA below 4 shared leaves

With --sum only cumulative fn, fp and rf are printed.

Examples:
1. Tree-by-tree comparison of two lists:
   mulrfs cmp estimated.nwk true.nwk

2. Total error of gene trees against one species tree:
   mulrfs cmp stree.nwk gtrees.nwk --sum
"###,
        )
        .arg(
            Arg::new("infile1")
                .required(true)
                .num_args(1)
                .index(1)
                .help("First input filename (or stdin)"),
        )
        .arg(
            Arg::new("infile2")
                .required(true)
                .num_args(1)
                .index(2)
                .help("Second input filename"),
        )
        .arg(
            Arg::new("prefix")
                .long("prefix")
                .short('p')
                .num_args(1)
                .help("Prepend this string to every CSV row"),
        )
        .arg(
            Arg::new("sum")
                .long("sum")
                .action(ArgAction::SetTrue)
                .help("Print only cumulative fn,fp,rf"),
        )
        .arg(
            Arg::new("outfile")
                .short('o')
                .long("outfile")
                .num_args(1)
                .default_value("stdout")
                .help("Output filename. [stdout] for screen"),
        )
}

// command implementation
pub fn execute(args: &ArgMatches) -> anyhow::Result<()> {
    //----------------------------
    // Args
    //----------------------------
    let mut writer = mulrfs::writer(args.get_one::<String>("outfile").unwrap())?;
    let prefix = args
        .get_one::<String>("prefix")
        .map(|p| format!("{},", p))
        .unwrap_or_default();
    let sum_only = args.get_flag("sum");

    let lines1 = mulrfs::read_lines(args.get_one::<String>("infile1").unwrap())?;
    let lines2 = mulrfs::read_lines(args.get_one::<String>("infile2").unwrap())?;

    // A single tree in file 1 is compared against the whole of file 2
    let pairs: Vec<(String, String)> = if lines1.len() == 1 {
        lines2
            .iter()
            .map(|l2| (lines1[0].clone(), l2.clone()))
            .collect()
    } else {
        lines1
            .iter()
            .zip(lines2.iter())
            .map(|(l1, l2)| (l1.clone(), l2.clone()))
            .collect()
    };

    //----------------------------
    // Operating
    //----------------------------
    let mut total_fn = 0;
    let mut total_fp = 0;
    let mut total_rf = 0.0;

    for (i, (l1, l2)) in pairs.iter().enumerate() {
        let c1: String = l1.split_whitespace().collect();
        let c2: String = l2.split_whitespace().collect();
        if c1.is_empty() || c2.is_empty() {
            continue;
        }

        let t1 =
            Tree::from_newick(&c1).map_err(|e| anyhow!("Tree 1 on line {}: {}", i + 1, e))?;
        let t2 =
            Tree::from_newick(&c2).map_err(|e| anyhow!("Tree 2 on line {}: {}", i + 1, e))?;

        let d = compare_restricted(&t1, &t2);

        total_fn += d.false_negatives;
        total_fp += d.false_positives;

        let rf = match d.normalized_rf() {
            Some(v) => {
                total_rf += v;
                format!("{:.6}", v)
            }
            None => "NA".to_string(),
        };

        if !sum_only {
            writeln!(
                writer,
                "{}{},{},{},{},{},{},{}",
                prefix,
                i + 1,
                d.shared_leaves,
                d.internal1,
                d.internal2,
                d.false_negatives,
                d.false_positives,
                rf
            )?;
        }
    }

    if sum_only {
        writeln!(writer, "{}{},{},{:.6}", prefix, total_fn, total_fp, total_rf)?;
    }

    Ok(())
}
