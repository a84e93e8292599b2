use anyhow::{anyhow, Context};
use clap::*;
use mulrfs::libs::multree::labels::LabelMap;
use mulrfs::libs::multree::preprocess::preprocess;
use mulrfs::libs::phylo::tree::Tree;
use std::io::Write;

// Create clap subcommand arguments
pub fn make_subcommand() -> Command {
    Command::new("prep")
        .about("Preprocess MUL-trees for an RF supertree solver")
        .after_help(
            r###"
Reads one Newick gene family tree per input line and writes, for every tree
that survives the size gates, a singly-labeled tree whose RF score against
any species tree differs from the MUL-tree's score by a per-tree constant.

Notes:
* The label map assigns gene copies to species, one record per line:
    species_name:gene_name_1,gene_name_2,...
  Gene copy labels must not collide with species labels.
* Trees with fewer than 4 leaves, or fewer than 4 distinct species after
  preprocessing, are skipped; with --verbose each skip is reported.
* Output leaves are species labels; branch lengths and internal labels are
  dropped.
* Without -o, the output lands next to the input with `-for-fastrfs`
  inserted before the extension.

Examples:
1. Preprocess a gene tree file:
   mulrfs prep -i gtrees.nwk -a g2s.map

2. To standard output, with per-tree diagnostics:
   mulrfs prep -i gtrees.nwk -a g2s.map -o stdout --verbose
"###,
        )
        .arg(
            Arg::new("input")
                .long("input")
                .short('i')
                .required(true)
                .num_args(1)
                .help("Input file with gene family trees, one newick string per line"),
        )
        .arg(
            Arg::new("map")
                .long("map")
                .short('a')
                .required(true)
                .num_args(1)
                .help("Label map file assigning gene copies to species"),
        )
        .arg(
            Arg::new("output")
                .long("output")
                .short('o')
                .num_args(1)
                .help("Output filename. [stdout] for screen"),
        )
        .arg(
            Arg::new("verbose")
                .long("verbose")
                .action(ArgAction::SetTrue)
                .help("Per-tree diagnostics on standard output"),
        )
}

// command implementation
pub fn execute(args: &ArgMatches) -> anyhow::Result<()> {
    //----------------------------
    // Args
    //----------------------------
    let infile = args.get_one::<String>("input").unwrap();
    let mapfile = args.get_one::<String>("map").unwrap();
    let verbose = args.get_flag("verbose");

    let outfile = match args.get_one::<String>("output") {
        Some(s) => s.clone(),
        None => default_output(infile),
    };

    let map = LabelMap::from_file(mapfile).with_context(|| format!("reading {}", mapfile))?;

    let mut writer = mulrfs::writer(&outfile)?;

    //----------------------------
    // Operating
    //----------------------------
    for (i, line) in mulrfs::read_lines(infile)?.iter().enumerate() {
        let g = i + 1;
        if verbose {
            println!("Preprocessing gene tree on line {}...", g);
        }

        let compact: String = line.split_whitespace().collect();
        if compact.is_empty() {
            if verbose {
                println!("...skipped: line is empty");
            }
            continue;
        }

        let mut tree = Tree::from_newick(&compact)
            .map_err(|e| anyhow!("Gene tree on line {}: {}", g, e))?;

        if tree.count_leaves() < 4 {
            if verbose {
                println!("...skipped: tree has <4 leaves before preprocessing");
            }
            continue;
        }

        let summary = preprocess(&mut tree, &map)
            .map_err(|e| anyhow!("Gene tree on line {}: {}", g, e))?;

        if verbose {
            println!(
                "    S={} c={} E_M={} E_MX={} R={} L_M={} shift={}",
                summary.n_lmx,
                summary.c,
                summary.n_em,
                summary.n_emx(),
                summary.n_r,
                summary.n_lm,
                summary.score_shift()
            );
        }

        if summary.n_lmx < 4 {
            if verbose {
                println!("...skipped: tree has <4 species after preprocessing");
            }
            continue;
        }

        writer.write_all((tree.to_newick() + "\n").as_ref())?;
    }

    Ok(())
}

// `genes.nwk` -> `genes-for-fastrfs.nwk`
fn default_output(input: &str) -> String {
    if input == "stdin" {
        return "stdout".to_string();
    }
    match input.rsplit_once('.') {
        Some((stem, ext)) => format!("{}-for-fastrfs.{}", stem, ext),
        None => format!("{}-for-fastrfs", input),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_output() {
        assert_eq!(default_output("genes.nwk"), "genes-for-fastrfs.nwk");
        assert_eq!(default_output("dir/genes.tre"), "dir/genes-for-fastrfs.tre");
        assert_eq!(default_output("genes"), "genes-for-fastrfs");
        assert_eq!(default_output("stdin"), "stdout");
    }
}
