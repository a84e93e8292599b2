use anyhow::{anyhow, bail, Context};
use clap::*;
use mulrfs::libs::multree::labels::LabelMap;
use mulrfs::libs::multree::preprocess::{preprocess, relabel_leaves, strip_decorations, unroot};
use mulrfs::libs::phylo::tree::Tree;
use std::io::Write;
use std::path::Path;
use std::process::{Command as Process, Stdio};

// Create clap subcommand arguments
pub fn make_subcommand() -> Command {
    Command::new("check")
        .about("Verify the score-shift identity against an external scorer")
        .after_help(
            r###"
For every gene tree, the external scorer is run twice against the species
tree: once on the raw MUL-tree (leaves relabeled to species) and once on
the preprocessed tree. The two scores must differ by exactly the per-tree
shift; the first violation aborts with the offending line index.

The cumulative raw score sum is printed on success.

Notes:
* The scorer is invoked as `<binary> -i <tree-pair-file> -o <result-file>`
  with stdout and stderr captured; the result file's first line must end
  in the numeric score (a trailing `]` is tolerated).
* Scratch files live in the system temp directory and are removed after
  each invocation.

Examples:
1. mulrfs check -s stree.nwk -g gtrees.nwk -a g2s.map -x MulRFScorer
"###,
        )
        .arg(
            Arg::new("stree")
                .long("stree")
                .short('s')
                .required(true)
                .num_args(1)
                .help("Input file containing the singly-labeled species tree"),
        )
        .arg(
            Arg::new("gtree")
                .long("gtree")
                .short('g')
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
            Arg::new("scorer")
                .long("scorer")
                .short('x')
                .required(true)
                .num_args(1)
                .help("MulRF scorer binary, a name on PATH or a full path"),
        )
}

// command implementation
pub fn execute(args: &ArgMatches) -> anyhow::Result<()> {
    //----------------------------
    // Args
    //----------------------------
    let sfile = args.get_one::<String>("stree").unwrap();
    let gfile = args.get_one::<String>("gtree").unwrap();
    let mapfile = args.get_one::<String>("map").unwrap();
    let scorer = args.get_one::<String>("scorer").unwrap();

    let bin = which::which(scorer)
        .map_err(|e| anyhow!("Can't find the external scorer {}: {}", scorer, e))?;

    let map = LabelMap::from_file(mapfile).with_context(|| format!("reading {}", mapfile))?;

    // Species tree, stripped of lengths and internal labels
    let mut stree = Tree::from_newick(&mulrfs::read_lines(sfile)?.join("\n"))
        .map_err(|e| anyhow!("Species tree: {}", e))?;
    strip_decorations(&mut stree);
    let stree_newick = stree.to_newick();

    let stem = Path::new(gfile)
        .file_stem()
        .map(|s| s.to_string_lossy().to_string())
        .unwrap_or_else(|| "check".to_string());

    //----------------------------
    // Operating
    //----------------------------
    let mut total: i64 = 0;

    for (i, line) in mulrfs::read_lines(gfile)?.iter().enumerate() {
        let g = i + 1;
        let compact: String = line.split_whitespace().collect();
        if compact.is_empty() {
            continue;
        }

        // Raw MUL-tree: unrooted, leaves relabeled to species
        let mut raw = Tree::from_newick(&compact)
            .map_err(|e| anyhow!("Gene tree on line {}: {}", g, e))?;
        unroot(&mut raw);
        relabel_leaves(&mut raw, &map)
            .map_err(|e| anyhow!("Gene tree on line {}: {}", g, e))?;
        strip_decorations(&mut raw);

        // Preprocessed tree and its score shift
        let mut pre = Tree::from_newick(&compact)
            .map_err(|e| anyhow!("Gene tree on line {}: {}", g, e))?;
        let summary = preprocess(&mut pre, &map)
            .map_err(|e| anyhow!("Gene tree on line {}: {}", g, e))?;
        let shift = summary.score_shift();

        let raw_score = run_scorer(
            &bin,
            &stree_newick,
            &raw.to_newick(),
            &format!("{}-scored-", stem),
        )
        .with_context(|| format!("scoring raw MUL-tree on line {}", g))?;

        let pre_score = run_scorer(
            &bin,
            &stree_newick,
            &pre.to_newick(),
            &format!("{}-preprocessed-and-scored-", stem),
        )
        .with_context(|| format!("scoring preprocessed tree on line {}", g))?;

        if raw_score != pre_score + shift {
            bail!(
                "Gene tree on line {} failed: raw score {} != preprocessed score {} + shift {}",
                g,
                raw_score,
                pre_score,
                shift
            );
        }

        total += raw_score;
    }

    println!("{}", total);

    Ok(())
}

// One scorer invocation: write the species/gene tree pair, run the binary
// with captured output, pull the score off the first line of the result
// file. All three scratch files are removed on return.
fn run_scorer(
    bin: &Path,
    species_newick: &str,
    gene_newick: &str,
    prefix: &str,
) -> anyhow::Result<i64> {
    let mut pair = tempfile::Builder::new()
        .prefix(prefix)
        .suffix(".tree")
        .rand_bytes(8)
        .tempfile()?;
    writeln!(pair, "{}", species_newick)?;
    writeln!(pair, "{}", gene_newick)?;
    let pair_path = pair.into_temp_path();

    let out = tempfile::Builder::new()
        .prefix(prefix)
        .suffix(".out")
        .rand_bytes(8)
        .tempfile()?;
    let out_path = out.into_temp_path();

    let log = tempfile::Builder::new()
        .prefix(prefix)
        .suffix(".log")
        .rand_bytes(8)
        .tempfile()?;
    let (log_file, log_path) = log.into_parts();

    let status = Process::new(bin)
        .arg("-i")
        .arg(pair_path.as_os_str())
        .arg("-o")
        .arg(out_path.as_os_str())
        .stdout(Stdio::from(log_file.try_clone()?))
        .stderr(Stdio::from(log_file))
        .status()?;

    if !status.success() {
        bail!("External scorer exited with failing error code");
    }

    let result = std::fs::read_to_string(&out_path)?;
    let score = parse_score(&result)
        .ok_or_else(|| anyhow!("Unparseable scorer output: {:?}", result.lines().next()))?;

    pair_path.close()?;
    out_path.close()?;
    log_path.close()?;

    Ok(score)
}

// The score is the last whitespace-separated token of the first line,
// with a trailing `]` stripped.
fn parse_score(result: &str) -> Option<i64> {
    let token = result.lines().next()?.split_whitespace().last()?;
    let token = token.trim_end_matches(']');
    token.parse::<f64>().ok().map(|v| v.round() as i64)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_score() {
        assert_eq!(parse_score("[ weighted RF distance = 12]"), Some(12));
        assert_eq!(parse_score("RF score: 7\nsecond line ignored"), Some(7));
        assert_eq!(parse_score("score 3.0]"), Some(3));
        assert_eq!(parse_score(""), None);
        assert_eq!(parse_score("no numbers here"), None);
    }
}
