use super::error::MulError;
use super::labels::LabelMap;
use super::profile::Profiles;
use crate::libs::phylo::tree::Tree;
use std::collections::HashSet;

/// Per-tree edge and leaf counts collected while preprocessing a MUL-tree.
///
/// * `n_em`  - non-root edges of the (unrooted) input MUL-tree
/// * `n_lm`  - leaves of the input MUL-tree
/// * `n_r`   - kept edges that become trivial once duplicates are pruned
/// * `c`     - species with more than one gene copy in the tree
/// * `n_lmx` - leaves of the preprocessed tree, i.e. distinct species
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PreprocessSummary {
    pub n_em: usize,
    pub n_lm: usize,
    pub n_r: usize,
    pub n_o: usize,
    pub c: usize,
    pub n_lmx: usize,
}

impl PreprocessSummary {
    /// Non-root edges of the preprocessed tree
    pub fn n_emx(&self) -> usize {
        self.n_o + self.n_lmx
    }

    /// The constant added to an RF score computed against the preprocessed
    /// tree to recover the score against the original MUL-tree:
    ///
    /// shift = nLMX + c + nEM - nEMX - 2*nR - nLM
    ///
    /// Non-negative for well-formed inputs; zero exactly when no species
    /// is duplicated.
    pub fn score_shift(&self) -> i64 {
        (self.n_lmx + self.c + self.n_em) as i64
            - (self.n_emx() + 2 * self.n_r + self.n_lm) as i64
    }
}

/// Normalize a tree read from a rooted Newick string into its unrooted
/// form: suppress unifurcations, then collapse a basal bifurcation so the
/// traversal root becomes a multifurcation.
///
/// When one root child is a leaf the internal child is the one collapsed;
/// a tree whose root joins two leaves is left alone (such trees are
/// discarded by the size gates).
///
/// # Example
/// ```
/// use mulrfs::libs::multree::preprocess::unroot;
/// use mulrfs::libs::phylo::tree::Tree;
///
/// let mut tree = Tree::from_newick("((a1,b1),(a2,(c1,d1)));").unwrap();
/// unroot(&mut tree);
/// assert_eq!(tree.to_newick(), "(a1,b1,(a2,(c1,d1)));");
/// ```
pub fn unroot(tree: &mut Tree) {
    tree.suppress_unifurcations();

    let root = match tree.get_root() {
        Some(r) => r,
        None => return,
    };

    let children = tree.get_node(root).unwrap().children.clone();
    if children.len() != 2 {
        return;
    }

    let target = if tree.get_node(children[0]).unwrap().is_leaf() {
        children[1]
    } else {
        children[0]
    };
    if !tree.get_node(target).unwrap().is_leaf() {
        tree.collapse_node(target).ok();
    }
}

/// Relabel every leaf from its gene copy label to its species label,
/// without pruning anything. Used when the raw MUL-tree itself has to be
/// scored against a species tree.
pub fn relabel_leaves(tree: &mut Tree, map: &LabelMap) -> Result<(), MulError> {
    for leaf in tree.get_leaves() {
        let label = tree
            .get_node(leaf)
            .unwrap()
            .name
            .clone()
            .unwrap_or_default();
        let ord = map.species_of(&label)?;
        let species = map.species_name(ord).to_string();
        tree.get_node_mut(leaf).unwrap().name = Some(species);
    }
    Ok(())
}

struct EdgeCounts {
    n_lm: usize,
    n_x: usize,
    n_r: usize,
    n_o: usize,
}

// Classify every non-root edge by its profiles and contract the invalid
// ones. An edge whose down and up profiles intersect induces a bipartition
// with overlapping species sets and cannot occur in any singly-labeled
// tree; kept edges with a singleton side (nR) turn trivial once duplicates
// are pruned, the rest (nO) survive as non-trivial bipartitions.
fn classify_and_contract(tree: &mut Tree, profiles: &Profiles) -> EdgeCounts {
    let mut counts = EdgeCounts {
        n_lm: 0,
        n_x: 0,
        n_r: 0,
        n_o: 0,
    };

    let root = match tree.get_root() {
        Some(r) => r,
        None => return counts,
    };

    let mut invalid = Vec::new();
    for id in tree.postorder(root) {
        if id == root {
            continue;
        }
        let node = tree.get_node(id).unwrap();
        if node.is_leaf() {
            counts.n_lm += 1;
            continue;
        }

        let down = profiles.down(id);
        let up = profiles.up(id).unwrap();

        if !down.is_disjoint(up) {
            counts.n_x += 1;
            invalid.push(id);
        } else if down.count_ones(..) == 1 || up.count_ones(..) == 1 {
            counts.n_r += 1;
        } else {
            counts.n_o += 1;
        }
    }

    for id in invalid {
        tree.collapse_node(id).ok();
    }

    counts
}

// Keep one leaf per species (the canonical gene copy), relabel it to the
// species, drop the rest and splice out the unifurcations this leaves
// behind. Returns (n_lmx, c).
fn prune_duplicate_species(tree: &mut Tree, map: &LabelMap) -> Result<(usize, usize), MulError> {
    let mut n_lmx = 0;
    let mut c = 0;
    let mut duplicated: HashSet<usize> = HashSet::new();

    for leaf in tree.get_leaves() {
        let label = tree
            .get_node(leaf)
            .unwrap()
            .name
            .clone()
            .unwrap_or_default();
        let ord = map.species_of(&label)?;
        let species = map.species_name(ord);

        if label == species || label == map.canonical_gene(ord) {
            let species = species.to_string();
            tree.get_node_mut(leaf).unwrap().name = Some(species);
            n_lmx += 1;
        } else {
            tree.remove_node(leaf, false);
            if duplicated.insert(ord) {
                c += 1;
            }
        }
    }

    tree.suppress_unifurcations();

    Ok((n_lmx, c))
}

/// Drop branch lengths and internal labels; emitted trees carry neither,
/// and neither may reach the external scorer.
pub fn strip_decorations(tree: &mut Tree) {
    let root = match tree.get_root() {
        Some(r) => r,
        None => return,
    };
    for id in tree.preorder(root) {
        let node = tree.get_node_mut(id).unwrap();
        node.length = None;
        if !node.is_leaf() {
            node.name = None;
        }
    }
}

/// Reduce a MUL-tree to a singly-labeled tree whose RF score against any
/// species tree differs from the MUL-tree's score by a constant.
///
/// The tree is unrooted, annotated with species profiles, stripped of
/// edges inducing invalid bipartitions, and pruned down to one canonical
/// leaf per species. The returned summary carries the counts that make up
/// the score shift.
///
/// # Example
/// ```
/// use mulrfs::libs::multree::labels::LabelMap;
/// use mulrfs::libs::multree::preprocess::preprocess;
/// use mulrfs::libs::phylo::tree::Tree;
///
/// let map = LabelMap::from_reader("A:a1,a2\nB:b1\nC:c1\nD:d1\n".as_bytes()).unwrap();
/// let mut tree = Tree::from_newick("((a1,b1),(a2,(c1,d1)));").unwrap();
/// let summary = preprocess(&mut tree, &map).unwrap();
///
/// assert_eq!(tree.to_newick(), "(A,B,(C,D));");
/// assert_eq!(summary.score_shift(), 2);
/// ```
pub fn preprocess(tree: &mut Tree, map: &LabelMap) -> Result<PreprocessSummary, MulError> {
    unroot(tree);

    let profiles = Profiles::build(tree, map)?;
    let edges = classify_and_contract(tree, &profiles);
    let (n_lmx, c) = prune_duplicate_species(tree, map)?;

    strip_decorations(tree);
    tree.compact();

    Ok(PreprocessSummary {
        n_em: edges.n_lm + edges.n_x + edges.n_r + edges.n_o,
        n_lm: edges.n_lm,
        n_r: edges.n_r,
        n_o: edges.n_o,
        c,
        n_lmx,
    })
}
