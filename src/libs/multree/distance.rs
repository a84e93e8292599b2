use super::profile::SpeciesSet;
use crate::libs::phylo::tree::Tree;
use indexmap::IndexSet;
use std::collections::HashSet;

/// Result of comparing two trees on their shared leaf set.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TreeDistance {
    /// Size of the shared leaf set
    pub shared_leaves: usize,
    /// Number of internal (non-trivial) splits of tree 1 after restriction
    pub internal1: usize,
    /// Number of internal (non-trivial) splits of tree 2 after restriction
    pub internal2: usize,
    /// Splits of tree 1 missing from tree 2
    pub false_negatives: usize,
    /// Splits of tree 2 missing from tree 1
    pub false_positives: usize,
}

impl TreeDistance {
    /// Unrooted RF distance on the shared leaf set: FN + FP.
    pub fn rf(&self) -> usize {
        self.false_negatives + self.false_positives
    }

    /// Normalized RF distance: (FN + FP) / (2 * NL - 6).
    /// Undefined for fewer than four shared leaves.
    pub fn normalized_rf(&self) -> Option<f64> {
        if self.shared_leaves < 4 {
            return None;
        }
        let denom = 2.0 * self.shared_leaves as f64 - 6.0;
        Some(self.rf() as f64 / denom)
    }
}

// The non-trivial bipartitions a tree induces on the indexed leaves, as
// species bitsets oriented toward ordinal 0. Leaves missing from `ords`
// drop out, so this is the split set of the tree restricted to the
// indexed leaf set; splits that coincide under the restriction count once.
fn restricted_splits(tree: &Tree, ords: &IndexSet<String>) -> HashSet<SpeciesSet> {
    let width = ords.len();
    let mut splits = HashSet::new();
    // with three or fewer leaves every bipartition is trivial
    if width < 4 {
        return splits;
    }

    let root = match tree.get_root() {
        Some(r) => r,
        None => return splits,
    };

    // per-node leaf sets, built bottom-up the same way down profiles are
    let mut below = vec![SpeciesSet::with_capacity(width); tree.arena_size()];

    for id in tree.postorder(root) {
        let node = tree.get_node(id).unwrap();

        if node.is_leaf() {
            if let Some(ord) = node.name.as_ref().and_then(|n| ords.get_index_of(n.as_str())) {
                below[id].insert(ord);
            }
            continue;
        }

        let mut acc = SpeciesSet::with_capacity(width);
        for &child in &node.children {
            acc.union_with(&below[child]);
        }

        // a side and its complement are the same bipartition; orient
        // every split toward ordinal 0 before comparing
        let mut split = acc.clone();
        if !split.contains(0) {
            split.toggle_range(..width);
        }
        let size = split.count_ones(..);
        if size > 1 && size + 1 < width {
            splits.insert(split);
        }

        below[id] = acc;
    }

    splits
}

/// Compare two trees after restricting both to their shared leaf set.
///
/// Leaves unique to either side are dropped, splits that become trivial
/// under the restriction are discarded, and splits that collapse onto
/// each other count once.
///
/// # Example
/// ```
/// use mulrfs::libs::multree::distance::compare_restricted;
/// use mulrfs::libs::phylo::tree::Tree;
///
/// let t1 = Tree::from_newick("(((A,B,C),D),E);").unwrap();
/// let t2 = Tree::from_newick("((((A,B),C),D),E);").unwrap();
/// let d = compare_restricted(&t1, &t2);
/// assert_eq!(d.shared_leaves, 5);
/// assert_eq!(d.internal1, 1);
/// assert_eq!(d.internal2, 2);
/// assert_eq!(d.false_negatives, 0);
/// assert_eq!(d.false_positives, 1);
/// assert_eq!(d.normalized_rf(), Some(0.25));
/// ```
pub fn compare_restricted(t1: &Tree, t2: &Tree) -> TreeDistance {
    // leaf ordinals over the shared labels, in sorted order
    let in_t2: HashSet<String> = t2.leaf_names().into_iter().collect();
    let mut shared: Vec<String> = t1
        .leaf_names()
        .into_iter()
        .filter(|name| in_t2.contains(name))
        .collect();
    shared.sort();
    shared.dedup();
    let ords: IndexSet<String> = shared.into_iter().collect();

    let splits1 = restricted_splits(t1, &ords);
    let splits2 = restricted_splits(t2, &ords);

    TreeDistance {
        shared_leaves: ords.len(),
        internal1: splits1.len(),
        internal2: splits2.len(),
        false_negatives: splits1.difference(&splits2).count(),
        false_positives: splits2.difference(&splits1).count(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rf_identical() {
        let t1 = Tree::from_newick("((A,B),((C,D),E));").unwrap();
        let t2 = Tree::from_newick("((A,B),((C,D),E));").unwrap();
        let d = compare_restricted(&t1, &t2);
        assert_eq!(d.shared_leaves, 5);
        assert_eq!(d.internal1, 2);
        assert_eq!(d.internal2, 2);
        assert_eq!(d.rf(), 0);
    }

    #[test]
    fn test_rf_quartet() {
        // Tree 1 split: {A,B} vs {C,D}. Tree 2 split: {A,C} vs {B,D}.
        // Symmetric difference = 2.
        let t1 = Tree::from_newick("((A,B),(C,D));").unwrap();
        let t2 = Tree::from_newick("((A,C),(B,D));").unwrap();
        let d = compare_restricted(&t1, &t2);
        assert_eq!(d.false_negatives, 1);
        assert_eq!(d.false_positives, 1);
        assert_eq!(d.rf(), 2);
    }

    #[test]
    fn test_rf_5_taxa() {
        // T1 splits: {{A,B}}; T2 splits: {{A,B}, {D,E}} -> RF = 1
        let t1 = Tree::from_newick("((A,B),(C,D,E));").unwrap();
        let t2 = Tree::from_newick("((A,B),(C,(D,E)));").unwrap();
        let d = compare_restricted(&t1, &t2);
        assert_eq!(d.false_negatives, 0);
        assert_eq!(d.false_positives, 1);
        assert_eq!(d.rf(), 1);
    }

    #[test]
    fn test_rf_symmetry() {
        let t1_str = "(((t,(s,r)),((q,p),((o,n),(m,(l,(k,j)))))),((i,(h,g)),z),((y,x),(w,(v,u))));";
        let t2_str = "((((w,(v,(u,t))),(s,(r,q))),((p,(o,(n,m))),(l,k))),((j,i),(h,g)),(z,(y,x)));";

        let t1 = Tree::from_newick(t1_str).unwrap();
        let t2 = Tree::from_newick(t2_str).unwrap();

        let d12 = compare_restricted(&t1, &t2);
        let d21 = compare_restricted(&t2, &t1);

        assert_eq!(d12.rf(), 30);
        assert_eq!(d12.rf(), d21.rf());
        assert_eq!(d12.false_negatives, d21.false_positives);
        assert_eq!(d12.false_positives, d21.false_negatives);
    }

    #[test]
    fn test_restricted_drops_unique_leaves() {
        // E and F are unique to one side; comparison happens on {A,B,C,D}
        let t1 = Tree::from_newick("(((A,B),(C,D)),E);").unwrap();
        let t2 = Tree::from_newick("(((A,B),F),(C,D));").unwrap();
        let d = compare_restricted(&t1, &t2);
        assert_eq!(d.shared_leaves, 4);
        assert_eq!(d.rf(), 0);
        assert_eq!(d.normalized_rf(), Some(0.0));
    }

    #[test]
    fn test_restricted_too_few_shared() {
        // Unrooted trees on three leaves carry no internal splits
        let t1 = Tree::from_newick("((A,B),C);").unwrap();
        let t2 = Tree::from_newick("((A,C),B);").unwrap();
        let d = compare_restricted(&t1, &t2);
        assert_eq!(d.shared_leaves, 3);
        assert_eq!(d.internal1, 0);
        assert_eq!(d.internal2, 0);
        assert_eq!(d.normalized_rf(), None);
    }
}
