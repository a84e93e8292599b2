use super::error::MulError;
use super::labels::LabelMap;
use crate::libs::phylo::node::NodeId;
use crate::libs::phylo::tree::Tree;
use fixedbitset::FixedBitSet;

/// A set of species, represented as a bitset over the ordinals assigned by
/// the `LabelMap`. Unions and intersections are word operations.
pub type SpeciesSet = FixedBitSet;

/// Per-node species profiles, stored as parallel arrays indexed by the
/// tree's arena IDs.
///
/// `down(v)` is the set of species below the edge above `v` (the species
/// among the leaves of `v`'s subtree); `up(v)` is the set of species above
/// that edge (everywhere else in the tree). Up profiles exist only for
/// internal non-root nodes; they are what the edge classification reads.
#[derive(Debug, Clone)]
pub struct Profiles {
    down: Vec<SpeciesSet>,
    up: Vec<Option<SpeciesSet>>,
}

impl Profiles {
    /// Annotate every node of an unrooted tree with down and up profiles.
    ///
    /// Down profiles build bottom-up: a leaf holds the singleton set of its
    /// species, an internal node the union over its children. Up profiles
    /// build top-down: a child of the (pseudo-)root takes the union of its
    /// siblings' down profiles, a deeper node its parent's up profile plus
    /// its siblings' down profiles. The traversal root itself carries no up
    /// profile, and the pre-order guarantees a parent's up profile exists
    /// before its children need it.
    ///
    /// # Example
    /// ```
    /// use mulrfs::libs::multree::labels::LabelMap;
    /// use mulrfs::libs::multree::profile::Profiles;
    /// use mulrfs::libs::phylo::tree::Tree;
    ///
    /// let map = LabelMap::from_reader("A:a1,a2\nB:b1\nC:c1\n".as_bytes()).unwrap();
    /// let tree = Tree::from_newick("(a1,b1,(a2,c1));").unwrap();
    /// let profiles = Profiles::build(&tree, &map).unwrap();
    ///
    /// let root = tree.get_root().unwrap();
    /// let inner = tree.get_node(root).unwrap().children[2];
    /// // down(inner) = {A, C}, up(inner) = {A, B}: the edge is invalid
    /// assert!(!profiles.down(inner).is_disjoint(profiles.up(inner).unwrap()));
    /// ```
    pub fn build(tree: &Tree, map: &LabelMap) -> Result<Self, MulError> {
        let width = map.species_count();
        let slots = tree.arena_size();

        let mut down = vec![SpeciesSet::with_capacity(width); slots];
        let mut up: Vec<Option<SpeciesSet>> = vec![None; slots];

        let root = match tree.get_root() {
            Some(r) => r,
            None => return Ok(Self { down, up }),
        };

        // Down profiles, bottom-up
        for id in tree.postorder(root) {
            let node = tree.get_node(id).unwrap();
            if node.is_leaf() {
                let label = node.name.as_deref().unwrap_or("");
                let ord = map.species_of(label)?;
                down[id].insert(ord);
            } else {
                let mut acc = SpeciesSet::with_capacity(width);
                for &child in &node.children {
                    acc.union_with(&down[child]);
                }
                down[id] = acc;
            }
        }

        // Up profiles for root children: the star-sum of their siblings'
        // down profiles. This never recurses into the root.
        let root_children = tree.get_node(root).unwrap().children.clone();
        for &child in &root_children {
            if tree.get_node(child).unwrap().is_leaf() {
                continue;
            }
            let mut acc = SpeciesSet::with_capacity(width);
            for &sibling in &root_children {
                if sibling != child {
                    acc.union_with(&down[sibling]);
                }
            }
            up[child] = Some(acc);
        }

        // Up profiles for the remaining internal nodes, top-down
        for id in tree.preorder(root) {
            let node = tree.get_node(id).unwrap();
            if id == root || node.parent == Some(root) || node.is_leaf() {
                continue;
            }

            let parent = node.parent.unwrap();
            let mut acc = up[parent]
                .clone()
                .expect("parent up profile set by pre-order");
            for &sibling in &tree.get_node(parent).unwrap().children {
                if sibling != id {
                    acc.union_with(&down[sibling]);
                }
            }
            up[id] = Some(acc);
        }

        Ok(Self { down, up })
    }

    /// Species below the edge above `id`
    pub fn down(&self, id: NodeId) -> &SpeciesSet {
        &self.down[id]
    }

    /// Species above the edge above `id`; None for the root and for leaves
    pub fn up(&self, id: NodeId) -> Option<&SpeciesSet> {
        self.up[id].as_ref()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn abcd_map() -> LabelMap {
        LabelMap::from_reader("A:a1,a2\nB:b1\nC:c1\nD:d1\n".as_bytes()).unwrap()
    }

    fn ordinals(set: &SpeciesSet) -> Vec<usize> {
        set.ones().collect()
    }

    #[test]
    fn test_down_profiles() {
        let map = abcd_map();
        // Unrooted star form of ((a1,b1),(a2,(c1,d1)))
        let tree = Tree::from_newick("(a1,b1,(a2,(c1,d1)));").unwrap();
        let profiles = Profiles::build(&tree, &map).unwrap();

        let root = tree.get_root().unwrap();
        let children = tree.get_node(root).unwrap().children.clone();

        // Leaves carry singletons
        assert_eq!(ordinals(profiles.down(children[0])), vec![0]); // a1 -> {A}
        assert_eq!(ordinals(profiles.down(children[1])), vec![1]); // b1 -> {B}

        // (a2,(c1,d1)) -> {A, C, D}
        assert_eq!(ordinals(profiles.down(children[2])), vec![0, 2, 3]);

        // Root covers all species present
        assert_eq!(ordinals(profiles.down(root)), vec![0, 1, 2, 3]);
    }

    #[test]
    fn test_up_profiles() {
        let map = abcd_map();
        let tree = Tree::from_newick("(a1,b1,(a2,(c1,d1)));").unwrap();
        let profiles = Profiles::build(&tree, &map).unwrap();

        let root = tree.get_root().unwrap();
        let children = tree.get_node(root).unwrap().children.clone();

        // Root itself has no up profile
        assert!(profiles.up(root).is_none());

        // Root child (a2,(c1,d1)): union of sibling downs = {A, B}
        let inner = children[2];
        assert_eq!(ordinals(profiles.up(inner).unwrap()), vec![0, 1]);

        // Deeper node (c1,d1): up(parent) + down(a2) = {A, B}
        let deeper = tree.get_node(inner).unwrap().children[1];
        assert_eq!(ordinals(profiles.up(deeper).unwrap()), vec![0, 1]);
    }

    #[test]
    fn test_profile_completeness() {
        // down(v) | up(v) covers every species in the tree, for every
        // non-root internal v
        let map = abcd_map();
        let tree = Tree::from_newick("(a1,(b1,(a2,c1)),d1);").unwrap();
        let profiles = Profiles::build(&tree, &map).unwrap();

        let root = tree.get_root().unwrap();
        let all = profiles.down(root).clone();

        for id in tree.postorder(root) {
            if id == root || tree.get_node(id).unwrap().is_leaf() {
                continue;
            }
            let mut union = profiles.down(id).clone();
            union.union_with(profiles.up(id).unwrap());
            assert_eq!(union, all, "node {} does not cover the species set", id);
        }
    }

    #[test]
    fn test_unknown_gene_is_fatal() {
        let map = abcd_map();
        let tree = Tree::from_newick("(a1,b1,(zz,c1));").unwrap();
        assert!(matches!(
            Profiles::build(&tree, &map),
            Err(MulError::UnknownGene { .. })
        ));
    }
}
