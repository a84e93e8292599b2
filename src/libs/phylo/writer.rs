use super::node::NodeId;
use super::tree::Tree;

/// Serialize the tree to a compact Newick string.
///
/// # Example
/// ```
/// use mulrfs::libs::phylo::tree::Tree;
/// use mulrfs::libs::phylo::writer;
/// let mut tree = Tree::new();
/// let root = tree.add_node();
/// tree.set_root(root);
/// tree.get_node_mut(root).unwrap().name = Some("A".to_string());
/// assert_eq!(writer::write_newick(&tree), "A;");
/// ```
pub fn write_newick(tree: &Tree) -> String {
    let mut out = String::new();
    if let Some(root) = tree.get_root() {
        write_node(tree, root, &mut out);
    }
    out.push(';');
    out
}

fn write_node(tree: &Tree, id: NodeId, out: &mut String) {
    let node = tree.get_node(id).unwrap();

    if let Some((last, rest)) = node.children.split_last() {
        out.push('(');
        for &child in rest {
            write_node(tree, child, out);
            out.push(',');
        }
        write_node(tree, *last, out);
        out.push(')');
    }

    if let Some(name) = &node.name {
        // labels holding Newick structural characters need quoting
        let quote = name.chars().any(|c| "(),:;[] \t\n".contains(c));
        if quote {
            out.push('\'');
        }
        out.push_str(name);
        if quote {
            out.push('\'');
        }
    }

    if let Some(length) = node.length {
        out.push(':');
        out.push_str(&length.to_string());
    }
}

impl Tree {
    /// Serialize to a compact Newick string.
    ///
    /// # Example
    /// ```
    /// use mulrfs::libs::phylo::tree::Tree;
    /// let tree = Tree::from_newick("( A , ( B , C ) ) ;").unwrap();
    /// assert_eq!(tree.to_newick(), "(A,(B,C));");
    /// ```
    pub fn to_newick(&self) -> String {
        write_newick(self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_to_newick() {
        let mut tree = Tree::new();
        //    Root
        //   /    \
        //  A:0.1  B:0.2
        let n0 = tree.add_node();
        let n1 = tree.add_node();
        let n2 = tree.add_node();

        tree.set_root(n0);
        tree.add_child(n0, n1).unwrap();
        tree.add_child(n0, n2).unwrap();

        tree.get_node_mut(n0).unwrap().name = Some("Root".to_string());
        tree.get_node_mut(n1).unwrap().name = Some("A".to_string());
        tree.get_node_mut(n1).unwrap().length = Some(0.1);
        tree.get_node_mut(n2).unwrap().name = Some("B".to_string());
        tree.get_node_mut(n2).unwrap().length = Some(0.2);

        assert_eq!(write_newick(&tree), "(A:0.1,B:0.2)Root;");
    }

    #[test]
    fn test_to_newick_special_chars() {
        let mut tree = Tree::new();
        let n0 = tree.add_node();
        tree.set_root(n0);
        tree.get_node_mut(n0).unwrap().name = Some("Homo sapiens".to_string());

        assert_eq!(write_newick(&tree), "'Homo sapiens';");
    }

    #[test]
    fn test_round_trip_topology() {
        // Parsing a serialized tree and re-serializing is stable
        let input = "((A,B),(C,(D,E)),F);";
        let tree = Tree::from_newick(input).unwrap();
        let out = tree.to_newick();
        assert_eq!(out, input);

        let again = Tree::from_newick(&out).unwrap();
        assert_eq!(again.to_newick(), out);
    }
}
