use super::error::TreeError;
use super::node::NodeId;
use super::tree::Tree;
use nom::{
    branch::alt,
    bytes::complete::{is_not, take_while, take_while1},
    character::complete::{char, multispace0},
    combinator::{cut, map, map_res, opt, value},
    error::{context, ContextError, ErrorKind, FromExternalError, ParseError},
    multi::separated_list1,
    sequence::{delimited, preceded},
    IResult, Offset, Parser,
};

// ================================================================================================
// Error Handling Structures
// ================================================================================================

#[derive(Clone, Debug, PartialEq)]
pub enum TraceKind {
    Context(&'static str),
    Nom(ErrorKind),
}

/// A custom error type for nom that accumulates context and error kinds,
/// so that a failed parse can report where and why.
#[derive(Clone, Debug, PartialEq)]
pub struct ErrorTrace<'a> {
    pub stack: Vec<(&'a str, TraceKind)>,
}

impl<'a> ParseError<&'a str> for ErrorTrace<'a> {
    fn from_error_kind(input: &'a str, kind: ErrorKind) -> Self {
        ErrorTrace {
            stack: vec![(input, TraceKind::Nom(kind))],
        }
    }

    fn append(input: &'a str, kind: ErrorKind, mut other: Self) -> Self {
        other.stack.push((input, TraceKind::Nom(kind)));
        other
    }
}

impl<'a> ContextError<&'a str> for ErrorTrace<'a> {
    fn add_context(input: &'a str, ctx: &'static str, mut other: Self) -> Self {
        other.stack.push((input, TraceKind::Context(ctx)));
        other
    }
}

impl<'a, E> FromExternalError<&'a str, E> for ErrorTrace<'a> {
    fn from_external_error(input: &'a str, kind: ErrorKind, _e: E) -> Self {
        ErrorTrace {
            stack: vec![(input, TraceKind::Nom(kind))],
        }
    }
}

// ================================================================================================
// Intermediate Structure
// ================================================================================================

/// Temporary recursive node built while parsing. The final `Tree` is
/// arena-based, so after the parse completes the recursive structure is
/// flattened via `into_tree`.
#[derive(Debug)]
struct RawNode {
    name: Option<String>,
    length: Option<f64>,
    children: Vec<RawNode>,
}

impl RawNode {
    fn into_tree(self, tree: &mut Tree) -> NodeId {
        let id = tree.add_node();
        if let Some(node) = tree.get_node_mut(id) {
            node.name = self.name;
            node.length = self.length;
        }
        for child in self.children {
            let child_id = child.into_tree(tree);
            // both ids were created by this parse, the link cannot fail
            tree.add_child(id, child_id).unwrap();
        }
        id
    }
}

// ================================================================================================
// Parsers
// ================================================================================================

// Wraps another parser, ignoring surrounding whitespace.
fn ws<'a, F, O, E>(inner: F) -> impl Parser<&'a str, Output = O, Error = E>
where
    F: Parser<&'a str, Output = O, Error = E>,
    E: ParseError<&'a str>,
{
    delimited(multispace0, inner, multispace0)
}

// A label: bare (stops at reserved characters, underscores kept as-is),
// or quoted with ' or ", where a doubled quote stands for itself.
fn label(input: &str) -> IResult<&str, String, ErrorTrace<'_>> {
    let bare = map(take_while(|c: char| !"():;,[]".contains(c)), |s: &str| {
        s.trim().to_string()
    });
    let single = map(delimited(char('\''), is_not("'"), char('\'')), |s: &str| {
        s.replace("''", "'")
    });
    let double = map(delimited(char('"'), is_not("\""), char('"')), |s: &str| {
        s.replace("\"\"", "\"")
    });

    context("label", alt((single, double, bare))).parse(input)
}

// A branch length following a colon, e.g. ":0.123" or ":1e-3". The token
// is cut off at the first structural character and handed to the float
// parser, so a malformed number fails the parse instead of backtracking.
fn branch_length(input: &str) -> IResult<&str, f64, ErrorTrace<'_>> {
    context(
        "length",
        preceded(
            ws(char(':')),
            cut(map_res(
                take_while1(|c: char| c.is_ascii_digit() || "+-.eE".contains(c)),
                |s: &str| s.parse::<f64>(),
            )),
        ),
    )
    .parse(input)
}

// Skips an optional bracket comment: [anything]. Comment payloads carry
// nothing this pipeline uses.
fn comment(input: &str) -> IResult<&str, (), ErrorTrace<'_>> {
    context(
        "comment",
        value((), opt(delimited(ws(char('[')), is_not("]"), char(']')))),
    )
    .parse(input)
}

// Recursive parser for a node and its children:
// (child1, child2, ...)Label:Length[Comment]
fn subtree(input: &str) -> IResult<&str, RawNode, ErrorTrace<'_>> {
    let clade = delimited(
        ws(char('(')),
        separated_list1(ws(char(',')), subtree),
        ws(char(')')),
    );

    let (input, children) = context("children", opt(clade)).parse(input)?;
    let (input, name) = opt(label).parse(input)?;

    // Newick allows comments before or after the length
    let (input, _) = comment(input)?;
    let (input, length) = opt(branch_length).parse(input)?;
    let (input, _) = comment(input)?;

    Ok((
        input,
        RawNode {
            name: name.filter(|n| !n.is_empty()),
            length,
            children: children.unwrap_or_default(),
        },
    ))
}

// ================================================================================================
// Entry Point
// ================================================================================================

/// Parses a single Newick tree string, terminated by ';'.
pub fn parse_newick(input: &str) -> Result<Tree, TreeError> {
    let mut parser = (ws(subtree), ws(char(';')));

    match parser.parse(input) {
        Ok((_, (raw_root, _))) => {
            let mut tree = Tree::new();
            let root_id = raw_root.into_tree(&mut tree);
            tree.set_root(root_id);
            Ok(tree)
        }
        Err(nom::Err::Error(e)) | Err(nom::Err::Failure(e)) => Err(make_tree_error(input, e)),
        Err(nom::Err::Incomplete(_)) => Err(TreeError::ParseError {
            message: "Incomplete input".to_string(),
            line: 0,
            column: 0,
            snippet: "".to_string(),
        }),
    }
}

// Converts a nom error trace into a TreeError with line/column info
fn make_tree_error(input: &str, e: ErrorTrace) -> TreeError {
    // every constructor pushes a frame, the stack is never empty
    let (remaining, _) = e.stack.first().unwrap();
    let offset = input.offset(remaining);

    let consumed = &input[..offset];
    let line = consumed.matches('\n').count() + 1;
    let column = offset - consumed.rfind('\n').map_or(0, |p| p + 1) + 1;

    let message = e
        .stack
        .iter()
        .rev()
        .map(|(_, kind)| match kind {
            TraceKind::Context(ctx) => format!("while parsing {}:", ctx),
            TraceKind::Nom(k) => format!("  error: {:?}", k),
        })
        .collect::<Vec<_>>()
        .join("\n");

    TreeError::ParseError {
        message,
        line,
        column,
        snippet: remaining.chars().take(50).collect(),
    }
}

impl Tree {
    /// Parse a Newick string into a Tree.
    ///
    /// # Example
    /// ```
    /// use mulrfs::libs::phylo::tree::Tree;
    ///
    /// let tree = Tree::from_newick("(A:0.1,B:0.2)Root;").unwrap();
    /// assert_eq!(tree.len(), 3);
    ///
    /// let result = Tree::from_newick("(A,B:invalid)C;");
    /// assert!(result.is_err());
    /// ```
    pub fn from_newick(input: &str) -> Result<Self, TreeError> {
        parse_newick(input)
    }
}
