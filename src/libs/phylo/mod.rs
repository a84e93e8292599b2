pub mod error;
pub mod node;
pub mod parser;
pub mod tree;
pub mod writer;

pub use error::TreeError;
pub use node::{Node, NodeId};
pub use tree::Tree;
