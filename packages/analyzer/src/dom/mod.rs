//! DOM model
//!
//! Typed element trees parsed from HTML or JSX sources. Fragments own
//! their nodes in an arena; parent links are index back-edges, so the
//! tree stays acyclic by construction.

pub mod model;
pub mod parser;
pub mod serializer;
pub mod validator;

pub use model::{DomFragment, DomNode, ElementData, NodeData, NodeId, SimpleSelector};
pub use parser::MarkupParser;
