pub mod attribution;
pub mod combinator;
pub mod tree;
