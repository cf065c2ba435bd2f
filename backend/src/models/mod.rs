pub mod page;
pub mod tree;
