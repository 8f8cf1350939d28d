pub mod byte_tree;

pub use byte_tree::ByteTree;
