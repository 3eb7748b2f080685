mod arena;
mod handle;
mod node;
mod raw_bplus_tree;
mod rebalance;
mod split;

pub(crate) use handle::Handle;
pub(crate) use raw_bplus_tree::RawBPlusTree;
