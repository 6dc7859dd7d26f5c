mod arena;
mod handle;
mod node;
mod raw_avltree_map;
mod raw_bsttree_map;

pub(crate) use handle::Handle;
pub(crate) use raw_avltree_map::RawAvlTreeMap;
pub(crate) use raw_bsttree_map::RawBstTreeMap;
