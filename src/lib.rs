//! Self-balancing binary search tree collections for Rust.
//!
//! This crate provides [`AvlTreeMap`], an ordered map that keeps itself
//! height-balanced with AVL rotations, and [`BstTreeMap`], the plain
//! (unbalanced) binary-search-tree substrate it is built on. Both mirror the
//! standard library's `BTreeMap` API:
//!
//! - [`AvlTreeMap`] - O(log n) lookup, insertion, and removal, regardless of
//!   the order in which keys arrive
//! - [`BstTreeMap`] - O(height) operations with no rebalancing; useful when
//!   the tree shape itself is of interest
//! - [`is_balanced`](AvlTreeMap::is_balanced) - an independent O(n) audit of
//!   the AVL height-balance property, available on both maps
//!
//! # Example
//!
//! ```
//! use sabi_tree::{AvlTreeMap, BstTreeMap};
//!
//! let mut scores = AvlTreeMap::new();
//! scores.insert("Alice", 100);
//! scores.insert("Bob", 85);
//! scores.insert("Carol", 92);
//!
//! // Standard BTreeMap operations work as expected
//! assert_eq!(scores.get(&"Bob"), Some(&85));
//! assert_eq!(scores.len(), 3);
//!
//! // The tree stays height-balanced no matter the insertion order
//! assert!(scores.is_balanced());
//!
//! // The unbalanced substrate takes whatever shape insertion order dictates
//! let chain: BstTreeMap<i32, ()> = (0..10).map(|k| (k, ())).collect();
//! assert!(!chain.is_balanced());
//! ```
//!
//! # Features
//!
//! - **`no_std` compatible** - Only requires `alloc`, no standard library dependency
//! - **Drop-in replacement** - API mirrors `std::collections::BTreeMap`
//! - **Bounded rebalancing** - insertion restores balance with at most one
//!   rotation; removal rotates only where the height actually shrank
//! - **Arena storage** - nodes live in contiguous, index-linked arenas with
//!   slot reuse, so no per-node allocation
//!
//! # Implementation
//!
//! Both maps share one node representation: key, value handle, parent and
//! child links, and a balance indicator. [`BstTreeMap`] never touches the
//! indicator; [`AvlTreeMap`] layers the rotation and fix-up logic on top of
//! the same structural primitives, keeping every indicator equal to the true
//! height difference (right minus left) of its node.

#![no_std]
// These forbid rules and lint groups are meant to be very restrictive.
// NOTE: We have to allow unsafe code in order to performantly match BTreeMap's functionality.
// #![forbid(unsafe_code)]
#![forbid(keyword_idents)]
#![forbid(non_ascii_idents)]
#![forbid(unreachable_pub)]
#![warn(clippy::all)]
#![warn(clippy::cargo)]
#![warn(clippy::pedantic)]
// Enable coverage attributes for nightly builds.
#![cfg_attr(coverage_nightly, feature(coverage_attribute))]

extern crate alloc;

mod raw;

pub mod avltree_map;
pub mod bsttree_map;

pub use avltree_map::AvlTreeMap;
pub use bsttree_map::BstTreeMap;
