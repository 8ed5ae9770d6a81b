#![cfg_attr(docsrs, doc = include_str!("../README.md"))]
#![cfg_attr(docsrs, feature(doc_cfg, doc_auto_cfg))]
#![cfg_attr(docsrs, deny(missing_docs))]
#![cfg_attr(not(any(feature = "std", test)), no_std)]

#[cfg(test)]
extern crate std;

#[macro_use]
pub(crate) mod util;

pub mod list;
pub mod state;

#[doc(inline)]
pub use list::{Iter, Links, Removal};
#[doc(inline)]
pub use state::{Flags, State};

pub(crate) mod loom;

use core::ptr::NonNull;

/// Trait implemented by types which can be nodes in a [lock-free list].
///
/// In order to be part of a list, a type must contain a [`list::Links`]
/// struct, which stores the node's state, and must be able to return a
/// pointer to it.
///
/// # Safety
///
/// This is unsafe to implement because it's the implementation's
/// responsibility to ensure that types implementing this trait are valid list
/// nodes. In particular:
///
/// - Implementations **must** ensure that implementors are pinned in memory
///   while they are reachable from a list. A node that is, or ever was, linked
///   into a list may not be deallocated or moved while any other thread may
///   still reach it, including through the `back` link of a removed node.
/// - The type implementing this trait **must not** implement [`Unpin`].
/// - Implementors must be aligned to at least 4 bytes, since the low bits of
///   node addresses are used to store the node's flags.
///
/// Failure to uphold these invariants will result in corruption of the list,
/// including dangling pointers.
///
/// [lock-free list]: crate::list
/// [`Unpin`]: core::marker::Unpin
pub unsafe trait Linked<L> {
    /// Return the links of the node pointed to by `ptr`.
    ///
    /// # Safety
    ///
    /// This function is safe to call when the pointer points to a valid
    /// instance of `Self` (e.g. it does not dangle).
    unsafe fn links(ptr: NonNull<Self>) -> NonNull<L>;
}
