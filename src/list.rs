//! An intrusive, lock-free, singly-linked list.
//!
//! This module provides the protocol operations for a list whose nodes are
//! shared between any number of threads and modified without locks. There is
//! no list type: a list is whatever chain of nodes is reachable from a node
//! the caller treats as its head, and every operation takes the nodes it acts
//! on as arguments. Higher-level structures (sets, queues, the rungs of a skip
//! list) are built by composing these operations.
//!
//! In order to be part of a list, a type `T` must implement [`Linked`] for
//! [`Links<T>`].
//!
//! # Removal
//!
//! Removing a node takes two steps. First, its predecessor's state is
//! switched to [`Flags::Freezing`], which commits the predecessor's outgoing
//! edge to removing that one successor. Then the successor is marked
//! [`Flags::Deleted`] (recording the predecessor as its `back` link) and the
//! predecessor's edge is swung past it. Any operation that finds a
//! `Freezing` node finishes that removal before it does anything else, so a
//! thread that stalls halfway through a removal never blocks the others.
//!
//! A deleted node's `back` link lets an operation whose anchor node has been
//! removed find the nearest node that is still in the list, rather than
//! starting over from the head.
//!
//! # Safety
//!
//! The operations in this module are `unsafe` because the list does not own
//! its nodes. Callers must ensure that every node which is, or ever was,
//! reachable through another node's `next` or `back` link, or which is in use
//! by an in-flight operation, stays allocated and does not move. When a
//! removed node can be freed is up to the caller.
//!
//! # Examples
//!
//! ```
//! use hyphae::{list::{self, Links}, Linked};
//! use core::{pin::Pin, ptr::NonNull};
//!
//! #[repr(C)]
//! struct Entry {
//!     links: Links<Entry>,
//!     val: i32,
//! }
//!
//! unsafe impl Linked<Links<Entry>> for Entry {
//!     unsafe fn links(target: NonNull<Entry>) -> NonNull<Links<Entry>> {
//!         // Safety: `links` is the first field of a `repr(C)` struct.
//!         target.cast()
//!     }
//! }
//!
//! fn entry(val: i32) -> Pin<Box<Entry>> {
//!     Box::pin(Entry { links: Links::new(), val })
//! }
//!
//! let (head, a, b) = (entry(0), entry(1), entry(2));
//! let ptr = |e: &Pin<Box<Entry>>| NonNull::from(e.as_ref().get_ref());
//!
//! unsafe {
//!     list::insert(ptr(&head), ptr(&b));
//!     list::insert(ptr(&head), ptr(&a));
//!
//!     let vals = list::iter(ptr(&head))
//!         .map(|node| node.as_ref().val)
//!         .collect::<Vec<_>>();
//!     assert_eq!(vals, [1, 2]);
//!
//!     let removal = list::delete(ptr(&head), ptr(&a));
//!     assert!(removal.is_deleted_by_this_call());
//!     assert_eq!(list::next(ptr(&head)), Some(ptr(&b)));
//! }
//!
//! // the nodes outlive every operation on them, and are dropped here.
//! ```
use crate::{
    loom::atomic::{AtomicU128, Ordering::*},
    state::{Flags, State},
    util::FmtOption,
    Linked,
};
use core::{
    fmt,
    iter::FusedIterator,
    marker::{PhantomData, PhantomPinned},
    ptr::NonNull,
};

mod delete;
mod insert;

pub use self::delete::{complete_delete, delete, weak_delete, Removal};
pub use self::insert::{insert, weak_insert};

/// The state cell of a list node.
///
/// In order to be part of a list, a type must contain an instance of this
/// type, and must implement the [`Linked`] trait for `Links<Self>`.
///
/// A `Links` holds the node's current [`State`] in a single atomic word.
/// The state is only ever replaced as a whole, by one of the operations in
/// this module.
pub struct Links<T> {
    state: AtomicU128,
    _node: PhantomData<NonNull<T>>,
    /// Linked list links must always be `!Unpin`, in order to ensure that they
    /// never recieve LLVM `noalias` annotations; see also
    /// <https://github.com/rust-lang/rust/issues/63818>.
    _unpin: PhantomPinned,
}

/// Iterates over the successors of a node, helping to complete any removal
/// it passes.
///
/// This type is returned by [`iter`].
pub struct Iter<T> {
    curr: Option<NonNull<T>>,
}

// === impl Links ===

impl<T> Links<T> {
    /// Returns new links for a node with no successor.
    #[cfg(not(loom))]
    #[must_use]
    pub const fn new() -> Self {
        Self {
            // `State::NEW` packs to an all-zero word.
            state: AtomicU128::new(0),
            _node: PhantomData,
            _unpin: PhantomPinned,
        }
    }

    /// Returns new links for a node with no successor.
    #[cfg(loom)]
    #[must_use]
    pub fn new() -> Self {
        Self {
            state: AtomicU128::new(0),
            _node: PhantomData,
            _unpin: PhantomPinned,
        }
    }

    /// Returns new links for a node that is pre-linked to `next`.
    ///
    /// This is useful for building a chain of nodes before any of them is
    /// shared with other threads.
    #[must_use]
    pub fn with_next(next: Option<NonNull<T>>) -> Self {
        let links = Self::new();
        links.set_state(State::new(next, None, Flags::Normal));
        links
    }

    /// Returns the state currently installed in these links.
    #[inline]
    pub fn state(&self) -> State<T> {
        State::unpack(self.state.load(Acquire))
    }

    /// Unconditionally installs `state`.
    ///
    /// Only the owner of a node which is not yet reachable by other threads
    /// may do this.
    #[inline]
    pub(crate) fn set_state(&self, state: State<T>) {
        // Published to other threads by the release CAS that links the node.
        self.state.store(state.pack(), Relaxed);
    }
}

impl<T> Default for Links<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> fmt::Debug for Links<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let state = self.state();
        f.debug_struct("Links")
            .field("self", &format_args!("{:p}", self))
            .field("next", &FmtOption::new(&state.next()))
            .field("back", &FmtOption::new(&state.back()))
            .field("flags", &state.flags())
            .finish()
    }
}

/// # Safety
///
/// Types containing [`Links`] may be `Send`: the links only hold the
/// addresses of other nodes, and every access to them is atomic.
unsafe impl<T: Send> Send for Links<T> {}

/// # Safety
///
/// Types containing [`Links`] may be `Sync`: the links only hold the
/// addresses of other nodes, and every access to them is atomic.
unsafe impl<T: Sync> Sync for Links<T> {}

// === atomic state access ===

/// Atomically loads the current state of `node`.
///
/// This never blocks and never fails.
///
/// # Safety
///
/// `node` must point to a live node; see the [module-level
/// documentation](self#safety).
#[inline]
pub unsafe fn load_state<T: Linked<Links<T>>>(node: NonNull<T>) -> State<T> {
    links(node).state()
}

/// Replaces the state of `node` with `new`, if its current successor is
/// `expected_next` and its current flags are `expected_flags`.
///
/// Returns `true` if `new` was installed. A `false` return means that another
/// thread changed the node's state first; callers are expected to load the
/// state again and decide whether to retry.
///
/// Every change to a node's state goes through this function.
///
/// # Safety
///
/// `node` must point to a live node; see the [module-level
/// documentation](self#safety).
pub unsafe fn update_state<T: Linked<Links<T>>>(
    node: NonNull<T>,
    expected_next: Option<NonNull<T>>,
    expected_flags: Flags,
    new: State<T>,
) -> bool {
    let links = links(node);
    let bits = links.state.load(Acquire);
    let current = State::unpack(bits);
    if current.next() != expected_next || current.flags() != expected_flags {
        test_trace!(
            ?node,
            ?current,
            ?expected_next,
            %expected_flags,
            "update_state: unexpected state"
        );
        return false;
    }

    links
        .state
        .compare_exchange(bits, new.pack(), AcqRel, Acquire)
        .is_ok()
}

// === traversal ===

/// Returns the successor of `node`, or `None` if `node` is the last node in
/// the list.
///
/// If `node` is in the middle of removing its successor, that removal is
/// completed first, so the returned node is never one that is being
/// unlinked by `node`.
///
/// # Safety
///
/// `node` must point to a live node; see the [module-level
/// documentation](self#safety).
pub unsafe fn next<T: Linked<Links<T>>>(node: NonNull<T>) -> Option<NonNull<T>> {
    loop {
        let state = load_state(node);
        match (state.flags(), state.next()) {
            (Flags::Freezing, Some(del)) => complete_delete(node, del),
            (_, next) => return next,
        }
    }
}

/// Returns an iterator over the nodes following `start`.
///
/// The iterator advances with [`next`], so it helps complete every removal
/// it encounters. It does not yield `start` itself.
///
/// # Safety
///
/// Every node reachable from `start` must stay alive for as long as the
/// iterator is used; see the [module-level documentation](self#safety).
pub unsafe fn iter<T: Linked<Links<T>>>(start: NonNull<T>) -> Iter<T> {
    Iter { curr: Some(start) }
}

// === impl Iter ===

impl<T: Linked<Links<T>>> Iterator for Iter<T> {
    type Item = NonNull<T>;

    fn next(&mut self) -> Option<Self::Item> {
        let curr = self.curr?;
        // Safety: the caller of `iter` promised that every reachable node
        // stays alive while the iterator is in use.
        self.curr = unsafe { self::next(curr) };
        self.curr
    }
}

impl<T: Linked<Links<T>>> FusedIterator for Iter<T> {}

impl<T> fmt::Debug for Iter<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Iter")
            .field("curr", &FmtOption::new(&self.curr))
            .finish()
    }
}

// === helpers ===

#[inline]
unsafe fn links<'a, T: Linked<Links<T>>>(node: NonNull<T>) -> &'a Links<T> {
    T::links(node).as_ref()
}

/// Follows `back` links from a deleted `node` until reaching a node that is
/// still in the list.
///
/// Once a node is deleted its state never changes again, so each step reads
/// a permanent `back` link.
unsafe fn backtrack<T: Linked<Links<T>>>(mut node: NonNull<T>, mut state: State<T>) -> NonNull<T> {
    while state.is_deleted() {
        match state.back() {
            Some(back) => {
                node = back;
                state = load_state(back);
            }
            None => {
                debug_assert!(false, "deleted node {node:p} has no back link");
                break;
            }
        }
    }
    node
}
