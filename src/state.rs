//! Node state snapshots.
//!
//! Every node in a list holds exactly one [`State`] at a time. A state is an
//! immutable value: a node moves to a new state only by atomically replacing
//! the whole snapshot, never by modifying one of its fields in place.
use crate::util::FmtOption;
use core::{fmt, ptr::NonNull};
use mycelium_bitfield::{enum_from_bits, Pack128, Packing128};

enum_from_bits! {
    /// The lifecycle flag of a node.
    ///
    /// A node starts out [`Normal`](Flags::Normal), may become
    /// [`Freezing`](Flags::Freezing) while it removes its successor and
    /// return to `Normal` once that removal is done, and becomes
    /// [`Deleted`](Flags::Deleted) exactly once, after which it never changes
    /// again.
    #[derive(Debug, Eq, PartialEq, Hash)]
    pub enum Flags<u8> {
        /// The node is alive and its outgoing edge may be changed.
        Normal = 0b00,

        /// The node's outgoing edge is committed to removing its immediate
        /// successor.
        ///
        /// No operation may change the edge except to finish that removal.
        /// Any operation that observes this flag helps complete the removal
        /// before proceeding.
        Freezing = 0b01,

        /// The node has been unlinked from the list.
        ///
        /// The node's `back` link names the node that unlinked it, and its
        /// `next` link is kept only as a hint for chains of removals.
        Deleted = 0b10,
    }
}

/// An immutable snapshot of a node's links and lifecycle flag.
///
/// A `State` is a plain value: loading one copies it out of the node, and
/// installing one replaces the node's entire state with a single
/// compare-and-swap.
pub struct State<T> {
    next: Option<NonNull<T>>,
    back: Option<NonNull<T>>,
    flags: Flags,
}

// The layout of a `State` within a node's 128-bit state word. Node addresses
// are at least 4-byte aligned, so `back` is stored without its two low bits,
// which leaves room for the flags.
const FLAGS: Pack128<Flags> = Pack128::first();
const BACK: Pack128 = FLAGS.next(62);
const NEXT: Pack128 = BACK.next(64);

const ALIGN_BITS: u32 = 2;

// === impl Flags ===

impl fmt::Display for Flags {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.pad(match self {
            Self::Normal => "NORMAL",
            Self::Freezing => "FREEZING",
            Self::Deleted => "DELETED",
        })
    }
}

// === impl State ===

impl<T> State<T> {
    /// The state of a freshly created node with no successor.
    pub const NEW: Self = Self::new(None, None, Flags::Normal);

    /// Returns a new state with the given links and flags.
    #[must_use]
    pub const fn new(next: Option<NonNull<T>>, back: Option<NonNull<T>>, flags: Flags) -> Self {
        Self { next, back, flags }
    }

    /// Returns the node's successor, if any.
    ///
    /// For a [`Deleted`](Flags::Deleted) node this is the successor it had
    /// when it was unlinked.
    #[inline]
    #[must_use]
    pub fn next(&self) -> Option<NonNull<T>> {
        self.next
    }

    /// Returns the node that unlinked this node.
    ///
    /// This is only ever set on [`Deleted`](Flags::Deleted) nodes.
    #[inline]
    #[must_use]
    pub fn back(&self) -> Option<NonNull<T>> {
        self.back
    }

    /// Returns the node's lifecycle flag.
    #[inline]
    #[must_use]
    pub fn flags(&self) -> Flags {
        self.flags
    }

    /// Returns `true` if the node is alive and not removing its successor.
    #[inline]
    #[must_use]
    pub fn is_normal(&self) -> bool {
        self.flags == Flags::Normal
    }

    /// Returns `true` if this node is in the middle of removing its
    /// successor.
    #[inline]
    #[must_use]
    pub fn is_freezing(&self) -> bool {
        self.flags == Flags::Freezing
    }

    /// Returns `true` if this node has been unlinked from the list.
    #[inline]
    #[must_use]
    pub fn is_deleted(&self) -> bool {
        self.flags == Flags::Deleted
    }

    pub(crate) fn pack(self) -> u128 {
        let back = addr(self.back);
        debug_assert_eq!(
            back & ((1 << ALIGN_BITS) - 1),
            0,
            "nodes must be at least {}-byte aligned; back={:#x}",
            1 << ALIGN_BITS,
            back,
        );
        Packing128::new(0)
            .pack(self.flags, &FLAGS)
            .pack((back >> ALIGN_BITS) as u128, &BACK)
            .pack(addr(self.next) as u128, &NEXT)
            .bits()
    }

    pub(crate) fn unpack(bits: u128) -> Self {
        Self {
            next: link(NEXT.unpack(bits) as usize),
            back: link((BACK.unpack(bits) as usize) << ALIGN_BITS),
            flags: FLAGS.unpack(bits),
        }
    }
}

impl<T> Clone for State<T> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<T> Copy for State<T> {}

impl<T> PartialEq for State<T> {
    fn eq(&self, other: &Self) -> bool {
        self.next == other.next && self.back == other.back && self.flags == other.flags
    }
}

impl<T> Eq for State<T> {}

impl<T> Default for State<T> {
    fn default() -> Self {
        Self::NEW
    }
}

impl<T> fmt::Debug for State<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("State")
            .field("next", &FmtOption::new(&self.next))
            .field("back", &FmtOption::new(&self.back))
            .field("flags", &self.flags)
            .finish()
    }
}

#[inline]
fn addr<T>(link: Option<NonNull<T>>) -> usize {
    link.map_or(0, |ptr| ptr.as_ptr() as usize)
}

#[inline]
fn link<T>(addr: usize) -> Option<NonNull<T>> {
    NonNull::new(addr as *mut T)
}
