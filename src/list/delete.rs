use super::{backtrack, load_state, update_state, Links};
use crate::{
    state::{Flags, State},
    util::{Backoff, FmtOption},
    Linked,
};
use core::{fmt, ptr::NonNull};

/// The outcome of removing a node from a list.
///
/// This is returned by [`delete`] and [`weak_delete`].
#[must_use]
pub enum Removal<T> {
    /// The node was removed, and this call is the one that removed it.
    ///
    /// For any node, exactly one call among all of the concurrent attempts to
    /// remove it returns `Removed`.
    Removed {
        /// The node that unlinked the removed node.
        anchor: NonNull<T>,
    },

    /// The node was removed by a concurrent call, which this call helped
    /// to complete.
    Helped {
        /// The node that unlinked the removed node.
        anchor: NonNull<T>,
    },

    /// The list changed concurrently, and the node was not removed.
    ///
    /// Only [`weak_delete`] returns this; [`delete`] retries instead.
    Retry {
        /// The node to retry from. This is the left node passed in if it is
        /// still in the list, or the nearest preceding node that is.
        anchor: NonNull<T>,
    },

    /// The node was not reachable from the node the search started at.
    ///
    /// Either the node was never in the list after the start node, or it has
    /// already been removed.
    NotFound,
}

/// Finds `target` by scanning forward from `start`, and removes it from the
/// list.
///
/// If the list changes while the removal is being attempted, the scan resumes
/// from the nearest node that is still in the list, rather than from `start`.
///
/// # Returns
///
/// - [`Removal::Removed`] if this call removed `target`.
/// - [`Removal::Helped`] if a concurrent call is removing `target`. In that
///   case, this call completes the removal before returning.
/// - [`Removal::NotFound`] if `target` is not reachable from `start`.
///
/// This function never returns [`Removal::Retry`].
///
/// # Safety
///
/// `start`, `target`, and every node reachable from `start` must be live;
/// see the [module-level documentation](super#safety).
pub unsafe fn delete<T: Linked<Links<T>>>(start: NonNull<T>, target: NonNull<T>) -> Removal<T> {
    let mut boff = Backoff::new();
    let mut left = start;
    let mut right = load_state(start).next();
    loop {
        // The scan ignores flags; `weak_delete` deals with whatever state the
        // pair is in.
        while right != Some(target) {
            match right {
                Some(node) => {
                    left = node;
                    right = load_state(node).next();
                }
                None => {
                    test_trace!(?start, ?target, "delete: not found");
                    return Removal::NotFound;
                }
            }
        }

        match weak_delete(left, target) {
            Removal::Retry { anchor } => {
                test_trace!(?left, ?target, ?anchor, "delete: retrying");
                left = anchor;
                right = load_state(anchor).next();
                boff.spin();
            }
            removal => return removal,
        }
    }
}

/// Attempts to remove `right` from between `left` and its successor, with a
/// single compare-and-swap on `left`.
///
/// That compare-and-swap freezes `left`'s outgoing edge, and is the point at
/// which a removal is decided: once it succeeds, every other operation that
/// encounters `left` helps to complete the removal.
///
/// # Returns
///
/// - [`Removal::Removed`] if this call froze `left`, and then removed
///   `right`.
/// - [`Removal::Helped`] if `left` was already frozen to remove `right`. This
///   call completes that removal before returning.
/// - [`Removal::Retry`] if `right` is no longer the successor of `left`, or
///   `left` has been removed.
///
/// This function never returns [`Removal::NotFound`].
///
/// # Safety
///
/// `left` and `right` must be live; see the [module-level
/// documentation](super#safety).
pub unsafe fn weak_delete<T: Linked<Links<T>>>(left: NonNull<T>, right: NonNull<T>) -> Removal<T> {
    if update_state(
        left,
        Some(right),
        Flags::Normal,
        State::new(Some(right), None, Flags::Freezing),
    ) {
        trace!(?left, ?right, "weak_delete: froze");
        complete_delete(left, right);
        return Removal::Removed { anchor: left };
    }

    let state = test_dbg!(load_state(left));
    if state.next() != Some(right) {
        return Removal::Retry { anchor: left };
    }

    match state.flags() {
        Flags::Freezing => {
            complete_delete(left, right);
            Removal::Helped { anchor: left }
        }
        Flags::Deleted => Removal::Retry {
            anchor: backtrack(left, state),
        },
        Flags::Normal => Removal::Retry { anchor: left },
    }
}

/// Completes the removal of `del`, after its predecessor `prev` has been
/// frozen.
///
/// This marks `del` as [`Deleted`](Flags::Deleted), recording `prev` as its
/// `back` link, and then swings `prev`'s outgoing edge past `del` and returns
/// `prev` to [`Normal`](Flags::Normal). If `del` is itself frozen to remove
/// its own successor, that removal is completed first.
///
/// Any number of threads may call this for the same pair at once; `del` is
/// marked exactly once and `prev` is unfrozen exactly once.
///
/// # Safety
///
/// - `prev` and `del` must be live; see the [module-level
///   documentation](super#safety).
/// - `prev` must have been frozen with `del` as its successor.
pub unsafe fn complete_delete<T: Linked<Links<T>>>(prev: NonNull<T>, del: NonNull<T>) {
    let mut state = load_state(del);
    while !state.is_deleted() {
        if state.is_freezing() {
            match state.next() {
                Some(next) => complete_delete(del, next),
                None => debug_assert!(false, "frozen node {del:p} has no successor"),
            }
        } else if update_state(
            del,
            state.next(),
            Flags::Normal,
            State::new(state.next(), Some(prev), Flags::Deleted),
        ) {
            trace!(?prev, ?del, next = ?state.next(), "complete_delete: marked");
            break;
        }

        // `prev` stays frozen until `del` is marked, so `del` must end up
        // deleted.
        state = load_state(del);
    }

    // Whichever thread gets here first unlinks `del`; for everyone else,
    // `prev` is no longer frozen and this fails.
    if update_state(
        prev,
        Some(del),
        Flags::Freezing,
        State::new(state.next(), None, Flags::Normal),
    ) {
        trace!(?prev, ?del, next = ?state.next(), "complete_delete: unlinked");
    }
}

// === impl Removal ===

impl<T> Removal<T> {
    /// Returns the node the operation finished at, if there is one.
    ///
    /// For [`Removed`](Self::Removed) and [`Helped`](Self::Helped), this is
    /// the node that unlinked the target. For [`Retry`](Self::Retry), it is
    /// the node to retry from.
    #[inline]
    #[must_use]
    pub fn anchor(&self) -> Option<NonNull<T>> {
        match *self {
            Self::Removed { anchor } | Self::Helped { anchor } | Self::Retry { anchor } => {
                Some(anchor)
            }
            Self::NotFound => None,
        }
    }

    /// Returns `true` if the target node has been removed, whether by this
    /// call or by a concurrent one.
    #[inline]
    #[must_use]
    pub fn is_deleted(&self) -> bool {
        matches!(self, Self::Removed { .. } | Self::Helped { .. })
    }

    /// Returns `true` if this call is the one that removed the target node.
    #[inline]
    #[must_use]
    pub fn is_deleted_by_this_call(&self) -> bool {
        matches!(self, Self::Removed { .. })
    }
}

impl<T> Clone for Removal<T> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<T> Copy for Removal<T> {}

impl<T> PartialEq for Removal<T> {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Self::Removed { anchor: a }, Self::Removed { anchor: b })
            | (Self::Helped { anchor: a }, Self::Helped { anchor: b })
            | (Self::Retry { anchor: a }, Self::Retry { anchor: b }) => a == b,
            (Self::NotFound, Self::NotFound) => true,
            _ => false,
        }
    }
}

impl<T> Eq for Removal<T> {}

impl<T> fmt::Debug for Removal<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Removed { .. } => "Removed",
            Self::Helped { .. } => "Helped",
            Self::Retry { .. } => "Retry",
            Self::NotFound => return f.write_str("NotFound"),
        };
        f.debug_struct(name)
            .field("anchor", &FmtOption::new(&self.anchor()))
            .finish()
    }
}
