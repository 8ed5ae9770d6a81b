use super::{backtrack, complete_delete, links, load_state, update_state, Links};
use crate::{
    state::{Flags, State},
    util::Backoff,
    Linked,
};
use core::ptr::NonNull;

/// Links `node` into the list immediately after `anchor`.
///
/// This retries [`weak_insert`] against `anchor`'s current successor until it
/// succeeds, helping to complete any removal it runs into along the way. If
/// `anchor` is removed from the list concurrently, the insertion moves to the
/// nearest preceding node that is still in the list.
///
/// Returns the node that `node` was actually linked after.
///
/// # Safety
///
/// - `anchor` and every node reachable from it must be live; see the
///   [module-level documentation](super#safety).
/// - `node` must not be part of any list, and no other operation may be
///   inserting it concurrently. The caller owns `node` exclusively until this
///   function returns.
pub unsafe fn insert<T: Linked<Links<T>>>(anchor: NonNull<T>, node: NonNull<T>) -> NonNull<T> {
    let mut anchor = anchor;
    let mut boff = Backoff::new();
    loop {
        let right = load_state(anchor).next();
        match weak_insert(anchor, right, node) {
            Ok(anchor) => return anchor,
            Err(next_anchor) => {
                test_trace!(?anchor, ?next_anchor, ?node, "insert: retrying");
                anchor = next_anchor;
                boff.spin();
            }
        }
    }
}

/// Attempts to link `node` between `left` and `right` with a single
/// compare-and-swap on `left`.
///
/// The attempt only succeeds if `left` is [`Normal`](Flags::Normal) and its
/// successor is still `right`. This function does not retry, and does not
/// look for a new position if the list has changed.
///
/// # Returns
///
/// - [`Ok`]`(left)` if `node` was linked between `left` and `right`.
/// - [`Err`]`(anchor)` if the list changed concurrently. `anchor` is the node
///   to retry from: `left` itself if it is still in the list, or the nearest
///   preceding node that is, if `left` has been removed. If `left` was in the
///   middle of removing `right`, that removal is completed before returning.
///
/// # Safety
///
/// - `left` and `right` must be live; see the [module-level
///   documentation](super#safety).
/// - `node` must not be part of any list, and no other operation may be
///   inserting it concurrently.
pub unsafe fn weak_insert<T: Linked<Links<T>>>(
    left: NonNull<T>,
    right: Option<NonNull<T>>,
    node: NonNull<T>,
) -> Result<NonNull<T>, NonNull<T>> {
    debug_assert_ne!(left, node, "a node cannot be inserted after itself");
    debug_assert_ne!(right, Some(node), "a node cannot be inserted before itself");

    // The node must be fully formed before it becomes reachable.
    links(node).set_state(State::new(right, None, Flags::Normal));

    if update_state(
        left,
        right,
        Flags::Normal,
        State::new(Some(node), None, Flags::Normal),
    ) {
        trace!(?left, ?node, ?right, "weak_insert: linked");
        return Ok(left);
    }

    let state = test_dbg!(load_state(left));
    if state.next() != right {
        return Err(left);
    }

    match state.flags() {
        Flags::Freezing => {
            if let Some(right) = right {
                complete_delete(left, right);
            }
            Err(left)
        }
        Flags::Deleted => Err(backtrack(left, state)),
        Flags::Normal => Err(left),
    }
}
