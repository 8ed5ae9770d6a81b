use super::*;
use crate::loom::thread;
use rand::{Rng, SeedableRng};
use rand_xoshiro::Xoshiro256PlusPlus;
use std::collections::BTreeSet;

const THREADS: usize = if_miri(2, 8);
const RANGE: usize = if_miri(50, 2000);

/// A node pointer that can be moved to another thread.
#[derive(Copy, Clone, Debug)]
struct Ptr(NonNull<Entry>);

// Safety: every node outlives the threads that share it.
unsafe impl Send for Ptr {}

fn alloc(val: i32) -> NonNull<Entry> {
    let entry = Box::new(Entry {
        links: Links::new(),
        val,
    });
    NonNull::from(Box::leak(entry))
}

/// Inserts this thread's range of values after `root`, in descending order,
/// while removing nodes at random positions near the front of the list.
///
/// Returns every node this thread allocated, and the values of the nodes this
/// thread removed.
fn churn(root: Ptr, thread: usize) -> (Vec<Ptr>, Vec<i32>) {
    let mut rng = Xoshiro256PlusPlus::seed_from_u64(thread as u64);
    let begin = thread * RANGE;
    let mut nodes = Vec::with_capacity(RANGE);
    let mut removed = Vec::new();

    for v in (begin..begin + RANGE).rev() {
        let node = alloc(v as i32);
        nodes.push(Ptr(node));
        unsafe {
            insert(root.0, node);

            let mut skip = rng.gen_range(0..10i32) - 4;
            let (mut prev, mut curr) = (None, Some(root.0));
            while skip > 0 {
                let Some(node) = curr else { break };
                prev = curr;
                curr = next(node);
                skip -= 1;
            }

            if let (Some(left), Some(right)) = (prev, curr) {
                if weak_delete(left, right).is_deleted_by_this_call() {
                    removed.push(val(right));
                }
            }
        }
    }

    (nodes, removed)
}

#[test]
fn concurrent_insert_and_delete() {
    let root = alloc(-1);

    let threads = (0..THREADS)
        .map(|i| {
            let root = Ptr(root);
            thread::spawn(move || churn(root, i))
        })
        .collect::<Vec<_>>();

    let mut nodes = Vec::new();
    let mut removed = Vec::new();
    for thread in threads {
        let (n, r) = thread.join().unwrap();
        nodes.extend(n);
        removed.extend(r);
    }

    // each node is removed at most once.
    let removed_set = removed.iter().copied().collect::<BTreeSet<_>>();
    assert_eq!(removed_set.len(), removed.len(), "a node was removed twice");

    // no cycles, and every node left in the list is normal.
    let mut seen = BTreeSet::new();
    let mut vals = Vec::new();
    let mut curr = Some(root);
    while let Some(node) = curr {
        assert!(
            seen.insert(node.as_ptr() as usize),
            "cycle at {}",
            val(node)
        );
        let state = unsafe { load_state(node) };
        assert!(state.is_normal(), "{} is {}", val(node), state.flags());
        if node != root {
            vals.push(val(node));
        }
        curr = state.next();
    }

    // each thread's values are in ascending order, minus the removed ones.
    for thread in 0..THREADS {
        let range = (thread * RANGE) as i32..((thread + 1) * RANGE) as i32;
        let actual = vals
            .iter()
            .copied()
            .filter(|val| range.contains(val))
            .collect::<Vec<_>>();
        let expected = range
            .clone()
            .filter(|val| !removed_set.contains(val))
            .collect::<Vec<_>>();
        assert_eq!(actual, expected, "values from thread {thread}");
    }
    assert_eq!(vals.len(), THREADS * RANGE - removed.len());

    for Ptr(node) in nodes {
        if removed_set.contains(&val(node)) {
            assert!(
                unsafe { load_state(node) }.is_deleted(),
                "{} is not deleted",
                val(node)
            );
        }
        drop(unsafe { Box::from_raw(node.as_ptr()) });
    }
    drop(unsafe { Box::from_raw(root.as_ptr()) });
}
