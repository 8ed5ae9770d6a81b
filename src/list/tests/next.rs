use super::*;

#[test]
fn last_node() {
    let _trace = trace_init();
    let node = entry(10);

    assert_eq!(unsafe { next(ptr(&node)) }, None);
    assert_eq!(node.val, 10);
    assert_state!(node == { next: None, back: None, flags: Normal });
}

#[test]
fn follows_links() {
    let [n1, n2, n3] = three_nodes(Flags::Normal, Flags::Normal, Flags::Normal);

    unsafe {
        assert_eq!(next(ptr(&n1)), Some(ptr(&n2)));
        assert_eq!(next(ptr(&n2)), Some(ptr(&n3)));
        assert_eq!(next(ptr(&n3)), None);
    }
}

#[test]
fn unlinks_removed_last_node() {
    let _trace = trace_init();
    let (n1, n2) = (entry(10), entry(20));
    set(&n1, Some(&n2), None, Flags::Freezing);
    set(&n2, None, Some(&n1), Flags::Deleted);

    assert_eq!(unsafe { next(ptr(&n1)) }, None);

    assert_state!(n1 == { next: None, back: None, flags: Normal });
    assert_state!(n2 == { next: None, back: Some(&n1), flags: Deleted });
}

#[test]
fn unlinks_removed_middle_node() {
    let _trace = trace_init();
    let [n1, n2, n3] = three_nodes(Flags::Freezing, Flags::Deleted, Flags::Normal);
    set(&n2, Some(&n3), Some(&n1), Flags::Deleted);

    assert_eq!(unsafe { next(ptr(&n1)) }, Some(ptr(&n3)));

    assert_state!(n1 == { next: Some(&n3), back: None, flags: Normal });
    assert_state!(n2 == { next: Some(&n3), back: Some(&n1), flags: Deleted });
    assert_state!(n3 == { next: None, back: None, flags: Normal });
}

#[test]
fn completes_frozen_edge() {
    let _trace = trace_init();
    let [n1, n2, n3] = three_nodes(Flags::Freezing, Flags::Normal, Flags::Normal);

    assert_eq!(unsafe { next(ptr(&n1)) }, Some(ptr(&n3)));

    assert_state!(n1 == { next: Some(&n3), back: None, flags: Normal });
    assert_state!(n2 == { next: Some(&n3), back: Some(&n1), flags: Deleted });
}

#[test]
fn iter_completes_every_frozen_edge() {
    let _trace = trace_init();
    let [n1, n2, n3] = three_nodes(Flags::Normal, Flags::Freezing, Flags::Normal);
    let n4 = entry(40);
    set(&n3, Some(&n4), None, Flags::Normal);

    assert_eq!(collect_vals(&n1), [20, 40]);

    assert_state!(n2 == { next: Some(&n4), back: None, flags: Normal });
    assert_state!(n3 == { next: Some(&n4), back: Some(&n2), flags: Deleted });
}
