//! Keyed child diffing: node identity follows the key, and reorders
//! move existing host nodes instead of remounting them.

use std::collections::HashMap;

use veld::{Runtime, VNode};
use veld_dom::NodeId;

fn item(key: &str) -> VNode {
    VNode::element("li").key(key).child(key).build().unwrap()
}

fn list(keys: &[&str]) -> VNode {
    let mut b = VNode::element("ul").keyed();
    for k in keys {
        b = b.child(item(k));
    }
    b.build().unwrap()
}

fn html(keys: &[&str]) -> String {
    let mut out = String::from("<ul>");
    for k in keys {
        out.push_str(&format!("<li>{k}</li>"));
    }
    out.push_str("</ul>");
    out
}

/// Map key to host node for the current list.
fn ids_by_key(rt: &Runtime, ul: NodeId, keys: &[&str]) -> HashMap<String, NodeId> {
    let children = rt.document().children(ul);
    assert_eq!(children.len(), keys.len());
    keys.iter()
        .map(|k| k.to_string())
        .zip(children)
        .collect()
}

fn setup(keys: &[&str]) -> (Runtime, NodeId, NodeId) {
    let rt = Runtime::new();
    let container = rt.create_container("div").unwrap();
    rt.render(Some(list(keys)), container).unwrap();
    let ul = rt.document().first_child(container).unwrap();
    (rt, container, ul)
}

#[test]
fn test_keyed_mount_order() {
    let (rt, container, _) = setup(&["a", "b", "c"]);
    assert_eq!(rt.container_html(container), html(&["a", "b", "c"]));
}

#[test]
fn test_reverse_preserves_nodes() {
    let (rt, container, ul) = setup(&["a", "b", "c", "d"]);
    let before = ids_by_key(&rt, ul, &["a", "b", "c", "d"]);
    rt.render(Some(list(&["d", "c", "b", "a"])), container).unwrap();
    let after = ids_by_key(&rt, ul, &["d", "c", "b", "a"]);
    assert_eq!(before, after, "reorder must move nodes, not remount them");
    assert_eq!(rt.container_html(container), html(&["d", "c", "b", "a"]));
}

#[test]
fn test_tail_moves_to_front() {
    let (rt, container, ul) = setup(&["a", "b", "c", "d"]);
    let before = ids_by_key(&rt, ul, &["a", "b", "c", "d"]);
    rt.render(Some(list(&["d", "a", "b", "c"])), container).unwrap();
    let after = ids_by_key(&rt, ul, &["d", "a", "b", "c"]);
    assert_eq!(before, after);
    assert_eq!(rt.container_html(container), html(&["d", "a", "b", "c"]));
}

#[test]
fn test_head_moves_to_back() {
    let (rt, container, ul) = setup(&["a", "b", "c", "d"]);
    let before = ids_by_key(&rt, ul, &["a", "b", "c", "d"]);
    rt.render(Some(list(&["b", "c", "d", "a"])), container).unwrap();
    let after = ids_by_key(&rt, ul, &["b", "c", "d", "a"]);
    assert_eq!(before, after);
    assert_eq!(rt.container_html(container), html(&["b", "c", "d", "a"]));
}

#[test]
fn test_swap_ends() {
    let (rt, container, ul) = setup(&["a", "b", "c", "d"]);
    let before = ids_by_key(&rt, ul, &["a", "b", "c", "d"]);
    rt.render(Some(list(&["d", "b", "c", "a"])), container).unwrap();
    let after = ids_by_key(&rt, ul, &["d", "b", "c", "a"]);
    assert_eq!(before, after);
    assert_eq!(rt.container_html(container), html(&["d", "b", "c", "a"]));
}

#[test]
fn test_insert_middle() {
    let (rt, container, ul) = setup(&["a", "b", "d"]);
    let before = ids_by_key(&rt, ul, &["a", "b", "d"]);
    rt.render(Some(list(&["a", "b", "c", "d"])), container).unwrap();
    let after = ids_by_key(&rt, ul, &["a", "b", "c", "d"]);
    for k in ["a", "b", "d"] {
        assert_eq!(before[k], after[k], "key {k} should keep its node");
    }
    assert_eq!(rt.container_html(container), html(&["a", "b", "c", "d"]));
}

#[test]
fn test_remove_middle() {
    let (rt, container, ul) = setup(&["a", "b", "c", "d"]);
    let before = ids_by_key(&rt, ul, &["a", "b", "c", "d"]);
    rt.render(Some(list(&["a", "c", "d"])), container).unwrap();
    let after = ids_by_key(&rt, ul, &["a", "c", "d"]);
    for k in ["a", "c", "d"] {
        assert_eq!(before[k], after[k]);
    }
    assert_eq!(rt.container_html(container), html(&["a", "c", "d"]));
}

#[test]
fn test_prepend_and_append() {
    let (rt, container, ul) = setup(&["m", "n"]);
    let before = ids_by_key(&rt, ul, &["m", "n"]);
    rt.render(Some(list(&["l", "m", "n", "o"])), container).unwrap();
    let after = ids_by_key(&rt, ul, &["l", "m", "n", "o"]);
    assert_eq!(before["m"], after["m"]);
    assert_eq!(before["n"], after["n"]);
    assert_eq!(rt.container_html(container), html(&["l", "m", "n", "o"]));
}

#[test]
fn test_shuffle_with_insert_and_remove() {
    let (rt, container, ul) = setup(&["a", "b", "c", "d", "e", "f", "g"]);
    let before = ids_by_key(&rt, ul, &["a", "b", "c", "d", "e", "f", "g"]);
    let next = ["d", "a", "x", "g", "f", "b"];
    rt.render(Some(list(&next)), container).unwrap();
    let after = ids_by_key(&rt, ul, &next);
    for k in ["a", "b", "d", "f", "g"] {
        assert_eq!(before[k], after[k], "surviving key {k} should keep its node");
    }
    assert!(!before.values().any(|&id| id == after["x"]));
    assert_eq!(rt.container_html(container), html(&next));
}

#[test]
fn test_no_overlap_rebuilds() {
    let (rt, container, _) = setup(&["a", "b", "c"]);
    rt.render(Some(list(&["x", "y", "z"])), container).unwrap();
    assert_eq!(rt.container_html(container), html(&["x", "y", "z"]));
}

#[test]
fn test_clear_and_refill() {
    let (rt, container, ul) = setup(&["a", "b"]);
    rt.render(Some(VNode::element("ul").keyed().build().unwrap()), container)
        .unwrap();
    assert_eq!(rt.document().child_count(ul), 0);
    rt.render(Some(list(&["a", "b", "c"])), container).unwrap();
    assert_eq!(rt.container_html(container), html(&["a", "b", "c"]));
}

#[test]
fn test_patch_within_reorder() {
    // Content updates ride along with the move.
    let rt = Runtime::new();
    let container = rt.create_container("div").unwrap();
    let versioned = |key: &str, text: &str| {
        VNode::element("li").key(key).child(text).build().unwrap()
    };
    rt.render(
        Some(
            VNode::element("ul")
                .keyed()
                .child(versioned("a", "a1"))
                .child(versioned("b", "b1"))
                .build()
                .unwrap(),
        ),
        container,
    )
    .unwrap();
    rt.render(
        Some(
            VNode::element("ul")
                .keyed()
                .child(versioned("b", "b2"))
                .child(versioned("a", "a2"))
                .build()
                .unwrap(),
        ),
        container,
    )
    .unwrap();
    assert_eq!(
        rt.container_html(container),
        "<ul><li>b2</li><li>a2</li></ul>"
    );
}

#[test]
fn test_numeric_keys() {
    let rt = Runtime::new();
    let container = rt.create_container("div").unwrap();
    let num = |n: i64| VNode::element("li").key(n).child(n.to_string()).build().unwrap();
    rt.render(
        Some(
            VNode::element("ul")
                .keyed()
                .child(num(1))
                .child(num(2))
                .build()
                .unwrap(),
        ),
        container,
    )
    .unwrap();
    rt.render(
        Some(
            VNode::element("ul")
                .keyed()
                .child(num(2))
                .child(num(1))
                .build()
                .unwrap(),
        ),
        container,
    )
    .unwrap();
    assert_eq!(rt.container_html(container), "<ul><li>2</li><li>1</li></ul>");
}

#[test]
fn test_regime_flip_rebuilds() {
    let rt = Runtime::new();
    let container = rt.create_container("div").unwrap();
    rt.render(Some(list(&["a", "b"])), container).unwrap();
    // Same shape without keys flips to the positional regime.
    let plain = VNode::element("ul")
        .non_keyed()
        .child(VNode::element("li").child("p").build().unwrap())
        .child(VNode::element("li").child("q").build().unwrap())
        .build()
        .unwrap();
    rt.render(Some(plain), container).unwrap();
    assert_eq!(rt.container_html(container), "<ul><li>p</li><li>q</li></ul>");
}

#[test]
fn test_implicit_keyed_detection() {
    // Children carrying keys select the keyed regime without an
    // explicit marker.
    let rt = Runtime::new();
    let container = rt.create_container("div").unwrap();
    let build = |order: [&str; 2]| {
        VNode::element("ul")
            .child(item(order[0]))
            .child(item(order[1]))
            .build()
            .unwrap()
    };
    rt.render(Some(build(["a", "b"])), container).unwrap();
    let ul = rt.document().first_child(container).unwrap();
    let before = ids_by_key(&rt, ul, &["a", "b"]);
    rt.render(Some(build(["b", "a"])), container).unwrap();
    let after = ids_by_key(&rt, ul, &["b", "a"]);
    assert_eq!(before, after);
}
