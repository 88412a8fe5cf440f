//! Child normalization.
//!
//! Runs once at build time so the mount and patch walks never see raw
//! input. Non-keyed lists keep their nesting and represent invisible
//! children as holes, which keeps positional identity stable when a
//! conditional child toggles. Keyed lists are flattened and every
//! entry must carry a key.

use crate::error::{Error, Result};
use crate::vnode::{Child, Children, VChild, VNode};

pub(crate) fn normalize_children(children: Vec<Child>, keyed: bool) -> Result<Children> {
    if keyed {
        let mut flat = Vec::new();
        for child in children {
            flatten_keyed(child, &mut flat)?;
        }
        return Ok(Children::Many(flat));
    }
    let mut children = children;
    if children.len() > 1 {
        let mut out = Vec::with_capacity(children.len());
        for c in children {
            out.push(normalize_child(c)?);
        }
        return Ok(Children::Many(out));
    }
    Ok(match children.pop() {
        None | Some(Child::Empty) | Some(Child::Bool(_)) => Children::None,
        Some(Child::Text(t)) => Children::Text(t),
        Some(Child::Num(n)) => Children::Text(n.to_string().into()),
        Some(Child::Node(v)) => Children::One(v),
        Some(Child::List(list)) => {
            let mut out = Vec::with_capacity(list.len());
            for c in list {
                out.push(normalize_child(c)?);
            }
            Children::Many(out)
        }
    })
}

fn normalize_child(child: Child) -> Result<VChild> {
    Ok(match child {
        Child::Empty | Child::Bool(_) => VChild::Hole,
        Child::Text(t) => VChild::Node(VNode::text(t)),
        Child::Num(n) => VChild::Node(VNode::text(n.to_string())),
        Child::Node(v) => VChild::Node(v),
        Child::List(list) => {
            let mut out = Vec::with_capacity(list.len());
            for c in list {
                out.push(normalize_child(c)?);
            }
            VChild::Many(out)
        }
    })
}

fn flatten_keyed(child: Child, out: &mut Vec<VChild>) -> Result<()> {
    match child {
        // Invisible entries vanish; keyed identity comes from keys,
        // not positions.
        Child::Empty | Child::Bool(_) => {}
        Child::Text(_) | Child::Num(_) => return Err(Error::MissingKey),
        Child::Node(v) => {
            if v.key().is_none() {
                return Err(Error::MissingKey);
            }
            out.push(VChild::Node(v));
        }
        Child::List(list) => {
            for c in list {
                flatten_keyed(c, out)?;
            }
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_single_invisible_is_none() {
        assert!(matches!(
            normalize_children(vec![Child::Empty], false),
            Ok(Children::None)
        ));
    }

    #[test]
    fn test_number_becomes_text() {
        let Ok(Children::Text(t)) = normalize_children(vec![Child::Num(42)], false) else {
            panic!("expected text children");
        };
        assert_eq!(t.as_ref(), "42");
    }

    #[test]
    fn test_keyed_flattens_nested_lists() {
        let li = |k: i64| {
            VNode::element("li").key(k).build().unwrap()
        };
        let children = vec![
            Child::Node(li(1)),
            Child::List(vec![Child::Node(li(2)), Child::Node(li(3))]),
        ];
        let Ok(Children::Many(flat)) = normalize_children(children, true) else {
            panic!("expected list children");
        };
        assert_eq!(flat.len(), 3);
        assert!(flat.iter().all(|c| matches!(c, VChild::Node(_))));
    }

    #[test]
    fn test_nonkeyed_preserves_nesting() {
        let children = vec![
            Child::Node(VNode::text("a")),
            Child::List(vec![Child::Node(VNode::text("b"))]),
        ];
        let Ok(Children::Many(out)) = normalize_children(children, false) else {
            panic!("expected list children");
        };
        assert!(matches!(out[0], VChild::Node(_)));
        assert!(matches!(&out[1], VChild::Many(inner) if inner.len() == 1));
    }
}
