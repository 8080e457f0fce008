//! Depth-bounded traversal of an element tree.
//!
//! Every walk takes a mandatory `max_depth`. The elements passed in as roots
//! sit at depth 0; a branch that would go past `max_depth` is dropped silently,
//! because the host tree can be arbitrarily deep and a walk must never hang.
//!
//! When several elements carry the same label, the first one met in
//! pre-order wins. Duplicate labels are normal (every track row has its own
//! "Mute"), so callers disambiguate by choosing the subtree they search.

use serde::{Deserialize, Serialize};
use tracing::trace;

use crate::element::{Element, Role};
use crate::error::AxError;
use crate::patterns::matches_control_name;

/// Confirmation of a successful write.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MutatedControl {
    pub name: String,
    pub value: String,
    pub role: Role,
}

/// Find the first element below `root` whose label satisfies `matches`.
///
/// Direct children are checked first; only when none of them matches does
/// the search descend into each child's subtree in order. `None` is not an
/// error, callers decide whether absence matters.
pub fn find_by_label<E, F>(root: &E, matches: F, max_depth: usize) -> Option<E>
where
    E: Element,
    F: Fn(&str) -> bool,
{
    find_by_label_inner(root, &matches, max_depth)
}

fn find_by_label_inner<E, F>(root: &E, matches: &F, remaining: usize) -> Option<E>
where
    E: Element,
    F: Fn(&str) -> bool,
{
    if remaining == 0 {
        return None;
    }

    let children = root.children();
    if let Some(hit) = children
        .iter()
        .find(|child| child.label().is_some_and(|label| matches(&label)))
    {
        return Some(hit.clone());
    }

    children
        .iter()
        .find_map(|child| find_by_label_inner(child, matches, remaining - 1))
}

/// Find the first element below `root` labelled `name` (case-insensitive, exact).
pub fn find_by_name<E: Element>(root: &E, name: &str, max_depth: usize) -> Option<E> {
    find_by_label(root, |label| matches_control_name(label, name), max_depth)
}

/// Pre-order walk over everything reachable from `roots` within `max_depth`
/// levels, calling `accumulate(element, depth)` for each element accepted by
/// `predicate`. Never stops early.
pub fn collect_matching<E, P, A>(roots: &[E], max_depth: usize, predicate: P, mut accumulate: A)
where
    E: Element,
    P: Fn(&E) -> bool,
    A: FnMut(&E, usize),
{
    for root in roots {
        collect_inner(root, 0, max_depth, &predicate, &mut accumulate);
    }
}

fn collect_inner<E, P, A>(element: &E, depth: usize, max_depth: usize, predicate: &P, accumulate: &mut A)
where
    E: Element,
    P: Fn(&E) -> bool,
    A: FnMut(&E, usize),
{
    if depth > max_depth {
        return;
    }
    if predicate(element) {
        accumulate(element, depth);
    }
    if depth == max_depth {
        return;
    }
    for child in element.children() {
        collect_inner(&child, depth + 1, max_depth, predicate, accumulate);
    }
}

/// Depth-first search for the first writable element labelled `name`, then
/// assign `new_value` to it and stop.
///
/// Matching elements with a read-only role are passed over. `Ok(None)` means
/// nothing writable matched within the bound; a match that rejects the value
/// is an error and ends the search.
pub fn find_and_mutate<E: Element>(
    roots: &[E],
    name: &str,
    new_value: &str,
    max_depth: usize,
) -> Result<Option<MutatedControl>, AxError> {
    for root in roots {
        if let Some(done) = mutate_inner(root, name, new_value, 0, max_depth)? {
            return Ok(Some(done));
        }
    }
    Ok(None)
}

fn mutate_inner<E: Element>(
    element: &E,
    name: &str,
    new_value: &str,
    depth: usize,
    max_depth: usize,
) -> Result<Option<MutatedControl>, AxError> {
    if depth > max_depth {
        return Ok(None);
    }

    if let (Some(role), Some(label)) = (element.role(), element.label()) {
        if matches_control_name(&label, name) {
            if role.is_writable() {
                let written = element.set_value(new_value)?;
                return Ok(Some(MutatedControl {
                    name: label,
                    value: written.to_string(),
                    role,
                }));
            }
            trace!(%label, %role, depth, "skipping read-only match");
        }
    }

    for child in element.children() {
        if let Some(done) = mutate_inner(&child, name, new_value, depth + 1, max_depth)? {
            return Ok(Some(done));
        }
    }
    Ok(None)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::memory::MemoryElement;
    use crate::snapshot::ElementSnapshot as Node;

    fn chain(depth: usize) -> Node {
        // group(0) -> group(1) -> ... -> slider labelled "Deep" at `depth`
        let mut node = Node::new(Role::Slider).description("Deep").value(1.0);
        for _ in 0..depth {
            node = Node::new(Role::Group).child(node);
        }
        node
    }

    #[test]
    fn find_by_label_prefers_direct_children() {
        let root = MemoryElement::from(
            Node::new(Role::Window)
                .child(Node::new(Role::Group).child(Node::new(Role::Group).description("Tracks").title("nested")))
                .child(Node::new(Role::Group).description("Tracks").title("direct")),
        );

        let found = find_by_label(&root, |l| l == "Tracks", 5).unwrap();
        assert_eq!(found.title().as_deref(), Some("direct"));
    }

    #[test]
    fn find_by_label_respects_depth() {
        let root = MemoryElement::from(chain(4));
        assert!(find_by_name(&root, "deep", 3).is_none());
        assert!(find_by_name(&root, "deep", 4).is_some());
    }

    #[test]
    fn collect_never_passes_max_depth() {
        let root = MemoryElement::from(chain(6));
        let mut depths = Vec::new();
        collect_matching(&[root.clone()], 5, |_| true, |_, depth| depths.push(depth));
        assert_eq!(depths, vec![0, 1, 2, 3, 4, 5]);

        let mut sliders = 0;
        collect_matching(&[root], 5, |e| e.role() == Some(Role::Slider), |_, _| sliders += 1);
        assert_eq!(sliders, 0);
    }

    #[test]
    fn collect_is_preorder_and_exhaustive() {
        let root = MemoryElement::from(
            Node::new(Role::Group)
                .child(Node::new(Role::Button).description("a").child(Node::new(Role::Button).description("b")))
                .child(Node::new(Role::Button).description("c")),
        );
        let mut seen = Vec::new();
        collect_matching(
            &[root],
            10,
            |e| e.role() == Some(Role::Button),
            |e, _| seen.push(e.label().unwrap()),
        );
        assert_eq!(seen, vec!["a", "b", "c"]);
    }

    #[test]
    fn mutate_first_writable_in_preorder() {
        let root = MemoryElement::from(
            Node::new(Role::Window)
                .child(Node::new(Role::PopUpButton).description("Cutoff").value("Off"))
                .child(Node::new(Role::Group).child(Node::new(Role::Slider).description("Cutoff").value(0.1)))
                .child(Node::new(Role::Slider).description("cutoff").value(0.2)),
        );

        let done = find_and_mutate(&[root.clone()], "CUTOFF", "0.75", 8).unwrap().unwrap();
        assert_eq!(done.role, Role::Slider);
        assert_eq!(done.value, "0.75");

        let snapshot = root.snapshot(8);
        assert_eq!(snapshot.children[0].value, Some("Off".into()));
        assert_eq!(snapshot.children[1].children[0].value, Some(0.75.into()));
        assert_eq!(snapshot.children[2].value, Some(0.2.into()));
    }

    #[test]
    fn mutate_reports_absence_and_rejection() {
        let root = MemoryElement::from(
            Node::new(Role::Window).child(Node::new(Role::Slider).description("Drive").value(0.0)),
        );
        assert!(find_and_mutate(&[root.clone()], "Mix", "1", 8).unwrap().is_none());
        assert!(matches!(
            find_and_mutate(&[root], "Drive", "loud", 8),
            Err(AxError::TypeMismatch { .. })
        ));
    }
}
