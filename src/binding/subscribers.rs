use super::path::{BindingPath, PathPattern};
use super::value::ModelValue;
use std::collections::HashMap;

pub type Callback = Box<dyn FnMut(&BindingPath, &ModelValue)>;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SubscriptionId(u64);

#[derive(Default)]
struct Node {
    exact: Vec<(SubscriptionId, Callback)>,
    prefix: Vec<(SubscriptionId, Callback)>,
    children: HashMap<String, Node>,
}

impl Node {
    fn remove(&mut self, id: SubscriptionId) -> bool {
        for list in [&mut self.exact, &mut self.prefix] {
            if let Some(index) = list.iter().position(|(entry, _)| *entry == id) {
                list.remove(index);
                return true;
            }
        }
        self.children.values_mut().any(|child| child.remove(id))
    }
}

/// Subscribers keyed by path segment.
///
/// A change at `a.b.c` walks the nodes `a`, `a.b`, `a.b.c`: exact listeners of
/// the final node fire first, then prefix listeners of every node on the walk,
/// shallowest first. Within one node, callbacks run in registration order.
#[derive(Default)]
pub struct SubscriberTrie {
    root: Node,
    next_id: u64,
    len: usize,
}

impl SubscriberTrie {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    pub fn insert(&mut self, pattern: &PathPattern, callback: Callback) -> SubscriptionId {
        self.next_id += 1;
        let id = SubscriptionId(self.next_id);
        let mut node = &mut self.root;
        for segment in pattern.path().segments() {
            node = node.children.entry(segment.to_string()).or_default();
        }
        match pattern {
            PathPattern::Exact(_) => node.exact.push((id, callback)),
            PathPattern::Prefix(_) => node.prefix.push((id, callback)),
        }
        self.len += 1;
        id
    }

    pub fn remove(&mut self, id: SubscriptionId) -> bool {
        let removed = self.root.remove(id);
        if removed {
            self.len -= 1;
        }
        removed
    }

    /// Delivers one change. Returns how many callbacks ran.
    pub fn notify(&mut self, path: &BindingPath, value: &ModelValue) -> usize {
        let segments: Vec<&str> = path.segments().collect();
        let mut delivered = 0;

        let exact_node = segments
            .iter()
            .try_fold(&mut self.root, |node, segment| node.children.get_mut(*segment));
        if let Some(node) = exact_node {
            for (_, callback) in node.exact.iter_mut() {
                callback(path, value);
                delivered += 1;
            }
        }

        let mut node = &mut self.root;
        for segment in &segments {
            let Some(next) = node.children.get_mut(*segment) else {
                break;
            };
            for (_, callback) in next.prefix.iter_mut() {
                callback(path, value);
                delivered += 1;
            }
            node = next;
        }

        delivered
    }
}
