//! Union-find over node keys.
//!
//! Used to merge shared boundary nodes declared independently by several
//! networks into one canonical identity.

use std::collections::HashMap;

#[derive(Debug, Clone, Default)]
pub struct NodeUnion {
    keys: Vec<String>,
    parent: Vec<usize>,
    index: HashMap<String, usize>,
}

impl NodeUnion {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a key as its own singleton set (no-op if already present).
    pub fn insert(&mut self, key: &str) -> usize {
        if let Some(&i) = self.index.get(key) {
            return i;
        }
        let i = self.keys.len();
        self.keys.push(key.to_string());
        self.parent.push(i);
        self.index.insert(key.to_string(), i);
        i
    }

    pub fn contains(&self, key: &str) -> bool {
        self.index.contains_key(key)
    }

    pub fn len(&self) -> usize {
        self.keys.len()
    }

    pub fn is_empty(&self) -> bool {
        self.keys.is_empty()
    }

    fn root(&mut self, mut i: usize) -> usize {
        let mut r = i;
        while self.parent[r] != r {
            r = self.parent[r];
        }
        // path compression
        while self.parent[i] != r {
            let next = self.parent[i];
            self.parent[i] = r;
            i = next;
        }
        r
    }

    /// Canonical representative of `key`'s set. Unknown keys are inserted.
    pub fn find(&mut self, key: &str) -> String {
        let i = self.insert(key);
        let r = self.root(i);
        self.keys[r].clone()
    }

    /// Merge the sets of `a` and `b`; `a`'s representative survives.
    pub fn union(&mut self, a: &str, b: &str) -> String {
        let ia = self.insert(a);
        let ib = self.insert(b);
        let ra = self.root(ia);
        let rb = self.root(ib);
        if ra != rb {
            self.parent[rb] = ra;
        }
        self.keys[ra].clone()
    }

    pub fn connected(&mut self, a: &str, b: &str) -> bool {
        self.find(a) == self.find(b)
    }

    /// All sets, ordered by their earliest member, members in insertion order.
    pub fn groups(&mut self) -> Vec<Vec<String>> {
        let mut slot_of_root: HashMap<usize, usize> = HashMap::new();
        let mut groups: Vec<Vec<String>> = Vec::new();
        for i in 0..self.keys.len() {
            let r = self.root(i);
            let slot = *slot_of_root.entry(r).or_insert_with(|| {
                groups.push(Vec::new());
                groups.len() - 1
            });
            groups[slot].push(self.keys[i].clone());
        }
        groups
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn find_on_fresh_key_is_identity() {
        let mut u = NodeUnion::new();
        assert_eq!(u.find("a"), "a");
        assert_eq!(u.len(), 1);
    }

    #[test]
    fn union_keeps_left_representative() {
        let mut u = NodeUnion::new();
        assert_eq!(u.union("a", "b"), "a");
        assert_eq!(u.union("c", "b"), "c");
        assert_eq!(u.find("a"), "c");
        assert!(u.connected("a", "b"));
    }

    #[test]
    fn groups_are_deterministic() {
        let mut u = NodeUnion::new();
        u.union("x", "y");
        u.insert("z");
        u.union("w", "y");
        let groups = u.groups();
        assert_eq!(groups.len(), 2);
        assert!(groups.iter().any(|g| g == &vec!["x", "y", "w"]));
        assert!(groups.iter().any(|g| g == &vec!["z"]));
    }
}
