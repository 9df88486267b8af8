//! Bounded trie: conjunto de paths (secuencias de segmentos) con cota de
//! hojas. Al superar la cota se colapsa la rama más grande; los paths
//! colapsados quedan marcados como truncados.

use std::collections::btree_map::Entry;
use std::collections::{BTreeMap, BTreeSet};

use serde::{Deserialize, Serialize};

use super::MetricAggregate;
use crate::constants::DEFAULT_BOUNDED_TRIE_SIZE;

/// Path aplanado. `truncated` indica que el path es un prefijo colapsado.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct TriePath {
    pub segments: Vec<String>,
    pub truncated: bool,
}

/// Nodo del trie. `size` cuenta las hojas bajo el nodo (un nodo sin hijos
/// cuenta como una).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BoundedTrieNode {
    children: BTreeMap<String, BoundedTrieNode>,
    size: i64,
    truncated: bool,
}

impl Default for BoundedTrieNode {
    fn default() -> Self {
        Self { children: BTreeMap::new(),
               size: 1,
               truncated: false }
    }
}

impl BoundedTrieNode {
    pub fn size(&self) -> i64 {
        self.size
    }

    /// Inserta `segments`; devuelve la variación de hojas.
    pub fn add(&mut self, segments: &[String]) -> i64 {
        let Some((head, tail)) = segments.split_first() else {
            return 0;
        };
        if self.truncated {
            return 0;
        }
        let was_empty = self.children.is_empty();
        let mut delta = 0;
        let child = match self.children.entry(head.clone()) {
            Entry::Occupied(entry) => entry.into_mut(),
            Entry::Vacant(entry) => {
                if !was_empty {
                    delta = 1;
                }
                entry.insert(BoundedTrieNode::default())
            }
        };
        if !tail.is_empty() {
            delta += child.add(tail);
        }
        self.size += delta;
        delta
    }

    /// Reduce en al menos una hoja colapsando la rama más grande.
    pub fn trim(&mut self) -> i64 {
        let Some(max_size) = self.children.values().map(|c| c.size).max() else {
            return 0;
        };
        let delta = if max_size == 1 {
            self.truncated = true;
            self.children.clear();
            1 - self.size
        } else {
            self.children.values_mut().find(|c| c.size == max_size).map_or(0, BoundedTrieNode::trim)
        };
        self.size += delta;
        delta
    }

    pub fn merge(&mut self, other: &BoundedTrieNode) -> i64 {
        let delta = if self.truncated {
            0
        } else if other.truncated {
            self.truncated = true;
            self.children.clear();
            1 - self.size
        } else if other.children.is_empty() {
            0
        } else if self.children.is_empty() {
            self.children = other.children.clone();
            other.size - self.size
        } else {
            let mut delta = 0;
            for (prefix, other_child) in &other.children {
                match self.children.get_mut(prefix) {
                    Some(child) => delta += child.merge(other_child),
                    None => {
                        self.children.insert(prefix.clone(), other_child.clone());
                        delta += other_child.size;
                    }
                }
            }
            delta
        };
        self.size += delta;
        delta
    }

    pub fn flattened(&self) -> Vec<TriePath> {
        if self.truncated || self.children.is_empty() {
            return vec![TriePath { segments: Vec::new(),
                                   truncated: self.truncated }];
        }
        let mut out = Vec::new();
        for (prefix, child) in &self.children {
            for mut path in child.flattened() {
                path.segments.insert(0, prefix.clone());
                out.push(path);
            }
        }
        out
    }
}

/// Valor de una métrica bounded trie. Un único path se guarda sin trie.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BoundedTrieData {
    bound: usize,
    singleton: Option<Vec<String>>,
    root: Option<BoundedTrieNode>,
}

impl BoundedTrieData {
    pub fn new(bound: usize) -> Self {
        Self { bound,
               singleton: None,
               root: None }
    }

    pub fn bound(&self) -> usize {
        self.bound
    }

    fn is_empty(&self) -> bool {
        self.singleton.is_none() && self.root.is_none()
    }

    fn as_trie(&self) -> BoundedTrieNode {
        if let Some(root) = &self.root {
            return root.clone();
        }
        let mut root = BoundedTrieNode::default();
        if let Some(path) = &self.singleton {
            root.add(path);
        }
        root
    }

    fn over_bound(root: &BoundedTrieNode, bound: usize) -> bool {
        usize::try_from(root.size).map_or(false, |size| size > bound)
    }

    pub fn add<I, S>(&mut self, segments: I)
        where I: IntoIterator<Item = S>,
              S: Into<String>
    {
        let segments: Vec<String> = segments.into_iter().map(Into::into).collect();
        if self.is_empty() {
            self.singleton = Some(segments);
            return;
        }
        if self.singleton.as_ref() == Some(&segments) {
            return;
        }
        let mut root = match self.root.take() {
            Some(root) => root,
            None => self.as_trie(),
        };
        self.singleton = None;
        root.add(&segments);
        if Self::over_bound(&root, self.bound) {
            root.trim();
        }
        self.root = Some(root);
    }

    /// Hojas del trie (0 si está vacío).
    pub fn size(&self) -> usize {
        if self.is_empty() {
            return 0;
        }
        usize::try_from(self.as_trie().size).unwrap_or(0)
    }

    pub fn flattened(&self) -> BTreeSet<TriePath> {
        match (&self.root, &self.singleton) {
            (Some(root), _) => root.flattened().into_iter().collect(),
            (None, Some(path)) => BTreeSet::from([TriePath { segments: path.clone(),
                                                            truncated: false }]),
            (None, None) => BTreeSet::new(),
        }
    }

    /// `true` si `path` está en el trie, exacto o bajo un prefijo truncado.
    pub fn contains(&self, path: &[&str]) -> bool {
        self.flattened().iter().any(|p| {
                                   let prefix_matches = p.segments.len() <= path.len()
                                                        && p.segments.iter().zip(path).all(|(a, b)| a == b);
                                   if p.truncated {
                                       prefix_matches
                                   } else {
                                       prefix_matches && p.segments.len() == path.len()
                                   }
                               })
    }
}

impl PartialEq for BoundedTrieData {
    fn eq(&self, other: &Self) -> bool {
        self.flattened() == other.flattened()
    }
}

impl MetricAggregate for BoundedTrieData {
    fn identity() -> Self {
        Self::new(DEFAULT_BOUNDED_TRIE_SIZE)
    }

    fn combine(&mut self, other: &Self) {
        if other.is_empty() {
            return;
        }
        if self.is_empty() {
            *self = other.clone();
            return;
        }
        let bound = self.bound.min(other.bound);
        let (base, extra) = if self.root.is_none() && other.root.is_some() { (other, &*self) } else { (&*self, other) };
        let mut combined = base.as_trie();
        match (&extra.root, &extra.singleton) {
            (Some(root), _) => {
                combined.merge(root);
            }
            (None, Some(path)) => {
                combined.add(path);
            }
            (None, None) => {}
        }
        while Self::over_bound(&combined, bound) {
            if combined.trim() == 0 {
                break;
            }
        }
        *self = Self { bound,
                       singleton: None,
                       root: Some(combined) };
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn path(segments: &[&str]) -> TriePath {
        TriePath { segments: segments.iter().map(|s| s.to_string()).collect(),
                   truncated: false }
    }

    #[test]
    fn counts_distinct_leaves() {
        let mut trie = BoundedTrieData::new(100);
        for x in [1, 2, 3, 4, 5] {
            trie.add(["a".to_string(), "b".to_string(), (x % 4).to_string()]);
        }
        assert_eq!(trie.size(), 4);
        assert!(trie.contains(&["a", "b", "0"]));
        assert!(!trie.contains(&["a", "b"]));
    }

    #[test]
    fn singleton_and_empty() {
        let mut trie = BoundedTrieData::new(10);
        assert_eq!(trie.size(), 0);
        trie.add(["x", "y"]);
        trie.add(["x", "y"]);
        assert_eq!(trie.size(), 1);
        assert_eq!(trie.flattened(), BTreeSet::from([path(&["x", "y"])]));
    }

    #[test]
    fn exceeding_bound_collapses_largest_branch() {
        let mut trie = BoundedTrieData::new(3);
        trie.add(["a", "1"]);
        trie.add(["a", "2"]);
        trie.add(["a", "3"]);
        trie.add(["b"]);
        assert!(trie.size() <= 3);
        let flat = trie.flattened();
        assert!(flat.contains(&TriePath { segments: vec!["a".into()],
                                          truncated: true }));
        assert!(trie.contains(&["a", "anything"]));
        assert!(trie.contains(&["b"]));
    }

    #[test]
    fn combine_unions_and_uses_smaller_bound() {
        let mut a = BoundedTrieData::new(10);
        a.add(["a", "x"]);
        let mut b = BoundedTrieData::new(2);
        b.add(["b", "x"]);
        b.add(["b", "y"]);
        a.combine(&b);
        assert_eq!(a.bound(), 2);
        assert!(a.size() <= 2);
        assert!(a.contains(&["a", "x"]));

        let mut c = BoundedTrieData::identity();
        let mut d = BoundedTrieData::new(10);
        d.add(["q"]);
        c.combine(&d);
        assert_eq!(c, d);
    }
}
