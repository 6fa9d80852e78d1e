//! `$select` / `$expand` trees.
//!
//! These are produced by an external query-option parser; the codec only
//! reads them to decide which properties and links are written and how deep
//! expansion goes.

use std::collections::BTreeMap;

use crate::version::ODataVersion;

/// Which structural and navigation properties are selected.
///
/// The default tree selects everything.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct SelectTree {
    /// Explicitly selected paths; empty means "all".
    items: BTreeMap<String, SelectTree>,
}

impl SelectTree {
    /// Selects everything.
    pub fn all() -> Self {
        Self::default()
    }

    /// Builds a tree from `/`-separated paths such as `Address/City`.
    pub fn from_paths<I, S>(paths: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut tree = Self::default();
        for path in paths {
            tree.insert(path.as_ref());
        }
        tree
    }

    fn insert(&mut self, path: &str) {
        let (head, rest) = match path.split_once('/') {
            Some((head, rest)) => (head, Some(rest)),
            None => (path, None),
        };
        if head.is_empty() {
            return;
        }
        if head == "*" {
            self.items.clear();
            return;
        }
        let child = self.items.entry(head.to_string()).or_default();
        if let Some(rest) = rest {
            child.insert(rest);
        }
    }

    pub fn is_all(&self) -> bool {
        self.items.is_empty()
    }

    pub fn is_selected(&self, name: &str) -> bool {
        self.is_all() || self.items.contains_key(name)
    }

    /// Selection for the members of a selected complex property.
    pub fn child(&self, name: &str) -> SelectTree {
        self.items.get(name).cloned().unwrap_or_default()
    }

    /// Comma-separated list for context URLs: `Name,Address/City`.
    pub fn to_clause(&self) -> Option<String> {
        if self.is_all() {
            return None;
        }
        let mut parts = Vec::new();
        self.collect_paths("", &mut parts);
        Some(parts.join(","))
    }

    fn collect_paths(&self, prefix: &str, out: &mut Vec<String>) {
        for (name, child) in &self.items {
            let path = if prefix.is_empty() {
                name.clone()
            } else {
                format!("{prefix}/{name}")
            };
            if child.is_all() {
                out.push(path);
            } else {
                child.collect_paths(&path, out);
            }
        }
    }
}

/// Expansion depth of a self-recursive expand item.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Levels {
    Depth(u32),
    Max,
}

/// One navigation property to expand.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExpandItem {
    pub navigation: String,
    pub select: SelectTree,
    pub expand: ExpandTree,
    pub levels: Option<Levels>,
    /// Write `Nav@odata.count` for expanded collections.
    pub count: bool,
}

impl ExpandItem {
    pub fn new(navigation: impl Into<String>) -> Self {
        Self {
            navigation: navigation.into(),
            select: SelectTree::all(),
            expand: ExpandTree::default(),
            levels: None,
            count: false,
        }
    }

    pub fn select(mut self, select: SelectTree) -> Self {
        self.select = select;
        self
    }

    pub fn expand(mut self, expand: ExpandTree) -> Self {
        self.expand = expand;
        self
    }

    pub fn levels(mut self, levels: Levels) -> Self {
        self.levels = Some(levels);
        self
    }

    pub fn with_count(mut self) -> Self {
        self.count = true;
        self
    }

    /// Expand tree applied to the expanded targets.
    ///
    /// With `$levels`, the item re-applies itself one level down (`Max`
    /// never runs out; the cycle guard terminates it).
    pub fn next_level(&self) -> ExpandTree {
        let again = match self.levels {
            Some(Levels::Max) => Some(Levels::Max),
            Some(Levels::Depth(n)) if n > 1 => Some(Levels::Depth(n - 1)),
            _ => None,
        };
        let mut tree = self.expand.clone();
        if let Some(levels) = again {
            if tree.get(&self.navigation).is_none() {
                tree.items.push(ExpandItem {
                    levels: Some(levels),
                    ..self.clone()
                });
            }
        }
        tree
    }
}

/// Navigation properties to expand, in request order.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ExpandTree {
    items: Vec<ExpandItem>,
}

impl ExpandTree {
    pub fn new(items: Vec<ExpandItem>) -> Self {
        Self { items }
    }

    pub fn get(&self, navigation: &str) -> Option<&ExpandItem> {
        self.items.iter().find(|item| item.navigation == navigation)
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn items(&self) -> &[ExpandItem] {
        &self.items
    }

    /// Context-URL fragment for expanded navigation properties.
    ///
    /// 4.0 lists only expansions with a nested select (`Friends(Name)`);
    /// 4.01 lists every expansion (`Friends()`).
    pub fn to_clause(&self, version: ODataVersion) -> Option<String> {
        let parts: Vec<String> = self
            .items
            .iter()
            .filter_map(|item| {
                let mut inner = Vec::new();
                inner.extend(item.select.to_clause());
                inner.extend(item.expand.to_clause(version));
                if inner.is_empty() && version < ODataVersion::V401 {
                    None
                } else {
                    Some(format!("{}({})", item.navigation, inner.join(",")))
                }
            })
            .collect();
        (!parts.is_empty()).then(|| parts.join(","))
    }
}
