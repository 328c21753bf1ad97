//! Category forest with a nested-set index.
//!
//! Categories are stored with plain parent pointers. Every structural change
//! (insert, rename, reparent, delete) rebuilds a nested-set index: each node
//! gets a `tree_id`, `lft`/`rgt` traversal bounds and a `level`. Subtree and
//! ancestor queries are answered from the bounds, never by chasing pointers.
//!
//! Siblings (and the trees of the forest) are ordered by a [`SiblingOrder`]
//! policy, [`ByName`] unless another one is supplied.

use std::cmp::Ordering;
use std::collections::{HashMap, HashSet};

use serde::Serialize;

use storefront_core::{CategoryId, DomainError, DomainResult};

use crate::category::{Category, CategoryPatch};

/// Ordering policy for siblings and for the roots of the forest.
pub trait SiblingOrder: core::fmt::Debug + Send + Sync {
    fn compare(&self, a: &Category, b: &Category) -> Ordering;
}

/// Lexicographic order by name, ties broken by id.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ByName;

impl SiblingOrder for ByName {
    fn compare(&self, a: &Category, b: &Category) -> Ordering {
        a.name.cmp(&b.name).then_with(|| a.id.cmp(&b.id))
    }
}

/// Nested-set coordinates of one node.
///
/// `lft`/`rgt` are numbered from 1 within each tree of the forest.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct TreeBounds {
    pub tree_id: u32,
    pub lft: u32,
    pub rgt: u32,
    pub level: u32,
}

impl TreeBounds {
    pub fn descendant_count(&self) -> usize {
        ((self.rgt - self.lft - 1) / 2) as usize
    }

    pub fn is_leaf(&self) -> bool {
        self.rgt == self.lft + 1
    }

    pub fn is_root(&self) -> bool {
        self.level == 0
    }

    /// True when `other` lies strictly inside this node's subtree.
    pub fn contains(&self, other: &TreeBounds) -> bool {
        self.tree_id == other.tree_id && self.lft < other.lft && other.rgt < self.rgt
    }
}

#[derive(Debug, Clone, Default)]
struct NestedSetIndex {
    preorder: Vec<CategoryId>,
    position: HashMap<CategoryId, usize>,
    bounds: HashMap<CategoryId, TreeBounds>,
    children: HashMap<CategoryId, Vec<CategoryId>>,
    roots: Vec<CategoryId>,
    // Offset into `preorder` where each tree starts, indexed by `tree_id - 1`.
    tree_starts: Vec<usize>,
}

#[derive(Debug, Clone)]
pub struct CategoryTree<O = ByName> {
    order: O,
    nodes: HashMap<CategoryId, Category>,
    index: NestedSetIndex,
}

impl Default for CategoryTree<ByName> {
    fn default() -> Self {
        Self::new()
    }
}

impl CategoryTree<ByName> {
    pub fn new() -> Self {
        Self::with_order(ByName)
    }

    /// Rebuild a tree from persisted rows, ordered by name.
    pub fn from_categories(categories: impl IntoIterator<Item = Category>) -> DomainResult<Self> {
        Self::from_categories_with_order(ByName, categories)
    }
}

impl<O: SiblingOrder> CategoryTree<O> {
    pub fn with_order(order: O) -> Self {
        Self {
            order,
            nodes: HashMap::new(),
            index: NestedSetIndex::default(),
        }
    }

    /// Rebuild a tree from persisted rows.
    ///
    /// Fails if names or slugs collide, a parent is missing, or the parent
    /// pointers contain a cycle.
    pub fn from_categories_with_order(
        order: O,
        categories: impl IntoIterator<Item = Category>,
    ) -> DomainResult<Self> {
        let mut tree = Self::with_order(order);
        for category in categories {
            tree.ensure_unique(&category, None)?;
            if tree.nodes.insert(category.id, category).is_some() {
                return Err(DomainError::invariant("duplicate category id"));
            }
        }

        if let Some(orphan) = tree
            .nodes
            .values()
            .find(|c| c.parent.is_some_and(|p| !tree.nodes.contains_key(&p)))
        {
            return Err(DomainError::invariant(format!(
                "category '{}' references a missing parent",
                orphan.name
            )));
        }

        tree.reindex();
        if tree.index.preorder.len() != tree.nodes.len() {
            return Err(DomainError::invariant("category parent pointers form a cycle"));
        }
        Ok(tree)
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub fn contains(&self, id: CategoryId) -> bool {
        self.nodes.contains_key(&id)
    }

    pub fn get(&self, id: CategoryId) -> Option<&Category> {
        self.nodes.get(&id)
    }

    pub fn get_by_slug(&self, slug: &str) -> Option<&Category> {
        self.nodes.values().find(|c| c.slug.as_str() == slug)
    }

    pub fn bounds(&self, id: CategoryId) -> Option<TreeBounds> {
        self.index.bounds.get(&id).copied()
    }

    /// Depth of the node; roots are at level 0.
    pub fn level(&self, id: CategoryId) -> Option<u32> {
        self.bounds(id).map(|b| b.level)
    }

    pub fn roots(&self) -> Vec<&Category> {
        self.resolve(&self.index.roots)
    }

    /// Direct children in sibling order.
    pub fn children(&self, id: CategoryId) -> Vec<&Category> {
        match self.index.children.get(&id) {
            Some(ids) => self.resolve(ids),
            None => Vec::new(),
        }
    }

    pub fn parent(&self, id: CategoryId) -> Option<&Category> {
        self.nodes.get(&id)?.parent.and_then(|p| self.nodes.get(&p))
    }

    /// Path from the root down to the node.
    pub fn ancestors(&self, id: CategoryId, include_self: bool) -> Vec<&Category> {
        let (Some(bounds), Some(&pos)) = (self.bounds(id), self.index.position.get(&id)) else {
            return Vec::new();
        };
        let start = self.index.tree_starts[(bounds.tree_id - 1) as usize];

        self.index.preorder[start..=pos]
            .iter()
            .filter(|other| {
                let b = &self.index.bounds[*other];
                b.contains(&bounds) || (include_self && **other == id)
            })
            .map(|other| &self.nodes[other])
            .collect()
    }

    /// Whole subtree below the node, in pre-order.
    pub fn descendants(&self, id: CategoryId, include_self: bool) -> Vec<&Category> {
        let ids = self.subtree_slice(id, include_self);
        self.resolve(ids)
    }

    pub fn descendant_ids(&self, id: CategoryId, include_self: bool) -> Vec<CategoryId> {
        self.subtree_slice(id, include_self).to_vec()
    }

    pub fn descendant_count(&self, id: CategoryId) -> usize {
        self.bounds(id).map_or(0, |b| b.descendant_count())
    }

    pub fn siblings(&self, id: CategoryId, include_self: bool) -> Vec<&Category> {
        let Some(node) = self.nodes.get(&id) else {
            return Vec::new();
        };
        let ids = match node.parent {
            Some(parent) => self.index.children.get(&parent).map(Vec::as_slice).unwrap_or(&[]),
            None => self.index.roots.as_slice(),
        };
        ids.iter()
            .filter(|other| include_self || **other != id)
            .map(|other| &self.nodes[other])
            .collect()
    }

    pub fn root_of(&self, id: CategoryId) -> Option<&Category> {
        let bounds = self.bounds(id)?;
        let start = self.index.tree_starts[(bounds.tree_id - 1) as usize];
        self.nodes.get(&self.index.preorder[start])
    }

    /// True when `id` is strictly below `ancestor`.
    pub fn is_descendant_of(&self, id: CategoryId, ancestor: CategoryId) -> bool {
        match (self.bounds(ancestor), self.bounds(id)) {
            (Some(a), Some(b)) => a.contains(&b),
            _ => false,
        }
    }

    /// Pre-order walk over the whole forest with each node's coordinates.
    pub fn walk(&self) -> impl Iterator<Item = (&Category, TreeBounds)> + '_ {
        self.index
            .preorder
            .iter()
            .map(|id| (&self.nodes[id], self.index.bounds[id]))
    }

    /// Insert a new node. The parent, if any, must already be in the tree.
    pub fn insert(&mut self, category: Category) -> DomainResult<Category> {
        if self.nodes.contains_key(&category.id) {
            return Err(DomainError::conflict(format!(
                "category {} already exists",
                category.id
            )));
        }
        self.ensure_unique(&category, None)?;
        if let Some(parent) = category.parent {
            self.ensure_parent_exists(parent)?;
        }

        self.nodes.insert(category.id, category.clone());
        self.reindex();
        Ok(category)
    }

    /// Apply a partial update, including reparenting.
    ///
    /// Moving a node below itself or below one of its descendants is rejected
    /// before anything changes.
    pub fn update(&mut self, id: CategoryId, patch: &CategoryPatch) -> DomainResult<Category> {
        let current = self.nodes.get(&id).ok_or_else(DomainError::not_found)?;
        let next = current.patched(patch)?;

        self.ensure_unique(&next, Some(id))?;
        if let Some(Some(parent)) = patch.parent {
            self.ensure_valid_move(id, parent)?;
        }

        let restructure = next.parent != current.parent || next.name != current.name;
        self.nodes.insert(id, next.clone());
        if restructure {
            self.reindex();
        }
        Ok(next)
    }

    pub fn move_to(&mut self, id: CategoryId, parent: Option<CategoryId>) -> DomainResult<Category> {
        self.update(id, &CategoryPatch::move_to(parent))
    }

    /// Remove a node together with its whole subtree. Returns the removed
    /// categories in pre-order (the node itself first).
    pub fn remove(&mut self, id: CategoryId) -> DomainResult<Vec<Category>> {
        if !self.nodes.contains_key(&id) {
            return Err(DomainError::not_found());
        }
        let doomed = self.descendant_ids(id, true);
        let removed = doomed
            .iter()
            .filter_map(|d| self.nodes.remove(d))
            .collect();
        self.reindex();
        Ok(removed)
    }

    fn ensure_parent_exists(&self, parent: CategoryId) -> DomainResult<()> {
        if !self.nodes.contains_key(&parent) {
            return Err(DomainError::field(
                "parent",
                "invalid_choice",
                "Select a valid parent category.",
            ));
        }
        Ok(())
    }

    fn ensure_valid_move(&self, id: CategoryId, parent: CategoryId) -> DomainResult<()> {
        self.ensure_parent_exists(parent)?;
        if parent == id || self.is_descendant_of(parent, id) {
            return Err(DomainError::field(
                "parent",
                "invalid_move",
                "A category may not be made a child of itself or any of its descendants.",
            ));
        }
        Ok(())
    }

    fn ensure_unique(&self, candidate: &Category, ignore: Option<CategoryId>) -> DomainResult<()> {
        for other in self.nodes.values() {
            if Some(other.id) == ignore {
                continue;
            }
            if other.name == candidate.name {
                return Err(DomainError::conflict(format!(
                    "category with name '{}' already exists",
                    candidate.name
                )));
            }
            if other.slug == candidate.slug {
                return Err(DomainError::conflict(format!(
                    "category with slug '{}' already exists",
                    candidate.slug
                )));
            }
        }
        Ok(())
    }

    fn subtree_slice(&self, id: CategoryId, include_self: bool) -> &[CategoryId] {
        let (Some(bounds), Some(&pos)) = (self.bounds(id), self.index.position.get(&id)) else {
            return &[];
        };
        let start = if include_self { pos } else { pos + 1 };
        &self.index.preorder[start..pos + 1 + bounds.descendant_count()]
    }

    fn resolve(&self, ids: &[CategoryId]) -> Vec<&Category> {
        ids.iter().filter_map(|id| self.nodes.get(id)).collect()
    }

    fn sort_siblings(&self, ids: &mut [CategoryId]) {
        ids.sort_by(|a, b| self.order.compare(&self.nodes[a], &self.nodes[b]));
    }

    fn reindex(&mut self) {
        let mut children: HashMap<CategoryId, Vec<CategoryId>> = HashMap::new();
        let mut roots = Vec::new();
        for node in self.nodes.values() {
            match node.parent {
                Some(parent) => children.entry(parent).or_default().push(node.id),
                None => roots.push(node.id),
            }
        }
        self.sort_siblings(&mut roots);
        for ids in children.values_mut() {
            self.sort_siblings(ids);
        }

        let mut index = NestedSetIndex {
            preorder: Vec::with_capacity(self.nodes.len()),
            ..NestedSetIndex::default()
        };
        let mut visited = HashSet::with_capacity(self.nodes.len());

        for (n, root) in roots.iter().enumerate() {
            let tree_id = n as u32 + 1;
            let mut counter = 1u32;
            index.tree_starts.push(index.preorder.len());

            // (node, level, next child to visit)
            let mut stack: Vec<(CategoryId, u32, usize)> = vec![(*root, 0, 0)];
            index.preorder.push(*root);
            index.bounds.insert(*root, TreeBounds { tree_id, lft: counter, rgt: 0, level: 0 });
            visited.insert(*root);
            counter += 1;

            while let Some(top) = stack.last_mut() {
                let (id, level, next) = *top;
                let kids = children.get(&id).map(Vec::as_slice).unwrap_or(&[]);

                if let Some(&child) = kids.get(next) {
                    top.2 += 1;
                    if !visited.insert(child) {
                        continue;
                    }
                    index.preorder.push(child);
                    index.bounds.insert(
                        child,
                        TreeBounds { tree_id, lft: counter, rgt: 0, level: level + 1 },
                    );
                    counter += 1;
                    stack.push((child, level + 1, 0));
                } else {
                    if let Some(b) = index.bounds.get_mut(&id) {
                        b.rgt = counter;
                    }
                    counter += 1;
                    stack.pop();
                }
            }
        }

        index.position = index
            .preorder
            .iter()
            .enumerate()
            .map(|(pos, id)| (*id, pos))
            .collect();
        index.children = children;
        index.roots = roots;
        self.index = index;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::category::NewCategory;

    fn add(tree: &mut CategoryTree, name: &str, parent: Option<CategoryId>) -> CategoryId {
        let mut new = NewCategory::new(name);
        new.parent = parent;
        let category = Category::create(CategoryId::new(), new).unwrap();
        tree.insert(category).unwrap().id
    }

    fn names(categories: Vec<&Category>) -> Vec<&str> {
        categories.into_iter().map(|c| c.name.as_str()).collect()
    }

    /// Clothing
    ///   Shoes
    ///     Boots
    ///     Sneakers
    ///   Hats
    /// Books
    fn sample() -> (CategoryTree, HashMap<&'static str, CategoryId>) {
        let mut tree = CategoryTree::new();
        let mut ids = HashMap::new();
        let clothing = add(&mut tree, "Clothing", None);
        let shoes = add(&mut tree, "Shoes", Some(clothing));
        ids.insert("Sneakers", add(&mut tree, "Sneakers", Some(shoes)));
        ids.insert("Boots", add(&mut tree, "Boots", Some(shoes)));
        ids.insert("Hats", add(&mut tree, "Hats", Some(clothing)));
        ids.insert("Books", add(&mut tree, "Books", None));
        ids.insert("Clothing", clothing);
        ids.insert("Shoes", shoes);
        (tree, ids)
    }

    #[test]
    fn children_are_ordered_by_name() {
        let (tree, ids) = sample();
        assert_eq!(names(tree.children(ids["Shoes"])), vec!["Boots", "Sneakers"]);
        assert_eq!(names(tree.children(ids["Clothing"])), vec!["Hats", "Shoes"]);
        assert_eq!(names(tree.roots()), vec!["Books", "Clothing"]);
    }

    #[test]
    fn nested_set_bounds_follow_preorder() {
        let (tree, ids) = sample();
        let clothing = tree.bounds(ids["Clothing"]).unwrap();
        assert_eq!((clothing.lft, clothing.rgt, clothing.level), (1, 10, 0));
        assert_eq!(clothing.descendant_count(), 4);

        let hats = tree.bounds(ids["Hats"]).unwrap();
        assert_eq!((hats.lft, hats.rgt, hats.level), (2, 3, 1));
        assert!(hats.is_leaf());

        let books = tree.bounds(ids["Books"]).unwrap();
        assert_eq!((books.tree_id, books.lft, books.rgt), (1, 1, 2));
        assert_eq!(clothing.tree_id, 2);
    }

    #[test]
    fn ancestors_run_root_first() {
        let (tree, ids) = sample();
        assert_eq!(names(tree.ancestors(ids["Boots"], false)), vec!["Clothing", "Shoes"]);
        assert_eq!(
            names(tree.ancestors(ids["Boots"], true)),
            vec!["Clothing", "Shoes", "Boots"]
        );
        assert!(tree.ancestors(ids["Books"], false).is_empty());
        assert_eq!(tree.root_of(ids["Sneakers"]).unwrap().name, "Clothing");
    }

    #[test]
    fn descendants_cover_the_subtree_in_preorder() {
        let (tree, ids) = sample();
        assert_eq!(
            names(tree.descendants(ids["Clothing"], false)),
            vec!["Hats", "Shoes", "Boots", "Sneakers"]
        );
        assert_eq!(names(tree.descendants(ids["Shoes"], true)), vec!["Shoes", "Boots", "Sneakers"]);
        assert!(tree.descendants(ids["Books"], false).is_empty());
    }

    #[test]
    fn siblings_and_levels() {
        let (tree, ids) = sample();
        assert_eq!(names(tree.siblings(ids["Hats"], false)), vec!["Shoes"]);
        assert_eq!(names(tree.siblings(ids["Books"], true)), vec!["Books", "Clothing"]);
        assert_eq!(tree.level(ids["Sneakers"]), Some(2));
    }

    #[test]
    fn moving_below_a_descendant_is_rejected() {
        let (mut tree, ids) = sample();
        let err = tree.move_to(ids["Clothing"], Some(ids["Boots"])).unwrap_err();
        assert!(matches!(err, DomainError::InvalidField(ref f) if f.code == "invalid_move"));

        let err = tree.move_to(ids["Shoes"], Some(ids["Shoes"])).unwrap_err();
        assert!(matches!(err, DomainError::InvalidField(ref f) if f.code == "invalid_move"));

        // Nothing moved.
        assert_eq!(tree.parent(ids["Clothing"]), None);
        assert_eq!(tree.level(ids["Boots"]), Some(2));
    }

    #[test]
    fn moving_a_subtree_reindexes_it() {
        let (mut tree, ids) = sample();
        tree.move_to(ids["Shoes"], Some(ids["Books"])).unwrap();

        assert_eq!(names(tree.descendants(ids["Books"], false)), vec!["Shoes", "Boots", "Sneakers"]);
        assert_eq!(tree.level(ids["Boots"]), Some(2));
        assert!(tree.is_descendant_of(ids["Sneakers"], ids["Books"]));
        assert!(!tree.is_descendant_of(ids["Sneakers"], ids["Clothing"]));

        tree.move_to(ids["Shoes"], None).unwrap();
        assert_eq!(names(tree.roots()), vec!["Books", "Clothing", "Shoes"]);
    }

    #[test]
    fn renaming_resorts_siblings() {
        let (mut tree, ids) = sample();
        tree.update(ids["Hats"], &CategoryPatch::rename("Scarves")).unwrap();
        assert_eq!(names(tree.children(ids["Clothing"])), vec!["Scarves", "Shoes"]);

        tree.update(ids["Shoes"], &CategoryPatch::rename("Accessories")).unwrap();
        assert_eq!(names(tree.children(ids["Clothing"])), vec!["Accessories", "Scarves"]);
    }

    #[test]
    fn remove_cascades_to_the_subtree() {
        let (mut tree, ids) = sample();
        let removed = tree.remove(ids["Shoes"]).unwrap();
        assert_eq!(names(removed.iter().collect()), vec!["Shoes", "Boots", "Sneakers"]);
        assert_eq!(tree.len(), 3);
        assert!(!tree.contains(ids["Boots"]));
        assert_eq!(tree.bounds(ids["Clothing"]).unwrap().rgt, 4);
    }

    #[test]
    fn names_and_slugs_are_unique() {
        let (mut tree, ids) = sample();
        let dup = Category::create(CategoryId::new(), NewCategory::new("Boots")).unwrap();
        assert!(matches!(tree.insert(dup), Err(DomainError::Conflict(_))));

        let dup_slug = Category::create(
            CategoryId::new(),
            NewCategory::new("Other").with_slug("hats"),
        )
        .unwrap();
        assert!(matches!(tree.insert(dup_slug), Err(DomainError::Conflict(_))));

        // Renaming onto an existing name is rejected; keeping one's own name is fine.
        let err = tree.update(ids["Hats"], &CategoryPatch::rename("Boots")).unwrap_err();
        assert!(matches!(err, DomainError::Conflict(_)));
        assert!(tree.update(ids["Hats"], &CategoryPatch::rename("Hats")).is_ok());
    }

    #[test]
    fn insert_requires_an_existing_parent() {
        let mut tree = CategoryTree::new();
        let orphan = Category::create(CategoryId::new(), NewCategory::new("Orphan").under(CategoryId::new()))
            .unwrap();
        let err = tree.insert(orphan).unwrap_err();
        assert!(matches!(err, DomainError::InvalidField(ref f) if f.field == "parent"));
    }

    #[test]
    fn from_categories_rejects_cycles() {
        let a = CategoryId::new();
        let b = CategoryId::new();
        let rows = vec![
            Category {
                id: a,
                name: "A".into(),
                slug: storefront_core::Slug::parse("a").unwrap(),
                parent: Some(b),
                is_active: true,
            },
            Category {
                id: b,
                name: "B".into(),
                slug: storefront_core::Slug::parse("b").unwrap(),
                parent: Some(a),
                is_active: true,
            },
        ];
        assert!(matches!(
            CategoryTree::from_categories(rows),
            Err(DomainError::InvariantViolation(_))
        ));
    }

    #[test]
    fn custom_sibling_order_is_honoured() {
        #[derive(Debug)]
        struct ReverseName;
        impl SiblingOrder for ReverseName {
            fn compare(&self, a: &Category, b: &Category) -> Ordering {
                b.name.cmp(&a.name)
            }
        }

        let mut tree = CategoryTree::with_order(ReverseName);
        for name in ["Alpha", "Gamma", "Beta"] {
            tree.insert(Category::create(CategoryId::new(), NewCategory::new(name)).unwrap())
                .unwrap();
        }
        assert_eq!(names(tree.roots()), vec!["Gamma", "Beta", "Alpha"]);
    }

    mod proptest_tests {
        use super::*;
        use proptest::prelude::*;

        /// Build a random forest: node `i` hangs below `parents[i] % i` or is a root.
        fn build(parents: &[Option<usize>]) -> (CategoryTree, Vec<CategoryId>) {
            let mut tree = CategoryTree::new();
            let mut ids = Vec::new();
            for (i, parent) in parents.iter().enumerate() {
                let parent = match parent {
                    Some(p) if i > 0 => Some(ids[p % i]),
                    _ => None,
                };
                ids.push(add(&mut tree, &format!("node-{i:03}"), parent));
            }
            (tree, ids)
        }

        proptest! {
            #![proptest_config(ProptestConfig {
                cases: 256,
                ..ProptestConfig::default()
            })]

            /// Property: reparenting below a descendant (or self) is always rejected,
            /// every other reparent succeeds.
            #[test]
            fn reparent_never_creates_a_cycle(
                parents in prop::collection::vec(prop::option::of(0usize..64), 1..24),
                a in 0usize..64,
                b in 0usize..64,
            ) {
                let (mut tree, ids) = build(&parents);
                let node = ids[a % ids.len()];
                let target = ids[b % ids.len()];
                let invalid = node == target || tree.is_descendant_of(target, node);

                let result = tree.move_to(node, Some(target));
                prop_assert_eq!(result.is_err(), invalid);
                prop_assert_eq!(tree.walk().count(), ids.len());
            }

            /// Property: nested-set bounds agree with parent pointers.
            #[test]
            fn bounds_agree_with_parent_pointers(
                parents in prop::collection::vec(prop::option::of(0usize..64), 1..24),
            ) {
                let (tree, ids) = build(&parents);
                for id in &ids {
                    let path = tree.ancestors(*id, false);
                    let mut expected = Vec::new();
                    let mut cursor = tree.parent(*id);
                    while let Some(p) = cursor {
                        expected.push(p.id);
                        cursor = tree.parent(p.id);
                    }
                    expected.reverse();
                    let got: Vec<CategoryId> = path.iter().map(|c| c.id).collect();
                    prop_assert_eq!(got, expected);

                    let b = tree.bounds(*id).unwrap();
                    prop_assert_eq!(b.descendant_count(), tree.descendants(*id, false).len());
                    prop_assert_eq!(b.level as usize, tree.ancestors(*id, false).len());
                }
            }

            /// Property: children always come back sorted by name.
            #[test]
            fn children_sorted_by_name(
                parents in prop::collection::vec(prop::option::of(0usize..64), 1..24),
            ) {
                let (tree, ids) = build(&parents);
                for id in &ids {
                    let kids = names(tree.children(*id));
                    let mut sorted = kids.clone();
                    sorted.sort();
                    prop_assert_eq!(kids, sorted);
                }
            }
        }
    }
}
