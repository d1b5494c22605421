//! Balanced R-tree over 3D points with branch-and-bound k-nearest search.
//!
//! ## Insertion
//!
//! Points are inserted one at a time following Guttman's scheme:
//!
//! 1. **Choose subtree**: descend from the root into the child whose bounding
//!    box needs the least volume enlargement to cover the new point. Ties go to
//!    the child with the smaller resulting volume, then the smaller resulting
//!    margin, then the lower position.
//! 2. **Split**: a node holding more than `max_entries` is split in two with the
//!    quadratic heuristic. The seeds are the pair wasting the most volume when
//!    boxed together; the remaining entries are assigned one by one, most
//!    decisive first, and a group that needs every remaining entry to reach
//!    `min_entries` takes them all.
//! 3. **Propagate**: every node on the insertion path recomputes its box as the
//!    exact union of its children, and a split child is added to its parent,
//!    possibly splitting the parent in turn. A root split adds a level.
//!
//! Margins (sum of the box extents) break volume ties. Points projected onto a
//! sphere often form flat clusters whose boxes all have zero volume, and the
//! margin keeps those cases distinguishable.
//!
//! ## k-nearest search
//!
//! Best-first traversal: a min-heap of nodes keyed by the squared minimum
//! distance from the query point to their box, and a max-heap holding the k
//! best entries found so far. A node whose box is strictly farther than the
//! current k-th best entry cannot improve the result and is discarded, along
//! with its whole subtree. Equal distances are still explored so the
//! ascending-identifier tie break stays exact.
//!
//! ## Groups
//!
//! An entry may carry a [`GroupTag`] (the builder uses one per country). Every
//! node keeps the set of tags found below it, maintained alongside its box, so
//! a search restricted to one group skips any subtree that lacks the tag before
//! its distance is even computed.

use super::{GroupTag, Neighbor, SpatialIndex, cmp_candidates};
use crate::compute::validation::validate_k;
use crate::config::Config;
use crate::error::Result;
use cityquery_types::bbox::BoundingBox3D;
use cityquery_types::point::Point3d;
use cityquery_types::record::RecordId;
use smallvec::SmallVec;
use std::cmp::Ordering;
use std::collections::BinaryHeap;

/// A point stored at a leaf.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Entry {
    pub id: RecordId,
    pub point: Point3d,
    pub group: Option<GroupTag>,
}

#[derive(Debug, Clone)]
struct Node {
    mbr: BoundingBox3D,
    groups: GroupSet,
    kind: NodeKind,
}

/// Bitset of the group tags present below a node.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
struct GroupSet {
    words: SmallVec<[u64; 4]>,
}

impl GroupSet {
    fn insert(&mut self, tag: GroupTag) {
        let word = usize::from(tag) / 64;
        if self.words.len() <= word {
            self.words.resize(word + 1, 0);
        }
        self.words[word] |= 1u64 << (tag % 64);
    }

    fn contains(&self, tag: GroupTag) -> bool {
        self.words
            .get(usize::from(tag) / 64)
            .is_some_and(|word| word & (1u64 << (tag % 64)) != 0)
    }

    fn union_with(&mut self, other: &GroupSet) {
        if self.words.len() < other.words.len() {
            self.words.resize(other.words.len(), 0);
        }
        for (word, theirs) in self.words.iter_mut().zip(&other.words) {
            *word |= theirs;
        }
    }
}

#[derive(Debug, Clone)]
enum NodeKind {
    Leaf(Vec<Entry>),
    Internal(Vec<Node>),
}

/// Shape statistics of an [`RTree`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct TreeStats {
    pub len: usize,
    /// Number of levels, leaves included. An empty tree has height 1.
    pub height: usize,
    pub node_count: usize,
    pub leaf_count: usize,
}

/// R-tree over record points.
#[derive(Debug, Clone)]
pub struct RTree {
    root: Node,
    len: usize,
    min_entries: usize,
    max_entries: usize,
}

trait Bounded {
    fn bbox(&self) -> BoundingBox3D;
}

impl Bounded for Entry {
    fn bbox(&self) -> BoundingBox3D {
        BoundingBox3D::from_point(&self.point)
    }
}

impl Bounded for Node {
    fn bbox(&self) -> BoundingBox3D {
        self.mbr
    }
}

impl Node {
    fn leaf(entries: Vec<Entry>) -> Self {
        let mut node = Self {
            mbr: BoundingBox3D::new(0.0, 0.0, 0.0, 0.0, 0.0, 0.0),
            groups: GroupSet::default(),
            kind: NodeKind::Leaf(entries),
        };
        node.refresh();
        node
    }

    fn internal(children: Vec<Node>) -> Self {
        let mut node = Self {
            mbr: BoundingBox3D::new(0.0, 0.0, 0.0, 0.0, 0.0, 0.0),
            groups: GroupSet::default(),
            kind: NodeKind::Internal(children),
        };
        node.refresh();
        node
    }

    /// Recompute the box and the group set as the exact union of the
    /// children. An empty node keeps its previous box; only an empty root can
    /// be empty.
    fn refresh(&mut self) {
        let mut groups = GroupSet::default();
        let mbr = match &self.kind {
            NodeKind::Leaf(entries) => {
                for tag in entries.iter().filter_map(|entry| entry.group) {
                    groups.insert(tag);
                }
                union_of(entries)
            }
            NodeKind::Internal(children) => {
                for child in children {
                    groups.union_with(&child.groups);
                }
                union_of(children)
            }
        };
        if let Some(mbr) = mbr {
            self.mbr = mbr;
        }
        self.groups = groups;
    }
}

fn union_of<T: Bounded>(items: &[T]) -> Option<BoundingBox3D> {
    items
        .iter()
        .map(Bounded::bbox)
        .reduce(|acc, bbox| acc.union(&bbox))
}

/// How much a box grows when it has to cover another one.
#[derive(Debug, Clone, Copy)]
struct Growth {
    volume: f64,
    margin: f64,
}

fn growth(mbr: &BoundingBox3D, added: &BoundingBox3D) -> Growth {
    let union = mbr.union(added);
    Growth {
        volume: union.volume() - mbr.volume(),
        margin: union.margin() - mbr.margin(),
    }
}

fn choose_subtree(children: &[Node], target: &BoundingBox3D) -> usize {
    let mut best = 0;
    let mut best_key = (f64::INFINITY, f64::INFINITY, f64::INFINITY, f64::INFINITY);

    for (i, child) in children.iter().enumerate() {
        let g = growth(&child.mbr, target);
        let key = (
            g.volume,
            child.mbr.volume() + g.volume,
            g.margin,
            child.mbr.margin() + g.margin,
        );
        if key < best_key {
            best_key = key;
            best = i;
        }
    }
    best
}

fn pick_seeds(boxes: &[BoundingBox3D]) -> (usize, usize) {
    let mut seeds = (0, 1);
    let mut worst_waste = (f64::NEG_INFINITY, f64::NEG_INFINITY);

    for i in 0..boxes.len() {
        for j in (i + 1)..boxes.len() {
            let union = boxes[i].union(&boxes[j]);
            let waste = (
                union.volume() - boxes[i].volume() - boxes[j].volume(),
                union.margin() - boxes[i].margin() - boxes[j].margin(),
            );
            if waste > worst_waste {
                worst_waste = waste;
                seeds = (i, j);
            }
        }
    }
    seeds
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Group {
    First,
    Second,
}

/// Quadratic split of an overflowing node's children into two groups, each
/// holding at least `min_entries`.
fn quadratic_split<T: Bounded>(items: Vec<T>, min_entries: usize) -> (Vec<T>, Vec<T>) {
    let boxes: Vec<BoundingBox3D> = items.iter().map(Bounded::bbox).collect();
    let (seed_a, seed_b) = pick_seeds(&boxes);

    let mut assigned: Vec<Option<Group>> = vec![None; boxes.len()];
    assigned[seed_a] = Some(Group::First);
    assigned[seed_b] = Some(Group::Second);

    let mut mbr_a = boxes[seed_a];
    let mut mbr_b = boxes[seed_b];
    let mut count_a = 1;
    let mut count_b = 1;
    let mut remaining = boxes.len() - 2;

    while remaining > 0 {
        let forced = if count_a + remaining <= min_entries {
            Some(Group::First)
        } else if count_b + remaining <= min_entries {
            Some(Group::Second)
        } else {
            None
        };
        if let Some(group) = forced {
            for slot in assigned.iter_mut().filter(|slot| slot.is_none()) {
                *slot = Some(group);
            }
            match group {
                Group::First => count_a += remaining,
                Group::Second => count_b += remaining,
            }
            break;
        }

        // Pick the entry with the strongest preference for one group.
        let mut next: Option<(usize, Growth, Growth)> = None;
        let mut strongest = (f64::NEG_INFINITY, f64::NEG_INFINITY);
        for (i, bbox) in boxes.iter().enumerate() {
            if assigned[i].is_some() {
                continue;
            }
            let ga = growth(&mbr_a, bbox);
            let gb = growth(&mbr_b, bbox);
            let preference = (
                (ga.volume - gb.volume).abs(),
                (ga.margin - gb.margin).abs(),
            );
            if preference > strongest {
                strongest = preference;
                next = Some((i, ga, gb));
            }
        }
        let Some((i, ga, gb)) = next else { break };

        let key_a = (ga.volume, mbr_a.volume() + ga.volume, ga.margin, count_a as f64);
        let key_b = (gb.volume, mbr_b.volume() + gb.volume, gb.margin, count_b as f64);
        let group = if key_b < key_a {
            Group::Second
        } else {
            Group::First
        };

        assigned[i] = Some(group);
        match group {
            Group::First => {
                mbr_a = mbr_a.union(&boxes[i]);
                count_a += 1;
            }
            Group::Second => {
                mbr_b = mbr_b.union(&boxes[i]);
                count_b += 1;
            }
        }
        remaining -= 1;
    }

    let mut first = Vec::with_capacity(count_a);
    let mut second = Vec::with_capacity(count_b);
    for (item, group) in items.into_iter().zip(assigned) {
        match group {
            Some(Group::Second) => second.push(item),
            _ => first.push(item),
        }
    }
    (first, second)
}

/// Insert below `node`; returns the new sibling when `node` had to split.
fn insert_into(node: &mut Node, entry: Entry, min_entries: usize, max_entries: usize) -> Option<Node> {
    match &mut node.kind {
        NodeKind::Leaf(entries) => {
            entries.push(entry);
            if entries.len() > max_entries {
                let (keep, moved) = quadratic_split(std::mem::take(entries), min_entries);
                *entries = keep;
                node.refresh();
                return Some(Node::leaf(moved));
            }
        }
        NodeKind::Internal(children) => {
            let target = entry.bbox();
            let best = choose_subtree(children, &target);
            if let Some(sibling) = insert_into(&mut children[best], entry, min_entries, max_entries) {
                children.push(sibling);
                if children.len() > max_entries {
                    let (keep, moved) = quadratic_split(std::mem::take(children), min_entries);
                    *children = keep;
                    node.refresh();
                    return Some(Node::internal(moved));
                }
            }
        }
    }
    node.refresh();
    None
}

#[derive(Debug, Clone, Copy)]
struct Candidate {
    dist_sq: f64,
    id: RecordId,
}

impl PartialEq for Candidate {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for Candidate {}

impl PartialOrd for Candidate {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Candidate {
    fn cmp(&self, other: &Self) -> Ordering {
        cmp_candidates((self.dist_sq, self.id), (other.dist_sq, other.id))
    }
}

/// Node waiting in the traversal queue; ordered so the heap pops the closest.
struct QueuedNode<'a> {
    dist_sq: f64,
    node: &'a Node,
}

impl PartialEq for QueuedNode<'_> {
    fn eq(&self, other: &Self) -> bool {
        self.dist_sq.total_cmp(&other.dist_sq) == Ordering::Equal
    }
}

impl Eq for QueuedNode<'_> {}

impl PartialOrd for QueuedNode<'_> {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for QueuedNode<'_> {
    fn cmp(&self, other: &Self) -> Ordering {
        other.dist_sq.total_cmp(&self.dist_sq)
    }
}

impl RTree {
    /// Create an empty tree. Non-root nodes will hold between `min_entries`
    /// and `max_entries` children.
    ///
    /// # Panics
    ///
    /// Panics unless `max_entries >= 4` and `2 <= min_entries <= max_entries / 2`.
    pub fn new(min_entries: usize, max_entries: usize) -> Self {
        assert!(max_entries >= 4, "max_entries must be at least 4");
        assert!(
            (2..=max_entries / 2).contains(&min_entries),
            "min_entries must be between 2 and max_entries / 2"
        );

        Self {
            root: Node::leaf(Vec::new()),
            len: 0,
            min_entries,
            max_entries,
        }
    }

    /// Build a tree by inserting `entries` in order.
    ///
    /// Fails with `InvalidInput` when `config` does not validate.
    pub fn from_entries<I>(config: &Config, entries: I) -> Result<Self>
    where
        I: IntoIterator<Item = (RecordId, Point3d)>,
    {
        let mut tree = Self::with_config(config)?;
        for (id, point) in entries {
            tree.insert(id, point);
        }
        Ok(tree)
    }

    /// Add a point without a group.
    pub fn insert(&mut self, id: RecordId, point: Point3d) {
        self.insert_grouped(id, point, None);
    }

    /// Add a point labelled with `group`.
    pub fn insert_grouped(&mut self, id: RecordId, point: Point3d, group: Option<GroupTag>) {
        let entry = Entry { id, point, group };
        if let Some(sibling) = insert_into(&mut self.root, entry, self.min_entries, self.max_entries) {
            let old_root = std::mem::replace(&mut self.root, Node::leaf(Vec::new()));
            self.root = Node::internal(vec![old_root, sibling]);
        }
        self.len += 1;
    }

    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Bounding box of every stored point, `None` when empty.
    pub fn bounds(&self) -> Option<BoundingBox3D> {
        (self.len > 0).then_some(self.root.mbr)
    }

    /// Number of levels, leaves included.
    pub fn height(&self) -> usize {
        let mut height = 1;
        let mut node = &self.root;
        while let NodeKind::Internal(children) = &node.kind {
            match children.first() {
                Some(child) => node = child,
                None => break,
            }
            height += 1;
        }
        height
    }

    pub fn stats(&self) -> TreeStats {
        let mut stats = TreeStats {
            len: self.len,
            height: self.height(),
            ..TreeStats::default()
        };
        let mut stack = vec![&self.root];
        while let Some(node) = stack.pop() {
            stats.node_count += 1;
            match &node.kind {
                NodeKind::Leaf(_) => stats.leaf_count += 1,
                NodeKind::Internal(children) => stack.extend(children),
            }
        }
        stats
    }

    /// Iterate over every stored entry in tree order.
    pub fn iter(&self) -> Iter<'_> {
        Iter {
            stack: vec![&self.root],
            current: Default::default(),
        }
    }

    /// Up to `k` entries accepted by `filter`, nearest to `query` first.
    ///
    /// The filter only sees leaf entries, so no subtree is skipped on its
    /// account. See the module documentation for the pruning rules.
    pub fn nearest_where<F>(&self, query: &Point3d, k: usize, filter: F) -> Result<Vec<Neighbor>>
    where
        F: Fn(RecordId) -> bool,
    {
        self.search(query, k, |_| true, |entry| filter(entry.id))
    }

    /// Up to `k` entries tagged with `group`, nearest to `query` first.
    ///
    /// Subtrees without an entry of `group` are never entered.
    pub fn nearest_in_group(&self, query: &Point3d, k: usize, group: GroupTag) -> Result<Vec<Neighbor>> {
        self.search(
            query,
            k,
            |node| node.groups.contains(group),
            |entry| entry.group == Some(group),
        )
    }

    /// Up to `k` entries nearest to `query`.
    pub fn nearest(&self, query: &Point3d, k: usize) -> Result<Vec<Neighbor>> {
        self.search(query, k, |_| true, |_| true)
    }

    /// Best-first search. `enter` decides whether a node's subtree can hold
    /// matches at all; `accept` is asked about every leaf entry reached.
    fn search<N, E>(&self, query: &Point3d, k: usize, enter: N, mut accept: E) -> Result<Vec<Neighbor>>
    where
        N: Fn(&Node) -> bool,
        E: FnMut(&Entry) -> bool,
    {
        if self.len == 0 {
            return Ok(Vec::new());
        }
        validate_k(k)?;
        if !enter(&self.root) {
            return Ok(Vec::new());
        }

        let mut best: BinaryHeap<Candidate> = BinaryHeap::with_capacity(k.min(self.len) + 1);
        let mut queue = BinaryHeap::new();
        queue.push(QueuedNode {
            dist_sq: self.root.mbr.min_distance_squared(query),
            node: &self.root,
        });

        let beyond_kth = |best: &BinaryHeap<Candidate>, dist_sq: f64| {
            best.len() == k && best.peek().is_some_and(|worst| dist_sq > worst.dist_sq)
        };

        while let Some(QueuedNode { dist_sq, node }) = queue.pop() {
            if beyond_kth(&best, dist_sq) {
                break;
            }

            match &node.kind {
                NodeKind::Leaf(entries) => {
                    for entry in entries {
                        if !accept(entry) {
                            continue;
                        }
                        let candidate = Candidate {
                            dist_sq: entry.point.distance_squared(query),
                            id: entry.id,
                        };
                        if best.len() < k {
                            best.push(candidate);
                        } else if best.peek().is_some_and(|worst| candidate < *worst) {
                            best.pop();
                            best.push(candidate);
                        }
                    }
                }
                NodeKind::Internal(children) => {
                    for child in children {
                        if !enter(child) {
                            continue;
                        }
                        let child_dist = child.mbr.min_distance_squared(query);
                        if !beyond_kth(&best, child_dist) {
                            queue.push(QueuedNode {
                                dist_sq: child_dist,
                                node: child,
                            });
                        }
                    }
                }
            }
        }

        Ok(best
            .into_sorted_vec()
            .into_iter()
            .map(|c| Neighbor::new(c.id, c.dist_sq.sqrt()))
            .collect())
    }
}

impl SpatialIndex for RTree {
    fn with_config(config: &Config) -> Result<Self> {
        config.validate()?;
        Ok(Self::new(config.min_node_entries, config.max_node_entries))
    }

    fn insert_grouped(&mut self, id: RecordId, point: Point3d, group: Option<GroupTag>) {
        RTree::insert_grouped(self, id, point, group);
    }

    fn len(&self) -> usize {
        self.len
    }

    fn k_nearest_where(
        &self,
        query: &Point3d,
        k: usize,
        filter: &dyn Fn(RecordId) -> bool,
    ) -> Result<Vec<Neighbor>> {
        self.nearest_where(query, k, filter)
    }

    fn k_nearest_in_group(&self, query: &Point3d, k: usize, group: GroupTag) -> Result<Vec<Neighbor>> {
        self.nearest_in_group(query, k, group)
    }
}

impl Default for RTree {
    fn default() -> Self {
        let config = Config::default();
        Self::new(config.min_node_entries, config.max_node_entries)
    }
}

/// Depth-first iterator over the entries of an [`RTree`].
pub struct Iter<'a> {
    stack: Vec<&'a Node>,
    current: std::slice::Iter<'a, Entry>,
}

impl<'a> Iterator for Iter<'a> {
    type Item = &'a Entry;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            if let Some(entry) = self.current.next() {
                return Some(entry);
            }
            let node = self.stack.pop()?;
            match &node.kind {
                NodeKind::Leaf(entries) => self.current = entries.iter(),
                NodeKind::Internal(children) => self.stack.extend(children.iter().rev()),
            }
        }
    }
}
