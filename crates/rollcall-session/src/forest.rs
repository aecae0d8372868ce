//! The disjoint-set forest behind token propagation.
//!
//! Every participant of a round owns one slot in an arena. A slot's
//! `parent` is an index into the same arena (a root points at itself),
//! so the structure never needs self-referential ownership.
//!
//! Two rules decide who becomes root when components merge:
//!
//! 1. The teacher's slot is an absorbing root. Once the teacher is part
//!    of a component, it is that component's root for good.
//! 2. Otherwise union-by-rank. On a rank tie the second argument's root
//!    wins and its rank goes up by one.
//!
//! `find` compresses paths, so every slot it walks past ends up pointing
//! straight at the root.

use std::collections::HashMap;

use rollcall_protocol::Identity;

/// Which side of the classroom a slot belongs to.
///
/// Fixed when the forest is built from the known teacher identity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum NodeKind {
    Teacher,
    Student,
}

/// Index of a slot in a [`Forest`].
///
/// Only meaningful for the forest that handed it out. Every `Forest`
/// method taking a `NodeId` panics on an index past its own arena.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct NodeId(usize);

#[derive(Debug, Clone)]
struct Node {
    identity: Identity,
    kind: NodeKind,
    parent: usize,
    rank: u32,
}

/// Arena of union-find slots for one attendance round.
#[derive(Debug, Clone)]
pub struct Forest {
    nodes: Vec<Node>,
    index: HashMap<Identity, usize>,
    teacher: usize,
}

impl Forest {
    /// Builds a forest with one singleton slot per participant.
    ///
    /// The teacher always gets slot 0. A student entry equal to the
    /// teacher's identity, or repeated in `students`, doesn't get a
    /// second slot.
    pub fn new(teacher: Identity, students: impl IntoIterator<Item = Identity>) -> Self {
        let mut forest = Self {
            nodes: Vec::new(),
            index: HashMap::new(),
            teacher: 0,
        };
        forest.push(teacher, NodeKind::Teacher);
        for student in students {
            if !forest.index.contains_key(&student) {
                forest.push(student, NodeKind::Student);
            }
        }
        forest
    }

    fn push(&mut self, identity: Identity, kind: NodeKind) {
        let slot = self.nodes.len();
        self.index.insert(identity.clone(), slot);
        self.nodes.push(Node {
            identity,
            kind,
            parent: slot,
            rank: 0,
        });
    }

    /// Number of slots, teacher included.
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    /// Always `false`: a forest holds at least the teacher.
    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// The teacher's slot.
    pub fn teacher(&self) -> NodeId {
        NodeId(self.teacher)
    }

    /// Looks a participant up by identity.
    pub fn lookup(&self, identity: &str) -> Option<NodeId> {
        self.index.get(identity).copied().map(NodeId)
    }

    /// The identity held in `node`'s slot.
    ///
    /// # Panics
    ///
    /// If `node` came from a larger forest. The same holds for
    /// [`kind`](Self::kind), [`rank`](Self::rank) and
    /// [`is_root`](Self::is_root).
    pub fn identity(&self, node: NodeId) -> &Identity {
        &self.nodes[node.0].identity
    }

    pub fn kind(&self, node: NodeId) -> NodeKind {
        self.nodes[node.0].kind
    }

    pub fn rank(&self, node: NodeId) -> u32 {
        self.nodes[node.0].rank
    }

    /// `true` if `node` is the root of its component.
    pub fn is_root(&self, node: NodeId) -> bool {
        self.nodes[node.0].parent == node.0
    }

    /// Every student slot, in insertion order.
    pub fn students(&self) -> impl Iterator<Item = NodeId> + '_ {
        self.nodes
            .iter()
            .enumerate()
            .filter(|(_, node)| node.kind == NodeKind::Student)
            .map(|(slot, _)| NodeId(slot))
    }

    /// Returns the root of `node`'s component, re-pointing every slot on
    /// the way directly at it.
    pub fn find(&mut self, node: NodeId) -> NodeId {
        let mut root = node.0;
        while self.nodes[root].parent != root {
            root = self.nodes[root].parent;
        }

        let mut cursor = node.0;
        while cursor != root {
            let next = self.nodes[cursor].parent;
            self.nodes[cursor].parent = root;
            cursor = next;
        }

        NodeId(root)
    }

    /// Merges the components of `a` and `b`.
    ///
    /// A no-op when they already share a root, which keeps repeated
    /// unions from inflating ranks.
    pub fn union(&mut self, a: NodeId, b: NodeId) {
        let root_a = self.find(a).0;
        let root_b = self.find(b).0;
        if root_a == root_b {
            return;
        }

        if self.nodes[root_a].kind == NodeKind::Teacher {
            self.nodes[root_b].parent = root_a;
            return;
        }
        if self.nodes[root_b].kind == NodeKind::Teacher {
            self.nodes[root_a].parent = root_b;
            return;
        }

        let (rank_a, rank_b) = (self.nodes[root_a].rank, self.nodes[root_b].rank);
        if rank_a > rank_b {
            self.nodes[root_b].parent = root_a;
        } else {
            self.nodes[root_a].parent = root_b;
            if rank_a == rank_b {
                self.nodes[root_b].rank += 1;
            }
        }
    }

    /// `true` if `a` and `b` are in the same component.
    pub fn connected(&mut self, a: NodeId, b: NodeId) -> bool {
        self.find(a) == self.find(b)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn forest(students: &[&str]) -> Forest {
        Forest::new("T".into(), students.iter().map(|s| Identity::from(*s)))
    }

    fn id(forest: &Forest, name: &str) -> NodeId {
        forest.lookup(name).expect("participant exists")
    }

    #[test]
    fn test_new_every_node_is_its_own_root() {
        let f = forest(&["A", "B", "C"]);
        assert_eq!(f.len(), 4);
        for name in ["T", "A", "B", "C"] {
            assert!(f.is_root(id(&f, name)), "{name} should start as a root");
            assert_eq!(f.rank(id(&f, name)), 0);
        }
    }

    #[test]
    fn test_new_tags_teacher_by_position_not_by_content() {
        // A student whose identity looks teacher-ish is still a student.
        let f = Forest::new("prof-1".into(), ["T-student".into(), "TT".into()]);
        assert_eq!(f.kind(f.teacher()), NodeKind::Teacher);
        assert_eq!(f.kind(id(&f, "T-student")), NodeKind::Student);
        assert_eq!(f.kind(id(&f, "TT")), NodeKind::Student);
    }

    #[test]
    fn test_new_skips_duplicates_and_teacher_in_roster() {
        let f = Forest::new("T".into(), ["A".into(), "A".into(), "T".into()]);
        assert_eq!(f.len(), 2);
        assert_eq!(f.kind(id(&f, "T")), NodeKind::Teacher);
        assert_eq!(f.students().count(), 1);
    }

    #[test]
    #[should_panic]
    fn test_identity_with_node_from_larger_forest_panics() {
        let big = forest(&["A", "B", "C"]);
        let small = forest(&[]);
        let foreign = id(&big, "C");
        small.identity(foreign);
    }

    #[test]
    fn test_lookup_unknown_returns_none() {
        let f = forest(&["A"]);
        assert!(f.lookup("Z").is_none());
    }

    #[test]
    fn test_union_equal_rank_second_root_wins_and_ranks_up() {
        let mut f = forest(&["A", "B"]);
        let (a, b) = (id(&f, "A"), id(&f, "B"));

        f.union(a, b);

        assert_eq!(f.find(a), b);
        assert_eq!(f.rank(b), 1);
    }

    #[test]
    fn test_union_higher_rank_root_wins() {
        let mut f = forest(&["A", "B", "C"]);
        let (a, b, c) = (id(&f, "A"), id(&f, "B"), id(&f, "C"));
        f.union(a, b); // root B, rank 1

        f.union(b, c); // C has rank 0, B keeps the root

        assert_eq!(f.find(c), b);
        assert_eq!(f.rank(b), 1);
    }

    #[test]
    fn test_union_teacher_absorbs_regardless_of_rank() {
        let mut f = forest(&["A", "B", "C", "D"]);
        let (a, b, c, d) = (id(&f, "A"), id(&f, "B"), id(&f, "C"), id(&f, "D"));
        f.union(a, b);
        f.union(c, d);
        f.union(a, c); // rank-2 student component
        let t = f.teacher();

        f.union(a, t);

        assert!(f.is_root(t));
        for n in [a, b, c, d] {
            assert_eq!(f.find(n), t);
        }
    }

    #[test]
    fn test_union_teacher_as_first_argument_stays_root() {
        let mut f = forest(&["A"]);
        let (t, a) = (f.teacher(), id(&f, "A"));

        f.union(t, a);

        assert!(f.is_root(t));
        assert_eq!(f.find(a), t);
    }

    #[test]
    fn test_union_same_component_is_noop() {
        let mut f = forest(&["A", "B"]);
        let (a, b) = (id(&f, "A"), id(&f, "B"));
        f.union(a, b);

        f.union(a, b);
        f.union(b, a);

        assert_eq!(f.rank(b), 1, "repeated unions must not inflate rank");
        assert!(f.connected(a, b));
    }

    #[test]
    fn test_find_compresses_path() {
        let mut f = forest(&["A", "B", "C", "D"]);
        let (a, b, c, d) = (id(&f, "A"), id(&f, "B"), id(&f, "C"), id(&f, "D"));
        f.union(a, b); // A → B
        f.union(c, d); // C → D
        f.union(b, d); // B → D, so A → B → D

        let root = f.find(a);

        assert_eq!(root, d);
        // After compression A points straight at the root.
        assert_eq!(f.nodes[a.0].parent, d.0);
    }

    #[test]
    fn test_connected_is_false_across_components() {
        let mut f = forest(&["A", "B", "C"]);
        let (a, b, c) = (id(&f, "A"), id(&f, "B"), id(&f, "C"));
        f.union(a, b);
        assert!(f.connected(a, b));
        assert!(!f.connected(a, c));
    }
}
