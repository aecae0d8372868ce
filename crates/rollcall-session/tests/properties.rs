//! Property-based tests for token propagation.
//!
//! Presence is checked against a plain graph-reachability model: a
//! student is present iff some chain of passes links them to the
//! teacher, whatever order the passes arrived in.

use std::collections::{BTreeMap, HashSet, VecDeque};

use proptest::prelude::*;
use rollcall_protocol::{ClassroomId, Identity, RoundId};
use rollcall_session::{Forest, NodeKind, Session};

const STUDENTS: usize = 8;

/// Participant 0 is the teacher, 1..=STUDENTS are students.
fn name(slot: usize) -> Identity {
    if slot == 0 {
        Identity::from("teacher")
    } else {
        Identity::new(format!("s{slot}"))
    }
}

fn session() -> Session {
    Session::with_round_id(
        ClassroomId(7),
        RoundId::new("prop"),
        name(0),
        (1..=STUDENTS).map(name),
    )
}

fn passes() -> impl Strategy<Value = Vec<(usize, usize)>> {
    prop::collection::vec((0..=STUDENTS, 0..=STUDENTS), 0..24)
}

/// Students reachable from the teacher over undirected pass edges.
fn reachable_from_teacher(passes: &[(usize, usize)], marked: &[usize]) -> HashSet<usize> {
    let mut adjacent = vec![Vec::new(); STUDENTS + 1];
    for &(a, b) in passes {
        adjacent[a].push(b);
        adjacent[b].push(a);
    }
    for &m in marked {
        adjacent[0].push(m);
        adjacent[m].push(0);
    }

    let mut seen = HashSet::from([0]);
    let mut queue = VecDeque::from([0]);
    while let Some(slot) = queue.pop_front() {
        for &next in &adjacent[slot] {
            if seen.insert(next) {
                queue.push_back(next);
            }
        }
    }
    seen.remove(&0);
    seen
}

fn run(passes: &[(usize, usize)]) -> BTreeMap<Identity, bool> {
    let mut session = session();
    for &(a, b) in passes {
        session.pass_token(&name(a), &name(b)).expect("both are participants");
    }
    session
        .presence()
        .iter()
        .map(|(identity, present)| (identity.clone(), present))
        .collect()
}

proptest! {
    #[test]
    fn prop_presence_matches_reachability(passes in passes()) {
        let expected = reachable_from_teacher(&passes, &[]);
        let presence = run(&passes);

        prop_assert_eq!(presence.len(), STUDENTS);
        for slot in 1..=STUDENTS {
            prop_assert_eq!(
                presence[&name(slot)],
                expected.contains(&slot),
                "student s{} disagrees with the model",
                slot
            );
        }
    }

    #[test]
    fn prop_pass_order_does_not_matter(passes in passes()) {
        let mut reversed = passes.clone();
        reversed.reverse();
        prop_assert_eq!(run(&passes), run(&reversed));
    }

    #[test]
    fn prop_repeating_passes_is_idempotent(passes in passes()) {
        let doubled: Vec<_> = passes.iter().chain(passes.iter()).copied().collect();
        prop_assert_eq!(run(&passes), run(&doubled));
    }

    #[test]
    fn prop_teacher_is_always_a_root(passes in passes()) {
        let mut forest = Forest::new(name(0), (1..=STUDENTS).map(name));
        for &(a, b) in &passes {
            let a = forest.lookup(name(a).as_str()).expect("participant");
            let b = forest.lookup(name(b).as_str()).expect("participant");
            forest.union(a, b);
        }

        let teacher = forest.teacher();
        prop_assert!(forest.is_root(teacher));
        prop_assert_eq!(forest.kind(teacher), NodeKind::Teacher);
        prop_assert_eq!(forest.find(teacher), teacher);
    }

    #[test]
    fn prop_connectivity_is_symmetric_and_transitive(passes in passes()) {
        let mut forest = Forest::new(name(0), (1..=STUDENTS).map(name));
        for &(a, b) in &passes {
            let a = forest.lookup(name(a).as_str()).expect("participant");
            let b = forest.lookup(name(b).as_str()).expect("participant");
            forest.union(a, b);
        }

        let nodes: Vec<_> = (0..=STUDENTS)
            .map(|slot| forest.lookup(name(slot).as_str()).expect("participant"))
            .collect();
        for &a in &nodes {
            for &b in &nodes {
                prop_assert_eq!(forest.connected(a, b), forest.connected(b, a));
                for &c in &nodes {
                    if forest.connected(a, b) && forest.connected(b, c) {
                        prop_assert!(forest.connected(a, c));
                    }
                }
            }
        }
    }

    #[test]
    fn prop_mark_present_matches_model(
        passes in passes(),
        marked in prop::collection::vec(1..=STUDENTS, 0..4),
    ) {
        let mut session = session();
        for &(a, b) in &passes {
            session.pass_token(&name(a), &name(b)).expect("both are participants");
        }
        let identities: Vec<_> = marked.iter().map(|&m| name(m)).collect();
        session.mark_present(&identities).expect("all are participants");

        let expected = reachable_from_teacher(&passes, &marked);
        let attendance = session.finalize(&[]).expect("round is active");
        for slot in 1..=STUDENTS {
            prop_assert_eq!(
                attendance.is_present(name(slot).as_str()),
                Some(expected.contains(&slot))
            );
        }
        prop_assert_eq!(attendance.present_count(), expected.len());
    }
}
