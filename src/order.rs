//! Ordering engine (§4.G), grounded on
//! `examples/original_source/lib/order.c`: builds a predecessor/successor
//! relation graph from transaction members' dependencies, breaks cycles
//! by collapsing them into strongly connected components (Tarjan, using
//! the original's descending-index trick), and emits a topological order
//! via a priority queue keyed on "# of packages requiring this one"
//! (`tsi_qcnt`), added packages before removed ones.
//!
//! Tarjan's DFS is restated iteratively here (an explicit frame stack
//! instead of recursion) so a transaction with a long dependency chain
//! cannot blow the call stack; the traversal and lowlink bookkeeping are
//! otherwise the same algorithm.

use smallvec::SmallVec;
use tracing::{debug, warn};

use crate::avail::{AvailSet, FileIdentity};
use crate::header::HeaderOps;
use crate::model::{SenseFlags, Te, TeType, ORDER_IGNORE_FLAGS};

#[derive(Debug, Clone, Copy)]
struct Relation {
    succ: usize,
    flags: u32,
}

/// Most transaction elements require or are required by only a handful
/// of others; inlining the first 4 relations avoids a heap allocation
/// per node for the common case.
type RelationList = SmallVec<[Relation; 4]>;

#[derive(Debug, Clone, Default)]
struct Node {
    tsi_count: i32,
    tsi_qcnt: i32,
    relations: RelationList,
    forward_relations: RelationList,
    tsi_suc: Option<usize>,
    scc_idx: i32,
    scc_lowlink: i64,
    queued: bool,
}

struct SccInfo {
    members: Vec<usize>,
    count: i32,
}

fn is_legacy_prereq(flags: u32) -> bool {
    flags & SenseFlags::PREREQ == SenseFlags::PREREQ
}

fn is_install_prereq(flags: u32) -> u32 {
    flags & (SenseFlags::PREREQ | SenseFlags::SCRIPT_PRE | SenseFlags::SCRIPT_POST)
}

fn is_erase_prereq(flags: u32) -> u32 {
    flags & (SenseFlags::PREREQ | SenseFlags::SCRIPT_PREUN | SenseFlags::SCRIPT_POSTUN)
}

/// Records the "q <- p" relation (p requires q): bumps p's unresolved-
/// requires counter, q's required-by counter, and links both relation
/// lists. A no-op for self-relations; updates flags in place when the
/// most recently recorded relation between the same pair recurs (the
/// original only checks the list head, not the full history — a cheap
/// common-case dedup, not an exhaustive one).
fn add_single_relation(nodes: &mut [Node], mut p: usize, mut q: usize, p_original_type: TeType, ds_flags: u32) {
    if q == p {
        return;
    }
    let mut flags = if p_original_type == TeType::Removed {
        std::mem::swap(&mut p, &mut q);
        is_erase_prereq(ds_flags)
    } else {
        is_install_prereq(ds_flags)
    };
    if is_legacy_prereq(ds_flags) {
        flags |= if p_original_type == TeType::Added {
            SenseFlags::SCRIPT_PRE
        } else {
            SenseFlags::SCRIPT_PREUN
        };
    }

    if let Some(front) = nodes[q].relations.first() {
        if front.succ == p {
            nodes[q].relations[0].flags |= flags;
            nodes[p].forward_relations[0].flags |= flags;
            return;
        }
    }

    if p != q {
        nodes[p].tsi_count += 1;
    }
    nodes[q].relations.insert(0, Relation { succ: p, flags });
    if p != q {
        nodes[q].tsi_qcnt += 1;
    }
    nodes[p].forward_relations.insert(0, Relation { succ: q, flags });
}

/// Links every element sharing a `collection` name into a ring, so a
/// later cycle-breaking pass keeps them adjacent in the emitted order.
fn add_coll_relations(tes: &[Te], nodes: &mut [Node]) {
    use std::collections::BTreeMap;
    let mut groups: BTreeMap<&str, Vec<usize>> = BTreeMap::new();
    for (idx, te) in tes.iter().enumerate() {
        if let Some(name) = &te.collection {
            groups.entry(name.as_str()).or_default().push(idx);
        }
    }
    for members in groups.values() {
        if members.len() < 2 {
            continue;
        }
        for i in 0..members.len() {
            let p = members[i];
            let q = members[(i + 1) % members.len()];
            add_single_relation(nodes, p, q, tes[p].ty, SenseFlags::ANY);
        }
    }
}

/// Adds `p` to the queue anchored at `(head, tail)`, sorted by
/// `tsi_qcnt` ascending with colour-based head/tail tie-breaking:
/// installs push their non-preferred-colour members toward the tail,
/// erasures push their preferred-colour members toward the tail.
fn add_q(nodes: &mut [Node], tes: &[Te], p: usize, head: Option<usize>, tail: Option<usize>, pref_color: u32) -> (Option<usize>, Option<usize>) {
    nodes[p].queued = true;
    if tail.is_none() {
        return (Some(p), Some(p));
    }

    let p_color = tes[p].colour;
    let tail_cond = if tes[p].ty == TeType::Added {
        p_color != 0 && p_color != pref_color
    } else {
        p_color != 0 && p_color == pref_color
    };

    let mut q_prev: Option<usize> = None;
    let mut q = head;
    loop {
        let Some(qi) = q else { break };
        if tail_cond && p_color != tes[qi].colour {
            q_prev = Some(qi);
            q = nodes[qi].tsi_suc;
            continue;
        }
        if nodes[qi].tsi_qcnt <= nodes[p].tsi_qcnt {
            break;
        }
        q_prev = Some(qi);
        q = nodes[qi].tsi_suc;
    }

    let mut new_head = head;
    let mut new_tail = tail;
    match q_prev {
        None => {
            nodes[p].tsi_suc = q;
            new_head = Some(p);
        }
        Some(qp) => {
            if q.is_none() {
                nodes[qp].tsi_suc = Some(p);
                new_tail = Some(p);
            } else {
                nodes[p].tsi_suc = q;
                nodes[qp].tsi_suc = Some(p);
            }
        }
    }
    (new_head, new_tail)
}

/// Iterative restatement of `detectSCCs`' Tarjan pass. Unvisited nodes
/// carry `scc_idx == 0`; a node currently on the DFS stack carries a
/// negative `scc_idx` (its discovery index, counting down from -1);
/// once assigned to a completed component it carries a positive index
/// (`1` for a trivial singleton, `>= 2` for a real component).
fn detect_sccs(tes: &[Te], nodes: &mut [Node]) -> Vec<SccInfo> {
    let n = nodes.len();
    let mut index_counter: i32 = 0;
    let mut on_stack: Vec<usize> = Vec::new();
    let mut sccs: Vec<SccInfo> = Vec::new();

    struct Frame {
        node: usize,
        rel_idx: usize,
    }

    for start in 0..n {
        if nodes[start].scc_idx != 0 {
            continue;
        }
        let mut frames = vec![Frame { node: start, rel_idx: 0 }];
        index_counter -= 1;
        nodes[start].scc_idx = index_counter;
        nodes[start].scc_lowlink = index_counter as i64;
        on_stack.push(start);

        while let Some(frame) = frames.last_mut() {
            let v = frame.node;
            if frame.rel_idx < nodes[v].relations.len() {
                let w = nodes[v].relations[frame.rel_idx].succ;
                frame.rel_idx += 1;
                if nodes[w].scc_idx == 0 {
                    index_counter -= 1;
                    nodes[w].scc_idx = index_counter;
                    nodes[w].scc_lowlink = index_counter as i64;
                    on_stack.push(w);
                    frames.push(Frame { node: w, rel_idx: 0 });
                } else if nodes[w].scc_idx > 0 {
                    // already resolved into a finished component
                } else if nodes[v].scc_lowlink < nodes[w].scc_idx as i64 {
                    nodes[v].scc_lowlink = nodes[w].scc_idx as i64;
                }
            } else {
                frames.pop();
                if let Some(parent) = frames.last() {
                    let p = parent.node;
                    if nodes[p].scc_lowlink < nodes[v].scc_lowlink {
                        nodes[p].scc_lowlink = nodes[v].scc_lowlink;
                    }
                }
                if nodes[v].scc_lowlink == nodes[v].scc_idx as i64 {
                    if *on_stack.last().unwrap() == v {
                        on_stack.pop();
                        nodes[v].scc_idx = 1;
                    } else {
                        let scc_num = sccs.len() as i32 + 2;
                        let mut members = Vec::new();
                        loop {
                            let m = on_stack.pop().unwrap();
                            nodes[m].scc_idx = scc_num;
                            members.push(m);
                            if m == v {
                                break;
                            }
                        }
                        let mut count = 0;
                        for &m in &members {
                            count += nodes[m].tsi_count;
                            for rel in &nodes[m].relations {
                                if rel.succ != m && nodes[rel.succ].scc_idx == scc_num {
                                    count -= 1;
                                }
                            }
                        }
                        sccs.push(SccInfo { members, count });
                    }
                }
            }
        }
    }

    if !sccs.is_empty() {
        debug!(count = sccs.len(), "strongly connected components detected");
        for (i, scc) in sccs.iter().enumerate() {
            let names: Vec<&str> = scc.members.iter().map(|&m| tes[m].name.as_str()).collect();
            warn!(scc = i + 1, members = ?names, external_deps = scc.count, "dependency loop collapsed into a cycle-breaking group");
        }
    }
    sccs
}

fn collect_te(
    tes: &[Te],
    nodes: &mut [Node],
    q_idx: usize,
    new_order: &mut Vec<usize>,
    sccs: &mut [SccInfo],
    queue_tail: &mut Option<usize>,
    mut outer: Option<(&mut Option<usize>, &mut Option<usize>)>,
    pref_color: u32,
) {
    new_order.push(q_idx);

    let relations = nodes[q_idx].relations.clone();
    for rel in relations {
        let p = rel.succ;
        if p == q_idx || nodes[p].scc_idx == 0 {
            continue;
        }
        nodes[p].tsi_count -= 1;
        if nodes[p].tsi_count == 0 {
            if nodes[q_idx].scc_idx > 1 && nodes[q_idx].scc_idx != nodes[p].scc_idx {
                if let Some((oh, ot)) = outer.as_deref_mut() {
                    let (nh, nt) = add_q(nodes, tes, p, **oh, **ot, pref_color);
                    **oh = nh;
                    **ot = nt;
                }
            } else {
                let (nh, nt) = add_q(nodes, tes, p, nodes[q_idx].tsi_suc, *queue_tail, pref_color);
                nodes[q_idx].tsi_suc = nh;
                *queue_tail = nt;
            }
        }
        if nodes[p].scc_idx > 1 && nodes[p].scc_idx != nodes[q_idx].scc_idx {
            let scc_entry = &mut sccs[(nodes[p].scc_idx - 2) as usize];
            scc_entry.count -= 1;
            if scc_entry.count == 0 {
                if let Some((oh, ot)) = outer.as_deref_mut() {
                    let (nh, nt) = add_q(nodes, tes, p, **oh, **ot, pref_color);
                    **oh = nh;
                    **ot = nt;
                } else {
                    let (nh, nt) = add_q(nodes, tes, p, nodes[q_idx].tsi_suc, *queue_tail, pref_color);
                    nodes[q_idx].tsi_suc = nh;
                    *queue_tail = nt;
                }
            }
        }
    }
    nodes[q_idx].scc_idx = 0;
}

/// Multi-source Dijkstra over an SCC's internal forward relations,
/// starting from its prereq-bearing members (or, absent any, from every
/// member), used to pick a low-danger emission order within the cycle.
/// Then repeatedly emits the highest-distance still-pending member and
/// whatever it immediately frees, until the whole component is drained.
fn collect_scc(
    tes: &[Te],
    nodes: &mut [Node],
    p_idx: usize,
    new_order: &mut Vec<usize>,
    sccs: &mut [SccInfo],
    queue_tail: &mut Option<usize>,
    pref_color: u32,
) {
    let scc_num = nodes[p_idx].scc_idx;
    let members = sccs[(scc_num - 2) as usize].members.clone();

    let mut outer_head = nodes[p_idx].tsi_suc;
    nodes[p_idx].tsi_suc = None;

    const HALF_INF: i64 = i64::MAX / 2;
    for &m in &members {
        nodes[m].scc_lowlink = i64::MAX;
    }
    let mut queue: Vec<usize> = Vec::new();
    for &m in &members {
        for rel in &nodes[m].forward_relations {
            if rel.flags != 0 && nodes[rel.succ].scc_idx == scc_num {
                if rel.succ != m {
                    nodes[m].scc_lowlink = 0;
                    queue.push(m);
                } else {
                    nodes[m].scc_lowlink = HALF_INF;
                }
                break;
            }
        }
    }
    if queue.is_empty() {
        for &m in &members {
            if nodes[m].scc_lowlink != i64::MAX {
                queue.push(m);
            }
        }
    }
    let mut qi = 0;
    while qi < queue.len() {
        let v = queue[qi];
        qi += 1;
        let forward = nodes[v].forward_relations.clone();
        for rel in forward {
            if nodes[rel.succ].scc_idx != scc_num {
                continue;
            }
            if nodes[rel.succ].scc_lowlink > nodes[v].scc_lowlink + 1 {
                nodes[rel.succ].scc_lowlink = nodes[v].scc_lowlink + 1;
                queue.push(rel.succ);
            }
        }
    }

    loop {
        let mut best: Option<usize> = None;
        let mut best_score = i64::MIN;
        for &m in &members {
            if nodes[m].scc_idx == 0 {
                continue;
            }
            if nodes[m].scc_lowlink >= best_score {
                best = Some(m);
                best_score = nodes[m].scc_lowlink;
            }
        }
        let Some(best) = best else { break };

        let (inner_head, mut inner_tail) = add_q(nodes, tes, best, None, None, pref_color);

        let mut cur = inner_head;
        while let Some(c) = cur {
            nodes[c].queued = false;
            collect_te(tes, nodes, c, new_order, sccs, &mut inner_tail, Some((&mut outer_head, queue_tail)), pref_color);
            cur = nodes[c].tsi_suc;
        }
    }

    nodes[p_idx].tsi_suc = outer_head;
}

/// Computes a topological install/erase order for `tes`: installs first,
/// then removals, each internally ordered by "fewest other members still
/// waiting on me first". Cycles are collapsed into strongly connected
/// components and unwound with a cycle-breaking heuristic rather than
/// left to fail. Returns a permutation of `0..tes.len()`.
pub fn order(tes: &[Te], header: &dyn HeaderOps, identity: Option<&dyn FileIdentity>, ts_color: u32, pref_color: u32) -> Vec<usize> {
    let mut nodes: Vec<Node> = vec![Node::default(); tes.len()];

    let mut added_avail = AvailSet::new(ts_color, pref_color);
    let mut erased_avail = AvailSet::new(ts_color, pref_color);
    let mut added_map: Vec<usize> = Vec::new();
    let mut erased_map: Vec<usize> = Vec::new();
    let mut own_pkgnum: Vec<usize> = vec![0; tes.len()];

    for (idx, te) in tes.iter().enumerate() {
        match te.ty {
            TeType::Added => {
                own_pkgnum[idx] = added_map.len();
                added_map.push(idx);
                added_avail.add(te.clone());
            }
            TeType::Removed => {
                own_pkgnum[idx] = erased_map.len();
                erased_map.push(idx);
                erased_avail.add(te.clone());
            }
        }
    }

    for (p, te) in tes.iter().enumerate() {
        let (avail, map) = match te.ty {
            TeType::Added => (&mut added_avail, &added_map),
            TeType::Removed => (&mut erased_avail, &erased_map),
        };
        for ds in te.requires.iter().chain(te.order_hints.iter()) {
            if ds.sense.intersects(ORDER_IGNORE_FLAGS) {
                continue;
            }
            if let Some(q_pkgnum) = avail.satisfies(own_pkgnum[p], ds, header, identity) {
                let q = map[q_pkgnum];
                if q != p {
                    add_single_relation(&mut nodes, p, q, te.ty, ds.sense.0);
                }
            }
        }
    }

    add_coll_relations(tes, &mut nodes);

    let mut sccs = detect_sccs(tes, &mut nodes);
    let mut new_order = Vec::with_capacity(tes.len());

    for pass in 0..2 {
        let o_type = if pass == 0 { TeType::Added } else { TeType::Removed };
        let mut head: Option<usize> = None;
        let mut tail: Option<usize> = None;

        for e in 0..nodes.len() {
            if tes[e].ty != o_type || nodes[e].tsi_count != 0 {
                continue;
            }
            nodes[e].tsi_suc = None;
            let (nh, nt) = add_q(&mut nodes, tes, e, head, tail, pref_color);
            head = nh;
            tail = nt;
        }
        for scc in &sccs {
            if scc.count == 0 {
                let member0 = scc.members[0];
                if tes[member0].ty == o_type {
                    let (nh, nt) = add_q(&mut nodes, tes, member0, head, tail, pref_color);
                    head = nh;
                    tail = nt;
                }
            }
        }

        let mut q = head;
        while let Some(qi) = q {
            nodes[qi].queued = false;
            if nodes[qi].scc_idx > 1 {
                collect_scc(tes, &mut nodes, qi, &mut new_order, &mut sccs, &mut tail, pref_color);
            } else {
                collect_te(tes, &mut nodes, qi, &mut new_order, &mut sccs, &mut tail, None, pref_color);
            }
            q = nodes[qi].tsi_suc;
        }
    }

    new_order
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::header::SimpleHeader;
    use crate::model::{Ds, SenseFlags};

    fn req(name: &str) -> Ds {
        Ds::new(crate::model::tag::REQUIRENAME, name, "", SenseFlags(SenseFlags::ANY), 0)
    }

    fn provide(name: &str) -> Ds {
        Ds::new(crate::model::tag::PROVIDENAME, name, "", SenseFlags(SenseFlags::ANY), 0)
    }

    #[test]
    fn orders_a_simple_dependency_chain() {
        // c requires b requires a; install order must put a before b before c.
        let mut a = Te::new("a", "1-1", TeType::Added);
        a.provides.push(provide("a"));
        let mut b = Te::new("b", "1-1", TeType::Added);
        b.provides.push(provide("b"));
        b.requires.push(req("a"));
        let mut c = Te::new("c", "1-1", TeType::Added);
        c.requires.push(req("b"));

        let tes = vec![a, b, c];
        let header = SimpleHeader::new(vec![]);
        let result = order(&tes, &header, None, 0, 0);

        assert_eq!(result.len(), 3);
        let pos = |name: &str| result.iter().position(|&i| tes[i].name == name).unwrap();
        assert!(pos("a") < pos("b"));
        assert!(pos("b") < pos("c"));
    }

    #[test]
    fn installs_precede_removals() {
        let mut installed = Te::new("new-pkg", "2-1", TeType::Added);
        installed.provides.push(provide("new-pkg"));
        let removed = Te::new("old-pkg", "1-1", TeType::Removed);

        let tes = vec![removed, installed];
        let header = SimpleHeader::new(vec![]);
        let result = order(&tes, &header, None, 0, 0);

        assert_eq!(result.len(), 2);
        let pos = |name: &str| result.iter().position(|&i| tes[i].name == name).unwrap();
        assert!(pos("new-pkg") < pos("old-pkg"));
    }

    #[test]
    fn breaks_a_dependency_cycle_instead_of_hanging() {
        // a requires b and b requires a: a true cycle. The engine must
        // still terminate and emit both exactly once.
        let mut a = Te::new("a", "1-1", TeType::Added);
        a.provides.push(provide("a"));
        a.requires.push(req("b"));
        let mut b = Te::new("b", "1-1", TeType::Added);
        b.provides.push(provide("b"));
        b.requires.push(req("a"));

        let tes = vec![a, b];
        let header = SimpleHeader::new(vec![]);
        let result = order(&tes, &header, None, 0, 0);

        assert_eq!(result.len(), 2);
        assert!(result.contains(&0));
        assert!(result.contains(&1));
    }

    #[test]
    fn unrelated_packages_all_appear_exactly_once() {
        let tes: Vec<Te> = (0..5).map(|i| Te::new(format!("pkg{i}"), "1-1", TeType::Added)).collect();
        let header = SimpleHeader::new(vec![]);
        let result = order(&tes, &header, None, 0, 0);
        let mut sorted = result.clone();
        sorted.sort();
        assert_eq!(sorted, vec![0, 1, 2, 3, 4]);
    }
}
