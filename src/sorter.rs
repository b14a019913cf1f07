//! Provider ordering
//!
//! One sort routine serves both the phase-only diagnostic sort and the full
//! provider sort, so the tie-break rule has a single source of truth. The
//! graph encodes "must run before" edges from three sources: explicit
//! per-provider constraints, the phase chain, and phase membership (each
//! phase node precedes its members, and each member precedes the next phase
//! in the chain, so whole phases act as barriers). A stable Kahn's
//! algorithm resolves ties by discovery order, which makes the result
//! reproducible for a fixed provider set.

use crate::provider::{OrderingRef, RuleProvider};
use log::{debug, warn};
use std::collections::{BTreeSet, HashMap};
use std::sync::Arc;
use thiserror::Error;

/// Error produced when no total order exists
#[derive(Debug, Error)]
pub enum SortError {
    #[error("cycle detected in provider ordering: {}", participants.join(" -> "))]
    Cycle {
        /// Ids of the providers/phases participating in the cycle
        participants: Vec<String>,
    },
}

/// Topologically sort providers by phase and explicit constraints
///
/// Providers unordered relative to one another keep their discovery order.
/// Constraints referencing ids absent from this load are ignored.
pub fn sort(
    providers: Vec<Arc<dyn RuleProvider>>,
) -> Result<Vec<Arc<dyn RuleProvider>>, SortError> {
    if providers.len() <= 1 {
        return Ok(providers);
    }

    let n = providers.len();

    // id -> node indices; override providers may legitimately share an id
    // with the provider they target, so an id can map to several nodes
    let mut by_id: HashMap<&str, Vec<usize>> = HashMap::new();
    let mut phase_by_id: HashMap<&str, usize> = HashMap::new();
    let mut phase_nodes: Vec<usize> = Vec::new();
    let mut members: HashMap<&str, Vec<usize>> = HashMap::new();

    for (i, provider) in providers.iter().enumerate() {
        let meta = provider.metadata();
        by_id.entry(meta.id.as_str()).or_default().push(i);
        if meta.is_phase {
            phase_by_id.insert(meta.id.as_str(), i);
            phase_nodes.push(i);
        } else {
            members.entry(meta.phase.as_str()).or_default().push(i);
        }
    }

    let mut edges: Vec<BTreeSet<usize>> = vec![BTreeSet::new(); n];

    // explicit per-provider constraints
    for i in 0..n {
        let meta = providers[i].metadata();
        for target in &meta.executes_after {
            match target {
                OrderingRef::Provider(id) => match by_id.get(id.as_str()) {
                    Some(nodes) => {
                        for &t in nodes {
                            edges[t].insert(i);
                        }
                    }
                    None => debug!(
                        "provider '{}' ordered after unknown provider '{}'; ignoring",
                        meta.id, id
                    ),
                },
                OrderingRef::Phase(id) => match phase_by_id.get(id.as_str()) {
                    Some(&p) => {
                        edges[p].insert(i);
                        if let Some(in_phase) = members.get(id.as_str()) {
                            for &m in in_phase {
                                if m != i {
                                    edges[m].insert(i);
                                }
                            }
                        }
                    }
                    None => debug!(
                        "provider '{}' ordered after unknown phase '{}'; ignoring",
                        meta.id, id
                    ),
                },
            }
        }
        for target in &meta.executes_before {
            let resolved = match target {
                OrderingRef::Provider(id) => by_id.get(id.as_str()).cloned(),
                OrderingRef::Phase(id) => phase_by_id.get(id.as_str()).map(|&p| vec![p]),
            };
            match resolved {
                Some(nodes) => {
                    for t in nodes {
                        edges[i].insert(t);
                    }
                }
                None => debug!(
                    "provider '{}' ordered before an unknown target; ignoring",
                    meta.id
                ),
            }
        }
    }

    // phase-only order first: it depends solely on the phases' own
    // constraints, so it is computable even when user constraints cycle
    let phase_order = kahn(&phase_nodes, &edges, &providers)?;
    let mut next_phase: HashMap<usize, usize> = HashMap::new();
    for window in phase_order.windows(2) {
        next_phase.insert(window[0], window[1]);
    }

    // membership edges: phase -> member, member -> next phase
    for i in 0..n {
        let meta = providers[i].metadata();
        if meta.is_phase {
            continue;
        }
        match phase_by_id.get(meta.phase.as_str()) {
            Some(&p) => {
                edges[p].insert(i);
                if let Some(&np) = next_phase.get(&p) {
                    edges[i].insert(np);
                }
            }
            None => warn!(
                "provider '{}' declares unknown phase '{}'; it will only be ordered by explicit constraints",
                meta.id, meta.phase
            ),
        }
    }

    let all: Vec<usize> = (0..n).collect();
    let order = kahn(&all, &edges, &providers)?;
    Ok(order.into_iter().map(|i| Arc::clone(&providers[i])).collect())
}

/// Phase-only sub-ordering, used for diagnostics before the full sort
pub fn sort_phases(
    providers: &[Arc<dyn RuleProvider>],
) -> Result<Vec<Arc<dyn RuleProvider>>, SortError> {
    let phases: Vec<Arc<dyn RuleProvider>> = providers
        .iter()
        .filter(|p| p.metadata().is_phase)
        .cloned()
        .collect();
    sort(phases)
}

/// Stable Kahn's algorithm over a subset of nodes
///
/// Among ready nodes, the lowest discovery index is emitted first.
fn kahn(
    nodes: &[usize],
    edges: &[BTreeSet<usize>],
    providers: &[Arc<dyn RuleProvider>],
) -> Result<Vec<usize>, SortError> {
    let subset: BTreeSet<usize> = nodes.iter().copied().collect();
    let mut indegree: HashMap<usize, usize> = nodes.iter().map(|&u| (u, 0)).collect();
    for &u in nodes {
        for v in &edges[u] {
            if subset.contains(v) {
                *indegree.get_mut(v).unwrap() += 1;
            }
        }
    }

    let mut emitted: BTreeSet<usize> = BTreeSet::new();
    let mut order = Vec::with_capacity(nodes.len());

    while order.len() < nodes.len() {
        let ready = nodes
            .iter()
            .copied()
            .find(|u| !emitted.contains(u) && indegree[u] == 0);

        let u = match ready {
            Some(u) => u,
            None => {
                return Err(SortError::Cycle {
                    participants: cycle_participants(nodes, edges, &emitted, providers),
                })
            }
        };

        emitted.insert(u);
        order.push(u);
        for v in &edges[u] {
            if subset.contains(v) && !emitted.contains(v) {
                *indegree.get_mut(v).unwrap() -= 1;
            }
        }
    }

    Ok(order)
}

/// Narrow the unemitted remainder down to the nodes actually on a cycle
fn cycle_participants(
    nodes: &[usize],
    edges: &[BTreeSet<usize>],
    emitted: &BTreeSet<usize>,
    providers: &[Arc<dyn RuleProvider>],
) -> Vec<String> {
    let mut remaining: BTreeSet<usize> = nodes
        .iter()
        .copied()
        .filter(|u| !emitted.contains(u))
        .collect();

    // strip nodes that cannot be on a cycle until a fixpoint is reached
    loop {
        let removable: Vec<usize> = remaining
            .iter()
            .copied()
            .filter(|&u| {
                let has_out = edges[u].iter().any(|v| remaining.contains(v));
                let has_in = remaining.iter().any(|&w| edges[w].contains(&u));
                !has_out || !has_in
            })
            .collect();
        if removable.is_empty() {
            break;
        }
        for u in removable {
            remaining.remove(&u);
        }
    }

    remaining
        .into_iter()
        .map(|u| providers[u].metadata().id.to_string())
        .collect()
}
