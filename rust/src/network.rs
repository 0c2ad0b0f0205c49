//! Activity network: the dependency DAG over a project's activities.

use rustc_hash::FxHashMap;
use std::cmp::Reverse;
use std::collections::BinaryHeap;
use thiserror::Error;

use crate::models::Project;

/// Dense index of an activity within one network.
pub type ActivityId = u32;

/// Error types for network construction.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum NetworkError {
    /// The activities listed (in name order) could not be ordered.
    #[error("Circular dependency detected among activities: {}", .0.join(", "))]
    Cycle(Vec<String>),
    #[error("Activity '{activity}' references unknown predecessor '{predecessor}'")]
    UnknownPredecessor {
        activity: String,
        predecessor: String,
    },
}

/// Dependency DAG with a deterministic topological order.
///
/// IDs are assigned in name order, and ties in the topological sort are broken
/// by lowest ID, so identical projects always yield identical orderings.
#[derive(Clone, Debug)]
pub struct ActivityNetwork {
    /// Names sorted ascending; position is the activity's ID.
    names: Vec<String>,
    ids: FxHashMap<String, ActivityId>,
    predecessors: Vec<Vec<ActivityId>>,
    successors: Vec<Vec<ActivityId>>,
    topo_order: Vec<ActivityId>,
}

impl ActivityNetwork {
    /// Build the network from a project.
    ///
    /// Fails on the first unknown predecessor (activities checked in name
    /// order), or if the dependency relation has a cycle.
    pub fn build(project: &Project) -> Result<Self, NetworkError> {
        let names: Vec<String> = project
            .activity_names()
            .into_iter()
            .map(str::to_string)
            .collect();
        let ids: FxHashMap<String, ActivityId> = names
            .iter()
            .enumerate()
            .map(|(idx, name)| (name.clone(), idx as ActivityId))
            .collect();

        let n = names.len();
        let mut predecessors: Vec<Vec<ActivityId>> = vec![Vec::new(); n];
        let mut successors: Vec<Vec<ActivityId>> = vec![Vec::new(); n];

        for (idx, name) in names.iter().enumerate() {
            let Some(activity) = project.activity(name) else {
                continue;
            };
            for pred in activity.predecessors() {
                let pred_id = ids
                    .get(pred.as_str())
                    .copied()
                    .ok_or_else(|| NetworkError::UnknownPredecessor {
                        activity: name.to_string(),
                        predecessor: pred.clone(),
                    })?;
                predecessors[idx].push(pred_id);
                successors[pred_id as usize].push(idx as ActivityId);
            }
        }

        let topo_order = topological_sort(&predecessors, &successors).map_err(|stuck| {
            NetworkError::Cycle(
                stuck
                    .into_iter()
                    .map(|id| names[id as usize].clone())
                    .collect(),
            )
        })?;

        Ok(Self {
            names,
            ids,
            predecessors,
            successors,
            topo_order,
        })
    }

    pub fn len(&self) -> usize {
        self.names.len()
    }

    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }

    #[inline]
    pub fn id(&self, name: &str) -> Option<ActivityId> {
        self.ids.get(name).copied()
    }

    /// Name of an activity ID handed out by this network.
    #[inline]
    pub fn name(&self, id: ActivityId) -> &str {
        &self.names[id as usize]
    }

    #[inline]
    pub fn predecessors(&self, id: ActivityId) -> &[ActivityId] {
        &self.predecessors[id as usize]
    }

    #[inline]
    pub fn successors(&self, id: ActivityId) -> &[ActivityId] {
        &self.successors[id as usize]
    }

    /// Activity IDs ordered so every predecessor precedes its successors.
    pub fn topological_order(&self) -> &[ActivityId] {
        &self.topo_order
    }

    /// Activities with no predecessors, in topological order.
    pub fn sources(&self) -> impl Iterator<Item = ActivityId> + '_ {
        self.topo_order
            .iter()
            .copied()
            .filter(|&id| self.predecessors(id).is_empty())
    }

    /// Activities with no successors, in topological order.
    pub fn sinks(&self) -> impl Iterator<Item = ActivityId> + '_ {
        self.topo_order
            .iter()
            .copied()
            .filter(|&id| self.successors(id).is_empty())
    }
}

/// Kahn's algorithm with a min-heap so ready activities leave in ID order.
///
/// On a cycle, returns the IDs that never became ready, ascending.
fn topological_sort(
    predecessors: &[Vec<ActivityId>],
    successors: &[Vec<ActivityId>],
) -> Result<Vec<ActivityId>, Vec<ActivityId>> {
    let n = predecessors.len();
    let mut in_degree: Vec<usize> = predecessors.iter().map(Vec::len).collect();

    let mut ready: BinaryHeap<Reverse<ActivityId>> = in_degree
        .iter()
        .enumerate()
        .filter(|(_, &degree)| degree == 0)
        .map(|(id, _)| Reverse(id as ActivityId))
        .collect();

    let mut order = Vec::with_capacity(n);
    while let Some(Reverse(id)) = ready.pop() {
        order.push(id);
        for &succ in &successors[id as usize] {
            let degree = &mut in_degree[succ as usize];
            *degree -= 1;
            if *degree == 0 {
                ready.push(Reverse(succ));
            }
        }
    }

    if order.len() != n {
        let stuck = (0..n)
            .filter(|&id| in_degree[id] > 0)
            .map(|id| id as ActivityId)
            .collect();
        return Err(stuck);
    }

    Ok(order)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::EngineConfig;
    use crate::models::ActivityRecord;

    fn make_project(specs: &[(&str, u32, &[&str])]) -> Project {
        Project::from_records(
            EngineConfig::default(),
            specs.iter().map(|(name, duration, preds)| {
                ActivityRecord::new(*name, *duration).with_predecessors(preds.iter().copied())
            }),
        )
        .unwrap()
    }

    fn order_names(network: &ActivityNetwork) -> Vec<&str> {
        network
            .topological_order()
            .iter()
            .map(|&id| network.name(id))
            .collect()
    }

    #[test]
    fn test_chain_order() {
        let project = make_project(&[("c", 1, &["b"]), ("b", 1, &["a"]), ("a", 1, &[])]);
        let network = ActivityNetwork::build(&project).unwrap();
        assert_eq!(order_names(&network), vec!["a", "b", "c"]);
    }

    #[test]
    fn test_ties_broken_by_name() {
        // z and m are both ready after a; m must come first
        let project = make_project(&[
            ("a", 1, &[]),
            ("z", 1, &["a"]),
            ("m", 1, &["a"]),
            ("end", 1, &["m", "z"]),
        ]);
        let network = ActivityNetwork::build(&project).unwrap();
        assert_eq!(order_names(&network), vec!["a", "m", "z", "end"]);
    }

    #[test]
    fn test_predecessor_and_successor_lookup() {
        let project = make_project(&[("a", 1, &[]), ("b", 1, &["a"]), ("c", 1, &["a"])]);
        let network = ActivityNetwork::build(&project).unwrap();
        let a = network.id("a").unwrap();
        let b = network.id("b").unwrap();

        let succ: Vec<&str> = network.successors(a).iter().map(|&s| network.name(s)).collect();
        assert_eq!(succ, vec!["b", "c"]);
        assert_eq!(network.predecessors(b), &[a]);
        assert_eq!(network.sources().collect::<Vec<_>>(), vec![a]);
        assert_eq!(network.sinks().count(), 2);
    }

    #[test]
    fn test_ids_follow_name_order() {
        let project = make_project(&[("b", 1, &[]), ("c", 1, &[]), ("a", 1, &[])]);
        let network = ActivityNetwork::build(&project).unwrap();
        assert_eq!(network.len(), 3);
        for (expected, name) in ["a", "b", "c"].into_iter().enumerate() {
            let id = network.id(name).unwrap();
            assert_eq!(id, expected as ActivityId);
            assert_eq!(network.name(id), name);
        }
        assert_eq!(network.id("missing"), None);
    }

    #[test]
    fn test_unknown_predecessor() {
        let project = make_project(&[("a", 1, &[]), ("b", 1, &["ghost"])]);
        let err = ActivityNetwork::build(&project).unwrap_err();
        assert_eq!(
            err,
            NetworkError::UnknownPredecessor {
                activity: "b".to_string(),
                predecessor: "ghost".to_string(),
            }
        );
    }

    #[test]
    fn test_cycle_detected() {
        let project = make_project(&[("start", 1, &[]), ("a", 1, &["b"]), ("b", 1, &["a"])]);
        let err = ActivityNetwork::build(&project).unwrap_err();
        assert_eq!(err, NetworkError::Cycle(vec!["a".to_string(), "b".to_string()]));
    }

    #[test]
    fn test_self_dependency_is_a_cycle() {
        let project = make_project(&[("a", 1, &["a"])]);
        assert!(matches!(
            ActivityNetwork::build(&project),
            Err(NetworkError::Cycle(_))
        ));
    }

    #[test]
    fn test_empty_project() {
        let network = ActivityNetwork::build(&Project::default()).unwrap();
        assert!(network.is_empty());
        assert!(network.topological_order().is_empty());
    }
}
