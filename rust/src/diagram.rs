//! Structural data for network diagrams (activity-on-node and activity-on-arrow).
//!
//! Nothing here knows about layout or drawing; renderers consume the plain
//! node/edge lists.

use rustc_hash::FxHashMap;

use crate::network::{ActivityId, ActivityNetwork};

/// Event (node) number in an activity-on-arrow network. Numbering starts at 1.
pub type EventId = u32;

/// An arrow between two events. `activity` is `None` for dummy arrows.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Arrow {
    pub from: EventId,
    pub to: EventId,
    pub activity: Option<String>,
}

impl Arrow {
    pub fn is_dummy(&self) -> bool {
        self.activity.is_none()
    }
}

/// Activity-on-arrow network.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ArrowDiagram {
    pub event_count: u32,
    pub arrows: Vec<Arrow>,
}

impl ArrowDiagram {
    pub fn start_event(&self) -> EventId {
        1
    }

    /// The event with no outgoing arrows.
    pub fn end_event(&self) -> EventId {
        self.event_count
    }
}

/// Activity-on-node edges `(predecessor, activity)` in topological order of the target.
pub fn node_edges(network: &ActivityNetwork) -> Vec<(String, String)> {
    let mut edges = Vec::new();
    for &id in network.topological_order() {
        for &pred in network.predecessors(id) {
            edges.push((network.name(pred).to_string(), network.name(id).to_string()));
        }
    }
    edges
}

/// Build an activity-on-arrow network.
///
/// All source activities leave event 1. An activity with one predecessor
/// starts at that predecessor's end event; one with several starts at a merge
/// event fed by dummy arrows, shared by activities with the same predecessor
/// set. Multiple sinks are joined into a final event with dummy arrows.
pub fn arrow_diagram(network: &ActivityNetwork) -> ArrowDiagram {
    let mut next_event: EventId = 1;
    let mut new_event = || {
        next_event += 1;
        next_event
    };

    let start: EventId = 1;
    let mut arrows = Vec::new();
    let mut end_events: FxHashMap<ActivityId, EventId> = FxHashMap::default();
    let mut merge_events: FxHashMap<Vec<ActivityId>, EventId> = FxHashMap::default();

    for &id in network.topological_order() {
        let preds = network.predecessors(id);
        let from = match preds {
            [] => start,
            [single] => end_events[single],
            many => {
                let mut key = many.to_vec();
                key.sort_unstable();
                match merge_events.get(&key) {
                    Some(&event) => event,
                    None => {
                        let merge = new_event();
                        for pred in &key {
                            arrows.push(Arrow {
                                from: end_events[pred],
                                to: merge,
                                activity: None,
                            });
                        }
                        merge_events.insert(key, merge);
                        merge
                    }
                }
            }
        };

        let to = new_event();
        end_events.insert(id, to);
        arrows.push(Arrow {
            from,
            to,
            activity: Some(network.name(id).to_string()),
        });
    }

    let sinks: Vec<ActivityId> = network.sinks().collect();
    if sinks.len() > 1 {
        let finish = new_event();
        for sink in sinks {
            arrows.push(Arrow {
                from: end_events[&sink],
                to: finish,
                activity: None,
            });
        }
    }

    ArrowDiagram {
        event_count: next_event,
        arrows,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::EngineConfig;
    use crate::models::{ActivityRecord, Project};

    fn make_network(specs: &[(&str, &[&str])]) -> ActivityNetwork {
        let project = Project::from_records(
            EngineConfig::default(),
            specs
                .iter()
                .map(|(name, preds)| ActivityRecord::new(*name, 1).with_predecessors(preds.iter().copied())),
        )
        .unwrap();
        ActivityNetwork::build(&project).unwrap()
    }

    fn arrow_for<'a>(diagram: &'a ArrowDiagram, activity: &str) -> &'a Arrow {
        diagram
            .arrows
            .iter()
            .find(|a| a.activity.as_deref() == Some(activity))
            .unwrap()
    }

    #[test]
    fn test_node_edges() {
        let network = make_network(&[("A", &[]), ("B", &["A"]), ("C", &["A", "B"])]);
        assert_eq!(
            node_edges(&network),
            vec![
                ("A".to_string(), "B".to_string()),
                ("A".to_string(), "C".to_string()),
                ("B".to_string(), "C".to_string()),
            ]
        );
    }

    #[test]
    fn test_chain_has_no_dummies() {
        let network = make_network(&[("A", &[]), ("B", &["A"]), ("C", &["B"])]);
        let diagram = arrow_diagram(&network);

        assert_eq!(diagram.event_count, 4);
        assert!(diagram.arrows.iter().all(|a| !a.is_dummy()));
        assert_eq!(arrow_for(&diagram, "A").from, diagram.start_event());
        assert_eq!(arrow_for(&diagram, "B").from, arrow_for(&diagram, "A").to);
        assert_eq!(arrow_for(&diagram, "C").to, diagram.end_event());
    }

    #[test]
    fn test_merge_uses_dummies_and_sinks_join() {
        // A, B -> C; A -> D. Sinks C and D join at the end.
        let network = make_network(&[("A", &[]), ("B", &[]), ("C", &["A", "B"]), ("D", &["A"])]);
        let diagram = arrow_diagram(&network);

        let a = arrow_for(&diagram, "A");
        let b = arrow_for(&diagram, "B");
        let c = arrow_for(&diagram, "C");
        let d = arrow_for(&diagram, "D");

        assert_eq!(a.from, 1);
        assert_eq!(b.from, 1);
        assert_eq!(d.from, a.to);
        assert!(diagram.arrows.contains(&Arrow { from: a.to, to: c.from, activity: None }));
        assert!(diagram.arrows.contains(&Arrow { from: b.to, to: c.from, activity: None }));
        assert!(diagram.arrows.contains(&Arrow { from: c.to, to: diagram.end_event(), activity: None }));
        assert!(diagram.arrows.contains(&Arrow { from: d.to, to: diagram.end_event(), activity: None }));

        let dummies = diagram.arrows.iter().filter(|a| a.is_dummy()).count();
        assert_eq!(dummies, 4);
    }

    #[test]
    fn test_shared_merge_event() {
        let network = make_network(&[("A", &[]), ("B", &[]), ("C", &["A", "B"]), ("D", &["B", "A"])]);
        let diagram = arrow_diagram(&network);
        assert_eq!(arrow_for(&diagram, "C").from, arrow_for(&diagram, "D").from);
    }
}
