//! Causality edges between events.
//!
//! Append-only. Edges always point forward in simulated time, so no cycle
//! detection is done.

use serde::{Deserialize, Serialize};
use std::collections::{HashSet, VecDeque};

use crate::timestamp::SimDate;

/// Why one event led to another.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CausalReason {
    /// A resolved choice scheduled a follow-up event
    FollowUp,
    /// A crisis produced an aftermath event
    Aftermath,
}

/// Directed link: `cause` helped enable `effect`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CausalEdge {
    pub cause: String,
    pub effect: String,
    pub reason: CausalReason,
    pub recorded_on: SimDate,
}

impl CausalEdge {
    pub fn new(
        cause: impl Into<String>,
        effect: impl Into<String>,
        reason: CausalReason,
        recorded_on: SimDate,
    ) -> Self {
        Self {
            cause: cause.into(),
            effect: effect.into(),
            reason,
            recorded_on,
        }
    }
}

/// All causality edges recorded for one profile.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CausalityLog {
    edges: Vec<CausalEdge>,
}

impl CausalityLog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends an edge. Self-loops and exact duplicates are ignored.
    ///
    /// Returns true if the edge was added.
    pub fn record(&mut self, edge: CausalEdge) -> bool {
        if edge.cause == edge.effect {
            return false;
        }
        if self
            .edges
            .iter()
            .any(|e| e.cause == edge.cause && e.effect == edge.effect)
        {
            return false;
        }
        self.edges.push(edge);
        true
    }

    pub fn extend(&mut self, edges: impl IntoIterator<Item = CausalEdge>) {
        for edge in edges {
            self.record(edge);
        }
    }

    pub fn edges(&self) -> &[CausalEdge] {
        &self.edges
    }

    pub fn len(&self) -> usize {
        self.edges.len()
    }

    pub fn is_empty(&self) -> bool {
        self.edges.is_empty()
    }

    /// Events directly enabled by `cause`, in recording order.
    pub fn effects_of(&self, cause: &str) -> Vec<&str> {
        self.edges
            .iter()
            .filter(|e| e.cause == cause)
            .map(|e| e.effect.as_str())
            .collect()
    }

    /// Events that directly enabled `effect`.
    pub fn causes_of(&self, effect: &str) -> Vec<&str> {
        self.edges
            .iter()
            .filter(|e| e.effect == effect)
            .map(|e| e.cause.as_str())
            .collect()
    }

    /// Every event transitively reachable from `root`, breadth-first.
    pub fn chain_from(&self, root: &str) -> Vec<String> {
        let mut seen: HashSet<&str> = HashSet::new();
        let mut queue: VecDeque<&str> = VecDeque::new();
        let mut chain = Vec::new();

        seen.insert(root);
        queue.push_back(root);
        while let Some(current) = queue.pop_front() {
            for effect in self.effects_of(current) {
                if seen.insert(effect) {
                    chain.push(effect.to_string());
                    queue.push_back(effect);
                }
            }
        }
        chain
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn edge(cause: &str, effect: &str) -> CausalEdge {
        CausalEdge::new(
            cause,
            effect,
            CausalReason::FollowUp,
            "2000-01-01".parse().unwrap(),
        )
    }

    #[test]
    fn test_record_ignores_loops_and_duplicates() {
        let mut log = CausalityLog::new();
        assert!(log.record(edge("a", "b")));
        assert!(!log.record(edge("a", "b")));
        assert!(!log.record(edge("c", "c")));
        assert_eq!(log.len(), 1);
    }

    #[test]
    fn test_queries() {
        let mut log = CausalityLog::new();
        log.extend([edge("a", "b"), edge("a", "c"), edge("b", "d")]);

        assert_eq!(log.effects_of("a"), vec!["b", "c"]);
        assert_eq!(log.causes_of("d"), vec!["b"]);
        assert!(log.effects_of("d").is_empty());
    }

    #[test]
    fn test_chain_from_is_transitive() {
        let mut log = CausalityLog::new();
        log.extend([edge("a", "b"), edge("b", "c"), edge("c", "d"), edge("x", "y")]);

        assert_eq!(log.chain_from("a"), vec!["b", "c", "d"]);
        assert!(log.chain_from("d").is_empty());
    }

    #[test]
    fn test_serializes_as_plain_list() {
        let mut log = CausalityLog::new();
        log.record(edge("a", "b"));
        let json = serde_json::to_string(&log).unwrap();
        assert!(json.starts_with('['));

        let parsed: CausalityLog = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed, log);
    }
}
