//! Replays recorded interactions from a cassette.

use std::collections::{HashMap, VecDeque};

use super::format::{Cassette, Interaction};

/// Serves a cassette's interactions in order, per port/method pair.
///
/// Calls on different methods may interleave differently from the
/// recording; calls on the same method are answered in recorded order.
pub struct CassetteReplayer {
    queues: HashMap<(String, String), VecDeque<Interaction>>,
    served: HashMap<(String, String), usize>,
}

impl CassetteReplayer {
    /// Create a new replayer from a loaded cassette.
    #[must_use]
    pub fn new(cassette: &Cassette) -> Self {
        let mut queues: HashMap<(String, String), VecDeque<Interaction>> = HashMap::new();
        for interaction in &cassette.interactions {
            queues
                .entry((interaction.port.clone(), interaction.method.clone()))
                .or_default()
                .push_back(interaction.clone());
        }
        Self { queues, served: HashMap::new() }
    }

    /// Return the next interaction for the given port and method.
    ///
    /// # Panics
    ///
    /// Panics if the cassette has no (more) interactions for the given
    /// port/method combination. A replay that asks for more than was
    /// recorded is a broken fixture, so the message names what was asked
    /// for and what the cassette holds.
    pub fn next_interaction(&mut self, port: &str, method: &str) -> Interaction {
        let key = (port.to_string(), method.to_string());
        let served = self.served.get(&key).copied().unwrap_or(0);

        let Some(queue) = self.queues.get_mut(&key) else {
            let mut available: Vec<String> =
                self.queues.keys().map(|(p, m)| format!("{p}::{m}")).collect();
            available.sort();
            panic!(
                "Cassette exhausted: no interactions recorded for port={port:?} \
                 method={method:?}. Available port::method pairs: [{}]",
                available.join(", ")
            );
        };
        let Some(interaction) = queue.pop_front() else {
            panic!(
                "Cassette exhausted: all {served} interactions for port={port:?} \
                 method={method:?} have been consumed."
            );
        };
        self.served.insert(key, served + 1);
        interaction
    }

    /// Interactions not yet served.
    #[must_use]
    pub fn remaining(&self) -> usize {
        self.queues.values().map(VecDeque::len).sum()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use serde_json::json;

    fn interaction(seq: u64, port: &str, method: &str, output: serde_json::Value) -> Interaction {
        Interaction {
            seq,
            port: port.into(),
            method: method.into(),
            input: json!(null),
            output,
        }
    }

    fn cassette(interactions: Vec<Interaction>) -> Cassette {
        Cassette {
            name: "test".into(),
            recorded_at: Utc::now(),
            endpoint: "memory".into(),
            interactions,
        }
    }

    #[test]
    fn serves_each_method_in_recorded_order() {
        let mut replayer = CassetteReplayer::new(&cassette(vec![
            interaction(0, "rows", "select_tasks", json!({"Ok": [1]})),
            interaction(1, "clock", "now", json!("2025-03-01T09:00:00Z")),
            interaction(2, "rows", "select_tasks", json!({"Ok": [2]})),
        ]));

        assert_eq!(replayer.next_interaction("clock", "now").seq, 1);
        assert_eq!(replayer.next_interaction("rows", "select_tasks").output, json!({"Ok": [1]}));
        assert_eq!(replayer.remaining(), 1);
        assert_eq!(replayer.next_interaction("rows", "select_tasks").output, json!({"Ok": [2]}));
        assert_eq!(replayer.remaining(), 0);
    }

    #[test]
    #[should_panic(expected = "all 1 interactions")]
    fn exhausted_method_panics() {
        let mut replayer =
            CassetteReplayer::new(&cassette(vec![interaction(0, "clock", "now", json!(null))]));
        let _ = replayer.next_interaction("clock", "now");
        let _ = replayer.next_interaction("clock", "now");
    }

    #[test]
    #[should_panic(expected = "no interactions recorded")]
    fn unknown_method_panics() {
        let mut replayer = CassetteReplayer::new(&cassette(vec![]));
        let _ = replayer.next_interaction("rows", "delete_task");
    }
}
