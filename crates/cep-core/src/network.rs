//! Load-zone / transmission topology.
//!
//! Zones are nodes and transmission lines are edges of an undirected
//! multigraph. Keeping the topology explicit lets the model builder walk
//! zone neighbourhoods when wiring transmission flows into each zone's
//! load balance, and lets validation catch disconnected zones before a
//! solver ever sees an infeasible balance constraint.

use petgraph::{graph::NodeIndex, prelude::*, Undirected};
use std::collections::HashMap;

use crate::diagnostics::Diagnostics;
use crate::entities::{LoadZone, TransmissionLine};

/// The zone/transmission topology for one scenario.
#[derive(Debug, Default)]
pub struct ZoneNetwork {
    pub graph: Graph<LoadZone, TransmissionLine, Undirected>,
    zone_index: HashMap<String, NodeIndex>,
}

impl ZoneNetwork {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build the topology from entity lists.
    ///
    /// Lines referencing unknown zones are kept out of the graph; they are
    /// reported by [`Self::validate_into`] rather than silently dropped.
    pub fn from_entities(zones: &[LoadZone], lines: &[TransmissionLine]) -> Self {
        let mut network = Self::new();
        for zone in zones {
            network.add_zone(zone.clone());
        }
        for line in lines {
            let _ = network.add_line(line.clone());
        }
        network
    }

    pub fn add_zone(&mut self, zone: LoadZone) -> NodeIndex {
        let name = zone.name.clone();
        let idx = self.graph.add_node(zone);
        self.zone_index.insert(name, idx);
        idx
    }

    /// Add a transmission line; returns false if either endpoint is unknown.
    pub fn add_line(&mut self, line: TransmissionLine) -> bool {
        let (Some(&from), Some(&to)) = (
            self.zone_index.get(&line.from_zone),
            self.zone_index.get(&line.to_zone),
        ) else {
            return false;
        };
        self.graph.add_edge(from, to, line);
        true
    }

    pub fn zone(&self, name: &str) -> Option<&LoadZone> {
        self.zone_index.get(name).map(|idx| &self.graph[*idx])
    }

    pub fn zones(&self) -> impl Iterator<Item = &LoadZone> {
        self.graph.node_weights()
    }

    pub fn lines(&self) -> impl Iterator<Item = &TransmissionLine> {
        self.graph.edge_weights()
    }

    /// Lines incident to a zone.
    pub fn lines_at_zone(&self, name: &str) -> Vec<&TransmissionLine> {
        match self.zone_index.get(name) {
            Some(idx) => self.graph.edges(*idx).map(|e| e.weight()).collect(),
            None => Vec::new(),
        }
    }

    /// Compute basic statistics about the topology.
    pub fn stats(&self) -> ZoneNetworkStats {
        ZoneNetworkStats {
            num_zones: self.graph.node_count(),
            num_lines: self.graph.edge_count(),
        }
    }

    /// Validate the topology for issues that break model builds.
    pub fn validate_into(&self, zones: &[LoadZone], lines: &[TransmissionLine], diag: &mut Diagnostics) {
        if self.graph.node_count() == 0 {
            diag.add_error("structure", "Network has no load zones");
            return;
        }

        for line in lines {
            if !self.zone_index.contains_key(&line.from_zone) {
                diag.add_error_with_entity(
                    "structure",
                    &format!("line references unknown zone '{}'", line.from_zone),
                    &format!("line {}", line.name),
                );
            }
            if !self.zone_index.contains_key(&line.to_zone) {
                diag.add_error_with_entity(
                    "structure",
                    &format!("line references unknown zone '{}'", line.to_zone),
                    &format!("line {}", line.name),
                );
            }
            if line.max_flow_mw < line.min_flow_mw {
                diag.add_error_with_entity(
                    "structure",
                    "line max flow is below min flow",
                    &format!("line {}", line.name),
                );
            }
        }

        // An isolated zone is legal (it balances locally) but usually a data bug
        if zones.len() > 1 {
            for zone in zones {
                if self.lines_at_zone(&zone.name).is_empty() {
                    diag.add_warning_with_entity(
                        "structure",
                        "zone has no transmission connections",
                        &format!("zone {}", zone.name),
                    );
                }
            }
        }
    }
}

/// Statistics about a zone network's size
#[derive(Debug, Clone, Default)]
pub struct ZoneNetworkStats {
    pub num_zones: usize,
    pub num_lines: usize,
}

impl std::fmt::Display for ZoneNetworkStats {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} zones, {} lines", self.num_zones, self.num_lines)
    }
}
