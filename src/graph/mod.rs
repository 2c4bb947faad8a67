//! The street graph: its raw (possibly multi-edge) input form and the prepared, simple
//! form the optimization model is built on.

pub mod prepare;

use petgraph::graph::{DiGraph, EdgeIndex, NodeIndex};
use serde::{Deserialize, Serialize};

/// Dense index of a street intersection. Stable for the lifetime of a single graph.
pub type NodeId = NodeIndex<u32>;
/// Dense index of a street segment.
pub type EdgeId = EdgeIndex<u32>;

/// Geographic position of an intersection.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct NodeData {
    /// Latitude in decimal degrees.
    pub lat: f64,
    /// Longitude in decimal degrees.
    pub lon: f64,
}

/// A street segment as supplied by the caller: only its physical length is known.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RawEdge {
    /// Length of the segment in meters. Must be strictly positive.
    pub length_m: f64,
}

/// A street segment after a capacity has been drawn for it, before travel time is derived.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CapacitatedEdge {
    /// Length of the segment in meters.
    pub length_m: f64,
    /// Maximum sum of required speeds (km/h) the segment can carry concurrently.
    pub capacity_kmh: f64,
}

/// A street segment with every attribute the optimization model needs.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PreparedEdge {
    /// Length of the segment in meters.
    pub length_m: f64,
    /// Maximum sum of required speeds (km/h) the segment can carry concurrently.
    pub capacity_kmh: f64,
    /// Time (minutes) to traverse the segment at its assigned capacity.
    pub travel_time_min: f64,
}

/// The input street graph: directed, possibly with parallel edges between the same pair
/// of intersections.
pub type RawGraph = DiGraph<NodeData, RawEdge, u32>;

/// The street graph after capacities and travel times have been assigned, but before
/// parallel edges are collapsed.
pub type CapacitatedGraph = DiGraph<NodeData, CapacitatedEdge, u32>;

/// The prepared, simple directed graph the model builder consumes: at most one edge per
/// ordered pair of nodes.
pub type StreetGraph = DiGraph<NodeData, PreparedEdge, u32>;

/// On-disk node record for the prepared-graph artifact (§6 of the specification).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NodeRecord {
    /// Dense node identifier, as assigned by insertion order.
    pub id: u32,
    /// Latitude in decimal degrees.
    pub lat: f64,
    /// Longitude in decimal degrees.
    pub lon: f64,
}

/// On-disk edge record for the prepared-graph artifact.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EdgeRecord {
    /// Source node id.
    pub u: u32,
    /// Target node id.
    pub v: u32,
    /// Length in meters.
    pub length_m: f64,
    /// Assigned capacity in km/h.
    pub capacity_kmh: f64,
    /// Derived travel time in minutes.
    pub travel_time_min: f64,
}

/// The flat, serializable form of a [`StreetGraph`], used both for the raw input (with
/// `capacity_kmh`/`travel_time_min` absent) and for persisting the prepared graph.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GraphPayload {
    /// All nodes, indexed implicitly by position (node `i` has id `i`).
    pub nodes: Vec<NodeRecord>,
    /// All edges of the prepared graph, one per ordered pair.
    pub edges: Vec<EdgeRecord>,
}

impl GraphPayload {
    /// Serialize a prepared [`StreetGraph`] into its flat artifact form.
    pub fn from_street_graph(graph: &StreetGraph) -> Self {
        let nodes = graph
            .node_indices()
            .map(|n| {
                let d = &graph[n];
                NodeRecord {
                    id: n.index() as u32,
                    lat: d.lat,
                    lon: d.lon,
                }
            })
            .collect();
        let edges = graph
            .edge_indices()
            .map(|e| {
                let (u, v) = graph.edge_endpoints(e).expect("edge index from this graph");
                let d = &graph[e];
                EdgeRecord {
                    u: u.index() as u32,
                    v: v.index() as u32,
                    length_m: d.length_m,
                    capacity_kmh: d.capacity_kmh,
                    travel_time_min: d.travel_time_min,
                }
            })
            .collect();
        GraphPayload { nodes, edges }
    }

    /// Rebuild a [`StreetGraph`] from its flat artifact form.
    pub fn to_street_graph(&self) -> StreetGraph {
        let mut graph = StreetGraph::with_capacity(self.nodes.len(), self.edges.len());
        let mut by_id = std::collections::HashMap::with_capacity(self.nodes.len());
        for n in &self.nodes {
            let idx = graph.add_node(NodeData { lat: n.lat, lon: n.lon });
            by_id.insert(n.id, idx);
        }
        for e in &self.edges {
            let u = by_id[&e.u];
            let v = by_id[&e.v];
            graph.add_edge(
                u,
                v,
                PreparedEdge {
                    length_m: e.length_m,
                    capacity_kmh: e.capacity_kmh,
                    travel_time_min: e.travel_time_min,
                },
            );
        }
        graph
    }
}

/// On-disk edge record for the raw (pre-preparation) input payload: only a length is known.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RawEdgeRecord {
    /// Source node id.
    pub u: u32,
    /// Target node id.
    pub v: u32,
    /// Length in meters.
    pub length_m: f64,
}

/// The raw street graph as supplied by the caller: nodes plus possibly-parallel edges, each
/// carrying only a length.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RawGraphPayload {
    /// All nodes, indexed implicitly by position (node `i` has id `i`).
    pub nodes: Vec<NodeRecord>,
    /// All edges, possibly with more than one per ordered pair of nodes.
    pub edges: Vec<RawEdgeRecord>,
}

impl RawGraphPayload {
    /// Parse into a [`RawGraph`].
    pub fn into_raw_graph(&self) -> RawGraph {
        let edges: Vec<(u32, u32, f64)> = self
            .edges
            .iter()
            .map(|e| (e.u, e.v, e.length_m))
            .collect();
        raw_graph_from_edges(&self.nodes, &edges)
    }
}

/// Parse a raw (possibly multigraph) input payload into a [`RawGraph`].
pub fn raw_graph_from_edges(
    nodes: &[NodeRecord],
    edges: &[(u32, u32, f64)],
) -> RawGraph {
    let mut graph = RawGraph::with_capacity(nodes.len(), edges.len());
    let mut by_id = std::collections::HashMap::with_capacity(nodes.len());
    for n in nodes {
        let idx = graph.add_node(NodeData { lat: n.lat, lon: n.lon });
        by_id.insert(n.id, idx);
    }
    for &(u, v, length_m) in edges {
        graph.add_edge(by_id[&u], by_id[&v], RawEdge { length_m });
    }
    graph
}
