//! Turns a raw street graph into the simple, fully-attributed graph the model builder
//! needs, and answers the geographic queries (nearest node, interior nodes, destination
//! binding) that tie emergencies to it.

use std::collections::{HashMap, HashSet};

use geoutils::Location;
use petgraph::visit::EdgeRef;
use petgraph::Direction;
use rand::{rngs::StdRng, seq::SliceRandom, Rng, SeedableRng};

use crate::error::{Error, Result};
use crate::graph::{CapacitatedEdge, CapacitatedGraph, NodeId, PreparedEdge, RawGraph, StreetGraph};
use crate::scenario::Emergency;

/// Draw a capacity (km/h) uniformly from `[c_min, c_max]` for every ordered pair of nodes
/// that has at least one edge in `raw`, and apply it to all parallel edges of that pair.
pub fn assign_capacities(raw: &RawGraph, c_min: f64, c_max: f64, seed: u64) -> Result<CapacitatedGraph> {
    if c_min <= 0.0 || c_max <= 0.0 || c_min >= c_max {
        return Err(Error::InvalidRange(format!(
            "capacity range must satisfy 0 < C_min < C_max, got [{c_min}, {c_max}]"
        )));
    }

    let mut pairs: Vec<(NodeId, NodeId)> = raw
        .edge_references()
        .map(|e| (e.source(), e.target()))
        .collect();
    pairs.sort_by_key(|(u, v)| (u.index(), v.index()));
    pairs.dedup();

    let mut rng = StdRng::seed_from_u64(seed);
    let capacity_of: HashMap<(NodeId, NodeId), f64> = pairs
        .into_iter()
        .map(|pair| (pair, rng.gen_range(c_min..c_max)))
        .collect();

    Ok(raw.map(
        |_, n| *n,
        |e, w| {
            let (u, v) = raw.edge_endpoints(e).expect("edge index belongs to this graph");
            CapacitatedEdge {
                length_m: w.length_m,
                capacity_kmh: capacity_of[&(u, v)],
            }
        },
    ))
}

/// Fill in `travel_time_min` for every edge, given its length and assigned capacity.
pub fn derive_travel_time(graph: &CapacitatedGraph) -> Result<StreetGraph> {
    for e in graph.edge_references() {
        let w = e.weight();
        if w.length_m <= 0.0 {
            return Err(Error::MissingAttribute(
                "edge is missing a positive length_m".into(),
            ));
        }
        if w.capacity_kmh <= 0.0 {
            return Err(Error::MissingAttribute(
                "edge is missing a positive capacity_kmh".into(),
            ));
        }
    }
    Ok(graph.map(
        |_, n| *n,
        |_, w| PreparedEdge {
            length_m: w.length_m,
            capacity_kmh: w.capacity_kmh,
            travel_time_min: w.length_m * 60.0 / (w.capacity_kmh * 1000.0),
        },
    ))
}

/// Collapse parallel edges, keeping for each ordered pair the edge with the greatest
/// `capacity_kmh`. Idempotent: running this again on an already-simple graph returns an
/// identical graph.
pub fn collapse_to_simple(graph: &StreetGraph) -> StreetGraph {
    let mut best: HashMap<(NodeId, NodeId), PreparedEdge> = HashMap::new();
    for e in graph.edge_references() {
        let key = (e.source(), e.target());
        let w = *e.weight();
        best.entry(key)
            .and_modify(|cur| {
                if w.capacity_kmh > cur.capacity_kmh {
                    *cur = w;
                }
            })
            .or_insert(w);
    }

    let mut out = StreetGraph::with_capacity(graph.node_count(), best.len());
    for n in graph.node_indices() {
        let idx = out.add_node(graph[n]);
        debug_assert_eq!(idx, n, "node insertion order must preserve indices");
    }
    let mut keys: Vec<(NodeId, NodeId)> = best.keys().copied().collect();
    keys.sort_by_key(|(u, v)| (u.index(), v.index()));
    for key in keys {
        out.add_edge(key.0, key.1, best[&key]);
    }
    out
}

/// Find the node nearest to `(lat, lon)` by great-circle distance, breaking ties by the
/// smallest node id.
pub fn find_nearest(graph: &StreetGraph, lat: f64, lon: f64) -> NodeId {
    let target = Location::new(lat, lon);
    let mut best: Option<(NodeId, f64)> = None;
    for n in graph.node_indices() {
        let d = &graph[n];
        let dist = target
            .haversine_distance_to(&Location::new(d.lat, d.lon))
            .meters();
        match best {
            Some((_, best_dist)) if dist >= best_dist => {}
            _ => best = Some((n, dist)),
        }
    }
    best.expect("graph must have at least one node").0
}

/// Nodes with at least `min_in` predecessors and `min_out` successors.
pub fn interior_nodes(graph: &StreetGraph, min_in: usize, min_out: usize) -> HashSet<NodeId> {
    graph
        .node_indices()
        .filter(|&n| {
            let in_deg = graph.neighbors_directed(n, Direction::Incoming).count();
            let out_deg = graph.neighbors_directed(n, Direction::Outgoing).count();
            in_deg >= min_in && out_deg >= min_out
        })
        .collect()
}

/// Assign a distinct destination node to each emergency, sampled without replacement from
/// the interior nodes (falling back to all nodes if there are too few), excluding `origin`.
pub fn bind_emergencies(
    graph: &StreetGraph,
    emergencies: Vec<Emergency>,
    origin: NodeId,
    seed: u64,
) -> Result<Vec<Emergency>> {
    let mut candidates: Vec<NodeId> = interior_nodes(graph, 3, 3)
        .into_iter()
        .filter(|&n| n != origin)
        .collect();
    if candidates.len() < emergencies.len() {
        candidates = graph.node_indices().filter(|&n| n != origin).collect();
    }
    if candidates.len() < emergencies.len() {
        return Err(Error::InsufficientNodes(format!(
            "need {} destination nodes but only {} candidates remain after excluding the origin",
            emergencies.len(),
            candidates.len()
        )));
    }

    // Canonicalize order before shuffling so the result depends only on `seed`, not on
    // HashSet iteration order.
    candidates.sort_by_key(|n| n.index());
    let mut rng = StdRng::seed_from_u64(seed);
    candidates.shuffle(&mut rng);

    Ok(emergencies
        .into_iter()
        .zip(candidates)
        .map(|(mut emergency, node)| {
            let d = &graph[node];
            emergency.destination_node = Some(node);
            emergency.destination_lat = Some(d.lat);
            emergency.destination_lon = Some(d.lon);
            emergency
        })
        .collect())
}
