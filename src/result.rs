//! Translates a solved (or not-yet-optimal) MILP back into per-emergency routes, cost
//! breakdowns, edge utilization, and — on infeasibility — a diagnosis string.

use std::collections::{HashMap, HashSet};

use petgraph::visit::EdgeRef;
use petgraph::Direction;

use crate::cost::CostTable;
use crate::graph::{EdgeId, NodeId, StreetGraph};
use crate::model::MilpModel;
use crate::scenario::{Emergency, Severity};
use crate::solver::{SolveOutcome, Status};

/// Threshold above which a binary decision variable's solver value counts as "selected".
/// Handles floating-point rounding in the MIP solution.
const SELECTED: f64 = 0.5;

/// Per-emergency cost and route breakdown.
#[derive(Debug, Clone)]
pub struct EmergencyDetail {
    /// Identifier of the emergency this detail describes.
    pub emergency_id: u32,
    /// Severity/ambulance type.
    pub severity: Severity,
    /// Required speed, km/h.
    pub required_speed_kmh: f64,
    /// Bound destination node.
    pub destination_node: NodeId,
    /// Sum of the route's edge lengths, in kilometers.
    pub distance_km: f64,
    /// Number of edges in the route.
    pub edge_count: usize,
    /// Flat dispatch cost.
    pub fixed_cost: f64,
    /// Distance-proportional cost.
    pub variable_cost: f64,
    /// `fixed_cost + variable_cost`.
    pub total_cost: f64,
    /// Ordered node sequence from origin to destination.
    pub route_nodes: Vec<NodeId>,
    /// Ordered edge sequence corresponding to `route_nodes`.
    pub route_edges: Vec<EdgeId>,
}

/// Usage of a single edge, aggregated across every emergency routed through it.
#[derive(Debug, Clone)]
pub struct EdgeUsage {
    /// Emergencies whose route uses this edge.
    pub flow_ids: Vec<u32>,
    /// Sum of required speeds of those emergencies.
    pub load_kmh: f64,
    /// The edge's assigned capacity.
    pub capacity_kmh: f64,
    /// `load_kmh / capacity_kmh`.
    pub utilization: f64,
}

/// The full, successfully-extracted result of an optimal (or time-limited-but-feasible) run.
#[derive(Debug, Clone)]
pub struct RunResult {
    /// Termination status.
    pub status: Status,
    /// Sum of every emergency's `total_cost`.
    pub total_cost: f64,
    /// Wall-clock time spent in the solver, in seconds.
    pub solve_time_s: f64,
    /// One route per emergency, in input order.
    pub routes: Vec<Vec<NodeId>>,
    /// One detail record per emergency, in input order.
    pub details: Vec<EmergencyDetail>,
    /// Usage of every edge carrying at least one flow.
    pub edge_usage: HashMap<EdgeId, EdgeUsage>,
}

/// A run that did not produce a usable solution: the status and a human-readable diagnosis.
#[derive(Debug, Clone)]
pub struct InfeasibleResult {
    /// Termination status (`Infeasible`, `Unbounded`, `Error`, or `TimeLimit` with no
    /// incumbent).
    pub status: Status,
    /// Wall-clock time spent in the solver, in seconds.
    pub solve_time_s: f64,
    /// Advisory explanation of the likely cause.
    pub message: String,
}

/// Extract a [`RunResult`] or [`InfeasibleResult`] from a solved model.
pub fn extract(
    graph: &StreetGraph,
    emergencies: &[Emergency],
    origin: NodeId,
    model: &MilpModel,
    outcome: SolveOutcome,
    costs: &CostTable,
) -> Result<RunResult, InfeasibleResult> {
    let solve_time_s = outcome.elapsed.as_secs_f64();

    let has_incumbent =
        matches!(outcome.status, Status::Optimal | Status::TimeLimit) && outcome.objective.is_some();

    if !has_incumbent {
        // Status::Error means the solver itself broke down (CBC abandoned, a user event, or
        // similar); attributing that to capacity/connectivity would fabricate a cause, so
        // only run the diagnosis heuristics for genuine infeasibility/unboundedness.
        let message = match outcome.status {
            Status::Error => "the solver terminated abnormally before producing a result".to_string(),
            _ => diagnose(graph, emergencies, origin),
        };
        return Err(InfeasibleResult {
            status: outcome.status,
            solve_time_s,
            message,
        });
    }

    let mut routes = Vec::with_capacity(emergencies.len());
    let mut details = Vec::with_capacity(emergencies.len());
    let mut edge_usage: HashMap<EdgeId, EdgeUsage> = HashMap::new();

    for (k, emergency) in emergencies.iter().enumerate() {
        let destination = emergency
            .destination_node
            .expect("model building requires a bound destination");
        let (route_nodes, route_edges) =
            reconstruct_route(graph, model, &outcome, k, origin, destination);

        let distance_km: f64 = route_edges
            .iter()
            .map(|&e| graph[e].length_m / 1000.0)
            .sum();
        let row = costs.row(emergency.severity);
        let variable_cost = distance_km * row.per_km_cost;
        let total_cost = row.fixed_cost + variable_cost;

        for &edge in &route_edges {
            let entry = edge_usage.entry(edge).or_insert_with(|| EdgeUsage {
                flow_ids: Vec::new(),
                load_kmh: 0.0,
                capacity_kmh: graph[edge].capacity_kmh,
                utilization: 0.0,
            });
            entry.flow_ids.push(emergency.id);
            entry.load_kmh += emergency.required_speed_kmh;
        }

        details.push(EmergencyDetail {
            emergency_id: emergency.id,
            severity: emergency.severity,
            required_speed_kmh: emergency.required_speed_kmh,
            destination_node: destination,
            distance_km,
            edge_count: route_edges.len(),
            fixed_cost: row.fixed_cost,
            variable_cost,
            total_cost,
            route_nodes: route_nodes.clone(),
            route_edges,
        });
        routes.push(route_nodes);
    }

    for usage in edge_usage.values_mut() {
        usage.utilization = usage.load_kmh / usage.capacity_kmh;
    }

    let total_cost = details.iter().map(|d| d.total_cost).sum();

    Ok(RunResult {
        status: outcome.status,
        total_cost,
        solve_time_s,
        routes,
        details,
        edge_usage,
    })
}

/// Walk `x[·,·,k] ≈ 1` edges from `origin` to `destination`, stopping on arrival, on a
/// missing successor (logged as a warning, partial path returned), or on a revisited node
/// (logged as a warning, cycle truncated).
fn reconstruct_route(
    graph: &StreetGraph,
    model: &MilpModel,
    outcome: &SolveOutcome,
    k: usize,
    origin: NodeId,
    destination: NodeId,
) -> (Vec<NodeId>, Vec<EdgeId>) {
    let mut nodes = vec![origin];
    let mut edges = Vec::new();
    let mut visited: HashSet<NodeId> = HashSet::from([origin]);
    let mut current = origin;

    while current != destination {
        let next_edge = graph
            .edges_directed(current, Direction::Outgoing)
            .find(|e| outcome.value(model.var(e.id(), k)).unwrap_or(0.0) > SELECTED);

        let Some(edge) = next_edge else {
            log::warn!(
                "emergency {k}: no selected successor out of node {current:?} before reaching destination {destination:?}; returning partial route"
            );
            break;
        };

        let next = edge.target();
        edges.push(edge.id());
        if !visited.insert(next) {
            log::warn!(
                "emergency {k}: route revisits node {next:?}; terminating reconstruction"
            );
            break;
        }
        nodes.push(next);
        current = next;
    }

    (nodes, edges)
}

/// Build an advisory message for an infeasible (or incumbent-less) run, checking the most
/// common causes in turn.
fn diagnose(graph: &StreetGraph, emergencies: &[Emergency], origin: NodeId) -> String {
    let mut causes = Vec::new();

    for emergency in emergencies {
        let best_capacity = graph
            .edge_references()
            .map(|e| e.weight().capacity_kmh)
            .fold(0.0_f64, f64::max);
        if emergency.required_speed_kmh > best_capacity {
            causes.push(format!(
                "emergency {} requires {} km/h but no edge in the graph has that much capacity (max {})",
                emergency.id, emergency.required_speed_kmh, best_capacity
            ));
        }
    }

    let reachable = reachable_from(graph, origin);
    for emergency in emergencies {
        if let Some(destination) = emergency.destination_node {
            if !reachable.contains(&destination) {
                causes.push(format!(
                    "destination of emergency {} is not reachable from the origin in the prepared graph",
                    emergency.id
                ));
            }
        }
    }

    let mut demand_by_edge: HashMap<EdgeId, f64> = HashMap::new();
    for emergency in emergencies {
        for edge in graph.edge_references() {
            demand_by_edge
                .entry(edge.id())
                .and_modify(|d| *d += emergency.required_speed_kmh)
                .or_insert(emergency.required_speed_kmh);
        }
    }
    for edge in graph.edge_references() {
        let demand = demand_by_edge.get(&edge.id()).copied().unwrap_or(0.0);
        if demand > edge.weight().capacity_kmh {
            causes.push(format!(
                "edge {:?}->{:?} may bottleneck: combined required speed {} exceeds its capacity {}",
                edge.source(),
                edge.target(),
                demand,
                edge.weight().capacity_kmh
            ));
        }
    }

    if causes.is_empty() {
        "no feasible assignment of routes satisfies flow conservation and shared edge capacity; unable to identify a specific cause".to_string()
    } else {
        causes.join("; ")
    }
}

/// Nodes reachable from `origin` via a graph-library breadth-first search.
fn reachable_from(graph: &StreetGraph, origin: NodeId) -> HashSet<NodeId> {
    use petgraph::visit::Walker;
    petgraph::visit::Bfs::new(graph, origin)
        .iter(graph)
        .collect()
}
