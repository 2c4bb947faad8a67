//! End-to-end scenarios S2-S6 against fixed fixtures, plus the boundary behaviors of
//! invariants 9-11. S1 is covered as a unit test alongside `result::extract`.

use ambu_route::cost::CostTable;
use ambu_route::graph::{NodeData, PreparedEdge, StreetGraph};
use ambu_route::model;
use ambu_route::scenario::{Emergency, Severity};
use ambu_route::solver::{solve, SolveLimits};
use ambu_route::{result, Status};

fn emergency(id: u32, severity: Severity, speed: f64, destination: ambu_route::graph::NodeId) -> Emergency {
    Emergency {
        id,
        severity,
        required_speed_kmh: speed,
        destination_node: Some(destination),
        destination_lat: Some(0.0),
        destination_lon: Some(0.0),
    }
}

fn edge(length_m: f64, capacity_kmh: f64) -> PreparedEdge {
    PreparedEdge {
        length_m,
        capacity_kmh,
        travel_time_min: length_m * 60.0 / (capacity_kmh * 1000.0),
    }
}

/// Diamond `o->a->d` (1000+1000) and `o->b->d` (2000+500), both with the given per-edge
/// capacity on every edge except `o->a`, which takes its own capacity.
fn diamond(oa_capacity: f64, other_capacity: f64) -> (StreetGraph, ambu_route::graph::NodeId, ambu_route::graph::NodeId) {
    let mut g = StreetGraph::new();
    let o = g.add_node(NodeData { lat: 0.0, lon: 0.0 });
    let a = g.add_node(NodeData { lat: 0.0, lon: 1.0 });
    let b = g.add_node(NodeData { lat: 1.0, lon: 0.0 });
    let d = g.add_node(NodeData { lat: 1.0, lon: 1.0 });
    g.add_edge(o, a, edge(1000.0, oa_capacity));
    g.add_edge(a, d, edge(1000.0, other_capacity));
    g.add_edge(o, b, edge(2000.0, other_capacity));
    g.add_edge(b, d, edge(500.0, other_capacity));
    (g, o, d)
}

#[test]
fn s2_parallel_paths_takes_the_shorter_total_length() {
    let (g, o, d) = diamond(60.0, 60.0);
    let emergencies = vec![emergency(1, Severity::Leve, 40.0, d)];
    let costs = CostTable::default();
    let model = model::build(&g, &emergencies, o, &costs).unwrap();
    let outcome = solve(&model, SolveLimits::default());
    let run = result::extract(&g, &emergencies, o, &model, outcome, &costs).unwrap();

    assert_eq!(run.status, Status::Optimal);
    assert!((run.details[0].distance_km - 2.5).abs() < 1e-6);
    assert!((run.total_cost - 48_962.5).abs() < 1e-3);
}

#[test]
fn s3_low_capacity_branch_is_forbidden_by_shared_capacity() {
    let (g, o, d) = diamond(30.0, 60.0);
    let emergencies = vec![emergency(1, Severity::Leve, 40.0, d)];
    let costs = CostTable::default();
    let model = model::build(&g, &emergencies, o, &costs).unwrap();
    let outcome = solve(&model, SolveLimits::default());
    let run = result::extract(&g, &emergencies, o, &model, outcome, &costs).unwrap();

    assert_eq!(run.status, Status::Optimal);
    // o->b->d is 2500 m; the o->a->d branch is forbidden since 40 > 30.
    assert!((run.details[0].distance_km - 2.5).abs() < 1e-6);
}

#[test]
fn s4_two_emergencies_exceed_shared_bottleneck_capacity() {
    let mut g = StreetGraph::new();
    let o = g.add_node(NodeData { lat: 0.0, lon: 0.0 });
    let a = g.add_node(NodeData { lat: 0.0, lon: 1.0 });
    g.add_edge(o, a, edge(1000.0, 100.0));
    let emergencies = vec![
        emergency(1, Severity::Media, 60.0, a),
        emergency(2, Severity::Media, 60.0, a),
    ];
    let costs = CostTable::default();
    let model = model::build(&g, &emergencies, o, &costs).unwrap();
    let outcome = solve(&model, SolveLimits::default());
    let err = result::extract(&g, &emergencies, o, &model, outcome, &costs).unwrap_err();

    assert_eq!(err.status, Status::Infeasible);
    assert!(err.message.contains("bottleneck") || err.message.contains("capacity"));
}

#[test]
fn s5_two_emergencies_share_an_edge_within_capacity() {
    let mut g = StreetGraph::new();
    let o = g.add_node(NodeData { lat: 0.0, lon: 0.0 });
    let a = g.add_node(NodeData { lat: 0.0, lon: 1.0 });
    let b = g.add_node(NodeData { lat: 0.0, lon: 2.0 });
    let d = g.add_node(NodeData { lat: 0.0, lon: 3.0 });
    g.add_edge(o, a, edge(1000.0, 90.0));
    g.add_edge(a, b, edge(1000.0, 90.0));
    g.add_edge(b, d, edge(1000.0, 90.0));

    let emergencies = vec![
        emergency(1, Severity::Media, 40.0, d),
        emergency(2, Severity::Media, 40.0, d),
    ];
    let costs = CostTable::default();
    let model = model::build(&g, &emergencies, o, &costs).unwrap();
    let outcome = solve(&model, SolveLimits::default());
    let run = result::extract(&g, &emergencies, o, &model, outcome, &costs).unwrap();

    assert_eq!(run.status, Status::Optimal);
    assert_eq!(run.details[0].route_nodes, run.details[1].route_nodes);
    for usage in run.edge_usage.values() {
        assert_eq!(usage.flow_ids.len(), 2);
        assert!((usage.load_kmh - 80.0).abs() < 1e-9);
        assert!((usage.utilization - 80.0 / 90.0).abs() < 1e-9);
    }
}

#[test]
fn s6_generator_produces_n_emergencies_in_band_and_is_reproducible() {
    let a = ambu_route::scenario::generate_set(4, 30.0, 90.0, 42).unwrap();
    let b = ambu_route::scenario::generate_set(4, 30.0, 90.0, 42).unwrap();
    assert_eq!(a.len(), 4);
    assert_eq!(
        a.iter().map(|e| (e.severity, e.required_speed_kmh)).collect::<Vec<_>>(),
        b.iter().map(|e| (e.severity, e.required_speed_kmh)).collect::<Vec<_>>()
    );
}

#[test]
fn invariant_9_speed_exceeding_every_outgoing_capacity_is_infeasible_with_diagnosis() {
    let mut g = StreetGraph::new();
    let o = g.add_node(NodeData { lat: 0.0, lon: 0.0 });
    let a = g.add_node(NodeData { lat: 0.0, lon: 1.0 });
    g.add_edge(o, a, edge(1000.0, 50.0));
    let emergencies = vec![emergency(1, Severity::Grave, 120.0, a)];
    let costs = CostTable::default();
    let model = model::build(&g, &emergencies, o, &costs).unwrap();
    let outcome = solve(&model, SolveLimits::default());
    let err = result::extract(&g, &emergencies, o, &model, outcome, &costs).unwrap_err();

    assert_eq!(err.status, Status::Infeasible);
    assert!(err.message.contains("capacity"));
}

#[test]
fn invariant_10_single_emergency_connected_graph_yields_optimal_route_with_at_least_two_nodes() {
    let mut g = StreetGraph::new();
    let o = g.add_node(NodeData { lat: 0.0, lon: 0.0 });
    let a = g.add_node(NodeData { lat: 0.0, lon: 1.0 });
    g.add_edge(o, a, edge(500.0, 60.0));
    let emergencies = vec![emergency(1, Severity::Leve, 30.0, a)];
    let costs = CostTable::default();
    let model = model::build(&g, &emergencies, o, &costs).unwrap();
    let outcome = solve(&model, SolveLimits::default());
    let run = result::extract(&g, &emergencies, o, &model, outcome, &costs).unwrap();

    assert_eq!(run.status, Status::Optimal);
    assert!(run.details[0].route_nodes.len() >= 2);
}

#[test]
fn invariant_11_unavoidable_shared_edge_below_combined_demand_is_infeasible() {
    let mut g = StreetGraph::new();
    let o = g.add_node(NodeData { lat: 0.0, lon: 0.0 });
    let mid = g.add_node(NodeData { lat: 0.0, lon: 1.0 });
    let a = g.add_node(NodeData { lat: 0.0, lon: 2.0 });
    let b = g.add_node(NodeData { lat: 1.0, lon: 2.0 });
    g.add_edge(o, mid, edge(500.0, 100.0));
    g.add_edge(mid, a, edge(500.0, 100.0));
    g.add_edge(mid, b, edge(500.0, 100.0));

    let emergencies = vec![
        emergency(1, Severity::Grave, 60.0, a),
        emergency(2, Severity::Grave, 60.0, b),
    ];
    let costs = CostTable::default();
    let model = model::build(&g, &emergencies, o, &costs).unwrap();
    let outcome = solve(&model, SolveLimits::default());
    let err = result::extract(&g, &emergencies, o, &model, outcome, &costs).unwrap_err();

    assert_eq!(err.status, Status::Infeasible);
}
