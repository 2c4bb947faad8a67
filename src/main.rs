use std::fs;
use std::path::PathBuf;

use ambu_route::cost::CostTable;
use ambu_route::graph::{GraphPayload, RawGraphPayload};
use ambu_route::scenario::EmergencyRecord;
use ambu_route::{prepare, solve_scenario, GenerationParams, RunOutcome, SolveLimits};
use clap::{Parser, Subcommand};
use serde::Serialize;

/// Cost-minimizing routing of ambulances to simultaneous emergencies.
#[derive(Debug, Parser)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Prepare a street graph and a generated emergency set, writing both as JSON artifacts.
    Prepare {
        /// Raw street graph, as a `RawGraphPayload` JSON document.
        graph_input: PathBuf,
        /// Latitude of the clinic (origin).
        origin_lat: f64,
        /// Longitude of the clinic (origin).
        origin_lon: f64,
        /// Number of emergencies to generate.
        #[arg(long, default_value = "10")]
        n: u32,
        /// Minimum per-edge capacity, km/h.
        #[arg(long, default_value = "30")]
        c_min: f64,
        /// Maximum per-edge capacity, km/h.
        #[arg(long, default_value = "90")]
        c_max: f64,
        /// Minimum required speed, km/h.
        #[arg(long, default_value = "30")]
        r_min: f64,
        /// Maximum required speed, km/h.
        #[arg(long, default_value = "90")]
        r_max: f64,
        /// Seed for every random draw in this run.
        #[arg(long, default_value = "42")]
        seed: u64,
        /// Where to write the prepared graph payload.
        #[arg(long, default_value = "prepared_graph.json")]
        graph_output: PathBuf,
        /// Where to write the emergency set payload.
        #[arg(long, default_value = "emergencies.json")]
        emergencies_output: PathBuf,
    },

    /// Solve a previously prepared graph and emergency set.
    Solve {
        /// Prepared graph, as a `GraphPayload` JSON document.
        graph_input: PathBuf,
        /// Emergency set, as a list of `EmergencyRecord` JSON documents.
        emergencies_input: PathBuf,
        /// Node index of the clinic (origin) within the prepared graph.
        origin: u32,
        /// Cost table override, if not using the defaults.
        #[arg(long)]
        cost_table: Option<PathBuf>,
        #[command(flatten)]
        limits: SolveArgs,
        /// Print the result as JSON instead of a human-readable summary.
        #[arg(long)]
        json: bool,
    },

    /// Run the whole pipeline: prepare a street graph from scratch, then solve it.
    Run {
        /// Raw street graph, as a `RawGraphPayload` JSON document.
        graph_input: PathBuf,
        /// Latitude of the clinic (origin).
        origin_lat: f64,
        /// Longitude of the clinic (origin).
        origin_lon: f64,
        /// Number of emergencies to generate.
        #[arg(long, default_value = "10")]
        n: u32,
        /// Minimum per-edge capacity, km/h.
        #[arg(long, default_value = "30")]
        c_min: f64,
        /// Maximum per-edge capacity, km/h.
        #[arg(long, default_value = "90")]
        c_max: f64,
        /// Minimum required speed, km/h.
        #[arg(long, default_value = "30")]
        r_min: f64,
        /// Maximum required speed, km/h.
        #[arg(long, default_value = "90")]
        r_max: f64,
        /// Seed for every random draw in this run.
        #[arg(long, default_value = "42")]
        seed: u64,
        /// Cost table override, if not using the defaults.
        #[arg(long)]
        cost_table: Option<PathBuf>,
        #[command(flatten)]
        limits: SolveArgs,
        /// Print the result as JSON instead of a human-readable summary.
        #[arg(long)]
        json: bool,
    },
}

#[derive(Debug, Parser)]
struct SolveArgs {
    /// Solver wall-clock budget, in seconds.
    #[arg(long, default_value = "300")]
    time_limit_s: f64,
    /// Relative MIP gap at which the solver may stop early.
    #[arg(long, default_value = "0.01")]
    gap: f32,
    /// Let the underlying solver print its own progress log.
    #[arg(long)]
    verbose: bool,
}

impl From<SolveArgs> for SolveLimits {
    fn from(args: SolveArgs) -> Self {
        SolveLimits {
            time_limit_s: args.time_limit_s,
            gap: args.gap,
            verbose: args.verbose,
        }
    }
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    pretty_env_logger::init_timed();

    let cli = Cli::parse();

    match cli.command {
        Command::Prepare {
            graph_input,
            origin_lat,
            origin_lon,
            n,
            c_min,
            c_max,
            r_min,
            r_max,
            seed,
            graph_output,
            emergencies_output,
        } => cmd_prepare(
            graph_input,
            origin_lat,
            origin_lon,
            GenerationParams { c_min, c_max, r_min, r_max, n },
            seed,
            graph_output,
            emergencies_output,
        ),
        Command::Solve {
            graph_input,
            emergencies_input,
            origin,
            cost_table,
            limits,
            json,
        } => cmd_solve(graph_input, emergencies_input, origin, cost_table, limits.into(), json),
        Command::Run {
            graph_input,
            origin_lat,
            origin_lon,
            n,
            c_min,
            c_max,
            r_min,
            r_max,
            seed,
            cost_table,
            limits,
            json,
        } => cmd_run(
            graph_input,
            origin_lat,
            origin_lon,
            GenerationParams { c_min, c_max, r_min, r_max, n },
            seed,
            cost_table,
            limits.into(),
            json,
        ),
    }
}

fn cmd_prepare(
    graph_input: PathBuf,
    origin_lat: f64,
    origin_lon: f64,
    params: GenerationParams,
    seed: u64,
    graph_output: PathBuf,
    emergencies_output: PathBuf,
) -> Result<(), Box<dyn std::error::Error>> {
    let raw_payload: RawGraphPayload = serde_json::from_str(&fs::read_to_string(graph_input)?)?;
    let raw = raw_payload.into_raw_graph();

    let (graph, origin, emergencies) = prepare(&raw, origin_lat, origin_lon, &params, seed)?;

    let graph_payload = GraphPayload::from_street_graph(&graph);
    fs::write(&graph_output, serde_json::to_string_pretty(&graph_payload)?)?;

    let records: Vec<EmergencyRecord> = emergencies.iter().map(EmergencyRecord::from_emergency).collect();
    fs::write(&emergencies_output, serde_json::to_string_pretty(&records)?)?;

    println!(
        "prepared {} nodes, {} edges, {} emergencies; origin node {}",
        graph_payload.nodes.len(),
        graph_payload.edges.len(),
        records.len(),
        origin.index()
    );
    println!("wrote {} and {}", graph_output.display(), emergencies_output.display());
    Ok(())
}

fn cmd_solve(
    graph_input: PathBuf,
    emergencies_input: PathBuf,
    origin: u32,
    cost_table: Option<PathBuf>,
    limits: SolveLimits,
    json: bool,
) -> Result<(), Box<dyn std::error::Error>> {
    let graph_payload: GraphPayload = serde_json::from_str(&fs::read_to_string(graph_input)?)?;
    let graph = graph_payload.to_street_graph();

    let records: Vec<EmergencyRecord> = serde_json::from_str(&fs::read_to_string(emergencies_input)?)?;
    let emergencies: Vec<_> = records.iter().map(EmergencyRecord::to_emergency).collect();

    let costs = load_cost_table(cost_table)?;
    let origin_node = ambu_route::graph::NodeId::new(origin as usize);

    let outcome = solve_scenario(&graph, &emergencies, origin_node, &costs, limits)?;
    report(outcome, json)
}

#[allow(clippy::too_many_arguments)]
fn cmd_run(
    graph_input: PathBuf,
    origin_lat: f64,
    origin_lon: f64,
    params: GenerationParams,
    seed: u64,
    cost_table: Option<PathBuf>,
    limits: SolveLimits,
    json: bool,
) -> Result<(), Box<dyn std::error::Error>> {
    let raw_payload: RawGraphPayload = serde_json::from_str(&fs::read_to_string(graph_input)?)?;
    let raw = raw_payload.into_raw_graph();
    let costs = load_cost_table(cost_table)?;

    let outcome = ambu_route::run(&raw, origin_lat, origin_lon, &params, seed, &costs, limits)?;
    report(outcome, json)
}

fn load_cost_table(path: Option<PathBuf>) -> Result<CostTable, Box<dyn std::error::Error>> {
    match path {
        None => Ok(CostTable::default()),
        Some(path) => Ok(CostTable::from_json(&fs::read_to_string(path)?)?),
    }
}

#[derive(Serialize)]
struct JsonRoute {
    emergency_id: u32,
    distance_km: f64,
    total_cost: f64,
    route_nodes: Vec<usize>,
}

fn report(outcome: RunOutcome, json: bool) -> Result<(), Box<dyn std::error::Error>> {
    match outcome {
        RunOutcome::Solved(result) => {
            if json {
                let routes: Vec<JsonRoute> = result
                    .details
                    .iter()
                    .map(|d| JsonRoute {
                        emergency_id: d.emergency_id,
                        distance_km: d.distance_km,
                        total_cost: d.total_cost,
                        route_nodes: d.route_nodes.iter().map(|n| n.index()).collect(),
                    })
                    .collect();
                let payload = serde_json::json!({
                    "status": format!("{:?}", result.status),
                    "total_cost": result.total_cost,
                    "solve_time_s": result.solve_time_s,
                    "routes": routes,
                });
                println!("{}", serde_json::to_string_pretty(&payload)?);
            } else {
                println!("status: {:?}", result.status);
                println!("total_cost: {:.2}", result.total_cost);
                println!("solve_time_s: {:.3}", result.solve_time_s);
                for detail in &result.details {
                    println!(
                        "  emergency {}: {} edges, {:.2} km, cost {:.2}",
                        detail.emergency_id, detail.edge_count, detail.distance_km, detail.total_cost
                    );
                }
            }
        }
        RunOutcome::Infeasible(infeasible) => {
            if json {
                let payload = serde_json::json!({
                    "status": format!("{:?}", infeasible.status),
                    "solve_time_s": infeasible.solve_time_s,
                    "message": infeasible.message,
                });
                println!("{}", serde_json::to_string_pretty(&payload)?);
            } else {
                println!("status: {:?}", infeasible.status);
                println!("solve_time_s: {:.3}", infeasible.solve_time_s);
                println!("message: {}", infeasible.message);
            }
        }
    }
    Ok(())
}
