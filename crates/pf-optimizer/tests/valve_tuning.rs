use pf_model::{
    ControlValve, Fluid, Network, NetworkBundle, NetworkSpec, NetworkSystem, OptimizerMethod,
    OptimizerSettings, PipeSection, PipeSectionSpec, SystemSolverSettings,
};
use pf_optimizer::{
    NetworkSystemOptimizer, OptimizationReport, OptimizerError, advanced_optimize_control_valves,
    optimize_control_valves,
};
use pf_solver::NetworkSolver;

fn pipe(id: &str, start: &str, end: &str, length: f64, split: f64) -> PipeSection {
    PipeSection::new(PipeSectionSpec {
        id: id.into(),
        start_node: Some(start.into()),
        end_node: Some(end.into()),
        length,
        pipe_diameter: Some(0.1),
        flow_splitting_factor: split,
        ..PipeSectionSpec::default()
    })
    .unwrap()
}

fn valve(id: &str, start: &str, end: &str) -> PipeSection {
    PipeSection::new(PipeSectionSpec {
        id: id.into(),
        start_node: Some(start.into()),
        end_node: Some(end.into()),
        control_valve: Some(ControlValve {
            adjustable: true,
            ..ControlValve::default()
        }),
        ..PipeSectionSpec::default()
    })
    .unwrap()
}

fn network(sections: Vec<PipeSection>, upstream: f64, downstream: Option<f64>) -> Network {
    Network::new(NetworkSpec {
        upstream_pressure: Some(upstream),
        downstream_pressure: downstream,
        boundary_temperature: Some(293.15),
        mass_flow_rate: 5.0,
        ..NetworkSpec::new("plant", Fluid::liquid("water", 998.2, 1e-3).unwrap(), sections)
    })
    .unwrap()
}

fn series(upstream: f64, downstream: Option<f64>) -> Network {
    network(
        vec![
            pipe("line1", "A", "V1", 50.0, 1.0),
            valve("fcv", "V1", "V2"),
            pipe("line2", "V2", "B", 100.0, 1.0),
        ],
        upstream,
        downstream,
    )
}

fn valve_drop(net: &Network, id: &str) -> f64 {
    net.section(id)
        .and_then(|s| s.control_valve())
        .and_then(|v| v.pressure_drop)
        .unwrap()
}

#[test]
fn single_valve_takes_up_the_available_head() {
    let mut net = series(6e5, Some(2e5));
    let solver = NetworkSolver::default();
    let report = optimize_control_valves(&mut net, &solver).unwrap();

    assert!(report.residual <= report.baseline_residual);
    assert!(report.residual < 1.0, "residual = {}", report.residual);
    let adj = report.valve("fcv").unwrap();
    assert!(!adj.clamped);
    assert!((adj.pressure_drop - (adj.available_pressure - adj.required_pressure)).abs() < 1e-9);
    assert_eq!(valve_drop(&net, "fcv"), adj.pressure_drop);

    // the tuned network now lands on the downstream boundary
    let result = solver.solve(&mut net).unwrap();
    let outlet = result.node_pressure("B").unwrap();
    assert!((outlet - 2e5).abs() < 1.0, "outlet = {outlet}");
}

#[test]
fn downstream_above_upstream_is_infeasible() {
    let mut net = series(3e5, Some(4e5));
    let err = optimize_control_valves(&mut net, &NetworkSolver::default()).unwrap_err();
    assert!(matches!(err, OptimizerError::Infeasible { .. }));
    assert!(err.to_string().starts_with("Downstream pressure exceeds upstream pressure"));
}

#[test]
fn both_boundaries_are_required() {
    let mut net = series(3e5, None);
    let err = optimize_control_valves(&mut net, &NetworkSolver::default()).unwrap_err();
    assert!(matches!(err, OptimizerError::MissingBoundary { .. }));
}

#[test]
fn insufficient_head_clamps_to_open() {
    let mut net = series(2.0005e5, Some(2e5));
    let report = optimize_control_valves(&mut net, &NetworkSolver::default()).unwrap();
    let adj = report.valve("fcv").unwrap();
    assert!(adj.clamped);
    assert_eq!(adj.pressure_drop, 0.0);
}

fn branched() -> Network {
    network(
        vec![
            pipe("header", "A", "B", 40.0, 1.0),
            pipe("a_in", "B", "Va", 30.0, 0.5),
            valve("fcv_a", "Va", "Ca"),
            pipe("a_out", "Ca", "Da", 20.0, 1.0),
            pipe("b_in", "B", "Vb", 120.0, 0.5),
            valve("fcv_b", "Vb", "Cb"),
            pipe("b_out", "Cb", "Db", 60.0, 1.0),
        ],
        6e5,
        Some(1.5e5),
    )
}

#[test]
fn advanced_tuning_settles_every_branch() {
    let mut net = branched();
    let report =
        advanced_optimize_control_valves(&mut net, &NetworkSolver::default(), &OptimizerSettings::default())
            .unwrap();
    assert!(report.converged, "worst = {}", report.worst_residual);
    assert!(report.worst_residual <= 1.0);
    assert!(report.iterations > 1 && report.iterations <= 30);
    assert!(valve_drop(&net, "fcv_a") > valve_drop(&net, "fcv_b"));
}

#[test]
fn system_optimizer_respects_bundle_settings() {
    let tuned = NetworkBundle::new("tuned", branched()).with_optimizer(OptimizerSettings {
        method: OptimizerMethod::Advanced,
        ..OptimizerSettings::default()
    });
    let idle = NetworkBundle::new("idle", series(6e5, Some(2e5))).with_optimizer(OptimizerSettings {
        enabled: false,
        ..OptimizerSettings::default()
    });
    let mut system = NetworkSystem::new(vec![tuned, idle], Vec::new(), SystemSolverSettings::default()).unwrap();

    let reports = NetworkSystemOptimizer::default().optimize(&mut system).unwrap();
    assert_eq!(reports.len(), 2);
    let tuned_report: &OptimizationReport = reports[0].report.as_ref().unwrap();
    assert!(tuned_report.converged);
    assert!(reports[1].report.is_none());

    let idle_valve = system.bundle("idle").unwrap().network.section("fcv").unwrap();
    assert_eq!(idle_valve.control_valve().unwrap().pressure_drop, None);
}

#[test]
fn report_serializes() {
    let mut net = series(6e5, Some(2e5));
    let report = optimize_control_valves(&mut net, &NetworkSolver::default()).unwrap();
    let json = serde_json::to_value(&report).unwrap();
    assert_eq!(json["valves"][0]["section_id"], "fcv");
}
