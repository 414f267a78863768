use pf_model::{
    ControlValve, FlowDirection, Fluid, GasFlowModel, Network, NetworkResult, NetworkSpec,
    PipeSection, PipeSectionSpec, Rounded,
};
use pf_solver::{NetworkSolver, SolverError};

fn water() -> Fluid {
    Fluid::liquid("water", 998.2, 1e-3).unwrap()
}

fn pipe(id: &str, start: Option<&str>, end: Option<&str>, length: f64) -> PipeSection {
    PipeSection::new(PipeSectionSpec {
        id: id.into(),
        start_node: start.map(str::to_string),
        end_node: end.map(str::to_string),
        length,
        pipe_diameter: Some(0.1),
        ..PipeSectionSpec::default()
    })
    .unwrap()
}

#[test]
fn single_water_pipe() {
    let mut net = Network::new(NetworkSpec {
        upstream_pressure: Some(101_325.0),
        boundary_temperature: Some(293.15),
        mass_flow_rate: 1.0,
        ..NetworkSpec::new("single", water(), vec![pipe("p1", None, None, 50.0)])
    })
    .unwrap();
    let result = NetworkSolver::default().solve(&mut net).unwrap();

    let details = &result.section("p1").unwrap().calculation_output.pressure_drop;
    let friction = details.pipe_and_fittings.unwrap();
    assert!(friction > 0.0);
    assert!(details.reynolds_number.is_some());
    assert!(details.frictional_factor.is_some());
    assert_eq!(details.total_segment_loss, Some(friction));

    let outlet = result.summary.outlet.pressure.unwrap();
    assert!((101_325.0 - friction - outlet).abs() < 1e-9);
    assert_eq!(net.calculation_output.pressure_drop.total_segment_loss, Some(friction));
}

#[test]
fn merge_node_takes_most_restrictive_branch() {
    let mut net = Network::new(NetworkSpec {
        upstream_pressure: Some(3e5),
        boundary_temperature: Some(293.15),
        mass_flow_rate: 1.5,
        ..NetworkSpec::new(
            "merge",
            water(),
            vec![
                pipe("short", Some("A"), Some("B"), 10.0),
                pipe("long", Some("C"), Some("B"), 200.0),
                pipe("header", Some("B"), Some("D"), 30.0),
            ],
        )
    })
    .unwrap();
    let result = NetworkSolver::default().solve(&mut net).unwrap();

    let short_out = result.section("short").unwrap().summary.outlet.pressure.unwrap();
    let long_out = result.section("long").unwrap().summary.outlet.pressure.unwrap();
    assert!(long_out < short_out);
    assert_eq!(result.node_pressure("B"), Some(long_out));
    assert_eq!(result.section("header").unwrap().summary.inlet.pressure, Some(long_out));

    // two entry points carry the design flow each
    assert_eq!(result.section("header").unwrap().mass_flow_rate, Some(3.0));
    assert!(
        result
            .aggregate
            .notes
            .iter()
            .any(|n| n.starts_with("branching topology"))
    );
}

#[test]
fn backward_split_takes_largest_requirement() {
    let mut net = Network::new(NetworkSpec {
        downstream_pressure: Some(1.5e5),
        boundary_temperature: Some(293.15),
        mass_flow_rate: 1.0,
        direction: FlowDirection::Backward,
        ..NetworkSpec::new(
            "split",
            water(),
            vec![
                pipe("feed", Some("A"), Some("B"), 20.0),
                pipe("near", Some("B"), Some("C"), 5.0),
                pipe("far", Some("B"), Some("D"), 150.0),
            ],
        )
    })
    .unwrap();
    let result = NetworkSolver::default().solve(&mut net).unwrap();
    let near_in = result.section("near").unwrap().summary.inlet.pressure.unwrap();
    let far_in = result.section("far").unwrap().summary.inlet.pressure.unwrap();
    assert!(far_in > near_in);
    assert_eq!(result.node_pressure("B"), Some(far_in));
    assert!(result.node_pressure("A").unwrap() > far_in);
}

#[test]
fn backward_valve_section_seeds_from_declared_drop() {
    let valve = PipeSection::new(PipeSectionSpec {
        id: "pcv".into(),
        control_valve: Some(ControlValve {
            pressure_drop: Some(2e5),
            ..ControlValve::default()
        }),
        ..PipeSectionSpec::default()
    })
    .unwrap();
    let mut net = Network::new(NetworkSpec {
        downstream_pressure: Some(1e5),
        boundary_temperature: Some(293.15),
        mass_flow_rate: 4.0,
        direction: FlowDirection::Backward,
        ..NetworkSpec::new("letdown", water(), vec![pipe("line", None, None, 20.0), valve])
    })
    .unwrap();
    let result = NetworkSolver::default().solve(&mut net).unwrap();
    assert_eq!(result.section("pcv").unwrap().summary.inlet.pressure, Some(3e5));
}

#[test]
fn isothermal_gas_line() {
    let gas = Fluid::gas("N2", 28.0134, 1.0, 1.4, 1.8e-5).unwrap();
    let mut net = Network::new(NetworkSpec {
        upstream_pressure: Some(5e5),
        boundary_temperature: Some(300.0),
        mass_flow_rate: 0.3,
        gas_flow_model: GasFlowModel::Isothermal,
        ..NetworkSpec::new("gas", gas, vec![pipe("g1", None, None, 150.0)])
    })
    .unwrap();
    let result = NetworkSolver::default().solve(&mut net).unwrap();
    let section = result.section("g1").unwrap();
    let outcome = section.calculation_output.gas_flow.clone().unwrap();
    assert!(!outcome.is_choked);
    let inlet = section.summary.inlet.pressure.unwrap();
    let outlet = section.summary.outlet.pressure.unwrap();
    assert!(outlet < inlet);
    let dp = section.calculation_output.pressure_drop.pipe_and_fittings.unwrap();
    assert!((inlet - outlet - dp).abs() < 1e-6);
    assert_eq!(section.summary.outlet.temperature, Some(300.0));
    assert!(section.summary.outlet.mach_number.unwrap() > section.summary.inlet.mach_number.unwrap());
}

#[test]
fn adiabatic_gas_line_cools() {
    let gas = Fluid::gas("N2", 28.0134, 1.0, 1.4, 1.8e-5).unwrap();
    let mut net = Network::new(NetworkSpec {
        upstream_pressure: Some(5e5),
        boundary_temperature: Some(300.0),
        mass_flow_rate: 0.4,
        gas_flow_model: GasFlowModel::Adiabatic,
        ..NetworkSpec::new("gas", gas, vec![pipe("g1", None, None, 200.0)])
    })
    .unwrap();
    let result = NetworkSolver::default().solve(&mut net).unwrap();
    let t_out = result.summary.outlet.temperature.unwrap();
    assert!(t_out < 300.0);
}

#[test]
fn cycle_is_rejected() {
    let mut net = Network::new(NetworkSpec {
        upstream_pressure: Some(3e5),
        boundary_temperature: Some(293.15),
        mass_flow_rate: 1.0,
        ..NetworkSpec::new(
            "loop",
            water(),
            vec![
                pipe("ab", Some("A"), Some("B"), 10.0),
                pipe("ba", Some("B"), Some("A"), 10.0),
            ],
        )
    })
    .unwrap();
    let err = NetworkSolver::default().solve(&mut net).unwrap_err();
    assert!(matches!(err, SolverError::Graph(_)));
}

#[test]
fn snapshot_round_trips_through_json() {
    let mut net = Network::new(NetworkSpec {
        upstream_pressure: Some(2e5),
        boundary_temperature: Some(293.15),
        mass_flow_rate: 2.0,
        ..NetworkSpec::new(
            "snap",
            water(),
            vec![pipe("s1", None, None, 25.0), pipe("s2", None, None, 25.0)],
        )
    })
    .unwrap();
    let result = NetworkSolver::default().solve(&mut net).unwrap().rounded();
    let json = serde_json::to_string(&result).unwrap();
    let back: NetworkResult = serde_json::from_str(&json).unwrap();
    assert_eq!(back, result);
    assert_eq!(back.sections.len(), 2);
}
