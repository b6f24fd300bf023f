use crate::analysis::{
    self, analyze_batch, CallSummary, FindingKind, Interval, Options, OptionsBuilder, Outcome,
    State, Unit,
};
use crate::il::{self, constant, slot, Condition, ControlFlowGraph, Operation};
use crate::Error;
use std::time::Duration;

const INT_MIN: i64 = i32::MIN as i64;
const INT_MAX: i64 = i32::MAX as i64;

fn int(name: &str) -> il::Slot {
    slot(name, 32)
}

fn int_constant(value: i64) -> il::Operand {
    constant(value, 32).into()
}

fn range(lo: i64, hi: i64) -> Interval {
    Interval::new(32, lo, hi)
}

fn analyze(procedure: &il::Procedure) -> analysis::Report {
    analysis::interval_analysis(procedure, State::new(), &Options::default()).unwrap()
}

fn point(cfg: &mut ControlFlowGraph, operation: Operation) -> usize {
    cfg.new_point(operation).unwrap()
}

fn do_it(operand: il::Operand) -> Operation {
    Operation::call(None, "doIt", vec![operand])
}

/// int j = i; if (j < 5) return i; else return 5;
fn aliasing_max5() -> il::Procedure {
    let mut cfg = ControlFlowGraph::new();
    let copy = point(&mut cfg, Operation::copy(int("j"), int("i")));
    let test = point(
        &mut cfg,
        Operation::branch(Condition::lt(int("j").into(), int_constant(5))),
    );
    let small = point(&mut cfg, Operation::ret(Some(int("i").into())));
    let five = point(&mut cfg, Operation::ret(Some(int_constant(5))));
    cfg.set_entry(copy).unwrap();
    cfg.sequential_edge(copy, test).unwrap();
    cfg.branch_edge(test, small, true).unwrap();
    cfg.branch_edge(test, five, false).unwrap();
    il::Procedure::new("aliasingMax5", vec![int("i")], cfg)
}

#[test]
fn narrowing_through_an_alias() {
    let report = analyze(&aliasing_max5());

    assert_eq!(report.outcome(), Outcome::Converged);
    assert_eq!(report.return_value(), Some(range(INT_MIN, 5)));
    assert_eq!(report.value(2, &int("i")), range(INT_MIN, 4));
    assert!(report.findings().is_empty());
}

#[test]
fn aliasing_min_minus_one() {
    // int j = i; if (j >= 0) return j; else return -1;
    let mut cfg = ControlFlowGraph::new();
    let copy = point(&mut cfg, Operation::copy(int("j"), int("i")));
    let test = point(
        &mut cfg,
        Operation::branch(Condition::ge(int("j").into(), int_constant(0))),
    );
    let positive = point(&mut cfg, Operation::ret(Some(int("j").into())));
    let negative = point(&mut cfg, Operation::ret(Some(int_constant(-1))));
    cfg.set_entry(copy).unwrap();
    cfg.sequential_edge(copy, test).unwrap();
    cfg.branch_edge(test, positive, true).unwrap();
    cfg.branch_edge(test, negative, false).unwrap();
    let procedure = il::Procedure::new("aliasingMinM1", vec![int("i")], cfg);

    let report = analyze(&procedure);
    assert_eq!(report.return_value(), Some(range(-1, INT_MAX)));
    assert_eq!(report.value(negative, &int("i")), range(INT_MIN, -1));
}

#[test]
fn switch_cases_bound_a_product() {
    // switch (i) { case 0: j = 0; case 1: j = 2; case 2: j = 4; default: throw }
    // return j * i;
    let mut cfg = ControlFlowGraph::new();
    let switch = point(&mut cfg, Operation::switch(int("i").into()));
    let zero = point(&mut cfg, Operation::constant(int("j"), constant(0, 32)));
    let two = point(&mut cfg, Operation::constant(int("j"), constant(2, 32)));
    let four = point(&mut cfg, Operation::constant(int("j"), constant(4, 32)));
    let throw = point(&mut cfg, Operation::unsupported("athrow", vec![]));
    let product = point(
        &mut cfg,
        Operation::mul(int("r"), int("j").into(), int("i").into()),
    );
    let exit = point(&mut cfg, Operation::ret(Some(int("r").into())));
    cfg.set_entry(switch).unwrap();
    cfg.switch_case_edge(switch, zero, 0).unwrap();
    cfg.switch_case_edge(switch, two, 1).unwrap();
    cfg.switch_case_edge(switch, four, 2).unwrap();
    cfg.switch_default_edge(switch, throw).unwrap();
    cfg.unconditional_edge(zero, product).unwrap();
    cfg.unconditional_edge(two, product).unwrap();
    cfg.sequential_edge(four, product).unwrap();
    cfg.sequential_edge(product, exit).unwrap();
    let procedure = il::Procedure::new("someSwitch", vec![int("i")], cfg);

    let report = analyze(&procedure);
    let returned = report.return_value().unwrap();
    assert!(returned <= range(0, 8));
    assert_eq!(report.value(product, &int("i")), range(0, 2));
    assert_eq!(report.value(product, &int("j")), range(0, 4));
    assert!(report.is_reachable(throw));
}

#[test]
fn three_way_comparison_keeps_every_edge() {
    // if (a < b) doIt(-1); else if (a == b) doIt(0); else if (b > a) doIt(1);
    let mut cfg = ControlFlowGraph::new();
    let less = point(
        &mut cfg,
        Operation::branch(Condition::lt(int("a").into(), int("b").into())),
    );
    let minus_one = point(&mut cfg, do_it(int_constant(-1)));
    let equal = point(
        &mut cfg,
        Operation::branch(Condition::eq(int("a").into(), int("b").into())),
    );
    let zero = point(&mut cfg, do_it(int_constant(0)));
    let greater = point(
        &mut cfg,
        Operation::branch(Condition::gt(int("b").into(), int("a").into())),
    );
    let one = point(&mut cfg, do_it(int_constant(1)));
    let exit = point(&mut cfg, Operation::ret(None));
    cfg.set_entry(less).unwrap();
    cfg.branch_edge(less, minus_one, true).unwrap();
    cfg.branch_edge(less, equal, false).unwrap();
    cfg.branch_edge(equal, zero, true).unwrap();
    cfg.branch_edge(equal, greater, false).unwrap();
    cfg.branch_edge(greater, one, true).unwrap();
    cfg.branch_edge(greater, exit, false).unwrap();
    cfg.unconditional_edge(minus_one, exit).unwrap();
    cfg.unconditional_edge(zero, exit).unwrap();
    cfg.unconditional_edge(one, exit).unwrap();
    let procedure = il::Procedure::new("multipleConstraints1", vec![int("a"), int("b")], cfg);

    let report = analyze(&procedure);
    assert_eq!(report.outcome(), Outcome::Converged);
    assert!(report.infeasible_edges().is_empty());
    assert!(report.is_reachable(one));
    assert!(report.unreachable_points().is_empty());
    assert!(report
        .state(zero)
        .unwrap()
        .aliases()
        .are_aliased(&int("a"), &int("b")));
}

/// int[] is = new int[10]; for (int i = 0; i <= 10; i++) is[i] = i;
fn array10() -> il::Procedure {
    let mut cfg = ControlFlowGraph::new();
    let init = point(&mut cfg, Operation::constant(int("i"), constant(0, 32)));
    let test = point(
        &mut cfg,
        Operation::branch(Condition::le(int("i").into(), int_constant(10))),
    );
    let store = point(
        &mut cfg,
        Operation::array_store(int("i").into(), int("i").into(), Some(int_constant(10))),
    );
    let step = point(
        &mut cfg,
        Operation::add(int("i"), int("i").into(), int_constant(1)),
    );
    let exit = point(&mut cfg, Operation::ret(Some(int("i").into())));
    cfg.set_entry(init).unwrap();
    cfg.sequential_edge(init, test).unwrap();
    cfg.branch_edge(test, store, true).unwrap();
    cfg.branch_edge(test, exit, false).unwrap();
    cfg.sequential_edge(store, step).unwrap();
    cfg.loop_back_edge(step, test).unwrap();
    il::Procedure::new("array10", vec![], cfg)
}

#[test]
fn out_of_range_store_in_a_loop() {
    let report = analyze(&array10());

    assert_eq!(report.outcome(), Outcome::Converged);
    let out_of_range = report
        .findings()
        .iter()
        .filter(|finding| *finding.kind() == FindingKind::PossibleOutOfRange)
        .map(|finding| finding.point())
        .collect::<Vec<usize>>();
    assert_eq!(out_of_range, vec![2]);
    assert_eq!(report.value(2, &int("i")), range(0, 10));
    assert_eq!(report.return_value(), Some(range(11, 11)));
}

#[test]
fn narrowing_passes_recover_the_exit_value() {
    let options = OptionsBuilder::new().narrowing_passes(0).build();
    let report = analysis::interval_analysis(&array10(), State::new(), &options).unwrap();

    assert_eq!(report.outcome(), Outcome::Converged);
    assert_eq!(report.return_value(), Some(range(11, INT_MAX)));
}

/// int i = 0; int j = 1; while (i < 5 && k < 10) { j += 1; i += 1; } return j;
fn counting_loop() -> il::Procedure {
    let mut cfg = ControlFlowGraph::new();
    let init_i = point(&mut cfg, Operation::constant(int("i"), constant(0, 32)));
    let init_j = point(&mut cfg, Operation::constant(int("j"), constant(1, 32)));
    let test_i = point(
        &mut cfg,
        Operation::branch(Condition::lt(int("i").into(), int_constant(5))),
    );
    let test_k = point(
        &mut cfg,
        Operation::branch(Condition::lt(int("k").into(), int_constant(10))),
    );
    let step_j = point(
        &mut cfg,
        Operation::add(int("j"), int("j").into(), int_constant(1)),
    );
    let step_i = point(
        &mut cfg,
        Operation::add(int("i"), int("i").into(), int_constant(1)),
    );
    let exit = point(&mut cfg, Operation::ret(Some(int("j").into())));
    cfg.set_entry(init_i).unwrap();
    cfg.sequential_edge(init_i, init_j).unwrap();
    cfg.sequential_edge(init_j, test_i).unwrap();
    cfg.branch_edge(test_i, test_k, true).unwrap();
    cfg.branch_edge(test_i, exit, false).unwrap();
    cfg.branch_edge(test_k, step_j, true).unwrap();
    cfg.branch_edge(test_k, exit, false).unwrap();
    cfg.sequential_edge(step_j, step_i).unwrap();
    cfg.loop_back_edge(step_i, test_i).unwrap();
    il::Procedure::new("countingLoop", vec![int("k")], cfg)
}

#[test]
fn counting_loop_terminates_soundly() {
    let report = analyze(&counting_loop());

    assert_eq!(report.outcome(), Outcome::Converged);
    let returned = report.return_value().unwrap();
    for j in 1..=6 {
        assert!(returned.contains(j));
    }
    assert_eq!(report.value(4, &int("i")), range(0, 4));
}

#[test]
fn small_budget_reports_divergence() {
    let options = OptionsBuilder::new().max_iterations(5).build();
    let report = analysis::interval_analysis(&counting_loop(), State::new(), &options).unwrap();

    assert_eq!(report.outcome(), Outcome::Diverged);
    assert_eq!(report.findings().len(), 1);
    assert_eq!(*report.findings()[0].kind(), FindingKind::Divergence);
    assert_eq!(report.findings()[0].point(), 0);
    for index in 0..7 {
        assert_eq!(report.value(index, &int("i")), Interval::top(32));
    }
}

#[test]
fn generous_deadline_converges() {
    let options = OptionsBuilder::new()
        .deadline(Duration::from_secs(60))
        .build();
    let report = analysis::interval_analysis(&counting_loop(), State::new(), &options).unwrap();
    assert_eq!(report.outcome(), Outcome::Converged);
}

#[test]
fn joins_after_nested_conditions() {
    // int i = 0; if (c == 0) i = 1; else if (c == 1) i = 2; else i = -1; doIt(i);
    let mut cfg = ControlFlowGraph::new();
    let init = point(&mut cfg, Operation::constant(int("i"), constant(0, 32)));
    let zero = point(
        &mut cfg,
        Operation::branch(Condition::eq(int("c").into(), int_constant(0))),
    );
    let one = point(&mut cfg, Operation::constant(int("i"), constant(1, 32)));
    let first = point(
        &mut cfg,
        Operation::branch(Condition::eq(int("c").into(), int_constant(1))),
    );
    let two = point(&mut cfg, Operation::constant(int("i"), constant(2, 32)));
    let minus_one = point(&mut cfg, Operation::constant(int("i"), constant(-1, 32)));
    let join = point(&mut cfg, do_it(int("i").into()));
    let exit = point(&mut cfg, Operation::ret(None));
    cfg.set_entry(init).unwrap();
    cfg.sequential_edge(init, zero).unwrap();
    cfg.branch_edge(zero, one, true).unwrap();
    cfg.branch_edge(zero, first, false).unwrap();
    cfg.branch_edge(first, two, true).unwrap();
    cfg.branch_edge(first, minus_one, false).unwrap();
    cfg.unconditional_edge(one, join).unwrap();
    cfg.unconditional_edge(two, join).unwrap();
    cfg.sequential_edge(minus_one, join).unwrap();
    cfg.sequential_edge(join, exit).unwrap();
    let procedure = il::Procedure::new("complexConditions1", vec![int("c")], cfg);

    let report = analyze(&procedure);
    assert_eq!(report.value(join, &int("i")), range(-1, 2));
    assert_eq!(report.value(one, &int("c")), range(0, 0));
    assert_eq!(report.value(two, &int("c")), range(1, 1));
    assert_eq!(report.value(join, &int("c")), Interval::top(32));
}

#[test]
fn byte_casts() {
    // while ((read = anInt()) > 0) {
    //     byte readed = (byte) read;
    //     if (readed == -1) continue;
    //     if (readed == 127) break;
    //     doIt(readed);
    // }
    let byte = slot("readed", 8);
    let mut cfg = ControlFlowGraph::new();
    let read = point(&mut cfg, Operation::call(Some(int("read")), "anInt", vec![]));
    let positive = point(
        &mut cfg,
        Operation::branch(Condition::gt(int("read").into(), int_constant(0))),
    );
    let cast = point(&mut cfg, Operation::cast(byte.clone(), int("read").into()));
    let minus_one = point(
        &mut cfg,
        Operation::branch(Condition::eq(byte.clone().into(), constant(-1, 8).into())),
    );
    let max = point(
        &mut cfg,
        Operation::branch(Condition::eq(byte.clone().into(), constant(127, 8).into())),
    );
    let use_byte = point(&mut cfg, do_it(byte.clone().into()));
    let exit = point(&mut cfg, Operation::ret(None));
    cfg.set_entry(read).unwrap();
    cfg.sequential_edge(read, positive).unwrap();
    cfg.branch_edge(positive, cast, true).unwrap();
    cfg.branch_edge(positive, exit, false).unwrap();
    cfg.sequential_edge(cast, minus_one).unwrap();
    cfg.branch_edge(minus_one, read, true).unwrap();
    cfg.branch_edge(minus_one, max, false).unwrap();
    cfg.branch_edge(max, exit, true).unwrap();
    cfg.branch_edge(max, use_byte, false).unwrap();
    cfg.loop_back_edge(use_byte, read).unwrap();
    let procedure = il::Procedure::new("casts", vec![], cfg);

    let report = analyze(&procedure);
    assert_eq!(report.outcome(), Outcome::Converged);
    assert_eq!(report.value(cast, &int("read")), range(1, INT_MAX));
    assert_eq!(report.value(minus_one, &byte), Interval::top(8));
    // -1 sits inside the range, so only 127 is removed
    assert_eq!(report.value(use_byte, &byte), Interval::new(8, -128, 126));
}

#[test]
fn truncation_round_trip_is_a_superset() {
    let mut cfg = ControlFlowGraph::new();
    let narrow = point(&mut cfg, Operation::cast(slot("b", 8), int("x").into()));
    let widen = point(&mut cfg, Operation::cast(int("y"), slot("b", 8).into()));
    let exit = point(&mut cfg, Operation::ret(Some(int("y").into())));
    cfg.set_entry(narrow).unwrap();
    cfg.sequential_edge(narrow, widen).unwrap();
    cfg.sequential_edge(widen, exit).unwrap();
    let procedure = il::Procedure::new("truncate", vec![int("x")], cfg);

    for (lo, hi) in [(0, 300), (100, 200), (-5, 5)] {
        let initial = State::new().with_value(int("x"), range(lo, hi));
        let report = analysis::interval_analysis(&procedure, initial, &Options::default()).unwrap();
        let returned = report.return_value().unwrap();
        for value in lo..=hi {
            assert!(returned.contains(value as i8 as i64));
        }
    }
}

#[test]
fn alias_survives_a_loop() {
    // int b = 0, c = 0, i = 0; int j = i;
    // while (j < 2) { int a = anInt(); if (i == 1) b = a; else c = a; i++; j = i; }
    // if (i == 2) doIt(j);
    let mut cfg = ControlFlowGraph::new();
    let init_b = point(&mut cfg, Operation::constant(int("b"), constant(0, 32)));
    let init_c = point(&mut cfg, Operation::constant(int("c"), constant(0, 32)));
    let init_i = point(&mut cfg, Operation::constant(int("i"), constant(0, 32)));
    let alias = point(&mut cfg, Operation::copy(int("j"), int("i")));
    let test = point(
        &mut cfg,
        Operation::branch(Condition::lt(int("j").into(), int_constant(2))),
    );
    let any = point(&mut cfg, Operation::call(Some(int("a")), "anInt", vec![]));
    let is_one = point(
        &mut cfg,
        Operation::branch(Condition::eq(int("i").into(), int_constant(1))),
    );
    let set_b = point(&mut cfg, Operation::copy(int("b"), int("a")));
    let set_c = point(&mut cfg, Operation::copy(int("c"), int("a")));
    let step = point(
        &mut cfg,
        Operation::add(int("i"), int("i").into(), int_constant(1)),
    );
    let realias = point(&mut cfg, Operation::copy(int("j"), int("i")));
    let is_two = point(
        &mut cfg,
        Operation::branch(Condition::eq(int("i").into(), int_constant(2))),
    );
    let use_j = point(&mut cfg, do_it(int("j").into()));
    let exit = point(&mut cfg, Operation::ret(None));
    cfg.set_entry(init_b).unwrap();
    cfg.sequential_edge(init_b, init_c).unwrap();
    cfg.sequential_edge(init_c, init_i).unwrap();
    cfg.sequential_edge(init_i, alias).unwrap();
    cfg.sequential_edge(alias, test).unwrap();
    cfg.branch_edge(test, any, true).unwrap();
    cfg.branch_edge(test, is_two, false).unwrap();
    cfg.sequential_edge(any, is_one).unwrap();
    cfg.branch_edge(is_one, set_b, true).unwrap();
    cfg.branch_edge(is_one, set_c, false).unwrap();
    cfg.unconditional_edge(set_b, step).unwrap();
    cfg.sequential_edge(set_c, step).unwrap();
    cfg.sequential_edge(step, realias).unwrap();
    cfg.loop_back_edge(realias, test).unwrap();
    cfg.branch_edge(is_two, use_j, true).unwrap();
    cfg.branch_edge(is_two, exit, false).unwrap();
    cfg.sequential_edge(use_j, exit).unwrap();
    let procedure = il::Procedure::new("cfDependentValues4", vec![], cfg);

    let report = analyze(&procedure);
    assert_eq!(report.outcome(), Outcome::Converged);
    assert_eq!(report.value(use_j, &int("j")), Interval::constant(32, 2));
    assert!(report
        .state(test)
        .unwrap()
        .aliases()
        .are_aliased(&int("i"), &int("j")));
}

#[test]
fn call_summaries() {
    // int a = anInt(); int b = id(a); if (b < 5) return a; else return 5;
    let mut cfg = ControlFlowGraph::new();
    let call = point(&mut cfg, Operation::call(Some(int("a")), "anInt", vec![]));
    let id = point(
        &mut cfg,
        Operation::call(Some(int("b")), "id", vec![int("a").into()]),
    );
    let test = point(
        &mut cfg,
        Operation::branch(Condition::lt(int("b").into(), int_constant(5))),
    );
    let small = point(&mut cfg, Operation::ret(Some(int("a").into())));
    let five = point(&mut cfg, Operation::ret(Some(int_constant(5))));
    cfg.set_entry(call).unwrap();
    cfg.sequential_edge(call, id).unwrap();
    cfg.sequential_edge(id, test).unwrap();
    cfg.branch_edge(test, small, true).unwrap();
    cfg.branch_edge(test, five, false).unwrap();
    let procedure = il::Procedure::new("summaries", vec![], cfg);

    let options = OptionsBuilder::new()
        .summary("anInt", CallSummary::Returns { lo: 0, hi: 9 })
        .summary("id", CallSummary::ReturnsArgument(0))
        .build();
    let report = analysis::interval_analysis(&procedure, State::new(), &options).unwrap();
    assert_eq!(report.return_value(), Some(range(0, 5)));
    assert_eq!(report.value(small, &int("a")), range(0, 4));

    // without summaries neither call says anything about its result
    let report = analyze(&procedure);
    assert_eq!(report.return_value(), Some(Interval::top(32)));
}

#[test]
fn batch_is_independent_of_input_order() {
    let units = vec![
        Unit::new(counting_loop(), State::new()),
        Unit::new(aliasing_max5(), State::new()),
        Unit::new(array10(), State::new()),
    ];
    let reversed = units.iter().rev().cloned().collect::<Vec<Unit>>();

    let options = Options::default();
    let forward = analyze_batch(&units, &options);
    let backward = analyze_batch(&reversed, &options);

    assert_eq!(forward.reports(), backward.reports());
    assert_eq!(forward.to_json().unwrap(), backward.to_json().unwrap());
    assert_eq!(forward.reports()[0].procedure(), "aliasingMax5");
    assert_eq!(
        forward.reports()[0],
        analysis::interval_analysis(&aliasing_max5(), State::new(), &options).unwrap()
    );
}

#[test]
fn batch_collects_construction_errors() {
    let mut cfg = ControlFlowGraph::new();
    let nop = point(&mut cfg, Operation::nop());
    let exit = point(&mut cfg, Operation::ret(None));
    cfg.set_entry(nop).unwrap();
    cfg.branch_edge(nop, exit, true).unwrap();
    let broken = il::Procedure::new("broken", vec![], cfg);

    let units = vec![
        Unit::new(broken, State::new()),
        Unit::new(aliasing_max5(), State::new()),
    ];
    let batch = analyze_batch(&units, &Options::default());

    assert_eq!(batch.reports().len(), 1);
    assert_eq!(batch.failures().len(), 1);
    assert_eq!(batch.failures()[0].0, "broken");
    assert!(matches!(batch.failures()[0].1, Error::InvalidEdge(0, 1, _)));
}

#[test]
fn procedures_load_from_json() {
    let json = r#"{
        "name": "five",
        "parameters": [],
        "control_flow_graph": {
            "entry": 0,
            "points": [
                {"index": 0, "operation": {"Const": {
                    "dst": {"name": "r", "bits": 32},
                    "constant": {"value": 5, "bits": 32}
                }}},
                {"index": 1, "operation": {"Return": {
                    "value": {"Slot": {"name": "r", "bits": 32}}
                }}}
            ],
            "edges": [{"head": 0, "tail": 1, "kind": "Sequential"}]
        }
    }"#;
    let procedure = il::Procedure::from_json(json).unwrap();
    let report = analyze(&procedure);
    assert_eq!(report.return_value(), Some(Interval::constant(32, 5)));

    let procedure = aliasing_max5();
    let loaded = il::Procedure::from_json(&procedure.to_json().unwrap()).unwrap();
    assert_eq!(analyze(&procedure), analyze(&loaded));
}

#[test]
fn bottom_initial_facts_are_rejected() {
    let initial = State::new().with_value(int("i"), Interval::bottom(32));
    let result = analysis::interval_analysis(&aliasing_max5(), initial, &Options::default());
    assert!(matches!(result, Err(Error::Analysis(_))));
}

#[test]
fn empty_call_summaries_are_rejected() {
    // int a = f(); if (a < 100) doIt(0); return;
    let mut cfg = ControlFlowGraph::new();
    let call = point(&mut cfg, Operation::call(Some(int("a")), "f", vec![]));
    let test = point(
        &mut cfg,
        Operation::branch(Condition::lt(int("a").into(), int_constant(100))),
    );
    let small = point(&mut cfg, do_it(int_constant(0)));
    let exit = point(&mut cfg, Operation::ret(None));
    cfg.set_entry(call).unwrap();
    cfg.sequential_edge(call, test).unwrap();
    cfg.branch_edge(test, small, true).unwrap();
    cfg.branch_edge(test, exit, false).unwrap();
    cfg.sequential_edge(small, exit).unwrap();
    let procedure = il::Procedure::new("emptySummary", vec![], cfg);

    let options = OptionsBuilder::new()
        .summary("f", CallSummary::Returns { lo: 5, hi: 1 })
        .build();
    let result = analysis::interval_analysis(&procedure, State::new(), &options);
    assert!(matches!(result, Err(Error::Analysis(_))));

    let batch = analyze_batch(&[Unit::new(procedure.clone(), State::new())], &options);
    assert!(batch.reports().is_empty());
    assert_eq!(batch.failures()[0].0, "emptySummary");

    let options = OptionsBuilder::new()
        .summary("f", CallSummary::Returns { lo: 1, hi: 5 })
        .build();
    let report = analysis::interval_analysis(&procedure, State::new(), &options).unwrap();
    assert!(report.infeasible_edges().contains(&(test, exit)));
    assert!(report.is_reachable(small));
    assert_eq!(report.value(test, &int("a")), range(1, 5));
}

fn initial_from_json(json: &str) -> Result<State, serde_json::Error> {
    serde_json::from_str(json)
}

#[test]
fn malformed_initial_facts_are_rejected() {
    let json = serde_json::to_string(&State::new().with_value(int("i"), range(1, 9))).unwrap();
    let loaded = initial_from_json(&json).unwrap();
    let report = analysis::interval_analysis(&aliasing_max5(), loaded, &Options::default()).unwrap();
    assert_eq!(report.value(2, &int("i")), range(1, 4));
    assert!(report.infeasible_edges().is_empty());

    // inverted bounds never make it into a state
    let inverted = json.replace(r#""lo":1,"hi":9"#, r#""lo":9,"hi":1"#);
    assert_ne!(inverted, json);
    assert!(initial_from_json(&inverted).is_err());

    let outside = json.replace(r#""hi":9"#, r#""hi":4294967296"#);
    assert!(initial_from_json(&outside).is_err());

    let narrow_slot = json.replace(r#""name":"i","bits":32"#, r#""name":"i","bits":8"#);
    let initial = initial_from_json(&narrow_slot).unwrap();
    let result = analysis::interval_analysis(&aliasing_max5(), initial, &Options::default());
    assert!(matches!(result, Err(Error::Analysis(_))));

    let invalid_slot = json.replace(r#""name":"i","bits":32"#, r#""name":"i","bits":0"#);
    let initial = initial_from_json(&invalid_slot).unwrap();
    let result = analysis::interval_analysis(&aliasing_max5(), initial, &Options::default());
    assert!(matches!(result, Err(Error::InvalidBits(0))));
}

#[test]
fn invalid_parameter_widths_are_rejected() {
    let mut cfg = ControlFlowGraph::new();
    let exit = point(&mut cfg, Operation::ret(None));
    cfg.set_entry(exit).unwrap();
    let procedure = il::Procedure::new("wide", vec![slot("i", 128)], cfg);

    let result = analysis::interval_analysis(&procedure, State::new(), &Options::default());
    assert!(matches!(result, Err(Error::InvalidBits(128))));
}

#[test]
fn reached_deadline_reports_divergence() {
    let options = OptionsBuilder::new().deadline(Duration::ZERO).build();
    let report = analysis::interval_analysis(&array10(), State::new(), &options).unwrap();

    assert_eq!(report.outcome(), Outcome::DeadlineExceeded);
    assert_eq!(report.findings().len(), 1);
    assert_eq!(*report.findings()[0].kind(), FindingKind::Divergence);
    for index in 0..5 {
        assert_eq!(report.value(index, &int("i")), Interval::top(32));
    }
    assert_eq!(report.return_value(), Some(Interval::top(32)));
}

#[test]
fn widening_delay_keeps_short_loops_exact() {
    let options = OptionsBuilder::new()
        .narrowing_passes(0)
        .widening_delay(20)
        .build();
    let report = analysis::interval_analysis(&array10(), State::new(), &options).unwrap();

    assert_eq!(report.outcome(), Outcome::Converged);
    assert_eq!(report.value(1, &int("i")), range(0, 11));
    assert_eq!(report.return_value(), Some(range(11, 11)));

    let options = OptionsBuilder::new()
        .narrowing_passes(0)
        .widening_delay(5)
        .build();
    let report = analysis::interval_analysis(&array10(), State::new(), &options).unwrap();
    assert_eq!(report.return_value(), Some(range(11, INT_MAX)));
}
