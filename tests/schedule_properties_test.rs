// ==========================================
// 赛程不变量集成测试
// ==========================================
// 测试目标: 任意策略产出的赛程都满足硬不变量
// 覆盖范围: 场地唯一、球队/学校/教练不撞时、不同校对阵、重赛上限、校验幂等
// ==========================================

mod helpers;

use helpers::{create_league_roster, create_test_config, ymd};
use league_scheduler::domain::types::team_pair_key;
use league_scheduler::engine::{ScheduleOrchestrator, ScheduleOutcome, ScheduleValidator};
use league_scheduler::{Roster, SchedulerConfig, StrategyKind, ViolationKind};
use std::collections::{BTreeMap, HashSet};

const SCHOOLS: [&str; 6] = ["Adams", "Baker", "Carver", "Dewey", "Evans", "Foster"];

fn run(strategy: StrategyKind, mutate: impl FnOnce(&mut SchedulerConfig)) -> (Roster, SchedulerConfig, ScheduleOutcome) {
    let roster = create_league_roster(&SCHOOLS, 5);
    let mut cfg = create_test_config(ymd(2026, 1, 5), ymd(2026, 2, 28));
    cfg.strategy = Some(strategy);
    mutate(&mut cfg);
    let outcome = ScheduleOrchestrator::new(cfg.clone()).run(&roster).unwrap();
    (roster, cfg, outcome)
}

fn assert_invariants(roster: &Roster, cfg: &SchedulerConfig, outcome: &ScheduleOutcome) {
    let games = &outcome.schedule.games;

    let mut slots = HashSet::new();
    let mut team_times = HashSet::new();
    let mut pairs: BTreeMap<_, u32> = BTreeMap::new();
    for g in games {
        assert!(slots.insert(g.slot.key()), "场地时段重复: {}", g.slot);
        for t in g.teams() {
            assert!(team_times.insert((t, g.slot.time_key())), "球队撞时: {}", t);
        }
        assert_ne!(roster.team(g.home).school, roster.team(g.away).school);
        *pairs.entry(team_pair_key(g.home, g.away)).or_default() += 1;
    }
    assert!(pairs.values().all(|n| *n <= cfg.rules.rematch_ceiling));

    let v = &outcome.validation;
    for kind in [
        ViolationKind::SlotConflict,
        ViolationKind::TeamDoubleBooking,
        ViolationKind::SchoolDoubleBooking,
        ViolationKind::CoachDoubleBooking,
        ViolationKind::SameSchoolPairing,
        ViolationKind::ForbiddenPairing,
        ViolationKind::RematchCeiling,
        ViolationKind::TargetExceeded,
        ViolationKind::OutsideOpenWindow,
        ViolationKind::FacilityUnavailable,
    ] {
        assert_eq!(v.count_of(kind), 0, "{}\n{}", kind, v.summary());
    }

    // 排序: 日期 -> 开始时刻 -> 场馆 -> 场地
    let keys: Vec<_> = games
        .iter()
        .map(|g| (g.slot.date, g.slot.start, g.slot.facility, g.slot.court))
        .collect();
    let mut sorted = keys.clone();
    sorted.sort();
    assert_eq!(keys, sorted);
}

#[test]
fn test_division_first_invariants() {
    let (roster, cfg, outcome) = run(StrategyKind::DivisionFirst, |_| {});
    assert_invariants(&roster, &cfg, &outcome);
    assert!(outcome.shortfalls.is_empty(), "{:?}", outcome.shortfalls);
    assert_eq!(outcome.schedule.len(), 12 * 5 / 2);
    assert_eq!(outcome.stats.strategy_report.partitions, 2);
}

#[test]
fn test_school_pair_bundle_invariants() {
    let (roster, cfg, outcome) = run(StrategyKind::SchoolPairBundle, |_| {});
    assert_invariants(&roster, &cfg, &outcome);
}

#[test]
fn test_diversity_chunked_invariants() {
    let (roster, cfg, outcome) = run(StrategyKind::DiversityChunked, |c| c.chunk_size = 3);
    assert_invariants(&roster, &cfg, &outcome);
    // 每个组别 6 队切成 2 块
    assert_eq!(outcome.stats.strategy_report.partitions, 4);
}

#[test]
fn test_exact_pipeline_keeps_invariants() {
    let (roster, cfg, outcome) = run(StrategyKind::DivisionFirst, |c| {
        c.solver.enabled = true;
        c.solver.time_budget_ms = 200;
        c.solver.max_variables = 300;
    });
    assert_invariants(&roster, &cfg, &outcome);
    let report = &outcome.stats.strategy_report;
    assert_eq!(report.exact_solved + report.exact_fallbacks, 2);
}

#[test]
fn test_validation_is_idempotent_on_produced_schedule() {
    let (roster, cfg, outcome) = run(StrategyKind::DivisionFirst, |_| {});
    let validator = ScheduleValidator::new(&cfg, &roster);
    let first = validator.validate(&outcome.schedule);
    let second = validator.validate(&outcome.schedule);
    assert_eq!(first, second);
    assert_eq!(first, outcome.validation);
}

#[test]
fn test_runs_are_deterministic() {
    let (_, _, a) = run(StrategyKind::DivisionFirst, |_| {});
    let (_, _, b) = run(StrategyKind::DivisionFirst, |_| {});
    assert_eq!(a.schedule, b.schedule);
    assert_ne!(a.run_id, b.run_id);
}
