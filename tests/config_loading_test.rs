// ==========================================
// 配置加载与名册输入校验集成测试
// ==========================================
// 测试目标: 非法输入在排赛开始前快速失败
// ==========================================

mod helpers;

use helpers::{ymd, RosterBuilder};
use league_scheduler::config::config_keys;
use league_scheduler::domain::{Roster, SchoolRecord, TeamRecord};
use league_scheduler::engine::ScheduleOrchestrator;
use league_scheduler::{ConfigManager, SchedulerError, StrategyKind};
use std::collections::HashMap;
use std::io::Write;
use tempfile::NamedTempFile;

fn write_temp(content: &str) -> NamedTempFile {
    let mut file = NamedTempFile::new().unwrap();
    file.write_all(content.as_bytes()).unwrap();
    file
}

#[test]
fn test_load_config_from_file() {
    let file = write_temp(
        r#"{
            "rules": {
                "season_start": "2026-01-05",
                "season_end": "2026-02-14",
                "holidays": ["2026-01-19"],
                "max_games_per_7_days": 3,
                "final_game_deadline": "2026-02-10"
            },
            "solver": { "enabled": false },
            "strategy": "diversity_chunked",
            "chunk_size": 4
        }"#,
    );

    let mgr = ConfigManager::from_file(file.path()).unwrap();
    let cfg = mgr.config();
    assert_eq!(cfg.rules.season_end, ymd(2026, 2, 14));
    assert_eq!(cfg.rules.max_games_per_7_days, 3);
    assert_eq!(cfg.rules.deadline(), ymd(2026, 2, 10));
    assert_eq!(cfg.strategy, Some(StrategyKind::DiversityChunked));
    assert_eq!(cfg.chunk_size, 4);
    assert!(!cfg.solver.enabled);
    // 未给出的字段取默认值
    assert_eq!(cfg.rules.match_duration_minutes, 60);
}

#[test]
fn test_missing_file_fails() {
    let dir = tempfile::tempdir().unwrap();
    let err = ConfigManager::from_file(dir.path().join("absent.json")).unwrap_err();
    assert!(err.to_string().contains("absent.json"));
}

#[test]
fn test_malformed_file_fails() {
    let file = write_temp("{ \"rules\": ");
    assert!(ConfigManager::from_file(file.path()).is_err());

    let file = write_temp(r#"{ "rules": { "season_start": "2026-03-01", "season_end": "2026-01-01" } }"#);
    let err = ConfigManager::from_file(file.path()).unwrap_err();
    assert!(matches!(err, SchedulerError::InvalidConfig { .. }));
}

#[test]
fn test_overrides_feed_the_orchestrator() {
    let mut mgr = ConfigManager::new();
    let overrides: HashMap<String, String> = [
        (config_keys::SEASON_START, "2026-01-05"),
        (config_keys::SEASON_END, "2026-01-31"),
        (config_keys::HOLIDAYS, ""),
        (config_keys::SOLVER_ENABLED, "false"),
        (config_keys::STRATEGY, "auto"),
    ]
    .into_iter()
    .map(|(k, v)| (k.to_string(), v.to_string()))
    .collect();
    assert_eq!(mgr.apply_overrides(&overrides).unwrap(), 5);
    assert!(mgr.config().strategy.is_none());

    let roster = RosterBuilder::new()
        .school("A")
        .school("B")
        .division("Varsity")
        .facility("Gym", 1)
        .team("A1", "A", "Varsity", 2)
        .team("B1", "B", "Varsity", 2)
        .build();
    let outcome = ScheduleOrchestrator::new(mgr.into_config())
        .run(&roster)
        .unwrap();
    assert_eq!(outcome.schedule.len(), 2);
    assert!(outcome.is_complete());
}

// ==========================================
// 名册输入校验
// ==========================================

#[test]
fn test_negative_courts_rejected() {
    let err = RosterBuilder::new()
        .school("A")
        .division("Varsity")
        .facility("Gym", -1)
        .try_build()
        .unwrap_err();
    assert!(matches!(err, SchedulerError::NegativeCapacity { courts: -1, .. }));
}

#[test]
fn test_unknown_school_rejected() {
    let err = RosterBuilder::new()
        .school("A")
        .division("Varsity")
        .team("Z1", "Nowhere", "Varsity", 2)
        .try_build()
        .unwrap_err();
    match err {
        SchedulerError::UnknownReference { kind, name, .. } => {
            assert_eq!(kind, "school");
            assert_eq!(name, "Nowhere");
        }
        other => panic!("unexpected error: {other}"),
    }
}

#[test]
fn test_duplicate_team_rejected() {
    let err = RosterBuilder::new()
        .school("A")
        .division("Varsity")
        .team("A1", "A", "Varsity", 2)
        .team("A1", "A", "Varsity", 2)
        .try_build()
        .unwrap_err();
    assert!(matches!(err, SchedulerError::DuplicateId { .. }));
}

#[test]
fn test_team_without_division_rejected() {
    let schools = vec![SchoolRecord {
        name: "A".to_string(),
        cluster: None,
        tier: None,
        blackout_dates: vec![],
    }];
    let teams = vec![TeamRecord {
        id: "A1".to_string(),
        school: "A".to_string(),
        division: None,
        coach: None,
        tier: None,
        cluster: None,
        rivals: vec![],
        do_not_play: vec![],
        target_games: 2,
    }];
    let err = Roster::build(schools, vec![], vec![], teams).unwrap_err();
    assert!(matches!(err, SchedulerError::MissingDivision { .. }));
}

#[test]
fn test_unknown_rival_rejected() {
    let err = RosterBuilder::new()
        .school("A")
        .school("B")
        .division("Varsity")
        .team("A1", "A", "Varsity", 2)
        .team("B1", "B", "Varsity", 2)
        .rival("A1", "C1")
        .try_build()
        .unwrap_err();
    assert!(matches!(err, SchedulerError::UnknownReference { .. }));
}

#[test]
fn test_courts_beyond_u32_rejected() {
    let err = RosterBuilder::new()
        .school("A")
        .division("Varsity")
        .facility("Gym", i64::from(u32::MAX) + 1)
        .try_build()
        .unwrap_err();
    assert!(matches!(err, SchedulerError::InvalidRoster(_)));
}

// ==========================================
// 反序列化名册的结构校验
// ==========================================

fn create_two_team_roster() -> Roster {
    RosterBuilder::new()
        .school("A")
        .school("B")
        .division("Varsity")
        .facility("Gym", 1)
        .team("A1", "A", "Varsity", 2)
        .team("B1", "B", "Varsity", 2)
        .build()
}

fn tampered(edit: impl FnOnce(&mut serde_json::Value)) -> Roster {
    let mut value = serde_json::to_value(create_two_team_roster()).unwrap();
    edit(&mut value);
    serde_json::from_value(value).unwrap()
}

#[test]
fn test_built_roster_passes_structural_check() {
    let roster = create_two_team_roster();
    assert!(roster.validate().is_ok());

    let restored: Roster =
        serde_json::from_str(&serde_json::to_string(&roster).unwrap()).unwrap();
    assert!(restored.validate().is_ok());
}

#[test]
fn test_deserialized_roster_with_dangling_division_fails_before_scheduling() {
    let roster = tampered(|v| v["teams"][0]["division"] = serde_json::json!(42));
    let cfg = helpers::create_test_config(ymd(2026, 1, 5), ymd(2026, 1, 31));

    let err = ScheduleOrchestrator::new(cfg).run(&roster).unwrap_err();
    match err {
        SchedulerError::InvalidRoster(msg) => assert!(msg.contains("A1")),
        other => panic!("unexpected error: {other}"),
    }
}

#[test]
fn test_deserialized_roster_with_misplaced_ids_fails() {
    let roster = tampered(|v| v["teams"][1]["id"] = serde_json::json!(0));
    assert!(matches!(roster.validate(), Err(SchedulerError::InvalidRoster(_))));

    let roster = tampered(|v| v["teams"][1]["school"] = serde_json::json!(9));
    assert!(matches!(roster.validate(), Err(SchedulerError::InvalidRoster(_))));

    let roster = tampered(|v| v["teams"][0]["do_not_play"] = serde_json::json!([5]));
    assert!(matches!(roster.validate(), Err(SchedulerError::InvalidRoster(_))));
}
