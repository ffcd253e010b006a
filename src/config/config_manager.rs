// ==========================================
// 赛季排赛引擎 - 配置管理器
// ==========================================
// 职责: 配置加载 (JSON 字符串/文件)、键值覆写、快照、校验
// 规则: 缺省字段回落到默认值; 任何非法值在返回前快速失败
// ==========================================

use crate::config::rules::SchedulerConfig;
use crate::config::scoring_profile::ScoringWeightOverrides;
use crate::engine::strategy::StrategyKind;
use crate::error::{SchedulerError, SchedulerResult};
use anyhow::Context;
use chrono::NaiveDate;
use std::collections::{BTreeMap, HashMap};
use std::path::Path;
use std::str::FromStr;
use tracing::{debug, info, warn};

// ==========================================
// ConfigManager - 配置管理器
// ==========================================
#[derive(Debug, Clone, Default)]
pub struct ConfigManager {
    config: SchedulerConfig,
}

impl ConfigManager {
    /// 使用默认配置创建
    pub fn new() -> Self {
        Self::default()
    }

    /// 从已有配置对象创建 (先校验)
    pub fn from_config(config: SchedulerConfig) -> SchedulerResult<Self> {
        config.validate()?;
        Ok(Self { config })
    }

    /// 从 JSON 字符串加载
    ///
    /// # 说明
    /// 缺省字段使用默认值; 结构错误返回 SchedulerError::Json
    pub fn from_json_str(raw: &str) -> SchedulerResult<Self> {
        let config: SchedulerConfig = serde_json::from_str(raw)?;
        Self::from_config(config)
    }

    /// 从 JSON 文件加载
    pub fn from_file(path: impl AsRef<Path>) -> SchedulerResult<Self> {
        let path = path.as_ref();
        let raw = std::fs::read_to_string(path)
            .with_context(|| format!("读取配置文件失败: {}", path.display()))?;
        let config: SchedulerConfig = serde_json::from_str(&raw)
            .with_context(|| format!("配置文件格式错误: {}", path.display()))?;
        info!(path = %path.display(), "配置文件加载完成");
        Self::from_config(config)
    }

    pub fn config(&self) -> &SchedulerConfig {
        &self.config
    }

    pub fn into_config(self) -> SchedulerConfig {
        self.config
    }

    /// 应用评分权重覆写
    pub fn apply_weight_overrides(&mut self, overrides: &ScoringWeightOverrides) {
        if overrides.is_empty() {
            return;
        }
        self.config.weights = overrides.apply(&self.config.weights);
        debug!("评分权重覆写已应用");
    }

    /// 批量应用键值覆写 (键见 config_keys)
    ///
    /// # 返回
    /// - Ok(usize): 应用的键数量
    /// - Err: 未知键、值无法解析或覆写后配置不合法
    pub fn apply_overrides(&mut self, overrides: &HashMap<String, String>) -> SchedulerResult<usize> {
        // 排序保证报错顺序确定
        let ordered: BTreeMap<&String, &String> = overrides.iter().collect();
        let mut next = self.config.clone();
        for (key, value) in &ordered {
            set_value(&mut next, key.trim(), value.trim())?;
        }
        next.validate()?;
        self.config = next;
        info!(count = ordered.len(), "配置覆写已应用");
        Ok(ordered.len())
    }

    /// 单键覆写
    pub fn set_value(&mut self, key: &str, value: &str) -> SchedulerResult<()> {
        let mut next = self.config.clone();
        set_value(&mut next, key.trim(), value.trim())?;
        next.validate()?;
        self.config = next;
        Ok(())
    }

    /// 配置快照 (JSON)
    pub fn get_config_snapshot(&self) -> SchedulerResult<String> {
        Ok(serde_json::to_string(&self.config)?)
    }
}

fn parse<T: FromStr>(key: &str, value: &str) -> SchedulerResult<T> {
    value
        .parse::<T>()
        .map_err(|_| SchedulerError::config(key, format!("无法解析的值: {}", value)))
}

fn parse_date(key: &str, value: &str) -> SchedulerResult<NaiveDate> {
    NaiveDate::parse_from_str(value, "%Y-%m-%d")
        .map_err(|e| SchedulerError::config(key, format!("日期格式错误 ({}): {}", value, e)))
}

fn set_value(config: &mut SchedulerConfig, key: &str, value: &str) -> SchedulerResult<()> {
    use config_keys::*;

    let rules = &mut config.rules;
    match key {
        SEASON_START => rules.season_start = parse_date(key, value)?,
        SEASON_END => rules.season_end = parse_date(key, value)?,
        HOLIDAYS => {
            rules.holidays = value
                .split(',')
                .map(str::trim)
                .filter(|s| !s.is_empty())
                .map(|s| parse_date(key, s))
                .collect::<SchedulerResult<Vec<_>>>()?;
        }
        MATCH_DURATION_MINUTES => rules.match_duration_minutes = parse(key, value)?,
        MAX_GAMES_PER_7_DAYS => rules.max_games_per_7_days = parse(key, value)?,
        MAX_GAMES_PER_14_DAYS => rules.max_games_per_14_days = parse(key, value)?,
        MAX_DOUBLEHEADERS => rules.max_doubleheaders = parse(key, value)?,
        DOUBLEHEADER_BREAK_MINUTES => rules.doubleheader_break_minutes = parse(key, value)?,
        REMATCH_CEILING => rules.rematch_ceiling = parse(key, value)?,
        SCHOOL_PAIR_MEETING_CAP => rules.school_pair_meeting_cap = parse(key, value)?,
        SCHOOL_PAIR_MEETING_CEILING => rules.school_pair_meeting_ceiling = parse(key, value)?,
        STRICT_REST_DAYS => rules.strict_rest_days = parse(key, value)?,
        FINAL_GAME_DEADLINE => {
            rules.final_game_deadline = if value.is_empty() {
                None
            } else {
                Some(parse_date(key, value)?)
            };
        }
        RELAXATION_MAX_ROUNDS => config.relaxation.max_rounds = parse(key, value)?,
        DESPERATE_SWEEP => config.relaxation.desperate_sweep = parse(key, value)?,
        SOLVER_ENABLED => config.solver.enabled = parse(key, value)?,
        SOLVER_MAX_TEAMS => config.solver.max_teams = parse(key, value)?,
        SOLVER_TIME_BUDGET_MS => config.solver.time_budget_ms = parse(key, value)?,
        STRATEGY => {
            config.strategy = if value.is_empty() || value.eq_ignore_ascii_case("auto") {
                None
            } else {
                Some(
                    value
                        .parse::<StrategyKind>()
                        .map_err(|e| SchedulerError::config(key, e))?,
                )
            };
        }
        CHUNK_SIZE => config.chunk_size = parse(key, value)?,
        other => {
            warn!(config_key = other, "未知配置键");
            return Err(SchedulerError::config(other, "未知配置键"));
        }
    }
    Ok(())
}

// ==========================================
// 配置键常量
// ==========================================
pub mod config_keys {
    // 赛季
    pub const SEASON_START: &str = "season_start";
    pub const SEASON_END: &str = "season_end";
    pub const HOLIDAYS: &str = "holidays"; // 逗号分隔 YYYY-MM-DD
    pub const MATCH_DURATION_MINUTES: &str = "match_duration_minutes";
    pub const FINAL_GAME_DEADLINE: &str = "final_game_deadline";

    // 频次
    pub const MAX_GAMES_PER_7_DAYS: &str = "max_games_per_7_days";
    pub const MAX_GAMES_PER_14_DAYS: &str = "max_games_per_14_days";

    // 同日双赛
    pub const MAX_DOUBLEHEADERS: &str = "max_doubleheaders";
    pub const DOUBLEHEADER_BREAK_MINUTES: &str = "doubleheader_break_minutes";

    // 重赛 / 休息
    pub const REMATCH_CEILING: &str = "rematch_ceiling";
    pub const SCHOOL_PAIR_MEETING_CAP: &str = "school_pair_meeting_cap";
    pub const SCHOOL_PAIR_MEETING_CEILING: &str = "school_pair_meeting_ceiling";
    pub const STRICT_REST_DAYS: &str = "strict_rest_days";

    // 放宽
    pub const RELAXATION_MAX_ROUNDS: &str = "relaxation_max_rounds";
    pub const DESPERATE_SWEEP: &str = "desperate_sweep";

    // 精确求解
    pub const SOLVER_ENABLED: &str = "solver_enabled";
    pub const SOLVER_MAX_TEAMS: &str = "solver_max_teams";
    pub const SOLVER_TIME_BUDGET_MS: &str = "solver_time_budget_ms";

    // 策略
    pub const STRATEGY: &str = "strategy";
    pub const CHUNK_SIZE: &str = "chunk_size";
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_partial_json_falls_back_to_defaults() {
        let mgr = ConfigManager::from_json_str(
            r#"{"rules": {"rematch_ceiling": 3}, "solver": {"enabled": false}}"#,
        )
        .unwrap();
        assert_eq!(mgr.config().rules.rematch_ceiling, 3);
        assert_eq!(mgr.config().rules.match_duration_minutes, 60);
        assert!(!mgr.config().solver.enabled);
        assert_eq!(mgr.config().relaxation.max_rounds, 20);
    }

    #[test]
    fn test_invalid_json_value_fails_fast() {
        let err = ConfigManager::from_json_str(r#"{"rules": {"match_duration_minutes": 0}}"#)
            .unwrap_err();
        assert!(matches!(err, SchedulerError::InvalidConfig { .. }));
    }

    #[test]
    fn test_overrides_apply_and_validate() {
        let mut mgr = ConfigManager::new();
        let mut overrides = HashMap::new();
        overrides.insert(config_keys::STRICT_REST_DAYS.to_string(), "1".to_string());
        overrides.insert(config_keys::HOLIDAYS.to_string(), "2026-01-20, 2026-02-17".to_string());
        overrides.insert(config_keys::STRATEGY.to_string(), "school_pair_bundle".to_string());
        assert_eq!(mgr.apply_overrides(&overrides).unwrap(), 3);
        assert_eq!(mgr.config().rules.strict_rest_days, 1);
        assert_eq!(mgr.config().rules.holidays.len(), 2);
        assert_eq!(mgr.config().strategy, Some(StrategyKind::SchoolPairBundle));
    }

    #[test]
    fn test_bad_override_leaves_config_untouched() {
        let mut mgr = ConfigManager::new();
        assert!(mgr.set_value(config_keys::MAX_GAMES_PER_7_DAYS, "lots").is_err());
        assert!(mgr.set_value("no_such_key", "1").is_err());
        assert!(mgr.set_value(config_keys::SEASON_END, "2025-01-01").is_err());
        assert_eq!(mgr.config().rules.max_games_per_7_days, 2);
    }

    #[test]
    fn test_snapshot_round_trips() {
        let mgr = ConfigManager::new();
        let snapshot = mgr.get_config_snapshot().unwrap();
        let restored = ConfigManager::from_json_str(&snapshot).unwrap();
        assert_eq!(restored.config(), mgr.config());
    }
}
