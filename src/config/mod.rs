// ==========================================
// 赛季排赛引擎 - 配置层
// ==========================================
// 职责: 规则对象、评分权重、配置加载与覆写
// ==========================================

pub mod config_manager;
pub mod rules;
pub mod scoring_profile;

// 重导出核心配置
pub use config_manager::{config_keys, ConfigManager};
pub use rules::{
    CountRestTier, OpenWindow, RelaxationSchedule, RoundRestTier, SchedulerConfig, SeasonRules,
    SolverSettings, WeeklyWindows,
};
pub use scoring_profile::{ScoringWeightOverrides, ScoringWeights};
