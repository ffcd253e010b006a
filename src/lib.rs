// ==========================================
// 赛季排赛引擎 - 核心库
// ==========================================
// 范围: 时段生成 + 对阵生成 + 分配 (贪心/放宽回填/精确求解) + 赛程校验
// 外部协作方: 数据导入导出、传输层、任务队列、命令行
// ==========================================

// ==========================================
// 模块声明
// ==========================================

// 领域层 - 实体与类型
pub mod domain;

// 引擎层 - 排赛规则
pub mod engine;

// 配置层 - 赛季规则与权重
pub mod config;

// 错误类型
pub mod error;

// 日志系统
pub mod logging;

// ==========================================
// 重导出核心类型
// ==========================================

// 领域类型
pub use domain::types::{CoachId, DivisionId, FacilityId, GroupingMode, SchoolId, Severity, TeamId};

// 领域实体
pub use domain::{
    DivisionRecord, FacilityRecord, Game, Roster, Schedule, SchoolRecord, TeamRecord, TimeSlot,
    ValidationResult, Violation, ViolationKind,
};

// 配置
pub use config::{ConfigManager, SchedulerConfig, ScoringWeights, SeasonRules};

// 引擎
pub use engine::{
    ScheduleOrchestrator, ScheduleOutcome, ScheduleValidator, ShortfallReport, StrategyKind,
};

// 错误
pub use error::{SchedulerError, SchedulerResult};

// ==========================================
// 常量定义
// ==========================================

// 系统版本
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

// 系统名称
pub const APP_NAME: &str = "赛季排赛引擎";
