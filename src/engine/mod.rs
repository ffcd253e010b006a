// ==========================================
// 赛季排赛引擎 - 引擎层
// ==========================================
// 职责: 时段生成、对阵生成、评分、分配、回填、精确求解、校验
// 红线: 除 AssignmentState 外引擎均无状态
// 红线: 候选不可行是正常分支结果,不是错误
// ==========================================

pub mod calendar;
pub mod catalog;
pub mod exact;
pub mod greedy;
pub mod home_away;
pub mod orchestrator;
pub mod relaxation;
pub mod scoring;
pub mod state;
pub mod strategy;
pub mod validator;

// 重导出核心引擎
pub use calendar::{Blocks, ResourceCalendar};
pub use catalog::{MatchupCandidate, MatchupCatalog, Pairing};
pub use exact::{ExactOutcome, ExactSolver, SolveStats, SolveStatus};
pub use greedy::{AssignReport, GreedyAssigner, RejectReason, RestRule, Thresholds};
pub use home_away::{FacilityOwnerHomeAway, HomeAwayPolicy, OwnershipOnlyHomeAway};
pub use orchestrator::{PhaseStats, ScheduleOrchestrator, ScheduleOutcome};
pub use relaxation::{BackfillReport, RelaxationBackfiller, ShortfallReport, TeamShortfall};
pub use scoring::ScoringModel;
pub use state::{AssignmentState, CourtNight};
pub use strategy::{
    stratified_chunks, AssignmentStrategy, DiversityChunked, DivisionFirst, SchoolPairBundle,
    StrategyContext, StrategyKind, StrategyReport,
};
pub use validator::ScheduleValidator;
