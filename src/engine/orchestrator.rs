// ==========================================
// 赛季排赛引擎 - 引擎编排器
// ==========================================
// 用途: 协调一次完整赛季编排的执行顺序
// 流程:
//   1. 配置与名册结构校验 (快速失败)
//   2. 构建时段日历 / 评分模型 / 对阵目录 / 共享状态
//   3. 按策略执行首轮分配 + 放宽回填
//   4. 汇总赛程 (按日期、开始时刻、场馆、场地排序)
//   5. 缺赛报告 + 独立校验
// ==========================================

use crate::config::SchedulerConfig;
use crate::domain::game::Schedule;
use crate::domain::roster::Roster;
use crate::domain::validation::ValidationResult;
use crate::engine::calendar::ResourceCalendar;
use crate::engine::catalog::MatchupCatalog;
use crate::engine::exact::ExactSolver;
use crate::engine::greedy::GreedyAssigner;
use crate::engine::home_away::{FacilityOwnerHomeAway, HomeAwayPolicy};
use crate::engine::relaxation::{RelaxationBackfiller, ShortfallReport};
use crate::engine::scoring::ScoringModel;
use crate::engine::state::AssignmentState;
use crate::engine::strategy::{StrategyContext, StrategyKind, StrategyReport};
use crate::engine::validator::ScheduleValidator;
use crate::error::SchedulerResult;
use serde::{Deserialize, Serialize};
use std::time::Instant;
use tracing::{debug, info, instrument, warn};
use uuid::Uuid;

// ==========================================
// PhaseStats - 阶段统计
// ==========================================
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PhaseStats {
    pub strategy: Option<StrategyKind>,
    pub teams: usize,
    pub blocks: usize,
    pub strategy_report: StrategyReport,
    pub total_games: usize,
    pub elapsed_ms: u64,
}

// ==========================================
// ScheduleOutcome - 编排结果
// ==========================================
#[derive(Debug, Clone)]
pub struct ScheduleOutcome {
    pub run_id: Uuid,
    pub schedule: Schedule,
    pub shortfalls: ShortfallReport,
    pub validation: ValidationResult,
    pub stats: PhaseStats,
}

impl ScheduleOutcome {
    /// 全部球队达标且无硬约束违规
    pub fn is_complete(&self) -> bool {
        self.shortfalls.is_empty() && self.validation.is_valid
    }
}

// ==========================================
// ScheduleOrchestrator - 引擎编排器
// ==========================================
pub struct ScheduleOrchestrator {
    config: SchedulerConfig,
    policy: Box<dyn HomeAwayPolicy>,
}

impl ScheduleOrchestrator {
    /// 创建编排器 (默认主客场策略: 场馆所属学校为主)
    pub fn new(config: SchedulerConfig) -> Self {
        Self {
            config,
            policy: Box::new(FacilityOwnerHomeAway),
        }
    }

    /// 替换主客场策略
    pub fn with_policy(mut self, policy: Box<dyn HomeAwayPolicy>) -> Self {
        self.policy = policy;
        self
    }

    pub fn config(&self) -> &SchedulerConfig {
        &self.config
    }

    /// 执行一次完整的赛季编排
    ///
    /// # 返回
    /// - Ok: 赛程 (可能有缺赛,以报告形式给出)
    /// - Err: 配置或名册不合法
    #[instrument(skip_all, fields(teams = roster.len()))]
    pub fn run(&self, roster: &Roster) -> SchedulerResult<ScheduleOutcome> {
        let started = Instant::now();
        let run_id = Uuid::new_v4();
        self.config.validate()?;
        roster.validate()?;

        let config = &self.config;
        let kind = StrategyKind::select(config.strategy, roster, config.chunk_size);
        info!(
            run_id = %run_id,
            strategy = kind.as_str(),
            policy = self.policy.name(),
            teams = roster.len(),
            facilities = roster.facilities.len(),
            "开始赛季编排"
        );

        // ==========================================
        // 步骤1: 构建引擎
        // ==========================================
        let calendar = ResourceCalendar::new(&config.rules, &roster.facilities);
        let scoring = ScoringModel::new(&config.weights, &config.rules, roster);
        let catalog = MatchupCatalog::new(roster, &scoring);
        let greedy = GreedyAssigner::new(roster, config, &calendar, &scoring, self.policy.as_ref());
        let solver = ExactSolver::new(&greedy, &catalog, config);
        let backfiller = RelaxationBackfiller::new(&greedy, &catalog, config);
        let blocks = greedy.blocks().len();
        if blocks == 0 {
            warn!("没有可用时段,赛程将为空");
        }

        // ==========================================
        // 步骤2: 策略执行
        // ==========================================
        let ctx = StrategyContext {
            roster,
            config,
            greedy: &greedy,
            catalog: &catalog,
            solver: &solver,
            backfiller: &backfiller,
        };
        let mut state = AssignmentState::new(roster);
        let strategy_report = kind.build().assign(&ctx, &mut state);
        debug!(games = state.total_games(), "策略执行完成");

        // ==========================================
        // 步骤3: 汇总与校验
        // ==========================================
        let shortfalls = ShortfallReport::compute(roster, &state);
        let schedule = Schedule::from_games(
            config.rules.season_start,
            config.rules.season_end,
            state.into_games(),
        );
        let validation = ScheduleValidator::new(config, roster).validate(&schedule);

        if !shortfalls.is_empty() {
            warn!(
                teams = shortfalls.teams.len(),
                missing = shortfalls.total_missing,
                "部分球队未达到目标场次"
            );
        }

        let stats = PhaseStats {
            strategy: Some(kind),
            teams: roster.len(),
            blocks,
            strategy_report,
            total_games: schedule.len(),
            elapsed_ms: started.elapsed().as_millis() as u64,
        };
        info!(
            run_id = %run_id,
            games = stats.total_games,
            valid = validation.is_valid,
            penalty = validation.total_penalty,
            elapsed_ms = stats.elapsed_ms,
            "赛季编排完成"
        );

        Ok(ScheduleOutcome {
            run_id,
            schedule,
            shortfalls,
            validation,
            stats,
        })
    }
}
