// ==========================================
// 赛季排赛引擎 - 分配策略
// ==========================================
// 用途: 同一套分配器/回填器之上的三种可互换编排方式
//   - DivisionFirst: 按组别分区单循环
//   - SchoolPairBundle: 学校对捆绑,同一 Block 连续编排
//   - DiversityChunked: 大组别按 tier/cluster 分层切块
// 红线: 所有分区共用同一个 AssignmentState (时段/学校/教练占用不重复)
// ==========================================

use crate::config::SchedulerConfig;
use crate::domain::roster::Roster;
use crate::domain::types::{GroupingMode, TeamId};
use crate::engine::catalog::MatchupCatalog;
use crate::engine::exact::{ExactOutcome, ExactSolver, SolveStatus};
use crate::engine::greedy::{GreedyAssigner, Thresholds};
use crate::engine::relaxation::{BackfillReport, RelaxationBackfiller};
use crate::engine::state::AssignmentState;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use tracing::{debug, info, instrument};

/// 分配策略类型
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StrategyKind {
    DivisionFirst,
    SchoolPairBundle,
    DiversityChunked,
}

impl StrategyKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            StrategyKind::DivisionFirst => "division_first",
            StrategyKind::SchoolPairBundle => "school_pair_bundle",
            StrategyKind::DiversityChunked => "diversity_chunked",
        }
    }

    pub fn title_cn(&self) -> &'static str {
        match self {
            StrategyKind::DivisionFirst => "组别优先",
            StrategyKind::SchoolPairBundle => "学校对捆绑",
            StrategyKind::DiversityChunked => "多样性分块",
        }
    }

    /// 调用方指定优先; 否则有组别超过分块大小时分块,其余按组别
    pub fn select(preference: Option<StrategyKind>, roster: &Roster, chunk_size: usize) -> Self {
        if let Some(kind) = preference {
            return kind;
        }
        if roster.divisions.iter().any(|d| d.teams.len() > chunk_size) {
            StrategyKind::DiversityChunked
        } else {
            StrategyKind::DivisionFirst
        }
    }

    /// 首轮候选的分组方式
    pub fn grouping_mode(&self) -> GroupingMode {
        match self {
            StrategyKind::SchoolPairBundle => GroupingMode::SchoolPairBundle,
            _ => GroupingMode::WithinDivision,
        }
    }

    pub fn build(&self) -> Box<dyn AssignmentStrategy> {
        match self {
            StrategyKind::DivisionFirst => Box::new(DivisionFirst),
            StrategyKind::SchoolPairBundle => Box::new(SchoolPairBundle),
            StrategyKind::DiversityChunked => Box::new(DiversityChunked),
        }
    }
}

impl Default for StrategyKind {
    fn default() -> Self {
        StrategyKind::DivisionFirst
    }
}

impl std::str::FromStr for StrategyKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "division_first" | "division-first" => Ok(StrategyKind::DivisionFirst),
            "school_pair_bundle" | "school-pair-bundle" => Ok(StrategyKind::SchoolPairBundle),
            "diversity_chunked" | "diversity-chunked" => Ok(StrategyKind::DiversityChunked),
            other => Err(format!("未知策略类型: {}", other)),
        }
    }
}

// ==========================================
// 策略上下文与报告
// ==========================================

pub struct StrategyContext<'a> {
    pub roster: &'a Roster,
    pub config: &'a SchedulerConfig,
    pub greedy: &'a GreedyAssigner<'a>,
    pub catalog: &'a MatchupCatalog<'a>,
    pub solver: &'a ExactSolver<'a>,
    pub backfiller: &'a RelaxationBackfiller<'a>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StrategyReport {
    pub partitions: usize,
    pub exact_solved: usize,
    pub exact_fallbacks: usize,
    /// 首轮 (精确解或严格贪心) 放置的场次
    pub first_pass_games: usize,
    pub backfill_rounds: u32,
    pub backfill_games: usize,
    pub desperate_games: usize,
}

impl StrategyReport {
    fn absorb(&mut self, backfill: &BackfillReport) {
        self.backfill_rounds = self.backfill_rounds.max(backfill.rounds_run);
        self.backfill_games += backfill.games_added;
        self.desperate_games += backfill.desperate_games;
    }
}

pub trait AssignmentStrategy {
    fn kind(&self) -> StrategyKind;

    /// 把比赛提交进共享状态
    fn assign(&self, ctx: &StrategyContext<'_>, state: &mut AssignmentState) -> StrategyReport;
}

/// 单个分区的首轮: 小分区先尝试精确求解,失败或不适用时走严格贪心
fn first_pass(
    ctx: &StrategyContext<'_>,
    scope: &[TeamId],
    state: &mut AssignmentState,
    report: &mut StrategyReport,
) {
    report.partitions += 1;
    if ctx.solver.applies_to(scope) {
        match ctx.solver.run(scope, state) {
            ExactOutcome::Solved { games, .. } => {
                report.exact_solved += 1;
                report.first_pass_games += games.len();
                return;
            }
            ExactOutcome::Fallback(stats) => {
                report.exact_fallbacks += 1;
                debug!(
                    timed_out = stats.status == SolveStatus::TimedOut,
                    "分区回退到贪心"
                );
            }
        }
    }
    let candidates = ctx.catalog.candidates(GroupingMode::WithinDivision, scope);
    let assigned = ctx
        .greedy
        .assign(&candidates, &Thresholds::strict(&ctx.config.rules), state);
    report.first_pass_games += assigned.games.len();
}

// ==========================================
// DivisionFirst - 按组别分区
// ==========================================
pub struct DivisionFirst;

impl AssignmentStrategy for DivisionFirst {
    fn kind(&self) -> StrategyKind {
        StrategyKind::DivisionFirst
    }

    #[instrument(skip_all, fields(divisions = ctx.roster.divisions.len()))]
    fn assign(&self, ctx: &StrategyContext<'_>, state: &mut AssignmentState) -> StrategyReport {
        let mut report = StrategyReport::default();
        for division in &ctx.roster.divisions {
            if division.teams.len() < 2 {
                continue;
            }
            first_pass(ctx, &division.teams, state, &mut report);
            let backfill = ctx.backfiller.backfill(&division.teams, &[], state);
            report.absorb(&backfill);
            debug!(division = %division.name, games = state.total_games(), "组别编排完成");
        }
        info!(
            partitions = report.partitions,
            exact = report.exact_solved,
            games = state.total_games(),
            "组别优先策略完成"
        );
        report
    }
}

// ==========================================
// SchoolPairBundle - 学校对捆绑
// ==========================================
pub struct SchoolPairBundle;

impl AssignmentStrategy for SchoolPairBundle {
    fn kind(&self) -> StrategyKind {
        StrategyKind::SchoolPairBundle
    }

    #[instrument(skip_all, fields(schools = ctx.roster.schools.len()))]
    fn assign(&self, ctx: &StrategyContext<'_>, state: &mut AssignmentState) -> StrategyReport {
        let mut report = StrategyReport {
            partitions: 1,
            ..StrategyReport::default()
        };
        let scope: Vec<TeamId> = ctx.roster.teams.iter().map(|t| t.id).collect();
        let bundles = ctx.catalog.candidates(GroupingMode::SchoolPairBundle, &scope);
        let assigned = ctx
            .greedy
            .assign(&bundles, &Thresholds::strict(&ctx.config.rules), state);
        report.first_pass_games = assigned.games.len();
        info!(
            bundles = bundles.len(),
            placed = assigned.placed_candidates,
            games = assigned.games.len(),
            "学校对捆绑首轮完成"
        );

        // 回填时捆绑继续参与 (受学校对见面上限约束),单场按组别内配对
        let backfill = ctx.backfiller.backfill(&scope, &bundles, state);
        report.absorb(&backfill);
        report
    }
}

// ==========================================
// DiversityChunked - 多样性分块
// ==========================================
pub struct DiversityChunked;

impl AssignmentStrategy for DiversityChunked {
    fn kind(&self) -> StrategyKind {
        StrategyKind::DiversityChunked
    }

    #[instrument(skip_all, fields(chunk_size = ctx.config.chunk_size))]
    fn assign(&self, ctx: &StrategyContext<'_>, state: &mut AssignmentState) -> StrategyReport {
        let mut report = StrategyReport::default();
        for division in &ctx.roster.divisions {
            if division.teams.len() < 2 {
                continue;
            }
            let chunks = stratified_chunks(ctx.roster, &division.teams, ctx.config.chunk_size);
            debug!(division = %division.name, chunks = chunks.len(), "组别已分块");
            for chunk in &chunks {
                if chunk.len() >= 2 {
                    first_pass(ctx, chunk, state, &mut report);
                }
            }
            // 跨块补赛在整个组别范围内进行
            let backfill = ctx.backfiller.backfill(&division.teams, &[], state);
            report.absorb(&backfill);
        }
        info!(
            partitions = report.partitions,
            games = state.total_games(),
            "多样性分块策略完成"
        );
        report
    }
}

/// 按 (tier, cluster) 分桶后轮流抽取,再依次发到各块,使每块都混合不同层级
///
/// 块数 = ceil(球队数 / chunk_size),因此每块不超过 chunk_size
pub fn stratified_chunks(roster: &Roster, teams: &[TeamId], chunk_size: usize) -> Vec<Vec<TeamId>> {
    if teams.is_empty() {
        return Vec::new();
    }
    let chunk_size = chunk_size.max(1);
    let mut buckets: BTreeMap<(Option<u8>, Option<String>), Vec<TeamId>> = BTreeMap::new();
    for &t in teams {
        let team = roster.team(t);
        buckets
            .entry((team.tier, team.cluster.clone()))
            .or_default()
            .push(t);
    }

    let mut ordered = Vec::with_capacity(teams.len());
    let mut cursor = 0;
    while ordered.len() < teams.len() {
        for bucket in buckets.values() {
            if let Some(t) = bucket.get(cursor) {
                ordered.push(*t);
            }
        }
        cursor += 1;
    }

    let count = teams.len().div_ceil(chunk_size);
    let mut chunks = vec![Vec::new(); count];
    for (i, t) in ordered.into_iter().enumerate() {
        chunks[i % count].push(t);
    }
    chunks
}
