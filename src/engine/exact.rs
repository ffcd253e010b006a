// ==========================================
// 赛季排赛引擎 - 精确求解器 (ExactSolver)
// ==========================================
// 适用: 球队数不超过阈值的小分区
// 模型: 每个 (对阵, 时段) 一个布尔变量
//   - 每队场次之和 == 目标场次
//   - 每个球队对场次之和 <= 重赛上限 (扣除已有场次)
//   - 每个时段至多一场; 球队/学校/教练同时段至多一场
//   - 7/14 天频次、最少休息天数、学校当日单场馆
// 目标: 最大化 对阵分 + 时段偏好分
// 搜索: 深度优先分支定界 (MRV 选队 + 前向检查 + 乐观上界)
// 时限: 每 N 个节点检查一次墙钟,超时返回当前最优解或回退信号
// ==========================================

use crate::config::SchedulerConfig;
use crate::domain::slot::TimeSlot;
use crate::domain::types::TeamId;
use crate::engine::catalog::{MatchupCatalog, Pairing};
use crate::engine::greedy::{GreedyAssigner, Thresholds};
use crate::engine::state::{AssignmentState, CourtNight};
use serde::{Deserialize, Serialize};
use std::time::{Duration, Instant};
use tracing::{debug, info, instrument, warn};

// ==========================================
// SolveStatus - 求解状态
// ==========================================
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SolveStatus {
    /// 搜索完成,解为最优
    Optimal,
    /// 超时,但已有可行解
    Feasible,
    /// 搜索完成,无可行解
    Infeasible,
    /// 超时且无可行解
    TimedOut,
}

impl SolveStatus {
    pub fn has_solution(&self) -> bool {
        matches!(self, SolveStatus::Optimal | SolveStatus::Feasible)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SolveStats {
    pub status: SolveStatus,
    pub variables: usize,
    pub nodes: u64,
    pub objective: Option<i64>,
    pub elapsed_ms: u64,
}

/// 求解流水线的结果: 成功则已提交,否则由调用方回退到贪心
#[derive(Debug, Clone)]
pub enum ExactOutcome {
    Solved { games: Vec<u32>, stats: SolveStats },
    Fallback(SolveStats),
}

/// 布尔变量: 对阵落在某时段
#[derive(Debug, Clone, Copy)]
struct Variable {
    pairing: Pairing,
    slot: TimeSlot,
    weight: i64,
}

struct SearchCtx {
    vars: Vec<Variable>,
    excluded: Vec<bool>,
    chosen: Vec<usize>,
    objective: i64,
    best: Option<(i64, Vec<usize>)>,
    nodes: u64,
    started: Instant,
    budget: Duration,
    interval: u64,
    timed_out: bool,
}

impl SearchCtx {
    fn out_of_time(&mut self) -> bool {
        if self.timed_out {
            return true;
        }
        self.nodes += 1;
        if self.nodes % self.interval == 0 && self.started.elapsed() >= self.budget {
            self.timed_out = true;
        }
        self.timed_out
    }
}

// ==========================================
// ExactSolver
// ==========================================
pub struct ExactSolver<'a> {
    greedy: &'a GreedyAssigner<'a>,
    catalog: &'a MatchupCatalog<'a>,
    config: &'a SchedulerConfig,
}

impl<'a> ExactSolver<'a> {
    pub fn new(
        greedy: &'a GreedyAssigner<'a>,
        catalog: &'a MatchupCatalog<'a>,
        config: &'a SchedulerConfig,
    ) -> Self {
        Self {
            greedy,
            catalog,
            config,
        }
    }

    /// 分区是否走精确求解
    pub fn applies_to(&self, scope: &[TeamId]) -> bool {
        let s = &self.config.solver;
        s.enabled && !scope.is_empty() && scope.len() <= s.max_teams
    }

    /// 精确求解约束: 严格休息/频次,球队对上限放到重赛硬上限
    fn thresholds(&self) -> Thresholds {
        let rules = &self.config.rules;
        Thresholds {
            pair_game_limit: rules.rematch_ceiling,
            ..Thresholds::strict(rules)
        }
    }

    /// 两步流水线的第一步: 求解并在成功时提交
    #[instrument(skip_all, fields(teams = scope.len()))]
    pub fn run(&self, scope: &[TeamId], state: &mut AssignmentState) -> ExactOutcome {
        let (stats, assignment) = self.solve(scope, state);
        if !stats.status.has_solution() {
            warn!(
                status = ?stats.status,
                nodes = stats.nodes,
                elapsed_ms = stats.elapsed_ms,
                "精确求解未得到可行解,回退到贪心"
            );
            return ExactOutcome::Fallback(stats);
        }
        let games = self.materialize(&assignment, state);
        info!(
            status = ?stats.status,
            games = games.len(),
            objective = stats.objective,
            nodes = stats.nodes,
            "精确求解完成"
        );
        ExactOutcome::Solved { games, stats }
    }

    /// 只求解,不修改状态
    ///
    /// # 返回
    /// (统计, 选中的 (对阵, 时段) 按选择顺序)
    pub fn solve(
        &self,
        scope: &[TeamId],
        state: &AssignmentState,
    ) -> (SolveStats, Vec<(Pairing, TimeSlot)>) {
        let started = Instant::now();
        let thresholds = self.thresholds();
        let vars = self.build_variables(scope, &thresholds, state);
        let settings = &self.config.solver;
        let mut ctx = SearchCtx {
            excluded: vec![false; vars.len()],
            vars,
            chosen: Vec::new(),
            objective: 0,
            best: None,
            nodes: 0,
            started,
            budget: Duration::from_millis(settings.time_budget_ms),
            interval: settings.clock_check_interval.max(1),
            timed_out: false,
        };
        debug!(variables = ctx.vars.len(), "精确求解变量已生成");

        self.search(&mut ctx, scope, &thresholds, state);

        let status = match (&ctx.best, ctx.timed_out) {
            (Some(_), false) => SolveStatus::Optimal,
            (Some(_), true) => SolveStatus::Feasible,
            (None, false) => SolveStatus::Infeasible,
            (None, true) => SolveStatus::TimedOut,
        };
        let assignment = ctx
            .best
            .as_ref()
            .map(|(_, picks)| {
                picks
                    .iter()
                    .map(|i| (ctx.vars[*i].pairing, ctx.vars[*i].slot))
                    .collect()
            })
            .unwrap_or_default();
        let stats = SolveStats {
            status,
            variables: ctx.vars.len(),
            nodes: ctx.nodes,
            objective: ctx.best.as_ref().map(|(obj, _)| *obj),
            elapsed_ms: started.elapsed().as_millis() as u64,
        };
        (stats, assignment)
    }

    /// 按求解顺序提交 (与贪心提交路径一致)
    pub fn materialize(
        &self,
        assignment: &[(Pairing, TimeSlot)],
        state: &mut AssignmentState,
    ) -> Vec<u32> {
        let roster = self.greedy.roster();
        let thresholds = self.thresholds();
        let mut ids = Vec::with_capacity(assignment.len());
        for (p, slot) in assignment {
            if let Err(reason) = self.greedy.check(p, slot, CourtNight::Mixed, &thresholds, state) {
                warn!(reason = %reason, slot = %slot, "精确解提交前复检未通过,跳过该场");
                continue;
            }
            let (home, away) = self.greedy.resolve_home_away(p, slot, state);
            ids.push(state.commit(roster, home, away, p.division, *slot, CourtNight::Mixed));
        }
        ids
    }

    // ==========================================
    // 变量生成
    // ==========================================

    /// 每个对阵保留权重最高的若干时段,总量受 max_variables 限制
    fn build_variables(
        &self,
        scope: &[TeamId],
        thresholds: &Thresholds,
        state: &AssignmentState,
    ) -> Vec<Variable> {
        let scoring = self.greedy.scoring();
        let pairings: Vec<Pairing> = self.catalog.pairings(scope).collect();
        if pairings.is_empty() {
            return Vec::new();
        }
        let per_pair = (self.config.solver.max_variables / pairings.len()).max(1);

        let mut vars = Vec::new();
        for p in &pairings {
            let mut options: Vec<Variable> = self
                .greedy
                .blocks()
                .iter()
                .filter_map(|b| b.first())
                .filter(|slot| {
                    self.greedy
                        .check(p, slot, CourtNight::Mixed, thresholds, state)
                        .is_ok()
                })
                .map(|slot| Variable {
                    pairing: *p,
                    slot: *slot,
                    weight: p.score + scoring.slot_score(p.a, p.b, slot, state),
                })
                .collect();
            options.sort_by(|x, y| y.weight.cmp(&x.weight));
            options.truncate(per_pair);
            vars.extend(options);
        }
        // 权重降序,同分保持生成顺序
        vars.sort_by(|x, y| y.weight.cmp(&x.weight));
        vars
    }

    // ==========================================
    // 分支定界
    // ==========================================

    fn search(
        &self,
        ctx: &mut SearchCtx,
        scope: &[TeamId],
        thresholds: &Thresholds,
        state: &AssignmentState,
    ) {
        if ctx.out_of_time() {
            return;
        }
        let roster = self.greedy.roster();
        let needy: Vec<(TeamId, u32)> = scope
            .iter()
            .map(|t| (*t, roster.team(*t).target_games.saturating_sub(state.count(*t))))
            .filter(|(_, need)| *need > 0)
            .collect();

        if needy.is_empty() {
            let better = ctx.best.as_ref().map_or(true, |(obj, _)| ctx.objective > *obj);
            if better {
                debug!(objective = ctx.objective, nodes = ctx.nodes, "找到更优解");
                ctx.best = Some((ctx.objective, ctx.chosen.clone()));
            }
            return;
        }

        // 当前状态下仍可行的变量 (已按权重降序)
        let live: Vec<usize> = (0..ctx.vars.len())
            .filter(|i| !ctx.excluded[*i])
            .filter(|i| {
                let v = &ctx.vars[*i];
                self.greedy
                    .check(&v.pairing, &v.slot, CourtNight::Mixed, thresholds, state)
                    .is_ok()
            })
            .collect();

        // 前向检查 + MRV 选队 + 乐观上界
        let mut pick: Option<(u32, u32, Vec<usize>)> = None;
        let mut bound_sum = 0i64;
        for (team, need) in needy {
            let opts: Vec<usize> = live
                .iter()
                .copied()
                .filter(|i| ctx.vars[*i].pairing.a == team || ctx.vars[*i].pairing.b == team)
                .collect();
            if (opts.len() as u32) < need {
                return;
            }
            bound_sum += opts
                .iter()
                .take(need as usize)
                .map(|i| ctx.vars[*i].weight)
                .sum::<i64>();
            let slack = opts.len() as u32 - need;
            if pick.as_ref().map_or(true, |(s, _, _)| slack < *s) {
                pick = Some((slack, need, opts));
            }
        }
        // 每个变量被两支球队各计一次
        let optimistic = ctx.objective + bound_sum.div_euclid(2);
        if let Some((best, _)) = &ctx.best {
            if optimistic <= *best {
                return;
            }
        }

        let Some((_, need, opts)) = pick else {
            return;
        };
        let mut marked = Vec::new();
        for (i, &v) in opts.iter().enumerate() {
            if ((opts.len() - i) as u32) < need || ctx.timed_out {
                break;
            }
            let var = ctx.vars[v];
            let mut next = state.clone();
            next.commit(
                roster,
                var.pairing.a,
                var.pairing.b,
                var.pairing.division,
                var.slot,
                CourtNight::Mixed,
            );
            ctx.chosen.push(v);
            ctx.objective += var.weight;
            self.search(ctx, scope, thresholds, &next);
            ctx.chosen.pop();
            ctx.objective -= var.weight;

            // 之后的分支不再使用该变量
            ctx.excluded[v] = true;
            marked.push(v);
        }
        for v in marked {
            ctx.excluded[v] = false;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::roster::{DivisionRecord, FacilityRecord, Roster, SchoolRecord, TeamRecord};
    use crate::engine::calendar::ResourceCalendar;
    use crate::engine::home_away::FacilityOwnerHomeAway;
    use crate::engine::scoring::ScoringModel;
    use chrono::NaiveDate;

    fn d(day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2026, 1, day).unwrap()
    }

    fn create_test_roster(teams: &[(&str, &str)], target: u32, dates: &[NaiveDate]) -> Roster {
        let mut schools: Vec<&str> = teams.iter().map(|(_, s)| *s).collect();
        schools.dedup();
        Roster::build(
            schools
                .iter()
                .map(|n| SchoolRecord {
                    name: n.to_string(),
                    cluster: None,
                    tier: None,
                    blackout_dates: vec![],
                })
                .collect(),
            vec![DivisionRecord {
                name: "JV".to_string(),
                required_capability: None,
                priority_facilities: vec![],
                grouped: false,
            }],
            vec![FacilityRecord {
                name: "Gym".to_string(),
                available_dates: dates.to_vec(),
                unavailable_dates: vec![],
                courts: 1,
                capabilities: vec![],
                owner_school: None,
            }],
            teams
                .iter()
                .map(|(id, s)| TeamRecord {
                    id: id.to_string(),
                    school: s.to_string(),
                    division: Some("JV".to_string()),
                    coach: None,
                    tier: None,
                    cluster: None,
                    rivals: vec![],
                    do_not_play: vec![],
                    target_games: target,
                })
                .collect(),
        )
        .unwrap()
    }

    fn create_test_config(end_day: u32) -> SchedulerConfig {
        let mut cfg = SchedulerConfig::default();
        cfg.rules.season_start = d(5);
        cfg.rules.season_end = d(end_day);
        cfg.rules.holidays = vec![];
        cfg.solver.time_budget_ms = 5_000;
        cfg
    }

    fn run_solver(roster: &Roster, cfg: &SchedulerConfig) -> (SolveStats, AssignmentState, Vec<u32>) {
        let calendar = ResourceCalendar::new(&cfg.rules, &roster.facilities);
        let scoring = ScoringModel::new(&cfg.weights, &cfg.rules, roster);
        let policy = FacilityOwnerHomeAway;
        let greedy = GreedyAssigner::new(roster, cfg, &calendar, &scoring, &policy);
        let catalog = MatchupCatalog::new(roster, &scoring);
        let solver = ExactSolver::new(&greedy, &catalog, cfg);
        let scope: Vec<TeamId> = roster.teams.iter().map(|t| t.id).collect();
        let mut state = AssignmentState::new(roster);
        match solver.run(&scope, &mut state) {
            ExactOutcome::Solved { games, stats } => (stats, state, games),
            ExactOutcome::Fallback(stats) => (stats, state, vec![]),
        }
    }

    #[test]
    fn test_small_partition_solves_to_target() {
        // 周一/周四各两次,满足 2 天休息
        let roster = create_test_roster(
            &[("A1", "A"), ("A2", "A"), ("B1", "B"), ("B2", "B")],
            2,
            &[d(5), d(8), d(12), d(15)],
        );
        let cfg = create_test_config(16);
        let (stats, state, games) = run_solver(&roster, &cfg);

        assert_eq!(stats.status, SolveStatus::Optimal);
        assert_eq!(games.len(), 4);
        for t in &roster.teams {
            assert_eq!(state.count(t.id), 2);
        }
        for g in state.games() {
            let (h, a) = (roster.team(g.home), roster.team(g.away));
            assert!(!h.shares_school_with(a));
        }
    }

    #[test]
    fn test_infeasible_partition_signals_fallback() {
        // 两支球队最多相遇 2 次,目标 3 场无解
        let roster = create_test_roster(&[("A1", "A"), ("B1", "B")], 3, &[]);
        let cfg = create_test_config(9);
        let (stats, state, games) = run_solver(&roster, &cfg);

        assert_eq!(stats.status, SolveStatus::Infeasible);
        assert!(games.is_empty());
        assert_eq!(state.total_games(), 0);
    }

    #[test]
    fn test_zero_budget_times_out_without_touching_state() {
        let roster = create_test_roster(&[("A1", "A"), ("A2", "A"), ("B1", "B"), ("B2", "B")], 2, &[]);
        let mut cfg = create_test_config(16);
        cfg.solver.time_budget_ms = 0;
        cfg.solver.clock_check_interval = 1;
        let (stats, state, _) = run_solver(&roster, &cfg);

        assert_eq!(stats.status, SolveStatus::TimedOut);
        assert_eq!(state.total_games(), 0);
    }

    #[test]
    fn test_applies_only_to_small_enabled_partitions() {
        let roster = create_test_roster(&[("A1", "A"), ("B1", "B"), ("C1", "C")], 2, &[]);
        let mut cfg = create_test_config(16);
        cfg.solver.max_teams = 2;
        let calendar = ResourceCalendar::new(&cfg.rules, &roster.facilities);
        let scoring = ScoringModel::new(&cfg.weights, &cfg.rules, &roster);
        let policy = FacilityOwnerHomeAway;
        let greedy = GreedyAssigner::new(&roster, &cfg, &calendar, &scoring, &policy);
        let catalog = MatchupCatalog::new(&roster, &scoring);
        let solver = ExactSolver::new(&greedy, &catalog, &cfg);

        let all: Vec<TeamId> = roster.teams.iter().map(|t| t.id).collect();
        assert!(!solver.applies_to(&all));
        assert!(solver.applies_to(&all[..2]));
        assert!(!solver.applies_to(&[]));
    }
}
