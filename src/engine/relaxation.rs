// ==========================================
// 赛季排赛引擎 - 渐进放宽回填 (RelaxationBackfiller)
// ==========================================
// 职责: 仍有球队低于目标场次时,按轮次逐步放宽约束补排
//   - 球队对场次上限: 每轮 +rematch_step,封顶 rematch_ceiling
//   - 学校对见面上限: 每轮 +1,封顶 school_pair_meeting_ceiling
//   - 最少休息天数: 按轮次档位/已赛场次档位收缩
//   - 部分捆绑放置、同场地同晚混排
// 终止: 达到最大轮次; 或某轮零提交且后续轮次不再更宽松
// 兜底: 可选的最后扫描,只保留不可违反的硬约束
// 红线: 剩余缺口以 ShortfallReport 上报,不无限重试
// ==========================================

use crate::config::SchedulerConfig;
use crate::domain::roster::Roster;
use crate::domain::types::TeamId;
use crate::engine::catalog::{MatchupCandidate, MatchupCatalog};
use crate::engine::greedy::{GreedyAssigner, Thresholds};
use crate::engine::state::AssignmentState;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, instrument, warn};

// ==========================================
// ShortfallReport - 缺赛报告
// ==========================================
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TeamShortfall {
    pub team: TeamId,
    pub name: String,
    pub scheduled: u32,
    pub target: u32,
    pub missing: u32,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ShortfallReport {
    pub teams: Vec<TeamShortfall>,
    pub total_missing: u32,
}

impl ShortfallReport {
    /// 统计全部低于目标场次的球队
    pub fn compute(roster: &Roster, state: &AssignmentState) -> Self {
        let teams: Vec<TeamShortfall> = roster
            .teams
            .iter()
            .filter(|t| state.count(t.id) < t.target_games)
            .map(|t| TeamShortfall {
                team: t.id,
                name: t.name.clone(),
                scheduled: state.count(t.id),
                target: t.target_games,
                missing: t.target_games - state.count(t.id),
            })
            .collect();
        let total_missing = teams.iter().map(|s| s.missing).sum();
        Self {
            teams,
            total_missing,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.teams.is_empty()
    }
}

// ==========================================
// BackfillReport - 回填汇总
// ==========================================
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BackfillReport {
    /// 实际执行的轮次数 (<= max_rounds)
    pub rounds_run: u32,
    /// 最后执行的轮次号
    pub last_round: u32,
    pub games_added: usize,
    pub desperate_games: usize,
    /// 因零提交提前结束
    pub stopped_early: bool,
}

// ==========================================
// RelaxationBackfiller
// ==========================================
pub struct RelaxationBackfiller<'a> {
    greedy: &'a GreedyAssigner<'a>,
    catalog: &'a MatchupCatalog<'a>,
    config: &'a SchedulerConfig,
}

impl<'a> RelaxationBackfiller<'a> {
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

    /// 对 scope 内的球队执行回填
    ///
    /// # 参数
    /// - `scope`: 分区内的球队 (对手也只在其中选择)
    /// - `bundles`: 首轮未放置完的捆绑候选,每轮优先重试
    #[instrument(skip_all, fields(teams = scope.len(), bundles = bundles.len()))]
    pub fn backfill(
        &self,
        scope: &[TeamId],
        bundles: &[MatchupCandidate],
        state: &mut AssignmentState,
    ) -> BackfillReport {
        let rules = &self.config.rules;
        let relax = &self.config.relaxation;
        let mut report = BackfillReport::default();

        let mut round = 1;
        while round <= relax.max_rounds {
            let deficits = self.deficit_teams(scope, state);
            if deficits.is_empty() {
                break;
            }
            let thresholds = Thresholds::relaxed(round, rules, relax);
            report.rounds_run += 1;
            report.last_round = round;

            let mut added = 0;
            for bundle in bundles {
                if !self.bundle_has_need(bundle, state) {
                    continue;
                }
                if let Ok(ids) = self.greedy.place(bundle, &thresholds, state) {
                    added += ids.len();
                }
            }
            added += self.fill_singles(&deficits, scope, &thresholds, state);
            report.games_added += added;

            debug!(
                round,
                added,
                deficit_teams = deficits.len(),
                "放宽轮次完成"
            );

            if added == 0 {
                // 跳到下一个阈值有变化的轮次; 已最宽松则停止
                let next = (round + 1..=relax.max_rounds)
                    .find(|r| !Thresholds::relaxed(*r, rules, relax).same_limits(&thresholds));
                match next {
                    Some(r) => {
                        round = r;
                        continue;
                    }
                    None => {
                        report.stopped_early = round < relax.max_rounds;
                        break;
                    }
                }
            }
            round += 1;
        }

        if relax.desperate_sweep {
            let deficits = self.deficit_teams(scope, state);
            if !deficits.is_empty() {
                let thresholds = Thresholds::desperate(rules, relax);
                report.desperate_games = self.fill_singles(&deficits, scope, &thresholds, state);
                report.games_added += report.desperate_games;
                if report.desperate_games > 0 {
                    warn!(
                        games = report.desperate_games,
                        "兜底扫描放置了比赛 (频次/休息/双赛规则已放开)"
                    );
                }
            }
        }

        let remaining = self.deficit_teams(scope, state);
        if remaining.is_empty() {
            info!(
                rounds = report.rounds_run,
                games = report.games_added,
                "回填完成,全部球队达到目标场次"
            );
        } else {
            let missing: u32 = remaining
                .iter()
                .map(|t| self.greedy.roster().team(*t).target_games - state.count(*t))
                .sum();
            warn!(
                rounds = report.rounds_run,
                games = report.games_added,
                teams = remaining.len(),
                missing,
                "回填结束,仍有球队缺赛"
            );
        }
        report
    }

    /// 低于目标场次的球队,按 (已赛场次, id) 升序
    fn deficit_teams(&self, scope: &[TeamId], state: &AssignmentState) -> Vec<TeamId> {
        let roster = self.greedy.roster();
        let mut out: Vec<TeamId> = scope
            .iter()
            .copied()
            .filter(|t| state.count(*t) < roster.team(*t).target_games)
            .collect();
        out.sort_by_key(|t| (state.count(*t), *t));
        out
    }

    fn bundle_has_need(&self, bundle: &MatchupCandidate, state: &AssignmentState) -> bool {
        let roster = self.greedy.roster();
        bundle.pairings.iter().any(|p| {
            p.teams()
                .iter()
                .all(|t| state.count(*t) < roster.team(*t).target_games)
        })
    }

    /// 为缺赛球队逐个寻找对手
    ///
    /// 对手优先级 = 对手缺口 * 1000 + 对阵分; 对手也必须低于目标场次
    fn fill_singles(
        &self,
        deficits: &[TeamId],
        scope: &[TeamId],
        thresholds: &Thresholds,
        state: &mut AssignmentState,
    ) -> usize {
        let roster = self.greedy.roster();
        let mut added = 0;
        for &team in deficits {
            let target = roster.team(team).target_games;
            if state.count(team) >= target {
                continue;
            }
            let mut opponents: Vec<(i64, MatchupCandidate)> = self
                .catalog
                .opponents_for(team, scope)
                .into_iter()
                .filter(|p| state.count(p.b) < roster.team(p.b).target_games)
                .map(|p| {
                    let need = (roster.team(p.b).target_games - state.count(p.b)) as i64;
                    (need * 1000 + p.score, MatchupCandidate::single(p))
                })
                .collect();
            opponents.sort_by(|x, y| y.0.cmp(&x.0));

            for (_, candidate) in opponents {
                if state.count(team) >= target {
                    break;
                }
                if let Ok(ids) = self.greedy.place(&candidate, thresholds, state) {
                    added += ids.len();
                }
            }
        }
        added
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::roster::{DivisionRecord, FacilityRecord, SchoolRecord, TeamRecord};
    use crate::engine::calendar::ResourceCalendar;
    use crate::engine::home_away::FacilityOwnerHomeAway;
    use crate::engine::scoring::ScoringModel;
    use chrono::NaiveDate;

    fn d(m: u32, day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2026, m, day).unwrap()
    }

    fn create_test_roster(schools: &[&str], target: u32) -> Roster {
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
                available_dates: vec![],
                unavailable_dates: vec![],
                courts: 1,
                capabilities: vec![],
                owner_school: None,
            }],
            schools
                .iter()
                .map(|s| TeamRecord {
                    id: format!("{}1", s),
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

    #[test]
    fn test_backfill_closes_gap_with_rematches() {
        // 3 支球队,目标 4 场: 单循环只有 2 场,必须重赛
        let roster = create_test_roster(&["A", "B", "C"], 4);
        let mut cfg = SchedulerConfig::default();
        cfg.rules.season_start = d(1, 5);
        cfg.rules.season_end = d(2, 28);
        let calendar = ResourceCalendar::new(&cfg.rules, &roster.facilities);
        let scoring = ScoringModel::new(&cfg.weights, &cfg.rules, &roster);
        let policy = FacilityOwnerHomeAway;
        let greedy = GreedyAssigner::new(&roster, &cfg, &calendar, &scoring, &policy);
        let catalog = MatchupCatalog::new(&roster, &scoring);
        let mut state = AssignmentState::new(&roster);
        let scope: Vec<TeamId> = roster.teams.iter().map(|t| t.id).collect();

        greedy.assign(
            &catalog.within_division(&scope),
            &Thresholds::strict(&cfg.rules),
            &mut state,
        );
        assert_eq!(state.total_games(), 3);

        let report = RelaxationBackfiller::new(&greedy, &catalog, &cfg).backfill(&scope, &[], &mut state);
        assert!(ShortfallReport::compute(&roster, &state).is_empty());
        assert_eq!(state.total_games(), 6);
        assert_eq!(report.games_added, 3);
        assert!(report.rounds_run <= cfg.relaxation.max_rounds);
        for a in 0..3u32 {
            for b in (a + 1)..3u32 {
                assert!(state.pair_count(TeamId(a), TeamId(b)) <= cfg.rules.rematch_ceiling);
            }
        }
    }

    #[test]
    fn test_shortfall_reported_when_capacity_runs_out() {
        let roster = create_test_roster(&["A", "B", "C"], 8);
        let mut cfg = SchedulerConfig::default();
        cfg.rules.season_start = d(1, 6);
        cfg.rules.season_end = d(1, 6);
        cfg.rules.holidays = vec![];
        let calendar = ResourceCalendar::new(&cfg.rules, &roster.facilities);
        let scoring = ScoringModel::new(&cfg.weights, &cfg.rules, &roster);
        let policy = FacilityOwnerHomeAway;
        let greedy = GreedyAssigner::new(&roster, &cfg, &calendar, &scoring, &policy);
        let catalog = MatchupCatalog::new(&roster, &scoring);
        let mut state = AssignmentState::new(&roster);
        let scope: Vec<TeamId> = roster.teams.iter().map(|t| t.id).collect();

        greedy.assign(
            &catalog.within_division(&scope),
            &Thresholds::strict(&cfg.rules),
            &mut state,
        );
        let report = RelaxationBackfiller::new(&greedy, &catalog, &cfg).backfill(&scope, &[], &mut state);

        let shortfall = ShortfallReport::compute(&roster, &state);
        let true_deficit: u32 = roster
            .teams
            .iter()
            .map(|t| t.target_games - state.count(t.id))
            .sum();
        assert!(state.total_games() <= 3);
        assert_eq!(shortfall.total_missing, true_deficit);
        assert_eq!(shortfall.teams.len(), 3);
        assert!(report.rounds_run <= cfg.relaxation.max_rounds);
    }
}
