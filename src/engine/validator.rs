// ==========================================
// 赛季排赛引擎 - 赛程校验器 (ScheduleValidator)
// ==========================================
// 职责: 对已完成赛程做独立审计,输出违规列表与罚分
// 红线: 只读; 不修改赛程; 不返回错误 (问题只以违规数据表达)
// 红线: 同一赛程重复校验结果完全相同
// ==========================================

use crate::config::{SchedulerConfig, SeasonRules};
use crate::domain::facility::DateAvailability;
use crate::domain::game::{Game, Schedule};
use crate::domain::roster::Roster;
use crate::domain::slot::{SlotKey, TimeKey};
use crate::domain::types::{team_pair_key, CoachId, FacilityId, SchoolId, TeamId};
use crate::domain::validation::{
    TeamScheduleStats, ValidationResult, Violation, ViolationKind,
};
use crate::engine::calendar::ResourceCalendar;
use chrono::{Datelike, NaiveDate};
use std::collections::{BTreeMap, BTreeSet};
use tracing::{debug, info, instrument, warn};

pub struct ScheduleValidator<'a> {
    config: &'a SchedulerConfig,
    roster: &'a Roster,
    /// 不含截止日的规则副本,截止日单独校验
    open_rules: SeasonRules,
}

impl<'a> ScheduleValidator<'a> {
    pub fn new(config: &'a SchedulerConfig, roster: &'a Roster) -> Self {
        let open_rules = SeasonRules {
            final_game_deadline: None,
            ..config.rules.clone()
        };
        Self {
            config,
            roster,
            open_rules,
        }
    }

    #[instrument(skip_all, fields(games = schedule.len()))]
    pub fn validate(&self, schedule: &Schedule) -> ValidationResult {
        let mut v = Vec::new();

        // 引用名册外对象的比赛单独报告,不参与其余检查
        let known = self.check_references(schedule, &mut v);
        let schedule = &known;

        self.check_slot_conflicts(schedule, &mut v);
        self.check_double_bookings(schedule, &mut v);
        self.check_pairings(schedule, &mut v);
        self.check_targets(schedule, &mut v);
        self.check_frequency(schedule, &mut v);
        self.check_doubleheaders(schedule, &mut v);
        self.check_venues(schedule, &mut v);
        self.check_home_away(schedule, &mut v);
        self.check_rivals(schedule, &mut v);
        self.check_facility_spread(schedule, &mut v);
        self.check_division_grouping(schedule, &mut v);

        let result = ValidationResult::from_violations(v, self.team_stats(schedule));
        info!(
            valid = result.is_valid,
            hard = result.hard.len(),
            soft = result.soft.len(),
            penalty = result.total_penalty,
            "赛程校验完成"
        );
        result
    }

    // ==========================================
    // 名册引用
    // ==========================================

    /// 返回只含合法引用比赛的赛程副本
    fn check_references(&self, schedule: &Schedule, out: &mut Vec<Violation>) -> Schedule {
        let mut games = Vec::with_capacity(schedule.games.len());
        for g in &schedule.games {
            let mut missing = Vec::new();
            for t in g.teams() {
                if self.roster.get_team(t).is_none() {
                    missing.push(format!("球队 {}", t));
                }
            }
            if self.roster.get_division(g.division).is_none() {
                missing.push(format!("组别 {}", g.division));
            }
            if self.roster.get_facility(g.slot.facility).is_none() {
                missing.push(format!("场馆 {}", g.slot.facility));
            }
            if missing.is_empty() {
                games.push(g.clone());
                continue;
            }
            out.push(Violation::new(
                ViolationKind::UnknownReference,
                format!("比赛 #{} 引用了名册中不存在的 {}", g.id, missing.join("、")),
                1.0,
                g.teams()
                    .into_iter()
                    .filter(|t| self.roster.get_team(*t).is_some())
                    .collect(),
                vec![g.id],
            ));
        }
        if games.len() < schedule.games.len() {
            warn!(
                skipped = schedule.games.len() - games.len(),
                "部分比赛引用了未知对象,已跳过其余检查"
            );
        }
        Schedule {
            season_start: schedule.season_start,
            season_end: schedule.season_end,
            games,
        }
    }

    // ==========================================
    // 占用冲突
    // ==========================================

    fn check_slot_conflicts(&self, schedule: &Schedule, out: &mut Vec<Violation>) {
        let mut by_slot: BTreeMap<SlotKey, Vec<&Game>> = BTreeMap::new();
        for g in &schedule.games {
            by_slot.entry(g.slot.key()).or_default().push(g);
        }
        for (key, games) in by_slot.into_iter().filter(|(_, g)| g.len() > 1) {
            out.push(Violation::new(
                ViolationKind::SlotConflict,
                format!(
                    "{} {} {} 场地{} 安排了 {} 场比赛",
                    key.date,
                    key.start.format("%H:%M"),
                    self.roster.facility(key.facility).name,
                    key.court,
                    games.len()
                ),
                (games.len() - 1) as f64,
                dedup_teams(games.iter().flat_map(|g| g.teams())),
                games.iter().map(|g| g.id).collect(),
            ));
        }
    }

    fn check_double_bookings(&self, schedule: &Schedule, out: &mut Vec<Violation>) {
        let mut by_team: BTreeMap<(TeamId, TimeKey), Vec<u32>> = BTreeMap::new();
        let mut by_school: BTreeMap<(SchoolId, TimeKey), BTreeSet<u32>> = BTreeMap::new();
        let mut by_coach: BTreeMap<(CoachId, TimeKey), BTreeSet<u32>> = BTreeMap::new();
        for g in &schedule.games {
            let at = g.slot.time_key();
            for t in g.teams() {
                let team = self.roster.team(t);
                by_team.entry((t, at)).or_default().push(g.id);
                by_school.entry((team.school, at)).or_default().insert(g.id);
                if let Some(coach) = team.coach {
                    by_coach.entry((coach, at)).or_default().insert(g.id);
                }
            }
        }

        for ((team, at), ids) in by_team.into_iter().filter(|(_, ids)| ids.len() > 1) {
            out.push(Violation::new(
                ViolationKind::TeamDoubleBooking,
                format!(
                    "{} 在 {} {} 同时有 {} 场比赛",
                    self.roster.team(team).name,
                    at.date,
                    at.start.format("%H:%M"),
                    ids.len()
                ),
                (ids.len() - 1) as f64,
                vec![team],
                ids,
            ));
        }
        for ((school, at), ids) in by_school.into_iter().filter(|(_, ids)| ids.len() > 1) {
            let ids: Vec<u32> = ids.into_iter().collect();
            out.push(Violation::new(
                ViolationKind::SchoolDoubleBooking,
                format!(
                    "学校 {} 在 {} {} 同时有 {} 场比赛",
                    self.roster.school(school).name,
                    at.date,
                    at.start.format("%H:%M"),
                    ids.len()
                ),
                (ids.len() - 1) as f64,
                self.teams_of_games(schedule, &ids, |t| self.roster.team(t).school == school),
                ids,
            ));
        }
        for ((coach, at), ids) in by_coach.into_iter().filter(|(_, ids)| ids.len() > 1) {
            let ids: Vec<u32> = ids.into_iter().collect();
            out.push(Violation::new(
                ViolationKind::CoachDoubleBooking,
                format!(
                    "教练 {} 在 {} {} 同时执教 {} 场比赛",
                    self.roster.coaches.get(coach.index()).map(String::as_str).unwrap_or("?"),
                    at.date,
                    at.start.format("%H:%M"),
                    ids.len()
                ),
                (ids.len() - 1) as f64,
                self.teams_of_games(schedule, &ids, |t| self.roster.team(t).coach == Some(coach)),
                ids,
            ));
        }
    }

    fn teams_of_games(
        &self,
        schedule: &Schedule,
        ids: &[u32],
        keep: impl Fn(TeamId) -> bool,
    ) -> Vec<TeamId> {
        dedup_teams(
            schedule
                .games
                .iter()
                .filter(|g| ids.contains(&g.id))
                .flat_map(|g| g.teams())
                .filter(|t| keep(*t)),
        )
    }

    // ==========================================
    // 对阵合法性
    // ==========================================

    fn check_pairings(&self, schedule: &Schedule, out: &mut Vec<Violation>) {
        let mut pair_games: BTreeMap<(TeamId, TeamId), Vec<u32>> = BTreeMap::new();
        for g in &schedule.games {
            let home = self.roster.team(g.home);
            let away = self.roster.team(g.away);
            pair_games
                .entry(team_pair_key(g.home, g.away))
                .or_default()
                .push(g.id);

            if home.shares_school_with(away) {
                out.push(Violation::new(
                    ViolationKind::SameSchoolPairing,
                    format!("{} 与 {} 同属一所学校", home.name, away.name),
                    1.0,
                    vec![g.home, g.away],
                    vec![g.id],
                ));
            }
            if home.forbids(away) {
                out.push(Violation::new(
                    ViolationKind::ForbiddenPairing,
                    format!("{} 与 {} 在禁赛名单中", home.name, away.name),
                    1.0,
                    vec![g.home, g.away],
                    vec![g.id],
                ));
            }
            if self.roster.division(g.division).is_capability_restricted()
                && home.clusters_differ(away)
            {
                out.push(Violation::new(
                    ViolationKind::ClusterRestriction,
                    format!("{} 与 {} 不在同一地理分区", home.name, away.name),
                    1.0,
                    vec![g.home, g.away],
                    vec![g.id],
                ));
            }
        }

        let ceiling = self.config.rules.rematch_ceiling as usize;
        for ((a, b), ids) in pair_games.into_iter().filter(|(_, ids)| ids.len() > ceiling) {
            out.push(Violation::new(
                ViolationKind::RematchCeiling,
                format!(
                    "{} 与 {} 相遇 {} 次,超过上限 {}",
                    self.roster.team(a).name,
                    self.roster.team(b).name,
                    ids.len(),
                    ceiling
                ),
                (ids.len() - ceiling) as f64,
                vec![a, b],
                ids,
            ));
        }
    }

    fn check_targets(&self, schedule: &Schedule, out: &mut Vec<Violation>) {
        let counts = self.team_dates(schedule);
        for team in &self.roster.teams {
            let played = counts.get(&team.id).map_or(0, |d| d.len()) as u32;
            if played < team.target_games {
                out.push(Violation::new(
                    ViolationKind::TargetShortfall,
                    format!("{} 只有 {} 场,目标 {} 场", team.name, played, team.target_games),
                    (team.target_games - played) as f64,
                    vec![team.id],
                    vec![],
                ));
            } else if played > team.target_games {
                out.push(Violation::new(
                    ViolationKind::TargetExceeded,
                    format!("{} 有 {} 场,超过目标 {} 场", team.name, played, team.target_games),
                    (played - team.target_games) as f64,
                    vec![team.id],
                    vec![],
                ));
            }
        }
    }

    // ==========================================
    // 频次与同日双赛
    // ==========================================

    /// 滚动窗口: 以每场比赛日期为窗口起点,[d, d+6] 与 [d, d+13]
    fn check_frequency(&self, schedule: &Schedule, out: &mut Vec<Violation>) {
        let rules = &self.config.rules;
        let windows = [
            (ViolationKind::WeeklyFrequency, 7, rules.max_games_per_7_days),
            (ViolationKind::BiweeklyFrequency, 14, rules.max_games_per_14_days),
        ];
        for (team, dates) in self.team_dates(schedule) {
            for (kind, days, cap) in windows {
                for (i, start) in dates.iter().enumerate() {
                    // 同一起点日只报一次
                    if i > 0 && dates[i - 1] == *start {
                        continue;
                    }
                    let in_window = dates[i..]
                        .iter()
                        .take_while(|d| (**d - *start).num_days() < days)
                        .count() as u32;
                    if in_window > cap {
                        out.push(Violation::new(
                            kind,
                            format!(
                                "{} 自 {} 起 {} 天内 {} 场,上限 {}",
                                self.roster.team(team).name,
                                start,
                                days,
                                in_window,
                                cap
                            ),
                            (in_window - cap) as f64,
                            vec![team],
                            vec![],
                        ));
                    }
                }
            }
        }
    }

    fn check_doubleheaders(&self, schedule: &Schedule, out: &mut Vec<Violation>) {
        let rules = &self.config.rules;
        let min_gap = (rules.match_duration_minutes + rules.doubleheader_break_minutes) as i64;
        for team in &self.roster.teams {
            let mut by_day: BTreeMap<NaiveDate, Vec<&Game>> = BTreeMap::new();
            for g in schedule.games_for(team.id) {
                by_day.entry(g.date()).or_default().push(g);
            }
            let mut days = 0u32;
            for (date, mut games) in by_day.into_iter().filter(|(_, g)| g.len() > 1) {
                days += 1;
                games.sort_by_key(|g| g.slot.start);
                for pair in games.windows(2) {
                    let gap = (pair[1].slot.start - pair[0].slot.start).num_minutes();
                    if gap < min_gap {
                        out.push(Violation::new(
                            ViolationKind::DoubleheaderRest,
                            format!(
                                "{} 在 {} 两场间隔 {} 分钟,至少 {} 分钟",
                                team.name, date, gap, min_gap
                            ),
                            1.0,
                            vec![team.id],
                            vec![pair[0].id, pair[1].id],
                        ));
                    }
                }
            }
            if days > rules.max_doubleheaders {
                out.push(Violation::new(
                    ViolationKind::DoubleheaderCeiling,
                    format!(
                        "{} 同日双赛 {} 天,上限 {}",
                        team.name, days, rules.max_doubleheaders
                    ),
                    (days - rules.max_doubleheaders) as f64,
                    vec![team.id],
                    vec![],
                ));
            }
        }
    }

    // ==========================================
    // 场馆、日期与能力
    // ==========================================

    fn check_venues(&self, schedule: &Schedule, out: &mut Vec<Violation>) {
        let calendar = ResourceCalendar::new(&self.open_rules, &self.roster.facilities);
        let deadline = self.config.rules.deadline();
        for g in &schedule.games {
            let facility = self.roster.facility(g.slot.facility);
            let teams = g.teams().to_vec();

            if g.date() > deadline {
                out.push(Violation::new(
                    ViolationKind::FinalGameDeadline,
                    format!("比赛 #{} 在 {},晚于截止日 {}", g.id, g.date(), deadline),
                    1.0,
                    teams.clone(),
                    vec![g.id],
                ));
            }

            let court_ok = g.slot.court >= 1 && g.slot.court <= facility.courts;
            if !court_ok || !facility.is_available(g.date()) {
                out.push(Violation::new(
                    ViolationKind::FacilityUnavailable,
                    format!(
                        "{} 在 {} 场地{} 不可用",
                        facility.name,
                        g.date(),
                        g.slot.court
                    ),
                    1.0,
                    teams.clone(),
                    vec![g.id],
                ));
            } else if !calendar.is_open(&g.slot) {
                out.push(Violation::new(
                    ViolationKind::OutsideOpenWindow,
                    format!("比赛 #{} ({}) 不在开放窗口内", g.id, g.slot),
                    1.0,
                    teams.clone(),
                    vec![g.id],
                ));
            }

            if let Some(cap) = &self.roster.division(g.division).required_capability {
                if !facility.has_capability(cap) {
                    out.push(Violation::new(
                        ViolationKind::CapabilityMismatch,
                        format!("{} 不具备 {} 能力", facility.name, cap),
                        1.0,
                        teams.clone(),
                        vec![g.id],
                    ));
                }
            }

            for t in g.teams() {
                let school = self.roster.school_of(t);
                if !school.is_available(g.date()) {
                    out.push(Violation::new(
                        ViolationKind::SchoolBlackout,
                        format!("学校 {} 在 {} 停赛", school.name, g.date()),
                        1.0,
                        vec![t],
                        vec![g.id],
                    ));
                }
            }
        }
    }

    // ==========================================
    // 软约束
    // ==========================================

    fn check_home_away(&self, schedule: &Schedule, out: &mut Vec<Violation>) {
        let tolerance = self.config.rules.home_away_tolerance;
        for (team, stats) in self.team_stats(schedule) {
            let diff = stats.home.abs_diff(stats.away);
            if diff > tolerance {
                out.push(Violation::new(
                    ViolationKind::HomeAwayImbalance,
                    format!(
                        "{} 主场 {} 客场 {}",
                        self.roster.team(team).name,
                        stats.home,
                        stats.away
                    ),
                    (diff - tolerance) as f64,
                    vec![team],
                    vec![],
                ));
            }
        }
    }

    fn check_rivals(&self, schedule: &Schedule, out: &mut Vec<Violation>) {
        let played: BTreeSet<(TeamId, TeamId)> = schedule
            .games
            .iter()
            .map(|g| team_pair_key(g.home, g.away))
            .collect();
        let mut rivals: BTreeSet<(TeamId, TeamId)> = BTreeSet::new();
        for team in &self.roster.teams {
            for r in &team.rivals {
                rivals.insert(team_pair_key(team.id, *r));
            }
        }
        for (a, b) in rivals.into_iter().filter(|k| !played.contains(k)) {
            out.push(Violation::new(
                ViolationKind::MissingRivalMatchup,
                format!(
                    "宿敌 {} 与 {} 未安排对阵",
                    self.roster.team(a).name,
                    self.roster.team(b).name
                ),
                1.0,
                vec![a, b],
                vec![],
            ));
        }
    }

    fn check_facility_spread(&self, schedule: &Schedule, out: &mut Vec<Violation>) {
        let mut used: BTreeMap<(SchoolId, NaiveDate), BTreeSet<FacilityId>> = BTreeMap::new();
        for g in &schedule.games {
            for t in g.teams() {
                used.entry((self.roster.team(t).school, g.date()))
                    .or_default()
                    .insert(g.slot.facility);
            }
        }
        for ((school, date), facilities) in used.into_iter().filter(|(_, f)| f.len() > 1) {
            out.push(Violation::new(
                ViolationKind::FacilitySpread,
                format!(
                    "学校 {} 在 {} 分散在 {} 个场馆",
                    self.roster.school(school).name,
                    date,
                    facilities.len()
                ),
                (facilities.len() - 1) as f64,
                self.roster.school(school).teams.clone(),
                vec![],
            ));
        }
    }

    /// 需连续编排的组别: 同一场地同一天内该组别的比赛应连成一段
    fn check_division_grouping(&self, schedule: &Schedule, out: &mut Vec<Violation>) {
        let mut court_days: BTreeMap<(FacilityId, u32, NaiveDate), Vec<&Game>> = BTreeMap::new();
        for g in &schedule.games {
            court_days
                .entry((g.slot.facility, g.slot.court, g.date()))
                .or_default()
                .push(g);
        }
        for division in self.roster.divisions.iter().filter(|d| d.grouped) {
            for ((facility, court, date), games) in &court_days {
                let mut games = games.clone();
                games.sort_by_key(|g| g.slot.start);
                let mut runs = 0usize;
                let mut inside = false;
                for g in &games {
                    let mine = g.division == division.id;
                    if mine && !inside {
                        runs += 1;
                    }
                    inside = mine;
                }
                if runs > 1 {
                    let ids: Vec<u32> = games
                        .iter()
                        .filter(|g| g.division == division.id)
                        .map(|g| g.id)
                        .collect();
                    out.push(Violation::new(
                        ViolationKind::DivisionGrouping,
                        format!(
                            "{} 在 {} 场地{} {} 被拆成 {} 段",
                            division.name,
                            self.roster.facility(*facility).name,
                            court,
                            date,
                            runs
                        ),
                        (runs - 1) as f64,
                        vec![],
                        ids,
                    ));
                }
            }
        }
    }

    // ==========================================
    // 统计
    // ==========================================

    /// 每队比赛日期 (升序,含同日重复); 无比赛的球队也有条目
    fn team_dates(&self, schedule: &Schedule) -> BTreeMap<TeamId, Vec<NaiveDate>> {
        let mut out: BTreeMap<TeamId, Vec<NaiveDate>> =
            self.roster.teams.iter().map(|t| (t.id, Vec::new())).collect();
        for g in &schedule.games {
            for t in g.teams() {
                out.entry(t).or_default().push(g.date());
            }
        }
        for dates in out.values_mut() {
            dates.sort();
        }
        out
    }

    pub fn team_stats(&self, schedule: &Schedule) -> BTreeMap<TeamId, TeamScheduleStats> {
        let mut out: BTreeMap<TeamId, TeamScheduleStats> = self
            .roster
            .teams
            .iter()
            .map(|t| (t.id, TeamScheduleStats::default()))
            .collect();
        for g in &schedule.games {
            let week = g.date().iso_week().week();
            for t in g.teams() {
                let stats = out.entry(t).or_default();
                stats.games += 1;
                if t == g.home {
                    stats.home += 1;
                } else {
                    stats.away += 1;
                }
                *stats.games_by_week.entry(week).or_insert(0) += 1;
            }
        }
        for (team, dates) in self.team_dates(schedule) {
            let mut per_day: BTreeMap<NaiveDate, u32> = BTreeMap::new();
            for d in dates {
                *per_day.entry(d).or_insert(0) += 1;
            }
            if let Some(stats) = out.get_mut(&team) {
                stats.doubleheaders = per_day.values().filter(|n| **n > 1).count() as u32;
            }
        }
        debug!(teams = out.len(), "球队统计已生成");
        out
    }
}

fn dedup_teams(teams: impl Iterator<Item = TeamId>) -> Vec<TeamId> {
    teams.collect::<BTreeSet<_>>().into_iter().collect()
}
