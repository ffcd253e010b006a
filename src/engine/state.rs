// ==========================================
// 赛季排赛引擎 - 分配状态账本 (AssignmentState)
// ==========================================
// 职责: 单次排赛运行内的共享可变账本
//   - 场地占用 / 球队、学校、教练的 (日期, 开始) 占用
//   - 球队场次、主场次数、学校当日场馆、球队对 / 学校对见面次数
//   - 场馆当日利用率、场地当晚归属
// 红线: 只追加不回滚; 可行性在每次提交前重新检查 (由分配器负责)
// 红线: 跨分区共享同一份账本,物理资源不会被重复预订
// ==========================================

use crate::domain::game::Game;
use crate::domain::roster::Roster;
use crate::domain::slot::{SlotKey, TimeKey, TimeSlot};
use crate::domain::types::{
    school_pair_key, team_pair_key, CoachId, DivisionId, FacilityId, SchoolId, TeamId,
};
use chrono::NaiveDate;
use std::collections::{HashMap, HashSet};

/// 场地当晚归属
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CourtNight {
    /// 由某学校对的捆绑对阵独占
    Bundle(SchoolId, SchoolId),
    /// 单场对阵混排
    Mixed,
}

#[derive(Debug, Clone, Default)]
pub struct AssignmentState {
    used_slots: HashSet<SlotKey>,

    team_times: Vec<HashSet<TimeKey>>,
    team_slots: Vec<Vec<TimeSlot>>,
    team_counts: Vec<u32>,
    home_counts: Vec<u32>,

    school_times: Vec<HashSet<TimeKey>>,
    school_slots: Vec<Vec<TimeSlot>>,
    school_day_facility: HashMap<(SchoolId, NaiveDate), FacilityId>,

    coach_times: Vec<HashSet<TimeKey>>,
    coach_slots: Vec<Vec<TimeSlot>>,

    pair_counts: HashMap<(TeamId, TeamId), u32>,
    school_meetings: HashMap<(SchoolId, SchoolId), u32>,

    facility_tally: HashMap<(FacilityId, NaiveDate), u32>,
    court_nights: HashMap<(FacilityId, u32, NaiveDate), CourtNight>,

    games: Vec<Game>,
}

impl AssignmentState {
    pub fn new(roster: &Roster) -> Self {
        let teams = roster.teams.len();
        let schools = roster.schools.len();
        let coaches = roster.coaches.len();
        Self {
            team_times: vec![HashSet::new(); teams],
            team_slots: vec![Vec::new(); teams],
            team_counts: vec![0; teams],
            home_counts: vec![0; teams],
            school_times: vec![HashSet::new(); schools],
            school_slots: vec![Vec::new(); schools],
            coach_times: vec![HashSet::new(); coaches],
            coach_slots: vec![Vec::new(); coaches],
            ..Self::default()
        }
    }

    // ==========================================
    // 占用查询
    // ==========================================

    pub fn is_slot_free(&self, slot: &TimeSlot) -> bool {
        !self.used_slots.contains(&slot.key())
    }

    pub fn team_busy(&self, team: TeamId, at: TimeKey) -> bool {
        self.team_times[team.index()].contains(&at)
    }

    pub fn school_busy(&self, school: SchoolId, at: TimeKey) -> bool {
        self.school_times[school.index()].contains(&at)
    }

    pub fn coach_busy(&self, coach: CoachId, at: TimeKey) -> bool {
        self.coach_times[coach.index()].contains(&at)
    }

    // ==========================================
    // 计数查询
    // ==========================================

    pub fn count(&self, team: TeamId) -> u32 {
        self.team_counts[team.index()]
    }

    pub fn home_count(&self, team: TeamId) -> u32 {
        self.home_counts[team.index()]
    }

    pub fn pair_count(&self, a: TeamId, b: TeamId) -> u32 {
        self.pair_counts.get(&team_pair_key(a, b)).copied().unwrap_or(0)
    }

    pub fn school_meetings(&self, a: SchoolId, b: SchoolId) -> u32 {
        self.school_meetings
            .get(&school_pair_key(a, b))
            .copied()
            .unwrap_or(0)
    }

    pub fn facility_tally(&self, facility: FacilityId, date: NaiveDate) -> u32 {
        self.facility_tally.get(&(facility, date)).copied().unwrap_or(0)
    }

    pub fn court_night(&self, slot: &TimeSlot) -> Option<CourtNight> {
        self.court_nights
            .get(&(slot.facility, slot.court, slot.date))
            .copied()
    }

    /// 学校在某日已使用的场馆
    pub fn school_facility_on(&self, school: SchoolId, date: NaiveDate) -> Option<FacilityId> {
        self.school_day_facility.get(&(school, date)).copied()
    }

    pub fn team_slots(&self, team: TeamId) -> &[TimeSlot] {
        &self.team_slots[team.index()]
    }

    pub fn school_slots(&self, school: SchoolId) -> &[TimeSlot] {
        &self.school_slots[school.index()]
    }

    pub fn coach_slots(&self, coach: CoachId) -> &[TimeSlot] {
        &self.coach_slots[coach.index()]
    }

    /// 与 date 最近的已赛日期间隔 (天, 绝对值); 无比赛返回 None
    pub fn nearest_gap_days(&self, team: TeamId, date: NaiveDate) -> Option<i64> {
        self.team_slots[team.index()]
            .iter()
            .map(|s| (s.date - date).num_days().abs())
            .min()
    }

    /// 在 date 加赛一场后,包含 date 的前向窗口 [s, s + window_days - 1] 的最大场次
    ///
    /// 窗口起点取已赛日期与 date 本身,与校验器的滚动窗口一致
    pub fn window_load_with(&self, team: TeamId, date: NaiveDate, window_days: i64) -> u32 {
        let dates: Vec<NaiveDate> = self.team_slots[team.index()].iter().map(|s| s.date).collect();
        dates
            .iter()
            .copied()
            .chain(std::iter::once(date))
            .filter(|start| *start <= date && (date - *start).num_days() < window_days)
            .map(|start| {
                let inside = dates
                    .iter()
                    .filter(|d| **d >= start && (**d - start).num_days() < window_days)
                    .count() as u32;
                inside + 1
            })
            .max()
            .unwrap_or(1)
    }

    /// 同日已排时段
    pub fn same_day_slots(&self, team: TeamId, date: NaiveDate) -> Vec<TimeSlot> {
        self.team_slots[team.index()]
            .iter()
            .filter(|s| s.date == date)
            .copied()
            .collect()
    }

    /// 同日双赛的天数
    pub fn doubleheader_days(&self, team: TeamId) -> u32 {
        let mut per_day: HashMap<NaiveDate, u32> = HashMap::new();
        for s in &self.team_slots[team.index()] {
            *per_day.entry(s.date).or_insert(0) += 1;
        }
        per_day.values().filter(|c| **c >= 2).count() as u32
    }

    pub fn games(&self) -> &[Game] {
        &self.games
    }

    pub fn total_games(&self) -> usize {
        self.games.len()
    }

    pub fn into_games(self) -> Vec<Game> {
        self.games
    }

    // ==========================================
    // 提交
    // ==========================================

    /// 提交一场比赛并更新全部账目; 返回比赛 id
    pub fn commit(
        &mut self,
        roster: &Roster,
        home: TeamId,
        away: TeamId,
        division: DivisionId,
        slot: TimeSlot,
        claim: CourtNight,
    ) -> u32 {
        let id = self.games.len() as u32 + 1;
        let at = slot.time_key();

        self.used_slots.insert(slot.key());
        for team in [home, away] {
            let idx = team.index();
            self.team_times[idx].insert(at);
            self.team_slots[idx].push(slot);
            self.team_counts[idx] += 1;

            let t = roster.team(team);
            self.school_times[t.school.index()].insert(at);
            self.school_slots[t.school.index()].push(slot);
            self.school_day_facility
                .entry((t.school, slot.date))
                .or_insert(slot.facility);
            if let Some(coach) = t.coach {
                self.coach_times[coach.index()].insert(at);
                self.coach_slots[coach.index()].push(slot);
            }
        }
        self.home_counts[home.index()] += 1;

        *self.pair_counts.entry(team_pair_key(home, away)).or_insert(0) += 1;
        *self
            .facility_tally
            .entry((slot.facility, slot.date))
            .or_insert(0) += 1;
        self.court_nights
            .entry((slot.facility, slot.court, slot.date))
            .or_insert(claim);

        self.games.push(Game {
            id,
            home,
            away,
            division,
            slot,
        });
        id
    }

    /// 记录一次学校对见面 (一个捆绑对阵计一次)
    pub fn record_school_meeting(&mut self, a: SchoolId, b: SchoolId) {
        *self.school_meetings.entry(school_pair_key(a, b)).or_insert(0) += 1;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::roster::{DivisionRecord, SchoolRecord, TeamRecord};
    use chrono::NaiveTime;

    fn create_test_roster() -> Roster {
        let school = |n: &str| SchoolRecord {
            name: n.to_string(),
            cluster: None,
            tier: None,
            blackout_dates: vec![],
        };
        let team = |id: &str, s: &str, coach: Option<&str>| TeamRecord {
            id: id.to_string(),
            school: s.to_string(),
            division: Some("JV".to_string()),
            coach: coach.map(|c| c.to_string()),
            tier: None,
            cluster: None,
            rivals: vec![],
            do_not_play: vec![],
            target_games: 2,
        };
        Roster::build(
            vec![school("A"), school("B")],
            vec![DivisionRecord {
                name: "JV".to_string(),
                required_capability: None,
                priority_facilities: vec![],
                grouped: false,
            }],
            vec![],
            vec![team("A1", "A", Some("Lee")), team("B1", "B", None)],
        )
        .unwrap()
    }

    fn slot(day: u32, h: u32) -> TimeSlot {
        TimeSlot {
            date: NaiveDate::from_ymd_opt(2026, 1, day).unwrap(),
            start: NaiveTime::from_hms_opt(h, 0, 0).unwrap(),
            end: NaiveTime::from_hms_opt(h + 1, 0, 0).unwrap(),
            facility: FacilityId(0),
            court: 1,
        }
    }

    #[test]
    fn test_commit_updates_every_ledger() {
        let roster = create_test_roster();
        let mut state = AssignmentState::new(&roster);
        let s = slot(6, 17);
        let id = state.commit(&roster, TeamId(0), TeamId(1), DivisionId(0), s, CourtNight::Mixed);

        assert_eq!(id, 1);
        assert!(!state.is_slot_free(&s));
        assert!(state.team_busy(TeamId(1), s.time_key()));
        assert!(state.school_busy(SchoolId(0), s.time_key()));
        assert!(state.coach_busy(CoachId(0), s.time_key()));
        assert_eq!(state.count(TeamId(0)), 1);
        assert_eq!(state.home_count(TeamId(0)), 1);
        assert_eq!(state.home_count(TeamId(1)), 0);
        assert_eq!(state.pair_count(TeamId(1), TeamId(0)), 1);
        assert_eq!(state.facility_tally(FacilityId(0), s.date), 1);
        assert_eq!(state.school_facility_on(SchoolId(1), s.date), Some(FacilityId(0)));
        assert_eq!(state.court_night(&s), Some(CourtNight::Mixed));
    }

    #[test]
    fn test_gap_and_window_counts() {
        let roster = create_test_roster();
        let mut state = AssignmentState::new(&roster);
        state.commit(&roster, TeamId(0), TeamId(1), DivisionId(0), slot(6, 17), CourtNight::Mixed);
        state.commit(&roster, TeamId(1), TeamId(0), DivisionId(0), slot(12, 17), CourtNight::Mixed);

        let midweek = NaiveDate::from_ymd_opt(2026, 1, 9).unwrap();
        assert_eq!(state.nearest_gap_days(TeamId(0), midweek), Some(3));
        assert_eq!(state.window_load_with(TeamId(0), midweek, 7), 3);
        assert_eq!(state.window_load_with(TeamId(0), midweek, 3), 1);
        assert_eq!(state.doubleheader_days(TeamId(0)), 0);
        assert_eq!(state.total_games(), 2);
    }

    #[test]
    fn test_window_load_uses_forward_windows() {
        let roster = create_test_roster();
        let mut state = AssignmentState::new(&roster);
        // 前后各隔 6 天: 两个前向 7 天窗口各自只有 2 场
        state.commit(&roster, TeamId(0), TeamId(1), DivisionId(0), slot(6, 17), CourtNight::Mixed);
        state.commit(&roster, TeamId(1), TeamId(0), DivisionId(0), slot(18, 17), CourtNight::Mixed);

        let middle = NaiveDate::from_ymd_opt(2026, 1, 12).unwrap();
        assert_eq!(state.window_load_with(TeamId(0), middle, 7), 2);
        assert_eq!(state.window_load_with(TeamId(0), middle, 14), 3);

        let crowded = NaiveDate::from_ymd_opt(2026, 1, 10).unwrap();
        assert_eq!(state.window_load_with(TeamId(0), crowded, 7), 2);
        let next_day = NaiveDate::from_ymd_opt(2026, 1, 7).unwrap();
        assert_eq!(state.window_load_with(TeamId(0), next_day, 7), 2);
    }
}
