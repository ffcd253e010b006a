// ==========================================
// 测试数据构建器 - 用于集成测试
// ==========================================
#![allow(dead_code)]

use chrono::{NaiveDate, NaiveTime};
use league_scheduler::config::OpenWindow;
use league_scheduler::domain::{DivisionRecord, FacilityRecord, Roster, SchoolRecord, TeamRecord};
use league_scheduler::SchedulerConfig;

pub fn ymd(y: i32, m: u32, d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, d).unwrap()
}

pub fn hm(h: u32, m: u32) -> NaiveTime {
    NaiveTime::from_hms_opt(h, m, 0).unwrap()
}

/// 测试配置: 指定赛季,无节假日,关闭精确求解
pub fn create_test_config(start: NaiveDate, end: NaiveDate) -> SchedulerConfig {
    league_scheduler::logging::init_test();
    let mut cfg = SchedulerConfig::default();
    cfg.rules.season_start = start;
    cfg.rules.season_end = end;
    cfg.rules.holidays = vec![];
    cfg.solver.enabled = false;
    cfg
}

/// 工作日只开一个时段 (17:00-18:00)
pub fn single_weeknight_slot(cfg: &mut SchedulerConfig) {
    cfg.rules.windows.weekday = Some(OpenWindow::new(hm(17, 0), hm(18, 0)));
}

// ==========================================
// Roster 构建器
// ==========================================

#[derive(Default)]
pub struct RosterBuilder {
    schools: Vec<SchoolRecord>,
    divisions: Vec<DivisionRecord>,
    facilities: Vec<FacilityRecord>,
    teams: Vec<TeamRecord>,
}

impl RosterBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn school(self, name: &str) -> Self {
        self.school_with(name, None, None)
    }

    pub fn school_with(mut self, name: &str, cluster: Option<&str>, tier: Option<u8>) -> Self {
        self.schools.push(SchoolRecord {
            name: name.to_string(),
            cluster: cluster.map(str::to_string),
            tier,
            blackout_dates: vec![],
        });
        self
    }

    pub fn blackout(mut self, school: &str, date: NaiveDate) -> Self {
        if let Some(s) = self.schools.iter_mut().find(|s| s.name == school) {
            s.blackout_dates.push(date);
        }
        self
    }

    pub fn division(mut self, name: &str) -> Self {
        self.divisions.push(DivisionRecord {
            name: name.to_string(),
            required_capability: None,
            priority_facilities: vec![],
            grouped: false,
        });
        self
    }

    pub fn capability_division(mut self, name: &str, capability: &str) -> Self {
        self.divisions.push(DivisionRecord {
            name: name.to_string(),
            required_capability: Some(capability.to_string()),
            priority_facilities: vec![],
            grouped: false,
        });
        self
    }

    pub fn facility(self, name: &str, courts: i64) -> Self {
        self.facility_on(name, courts, &[])
    }

    /// 场馆只在给定日期开放 (空 = 不限制)
    pub fn facility_on(mut self, name: &str, courts: i64, dates: &[NaiveDate]) -> Self {
        self.facilities.push(FacilityRecord {
            name: name.to_string(),
            available_dates: dates.to_vec(),
            unavailable_dates: vec![],
            courts,
            capabilities: vec![],
            owner_school: None,
        });
        self
    }

    pub fn owned_by(mut self, school: &str) -> Self {
        if let Some(f) = self.facilities.last_mut() {
            f.owner_school = Some(school.to_string());
        }
        self
    }

    pub fn with_capability(mut self, capability: &str) -> Self {
        if let Some(f) = self.facilities.last_mut() {
            f.capabilities.push(capability.to_string());
        }
        self
    }

    pub fn team(mut self, id: &str, school: &str, division: &str, target: u32) -> Self {
        self.teams.push(TeamRecord {
            id: id.to_string(),
            school: school.to_string(),
            division: Some(division.to_string()),
            coach: None,
            tier: None,
            cluster: None,
            rivals: vec![],
            do_not_play: vec![],
            target_games: target,
        });
        self
    }

    pub fn coach(mut self, coach: &str) -> Self {
        if let Some(t) = self.teams.last_mut() {
            t.coach = Some(coach.to_string());
        }
        self
    }

    pub fn forbid(mut self, team: &str, other: &str) -> Self {
        if let Some(t) = self.teams.iter_mut().find(|t| t.id == team) {
            t.do_not_play.push(other.to_string());
        }
        self
    }

    pub fn rival(mut self, team: &str, other: &str) -> Self {
        if let Some(t) = self.teams.iter_mut().find(|t| t.id == team) {
            t.rivals.push(other.to_string());
        }
        self
    }

    pub fn try_build(self) -> league_scheduler::SchedulerResult<Roster> {
        Roster::build(self.schools, self.divisions, self.facilities, self.teams)
    }

    pub fn build(self) -> Roster {
        self.try_build().unwrap()
    }
}

/// 多校双组别名册: 每校 Varsity/JV 各一队,每校一个自有场馆 (2 块场地)
pub fn create_league_roster(schools: &[&str], target: u32) -> Roster {
    let mut b = RosterBuilder::new().division("Varsity").division("JV");
    for s in schools {
        b = b.school(s);
    }
    for s in schools {
        b = b.facility(&format!("{} Gym", s), 2).owned_by(s);
    }
    for s in schools {
        b = b
            .team(&format!("{} V", s), s, "Varsity", target)
            .coach(&format!("{} coach", s))
            .team(&format!("{} JV", s), s, "JV", target)
            .coach(&format!("{} coach", s));
    }
    b.build()
}
