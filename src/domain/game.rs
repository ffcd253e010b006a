// ==========================================
// 赛季排赛引擎 - 比赛与赛程
// ==========================================
// 红线: Game 一经放置不可变更、不可删除
// 红线: Schedule 只增不减
// ==========================================

use crate::domain::slot::TimeSlot;
use crate::domain::types::{DivisionId, FacilityId, TeamId};
use chrono::{NaiveDate, NaiveTime};
use serde::{Deserialize, Serialize};

// ==========================================
// Game - 已放置的对阵
// ==========================================
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Game {
    pub id: u32,
    pub home: TeamId,
    pub away: TeamId,
    pub division: DivisionId,
    pub slot: TimeSlot,
}

impl Game {
    pub fn teams(&self) -> [TeamId; 2] {
        [self.home, self.away]
    }

    pub fn involves(&self, team: TeamId) -> bool {
        self.home == team || self.away == team
    }

    pub fn opponent_of(&self, team: TeamId) -> Option<TeamId> {
        if self.home == team {
            Some(self.away)
        } else if self.away == team {
            Some(self.home)
        } else {
            None
        }
    }

    pub fn date(&self) -> NaiveDate {
        self.slot.date
    }
}

// ==========================================
// Schedule - 赛程 (有序比赛 + 赛季边界)
// ==========================================
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Schedule {
    pub season_start: NaiveDate,
    pub season_end: NaiveDate,
    pub games: Vec<Game>,
}

impl Schedule {
    pub fn new(season_start: NaiveDate, season_end: NaiveDate) -> Self {
        Self {
            season_start,
            season_end,
            games: Vec::new(),
        }
    }

    pub fn from_games(season_start: NaiveDate, season_end: NaiveDate, games: Vec<Game>) -> Self {
        let mut schedule = Self {
            season_start,
            season_end,
            games,
        };
        schedule.sort();
        schedule
    }

    /// 插入到有序位置 (同键排在已有比赛之后)
    pub fn push(&mut self, game: Game) {
        let key = sort_key(&game);
        let at = self.games.partition_point(|g| sort_key(g) <= key);
        self.games.insert(at, game);
    }

    /// 按 (日期, 开始, 场馆, 场地) 排序; 稳定排序保持 id 顺序
    pub fn sort(&mut self) {
        self.games.sort_by_key(sort_key);
    }

    pub fn len(&self) -> usize {
        self.games.len()
    }

    pub fn is_empty(&self) -> bool {
        self.games.is_empty()
    }

    pub fn games_for(&self, team: TeamId) -> impl Iterator<Item = &Game> + '_ {
        self.games.iter().filter(move |g| g.involves(team))
    }
}

fn sort_key(g: &Game) -> (NaiveDate, NaiveTime, FacilityId, u32) {
    (g.slot.date, g.slot.start, g.slot.facility, g.slot.court)
}
