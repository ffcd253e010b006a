// ==========================================
// 赛季排赛引擎 - 规则配置对象
// ==========================================
// 职责: 赛季规则 / 每周开放窗口 / 放宽计划 / 精确求解参数
// 默认值: 与既有联赛的运营常量保持一致
// 红线: 所有字段均可缺省 (serde default),校验在 ConfigManager 中快速失败
// ==========================================

use crate::config::scoring_profile::ScoringWeights;
use crate::engine::strategy::StrategyKind;
use crate::error::{SchedulerError, SchedulerResult};
use chrono::{NaiveDate, NaiveTime, Weekday};
use serde::{Deserialize, Serialize};

fn ymd(y: i32, m: u32, d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, d).unwrap_or_default()
}

fn hm(h: u32, m: u32) -> NaiveTime {
    NaiveTime::from_hms_opt(h, m, 0).unwrap_or_default()
}

// ==========================================
// OpenWindow / WeeklyWindows - 每周开放窗口
// ==========================================
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct OpenWindow {
    pub start: NaiveTime,
    pub end: NaiveTime,
}

impl OpenWindow {
    pub fn new(start: NaiveTime, end: NaiveTime) -> Self {
        Self { start, end }
    }

    /// 窗口内可容纳的完整场次数
    pub fn slot_count(&self, duration_minutes: u32) -> usize {
        if duration_minutes == 0 || self.end <= self.start {
            return 0;
        }
        ((self.end - self.start).num_minutes() / duration_minutes as i64) as usize
    }

    pub fn contains(&self, start: NaiveTime, end: NaiveTime) -> bool {
        start >= self.start && end <= self.end
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct WeeklyWindows {
    /// 工作日窗口 (除周末日与排除日以外的每一天)
    pub weekday: Option<OpenWindow>,
    /// 周末比赛日
    pub weekend_day: Weekday,
    pub weekend: Option<OpenWindow>,
    /// 不排赛的星期
    pub excluded: Vec<Weekday>,
}

impl Default for WeeklyWindows {
    fn default() -> Self {
        Self {
            weekday: Some(OpenWindow::new(hm(17, 0), hm(20, 30))),
            weekend_day: Weekday::Sat,
            weekend: Some(OpenWindow::new(hm(8, 0), hm(18, 0))),
            excluded: vec![Weekday::Sun],
        }
    }
}

impl WeeklyWindows {
    pub fn window_for(&self, day: Weekday) -> Option<OpenWindow> {
        if self.excluded.contains(&day) {
            return None;
        }
        if day == self.weekend_day {
            return self.weekend;
        }
        self.weekday
    }

    pub fn is_weekend(&self, day: Weekday) -> bool {
        day == self.weekend_day
    }
}

// ==========================================
// SeasonRules - 赛季规则
// ==========================================
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SeasonRules {
    pub season_start: NaiveDate,
    pub season_end: NaiveDate,
    pub holidays: Vec<NaiveDate>,
    pub windows: WeeklyWindows,
    pub match_duration_minutes: u32,

    // ===== 频次 =====
    pub max_games_per_7_days: u32,
    pub max_games_per_14_days: u32,

    // ===== 同日双赛 =====
    pub max_doubleheaders: u32,
    pub doubleheader_break_minutes: u32,

    // ===== 重赛 =====
    /// 同一对球队的场次硬上限
    pub rematch_ceiling: u32,
    /// 同一对学校的常规见面次数上限
    pub school_pair_meeting_cap: u32,
    /// 放宽后学校对见面次数的硬上限
    pub school_pair_meeting_ceiling: u32,

    /// 严格模式下两场比赛之间的最少间隔天数
    pub strict_rest_days: u32,
    /// 最后一场比赛的截止日 (缺省 = 赛季结束日)
    pub final_game_deadline: Option<NaiveDate>,
    /// 每所学校当天最多使用一个场馆的星期
    pub single_facility_days: Vec<Weekday>,
    /// 主客场差值容忍度 (超过即软违规)
    pub home_away_tolerance: u32,
}

impl Default for SeasonRules {
    fn default() -> Self {
        Self {
            season_start: ymd(2026, 1, 5),
            season_end: ymd(2026, 2, 28),
            holidays: vec![ymd(2026, 1, 19), ymd(2026, 2, 16)],
            windows: WeeklyWindows::default(),
            match_duration_minutes: 60,
            max_games_per_7_days: 2,
            max_games_per_14_days: 3,
            max_doubleheaders: 1,
            doubleheader_break_minutes: 60,
            rematch_ceiling: 2,
            school_pair_meeting_cap: 2,
            school_pair_meeting_ceiling: 4,
            strict_rest_days: 2,
            final_game_deadline: None,
            single_facility_days: vec![
                Weekday::Mon,
                Weekday::Tue,
                Weekday::Wed,
                Weekday::Thu,
                Weekday::Fri,
            ],
            home_away_tolerance: 2,
        }
    }
}

impl SeasonRules {
    pub fn deadline(&self) -> NaiveDate {
        self.final_game_deadline
            .map(|d| d.min(self.season_end))
            .unwrap_or(self.season_end)
    }

    pub fn is_holiday(&self, date: NaiveDate) -> bool {
        self.holidays.contains(&date)
    }

    /// 日期是否在赛季内且可排赛 (不含场馆可用性)
    pub fn is_playable_date(&self, date: NaiveDate) -> bool {
        use chrono::Datelike;
        date >= self.season_start
            && date <= self.deadline()
            && !self.is_holiday(date)
            && self.windows.window_for(date.weekday()).is_some()
    }
}

// ==========================================
// RelaxationSchedule - 放宽计划
// ==========================================

/// 从第 from_round 轮起休息天数降为 rest_days
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RoundRestTier {
    pub from_round: u32,
    pub rest_days: u32,
}

/// 已赛场次低于 below_games 时休息天数降为 rest_days
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CountRestTier {
    pub below_games: u32,
    pub rest_days: u32,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RelaxationSchedule {
    pub max_rounds: u32,
    /// 按轮次的休息天数 (按 from_round 降序匹配第一条)
    pub round_rest_tiers: Vec<RoundRestTier>,
    /// 按已赛场次的休息天数 (按 below_games 升序匹配第一条)
    pub count_rest_tiers: Vec<CountRestTier>,
    /// 每轮球队对场次上限增量
    pub rematch_step: u32,
    /// 从该轮起允许捆绑只放置部分场次
    pub partial_bundle_round: u32,
    /// 从该轮起允许不同对阵混用同一场地同一晚
    pub mixed_court_round: u32,
    /// 常规轮次结束后执行兜底扫描
    pub desperate_sweep: bool,
}

impl Default for RelaxationSchedule {
    fn default() -> Self {
        Self {
            max_rounds: 20,
            round_rest_tiers: vec![
                RoundRestTier {
                    from_round: 15,
                    rest_days: 0,
                },
                RoundRestTier {
                    from_round: 10,
                    rest_days: 1,
                },
            ],
            count_rest_tiers: vec![
                CountRestTier {
                    below_games: 3,
                    rest_days: 0,
                },
                CountRestTier {
                    below_games: 7,
                    rest_days: 1,
                },
            ],
            rematch_step: 1,
            partial_bundle_round: 1,
            mixed_court_round: 2,
            desperate_sweep: true,
        }
    }
}

impl RelaxationSchedule {
    /// 轮次档位给出的休息天数 (按 from_round 降序匹配第一条)
    pub fn round_rest(&self, round: u32) -> Option<u32> {
        let mut tiers = self.round_rest_tiers.clone();
        tiers.sort_by(|a, b| b.from_round.cmp(&a.from_round));
        tiers
            .iter()
            .find(|t| round >= t.from_round)
            .map(|t| t.rest_days)
    }

    /// 场次档位给出的休息天数; 未命中则为严格值
    pub fn count_rest(&self, games_played: u32, strict_rest_days: u32) -> u32 {
        let mut tiers = self.count_rest_tiers.clone();
        tiers.sort_by_key(|t| t.below_games);
        tiers
            .iter()
            .find(|t| games_played < t.below_games)
            .map(|t| t.rest_days.min(strict_rest_days))
            .unwrap_or(strict_rest_days)
    }

    /// 某轮次下单支球队的最少休息天数
    pub fn rest_days_for(&self, round: u32, games_played: u32, strict_rest_days: u32) -> u32 {
        match self.round_rest(round) {
            Some(rest) => rest.min(strict_rest_days),
            None => self.count_rest(games_played, strict_rest_days),
        }
    }
}

// ==========================================
// SolverSettings - 精确求解参数
// ==========================================
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SolverSettings {
    pub enabled: bool,
    /// 分区球队数上限 (含)
    pub max_teams: usize,
    /// 布尔变量数上限
    pub max_variables: usize,
    /// 墙钟预算 (毫秒)
    pub time_budget_ms: u64,
    /// 每搜索多少个节点检查一次时钟
    pub clock_check_interval: u64,
}

impl Default for SolverSettings {
    fn default() -> Self {
        Self {
            enabled: true,
            max_teams: 8,
            max_variables: 4_000,
            time_budget_ms: 30_000,
            clock_check_interval: 256,
        }
    }
}

// ==========================================
// SchedulerConfig - 总配置
// ==========================================
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SchedulerConfig {
    pub rules: SeasonRules,
    pub weights: ScoringWeights,
    pub relaxation: RelaxationSchedule,
    pub solver: SolverSettings,
    /// None = 按名册规模自动选择
    pub strategy: Option<StrategyKind>,
    /// 多样性分块的块大小
    pub chunk_size: usize,
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            rules: SeasonRules::default(),
            weights: ScoringWeights::default(),
            relaxation: RelaxationSchedule::default(),
            solver: SolverSettings::default(),
            strategy: None,
            chunk_size: 12,
        }
    }
}

impl SchedulerConfig {
    /// 配置校验 (快速失败)
    pub fn validate(&self) -> SchedulerResult<()> {
        let r = &self.rules;
        if r.season_start > r.season_end {
            return Err(SchedulerError::config(
                "season_start",
                format!("赛季开始日 {} 晚于结束日 {}", r.season_start, r.season_end),
            ));
        }
        if r.match_duration_minutes == 0 {
            return Err(SchedulerError::config("match_duration_minutes", "必须大于 0"));
        }
        for (field, window) in [("windows.weekday", r.windows.weekday), ("windows.weekend", r.windows.weekend)] {
            if let Some(w) = window {
                if w.end <= w.start {
                    return Err(SchedulerError::config(
                        field,
                        format!("窗口结束 {} 不晚于开始 {}", w.end, w.start),
                    ));
                }
            }
        }
        if r.max_games_per_7_days == 0 {
            return Err(SchedulerError::config("max_games_per_7_days", "必须大于 0"));
        }
        if r.max_games_per_14_days < r.max_games_per_7_days {
            return Err(SchedulerError::config(
                "max_games_per_14_days",
                "14 天上限不能小于 7 天上限",
            ));
        }
        if r.rematch_ceiling == 0 {
            return Err(SchedulerError::config("rematch_ceiling", "必须大于 0"));
        }
        if r.school_pair_meeting_ceiling < r.school_pair_meeting_cap {
            return Err(SchedulerError::config(
                "school_pair_meeting_ceiling",
                "硬上限不能小于常规上限",
            ));
        }
        if self.solver.enabled && self.solver.clock_check_interval == 0 {
            return Err(SchedulerError::config("solver.clock_check_interval", "必须大于 0"));
        }
        if self.chunk_size < 2 {
            return Err(SchedulerError::config("chunk_size", "分块至少包含 2 支球队"));
        }
        Ok(())
    }
}
