// ==========================================
// 赛季排赛引擎 - 资源日历 (ResourceCalendar)
// ==========================================
// 职责: 由赛季边界、每周开放窗口、节假日、场馆可用性与场地数
//       计算全部可预订的连续时段块 (Block)
// 产出: 惰性、有限、可重启的 Block 序列
// 顺序: 日期 -> 场馆(名册顺序) -> 场地号 -> 窗口偏移
// 红线: 纯函数,不读写分配状态
// ==========================================

use crate::config::SeasonRules;
use crate::domain::facility::{DateAvailability, Facility};
use crate::domain::slot::{Block, TimeSlot};
use chrono::{Datelike, Duration, NaiveDate, NaiveTime};

// ==========================================
// ResourceCalendar
// ==========================================
#[derive(Debug, Clone, Copy)]
pub struct ResourceCalendar<'a> {
    rules: &'a SeasonRules,
    facilities: &'a [Facility],
}

impl<'a> ResourceCalendar<'a> {
    pub fn new(rules: &'a SeasonRules, facilities: &'a [Facility]) -> Self {
        Self { rules, facilities }
    }

    pub fn rules(&self) -> &'a SeasonRules {
        self.rules
    }

    pub fn facilities(&self) -> &'a [Facility] {
        self.facilities
    }

    /// 可排赛日期 (赛季内、非节假日、非排除星期、不晚于截止日、窗口至少容纳一场)
    pub fn playable_dates(&self) -> impl Iterator<Item = NaiveDate> + 'a {
        let rules = self.rules;
        let deadline = rules.deadline();
        rules
            .season_start
            .iter_days()
            .take_while(move |d| *d <= deadline)
            .filter(move |d| !day_offsets(rules, *d).is_empty())
    }

    /// 某日的开赛时刻列表 (按窗口偏移)
    pub fn day_offsets(&self, date: NaiveDate) -> Vec<(NaiveTime, NaiveTime)> {
        day_offsets(self.rules, date)
    }

    /// 全部 Block; 每次调用都从头开始
    pub fn blocks(&self) -> Blocks<'a> {
        let first = self.playable_dates().next();
        let offsets = first
            .map(|d| day_offsets(self.rules, d))
            .unwrap_or_default();
        Blocks {
            rules: self.rules,
            facilities: self.facilities,
            date: first,
            offsets,
            facility_idx: 0,
            court: 1,
            offset: 0,
        }
    }

    /// 全部原子时段 (每个 Block 的首个时段)
    pub fn slots(&self) -> impl Iterator<Item = TimeSlot> + 'a {
        self.blocks().filter_map(|b| b.slots.first().copied())
    }

    /// 时段是否落在开放窗口、可排赛日期与场馆可用日内
    pub fn is_open(&self, slot: &TimeSlot) -> bool {
        let Some(facility) = self.facilities.get(slot.facility.index()) else {
            return false;
        };
        if slot.court == 0 || slot.court > facility.courts || !facility.is_available(slot.date) {
            return false;
        }
        day_offsets(self.rules, slot.date)
            .iter()
            .any(|(start, end)| *start == slot.start && *end == slot.end)
    }
}

fn day_offsets(rules: &SeasonRules, date: NaiveDate) -> Vec<(NaiveTime, NaiveTime)> {
    if date < rules.season_start || date > rules.deadline() || rules.is_holiday(date) {
        return Vec::new();
    }
    let Some(window) = rules.windows.window_for(date.weekday()) else {
        return Vec::new();
    };
    let duration = Duration::minutes(rules.match_duration_minutes as i64);
    (0..window.slot_count(rules.match_duration_minutes))
        .map(|k| {
            let start = window.start + duration * k as i32;
            (start, start + duration)
        })
        .collect()
}

// ==========================================
// Blocks - 惰性 Block 迭代器
// ==========================================
#[derive(Debug, Clone)]
pub struct Blocks<'a> {
    rules: &'a SeasonRules,
    facilities: &'a [Facility],
    date: Option<NaiveDate>,
    offsets: Vec<(NaiveTime, NaiveTime)>,
    facility_idx: usize,
    court: u32,
    offset: usize,
}

impl<'a> Blocks<'a> {
    fn advance_date(&mut self) {
        let deadline = self.rules.deadline();
        let mut next = self.date.and_then(|d| d.succ_opt());
        while let Some(d) = next {
            if d > deadline {
                next = None;
                break;
            }
            let offsets = day_offsets(self.rules, d);
            if !offsets.is_empty() {
                self.offsets = offsets;
                break;
            }
            next = d.succ_opt();
        }
        self.date = next;
        self.facility_idx = 0;
        self.court = 1;
        self.offset = 0;
    }
}

impl<'a> Iterator for Blocks<'a> {
    type Item = Block;

    fn next(&mut self) -> Option<Block> {
        loop {
            let date = self.date?;
            let Some(facility) = self.facilities.get(self.facility_idx) else {
                self.advance_date();
                continue;
            };
            if self.court > facility.courts || !facility.is_available(date) {
                self.facility_idx += 1;
                self.court = 1;
                self.offset = 0;
                continue;
            }
            if self.offset >= self.offsets.len() {
                self.court += 1;
                self.offset = 0;
                continue;
            }

            let slots = self.offsets[self.offset..]
                .iter()
                .map(|(start, end)| TimeSlot {
                    date,
                    start: *start,
                    end: *end,
                    facility: facility.id,
                    court: self.court,
                })
                .collect();
            self.offset += 1;
            return Some(Block {
                facility: facility.id,
                court: self.court,
                date,
                slots,
            });
        }
    }
}
