use chrono::{Datelike, NaiveDate};

/// A month shown in the calendar view.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Month {
    pub year: i32,
    /// 1-based.
    pub month: u32,
}

impl Month {
    pub fn new(year: i32, month: u32) -> Self {
        Self { year, month }
    }

    pub fn containing(date: NaiveDate) -> Self {
        Self::new(date.year(), date.month())
    }

    /// Moves `delta` months forward (or back, if negative).
    pub fn shift(&self, delta: i32) -> Self {
        let total = self.year * 12 + self.month as i32 - 1 + delta;
        Self::new(total.div_euclid(12), total.rem_euclid(12) as u32 + 1)
    }

    pub fn first_day(&self) -> Option<NaiveDate> {
        NaiveDate::from_ymd_opt(self.year, self.month, 1)
    }

    pub fn days_in_month(&self) -> u32 {
        let next = self.shift(1);
        match (self.first_day(), next.first_day()) {
            (Some(a), Some(b)) => (b - a).num_days() as u32,
            _ => 0,
        }
    }

    /// e.g. "January 2025".
    pub fn title(&self) -> String {
        self.first_day()
            .map(|d| d.format("%B %Y").to_string())
            .unwrap_or_default()
    }

    /// Calendar cells, Sunday first: leading blanks for the days before the 1st, then
    /// every day of the month.
    pub fn cells(&self) -> Vec<Option<u32>> {
        let leading = self
            .first_day()
            .map_or(0, |d| d.weekday().num_days_from_sunday() as usize);
        let mut cells = vec![None; leading];
        cells.extend((1..=self.days_in_month()).map(Some));
        cells
    }
}

pub const WEEKDAY_HEADER: [&str; 7] = ["Su", "Mo", "Tu", "We", "Th", "Fr", "Sa"];
