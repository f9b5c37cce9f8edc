//! Expiry tags embedded in marked object names

use chrono::{Datelike, NaiveDate};
use serde::Serialize;
use std::fmt;

/// Substring flagging an object as slated for removal
pub const MARK_TAG: &str = "drp";

/// Substring preceding the backup date
pub const BACKUP_TAG: &str = "bck";

/// Months offered as removal targets, counted from the current month
pub const REMOVAL_HORIZON_MONTHS: u32 = 12;

/// A calendar month
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub struct YearMonth {
    pub year: i32,
    pub month: u32,
}

impl YearMonth {
    pub fn new(year: i32, month: u32) -> Option<Self> {
        if (1..=12).contains(&month) {
            Some(Self { year, month })
        } else {
            None
        }
    }

    pub fn from_date(date: NaiveDate) -> Self {
        Self {
            year: date.year(),
            month: date.month(),
        }
    }

    /// This month shifted forward by `months`, rolling over year boundaries
    pub fn plus_months(&self, months: u32) -> Self {
        let total = self.year * 12 + (self.month as i32 - 1) + months as i32;
        Self {
            year: total.div_euclid(12),
            month: total.rem_euclid(12) as u32 + 1,
        }
    }

    /// Display form, `YYYY-MM`
    pub fn label(&self) -> String {
        format!("{:04}-{:02}", self.year, self.month)
    }

    /// Embedded form, `YYYYMM`
    pub fn tag(&self) -> String {
        format!("{:04}{:02}", self.year, self.month)
    }

    /// Parse the embedded `YYYYMM` form
    pub fn parse_tag(s: &str) -> Option<Self> {
        if s.len() != 6 || !s.chars().all(|c| c.is_ascii_digit()) {
            return None;
        }
        let year = s[..4].parse().ok()?;
        let month = s[4..].parse().ok()?;
        Self::new(year, month)
    }

    pub fn first_day(&self) -> Option<NaiveDate> {
        NaiveDate::from_ymd_opt(self.year, self.month, 1)
    }
}

impl fmt::Display for YearMonth {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.label())
    }
}

/// Removal targets offered at mark time: current month + 1 through + 12
pub fn removal_month_options(today: NaiveDate) -> Vec<YearMonth> {
    let current = YearMonth::from_date(today);
    (1..=REMOVAL_HORIZON_MONTHS)
        .map(|n| current.plus_months(n))
        .collect()
}

/// Whether a name already carries the mark tag
pub fn is_marked(name: &str) -> bool {
    name.to_lowercase().contains(MARK_TAG)
}

/// Name given to an object when it is marked for removal:
/// `<original>_bck_<YYYYMMDD>[_<tag>]_drp_<YYYYMM>`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MarkedName {
    pub original: String,
    pub backup_date: NaiveDate,
    pub user_tag: Option<String>,
    pub removal: YearMonth,
}

impl MarkedName {
    pub fn new(
        original: impl Into<String>,
        backup_date: NaiveDate,
        user_tag: Option<String>,
        removal: YearMonth,
    ) -> Self {
        Self {
            original: original.into(),
            backup_date,
            user_tag,
            removal,
        }
    }

    /// Read a marked name back; `None` when it does not follow the convention
    pub fn parse(name: &str) -> Option<Self> {
        let lower = name.to_ascii_lowercase();
        let drp = lower.rfind(&format!("_{}_", MARK_TAG))?;
        let removal = YearMonth::parse_tag(&name[drp + MARK_TAG.len() + 2..])?;

        let head = &name[..drp];
        let bck = head.to_ascii_lowercase().rfind(&format!("_{}_", BACKUP_TAG))?;
        let original = &head[..bck];
        let rest = &head[bck + BACKUP_TAG.len() + 2..];

        let (date, user_tag) = match rest.split_once('_') {
            Some((date, tag)) => (date, Some(tag.to_string())),
            None => (rest, None),
        };
        let backup_date = NaiveDate::parse_from_str(date, "%Y%m%d").ok()?;
        if original.is_empty() || date.len() != 8 {
            return None;
        }

        Some(Self::new(original, backup_date, user_tag, removal))
    }
}

impl fmt::Display for MarkedName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}_{}_{}",
            self.original,
            BACKUP_TAG,
            self.backup_date.format("%Y%m%d")
        )?;
        if let Some(tag) = &self.user_tag {
            write!(f, "_{}", tag)?;
        }
        write!(f, "_{}_{}", MARK_TAG, self.removal.tag())
    }
}

/// Where a name stands relative to a reap date
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ExpiryStatus {
    /// No mark tag, or `drp` appears without a `_drp_` segment
    Unmarked,
    /// Removal month has not begun before the reap date
    Pending(YearMonth),
    /// Removal month began before the reap date
    Expired(YearMonth),
    /// Mark tag present but the removal month cannot be read
    Malformed(String),
}

/// Classify a name against `compare_date`.
///
/// The removal month is read from the text after the last `_drp_`; it is
/// past expiry when its first day is strictly before `compare_date`.
pub fn classify(name: &str, compare_date: NaiveDate) -> ExpiryStatus {
    let lower = name.to_ascii_lowercase();
    if !lower.contains(MARK_TAG) {
        return ExpiryStatus::Unmarked;
    }

    let separator = format!("_{}_", MARK_TAG);
    let segment = match lower.rfind(&separator) {
        Some(pos) => &name[pos + separator.len()..],
        None => {
            log::warn!("'{}' contains '{}' but no '{}' segment, leaving it alone", name, MARK_TAG, separator);
            return ExpiryStatus::Unmarked;
        }
    };

    match YearMonth::parse_tag(segment).and_then(|ym| Some((ym, ym.first_day()?))) {
        Some((ym, first_day)) if first_day < compare_date => ExpiryStatus::Expired(ym),
        Some((ym, _)) => ExpiryStatus::Pending(ym),
        None => ExpiryStatus::Malformed(format!("'{}' is not a YYYYMM month", segment)),
    }
}
