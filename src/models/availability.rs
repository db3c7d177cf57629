use std::collections::{BTreeMap, BTreeSet};

use chrono::{Datelike, NaiveDate, NaiveDateTime, NaiveTime, Timelike};
use serde::{Deserialize, Serialize};

use crate::errors::AppError;

pub const DEFAULT_SLOT_DURATION_MINUTES: u32 = 60;
pub const MAX_SLOT_DURATION_MINUTES: u32 = 24 * 60;

const DAY_NAMES: [&str; 7] = ["Sun", "Mon", "Tue", "Wed", "Thu", "Fri", "Sat"];

/// Day of week (0 = Sunday) to that day's working intervals.
pub type WeeklyTemplate = BTreeMap<u8, Vec<WorkingInterval>>;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct WorkingInterval {
    #[serde(with = "hhmm")]
    pub start: NaiveTime,
    #[serde(with = "hhmm")]
    pub end: NaiveTime,
}

impl WorkingInterval {
    pub fn new(start: NaiveTime, end: NaiveTime) -> Self {
        Self { start, end }
    }

    pub fn parse(start: &str, end: &str) -> anyhow::Result<Self> {
        Ok(Self {
            start: parse_time(start)?,
            end: parse_time(end)?,
        })
    }

    pub fn start_minutes(&self) -> u32 {
        minutes_of_day(self.start)
    }

    pub fn end_minutes(&self) -> u32 {
        minutes_of_day(self.end)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AvailabilityRecord {
    pub provider_id: String,
    pub weekly_template: WeeklyTemplate,
    pub slot_duration_minutes: u32,
    #[serde(default)]
    pub custom_days_off: BTreeSet<NaiveDate>,
    pub created_at: NaiveDateTime,
    pub updated_at: NaiveDateTime,
}

/// Partial update merged into an existing record. Absent fields are left as-is.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct AvailabilityUpdate {
    pub weekly_template: Option<WeeklyTemplate>,
    pub slot_duration_minutes: Option<u32>,
    pub custom_days_off: Option<BTreeSet<NaiveDate>>,
}

impl AvailabilityRecord {
    /// Monday to Saturday 09:00-18:00, Sunday off, hourly slots.
    pub fn with_defaults(provider_id: &str, now: NaiveDateTime) -> Self {
        let open = NaiveTime::from_hms_opt(9, 0, 0).unwrap_or(NaiveTime::MIN);
        let close = NaiveTime::from_hms_opt(18, 0, 0).unwrap_or(NaiveTime::MIN);

        let mut weekly_template = WeeklyTemplate::new();
        weekly_template.insert(0, Vec::new());
        for day in 1..=6 {
            weekly_template.insert(day, vec![WorkingInterval::new(open, close)]);
        }

        Self {
            provider_id: provider_id.to_string(),
            weekly_template,
            slot_duration_minutes: DEFAULT_SLOT_DURATION_MINUTES,
            custom_days_off: BTreeSet::new(),
            created_at: now,
            updated_at: now,
        }
    }

    pub fn apply(&mut self, update: AvailabilityUpdate) {
        if let Some(template) = update.weekly_template {
            self.weekly_template = template;
        }
        if let Some(duration) = update.slot_duration_minutes {
            self.slot_duration_minutes = duration;
        }
        if let Some(days_off) = update.custom_days_off {
            self.custom_days_off = days_off;
        }
    }

    pub fn validate(&self) -> Result<(), AppError> {
        if self.slot_duration_minutes == 0 || self.slot_duration_minutes > MAX_SLOT_DURATION_MINUTES {
            return Err(AppError::Validation(format!(
                "slot duration must be between 1 and {MAX_SLOT_DURATION_MINUTES} minutes, got {}",
                self.slot_duration_minutes
            )));
        }

        for (day, intervals) in &self.weekly_template {
            if *day > 6 {
                return Err(AppError::Validation(format!("invalid day index: {day}")));
            }

            for interval in intervals {
                if interval.start >= interval.end {
                    return Err(AppError::Validation(format!(
                        "{}: interval start {} must be before end {}",
                        DAY_NAMES[*day as usize],
                        interval.start.format("%H:%M"),
                        interval.end.format("%H:%M")
                    )));
                }
            }

            let mut sorted = intervals.clone();
            sorted.sort_by_key(|i| i.start);
            for pair in sorted.windows(2) {
                if pair[1].start < pair[0].end {
                    return Err(AppError::Validation(format!(
                        "{}: intervals {}-{} and {}-{} overlap",
                        DAY_NAMES[*day as usize],
                        pair[0].start.format("%H:%M"),
                        pair[0].end.format("%H:%M"),
                        pair[1].start.format("%H:%M"),
                        pair[1].end.format("%H:%M")
                    )));
                }
            }
        }

        Ok(())
    }

    pub fn is_day_off(&self, date: NaiveDate) -> bool {
        self.custom_days_off.contains(&date)
    }

    pub fn intervals_for(&self, date: NaiveDate) -> &[WorkingInterval] {
        self.weekly_template
            .get(&day_of_week(date))
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    pub fn to_human_readable(&self) -> String {
        // Monday first, Sunday last
        [1u8, 2, 3, 4, 5, 6, 0]
            .iter()
            .filter_map(|day| {
                let intervals = self.weekly_template.get(day)?;
                if intervals.is_empty() {
                    return None;
                }
                let hours = intervals
                    .iter()
                    .map(|i| format!("{}-{}", i.start.format("%H:%M"), i.end.format("%H:%M")))
                    .collect::<Vec<_>>()
                    .join(", ");
                Some(format!("{}: {hours}", DAY_NAMES[*day as usize]))
            })
            .collect::<Vec<_>>()
            .join("; ")
    }
}

/// 0 = Sunday through 6 = Saturday.
pub fn day_of_week(date: NaiveDate) -> u8 {
    date.weekday().num_days_from_sunday() as u8
}

pub fn minutes_of_day(time: NaiveTime) -> u32 {
    time.hour() * 60 + time.minute()
}

pub fn time_from_minutes(minutes: u32) -> Option<NaiveTime> {
    NaiveTime::from_hms_opt(minutes / 60, minutes % 60, 0)
}

pub fn parse_time(s: &str) -> anyhow::Result<NaiveTime> {
    let parts: Vec<&str> = s.split(':').collect();
    if parts.len() != 2 {
        return Err(anyhow::anyhow!("invalid time format: {s}"));
    }
    let hour: u32 = parts[0]
        .parse()
        .map_err(|_| anyhow::anyhow!("invalid hour in: {s}"))?;
    let minute: u32 = parts[1]
        .parse()
        .map_err(|_| anyhow::anyhow!("invalid minute in: {s}"))?;
    NaiveTime::from_hms_opt(hour, minute, 0).ok_or_else(|| anyhow::anyhow!("time out of range: {s}"))
}

/// Accepts `YYYY-MM-DD` or a full datetime; the time of day is dropped.
pub fn parse_date(s: &str) -> anyhow::Result<NaiveDate> {
    let s = s.trim();
    if let Ok(date) = NaiveDate::parse_from_str(s, "%Y-%m-%d") {
        return Ok(date);
    }
    if let Ok(dt) = chrono::DateTime::parse_from_rfc3339(s) {
        return Ok(dt.date_naive());
    }
    for fmt in ["%Y-%m-%dT%H:%M:%S", "%Y-%m-%dT%H:%M", "%Y-%m-%d %H:%M:%S", "%Y-%m-%d %H:%M"] {
        if let Ok(dt) = NaiveDateTime::parse_from_str(s, fmt) {
            return Ok(dt.date());
        }
    }
    Err(anyhow::anyhow!("invalid date: {s}"))
}

/// `HH:MM` serde representation for `NaiveTime`.
pub mod hhmm {
    use chrono::NaiveTime;
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(time: &NaiveTime, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&time.format("%H:%M").to_string())
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<NaiveTime, D::Error> {
        let s = String::deserialize(deserializer)?;
        super::parse_time(&s).map_err(serde::de::Error::custom)
    }
}
