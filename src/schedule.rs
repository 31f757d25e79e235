//! Time-slot evaluation for the transaction catalogue.
//!
//! Each slot fires for a five-minute window starting at `HH:MM`, so a scheduler
//! that invokes the binary every few minutes catches every slot exactly once.

use crate::catalog::TransactionSpec;
use anyhow::Result;
use chrono::{DateTime, NaiveTime, Timelike, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Width of the firing window of a slot, in minutes.
pub const SLOT_WINDOW_MINUTES: u32 = 5;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ScheduleSlot {
    pub hour: u32,
    pub minute: u32,
}

impl ScheduleSlot {
    pub const fn at(hour: u32, minute: u32) -> Self {
        Self { hour, minute }
    }

    pub fn parse(time_str: &str) -> Result<Self> {
        let time = NaiveTime::parse_from_str(time_str, "%H:%M").map_err(|_| {
            anyhow::anyhow!(
                "Invalid slot format: '{}'. Expected 'HH:MM' (e.g., '12:00')",
                time_str
            )
        })?;
        Ok(Self::at(time.hour(), time.minute()))
    }

    pub fn is_valid(&self) -> bool {
        self.hour < 24 && self.minute < 60
    }

    /// `"HH:MM"`, the key under which chained outputs are stored.
    pub fn key(&self) -> String {
        format!("{:02}:{:02}", self.hour, self.minute)
    }

    pub fn matches<T: Timelike>(&self, now: &T) -> bool {
        now.hour() == self.hour
            && now.minute() >= self.minute
            && now.minute() < self.minute + SLOT_WINDOW_MINUTES
    }
}

impl fmt::Display for ScheduleSlot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.key())
    }
}

/// First slot of `schedule` whose window contains `now`.
pub fn matching_slot<T: Timelike>(schedule: &[ScheduleSlot], now: &T) -> Option<ScheduleSlot> {
    schedule.iter().copied().find(|slot| slot.matches(now))
}

#[derive(Debug, Clone, Copy)]
pub struct DueSpec<'a> {
    pub spec: &'a TransactionSpec,
    pub matched_slot: Option<ScheduleSlot>,
}

/// Specs due at `now`, in catalogue order. In test mode every spec is due and
/// `matched_slot` is only set when the clock happens to fall in a window.
pub fn due_specs<'a>(
    catalog: &'a [TransactionSpec],
    now: DateTime<Utc>,
    test_mode: bool,
) -> Vec<DueSpec<'a>> {
    catalog
        .iter()
        .filter_map(|spec| {
            let matched_slot = matching_slot(&spec.schedule, &now);
            if test_mode || matched_slot.is_some() {
                Some(DueSpec { spec, matched_slot })
            } else {
                None
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::{TransactionKind, TransactionSpec};
    use alloy::primitives::{Address, FixedBytes, U256};
    use chrono::TimeZone;

    fn at(hour: u32, minute: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 3, 14, hour, minute, 30).unwrap()
    }

    fn spec(name: &str, schedule: Vec<ScheduleSlot>) -> TransactionSpec {
        TransactionSpec {
            name: name.to_string(),
            kind: TransactionKind::Warp,
            target: Address::ZERO,
            selector: FixedBytes::ZERO,
            value: U256::from(1u64),
            repeat_count: 1,
            gas_limit: 21_000,
            schedule,
            amount_parameter: None,
            swap: None,
        }
    }

    #[test]
    fn test_single_slot_window() {
        let slot = ScheduleSlot::at(14, 10);

        assert!(!slot.matches(&at(14, 9)));
        for minute in 10..15 {
            assert!(slot.matches(&at(14, minute)), "minute {minute} should match");
        }
        assert!(!slot.matches(&at(14, 15)));
        assert!(!slot.matches(&at(13, 10)));
        assert!(!slot.matches(&at(15, 12)));
    }

    #[test]
    fn test_window_does_not_spill_into_next_hour() {
        let slot = ScheduleSlot::at(23, 58);

        assert!(slot.matches(&at(23, 59)));
        assert!(!slot.matches(&at(0, 0)));
        assert!(!slot.matches(&at(0, 1)));
    }

    #[test]
    fn test_first_matching_slot_wins() {
        let schedule = vec![
            ScheduleSlot::at(6, 0),
            ScheduleSlot::at(9, 0),
            ScheduleSlot::at(9, 2),
        ];

        assert_eq!(matching_slot(&schedule, &at(9, 3)), Some(ScheduleSlot::at(9, 0)));
        assert_eq!(matching_slot(&schedule, &at(9, 6)), Some(ScheduleSlot::at(9, 2)));
        assert_eq!(matching_slot(&schedule, &at(7, 0)), None);
    }

    #[test]
    fn test_due_specs_preserves_catalog_order() {
        let catalog = vec![
            spec("stake", vec![ScheduleSlot::at(5, 30)]),
            spec("warp", vec![ScheduleSlot::at(6, 0), ScheduleSlot::at(14, 0)]),
            spec("unstake", vec![ScheduleSlot::at(14, 0)]),
        ];

        let due = due_specs(&catalog, at(14, 2), false);
        let names: Vec<_> = due.iter().map(|d| d.spec.name.as_str()).collect();

        assert_eq!(names, vec!["warp", "unstake"]);
        assert_eq!(due[0].matched_slot, Some(ScheduleSlot::at(14, 0)));
    }

    #[test]
    fn test_test_mode_marks_everything_due() {
        let catalog = vec![
            spec("stake", vec![ScheduleSlot::at(5, 30)]),
            spec("unscheduled", vec![]),
        ];

        let due = due_specs(&catalog, at(11, 11), true);

        assert_eq!(due.len(), 2);
        assert!(due.iter().all(|d| d.matched_slot.is_none()));
    }

    #[test]
    fn test_slot_key_and_parse() {
        assert_eq!(ScheduleSlot::at(0, 0).key(), "00:00");
        assert_eq!(ScheduleSlot::at(19, 5).key(), "19:05");
        assert_eq!(ScheduleSlot::parse("12:00").unwrap(), ScheduleSlot::at(12, 0));
        assert!(ScheduleSlot::parse("24:00").is_err());
        assert!(ScheduleSlot::parse("noon").is_err());
    }
}
