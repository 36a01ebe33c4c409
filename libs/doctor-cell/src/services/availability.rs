use chrono::{Datelike, NaiveDate, NaiveTime, Timelike, Weekday};
use reqwest::Method;
use serde::Deserialize;
use serde_json::Value;
use tracing::debug;
use uuid::Uuid;

use shared_config::AppConfig;
use shared_database::supabase::SupabaseClient;

use crate::models::{
    AvailableSlotsResponse, BlockedInterval, DoctorError, SlotsUnavailableReason, WeeklySchedule,
};

#[derive(Debug, Deserialize)]
struct BookedSlot {
    appointment_time: NaiveTime,
}

pub struct AvailabilityService {
    supabase: SupabaseClient,
}

impl AvailabilityService {
    pub fn new(config: &AppConfig) -> Self {
        Self {
            supabase: SupabaseClient::new(config),
        }
    }

    /// Calculate bookable slots for a doctor on a calendar date.
    ///
    /// Read-only and deterministic for a given snapshot of schedule,
    /// appointments and blocks. Filtering dates in the past is the
    /// caller's concern.
    pub async fn get_available_slots(
        &self,
        doctor_id: Uuid,
        date: NaiveDate,
        auth_token: &str,
    ) -> Result<AvailableSlotsResponse, DoctorError> {
        debug!("Calculating available slots for doctor {} on {}", doctor_id, date);

        let day_of_week = day_of_week_index(date);

        let schedule = match self
            .get_schedule_for_day(doctor_id, day_of_week, auth_token)
            .await?
        {
            Some(schedule) => schedule,
            None => {
                return Ok(AvailableSlotsResponse {
                    doctor_id,
                    date,
                    slots: vec![],
                    reason: Some(SlotsUnavailableReason::Unscheduled),
                })
            }
        };

        if !schedule.is_available {
            return Ok(AvailableSlotsResponse {
                doctor_id,
                date,
                slots: vec![],
                reason: Some(SlotsUnavailableReason::Unavailable),
            });
        }

        let booked = self.get_booked_times(doctor_id, date, auth_token).await?;
        let blocks = self.get_blocks_for_date(doctor_id, date, auth_token).await?;

        let slots = compute_available_slots(&schedule, date, &booked, &blocks);

        debug!("Found {} available slots", slots.len());
        Ok(AvailableSlotsResponse {
            doctor_id,
            date,
            slots,
            reason: None,
        })
    }

    // Private helper methods

    async fn get_schedule_for_day(
        &self,
        doctor_id: Uuid,
        day_of_week: i32,
        auth_token: &str,
    ) -> Result<Option<WeeklySchedule>, DoctorError> {
        let path = format!(
            "/rest/v1/weekly_schedules?doctor_id=eq.{}&day_of_week=eq.{}",
            doctor_id, day_of_week
        );
        let result: Vec<Value> = self
            .supabase
            .request(Method::GET, &path, Some(auth_token), None)
            .await
            .map_err(|e| DoctorError::DatabaseError(e.to_string()))?;

        match result.into_iter().next() {
            Some(row) => serde_json::from_value(row)
                .map(Some)
                .map_err(|e| DoctorError::DatabaseError(format!("Failed to parse schedule: {}", e))),
            None => Ok(None),
        }
    }

    /// Times already held by a live-status appointment for that date.
    async fn get_booked_times(
        &self,
        doctor_id: Uuid,
        date: NaiveDate,
        auth_token: &str,
    ) -> Result<Vec<NaiveTime>, DoctorError> {
        let path = format!(
            "/rest/v1/appointments?doctor_id=eq.{}&appointment_date=eq.{}&status=in.(pending,approved,scheduled)&select=appointment_time",
            doctor_id, date
        );
        let result: Vec<BookedSlot> = self
            .supabase
            .request(Method::GET, &path, Some(auth_token), None)
            .await
            .map_err(|e| DoctorError::DatabaseError(e.to_string()))?;

        Ok(result.into_iter().map(|b| b.appointment_time).collect())
    }

    async fn get_blocks_for_date(
        &self,
        doctor_id: Uuid,
        date: NaiveDate,
        auth_token: &str,
    ) -> Result<Vec<BlockedInterval>, DoctorError> {
        let date_start = date.and_hms_opt(0, 0, 0).unwrap().and_utc();
        let date_end = date.and_hms_opt(23, 59, 59).unwrap().and_utc();

        let path = format!(
            "/rest/v1/blocked_intervals?doctor_id=eq.{}&start_at=lte.{}&end_at=gte.{}",
            doctor_id,
            date_end.to_rfc3339(),
            date_start.to_rfc3339()
        );
        let result: Vec<Value> = self
            .supabase
            .request(Method::GET, &path, Some(auth_token), None)
            .await
            .map_err(|e| DoctorError::DatabaseError(e.to_string()))?;

        result
            .into_iter()
            .map(serde_json::from_value)
            .collect::<Result<Vec<BlockedInterval>, _>>()
            .map_err(|e| DoctorError::DatabaseError(format!("Failed to parse blocks: {}", e)))
    }
}

/// Map a date onto the schedule's day index (0 = Sunday .. 6 = Saturday).
pub fn day_of_week_index(date: NaiveDate) -> i32 {
    match date.weekday() {
        Weekday::Sun => 0,
        Weekday::Mon => 1,
        Weekday::Tue => 2,
        Weekday::Wed => 3,
        Weekday::Thu => 4,
        Weekday::Fri => 5,
        Weekday::Sat => 6,
    }
}

/// Walk [start_time, end_time) in fixed steps, discarding a final partial
/// step that would run past end_time.
pub fn slot_grid(start: NaiveTime, end: NaiveTime, slot_duration_minutes: i32) -> Vec<NaiveTime> {
    if slot_duration_minutes <= 0 {
        return vec![];
    }

    let step = slot_duration_minutes as u32;
    let start_minutes = start.num_seconds_from_midnight() / 60;
    let end_minutes = end.num_seconds_from_midnight() / 60;

    let mut slots = Vec::new();
    let mut current = start_minutes;
    while current + step <= end_minutes {
        if let Some(time) = NaiveTime::from_hms_opt(current / 60, current % 60, 0) {
            slots.push(time);
        }
        current += step;
    }

    slots
}

/// Whether a blocked interval excludes a slot on the given date. The block
/// bounds are clipped to the date and compared as time-of-day:
/// block_start <= slot < block_end.
pub fn block_covers_slot(block: &BlockedInterval, date: NaiveDate, slot: NaiveTime) -> bool {
    let block_start_date = block.start_at.date_naive();
    let block_end_date = block.end_at.date_naive();

    if date < block_start_date || date > block_end_date {
        return false;
    }

    let lower = if block_start_date < date {
        NaiveTime::MIN
    } else {
        block.start_at.time()
    };

    if block_end_date > date {
        // Block runs past midnight: everything from `lower` onward is out.
        return slot >= lower;
    }

    slot >= lower && slot < block.end_at.time()
}

/// The Slot Generator core: grid walk, then booked- and blocked-slot
/// filtering. Pure over its inputs.
pub fn compute_available_slots(
    schedule: &WeeklySchedule,
    date: NaiveDate,
    booked: &[NaiveTime],
    blocks: &[BlockedInterval],
) -> Vec<NaiveTime> {
    slot_grid(schedule.start_time, schedule.end_time, schedule.slot_duration_minutes)
        .into_iter()
        .filter(|slot| !booked.contains(slot))
        .filter(|slot| !blocks.iter().any(|block| block_covers_slot(block, date, *slot)))
        .collect()
}
