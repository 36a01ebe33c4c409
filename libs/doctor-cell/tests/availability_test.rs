use chrono::{NaiveDate, NaiveTime, TimeZone, Utc};
use uuid::Uuid;

use doctor_cell::models::{BlockedInterval, WeeklySchedule};
use doctor_cell::services::availability::{
    block_covers_slot, compute_available_slots, day_of_week_index, slot_grid,
};

fn t(h: u32, m: u32) -> NaiveTime {
    NaiveTime::from_hms_opt(h, m, 0).unwrap()
}

fn d(y: i32, m: u32, day: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, day).unwrap()
}

fn schedule(start: NaiveTime, end: NaiveTime, slot_minutes: i32) -> WeeklySchedule {
    WeeklySchedule {
        id: Uuid::new_v4(),
        doctor_id: Uuid::new_v4(),
        day_of_week: 1,
        start_time: start,
        end_time: end,
        slot_duration_minutes: slot_minutes,
        max_appointments: 8,
        is_available: true,
    }
}

fn block(doctor_id: Uuid, start: (i32, u32, u32, u32, u32), end: (i32, u32, u32, u32, u32)) -> BlockedInterval {
    BlockedInterval {
        id: Uuid::new_v4(),
        doctor_id,
        start_at: Utc
            .with_ymd_and_hms(start.0, start.1, start.2, start.3, start.4, 0)
            .unwrap(),
        end_at: Utc
            .with_ymd_and_hms(end.0, end.1, end.2, end.3, end.4, 0)
            .unwrap(),
        reason: Some("vacation".to_string()),
        created_at: Utc::now(),
    }
}

#[test]
fn nine_to_five_hourly_yields_eight_slots() {
    let slots = slot_grid(t(9, 0), t(17, 0), 60);

    assert_eq!(slots.len(), 8);
    assert_eq!(slots.first(), Some(&t(9, 0)));
    assert_eq!(slots.last(), Some(&t(16, 0)));
    assert!(slots.windows(2).all(|w| w[0] < w[1]));
}

#[test]
fn partial_final_step_is_discarded() {
    // 10:30 + 30min would end at 11:00, past 10:45
    let slots = slot_grid(t(9, 0), t(10, 45), 30);
    assert_eq!(slots, vec![t(9, 0), t(9, 30), t(10, 0)]);
}

#[test]
fn empty_grid_for_nonpositive_duration() {
    assert!(slot_grid(t(9, 0), t(17, 0), 0).is_empty());
    assert!(slot_grid(t(9, 0), t(17, 0), -15).is_empty());
}

#[test]
fn booked_times_are_excluded() {
    let schedule = schedule(t(9, 0), t(12, 0), 60);
    let booked = vec![t(10, 0)];

    let slots = compute_available_slots(&schedule, d(2024, 6, 10), &booked, &[]);
    assert_eq!(slots, vec![t(9, 0), t(11, 0)]);
}

#[test]
fn blocked_interval_excludes_covered_slot() {
    let schedule = schedule(t(9, 0), t(17, 0), 60);
    let doctor_id = schedule.doctor_id;
    // Lunch block [12:00, 13:00) on the target date
    let blocks = vec![block(doctor_id, (2024, 6, 10, 12, 0), (2024, 6, 10, 13, 0))];

    let slots = compute_available_slots(&schedule, d(2024, 6, 10), &[], &blocks);

    assert!(!slots.contains(&t(12, 0)));
    // The block's end is exclusive, 13:00 stays bookable
    assert!(slots.contains(&t(13, 0)));
    assert_eq!(slots.len(), 7);
}

#[test]
fn overlapping_blocks_each_apply() {
    let schedule = schedule(t(9, 0), t(12, 0), 60);
    let doctor_id = schedule.doctor_id;
    let blocks = vec![
        block(doctor_id, (2024, 6, 10, 9, 0), (2024, 6, 10, 10, 0)),
        block(doctor_id, (2024, 6, 10, 9, 30), (2024, 6, 10, 11, 0)),
    ];

    let slots = compute_available_slots(&schedule, d(2024, 6, 10), &[], &blocks);
    assert_eq!(slots, vec![t(11, 0)]);
}

#[test]
fn multi_day_block_covers_whole_middle_day() {
    let b = block(Uuid::new_v4(), (2024, 6, 9, 15, 0), (2024, 6, 11, 10, 0));

    // Middle day: fully blocked
    assert!(block_covers_slot(&b, d(2024, 6, 10), t(9, 0)));
    assert!(block_covers_slot(&b, d(2024, 6, 10), t(16, 0)));
    // First day: only from the block start onward
    assert!(!block_covers_slot(&b, d(2024, 6, 9), t(14, 0)));
    assert!(block_covers_slot(&b, d(2024, 6, 9), t(15, 0)));
    // Last day: until the block end, exclusive
    assert!(block_covers_slot(&b, d(2024, 6, 11), t(9, 0)));
    assert!(!block_covers_slot(&b, d(2024, 6, 11), t(10, 0)));
    // Outside the block entirely
    assert!(!block_covers_slot(&b, d(2024, 6, 12), t(9, 0)));
}

#[test]
fn day_of_week_index_is_sunday_first() {
    assert_eq!(day_of_week_index(d(2024, 6, 9)), 0); // Sunday
    assert_eq!(day_of_week_index(d(2024, 6, 10)), 1); // Monday
    assert_eq!(day_of_week_index(d(2024, 6, 15)), 6); // Saturday
}

#[test]
fn generation_is_deterministic() {
    let schedule = schedule(t(9, 0), t(17, 0), 60);
    let booked = vec![t(9, 0), t(14, 0)];
    let date = d(2024, 6, 10);

    let first = compute_available_slots(&schedule, date, &booked, &[]);
    let second = compute_available_slots(&schedule, date, &booked, &[]);
    assert_eq!(first, second);
}
