use chrono::{NaiveDate, NaiveTime, TimeZone, Utc};
use uuid::Uuid;

use appointment_cell::models::{Appointment, AppointmentPriority, AppointmentStatus};
use appointment_cell::services::stats::{build_analytics, export_to_csv};

fn appointment(status: AppointmentStatus, created_day: u32) -> Appointment {
    Appointment {
        id: Uuid::new_v4(),
        patient_name: "Test Patient".to_string(),
        patient_email: "patient@example.com".to_string(),
        patient_phone: None,
        doctor_id: Uuid::new_v4(),
        user_id: Some(Uuid::new_v4()),
        appointment_date: NaiveDate::from_ymd_opt(2024, 6, created_day).unwrap(),
        appointment_time: NaiveTime::from_hms_opt(10, 0, 0).unwrap(),
        status,
        priority: AppointmentPriority::Normal,
        reason: None,
        notes: None,
        cancellation_reason: None,
        created_at: Utc.with_ymd_and_hms(2024, 6, created_day, 8, 0, 0).unwrap(),
        updated_at: Utc.with_ymd_and_hms(2024, 6, created_day, 8, 0, 0).unwrap(),
        confirmed_at: None,
        completed_at: None,
    }
}

#[test]
fn success_rate_is_completed_over_total() {
    let appointments = vec![
        appointment(AppointmentStatus::Completed, 1),
        appointment(AppointmentStatus::Completed, 2),
        appointment(AppointmentStatus::Cancelled, 3),
        appointment(AppointmentStatus::Pending, 4),
    ];
    let start = NaiveDate::from_ymd_opt(2024, 6, 1).unwrap();
    let end = NaiveDate::from_ymd_opt(2024, 6, 30).unwrap();

    let analytics = build_analytics(&appointments, start, end, 30);

    assert_eq!(analytics.overview.total_appointments, 4);
    assert_eq!(analytics.overview.completed_appointments, 2);
    assert_eq!(analytics.overview.cancelled_appointments, 1);
    assert_eq!(analytics.overview.success_rate, 50.0);
}

#[test]
fn daily_trends_are_chronological() {
    let appointments = vec![
        appointment(AppointmentStatus::Pending, 29),
        appointment(AppointmentStatus::Pending, 30),
        appointment(AppointmentStatus::Pending, 30),
    ];
    let start = NaiveDate::from_ymd_opt(2024, 6, 24).unwrap();
    let end = NaiveDate::from_ymd_opt(2024, 6, 30).unwrap();

    let analytics = build_analytics(&appointments, start, end, 7);

    assert_eq!(analytics.daily_trends.len(), 7);
    assert!(analytics
        .daily_trends
        .windows(2)
        .all(|w| w[0].date < w[1].date));
    assert_eq!(analytics.daily_trends.last().unwrap().appointments, 2);
}

#[test]
fn empty_window_has_zero_rate() {
    let start = NaiveDate::from_ymd_opt(2024, 6, 1).unwrap();
    let end = NaiveDate::from_ymd_opt(2024, 6, 30).unwrap();
    let analytics = build_analytics(&[], start, end, 30);
    assert_eq!(analytics.overview.success_rate, 0.0);
}

#[test]
fn csv_export_escapes_embedded_commas() {
    let mut row = appointment(AppointmentStatus::Pending, 1);
    row.reason = Some("Back pain, recurring".to_string());

    let csv = export_to_csv(&[row]);
    let mut lines = csv.lines();

    assert!(lines.next().unwrap().starts_with("id,patient_name"));
    let data = lines.next().unwrap();
    assert!(data.contains("\"Back pain, recurring\""));
}
