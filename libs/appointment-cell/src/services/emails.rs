use notification_cell::models::EmailMessage;

use crate::models::{Appointment, AppointmentStatus};

/// Email bodies for the booking and transition side effects. Plain string
/// assembly; delivery is the mailer's concern and always best-effort.

pub fn booking_received_email(
    appointment: &Appointment,
    doctor_name: &str,
    specialization: &str,
    site_url: &str,
) -> EmailMessage {
    let subject = format!("Appointment Request Received - {}", doctor_name);

    let html_body = format!(
        "<html><body style=\"font-family: Arial, sans-serif; color: #333;\">\
         <h2>Appointment Request Received</h2>\
         <p>Dear {patient},</p>\
         <p>Your appointment request has been submitted and is awaiting doctor approval.</p>\
         <p><strong>Doctor:</strong> {doctor}<br>\
         <strong>Specialization:</strong> {specialization}<br>\
         <strong>Date:</strong> {date}<br>\
         <strong>Time:</strong> {time}</p>\
         <p><a href=\"{site_url}/patient/dashboard\">View Dashboard</a></p>\
         <p>Best regards,<br>CarePort Team</p>\
         </body></html>",
        patient = appointment.patient_name,
        doctor = doctor_name,
        specialization = specialization,
        date = appointment.appointment_date,
        time = appointment.appointment_time.format("%H:%M"),
        site_url = site_url,
    );

    let text_body = format!(
        "Dear {},\n\nYour appointment request has been submitted and is awaiting doctor approval.\n\n\
         Doctor: {}\nSpecialization: {}\nDate: {}\nTime: {}\n\n\
         You will receive another email once the doctor reviews your request.\n\n\
         Best regards,\nCarePort Team",
        appointment.patient_name,
        doctor_name,
        specialization,
        appointment.appointment_date,
        appointment.appointment_time.format("%H:%M"),
    );

    EmailMessage {
        to: appointment.patient_email.clone(),
        subject,
        html_body,
        text_body,
    }
}

pub fn rescheduled_email(
    appointment: &Appointment,
    doctor_name: &str,
    old_date: chrono::NaiveDate,
    old_time: chrono::NaiveTime,
    site_url: &str,
) -> EmailMessage {
    let subject = format!("Appointment Rescheduled - {}", doctor_name);

    let html_body = format!(
        "<html><body style=\"font-family: Arial, sans-serif; color: #333;\">\
         <h2>Appointment Rescheduled</h2>\
         <p>Dear {patient},</p>\
         <p>Your appointment with {doctor} has been moved from {old_date} {old_time} \
         to <strong>{new_date} {new_time}</strong>.</p>\
         <p><a href=\"{site_url}/patient/dashboard\">View Dashboard</a></p>\
         <p>Best regards,<br>CarePort Team</p>\
         </body></html>",
        patient = appointment.patient_name,
        doctor = doctor_name,
        old_date = old_date,
        old_time = old_time.format("%H:%M"),
        new_date = appointment.appointment_date,
        new_time = appointment.appointment_time.format("%H:%M"),
        site_url = site_url,
    );

    let text_body = format!(
        "Dear {},\n\nYour appointment with {} has been moved from {} {} to {} {}.\n\n\
         Best regards,\nCarePort Team",
        appointment.patient_name,
        doctor_name,
        old_date,
        old_time.format("%H:%M"),
        appointment.appointment_date,
        appointment.appointment_time.format("%H:%M"),
    );

    EmailMessage {
        to: appointment.patient_email.clone(),
        subject,
        html_body,
        text_body,
    }
}

pub fn status_changed_email(
    appointment: &Appointment,
    doctor_name: &str,
    site_url: &str,
) -> EmailMessage {
    let status_message = match appointment.status {
        AppointmentStatus::Approved => "approved and confirmed",
        AppointmentStatus::Scheduled => "scheduled for your selected time",
        AppointmentStatus::Completed => "completed successfully",
        AppointmentStatus::Cancelled => "cancelled",
        AppointmentStatus::Rescheduled => "rescheduled to a new time",
        AppointmentStatus::NoShow => "marked as no-show",
        AppointmentStatus::Rejected => "rejected",
        AppointmentStatus::Pending => "set back to pending",
    };

    let subject = format!("Appointment Update - {}", doctor_name);

    let cancellation_line = appointment
        .cancellation_reason
        .as_deref()
        .filter(|r| !r.is_empty())
        .map(|r| format!("<p><strong>Cancellation Reason:</strong> {}</p>", r))
        .unwrap_or_default();

    let html_body = format!(
        "<html><body style=\"font-family: Arial, sans-serif; color: #333;\">\
         <h2>Appointment Status Update</h2>\
         <p>Dear {patient},</p>\
         <p>Your appointment has been <strong>{message}</strong>.</p>\
         <p><strong>Doctor:</strong> {doctor}<br>\
         <strong>Date:</strong> {date}<br>\
         <strong>Time:</strong> {time}<br>\
         <strong>Current Status:</strong> {status}</p>\
         {cancellation}\
         <p><a href=\"{site_url}/patient/dashboard\">View Dashboard</a></p>\
         <p>Best regards,<br>CarePort Team</p>\
         </body></html>",
        patient = appointment.patient_name,
        message = status_message,
        doctor = doctor_name,
        date = appointment.appointment_date,
        time = appointment.appointment_time.format("%H:%M"),
        status = appointment.status,
        cancellation = cancellation_line,
        site_url = site_url,
    );

    let text_body = format!(
        "Dear {},\n\nYour appointment has been {}.\n\n\
         Doctor: {}\nDate: {}\nTime: {}\nCurrent Status: {}\n\n\
         Best regards,\nCarePort Team",
        appointment.patient_name,
        status_message,
        doctor_name,
        appointment.appointment_date,
        appointment.appointment_time.format("%H:%M"),
        appointment.status,
    );

    EmailMessage {
        to: appointment.patient_email.clone(),
        subject,
        html_body,
        text_body,
    }
}
