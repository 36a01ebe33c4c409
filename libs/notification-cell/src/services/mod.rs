pub mod mailer;
pub mod notify;
