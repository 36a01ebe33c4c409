pub mod booking;
pub mod conflict;
pub mod emails;
pub mod stats;
pub mod transition;
