pub mod availability;
pub mod doctor;
pub mod review;
pub mod schedule;
