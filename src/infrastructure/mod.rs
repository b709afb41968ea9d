pub mod backends;
pub mod uploads;
