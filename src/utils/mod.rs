pub mod attendance_stats;
pub mod db_utils;
pub mod validation;
