mod summary;
pub mod views;

pub use summary::{ExamDashboard, ManagerLoad, RecentExam, RECENT_LIMIT};
