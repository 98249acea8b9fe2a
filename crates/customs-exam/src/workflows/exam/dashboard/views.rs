use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::workflows::exam::domain::{ExamStatus, ProductStatus};

#[derive(Debug, Clone, Serialize)]
pub struct StatusTotalEntry {
    pub status: ExamStatus,
    pub status_label: &'static str,
    pub count: usize,
}

#[derive(Debug, Clone, Serialize)]
pub struct ManagerLoadEntry {
    pub manager: String,
    pub incomplete: usize,
    pub complete: usize,
}

#[derive(Debug, Clone, Serialize)]
pub struct LocationEntry {
    pub location: String,
    pub count: usize,
}

#[derive(Debug, Clone, Serialize)]
pub struct OutcomeEntry {
    pub status: ProductStatus,
    pub status_label: &'static str,
    pub count: usize,
}

#[derive(Debug, Clone, Serialize)]
pub struct RecentExamView {
    pub tracking_number: String,
    pub manager: String,
    pub location: String,
    pub status: ExamStatus,
    pub status_label: &'static str,
    pub products: usize,
    pub last_updated: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Serialize)]
pub struct ExamDashboardSummary {
    pub total_exams: usize,
    pub total_products: usize,
    pub status_totals: Vec<StatusTotalEntry>,
    pub manager_load: Vec<ManagerLoadEntry>,
    pub locations: Vec<LocationEntry>,
    pub outcomes: Vec<OutcomeEntry>,
    pub recent: Vec<RecentExamView>,
}
