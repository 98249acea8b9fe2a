use chrono::{DateTime, Utc};
use std::cmp::Reverse;
use std::collections::{BTreeMap, HashMap};

use super::views::{
    ExamDashboardSummary, LocationEntry, ManagerLoadEntry, OutcomeEntry, RecentExamView,
    StatusTotalEntry,
};
use crate::workflows::exam::domain::{ExamRecord, ExamStatus, ProductStatus};

pub const RECENT_LIMIT: usize = 5;

#[derive(Debug, Default, Clone)]
pub struct ManagerLoad {
    pub incomplete: usize,
    pub complete: usize,
}

#[derive(Debug, Clone)]
pub struct RecentExam {
    pub tracking_number: String,
    pub manager: String,
    pub location: String,
    pub status: ExamStatus,
    pub products: usize,
    pub last_updated: Option<DateTime<Utc>>,
}

impl RecentExam {
    pub fn to_view(&self) -> RecentExamView {
        RecentExamView {
            tracking_number: self.tracking_number.clone(),
            manager: self.manager.clone(),
            location: self.location.clone(),
            status: self.status,
            status_label: self.status.label(),
            products: self.products,
            last_updated: self.last_updated,
        }
    }
}

/// Workload and outcome counts across saved exams.
#[derive(Debug, Default)]
pub struct ExamDashboard {
    pub total_products: usize,
    pub status_totals: HashMap<ExamStatus, usize>,
    pub manager_load: BTreeMap<String, ManagerLoad>,
    pub location_counts: BTreeMap<String, usize>,
    pub outcome_counts: HashMap<ProductStatus, usize>,
    pub recent: Vec<RecentExam>,
}

impl ExamDashboard {
    pub fn from_records(records: &[ExamRecord]) -> Self {
        let mut dashboard = Self::default();

        for record in records {
            *dashboard.status_totals.entry(record.status).or_default() += 1;

            let load = dashboard
                .manager_load
                .entry(record.header.manager.clone())
                .or_default();
            match record.status {
                ExamStatus::Incomplete => load.incomplete += 1,
                ExamStatus::Complete => load.complete += 1,
            }

            *dashboard
                .location_counts
                .entry(record.header.location.clone())
                .or_default() += 1;

            dashboard.total_products += record.products.len();
            for product in &record.products {
                *dashboard
                    .outcome_counts
                    .entry(product.details.primary_status())
                    .or_default() += 1;
            }

            dashboard.recent.push(RecentExam {
                tracking_number: record.header.tracking_number.clone(),
                manager: record.header.manager.clone(),
                location: record.header.location.clone(),
                status: record.status,
                products: record.products.len(),
                last_updated: record.last_updated,
            });
        }

        // Newest first; undated records sort last.
        dashboard.recent.sort_by(|a, b| {
            Reverse(a.last_updated)
                .cmp(&Reverse(b.last_updated))
                .then_with(|| a.tracking_number.cmp(&b.tracking_number))
        });
        dashboard.recent.truncate(RECENT_LIMIT);

        dashboard
    }

    pub fn total_exams(&self) -> usize {
        self.status_totals.values().sum()
    }

    pub fn summary(&self) -> ExamDashboardSummary {
        let status_totals = ExamStatus::ordered()
            .into_iter()
            .map(|status| StatusTotalEntry {
                status,
                status_label: status.label(),
                count: self.status_totals.get(&status).copied().unwrap_or(0),
            })
            .collect();

        let manager_load = self
            .manager_load
            .iter()
            .map(|(manager, load)| ManagerLoadEntry {
                manager: manager.clone(),
                incomplete: load.incomplete,
                complete: load.complete,
            })
            .collect();

        let locations = self
            .location_counts
            .iter()
            .map(|(location, count)| LocationEntry {
                location: location.clone(),
                count: *count,
            })
            .collect();

        let outcomes = ProductStatus::ordered()
            .into_iter()
            .filter_map(|status| {
                self.outcome_counts.get(&status).map(|count| OutcomeEntry {
                    status,
                    status_label: status.label(),
                    count: *count,
                })
            })
            .collect();

        ExamDashboardSummary {
            total_exams: self.total_exams(),
            total_products: self.total_products,
            status_totals,
            manager_load,
            locations,
            outcomes,
            recent: self.recent.iter().map(RecentExam::to_view).collect(),
        }
    }
}
