use super::common::*;
use chrono::Duration;

use crate::workflows::exam::dashboard::{ExamDashboard, RECENT_LIMIT};
use crate::workflows::exam::{ExamHeader, ExamStatus, ExamWorkflow, ProductStatus};

#[test]
fn dashboard_counts_status_managers_and_outcomes() {
    let gateway = memory_gateway();

    let mut complete = workflow_with_header();
    complete.add_product(conform_widgets()).expect("added");
    complete.add_product(damaged_pallet()).expect("added");
    complete.open_preview().expect("preview");
    complete.confirm().expect("confirm");
    complete
        .save(&gateway, Some(&inspector()), now())
        .expect("save");

    let mut draft = ExamWorkflow::new();
    draft
        .submit_header(ExamHeader {
            tracking_number: "ne-2025-0099".to_string(),
            location: "Patio 1".to_string(),
            ..header()
        })
        .expect("header");
    draft
        .save_draft(&gateway, Some(&inspector()), later())
        .expect("draft");

    let records = gateway.list().expect("list");
    let dashboard = ExamDashboard::from_records(&records);
    let summary = dashboard.summary();

    assert_eq!(dashboard.total_exams(), 2);
    assert_eq!(summary.total_products, 2);
    let counts: Vec<(ExamStatus, usize)> = summary
        .status_totals
        .iter()
        .map(|entry| (entry.status, entry.count))
        .collect();
    assert_eq!(
        counts,
        vec![(ExamStatus::Incomplete, 1), (ExamStatus::Complete, 1)]
    );

    assert_eq!(summary.manager_load.len(), 1);
    assert_eq!(summary.manager_load[0].complete, 1);
    assert_eq!(summary.manager_load[0].incomplete, 1);

    let outcomes: Vec<ProductStatus> = summary.outcomes.iter().map(|entry| entry.status).collect();
    assert_eq!(outcomes, vec![ProductStatus::Conform, ProductStatus::Fault]);

    assert_eq!(summary.recent[0].tracking_number, "NE-2025-0099");
    assert_eq!(summary.recent[0].status_label, "Incompleto");
}

#[test]
fn recent_list_is_capped_and_newest_first() {
    let gateway = memory_gateway();
    for index in 0..(RECENT_LIMIT + 2) {
        let mut workflow = ExamWorkflow::new();
        workflow
            .submit_header(ExamHeader {
                tracking_number: format!("ne-{index:03}"),
                ..header()
            })
            .expect("header");
        workflow
            .save_draft(
                &gateway,
                Some(&inspector()),
                now() + Duration::minutes(index as i64),
            )
            .expect("draft");
    }

    let summary = ExamDashboard::from_records(&gateway.list().expect("list")).summary();
    assert_eq!(summary.total_exams, RECENT_LIMIT + 2);
    assert_eq!(summary.recent.len(), RECENT_LIMIT);
    assert_eq!(summary.recent[0].tracking_number, "NE-006");
}
