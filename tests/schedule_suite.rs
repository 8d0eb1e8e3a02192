use chrono::NaiveDate;

use gantt_rs_renderer::PlanError;
use gantt_rs_renderer::model::{Category, Group, Milestone, Plan, PlanItem, WorkPackage};
use gantt_rs_renderer::schedule::{group_spans, schedule};

fn date(y: i32, m: u32, d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, d).unwrap()
}

fn plan_with_items(items: Vec<PlanItem>) -> Plan {
    Plan {
        name: "test".to_string(),
        categories: vec![Category {
            id: "cat".to_string(),
            name: "Cat".to_string(),
            color: None,
            items,
        }],
    }
}

fn work(id: &str, duration_days: i64) -> WorkPackage {
    WorkPackage::new(id, id, duration_days)
}

#[test]
fn dependency_scheduling_infers_start_from_predecessor_finish() {
    let mut a = work("A", 2);
    a.start_date = Some(date(2024, 1, 1));
    let mut b = work("B", 3);
    b.depends_on = vec!["A".to_string()];
    let mut plan = plan_with_items(vec![PlanItem::Work(a), PlanItem::Work(b)]);

    schedule(&mut plan).unwrap();

    let packages = plan.work_packages();
    // Zero-gap convention: B starts on the day A's inclusive finish falls.
    assert_eq!(packages[1].start_date, Some(date(2024, 1, 2)));
    assert_eq!(packages[1].finish_date(), Some(date(2024, 1, 4)));
}

#[test]
fn scheduled_start_never_precedes_any_predecessor_finish() {
    let mut a = work("A", 4);
    a.start_date = Some(date(2024, 2, 1));
    let mut b = work("B", 2);
    b.start_date = Some(date(2024, 2, 1));
    let mut c = work("C", 5);
    c.depends_on = vec!["A".to_string(), "B".to_string()];
    let mut plan = plan_with_items(vec![
        PlanItem::Work(a),
        PlanItem::Work(b),
        PlanItem::Work(c),
    ]);

    schedule(&mut plan).unwrap();

    let packages = plan.work_packages();
    let c_start = packages[2].start_date.unwrap();
    for predecessor in &packages[..2] {
        assert!(c_start >= predecessor.finish_date().unwrap());
    }
    // Latest finish wins: A finishes 2024-02-04.
    assert_eq!(c_start, date(2024, 2, 4));
}

#[test]
fn invalid_dependency_reference_raises_validation_error() {
    let mut wp = work("A", 1);
    wp.depends_on = vec!["missing".to_string()];
    let mut plan = plan_with_items(vec![PlanItem::Work(wp)]);

    let err = schedule(&mut plan).unwrap_err();
    assert!(matches!(err, PlanError::Validation(_)));
    assert!(err.to_string().contains("'missing'"), "{err}");
}

#[test]
fn dependency_on_milestone_is_wrong_kind() {
    let milestone = Milestone {
        id: "M".to_string(),
        name: "M".to_string(),
        deadline_date: date(2024, 6, 1),
    };
    let mut wp = work("A", 1);
    wp.depends_on = vec!["M".to_string()];
    let mut plan = plan_with_items(vec![PlanItem::Milestone(milestone), PlanItem::Work(wp)]);

    let err = schedule(&mut plan).unwrap_err();
    assert!(matches!(err, PlanError::Validation(_)));
}

#[test]
fn dependency_cycle_reports_both_ids() {
    let mut a = work("A", 1);
    a.depends_on = vec!["B".to_string()];
    let mut b = work("B", 1);
    b.depends_on = vec!["A".to_string()];
    let mut plan = plan_with_items(vec![PlanItem::Work(a), PlanItem::Work(b)]);

    let err = schedule(&mut plan).unwrap_err();
    assert!(matches!(err, PlanError::Validation(_)));
    let message = err.to_string();
    assert!(message.contains("cycle"), "{message}");
    assert!(message.contains('A') && message.contains('B'), "{message}");
}

#[test]
fn duplicate_ids_across_categories_fail_validation() {
    let mut plan = Plan {
        name: "test".to_string(),
        categories: vec![
            Category {
                id: "one".to_string(),
                name: "One".to_string(),
                color: None,
                items: vec![PlanItem::Work(work("dup", 1))],
            },
            Category {
                id: "two".to_string(),
                name: "Two".to_string(),
                color: None,
                items: vec![PlanItem::Milestone(Milestone {
                    id: "dup".to_string(),
                    name: "Dup".to_string(),
                    deadline_date: date(2024, 1, 1),
                })],
            },
        ],
    };

    let err = schedule(&mut plan).unwrap_err();
    let message = err.to_string();
    assert!(message.contains("duplicate id 'dup'"), "{message}");
    assert!(message.contains("work package"), "{message}");
    assert!(message.contains("milestone"), "{message}");
}

#[test]
fn group_span_derives_from_children() {
    let mut a = work("A", 2);
    a.start_date = Some(date(2024, 1, 1));
    let mut b = work("B", 1);
    b.start_date = Some(date(2024, 1, 5));
    let group = Group {
        id: "G".to_string(),
        name: "Group".to_string(),
        items: vec![PlanItem::Work(a), PlanItem::Work(b)],
    };
    let mut plan = plan_with_items(vec![PlanItem::Group(group)]);

    schedule(&mut plan).unwrap();

    let spans = group_spans(&plan);
    assert_eq!(spans["G"], (Some(date(2024, 1, 1)), Some(date(2024, 1, 5))));
}

#[test]
fn explicit_start_before_predecessor_finish_fails() {
    let mut a = work("A", 5);
    a.start_date = Some(date(2024, 1, 1));
    let mut b = work("B", 2);
    b.start_date = Some(date(2024, 1, 3));
    b.depends_on = vec!["A".to_string()];
    let mut plan = plan_with_items(vec![PlanItem::Work(a), PlanItem::Work(b)]);

    let err = schedule(&mut plan).unwrap_err();
    assert!(matches!(err, PlanError::Scheduling(_)));
    let message = err.to_string();
    assert!(message.contains("'B'"), "{message}");
    assert!(message.contains("'A'"), "{message}");
    assert!(message.contains("2024-01-05"), "{message}");
}

#[test]
fn explicit_start_equal_to_predecessor_finish_is_allowed() {
    let mut a = work("A", 5);
    a.start_date = Some(date(2024, 1, 1));
    let mut b = work("B", 2);
    b.start_date = Some(date(2024, 1, 5));
    b.depends_on = vec!["A".to_string()];
    let mut plan = plan_with_items(vec![PlanItem::Work(a), PlanItem::Work(b)]);

    schedule(&mut plan).unwrap();
    assert_eq!(plan.work_packages()[1].start_date, Some(date(2024, 1, 5)));
}

#[test]
fn unresolved_predecessor_is_a_scheduling_error() {
    // A has no start date and no dependencies; B cannot be placed.
    let a = work("A", 2);
    let mut b = work("B", 1);
    b.depends_on = vec!["A".to_string()];
    let mut plan = plan_with_items(vec![PlanItem::Work(a), PlanItem::Work(b)]);

    let err = schedule(&mut plan).unwrap_err();
    assert!(matches!(err, PlanError::Scheduling(_)));
    assert!(err.to_string().contains("has no start date"), "{err}");
}

#[test]
fn non_positive_duration_is_a_scheduling_error() {
    let mut wp = work("A", 0);
    wp.start_date = Some(date(2024, 1, 1));
    let mut plan = plan_with_items(vec![PlanItem::Work(wp)]);

    let err = schedule(&mut plan).unwrap_err();
    assert!(matches!(err, PlanError::Scheduling(_)));
    assert!(err.to_string().contains("duration_days=0"), "{err}");
}

#[test]
fn package_without_dates_or_dependents_stays_unscheduled() {
    let mut plan = plan_with_items(vec![PlanItem::Work(work("loose", 3))]);
    schedule(&mut plan).unwrap();
    assert_eq!(plan.work_packages()[0].start_date, None);
    assert_eq!(plan.work_packages()[0].finish_date(), None);
}

#[test]
fn empty_plan_is_vacuously_valid() {
    let mut plan = Plan {
        name: "empty".to_string(),
        categories: Vec::new(),
    };
    schedule(&mut plan).unwrap();

    let mut headings_only = plan_with_items(Vec::new());
    schedule(&mut headings_only).unwrap();
}

#[test]
fn chain_of_inferred_starts_stays_back_to_back() {
    let mut first = work("w1", 3);
    first.start_date = Some(date(2024, 5, 1));
    let mut second = work("w2", 2);
    second.depends_on = vec!["w1".to_string()];
    let mut third = work("w3", 4);
    third.depends_on = vec!["w2".to_string()];
    let mut plan = plan_with_items(vec![
        PlanItem::Work(first),
        PlanItem::Work(second),
        PlanItem::Work(third),
    ]);

    schedule(&mut plan).unwrap();

    let packages = plan.work_packages();
    assert_eq!(packages[0].finish_date(), Some(date(2024, 5, 3)));
    assert_eq!(packages[1].start_date, Some(date(2024, 5, 3)));
    assert_eq!(packages[1].finish_date(), Some(date(2024, 5, 4)));
    assert_eq!(packages[2].start_date, Some(date(2024, 5, 4)));
    assert_eq!(packages[2].finish_date(), Some(date(2024, 5, 7)));
}

#[test]
fn all_unscheduled_group_has_undefined_span() {
    let group = Group {
        id: "G".to_string(),
        name: "G".to_string(),
        items: vec![
            PlanItem::Work(work("A", 1)),
            PlanItem::Work(work("B", 2)),
        ],
    };
    let mut plan = plan_with_items(vec![PlanItem::Group(group)]);
    schedule(&mut plan).unwrap();
    assert_eq!(group_spans(&plan)["G"], (None, None));
}
