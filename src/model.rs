use chrono::{Duration, NaiveDate};

/// Lowest-level schedulable element; renders as a bar on the timeline.
#[derive(Debug, Clone)]
pub struct WorkPackage {
    pub id: String,
    pub name: String,
    pub duration_days: i64,
    pub start_date: Option<NaiveDate>,
    pub depends_on: Vec<String>,
}

impl WorkPackage {
    pub fn new(id: &str, name: &str, duration_days: i64) -> Self {
        Self {
            id: id.to_string(),
            name: name.to_string(),
            duration_days,
            start_date: None,
            depends_on: Vec::new(),
        }
    }

    /// Inclusive finish date derived from `start_date` and `duration_days`.
    pub fn finish_date(&self) -> Option<NaiveDate> {
        self.start_date
            .map(|start| start + Duration::days(self.duration_days - 1))
    }
}

/// Zero-duration checkpoint; renders as a lozenge. The deadline is fixed
/// at parse time and never touched by the scheduler.
#[derive(Debug, Clone)]
pub struct Milestone {
    pub id: String,
    pub name: String,
    pub deadline_date: NaiveDate,
}

/// Aggregate node whose timeline span derives from its children; renders
/// as a bracket.
#[derive(Debug, Clone)]
pub struct Group {
    pub id: String,
    pub name: String,
    pub items: Vec<PlanItem>,
}

/// Closed set of nodes that can appear under a category or group.
#[derive(Debug, Clone)]
pub enum PlanItem {
    Work(WorkPackage),
    Milestone(Milestone),
    Group(Group),
}

impl PlanItem {
    pub fn id(&self) -> &str {
        match self {
            PlanItem::Work(wp) => &wp.id,
            PlanItem::Milestone(ms) => &ms.id,
            PlanItem::Group(group) => &group.id,
        }
    }

    /// Node kind name used in diagnostics.
    pub fn kind(&self) -> &'static str {
        match self {
            PlanItem::Work(_) => "work package",
            PlanItem::Milestone(_) => "milestone",
            PlanItem::Group(_) => "group",
        }
    }

    /// Earliest known start across this node; `None` while unresolved.
    pub fn span_start(&self) -> Option<NaiveDate> {
        match self {
            PlanItem::Work(wp) => wp.start_date,
            PlanItem::Milestone(ms) => Some(ms.deadline_date),
            PlanItem::Group(group) => group
                .items
                .iter()
                .filter_map(PlanItem::span_start)
                .min(),
        }
    }

    /// Latest known finish across this node; `None` while unresolved.
    pub fn span_finish(&self) -> Option<NaiveDate> {
        match self {
            PlanItem::Work(wp) => wp.finish_date(),
            PlanItem::Milestone(ms) => Some(ms.deadline_date),
            PlanItem::Group(group) => group
                .items
                .iter()
                .filter_map(PlanItem::span_finish)
                .max(),
        }
    }
}

/// Top-level grouping of plan items. The optional color hint overrides
/// the palette slot assigned during layout; it has no scheduling meaning.
#[derive(Debug, Clone)]
pub struct Category {
    pub id: String,
    pub name: String,
    pub color: Option<String>,
    pub items: Vec<PlanItem>,
}

impl Category {
    pub fn span_start(&self) -> Option<NaiveDate> {
        self.items.iter().filter_map(PlanItem::span_start).min()
    }

    pub fn span_finish(&self) -> Option<NaiveDate> {
        self.items.iter().filter_map(PlanItem::span_finish).max()
    }
}

/// Root of the plan tree. Shape is fixed after parsing; the scheduler
/// only fills in missing work-package start dates.
#[derive(Debug, Clone)]
pub struct Plan {
    pub name: String,
    pub categories: Vec<Category>,
}

impl Plan {
    /// All work packages in document order.
    pub fn work_packages(&self) -> Vec<&WorkPackage> {
        let mut out = Vec::new();
        for category in &self.categories {
            collect_work_packages(&category.items, &mut out);
        }
        out
    }

    /// Mutable document-order access, used by the scheduler to write
    /// inferred start dates back into the tree.
    pub fn work_packages_mut(&mut self) -> Vec<&mut WorkPackage> {
        let mut out = Vec::new();
        for category in &mut self.categories {
            collect_work_packages_mut(&mut category.items, &mut out);
        }
        out
    }
}

fn collect_work_packages<'a>(items: &'a [PlanItem], out: &mut Vec<&'a WorkPackage>) {
    for item in items {
        match item {
            PlanItem::Work(wp) => out.push(wp),
            PlanItem::Group(group) => collect_work_packages(&group.items, out),
            PlanItem::Milestone(_) => {}
        }
    }
}

fn collect_work_packages_mut<'a>(items: &'a mut [PlanItem], out: &mut Vec<&'a mut WorkPackage>) {
    for item in items {
        match item {
            PlanItem::Work(wp) => out.push(wp),
            PlanItem::Group(group) => collect_work_packages_mut(&mut group.items, out),
            PlanItem::Milestone(_) => {}
        }
    }
}

/// Render row kinds: category heading, work-package bar, milestone
/// lozenge, group bracket.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RowKind {
    Heading,
    Bar,
    Lozenge,
    Bracket,
}

/// Flattened view of a scheduled plan consumed by the layout stage.
#[derive(Debug, Clone)]
pub struct RenderRow {
    pub order: usize,
    pub indent: usize,
    pub kind: RowKind,
    pub id: String,
    pub name: String,
    pub category: Option<String>,
    pub depends_on: Vec<String>,
    pub start_date: Option<NaiveDate>,
    pub finish_date: Option<NaiveDate>,
    pub deadline_date: Option<NaiveDate>,
}
