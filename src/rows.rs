use crate::model::{Plan, PlanItem, RenderRow, RowKind};

/// Flatten a scheduled plan into the ordered row list the layout stage
/// consumes. Category headings come first at indent 0, their items in
/// document order at indent 1; group rows precede their children, which
/// sit one level deeper.
pub fn flatten_rows(plan: &Plan) -> Vec<RenderRow> {
    let mut rows = Vec::new();
    for category in &plan.categories {
        rows.push(RenderRow {
            order: rows.len(),
            indent: 0,
            kind: RowKind::Heading,
            id: category.id.clone(),
            name: category.name.clone(),
            category: Some(category.id.clone()),
            depends_on: Vec::new(),
            start_date: None,
            finish_date: None,
            deadline_date: None,
        });
        for item in &category.items {
            append_item(item, &mut rows, 1, &category.id);
        }
    }
    rows
}

fn append_item(item: &PlanItem, rows: &mut Vec<RenderRow>, indent: usize, category: &str) {
    match item {
        PlanItem::Work(wp) => rows.push(RenderRow {
            order: rows.len(),
            indent,
            kind: RowKind::Bar,
            id: wp.id.clone(),
            name: wp.name.clone(),
            category: Some(category.to_string()),
            depends_on: wp.depends_on.clone(),
            start_date: wp.start_date,
            finish_date: wp.finish_date(),
            deadline_date: None,
        }),
        PlanItem::Milestone(ms) => rows.push(RenderRow {
            order: rows.len(),
            indent,
            kind: RowKind::Lozenge,
            id: ms.id.clone(),
            name: ms.name.clone(),
            category: Some(category.to_string()),
            depends_on: Vec::new(),
            start_date: None,
            finish_date: None,
            deadline_date: Some(ms.deadline_date),
        }),
        PlanItem::Group(group) => {
            rows.push(RenderRow {
                order: rows.len(),
                indent,
                kind: RowKind::Bracket,
                id: group.id.clone(),
                name: group.name.clone(),
                category: Some(category.to_string()),
                depends_on: Vec::new(),
                start_date: item.span_start(),
                finish_date: item.span_finish(),
                deadline_date: None,
            });
            for child in &group.items {
                append_item(child, rows, indent + 1, category);
            }
        }
    }
}
