//! Conflict listing for an augmented report.

use comfy_table::{presets::UTF8_FULL, Cell, ContentArrangement, Table};

use prconflict_core::models::{ChangeId, ChangeStatus, FileStatus, PrReport};

use crate::style;

/// One conflicting component occurrence.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConflictRow {
    pub change: ChangeId,
    pub status: ChangeStatus,
    pub package: String,
    pub bucket: FileStatus,
    pub component_type: String,
    pub name: String,
    pub others: Vec<ChangeId>,
    pub color: String,
}

/// Every conflicting occurrence, ordered by change then package.
pub fn collect(report: &PrReport) -> Vec<ConflictRow> {
    let changes = report
        .open_prs
        .iter()
        .map(|(id, c)| (id, ChangeStatus::Open, c))
        .chain(
            report
                .closed_prs
                .iter()
                .map(|(id, c)| (id, ChangeStatus::Closed, c)),
        );

    let mut rows = Vec::new();
    for (id, status, change) in changes {
        for (package, buckets) in &change.metadata {
            for bucket in FileStatus::COMPARED {
                for component in buckets.bucket(bucket) {
                    let Some(first) = component.conflicts.first() else {
                        continue;
                    };
                    rows.push(ConflictRow {
                        change: id.clone(),
                        status,
                        package: package.clone(),
                        bucket,
                        component_type: component.component_type.clone(),
                        name: component.name.clone(),
                        others: component.conflicts.iter().map(|r| r.change_id.clone()).collect(),
                        color: first.color.clone(),
                    });
                }
            }
        }
    }
    rows.sort_by(|a, b| a.change.cmp(&b.change).then_with(|| a.package.cmp(&b.package)));
    rows
}

/// Print the conflict table.
pub fn print(report: &PrReport) {
    let rows = collect(report);
    if rows.is_empty() {
        println!();
        println!("{}", style::success("No conflicting components"));
        println!();
        return;
    }

    println!();
    println!(
        "{}",
        style::header(&format!("Conflicting Components ({})", rows.len()))
    );
    println!();

    let mut table = Table::new();
    table.load_preset(UTF8_FULL);
    table.set_content_arrangement(ContentArrangement::Dynamic);
    table.set_header(vec![
        "Change", "State", "Package", "Status", "Type", "Name", "Conflicts With", "Color",
    ]);

    for row in &rows {
        let others = row
            .others
            .iter()
            .map(|id| format!("#{}", id))
            .collect::<Vec<_>>()
            .join(", ");
        let mut color = Cell::new(&row.color);
        if let Some(c) = style::hex_color(&row.color) {
            color = color.fg(c);
        }
        table.add_row(vec![
            Cell::new(format!("#{}", row.change)),
            Cell::new(row.status),
            Cell::new(&row.package),
            Cell::new(row.bucket),
            Cell::new(&row.component_type),
            Cell::new(&row.name),
            Cell::new(others),
            color,
        ]);
    }

    println!("{}", table);
    println!();
}
