//! Plain-text views printed by the commands.

use api_types::transaction::TransactionType;
use importer::{CategoryCatalog, CategoryRef, StagingSession, UploadedRow};

pub fn preview(session: &StagingSession) -> String {
    let mut lines = Vec::new();
    let source = session.source_file.as_deref().unwrap_or("upload");
    lines.push(format!(
        "Import of {source} for {}: {} row(s)",
        session.timeframe,
        session.rows.len()
    ));
    if let Some(warning) = &session.warning {
        lines.push(format!(
            "warning: {warning} (run `moneysmart refresh` to retry)"
        ));
    }
    if session.rows.is_empty() {
        lines.push("no rows".to_string());
        return lines.join("\n") + "\n";
    }

    lines.push(format!(
        "  {:>3}  {:>10}  {:<7}  {:<10}  {:<6}  {:<28}  note",
        "id", "amount", "type", "date", "paid", "category"
    ));
    for row in session.rows.rows() {
        let mark = if session.failed.as_ref().is_some_and(|failed| failed.row == row.id) {
            'x'
        } else if session.invalid.iter().any(|(id, _)| *id == row.id) {
            '?'
        } else if session.flagged.contains(&row.id) {
            '!'
        } else {
            ' '
        };
        lines.push(format!(
            "{mark} {:>3}  {:>10}  {:<7}  {:<10}  {:<6}  {:<28}  {}",
            row.id,
            row.amount.to_string(),
            row.kind.map(TransactionType::as_str).unwrap_or("-"),
            row.date,
            row.payment_method.map(|method| method.as_str()).unwrap_or("-"),
            category_label(row, &session.catalog),
            row.note
        ));
    }

    if let Some(failed) = &session.failed {
        lines.push(format!("row {} failed: {}", failed.row, failed.message));
    }
    for (row, problem) in &session.invalid {
        lines.push(format!("row {row} is invalid: {problem}"));
    }
    if !session.flagged.is_empty() {
        let ids: Vec<String> = session.flagged.iter().map(ToString::to_string).collect();
        lines.push(format!(
            "{} row(s) need a category: {}",
            ids.len(),
            ids.join(", ")
        ));
    }
    lines.join("\n") + "\n"
}

fn category_label(row: &UploadedRow, catalog: &CategoryCatalog) -> String {
    match &row.category {
        None => "-".to_string(),
        Some(CategoryRef::Income(label)) => label.as_str().to_string(),
        Some(reference) => match catalog.lookup(reference) {
            Some(option) => format!("{} ({})", option.name, option.model.label()),
            None => format!("{reference} (unavailable)"),
        },
    }
}

/// Every value accepted by `assign`, grouped by row type.
pub fn categories(catalog: &CategoryCatalog) -> String {
    let mut lines = Vec::new();
    if let Some(timeframe) = catalog.timeframe() {
        lines.push(format!("Categories for {timeframe}"));
    }
    lines.push("INCOME".to_string());
    for category in catalog.candidates(TransactionType::Income) {
        lines.push(format!("  {category}"));
    }
    lines.push("EXPENSE".to_string());
    if catalog.is_empty() {
        lines.push("  (no budgets or saving goals)".to_string());
    }
    for option in catalog.options() {
        lines.push(format!("  {:<28}  {}", option.reference().to_string(), option.name));
    }
    lines.join("\n") + "\n"
}
