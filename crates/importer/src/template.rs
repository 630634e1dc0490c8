//! Sample upload file offered to users.

use std::io::Write;

pub const TEMPLATE_HEADERS: [&str; 5] = [
    "Amount",
    "Type",
    "Date (YYYY-MM-DD)",
    "Note",
    "Payment Method",
];

const SAMPLE_ROWS: [[&str; 5]; 3] = [
    ["1500", "INCOME", "2025-01-01", "January salary", "CARD"],
    ["45.90", "EXPENSE", "2025-01-03", "Groceries", "CASH"],
    ["120", "EXPENSE", "2025-01-10", "Electricity bill", "CHEQUE"],
];

pub const TEMPLATE_FILE_NAME: &str = "transactions_template.csv";

/// Writes the template CSV (header plus sample rows) to `out`.
pub fn write_template<W: Write>(out: W) -> Result<(), csv::Error> {
    let mut writer = csv::Writer::from_writer(out);
    writer.write_record(TEMPLATE_HEADERS)?;
    for row in SAMPLE_ROWS {
        writer.write_record(row)?;
    }
    writer.flush()?;
    Ok(())
}
