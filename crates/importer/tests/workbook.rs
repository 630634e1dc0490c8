use std::path::PathBuf;

use api_types::transaction::{PaymentMethod, TransactionType};
use importer::{Amount, DecodeError, Decoder, DroppedFile, FileFormat, RowId, filter_dropped};

fn fixture(name: &str) -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR"))
        .join("tests")
        .join("fixtures")
        .join(name)
}

#[test]
fn xlsx_rows_are_decoded_like_csv_rows() {
    let selection = filter_dropped([DroppedFile::new(fixture("march.xlsx"))]);
    assert_eq!(selection.accepted[0].format, FileFormat::Workbook);

    let rows = Decoder::default().decode_first(&selection.accepted).unwrap();

    assert_eq!(
        rows.iter().map(|row| row.id).collect::<Vec<_>>(),
        vec![RowId(0), RowId(1), RowId(2)]
    );

    // 45.9 typed as a number, date as a serial
    assert_eq!(rows[0].amount, Amount::new(4_590));
    assert_eq!(rows[0].kind, Some(TransactionType::Expense));
    assert_eq!(rows[0].date, "2025-03-05");
    assert_eq!(rows[0].note, "Groceries");
    assert_eq!(rows[0].payment_method, Some(PaymentMethod::Cash));

    // ISO date cell, empty note
    assert_eq!(rows[1].amount, Amount::new(150_000));
    assert_eq!(rows[1].kind, Some(TransactionType::Income));
    assert_eq!(rows[1].date, "2025-03-10");
    assert_eq!(rows[1].note, "");
    assert_eq!(rows[1].payment_method, Some(PaymentMethod::Card));

    // amounts round to cents, a time of day is dropped
    assert_eq!(rows[2].amount, Amount::new(12_046));
    assert_eq!(rows[2].date, "2025-03-31");
    assert_eq!(rows[2].note, "Electricity bill");
    assert_eq!(rows[2].payment_method, Some(PaymentMethod::Cheque));
}

#[test]
fn error_cell_fails_the_whole_workbook() {
    let err = Decoder::default()
        .decode_path(&fixture("broken.xlsx"))
        .unwrap_err();

    match err {
        DecodeError::Cell {
            line,
            column,
            message,
        } => {
            assert_eq!(line, 3);
            assert_eq!(column, "amount");
            assert!(message.contains("Div0"), "{message}");
        }
        other => panic!("unexpected error: {other}"),
    }
}
