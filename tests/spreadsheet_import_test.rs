// ==========================================
// 电子表格导入测试
// ==========================================
// 测试目标: xlsx 首个工作表读取、整数浮点格式、日期单元格、空白行编号
// ==========================================


use chrono::NaiveDate;
use loan_import::config::ImportSettings;
use loan_import::domain::{FieldValue, TargetEntityKind};
use loan_import::importer::{CommitStrategy, EntityImporter, ImportRequest, UniversalFileParser};
use loan_import::logging;
use std::sync::Arc;
use test_helpers::*;

fn customer_workbook() -> Vec<u8> {
    xlsx_bytes(&[
        XlsxSheet {
            name: "Customers",
            rows: vec![
                Some(vec![
                    XlsxCell::Text("Full Name"),
                    XlsxCell::Text("Phone"),
                    XlsxCell::Text("NRC"),
                    XlsxCell::Text("Joined"),
                ]),
                Some(vec![
                    XlsxCell::Text("Jane Doe"),
                    XlsxCell::Number(260970000001.0),
                    XlsxCell::Text("111111/11/1"),
                    XlsxCell::Date(45658.0),
                ]),
                None,
                Some(vec![
                    XlsxCell::Text("John Banda"),
                    XlsxCell::Number(260970000003.0),
                    XlsxCell::Text("333333/33/3"),
                    XlsxCell::Number(12.5),
                ]),
            ],
        },
        XlsxSheet {
            name: "Notes",
            rows: vec![
                Some(vec![XlsxCell::Text("Comment")]),
                Some(vec![XlsxCell::Text("ignore me")]),
            ],
        },
    ])
}

#[test]
fn test_first_sheet_headers_and_row_numbers() {
    let parsed = UniversalFileParser
        .parse("customers.xlsx", &customer_workbook())
        .expect("workbook should parse");

    assert_eq!(parsed.headers, vec!["Full Name", "Phone", "NRC", "Joined"]);

    let indexes: Vec<usize> = parsed.rows.iter().map(|r| r.row_index).collect();
    assert_eq!(indexes, vec![1, 3]);
    assert!(parsed.rows.iter().all(|r| r.get("Comment").is_none()));
}

#[test]
fn test_numeric_cells_render_without_fraction() {
    let parsed = UniversalFileParser
        .parse("customers.xlsx", &customer_workbook())
        .unwrap();

    assert_eq!(parsed.rows[0].get("Phone"), Some("260970000001"));
    assert_eq!(parsed.rows[0].get("NRC"), Some("111111/11/1"));
    assert_eq!(parsed.rows[1].get("Joined"), Some("12.5"));
}

#[test]
fn test_date_cell_renders_as_serial() {
    let parsed = UniversalFileParser
        .parse("customers.xlsx", &customer_workbook())
        .unwrap();

    assert_eq!(parsed.rows[0].get("Joined"), Some("45658"));
}

#[test]
fn test_spreadsheet_detected_by_content_not_extension() {
    let parsed = UniversalFileParser
        .parse("customers.csv", &customer_workbook())
        .unwrap();

    assert_eq!(parsed.row_count(), 2);
}

#[tokio::test]
async fn test_loan_workbook_import_end_to_end() {
    logging::init_test();

    let bytes = xlsx_bytes(&[XlsxSheet {
        name: "Loans",
        rows: vec![
            Some(vec![
                XlsxCell::Text("Customer ID"),
                XlsxCell::Text("Amount"),
                XlsxCell::Text("Interest Rate"),
                XlsxCell::Text("Duration Months"),
                XlsxCell::Text("Disbursement Date"),
            ]),
            Some(vec![
                XlsxCell::Text("cust-a"),
                XlsxCell::Number(5000.0),
                XlsxCell::Number(12.0),
                XlsxCell::Number(6.0),
                XlsxCell::Date(45658.0),
            ]),
        ],
    }]);

    let creator = Arc::new(RecordingCreator::new());
    let importer = EntityImporter::new(
        Arc::new(FakeCustomerLookup::standard()),
        CommitStrategy::PerRow(creator.clone()),
        Arc::new(MemoryRunRepo::new()),
        ImportSettings::default(),
    );

    let request = ImportRequest::new("agency-1", "user-1", "loans.xlsx", bytes, TargetEntityKind::Loan);
    let result = importer.import(request).await.unwrap();

    assert_eq!(result.success_count, 1, "{:?}", result.error_messages());
    let draft = creator.draft_for(1).expect("row 1 should be committed");
    assert_eq!(draft.fields["amount"], FieldValue::Number(5000.0));
    assert_eq!(draft.fields["durationMonths"], FieldValue::Integer(6));
    assert_eq!(
        draft.fields["disbursementDate"],
        FieldValue::Date(NaiveDate::from_ymd_opt(2025, 1, 1).unwrap())
    );
    assert_eq!(draft.customer.unwrap().entity_id, "cust-a");
}
