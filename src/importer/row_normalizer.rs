// ==========================================
// 贷款管理平台 - 行标准化器实现
// ==========================================
// 阶段 2: RawRow + ColumnMapping + Schema → NormalizedRow
// 规则顺序: TRIM → 类型转换 → 必填检查 → 领域校验
// 红线: 一行的全部错误一次性收集，不在第一个错误处中断
// 红线: 原始字符串行不得越过本阶段
// ==========================================

use crate::domain::import_run::{
    ColumnMapping, FieldError, FieldValue, NormalizedFields, NormalizedRow, RawRow,
};
use crate::domain::schema::{loan_fields, FieldSpec, FieldValidator, TargetSchema};
use crate::domain::types::FieldType;
use crate::importer::data_cleaner::DataCleaner;

pub struct RowNormalizer {
    cleaner: DataCleaner,
}

impl Default for RowNormalizer {
    fn default() -> Self {
        Self::new(DataCleaner::default())
    }
}

impl RowNormalizer {
    pub fn new(cleaner: DataCleaner) -> Self {
        Self { cleaner }
    }

    /// 标准化单行
    ///
    /// 未映射的字段不参与必填检查（已在映射阶段作为告警交由用户确认）。
    /// 例外: 贷款行的 customerIdentifier 由任一客户引用列满足，
    /// 全部引用列都没有值时记为缺失，该行不会进入匹配阶段。
    pub fn normalize(
        &self,
        row: &RawRow,
        mapping: &ColumnMapping,
        schema: &TargetSchema,
    ) -> NormalizedRow {
        let mut fields = NormalizedFields::new();
        let mut errors = Vec::new();

        let has_reference =
            schema.kind.requires_reference() && self.has_customer_reference(row, mapping);

        for spec in &schema.fields {
            let is_reference_slot = schema.kind.requires_reference()
                && spec.name == loan_fields::CUSTOMER_IDENTIFIER;

            let header = match mapping.header_for(&spec.name) {
                Some(h) => h,
                None => {
                    if is_reference_slot && !has_reference {
                        errors.push(FieldError::missing(&spec.name));
                    }
                    continue;
                }
            };

            let raw = self.cleaner.normalize_null(row.get(header));
            let raw = match raw {
                Some(v) => v,
                None => {
                    let satisfied = is_reference_slot && has_reference;
                    if spec.required && !satisfied {
                        errors.push(FieldError::missing(&spec.name));
                    }
                    continue;
                }
            };

            match self.coerce(spec, &raw) {
                Ok(value) => {
                    errors.extend(self.validate(spec, &value));
                    fields.insert(spec.name.clone(), value);
                }
                Err(err) => errors.push(err),
            }
        }

        NormalizedRow {
            row_index: row.row_index,
            fields,
            errors,
        }
    }

    /// 批量标准化（无共享可变状态，可切片并行）
    pub fn normalize_all(
        &self,
        rows: &[RawRow],
        mapping: &ColumnMapping,
        schema: &TargetSchema,
    ) -> Vec<NormalizedRow> {
        rows.iter()
            .map(|row| self.normalize(row, mapping, schema))
            .collect()
    }

    /// 任一已映射的客户引用列有值
    fn has_customer_reference(&self, row: &RawRow, mapping: &ColumnMapping) -> bool {
        loan_fields::REFERENCE_FIELDS.iter().any(|field| {
            mapping
                .header_for(field)
                .and_then(|header| self.cleaner.normalize_null(row.get(header)))
                .is_some()
        })
    }

    fn coerce(&self, spec: &FieldSpec, raw: &str) -> Result<FieldValue, FieldError> {
        match spec.field_type {
            FieldType::Text => Ok(FieldValue::Text(self.cleaner.clean_text(raw))),
            FieldType::Number => self
                .cleaner
                .parse_number(raw)
                .map(FieldValue::Number)
                .ok_or_else(|| FieldError::bad_value(&spec.name, raw, "a number")),
            FieldType::Integer => self
                .cleaner
                .parse_integer(raw)
                .map(FieldValue::Integer)
                .ok_or_else(|| FieldError::bad_value(&spec.name, raw, "a whole number")),
            FieldType::Date => self
                .cleaner
                .parse_date(raw)
                .map(FieldValue::Date)
                .ok_or_else(|| FieldError::bad_value(&spec.name, raw, "a date")),
        }
    }

    fn validate(&self, spec: &FieldSpec, value: &FieldValue) -> Vec<FieldError> {
        let name = spec.name.as_str();
        let mut errors = Vec::new();

        for validator in &spec.validators {
            match (validator, value) {
                (FieldValidator::Range { min, max }, v) => {
                    if let Some(n) = v.as_number() {
                        if n < *min || n > *max {
                            errors.push(FieldError::out_of_range(
                                name,
                                format!("{} must be between {} and {}", name, min, max),
                            ));
                        }
                    }
                }
                (FieldValidator::Min { min }, v) => {
                    if let Some(n) = v.as_number() {
                        if n < *min {
                            errors.push(FieldError::out_of_range(
                                name,
                                format!("{} must be at least {}", name, min),
                            ));
                        }
                    }
                }
                (FieldValidator::Positive, v) => {
                    if let Some(n) = v.as_number() {
                        if n <= 0.0 {
                            errors.push(FieldError::out_of_range(
                                name,
                                format!("{} must be greater than 0", name),
                            ));
                        }
                    }
                }
                (FieldValidator::Email, FieldValue::Text(s)) => {
                    if !self.cleaner.is_valid_email(s) {
                        errors.push(FieldError::bad_value(name, s, "an e-mail address"));
                    }
                }
                (
                    FieldValidator::Phone {
                        min_digits,
                        max_digits,
                    },
                    FieldValue::Text(s),
                ) => {
                    let normalized = self.cleaner.normalize_phone(s);
                    let digits = normalized.trim_start_matches('+').len();
                    let has_letters = s.chars().any(|c| c.is_alphabetic());
                    if has_letters || digits < *min_digits || digits > *max_digits {
                        errors.push(FieldError::bad_value(name, s, "a phone number"));
                    }
                }
                (FieldValidator::MaxLength { max }, FieldValue::Text(s)) => {
                    if s.chars().count() > *max {
                        errors.push(FieldError::out_of_range(
                            name,
                            format!("{} must be at most {} characters", name, max),
                        ));
                    }
                }
                _ => {}
            }
        }

        errors
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::import_run::FieldErrorKind;
    use crate::domain::schema::{customer_schema, loan_schema};
    use crate::importer::column_mapper::ColumnMapper;

    fn raw_row(index: usize, cells: &[(&str, &str)]) -> RawRow {
        RawRow {
            row_index: index,
            cells: cells
                .iter()
                .map(|(h, v)| (h.to_string(), v.to_string()))
                .collect(),
        }
    }

    fn mapping_for(headers: &[&str], schema: &TargetSchema) -> ColumnMapping {
        let headers: Vec<String> = headers.iter().map(|h| h.to_string()).collect();
        ColumnMapper::default().map_columns(&headers, schema).mapping
    }

    #[test]
    fn test_clean_customer_row() {
        let schema = customer_schema();
        let mapping = mapping_for(&["Full Name", "Phone", "NRC"], &schema);
        let row = raw_row(
            1,
            &[
                ("Full Name", "  Jane Doe "),
                ("Phone", "+260970000000"),
                ("NRC", "123456/78/9"),
            ],
        );

        let normalized = RowNormalizer::default().normalize(&row, &mapping, &schema);

        assert!(normalized.is_clean(), "{:?}", normalized.errors);
        assert_eq!(normalized.text("fullName"), Some("Jane Doe"));
        assert_eq!(normalized.text("nrcNumber"), Some("123456/78/9"));
    }

    #[test]
    fn test_missing_required_field() {
        let schema = customer_schema();
        let mapping = mapping_for(&["Full Name", "Phone", "NRC"], &schema);
        let row = raw_row(
            2,
            &[("Full Name", ""), ("Phone", "+260971111111"), ("NRC", "234567/89/0")],
        );

        let normalized = RowNormalizer::default().normalize(&row, &mapping, &schema);

        assert_eq!(normalized.errors.len(), 1);
        assert_eq!(normalized.errors[0].kind, FieldErrorKind::MissingField);
        assert_eq!(
            normalized.to_row_error().unwrap().to_string(),
            "Row 2: fullName is required"
        );
    }

    #[test]
    fn test_loan_row_coercion() {
        let schema = loan_schema();
        let mapping = mapping_for(
            &["Customer ID", "Loan Amount", "Interest Rate", "Duration", "Disbursement Date"],
            &schema,
        );
        let row = raw_row(
            1,
            &[
                ("Customer ID", "cust-1"),
                ("Loan Amount", "K 12,500.00"),
                ("Interest Rate", "15%"),
                ("Duration", "12"),
                ("Disbursement Date", "01/02/2025"),
            ],
        );

        let normalized = RowNormalizer::default().normalize(&row, &mapping, &schema);

        assert!(normalized.is_clean(), "{:?}", normalized.errors);
        assert_eq!(normalized.fields["amount"], FieldValue::Number(12500.0));
        assert_eq!(normalized.fields["interestRate"], FieldValue::Number(15.0));
        assert_eq!(normalized.fields["durationMonths"], FieldValue::Integer(12));
        assert_eq!(
            normalized.fields["disbursementDate"],
            FieldValue::Date(chrono::NaiveDate::from_ymd_opt(2025, 2, 1).unwrap())
        );
    }

    #[test]
    fn test_all_errors_collected() {
        let schema = loan_schema();
        let mapping = mapping_for(
            &["Customer ID", "Loan Amount", "Interest Rate", "Duration"],
            &schema,
        );
        let row = raw_row(
            5,
            &[
                ("Customer ID", ""),
                ("Loan Amount", "lots"),
                ("Interest Rate", "150"),
                ("Duration", "0"),
            ],
        );

        let normalized = RowNormalizer::default().normalize(&row, &mapping, &schema);

        let fields: Vec<&str> = normalized.errors.iter().map(|e| e.field.as_str()).collect();
        assert_eq!(
            fields,
            vec!["customerIdentifier", "amount", "interestRate", "durationMonths"]
        );
        let message = normalized.to_row_error().unwrap().to_string();
        assert!(message.starts_with("Row 5: customerIdentifier is required; "));
        assert!(message.contains("interestRate must be between 0 and 100"));
        assert!(message.contains("durationMonths must be at least 1"));
    }

    #[test]
    fn test_invalid_email_and_phone() {
        let schema = customer_schema();
        let mapping = mapping_for(&["Full Name", "Phone", "Email"], &schema);
        let row = raw_row(
            3,
            &[
                ("Full Name", "Jane Doe"),
                ("Phone", "call me"),
                ("Email", "jane-at-example"),
            ],
        );

        let normalized = RowNormalizer::default().normalize(&row, &mapping, &schema);

        let fields: Vec<&str> = normalized.errors.iter().map(|e| e.field.as_str()).collect();
        assert_eq!(fields, vec!["phone", "email"]);
    }

    #[test]
    fn test_loan_row_without_reference_columns() {
        let schema = loan_schema();
        let mapping = mapping_for(&["Amount", "Interest Rate", "Duration Months"], &schema);
        let row = raw_row(
            1,
            &[("Amount", "5000"), ("Interest Rate", "12"), ("Duration Months", "6")],
        );

        let normalized = RowNormalizer::default().normalize(&row, &mapping, &schema);

        assert_eq!(normalized.errors.len(), 1);
        assert_eq!(normalized.errors[0].kind, FieldErrorKind::MissingField);
        assert_eq!(
            normalized.to_row_error().unwrap().to_string(),
            "Row 1: customerIdentifier is required"
        );
    }

    #[test]
    fn test_explicit_reference_column_satisfies_identifier() {
        let schema = loan_schema();
        let mapping = mapping_for(
            &["Customer ID", "Customer NRC", "Amount", "Interest Rate", "Duration Months"],
            &schema,
        );
        assert!(mapping.is_mapped(loan_fields::CUSTOMER_NRC));
        let row = raw_row(
            4,
            &[
                ("Customer ID", ""),
                ("Customer NRC", "111111/11/1"),
                ("Amount", "5000"),
                ("Interest Rate", "12"),
                ("Duration Months", "6"),
            ],
        );

        let normalized = RowNormalizer::default().normalize(&row, &mapping, &schema);

        assert!(normalized.is_clean(), "{:?}", normalized.errors);
        assert_eq!(normalized.text(loan_fields::CUSTOMER_NRC), Some("111111/11/1"));
    }
}
