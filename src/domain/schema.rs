// ==========================================
// 贷款管理平台 - 导入目标 Schema
// ==========================================
// 职责: 定义客户/贷款导入的目标字段、别名、类型与校验规则
// 用途: ColumnMapper 映射依据 + RowNormalizer 校验依据
// ==========================================

use crate::domain::types::{FieldType, TargetEntityKind};
use serde::{Deserialize, Serialize};

/// 客户字段名
pub mod customer_fields {
    pub const FULL_NAME: &str = "fullName";
    pub const PHONE: &str = "phone";
    pub const EMAIL: &str = "email";
    pub const NRC_NUMBER: &str = "nrcNumber";
    pub const ADDRESS: &str = "address";
    pub const EMPLOYER: &str = "employer";
}

/// 贷款字段名
pub mod loan_fields {
    pub const CUSTOMER_IDENTIFIER: &str = "customerIdentifier";
    pub const AMOUNT: &str = "amount";
    pub const INTEREST_RATE: &str = "interestRate";
    pub const DURATION_MONTHS: &str = "durationMonths";
    pub const LOAN_TYPE: &str = "loanType";
    pub const DISBURSEMENT_DATE: &str = "disbursementDate";
    // 可选的显式客户引用列（覆盖 customerIdentifier 在对应优先级上的取值）
    pub const CUSTOMER_NRC: &str = "customerNrc";
    pub const CUSTOMER_PHONE: &str = "customerPhone";
    pub const CUSTOMER_NAME: &str = "customerName";

    /// 可用于定位客户的全部列
    pub const REFERENCE_FIELDS: [&str; 4] =
        [CUSTOMER_IDENTIFIER, CUSTOMER_NRC, CUSTOMER_PHONE, CUSTOMER_NAME];
}

// ==========================================
// FieldValidator - 字段领域校验规则
// ==========================================
// 在类型转换成功之后执行
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "rule", rename_all = "snake_case")]
pub enum FieldValidator {
    /// 闭区间 [min, max]
    Range { min: f64, max: f64 },
    /// 下限（含）
    Min { min: f64 },
    /// 严格大于 0
    Positive,
    /// 邮箱格式
    Email,
    /// 手机号（数字位数范围）
    Phone { min_digits: usize, max_digits: usize },
    /// 最大字符数
    MaxLength { max: usize },
}

// ==========================================
// FieldSpec - 目标字段定义
// ==========================================
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FieldSpec {
    pub name: String,
    pub field_type: FieldType,
    pub required: bool,
    pub aliases: Vec<String>,
    pub validators: Vec<FieldValidator>,
}

impl FieldSpec {
    pub fn new(name: &str, field_type: FieldType) -> Self {
        Self {
            name: name.to_string(),
            field_type,
            required: false,
            aliases: Vec::new(),
            validators: Vec::new(),
        }
    }

    pub fn required(mut self) -> Self {
        self.required = true;
        self
    }

    pub fn aliases(mut self, aliases: &[&str]) -> Self {
        self.aliases = aliases.iter().map(|a| a.to_string()).collect();
        self
    }

    pub fn validator(mut self, validator: FieldValidator) -> Self {
        self.validators.push(validator);
        self
    }
}

// ==========================================
// TargetSchema - 目标实体 Schema
// ==========================================
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TargetSchema {
    pub kind: TargetEntityKind,
    pub fields: Vec<FieldSpec>,
}

impl TargetSchema {
    /// 获取指定实体类型的内置 Schema
    pub fn for_kind(kind: TargetEntityKind) -> Self {
        match kind {
            TargetEntityKind::Customer => customer_schema(),
            TargetEntityKind::Loan => loan_schema(),
        }
    }

    pub fn field(&self, name: &str) -> Option<&FieldSpec> {
        self.fields.iter().find(|f| f.name == name)
    }

    pub fn required_fields(&self) -> impl Iterator<Item = &FieldSpec> {
        self.fields.iter().filter(|f| f.required)
    }
}

/// 客户导入 Schema
///
/// 必填: fullName, phone, nrcNumber, address
pub fn customer_schema() -> TargetSchema {
    use customer_fields::*;

    TargetSchema {
        kind: TargetEntityKind::Customer,
        fields: vec![
            FieldSpec::new(FULL_NAME, FieldType::Text)
                .required()
                .aliases(&["name", "customer name", "client name", "names", "borrower"])
                .validator(FieldValidator::MaxLength { max: 200 }),
            FieldSpec::new(PHONE, FieldType::Text)
                .required()
                .aliases(&["phone number", "mobile", "mobile number", "cell", "contact", "tel"])
                .validator(FieldValidator::Phone {
                    min_digits: 9,
                    max_digits: 15,
                }),
            FieldSpec::new(EMAIL, FieldType::Text)
                .aliases(&["email address", "e-mail", "mail"])
                .validator(FieldValidator::Email),
            FieldSpec::new(NRC_NUMBER, FieldType::Text)
                .required()
                .aliases(&[
                    "nrc",
                    "nrc no",
                    "national id",
                    "national registration number",
                    "id number",
                    "registration number",
                ]),
            FieldSpec::new(ADDRESS, FieldType::Text)
                .required()
                .aliases(&["physical address", "residential address", "home address", "location"]),
            FieldSpec::new(EMPLOYER, FieldType::Text)
                .aliases(&["employer name", "company", "workplace", "employed by"]),
        ],
    }
}

/// 贷款导入 Schema
///
/// 必填: customerIdentifier, amount, interestRate, durationMonths
pub fn loan_schema() -> TargetSchema {
    use loan_fields::*;

    TargetSchema {
        kind: TargetEntityKind::Loan,
        fields: vec![
            FieldSpec::new(CUSTOMER_IDENTIFIER, FieldType::Text)
                .required()
                .aliases(&["customer", "customer id", "client id", "borrower id", "customer ref"]),
            FieldSpec::new(AMOUNT, FieldType::Number)
                .required()
                .aliases(&["loan amount", "principal", "principal amount", "amount borrowed"])
                .validator(FieldValidator::Positive),
            FieldSpec::new(INTEREST_RATE, FieldType::Number)
                .required()
                .aliases(&["interest", "rate", "interest rate %", "interest percent"])
                .validator(FieldValidator::Range { min: 0.0, max: 100.0 }),
            FieldSpec::new(DURATION_MONTHS, FieldType::Integer)
                .required()
                .aliases(&["duration", "term", "term months", "tenure", "period months", "months"])
                .validator(FieldValidator::Min { min: 1.0 }),
            FieldSpec::new(LOAN_TYPE, FieldType::Text).aliases(&["type", "product", "loan product"]),
            FieldSpec::new(DISBURSEMENT_DATE, FieldType::Date)
                .aliases(&["disbursed", "disbursed on", "disbursement", "start date", "date disbursed"]),
            FieldSpec::new(CUSTOMER_NRC, FieldType::Text)
                .aliases(&["customer nrc", "borrower nrc", "nrc", "national id"]),
            FieldSpec::new(CUSTOMER_PHONE, FieldType::Text)
                .aliases(&["customer phone", "borrower phone", "phone", "mobile"]),
            FieldSpec::new(CUSTOMER_NAME, FieldType::Text)
                .aliases(&["customer name", "borrower name", "full name", "name"]),
        ],
    }
}
