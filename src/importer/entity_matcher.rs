// ==========================================
// 贷款管理平台 - 实体匹配器实现
// ==========================================
// 阶段 3: 贷款行 → 已落库客户引用
// 优先级: 客户 ID > 证件号(NRC) > 手机号 > 姓名（大小写不敏感精确匹配）
// 红线: 高优先级命中后不被低优先级覆盖；多个候选一律失败，不猜测
// 红线: 只读，不创建客户；查询只通过注入的 CustomerLookup
// ==========================================

use crate::domain::import_run::{MatchCandidate, NormalizedRow};
use crate::domain::schema::loan_fields;
use crate::domain::types::IdentifierKind;
use crate::importer::data_cleaner::DataCleaner;
use crate::importer::error::MatchError;
use crate::importer::import_trait::{CustomerLookup, LookupOutcome};
use futures::stream::{self, StreamExt};
use std::sync::Arc;
use tracing::{debug, warn};

/// 匹配方式对应的置信度
fn confidence_for(kind: IdentifierKind) -> f64 {
    match kind {
        IdentifierKind::EntityId => 1.0,
        IdentifierKind::NationalId => 0.95,
        IdentifierKind::Phone => 0.9,
        IdentifierKind::FullName => 0.75,
    }
}

pub struct EntityMatcher {
    lookup: Arc<dyn CustomerLookup>,
    cleaner: DataCleaner,
}

impl EntityMatcher {
    pub fn new(lookup: Arc<dyn CustomerLookup>) -> Self {
        Self {
            lookup,
            cleaner: DataCleaner::default(),
        }
    }

    /// 按优先级列出本行可用的识别值
    ///
    /// 显式列（customerNrc / customerPhone / customerName）优先于通用的
    /// customerIdentifier；通用值会在每个优先级上都尝试一次。
    pub fn identifier_candidates(&self, row: &NormalizedRow) -> Vec<(IdentifierKind, String)> {
        let generic = row.text(loan_fields::CUSTOMER_IDENTIFIER);

        IdentifierKind::PRIORITY
            .iter()
            .filter_map(|kind| {
                let explicit = match kind {
                    IdentifierKind::EntityId => None,
                    IdentifierKind::NationalId => row.text(loan_fields::CUSTOMER_NRC),
                    IdentifierKind::Phone => row.text(loan_fields::CUSTOMER_PHONE),
                    IdentifierKind::FullName => row.text(loan_fields::CUSTOMER_NAME),
                };
                let value = explicit.or(generic)?.trim();

                let value = match kind {
                    IdentifierKind::Phone => {
                        let phone = self.cleaner.normalize_phone(value);
                        // 没有数字的值不可能是手机号
                        if phone.trim_start_matches('+').is_empty() {
                            return None;
                        }
                        phone
                    }
                    _ => value.to_string(),
                };

                if value.is_empty() {
                    None
                } else {
                    Some((*kind, value))
                }
            })
            .collect()
    }

    /// 解析单行的客户引用
    pub async fn resolve(
        &self,
        agency_id: &str,
        row: &NormalizedRow,
    ) -> Result<MatchCandidate, MatchError> {
        let candidates = self.identifier_candidates(row);
        if candidates.is_empty() {
            return Err(MatchError::MissingIdentifier);
        }

        for (kind, value) in &candidates {
            let outcome = self
                .lookup
                .find_customer_by_identifier(agency_id, *kind, value)
                .await
                .map_err(|e| {
                    warn!(row_index = row.row_index, kind = %kind, error = %e, "客户查询失败");
                    MatchError::LookupFailed {
                        kind: *kind,
                        value: value.clone(),
                        message: e.to_string(),
                    }
                })?;

            match outcome {
                LookupOutcome::NotFound => continue,
                LookupOutcome::Found(customer) => {
                    debug!(row_index = row.row_index, kind = %kind, customer_id = %customer.id, "客户匹配成功");
                    return Ok(MatchCandidate {
                        entity_id: customer.id,
                        confidence: confidence_for(*kind),
                        matched_by: *kind,
                        matched_value: value.clone(),
                    });
                }
                LookupOutcome::Ambiguous(count) => {
                    return Err(MatchError::Ambiguous {
                        kind: *kind,
                        value: value.clone(),
                        count,
                    });
                }
            }
        }

        let identifier = row
            .text(loan_fields::CUSTOMER_IDENTIFIER)
            .map(|s| s.to_string())
            .unwrap_or_else(|| {
                candidates
                    .iter()
                    .map(|(_, v)| v.as_str())
                    .collect::<Vec<_>>()
                    .join(", ")
            });
        Err(MatchError::CustomerNotFound { identifier })
    }

    /// 并发解析多行（只读，保持输入顺序，最多 `concurrency` 个查询在途）
    pub async fn resolve_rows(
        &self,
        agency_id: &str,
        rows: Vec<NormalizedRow>,
        concurrency: usize,
    ) -> Vec<(NormalizedRow, Result<MatchCandidate, MatchError>)> {
        stream::iter(rows)
            .map(|row| async move {
                let result = self.resolve(agency_id, &row).await;
                (row, result)
            })
            .buffered(concurrency.max(1))
            .collect()
            .await
    }
}
