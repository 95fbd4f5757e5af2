// ==========================================
// 贷款管理平台 - 列映射器实现
// ==========================================
// 阶段 1: 源表头 → 目标字段
// 算法: 精确匹配（字段名/别名）→ 相似度匹配（阈值以上取最优）→ 未映射
// 红线: 确定性，同一表头永远得到同一映射；用户覆盖原样采用
// ==========================================

use crate::domain::import_run::{
    ColumnMapping, ColumnMappingOverride, MappedColumn, MappingSource, MappingWarning,
};
use crate::domain::schema::{FieldSpec, TargetSchema};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeSet, HashSet};
use strsim::normalized_levenshtein;
use tracing::debug;

/// 默认相似度阈值
pub const DEFAULT_FUZZY_THRESHOLD: f64 = 0.80;

/// 映射结果 + 告警
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ColumnMappingReport {
    pub mapping: ColumnMapping,
    pub warnings: Vec<MappingWarning>,
}

pub struct ColumnMapper {
    fuzzy_threshold: f64,
}

impl Default for ColumnMapper {
    fn default() -> Self {
        Self::new(DEFAULT_FUZZY_THRESHOLD)
    }
}

/// 表头标准化: 小写，去掉标点与空白
pub fn normalize_header(header: &str) -> String {
    header
        .chars()
        .filter(|c| c.is_alphanumeric())
        .flat_map(|c| c.to_lowercase())
        .collect()
}

/// 分词: 按非字母数字切分，并拆开 camelCase（fullName → full, name）
fn tokenize(text: &str) -> BTreeSet<String> {
    let mut tokens = BTreeSet::new();
    let mut current = String::new();
    let mut prev_lower = false;

    for c in text.chars() {
        if !c.is_alphanumeric() {
            if !current.is_empty() {
                tokens.insert(std::mem::take(&mut current));
            }
            prev_lower = false;
            continue;
        }
        if c.is_uppercase() && prev_lower && !current.is_empty() {
            tokens.insert(std::mem::take(&mut current));
        }
        prev_lower = c.is_lowercase() || c.is_numeric();
        current.extend(c.to_lowercase());
    }
    if !current.is_empty() {
        tokens.insert(current);
    }
    tokens
}

/// 分词重合度（Jaccard）
fn token_overlap(a: &str, b: &str) -> f64 {
    let ta = tokenize(a);
    let tb = tokenize(b);
    if ta.is_empty() || tb.is_empty() {
        return 0.0;
    }
    let intersection = ta.intersection(&tb).count() as f64;
    let union = ta.union(&tb).count() as f64;
    intersection / union
}

impl ColumnMapper {
    pub fn new(fuzzy_threshold: f64) -> Self {
        Self { fuzzy_threshold }
    }

    /// 候选名称: 字段名 + 别名
    fn candidate_names(field: &FieldSpec) -> impl Iterator<Item = &str> {
        std::iter::once(field.name.as_str()).chain(field.aliases.iter().map(|a| a.as_str()))
    }

    /// 表头与字段的相似度（取字段名/别名中的最大值）
    pub fn similarity(&self, header: &str, field: &FieldSpec) -> f64 {
        let normalized = normalize_header(header);
        if normalized.is_empty() {
            return 0.0;
        }
        Self::candidate_names(field)
            .map(|name| {
                let edit = normalized_levenshtein(&normalized, &normalize_header(name));
                let overlap = token_overlap(header, name);
                edit.max(overlap)
            })
            .fold(0.0, f64::max)
    }

    /// 启发式映射
    ///
    /// 第一轮对全部字段做精确匹配，第二轮再对剩余字段做相似度匹配，
    /// 避免前序字段的模糊匹配抢走后序字段的精确列。
    pub fn map_columns(&self, headers: &[String], schema: &TargetSchema) -> ColumnMappingReport {
        let mut used: HashSet<usize> = HashSet::new();
        let mut mapping = ColumnMapping::default();
        let normalized: Vec<String> = headers.iter().map(|h| normalize_header(h)).collect();

        // === 第一轮: 精确匹配 ===
        for field in &schema.fields {
            let names: Vec<String> = Self::candidate_names(field).map(normalize_header).collect();
            let hit = normalized
                .iter()
                .enumerate()
                .find(|(idx, h)| !h.is_empty() && !used.contains(idx) && names.contains(h));

            if let Some((idx, _)) = hit {
                used.insert(idx);
                mapping.fields.insert(
                    field.name.clone(),
                    MappedColumn {
                        source_header: Some(headers[idx].clone()),
                        confidence: 1.0,
                        source: MappingSource::Exact,
                    },
                );
            }
        }

        // === 第二轮: 相似度匹配 ===
        for field in &schema.fields {
            if mapping.fields.contains_key(&field.name) {
                continue;
            }

            let mut best: Option<(usize, f64)> = None;
            for (idx, header) in headers.iter().enumerate() {
                if used.contains(&idx) {
                    continue;
                }
                let score = self.similarity(header, field);
                // 严格大于: 同分时保留更靠前的表头
                if score >= self.fuzzy_threshold && best.map_or(true, |(_, s)| score > s) {
                    best = Some((idx, score));
                }
            }

            let column = match best {
                Some((idx, score)) => {
                    used.insert(idx);
                    debug!(field = %field.name, header = %headers[idx], score, "相似度匹配");
                    MappedColumn {
                        source_header: Some(headers[idx].clone()),
                        confidence: score,
                        source: MappingSource::Fuzzy,
                    }
                }
                None => MappedColumn::unmapped(),
            };
            mapping.fields.insert(field.name.clone(), column);
        }

        let warnings = Self::required_warnings(&mapping, schema);
        ColumnMappingReport { mapping, warnings }
    }

    /// 采用用户确认的映射（原样使用，不走启发式）
    pub fn apply_override(
        &self,
        headers: &[String],
        schema: &TargetSchema,
        overrides: &ColumnMappingOverride,
    ) -> ColumnMappingReport {
        let mut mapping = ColumnMapping::default();
        let mut warnings = Vec::new();

        for field in &schema.fields {
            let column = match overrides.get(&field.name) {
                Some(Some(header)) => {
                    if !headers.iter().any(|h| h == header) {
                        warnings.push(MappingWarning::OverrideHeaderNotFound {
                            field: field.name.clone(),
                            header: header.clone(),
                        });
                    }
                    MappedColumn {
                        source_header: Some(header.clone()),
                        confidence: 1.0,
                        source: MappingSource::Override,
                    }
                }
                _ => MappedColumn::unmapped(),
            };
            mapping.fields.insert(field.name.clone(), column);
        }

        warnings.extend(Self::required_warnings(&mapping, schema));
        ColumnMappingReport { mapping, warnings }
    }

    fn required_warnings(mapping: &ColumnMapping, schema: &TargetSchema) -> Vec<MappingWarning> {
        schema
            .required_fields()
            .filter(|f| !mapping.is_mapped(&f.name))
            .map(|f| MappingWarning::RequiredFieldUnmapped {
                field: f.name.clone(),
            })
            .collect()
    }
}
