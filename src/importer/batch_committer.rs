// ==========================================
// 贷款管理平台 - 批量提交器实现
// ==========================================
// 阶段 4: EntityDraft → 注入的创建函数
// 红线: 行级故障隔离，一行/一块失败不影响其余行/块
// 红线: 分块大小不超过后端硬上限；在途块数有固定上限，不做无界并发
// 红线: 同一运行内每行最多提交一次
// ==========================================

use crate::domain::import_run::EntityDraft;
use crate::importer::error::CommitError;
use crate::importer::import_trait::{BatchEntityWriter, BatchWriteOutcome, EntityCreator};
use futures::stream::{self, StreamExt};
use std::collections::HashSet;
use std::sync::Arc;
use tracing::{debug, info, warn};

/// 提交方式
#[derive(Clone)]
pub enum CommitStrategy {
    /// 逐行调用 create_entity
    PerRow(Arc<dyn EntityCreator>),
    /// 按块调用批量写入
    Batched(Arc<dyn BatchEntityWriter>),
}

/// 提交结果（均按行号排序）
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CommitReport {
    pub created: Vec<(usize, String)>,
    pub failures: Vec<(usize, CommitError)>,
}

pub struct BatchCommitter {
    strategy: CommitStrategy,
    batch_size_limit: usize,
    max_in_flight: usize,
}

impl BatchCommitter {
    /// # 参数
    /// - strategy: 提交方式
    /// - batch_size_limit: 配置的单块上限（与后端上限取较小值）
    /// - max_in_flight: 同时在途的块（或行）数上限
    pub fn new(strategy: CommitStrategy, batch_size_limit: usize, max_in_flight: usize) -> Self {
        Self {
            strategy,
            batch_size_limit: batch_size_limit.max(1),
            max_in_flight: max_in_flight.max(1),
        }
    }

    /// 实际使用的分块大小
    pub fn chunk_size(&self) -> usize {
        match &self.strategy {
            CommitStrategy::PerRow(_) => 1,
            CommitStrategy::Batched(writer) => {
                writer.max_batch_size().min(self.batch_size_limit).max(1)
            }
        }
    }

    pub async fn commit(&self, agency_id: &str, drafts: Vec<EntityDraft>) -> CommitReport {
        let mut report = CommitReport::default();

        // 去重: 同一行号只允许提交一次
        let mut seen = HashSet::new();
        let mut unique = Vec::with_capacity(drafts.len());
        for draft in drafts {
            if seen.insert(draft.row_index) {
                unique.push(draft);
            } else {
                warn!(row_index = draft.row_index, "重复提交被拒绝");
                report.failures.push((draft.row_index, CommitError::Duplicate));
            }
        }

        let outcomes = match &self.strategy {
            CommitStrategy::PerRow(creator) => self.commit_per_row(agency_id, creator, unique).await,
            CommitStrategy::Batched(writer) => self.commit_batched(agency_id, writer, unique).await,
        };

        for (row_index, outcome) in outcomes {
            match outcome {
                Ok(id) => report.created.push((row_index, id)),
                Err(err) => report.failures.push((row_index, err)),
            }
        }

        report.created.sort_by_key(|(idx, _)| *idx);
        report.failures.sort_by_key(|(idx, _)| *idx);

        info!(
            created = report.created.len(),
            failed = report.failures.len(),
            "提交阶段完成"
        );
        report
    }

    async fn commit_per_row(
        &self,
        agency_id: &str,
        creator: &Arc<dyn EntityCreator>,
        drafts: Vec<EntityDraft>,
    ) -> Vec<(usize, Result<String, CommitError>)> {
        stream::iter(drafts)
            .map(|draft| {
                let creator = Arc::clone(creator);
                async move {
                    let outcome = creator
                        .create_entity(agency_id, &draft)
                        .await
                        .map(|created| created.id)
                        .map_err(|e| {
                            warn!(row_index = draft.row_index, error = %e, "实体创建失败");
                            CommitError::Row(e.to_string())
                        });
                    (draft.row_index, outcome)
                }
            })
            .buffer_unordered(self.max_in_flight)
            .collect()
            .await
    }

    async fn commit_batched(
        &self,
        agency_id: &str,
        writer: &Arc<dyn BatchEntityWriter>,
        drafts: Vec<EntityDraft>,
    ) -> Vec<(usize, Result<String, CommitError>)> {
        let chunk_size = self.chunk_size();

        let mut chunks: Vec<Vec<EntityDraft>> = Vec::new();
        let mut iter = drafts.into_iter().peekable();
        while iter.peek().is_some() {
            chunks.push(iter.by_ref().take(chunk_size).collect());
        }

        debug!(chunks = chunks.len(), chunk_size, "开始分块提交");

        let results: Vec<Vec<(usize, Result<String, CommitError>)>> =
            stream::iter(chunks.into_iter().enumerate())
                .map(|(chunk_no, chunk)| {
                    let writer = Arc::clone(writer);
                    async move {
                        let outcome = writer.write_batch(agency_id, &chunk).await;
                        Self::attribute(chunk_no, &chunk, outcome)
                    }
                })
                .buffer_unordered(self.max_in_flight)
                .collect()
                .await;

        results.into_iter().flatten().collect()
    }

    /// 将块级结果归属到块内每一行
    fn attribute(
        chunk_no: usize,
        chunk: &[EntityDraft],
        outcome: anyhow::Result<BatchWriteOutcome>,
    ) -> Vec<(usize, Result<String, CommitError>)> {
        let chunk_failure = |message: String| -> Vec<(usize, Result<String, CommitError>)> {
            warn!(chunk_no, rows = chunk.len(), error = %message, "块提交失败");
            chunk
                .iter()
                .map(|d| (d.row_index, Err(CommitError::Chunk(message.clone()))))
                .collect()
        };

        match outcome {
            Err(e) => chunk_failure(e.to_string()),
            Ok(BatchWriteOutcome::AllCreated(ids)) => {
                if ids.len() != chunk.len() {
                    return chunk_failure(format!(
                        "batch writer returned {} ids for {} rows",
                        ids.len(),
                        chunk.len()
                    ));
                }
                debug!(chunk_no, rows = chunk.len(), "块提交成功");
                chunk
                    .iter()
                    .zip(ids)
                    .map(|(d, id)| (d.row_index, Ok(id)))
                    .collect()
            }
            Ok(BatchWriteOutcome::PerRow(results)) => {
                if results.len() != chunk.len() {
                    return chunk_failure(format!(
                        "batch writer returned {} results for {} rows",
                        results.len(),
                        chunk.len()
                    ));
                }
                chunk
                    .iter()
                    .zip(results)
                    .map(|(d, r)| (d.row_index, r.map_err(CommitError::Row)))
                    .collect()
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::import_run::{CreatedEntity, NormalizedFields};
    use crate::domain::types::TargetEntityKind;
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Mutex;

    fn draft(row_index: usize) -> EntityDraft {
        EntityDraft {
            row_index,
            kind: TargetEntityKind::Customer,
            fields: NormalizedFields::new(),
            customer: None,
        }
    }

    struct FailingOddCreator;

    #[async_trait]
    impl EntityCreator for FailingOddCreator {
        async fn create_entity(
            &self,
            _agency_id: &str,
            draft: &EntityDraft,
        ) -> anyhow::Result<CreatedEntity> {
            if draft.row_index % 2 == 1 {
                anyhow::bail!("duplicate NRC");
            }
            Ok(CreatedEntity {
                id: format!("id-{}", draft.row_index),
            })
        }
    }

    struct PerRowWriter;

    #[async_trait]
    impl BatchEntityWriter for PerRowWriter {
        fn max_batch_size(&self) -> usize {
            10
        }

        async fn write_batch(
            &self,
            _agency_id: &str,
            drafts: &[EntityDraft],
        ) -> anyhow::Result<BatchWriteOutcome> {
            Ok(BatchWriteOutcome::PerRow(
                drafts
                    .iter()
                    .map(|d| {
                        if d.row_index == 2 {
                            Err("rejected by backend".to_string())
                        } else {
                            Ok(format!("id-{}", d.row_index))
                        }
                    })
                    .collect(),
            ))
        }
    }

    struct CountingWriter {
        ceiling: usize,
        calls: AtomicUsize,
        sizes: Mutex<Vec<usize>>,
    }

    #[async_trait]
    impl BatchEntityWriter for CountingWriter {
        fn max_batch_size(&self) -> usize {
            self.ceiling
        }

        async fn write_batch(
            &self,
            _agency_id: &str,
            drafts: &[EntityDraft],
        ) -> anyhow::Result<BatchWriteOutcome> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            self.sizes.lock().unwrap().push(drafts.len());
            Ok(BatchWriteOutcome::AllCreated(
                drafts.iter().map(|d| format!("id-{}", d.row_index)).collect(),
            ))
        }
    }

    #[tokio::test]
    async fn test_per_row_failures_are_isolated() {
        let committer = BatchCommitter::new(CommitStrategy::PerRow(Arc::new(FailingOddCreator)), 400, 4);

        let report = committer.commit("agency-1", (1..=6).map(draft).collect()).await;

        let created: Vec<usize> = report.created.iter().map(|(i, _)| *i).collect();
        let failed: Vec<usize> = report.failures.iter().map(|(i, _)| *i).collect();
        assert_eq!(created, vec![2, 4, 6]);
        assert_eq!(failed, vec![1, 3, 5]);
        assert_eq!(
            report.failures[0].1,
            CommitError::Row("duplicate NRC".to_string())
        );
    }

    #[tokio::test]
    async fn test_per_row_outcomes_from_batch_writer() {
        let committer = BatchCommitter::new(CommitStrategy::Batched(Arc::new(PerRowWriter)), 400, 2);

        let report = committer.commit("agency-1", (1..=3).map(draft).collect()).await;

        assert_eq!(report.created.len(), 2);
        assert_eq!(
            report.failures,
            vec![(2, CommitError::Row("rejected by backend".to_string()))]
        );
    }

    #[tokio::test]
    async fn test_chunk_size_respects_smaller_ceiling() {
        let writer = Arc::new(CountingWriter {
            ceiling: 3,
            calls: AtomicUsize::new(0),
            sizes: Mutex::new(Vec::new()),
        });
        let committer = BatchCommitter::new(CommitStrategy::Batched(writer.clone()), 400, 2);

        assert_eq!(committer.chunk_size(), 3);
        let report = committer.commit("agency-1", (1..=7).map(draft).collect()).await;

        assert_eq!(writer.calls.load(Ordering::SeqCst), 3);
        let mut sizes = writer.sizes.lock().unwrap().clone();
        sizes.sort_unstable();
        assert_eq!(sizes, vec![1, 3, 3]);
        assert_eq!(report.created.len(), 7);
    }

    #[tokio::test]
    async fn test_duplicate_rows_committed_once() {
        let writer = Arc::new(CountingWriter {
            ceiling: 10,
            calls: AtomicUsize::new(0),
            sizes: Mutex::new(Vec::new()),
        });
        let committer = BatchCommitter::new(CommitStrategy::Batched(writer.clone()), 10, 1);

        let report = committer
            .commit("agency-1", vec![draft(1), draft(2), draft(1)])
            .await;

        assert_eq!(report.created.len(), 2);
        assert_eq!(report.failures, vec![(1, CommitError::Duplicate)]);
        assert_eq!(writer.sizes.lock().unwrap().clone(), vec![2]);
    }
}
