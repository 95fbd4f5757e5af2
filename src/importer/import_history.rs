// ==========================================
// 贷款管理平台 - 导入历史查询
// ==========================================
// 结果按 started_at 倒序（同时间按 id 倒序）
// 排序索引缺失时退化为无序查询 + 内存排序，保证顺序不变
// ==========================================

use crate::domain::import_run::ImportRun;
use crate::repository::error::{RepositoryError, RepositoryResult};
use crate::repository::import_run_repo::ImportRunRepository;
use std::sync::Arc;
use tracing::warn;

/// 最新在前
pub fn sort_newest_first(runs: &mut [ImportRun]) {
    runs.sort_by(|a, b| {
        b.started_at
            .cmp(&a.started_at)
            .then_with(|| b.id.cmp(&a.id))
    });
}

pub struct ImportHistory {
    repo: Arc<dyn ImportRunRepository>,
}

impl ImportHistory {
    pub fn new(repo: Arc<dyn ImportRunRepository>) -> Self {
        Self { repo }
    }

    pub async fn get_import_history(
        &self,
        agency_id: &str,
        limit: usize,
    ) -> RepositoryResult<Vec<ImportRun>> {
        match self.repo.list_runs_ordered(agency_id, limit).await {
            Ok(runs) => Ok(runs),
            Err(RepositoryError::OrderingUnavailable { index }) => {
                warn!(agency_id, index = %index, "排序索引不可用，改为内存排序");
                let mut runs = self.repo.list_runs_unordered(agency_id).await?;
                sort_newest_first(&mut runs);
                runs.truncate(limit);
                Ok(runs)
            }
            Err(e) => Err(e),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::types::TargetEntityKind;
    use async_trait::async_trait;
    use chrono::{Duration, Utc};

    struct UnindexedRepo {
        runs: Vec<ImportRun>,
    }

    #[async_trait]
    impl ImportRunRepository for UnindexedRepo {
        async fn insert_run(&self, _run: &ImportRun) -> RepositoryResult<()> {
            Ok(())
        }

        async fn list_runs_ordered(&self, _agency_id: &str, _limit: usize) -> RepositoryResult<Vec<ImportRun>> {
            Err(RepositoryError::OrderingUnavailable {
                index: "idx_import_run_agency_started".to_string(),
            })
        }

        async fn list_runs_unordered(&self, agency_id: &str) -> RepositoryResult<Vec<ImportRun>> {
            Ok(self
                .runs
                .iter()
                .filter(|r| r.agency_id == agency_id)
                .cloned()
                .collect())
        }

        async fn find_run(&self, _run_id: &str) -> RepositoryResult<Option<ImportRun>> {
            Ok(None)
        }
    }

    fn run_at(id: &str, minutes_ago: i64) -> ImportRun {
        let mut run = ImportRun::new("agency-1", "user-1", "loans.csv", 10, TargetEntityKind::Loan);
        run.id = id.to_string();
        run.started_at = Utc::now() - Duration::minutes(minutes_ago);
        run
    }

    #[tokio::test]
    async fn test_fallback_sorts_newest_first_and_truncates() {
        let repo = UnindexedRepo {
            runs: vec![run_at("b", 20), run_at("a", 5), run_at("c", 60), run_at("d", 1)],
        };
        let history = ImportHistory::new(Arc::new(repo));

        let runs = history.get_import_history("agency-1", 3).await.unwrap();

        let ids: Vec<&str> = runs.iter().map(|r| r.id.as_str()).collect();
        assert_eq!(ids, vec!["d", "a", "b"]);
    }

    #[test]
    fn test_equal_timestamps_break_on_id() {
        let now = Utc::now();
        let mut runs = vec![run_at("x", 0), run_at("y", 0)];
        for run in runs.iter_mut() {
            run.started_at = now;
        }

        sort_newest_first(&mut runs);

        assert_eq!(runs[0].id, "y");
    }
}
