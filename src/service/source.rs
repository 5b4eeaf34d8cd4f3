use super::error::PlannerError;
use crate::db::queries;
use crate::models::{Experiment, ExperimentItemRow};
use async_trait::async_trait;
use bigdecimal::BigDecimal;
use sqlx::PgPool;
use std::collections::HashMap;

/// 实验数据源 (实验目录 + 物品台账)
#[async_trait]
pub trait ExperimentSource: Send + Sync {
    /// 按 id 查询实验快照; 查不到的 id 直接缺席, 返回顺序不作保证
    async fn get_experiments(&self, ids: &[String]) -> Result<Vec<Experiment>, PlannerError>;

    /// 更新物品台账单价, 返回物品是否存在
    async fn update_item_price(&self, item_id: &str, price: &BigDecimal) -> Result<bool, PlannerError>;
}

/// Postgres 数据源
pub struct PgExperimentSource {
    pool: PgPool,
}

impl PgExperimentSource {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl ExperimentSource for PgExperimentSource {
    async fn get_experiments(&self, ids: &[String]) -> Result<Vec<Experiment>, PlannerError> {
        if ids.is_empty() {
            return Ok(Vec::new());
        }

        let rows = queries::list_experiments(&self.pool, ids).await?;
        let item_rows = queries::list_experiment_items(&self.pool, ids).await?;
        tracing::debug!("查询到 {} 个实验, {} 条明细", rows.len(), item_rows.len());

        let mut items_by_exp: HashMap<String, Vec<ExperimentItemRow>> = HashMap::new();
        for item in item_rows {
            items_by_exp.entry(item.fexpid.clone()).or_default().push(item);
        }

        Ok(rows
            .into_iter()
            .map(|row| {
                let items = items_by_exp.remove(&row.fid).unwrap_or_default();
                Experiment::from_rows(row, items)
            })
            .collect())
    }

    async fn update_item_price(&self, item_id: &str, price: &BigDecimal) -> Result<bool, PlannerError> {
        let affected = queries::update_item_price(&self.pool, item_id, price).await?;
        Ok(affected > 0)
    }
}
