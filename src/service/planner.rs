use super::aggregator::aggregate;
use super::error::PlannerError;
use super::session::SessionStore;
use super::source::ExperimentSource;
use crate::config::PlannerConfig;
use crate::models::{AggregationResult, Experiment, PlanOverrides, QuantityAdjustment, UsageType};
use bigdecimal::{BigDecimal, Zero};
use chrono::Utc;
use indexmap::IndexSet;
use std::collections::HashMap;
use std::sync::Arc;

/// 采购规划服务
///
/// 负责取数 (I/O) 与会话状态; 汇总计算本身由 [`aggregate`] 同步完成。
pub struct PlannerService {
    source: Arc<dyn ExperimentSource>,
    sessions: SessionStore,
}

impl PlannerService {
    pub fn new(source: Arc<dyn ExperimentSource>, config: &PlannerConfig) -> Self {
        Self {
            source,
            sessions: SessionStore::new(config.session_idle_minutes),
        }
    }

    pub fn sessions(&self) -> &SessionStore {
        &self.sessions
    }

    /// 按请求顺序解析实验快照 (去重), 查不到的 id 记录警告后丢弃
    pub async fn resolve(&self, experiment_ids: &[String]) -> Result<Vec<Experiment>, PlannerError> {
        let ids: IndexSet<&String> = experiment_ids.iter().collect();
        if ids.is_empty() {
            return Ok(Vec::new());
        }

        let wanted: Vec<String> = ids.iter().map(|id| (*id).clone()).collect();
        let mut by_id: HashMap<String, Experiment> = self
            .source
            .get_experiments(&wanted)
            .await?
            .into_iter()
            .map(|exp| (exp.id.clone(), exp))
            .collect();

        let mut resolved = Vec::with_capacity(ids.len());
        for id in ids {
            match by_id.remove(id) {
                Some(exp) => resolved.push(exp),
                None => tracing::warn!("Experiment {} not found, skipping", id),
            }
        }

        Ok(resolved)
    }

    /// 无状态计算
    pub async fn calculate(
        &self,
        experiment_ids: &[String],
        overrides: &PlanOverrides,
    ) -> Result<AggregationResult, PlannerError> {
        let experiments = self.resolve(experiment_ids).await?;
        Ok(compute(&experiments, overrides))
    }

    /// 会话当前的采购计划
    pub async fn session_plan(&self, session_id: &str) -> Result<AggregationResult, PlannerError> {
        self.sessions.evict_idle(Utc::now());
        let session = self.sessions.snapshot(session_id);
        self.calculate(&session.selected_ids(), &session.overrides).await
    }

    /// 切换实验选择, 返回 (是否选中, 新计划)
    pub async fn toggle_experiment(
        &self,
        session_id: &str,
        experiment_id: &str,
    ) -> Result<(bool, AggregationResult), PlannerError> {
        self.sessions.evict_idle(Utc::now());

        // 选中前确认实验可解析, 避免选择集中出现无效 id
        let selecting = !self.sessions.snapshot(session_id).is_selected(experiment_id);
        if selecting {
            let found = self.resolve(&[experiment_id.to_string()]).await?;
            if found.is_empty() {
                return Err(PlannerError::ExperimentNotFound(experiment_id.to_string()));
            }
        }

        let selected = self.sessions.update(session_id, |s| s.toggle(experiment_id));
        tracing::info!(
            "会话 {}: 实验 {} {}",
            session_id,
            experiment_id,
            if selected { "选中" } else { "取消选中" }
        );

        let plan = self.session_plan(session_id).await?;
        Ok((selected, plan))
    }

    /// 设置物品用途; None 恢复默认分类
    pub async fn set_usage(
        &self,
        session_id: &str,
        item_name: &str,
        usage: Option<UsageType>,
    ) -> Result<AggregationResult, PlannerError> {
        self.sessions
            .update(session_id, |s| s.overrides.set_usage(item_name, usage));
        tracing::info!("会话 {}: 物品 {} 用途设置为 {:?}", session_id, item_name, usage);
        self.session_plan(session_id).await
    }

    /// 调整公共物品采购数量
    pub async fn set_custom_quantity(
        &self,
        session_id: &str,
        item_name: &str,
        quantity: BigDecimal,
    ) -> Result<(QuantityAdjustment, AggregationResult), PlannerError> {
        self.sessions.evict_idle(Utc::now());

        // 取数期间选择可能被并发修改; 读-判-写在条目锁内完成, 选择变化则重新取数
        let (adjustment, plan) = loop {
            let selection = self.sessions.snapshot(session_id).selected_ids();
            let experiments = self.resolve(&selection).await?;

            let outcome = self.sessions.try_update(session_id, |s| -> Result<_, PlannerError> {
                if s.selected_ids() != selection {
                    return Ok(None);
                }
                let current = compute(&experiments, &s.overrides);
                let adjustment = s.overrides.adjust_quantity(&current, item_name, quantity.clone())?;
                Ok(Some((adjustment, compute(&experiments, &s.overrides))))
            })?;

            match outcome {
                Some(done) => break done,
                None => tracing::debug!("会话 {}: 选择已变化, 重新取数", session_id),
            }
        };

        if let QuantityAdjustment::Shortfall { missing } = &adjustment {
            tracing::warn!(
                "会话 {}: 物品 {} 采购量低于需求量, 缺口 {}",
                session_id,
                item_name,
                missing
            );
        }

        Ok((adjustment, plan))
    }

    pub fn close_session(&self, session_id: &str) -> bool {
        self.sessions.remove(session_id)
    }

    /// 刷新物品台账单价 (不影响已有实验明细的价格快照)
    pub async fn update_item_price(&self, item_id: &str, price: &BigDecimal) -> Result<(), PlannerError> {
        if *price <= BigDecimal::zero() {
            return Err(PlannerError::InvalidInput(format!("单价必须大于0: {}", price)));
        }

        if self.source.update_item_price(item_id, price).await? {
            Ok(())
        } else {
            Err(PlannerError::ItemNotFound(item_id.to_string()))
        }
    }
}

fn compute(experiments: &[Experiment], overrides: &PlanOverrides) -> AggregationResult {
    let result = aggregate(experiments, overrides.usage(), overrides.custom_quantities());
    tracing::info!(
        "计算完成: 实验 {}, 公共物品 {}, 独有物品 {}, 总成本 {}",
        result.selected_count,
        result.common_items.len(),
        result.unique_items.len(),
        result.total_cost
    );
    result
}
