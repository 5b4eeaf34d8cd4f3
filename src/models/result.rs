use super::experiment::ItemCategory;
use bigdecimal::{BigDecimal, Zero};
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;

/// 单个实验对某物品的用量
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExperimentUsage {
    pub exp_id: String,
    pub exp_name: String,
    pub quantity: BigDecimal,
    pub trials: i32,
}

impl ExperimentUsage {
    /// 该实验的有效用量: 设备取原始数量, 消耗品/包装乘以试验次数
    pub fn effective_quantity(&self, category: ItemCategory) -> BigDecimal {
        if category.scales_with_trials() {
            &self.quantity * BigDecimal::from(self.trials)
        } else {
            self.quantity.clone()
        }
    }
}

/// 物品分组 (同名物品跨实验合并)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ItemGroup {
    pub item_name: String,
    pub category: ItemCategory,
    pub price_per_unit: BigDecimal,
    pub unit: String,
    pub per_experiment_usage: Vec<ExperimentUsage>,
    pub required_quantity: BigDecimal,
    pub effective_quantity: BigDecimal,
    pub cost: BigDecimal,
}

/// 采购数量相对需求量的状态
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum ProcurementStatus {
    Exact,
    /// 多买
    Surplus { extra: BigDecimal },
    /// 少于需求量, 仅提示不拦截
    Shortfall { missing: BigDecimal },
}

impl ItemGroup {
    /// 按需求量计算的最低成本
    pub fn min_cost(&self) -> BigDecimal {
        &self.required_quantity * &self.price_per_unit
    }

    pub fn is_custom(&self) -> bool {
        self.effective_quantity != self.required_quantity
    }

    pub fn procurement_status(&self) -> ProcurementStatus {
        match self.effective_quantity.cmp(&self.required_quantity) {
            Ordering::Equal => ProcurementStatus::Exact,
            Ordering::Greater => ProcurementStatus::Surplus {
                extra: &self.effective_quantity - &self.required_quantity,
            },
            Ordering::Less => ProcurementStatus::Shortfall {
                missing: &self.required_quantity - &self.effective_quantity,
            },
        }
    }
}

/// 汇总结果 (每次计算生成, 不可变)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AggregationResult {
    pub selected_count: usize,
    pub total_cost: BigDecimal,
    pub common_items: Vec<ItemGroup>,
    pub unique_items: Vec<ItemGroup>,
}

/// 采购概要 (公共/独有分项)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlanSummary {
    pub selected_count: usize,
    pub common_count: usize,
    pub unique_count: usize,
    pub common_cost: BigDecimal,
    pub unique_cost: BigDecimal,
    pub total_cost: BigDecimal,
}

impl AggregationResult {
    /// 空选择的退化结果
    pub fn empty() -> Self {
        Self {
            selected_count: 0,
            total_cost: BigDecimal::zero(),
            common_items: Vec::new(),
            unique_items: Vec::new(),
        }
    }

    pub fn common_cost(&self) -> BigDecimal {
        sum_cost(&self.common_items)
    }

    pub fn unique_cost(&self) -> BigDecimal {
        sum_cost(&self.unique_items)
    }

    pub fn item_count(&self) -> usize {
        self.common_items.len() + self.unique_items.len()
    }

    pub fn find_common(&self, item_name: &str) -> Option<&ItemGroup> {
        self.common_items.iter().find(|g| g.item_name == item_name)
    }

    pub fn find(&self, item_name: &str) -> Option<&ItemGroup> {
        self.find_common(item_name)
            .or_else(|| self.unique_items.iter().find(|g| g.item_name == item_name))
    }

    /// 少于需求量的公共物品
    pub fn shortfalls(&self) -> Vec<&ItemGroup> {
        self.common_items
            .iter()
            .filter(|g| matches!(g.procurement_status(), ProcurementStatus::Shortfall { .. }))
            .collect()
    }

    pub fn summary(&self) -> PlanSummary {
        PlanSummary {
            selected_count: self.selected_count,
            common_count: self.common_items.len(),
            unique_count: self.unique_items.len(),
            common_cost: self.common_cost(),
            unique_cost: self.unique_cost(),
            total_cost: self.total_cost.clone(),
        }
    }
}

impl Default for AggregationResult {
    fn default() -> Self {
        Self::empty()
    }
}

fn sum_cost(groups: &[ItemGroup]) -> BigDecimal {
    groups
        .iter()
        .fold(BigDecimal::zero(), |acc, g| acc + &g.cost)
}
