use super::result::AggregationResult;
use bigdecimal::{BigDecimal, Zero};
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::collections::HashMap;
use thiserror::Error;

/// 物品用途: 公共 / 独有
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum UsageType {
    Common,
    Unique,
}

/// 物品名 -> 用途覆盖, 缺省表示按默认规则分类
pub type UsageOverrideMap = HashMap<String, UsageType>;

/// 物品名 -> 自定义采购数量 (仅公共物品)
pub type CustomQuantityMap = HashMap<String, BigDecimal>;

#[derive(Debug, Error, PartialEq)]
pub enum OverrideError {
    #[error("采购数量不能为负: item={item_name}, quantity={quantity}")]
    NegativeQuantity {
        item_name: String,
        quantity: BigDecimal,
    },

    #[error("非公共物品不能调整采购数量: {0}")]
    NotCommon(String),
}

/// 数量调整结果
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum QuantityAdjustment {
    /// 与需求量相同, 覆盖已移除
    Cleared,
    Surplus { extra: BigDecimal },
    /// 少于需求量 (允许, 需提示)
    Shortfall { missing: BigDecimal },
}

/// 会话内的两类覆盖
///
/// 用途覆盖与数量覆盖的联动在此处维护: 物品一旦不再是公共物品,
/// 其自定义数量随之清除。
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PlanOverrides {
    usage: UsageOverrideMap,
    custom_quantities: CustomQuantityMap,
}

impl PlanOverrides {
    pub fn new() -> Self {
        Self::default()
    }

    /// 由外部传入的两张表构建 (用于无状态计算)
    pub fn from_maps(usage: UsageOverrideMap, custom_quantities: CustomQuantityMap) -> Self {
        Self {
            usage,
            custom_quantities,
        }
    }

    pub fn usage(&self) -> &UsageOverrideMap {
        &self.usage
    }

    pub fn custom_quantities(&self) -> &CustomQuantityMap {
        &self.custom_quantities
    }

    pub fn usage_of(&self, item_name: &str) -> Option<UsageType> {
        self.usage.get(item_name).copied()
    }

    pub fn custom_quantity(&self, item_name: &str) -> Option<&BigDecimal> {
        self.custom_quantities.get(item_name)
    }

    /// 标记为独有, 同时清除自定义数量
    pub fn mark_as_unique(&mut self, item_name: &str) {
        self.usage.insert(item_name.to_string(), UsageType::Unique);
        self.custom_quantities.remove(item_name);
    }

    pub fn mark_as_common(&mut self, item_name: &str) {
        self.usage.insert(item_name.to_string(), UsageType::Common);
    }

    /// 恢复默认分类; 默认分类下可能不再是公共物品, 数量覆盖一并清除
    pub fn reset_usage(&mut self, item_name: &str) {
        self.usage.remove(item_name);
        self.custom_quantities.remove(item_name);
    }

    /// 设置用途; None 表示恢复默认
    pub fn set_usage(&mut self, item_name: &str, usage: Option<UsageType>) {
        match usage {
            Some(UsageType::Common) => self.mark_as_common(item_name),
            Some(UsageType::Unique) => self.mark_as_unique(item_name),
            None => self.reset_usage(item_name),
        }
    }

    /// 设置自定义采购数量
    ///
    /// 等于需求量时移除覆盖; 否则原样保存 (高于或低于需求量均可)。
    pub fn set_custom_quantity(
        &mut self,
        item_name: &str,
        quantity: BigDecimal,
        required: &BigDecimal,
    ) -> Result<QuantityAdjustment, OverrideError> {
        if quantity < BigDecimal::zero() {
            return Err(OverrideError::NegativeQuantity {
                item_name: item_name.to_string(),
                quantity,
            });
        }

        let adjustment = match quantity.cmp(required) {
            Ordering::Equal => {
                self.custom_quantities.remove(item_name);
                return Ok(QuantityAdjustment::Cleared);
            }
            Ordering::Greater => QuantityAdjustment::Surplus {
                extra: &quantity - required,
            },
            Ordering::Less => QuantityAdjustment::Shortfall {
                missing: required - &quantity,
            },
        };

        self.custom_quantities.insert(item_name.to_string(), quantity);
        Ok(adjustment)
    }

    /// 按当前计划中的公共物品需求量调整数量
    pub fn adjust_quantity(
        &mut self,
        plan: &AggregationResult,
        item_name: &str,
        quantity: BigDecimal,
    ) -> Result<QuantityAdjustment, OverrideError> {
        let group = plan
            .find_common(item_name)
            .ok_or_else(|| OverrideError::NotCommon(item_name.to_string()))?;
        let required = group.required_quantity.clone();
        self.set_custom_quantity(item_name, quantity, &required)
    }
}
