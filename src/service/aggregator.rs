use bigdecimal::{BigDecimal, Zero};
use crate::models::{
    AggregationResult, CustomQuantityMap, Experiment, ExperimentUsage, ItemCategory, ItemGroup,
    LineItem, UsageOverrideMap, UsageType,
};
use indexmap::{IndexMap, IndexSet};

/// 同名物品在所选实验中的一次出现
struct Occurrence<'a> {
    experiment: &'a Experiment,
    line_item: &'a LineItem,
}

/// 汇总所选实验的采购需求 (纯函数)
///
/// 分组键为物品名 (区分大小写), 分组的单价/单位/类别取按实验选择顺序遇到的第一次出现。
/// 相同输入必然得到逐字段相同的结果, 分组顺序即物品首次出现的顺序。
pub fn aggregate(
    selected_experiments: &[Experiment],
    usage_overrides: &UsageOverrideMap,
    custom_quantities: &CustomQuantityMap,
) -> AggregationResult {
    if selected_experiments.is_empty() {
        return AggregationResult::empty();
    }

    // 1. 按物品名分组 (保序)
    let mut occurrences: IndexMap<&str, Vec<Occurrence>> = IndexMap::new();
    for experiment in selected_experiments {
        for line_item in &experiment.items {
            occurrences
                .entry(line_item.item_name.as_str())
                .or_default()
                .push(Occurrence {
                    experiment,
                    line_item,
                });
        }
    }

    let mut common_items: Vec<ItemGroup> = Vec::new();
    let mut unique_items: Vec<ItemGroup> = Vec::new();
    let mut total_cost = BigDecimal::zero();

    for (item_name, group) in &occurrences {
        // 2. 分类: 默认 >=2 个不同实验为公共, 覆盖优先
        let usage_type = classify(item_name, group, usage_overrides);

        // 3~6. 数量与成本
        let item_group = build_group(item_name, group, usage_type, custom_quantities);
        total_cost += &item_group.cost;

        tracing::debug!(
            "物品 {} ({:?}): 需求 {}, 采购 {}, 成本 {}",
            item_name,
            usage_type,
            item_group.required_quantity,
            item_group.effective_quantity,
            item_group.cost
        );

        match usage_type {
            UsageType::Common => common_items.push(item_group),
            UsageType::Unique => unique_items.push(item_group),
        }
    }

    AggregationResult {
        selected_count: selected_experiments.len(),
        total_cost,
        common_items,
        unique_items,
    }
}

fn classify(item_name: &str, group: &[Occurrence], usage_overrides: &UsageOverrideMap) -> UsageType {
    if let Some(usage) = usage_overrides.get(item_name) {
        return *usage;
    }

    let distinct_experiments: IndexSet<&str> = group
        .iter()
        .map(|occ| occ.experiment.id.as_str())
        .collect();

    if distinct_experiments.len() >= 2 {
        UsageType::Common
    } else {
        UsageType::Unique
    }
}

fn build_group(
    item_name: &str,
    group: &[Occurrence],
    usage_type: UsageType,
    custom_quantities: &CustomQuantityMap,
) -> ItemGroup {
    // 分组由出现记录生成, 至少有一条
    let first = group[0].line_item;
    let category = first.category;

    let per_experiment_usage: Vec<ExperimentUsage> = group
        .iter()
        .map(|occ| ExperimentUsage {
            exp_id: occ.experiment.id.clone(),
            exp_name: occ.experiment.name.clone(),
            quantity: occ.line_item.quantity.clone(),
            trials: occ.experiment.trials,
        })
        .collect();

    let required_quantity = required_quantity(category, &per_experiment_usage);

    let effective_quantity = match usage_type {
        UsageType::Common => custom_quantities
            .get(item_name)
            .cloned()
            .unwrap_or_else(|| required_quantity.clone()),
        UsageType::Unique => required_quantity.clone(),
    };

    let cost = &effective_quantity * &first.price_per_unit;

    ItemGroup {
        item_name: item_name.to_string(),
        category,
        price_per_unit: first.price_per_unit.clone(),
        unit: first.unit.clone(),
        per_experiment_usage,
        required_quantity,
        effective_quantity,
        cost,
    }
}

/// 需求量: 设备取各实验最大值 (可复用), 消耗品/包装按试验次数求和
fn required_quantity(category: ItemCategory, usages: &[ExperimentUsage]) -> BigDecimal {
    let effective = usages.iter().map(|u| u.effective_quantity(category));

    match category {
        ItemCategory::NonConsumable => effective.max().unwrap_or_else(BigDecimal::zero),
        ItemCategory::Consumable | ItemCategory::Packing => {
            effective.fold(BigDecimal::zero(), |acc, q| acc + q)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;

    fn line(name: &str, qty: &str, category: ItemCategory, price: &str) -> LineItem {
        LineItem {
            item_name: name.to_string(),
            quantity: BigDecimal::from_str(qty).unwrap(),
            unit: "pcs".to_string(),
            price_per_unit: BigDecimal::from_str(price).unwrap(),
            category,
        }
    }

    fn experiment(id: &str, trials: i32, items: Vec<LineItem>) -> Experiment {
        Experiment {
            id: id.to_string(),
            name: format!("Experiment {}", id),
            category_ref: "Chemistry".to_string(),
            trials,
            grades: vec![10],
            items,
        }
    }

    fn no_overrides() -> (UsageOverrideMap, CustomQuantityMap) {
        (UsageOverrideMap::new(), CustomQuantityMap::new())
    }

    #[test]
    fn empty_selection_is_degenerate() {
        let (usage, custom) = no_overrides();
        let result = aggregate(&[], &usage, &custom);
        assert_eq!(result.selected_count, 0);
        assert_eq!(result.total_cost, BigDecimal::zero());
        assert!(result.common_items.is_empty());
        assert!(result.unique_items.is_empty());
    }

    #[test]
    fn equipment_takes_max_without_trials() {
        let exps = vec![
            experiment("A", 3, vec![line("Stand", "5", ItemCategory::NonConsumable, "100")]),
            experiment("B", 1, vec![line("Stand", "2", ItemCategory::NonConsumable, "100")]),
        ];
        let (usage, custom) = no_overrides();
        let result = aggregate(&exps, &usage, &custom);

        assert_eq!(result.common_items.len(), 1);
        let stand = &result.common_items[0];
        assert_eq!(stand.required_quantity, BigDecimal::from(5));
        assert_eq!(stand.effective_quantity, BigDecimal::from(5));
        assert_eq!(stand.cost, BigDecimal::from(500));
    }

    #[test]
    fn consumable_scales_by_trials() {
        let exps = vec![experiment("A", 2, vec![line("Acid", "10", ItemCategory::Consumable, "1.5")])];
        let (usage, custom) = no_overrides();
        let result = aggregate(&exps, &usage, &custom);

        let acid = &result.unique_items[0];
        assert_eq!(acid.required_quantity, BigDecimal::from(20));
        assert_eq!(acid.cost, BigDecimal::from(30));
    }

    #[test]
    fn packing_sums_across_experiments() {
        let exps = vec![
            experiment("A", 2, vec![line("Foil", "3", ItemCategory::Packing, "2")]),
            experiment("B", 4, vec![line("Foil", "1", ItemCategory::Packing, "2")]),
        ];
        let (usage, custom) = no_overrides();
        let result = aggregate(&exps, &usage, &custom);

        // 3*2 + 1*4
        assert_eq!(result.common_items[0].required_quantity, BigDecimal::from(10));
    }

    #[test]
    fn first_occurrence_price_wins() {
        let exps = vec![
            experiment("A", 1, vec![line("Salt", "1", ItemCategory::Consumable, "3")]),
            experiment("B", 1, vec![line("Salt", "1", ItemCategory::Consumable, "9")]),
        ];
        let (usage, custom) = no_overrides();
        let result = aggregate(&exps, &usage, &custom);

        let salt = &result.common_items[0];
        assert_eq!(salt.price_per_unit, BigDecimal::from(3));
        assert_eq!(salt.cost, BigDecimal::from(6));

        let reversed: Vec<Experiment> = exps.into_iter().rev().collect();
        let result = aggregate(&reversed, &usage, &custom);
        assert_eq!(result.common_items[0].price_per_unit, BigDecimal::from(9));
    }

    #[test]
    fn names_are_case_sensitive() {
        let exps = vec![
            experiment("A", 1, vec![line("Salt", "1", ItemCategory::Consumable, "1")]),
            experiment("B", 1, vec![line("salt", "1", ItemCategory::Consumable, "1")]),
        ];
        let (usage, custom) = no_overrides();
        let result = aggregate(&exps, &usage, &custom);
        assert!(result.common_items.is_empty());
        assert_eq!(result.unique_items.len(), 2);
    }

    #[test]
    fn repeated_item_in_one_experiment_stays_unique() {
        let exps = vec![experiment(
            "A",
            2,
            vec![
                line("Water", "1", ItemCategory::Consumable, "1"),
                line("Water", "2", ItemCategory::Consumable, "1"),
            ],
        )];
        let (usage, custom) = no_overrides();
        let result = aggregate(&exps, &usage, &custom);

        let water = &result.unique_items[0];
        assert_eq!(water.per_experiment_usage.len(), 2);
        assert_eq!(water.required_quantity, BigDecimal::from(6));
    }

    #[test]
    fn custom_quantity_only_applies_to_common() {
        let exps = vec![
            experiment("A", 1, vec![
                line("Beaker", "1", ItemCategory::NonConsumable, "50"),
                line("Acid", "5", ItemCategory::Consumable, "2"),
            ]),
            experiment("B", 1, vec![line("Beaker", "1", ItemCategory::NonConsumable, "50")]),
        ];
        let usage = UsageOverrideMap::new();
        let mut custom = CustomQuantityMap::new();
        custom.insert("Beaker".to_string(), BigDecimal::from(3));
        custom.insert("Acid".to_string(), BigDecimal::from(100));

        let result = aggregate(&exps, &usage, &custom);
        let beaker = result.find_common("Beaker").unwrap();
        assert_eq!(beaker.required_quantity, BigDecimal::from(1));
        assert_eq!(beaker.effective_quantity, BigDecimal::from(3));

        let acid = result.find("Acid").unwrap();
        assert_eq!(acid.effective_quantity, BigDecimal::from(5));
        assert_eq!(result.total_cost, BigDecimal::from(160));
    }

    #[test]
    fn overrides_take_precedence() {
        let exps = vec![
            experiment("A", 1, vec![
                line("Beaker", "1", ItemCategory::NonConsumable, "50"),
                line("Acid", "5", ItemCategory::Consumable, "2"),
            ]),
            experiment("B", 1, vec![line("Beaker", "1", ItemCategory::NonConsumable, "50")]),
        ];
        let mut usage = UsageOverrideMap::new();
        usage.insert("Beaker".to_string(), UsageType::Unique);
        usage.insert("Acid".to_string(), UsageType::Common);
        // 未出现在所选实验中的覆盖被忽略
        usage.insert("Ghost".to_string(), UsageType::Common);

        let result = aggregate(&exps, &usage, &CustomQuantityMap::new());
        assert_eq!(result.common_items.len(), 1);
        assert_eq!(result.common_items[0].item_name, "Acid");
        assert_eq!(result.unique_items.len(), 1);
        assert_eq!(result.unique_items[0].item_name, "Beaker");
        // 强制为独有的设备仍按最大值计算
        assert_eq!(result.unique_items[0].required_quantity, BigDecimal::from(1));
    }
}
