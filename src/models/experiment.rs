use bigdecimal::BigDecimal;
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

/// 物品类别
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ItemCategory {
    /// 消耗品: 按试验次数放大
    #[default]
    Consumable,
    /// 包装材料: 按试验次数放大
    Packing,
    /// 设备 (非消耗品): 只采购一次
    #[serde(alias = "equipment")]
    NonConsumable,
}

impl ItemCategory {
    /// 宽松解析库中的类别字符串, 未知或缺失时按消耗品处理
    pub fn from_label(label: &str) -> Self {
        match label.trim().to_ascii_lowercase().as_str() {
            "packing" => Self::Packing,
            "non_consumable" | "equipment" => Self::NonConsumable,
            _ => Self::Consumable,
        }
    }

    pub fn as_label(&self) -> &'static str {
        match self {
            Self::Consumable => "consumable",
            Self::Packing => "packing",
            Self::NonConsumable => "non_consumable",
        }
    }

    /// 是否按试验次数放大
    pub fn scales_with_trials(&self) -> bool {
        !matches!(self, Self::NonConsumable)
    }
}

/// 实验明细行 (价格为加入实验时的快照)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LineItem {
    pub item_name: String,
    pub quantity: BigDecimal,
    pub unit: String,
    pub price_per_unit: BigDecimal,
    #[serde(default)]
    pub category: ItemCategory,
}

/// 实验快照
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Experiment {
    pub id: String,
    pub name: String,
    pub category_ref: String,
    pub trials: i32,
    #[serde(default)]
    pub grades: Vec<i32>,
    #[serde(default)]
    pub items: Vec<LineItem>,
}

/// 实验主表 (t_lab_experiment)
#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct ExperimentRow {
    pub fid: String,
    pub fname: String,
    pub fcategory: String,
    pub ftrials: i32,
    pub fgrades: Vec<i32>,
}

/// 实验明细表 (t_lab_experiment_item)
#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct ExperimentItemRow {
    pub fexpid: String,
    pub fseq: i32,
    pub fitemname: String,
    pub fqty: BigDecimal,
    pub funit: String,
    pub fprice: BigDecimal,
    pub fcategory: Option<String>,
}

impl Experiment {
    /// 由主表行与明细行组装快照, 明细按 fseq 保序
    pub fn from_rows(row: ExperimentRow, items: Vec<ExperimentItemRow>) -> Self {
        let mut items = items;
        items.sort_by_key(|it| it.fseq);

        Self {
            id: row.fid,
            name: row.fname,
            category_ref: row.fcategory,
            // 试验次数至少为 1
            trials: row.ftrials.max(1),
            grades: row.fgrades,
            items: items
                .into_iter()
                .map(|it| LineItem {
                    item_name: it.fitemname,
                    quantity: it.fqty,
                    unit: it.funit,
                    price_per_unit: it.fprice,
                    category: it
                        .fcategory
                        .as_deref()
                        .map(ItemCategory::from_label)
                        .unwrap_or_default(),
                })
                .collect(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn category_labels_are_lenient() {
        assert_eq!(ItemCategory::from_label("packing"), ItemCategory::Packing);
        assert_eq!(ItemCategory::from_label("non_consumable"), ItemCategory::NonConsumable);
        assert_eq!(ItemCategory::from_label(" Equipment "), ItemCategory::NonConsumable);
        assert_eq!(ItemCategory::from_label("chemical"), ItemCategory::Consumable);
        assert_eq!(ItemCategory::from_label(""), ItemCategory::Consumable);
    }

    #[test]
    fn missing_category_defaults_to_consumable() {
        assert_eq!(ItemCategory::default(), ItemCategory::Consumable);
        let item: LineItem = serde_json::from_str(
            r#"{"item_name": "Salt", "quantity": "1", "unit": "g", "price_per_unit": "2"}"#,
        )
        .unwrap();
        assert_eq!(item.category, ItemCategory::Consumable);
    }

    #[test]
    fn category_serde_accepts_equipment_alias() {
        let c: ItemCategory = serde_json::from_str("\"equipment\"").unwrap();
        assert_eq!(c, ItemCategory::NonConsumable);
        assert_eq!(serde_json::to_string(&c).unwrap(), "\"non_consumable\"");
    }

    #[test]
    fn rows_assemble_in_sequence_order() {
        let row = ExperimentRow {
            fid: "EXP001".to_string(),
            fname: "Titration".to_string(),
            fcategory: "Chemistry".to_string(),
            ftrials: 0,
            fgrades: vec![11, 12],
        };
        let item = |seq: i32, name: &str, cat: Option<&str>| ExperimentItemRow {
            fexpid: "EXP001".to_string(),
            fseq: seq,
            fitemname: name.to_string(),
            fqty: BigDecimal::from(1),
            funit: "pcs".to_string(),
            fprice: BigDecimal::from(10),
            fcategory: cat.map(str::to_string),
        };

        let exp = Experiment::from_rows(
            row,
            vec![item(2, "Burette", Some("non_consumable")), item(1, "NaOH", None)],
        );

        assert_eq!(exp.trials, 1);
        assert_eq!(exp.items[0].item_name, "NaOH");
        assert_eq!(exp.items[0].category, ItemCategory::Consumable);
        assert_eq!(exp.items[1].category, ItemCategory::NonConsumable);
    }
}
