#![allow(dead_code)]

use async_trait::async_trait;
use bigdecimal::BigDecimal;
use lab_procure::models::{Experiment, ItemCategory, LineItem};
use lab_procure::service::{ExperimentSource, PlannerError};
use std::collections::HashMap;
use std::str::FromStr;
use std::sync::Mutex;
use tokio::sync::oneshot;

pub fn dec(s: &str) -> BigDecimal {
    BigDecimal::from_str(s).unwrap()
}

pub fn line(name: &str, qty: &str, category: ItemCategory, price: &str) -> LineItem {
    LineItem {
        item_name: name.to_string(),
        quantity: dec(qty),
        unit: "pcs".to_string(),
        price_per_unit: dec(price),
        category,
    }
}

pub fn experiment(id: &str, trials: i32, items: Vec<LineItem>) -> Experiment {
    Experiment {
        id: id.to_string(),
        name: format!("Experiment {}", id),
        category_ref: "Chemistry".to_string(),
        trials,
        grades: vec![9, 10],
        items,
    }
}

/// A(trials=2): Beaker + Acid; B(trials=1): Beaker + Salt
pub fn beaker_acid_salt() -> Vec<Experiment> {
    vec![
        experiment(
            "A",
            2,
            vec![
                line("Beaker", "1", ItemCategory::NonConsumable, "50"),
                line("Acid", "5", ItemCategory::Consumable, "2"),
            ],
        ),
        experiment(
            "B",
            1,
            vec![
                line("Beaker", "1", ItemCategory::NonConsumable, "50"),
                line("Salt", "3", ItemCategory::Consumable, "1"),
            ],
        ),
    ]
}

type Gate = (oneshot::Sender<()>, oneshot::Receiver<()>);

/// 内存数据源
pub struct InMemorySource {
    experiments: Vec<Experiment>,
    prices: Mutex<HashMap<String, BigDecimal>>,
    gate: Mutex<Option<Gate>>,
}

impl InMemorySource {
    pub fn new(experiments: Vec<Experiment>) -> Self {
        Self {
            experiments,
            prices: Mutex::new(HashMap::new()),
            gate: Mutex::new(None),
        }
    }

    /// 让下一次取数挂起: 返回 (已进入取数, 放行)
    pub fn hold_next_fetch(&self) -> (oneshot::Receiver<()>, oneshot::Sender<()>) {
        let (entered_tx, entered_rx) = oneshot::channel();
        let (release_tx, release_rx) = oneshot::channel();
        *self.gate.lock().unwrap() = Some((entered_tx, release_rx));
        (entered_rx, release_tx)
    }

    pub fn with_item(self, item_id: &str, price: &str) -> Self {
        self.prices.lock().unwrap().insert(item_id.to_string(), dec(price));
        self
    }

    pub fn price_of(&self, item_id: &str) -> Option<BigDecimal> {
        self.prices.lock().unwrap().get(item_id).cloned()
    }
}

#[async_trait]
impl ExperimentSource for InMemorySource {
    async fn get_experiments(&self, ids: &[String]) -> Result<Vec<Experiment>, PlannerError> {
        let gate = self.gate.lock().unwrap().take();
        if let Some((entered, release)) = gate {
            let _ = entered.send(());
            let _ = release.await;
        }

        // 与数据库一致: 不保证返回顺序
        Ok(self
            .experiments
            .iter()
            .rev()
            .filter(|e| ids.contains(&e.id))
            .cloned()
            .collect())
    }

    async fn update_item_price(&self, item_id: &str, price: &BigDecimal) -> Result<bool, PlannerError> {
        let mut prices = self.prices.lock().unwrap();
        match prices.get_mut(item_id) {
            Some(p) => {
                *p = price.clone();
                Ok(true)
            }
            None => Ok(false),
        }
    }
}
