use crate::models::PlanOverrides;
use chrono::{DateTime, Duration, Utc};
use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use indexmap::IndexSet;
use serde::{Deserialize, Serialize};

/// 规划会话: 当前选择的实验与两类覆盖
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PlanningSession {
    pub selection: IndexSet<String>,
    pub overrides: PlanOverrides,
    pub updated_at: DateTime<Utc>,
}

impl PlanningSession {
    pub fn new() -> Self {
        Self {
            selection: IndexSet::new(),
            overrides: PlanOverrides::new(),
            updated_at: Utc::now(),
        }
    }

    /// 切换实验选择, 返回切换后是否处于选中状态
    pub fn toggle(&mut self, experiment_id: &str) -> bool {
        // shift_remove 保持其余实验的选择顺序
        if self.selection.shift_remove(experiment_id) {
            false
        } else {
            self.selection.insert(experiment_id.to_string());
            true
        }
    }

    pub fn selected_ids(&self) -> Vec<String> {
        self.selection.iter().cloned().collect()
    }

    pub fn is_selected(&self, experiment_id: &str) -> bool {
        self.selection.contains(experiment_id)
    }
}

impl Default for PlanningSession {
    fn default() -> Self {
        Self::new()
    }
}

/// 会话存储 (会话ID -> 会话)
#[derive(Debug)]
pub struct SessionStore {
    sessions: DashMap<String, PlanningSession>,
    idle_limit: Duration,
}

impl SessionStore {
    pub fn new(idle_minutes: i64) -> Self {
        Self {
            sessions: DashMap::new(),
            idle_limit: Duration::minutes(idle_minutes),
        }
    }

    /// 取会话快照, 不存在时返回空会话 (不落库)
    pub fn snapshot(&self, session_id: &str) -> PlanningSession {
        self.sessions
            .get(session_id)
            .map(|s| s.value().clone())
            .unwrap_or_default()
    }

    /// 修改会话 (不存在则创建), 并刷新活跃时间
    pub fn update<R>(&self, session_id: &str, f: impl FnOnce(&mut PlanningSession) -> R) -> R {
        let mut entry = self
            .sessions
            .entry(session_id.to_string())
            .or_insert_with(PlanningSession::new);
        let out = f(entry.value_mut());
        entry.updated_at = Utc::now();
        out
    }

    /// 可失败的修改: 持有条目锁执行 f; 会话不存在时仅在 f 成功后才创建
    pub fn try_update<T, E>(
        &self,
        session_id: &str,
        f: impl FnOnce(&mut PlanningSession) -> Result<T, E>,
    ) -> Result<T, E> {
        match self.sessions.entry(session_id.to_string()) {
            Entry::Occupied(mut entry) => {
                let session = entry.get_mut();
                let out = f(session);
                session.updated_at = Utc::now();
                out
            }
            Entry::Vacant(entry) => {
                let mut session = PlanningSession::new();
                let out = f(&mut session)?;
                entry.insert(session);
                Ok(out)
            }
        }
    }

    pub fn remove(&self, session_id: &str) -> bool {
        self.sessions.remove(session_id).is_some()
    }

    pub fn contains(&self, session_id: &str) -> bool {
        self.sessions.contains_key(session_id)
    }

    pub fn len(&self) -> usize {
        self.sessions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sessions.is_empty()
    }

    /// 清理空闲会话, 返回清理数量
    pub fn evict_idle(&self, now: DateTime<Utc>) -> usize {
        let before = self.sessions.len();
        self.sessions
            .retain(|_, s| now.signed_duration_since(s.updated_at) <= self.idle_limit);
        let evicted = before.saturating_sub(self.sessions.len());
        if evicted > 0 {
            tracing::info!("清理空闲会话 {} 个, 剩余 {}", evicted, self.sessions.len());
        }
        evicted
    }
}
