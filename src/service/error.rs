use crate::models::OverrideError;
use thiserror::Error;

/// 规划服务错误
#[derive(Debug, Error)]
pub enum PlannerError {
    #[error("数据库错误: {0}")]
    Database(#[from] sqlx::Error),

    #[error(transparent)]
    Override(#[from] OverrideError),

    #[error("会话不存在: {0}")]
    SessionNotFound(String),

    #[error("实验不存在: {0}")]
    ExperimentNotFound(String),

    #[error("物品不存在: {0}")]
    ItemNotFound(String),

    #[error("无效输入: {0}")]
    InvalidInput(String),
}
