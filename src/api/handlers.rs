use crate::models::{
    decimal, AggregationResult, CustomQuantityMap, PlanOverrides, PlanSummary, ProcurementStatus,
    QuantityAdjustment, UsageOverrideMap, UsageType,
};
use crate::service::{PlannerError, PlannerService};
use axum::{
    extract::{Json, Path, State},
    http::StatusCode,
    response::{IntoResponse, Response},
};
use bigdecimal::{BigDecimal, Zero};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

/// 请求体: 无状态计算
#[derive(Debug, Deserialize)]
pub struct CalculateRequest {
    pub experiment_ids: Vec<String>,
    #[serde(default)]
    pub item_usage_type: UsageOverrideMap,
    #[serde(default, deserialize_with = "decimal::map::deserialize")]
    pub item_custom_quantity: CustomQuantityMap,
}

#[derive(Debug, Deserialize)]
pub struct ToggleRequest {
    pub experiment_id: String,
}

/// 用途设置; 缺省 usage_type 表示恢复默认分类
#[derive(Debug, Deserialize)]
pub struct UsageRequest {
    pub item_name: String,
    #[serde(default)]
    pub usage_type: Option<UsageType>,
}

#[derive(Debug, Deserialize)]
pub struct QuantityRequest {
    pub item_name: String,
    #[serde(deserialize_with = "decimal::deserialize")]
    pub quantity: BigDecimal,
}

#[derive(Debug, Deserialize)]
pub struct PriceRequest {
    #[serde(deserialize_with = "decimal::deserialize")]
    pub price: BigDecimal,
}

/// 采购预警 (采购量低于需求量的公共物品)
#[derive(Debug, Serialize)]
pub struct ShortfallWarning {
    pub item_name: String,
    pub required_quantity: BigDecimal,
    pub effective_quantity: BigDecimal,
    pub status: ProcurementStatus,
}

/// 响应体
#[derive(Debug, Serialize)]
pub struct PlanResponse {
    pub success: bool,
    pub message: String,
    pub plan: Option<AggregationResult>,
    pub summary: Option<PlanSummary>,
    pub warnings: Vec<ShortfallWarning>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub adjustment: Option<QuantityAdjustment>,
}

impl PlanResponse {
    fn ok(message: String, plan: AggregationResult) -> Self {
        let warnings = plan
            .shortfalls()
            .into_iter()
            .map(|g| ShortfallWarning {
                item_name: g.item_name.clone(),
                required_quantity: g.required_quantity.clone(),
                effective_quantity: g.effective_quantity.clone(),
                status: g.procurement_status(),
            })
            .collect();

        Self {
            success: true,
            message,
            summary: Some(plan.summary()),
            plan: Some(plan),
            warnings,
            adjustment: None,
        }
    }

    /// 不带计划的成功响应
    fn done(message: String) -> Self {
        Self {
            success: true,
            ..Self::error(message)
        }
    }

    fn error(message: String) -> Self {
        Self {
            success: false,
            message,
            plan: None,
            summary: None,
            warnings: Vec::new(),
            adjustment: None,
        }
    }
}

fn error_status(e: &PlannerError) -> StatusCode {
    match e {
        PlannerError::Database(_) => StatusCode::INTERNAL_SERVER_ERROR,
        PlannerError::SessionNotFound(_)
        | PlannerError::ExperimentNotFound(_)
        | PlannerError::ItemNotFound(_) => StatusCode::NOT_FOUND,
        PlannerError::Override(_) | PlannerError::InvalidInput(_) => StatusCode::BAD_REQUEST,
    }
}

fn error_response(e: PlannerError) -> Response {
    let status = error_status(&e);
    if status.is_server_error() {
        tracing::error!("请求处理失败: {}", e);
    }
    (status, Json(PlanResponse::error(format!("Error: {}", e)))).into_response()
}

fn plan_response(message: String, plan: AggregationResult) -> Response {
    (StatusCode::OK, Json(PlanResponse::ok(message, plan))).into_response()
}

/// 健康检查
pub async fn health_check() -> &'static str {
    "OK"
}

/// 无状态计算接口
pub async fn calculate(
    State(service): State<Arc<PlannerService>>,
    Json(req): Json<CalculateRequest>,
) -> Response {
    if req.experiment_ids.is_empty() {
        return error_response(PlannerError::InvalidInput("No experiments selected".to_string()));
    }
    if let Some((name, qty)) = req
        .item_custom_quantity
        .iter()
        .find(|(_, qty)| **qty < BigDecimal::zero())
    {
        return error_response(PlannerError::InvalidInput(format!(
            "Negative quantity for {}: {}",
            name, qty
        )));
    }

    let overrides = PlanOverrides::from_maps(req.item_usage_type, req.item_custom_quantity);
    match service.calculate(&req.experiment_ids, &overrides).await {
        Ok(plan) => plan_response(
            format!("Calculated {} experiments", plan.selected_count),
            plan,
        ),
        Err(e) => error_response(e),
    }
}

/// 会话当前计划
pub async fn get_session_plan(
    State(service): State<Arc<PlannerService>>,
    Path(session_id): Path<String>,
) -> Response {
    match service.session_plan(&session_id).await {
        Ok(plan) => plan_response(format!("Session {}", session_id), plan),
        Err(e) => error_response(e),
    }
}

/// 切换实验选择
pub async fn toggle_experiment(
    State(service): State<Arc<PlannerService>>,
    Path(session_id): Path<String>,
    Json(req): Json<ToggleRequest>,
) -> Response {
    match service.toggle_experiment(&session_id, &req.experiment_id).await {
        Ok((selected, plan)) => plan_response(
            format!(
                "Experiment {} {}",
                req.experiment_id,
                if selected { "selected" } else { "deselected" }
            ),
            plan,
        ),
        Err(e) => error_response(e),
    }
}

/// 设置物品用途
pub async fn set_usage(
    State(service): State<Arc<PlannerService>>,
    Path(session_id): Path<String>,
    Json(req): Json<UsageRequest>,
) -> Response {
    match service.set_usage(&session_id, &req.item_name, req.usage_type).await {
        Ok(plan) => plan_response(format!("Usage of {} updated", req.item_name), plan),
        Err(e) => error_response(e),
    }
}

/// 调整公共物品采购数量
pub async fn set_quantity(
    State(service): State<Arc<PlannerService>>,
    Path(session_id): Path<String>,
    Json(req): Json<QuantityRequest>,
) -> Response {
    match service
        .set_custom_quantity(&session_id, &req.item_name, req.quantity)
        .await
    {
        Ok((adjustment, plan)) => {
            let mut response =
                PlanResponse::ok(format!("Quantity of {} updated", req.item_name), plan);
            response.adjustment = Some(adjustment);
            (StatusCode::OK, Json(response)).into_response()
        }
        Err(e) => error_response(e),
    }
}

/// 关闭会话
pub async fn close_session(
    State(service): State<Arc<PlannerService>>,
    Path(session_id): Path<String>,
) -> Response {
    if service.close_session(&session_id) {
        (
            StatusCode::OK,
            Json(PlanResponse::done(format!("Session {} closed", session_id))),
        )
            .into_response()
    } else {
        error_response(PlannerError::SessionNotFound(session_id))
    }
}

/// 更新物品台账单价
pub async fn update_item_price(
    State(service): State<Arc<PlannerService>>,
    Path(item_id): Path<String>,
    Json(req): Json<PriceRequest>,
) -> Response {
    match service.update_item_price(&item_id, &req.price).await {
        Ok(()) => (
            StatusCode::OK,
            Json(PlanResponse::done(format!(
                "Price of item {} updated to {}",
                item_id, req.price
            ))),
        )
            .into_response(),
        Err(e) => error_response(e),
    }
}
