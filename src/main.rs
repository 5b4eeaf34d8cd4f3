use axum::{routing::{get, post, put}, Router};
use lab_procure::{api, create_pool, service::PgExperimentSource, AppConfig, PlannerService};
use std::sync::Arc;
use tower::ServiceBuilder;
use tracing::info;
use tracing_subscriber::fmt::time::ChronoLocal;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // 初始化日志 - 使用本地时间格式
    tracing_subscriber::fmt()
        .with_timer(ChronoLocal::new("%Y-%m-%d %H:%M:%S".to_string()))
        .with_target(true)
        .with_level(true)
        .init();

    // 加载配置
    let config = AppConfig::load()?;
    info!("Starting server with config: {:?}", config);

    // 创建数据库连接池
    let pool = create_pool(&config.database).await?;
    info!("Database pool created");

    let source = Arc::new(PgExperimentSource::new(pool));
    let planner = Arc::new(PlannerService::new(source, &config.planner));

    // 构建路由
    let plan_routes = Router::new()
        .route("/api/calculate", post(api::calculate))
        .route(
            "/api/sessions/:session_id",
            get(api::get_session_plan).delete(api::close_session),
        )
        .route("/api/sessions/:session_id/toggle", post(api::toggle_experiment))
        .route("/api/sessions/:session_id/usage", post(api::set_usage))
        .route("/api/sessions/:session_id/quantity", post(api::set_quantity))
        .route("/api/items/:item_id/price", put(api::update_item_price))
        .with_state(planner);

    let app = Router::new()
        .route("/health", get(api::health_check))
        .merge(plan_routes)
        .layer(ServiceBuilder::new());

    // 启动服务器
    let addr = format!("{}:{}", config.server.host, config.server.port);
    info!("Server listening on {}", addr);
    info!("API Endpoints:");
    info!("  POST   /api/calculate                  - stateless plan");
    info!("  GET    /api/sessions/:id               - session plan");
    info!("  POST   /api/sessions/:id/toggle        - toggle experiment");
    info!("  POST   /api/sessions/:id/usage         - common/unique override");
    info!("  POST   /api/sessions/:id/quantity      - procurement quantity override");
    info!("  DELETE /api/sessions/:id               - close session");
    info!("  PUT    /api/items/:id/price            - refresh ledger price");

    let listener = tokio::net::TcpListener::bind(&addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
