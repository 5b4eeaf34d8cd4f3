use crate::models::{ExperimentItemRow, ExperimentRow};
use bigdecimal::BigDecimal;
use sqlx::PgPool;

/// 批量查询实验主表
pub async fn list_experiments(
    pool: &PgPool,
    experiment_ids: &[String],
) -> Result<Vec<ExperimentRow>, sqlx::Error> {
    sqlx::query_as::<_, ExperimentRow>(
        r#"
        SELECT fid, fname, fcategory, ftrials,
               coalesce(fgrades, '{}'::int4[]) as fgrades
        FROM t_lab_experiment
        WHERE fid = ANY($1)
        "#
    )
    .bind(experiment_ids)
    .fetch_all(pool)
    .await
}

/// 批量查询实验明细 (价格为明细快照)
pub async fn list_experiment_items(
    pool: &PgPool,
    experiment_ids: &[String],
) -> Result<Vec<ExperimentItemRow>, sqlx::Error> {
    sqlx::query_as::<_, ExperimentItemRow>(
        r#"
        SELECT ei.fexpid, ei.fseq,
               it.fname as fitemname,
               ei.fqty,
               it.funit,
               ei.fprice,
               it.fcategory
        FROM t_lab_experiment_item ei
        INNER JOIN t_lab_item it ON it.fid = ei.fitemid
        WHERE ei.fexpid = ANY($1)
        ORDER BY ei.fexpid, ei.fseq
        "#
    )
    .bind(experiment_ids)
    .fetch_all(pool)
    .await
}

/// 更新物品台账当前单价, 返回影响行数
pub async fn update_item_price(
    pool: &PgPool,
    item_id: &str,
    price: &BigDecimal,
) -> Result<u64, sqlx::Error> {
    let result = sqlx::query(
        r#"
        UPDATE t_lab_item
        SET fprice = $1
        WHERE fid = $2
        "#
    )
    .bind(price)
    .bind(item_id)
    .execute(pool)
    .await?;

    tracing::info!("物品 {} 单价更新为 {}, 影响 {} 行", item_id, price, result.rows_affected());
    Ok(result.rows_affected())
}
