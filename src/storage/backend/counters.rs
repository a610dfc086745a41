//! 天级 IN/OUT 计数
//!
//! 每个 (site_id, day) 一行，写入走单条 upsert，读取在窗口内汇总。

use std::collections::HashMap;

use async_trait::async_trait;
use chrono::NaiveDate;
use sea_orm::{
    ActiveValue::{NotSet, Set},
    ColumnTrait, EntityTrait, ExprTrait, QueryFilter,
    sea_query::{Expr, OnConflict},
};
use tracing::{error, trace};

use super::SeaOrmStorage;
use super::retry;
use crate::errors::{ReaccessError, Result};
use crate::storage::CounterStore;
use crate::storage::models::{CounterMetric, SiteId, SiteTotals};
use migration::entities::site_daily;

fn metric_column(metric: CounterMetric) -> site_daily::Column {
    match metric {
        CounterMetric::In => site_daily::Column::InCount,
        CounterMetric::Out => site_daily::Column::OutCount,
    }
}

#[async_trait]
impl CounterStore for SeaOrmStorage {
    async fn increment_daily(
        &self,
        site_id: SiteId,
        day: NaiveDate,
        metric: CounterMetric,
    ) -> Result<()> {
        let column = metric_column(metric);
        let (in_count, out_count) = match metric {
            CounterMetric::In => (1, 0),
            CounterMetric::Out => (0, 1),
        };

        // 行不存在时插入 1，存在时原地 +1，并发下也不会丢计数
        let op_name = format!("increment_{}", metric.as_ref());
        retry::with_retry(&op_name, self.retry_config, || async {
            let row = site_daily::ActiveModel {
                id: NotSet,
                site_id: Set(site_id),
                day: Set(day),
                in_count: Set(in_count),
                out_count: Set(out_count),
            };
            site_daily::Entity::insert(row)
                .on_conflict(
                    OnConflict::columns([site_daily::Column::SiteId, site_daily::Column::Day])
                        .value(column, Expr::col(column).add(1))
                        .to_owned(),
                )
                .exec_without_returning(&self.db)
                .await
        })
        .await
        .map_err(|e| {
            error!("计数写入失败 site={} day={}: {}", site_id, day, e);
            ReaccessError::from(e)
        })?;

        trace!("site {} {} +1 on {}", site_id, metric.as_ref(), day);
        Ok(())
    }

    async fn sum_range(
        &self,
        site_ids: &[SiteId],
        start: NaiveDate,
        end: NaiveDate,
    ) -> Result<HashMap<SiteId, SiteTotals>> {
        if site_ids.is_empty() || start > end {
            return Ok(HashMap::new());
        }

        // 窗口最多几十天，逐行取回后在内存中汇总，避免各方言 SUM 返回类型不一致
        let rows = retry::with_retry("sum_range", self.retry_config, || async {
            site_daily::Entity::find()
                .filter(site_daily::Column::SiteId.is_in(site_ids.iter().copied()))
                .filter(site_daily::Column::Day.gte(start))
                .filter(site_daily::Column::Day.lte(end))
                .all(&self.db)
                .await
        })
        .await?;

        let mut totals: HashMap<SiteId, SiteTotals> = HashMap::with_capacity(site_ids.len());
        for row in rows {
            let entry = totals.entry(row.site_id).or_default();
            entry.total_in = entry.total_in.saturating_add(Ord::max(row.in_count, 0) as u64);
            entry.total_out = entry.total_out.saturating_add(Ord::max(row.out_count, 0) as u64);
        }
        Ok(totals)
    }
}
