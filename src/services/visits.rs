//! Visit recording
//!
//! 把来源页或跳转目标的 URL 归到某个已审核站点，再给它记一次 IN/OUT。
//! 两边都先经过别名表，再按域名比较。

use std::collections::HashMap;
use std::sync::Arc;

use chrono::NaiveDate;
use tracing::{debug, trace};

use crate::errors::Result;
use crate::storage::{CounterMetric, CounterStore, SiteId, SiteRegistry};
use crate::utils::url_normalizer::{base_domain, resolve_alias};

pub struct VisitRecorder {
    registry: Arc<dyn SiteRegistry>,
    counters: Arc<dyn CounterStore>,
    aliases: HashMap<String, String>,
}

impl VisitRecorder {
    /// 别名表取自全局配置的 `tracking.url_aliases`
    pub fn new(registry: Arc<dyn SiteRegistry>, counters: Arc<dyn CounterStore>) -> Self {
        let aliases = crate::config::get_config().tracking.url_aliases.clone();
        Self::with_aliases(registry, counters, aliases)
    }

    pub fn with_aliases(
        registry: Arc<dyn SiteRegistry>,
        counters: Arc<dyn CounterStore>,
        aliases: HashMap<String, String>,
    ) -> Self {
        Self {
            registry,
            counters,
            aliases,
        }
    }

    /// 域名匹配的第一个已审核站点（按注册先后）
    pub async fn match_site(&self, url: &str) -> Result<Option<SiteId>> {
        let Some(resolved) = resolve_alias(url, &self.aliases) else {
            return Ok(None);
        };
        let host = base_domain(&resolved);

        let mut sites = self.registry.list_approved().await?;
        sites.sort_by_key(|s| s.id);
        for site in sites {
            let Some(site_resolved) = resolve_alias(&site.display_url, &self.aliases) else {
                continue;
            };
            if base_domain(&site_resolved) == host {
                trace!("{} matched site {}", url, site.id);
                return Ok(Some(site.id));
            }
        }
        Ok(None)
    }

    /// 匹配到站点时记一次访问并返回站点 id，未注册的地址不记录
    pub async fn record(
        &self,
        url: &str,
        metric: CounterMetric,
        day: NaiveDate,
    ) -> Result<Option<SiteId>> {
        let Some(site_id) = self.match_site(url).await? else {
            debug!(
                "No registered site for {}, {} visit skipped",
                url,
                metric.as_ref()
            );
            return Ok(None);
        };
        self.counters.increment_daily(site_id, day, metric).await?;
        Ok(Some(site_id))
    }
}
