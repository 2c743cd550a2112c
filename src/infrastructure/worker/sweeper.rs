//! Cache Sweeper - 定期清理过期缓存条目

use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

use crate::application::ports::CacheStorePort;

/// 启动清理任务，取消 token 后退出
pub fn spawn_cache_sweeper(
    store: Arc<dyn CacheStorePort>,
    interval: Duration,
    cancel: CancellationToken,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(interval);
        ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);

        loop {
            tokio::select! {
                _ = cancel.cancelled() => break,
                _ = ticker.tick() => {}
            }

            match store.purge_expired().await {
                Ok(0) => {}
                Ok(removed) => tracing::info!(removed, "Expired cache entries purged"),
                Err(e) => tracing::warn!(error = %e, "Cache sweep failed"),
            }
        }

        tracing::debug!("Cache sweeper stopped");
    })
}
