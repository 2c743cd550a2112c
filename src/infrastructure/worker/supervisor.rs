//! Consumer Supervisor
//!
//! 按配置的队列名启动已注册的调度器，关闭时统一停止

use futures_util::future::join_all;
use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use tokio::sync::Mutex;
use tokio_util::sync::CancellationToken;

use super::dispatcher::{DispatchError, Dispatcher};

pub struct ConsumerSupervisor {
    dispatchers: HashMap<String, Arc<dyn Dispatcher>>,
    started: Mutex<Vec<(String, Arc<dyn Dispatcher>)>>,
}

impl ConsumerSupervisor {
    pub fn new() -> Self {
        Self {
            dispatchers: HashMap::new(),
            started: Mutex::new(Vec::new()),
        }
    }

    /// 以调度器自身的事件 kind 作为队列名注册
    pub fn register(&mut self, dispatcher: Arc<dyn Dispatcher>) -> &mut Self {
        self.register_as(dispatcher.event_kind(), dispatcher)
    }

    pub fn register_as(&mut self, queue: impl Into<String>, dispatcher: Arc<dyn Dispatcher>) -> &mut Self {
        self.dispatchers.insert(queue.into(), dispatcher);
        self
    }

    pub fn registered(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.dispatchers.keys().map(String::as_str).collect();
        names.sort_unstable();
        names
    }

    /// 启动配置中的队列
    ///
    /// 重复与空白的名字被忽略，没有注册调度器的名字记录警告后跳过。
    /// 任一启动失败即返回错误，已启动的调度器仍由 `stop_all` 负责停止
    pub async fn start_all(
        &self,
        queues: &[String],
        cancel: &CancellationToken,
    ) -> Result<usize, DispatchError> {
        let mut seen = HashSet::new();
        let mut count = 0;

        for queue in queues.iter().map(|q| q.trim()) {
            if queue.is_empty() || !seen.insert(queue) {
                continue;
            }
            let Some(dispatcher) = self.dispatchers.get(queue) else {
                tracing::warn!(queue, "No dispatcher registered for queue, skipping");
                continue;
            };

            dispatcher.start(queue, cancel).await?;
            self.started
                .lock()
                .await
                .push((queue.to_string(), dispatcher.clone()));
            count += 1;
        }

        tracing::info!(started = count, "Consumers started");
        Ok(count)
    }

    /// 并发停止所有已启动的调度器
    pub async fn stop_all(&self) {
        let started = std::mem::take(&mut *self.started.lock().await);
        let results = join_all(started.iter().map(|(queue, dispatcher)| async move {
            (queue, dispatcher.stop().await)
        }))
        .await;

        for (queue, result) in results {
            if let Err(e) = result {
                tracing::error!(queue = %queue, error = %e, "Failed to stop dispatcher");
            }
        }
        tracing::info!(stopped = started.len(), "Consumers stopped");
    }
}

impl Default for ConsumerSupervisor {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::infrastructure::worker::DispatcherState;
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicU32, Ordering};

    /// 只记录调用次数的调度器
    struct CountingDispatcher {
        kind: &'static str,
        starts: AtomicU32,
        stops: AtomicU32,
    }

    impl CountingDispatcher {
        fn new(kind: &'static str) -> Arc<Self> {
            Arc::new(Self {
                kind,
                starts: AtomicU32::new(0),
                stops: AtomicU32::new(0),
            })
        }
    }

    #[async_trait]
    impl Dispatcher for CountingDispatcher {
        fn event_kind(&self) -> &'static str {
            self.kind
        }

        async fn start(&self, _queue: &str, _cancel: &CancellationToken) -> Result<(), DispatchError> {
            self.starts.fetch_add(1, Ordering::SeqCst);
            Ok(())
        }

        async fn stop(&self) -> Result<(), DispatchError> {
            self.stops.fetch_add(1, Ordering::SeqCst);
            Ok(())
        }

        async fn state(&self) -> DispatcherState {
            DispatcherState::Stopped
        }
    }

    #[tokio::test]
    async fn test_start_all_dedupes_and_skips() {
        let created = CountingDispatcher::new("book.created");
        let closed = CountingDispatcher::new("reader.closed");
        let mut supervisor = ConsumerSupervisor::new();
        supervisor.register(created.clone()).register(closed.clone());
        assert_eq!(supervisor.registered(), vec!["book.created", "reader.closed"]);

        let queues: Vec<String> = ["book.created", " ", "book.created", "unknown.kind", ""]
            .iter()
            .map(|s| s.to_string())
            .collect();
        let started = supervisor.start_all(&queues, &CancellationToken::new()).await.unwrap();

        assert_eq!(started, 1);
        assert_eq!(created.starts.load(Ordering::SeqCst), 1);
        assert_eq!(closed.starts.load(Ordering::SeqCst), 0);

        supervisor.stop_all().await;
        assert_eq!(created.stops.load(Ordering::SeqCst), 1);
        assert_eq!(closed.stops.load(Ordering::SeqCst), 0);

        // 第二次 stop_all 不再重复停止
        supervisor.stop_all().await;
        assert_eq!(created.stops.load(Ordering::SeqCst), 1);
    }
}
