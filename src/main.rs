//! Folio worker
//!
//! 装配 SQLite 仓储、sled 缓存、对象存储与嵌入式 broker，
//! 为每个配置的队列启动调度器，Ctrl-C 后有序停止

use std::sync::Arc;
use std::time::Duration;

use folio::application::consumers::{ActivityLogHandler, ReportGenerateHandler};
use folio::application::ports::{ActivityLogRepositoryPort, BlobStorePort};
use folio::application::{CacheGateway, ReportGenerator};
use folio::config::{load_config, print_config, BlobBackend};
use folio::domain::events::{
    ActivityPayload, BookArchived, BookBorrowed, BookCreated, BookReturned, ReaderClosed,
    ReaderCreated,
};
use folio::infrastructure::blob::ObjectStoreBlobStore;
use folio::infrastructure::broker::SharedConnection;
use folio::infrastructure::persistence::sled::SledCacheStore;
use folio::infrastructure::persistence::sqlite::{
    create_pool, run_migrations, DatabaseConfig, SqliteActivityLogRepository,
    SqliteReportRepository,
};
use folio::infrastructure::worker::{
    spawn_cache_sweeper, ConsumerSupervisor, Dispatcher, QueueDispatcher,
};
use tokio_util::sync::CancellationToken;

fn activity_dispatcher<P: ActivityPayload>(
    connection: &Arc<SharedConnection>,
    log_repo: &Arc<dyn ActivityLogRepositoryPort>,
) -> Arc<dyn Dispatcher> {
    QueueDispatcher::new(connection.clone(), ActivityLogHandler::<P>::new(log_repo.clone())).arc()
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // 加载配置（优先级：环境变量 > 配置文件 > 默认值）
    let config = load_config().map_err(|e| anyhow::anyhow!("Failed to load config: {}", e))?;

    // 初始化日志
    let log_filter = format!("{},folio={}", config.log.level, config.log.level);
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(&log_filter)),
        )
        .init();

    tracing::info!("Folio - library catalog worker");
    print_config(&config);

    // 确保数据目录存在
    if let Some(parent) = std::path::Path::new(&config.database.path).parent() {
        tokio::fs::create_dir_all(parent).await?;
    }

    // 初始化数据库
    let db_config = DatabaseConfig {
        database_url: config.database.database_url(),
        max_connections: config.database.max_connections,
    };
    let pool = create_pool(&db_config).await?;
    run_migrations(&pool).await?;

    let report_repo = Arc::new(SqliteReportRepository::new(pool.clone()));
    let log_repo: Arc<dyn ActivityLogRepositoryPort> =
        Arc::new(SqliteActivityLogRepository::new(pool.clone()));

    // 缓存
    let cache_store = SledCacheStore::open(&config.cache.store_config()).await?.arc();
    let cache = CacheGateway::new(cache_store.clone());

    // 对象存储
    let blob_store: Arc<dyn BlobStorePort> = match config.blob.backend {
        BlobBackend::Memory => Arc::new(ObjectStoreBlobStore::in_memory(config.blob.store_config())),
        BlobBackend::Local => Arc::new(ObjectStoreBlobStore::local(
            &config.blob.root,
            config.blob.store_config(),
        )?),
    };

    let shutdown = CancellationToken::new();
    let connection = Arc::new(SharedConnection::new(config.broker.broker_config()));

    let generator = Arc::new(ReportGenerator::new(
        report_repo,
        log_repo.clone(),
        blob_store,
        cache,
    ));

    // 每个事件 kind 一个调度器
    let mut supervisor = ConsumerSupervisor::new();
    supervisor
        .register(activity_dispatcher::<BookCreated>(&connection, &log_repo))
        .register(activity_dispatcher::<BookArchived>(&connection, &log_repo))
        .register(activity_dispatcher::<BookBorrowed>(&connection, &log_repo))
        .register(activity_dispatcher::<BookReturned>(&connection, &log_repo))
        .register(activity_dispatcher::<ReaderCreated>(&connection, &log_repo))
        .register(activity_dispatcher::<ReaderClosed>(&connection, &log_repo))
        .register(
            QueueDispatcher::new(connection.clone(), ReportGenerateHandler::new(generator)).arc(),
        );

    let sweeper = spawn_cache_sweeper(
        cache_store.clone(),
        Duration::from_secs(config.cache.sweep_interval_secs),
        shutdown.clone(),
    );

    if let Err(e) = supervisor.start_all(&config.queues.names, &shutdown).await {
        tracing::error!(error = %e, "Failed to start consumers");
        shutdown.cancel();
        supervisor.stop_all().await;
        return Err(e.into());
    }

    tracing::info!("Worker running, press Ctrl-C to stop");
    tokio::signal::ctrl_c().await?;
    tracing::info!("Received shutdown signal");

    shutdown.cancel();
    supervisor.stop_all().await;
    if let Err(e) = sweeper.await {
        tracing::error!(error = %e, "Cache sweeper ended abnormally");
    }
    cache_store.flush().await?;

    tracing::info!("Worker shutdown complete");

    Ok(())
}
