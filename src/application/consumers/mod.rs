//! 应用层 - 事件消费者
//!
//! 每个队列对应一个类型化的 `EventHandler`；投递、解码与生命周期由基础设施层的调度器负责

mod activity_log;
mod report_generate;

pub use activity_log::ActivityLogHandler;
pub use report_generate::ReportGenerateHandler;

use async_trait::async_trait;

use crate::application::error::ApplicationError;
use crate::domain::events::{EventEnvelope, EventPayload};

/// 单一事件类型的处理器
#[async_trait]
pub trait EventHandler: Send + Sync + 'static {
    type Payload: EventPayload;

    async fn handle(&self, event: EventEnvelope<Self::Payload>) -> Result<(), ApplicationError>;
}
