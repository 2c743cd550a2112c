//! Message Broker - 嵌入式持久队列
//!
//! 以 sled 为存储的点对点队列，按 AMQP 的方式使用：
//! connection（进程内共享、惰性建立）→ channel（每次操作一个）→ declare / publish / consume / cancel。
//! 每个队列是一棵有序树，key 为单调递增的消息 id，消费即 `pop_min`（收到即确认）。

mod channel;
mod connection;

pub use channel::{Channel, Delivery, DeliveryHandler};
pub use connection::{BrokerConfig, BrokerConnection, BrokerError, SharedConnection};
