//! Event Publishing - 领域事件发布

mod publisher;

pub use publisher::BrokerEventPublisher;
