pub mod broccoli;
pub mod channel;
pub mod error;
pub mod memory;
pub mod queue;

pub use broccoli::BroccoliChannel;
pub use channel::{Binding, Delivery, DeliveryHandler, Disposition, MessageChannel, Subscription};
pub use error::MqError;
pub use memory::{MemoryChannel, PublishedMessage};
pub use queue::{BroccoliError, BrokerMessage, MqConfig, MqQueue, init_mq};
