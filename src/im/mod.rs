pub mod client;
pub mod container;
pub mod delegate;
pub mod error;
pub mod memory_client;
pub mod message;
pub mod serialization;
pub mod thread;
pub mod types;

#[cfg(test)]
pub(crate) mod test_support;

// 重新导出容器与 SDK 接口
pub use client::{ChatClient, OutgoingMessage};
pub use container::ChatContainer;
pub use delegate::{ChatDelegate, EmptyChatDelegate};
pub use memory_client::InMemoryChatClient;

// 重新导出错误与提示框相关类型
pub use error::{AlertResponse, AttachmentError, ChatAlert, FailedOperation};
