//! 消息模块
//!
//! 消息模型、内容片段、附件校验以及消息分组

pub mod attachment;
pub mod grouping;
pub mod models;
pub mod types;

// 重新导出主要类型和函数
pub use attachment::{AttachmentUpload, FileRestrictions};
pub use grouping::{group_messages, MessageGroup, DEFAULT_GROUPING_INTERVAL};
pub use models::{DeliveryStatus, Message, MessageSender};
pub use types::{
    ContentPart, InactivityPopupElem, ListPickerElem, MediaElem, QuickRepliesElem, ReplyButton,
    RichLinkElem, TextElem,
};
