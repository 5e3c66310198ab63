//! 聊天 SDK 客户端接口
//!
//! 连接管理、消息传输、附件上传都由外部 SDK 负责，这里只定义本 crate 需要调用的最小契约。
//! 所有方法都是异步且可能失败的，失败统一用 `anyhow::Error` 表示，由调用方归类处理。

use crate::im::message::attachment::AttachmentUpload;
use crate::im::types::ThreadSnapshot;
use anyhow::Result;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use uuid::Uuid;

/// 待发送的消息
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OutgoingMessage {
    #[serde(default)]
    pub text: Option<String>,
    #[serde(default)]
    pub attachments: Vec<AttachmentUpload>,
    /// 快捷回复 / 列表选择的回传值
    #[serde(default)]
    pub postback: Option<String>,
}

impl OutgoingMessage {
    pub fn text(text: impl Into<String>) -> Self {
        Self {
            text: Some(text.into()),
            ..Self::default()
        }
    }

    /// 没有文本也没有附件的消息不应发送
    pub fn is_empty(&self) -> bool {
        self.text.as_deref().map_or(true, |text| text.trim().is_empty())
            && self.attachments.is_empty()
    }
}

/// 外部聊天 SDK 的最小接口
#[async_trait]
pub trait ChatClient: Send + Sync {
    /// 建立连接，结果通过 `ChatDelegate::on_chat_updated` 回调通知
    async fn connect(&self) -> Result<()>;

    /// 断开连接
    async fn disconnect(&self) -> Result<()>;

    /// 当前客户的全部线程
    async fn get_threads(&self) -> Result<Vec<ThreadSnapshot>>;

    /// 创建新线程，附带会话级自定义字段
    async fn create_thread(&self, custom_fields: HashMap<String, String>) -> Result<ThreadSnapshot>;

    /// 加载线程的完整消息历史，完成后 SDK 会回调 `on_thread_updated`
    async fn load_thread(&self, thread_id: Uuid) -> Result<()>;

    /// 分页加载更早的消息
    async fn load_more_messages(&self, thread_id: Uuid) -> Result<()>;

    async fn send_message(&self, thread_id: Uuid, message: OutgoingMessage) -> Result<()>;

    /// 标记线程已读
    async fn mark_read(&self, thread_id: Uuid) -> Result<()>;

    /// 设置线程级自定义字段
    async fn set_custom_fields(
        &self,
        thread_id: Uuid,
        custom_fields: HashMap<String, String>,
    ) -> Result<()>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn outgoing_message_emptiness() {
        assert!(OutgoingMessage::default().is_empty());
        assert!(OutgoingMessage::text("   ").is_empty());
        assert!(!OutgoingMessage::text("hi").is_empty());

        let postback_only = OutgoingMessage {
            postback: Some("yes".to_string()),
            ..OutgoingMessage::default()
        };
        assert!(postback_only.is_empty());

        let with_file = OutgoingMessage {
            attachments: vec![AttachmentUpload {
                file_name: "a.png".to_string(),
                mime_type: "image/png".to_string(),
                size_bytes: 1,
                url: "file:///tmp/a.png".to_string(),
            }],
            ..OutgoingMessage::default()
        };
        assert!(!with_file.is_empty());
    }
}
