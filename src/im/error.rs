//! 面向界面的错误归类
//!
//! SDK 调用统一返回 `anyhow::Result`，在协调流程或用户操作的边界处归类为三种结果之一：
//! 通用的“重试 / 断开”提示、附件校验提示、或者只记日志。

use thiserror::Error;

/// 附件校验失败
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AttachmentError {
    #[error("当前渠道未开启附件功能")]
    AttachmentsDisabled,
    #[error("文件 {file_name} 大小 {size_bytes} 字节超过上限 {limit_bytes} 字节")]
    TooLarge {
        file_name: String,
        size_bytes: u64,
        limit_bytes: u64,
    },
    #[error("不支持的文件类型: {mime_type}")]
    UnsupportedType { mime_type: String },
}

/// 失败发生的操作
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailedOperation {
    Connect,
    Disconnect,
    RecoverThread,
    CreateThread,
    SendMessage,
    LoadMoreMessages,
}

impl std::fmt::Display for FailedOperation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            FailedOperation::Connect => "连接",
            FailedOperation::Disconnect => "断开连接",
            FailedOperation::RecoverThread => "恢复会话",
            FailedOperation::CreateThread => "创建会话",
            FailedOperation::SendMessage => "发送消息",
            FailedOperation::LoadMoreMessages => "加载更多消息",
        };
        f.write_str(name)
    }
}

/// 展示给用户的提示框
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ChatAlert {
    /// 通用错误：提供“重试”与“断开”两个选项
    Generic {
        operation: FailedOperation,
        message: String,
    },
    /// 附件校验错误：提示用户修正后再发送
    Validation(AttachmentError),
}

impl ChatAlert {
    /// 从传输层错误构造通用提示
    pub fn transport(operation: FailedOperation, error: &anyhow::Error) -> Self {
        ChatAlert::Generic {
            operation,
            message: format!("{:#}", error),
        }
    }

    pub fn is_retryable(&self) -> bool {
        matches!(self, ChatAlert::Generic { .. })
    }
}

/// 用户对提示框的选择
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AlertResponse {
    /// 重新连接并重试
    Retry,
    /// 断开连接
    Disconnect,
    /// 仅关闭提示框
    Dismiss,
}

#[cfg(test)]
mod tests {
    use super::*;
    use anyhow::Context;

    #[test]
    fn transport_alert_keeps_context_chain() {
        let error = Err::<(), _>(anyhow::anyhow!("socket closed"))
            .context("加载会话失败")
            .unwrap_err();
        let alert = ChatAlert::transport(FailedOperation::RecoverThread, &error);
        match &alert {
            ChatAlert::Generic { operation, message } => {
                assert_eq!(*operation, FailedOperation::RecoverThread);
                assert!(message.contains("加载会话失败"));
                assert!(message.contains("socket closed"));
            }
            other => panic!("unexpected alert: {:?}", other),
        }
        assert!(alert.is_retryable());
        assert!(!ChatAlert::Validation(AttachmentError::AttachmentsDisabled).is_retryable());
    }

    #[test]
    fn attachment_error_messages_name_the_file() {
        let error = AttachmentError::TooLarge {
            file_name: "video.mov".to_string(),
            size_bytes: 50,
            limit_bytes: 10,
        };
        assert!(error.to_string().contains("video.mov"));
    }
}
