//! 消息内容类型定义
//!
//! 一条消息由若干 [`ContentPart`] 组成，每个变体对应一种内容元素。
//! 所有消费方都必须穷尽匹配，新增变体时编译器会指出需要处理的位置。

use serde::{Deserialize, Serialize};

/// 文本元素
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TextElem {
    #[serde(rename = "text")]
    pub text: String,
}

/// 媒体附件元素（图片、视频、音频、文档共用）
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MediaElem {
    #[serde(rename = "url")]
    pub url: String,
    #[serde(rename = "fileName")]
    pub file_name: String,
    #[serde(rename = "mimeType")]
    pub mime_type: String,
    #[serde(rename = "size", default)]
    pub size: u64,
}

/// 富链接元素
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RichLinkElem {
    #[serde(rename = "title")]
    pub title: String,
    #[serde(rename = "url")]
    pub url: String,
    #[serde(rename = "imageUrl", skip_serializing_if = "Option::is_none")]
    pub image_url: Option<String>,
}

/// 快捷回复 / 列表选择中的按钮
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReplyButton {
    #[serde(rename = "text")]
    pub text: String,
    #[serde(rename = "postback", skip_serializing_if = "Option::is_none")]
    pub postback: Option<String>,
    #[serde(rename = "description", skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

/// 快捷回复元素
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QuickRepliesElem {
    #[serde(rename = "title")]
    pub title: String,
    #[serde(rename = "buttons")]
    pub buttons: Vec<ReplyButton>,
}

/// 列表选择元素
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ListPickerElem {
    #[serde(rename = "title")]
    pub title: String,
    #[serde(rename = "text")]
    pub text: String,
    #[serde(rename = "elements")]
    pub elements: Vec<ReplyButton>,
}

/// 不活跃提醒弹窗元素
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InactivityPopupElem {
    #[serde(rename = "title")]
    pub title: String,
    #[serde(rename = "body")]
    pub body: String,
    #[serde(rename = "remainingSeconds", default)]
    pub remaining_seconds: u64,
}

/// 消息内容片段
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", content = "payload", rename_all = "camelCase")]
pub enum ContentPart {
    Text(TextElem),
    Image(MediaElem),
    Video(MediaElem),
    Audio(MediaElem),
    Document(MediaElem),
    RichLink(RichLinkElem),
    QuickReplies(QuickRepliesElem),
    ListPicker(ListPickerElem),
    InactivityPopup(InactivityPopupElem),
    /// 当前版本无法展示的内容，保留服务端给出的兜底文案
    Unsupported {
        #[serde(rename = "fallbackText", default)]
        fallback_text: String,
    },
}

impl ContentPart {
    /// 纯文本片段的便捷构造
    pub fn text(text: impl Into<String>) -> Self {
        ContentPart::Text(TextElem { text: text.into() })
    }

    /// 是否携带附件（图片、视频、音频、文档）
    pub fn is_attachment(&self) -> bool {
        match self {
            ContentPart::Image(_)
            | ContentPart::Video(_)
            | ContentPart::Audio(_)
            | ContentPart::Document(_) => true,
            ContentPart::Text(_)
            | ContentPart::RichLink(_)
            | ContentPart::QuickReplies(_)
            | ContentPart::ListPicker(_)
            | ContentPart::InactivityPopup(_)
            | ContentPart::Unsupported { .. } => false,
        }
    }

    /// 是否为可交互的富内容
    pub fn is_rich(&self) -> bool {
        match self {
            ContentPart::RichLink(_)
            | ContentPart::QuickReplies(_)
            | ContentPart::ListPicker(_)
            | ContentPart::InactivityPopup(_) => true,
            ContentPart::Text(_)
            | ContentPart::Image(_)
            | ContentPart::Video(_)
            | ContentPart::Audio(_)
            | ContentPart::Document(_)
            | ContentPart::Unsupported { .. } => false,
        }
    }

    /// 用于日志和通知的简短摘要
    pub fn summary(&self) -> String {
        match self {
            ContentPart::Text(elem) => elem.text.clone(),
            ContentPart::Image(_) => "[图片]".to_string(),
            ContentPart::Video(_) => "[视频]".to_string(),
            ContentPart::Audio(_) => "[语音]".to_string(),
            ContentPart::Document(elem) => format!("[文件] {}", elem.file_name),
            ContentPart::RichLink(elem) => format!("[链接] {}", elem.title),
            ContentPart::QuickReplies(elem) => format!("[快捷回复] {}", elem.title),
            ContentPart::ListPicker(elem) => format!("[列表] {}", elem.title),
            ContentPart::InactivityPopup(elem) => format!("[提醒] {}", elem.title),
            ContentPart::Unsupported { fallback_text } => fallback_text.clone(),
        }
    }
}
