//! 测试辅助：日志初始化、记录型监听器与消息构造

use crate::im::error::ChatAlert;
use crate::im::message::{ContentPart, DeliveryStatus, Message, MessageSender, TextElem};
use crate::im::thread::listener::ThreadViewListener;
use crate::im::thread::models::{Overlay, ThreadViewSnapshot};
use crate::im::types::{AgentInfo, ThreadSnapshot, ThreadStatus};
use async_trait::async_trait;
use chrono::{DateTime, TimeDelta, TimeZone, Utc};
use std::sync::{Arc, Mutex, Once};
use std::time::Duration;
use uuid::Uuid;

static INIT_LOGGER: Once = Once::new();

pub fn init_test_logger() {
    INIT_LOGGER.call_once(|| {
        use tracing_subscriber::prelude::*;
        use tracing_subscriber::EnvFilter;

        // 测试中打开当前 crate 的 debug
        let filter_layer = EnvFilter::try_from_default_env()
            .unwrap_or_else(|_| EnvFilter::new("info,chat_widget_core=debug"));

        let fmt_layer = tracing_subscriber::fmt::layer()
            .with_file(true)
            .with_line_number(true)
            .with_target(false)
            .with_test_writer();

        tracing_subscriber::registry()
            .with(filter_layer)
            .with(fmt_layer)
            .init();
    });
}

/// 监听器收到的回调
#[derive(Debug, Clone, PartialEq)]
pub enum Recorded {
    Snapshot(ThreadViewSnapshot),
    Overlay(Option<Overlay>),
    Alert(ChatAlert),
    Dismissed,
}

/// 按顺序记录全部回调的监听器
#[derive(Default)]
pub struct RecordingListener {
    recorded: Mutex<Vec<Recorded>>,
}

impl RecordingListener {
    pub fn recorded(&self) -> Vec<Recorded> {
        self.recorded.lock().unwrap().clone()
    }

    pub fn snapshots(&self) -> Vec<ThreadViewSnapshot> {
        self.recorded()
            .into_iter()
            .filter_map(|entry| match entry {
                Recorded::Snapshot(snapshot) => Some(snapshot),
                _ => None,
            })
            .collect()
    }

    pub fn overlays(&self) -> Vec<Option<Overlay>> {
        self.recorded()
            .into_iter()
            .filter_map(|entry| match entry {
                Recorded::Overlay(overlay) => Some(overlay),
                _ => None,
            })
            .collect()
    }

    pub fn alerts(&self) -> Vec<ChatAlert> {
        self.recorded()
            .into_iter()
            .filter_map(|entry| match entry {
                Recorded::Alert(alert) => Some(alert),
                _ => None,
            })
            .collect()
    }

    pub fn dismissed(&self) -> bool {
        self.recorded().contains(&Recorded::Dismissed)
    }

    fn push(&self, entry: Recorded) {
        self.recorded.lock().unwrap().push(entry);
    }
}

#[async_trait]
impl ThreadViewListener for RecordingListener {
    async fn on_view_state_changed(&self, snapshot: ThreadViewSnapshot) {
        self.push(Recorded::Snapshot(snapshot));
    }

    async fn on_overlay_changed(&self, overlay: Option<Overlay>) {
        self.push(Recorded::Overlay(overlay));
    }

    async fn on_alert(&self, alert: ChatAlert) {
        self.push(Recorded::Alert(alert));
    }

    async fn on_chat_dismissed(&self) {
        self.push(Recorded::Dismissed);
    }
}

/// 轮询等待监听器记录满足条件，超时 panic
pub async fn wait_until<F>(listener: &Arc<RecordingListener>, predicate: F)
where
    F: Fn(&[Recorded]) -> bool,
{
    let deadline = tokio::time::Instant::now() + Duration::from_secs(2);
    loop {
        if predicate(&listener.recorded()) {
            return;
        }
        if tokio::time::Instant::now() >= deadline {
            panic!("等待超时，已记录: {:#?}", listener.recorded());
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
}

pub fn base_time() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, 5, 1, 9, 0, 0).unwrap()
}

pub fn agent() -> AgentInfo {
    AgentInfo {
        id: "agent-1".to_string(),
        first_name: "Li".to_string(),
        last_name: "Lei".to_string(),
        nickname: None,
    }
}

pub fn customer() -> MessageSender {
    MessageSender::customer("customer-1", "Han Meimei")
}

fn text_message(sender: MessageSender, offset_secs: i64, text: &str) -> Message {
    Message::new(
        sender,
        vec![ContentPart::Text(TextElem {
            text: text.to_string(),
        })],
        base_time() + TimeDelta::seconds(offset_secs),
    )
}

pub fn agent_message(offset_secs: i64, text: &str) -> Message {
    text_message(MessageSender::agent("agent-1", "Li Lei"), offset_secs, text)
}

pub fn customer_message(offset_secs: i64, text: &str) -> Message {
    let mut message = text_message(customer(), offset_secs, text);
    message.status = DeliveryStatus::Delivered;
    message
}

pub fn thread_with(status: ThreadStatus, messages: Vec<Message>) -> ThreadSnapshot {
    ThreadSnapshot {
        status,
        messages,
        ..ThreadSnapshot::new(Uuid::new_v4())
    }
}
