//! 消息分组
//!
//! 把按时间排序的消息列表切分成连续的组：同一发送者、时间间隔不超过阈值的相邻消息
//! 归为一组，并计算每组是否显示日期头（header）和投递状态尾（footer）。
//!
//! 纯函数，无状态、无 I/O，可以在任意线程调用。

use crate::im::message::models::{DeliveryStatus, Message, MessageSender};
use crate::im::serialization::stable_group_id;
use chrono::{DateTime, TimeDelta, Utc};
use std::time::Duration;
use tracing::trace;
use uuid::Uuid;

/// 默认分组间隔：120 秒
pub const DEFAULT_GROUPING_INTERVAL: Duration = Duration::from_secs(120);

/// 消息组（派生视图，每次消息列表变化都会重新计算）
#[derive(Debug, Clone, PartialEq)]
pub struct MessageGroup {
    messages: Vec<Message>,
    pub show_header: bool,
    pub show_footer: bool,
}

impl MessageGroup {
    /// 组内消息，至少一条
    pub fn messages(&self) -> &[Message] {
        &self.messages
    }

    /// 稳定标识：由成员消息 ID 推导
    pub fn id(&self) -> Uuid {
        stable_group_id(self.messages.iter().map(|message| &message.id))
    }

    /// 组的整体状态 = 最后一条消息的状态
    pub fn status(&self) -> DeliveryStatus {
        self.last().status
    }

    /// 组的日期 = 第一条消息的时间
    pub fn date(&self) -> DateTime<Utc> {
        self.first().created_at
    }

    /// 组的发送者 = 第一条消息的发送者
    pub fn sender(&self) -> &MessageSender {
        &self.first().sender
    }

    fn first(&self) -> &Message {
        // 构造时保证非空
        &self.messages[0]
    }

    fn last(&self) -> &Message {
        &self.messages[self.messages.len() - 1]
    }
}

/// 两条消息之间的绝对时间差
fn abs_delta(a: &Message, b: &Message) -> TimeDelta {
    (b.created_at - a.created_at).abs()
}

/// 相邻两条消息是否属于同一组
fn should_group(previous: &Message, current: &Message, interval: TimeDelta) -> bool {
    !previous.is_rich_content_only()
        && !current.is_rich_content_only()
        && previous.sender.id == current.sender.id
        && abs_delta(previous, current) <= interval
}

/// 对消息列表进行分组
///
/// - 输出各组成员依次拼接后与输入完全一致（只切分，不过滤）
/// - 每条消息只与紧邻的前一条比较，不与组内第一条比较
/// - 时间戳非单调时仍按上述规则给出确定的结果
pub fn group_messages(messages: &[Message], interval: Duration) -> Vec<MessageGroup> {
    // 超出 TimeDelta 表示范围的间隔等价于“无限长”
    let interval = TimeDelta::from_std(interval).unwrap_or(TimeDelta::MAX);

    let mut runs: Vec<Vec<Message>> = Vec::new();
    for message in messages {
        let display = message.sorted_for_display();
        match runs.last_mut() {
            Some(run)
                if run
                    .last()
                    .is_some_and(|previous| should_group(previous, message, interval)) =>
            {
                run.push(display);
            }
            _ => runs.push(vec![display]),
        }
    }

    let run_count = runs.len();
    let mut groups: Vec<MessageGroup> = Vec::with_capacity(run_count);
    for (index, run) in runs.into_iter().enumerate() {
        let (Some(first), Some(last)) = (run.first(), run.last()) else {
            continue;
        };

        let show_header = match groups.last() {
            None => true,
            Some(previous) => abs_delta(previous.last(), first) > interval,
        };

        let is_last = index + 1 == run_count;
        let show_footer =
            is_last || (last.status == DeliveryStatus::Seen && !first.sender.is_local_user());

        groups.push(MessageGroup {
            messages: run,
            show_header,
            show_footer,
        });
    }

    trace!(
        "[Grouping] {} 条消息分为 {} 组",
        messages.len(),
        groups.len()
    );
    groups
}
