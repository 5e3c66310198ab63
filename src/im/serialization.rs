use serde::Deserialize;
use std::time::Duration;
use uuid::Uuid;

/// 消息组标识使用的命名空间（UUID v5）
const GROUP_ID_NAMESPACE: Uuid = Uuid::from_u128(0x8c3d_51a2_6f0e_4b47_9a1d_2e7c_b05f_63a9);

/// 以秒为单位反序列化 `Duration`（支持小数秒，负数视为 0）
pub fn deserialize_duration_secs<'de, D>(deserializer: D) -> Result<Duration, D::Error>
where
    D: serde::Deserializer<'de>,
{
    let secs: f64 = Deserialize::deserialize(deserializer)?;
    Duration::try_from_secs_f64(secs.max(0.0))
        .map_err(|e| serde::de::Error::custom(format!("无效的时长 {}: {}", secs, e)))
}

/// 以毫秒为单位反序列化 `Duration`
pub fn deserialize_duration_millis<'de, D>(deserializer: D) -> Result<Duration, D::Error>
where
    D: serde::Deserializer<'de>,
{
    let millis: u64 = Deserialize::deserialize(deserializer)?;
    Ok(Duration::from_millis(millis))
}

/// 生成本地消息 ID
pub fn generate_msg_id() -> Uuid {
    Uuid::new_v4()
}

/// 根据成员消息 ID 生成稳定的组标识
///
/// 相同的成员序列永远得到相同的结果，跨进程、跨版本保持一致。
pub fn stable_group_id<'a, I>(member_ids: I) -> Uuid
where
    I: IntoIterator<Item = &'a Uuid>,
{
    let mut bytes = Vec::new();
    for id in member_ids {
        bytes.extend_from_slice(id.as_bytes());
    }
    Uuid::new_v5(&GROUP_ID_NAMESPACE, &bytes)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Deserialize)]
    struct Wrapper {
        #[serde(deserialize_with = "deserialize_duration_secs")]
        interval: Duration,
        #[serde(deserialize_with = "deserialize_duration_millis")]
        delay: Duration,
    }

    #[test]
    fn durations_deserialize_from_numbers() {
        let parsed: Wrapper = serde_json::from_str(r#"{"interval": 90.5, "delay": 250}"#).unwrap();
        assert_eq!(parsed.interval, Duration::from_millis(90_500));
        assert_eq!(parsed.delay, Duration::from_millis(250));

        let negative: Wrapper = serde_json::from_str(r#"{"interval": -3, "delay": 0}"#).unwrap();
        assert_eq!(negative.interval, Duration::ZERO);
    }

    #[test]
    fn oversized_seconds_are_rejected() {
        let result = serde_json::from_str::<Wrapper>(r#"{"interval": 1e30, "delay": 0}"#);
        let error = result.err().expect("超出范围的时长应当返回错误");
        assert!(error.to_string().contains("无效的时长"));
    }

    #[test]
    fn group_id_depends_on_order_and_members() {
        let a = Uuid::new_v4();
        let b = Uuid::new_v4();
        assert_eq!(stable_group_id([&a, &b]), stable_group_id([&a, &b]));
        assert_ne!(stable_group_id([&a, &b]), stable_group_id([&b, &a]));
        assert_ne!(stable_group_id([&a]), stable_group_id([&a, &b]));
    }
}
