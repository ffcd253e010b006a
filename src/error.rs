// ==========================================
// 赛季排赛引擎 - 错误类型
// ==========================================
// 工具: thiserror 派生宏
// 范围: 仅覆盖"输入不合法"类错误(快速失败)
// 注: 候选不可行/缺赛/求解超时均以数据形式返回,不走错误通道
// ==========================================

use thiserror::Error;

/// 排赛引擎错误类型
#[derive(Error, Debug)]
pub enum SchedulerError {
    // ===== 配置错误 =====
    #[error("配置无效 (field={field}): {message}")]
    InvalidConfig { field: String, message: String },

    // ===== 名册数据错误 =====
    #[error("重复标识: {kind} id={id}")]
    DuplicateId { kind: String, id: String },

    #[error("引用不存在: {kind} name={name} (referenced by {referenced_by})")]
    UnknownReference {
        kind: String,
        name: String,
        referenced_by: String,
    },

    #[error("场地容量为负数: facility={facility}, courts={courts}")]
    NegativeCapacity { facility: String, courts: i64 },

    #[error("球队缺少组别: team={team}")]
    MissingDivision { team: String },

    #[error("名册数据无效: {0}")]
    InvalidRoster(String),

    // ===== 外部依赖错误 =====
    #[error("文件读写失败: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON 解析失败: {0}")]
    Json(#[from] serde_json::Error),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl SchedulerError {
    pub fn config(field: &str, message: impl Into<String>) -> Self {
        SchedulerError::InvalidConfig {
            field: field.to_string(),
            message: message.into(),
        }
    }

    pub fn unknown(kind: &str, name: &str, referenced_by: &str) -> Self {
        SchedulerError::UnknownReference {
            kind: kind.to_string(),
            name: name.to_string(),
            referenced_by: referenced_by.to_string(),
        }
    }
}

/// Result 类型别名
pub type SchedulerResult<T> = Result<T, SchedulerError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_messages_carry_context() {
        let err = SchedulerError::config("match_duration_minutes", "必须大于 0");
        assert!(err.to_string().contains("match_duration_minutes"));

        let err = SchedulerError::unknown("school", "Ghost Academy", "team T9");
        let msg = err.to_string();
        assert!(msg.contains("Ghost Academy"));
        assert!(msg.contains("team T9"));
    }

    #[test]
    fn test_json_error_converts() {
        let parse: Result<serde_json::Value, _> = serde_json::from_str("{not json");
        let err: SchedulerError = parse.unwrap_err().into();
        assert!(matches!(err, SchedulerError::Json(_)));
    }
}
