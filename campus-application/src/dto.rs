//! 数据传输对象（DTO）
//!
//! - 作为应用层的输出载体，面向接口/外部系统序列化友好；
//! - 变更结果以带判别标签的枚举回传：`status` 字段区分
//!   `committed` / `conflict` / `not_found` / `blocked`，
//!   调用方按标签分支而非解析异常文本。
use campus_domain::entity::Record;
use campus_domain::outcome::{DeleteOutcome, ReconcileOutcome, UpdateOutcome};
use serde::Serialize;
use std::collections::BTreeSet;

/// 应用层输出载体的标记 trait
pub trait Dto: Serialize + Send + Sync + 'static {}

/// 单条记录变更（更新/删除）的回执
#[derive(Debug, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum MutationReply<A> {
    /// 变更已提交；更新回传提交后的完整记录（含新版本），删除无载荷
    Committed {
        #[serde(skip_serializing_if = "Option::is_none")]
        record: Option<A>,
    },
    /// 期望版本已过期；`current` 为当前持久化快照，供调用方决定重试
    Conflict { message: String, current: A },
    NotFound { message: String },
    /// 被阻断规则拒绝，记录原样保留
    Blocked {
        message: String,
        dependent_kind: &'static str,
        count: u64,
    },
}

impl<A> MutationReply<A>
where
    A: Record,
{
    pub fn from_update(id: &A::Id, outcome: UpdateOutcome<A>) -> Self {
        match outcome {
            UpdateOutcome::Committed(record) => Self::Committed {
                record: Some(record),
            },
            UpdateOutcome::Conflict { current } => Self::Conflict {
                message: format!("{} {id} was modified by another caller", A::KIND),
                current,
            },
            UpdateOutcome::NotFound => Self::NotFound {
                message: format!("{} {id} does not exist", A::KIND),
            },
        }
    }

    pub fn from_delete(id: &A::Id, outcome: DeleteOutcome<A>) -> Self {
        match outcome {
            DeleteOutcome::Committed => Self::Committed { record: None },
            DeleteOutcome::Conflict { current } => Self::Conflict {
                message: format!("{} {id} was modified by another caller", A::KIND),
                current,
            },
            DeleteOutcome::NotFound => Self::NotFound {
                message: format!("{} {id} does not exist", A::KIND),
            },
            DeleteOutcome::Blocked {
                dependent_kind,
                count,
            } => Self::Blocked {
                message: format!(
                    "{count} {dependent_kind} row(s) still reference {} {id}",
                    A::KIND
                ),
                dependent_kind,
                count,
            },
        }
    }
}

impl<A> Dto for MutationReply<A> where A: Record + 'static {}

/// 关联集合替换的回执
#[derive(Debug, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum LinkReply<Id: Ord> {
    /// 对账完成：`right_ids` 为提交后的完整右端集合，增删集合回传供审计
    Committed {
        right_ids: BTreeSet<Id>,
        added: BTreeSet<Id>,
        removed: BTreeSet<Id>,
    },
    NotFound { message: String },
}

impl<Id> LinkReply<Id>
where
    Id: Ord,
{
    pub fn from_reconcile(left: &impl std::fmt::Display, outcome: ReconcileOutcome<Id>) -> Self {
        match outcome {
            ReconcileOutcome::Committed { right_ids, delta } => Self::Committed {
                right_ids,
                added: delta.added,
                removed: delta.removed,
            },
            ReconcileOutcome::NotFound => Self::NotFound {
                message: format!("link owner {left} does not exist"),
            },
        }
    }
}

impl<Id> Dto for LinkReply<Id> where Id: Ord + Serialize + Send + Sync + 'static {}
