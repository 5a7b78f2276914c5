//! 变更结果（带标签结果值）
//!
//! 可预期的业务状态一律以结果值表达并逐层透传：
//! `Committed | Conflict | NotFound | Blocked`。冲突携带当前持久化快照
//! （而非调用方的补丁），阻断携带依赖种类与计数，调用方无需二次往返
//! 即可解释"为什么失败"。
//!
use std::collections::BTreeSet;

/// 带版本更新的结果
#[derive(Debug, Clone, PartialEq)]
pub enum UpdateOutcome<A> {
    /// 条件写命中，携带提交后的记录（version = expected + 1）
    Committed(A),
    /// 期望版本已过期，携带当前持久化快照（胜者的值）
    Conflict { current: A },
    /// 记录已不存在
    NotFound,
}

impl<A> UpdateOutcome<A> {
    pub fn is_committed(&self) -> bool {
        matches!(self, Self::Committed(_))
    }
}

/// 带版本删除的结果
#[derive(Debug, Clone, PartialEq)]
pub enum DeleteOutcome<A> {
    Committed,
    Conflict {
        current: A,
    },
    NotFound,
    /// 阻断型依赖规则命中：存在 `count` 条 `dependent_kind` 记录仍在引用
    Blocked {
        dependent_kind: &'static str,
        count: u64,
    },
}

impl<A> DeleteOutcome<A> {
    pub fn is_committed(&self) -> bool {
        matches!(self, Self::Committed)
    }
}

/// 删除守卫的检查结果
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GuardOutcome {
    Clear,
    Blocked {
        dependent_kind: &'static str,
        count: u64,
    },
}

/// 关联对账的最小增删集
///
/// 不变式：`added ∩ removed = ∅`；未变更成员不产生任何写入。
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct LinkDelta<Id: Ord> {
    pub added: BTreeSet<Id>,
    pub removed: BTreeSet<Id>,
}

impl<Id: Ord> LinkDelta<Id> {
    /// 对账未产生任何写入（幂等重试的第二次调用应满足）
    pub fn is_noop(&self) -> bool {
        self.added.is_empty() && self.removed.is_empty()
    }
}

/// 关联集合替换的结果
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReconcileOutcome<Id: Ord> {
    /// 对账完成，携带现已持久化的右端集合与实际增删集
    Committed {
        right_ids: BTreeSet<Id>,
        delta: LinkDelta<Id>,
    },
    /// 左端记录已不存在
    NotFound,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn link_delta_noop() {
        let d: LinkDelta<i64> = LinkDelta::default();
        assert!(d.is_noop());

        let d = LinkDelta {
            added: BTreeSet::from([103]),
            removed: BTreeSet::new(),
        };
        assert!(!d.is_noop());
    }

    #[test]
    fn outcome_tags() {
        let o: UpdateOutcome<()> = UpdateOutcome::NotFound;
        assert!(!o.is_committed());
        assert!(UpdateOutcome::Committed(()).is_committed());
        assert!(DeleteOutcome::<()>::Committed.is_committed());
    }
}
