//! 多对多关联对账（LinkReconciler）
//!
//! 将持久化关联集合变换为调用方期望集合的最小增删集：
//! `added = desired − current`，`removed = current − desired`，
//! 未变更成员不做任何触碰。不采用"清空后整表重插"：那种写法在重试下
//! 不幂等，且会让并发读者短暂观察到成员缺失。
//!
use crate::{
    entity::{LeftId, Link, RightId},
    error::{DomainError, DomainResult},
    outcome::LinkDelta,
    store::StorageSession,
};
use std::collections::BTreeSet;

/// 在一个已开启的事务会话上执行关联对账
pub struct LinkReconciler<'s, S> {
    session: &'s mut S,
}

impl<'s, S> LinkReconciler<'s, S>
where
    S: StorageSession,
{
    pub fn new(session: &'s mut S) -> Self {
        Self { session }
    }

    /// 读取当前右端集合
    pub async fn current<L>(&mut self, left: &LeftId<L>) -> DomainResult<BTreeSet<RightId<L>>>
    where
        L: Link,
    {
        let raw = self
            .session
            .link_rights(L::EDGE, &left.to_string())
            .await?;

        raw.into_iter()
            .map(|s| {
                s.parse::<RightId<L>>().map_err(|_| DomainError::Parse {
                    reason: format!("invalid {} link member id: {s}", L::EDGE),
                })
            })
            .collect()
    }

    /// 对账：集合按标识相等比较，顺序无意义
    ///
    /// 幂等：desired 与 current 一致时增删集为空，不产生任何写入，
    /// 客户端超时重试不会产生首次成功之外的副作用。
    pub async fn reconcile<L>(
        &mut self,
        left: &LeftId<L>,
        desired: &BTreeSet<RightId<L>>,
    ) -> DomainResult<LinkDelta<RightId<L>>>
    where
        L: Link,
    {
        let current = self.current::<L>(left).await?;

        let added: BTreeSet<RightId<L>> = desired.difference(&current).cloned().collect();
        let removed: BTreeSet<RightId<L>> = current.difference(desired).cloned().collect();

        let left_str = left.to_string();
        for right in &added {
            self.session
                .insert_link(L::EDGE, &left_str, &right.to_string())
                .await?;
        }
        for right in &removed {
            self.session
                .delete_link(L::EDGE, &left_str, &right.to_string())
                .await?;
        }

        Ok(LinkDelta { added, removed })
    }
}
