//! 变更编排器（MutationRoot）
//!
//! 封装"校验期望版本 → 开启事务 → 分派到带版本读写/关联对账/删除守卫
//! → 整体提交或回滚"的标准流程。任一子步骤不是 `Committed`/`Clear`
//! 即中止事务并原样上抛该终态，部分落库（例如标量已更新而关联未对账）
//! 永不可观察。未被业务规则预期的存储错误一律回滚后作为错误传播。
//!
//! 本层无进程内锁、无队列、无自动重试：同一行上的并发正确性完全由
//! 引擎对条件写的串行化保证，重试是调用方以新版本显式发起的决定。
//!
use crate::{
    entity::{LeftId, Link, Record, RightId},
    error::{DomainError, DomainResult},
    outcome::{DeleteOutcome, GuardOutcome, ReconcileOutcome, UpdateOutcome},
    store::{
        DeletionGuard, DependencyRules, LinkReconciler, StorageEngine, StorageSession,
        VersionedStore,
    },
    value_object::Version,
};
use std::collections::BTreeSet;
use std::sync::Arc;

/// 面向应用层的变更编排器。
///
/// - `E`：存储引擎（实现 `StorageEngine`）
pub struct MutationRoot<E> {
    engine: E,
    rules: Arc<DependencyRules>,
}

impl<E> MutationRoot<E>
where
    E: StorageEngine,
{
    /// 创建编排器实例
    pub fn new(engine: E, rules: Arc<DependencyRules>) -> Self {
        Self { engine, rules }
    }

    /// 期望版本为调用方显式传入的参数，缺失或非正是调用契约违例，
    /// 在触达存储之前拒绝
    fn ensure_created(expected: Version) -> DomainResult<()> {
        if !expected.is_created() {
            return Err(DomainError::InvalidCommand {
                reason: format!("expected version must be positive, got {expected}"),
            });
        }
        Ok(())
    }

    /// 读取单条记录（只读，无事务外副作用）
    pub async fn load<A>(&self, id: &A::Id) -> DomainResult<Option<A>>
    where
        A: Record,
    {
        let mut session = self.engine.begin().await?;
        let loaded = VersionedStore::new(&mut session).load(id).await;
        match loaded {
            Ok(record) => {
                session.commit().await?;
                Ok(record)
            }
            Err(e) => {
                let _ = session.rollback().await;
                Err(e)
            }
        }
    }

    /// 创建记录（落库版本为 1）
    pub async fn create<A>(&self, record: A) -> DomainResult<A>
    where
        A: Record,
    {
        let mut session = self.engine.begin().await?;
        match VersionedStore::new(&mut session).create(record).await {
            Ok(created) => {
                session.commit().await?;
                Ok(created)
            }
            Err(e) => {
                // 回滚失败时保留首个错误
                let _ = session.rollback().await;
                Err(e)
            }
        }
    }

    /// 标量字段更新：一次条件写 + 消歧，整体为一个事务
    pub async fn update<A>(
        &self,
        id: &A::Id,
        patch: &A::Patch,
        expected: Version,
    ) -> DomainResult<UpdateOutcome<A>>
    where
        A: Record,
    {
        Self::ensure_created(expected)?;

        let mut session = self.engine.begin().await?;
        let outcome = match VersionedStore::new(&mut session)
            .update(id, patch, expected)
            .await
        {
            Ok(outcome) => outcome,
            Err(e) => {
                let _ = session.rollback().await;
                return Err(e);
            }
        };

        match &outcome {
            UpdateOutcome::Committed(_) => session.commit().await?,
            _ => session.rollback().await?,
        }
        Ok(outcome)
    }

    /// 标量更新与关联对账的合并命令：两者落在同一事务，
    /// 标量写失败则关联不被触碰
    pub async fn update_with_links<A, L>(
        &self,
        id: &A::Id,
        patch: &A::Patch,
        expected: Version,
        desired: &BTreeSet<RightId<L>>,
    ) -> DomainResult<UpdateOutcome<A>>
    where
        A: Record,
        L: Link<Left = A>,
    {
        Self::ensure_created(expected)?;

        let mut session = self.engine.begin().await?;
        let result =
            Self::update_with_links_in::<A, L>(&mut session, id, patch, expected, desired).await;

        match result {
            Ok(outcome @ UpdateOutcome::Committed(_)) => {
                session.commit().await?;
                Ok(outcome)
            }
            Ok(outcome) => {
                session.rollback().await?;
                Ok(outcome)
            }
            Err(e) => {
                let _ = session.rollback().await;
                Err(e)
            }
        }
    }

    async fn update_with_links_in<A, L>(
        session: &mut E::Session,
        id: &A::Id,
        patch: &A::Patch,
        expected: Version,
        desired: &BTreeSet<RightId<L>>,
    ) -> DomainResult<UpdateOutcome<A>>
    where
        A: Record,
        L: Link<Left = A>,
    {
        let outcome = VersionedStore::new(session).update(id, patch, expected).await?;
        if !outcome.is_committed() {
            return Ok(outcome);
        }

        LinkReconciler::new(session).reconcile::<L>(id, desired).await?;
        Ok(outcome)
    }

    /// 关联集合替换：无版本语义，按集合语义对账；左端不存在报 NotFound
    pub async fn replace_links<L>(
        &self,
        left: &LeftId<L>,
        desired: &BTreeSet<RightId<L>>,
    ) -> DomainResult<ReconcileOutcome<RightId<L>>>
    where
        L: Link,
    {
        let mut session = self.engine.begin().await?;
        let result = Self::replace_links_in::<L>(&mut session, left, desired).await;

        match result {
            Ok(outcome @ ReconcileOutcome::Committed { .. }) => {
                session.commit().await?;
                Ok(outcome)
            }
            Ok(outcome) => {
                session.rollback().await?;
                Ok(outcome)
            }
            Err(e) => {
                let _ = session.rollback().await;
                Err(e)
            }
        }
    }

    async fn replace_links_in<L>(
        session: &mut E::Session,
        left: &LeftId<L>,
        desired: &BTreeSet<RightId<L>>,
    ) -> DomainResult<ReconcileOutcome<RightId<L>>>
    where
        L: Link,
    {
        let owner: Option<L::Left> = VersionedStore::new(session).load(left).await?;
        if owner.is_none() {
            return Ok(ReconcileOutcome::NotFound);
        }

        let delta = LinkReconciler::new(session).reconcile::<L>(left, desired).await?;
        Ok(ReconcileOutcome::Committed {
            right_ids: desired.clone(),
            delta,
        })
    }

    /// 删除：守卫预检 → 级联清理 → 条件删除，全部在同一事务内。
    /// 守卫放行后若仍有晚到的依赖行挤进空隙，由引擎外键约束在提交时硬失败。
    pub async fn delete<A>(&self, id: &A::Id, expected: Version) -> DomainResult<DeleteOutcome<A>>
    where
        A: Record,
    {
        Self::ensure_created(expected)?;

        let mut session = self.engine.begin().await?;
        let result = self.delete_in::<A>(&mut session, id, expected).await;

        match result {
            Ok(outcome @ DeleteOutcome::Committed) => {
                session.commit().await?;
                Ok(outcome)
            }
            Ok(outcome) => {
                session.rollback().await?;
                Ok(outcome)
            }
            Err(e) => {
                let _ = session.rollback().await;
                Err(e)
            }
        }
    }

    async fn delete_in<A>(
        &self,
        session: &mut E::Session,
        id: &A::Id,
        expected: Version,
    ) -> DomainResult<DeleteOutcome<A>>
    where
        A: Record,
    {
        let mut guard = DeletionGuard::new(session);
        if let GuardOutcome::Blocked {
            dependent_kind,
            count,
        } = guard.check::<A>(&self.rules, id).await?
        {
            return Ok(DeleteOutcome::Blocked {
                dependent_kind,
                count,
            });
        }
        guard.cascade::<A>(&self.rules, id).await?;

        VersionedStore::new(session).delete(id, expected).await
    }
}
