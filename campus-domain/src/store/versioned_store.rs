//! 带版本读写（VersionedStore）
//!
//! 乐观锁读写原语：一次条件写完成 check-and-set，受影响行数为 0 时
//! 以一次普通读消歧（行已删除 → NotFound；版本不符 → Conflict 并携带
//! 当前持久化快照）。消歧读只做诊断、从不改变状态，即使与第三个并发
//! 写者重排，也只影响败者看到的"当前值"是哪个快照。
//!
use crate::{
    entity::Record,
    error::{DomainError, DomainResult},
    outcome::{DeleteOutcome, UpdateOutcome},
    store::{StorageSession, StoredRecord},
    value_object::Version,
};

/// 在一个已开启的事务会话上执行带版本读写
pub struct VersionedStore<'s, S> {
    session: &'s mut S,
}

impl<'s, S> VersionedStore<'s, S>
where
    S: StorageSession,
{
    pub fn new(session: &'s mut S) -> Self {
        Self { session }
    }

    /// 普通读；无锁副作用
    pub async fn load<A>(&mut self, id: &A::Id) -> DomainResult<Option<A>>
    where
        A: Record,
    {
        match self.session.fetch(A::KIND, &id.to_string()).await? {
            Some(row) => Ok(Some(row.to_record()?)),
            None => Ok(None),
        }
    }

    /// 创建记录，落库版本为 1
    pub async fn create<A>(&mut self, mut record: A) -> DomainResult<A>
    where
        A: Record,
    {
        record.set_version(Version::first());
        let row = StoredRecord::from_record(&record)?;
        self.session.insert(row).await?;
        Ok(record)
    }

    /// 条件更新：成功时新版本恒为 expected + 1
    pub async fn update<A>(
        &mut self,
        id: &A::Id,
        patch: &A::Patch,
        expected: Version,
    ) -> DomainResult<UpdateOutcome<A>>
    where
        A: Record,
    {
        let id_str = id.to_string();
        let patch_json = serde_json::to_value(patch)?;

        let affected = self
            .session
            .update_where_version(A::KIND, &id_str, expected.value(), &patch_json)
            .await?;

        if affected == 1 {
            // 提交后的权威快照（version = expected + 1）
            let row = self.session.fetch(A::KIND, &id_str).await?.ok_or_else(|| {
                DomainError::Storage {
                    reason: format!("{}:{id_str} vanished after conditional update", A::KIND),
                }
            })?;
            return Ok(UpdateOutcome::Committed(row.to_record()?));
        }

        // 0 行受影响："行已删除"与"版本过期"二义，诊断读消歧
        match self.session.fetch(A::KIND, &id_str).await? {
            None => Ok(UpdateOutcome::NotFound),
            Some(current) => Ok(UpdateOutcome::Conflict {
                current: current.to_record()?,
            }),
        }
    }

    /// 条件删除；必须在删除守卫放行之后、同一事务内执行
    pub async fn delete<A>(&mut self, id: &A::Id, expected: Version) -> DomainResult<DeleteOutcome<A>>
    where
        A: Record,
    {
        let id_str = id.to_string();

        let affected = self
            .session
            .delete_where_version(A::KIND, &id_str, expected.value())
            .await?;

        if affected == 1 {
            return Ok(DeleteOutcome::Committed);
        }

        match self.session.fetch(A::KIND, &id_str).await? {
            None => Ok(DeleteOutcome::NotFound),
            Some(current) => Ok(DeleteOutcome::Conflict {
                current: current.to_record()?,
            }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::entity::Entity;
    use crate::store::StorageEngine;
    use crate::store::testkit::TestEngine;
    use campus_macros::entity;
    use serde::{Deserialize, Serialize};

    #[entity(id = u64)]
    #[derive(Debug, Clone, Default, Serialize, Deserialize)]
    struct Fund {
        name: String,
        amount: i64,
    }

    #[derive(Debug, Default, Serialize)]
    struct FundPatch {
        #[serde(skip_serializing_if = "Option::is_none")]
        amount: Option<i64>,
    }

    impl Record for Fund {
        const KIND: &'static str = "fund";
        type Patch = FundPatch;
    }

    async fn seed(engine: &TestEngine) -> Fund {
        let mut session = engine.begin().await.unwrap();
        let mut fund = Fund::new(7);
        fund.amount = 1000;
        let created = VersionedStore::new(&mut session)
            .create(fund)
            .await
            .unwrap();
        session.commit().await.unwrap();
        created
    }

    // 条件写命中：版本恰好 +1，补丁字段生效
    #[tokio::test]
    async fn update_with_matching_version_commits() {
        let engine = TestEngine::new();
        let fund = seed(&engine).await;
        assert_eq!(fund.version(), Version::first());

        let mut session = engine.begin().await.unwrap();
        let outcome = VersionedStore::new(&mut session)
            .update::<Fund>(
                &7,
                &FundPatch {
                    amount: Some(1200),
                },
                Version::first(),
            )
            .await
            .unwrap();
        session.commit().await.unwrap();

        match outcome {
            UpdateOutcome::Committed(updated) => {
                assert_eq!(updated.amount, 1200);
                assert_eq!(updated.version().value(), 2);
            }
            other => panic!("unexpected {other:?}"),
        }
    }

    // 过期版本：归类为 Conflict，携带当前持久化快照（胜者的值）
    #[tokio::test]
    async fn stale_version_yields_conflict_with_current_snapshot() {
        let engine = TestEngine::new();
        seed(&engine).await;

        let mut session = engine.begin().await.unwrap();
        let mut store = VersionedStore::new(&mut session);
        let first = store
            .update::<Fund>(&7, &FundPatch { amount: Some(1200) }, Version::first())
            .await
            .unwrap();
        assert!(first.is_committed());

        let second = store
            .update::<Fund>(&7, &FundPatch { amount: Some(1500) }, Version::first())
            .await
            .unwrap();
        match second {
            UpdateOutcome::Conflict { current } => {
                assert_eq!(current.amount, 1200);
                assert_eq!(current.version().value(), 2);
            }
            other => panic!("unexpected {other:?}"),
        }
        session.commit().await.unwrap();
    }

    // 行已删除：归类为 NotFound 而非 Conflict
    #[tokio::test]
    async fn missing_row_yields_not_found() {
        let engine = TestEngine::new();
        let mut session = engine.begin().await.unwrap();
        let outcome = VersionedStore::new(&mut session)
            .update::<Fund>(&404, &FundPatch { amount: Some(1) }, Version::first())
            .await
            .unwrap();
        assert!(matches!(outcome, UpdateOutcome::NotFound));
    }

    // 条件删除与消歧
    #[tokio::test]
    async fn delete_classification() {
        let engine = TestEngine::new();
        seed(&engine).await;

        let mut session = engine.begin().await.unwrap();
        let mut store = VersionedStore::new(&mut session);

        let stale = store
            .delete::<Fund>(&7, Version::from_value(9))
            .await
            .unwrap();
        assert!(matches!(stale, DeleteOutcome::Conflict { .. }));

        let hit = store.delete::<Fund>(&7, Version::first()).await.unwrap();
        assert!(hit.is_committed());

        let gone = store.delete::<Fund>(&7, Version::first()).await.unwrap();
        assert!(matches!(gone, DeleteOutcome::NotFound));
        session.commit().await.unwrap();
    }
}
