//! 存储引擎协议
//!
//! 引擎须提供：事务会话（提交/回滚）、按标识读取、以及两条带受影响
//! 行数的条件写原语（`UPDATE/DELETE ... WHERE id = :id AND version = :expected`
//! 的等价物）。条件写在引擎内部对同一行串行化，check-and-set 对任意并发
//! 写者原子成立，调用侧不需要应用级锁。
//!
use crate::error::DomainResult;
use crate::store::record::StoredRecord;
use async_trait::async_trait;
use std::collections::BTreeSet;
use std::sync::Arc;

/// 事务性存储引擎
#[async_trait]
pub trait StorageEngine: Send + Sync {
    type Session: StorageSession;

    /// 开启事务会话。引擎对写者串行化，等待受忙等超时约束，
    /// 超时以致命错误返回而非无限挂起。
    async fn begin(&self) -> DomainResult<Self::Session>;
}

#[async_trait]
impl<T> StorageEngine for Arc<T>
where
    T: StorageEngine + ?Sized,
{
    type Session = T::Session;

    async fn begin(&self) -> DomainResult<Self::Session> {
        (**self).begin().await
    }
}

/// 关联边的参与侧
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LinkSide {
    Left,
    Right,
}

/// 事务会话
///
/// 会话内的全部写入构成一个原子单元：`commit` 使其整体可见，
/// `rollback`（或会话被丢弃）使其整体撤销。
#[async_trait]
pub trait StorageSession: Send + Sync {
    /// 按 (kind, id) 读取当前行；无锁副作用的普通读
    async fn fetch(&mut self, kind: &str, id: &str) -> DomainResult<Option<StoredRecord>>;

    /// 插入新行；主键冲突返回 `ConstraintViolation`
    async fn insert(&mut self, record: StoredRecord) -> DomainResult<()>;

    /// 条件更新：`SET <patch fields>, version = version + 1
    /// WHERE id = :id AND version = :expected`，返回受影响行数（0 或 1）
    async fn update_where_version(
        &mut self,
        kind: &str,
        id: &str,
        expected: usize,
        patch: &serde_json::Value,
    ) -> DomainResult<u64>;

    /// 条件删除：`WHERE id = :id AND version = :expected`，返回受影响行数
    async fn delete_where_version(
        &mut self,
        kind: &str,
        id: &str,
        expected: usize,
    ) -> DomainResult<u64>;

    /// 读取某条边上给定左端的右端标识集合
    async fn link_rights(&mut self, edge: &str, left_id: &str) -> DomainResult<BTreeSet<String>>;

    /// 插入一个关联对；重复插入是协议违例，返回 `ConstraintViolation`
    async fn insert_link(&mut self, edge: &str, left_id: &str, right_id: &str)
    -> DomainResult<()>;

    /// 删除一个关联对；不存在时静默（受影响 0 行）
    async fn delete_link(&mut self, edge: &str, left_id: &str, right_id: &str)
    -> DomainResult<()>;

    /// 删除某条边上给定一侧等于 id 的全部关联对，返回删除数
    async fn delete_links_where(
        &mut self,
        edge: &str,
        side: LinkSide,
        id: &str,
    ) -> DomainResult<u64>;

    /// 统计 `dependent_kind` 中 `via_field` 引用 id 的存活行数
    async fn count_referencing(
        &mut self,
        dependent_kind: &str,
        via_field: &str,
        id: &str,
    ) -> DomainResult<u64>;

    /// 删除 `dependent_kind` 中 `via_field` 引用 id 的全部行（级联），返回删除数
    async fn delete_referencing(
        &mut self,
        dependent_kind: &str,
        via_field: &str,
        id: &str,
    ) -> DomainResult<u64>;

    /// 提交事务；提交前引擎自身的外键约束是最后防线，
    /// 违例以 `ConstraintViolation` 失败并整体回滚
    async fn commit(self) -> DomainResult<()>
    where
        Self: Sized;

    /// 回滚事务；未提交的写入全部撤销，不消耗任何版本号
    async fn rollback(self) -> DomainResult<()>
    where
        Self: Sized;
}

/// 判断 JSON 字段值是否引用给定标识
///
/// 标识跨协议边界以字符串传递；数值与字符串两种 JSON 表示都须命中，
/// null 视为未引用。
pub fn json_value_matches_id(value: &serde_json::Value, id: &str) -> bool {
    match value {
        serde_json::Value::Number(n) => n.to_string() == id,
        serde_json::Value::String(s) => s == id,
        _ => false,
    }
}
