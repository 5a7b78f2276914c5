//! 存储访问层（store）
//!
//! 定义存储引擎协议与写路径三组件，支持：
//! - 条件写原语与事务会话（`StorageEngine`/`StorageSession`）；
//! - 带版本读写与冲突归类（`VersionedStore`）；
//! - 多对多关联对账（`LinkReconciler`）；
//! - 删除依赖规则与守卫（`DependencyRule`/`DeletionGuard`）。
//!
//! 该模块聚焦协议与算法，具体存储后端（如 Postgres、内存引擎）由上层
//! 提供实现并注入。并发正确性完全委托给引擎对同一行写入的串行化，
//! 本层不持有任何进程内锁。
//!
mod dependency;
mod engine;
mod record;
mod reconciler;
mod versioned_store;

#[cfg(test)]
pub(crate) mod testkit;

pub use dependency::{DeletionGuard, DependencyRule, DependencyRules, EdgeCascade, OnDelete};
pub use engine::{LinkSide, StorageEngine, StorageSession, json_value_matches_id};
pub use record::StoredRecord;
pub use reconciler::LinkReconciler;
pub use versioned_store::VersionedStore;
