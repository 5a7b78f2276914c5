//! 内存存储引擎（MemoryEngine）
//!
//! 测试与演示用的事务引擎实现。会话在整个生命周期内持有全局状态的
//! 互斥锁（owned guard），写者因此天然串行，条件写的 check-and-set
//! 对任意并发调用方原子成立。`begin` 受忙等超时约束：锁在期限内
//! 拿不到即返回 `Busy`，绝不无限挂起。
//!
//! 回滚（显式调用或会话被丢弃）恢复 begin 时刻的快照；提交前按声明的依赖规则复核外键，
//! 这是守卫放行之后的最后防线，违例使整个事务以 `ConstraintViolation`
//! 失败并回滚。
use async_trait::async_trait;
use campus_domain::error::{DomainError, DomainResult};
use campus_domain::store::{
    DependencyRules, LinkSide, StorageEngine, StorageSession, StoredRecord, json_value_matches_id,
};
use std::collections::{BTreeMap, BTreeSet};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{Mutex, OwnedMutexGuard};

const DEFAULT_BUSY_TIMEOUT: Duration = Duration::from_secs(5);

#[derive(Debug, Clone, Default)]
struct MemoryState {
    records: BTreeMap<(String, String), StoredRecord>,
    links: BTreeSet<(String, String, String)>,
}

#[derive(Clone)]
pub struct MemoryEngine {
    state: Arc<Mutex<MemoryState>>,
    rules: Arc<DependencyRules>,
    busy_timeout: Duration,
}

impl MemoryEngine {
    pub fn new(rules: Arc<DependencyRules>) -> Self {
        Self {
            state: Arc::new(Mutex::new(MemoryState::default())),
            rules,
            busy_timeout: DEFAULT_BUSY_TIMEOUT,
        }
    }

    /// 调整忙等超时上限
    pub fn with_busy_timeout(mut self, timeout: Duration) -> Self {
        self.busy_timeout = timeout;
        self
    }
}

#[async_trait]
impl StorageEngine for MemoryEngine {
    type Session = MemorySession;

    async fn begin(&self) -> DomainResult<MemorySession> {
        let lock = Arc::clone(&self.state).lock_owned();
        let guard = match tokio::time::timeout(self.busy_timeout, lock).await {
            Ok(guard) => guard,
            Err(_) => {
                let waited_ms = self.busy_timeout.as_millis() as u64;
                tracing::warn!(waited_ms, "storage busy: session acquisition timed out");
                return Err(DomainError::Busy { waited_ms });
            }
        };

        tracing::debug!("session opened");
        let undo = guard.clone();
        Ok(MemorySession {
            guard,
            undo: Some(undo),
            rules: Arc::clone(&self.rules),
        })
    }
}

#[derive(Debug)]
pub struct MemorySession {
    guard: OwnedMutexGuard<MemoryState>,
    // begin 时刻快照；成功提交时被清空，否则由 Drop 恢复
    undo: Option<MemoryState>,
    rules: Arc<DependencyRules>,
}

/// 未被 `commit` 消耗的会话（显式回滚、提交被拒、调用方中途取消丢弃）
/// 一律在释放锁之前恢复 begin 时刻快照，未提交写入绝不外泄。
impl Drop for MemorySession {
    fn drop(&mut self) {
        if let Some(undo) = self.undo.take() {
            *self.guard = undo;
            tracing::debug!("session rolled back");
        }
    }
}

/// JSON 引用值还原为标识字符串；null/缺失视为未引用
fn referenced_id(value: &serde_json::Value) -> Option<String> {
    match value {
        serde_json::Value::Number(n) => Some(n.to_string()),
        serde_json::Value::String(s) => Some(s.clone()),
        _ => None,
    }
}

/// 提交前复核：每条声明规则下，依赖行的非空引用都必须指向存活的被引用行
fn verify_foreign_keys(state: &MemoryState, rules: &DependencyRules) -> DomainResult<()> {
    for rule in rules.iter() {
        for row in state.records.values().filter(|r| r.kind() == rule.dependent_kind) {
            let Some(target) = row.payload().get(rule.via_field).and_then(referenced_id) else {
                continue;
            };
            let owner_key = (rule.owner_kind.to_string(), target.clone());
            if !state.records.contains_key(&owner_key) {
                return Err(DomainError::ConstraintViolation {
                    constraint: format!("{}.{}", rule.dependent_kind, rule.via_field),
                    reason: format!(
                        "{}:{} references missing {}:{target}",
                        rule.dependent_kind,
                        row.id(),
                        rule.owner_kind
                    ),
                });
            }
        }
    }
    Ok(())
}

#[async_trait]
impl StorageSession for MemorySession {
    async fn fetch(&mut self, kind: &str, id: &str) -> DomainResult<Option<StoredRecord>> {
        Ok(self
            .guard
            .records
            .get(&(kind.to_string(), id.to_string()))
            .cloned())
    }

    async fn insert(&mut self, record: StoredRecord) -> DomainResult<()> {
        let key = (record.kind().to_string(), record.id().to_string());
        if self.guard.records.contains_key(&key) {
            return Err(DomainError::ConstraintViolation {
                constraint: "primary key".to_string(),
                reason: format!("{}:{} already exists", key.0, key.1),
            });
        }
        self.guard.records.insert(key, record);
        Ok(())
    }

    async fn update_where_version(
        &mut self,
        kind: &str,
        id: &str,
        expected: usize,
        patch: &serde_json::Value,
    ) -> DomainResult<u64> {
        match self
            .guard
            .records
            .get_mut(&(kind.to_string(), id.to_string()))
        {
            Some(row) if row.version() == expected => {
                row.apply_patch(patch)?;
                Ok(1)
            }
            _ => Ok(0),
        }
    }

    async fn delete_where_version(
        &mut self,
        kind: &str,
        id: &str,
        expected: usize,
    ) -> DomainResult<u64> {
        let key = (kind.to_string(), id.to_string());
        match self.guard.records.get(&key) {
            Some(row) if row.version() == expected => {
                self.guard.records.remove(&key);
                Ok(1)
            }
            _ => Ok(0),
        }
    }

    async fn link_rights(&mut self, edge: &str, left_id: &str) -> DomainResult<BTreeSet<String>> {
        Ok(self
            .guard
            .links
            .iter()
            .filter(|(e, l, _)| e == edge && l == left_id)
            .map(|(_, _, r)| r.clone())
            .collect())
    }

    async fn insert_link(
        &mut self,
        edge: &str,
        left_id: &str,
        right_id: &str,
    ) -> DomainResult<()> {
        let pair = (edge.to_string(), left_id.to_string(), right_id.to_string());
        if !self.guard.links.insert(pair) {
            return Err(DomainError::ConstraintViolation {
                constraint: "link uniqueness".to_string(),
                reason: format!("{edge}: ({left_id}, {right_id}) already present"),
            });
        }
        Ok(())
    }

    async fn delete_link(
        &mut self,
        edge: &str,
        left_id: &str,
        right_id: &str,
    ) -> DomainResult<()> {
        self.guard
            .links
            .remove(&(edge.to_string(), left_id.to_string(), right_id.to_string()));
        Ok(())
    }

    async fn delete_links_where(
        &mut self,
        edge: &str,
        side: LinkSide,
        id: &str,
    ) -> DomainResult<u64> {
        let before = self.guard.links.len();
        self.guard.links.retain(|(e, l, r)| {
            if e != edge {
                return true;
            }
            match side {
                LinkSide::Left => l != id,
                LinkSide::Right => r != id,
            }
        });
        Ok((before - self.guard.links.len()) as u64)
    }

    async fn count_referencing(
        &mut self,
        dependent_kind: &str,
        via_field: &str,
        id: &str,
    ) -> DomainResult<u64> {
        Ok(self
            .guard
            .records
            .values()
            .filter(|row| row.kind() == dependent_kind)
            .filter(|row| {
                row.payload()
                    .get(via_field)
                    .map(|v| json_value_matches_id(v, id))
                    .unwrap_or(false)
            })
            .count() as u64)
    }

    async fn delete_referencing(
        &mut self,
        dependent_kind: &str,
        via_field: &str,
        id: &str,
    ) -> DomainResult<u64> {
        let before = self.guard.records.len();
        self.guard.records.retain(|_, row| {
            !(row.kind() == dependent_kind
                && row
                    .payload()
                    .get(via_field)
                    .map(|v| json_value_matches_id(v, id))
                    .unwrap_or(false))
        });
        Ok((before - self.guard.records.len()) as u64)
    }

    async fn commit(mut self) -> DomainResult<()> {
        if let Err(e) = verify_foreign_keys(&self.guard, &self.rules) {
            tracing::warn!(error = %e, "commit rejected, transaction rolled back");
            // 快照仍在，Drop 负责恢复
            return Err(e);
        }

        self.undo = None;
        tracing::debug!("session committed");
        Ok(())
    }

    async fn rollback(self) -> DomainResult<()> {
        // 丢弃即回滚（见 Drop）
        drop(self);
        Ok(())
    }
}
