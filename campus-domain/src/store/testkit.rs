//! 单元测试用内存引擎
//!
//! 顺序场景专用：按调用即时落到共享状态，回滚恢复 begin 时刻快照。
//! 不做写者串行化与外键校验，交错/并发行为由应用层引擎的集成测试覆盖。
//!
use crate::error::{DomainError, DomainResult};
use crate::store::{LinkSide, StorageEngine, StorageSession, StoredRecord, json_value_matches_id};
use async_trait::async_trait;
use std::collections::{BTreeMap, BTreeSet};
use std::sync::{Arc, Mutex};

#[derive(Debug, Clone, Default)]
pub(crate) struct TestState {
    pub records: BTreeMap<(String, String), StoredRecord>,
    pub links: BTreeSet<(String, String, String)>,
}

#[derive(Clone, Default)]
pub(crate) struct TestEngine {
    state: Arc<Mutex<TestState>>,
}

impl TestEngine {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn snapshot(&self) -> TestState {
        self.state.lock().unwrap().clone()
    }
}

#[async_trait]
impl StorageEngine for TestEngine {
    type Session = TestSession;

    async fn begin(&self) -> DomainResult<TestSession> {
        let undo = self.state.lock().unwrap().clone();
        Ok(TestSession {
            state: Arc::clone(&self.state),
            undo,
        })
    }
}

pub(crate) struct TestSession {
    state: Arc<Mutex<TestState>>,
    undo: TestState,
}

#[async_trait]
impl StorageSession for TestSession {
    async fn fetch(&mut self, kind: &str, id: &str) -> DomainResult<Option<StoredRecord>> {
        let state = self.state.lock().unwrap();
        Ok(state
            .records
            .get(&(kind.to_string(), id.to_string()))
            .cloned())
    }

    async fn insert(&mut self, record: StoredRecord) -> DomainResult<()> {
        let mut state = self.state.lock().unwrap();
        let key = (record.kind().to_string(), record.id().to_string());
        if state.records.contains_key(&key) {
            return Err(DomainError::ConstraintViolation {
                constraint: "primary key".to_string(),
                reason: format!("{}:{} already exists", key.0, key.1),
            });
        }
        state.records.insert(key, record);
        Ok(())
    }

    async fn update_where_version(
        &mut self,
        kind: &str,
        id: &str,
        expected: usize,
        patch: &serde_json::Value,
    ) -> DomainResult<u64> {
        let mut state = self.state.lock().unwrap();
        match state.records.get_mut(&(kind.to_string(), id.to_string())) {
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
        let mut state = self.state.lock().unwrap();
        let key = (kind.to_string(), id.to_string());
        match state.records.get(&key) {
            Some(row) if row.version() == expected => {
                state.records.remove(&key);
                Ok(1)
            }
            _ => Ok(0),
        }
    }

    async fn link_rights(&mut self, edge: &str, left_id: &str) -> DomainResult<BTreeSet<String>> {
        let state = self.state.lock().unwrap();
        Ok(state
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
        let mut state = self.state.lock().unwrap();
        let pair = (edge.to_string(), left_id.to_string(), right_id.to_string());
        if !state.links.insert(pair) {
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
        let mut state = self.state.lock().unwrap();
        state
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
        let mut state = self.state.lock().unwrap();
        let before = state.links.len();
        state.links.retain(|(e, l, r)| {
            if e != edge {
                return true;
            }
            match side {
                LinkSide::Left => l != id,
                LinkSide::Right => r != id,
            }
        });
        Ok((before - state.links.len()) as u64)
    }

    async fn count_referencing(
        &mut self,
        dependent_kind: &str,
        via_field: &str,
        id: &str,
    ) -> DomainResult<u64> {
        let state = self.state.lock().unwrap();
        Ok(state
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
        let mut state = self.state.lock().unwrap();
        let before = state.records.len();
        state.records.retain(|_, row| {
            !(row.kind() == dependent_kind
                && row
                    .payload()
                    .get(via_field)
                    .map(|v| json_value_matches_id(v, id))
                    .unwrap_or(false))
        });
        Ok((before - state.records.len()) as u64)
    }

    async fn commit(self) -> DomainResult<()> {
        Ok(())
    }

    async fn rollback(self) -> DomainResult<()> {
        *self.state.lock().unwrap() = self.undo;
        Ok(())
    }
}
