use crate::{
    entity::Record,
    error::{DomainError, DomainResult as Result},
    value_object::Version,
};
use bon::Builder;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// 持久化行的统一包络
///
/// `version` 列是权威版本；payload 内嵌的 version 字段仅为序列化副产物，
/// 读取时以列值回填覆盖。
#[derive(Debug, Clone, Builder, Serialize, Deserialize)]
pub struct StoredRecord {
    kind: String,
    id: String,
    version: usize,
    payload: Value,
    updated_at: DateTime<Utc>,
}

impl StoredRecord {
    pub fn kind(&self) -> &str {
        &self.kind
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn version(&self) -> usize {
        self.version
    }

    pub fn payload(&self) -> &Value {
        &self.payload
    }

    pub fn updated_at(&self) -> DateTime<Utc> {
        self.updated_at
    }

    /// 将行反序列化为记录实例（kind 不符报 TypeMismatch）
    pub fn to_record<A>(&self) -> Result<A>
    where
        A: Record,
    {
        if A::KIND != self.kind {
            return Err(DomainError::TypeMismatch {
                expected: A::KIND.to_string(),
                found: self.kind.clone(),
            });
        }

        let mut record: A = serde_json::from_value(self.payload.clone())?;
        record.set_version(Version::from_value(self.version));
        Ok(record)
    }

    /// 从记录实例创建持久化行
    pub fn from_record<A>(record: &A) -> Result<Self>
    where
        A: Record,
    {
        Ok(Self {
            kind: A::KIND.to_string(),
            id: record.id().to_string(),
            version: record.version().value(),
            payload: serde_json::to_value(record)?,
            updated_at: Utc::now(),
        })
    }

    /// 应用补丁并递增版本（引擎在同一条件写内调用）
    ///
    /// 补丁为仅含变更字段的 JSON 对象；null 值覆盖（置空可空引用）。
    pub fn apply_patch(&mut self, patch: &Value) -> Result<()> {
        let Some(changes) = patch.as_object() else {
            return Err(DomainError::Storage {
                reason: "patch must be a JSON object".to_string(),
            });
        };

        let Some(fields) = self.payload.as_object_mut() else {
            return Err(DomainError::Storage {
                reason: format!("malformed payload for {}:{}", self.kind, self.id),
            });
        };

        for (key, value) in changes {
            fields.insert(key.clone(), value.clone());
        }

        self.version += 1;
        fields.insert("version".to_string(), Value::from(self.version));
        self.updated_at = Utc::now();
        Ok(())
    }
}
