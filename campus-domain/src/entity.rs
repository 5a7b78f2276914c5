//! 实体（Entity）与记录（Record）基础抽象
//!
//! 为可变更记录提供统一的标识（Id）与版本（optimistic locking）能力，
//! 以及多对多关联边的声明方式。
//!
use crate::value_object::Version;
use serde::{Serialize, de::DeserializeOwned};
use std::{fmt::Display, str::FromStr};

/// 具备唯一标识与版本的实体抽象
///
/// `id` 在创建后不可变；`version` 仅随成功提交的变更递增，
/// 由存储层在条件写中统一维护，业务代码不自行修改。
pub trait Entity: Send + Sync {
    /// 实体标识类型，要求可解析、可显示、可克隆且可比较（集合语义）
    type Id: FromStr + Clone + Display + Eq + Ord + Send + Sync;

    /// 使用给定标识创建实体（版本为 0，尚未持久化）
    fn new(id: Self::Id) -> Self;

    /// 获取实体标识
    fn id(&self) -> &Self::Id;

    /// 获取当前版本（用于乐观锁与并发控制）
    fn version(&self) -> Version;

    /// 设置当前版本（仅供存储层在读取/提交后回填）
    fn set_version(&mut self, version: Version);
}

/// 可持久化的记录接口
///
/// 在 `Entity` 之上约束序列化能力并声明：
/// - `KIND`：记录种类的稳定名称，用于存储表定位与依赖规则声明；
/// - `Patch`：该记录的部分字段补丁类型，序列化为仅含变更字段的 JSON 对象
///   （字段值为 null 表示将可空引用置空）。
pub trait Record: Entity + Clone + Default + Serialize + DeserializeOwned + Send + Sync {
    const KIND: &'static str;

    /// 部分字段补丁（输入层已完成类型与格式校验）
    type Patch: Serialize + Send + Sync;
}

/// 多对多关联边声明
///
/// 关联对 `(left, right)` 没有独立标识与版本，"存在与否"即全部状态。
/// 每条边必须显式声明，删除任一端时由守卫负责级联清理关联行。
pub trait Link: Send + Sync {
    /// 边的稳定名称（存储层关联表定位）
    const EDGE: &'static str;

    type Left: Record;
    type Right: Record;
}

/// 关联边左端的标识类型
pub type LeftId<L> = <<L as Link>::Left as Entity>::Id;
/// 关联边右端的标识类型
pub type RightId<L> = <<L as Link>::Right as Entity>::Id;

#[cfg(test)]
mod tests {
    use super::*;
    use campus_macros::entity;
    use serde::{Deserialize, Serialize};

    #[entity(id = u64)]
    #[derive(Debug, Clone, Default, Serialize, Deserialize)]
    struct Fund {
        name: String,
        amount: i64,
    }

    #[derive(Debug, Serialize)]
    struct FundPatch {
        #[serde(skip_serializing_if = "Option::is_none")]
        amount: Option<i64>,
    }

    impl Record for Fund {
        const KIND: &'static str = "fund";
        type Patch = FundPatch;
    }

    // 宏注入 id/version 字段并实现 Entity
    #[test]
    fn entity_macro_injects_identity_and_version() {
        let f = Fund::new(7);
        assert_eq!(*f.id(), 7);
        assert!(f.version().is_new());
        assert_eq!(f.name, "");
    }

    // set_version 仅由存储层回填
    #[test]
    fn set_version_roundtrip() {
        let mut f = Fund::new(1);
        f.set_version(Version::from_value(3));
        assert_eq!(f.version().value(), 3);
    }

    // Patch 序列化为仅含变更字段的对象
    #[test]
    fn patch_serializes_only_changed_fields() {
        let p = FundPatch { amount: Some(1200) };
        let json = serde_json::to_value(&p).unwrap();
        assert_eq!(json, serde_json::json!({ "amount": 1200 }));

        let empty = FundPatch { amount: None };
        let json = serde_json::to_value(&empty).unwrap();
        assert_eq!(json, serde_json::json!({}));
    }
}
