//! 校务记录变更安全核心（campus-domain）
//!
//! 为记录管理系统（学生/课程/院系/教师/选课）提供写路径的安全层：
//! - 实体与版本抽象（`entity`、`value_object`）：带乐观锁版本号的记录建模
//! - 存储引擎协议与条件写原语（`store::engine`）：带受影响行数的 CAS 写入
//! - 带版本读写（`store::versioned_store`）：更新/删除的冲突检测与归类
//! - 多对多关联对账（`store::reconciler`）：最小增删集，幂等可重试
//! - 删除守卫（`store::dependency`）：阻断/级联依赖规则的显式声明与检查
//! - 变更编排（`mutation`）：以单事务为边界的命令编排与带标签结果
//!
//! 本 crate 尽量保持与存储与传输实现解耦，仅定义协议与最小必要的错误类型，
//! 以便在不同基础设施（例如 Postgres、内存引擎等）上进行适配实现。
//!
//! 典型用法：
//! 1. 使用 `#[entity]` 定义记录类型并实现 `Record`（KIND 与 Patch）；
//! 2. 声明 `DependencyRules`（阻断/级联，逐条显式，不做推断）；
//! 3. 注入 `StorageEngine` 实现，构造 `MutationRoot`；
//! 4. 通过 `update` / `replace_links` / `delete` 执行带版本校验的变更。
//!
pub mod entity;
pub mod error;
pub mod mutation;
pub mod outcome;
pub mod store;
pub mod value_object;

// 允许在本 crate 内部通过 ::campus_domain 进行自引用，
// 以便过程宏在本 crate 的单元测试中也能解析到 ::campus_domain 路径。
extern crate self as campus_domain;
