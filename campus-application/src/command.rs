//! 应用层命令（Command）
//!
//! 表达“意图”的写操作请求，通常会修改领域状态。
//! - 返回该命令的类型化结果载体（`Output`），预期业务终态
//!   （冲突、阻断、不存在）作为值出现在其中，不走错误通道。
//! - 建议保持语义化的“动宾结构”命名，如 `UpdateDepartment`、`DeleteInstructor`。
//!
//! 关联常量：
//! - `NAME`：命令的稳定名称，用于日志、追踪与路由。避免依赖 `type_name::<T>()`。
pub trait Command: Send + Sync + 'static {
    /// 命令的稳定名称（建议常量字符串，不随重构变化）
    const NAME: &'static str;

    /// 命令执行结果的载体类型
    type Output: Send + 'static;
}
