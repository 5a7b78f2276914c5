use bon::Builder;
use uuid::Uuid;

/// 应用层上下文（Application Context）
///
/// 承载一次应用层调用所需的横切信息：
/// - 请求标识（`request_id`）：日志与追踪的关联键；
/// - 幂等键（`idempotency_key`）：用于在基础设施层实现请求幂等
///   （如 API 层重复提交保护）。
///
/// 注意：期望版本不属于上下文。它是每条命令的显式参数，
/// 不在调用链上隐式携带。
///
/// 典型用法：
/// ```rust
/// use campus_application::context::AppContext;
///
/// let ctx = AppContext::builder()
///     .maybe_idempotency_key(Some("idem-xyz".into()))
///     .build();
/// ```
#[derive(Clone, Debug, Builder)]
pub struct AppContext {
    /// 请求标识：缺省随机生成
    #[builder(default = Uuid::new_v4())]
    pub request_id: Uuid,
    /// 幂等键（可选）：为空则由上层或基础设施决定是否参与幂等
    pub idempotency_key: Option<String>,
}

impl Default for AppContext {
    fn default() -> Self {
        Self::builder().build()
    }
}
