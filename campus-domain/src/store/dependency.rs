//! 删除依赖规则与守卫（DeletionGuard）
//!
//! "种类 X 在仍被种类 Y 经字段 F 引用时不可删除"的声明式规则。
//! 阻断与级联都必须逐条显式声明，绝不从结构推断。守卫必须与后续删除
//! 运行在同一事务内：检查与删除之间的空隙由事务隔离覆盖，引擎自身的
//! 外键约束是空隙万一被利用时的最后防线。
//!
use crate::{
    entity::Record,
    error::DomainResult,
    outcome::GuardOutcome,
    store::{LinkSide, StorageSession},
};
use bon::Builder;

/// 删除时对依赖行的处置
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OnDelete {
    /// 存在依赖行即拒绝删除
    Block,
    /// 同一事务内自动删除依赖行
    Cascade,
}

/// 单条依赖规则：`dependent_kind.via_field → owner_kind.id`
#[derive(Debug, Clone, Builder)]
pub struct DependencyRule {
    pub owner_kind: &'static str,
    pub dependent_kind: &'static str,
    pub via_field: &'static str,
    pub on_delete: OnDelete,
}

/// 关联边的级联声明：删除任一端时清理该边上的关联对
#[derive(Debug, Clone, Builder)]
pub struct EdgeCascade {
    pub edge: &'static str,
    pub left_kind: &'static str,
    pub right_kind: &'static str,
}

/// 依赖规则注册表
///
/// 规则按声明顺序评估；级联规则应先声明最深层的依赖，
/// 使一遍删除即可满足引用约束。
#[derive(Debug, Clone, Default)]
pub struct DependencyRules {
    rules: Vec<DependencyRule>,
    edges: Vec<EdgeCascade>,
}

impl DependencyRules {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn declare(mut self, rule: DependencyRule) -> Self {
        self.rules.push(rule);
        self
    }

    pub fn declare_edge(mut self, edge: EdgeCascade) -> Self {
        self.edges.push(edge);
        self
    }

    /// 给定种类作为被引用方的全部规则
    pub fn for_owner<'a>(&'a self, kind: &'a str) -> impl Iterator<Item = &'a DependencyRule> {
        self.rules.iter().filter(move |r| r.owner_kind == kind)
    }

    /// 全部规则（引擎侧外键校验用）
    pub fn iter(&self) -> impl Iterator<Item = &DependencyRule> {
        self.rules.iter()
    }

    /// 给定种类参与的全部关联边及其所在侧
    pub fn edges_of(&self, kind: &str) -> Vec<(&EdgeCascade, LinkSide)> {
        let mut out = Vec::new();
        for edge in &self.edges {
            if edge.left_kind == kind {
                out.push((edge, LinkSide::Left));
            }
            if edge.right_kind == kind {
                out.push((edge, LinkSide::Right));
            }
        }
        out
    }
}

/// 在一个已开启的事务会话上执行删除前检查与级联
pub struct DeletionGuard<'s, S> {
    session: &'s mut S,
}

impl<'s, S> DeletionGuard<'s, S>
where
    S: StorageSession,
{
    pub fn new(session: &'s mut S) -> Self {
        Self { session }
    }

    /// 预检：任一阻断规则存在存活依赖即 `Blocked`，携带依赖种类与计数
    pub async fn check<A>(
        &mut self,
        rules: &DependencyRules,
        id: &A::Id,
    ) -> DomainResult<GuardOutcome>
    where
        A: Record,
    {
        let id_str = id.to_string();
        for rule in rules.for_owner(A::KIND) {
            if rule.on_delete != OnDelete::Block {
                continue;
            }
            let count = self
                .session
                .count_referencing(rule.dependent_kind, rule.via_field, &id_str)
                .await?;
            if count > 0 {
                return Ok(GuardOutcome::Blocked {
                    dependent_kind: rule.dependent_kind,
                    count,
                });
            }
        }
        Ok(GuardOutcome::Clear)
    }

    /// 级联清理：先删依赖行（按声明顺序，最深层在前），再删关联对
    pub async fn cascade<A>(&mut self, rules: &DependencyRules, id: &A::Id) -> DomainResult<u64>
    where
        A: Record,
    {
        let id_str = id.to_string();
        let mut removed = 0;

        for rule in rules.for_owner(A::KIND) {
            if rule.on_delete != OnDelete::Cascade {
                continue;
            }
            removed += self
                .session
                .delete_referencing(rule.dependent_kind, rule.via_field, &id_str)
                .await?;
        }

        for (edge, side) in rules.edges_of(A::KIND) {
            removed += self
                .session
                .delete_links_where(edge.edge, side, &id_str)
                .await?;
        }

        Ok(removed)
    }
}
