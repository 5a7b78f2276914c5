//! campus 宏支持库（campus-macros）
//!
//! 为 campus-domain 提供属性宏：
//! - `#[entity]`：为记录结构体注入 `id`/`version` 字段并实现 `Entity`；
//! - `#[entity_id]`：单字段 tuple struct 的类型安全 Id 包装；
//! - `#[value_object]`：值对象的派生合并。
//!
mod derive_utils;
mod entity;
mod entity_id;
mod field_utils;
mod value_object;

use proc_macro::TokenStream;

/// #[entity] 属性宏
///
/// 用法：`#[entity]`、`#[entity(id = DepartmentId)]`、`#[entity(debug = false)]`
#[proc_macro_attribute]
pub fn entity(attr: TokenStream, item: TokenStream) -> TokenStream {
    entity::expand(attr, item)
}

/// #[entity_id] 属性宏
///
/// 用法：`#[entity_id] struct CourseId(i64);`
#[proc_macro_attribute]
pub fn entity_id(attr: TokenStream, item: TokenStream) -> TokenStream {
    entity_id::expand(attr, item)
}

/// #[value_object] 属性宏
///
/// 用法：`#[value_object] struct Version(usize);`
#[proc_macro_attribute]
pub fn value_object(attr: TokenStream, item: TokenStream) -> TokenStream {
    value_object::expand(attr, item)
}
