use syn::{Field, FieldsNamed, Token, Type, punctuated::Punctuated};

/// 确保具名字段结构体包含所需字段，并把它们移到最前。
/// - required: (字段名, 字段类型) 列表，按给定顺序处理；
/// - 已存在的字段复用原定义（含原类型与属性），缺失的按给定类型新建。
pub(crate) fn ensure_leading_fields(fields_named: &mut FieldsNamed, required: &[(&str, &Type)]) {
    let old_named = fields_named.named.clone();
    let mut new_named: Punctuated<Field, Token![,]> = Punctuated::new();

    for (name, ty) in required.iter() {
        if let Some(existing) = old_named
            .iter()
            .find(|f| f.ident.as_ref().map(|i| i == *name).unwrap_or(false))
        {
            new_named.push(existing.clone());
        } else {
            let ident: syn::Ident = syn::parse_str(name).expect("valid field ident");
            let field: Field = syn::parse_quote! { #ident: #ty };
            new_named.push(field);
        }
    }

    // 其余字段保持原有相对顺序
    for f in old_named.into_iter() {
        let is_required = f
            .ident
            .as_ref()
            .map(|i| required.iter().any(|(n, _)| i == n))
            .unwrap_or(false);
        if !is_required {
            new_named.push(f);
        }
    }

    fields_named.named = new_named;
}
