use proc_macro::TokenStream;
use quote::quote;
use syn::{parse_macro_input, Data, DeriveInput, Fields, LitStr, Result as SynResult, Visibility};

/// Wire name of a field: `#[map(rename = "...")]` if present, the identifier otherwise.
fn wire_name(field: &syn::Field) -> SynResult<Option<String>> {
    let Some(ident) = &field.ident else {
        return Ok(None);
    };
    let mut name = ident.to_string();
    for attr in field.attrs.iter().filter(|a| a.path().is_ident("map")) {
        attr.parse_nested_meta(|meta| {
            if meta.path.is_ident("rename") {
                let lit: LitStr = meta.value()?.parse()?;
                name = lit.value();
                Ok(())
            } else {
                Err(meta.error("unsupported map attribute, expected `rename`"))
            }
        })?;
    }
    Ok(Some(name))
}

/// Derive `brrtresolver::mapper::MapTarget` for a struct with named fields.
///
/// Only `pub` fields take part in a projection; private fields are left out of
/// the generated field list.
#[proc_macro_derive(MapTarget, attributes(map))]
pub fn derive_map_target(item: TokenStream) -> TokenStream {
    let input = parse_macro_input!(item as DeriveInput);
    let ident = &input.ident;
    let shape = ident.to_string();

    let fields = match &input.data {
        Data::Struct(data) => match &data.fields {
            Fields::Named(named) => &named.named,
            _ => {
                return syn::Error::new_spanned(ident, "MapTarget requires named fields")
                    .to_compile_error()
                    .into()
            }
        },
        _ => {
            return syn::Error::new_spanned(ident, "MapTarget can only be derived for structs")
                .to_compile_error()
                .into()
        }
    };

    let mut names = Vec::new();
    for field in fields {
        if !matches!(field.vis, Visibility::Public(_)) {
            continue;
        }
        match wire_name(field) {
            Ok(Some(name)) => names.push(name),
            Ok(None) => {}
            Err(e) => return e.to_compile_error().into(),
        }
    }

    let (impl_generics, ty_generics, where_clause) = input.generics.split_for_impl();
    let expanded = quote! {
        impl #impl_generics ::brrtresolver::mapper::MapTarget for #ident #ty_generics #where_clause {
            const SHAPE: &'static str = #shape;
            const FIELDS: &'static [&'static str] = &[#(#names),*];
        }
    };
    TokenStream::from(expanded)
}
