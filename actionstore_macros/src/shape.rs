use proc_macro::TokenStream;
use quote::quote;
use syn::{Data, DeriveInput, Fields, LitStr};

pub fn derive_shape(input: TokenStream) -> TokenStream {
    let input = syn::parse_macro_input!(input as DeriveInput);

    let expanded = match &input.data {
        Data::Struct(data) => match &data.fields {
            Fields::Named(fields) => struct_shape(&input, fields),
            _ => Err(syn::Error::new_spanned(
                &input.ident,
                "Shape derive: only structs with named fields are supported",
            )),
        },
        Data::Enum(data) => enum_kind(&input, data),
        Data::Union(_) => Err(syn::Error::new_spanned(
            &input.ident,
            "Shape derive: unions are not supported",
        )),
    };

    match expanded {
        Ok(tokens) => TokenStream::from(tokens),
        Err(err) => TokenStream::from(err.to_compile_error()),
    }
}

/// Per-field `#[shape(...)]` options.
#[derive(Default)]
struct FieldAttrs {
    identifier: bool,
    skip: bool,
    alias: Option<String>,
}

fn field_attrs(field: &syn::Field) -> syn::Result<FieldAttrs> {
    let mut attrs = FieldAttrs::default();
    for attr in &field.attrs {
        if !attr.path().is_ident("shape") {
            continue;
        }
        attr.parse_nested_meta(|meta| {
            if meta.path.is_ident("id") {
                attrs.identifier = true;
            } else if meta.path.is_ident("skip") {
                attrs.skip = true;
            } else if meta.path.is_ident("alias") {
                let value: LitStr = meta.value()?.parse()?;
                attrs.alias = Some(value.value());
            } else {
                return Err(meta.error("expected `id`, `skip` or `alias = \"...\"`"));
            }
            Ok(())
        })?;
    }
    Ok(attrs)
}

fn struct_shape(
    input: &DeriveInput,
    fields: &syn::FieldsNamed,
) -> syn::Result<proc_macro2::TokenStream> {
    let name = &input.ident;
    let (impl_generics, ty_generics, where_clause) = input.generics.split_for_impl();

    let mut declared = Vec::new();
    for field in &fields.named {
        let attrs = field_attrs(field)?;
        if attrs.skip {
            continue;
        }
        let Some(ident) = &field.ident else { continue };
        let field_name = ident.to_string();
        let ty = &field.ty;

        let mut expr = quote! {
            actionstore::shape::Field::new(#field_name, <#ty as actionstore::ShapeField>::kind())
        };
        if attrs.identifier {
            expr = quote! { #expr.identifier() };
        }
        if let Some(alias) = attrs.alias {
            expr = quote! { #expr.alias(#alias) };
        }
        declared.push(expr);
    }

    Ok(quote! {
        impl #impl_generics actionstore::HasShape for #name #ty_generics #where_clause {
            fn shape() -> actionstore::shape::Shape {
                actionstore::shape::Shape::new()
                    #( .field(#declared) )*
            }
        }

        impl #impl_generics actionstore::ShapeField for #name #ty_generics #where_clause {
            fn kind() -> actionstore::FieldKind {
                actionstore::FieldKind::Object(
                    <Self as actionstore::HasShape>::shape(),
                )
            }
        }
    })
}

fn enum_kind(input: &DeriveInput, data: &syn::DataEnum) -> syn::Result<proc_macro2::TokenStream> {
    let name = &input.ident;
    let mut variants = Vec::new();
    for variant in &data.variants {
        if !matches!(variant.fields, Fields::Unit) {
            return Err(syn::Error::new_spanned(
                variant,
                "Shape derive: only unit enum variants are supported",
            ));
        }
        variants.push(variant.ident.to_string());
    }

    Ok(quote! {
        impl actionstore::ShapeField for #name {
            fn kind() -> actionstore::FieldKind {
                actionstore::FieldKind::Enum(vec![#( #variants.into() ),*])
            }
        }
    })
}
