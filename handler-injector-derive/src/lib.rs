//! Derive macros for handler-injector
//!
//! `#[derive(Inject)]` implements `InjectFields` for a controller struct,
//! declaring every `#[inject]` field as a slot the injector fills per
//! request.
//!
//! # Example
//!
//! ```rust,ignore
//! use handler_injector::Inject;
//!
//! #[derive(Clone)]
//! struct Database {
//!     url: String,
//! }
//!
//! #[derive(Clone, Inject)]
//! struct UserController {
//!     #[inject]
//!     db: Option<Database>,
//!     // Left untouched by the injector
//!     page_size: usize,
//! }
//! ```

use proc_macro::TokenStream;
use quote::quote;
use syn::{Attribute, Data, DeriveInput, Fields, GenericArgument, PathArguments, Type, parse_macro_input};

/// Derive macro for controller field injection.
///
/// Generates an `InjectFields` implementation that registers each field
/// marked `#[inject]`. Marked fields must have type `Option<T>`; a field
/// still `None` when a request arrives is filled from the provider for `T`,
/// a field already holding a value is kept.
///
/// # Generated Code
///
/// ```rust,ignore
/// impl InjectFields for UserController {
///     fn inject_fields(fields: &mut Fields<Self>) {
///         fields.field("db", |c: &mut Self| &mut c.db);
///     }
/// }
/// ```
#[proc_macro_derive(Inject, attributes(inject))]
pub fn derive_inject(input: TokenStream) -> TokenStream {
    let input = parse_macro_input!(input as DeriveInput);

    let name = &input.ident;
    let generics = &input.generics;
    let (impl_generics, ty_generics, where_clause) = generics.split_for_impl();

    // Only support structs with named fields
    let fields = match &input.data {
        Data::Struct(data) => match &data.fields {
            Fields::Named(fields) => &fields.named,
            _ => {
                return syn::Error::new_spanned(
                    &input,
                    "Inject can only be derived for structs with named fields",
                )
                .to_compile_error()
                .into();
            }
        },
        _ => {
            return syn::Error::new_spanned(&input, "Inject can only be derived for structs")
                .to_compile_error()
                .into();
        }
    };

    let mut slots: Vec<proc_macro2::TokenStream> = Vec::new();

    for field in fields.iter() {
        if !has_inject_attr(&field.attrs) {
            continue;
        }

        let Some(field_name) = field.ident.as_ref() else {
            continue;
        };

        if option_inner_type(&field.ty).is_none() {
            return syn::Error::new_spanned(
                &field.ty,
                "Fields marked with #[inject] must have type Option<T>",
            )
            .to_compile_error()
            .into();
        }

        let label = field_name.to_string();
        slots.push(quote! {
            fields.field(#label, |c: &mut Self| &mut c.#field_name);
        });
    }

    let expanded = quote! {
        impl #impl_generics ::handler_injector::InjectFields for #name #ty_generics #where_clause {
            fn inject_fields(fields: &mut ::handler_injector::Fields<Self>) {
                #(#slots)*
            }
        }
    };

    TokenStream::from(expanded)
}

/// Whether the field carries `#[inject]`
fn has_inject_attr(attrs: &[Attribute]) -> bool {
    attrs.iter().any(|attr| attr.path().is_ident("inject"))
}

/// Extract T from Option<T>
fn option_inner_type(ty: &Type) -> Option<&Type> {
    if let Type::Path(type_path) = ty {
        let segment = type_path.path.segments.last()?;
        if segment.ident == "Option" {
            if let PathArguments::AngleBracketed(args) = &segment.arguments {
                if let Some(GenericArgument::Type(inner)) = args.args.first() {
                    return Some(inner);
                }
            }
        }
    }
    None
}
