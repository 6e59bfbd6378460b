//! `#[derive(Encode)]` for `structex`.
//!
//! Structs with named fields, tuple structs and unit structs are supported.
//! Tuple fields are named by their index (`"0"`, `"1"`, ...).
//!
//! # Attributes
//!
//! - `#[structex(name = "Wire")]` on the struct replaces the name sent in
//!   the descriptor.
//! - `#[structex(count_of = "field")]` computes the field from the element
//!   count of a sibling. The sibling is then written without its own count.
//! - `#[structex(size_of = "field")]` computes the field from the encoded
//!   byte length of a sibling.
//! - `#[structex(skip)]` leaves the field out of the descriptor and the body.
//!
//! ```ignore
//! use structex::Encode;
//!
//! #[derive(Encode)]
//! struct Record {
//!     #[structex(count_of = "samples")]
//!     count: u8,
//!     #[structex(size_of = "samples")]
//!     size: u16,
//!     samples: Vec<u32>,
//!     #[structex(skip)]
//!     cache: Option<u64>,
//! }
//! ```

use proc_macro::TokenStream;
use proc_macro2::{Span, TokenStream as TokenStream2};
use quote::quote;
use syn::{
    ext::IdentExt, parse_macro_input, Data, DeriveInput, Field, Fields, Index, LitStr, Member,
};

enum Tag {
    CountOf(String),
    SizeOf(String),
}

impl Tag {
    fn target(&self) -> &str {
        match self {
            Tag::CountOf(target) | Tag::SizeOf(target) => target,
        }
    }
}

struct FieldInfo<'a> {
    field: &'a Field,
    member: Member,
    name: String,
    tag: Option<Tag>,
    skip: bool,
}

#[proc_macro_derive(Encode, attributes(structex))]
pub fn derive_encode(input: TokenStream) -> TokenStream {
    let input = parse_macro_input!(input as DeriveInput);
    expand(&input)
        .unwrap_or_else(syn::Error::into_compile_error)
        .into()
}

fn expand(input: &DeriveInput) -> syn::Result<TokenStream2> {
    let data = match &input.data {
        Data::Struct(data) => data,
        Data::Enum(_) | Data::Union(_) => {
            return Err(syn::Error::new_spanned(
                &input.ident,
                "Encode can only be derived for structs",
            ))
        }
    };
    if let Some(lifetime) = input.generics.lifetimes().next() {
        return Err(syn::Error::new_spanned(
            lifetime,
            "Encode cannot be derived for types with lifetime parameters",
        ));
    }

    let wire_name = container_name(input)?;
    let fields = collect_fields(&data.fields)?;
    check_tags(&fields)?;
    let described: Vec<&FieldInfo> = fields.iter().filter(|f| !f.skip).collect();

    let mut shapes = Vec::new();
    let mut encodes = Vec::new();
    let mut lens = Vec::new();
    for field in described.iter() {
        let ty = &field.field.ty;
        let name = &field.name;
        let member = &field.member;

        // Keyed by the canonical form, so `Box<T>` and `T` share one id.
        let shape = quote! {
            ::structex::FieldShape::new(#name, <#ty as ::structex::Encode>::type_ref())
        };
        shapes.push(match &field.tag {
            None => shape,
            Some(Tag::CountOf(target)) => {
                quote!(#shape.tagged(::structex::FieldTag::CountOf(#target)))
            }
            Some(Tag::SizeOf(target)) => {
                quote!(#shape.tagged(::structex::FieldTag::SizeOf(#target)))
            }
        });

        match &field.tag {
            Some(tag) => {
                let target = lookup(&described, tag.target())?;
                let target_member = &target.member;
                let value = match tag {
                    Tag::CountOf(_) => quote! {
                        ::structex::resolve::count_of(&self.#target_member, #wire_name, #name)?
                    },
                    Tag::SizeOf(_) => {
                        let counted = is_counted(&described, &target.name);
                        quote!(::structex::resolve::size_of(&self.#target_member, #counted))
                    }
                };
                encodes.push(quote! {
                    ::structex::resolve::emit::<#ty>(state, #name, #value)?;
                });
                lens.push(quote!(<#ty as ::structex::resolve::DerivedValue>::WIDTH));
            }
            None if is_counted(&described, name) => {
                encodes.push(quote!(::structex::Encode::encode_elements(&self.#member, state)?;));
                lens.push(quote!(::structex::Encode::elements_len(&self.#member)));
            }
            None => {
                encodes.push(quote!(::structex::Encode::encode(&self.#member, state)?;));
                lens.push(quote!(::structex::Encode::encoded_len(&self.#member)));
            }
        }
    }

    let ident = &input.ident;
    let (impl_generics, ty_generics, where_clause) = input.generics.split_for_impl();
    let mut where_clause = where_clause
        .cloned()
        .unwrap_or_else(|| syn::parse_quote!(where));
    for param in input.generics.type_params() {
        let ident = &param.ident;
        where_clause
            .predicates
            .push(syn::parse_quote!(#ident: ::structex::Encode + 'static));
    }

    Ok(quote! {
        impl #impl_generics ::structex::Encode for #ident #ty_generics #where_clause {
            fn type_ref() -> ::structex::TypeRef {
                ::structex::TypeRef::named::<Self>(#wire_name)
            }

            fn shape() -> ::structex::Shape {
                ::structex::Shape::Struct(::structex::StructShape {
                    name: #wire_name,
                    fields: ::std::vec![#(#shapes),*],
                })
            }

            #[allow(unused_variables)]
            fn encode(&self, state: &mut ::structex::EncoderState) -> ::structex::Result<()> {
                #(#encodes)*
                ::std::result::Result::Ok(())
            }

            fn encoded_len(&self) -> usize {
                0 #(+ #lens)*
            }
        }
    })
}

fn container_name(input: &DeriveInput) -> syn::Result<String> {
    let mut name = input.ident.unraw().to_string();
    for attr in input.attrs.iter() {
        if !attr.path().is_ident("structex") {
            continue;
        }
        attr.parse_nested_meta(|meta| {
            if meta.path.is_ident("name") {
                let value: LitStr = meta.value()?.parse()?;
                name = value.value();
                Ok(())
            } else {
                Err(meta.error("unknown structex container attribute"))
            }
        })?;
    }
    Ok(name)
}

fn collect_fields(fields: &Fields) -> syn::Result<Vec<FieldInfo<'_>>> {
    fields
        .iter()
        .enumerate()
        .map(|(index, field)| {
            let (member, name) = match &field.ident {
                Some(ident) => (Member::Named(ident.clone()), ident.unraw().to_string()),
                None => (Member::Unnamed(Index::from(index)), index.to_string()),
            };
            let (tag, skip) = field_attrs(field)?;
            Ok(FieldInfo {
                field,
                member,
                name,
                tag,
                skip,
            })
        })
        .collect()
}

fn field_attrs(field: &Field) -> syn::Result<(Option<Tag>, bool)> {
    let mut tag = None;
    let mut skip = false;
    for attr in field.attrs.iter() {
        if !attr.path().is_ident("structex") {
            continue;
        }
        attr.parse_nested_meta(|meta| {
            if meta.path.is_ident("skip") {
                skip = true;
                return Ok(());
            }
            let make: fn(String) -> Tag = if meta.path.is_ident("count_of") {
                Tag::CountOf
            } else if meta.path.is_ident("size_of") {
                Tag::SizeOf
            } else {
                return Err(meta.error("unknown structex field attribute"));
            };
            let target: LitStr = meta.value()?.parse()?;
            if tag.is_some() {
                return Err(meta.error("a field takes at most one of count_of and size_of"));
            }
            tag = Some(make(target.value()));
            Ok(())
        })?;
    }
    Ok((tag, skip))
}

fn check_tags(fields: &[FieldInfo]) -> syn::Result<()> {
    let mut errors = Vec::new();
    for field in fields.iter() {
        let tag = match &field.tag {
            Some(tag) => tag,
            None => continue,
        };
        let problem = if field.skip {
            Some("a skipped field cannot be derived".to_string())
        } else {
            match fields.iter().find(|f| f.name == tag.target()) {
                None => Some(format!("no field named `{}`", tag.target())),
                Some(target) if target.name == field.name => {
                    Some("a field cannot be derived from itself".to_string())
                }
                Some(target) if target.skip => {
                    Some(format!("`{}` is skipped and never encoded", target.name))
                }
                Some(_) => None,
            }
        };
        if let Some(message) = problem {
            errors.push(syn::Error::new_spanned(field.field, message));
        }
    }

    let mut errors = errors.into_iter();
    match errors.next() {
        None => Ok(()),
        Some(mut first) => {
            for err in errors {
                first.combine(err);
            }
            Err(first)
        }
    }
}

fn lookup<'a>(fields: &[&'a FieldInfo<'a>], name: &str) -> syn::Result<&'a FieldInfo<'a>> {
    fields
        .iter()
        .copied()
        .find(|f| f.name == name)
        .ok_or_else(|| syn::Error::new(Span::call_site(), format!("no field named `{}`", name)))
}

/// Whether a sibling carries the element count of `name`.
fn is_counted(fields: &[&FieldInfo], name: &str) -> bool {
    fields
        .iter()
        .any(|f| matches!(&f.tag, Some(Tag::CountOf(target)) if target == name))
}
