use std::fmt;

use proc_macro::TokenStream;
use quote::quote;

/// Helper attribute overriding the generated name of a single variant.
const TAG_NAME_ATTRIBUTE: &str = "tag_name";

enum Visibility {
    Public(proc_macro2::Span),
    Private,
}

impl fmt::Display for Visibility {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Public(..) => "public",
            Self::Private => "private",
        }
        .fmt(f)
    }
}

impl syn::parse::Parse for Visibility {
    fn parse(input: syn::parse::ParseStream) -> syn::Result<Self> {
        let identifier = input.parse::<syn::Ident>()?;
        match identifier.to_string().as_str() {
            "public" => Ok(Self::Public(identifier.span())),
            "private" => Ok(Self::Private),
            _ => Err(syn::Error::new_spanned(
                identifier,
                "Unexpected visibility: expected `public` or `private`",
            )),
        }
    }
}

struct EnumTagsArgs {
    visibility: Visibility,
    repr_type: syn::Type,
}

impl syn::parse::Parse for EnumTagsArgs {
    fn parse(input: syn::parse::ParseStream) -> syn::Result<Self> {
        mod kw {
            use syn::custom_keyword;

            custom_keyword!(repr);
        }

        let visibility = input.parse()?;

        input.parse::<syn::Token![,]>().map_err(|mut error| {
            error.combine(syn::Error::new(
                input.span(),
                format!("Missing comma after `{}` visibility", visibility),
            ));
            error
        })?;

        input.parse::<kw::repr>().map_err(|mut error| {
            error.combine(syn::Error::new(
                input.span(),
                format!("Missing `repr` after `{},`", visibility),
            ));
            error
        })?;

        let content;
        syn::parenthesized!(content in input);
        let repr_type = content.parse()?;

        Ok(Self {
            visibility,
            repr_type,
        })
    }
}

/// One enum variant after tag and name resolution.
struct TaggedVariant {
    ident: syn::Ident,
    tag_ident: syn::Ident,
    discriminant: usize,
    name: String,
    fields: syn::Fields,
}

impl TaggedVariant {
    fn pattern(&self) -> proc_macro2::TokenStream {
        let ident = &self.ident;
        match self.fields {
            syn::Fields::Named(_) => quote! { Self::#ident { .. } },
            syn::Fields::Unnamed(_) => quote! { Self::#ident(..) },
            syn::Fields::Unit => quote! { Self::#ident },
        }
    }
}

/// Reads `#[tag_name = "..."]` off a variant, if present.
fn custom_name(variant: &syn::Variant) -> syn::Result<Option<String>> {
    for attribute in &variant.attrs {
        if !attribute.path().is_ident(TAG_NAME_ATTRIBUTE) {
            continue;
        }
        let name_value = attribute.meta.require_name_value()?;
        return match &name_value.value {
            syn::Expr::Lit(syn::ExprLit {
                lit: syn::Lit::Str(string_literal),
                ..
            }) => Ok(Some(string_literal.value())),
            other => Err(syn::Error::new_spanned(
                other,
                "`tag_name` must be a string literal",
            )),
        };
    }
    Ok(None)
}

fn collect_variants<'a>(
    variants: impl Iterator<Item = &'a syn::Variant>,
) -> syn::Result<Vec<TaggedVariant>> {
    let mut tagged = vec![];
    let mut discriminant = 0;

    for variant in variants {
        let upper_name = variant.ident.to_string().to_ascii_uppercase();
        let tag_ident = quote::format_ident!("{}_TAG", upper_name);

        if let Some((_, custom_discriminant)) = &variant.discriminant {
            match custom_discriminant {
                syn::Expr::Lit(syn::ExprLit {
                    lit: syn::Lit::Int(int_literal),
                    ..
                }) => discriminant = int_literal.base10_parse::<usize>()?,
                other => {
                    return Err(syn::Error::new_spanned(
                        other,
                        "Only literal discriminants are allowed",
                    ));
                }
            }
        }

        tagged.push(TaggedVariant {
            ident: variant.ident.clone(),
            tag_ident,
            discriminant,
            name: custom_name(variant)?.unwrap_or(upper_name),
            fields: variant.fields.clone(),
        });

        discriminant += 1;
    }

    Ok(tagged)
}

fn impl_enum_tags(
    enum_visibility: syn::Visibility,
    enum_name: &syn::Ident,
    repr_type: syn::Type,
    variants: &[TaggedVariant],
) -> proc_macro2::TokenStream {
    let mut tag_consts = vec![];
    let mut tag_cases = vec![];
    let mut name_cases = vec![];

    for variant in variants {
        let variant_name = &variant.ident;
        let tag_ident = &variant.tag_ident;
        let discriminant = variant.discriminant;
        let name = &variant.name;
        let pattern = variant.pattern();

        tag_consts.push(quote! {
            #[doc = concat!("`#[enum_tags]`-generated tag for the variant `Self::", stringify!(#variant_name), "`.")]
            #enum_visibility const #tag_ident: #repr_type = #discriminant as _;
        });
        tag_cases.push(quote! { #pattern => #discriminant as _ });
        name_cases.push(quote! { #pattern => #name });
    }

    let lookups = if variants
        .iter()
        .all(|variant| matches!(variant.fields, syn::Fields::Unit))
    {
        let count = variants.len();
        let idents = variants.iter().map(|variant| &variant.ident);
        let from_tag_cases = variants.iter().map(|variant| {
            let ident = &variant.ident;
            let tag_ident = &variant.tag_ident;
            quote! { Self::#tag_ident => Some(Self::#ident) }
        });
        let from_name_cases = variants.iter().map(|variant| {
            let ident = &variant.ident;
            let name = &variant.name;
            quote! { #name => Some(Self::#ident) }
        });

        quote! {
            #[doc = "`#[enum_tags]`-generated number of variants."]
            #enum_visibility const COUNT: usize = #count;

            #[doc = "`#[enum_tags]`-generated list of every variant, in tag order."]
            #enum_visibility const ALL: [Self; #count] = [#(Self::#idents),*];

            #[doc = "`#[enum_tags]`-generated lookup of a variant by its tag."]
            #enum_visibility fn from_tag(tag: #repr_type) -> Option<Self> {
                match tag {
                    #(#from_tag_cases,)*
                    _ => None,
                }
            }

            #[doc = "`#[enum_tags]`-generated lookup of a variant by its name."]
            #enum_visibility fn from_name(name: &str) -> Option<Self> {
                match name {
                    #(#from_name_cases,)*
                    _ => None,
                }
            }
        }
    } else {
        quote! {}
    };

    quote! {
        #[allow(dead_code)]
        impl #enum_name {
            #(#tag_consts)*

            #[doc = "`#[enum_tags]`-generated getter for this variant's tag."]
            #enum_visibility const fn tag(&self) -> #repr_type {
                match self {
                    #(#tag_cases),*
                }
            }

            #[doc = "`#[enum_tags]`-generated getter for this variant's name."]
            #enum_visibility const fn name(&self) -> &'static str {
                match self {
                    #(#name_cases),*
                }
            }

            #lookups
        }
    }
}

/// Constructs an `impl` for the given `enum` with constants for the
/// discriminant value of each variant, plus a name for each variant.
///
/// Usage examples:
///
/// * `#[enum_tags(public, repr(u8))]`
/// * `#[enum_tags(private, repr(u64))]`
///
/// Note that the `repr` type can be any numerical type to which a `usize` can
/// be casted to implicitly with the `as` keyword --- it is not the same as the
/// type for which you may `#[repr(...)]` the `enum`.
///
/// A variant's name defaults to its identifier in upper case and can be
/// overridden with `#[tag_name = "..."]`. When every variant is a unit
/// variant, `COUNT`, `ALL`, `from_tag` and `from_name` are generated too.
#[proc_macro_attribute]
pub fn enum_tags(args: TokenStream, input: TokenStream) -> TokenStream {
    let args = syn::parse_macro_input!(args as EnumTagsArgs);

    let mut input_item = syn::parse_macro_input!(input as syn::DeriveInput);

    let data_enum = match &mut input_item.data {
        syn::Data::Enum(data_enum) => data_enum,
        syn::Data::Struct(syn::DataStruct {
            struct_token: syn::token::Struct { span },
            ..
        })
        | syn::Data::Union(syn::DataUnion {
            union_token: syn::token::Union { span },
            ..
        }) => {
            return syn::Error::new(*span, "Item must be an `enum`")
                .into_compile_error()
                .into();
        }
    };

    let variants = match collect_variants(data_enum.variants.iter()) {
        Ok(variants) => variants,
        Err(error) => return error.into_compile_error().into(),
    };

    // `tag_name` is ours alone; the compiler must not see it
    for variant in data_enum.variants.iter_mut() {
        variant
            .attrs
            .retain(|attribute| !attribute.path().is_ident(TAG_NAME_ATTRIBUTE));
    }

    let visibility = match args.visibility {
        Visibility::Public(span) => {
            syn::Visibility::Public(syn::token::Pub { span })
        }
        Visibility::Private => syn::Visibility::Inherited,
    };

    let tags_impl = impl_enum_tags(
        visibility,
        &input_item.ident,
        args.repr_type,
        &variants,
    );

    quote! {
        #input_item

        #tags_impl
    }
    .into()
}
