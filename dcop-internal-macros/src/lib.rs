//! Internal macros for the dcop solver crates.
#![recursion_limit = "128"]

use proc_macro2::{Span, TokenStream};
use quote::quote;
use regex::Regex;
use syn::{parse_quote, Attribute, Expr, Ident, Lit, LitStr, Meta, MetaNameValue};
use synstructure::decl_derive;

/// All `///` lines attached to an item.
fn doc_lines(attrs: &[Attribute]) -> Vec<LitStr> {
    let mut lines = vec![];
    for attr in attrs.iter() {
        if let Ok(Meta::NameValue(MetaNameValue {
            ident,
            lit: Lit::Str(doc_str),
            ..
        })) = attr.parse_meta()
        {
            if ident == "doc" {
                lines.push(doc_str);
            }
        }
    }
    lines
}

/// Parses the expression captured by `marker` in the first doc line it matches.
fn doc_marker(attrs: &[Attribute], marker: &Regex) -> Option<Expr> {
    for doc_str in doc_lines(attrs) {
        if let Some(captures) = marker.captures(&doc_str.value()) {
            let expr_str = captures.get(1).unwrap().as_str();
            let expr_str = LitStr::new(expr_str, doc_str.span());
            return Some(expr_str.parse().expect("error parsing doc expression"));
        }
    }
    None
}

/// Derives a default instance from the documentation.
fn derive_doc_default(s: synstructure::Structure) -> TokenStream {
    let variant = match s.variants() {
        [variant] => variant,
        _ => panic!("DocDefault requires a struct"),
    };

    let default_re = Regex::new(r"\(Default: (.*)\)").unwrap();

    let body = variant.construct(|field, _| {
        doc_marker(&field.attrs, &default_re).unwrap_or_else(|| parse_quote!(Default::default()))
    });

    s.gen_impl(quote! {
        gen impl Default for @Self {
            fn default() -> Self {
                #body
            }
        }
    })
}

/// Derives a partial update struct `<Name>Update` and a `help` text from the documentation.
///
/// Every field of the update is optional. Updates can be deserialized, merged and applied to the
/// config. Fields documented with `(Range: <range expr>)` are checked when applying.
fn derive_config_update(s: synstructure::Structure) -> TokenStream {
    let variant = match s.variants() {
        [variant] => variant,
        _ => panic!("ConfigUpdate requires a struct"),
    };

    let range_re = Regex::new(r"\(Range: ([^)]*)\)").unwrap();

    let config_ident = &s.ast().ident;
    let update_ident = Ident::new(&format!("{}Update", config_ident), Span::call_site());

    let mut field_decls = vec![];
    let mut merge_stmts = vec![];
    let mut check_stmts = vec![];
    let mut apply_stmts = vec![];
    let mut help = String::new();

    for field in variant.ast().fields.iter() {
        let ident = field
            .ident
            .clone()
            .expect("ConfigUpdate requires named fields");
        let ty = &field.ty;
        let name = ident.to_string();

        help.push_str(&name);
        help.push_str(":\n");
        for line in doc_lines(&field.attrs) {
            let line = line.value();
            if !line.trim().is_empty() {
                help.push_str("    ");
                help.push_str(line.trim());
                help.push('\n');
            }
        }
        help.push('\n');

        field_decls.push(quote! {
            #[serde(default, skip_serializing_if = "Option::is_none")]
            pub #ident: Option<#ty>,
        });

        merge_stmts.push(quote! {
            if other.#ident.is_some() {
                self.#ident = other.#ident;
            }
        });

        if let Some(range) = doc_marker(&field.attrs, &range_re) {
            let range_str = quote!(#range).to_string();
            check_stmts.push(quote! {
                if let Some(value) = &self.#ident {
                    if !(#range).contains(value) {
                        return Err(anyhow::anyhow!(
                            "{} = {:?} is outside of the valid range {}",
                            #name,
                            value,
                            #range_str
                        ));
                    }
                }
            });
        }

        apply_stmts.push(quote! {
            if let Some(value) = &self.#ident {
                config.#ident = value.clone();
            }
        });
    }

    let update_doc = format!("Partial update of a [`{}`].", config_ident);
    let help_lit = LitStr::new(&help, Span::call_site());

    quote! {
        #[doc = #update_doc]
        #[derive(Default, Clone, Debug, serde::Serialize, serde::Deserialize)]
        #[serde(deny_unknown_fields)]
        pub struct #update_ident {
            #(#field_decls)*
        }

        impl #update_ident {
            /// Create an update that changes nothing.
            pub fn new() -> #update_ident {
                #update_ident::default()
            }

            /// Take all values that are set in `other`.
            pub fn merge(&mut self, other: #update_ident) {
                #(#merge_stmts)*
            }

            /// Check all set values and write them into `config`.
            ///
            /// Nothing is written when a value is out of range.
            pub fn apply(&self, config: &mut #config_ident) -> Result<(), anyhow::Error> {
                #(#check_stmts)*
                #(#apply_stmts)*
                Ok(())
            }
        }

        impl #config_ident {
            /// Description of all options.
            pub fn help() -> &'static str {
                #help_lit
            }
        }
    }
}

decl_derive!([DocDefault] => derive_doc_default);
decl_derive!([ConfigUpdate] => derive_config_update);
