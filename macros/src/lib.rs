use proc_macro::TokenStream;
use proc_macro2::Span;
use quote::quote;
use syn::punctuated::Punctuated;
use syn::{parse_macro_input, Expr, Ident, Token};

type Args = Punctuated<Expr, Token![,]>;

fn binding(n: usize) -> Ident {
    Ident::new(&format!("__descent_elem{n}"), Span::call_site())
}

/// Runs any number of parsers in order, producing their outputs as one
/// flat tuple. Expands to a left-nested chain of `pair` calls plus a
/// single flattening `map`.
#[proc_macro]
pub fn seq(args: TokenStream) -> TokenStream {
    let args = parse_macro_input!(args with Args::parse_terminated);
    let mut exprs = args.into_iter();

    let Some(head) = exprs.next() else {
        return quote! {
            { ::descent::combinator::constant(|| ()) }
        }
        .into();
    };

    // Fold the arguments into pair(pair(head, a), b)... and build the
    // matching left-nested pattern ((e0, e1), e2)... alongside it.
    let mut chain = quote! { #head };
    let mut pattern = {
        let e0 = binding(0);
        quote! { #e0 }
    };
    let mut flat = vec![binding(0)];
    for (n, expr) in exprs.enumerate() {
        let elem = binding(n + 1);
        chain = quote! { ::descent::combinator::pair(#chain, #expr) };
        pattern = quote! { (#pattern, #elem) };
        flat.push(elem);
    }

    quote! {
        { ::descent::combinator::map(#chain, |#pattern| (#(#flat,)*)) }
    }
    .into()
}

/// Tries any number of parsers as alternatives, in order. Expands to a
/// left-nested chain of `either` calls, preserving the left-to-right
/// preference and the committed-failure rule.
#[proc_macro]
pub fn alt(args: TokenStream) -> TokenStream {
    let args = parse_macro_input!(args with Args::parse_terminated);
    let mut exprs = args.into_iter();

    let Some(head) = exprs.next() else {
        return quote! {
            { ::descent::combinator::constant(|| ()) }
        }
        .into();
    };

    let mut chain = quote! { #head };
    for expr in exprs {
        chain = quote! { ::descent::combinator::either(#chain, #expr) };
    }

    quote! {
        { #chain }
    }
    .into()
}
