use proc_macro::TokenStream;
use proc_macro2::TokenStream as TokenStream2;
use quote::quote;
use syn::{ItemFn, LitStr};

/// Proc macro to denote a Step
///
/// Times the body of an `async fn` and records it as a step of the iteration currently
/// being run. The step label defaults to the function name and can be overridden with a
/// string literal.
///
/// # Example
/// ```ignore
/// use pat::prelude::*;
///
/// #[step]
/// async fn login() -> Result<(), MyError> {
///     ...
/// }
///
/// #[step("push")]
/// async fn push_app(name: &str) -> Result<(), MyError> {
///     ...
/// }
/// ```
#[proc_macro_attribute]
pub fn step(attr: TokenStream, item: TokenStream) -> TokenStream {
    match step_internal(attr.into(), item.into()) {
        Ok(tokens) => tokens.into(),
        Err(err) => err.to_compile_error().into(),
    }
}

fn step_internal(attr: TokenStream2, item: TokenStream2) -> syn::Result<TokenStream2> {
    let input = syn::parse2::<ItemFn>(item)?;

    if input.sig.asyncness.is_none() {
        return Err(syn::Error::new_spanned(
            input.sig.fn_token,
            "#[step] only works on async functions",
        ));
    }

    let label = if attr.is_empty() {
        input.sig.ident.to_string()
    } else {
        syn::parse2::<LitStr>(attr)?.value()
    };

    let ItemFn {
        attrs,
        vis,
        sig,
        block,
    } = input;
    let stmts = &block.stmts;

    Ok(quote! {
        #(#attrs)* #vis #sig {
            ::pat::step::step_hook(#label, async move {
                #(#stmts)*
            }).await
        }
    })
}
