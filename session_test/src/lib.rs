use proc_macro::TokenStream;
use proc_macro2::TokenStream as TokenStream2;
use quote::{format_ident, quote};
use syn::{parse_macro_input, spanned::Spanned, FnArg, Ident, ItemFn, Pat, Signature, Type};

/// Transform an asynchronous test into a synchronous one and inject its fakes.
///
/// Injectable dependencies are `crate::test_utils::MockBallotApi`,
/// `crate::store::MemoryStore`, and `crate::test_utils::Session` (a ballot
/// session wired to the other two). Passing `open` as an argument seeds the
/// store with a ballot token and opens the session before the test body runs.
#[proc_macro_attribute]
pub fn session_test(args: TokenStream, input: TokenStream) -> TokenStream {
    let mut item_fn = parse_macro_input!(input as ItemFn);

    // Extract the injected arguments and reject invalid function signatures.
    let test_args = match check_sig(item_fn.sig.clone()) {
        Ok(args) => args,
        Err(err) => {
            return err.into_compile_error().into();
        }
    };

    // Rename the future so the test can have its original name.
    let name = item_fn.sig.ident.clone();
    let new_name = format_ident!("{}_fut", name);
    item_fn.sig.ident = new_name.clone();

    // Open the session against the mock ballot if asked to.
    let maybe_open = match parse_macro_input!(args as Option<Ident>) {
        Some(arg) if arg == "open" => quote! {
            {
                use crate::store::TokenStore as _;
                store
                    .set(crate::store::DEFAULT_TOKEN_KEY, crate::test_utils::TOKEN)
                    .unwrap();
            }
            session.open(None).await.unwrap();
        },
        Some(arg) => {
            return syn::Error::new(arg.span(), "Expected no argument or `open`")
                .into_compile_error()
                .into();
        }
        None => TokenStream2::new(),
    };

    // Rewrite the test function.
    quote! {
        #[test]
        fn #name() {
            /// The test itself.
            #item_fn

            log4rs_test_utils::test_logging::init_logging_once_for(
                ["votesphere_client"],
                None,
                None,
            );

            let runtime = tokio::runtime::Builder::new_current_thread()
                .enable_all()
                .build()
                .unwrap();

            runtime.block_on(async {
                #[allow(unused_variables)]
                let api = crate::test_utils::MockBallotApi::default();
                #[allow(unused_variables)]
                let store = crate::store::MemoryStore::default();
                #[allow(unused_variables)]
                let session = crate::session::BallotSession::new(api.clone(), store.clone());

                #maybe_open

                #new_name(#(#test_args),*).await;
            });
        }
    }
    .into()
}

/// Ensure the wrapped test is async, extract parameters to inject, and reject unknown parameters.
fn check_sig(sig: Signature) -> Result<Vec<TokenStream2>, syn::Error> {
    if sig.asyncness.is_none() {
        return Err(syn::Error::new(sig.span(), "Test must be marked `async`"));
    }

    let mut has_session = false;
    let mut args = vec![];

    for input in &sig.inputs {
        if let FnArg::Typed(pat_type) = input {
            if let Pat::Ident(_) = &*pat_type.pat {
                if let Type::Path(type_path) = &*pat_type.ty {
                    if let Some(type_ident) = type_path.path.get_ident() {
                        if type_ident == "MockBallotApi" {
                            args.push(quote! { api.clone() });
                            continue;
                        } else if type_ident == "MemoryStore" {
                            args.push(quote! { store.clone() });
                            continue;
                        } else if type_ident == "Session" {
                            if has_session {
                                return Err(syn::Error::new(
                                    input.span(),
                                    "Test cannot accept more than one `Session`",
                                ));
                            }
                            has_session = true;
                            args.push(quote! { session });
                            continue;
                        }
                    }
                }
            }
        }

        return Err(syn::Error::new(
            input.span(),
            "Expected one of `api: MockBallotApi`, `store: MemoryStore` or `session: Session`",
        ));
    }

    Ok(args)
}
