use proc_macro::TokenStream;
use proc_macro2::TokenStream as TokenStream2;
use quote::{format_ident, quote};
use syn::{parse_macro_input, spanned::Spanned, FnArg, Ident, ItemFn, Pat, Signature, Type};

/// Transform an asynchronous test into a synchronous one and inject dependencies.
///
/// Every test gets a fresh in-memory store. Injectable dependencies are
/// [`rocket::local::asynchronous::Client`] and [`crate::model::store::Store`].
/// `#[backend_test(admin)]` and `#[backend_test(voter)]` log the client in first.
#[proc_macro_attribute]
pub fn backend_test(args: TokenStream, input: TokenStream) -> TokenStream {
    let mut item_fn = parse_macro_input!(input as ItemFn);

    // Extract type information and reject invalid function signatures.
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

    // Log in the client as admin/voter if needed.
    let maybe_login = match parse_macro_input!(args as Option<Ident>) {
        Some(arg) if arg == "admin" => login(
            quote! { example_admin },
            quote! { crate::model::api::auth::Rights::Admin },
        ),
        Some(arg) if arg == "voter" => login(
            quote! { example_voter },
            quote! { crate::model::api::auth::Rights::Voter },
        ),
        Some(arg) => {
            return syn::Error::new(arg.span(), "Expected `admin` or `voter`")
                .into_compile_error()
                .into();
        }
        None => TokenStream2::new(),
    };

    // Rewrite the test function.
    quote! {
        #[test]
        fn #name() {
            /// Test setup.
            async fn setup() -> (rocket::local::asynchronous::Client, crate::model::store::Store) {
                crate::logging::init_test_logging();
                let store: crate::model::store::Store =
                    std::sync::Arc::new(crate::model::memory::MemoryStore::new());
                let rocket_client = rocket::local::asynchronous::Client::tracked(
                    crate::rocket_for_store(crate::test_figment(), store.clone()),
                )
                .await
                .unwrap();

                #maybe_login

                (rocket_client, store)
            }

            /// The test itself.
            #item_fn

            let runtime = rocket::tokio::runtime::Builder::new_multi_thread()
                .thread_name("rocket-worker-test-thread")
                .worker_threads(2)
                .enable_all()
                .build()
                .unwrap();

            runtime.block_on(async move {
                let (rocket_client, store) = setup().await;
                let _ = (&rocket_client, &store);
                #new_name(#(#test_args),*).await
            });
        }
    }
    .into()
}

/// Store the example user with the given rights and log in as them.
fn login(example: TokenStream2, rights: TokenStream2) -> TokenStream2 {
    quote! {
        use crate::model::store::UserStore as _;

        let credentials = crate::model::api::auth::Credentials::#example();
        store
            .insert_user(credentials.clone().into_user(#rights).unwrap())
            .await
            .unwrap();

        // The response borrows the client, so drop it before handing the client over.
        {
            let response = rocket_client
                .post("/auth/login")
                .header(rocket::http::ContentType::JSON)
                .body(rocket::serde::json::json!(credentials).to_string())
                .dispatch()
                .await;
            assert_eq!(response.status(), rocket::http::Status::SeeOther);
        }
    }
}

/// Ensure the wrapped test is async, extract parameters to inject, and reject unknown parameters.
fn check_sig(sig: Signature) -> Result<Vec<TokenStream2>, syn::Error> {
    if sig.asyncness.is_none() {
        return Err(syn::Error::new(sig.span(), "Test must be marked `async`"));
    }

    let mut has_client = false;
    let mut args = vec![];

    for input in &sig.inputs {
        if let FnArg::Typed(pat_type) = input {
            if let Pat::Ident(_) = &*pat_type.pat {
                if let Type::Path(type_path) = &*pat_type.ty {
                    if let Some(type_ident) = type_path.path.get_ident() {
                        if type_ident == "Client" {
                            if has_client {
                                return Err(syn::Error::new(input.span(), "Test cannot accept more than one `rocket::local::asynchronous::Client`"));
                            }
                            has_client = true;
                            args.push(quote! { rocket_client });
                            continue;
                        } else if type_ident == "Store" {
                            args.push(quote! { store.clone() });
                            continue;
                        }
                    }
                }
            }
        }

        return Err(syn::Error::new(
            input.span(),
            "Expected one of `client_ident: Client` or `store_ident: Store`",
        ));
    }

    Ok(args)
}
