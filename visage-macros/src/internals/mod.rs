use proc_macro2::TokenStream;
use quote::quote;
use syn::{Expr, ItemFn, ReturnType, Stmt, Token, Type};

/// Flavour of the function generated by [`runtime_macro`].
pub enum RuntimeMode {
    /// A plain function (typically `main`).
    Main,
    /// A `#[test]` function.
    Test,
}

impl RuntimeMode {
    fn attribute(&self) -> TokenStream {
        match self {
            RuntimeMode::Main => quote!(),
            RuntimeMode::Test => quote!(#[test]),
        }
    }
}

/// Expands `#[visage::runtime]` and `#[visage_macros::test]`.
///
/// The async function becomes a sync one owning a current-thread tokio runtime. Its body runs
/// between `task::init_task_channel()` and `task::wait_for_tasks()`. A trailing value (if the
/// function returns one) is evaluated once every task is done.
pub fn runtime_macro(item: TokenStream, mode: RuntimeMode) -> TokenStream {
    let ItemFn {
        attrs,
        vis,
        mut sig,
        block,
    } = match syn::parse2::<ItemFn>(item) {
        Ok(function) => function,
        Err(err) => return err.to_compile_error(),
    };
    sig.asyncness = None;

    let (stmts, tail) = split_tail(&sig.output, block.stmts);
    let attribute = mode.attribute();

    quote! {
        #attribute
        #(#attrs)*
        #vis #sig {
            ::visage::utils::tokio::runtime::Builder::new_current_thread()
                .enable_all()
                .build()
                .expect("Failed to build the visage runtime")
                .block_on(async {
                    ::visage::utils::task::init_task_channel().await;
                    #(#stmts)*
                    ::visage::utils::task::wait_for_tasks().await;
                    #tail
                })
        }
    }
}

fn returns_value(output: &ReturnType) -> bool {
    match output {
        ReturnType::Default => false,
        ReturnType::Type(_, ty) => !matches!(&**ty, Type::Tuple(tuple) if tuple.elems.is_empty()),
    }
}

/// Separates the returned expression from the statements that must run before the wait.
/// A trailing expression without value is either dropped (`()`) or terminated.
fn split_tail(output: &ReturnType, mut stmts: Vec<Stmt>) -> (Vec<Stmt>, Option<Expr>) {
    match stmts.pop() {
        Some(Stmt::Expr(expr, None)) if returns_value(output) => (stmts, Some(expr)),
        Some(Stmt::Expr(Expr::Tuple(tuple), None)) if tuple.elems.is_empty() => (stmts, None),
        Some(Stmt::Expr(expr, None)) => {
            stmts.push(Stmt::Expr(expr, Some(<Token![;]>::default())));
            (stmts, None)
        }
        Some(stmt) => {
            stmts.push(stmt);
            (stmts, None)
        }
        None => (stmts, None),
    }
}
