//! Attribute macros of the visage runtime.

extern crate proc_macro;

use proc_macro::TokenStream;

use crate::internals::{runtime_macro, RuntimeMode};

mod internals;

/// Runs an async function on the visage runtime.
///
/// Use it once, above your `main`, in place of `#[tokio::main]`.
///
/// _The body runs on a single-threaded (cooperative) runtime. The function only returns once every
/// task spawned through `task::run` is done: snippet runners and transitions included._
#[proc_macro_attribute]
pub fn runtime(_: TokenStream, item: TokenStream) -> TokenStream {
    runtime_macro(item.into(), RuntimeMode::Main).into()
}

/// Same as [`macro@runtime`] for `#[test]` functions.
#[proc_macro_attribute]
pub fn test(_: TokenStream, item: TokenStream) -> TokenStream {
    runtime_macro(item.into(), RuntimeMode::Test).into()
}
