//! <h1 align="center">VISAGE - Procedural facial animation core</h1>
//! <div style="text-align:center;font-style:italic;">Blend concurrently playing animation snippets into the facial channels of a skinned avatar.</div>
//! <br/>
//!
//! # Features
//!
//! **Visage** computes, at interactive frame rates, the value of every animatable control channel of
//! an avatar (facial Action Units, visemes, composite bone rotations) from a set of concurrently
//! active [`Snippet`](animations::Snippet)s:
//!
//! - Describe snippets from code (builder) or from their JSON source format ([`SnippetSource`](animations::SnippetSource)).
//! - Play, pause, loop, seek and stop them through a [`Scheduler`](scheduler::Scheduler): each playing
//!   snippet walks its keyframes on its own cooperative task.
//! - Conflicts on shared channels are arbitrated by priority (ties broken by value), additive
//!   snippets layer on top of the winner.
//! - Opposite-signed channel pairs (eye yaw, head roll, ...) collapse into one signed rotation.
//! - Values are sent to your engine through the [`RenderTarget`](render::RenderTarget) trait.
//!
//! # Getting Started
//!
//! ```no_run
//! use visage::animations::{Keyframe, Snippet};
//! use visage::render::RenderTarget;
//! use visage::scheduler::Scheduler;
//!
//! #[derive(Debug)]
//! struct Engine;
//! impl RenderTarget for Engine {
//!     fn apply_au(&self, id: u32, value: f64, _: Option<f64>) {
//!         println!("AU{} = {}", id, value);
//!     }
//! }
//!
//! #[visage::runtime]
//! async fn main() {
//!     let scheduler = Scheduler::new(Engine);
//!
//!     // Raise the inner brows (AU1) over a second, then release.
//!     scheduler.load(
//!         Snippet::new("brow_raise")
//!             .with_curve("1", vec![Keyframe::new(0.0, 0.0), Keyframe::new(1.0, 0.8), Keyframe::new(2.0, 0.0)]),
//!     );
//!
//!     visage::pause!(2500);
//!     scheduler.dispose();
//! }
//! ```
//!
//! # Feature flags
//!
//! - **mocks** -- Provides a mocked [`RenderTarget`](render::RenderTarget) recording every call (useful for tests mostly).

#[cfg(test)]
extern crate self as visage;

pub mod animations;
pub mod config;
pub mod diagnostics;
pub mod errors;
#[cfg(any(test, feature = "mocks"))]
pub mod mocks;
pub mod render;
pub mod resolve;
pub mod scheduler;
pub mod state;
pub mod utils;

pub use visage_macros::runtime;
