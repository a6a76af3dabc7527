//! Defines snippets: named bundles of per-channel keyframe curves plus their playback metadata.

mod easing;
mod keyframe;
mod snippet;
mod source;

pub use easing::Easing;
pub use keyframe::{next_time_after, sample_at, Keyframe};
pub(crate) use keyframe::TIME_EPSILON;
pub use snippet::{BlendMode, Snippet, SnippetCategory};
pub(crate) use snippet::{sanitize_rate, sanitize_scale};
pub use source::{normalize, SnippetSource};
