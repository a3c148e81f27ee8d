#![allow(clippy::module_name_repetitions)]

//! String markup backend for the Jiffy framework.
//!
//! [`MarkupComposer`] turns every intrinsic node into an HTML-like string and
//! [`StringSink`] joins the composed root. [`render_string`] wires both into a
//! [`Runtime`](jiffy_core::Runtime):
//!
//! ```rust
//! use futures::executor::block_on;
//! use jiffy_core::{Props, Runtime, composable};
//! use jiffy_markup::{StringOptions, render_string};
//!
//! let runtime = Runtime::new();
//! let page = composable!("div", Props::new().with("class", "box"), "hello");
//! let rendered = block_on(render_string(&runtime, page, StringOptions::new())).unwrap();
//! assert_eq!(rendered.output, "<div class=box>hello</div>");
//! ```

mod composer;
mod render;

pub use composer::{MarkupComposer, escape};
pub use render::{StringOptions, StringSink, render_string};
