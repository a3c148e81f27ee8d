#![allow(clippy::module_name_repetitions)]

//! Live document backend for the Jiffy framework.
//!
//! This crate keeps a small in-memory [`Document`] and mounts composed trees into
//! one of its elements. Intrinsic nodes become [`Element`]s, handler props listed in
//! the event table become listeners, and state changes triggered from those
//! listeners re-render the mount element through the runtime's scheduler.
//!
//! ```rust
//! use futures::executor::block_on;
//! use jiffy_core::{Props, composable};
//! use jiffy_dom::{DomApp, Document};
//!
//! let document = Document::new();
//! let app = DomApp::builder().build(&document).unwrap();
//! block_on(app.render(composable!("h1", Props::new(), "hi"))).unwrap();
//! assert_eq!(app.root().inner_html(), "<h1>hi</h1>");
//! ```

mod app;
mod dom;
mod error;
mod renderer;

pub use app::{DomApp, DomAppBuilder, render_dom, render_dom_with};
pub use dom::{Document, DomNode, Element};
pub use error::DomError;
pub use renderer::{DomComposer, MountSink};
