#![doc = include_str!("../README.md")]
#![allow(clippy::multiple_crate_versions)]
#![allow(clippy::future_not_send)]

pub mod logging;

#[doc(inline)]
pub use jiffy_core::*;

/// The string markup backend.
pub use jiffy_markup as markup;

/// The live document backend.
pub use jiffy_dom as dom;

#[doc(inline)]
pub use jiffy_dom::{DomApp, DomAppBuilder, render_dom};
#[doc(inline)]
pub use jiffy_markup::{StringOptions, render_string};

pub mod prelude {
    //! A collection of commonly used types for easy importing.
    //!
    //! # Example
    //!
    //! ```rust
    //! use jiffy::prelude::*;
    //!
    //! fn greeting() -> Component {
    //!     Component::from_fn("Greeting", |props: Props, _hooks: Hooks| {
    //!         let name: String = props.get_as("name").unwrap_or_default();
    //!         Ok(composable!("h1", Props::new(), format!("hello {name}")).into())
    //!     })
    //! }
    //! # let _ = greeting();
    //! ```
    pub use jiffy_core::{
        Child, Component, Composed, Composer, Event, Handler, Hooks, Node, Prop, Props,
        RenderOptions, Rendered, Runtime, RuntimeConfig, Setter, Sink, Teardown, TargetId,
        composable, json,
    };
    pub use jiffy_dom::{DomApp, Document, Element, render_dom};
    pub use jiffy_markup::{StringOptions, render_string};
}
