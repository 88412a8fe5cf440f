//! Error taxonomy of the reconciler.
//!
//! Usage errors are surfaced through `Result` rather than panics so a
//! host can recover from a bad descriptor; host DOM failures convert
//! transparently.

use thiserror::Error;

/// Result type used throughout the crate.
pub type Result<T> = std::result::Result<T, Error>;

/// Reconciler errors.
#[derive(Debug, Error)]
pub enum Error {
    /// A fragment or other non-mountable descriptor reached `mount`.
    #[error("invalid descriptor passed to mount: {0} nodes cannot be mounted directly")]
    InvalidMount(&'static str),

    /// A component render produced a fragment list instead of a single
    /// descriptor (or nothing).
    #[error("component render must produce a single descriptor or nothing, not a list")]
    ComponentReturnedList,

    /// `set_state` called from a phase where state writes are forbidden.
    #[error("set_state is not allowed during component_will_update")]
    SetStateBlocked,

    /// `render` targeted the document root or body.
    #[error("cannot render into the document root or body; use a dedicated container")]
    RenderIntoRoot,

    /// `dangerously_set_inner_html` without its raw markup payload.
    #[error("dangerously_set_inner_html requires a raw markup payload")]
    MissingRawMarkup,

    /// A keyed child list contains a descriptor without a key.
    #[error("keyed child lists require a key on every child")]
    MissingKey,

    /// An `on*` prop holds something other than an event handler.
    #[error("event prop {0:?} must hold an event handler")]
    InvalidEventHandler(Box<str>),

    /// A ref variant that does not apply to the node it was placed on.
    #[error("invalid ref: {0}")]
    InvalidRef(&'static str),

    /// A user hook failed.
    #[error("component hook failed: {0}")]
    Hook(Box<str>),

    /// Host DOM failure.
    #[error(transparent)]
    Dom(#[from] veld_dom::DomError),
}

impl Error {
    /// Wrap a message from a fallible user hook.
    pub fn hook(msg: impl Into<Box<str>>) -> Self {
        Error::Hook(msg.into())
    }
}
