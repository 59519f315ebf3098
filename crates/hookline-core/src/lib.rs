//! # Hookline
//!
//! Hookline is the lifecycle contract of a retained-mode component: the
//! ordered set of hooks a tree-diffing framework calls on each component
//! instance, and a small [`Reconciler`] that drives them.
//!
//! - [`Component`]: required hooks with sensible defaults.
//! - [`ErrorBoundary`]: optional capability to recover from failures in a
//!   subtree.
//! - [`Reconciler`]: mounts, updates and unmounts instances and reports
//!   every hook call to a [`DiagnosticSink`].
//!
//! ```rust
//! use hookline_core::*;
//!
//! let sink = RecordingSink::new();
//! let mut r = Reconciler::new(sink.clone());
//!
//! let t = r.mount::<Template>(TemplateProps::new("x")).unwrap();
//! assert_eq!(
//!     sink.hooks_for(t.id()),
//!     [Hook::Initialize, Hook::DeriveStateFromProps, Hook::Render, Hook::DidMount]
//! );
//!
//! r.unmount(t).unwrap();
//! assert!(matches!(r.force_update(t), Err(LifecycleError::Detached(_))));
//! ```
//!
//! Logging goes through the `log` facade: install any logger (e.g.
//! `env_logger`) and pass [`LogSink`] to see every hook at `debug` level.

pub mod component;
pub mod config;
pub mod element;
pub mod error;
mod instance;
pub mod reconciler;
pub mod sink;
pub mod template;

pub use component::*;
pub use config::*;
pub use element::*;
pub use error::{ComponentError, ErrorInfo, LifecycleError};
pub use reconciler::*;
pub use sink::*;
pub use template::*;
