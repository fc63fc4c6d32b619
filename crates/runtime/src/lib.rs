//! Coxswain runtime — tool selection and query dispatch.
//!
//! One query flows through one session: spawn the tool host, list its
//! tools, ask the model to pick one, validate the pick against the live
//! list, invoke it, report, tear down. The runtime is organized around
//! these seams:
//!
//! - **LlmBackend**: a trait abstracting the completion provider (Gemini
//!   here), one prompt in, text out.
//! - **Selector**: turns a query plus tool catalog into a [`Selection`];
//!   infallible — model and parse failures degrade to a null selection.
//! - **Dispatcher**: the per-query pipeline with guaranteed teardown,
//!   generic over [`Connect`]/[`Channel`]/[`Selector`] for testing.
//!
//! # Example
//!
//! ```ignore
//! use runtime::{Dispatcher, GeminiBackend, HostConnector, LlmSelector};
//! use mcp::HostConfig;
//!
//! # async fn example() {
//! let backend = GeminiBackend::builder("AIza...", "gemini-2.0-flash-001").build();
//! let connector = HostConnector::new(HostConfig {
//!     command: "coxswain".into(),
//!     args: vec!["serve".into()],
//!     env: Default::default(),
//! });
//!
//! let dispatcher = Dispatcher::new(connector, LlmSelector::new(backend));
//! let report = dispatcher.dispatch("What is the price of AAPL?").await;
//! println!("{report}");
//! # }
//! ```

mod backend;
mod dispatch;
mod error;
mod selector;

pub use backend::{GeminiBackend, GeminiBackendBuilder, LlmBackend};
pub use dispatch::{validate, Channel, Connect, Dispatcher, HostConnector, Report, Stage};
pub use error::{Error, Result};
pub use selector::{parse_arguments, parse_selection, LlmSelector, Selection, Selector};
