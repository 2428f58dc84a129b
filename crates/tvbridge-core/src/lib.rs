//! # tvbridge-core - Core Domain Types
//!
//! Foundation crate for tvbridge. Provides domain types, error handling,
//! session event definitions, and logging setup.
//!
//! This crate has **zero internal dependencies** -- it only depends on external
//! crates (serde, thiserror, tracing).
//!
//! ## Public API
//!
//! ### Domain Types (`types`)
//! - [`ConnectionState`] - Logical connection state of a device session
//! - [`AppIdentity`] - Resolved foreground application (`home`, `other`, package)
//! - [`ActionResult`], [`FailureReason`] - `{succeeded, detail}` outcomes of operations
//! - [`SessionSnapshot`], [`DeviceInfo`] - Serializable views of a session
//!
//! ### Events (`events`)
//! - [`SessionEvent`] - Typed lifecycle notifications published by a session
//!
//! ### Error Handling (`error`)
//! - [`Error`] - Infrastructure error enum with `fatal` vs `recoverable` classification
//! - [`Result`] - Type alias for `std::result::Result<T, Error>`
//! - [`ResultExt`] - Extension trait for adding error context
//!
//! ## Prelude
//!
//! Import commonly used types with:
//! ```rust
//! use tvbridge_core::prelude::*;
//! ```

pub mod error;
pub mod events;
pub mod logging;
pub mod prelude;
pub mod types;

pub use error::{Error, Result, ResultExt};
pub use events::{PowerOutcome, SessionEvent};
pub use types::{
    ActionResult, AppIdentity, ConnectionState, DeviceInfo, FailureReason, PowerTarget,
    SessionSnapshot,
};
