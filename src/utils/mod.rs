/******************************************************************************
   Author: Joaquín Béjar García
   Email: jb@taunais.com
   Date: 16/5/25
******************************************************************************/

/// Module containing custom error types used throughout the library.
///
/// This module provides the transport error type reported through `on_error`, plus the
/// exception raised for invalid configuration arguments.
pub mod error;
mod proxy;
mod util;

mod logger;

pub use error::{IllegalArgumentException, TransportError};
pub use logger::{setup_logger, setup_logger_with_level};
pub use proxy::{Proxy, ProxyType};
pub use util::encode_form;
pub(crate) use util::{get_header, set_header};
