/******************************************************************************
   Author: Joaquín Béjar García
   Email: jb@taunais.com
   Date: 19/10/26
******************************************************************************/

//! Cookie storage shared by the transports.
//!
//! The jar implements a deliberately basic security policy: a cookie is sent back only to
//! hosts and paths matching the ones it was set for, secure cookies only over `https`, and
//! expired cookies are skipped when reading. Invalid cookies are silently discarded.

mod http_cookie;
mod jar;

pub use self::http_cookie::HttpCookie;
pub use self::jar::CookieJar;
