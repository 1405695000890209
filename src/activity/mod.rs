/******************************************************************************
   Author: Joaquín Béjar García
   Email: jb@taunais.com
   Date: 19/10/26
******************************************************************************/

//! Start/stop/wait lifecycle for a long running task executed by a dedicated thread.
//!
//! An activity is a (typically longer running) closure that executes within its own
//! thread. Stopping is cooperative: the closure receives a [`StopToken`] and has to check
//! it periodically, returning when a stop has been requested. Activities are stopped and
//! waited for before the object they belong to is dropped.

mod task;

pub use task::{Activity, StopToken};
