/******************************************************************************
   Author: Joaquín Béjar García
   Email: jb@taunais.com
   Date: 19/10/26
******************************************************************************/

use std::fmt;
use std::sync::Arc;

/// Notifications sent around every blocking network call of a transport thread.
///
/// An embedding runtime that needs to know when a foreign thread is parked on I/O (for
/// thread accounting or garbage collection coordination) implements this trait and passes
/// it through [`TransportOptions::hooks`](crate::transport::TransportOptions::hooks).
/// Both methods are called on the transport thread and must not block.
pub trait BlockingHooks: Send + Sync {
    /// The calling thread is about to block on I/O.
    fn enter_blocking(&self) {}

    /// The calling thread returned from a blocking call.
    fn exit_blocking(&self) {}
}

/// Hooks that do nothing. Used when no embedding runtime is involved.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoopHooks;

impl BlockingHooks for NoopHooks {}

/// Scoped blocking region: calls `enter_blocking` on creation and `exit_blocking` on drop,
/// so the exit notification is sent even when the blocking call fails.
pub struct BlockingSection {
    hooks: Arc<dyn BlockingHooks>,
}

impl BlockingSection {
    pub fn enter(hooks: &Arc<dyn BlockingHooks>) -> Self {
        hooks.enter_blocking();
        Self {
            hooks: Arc::clone(hooks),
        }
    }
}

impl Drop for BlockingSection {
    fn drop(&mut self) {
        self.hooks.exit_blocking();
    }
}

impl fmt::Debug for BlockingSection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BlockingSection").finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[derive(Default)]
    struct CountingHooks {
        entered: AtomicUsize,
        exited: AtomicUsize,
    }

    impl BlockingHooks for CountingHooks {
        fn enter_blocking(&self) {
            self.entered.fetch_add(1, Ordering::SeqCst);
        }

        fn exit_blocking(&self) {
            self.exited.fetch_add(1, Ordering::SeqCst);
        }
    }

    #[test]
    fn test_section_brackets_scope() {
        let counting = Arc::new(CountingHooks::default());
        let hooks: Arc<dyn BlockingHooks> = counting.clone();
        {
            let _section = BlockingSection::enter(&hooks);
            assert_eq!(counting.entered.load(Ordering::SeqCst), 1);
            assert_eq!(counting.exited.load(Ordering::SeqCst), 0);
        }
        assert_eq!(counting.exited.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_noop_hooks() {
        let hooks: Arc<dyn BlockingHooks> = Arc::new(NoopHooks);
        let _section = BlockingSection::enter(&hooks);
    }
}
