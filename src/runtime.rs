//! Runtime abstraction layer for async operations
//!
//! Render passes finish on whatever runtime the host installs through
//! [`init_runtime`]. With the `tokio-runtime` feature the default spawner
//! hands tasks to the ambient tokio runtime; without it, or when called
//! outside any runtime, tasks run to completion on the calling thread.

use std::future::Future;
use std::pin::Pin;
use std::sync::OnceLock;

pub type BoxedTask = Pin<Box<dyn Future<Output = ()> + Send + 'static>>;

/// A trait for spawning async tasks (object-safe version)
pub trait AsyncSpawner: Send + Sync + 'static {
    /// Spawn a future and return a handle to it
    fn spawn_boxed(&self, future: BoxedTask) -> Box<dyn AsyncHandle>;
}

/// Handle to a spawned async task
pub trait AsyncHandle: Send + Sync {
    /// Check if the task is finished
    fn is_finished(&self) -> bool;

    /// Cancel the task
    fn cancel(&self);
}

/// Convenience function for spawning with type safety
pub fn spawn<F>(future: F) -> Box<dyn AsyncHandle>
where
    F: Future<Output = ()> + Send + 'static,
{
    log::trace!("spawning task");
    runtime().spawn_boxed(Box::pin(future))
}

/// Default spawner implementations
pub mod spawners {
    use super::*;

    #[cfg(feature = "tokio-runtime")]
    pub mod tokio_impl {
        use super::*;
        use ::tokio::runtime::Handle;
        use ::tokio::task::JoinHandle;

        /// Tokio-based async spawner. Outside a tokio runtime tasks fall back
        /// to [`InlineSpawner`].
        pub struct TokioSpawner;

        impl AsyncSpawner for TokioSpawner {
            fn spawn_boxed(&self, future: BoxedTask) -> Box<dyn AsyncHandle> {
                match Handle::try_current() {
                    Ok(handle) => Box::new(TokioHandle(handle.spawn(future))),
                    Err(_) => {
                        log::trace!("no tokio runtime on this thread, running task inline");
                        InlineSpawner.spawn_boxed(future)
                    }
                }
            }
        }

        struct TokioHandle(JoinHandle<()>);

        impl AsyncHandle for TokioHandle {
            fn is_finished(&self) -> bool {
                self.0.is_finished()
            }

            fn cancel(&self) {
                self.0.abort();
            }
        }
    }

    /// Runs each task to completion before `spawn_boxed` returns
    pub struct InlineSpawner;

    impl AsyncSpawner for InlineSpawner {
        fn spawn_boxed(&self, future: BoxedTask) -> Box<dyn AsyncHandle> {
            futures::executor::block_on(future);
            Box::new(CompletedHandle)
        }
    }

    struct CompletedHandle;

    impl AsyncHandle for CompletedHandle {
        fn is_finished(&self) -> bool {
            true
        }

        fn cancel(&self) {}
    }
}

/// Global runtime instance
static RUNTIME: OnceLock<Box<dyn AsyncSpawner>> = OnceLock::new();

/// Initialize the runtime with a specific spawner. Only the first call has
/// an effect; returns whether `spawner` was installed.
pub fn init_runtime(spawner: Box<dyn AsyncSpawner>) -> bool {
    let installed = RUNTIME.set(spawner).is_ok();
    if !installed {
        log::warn!("async runtime already initialised, ignoring new spawner");
    }
    installed
}

/// Get the global runtime spawner
pub fn runtime() -> &'static dyn AsyncSpawner {
    RUNTIME
        .get_or_init(|| {
            #[cfg(feature = "tokio-runtime")]
            {
                Box::new(spawners::tokio_impl::TokioSpawner)
            }

            #[cfg(not(feature = "tokio-runtime"))]
            {
                Box::new(spawners::InlineSpawner)
            }
        })
        .as_ref()
}
