//! Lifecycle callbacks.
//!
//! A `Callback` is a cloneable handle whose identity is the allocation it
//! points to: clones compare equal, two separately built callbacks never do.
//! That identity is what `Lifecycle::unregister` matches on.

use std::future::Future;
use std::sync::Arc;

use crate::scheduler::BoxFuture;

type CallbackFn<A> = dyn Fn(A) -> BoxFuture<'static, ()> + Send + Sync;

/// A callback registered on a lifecycle.
pub struct Callback<A> {
    f: Arc<CallbackFn<A>>,
}

impl<A: Send + 'static> Callback<A> {
    /// Wraps an async callback.
    pub fn new<F, Fut>(f: F) -> Self
    where
        F: Fn(A) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = ()> + Send + 'static,
    {
        let f = Arc::new(f);
        Self {
            f: Arc::new(move |args| -> BoxFuture<'static, ()> {
                let f = Arc::clone(&f);
                Box::pin(async move { f(args).await })
            }),
        }
    }

    /// Wraps a synchronous callback. The body runs when the returned future
    /// is first polled, on whichever task polls it.
    pub fn from_fn<F>(f: F) -> Self
    where
        F: Fn(A) + Send + Sync + 'static,
    {
        let f = Arc::new(f);
        Self {
            f: Arc::new(move |args| -> BoxFuture<'static, ()> {
                let f = Arc::clone(&f);
                Box::pin(async move { f(args) })
            }),
        }
    }

    /// Binds `method` to a provider instance captured now.
    ///
    /// The instance is resolved once, at registration time; firing never
    /// looks anything up.
    pub fn bound<T, F, Fut>(instance: Arc<T>, method: F) -> Self
    where
        T: Send + Sync + 'static,
        F: Fn(Arc<T>, A) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = ()> + Send + 'static,
    {
        Self::new(move |args| method(Arc::clone(&instance), args))
    }

    /// Starts one invocation. Nothing runs until the future is polled.
    #[must_use]
    pub fn call(&self, args: A) -> BoxFuture<'static, ()> {
        (self.f)(args)
    }
}

impl<A> Callback<A> {
    /// Returns whether both handles refer to the same callback.
    #[inline]
    #[must_use]
    pub fn same(&self, other: &Self) -> bool {
        std::ptr::eq(
            Arc::as_ptr(&self.f).cast::<()>(),
            Arc::as_ptr(&other.f).cast::<()>(),
        )
    }
}

impl<A> Clone for Callback<A> {
    fn clone(&self) -> Self {
        Self {
            f: Arc::clone(&self.f),
        }
    }
}

impl<A> PartialEq for Callback<A> {
    fn eq(&self, other: &Self) -> bool {
        self.same(other)
    }
}

impl<A> Eq for Callback<A> {}

impl<A> std::fmt::Debug for Callback<A> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_tuple("Callback")
            .field(&Arc::as_ptr(&self.f).cast::<()>())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU32, Ordering};

    #[test]
    fn test_identity() {
        let a = Callback::<()>::from_fn(|()| {});
        let b = Callback::<()>::from_fn(|()| {});
        let a2 = a.clone();

        assert_eq!(a, a2);
        assert_ne!(a, b);
    }

    #[test]
    fn test_call_defers_body_until_polled() {
        let hits = Arc::new(AtomicU32::new(0));
        let sync = {
            let hits = Arc::clone(&hits);
            Callback::from_fn(move |by: u32| {
                hits.fetch_add(by, Ordering::SeqCst);
            })
        };
        let eager_prefix = {
            let hits = Arc::clone(&hits);
            Callback::new(move |by: u32| {
                hits.fetch_add(by, Ordering::SeqCst);
                async {}
            })
        };

        let pending = (sync.call(1), eager_prefix.call(10));
        assert_eq!(hits.load(Ordering::SeqCst), 0);
        drop(pending);
        assert_eq!(hits.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_bound_captures_instance() {
        struct Counter {
            hits: AtomicU32,
        }

        let counter = Arc::new(Counter {
            hits: AtomicU32::new(0),
        });
        let callback = Callback::bound(Arc::clone(&counter), |counter, by: u32| async move {
            counter.hits.fetch_add(by, Ordering::SeqCst);
        });

        callback.call(2).await;
        callback.call(3).await;
        assert_eq!(counter.hits.load(Ordering::SeqCst), 5);
    }
}
