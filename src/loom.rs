#[allow(unused_imports)]
pub(crate) use self::inner::*;

#[cfg(loom)]
mod inner {
    #![allow(dead_code, unused_imports)]

    pub(crate) mod atomic {
        pub use core::sync::atomic::Ordering;
        pub use loom::sync::atomic::*;

        pub(crate) use super::word::AtomicU128;
    }

    pub(crate) use loom::{hint, sync, thread};

    mod word {
        use super::atomic::Ordering;

        /// Loom does not model 128-bit atomics, so a node's state word is
        /// modeled as a loom mutex around a `u128`.
        ///
        /// Every operation on the word is still a single scheduling point,
        /// so loom explores the same interleavings of loads and
        /// compare-and-swaps as it would for a real atomic. It does not
        /// explore weaker memory orderings for this word.
        #[derive(Debug)]
        pub(crate) struct AtomicU128(loom::sync::Mutex<u128>);

        impl AtomicU128 {
            pub(crate) fn new(value: u128) -> Self {
                Self(loom::sync::Mutex::new(value))
            }

            pub(crate) fn load(&self, _: Ordering) -> u128 {
                *self.lock()
            }

            pub(crate) fn store(&self, value: u128, _: Ordering) {
                *self.lock() = value;
            }

            pub(crate) fn compare_exchange(
                &self,
                current: u128,
                new: u128,
                _: Ordering,
                _: Ordering,
            ) -> Result<u128, u128> {
                let mut word = self.lock();
                if *word == current {
                    *word = new;
                    Ok(current)
                } else {
                    Err(*word)
                }
            }

            fn lock(&self) -> loom::sync::MutexGuard<'_, u128> {
                self.0.lock().unwrap()
            }
        }
    }

    #[cfg(test)]
    pub(crate) fn model(f: impl Fn() + Sync + Send + 'static) {
        let collector = tracing_subscriber::fmt()
            .with_max_level(tracing::Level::TRACE)
            .with_test_writer()
            .without_time()
            .with_thread_ids(true)
            .with_thread_names(false)
            .finish();
        let _ = tracing::subscriber::set_global_default(collector);
        let mut builder = loom::model::Builder::new();
        if builder.preemption_bound.is_none() {
            builder.preemption_bound = Some(3);
        }
        builder.check(f)
    }
}

#[cfg(not(loom))]
mod inner {
    #![allow(dead_code, unused_imports)]

    pub(crate) mod atomic {
        pub use portable_atomic::*;
    }

    pub(crate) use portable_atomic::hint;

}
