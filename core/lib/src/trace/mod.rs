//! Structured logging for every security and dispatch decision.
//!
//! A thin set of `tracing`-forwarding macros (`macros.rs`) plus a one-shot
//! `init()` that installs a formatting subscriber. A bespoke span-aware
//! colored renderer tied to route/catcher/fairing span names would be
//! overkill here, so `init()` configures the stock `tracing-subscriber` fmt
//! layer instead, chosen via [`TraceFormat`].

#[macro_use]
mod macros;

#[doc(inline)]
pub use macros::*;

use yansi::Condition;

/// Selects between a human-readable multi-line format and a single-line one.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, serde::Deserialize, serde::Serialize)]
#[serde(crate = "serde")]
pub enum TraceFormat {
    #[serde(rename = "pretty", alias = "PRETTY")]
    Pretty,
    #[serde(rename = "compact", alias = "COMPACT")]
    Compact,
}

impl Default for TraceFormat {
    fn default() -> Self {
        TraceFormat::Compact
    }
}

/// Installs the process-wide tracing subscriber. Safe to call more than
/// once; only the first call has an effect.
#[cfg_attr(nightly, doc(cfg(feature = "trace")))]
pub fn init(format: TraceFormat, level: tracing::Level) {
    #[cfg(feature = "trace")]
    {
        use tracing_subscriber::EnvFilter;

        let ansi = Condition::DEFAULT.check();
        let filter = EnvFilter::builder()
            .with_default_directive(level.into())
            .from_env_lossy();

        let builder = tracing_subscriber::fmt()
            .with_ansi(ansi)
            .with_env_filter(filter)
            .with_target(true);

        let result = match format {
            TraceFormat::Pretty => builder.pretty().try_init(),
            TraceFormat::Compact => builder.compact().try_init(),
        };

        if result.is_err() {
            trace!("tracing subscriber already initialized; skipping");
        }
    }

    #[cfg(not(feature = "trace"))]
    let _ = (format, level);
}

/// Declarative logging for a decision or state transition. Implemented by
/// the security and session types that need a uniform "explain yourself"
/// hook for the `trace`/`debug` logs.
pub trait Traceable {
    fn trace(&self);
}

pub trait TraceableCollection {
    fn trace_all(self);
}

impl<T: Traceable, I: IntoIterator<Item = T>> TraceableCollection for I {
    fn trace_all(self) {
        self.into_iter().for_each(|i| i.trace())
    }
}

impl<T: Traceable> Traceable for &T {
    fn trace(&self) {
        T::trace(self)
    }
}
