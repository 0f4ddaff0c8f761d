macro_rules! declare_macro {
    ($($name:ident $level:ident),* $(,)?) => (
        $(declare_macro!([$] $name $level);)*
    );

    ([$d:tt] $name:ident $level:ident) => (
        #[macro_export]
        macro_rules! $name {
            ($d ($t:tt)*) => ($crate::tracing::$level!($d ($t)*));
        }
    );
}

declare_macro!(
    error error, error_ error,
    info info, info_ info,
    trace trace, trace_ trace,
    debug debug, debug_ debug,
    warn warn, warn_ warn,
);

macro_rules! declare_span_macro {
    ($($name:ident $level:ident),* $(,)?) => (
        $(declare_span_macro!([$] $name $level);)*
    );

    ([$d:tt] $name:ident $level:ident) => (
        #[macro_export]
        macro_rules! $name {
            ($n:literal $d ([ $d ($f:tt)* ])? => $in_scope:expr) => ({
                $crate::tracing::span!($crate::tracing::Level::$level, $n $d (, $d ($f)* )?)
                    .in_scope(|| $in_scope)
            })
        }
    );
}

declare_span_macro!(error_span ERROR, warn_span WARN,
    info_span INFO, trace_span TRACE, debug_span DEBUG);
