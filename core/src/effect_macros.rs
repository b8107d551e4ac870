//! Declarative macros for ergonomic effect construction

/// Create an `Effect::Future` from an async block body
///
/// # Example
///
/// ```
/// use searchbox_core::{async_effect, effect::Effect};
///
/// #[derive(Debug)]
/// enum Loaded {
///     Value(u32),
/// }
///
/// let effect: Effect<Loaded> = async_effect! {
///     Some(Loaded::Value(7))
/// };
/// assert!(matches!(effect, Effect::Future(_)));
/// ```
#[macro_export]
macro_rules! async_effect {
    ($($body:tt)*) => {
        $crate::effect::Effect::Future(
            ::std::boxed::Box::pin(async move { $($body)* })
        )
    };
}

/// Create an `Effect::Delay` that dispatches an action later
///
/// # Example
///
/// ```
/// use searchbox_core::{delay, effect::Effect};
/// use std::time::Duration;
///
/// #[derive(Debug)]
/// enum Tick {
///     Elapsed,
/// }
///
/// let effect: Effect<Tick> = delay! {
///     duration: Duration::from_millis(250),
///     action: Tick::Elapsed
/// };
/// assert!(matches!(effect, Effect::Delay { .. }));
/// ```
#[macro_export]
macro_rules! delay {
    (
        duration: $duration:expr,
        action: $action:expr
    ) => {
        $crate::effect::Effect::Delay {
            duration: $duration,
            action: ::std::boxed::Box::new($action),
        }
    };
}
