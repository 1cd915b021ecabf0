//! Which operators preserve the context tag.
//!
//! A combinator is tagged exactly when every publisher it draws values from
//! is tagged. Immediate sources are tagged because the context consumers
//! attach on the context. Timing operators are tagged only when they run on
//! [`ContextScheduler`]; `ReceiveOn` that scheduler is tagged whatever its
//! upstream is.
//!
//! Fan-ins wider than four are written by nesting [`Merge`], or as a
//! [`MergeMany`] over one publisher type. Both forms stay tagged when every
//! input is.

use super::ContextPublisher;
use crate::scheduler::ContextScheduler;
use crate::stream::{
    Autoconnect, Catch, Chain, CombineLatest, Debounce, Delay, Empty, Fail, Filter, FilterMap,
    FirstWhere, FlatMap, HandleEvents, Just, Map, MapFailure, Merge, MergeMany, Publisher,
    ReceiveOn, RemoveDuplicates, ReplaceError, Scan, Sequence, SetFailureType, Skip, SkipWhile,
    Take, TakeWhile, Throttle, Timeout, TryFilter, TryMap, Zip,
};

macro_rules! propagate_tag {
    ($($combinator:ident<$($param:ident),*> from [$($input:ident),*];)*) => {
        $(
            impl<$($param),*> ContextPublisher for $combinator<$($param),*>
            where
                $($input: ContextPublisher,)*
                $combinator<$($param),*>: Publisher,
            {
            }
        )*
    };
}

propagate_tag! {
    Just<T> from [];
    Empty<T, E> from [];
    Fail<T, E> from [];
    Sequence<T, E> from [];

    Map<U, F> from [U];
    TryMap<U, F> from [U];
    FilterMap<U, F> from [U];
    Filter<U, F> from [U];
    TryFilter<U, F> from [U];
    Scan<U, A, F> from [U];
    RemoveDuplicates<U> from [U];
    Skip<U> from [U];
    SkipWhile<U, F> from [U];
    Take<U> from [U];
    TakeWhile<U, F> from [U];
    FirstWhere<U, F> from [U];
    HandleEvents<U, T, E> from [U];
    SetFailureType<U, E> from [U];
    MapFailure<U, F> from [U];
    ReplaceError<U, T> from [U];
    Autoconnect<P> from [P];

    Chain<A, B> from [A, B];
    Merge<A, B> from [A, B];
    Zip<A, B> from [A, B];
    CombineLatest<A, B> from [A, B];
    MergeMany<P> from [P];
}

impl<U, F, P> ContextPublisher for FlatMap<U, F>
where
    U: ContextPublisher,
    F: Fn(U::Output) -> P,
    P: ContextPublisher,
    FlatMap<U, F>: Publisher,
{
}

impl<U, F, P> ContextPublisher for Catch<U, F>
where
    U: ContextPublisher,
    F: Fn(U::Failure) -> P,
    P: ContextPublisher,
    Catch<U, F>: Publisher,
{
}

impl<U> ContextPublisher for ReceiveOn<U, ContextScheduler> where
    ReceiveOn<U, ContextScheduler>: Publisher
{
}

impl<U> ContextPublisher for Delay<U, ContextScheduler>
where
    U: ContextPublisher,
    Delay<U, ContextScheduler>: Publisher,
{
}

impl<U> ContextPublisher for Debounce<U, ContextScheduler>
where
    U: ContextPublisher,
    Debounce<U, ContextScheduler>: Publisher,
{
}

impl<U> ContextPublisher for Throttle<U, ContextScheduler>
where
    U: ContextPublisher,
    Throttle<U, ContextScheduler>: Publisher,
{
}

impl<U, E> ContextPublisher for Timeout<U, ContextScheduler, E>
where
    U: ContextPublisher,
    Timeout<U, ContextScheduler, E>: Publisher,
{
}
