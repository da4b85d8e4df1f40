//! The lazy, interleaved result stream.
//!
//! Grounded directly on the teacher's `stream.rs` trampoline
//! (`Lazy::{Bind,MPlus,Pause,Delay}` driven by an explicit `step`
//! function rather than recursion, so that long conjunctions/
//! disjunctions do not blow the stack), simplified by dropping the
//! teacher's generic `User`/`Engine` type parameters — this crate's
//! goals are concrete closures, not a pluggable-engine abstraction.
use crate::cancel::CancellationToken;
use crate::goal::Goal;
use crate::store::LocalConstraintStore;

/// A suspended computation that has not yet been stepped.
#[derive(Clone)]
pub enum Lazy {
    Bind(Box<LazyStream>, Goal),
    MPlus(Box<LazyStream>, Box<LazyStream>),
    Pause(Box<LocalConstraintStore>, Goal),
}

#[derive(Clone)]
pub struct LazyStream(pub Box<Lazy>);

impl LazyStream {
    pub fn bind(ls: LazyStream, goal: Goal) -> LazyStream {
        LazyStream(Box::new(Lazy::Bind(Box::new(ls), goal)))
    }

    pub fn mplus(a: LazyStream, b: LazyStream) -> LazyStream {
        LazyStream(Box::new(Lazy::MPlus(Box::new(a), Box::new(b))))
    }

    pub fn pause(state: Box<LocalConstraintStore>, goal: Goal) -> LazyStream {
        LazyStream(Box::new(Lazy::Pause(state, goal)))
    }
}

/// A lazily-produced, possibly-interleaved sequence of stores.
#[derive(Clone)]
pub enum Stream {
    Empty,
    Mature(Box<LocalConstraintStore>),
    /// An as-yet-unforced tail.
    Immature(LazyStream),
    /// A mature head followed by an unforced tail (interleaving pair).
    Cons(Box<LocalConstraintStore>, LazyStream),
}

impl Stream {
    pub fn empty() -> Stream {
        Stream::Empty
    }

    pub fn unit(s: Box<LocalConstraintStore>) -> Stream {
        Stream::Mature(s)
    }

    pub fn cons(s: Box<LocalConstraintStore>, tail: LazyStream) -> Stream {
        Stream::Cons(s, tail)
    }

    pub fn immature(ls: LazyStream) -> Stream {
        Stream::Immature(ls)
    }

    pub fn is_empty(&self) -> bool {
        matches!(self, Stream::Empty)
    }

    pub fn is_mature(&self) -> bool {
        !matches!(self, Stream::Immature(_))
    }

    /// Fair interleaving append: `mplus(s, tail)` never starves `tail`
    /// even when `s` is an infinite mature chain, because the next step
    /// always alternates which side is forced.
    pub fn mplus(s: Stream, tail: LazyStream) -> Stream {
        match s {
            Stream::Empty => Stream::Immature(tail),
            Stream::Immature(ls) => Stream::Immature(LazyStream::mplus(tail, ls)),
            Stream::Mature(a) => Stream::cons(a, tail),
            Stream::Cons(head, ls) => Stream::cons(head, LazyStream::mplus(tail, ls)),
        }
    }

    pub fn bind(s: Stream, goal: Goal) -> Stream {
        match s {
            Stream::Empty => Stream::Empty,
            Stream::Immature(ls) => Stream::Immature(LazyStream::bind(ls, goal)),
            Stream::Mature(a) => Stream::immature(LazyStream::pause(a, goal)),
            Stream::Cons(head, ls) => Stream::mplus(
                Stream::immature(LazyStream::pause(head, goal.clone())),
                LazyStream::bind(ls, goal),
            ),
        }
    }
}

/// One trampoline step: force an `Immature` tail into a concrete
/// `Stream` head. Non-recursive in the `Bind`/`MPlus` chain length.
fn step(ctx: &CancellationToken, lazy: Lazy) -> Stream {
    if ctx.is_cancelled() {
        return Stream::Empty;
    }
    match lazy {
        Lazy::Pause(state, goal) => goal.run(ctx, *state),
        Lazy::MPlus(s1, s2) => {
            let forced = force(ctx, *s1);
            Stream::mplus(forced, *s2)
        }
        Lazy::Bind(s, goal) => {
            let forced = force(ctx, *s);
            Stream::bind(forced, goal)
        }
    }
}

fn force(ctx: &CancellationToken, ls: LazyStream) -> Stream {
    step(ctx, *ls.0)
}

/// Repeatedly force the head of `s` until it becomes `Empty`,
/// `Mature`, or `Cons`, polling cancellation at each step.
pub fn force_stream(ctx: &CancellationToken, s: Stream) -> Stream {
    let mut s = s;
    loop {
        if ctx.is_cancelled() {
            return Stream::Empty;
        }
        match s {
            Stream::Immature(ls) => s = force(ctx, ls),
            other => return other,
        }
    }
}

/// Take up to `n` solutions from `s` (`n == 0` means all). Each
/// iteration forces the head and immediately continues with the tail,
/// giving fair interleaving across nested disjunctions.
pub fn take(ctx: &CancellationToken, mut s: Stream, n: usize) -> Vec<Box<LocalConstraintStore>> {
    let mut out = Vec::new();
    loop {
        if ctx.is_cancelled() {
            return out;
        }
        if n != 0 && out.len() >= n {
            return out;
        }
        s = force_stream(ctx, s);
        match s {
            Stream::Empty => return out,
            Stream::Mature(a) => {
                out.push(a);
                return out;
            }
            Stream::Cons(head, tail) => {
                out.push(head);
                s = Stream::immature(tail);
            }
            Stream::Immature(_) => unreachable!("force_stream resolves Immature"),
        }
    }
}
