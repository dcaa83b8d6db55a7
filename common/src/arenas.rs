// Copyright (c) 2018-2021 Fabian Schuiki

//! Multi-type arena allocation.
//!
//! All syntax and semantic nodes of a compilation unit live in arenas that
//! are freed en masse when the unit is discarded. No per-node free operation
//! exists.

#![deny(missing_docs)]

/// Allocates objects into an arena.
pub trait Alloc<T> {
    /// Allocate an object of type `T` into this arena.
    fn alloc(&self, value: T) -> &mut T;
}

/// Allocates objects into a remote arena.
///
/// In contrast to `Alloc`, the lifetime of the references returned by this
/// trait is not bound to the trait object itself, but is a parameter of the
/// trait. This allows context objects to hold a reference to an arena and
/// allocate into it directly.
pub trait AllocInto<'t, T> {
    /// Allocate an object of type `T`.
    fn alloc(&self, value: T) -> &'t mut T;
}

impl<'t, T> AllocInto<'t, T> for &'t dyn Alloc<T> {
    fn alloc(&self, value: T) -> &'t mut T {
        Alloc::alloc(*self, value)
    }
}

/// Generate a collection of arenas for different types.
#[macro_export]
macro_rules! make_arenas {
    ($(#[$arena_attr:meta])* pub struct $arena_name:ident { $($name:ident: $type:ty,)* }) => {
        make_arenas!{ IMPL $($arena_attr),*; $arena_name; []; $($name: $type,)* }
    };

    ($(#[$arena_attr:meta])* pub struct $arena_name:ident<$($lt:tt),+> { $($name:ident: $type:ty,)* }) => {
        make_arenas!{ IMPL $($arena_attr),*; $arena_name; [$($lt),+]; $($name: $type,)* }
    };

    (IMPL $($arena_attr:meta),*; $arena_name:ident; [$($lt:tt),*]; $($name:ident: $type:ty,)*) => {
        $(#[$arena_attr])*
        #[allow(missing_docs)]
        pub struct $arena_name<$($lt),*> {
            $(pub $name: ::typed_arena::Arena<$type>,)*
        }

        make_arenas!(STRUCT_IMPL $arena_name; [$($lt),*]; $($name: $type,)*);
    };

    (STRUCT_IMPL $arena_name:ident; [$($lt:tt),*]; $($name:ident: $type:ty,)*) => {
        impl<$($lt),*> $arena_name<$($lt),*> {
            /// Create a new arena.
            pub fn new() -> $arena_name<$($lt),*> {
                $arena_name {
                    $($name: ::typed_arena::Arena::new(),)*
                }
            }
        }

        impl<$($lt),*> Default for $arena_name<$($lt),*> {
            fn default() -> $arena_name<$($lt),*> {
                $arena_name::new()
            }
        }

        make_arenas!(TRAIT_IMPL $arena_name; [$($lt),*]; $($name: $type,)*);
    };

    (TRAIT_IMPL $arena_name:ident; [$($lt:tt),*]; $name:ident: $type:ty, $($tail_name:ident: $tail_type:ty,)*) => {
        impl<$($lt),*> $crate::arenas::Alloc<$type> for $arena_name<$($lt),*> {
            fn alloc(&self, value: $type) -> &mut $type {
                self.$name.alloc(value)
            }
        }

        make_arenas!(TRAIT_IMPL $arena_name; [$($lt),*]; $($tail_name: $tail_type,)*);
    };

    (TRAIT_IMPL $arena_name:ident; [$($lt:tt),*];) => {}
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug, PartialEq)]
    struct Apple(usize);
    #[derive(Debug, PartialEq)]
    struct Orange(&'static str);

    make_arenas! {
        pub struct FruitArena {
            apples: Apple,
            oranges: Orange,
        }
    }

    #[test]
    fn alloc_and_read_back() {
        let arena = FruitArena::new();
        let a = arena.alloc(Apple(42));
        let b = arena.alloc(Orange("mandarin"));
        assert_eq!(*a, Apple(42));
        assert_eq!(*b, Orange("mandarin"));
    }

    #[test]
    fn alloc_through_trait_object() {
        let arena = FruitArena::new();
        let dynamic: &dyn Alloc<Apple> = &arena;
        let a = AllocInto::alloc(&dynamic, Apple(7));
        assert_eq!(a.0, 7);
    }
}
