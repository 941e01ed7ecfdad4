// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Declarative macros for reducing boilerplate.
//!
//! - [`simple_display!`] — `Display` impl mapping enum variants to string literals
//! - [`optional_setters!`] — chainable setters for the `Option` fields of an
//!   input/config struct

/// Generate a `Display` impl that maps enum variants to string literals.
///
/// Unit variants match directly; data-carrying variants use `(..)` or `{..}`
/// to ignore fields.
///
/// ```ignore
/// crate::simple_display! {
///     MyEnum {
///         Foo => "foo",
///         Bar(..) => "bar",
///     }
/// }
/// ```
#[macro_export]
macro_rules! simple_display {
    ($enum:ty { $( $variant:ident $(( $($ignore:tt)* ))? $({ $($ignore_named:tt)* })? => $str:expr ),+ $(,)? }) => {
        impl std::fmt::Display for $enum {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                f.write_str(match self {
                    $( Self::$variant $(( $($ignore)* ))? $({ $($ignore_named)* })? => $str, )+
                })
            }
        }
    };
}

/// Generate chainable setters for `Option` fields inside an existing
/// `impl` block.
///
/// The constructor takes the required fields; everything optional
/// (branches, image tags, emails, timeouts) gets a setter that wraps its
/// argument in `Some`. Non-`Option` setters are rare enough here to write
/// by hand.
///
/// ```ignore
/// impl CreateSandboxInput {
///     crate::optional_setters! {
///         branch: String,
///         image_tag: String,
///     }
/// }
/// ```
#[macro_export]
macro_rules! optional_setters {
    ( $( $field:ident : $ty:ty ),+ $(,)? ) => {
        $(
            pub fn $field(mut self, v: impl Into<$ty>) -> Self {
                self.$field = Some(v.into());
                self
            }
        )+
    };
}
