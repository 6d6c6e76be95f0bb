//! Macro for implementing label conversions on closed classification enums
//!
//! Operation types and failure reasons are closed, fieldless enums that show
//! up in log lines, exported records and reports. This macro gives each of
//! them one canonical label plus lenient parsing and raw-discriminant
//! decoding, so every consumer renders them the same way.
//!
//! # Example
//!
//! ```rust
//! use oplink_domain::impl_label_conversions;
//!
//! #[derive(Debug, Clone, Copy, PartialEq, Eq)]
//! #[repr(u8)]
//! pub enum Phase {
//!     Start = 0,
//!     Finish = 1,
//! }
//!
//! impl_label_conversions!(Phase {
//!     Start => "Start",
//!     Finish => "Finish",
//! });
//!
//! assert_eq!(Phase::Finish.as_str(), "Finish");
//! assert_eq!(Phase::label_for_raw(7), oplink_domain::constants::UNKNOWN_VARIANT_LABEL);
//! ```

/// Implements `as_str`, `Display`, `FromStr` and raw decoding for label enums
///
/// This macro generates:
/// - `ALL`: every variant in declaration order
/// - `as_str`: the canonical label of a variant
/// - `from_raw` / `label_for_raw`: decoding of a `u8` discriminant, where an
///   unknown value maps to [`crate::constants::UNKNOWN_VARIANT_LABEL`]
/// - `Display`: writes the canonical label
/// - `FromStr`: case-insensitive parse of the canonical label
///
/// The enum must be fieldless, `Copy` and `#[repr(u8)]`.
#[macro_export]
macro_rules! impl_label_conversions {
    ($enum_name:ident { $($variant:ident => $label:expr),+ $(,)? }) => {
        impl $enum_name {
            /// Every variant, in declaration order.
            pub const ALL: &'static [Self] = &[$(Self::$variant),+];

            /// Canonical display label.
            pub const fn as_str(self) -> &'static str {
                match self {
                    $(Self::$variant => $label,)+
                }
            }

            /// Decodes a raw discriminant, `None` when it names no variant.
            pub fn from_raw(raw: u8) -> ::std::option::Option<Self> {
                Self::ALL.iter().copied().find(|variant| *variant as u8 == raw)
            }

            /// Label for a raw discriminant; never fails.
            pub fn label_for_raw(raw: u8) -> &'static str {
                Self::from_raw(raw)
                    .map_or($crate::constants::UNKNOWN_VARIANT_LABEL, Self::as_str)
            }
        }

        impl ::std::fmt::Display for $enum_name {
            fn fmt(&self, f: &mut ::std::fmt::Formatter<'_>) -> ::std::fmt::Result {
                f.write_str(self.as_str())
            }
        }

        impl ::std::str::FromStr for $enum_name {
            type Err = ::std::string::String;

            fn from_str(s: &str) -> ::std::result::Result<Self, Self::Err> {
                Self::ALL
                    .iter()
                    .copied()
                    .find(|variant| variant.as_str().eq_ignore_ascii_case(s.trim()))
                    .ok_or_else(|| ::std::format!("Invalid {}: {}", stringify!($enum_name), s))
            }
        }
    };
}
