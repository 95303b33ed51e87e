/// Creates an enum with various traits.
/// Conversion from the raw value fails with `Error::InvalidValue` for values
/// not listed.
#[macro_export]
macro_rules! extended_enum {
    ($(#[$outer:meta])* $name:ident, $ty:ty, $($(#[$inner:meta])* $var:ident => $val:expr),+ $(,)*) => (

        $(#[$outer])*
        #[derive(Clone, Copy, Debug, PartialEq, Eq)]
        pub enum $name {
            $(
                $(#[$inner])*
                $var,
            )*
        }

        impl core::convert::TryFrom<$ty> for $name {
            type Error = $crate::error::Error;

            fn try_from(v: $ty) -> Result<Self, $crate::error::Error> {
                match v {
                    $( $val => Ok($name::$var),)*
                    _ => Err($crate::error::Error::InvalidValue),
                }
            }
        }

        impl From<$name> for $ty {
            fn from(v: $name) -> Self {
                match v {
                    $( $name::$var => $val, )*
                }
            }
        }

        impl PartialEq<$name> for $ty {
            fn eq(&self, other: &$name) -> bool {
                match *other {
                    $( $name::$var => *self == $val, )*
                }
            }
        }
    );
}

/// Test a single flag in a bit field
pub(crate) fn flag(value: u32, mask: u32) -> bool {
    value & mask == mask
}

/// Extract a sub-field from a bit field
pub(crate) fn field(value: u32, mask: u32, offset: u32) -> u8 {
    ((value & mask) >> offset) as u8
}
