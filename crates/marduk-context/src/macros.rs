/// Declares a fieldless enum with a stable text name per variant.
///
/// Generates `ALL`, `as_str`, `Display`, `FromStr` and `TryFrom<u32>` (by
/// declaration index). Unknown text or indices yield
/// [`ConfigError::InvalidEnumValue`](crate::error::ConfigError::InvalidEnumValue).
macro_rules! text_enum {
    (
        $(#[$meta:meta])*
        pub enum $name:ident : $label:literal {
            $(
                $(#[$vmeta:meta])*
                $variant:ident => $text:literal
            ),+ $(,)?
        }
    ) => {
        $(#[$meta])*
        #[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
        pub enum $name {
            $(
                $(#[$vmeta])*
                $variant
            ),+
        }

        impl $name {
            /// Every variant, in declaration order.
            pub const ALL: &'static [$name] = &[$($name::$variant),+];

            #[inline]
            pub const fn as_str(self) -> &'static str {
                match self {
                    $($name::$variant => $text),+
                }
            }
        }

        impl ::core::fmt::Display for $name {
            fn fmt(&self, f: &mut ::core::fmt::Formatter<'_>) -> ::core::fmt::Result {
                f.write_str(self.as_str())
            }
        }

        impl ::core::str::FromStr for $name {
            type Err = $crate::error::ConfigError;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                match s {
                    $($text => Ok($name::$variant),)+
                    _ => Err($crate::error::ConfigError::InvalidEnumValue {
                        kind: $label,
                        value: s.to_owned(),
                    }),
                }
            }
        }

        impl ::core::convert::TryFrom<u32> for $name {
            type Error = $crate::error::ConfigError;

            fn try_from(raw: u32) -> Result<Self, Self::Error> {
                $name::ALL
                    .get(raw as usize)
                    .copied()
                    .ok_or_else(|| $crate::error::ConfigError::InvalidEnumValue {
                        kind: $label,
                        value: raw.to_string(),
                    })
            }
        }
    };
}
