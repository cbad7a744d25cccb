// Macro to generate code-table newtypes: constants, helper enum, and trait
// implementations. Conntrack attribute types and protocol numbers all live
// in host byte order once the attribute tree is materialized, so the
// newtypes wrap plain primitives.
#[macro_export]
macro_rules! code_constants {
    (   $(#[$outer:meta])*
        $type_name:ident,
        $primitive:ty:
        $( $(#[$default:ident])? $const_name:ident = $val:expr; )+
    ) => {
        paste::paste! {
            #[doc = concat!("A newtype wrapper around a ", stringify!($primitive), " holding a ", stringify!($type_name), " code.")]
            ///
            /// Well-known values get named constants, and `Display` renders
            /// a human-readable name with a hex fallback for everything else.
            $(#[$outer])*
            #[derive(Clone, Copy, PartialEq, Eq, Hash, Debug)]
            pub struct $type_name(pub $primitive);

            impl $type_name {
                $(
                    pub const $const_name: $type_name = $type_name($val);
                )+

                pub fn is_valid(&self) -> bool {
                    <[< $type_name Name >] as std::convert::TryFrom<$primitive>>::try_from(self.0).is_ok()
                }
            }

            impl Default for $type_name {
                fn default() -> Self {
                    $( $(if stringify!($default) == "default" {
                            return Self::$const_name;
                        })?
                    )+
                    Self(0)
                }
            }

            // Shadow Enum for Strum machinery
            #[derive(Debug, PartialEq, strum::EnumString, strum::IntoStaticStr, Clone, Copy)]
            #[strum(serialize_all = "kebab-case")]
            #[allow(non_camel_case_types)]
            enum [< $type_name Name >] {
                $(
                    $const_name,
                )+
            }

            // Idiomatic conversion from Enum to Primitive
            impl From<[< $type_name Name >]> for $primitive {
                fn from(v: [< $type_name Name >]) -> Self {
                    match v {
                        $(
                            [< $type_name Name >]::$const_name => $val,
                        )+
                    }
                }
            }

            // Fast mapping from Primitive to Enum (used during Serialization)
            impl TryFrom<$primitive> for [< $type_name Name >] {
                type Error = ();
                fn try_from(v: $primitive) -> Result<Self, Self::Error> {
                    match v {
                        $(
                            $val => Ok([< $type_name Name >]::$const_name),
                        )+
                        _ => Err(()),
                    }
                }
            }

            // Conversion from Primitive to Struct
            impl From<$primitive> for $type_name {
                fn from(v: $primitive) -> Self {
                    Self(v)
                }
            }

            // Conversion from Struct to Primitive
            impl From<$type_name> for $primitive {
                fn from(v: $type_name) -> Self {
                    v.0
                }
            }

            // Manual Serialize implementation (code_names)
            #[cfg(feature = "code_names")]
            impl serde::Serialize for $type_name {
                fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
                where
                    S: serde::Serializer,
                {
                    if let Ok(name) = <[< $type_name Name >] as std::convert::TryFrom<$primitive>>::try_from(self.0) {
                        let s: &'static str = name.into();
                        serializer.serialize_str(s)
                    } else {
                        let hex_str = format!("0x{:x}", self.0);
                        serializer.serialize_str(&hex_str)
                    }
                }
            }

            // Manual Deserialize implementation (code_names)
            #[cfg(feature = "code_names")]
            impl<'de> serde::Deserialize<'de> for $type_name {
                fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
                where
                    D: serde::Deserializer<'de>,
                {
                    struct Visitor;

                    impl<'de> serde::de::Visitor<'de> for Visitor {
                        type Value = $type_name;

                        fn expecting(&self, formatter: &mut std::fmt::Formatter) -> std::fmt::Result {
                            formatter.write_str("a code name or hex value")
                        }

                        fn visit_str<E>(self, value: &str) -> Result<Self::Value, E>
                        where
                            E: serde::de::Error,
                        {
                            if let Ok(variant) = <[< $type_name Name >] as std::str::FromStr>::from_str(value) {
                                let p: $primitive = variant.into();
                                return Ok($type_name(p));
                            }

                            if value.starts_with("0x") || value.starts_with("0X") {
                                let no_prefix = &value[2..];
                                let val = <$primitive>::from_str_radix(no_prefix, 16)
                                    .map_err(|_| E::custom(format!("invalid hex: {}", value)))?;
                                return Ok($type_name(val));
                            }

                            Err(E::custom(format!("unknown {} name: {}", stringify!($type_name), value)))
                        }
                    }

                    deserializer.deserialize_str(Visitor)
                }
            }

            // Display implementation
            impl std::fmt::Display for $type_name {
                fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                    if let Ok(name) = <[< $type_name Name >] as std::convert::TryFrom<$primitive>>::try_from(self.0) {
                        let s: &'static str = name.into();
                        f.write_str(s)
                    } else {
                        write!(f, "0x{:x}", self.0)
                    }
                }
            }

            // Binary Serialize implementation
            #[cfg(not(feature = "code_names"))]
            impl serde::Serialize for $type_name {
                fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
                where
                    S: serde::Serializer,
                {
                    self.0.serialize(serializer)
                }
            }

            // Binary Deserialize implementation
            #[cfg(not(feature = "code_names"))]
            impl<'de> serde::Deserialize<'de> for $type_name {
                fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
                where
                    D: serde::Deserializer<'de>,
                {
                    let val = <$primitive>::deserialize(deserializer)?;
                    Ok($type_name(val))
                }
            }
        }
    };
}
