// macros.rs: Declaration helpers for IR enums
//
// `ir_enum!` declares a Rust enum together with the `EnumDef` constant that
// node field tables use as a scalar type tag, and wires the enum into
// `Value` so builders can pass members directly.

macro_rules! ir_enum {
    (
        $(#[$meta:meta])*
        $vis:vis enum $name:ident as $def:ident = $label:literal {
            $($member:ident),+ $(,)?
        }
    ) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
        $vis enum $name {
            $($member),+
        }

        /// Scalar type tag for fields holding this enum.
        $vis const $def: $crate::schema::EnumDef = $crate::schema::EnumDef {
            name: $label,
            members: &[$(stringify!($member)),+],
        };

        impl $crate::schema::IrEnum for $name {
            fn def() -> &'static $crate::schema::EnumDef {
                &$def
            }

            fn member(self) -> &'static str {
                match self {
                    $(Self::$member => stringify!($member)),+
                }
            }

            fn from_member(member: &str) -> Option<Self> {
                match member {
                    $(stringify!($member) => Some(Self::$member),)+
                    _ => None,
                }
            }
        }

        impl std::fmt::Display for $name {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                f.write_str($crate::schema::IrEnum::member(*self))
            }
        }

        impl serde::Serialize for $name {
            fn serialize<S: serde::Serializer>(
                &self,
                serializer: S,
            ) -> std::result::Result<S::Ok, S::Error> {
                serializer.serialize_str($crate::schema::IrEnum::member(*self))
            }
        }

        impl From<$name> for $crate::node::Value {
            fn from(member: $name) -> Self {
                $crate::node::Value::Enum($crate::node::EnumValue::of(member))
            }
        }
    };
}
