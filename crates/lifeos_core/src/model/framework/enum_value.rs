//! Closed, string-tagged enum values.
//!
//! `enum_value!` declares an enum with a stable string tag per variant and
//! derives ordering by declaration index, the string form, serde support and a
//! realm codec, so every enum value travels through all realms the same way.

/// Declares a closed enum value type.
///
/// ```ignore
/// enum_value! {
///     /// Doc comment.
///     pub enum Difficulty("difficulty") {
///         Easy => "easy",
///         Medium => "medium",
///     }
/// }
/// ```
macro_rules! enum_value {
    (
        $(#[$meta:meta])*
        pub enum $name:ident($type_name:literal) {
            $($(#[$vmeta:meta])* $variant:ident => $tag:literal),+ $(,)?
        }
    ) => {
        $(#[$meta])*
        #[derive(
            Debug,
            Clone,
            Copy,
            PartialEq,
            Eq,
            PartialOrd,
            Ord,
            Hash,
            serde::Serialize,
            serde::Deserialize,
        )]
        #[serde(try_from = "String", into = "String")]
        pub enum $name {
            $($(#[$vmeta])* $variant),+
        }

        impl $name {
            pub const ALL: &'static [$name] = &[$($name::$variant),+];

            pub fn as_str(self) -> &'static str {
                match self {
                    $($name::$variant => $tag),+
                }
            }
        }

        impl std::fmt::Display for $name {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                f.write_str(self.as_str())
            }
        }

        impl std::str::FromStr for $name {
            type Err = $crate::model::framework::errors::InputValidationError;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                let normalized = s.trim().to_ascii_lowercase().replace('-', "_");
                match normalized.as_str() {
                    $($tag => Ok($name::$variant),)+
                    _ => Err($crate::model::framework::errors::InputValidationError::new(
                        format!(
                            "invalid {} `{}`, expected one of: {}",
                            $type_name,
                            s,
                            [$($tag),+].join(", ")
                        ),
                    )),
                }
            }
        }

        $crate::model::framework::base::string_backed!($name);
        $crate::model::framework::realm::string_realm_value!($name, $type_name);
    };
}

pub(crate) use enum_value;

#[cfg(test)]
mod tests {
    enum_value! {
        pub enum Shade("shade") {
            Light => "light",
            Dark => "dark",
        }
    }

    #[test]
    fn tags_parse_case_insensitively() {
        assert_eq!("DARK".parse::<Shade>().expect("tag"), Shade::Dark);
        assert!("grey".parse::<Shade>().is_err());
    }

    #[test]
    fn ordering_follows_declaration() {
        assert!(Shade::Light < Shade::Dark);
        assert_eq!(Shade::ALL.len(), 2);
    }

    #[test]
    fn serde_uses_the_tag() {
        let json = serde_json::to_string(&Shade::Light).expect("serialize");
        assert_eq!(json, "\"light\"");
    }
}
