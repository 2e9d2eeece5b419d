//! Profile-level enums and the string-valued enum helper.

/// Declares a fieldless enum whose variants have a fixed wire name.
///
/// Generates serde impls, `Display`, `FromStr` and `VALUES` (the wire names,
/// in declaration order). Action parameters carry these as plain strings.
macro_rules! wire_enum {
    (
        $(#[$meta:meta])*
        $vis:vis enum $name:ident {
            $( $(#[$vmeta:meta])* $variant:ident => $wire:literal ),+ $(,)?
        }
    ) => {
        $(#[$meta])*
        #[derive(
            Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord,
            serde::Serialize, serde::Deserialize,
        )]
        $vis enum $name {
            $( $(#[$vmeta])* #[serde(rename = $wire)] $variant ),+
        }

        impl $name {
            /// Wire names of all variants.
            pub const VALUES: &'static [&'static str] = &[$($wire),+];

            pub fn as_str(&self) -> &'static str {
                match self {
                    $( Self::$variant => $wire ),+
                }
            }
        }

        impl std::fmt::Display for $name {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                f.write_str(self.as_str())
            }
        }

        impl std::str::FromStr for $name {
            type Err = String;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                match s {
                    $( $wire => Ok(Self::$variant), )+
                    other => Err(format!(
                        "'{}' is not one of {}",
                        other,
                        Self::VALUES.join(", ")
                    )),
                }
            }
        }
    };
}

pub(crate) use wire_enum;

wire_enum! {
    /// Direction of a translation profile.
    pub enum ProfileType {
        /// Remote identity → local entity (login, registration).
        Input => "INPUT",
        /// Local entity → released attributes (relying parties).
        Output => "OUTPUT",
    }
}

impl Default for ProfileType {
    fn default() -> Self {
        Self::Input
    }
}

wire_enum! {
    /// Editability of a profile.
    pub enum ProfileMode {
        Default => "DEFAULT",
        /// System-provided; cannot be modified or removed.
        ReadOnly => "READ_ONLY",
    }
}

impl Default for ProfileMode {
    fn default() -> Self {
        Self::Default
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_wire_names() {
        assert_eq!(ProfileType::Input.to_string(), "INPUT");
        assert_eq!("OUTPUT".parse::<ProfileType>().unwrap(), ProfileType::Output);
        assert_eq!(ProfileMode::VALUES, &["DEFAULT", "READ_ONLY"]);
        assert_eq!(
            serde_json::to_string(&ProfileMode::ReadOnly).unwrap(),
            "\"READ_ONLY\""
        );
    }

    #[test]
    fn test_parse_error_lists_values() {
        let err = "input".parse::<ProfileType>().unwrap_err();
        assert_eq!(err, "'input' is not one of INPUT, OUTPUT");
    }

    #[test]
    fn test_defaults() {
        assert_eq!(ProfileType::default(), ProfileType::Input);
        assert_eq!(ProfileMode::default(), ProfileMode::Default);
    }
}
