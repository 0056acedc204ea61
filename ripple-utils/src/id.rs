use symbol_table::GlobalSymbol;

/// An interned identifier in a Ripple circuit.
///
/// Copying, comparing and hashing an `Id` costs the same as an integer; the
/// backing string is interned for the lifetime of the process. The impl
/// surface is deliberately small: construction from string types, display,
/// and comparison against string literals for tests.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug)]
pub struct Id(GlobalSymbol);

impl Id {
    pub fn as_str(&self) -> &'static str {
        self.0.as_str()
    }
}

impl std::fmt::Display for Id {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl From<&str> for Id {
    fn from(s: &str) -> Self {
        Id(GlobalSymbol::from(s))
    }
}

impl From<String> for Id {
    fn from(s: String) -> Self {
        Id(GlobalSymbol::from(s))
    }
}

impl PartialEq<&str> for Id {
    fn eq(&self, other: &&str) -> bool {
        self.as_str() == *other
    }
}

/// A trait representing something in the IR that has a name.
pub trait GetName {
    /// Return the object's name.
    fn name(&self) -> Id;
}
