//! Efficient way to store PostScript Name Value

/// PostScript Name Value
pub type Name = kstring::KStringBase<Box<str>>;

/// Create Name from `&str`
pub fn name(s: &str) -> Name {
    Name::from_ref(s)
}

/// Create Name from static str without allocation.
pub const fn sname(s: &'static str) -> Name {
    Name::from_static(s)
}
