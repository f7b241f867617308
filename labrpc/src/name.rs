use std::fmt;

/// Identity of a client end or of a server inside a [`Network`].
///
/// Tests name ends and servers with whatever is handy, a string like
/// `"end1-99"` or a plain index like `7`, so both are accepted. An integer
/// and its decimal string are different names.
///
/// [`Network`]: crate::Network
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Name {
    Int(i64),
    Str(String),
}

impl fmt::Display for Name {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Name::Int(i) => write!(f, "{}", i),
            Name::Str(s) => write!(f, "{:?}", s),
        }
    }
}

impl From<&str> for Name {
    fn from(s: &str) -> Name {
        Name::Str(s.to_owned())
    }
}

impl From<String> for Name {
    fn from(s: String) -> Name {
        Name::Str(s)
    }
}

impl From<&String> for Name {
    fn from(s: &String) -> Name {
        Name::Str(s.clone())
    }
}

impl From<&Name> for Name {
    fn from(n: &Name) -> Name {
        n.clone()
    }
}

macro_rules! name_from_int {
    ($($t:ty),*) => {
        $(
            impl From<$t> for Name {
                fn from(i: $t) -> Name {
                    Name::Int(i as i64)
                }
            }
        )*
    };
}

name_from_int!(i8, i16, i32, i64, u8, u16, u32, u64, usize, isize);

#[cfg(test)]
mod tests {
    use super::Name;

    #[test]
    fn test_int_and_str_are_distinct() {
        assert_eq!(Name::from(7usize), Name::from(7i32));
        assert_ne!(Name::from(7), Name::from("7"));
        assert_eq!(Name::from("end1-99"), Name::from("end1-99".to_owned()));
        assert_eq!(Name::from(99).to_string(), "99");
        assert_eq!(Name::from("c").to_string(), "\"c\"");
    }
}
