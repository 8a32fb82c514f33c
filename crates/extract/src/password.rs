use std::fmt;

/// A password handed to the extractor.
///
/// Never printed: both `Debug` and `Display` redact the value so that
/// passwords can't leak into logs or the run history. The empty password
/// (used for unprotected archives) displays as `(none)`.
#[derive(Clone, Default, PartialEq, Eq, Hash)]
pub struct Password(String);

impl Password {
    pub fn new(value: impl Into<String>) -> Self {
        Self(value.into())
    }

    /// The empty password.
    pub fn none() -> Self {
        Self::default()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// The secret itself. Only the command builder should need this.
    pub fn expose(&self) -> &str {
        &self.0
    }
}

impl From<String> for Password {
    fn from(value: String) -> Self {
        Self(value)
    }
}

impl From<&str> for Password {
    fn from(value: &str) -> Self {
        Self(value.to_string())
    }
}

impl fmt::Display for Password {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(if self.is_empty() { "(none)" } else { "***" })
    }
}

impl fmt::Debug for Password {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Password({self})")
    }
}

/// Builds the ordered list of passwords to try for one archive.
///
/// Without `has_password` the empty password comes first, followed by every
/// stored password. With it, only the stored passwords are tried, so an
/// empty store yields no candidates at all.
pub fn candidates<'a, I>(has_password: bool, stored: I) -> Vec<Password>
where
    I: IntoIterator<Item = &'a Password>,
{
    let mut list = Vec::new();
    if !has_password {
        list.push(Password::none());
    }
    list.extend(stored.into_iter().cloned());
    list
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    fn stored() -> Vec<Password> {
        vec![Password::from("abc"), Password::from("123")]
    }

    #[rstest]
    #[case(false, &["", "abc", "123"])]
    #[case(true, &["abc", "123"])]
    fn test_candidates(#[case] has_password: bool, #[case] expected: &[&str]) {
        let list = candidates(has_password, &stored());
        let exposed: Vec<&str> = list.iter().map(Password::expose).collect();
        assert_eq!(exposed, expected);
    }

    #[test]
    fn test_no_candidates_when_store_empty() {
        assert!(candidates(true, &[]).is_empty());
        assert_eq!(candidates(false, &[]), vec![Password::none()]);
    }

    #[rstest]
    #[case("", "(none)")]
    #[case("hunter2", "***")]
    fn test_redacted(#[case] value: &str, #[case] shown: &str) {
        let password = Password::from(value);
        assert_eq!(password.to_string(), shown);
        assert_eq!(format!("{password:?}"), format!("Password({shown})"));
    }
}
