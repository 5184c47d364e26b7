use rustc_hash::FxHashSet;

/// The author identity an import is restricted to
///
/// A commit matches only when its author name equals `name` exactly and its
/// author email is one of `emails`. An empty name or an empty email set
/// matches nothing.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AuthorFilter {
    name: String,
    emails: FxHashSet<String>,
}

impl AuthorFilter {
    pub fn new<I, S>(name: impl Into<String>, emails: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            name: name.into(),
            emails: emails.into_iter().map(Into::into).collect(),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn emails(&self) -> impl Iterator<Item = &str> {
        self.emails.iter().map(String::as_str)
    }

    pub fn matches(&self, name: &str, email: &str) -> bool {
        !self.name.is_empty() && self.name == name && self.emails.contains(email)
    }
}
