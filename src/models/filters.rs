/// Company-dashboard user directory filter.
#[derive(Debug, Default, Clone)]
pub struct DirectoryFilter {
    /// Case-insensitive substring matched against name, email, and
    /// specialty. `None` or empty matches everything.
    pub query: Option<String>,
}

impl DirectoryFilter {
    pub fn new(query: impl Into<String>) -> Self {
        Self { query: Some(query.into()) }
    }

    pub fn matches(&self, haystacks: &[&str]) -> bool {
        let Some(q) = self.query.as_deref() else {
            return true;
        };
        let q = q.trim().to_lowercase();
        if q.is_empty() {
            return true;
        }
        haystacks.iter().any(|h| h.to_lowercase().contains(&q))
    }
}
