//! Causal chains of failures.

use std::error::Error;
use std::fmt;

/// The ordered descriptions of a failure and everything that caused it,
/// outermost first.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CausalChain {
    links: Vec<String>,
}

impl CausalChain {
    /// Builds a chain by following [`Error::source`] until it runs out.
    pub fn walk(err: &(dyn Error + 'static)) -> Self {
        let mut links = Vec::new();
        let mut current = Some(err);
        while let Some(e) = current {
            links.push(e.to_string());
            current = e.source();
        }
        Self { links }
    }

    /// Builds a chain from an [`anyhow::Error`], including every context layer.
    pub fn from_anyhow(err: &anyhow::Error) -> Self {
        Self::walk(&**err)
    }

    pub fn links(&self) -> &[String] {
        &self.links
    }

    pub fn len(&self) -> usize {
        self.links.len()
    }

    pub fn is_empty(&self) -> bool {
        self.links.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.links.iter().map(String::as_str)
    }
}

impl fmt::Display for CausalChain {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, link) in self.links.iter().enumerate() {
            if i > 0 {
                f.write_str(": ")?;
            }
            f.write_str(link)?;
        }
        Ok(())
    }
}
