//! # Subnet catalog.
//!
//! A [`SubnetDescriptor`] is the static description of one workload module:
//! its name, the content-naming key its source bundle is published under,
//! and whether it only runs in experimental mode.
//!
//! [`SubnetFilter`] narrows the catalog down to what an agent instance runs.

use std::borrow::Cow;
use std::fmt;

/// Statically configured subnet.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SubnetDescriptor {
    /// Subnet name (also the activity `source`).
    pub name: Cow<'static, str>,
    /// Content-naming key the source bundle is published under.
    pub naming_key: Cow<'static, str>,
    /// Only runs when the agent is started in experimental mode.
    pub experimental: bool,
    /// Entry point passed to the runtime, relative to the installed version dir.
    pub entry_point: Cow<'static, str>,
}

impl SubnetDescriptor {
    /// Creates a non-experimental descriptor with the default `main.js` entry point.
    pub fn new(
        name: impl Into<Cow<'static, str>>,
        naming_key: impl Into<Cow<'static, str>>,
    ) -> Self {
        Self {
            name: name.into(),
            naming_key: naming_key.into(),
            experimental: false,
            entry_point: Cow::Borrowed("main.js"),
        }
    }

    /// Marks the descriptor experimental.
    pub fn experimental(mut self) -> Self {
        self.experimental = true;
        self
    }

    /// Overrides the entry point.
    pub fn with_entry_point(mut self, entry: impl Into<Cow<'static, str>>) -> Self {
        self.entry_point = entry.into();
        self
    }

    /// Name with the first letter upper-cased, as used in activity messages.
    pub fn display_name(&self) -> String {
        capitalize(&self.name)
    }

    /// Whether this subnet runs given the experimental flag.
    #[inline]
    pub fn enabled(&self, experimental: bool) -> bool {
        experimental || !self.experimental
    }
}

/// Subnets shipped with the agent.
pub fn builtin() -> Vec<SubnetDescriptor> {
    vec![SubnetDescriptor::new(
        "spark",
        "k51qzi5uqu5dlej5gtgal40sjbowuau5itwkr6mgyuxdsuhagjxtsfqjd6ym3g",
    )]
}

/// Which subnets an agent instance handles.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub enum SubnetFilter {
    /// Every subnet in the catalog.
    #[default]
    All,
    /// Exactly the named subnet.
    Only(String),
}

impl SubnetFilter {
    /// Parses the raw filter value; an empty string means [`SubnetFilter::All`].
    pub fn parse(raw: &str) -> Self {
        match raw.trim() {
            "" => SubnetFilter::All,
            name => SubnetFilter::Only(name.to_string()),
        }
    }

    /// Exact-match test against a subnet name.
    #[inline]
    pub fn matches(&self, subnet: &str) -> bool {
        match self {
            SubnetFilter::All => true,
            SubnetFilter::Only(name) => name == subnet,
        }
    }
}

impl fmt::Display for SubnetFilter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SubnetFilter::All => f.write_str("all"),
            SubnetFilter::Only(name) => f.write_str(name),
        }
    }
}

/// Upper-cases the first character.
pub(crate) fn capitalize(s: &str) -> String {
    let mut chars = s.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn filter_parse_and_match() {
        assert_eq!(SubnetFilter::parse(""), SubnetFilter::All);
        assert_eq!(SubnetFilter::parse("  "), SubnetFilter::All);

        let only = SubnetFilter::parse("spark");
        assert!(only.matches("spark"));
        assert!(!only.matches("sparkle"));
        assert!(SubnetFilter::All.matches("anything"));
    }

    #[test]
    fn experimental_subnets_need_the_flag() {
        let s = SubnetDescriptor::new("voyager", "k51").experimental();
        assert!(!s.enabled(false));
        assert!(s.enabled(true));
        assert!(SubnetDescriptor::new("spark", "k51").enabled(false));
    }

    #[test]
    fn display_name_capitalizes() {
        assert_eq!(SubnetDescriptor::new("spark", "k").display_name(), "Spark");
        assert_eq!(capitalize(""), "");
    }
}
