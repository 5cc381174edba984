//! Per-endpoint search options.
//!
//! # Design
//! The remote API transmits these switches as the strings `"1"`/`"0"`,
//! never as JSON booleans, so the option structs hold `bool`s and `flag`
//! does the wire encoding at request build time. The `Default` impls match
//! the remote's documented defaults, which is why they are written out by
//! hand instead of derived.

/// Options for `OpdbClient::typeahead_search`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TypeaheadOptions {
    /// Also match machine groups.
    pub include_groups: bool,
    /// Also match aliased machine names.
    pub include_aliases: bool,
}

impl Default for TypeaheadOptions {
    fn default() -> Self {
        Self {
            include_groups: false,
            include_aliases: true,
        }
    }
}

/// Options for `OpdbClient::search_machines`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SearchOptions {
    /// Only return machines that carry an OPDB id.
    pub require_opdb: bool,
    /// Also match machine groups.
    pub include_groups: bool,
    /// Also match aliased machine names.
    pub include_aliases: bool,
    /// Include grouping entries for matched groups.
    pub include_grouping_entries: bool,
}

impl Default for SearchOptions {
    fn default() -> Self {
        Self {
            require_opdb: true,
            include_groups: false,
            include_aliases: true,
            include_grouping_entries: false,
        }
    }
}

/// Wire encoding for boolean query parameters.
pub(crate) fn flag(value: bool) -> &'static str {
    if value {
        "1"
    } else {
        "0"
    }
}
