// Copyright Materialize, Inc. and contributors. All rights reserved.
//
// Use of this software is governed by the Business Source License
// included in the LICENSE file.
//
// As of the Change Date specified in that file, in accordance with
// the Business Source License, use of this software will be governed
// by the Apache License, Version 2.0.

// BEGIN LINT CONFIG
// DO NOT EDIT. Automatically generated by bin/gen-lints.
// Have complaints about the noise? See the note in misc/python/materialize/cli/gen-lints.py first.
#![allow(clippy::style)]
#![allow(clippy::complexity)]
#![allow(clippy::large_enum_variant)]
#![allow(clippy::mutable_key_type)]
#![allow(clippy::stable_sort_primitive)]
#![allow(clippy::map_entry)]
#![allow(clippy::box_default)]
#![warn(clippy::bool_comparison)]
#![warn(clippy::clone_on_ref_ptr)]
#![warn(clippy::no_effect)]
#![warn(clippy::unnecessary_unwrap)]
#![warn(clippy::dbg_macro)]
#![warn(clippy::todo)]
#![warn(clippy::wildcard_dependencies)]
#![warn(clippy::zero_prefixed_literal)]
#![warn(clippy::borrowed_box)]
#![warn(clippy::deref_addrof)]
#![warn(clippy::double_must_use)]
#![warn(clippy::double_parens)]
#![warn(clippy::extra_unused_lifetimes)]
#![warn(clippy::needless_borrow)]
#![warn(clippy::needless_question_mark)]
#![warn(clippy::needless_return)]
#![warn(clippy::redundant_pattern)]
#![warn(clippy::redundant_slicing)]
#![warn(clippy::redundant_static_lifetimes)]
#![warn(clippy::single_component_path_imports)]
#![warn(clippy::unnecessary_cast)]
#![warn(clippy::useless_asref)]
#![warn(clippy::useless_conversion)]
#![warn(clippy::builtin_type_shadow)]
#![warn(clippy::duplicate_underscore_argument)]
#![warn(clippy::double_neg)]
#![warn(clippy::unnecessary_mut_passed)]
#![warn(clippy::wildcard_in_or_patterns)]
#![warn(clippy::crosspointer_transmute)]
#![warn(clippy::excessive_precision)]
#![warn(clippy::overflow_check_conditional)]
#![warn(clippy::as_conversions)]
#![warn(clippy::match_overlapping_arm)]
#![warn(clippy::zero_divided_by_zero)]
#![warn(clippy::must_use_unit)]
#![warn(clippy::suspicious_assignment_formatting)]
#![warn(clippy::suspicious_else_formatting)]
#![warn(clippy::suspicious_unary_op_formatting)]
#![warn(clippy::mut_mutex_lock)]
#![warn(clippy::print_literal)]
#![warn(clippy::same_item_push)]
#![warn(clippy::useless_format)]
#![warn(clippy::write_literal)]
#![warn(clippy::redundant_closure)]
#![warn(clippy::redundant_closure_call)]
#![warn(clippy::unnecessary_lazy_evaluations)]
#![warn(clippy::partialeq_ne_impl)]
#![warn(clippy::redundant_field_names)]
#![warn(clippy::transmutes_expressible_as_ptr_casts)]
#![warn(clippy::unused_async)]
#![warn(clippy::disallowed_methods)]
#![warn(clippy::disallowed_macros)]
#![warn(clippy::disallowed_types)]
#![warn(clippy::from_over_into)]
// END LINT CONFIG

//! Bundled static ISO 3166 country metadata.
//!
//! A small, immutable dataset used to answer `/api/country` requests, to
//! backfill country names the reference databases omit, and to attach
//! TLD/currency details to legacy responses. Lookups are pure functions over
//! the compiled-in table; nothing here mutates.

use std::collections::HashMap;

use once_cell::sync::Lazy;

mod data;

pub use data::COUNTRIES;

/// One country's bundled metadata.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CountryInfo {
    pub alpha2: &'static str,
    pub alpha3: &'static str,
    pub name: &'static str,
    pub capital: &'static str,
    /// Two-letter continent code (AF, AN, AS, EU, NA, OC, SA).
    pub continent: &'static str,
    pub tld: &'static str,
    pub currency: &'static str,
    pub calling_code: &'static str,
}

/// ISO alpha-2 codes of the current European Union members.
const EU_MEMBERS: &[&str] = &[
    "AT", "BE", "BG", "HR", "CY", "CZ", "DK", "EE", "FI", "FR", "DE", "GR", "HU", "IE", "IT",
    "LV", "LT", "LU", "MT", "NL", "PL", "PT", "RO", "SK", "SI", "ES", "SE",
];

impl CountryInfo {
    pub fn eu_member(&self) -> bool {
        EU_MEMBERS.contains(&self.alpha2)
    }
}

static BY_CODE: Lazy<HashMap<&'static str, &'static CountryInfo>> = Lazy::new(|| {
    let mut map = HashMap::with_capacity(COUNTRIES.len() * 2);
    for country in COUNTRIES {
        map.insert(country.alpha2, country);
        map.insert(country.alpha3, country);
    }
    map
});

/// Looks up a country by its alpha-2 or alpha-3 code, case-insensitively.
pub fn lookup(code: &str) -> Option<&'static CountryInfo> {
    if code.len() != 2 && code.len() != 3 {
        return None;
    }
    let upper = code.to_ascii_uppercase();
    BY_CODE.get(upper.as_str()).copied()
}

/// The English short name for an alpha code, or the empty string.
pub fn name_for(code: &str) -> &'static str {
    lookup(code).map(|c| c.name).unwrap_or("")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn lookup_by_either_alpha_code() {
        let de = lookup("DE").unwrap();
        assert_eq!(de.name, "Germany");
        assert_eq!(lookup("deu"), Some(de));
        assert_eq!(lookup("de"), Some(de));
    }

    #[test]
    fn unknown_codes_are_absent() {
        assert_eq!(lookup(""), None);
        assert_eq!(lookup("XX"), None);
        assert_eq!(lookup("Germany"), None);
    }

    #[test]
    fn eu_membership() {
        assert!(lookup("FR").unwrap().eu_member());
        assert!(lookup("SE").unwrap().eu_member());
        assert!(!lookup("GB").unwrap().eu_member());
        assert!(!lookup("US").unwrap().eu_member());
    }

    #[test]
    fn codes_are_unique_and_well_formed() {
        let mut seen = std::collections::HashSet::new();
        for country in COUNTRIES {
            assert_eq!(country.alpha2.len(), 2, "{}", country.alpha2);
            assert_eq!(country.alpha3.len(), 3, "{}", country.alpha3);
            assert!(seen.insert(country.alpha2));
            assert!(matches!(
                country.continent,
                "AF" | "AN" | "AS" | "EU" | "NA" | "OC" | "SA"
            ));
        }
    }
}
