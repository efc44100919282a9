// Copyright Materialize, Inc. and contributors. All rights reserved.
//
// Use of this software is governed by the Business Source License
// included in the LICENSE file.
//
// As of the Change Date specified in that file, in accordance with
// the Business Source License, use of this software will be governed
// by the Apache License, Version 2.0.

//! Accept-Language parsing: a pure function from the header to the caller's
//! most preferred tag. Anything empty or unparseable selects English.

use serde::Serialize;

/// The parsed language preference.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LanguageResponse {
    pub language: String,
    pub region: String,
    pub tag: String,
}

impl Default for LanguageResponse {
    fn default() -> LanguageResponse {
        LanguageResponse {
            language: "en".into(),
            region: String::new(),
            tag: "en".into(),
        }
    }
}

/// Selects the highest-quality tag from an Accept-Language header. Ties keep
/// the earlier entry; a missing or malformed header yields `en`.
pub fn parse_accept_language(header: &str) -> LanguageResponse {
    let mut best: Option<(f64, LanguageResponse)> = None;
    for entry in header.split(',') {
        let mut parts = entry.split(';');
        let tag = parts.next().unwrap_or("").trim();
        if tag.is_empty() || tag == "*" {
            continue;
        }
        let Some(parsed) = parse_tag(tag) else {
            continue;
        };
        let q = parts
            .find_map(|p| p.trim().strip_prefix("q=").map(str::to_string))
            .and_then(|q| q.parse::<f64>().ok())
            .unwrap_or(1.0);
        if !(0.0..=1.0).contains(&q) {
            continue;
        }
        match &best {
            Some((score, _)) if *score >= q => (),
            _ => best = Some((q, parsed)),
        }
    }
    best.map(|(_, parsed)| parsed).unwrap_or_default()
}

fn parse_tag(tag: &str) -> Option<LanguageResponse> {
    let mut subtags = tag.split('-');
    let language = subtags.next()?;
    if language.is_empty() || language.len() > 8 || !language.chars().all(|c| c.is_ascii_alphabetic())
    {
        return None;
    }
    let language = language.to_ascii_lowercase();
    // The region is the first two-letter (or three-digit) subtag; script
    // subtags in between are skipped.
    let region = subtags
        .find(|s| {
            (s.len() == 2 && s.chars().all(|c| c.is_ascii_alphabetic()))
                || (s.len() == 3 && s.chars().all(|c| c.is_ascii_digit()))
        })
        .map(str::to_ascii_uppercase)
        .unwrap_or_default();
    let tag = if region.is_empty() {
        language.clone()
    } else {
        format!("{language}-{region}")
    };
    Some(LanguageResponse {
        language,
        region,
        tag,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn highest_quality_wins() {
        let lang = parse_accept_language("de-DE;q=0.8,fr;q=0.9,en;q=0.7");
        assert_eq!(lang.language, "fr");
        assert_eq!(lang.tag, "fr");
    }

    #[test]
    fn unweighted_entries_default_to_one() {
        let lang = parse_accept_language("de-DE,en;q=0.9");
        assert_eq!(lang.language, "de");
        assert_eq!(lang.region, "DE");
        assert_eq!(lang.tag, "de-DE");
    }

    #[test]
    fn ties_keep_the_earlier_entry() {
        let lang = parse_accept_language("pt-BR,es");
        assert_eq!(lang.tag, "pt-BR");
    }

    #[test]
    fn script_subtags_are_skipped_for_the_region() {
        let lang = parse_accept_language("zh-Hant-TW");
        assert_eq!(lang.language, "zh");
        assert_eq!(lang.region, "TW");
        assert_eq!(lang.tag, "zh-TW");
    }

    #[test]
    fn empty_or_garbage_selects_english() {
        assert_eq!(parse_accept_language("").language, "en");
        assert_eq!(parse_accept_language("*").language, "en");
        assert_eq!(parse_accept_language(";;;,,,").language, "en");
        assert_eq!(parse_accept_language("42-??").language, "en");
    }
}
