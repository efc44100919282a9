// Copyright Materialize, Inc. and contributors. All rights reserved.
//
// Use of this software is governed by the Business Source License
// included in the LICENSE file.
//
// As of the Change Date specified in that file, in accordance with
// the Business Source License, use of this software will be governed
// by the Apache License, Version 2.0.

//! User-agent classification: a pure function over the request header.

use once_cell::sync::Lazy;
use serde::Serialize;
use woothee::parser::Parser;

static PARSER: Lazy<Parser> = Lazy::new(Parser::new);

/// The parsed user-agent features.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct UserAgentResponse {
    pub name: String,
    pub version: String,
    pub os: String,
    pub os_version: String,
    pub device: String,
    pub mobile: bool,
    pub tablet: bool,
    pub desktop: bool,
    pub bot: bool,
}

/// Classifies a User-Agent header value.
pub fn parse_user_agent(header: &str) -> UserAgentResponse {
    let Some(result) = PARSER.parse(header) else {
        return UserAgentResponse::default();
    };
    let tablet = result.os.contains("iPad") || header.contains("Tablet");
    UserAgentResponse {
        name: result.name.to_string(),
        version: result.version.to_string(),
        os: result.os.to_string(),
        os_version: result.os_version.to_string(),
        device: result.category.to_string(),
        mobile: matches!(result.category, "smartphone" | "mobilephone") && !tablet,
        tablet,
        desktop: result.category == "pc",
        bot: result.category == "crawler",
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const CHROME_DESKTOP: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) \
        AppleWebKit/537.36 (KHTML, like Gecko) Chrome/108.0.0.0 Safari/537.36";
    const IPHONE_SAFARI: &str = "Mozilla/5.0 (iPhone; CPU iPhone OS 16_1 like Mac OS X) \
        AppleWebKit/605.1.15 (KHTML, like Gecko) Version/16.1 Mobile/15E148 Safari/604.1";
    const GOOGLEBOT: &str =
        "Mozilla/5.0 (compatible; Googlebot/2.1; +http://www.google.com/bot.html)";

    #[test]
    fn classifies_a_desktop_browser() {
        let ua = parse_user_agent(CHROME_DESKTOP);
        assert_eq!(ua.name, "Chrome");
        assert!(ua.desktop);
        assert!(!ua.mobile && !ua.bot);
    }

    #[test]
    fn classifies_a_phone() {
        let ua = parse_user_agent(IPHONE_SAFARI);
        assert!(ua.mobile);
        assert!(!ua.desktop);
    }

    #[test]
    fn classifies_a_crawler() {
        let ua = parse_user_agent(GOOGLEBOT);
        assert!(ua.bot);
        assert!(!ua.desktop && !ua.mobile);
    }

    #[test]
    fn garbage_yields_an_empty_classification() {
        let ua = parse_user_agent("");
        assert_eq!(ua, UserAgentResponse::default());
    }
}
