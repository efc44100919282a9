// Copyright Materialize, Inc. and contributors. All rights reserved.
//
// Use of this software is governed by the Business Source License
// included in the LICENSE file.
//
// As of the Change Date specified in that file, in accordance with
// the Business Source License, use of this software will be governed
// by the Apache License, Version 2.0.

//! Route handlers. Each one is a thin translation between the HTTP surface
//! and the store/ingest layers; the canonical record serializes as-is.

use axum::body::Bytes;
use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::{Extension, Json};
use http::header::{ACCEPT_LANGUAGE, USER_AGENT};
use http::HeaderMap;
use serde::Serialize;
use tracing::error;

use geoip_store::{PageParams, SearchFilter};

use crate::language::{parse_accept_language, LanguageResponse};
use crate::legacy::legacy_response;
use crate::resolve;
use crate::useragent::{parse_user_agent, UserAgentResponse};
use crate::{AppState, RemoteAddr};

/// Normalizes a wildcard path parameter: strips the leading slash and any
/// stray query suffix; an absent parameter selects the caller's address.
fn host_param(path: Option<Path<String>>, remote: std::net::IpAddr) -> String {
    let mut host = path.map(|Path(inner)| inner).unwrap_or_default();
    if let Some(stripped) = host.strip_prefix('/') {
        host = stripped.to_string();
    }
    if let Some((head, _)) = host.split_once('?') {
        host = head.to_string();
    }
    if host.is_empty() {
        host = remote.to_string();
    }
    host
}

fn header<'h>(headers: &'h HeaderMap, name: http::header::HeaderName) -> &'h str {
    headers
        .get(name)
        .and_then(|value| value.to_str().ok())
        .unwrap_or("")
}

/// GET `/api/detail/*host` — the canonical record.
pub(crate) async fn detail(
    State(state): State<AppState>,
    Extension(RemoteAddr(remote)): Extension<RemoteAddr>,
    path: Option<Path<String>>,
) -> Response {
    let host = host_param(path, remote);
    match resolve::resolve_host(&state, &host).await {
        Ok(record) => Json(record).into_response(),
        Err(_) => StatusCode::NOT_FOUND.into_response(),
    }
}

#[derive(Debug, Serialize)]
pub(crate) struct MeResponse {
    ip: geoip_store::IpRecord,
    language: LanguageResponse,
    user_agent: UserAgentResponse,
}

/// GET `/api/me` — the caller's own record plus request-derived helpers.
pub(crate) async fn me(
    State(state): State<AppState>,
    Extension(RemoteAddr(remote)): Extension<RemoteAddr>,
    headers: HeaderMap,
) -> Response {
    let record = resolve::resolve_ip(&state, remote, &[]).await;
    if !record.persisted() {
        return StatusCode::NOT_FOUND.into_response();
    }
    Json(MeResponse {
        ip: record,
        language: parse_accept_language(header(&headers, ACCEPT_LANGUAGE)),
        user_agent: parse_user_agent(header(&headers, USER_AGENT)),
    })
    .into_response()
}

#[derive(Debug, Default, Serialize)]
pub(crate) struct CountryResponse {
    name: CountryName,
    eu_member: bool,
    tlds: Vec<String>,
    currencies: Vec<String>,
    codes: CountryCodes,
    geo: CountryGeo,
}

#[derive(Debug, Default, Serialize)]
struct CountryName {
    common: String,
}

#[derive(Debug, Default, Serialize)]
struct CountryCodes {
    cca2: String,
    cca3: String,
    calling_codes: Vec<String>,
}

#[derive(Debug, Default, Serialize)]
struct CountryGeo {
    continent: String,
    capital: String,
}

fn country_response(code: &str) -> CountryResponse {
    match geoip_countries::lookup(code) {
        None => CountryResponse::default(),
        Some(info) => CountryResponse {
            name: CountryName {
                common: info.name.to_string(),
            },
            eu_member: info.eu_member(),
            tlds: vec![info.tld.to_string()],
            currencies: vec![info.currency.to_string()],
            codes: CountryCodes {
                cca2: info.alpha2.to_string(),
                cca3: info.alpha3.to_string(),
                calling_codes: vec![info.calling_code.to_string()],
            },
            geo: CountryGeo {
                continent: info.continent.to_string(),
                capital: info.capital.to_string(),
            },
        },
    }
}

/// GET `/api/country/*code` — bundled static metadata. Always 200; unknown
/// codes produce an empty record. An absent code reads the caller's stored
/// country.
pub(crate) async fn country(
    State(state): State<AppState>,
    Extension(RemoteAddr(remote)): Extension<RemoteAddr>,
    path: Option<Path<String>>,
) -> Response {
    let mut code = path.map(|Path(inner)| inner).unwrap_or_default();
    code = code.trim_matches('/').to_string();
    if code.is_empty() {
        code = state
            .store
            .find_ip(&remote.to_string())
            .ok()
            .flatten()
            .map(|record| record.country.iso_code)
            .unwrap_or_default();
    }
    Json(country_response(&code)).into_response()
}

/// GET `/api/useragent` — pure function of the request headers.
pub(crate) async fn useragent(headers: HeaderMap) -> Response {
    Json(parse_user_agent(header(&headers, USER_AGENT))).into_response()
}

/// GET `/api/language` — pure function of the request headers.
pub(crate) async fn language(headers: HeaderMap) -> Response {
    Json(parse_accept_language(header(&headers, ACCEPT_LANGUAGE))).into_response()
}

/// GET `/api/statistic` — the periodic snapshot, not a live count.
pub(crate) async fn statistic(State(state): State<AppState>) -> Response {
    let snapshot = *state.statistics.read().expect("poisoned");
    Json(snapshot).into_response()
}

/// POST `/api/search` — the JSON body is an IP record template; pagination
/// comes from the query string.
pub(crate) async fn search(
    State(state): State<AppState>,
    Query(page): Query<PageParams>,
    body: Bytes,
) -> Response {
    let mut filter: SearchFilter = match serde_json::from_slice(&body) {
        Ok(filter) => filter,
        Err(_) => return StatusCode::BAD_REQUEST.into_response(),
    };

    // A hostname in the address field searches for its resolved address.
    if !filter.address.is_empty() && !filter.address.contains('/') {
        if let Ok(record) = resolve::resolve_host(&state, &filter.address).await {
            if record.persisted() {
                filter.address = record.address;
            }
        }
    }

    match state.store.search(&filter, &page) {
        Ok(results) => Json(results).into_response(),
        Err(e) => {
            error!("search failed: {e}");
            StatusCode::NOT_FOUND.into_response()
        }
    }
}

/// GET `/json/*host` — the legacy flattened schema.
pub(crate) async fn legacy_detail(
    State(state): State<AppState>,
    Extension(RemoteAddr(remote)): Extension<RemoteAddr>,
    headers: HeaderMap,
    path: Option<Path<String>>,
) -> Response {
    let host = host_param(path, remote);
    let record = match resolve::resolve_host(&state, &host).await {
        Ok(record) => record,
        Err(_) => return StatusCode::NOT_FOUND.into_response(),
    };
    let language = parse_accept_language(header(&headers, ACCEPT_LANGUAGE));
    let user_agent = parse_user_agent(header(&headers, USER_AGENT));
    Json(legacy_response(&record, language, user_agent)).into_response()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn host_param_normalizes() {
        let remote = "198.51.100.9".parse().unwrap();
        assert_eq!(host_param(Some(Path("/8.8.8.8".into())), remote), "8.8.8.8");
        assert_eq!(
            host_param(Some(Path("example.com?pretty".into())), remote),
            "example.com"
        );
        assert_eq!(host_param(None, remote), "198.51.100.9");
        assert_eq!(host_param(Some(Path("/".into())), remote), "198.51.100.9");
    }

    #[test]
    fn unknown_country_is_an_empty_record() {
        let response = country_response("ZZ");
        assert_eq!(response.name.common, "");
        assert!(response.tlds.is_empty());

        let response = country_response("de");
        assert_eq!(response.name.common, "Germany");
        assert!(response.eu_member);
        assert_eq!(response.codes.cca3, "DEU");
    }
}
