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

//! The HTTP surface of the service.
//!
//! Routes read from the store, enqueue ingests on misses, and apply a
//! per-visitor token bucket on the host-resolving paths. The plaintext and
//! TLS listeners run the same router; when both addresses are configured,
//! both run.

use std::net::{IpAddr, SocketAddr};
use std::path::PathBuf;
use std::pin::Pin;
use std::sync::{Arc, RwLock};
use std::time::Duration;

use axum::http::StatusCode;
use axum::middleware::{self, Next};
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Extension, Router};
use http::{HeaderValue, Method, Request};
use hyper::server::conn::Http;
use openssl::ssl::{Ssl, SslAcceptor, SslFiletype, SslMethod};
use tokio::net::TcpListener;
use tokio::sync::watch;
use tokio_openssl::SslStream;
use tracing::{debug, info, warn};

use geoip_ingest::Ingestor;
use geoip_store::{Statistics, Store};
use tower_http::cors::{AllowOrigin, Any, CorsLayer};

mod api;
pub mod language;
pub mod legacy;
mod rate_limit;
mod resolve;
pub mod useragent;

pub use rate_limit::{RateLimitConfig, RateLimiter};

/// Shared state behind every handler.
#[derive(Clone)]
pub struct AppState {
    pub store: Store,
    pub ingestor: Arc<Ingestor>,
    pub statistics: Arc<RwLock<Statistics>>,
    pub rate_limiter: Arc<RateLimiter>,
}

/// The peer address of the accepted connection, attached per connection as
/// an extension.
#[derive(Debug, Clone, Copy)]
pub struct RemoteAddr(pub IpAddr);

/// Listener configuration.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub listen_addr: Option<SocketAddr>,
    pub tls: Option<TlsServerConfig>,
    /// Mount point for every route, `/` by default.
    pub api_prefix: String,
    /// Comma-separated allowed CORS origins; `*` allows any.
    pub cors_origin: String,
}

/// The TLS listener's address and key material.
#[derive(Debug, Clone)]
pub struct TlsServerConfig {
    pub listen_addr: SocketAddr,
    pub cert: PathBuf,
    pub key: PathBuf,
}

#[derive(Debug, thiserror::Error)]
pub enum ServeError {
    #[error("binding {addr}: {source}")]
    Bind {
        addr: SocketAddr,
        #[source]
        source: std::io::Error,
    },
    #[error("tls setup: {0}")]
    Tls(#[from] openssl::error::ErrorStack),
    #[error("no listen address configured")]
    NoListeners,
}

/// A running server. Dropping the handle leaves the listeners running; call
/// [`Server::stop`] to close them.
pub struct Server {
    local_addrs: Vec<SocketAddr>,
    shutdown: watch::Sender<bool>,
}

impl Server {
    pub fn local_addrs(&self) -> &[SocketAddr] {
        &self.local_addrs
    }

    /// Closes the listeners. Requests already executing complete normally.
    pub fn stop(&self) {
        let _ = self.shutdown.send(true);
    }
}

/// Binds the configured listeners and starts serving.
pub async fn serve(config: ServerConfig, state: AppState) -> Result<Server, ServeError> {
    if config.listen_addr.is_none() && config.tls.is_none() {
        return Err(ServeError::NoListeners);
    }

    let app = router(&config.api_prefix, &config.cors_origin, state.clone());
    let (shutdown, _) = watch::channel(false);
    let mut local_addrs = Vec::new();

    if let Some(addr) = config.listen_addr {
        let listener = bind(addr).await?;
        local_addrs.push(listener.local_addr().map_err(|source| ServeError::Bind {
            addr,
            source,
        })?);
        info!("http server listening on http://{addr}");
        tokio::spawn(serve_listener(
            listener,
            None,
            app.clone(),
            shutdown.subscribe(),
        ));
    }

    if let Some(tls) = &config.tls {
        let acceptor = build_tls_acceptor(&tls.cert, &tls.key)?;
        let listener = bind(tls.listen_addr).await?;
        local_addrs.push(listener.local_addr().map_err(|source| ServeError::Bind {
            addr: tls.listen_addr,
            source,
        })?);
        info!("https server listening on https://{}", tls.listen_addr);
        tokio::spawn(serve_listener(
            listener,
            Some(acceptor),
            app,
            shutdown.subscribe(),
        ));
    }

    // Visitor buckets idle past the expiry window go away on a minute tick.
    {
        let rate_limiter = Arc::clone(&state.rate_limiter);
        let mut shutdown = shutdown.subscribe();
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(Duration::from_secs(60));
            loop {
                tokio::select! {
                    _ = ticker.tick() => rate_limiter.sweep(),
                    _ = shutdown.changed() => return,
                }
            }
        });
    }

    Ok(Server {
        local_addrs,
        shutdown,
    })
}

async fn bind(addr: SocketAddr) -> Result<TcpListener, ServeError> {
    TcpListener::bind(addr)
        .await
        .map_err(|source| ServeError::Bind { addr, source })
}

/// Builds the full route table. The host-resolving routes sit behind the
/// rate limiter; the pure helpers do not.
pub fn router(prefix: &str, cors_origin: &str, state: AppState) -> Router {
    let limited = Router::new()
        .route("/api/detail", get(api::detail))
        .route("/api/detail/*host", get(api::detail))
        .route("/api/me", get(api::me))
        .route("/json", get(api::legacy_detail))
        .route("/json/*host", get(api::legacy_detail))
        .route_layer(middleware::from_fn_with_state(
            state.clone(),
            rate_limit_middleware,
        ));

    let open = Router::new()
        .route("/api/country", get(api::country))
        .route("/api/country/*code", get(api::country))
        .route("/api/useragent", get(api::useragent))
        .route("/api/language", get(api::language))
        .route("/api/statistic", get(api::statistic))
        .route("/api/search", post(api::search));

    let app = limited
        .merge(open)
        .layer(cors_layer(cors_origin))
        .with_state(state);

    match prefix {
        "" | "/" => app,
        prefix => Router::new().nest(prefix, app),
    }
}

async fn rate_limit_middleware<B>(
    axum::extract::State(state): axum::extract::State<AppState>,
    Extension(RemoteAddr(remote)): Extension<RemoteAddr>,
    request: Request<B>,
    next: Next<B>,
) -> Response {
    if state.rate_limiter.check(remote) {
        next.run(request).await
    } else {
        StatusCode::TOO_MANY_REQUESTS.into_response()
    }
}

/// Allows any origin when the configuration names `*`, otherwise the exact
/// configured list.
fn cors_layer(origins: &str) -> CorsLayer {
    let list: Vec<HeaderValue> = origins
        .split(',')
        .map(str::trim)
        .filter(|origin| !origin.is_empty())
        .filter_map(|origin| origin.parse().ok())
        .collect();
    let allow = if list.iter().any(|origin| origin.as_bytes() == b"*") {
        AllowOrigin::any()
    } else {
        AllowOrigin::list(list)
    };
    CorsLayer::new()
        .allow_origin(allow)
        .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
        .allow_headers(Any)
}

/// Accepts connections and serves each on its own task with the peer
/// address attached. With an acceptor, the TLS handshake happens on the
/// connection task so a slow peer cannot stall the accept loop.
async fn serve_listener(
    listener: TcpListener,
    acceptor: Option<SslAcceptor>,
    app: Router,
    mut shutdown: watch::Receiver<bool>,
) {
    loop {
        tokio::select! {
            accepted = listener.accept() => {
                let (stream, peer) = match accepted {
                    Ok(accepted) => accepted,
                    Err(e) => {
                        warn!("accept failed: {e}");
                        continue;
                    }
                };
                let svc = app.clone().layer(Extension(RemoteAddr(peer.ip())));
                match acceptor.clone() {
                    None => {
                        tokio::spawn(async move {
                            if let Err(e) = Http::new().serve_connection(stream, svc).await {
                                debug!("connection from {peer}: {e}");
                            }
                        });
                    }
                    Some(acceptor) => {
                        tokio::spawn(async move {
                            let ssl = match Ssl::new(acceptor.context()) {
                                Ok(ssl) => ssl,
                                Err(e) => {
                                    debug!("tls context for {peer}: {e}");
                                    return;
                                }
                            };
                            let mut tls = match SslStream::new(ssl, stream) {
                                Ok(tls) => tls,
                                Err(e) => {
                                    debug!("tls stream for {peer}: {e}");
                                    return;
                                }
                            };
                            if let Err(e) = Pin::new(&mut tls).accept().await {
                                debug!("tls handshake with {peer}: {e}");
                                return;
                            }
                            if let Err(e) = Http::new().serve_connection(tls, svc).await {
                                debug!("connection from {peer}: {e}");
                            }
                        });
                    }
                }
            }
            _ = shutdown.changed() => return,
        }
    }
}

/// The Mozilla intermediate preset is compatible with every client released
/// in the last several years without known-problematic ciphers.
fn build_tls_acceptor(cert: &std::path::Path, key: &std::path::Path) -> Result<SslAcceptor, ServeError> {
    let mut builder = SslAcceptor::mozilla_intermediate_v5(SslMethod::tls())?;
    builder.set_certificate_chain_file(cert)?;
    builder.set_private_key_file(key, SslFiletype::PEM)?;
    Ok(builder.build())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cors_star_allows_any_origin() {
        // Smoke-test that the layer builds for both configurations.
        let _ = cors_layer("*");
        let _ = cors_layer("https://example.com, https://other.example");
        let _ = cors_layer("");
    }
}
