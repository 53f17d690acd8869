use std::sync::Arc;

use log::{debug, trace};

use crate::client::ClientRef;
use crate::config::{self, Config, RequestConfig};
use crate::error;
use crate::header::{self, Headers, AUTHORIZATION};
use crate::interceptor;
use crate::response::Response;
use crate::transform;
use crate::transport::{Notifier, Options, Settled};
use crate::util;

/// Run one request through the whole pipeline.
///
/// Config errors are returned as is. Everything after resolution, including
/// request interceptor failures, goes through the response chain so its
/// rejection handlers can recover.
pub(crate) async fn dispatch(client: Arc<ClientRef>, call: Config) -> crate::Result<Response> {
    let config = config::resolve(&client.defaults, &client.instance, &call)?;

    let request_chain = client.interceptors.request.snapshot();
    let response_chain = client.interceptors.response.snapshot();

    let outcome = match interceptor::run(request_chain.iter().rev(), Ok(config)).await {
        Ok(config) => send(&client, config).await,
        Err(err) => Err(err),
    };

    interceptor::run(response_chain.iter(), outcome).await
}

async fn send(client: &ClientRef, config: RequestConfig) -> crate::Result<Response> {
    // request interceptors may have rewritten the url or method
    config::validate(config.url(), config.method())?;

    let token = config.cancel_token().cloned();
    if let Some(reason) = token.as_ref().and_then(|t| t.reason()) {
        debug!("{} {} cancelled before send", config.method(), config.url());
        return Err(error::cancelled(reason));
    }

    let mut headers = request_headers(client, &config);
    let data = transform::apply(config.data().cloned(), &headers, &config.transform_request);
    header::strip_content_type(&mut headers, data.as_ref());
    let headers = header::sanitize(headers);

    debug!("{} {}", config.method(), config.url());

    let mut conn = client.transport.connect();
    conn.open(config.method(), config.url());
    for (name, value) in headers.iter() {
        conn.set_request_header(name, value);
    }
    conn.configure(&Options {
        response_type: config.response_type(),
        timeout: config.timeout(),
        with_credentials: config.with_credentials(),
    });

    let (notifier, rx) = Notifier::new(
        config.on_upload_progress.clone(),
        config.on_download_progress.clone(),
    );

    if let Some(ref token) = token {
        let canceller = notifier.downgrade();
        token.on_settle(move |reason| {
            canceller.settle(Settled::Cancelled(reason.clone()));
        });
    }

    // the token may have fired between the check above and registration
    let sent = !notifier.is_closed();
    if sent {
        conn.send(data, notifier);
    }

    let settled = match rx.await {
        Ok(settled) => settled,
        Err(_) => {
            let handle = conn.handle();
            return Err(error::dropped(config, handle));
        }
    };

    match settled {
        Settled::Complete(raw) => {
            let handle = raw.handle.or_else(|| conn.handle());
            let headers = header::parse_headers(&raw.headers);
            let data = config.response_type().shape(raw.body);
            let data = transform::apply(data, &headers, &config.transform_response);
            let valid = config.validate_status(raw.status);

            debug!("response {} for {}", raw.status, config.url());

            let response = Response::new(data, raw.status, raw.status_text, headers, config, handle);
            if valid {
                Ok(response)
            } else {
                Err(error::status(response))
            }
        }
        Settled::Error => {
            debug!("network error for {}", config.url());
            let handle = conn.handle();
            Err(error::network(config, handle))
        }
        Settled::Timeout => {
            debug!("timeout for {}", config.url());
            let handle = conn.handle();
            Err(error::timeout(config, handle))
        }
        Settled::Cancelled(reason) => {
            debug!("{} {} cancelled: {}", config.method(), config.url(), reason);
            if sent {
                conn.abort();
            }
            Err(error::cancelled(reason))
        }
    }
}

/// The resolved headers plus the ones derived at send time.
fn request_headers(client: &ClientRef, config: &RequestConfig) -> Headers {
    let mut headers = config.headers().clone();

    if let Some(auth) = config.auth() {
        headers.insert(
            AUTHORIZATION,
            util::basic_auth(auth.username(), Some(auth.password())),
        );
    }

    if let Some(token) = xsrf_token(client, config) {
        if let Some(name) = config.xsrf_header_name() {
            trace!("adding xsrf header {name}");
            headers.insert(name, token);
        }
    }

    headers
}

fn xsrf_token(client: &ClientRef, config: &RequestConfig) -> Option<String> {
    let store = client.cookie_store.as_ref()?;
    let cookie = config.xsrf_cookie_name()?;

    let allowed = config.with_credentials()
        || client
            .origin
            .as_ref()
            .map_or(false, |policy| policy.is_same_origin(config.url()));

    if allowed {
        store.read(cookie)
    } else {
        None
    }
}
