mod support;
use support::transport::{self, Reply};

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use dispatchr::{Body, Client, Code, Config, Method, Notifier, RawResponse, ResponseType};
use serde_json::{json, Value};

#[tokio::test]
async fn get_returns_parsed_json() {
    let _ = env_logger::try_init();

    let stub = transport::scripted(|_| Reply::json(200, r#"{"id":1,"name":"Fred"}"#));
    let client = Client::new(stub.clone());

    let res = client.get("/user").send().await.unwrap();

    assert_eq!(res.status(), 200);
    assert_eq!(res.headers().get("content-type"), Some("application/json"));
    assert_eq!(res.data(), Some(&Body::Json(json!({ "id": 1, "name": "Fred" }))));
    assert_eq!(res.json::<Value>().unwrap()["name"], "Fred");
    assert_eq!(res.config().url(), "/user");

    let req = stub.last();
    assert_eq!(req.method, Some(Method::GET));
    assert_eq!(req.url, "/user");
    assert_eq!(req.header("Accept"), Some("application/json, text/plain, */*"));
    assert_eq!(req.header("Content-Type"), None);
    assert_eq!(req.body, None);
}

#[tokio::test]
async fn text_body_that_is_not_json_stays_text() {
    let _ = env_logger::try_init();

    let stub = transport::scripted(|_| Reply::ok("hello"));
    let client = Client::new(stub);

    let res = client.get("/hello").send().await.unwrap();
    assert_eq!(res.status_text(), "OK");
    assert_eq!(res.data(), Some(&Body::Text("hello".into())));
}

#[tokio::test]
async fn post_json_is_serialized_with_content_type() {
    let _ = env_logger::try_init();

    let stub = transport::scripted(|_| Reply::status(201));
    let client = Client::new(stub.clone());

    let res = client
        .post("/users")
        .json(&json!({ "name": "Fred" }))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), 201);
    assert_eq!(res.data(), None);

    let req = stub.last();
    assert_eq!(req.method, Some(Method::POST));
    assert_eq!(req.header("Content-Type"), Some("application/json;charset=utf-8"));
    assert_eq!(req.body, Some(Body::Text(r#"{"name":"Fred"}"#.into())));
}

#[tokio::test]
async fn post_text_keeps_form_default() {
    let _ = env_logger::try_init();

    let stub = transport::scripted(|_| Reply::status(200));
    let client = Client::new(stub.clone());

    client.post("/form").body("a=1&b=2").send().await.unwrap();

    let req = stub.last();
    assert_eq!(
        req.header("content-type"),
        Some("application/x-www-form-urlencoded")
    );
    assert_eq!(req.body, Some(Body::Text("a=1&b=2".into())));
}

#[tokio::test]
async fn params_are_appended_to_url() {
    let _ = env_logger::try_init();

    let stub = transport::scripted(|_| Reply::status(200));
    let client = Client::new(stub.clone());

    client
        .dispatch(
            Config::new()
                .url("/items?a=1#frag")
                .param("b", json!([2, 3]))
                .param("q", "x y")
                .param("skip", Value::Null),
        )
        .await
        .unwrap();

    assert_eq!(stub.last().url, "/items?a=1&b=2&b=3&q=x+y");
}

#[tokio::test]
async fn rejected_status_carries_response() {
    let _ = env_logger::try_init();

    let stub = transport::scripted(|_| Reply::json(404, r#"{"error":"missing"}"#));
    let client = Client::new(stub);

    let err = client.get("/missing").send().await.unwrap_err();

    assert!(err.is_status());
    assert_eq!(err.code(), Code::Status);
    assert_eq!(err.status(), Some(404));
    assert_eq!(err.message(), "Request failed with status code 404");
    assert_eq!(err.config().map(|c| c.url()), Some("/missing"));

    let res = err.into_response().unwrap();
    assert_eq!(res.json::<Value>(), Some(json!({ "error": "missing" })));
}

#[tokio::test]
async fn custom_validate_status() {
    let _ = env_logger::try_init();

    let stub = transport::scripted(|_| Reply::status(404));
    let client = Client::new(stub);

    let res = client
        .get("/missing")
        .validate_status(|status| status < 500)
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), 404);
}

#[tokio::test]
async fn custom_validate_status_can_reject() {
    let _ = env_logger::try_init();

    let stub = transport::scripted(|_| Reply::status(500));
    let client = Client::new(stub);

    let err = client
        .get("/boom")
        .validate_status(|status| status != 500)
        .send()
        .await
        .unwrap_err();

    assert!(err.is_status());
    assert_eq!(err.status(), Some(500));
    assert_eq!(err.message(), "Request failed with status code 500");
    assert_eq!(err.response().map(|res| res.status()), Some(500));
}

#[tokio::test]
async fn network_error_has_no_response() {
    let _ = env_logger::try_init();

    let stub = transport::scripted(|_| Reply::Fail);
    let client = Client::new(stub);

    let err = client.get("/down").send().await.unwrap_err();

    assert!(err.is_network());
    assert_eq!(err.code().as_str(), "ERR_NETWORK");
    assert_eq!(err.message(), "Network Error");
    assert!(err.response().is_none());
    assert_eq!(err.config().map(|c| c.url()), Some("/down"));
}

#[tokio::test]
async fn dropped_notifier_is_network_error() {
    let _ = env_logger::try_init();

    let stub = transport::scripted(|_| Reply::Drop);
    let client = Client::new(stub);

    let err = client.get("/gone").send().await.unwrap_err();
    assert!(err.is_network());
    assert!(std::error::Error::source(&err).is_some());
}

#[tokio::test]
async fn missing_url_never_reaches_transport() {
    let _ = env_logger::try_init();

    let stub = transport::scripted(|_| Reply::status(200));
    let client = Client::new(stub.clone());

    let err = client.dispatch(Config::new()).await.unwrap_err();

    assert!(err.is_config());
    assert_eq!(err.code().as_str(), "ERR_BAD_OPTION");
    assert_eq!(stub.connects(), 0);
}

#[tokio::test]
async fn unsupported_method_is_config_error() {
    let _ = env_logger::try_init();

    let stub = transport::scripted(|_| Reply::status(200));
    let client = Client::new(stub.clone());

    let purge = Method::from_bytes(b"PURGE").unwrap();
    let err = client.request(purge, "/cache").send().await.unwrap_err();

    assert!(err.is_config());
    assert_eq!(stub.connects(), 0);
}

#[tokio::test]
async fn basic_auth_header() {
    let _ = env_logger::try_init();

    let stub = transport::scripted(|_| Reply::status(200));
    let client = Client::new(stub.clone());

    client
        .get("/secret")
        .basic_auth("Aladdin", "open sesame")
        .send()
        .await
        .unwrap();

    assert_eq!(
        stub.last().header("authorization"),
        Some("Basic QWxhZGRpbjpvcGVuIHNlc2FtZQ==")
    );
}

#[tokio::test]
async fn invalid_headers_are_dropped() {
    let _ = env_logger::try_init();

    let stub = transport::scripted(|_| Reply::status(200));
    let client = Client::new(stub.clone());

    client
        .get("/x")
        .header("X-Good", "yes")
        .header("Bad Name", "no")
        .header("X-Bad-Value", "line\nbreak")
        .send()
        .await
        .unwrap();

    let req = stub.last();
    assert_eq!(req.header("x-good"), Some("yes"));
    assert_eq!(req.header("Bad Name"), None);
    assert_eq!(req.header("X-Bad-Value"), None);
}

#[tokio::test]
async fn instance_config_layers_between_defaults_and_call() {
    let _ = env_logger::try_init();

    let stub = transport::scripted(|_| Reply::status(200));
    let client = Client::builder()
        .transport(stub.clone())
        .config(
            Config::new()
                .header("X-Instance", "1")
                .method_header(Method::PUT, "X-Put-Only", "yes")
                .param("token", "abc"),
        )
        .build()
        .unwrap();

    client.put("/things/1").body("x").param("v", 2).send().await.unwrap();
    client.get("/things/1").send().await.unwrap();

    let reqs = stub.requests();
    assert_eq!(reqs[0].url, "/things/1?token=abc&v=2");
    assert_eq!(reqs[0].header("x-instance"), Some("1"));
    assert_eq!(reqs[0].header("x-put-only"), Some("yes"));
    assert_eq!(reqs[1].url, "/things/1?token=abc");
    assert_eq!(reqs[1].header("x-put-only"), None);
}

#[tokio::test]
async fn options_reach_transport() {
    let _ = env_logger::try_init();

    let stub = transport::scripted(|_| Reply::Respond(RawResponse::new(200).body(vec![0u8, 159])));
    let client = Client::new(stub.clone());

    let res = client
        .get("/blob")
        .response_type(ResponseType::Bytes)
        .with_credentials(true)
        .send()
        .await
        .unwrap();

    assert_eq!(res.data().and_then(Body::as_bytes), Some(&[0u8, 159][..]));

    let options = stub.last().options.unwrap();
    assert_eq!(options.response_type, ResponseType::Bytes);
    assert!(options.with_credentials);
    assert_eq!(options.timeout, None);
}

#[tokio::test]
async fn progress_is_reported_until_settled() {
    let _ = env_logger::try_init();

    let stub = transport::scripted(|_| {
        Reply::With(Box::new(|notifier: Notifier| {
            notifier.upload_progress(3, Some(3));
            notifier.download_progress(5, Some(10));
            notifier.download_progress(10, Some(10));
            notifier.complete(RawResponse::new(200));
            notifier.download_progress(99, Some(10));
        }))
    });
    let client = Client::new(stub);

    let uploaded = Arc::new(AtomicU64::new(0));
    let downloaded = Arc::new(AtomicU64::new(0));
    let (up, down) = (uploaded.clone(), downloaded.clone());

    client
        .post("/upload")
        .body("abc")
        .on_upload_progress(move |p| up.store(p.loaded, Ordering::SeqCst))
        .on_download_progress(move |p| down.store(p.loaded, Ordering::SeqCst))
        .send()
        .await
        .unwrap();

    assert_eq!(uploaded.load(Ordering::SeqCst), 3);
    assert_eq!(downloaded.load(Ordering::SeqCst), 10);
}

#[tokio::test]
async fn custom_transforms_see_headers() {
    let _ = env_logger::try_init();

    let stub = transport::scripted(|_| {
        Reply::Respond(
            RawResponse::new(200)
                .headers("X-Shout: yes\r\n")
                .body("quiet"),
        )
    });
    let client = Client::new(stub.clone());

    let shout = dispatchr::transform::transformer(|data, headers| match data {
        Some(Body::Text(text)) if headers.get("x-shout").is_some() => {
            Some(Body::Text(text.to_uppercase()))
        }
        other => other,
    });
    let tag = dispatchr::transform::transformer(|data, _| match data {
        Some(Body::Text(text)) => Some(Body::Text(format!("tagged:{text}"))),
        other => other,
    });

    let res = client
        .post("/echo")
        .body("payload")
        .transform_request(vec![tag])
        .transform_response(vec![shout])
        .send()
        .await
        .unwrap();

    assert_eq!(stub.last().body, Some(Body::Text("tagged:payload".into())));
    assert_eq!(res.data(), Some(&Body::Text("QUIET".into())));
}

#[tokio::test]
async fn multipart_form_leaves_content_type_to_transport() {
    let _ = env_logger::try_init();

    let stub = transport::scripted(|_| Reply::status(200));
    let client = Client::new(stub.clone());

    let form = dispatchr::multipart::Form::new().text("name", "Fred");
    client.post("/upload").multipart(form).send().await.unwrap();

    let req = stub.last();
    assert_eq!(req.header("content-type"), None);
    assert!(req.body.as_ref().map_or(false, Body::is_form));
}
