use relaycheck::stub::{dispatch, routes};
use serde_json::{json, Value};

#[test]
fn test_dispatch_echoes_body_after_hello_world() {
    let body = json!({"id": 7, "method": "hello", "params": ["China"]});

    let response = dispatch(Some(&body));

    assert_eq!(response["jsonrpc"], "2.0");
    assert_eq!(response["id"], 1);
    assert_eq!(
        response["result"],
        json!(format!("hello world {}", body))
    );
    assert!(response.get("error").is_none());
}

#[test]
fn test_dispatch_unknown_method_falls_through_to_echo() {
    let body = json!({"id": 1, "method": "no_such_method", "params": []});

    let response = dispatch(Some(&body));

    let result = response["result"].as_str().unwrap();
    assert!(result.starts_with("hello world "));
    assert!(result.contains("no_such_method"));
}

#[test]
fn test_dispatch_absent_body_echoes_null() {
    let response = dispatch(None);

    assert_eq!(response["id"], 1);
    assert_eq!(response["result"], json!("hello world null"));
}

#[test]
fn test_dispatch_random_stays_in_range_with_full_coverage() {
    let body = json!({"id": 1, "method": "random", "params": ["123"]});

    let mut low_seen = false;
    let mut high_seen = false;
    for _ in 0..5000 {
        let response = dispatch(Some(&body));
        let drawn: i64 = response["result"].as_str().unwrap().parse().unwrap();
        assert!((0..=10000).contains(&drawn), "out of range: {}", drawn);
        if drawn < 500 {
            low_seen = true;
        }
        if drawn > 9500 {
            high_seen = true;
        }
    }

    assert!(low_seen, "no draw below 500 in 5000 samples");
    assert!(high_seen, "no draw above 9500 in 5000 samples");
}

#[test]
fn test_dispatch_produces_result_xor_error() {
    for body in [
        Some(json!({"id": 1, "method": "random", "params": []})),
        Some(json!({"id": 1, "method": "hello", "params": ["x"]})),
        None,
    ] {
        let response = dispatch(body.as_ref());
        assert!(response.get("result").is_some());
        assert!(response.get("error").is_none());
    }
}

#[tokio::test]
async fn test_post_roundtrip_through_routes() {
    let filter = routes();
    let body = json!({"id": 3, "method": "hello", "params": ["China"]});

    let res = warp::test::request()
        .method("POST")
        .path("/")
        .json(&body)
        .reply(&filter)
        .await;

    assert_eq!(res.status(), 200);
    let envelope: Value = serde_json::from_slice(res.body()).unwrap();
    assert_eq!(envelope["jsonrpc"], "2.0");
    assert_eq!(envelope["id"], 1);
    assert_eq!(
        envelope["result"],
        json!(format!("hello world {}", body))
    );
}

#[tokio::test]
async fn test_get_is_tolerated() {
    let filter = routes();

    let res = warp::test::request()
        .method("GET")
        .path("/")
        .reply(&filter)
        .await;

    assert_eq!(res.status(), 200);
    let envelope: Value = serde_json::from_slice(res.body()).unwrap();
    assert_eq!(envelope["result"], json!("hello world null"));
}

#[tokio::test]
async fn test_unparseable_body_is_treated_as_absent() {
    let filter = routes();

    let res = warp::test::request()
        .method("POST")
        .path("/")
        .body("this is not json")
        .reply(&filter)
        .await;

    assert_eq!(res.status(), 200);
    let envelope: Value = serde_json::from_slice(res.body()).unwrap();
    assert_eq!(envelope["result"], json!("hello world null"));
}

#[tokio::test]
async fn test_random_over_http() {
    let filter = routes();

    let res = warp::test::request()
        .method("POST")
        .path("/")
        .json(&json!({"id": 1, "method": "random", "params": ["123"]}))
        .reply(&filter)
        .await;

    let envelope: Value = serde_json::from_slice(res.body()).unwrap();
    let drawn: i64 = envelope["result"].as_str().unwrap().parse().unwrap();
    assert!((0..=10000).contains(&drawn));
}
