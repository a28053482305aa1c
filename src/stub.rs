use rand::Rng;
use serde_json::{json, Value};
use warp::hyper::body::Bytes;
use warp::Filter;

pub const DEFAULT_PORT: u16 = 5003;

/// Build the response envelope for one request body. `None` stands for an
/// absent or unparseable body, which echoes back as `null`.
pub fn dispatch(body: Option<&Value>) -> Value {
    let method = body.and_then(|b| b.get("method")).and_then(Value::as_str);

    match method {
        Some("random") => {
            let drawn: u32 = rand::thread_rng().gen_range(0..=10000);
            json!({
                "jsonrpc": "2.0",
                "id": 1,
                "result": drawn.to_string(),
            })
        }
        _ => json!({
            "jsonrpc": "2.0",
            "id": 1,
            "result": format!("hello world {}", body.cloned().unwrap_or(Value::Null)),
        }),
    }
}

/// Single `/` endpoint, POST primary and GET tolerated. The body is parsed
/// leniently; whatever does not parse as JSON is handled as an absent body.
pub fn routes() -> impl Filter<Extract = impl warp::Reply, Error = warp::Rejection> + Clone {
    warp::path::end()
        .and(warp::post().or(warp::get()).unify())
        .and(warp::body::bytes())
        .map(|body: Bytes| {
            let parsed = serde_json::from_slice::<Value>(&body).ok();
            tracing::info!(
                "api call hit, method {:?}",
                parsed.as_ref().and_then(|b| b.get("method"))
            );
            warp::reply::json(&dispatch(parsed.as_ref()))
        })
}

pub async fn serve(port: u16) {
    tracing::info!("stub rpc server listening at 127.0.0.1:{}", port);
    warp::serve(routes()).run(([127, 0, 0, 1], port)).await;
}
