use axum::body;
use axum::response::IntoResponse;
use serde::Deserialize;
use serde::de::DeserializeOwned;

/// Used in tests to both extract the raw bytes from the HTTP response body and then deserialize them into the
/// requested type. Will panic and fail the test if either step fails somehow.
pub async fn deserialize_body<T: DeserializeOwned>(response_body: body::Body) -> T {
    let bytes = body::to_bytes(response_body, usize::MAX)
        .await
        .expect("Could not read data from response body!");

    serde_json::from_slice(&bytes).unwrap_or_else(|err| {
        panic!(
            "Could not parse body content into data structure! Error: {}, Received body: {:?}",
            err, bytes
        )
    })
}

/// Client-side view of the success envelope
#[derive(Deserialize, Debug)]
#[serde(rename_all = "camelCase")]
pub struct SuccessBody<T> {
    pub status_code: u16,
    pub message: String,
    pub data: T,
}

/// Client-side view of an error response. Extra info is left loosely typed since its
/// shape depends on the kind of failure.
#[derive(Deserialize, Debug)]
#[serde(rename_all = "camelCase")]
pub struct ErrorBody {
    pub status_code: u16,
    pub error: String,
    pub message: String,
    pub extra_info: Option<serde_json::Value>,
}

/// Turns a handler's result into a response and asserts on its status, returning the
/// deserialized success payload
pub async fn expect_success<T: DeserializeOwned>(
    result: impl IntoResponse,
    expected_status: axum::http::StatusCode,
) -> T {
    let response = result.into_response();
    assert_eq!(expected_status, response.status());

    let body: SuccessBody<T> = deserialize_body(response.into_body()).await;
    assert_eq!(expected_status.as_u16(), body.status_code);
    body.data
}

/// Turns a handler's result into a response and asserts on its status, returning the
/// deserialized error body
pub async fn expect_error(
    result: impl IntoResponse,
    expected_status: axum::http::StatusCode,
) -> ErrorBody {
    let response = result.into_response();
    assert_eq!(expected_status, response.status());

    deserialize_body(response.into_body()).await
}
