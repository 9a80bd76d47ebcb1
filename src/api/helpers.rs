//! Response builders for payloads returned straight to the platform, without
//! passing through an application router.

use serde_json::{Value, json};

/// Returns a JSON response with the given status code and body.
#[must_use]
pub fn json_response(status_code: u16, body: &Value) -> Value {
    json!({
        "statusCode": status_code,
        "headers": { "content-type": "application/json" },
        "body": body.to_string(),
        "isBase64Encoded": false
    })
}

/// Returns an error response with the given status code and message.
#[must_use]
pub fn err_response(status_code: u16, message: &str) -> Value {
    json_response(status_code, &json!({ "error": message }))
}
