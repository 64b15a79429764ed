//! The Twirp JSON error envelope: `{"code": string, "msg": string, "meta"?: {string: string}}`.

use std::collections::BTreeMap;

use bytes::Bytes;
use http::{header::CONTENT_TYPE, HeaderValue, StatusCode};

use crate::{
    error_codes::{code_to_http_status, code_to_status, status_to_code},
    serializer::CONTENT_TYPE_JSON,
    Status, TWIRP_STATUS_KEY,
};

#[derive(Debug, serde::Serialize)]
struct ErrorEnvelope<'a> {
    code: &'a str,
    msg: &'a str,
    #[serde(skip_serializing_if = "BTreeMap::is_empty")]
    meta: BTreeMap<&'a str, &'a str>,
}

/// The HTTP status and JSON body for a failed request.
///
/// The wire code is the `twirp_status` override when one is set, otherwise the code for the
/// status' abstract [`Code`](crate::Code). An empty message is replaced by the code.
pub fn encode_error(status: &Status) -> (StatusCode, Bytes) {
    let (code, http_status) = match status.twirp_code() {
        Some(code) => (code, code_to_http_status(code)),
        None => status_to_code(status.code()),
    };
    let meta = status
        .metadata()
        .iter()
        .filter(|(key, _)| key.as_str() != TWIRP_STATUS_KEY)
        .map(|(key, value)| (key.as_str(), value.as_str()))
        .collect();
    let msg = if status.message().is_empty() {
        code
    } else {
        status.message()
    };

    let envelope = ErrorEnvelope { code, msg, meta };
    match serde_json::to_vec(&envelope) {
        Ok(body) => (http_status, Bytes::from(body)),
        Err(e) => {
            // string maps always serialize
            log::error!("could not encode error envelope {envelope:?}: {e:?}");
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Bytes::from_static(br#"{"code":"internal","msg":"internal"}"#),
            )
        }
    }
}

/// Turn `response` into a Twirp error response for `status`.
///
/// Headers that are already on the response are kept.
pub fn write_error(status: &Status, response: &mut http::Response<Bytes>) {
    let (http_status, body) = encode_error(status);
    *response.status_mut() = http_status;
    response
        .headers_mut()
        .insert(CONTENT_TYPE, HeaderValue::from_static(CONTENT_TYPE_JSON));
    *response.body_mut() = body;
}

/// Decode the error carried by a non-success response.
///
/// A response that is not a well-formed envelope is itself an `Unavailable` error. A `meta`
/// that is not an object is ignored.
pub fn decode_error(response: &http::Response<Bytes>) -> Status {
    let content_type = response
        .headers()
        .get(CONTENT_TYPE)
        .and_then(|value| value.to_str().ok());
    if content_type != Some(CONTENT_TYPE_JSON) {
        log::debug!(
            "{} error response with content type {content_type:?}",
            response.status()
        );
        return Status::unavailable("Expected 'application/json' content type for error data");
    }

    let root: serde_json::Value = match serde_json::from_slice(response.body()) {
        Ok(root) => root,
        Err(e) => {
            log::debug!("malformed error response: {e:?}");
            return Status::unavailable("Received malformed JSON error response");
        }
    };

    let Some(code) = root.get("code").and_then(serde_json::Value::as_str) else {
        return Status::unavailable("Expected 'code' entry");
    };
    let Some(msg) = root.get("msg").and_then(serde_json::Value::as_str) else {
        return Status::unavailable("Expected 'msg' entry");
    };
    let mut status = Status::new(code_to_status(code), msg);

    match root.get("meta") {
        Some(serde_json::Value::Object(meta)) => {
            for (key, value) in meta {
                let Some(value) = value.as_str() else {
                    return Status::unavailable("Only strings are accepted as metadata");
                };
                status.set_metadata(key.as_str(), value);
            }
        }
        Some(meta) if !meta.is_null() => log::debug!("ignoring non-object error meta {meta}"),
        _ => (),
    }

    status
}

#[cfg(test)]
mod test {
    use bytes::Bytes;
    use http::{header::CONTENT_TYPE, StatusCode};

    use super::{decode_error, encode_error, write_error};
    use crate::{Code, Status};

    fn error_response(content_type: &str, body: &'static str) -> http::Response<Bytes> {
        http::Response::builder()
            .status(StatusCode::BAD_REQUEST)
            .header(CONTENT_TYPE, content_type)
            .body(Bytes::from_static(body.as_bytes()))
            .expect("valid response")
    }

    #[track_caller]
    fn assert_unavailable(expected_message: &str, status: Status) {
        assert_eq!(Code::Unavailable, status.code());
        assert_eq!(expected_message, status.message());
    }

    #[test]
    fn encode_with_metadata() {
        let status = Status::data_loss("the disk ate it")
            .with_metadata("details", "a long explanation");
        let (http_status, body) = encode_error(&status);
        assert_eq!(StatusCode::INTERNAL_SERVER_ERROR, http_status);
        assert_eq!(
            r#"{"code":"dataloss","msg":"the disk ate it","meta":{"details":"a long explanation"}}"#,
            std::str::from_utf8(&body).expect("utf8")
        );
    }

    #[test]
    fn encode_override_code() {
        let status = Status::malformed("Unknown message encoding").with_metadata("hint", "json");
        let (http_status, body) = encode_error(&status);
        assert_eq!(StatusCode::BAD_REQUEST, http_status);
        assert_eq!(
            r#"{"code":"malformed","msg":"Unknown message encoding","meta":{"hint":"json"}}"#,
            std::str::from_utf8(&body).expect("utf8")
        );

        let (http_status, _) = encode_error(&Status::bad_route("Method not found"));
        assert_eq!(StatusCode::NOT_FOUND, http_status);
    }

    #[test]
    fn empty_message_uses_the_code() {
        let (http_status, body) = encode_error(&Status::new(Code::PermissionDenied, ""));
        assert_eq!(StatusCode::FORBIDDEN, http_status);
        assert_eq!(
            r#"{"code":"permission_denied","msg":"permission_denied"}"#,
            std::str::from_utf8(&body).expect("utf8")
        );
    }

    #[test]
    fn write_keeps_existing_headers() {
        let mut response = http::Response::new(Bytes::new());
        response
            .headers_mut()
            .insert("x-request-id", "abc".parse().expect("header value"));
        write_error(&Status::unauthenticated("who are you"), &mut response);

        assert_eq!(StatusCode::UNAUTHORIZED, response.status());
        assert_eq!("application/json", response.headers()[CONTENT_TYPE]);
        assert_eq!("abc", response.headers()["x-request-id"]);

        let decoded = decode_error(&response);
        assert_eq!(Status::unauthenticated("who are you"), decoded);
    }

    #[test]
    fn decode_round_trip() {
        let status = Status::data_loss("the disk ate it")
            .with_metadata("details", "a long explanation")
            .with_metadata("shard", "7");
        let mut response = http::Response::new(Bytes::new());
        write_error(&status, &mut response);
        assert_eq!(status, decode_error(&response));
    }

    #[test]
    fn decode_unknown_code() {
        let status = decode_error(&error_response(
            "application/json",
            r#"{"code":"what","msg":"hm"}"#,
        ));
        assert_eq!(Code::Unknown, status.code());
        assert_eq!("hm", status.message());
    }

    #[test]
    fn decode_internal_codes() {
        let status = decode_error(&error_response(
            "application/json",
            r#"{"code":"bad_route","msg":"Method not found"}"#,
        ));
        assert_eq!(Code::Unimplemented, status.code());
        assert!(status.metadata().is_empty());
    }

    #[test]
    fn decode_rejects_bad_envelopes() {
        assert_unavailable(
            "Expected 'application/json' content type for error data",
            decode_error(&error_response("text/plain", r#"{"code":"internal","msg":"x"}"#)),
        );
        assert_unavailable(
            "Received malformed JSON error response",
            decode_error(&error_response("application/json", "<html>")),
        );
        assert_unavailable(
            "Expected 'code' entry",
            decode_error(&error_response("application/json", r#"{"msg":"x"}"#)),
        );
        assert_unavailable(
            "Expected 'code' entry",
            decode_error(&error_response("application/json", r#"{"code":5,"msg":"x"}"#)),
        );
        assert_unavailable(
            "Expected 'msg' entry",
            decode_error(&error_response("application/json", r#"{"code":"internal"}"#)),
        );
        assert_unavailable(
            "Only strings are accepted as metadata",
            decode_error(&error_response(
                "application/json",
                r#"{"code":"internal","msg":"x","meta":{"someKey":12}}"#,
            )),
        );
    }

    #[test]
    fn non_object_meta_is_ignored() {
        for body in [
            r#"{"code":"not_found","msg":"gone","meta":"oops"}"#,
            r#"{"code":"not_found","msg":"gone","meta":["a"]}"#,
            r#"{"code":"not_found","msg":"gone","meta":7}"#,
        ] {
            let status = decode_error(&error_response("application/json", body));
            assert_eq!(Status::not_found("gone"), status, "{body}");
        }
    }

    #[test]
    fn unknown_override_code_is_sent_as_500() {
        let status = Status::not_found("no such note").with_twirp_code("not_a_code");
        let (http_status, body) = encode_error(&status);
        assert_eq!(StatusCode::INTERNAL_SERVER_ERROR, http_status);
        assert_eq!(
            r#"{"code":"not_a_code","msg":"no such note"}"#,
            std::str::from_utf8(&body).expect("utf8")
        );
    }

    #[test]
    fn decode_null_meta() {
        let status = decode_error(&error_response(
            "application/json",
            r#"{"code":"not_found","msg":"x","meta":null}"#,
        ));
        assert_eq!(Status::not_found("x"), status);
    }
}
