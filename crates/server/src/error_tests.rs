// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::ApiError;

#[yare::parameterized(
    unauthorized = { ApiError::Unauthorized, 401, "UNAUTHORIZED" },
    forbidden = { ApiError::Forbidden, 403, "FORBIDDEN" },
    bad_request = { ApiError::BadRequest, 400, "BAD_REQUEST" },
    not_found = { ApiError::NotFound, 404, "NOT_FOUND" },
    internal = { ApiError::Internal, 500, "INTERNAL" },
)]
fn status_and_code(err: ApiError, status: u16, code: &str) {
    assert_eq!(err.http_status(), status);
    assert_eq!(err.as_str(), code);
    assert_eq!(err.to_string(), code);
}

#[test]
fn error_body_round_trips() -> anyhow::Result<()> {
    let body = ApiError::Forbidden.to_error_body("not your segment");
    let json = serde_json::to_string(&body)?;
    assert!(json.contains("\"FORBIDDEN\""));
    assert!(json.contains("not your segment"));
    Ok(())
}
