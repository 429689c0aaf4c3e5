//! Nudm test-control handlers
//!
//! - `GET /nudm-tc/v1/supi`            subscriber identity
//! - `GET /nudm-tc/v1/testcases`       whole script
//! - `GET /nudm-tc/v1/testcases/{id}`  one testcase

use smc_sbi::{
    send_bad_request, send_error, send_method_not_allowed, send_not_found, SbiRequest, SbiResponse,
};
use smc_testcase::TestcaseConfig;

/// Service name
pub const NUDM_TC: &str = "nudm-tc";

/// Route a request against the loaded script
pub fn udm_sbi_request_handler(script: &TestcaseConfig, request: &SbiRequest) -> SbiResponse {
    let method = request.header.method.as_str();
    let parts = request.header.path_segments();

    log::debug!("UDM SBI request: {} {}", method, request.header.uri);

    if parts.len() < 3 || parts[0] != NUDM_TC {
        return send_not_found("Invalid path", None);
    }
    if parts[1] != "v1" {
        return send_bad_request(&format!("Unsupported API version: {}", parts[1]), None);
    }
    if method != "GET" {
        return send_method_not_allowed(method, parts[2]);
    }

    match (parts[2], parts.get(3)) {
        ("supi", None) => json_response(&serde_json::json!({ "supi": script.supi })),
        ("testcases", None) => json_response(script),
        ("testcases", Some(id)) => handle_testcase(script, id),
        _ => send_not_found(&format!("Unknown resource: {}", parts[2..].join("/")), None),
    }
}

fn handle_testcase(script: &TestcaseConfig, id: &str) -> SbiResponse {
    let Ok(id) = id.parse::<u32>() else {
        return send_bad_request(&format!("Invalid testcase id: {id}"), None);
    };

    match script.find_by_id(id) {
        Some(testcase) => json_response(testcase),
        None => send_not_found(
            &format!("Testcase {id} not found"),
            Some("TESTCASE_NOT_FOUND"),
        ),
    }
}

fn json_response<T: serde::Serialize>(body: &T) -> SbiResponse {
    match SbiResponse::ok().with_json_body(body) {
        Ok(response) => response,
        Err(e) => {
            log::error!("Failed to encode response: {e}");
            send_error(500, "Internal Server Error", &e.to_string(), None)
        }
    }
}
