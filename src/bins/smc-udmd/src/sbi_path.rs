//! UDM SBI Path Functions
//!
//! One-time NF registration with the NRF.

use smc_sbi::{SbiClient, SbiError, SbiRequest, SbiResult};

use crate::nudm_handler::NUDM_TC;

/// Minimal UDM NF profile
pub fn nf_profile(nf_instance_id: &str, addr: &str, port: u16) -> serde_json::Value {
    serde_json::json!({
        "nfInstanceId": nf_instance_id,
        "nfType": "UDM",
        "nfStatus": "REGISTERED",
        "ipv4Addresses": [addr],
        "nfServices": [{
            "serviceInstanceId": format!("{nf_instance_id}-{NUDM_TC}"),
            "serviceName": NUDM_TC,
            "versions": [{"apiVersionInUri": "v1", "apiFullVersion": "1.0.0"}],
            "scheme": "http",
            "nfServiceStatus": "REGISTERED",
            "ipEndPoints": [{"ipv4Address": addr, "port": port}],
        }],
    })
}

/// Register with the NRF
///
/// Sends NFRegister (PUT) to /nnrf-nfm/v1/nf-instances/{nfInstanceId}
pub async fn udm_nrf_register(client: &SbiClient, nf_instance_id: &str, profile: &serde_json::Value) -> SbiResult<()> {
    let path = format!("/nnrf-nfm/v1/nf-instances/{nf_instance_id}");
    let request = SbiRequest::put(path).with_json_body(profile)?;

    let response = client.send_request(request).await?;
    if response.is_success() {
        log::info!("UDM registered with NRF (status={})", response.status);
        Ok(())
    } else {
        Err(SbiError::from_status(
            response.status,
            response.http.content.unwrap_or_default(),
        ))
    }
}
