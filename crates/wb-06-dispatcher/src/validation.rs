//! Parameter pre-validation for write methods.
//!
//! Runs before any permission lookup or approval prompt, so malformed calls
//! are refused at the gate instead of reaching the user.

use serde_json::Value;
use shared_types::ProviderError;

fn param<'a>(params: &'a [Value], index: usize) -> Result<&'a Value, ProviderError> {
    params
        .get(index)
        .ok_or_else(|| ProviderError::invalid_params(format!("missing parameter {}", index)))
}

fn object_with<'a>(
    params: &'a [Value],
    keys: &[&str],
) -> Result<&'a serde_json::Map<String, Value>, ProviderError> {
    let object = param(params, 0)?
        .as_object()
        .ok_or_else(|| ProviderError::invalid_params("expected an object"))?;
    if let Some(missing) = keys.iter().find(|key| !object.contains_key(**key)) {
        return Err(ProviderError::invalid_params(format!("missing field {}", missing)));
    }
    Ok(object)
}

fn at_least(params: &[Value], count: usize) -> Result<(), ProviderError> {
    if params.len() < count {
        return Err(ProviderError::invalid_params(format!(
            "expected {} parameters, got {}",
            count,
            params.len()
        )));
    }
    Ok(())
}

fn is_hex_quantity(value: &Value) -> bool {
    value
        .as_str()
        .and_then(|s| s.strip_prefix("0x"))
        .is_some_and(|hex| !hex.is_empty() && hex.chars().all(|c| c.is_ascii_hexdigit()))
}

/// Check the shape of a write method's parameters.
pub fn validate_params(method: &str, params: &[Value]) -> Result<(), ProviderError> {
    match method {
        "eth_sendTransaction" | "eth_signTransaction" => {
            object_with(params, &["from"])?;
        }
        "personal_sign" | "eth_sign" | "eth_signTypedData" | "eth_signTypedData_v3"
        | "eth_signTypedData_v4" => {
            at_least(params, 2)?;
        }
        "wallet_switchEthereumChain" | "wallet_addEthereumChain" => {
            let object = object_with(params, &["chainId"])?;
            if !object.get("chainId").is_some_and(is_hex_quantity) {
                return Err(ProviderError::invalid_params("chainId must be a hex string"));
            }
        }
        "wallet_watchAsset" => {
            object_with(params, &["type", "options"])?;
        }
        _ => {}
    }
    Ok(())
}
