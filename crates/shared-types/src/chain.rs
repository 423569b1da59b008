//! Chain id helpers.

/// Decimal network version for a hex (`0x89`) or decimal (`137`) chain id.
pub fn network_version_of(chain_id: &str) -> Option<String> {
    let parsed = match chain_id
        .strip_prefix("0x")
        .or_else(|| chain_id.strip_prefix("0X"))
    {
        Some(hex) => u64::from_str_radix(hex, 16).ok()?,
        None => chain_id.parse::<u64>().ok()?,
    };
    Some(parsed.to_string())
}
