use crate::error::{MeshError, Result};

/// Splits `host:port` on the **last** colon, so bracketed IPv6 literals keep their colons
/// in the host part (`"[::1]:8080"` yields `("[::1]", 8080)`).
pub fn parse_host_port(input: &str) -> Result<(String, u16)> {
    let invalid = |reason| MeshError::InvalidAddress {
        input: input.to_string(),
        reason,
    };

    let idx = input.rfind(':').ok_or_else(|| invalid("missing ':port'"))?;
    let (host, port) = (&input[..idx], &input[idx + 1..]);

    if host.is_empty() {
        return Err(invalid("empty host"));
    }
    if port.is_empty() || !port.bytes().all(|b| b.is_ascii_digit()) {
        return Err(invalid("port is not numeric"));
    }

    let port = port.parse::<u16>().map_err(|_| invalid("port out of range"))?;

    Ok((host.to_string(), port))
}

/// Renders the authority component `address:port`.
pub fn endpoint(address: &str, port: u16) -> String {
    format!("{address}:{port}")
}
