use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

/// Reachability of one tunnel's destination
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct TunnelStatus {
    /// Inbound (IPv4) listen port
    pub ipv4_port: String,
    /// Destination (IPv6) port
    pub ipv6_port: String,
    /// Whether a connection to the destination port succeeded
    pub ipv6_alive: bool,
}

impl From<&relay64_server_tcp::TunnelStatus> for TunnelStatus {
    fn from(status: &relay64_server_tcp::TunnelStatus) -> Self {
        Self {
            ipv4_port: status.ipv4_port.to_string(),
            ipv6_port: status.ipv6_port.to_string(),
            ipv6_alive: status.ipv6_alive,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ports_serialize_as_strings() {
        let status = TunnelStatus::from(&relay64_server_tcp::TunnelStatus {
            ipv4_port: 8080,
            ipv6_port: 80,
            ipv6_alive: true,
        });

        assert_eq!(
            serde_json::to_string(&status).unwrap(),
            r#"{"ipv4_port":"8080","ipv6_port":"80","ipv6_alive":true}"#
        );
    }
}
