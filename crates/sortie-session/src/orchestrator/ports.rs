//! External port selection.

use crate::api::PortMap;

/// Pick the externally reachable game port.
///
/// Priority, first match wins:
/// 1. the entry named `preferred`, if it has an external port;
/// 2. the first UDP entry (protocol contains "UDP", any case) with one;
/// 3. the first entry of any protocol with one.
pub fn select_external_port(ports: &PortMap, preferred: &str) -> Option<u16> {
    let preferred = preferred.trim();
    if !preferred.is_empty() {
        if let Some(port) = ports
            .get(preferred)
            .and_then(|e| e.mapping())
            .and_then(|m| m.external_port())
        {
            return Some(port);
        }
    }

    let mappings = || ports.values().filter_map(|e| e.mapping());

    mappings()
        .filter(|m| m.is_udp())
        .find_map(|m| m.external_port())
        .or_else(|| mappings().find_map(|m| m.external_port()))
}
