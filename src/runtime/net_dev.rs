//! Parser for `/proc/<pid>/net/dev`.
//!
//! Each interface line is `name: <8 receive columns> <8 transmit columns>`;
//! transmitted bytes are the first transmit column.

use crate::config::LOOPBACK_INTERFACE;

const TX_BYTES_COLUMN: usize = 8;

/// Per-interface transmitted bytes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InterfaceTx {
    pub name: String,
    pub tx_bytes: u64,
}

/// Parse every interface line. Header lines and malformed lines are ignored.
pub fn parse(contents: &str) -> Vec<InterfaceTx> {
    contents
        .lines()
        .filter_map(|line| {
            let (name, counters) = line.split_once(':')?;
            let name = name.trim();
            if name.is_empty() || name.contains('|') {
                return None;
            }
            let tx_bytes = counters
                .split_whitespace()
                .nth(TX_BYTES_COLUMN)?
                .parse::<u64>()
                .ok()?;
            Some(InterfaceTx {
                name: name.to_string(),
                tx_bytes,
            })
        })
        .collect()
}

/// Sum transmitted bytes over the counted interfaces.
///
/// An empty allow-list counts every interface except loopback. Returns `None`
/// when no counted interface is present.
pub fn egress_bytes(contents: &str, interfaces: &[String]) -> Option<u64> {
    let counted: Vec<InterfaceTx> = parse(contents)
        .into_iter()
        .filter(|iface| {
            if interfaces.is_empty() {
                iface.name != LOOPBACK_INTERFACE
            } else {
                interfaces.iter().any(|allowed| *allowed == iface.name)
            }
        })
        .collect();

    if counted.is_empty() {
        return None;
    }
    Some(
        counted
            .iter()
            .fold(0u64, |total, iface| total.saturating_add(iface.tx_bytes)),
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &str = "\
Inter-|   Receive                                                |  Transmit
 face |bytes    packets errs drop fifo frame compressed multicast|bytes    packets errs drop fifo colls carrier compressed
    lo:    1200      12    0    0    0     0          0         0     1200      12    0    0    0     0       0          0
  eth0: 9876543   54321    0    0    0     0          0         0 123456789   65432    0    0    0     0       0          0
  eth1:5000 10 0 0 0 0 0 0 700 7 0 0 0 0 0 0
";

    #[test]
    fn test_parse_skips_headers_and_reads_tx_column() {
        let ifaces = parse(SAMPLE);
        assert_eq!(ifaces.len(), 3);
        assert_eq!(ifaces[0], InterfaceTx { name: "lo".into(), tx_bytes: 1200 });
        assert_eq!(ifaces[1], InterfaceTx { name: "eth0".into(), tx_bytes: 123_456_789 });
        assert_eq!(ifaces[2], InterfaceTx { name: "eth1".into(), tx_bytes: 700 });
    }

    #[test]
    fn test_egress_excludes_loopback_by_default() {
        assert_eq!(egress_bytes(SAMPLE, &[]), Some(123_456_789 + 700));
    }

    #[test]
    fn test_egress_honours_interface_allow_list() {
        assert_eq!(egress_bytes(SAMPLE, &["eth0".to_string()]), Some(123_456_789));
    }

    #[test]
    fn test_egress_none_when_no_interface_matches() {
        assert_eq!(egress_bytes(SAMPLE, &["wg0".to_string()]), None);
        assert_eq!(egress_bytes("", &[]), None);
    }

    #[test]
    fn test_truncated_line_is_ignored() {
        let ifaces = parse("  eth0: 1 2 3\n");
        assert!(ifaces.is_empty());
    }
}
