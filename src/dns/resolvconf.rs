//! Name server discovery from resolv.conf files.

use std::io;
use std::net::{IpAddr, SocketAddr};
use std::path::Path;

/// Port used for name servers listed without one.
pub const DNS_PORT: u16 = 53;

/// Extracts the `nameserver` entries of a resolv.conf document, in order.
///
/// Comment lines (`#`, `;`), other directives and unparsable addresses are
/// skipped. IPv6 zone suffixes (`fe80::1%eth0`) are dropped.
pub fn parse_resolv_conf(contents: &str) -> Vec<SocketAddr> {
    contents
        .lines()
        .map(str::trim)
        .filter(|line| !line.starts_with('#') && !line.starts_with(';'))
        .filter_map(|line| {
            let mut fields = line.split_whitespace();
            match (fields.next(), fields.next()) {
                (Some("nameserver"), Some(addr)) => {
                    let addr = addr.split('%').next().unwrap_or(addr);
                    match addr.parse::<IpAddr>() {
                        Ok(ip) => Some(SocketAddr::new(ip, DNS_PORT)),
                        Err(_) => {
                            tracing::debug!(entry = %addr, "skipping unparsable nameserver");
                            None
                        }
                    }
                }
                _ => None,
            }
        })
        .collect()
}

/// Reads and parses the resolv.conf file at `path`.
pub fn read_resolv_conf(path: impl AsRef<Path>) -> io::Result<Vec<SocketAddr>> {
    let contents = std::fs::read_to_string(path)?;
    Ok(parse_resolv_conf(&contents))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_parse_nameservers_in_order() {
        let conf = "\
# generated by NetworkManager
search corp.example
nameserver 10.0.0.2
options edns0 trust-ad
nameserver 10.0.0.1
";
        let servers = parse_resolv_conf(conf);
        assert_eq!(
            servers,
            vec![
                "10.0.0.2:53".parse::<SocketAddr>().unwrap(),
                "10.0.0.1:53".parse::<SocketAddr>().unwrap(),
            ]
        );
    }

    #[test]
    fn test_parse_skips_comments_and_garbage() {
        let conf = "; nameserver 9.9.9.9\n#nameserver 1.1.1.1\nnameserver not-an-ip\nnameserver\n";
        assert!(parse_resolv_conf(conf).is_empty());
    }

    #[test]
    fn test_parse_ipv6_with_zone() {
        let servers = parse_resolv_conf("nameserver fe80::1%eth0\nnameserver 2001:4860:4860::8888\n");
        assert_eq!(servers.len(), 2);
        assert_eq!(servers[0].ip(), "fe80::1".parse::<IpAddr>().unwrap());
        assert_eq!(servers[1].port(), DNS_PORT);
    }

    #[test]
    fn test_read_resolv_conf_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "nameserver 192.0.2.53").unwrap();

        let servers = read_resolv_conf(file.path()).unwrap();
        assert_eq!(servers, vec!["192.0.2.53:53".parse::<SocketAddr>().unwrap()]);
    }

    #[test]
    fn test_read_missing_file() {
        assert!(read_resolv_conf("/nonexistent/resolv.conf").is_err());
    }
}
