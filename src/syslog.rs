//! RFC3164 syslog ingress: UDP or Unix-datagram framing, decoded into
//! [`SyslogPart`] values and pushed onto the channel the ingest task drains.

use tokio::net::{UdpSocket, UnixDatagram};
use tokio::sync::mpsc;

use crate::error::ExporterError;

/// Capacity of the channel between the syslog receiver and the ingest
/// task. The receiver blocks on `send` once this fills rather than
/// dropping datagrams.
pub const CHANNEL_CAPACITY: usize = 20_000;

/// The three fields the ingest pipeline needs out of a decoded syslog
/// message: `appname` as `tag`, `hostname`, and `msg` as `content`.
#[derive(Debug, Clone, PartialEq)]
pub struct SyslogPart {
    pub tag: String,
    pub hostname: String,
    pub content: String,
}

impl SyslogPart {
    /// Decode one RFC3164 datagram. `syslog_loose` never fails outright;
    /// a datagram it cannot make sense of still yields a `Message` with
    /// empty `appname`/`hostname` and the raw bytes as `msg`, which the
    /// validation step downstream rejects for wrong tag.
    fn decode(datagram: &[u8]) -> SyslogPart {
        let line = String::from_utf8_lossy(datagram);
        let parsed = syslog_loose::parse_message(&line, syslog_loose::Variant::RFC3164);
        SyslogPart {
            tag: parsed.appname.unwrap_or_default().to_string(),
            hostname: parsed.hostname.unwrap_or_default().to_string(),
            content: parsed.msg.to_string(),
        }
    }
}

enum Socket {
    Udp(UdpSocket),
    Unix(UnixDatagram),
}

/// Strip the `unix:` prefix selecting a Unix-datagram socket from an
/// otherwise plain UDP address, exactly as the original's
/// `strings.HasPrefix(cfg.SyslogAddress, "unix:")` does.
fn unix_socket_path(address: &str) -> Option<&str> {
    address.strip_prefix("unix:")
}

/// Bind the syslog listener, selecting UDP or Unix-datagram by an `unix:`
/// address prefix, exactly as the original does.
async fn bind(address: &str) -> Result<Socket, ExporterError> {
    if let Some(path) = unix_socket_path(address) {
        let _ = std::fs::remove_file(path);
        UnixDatagram::bind(path)
            .map(Socket::Unix)
            .map_err(|source| ExporterError::SyslogBind {
                address: address.to_string(),
                source,
            })
    } else {
        UdpSocket::bind(address)
            .await
            .map(Socket::Udp)
            .map_err(|source| ExporterError::SyslogBind {
                address: address.to_string(),
                source,
            })
    }
}

/// Receive datagrams from `socket` until it errors or is closed, decoding
/// each and pushing it onto `tx`. `send` blocks once the channel is full,
/// per the documented no-drop policy (§5).
async fn run(socket: Socket, tx: mpsc::Sender<SyslogPart>) {
    let mut buf = [0u8; 65_536];
    loop {
        let read = match &socket {
            Socket::Udp(udp) => udp.recv(&mut buf).await,
            Socket::Unix(unix) => unix.recv(&mut buf).await,
        };

        let n = match read {
            Ok(n) => n,
            Err(error) => {
                tracing::error!(%error, "syslog socket read failed, stopping receiver");
                return;
            }
        };

        let part = SyslogPart::decode(&buf[..n]);
        if tx.send(part).await.is_err() {
            tracing::warn!("ingest task dropped the channel, stopping syslog receiver");
            return;
        }
    }
}

/// Spawn the bound socket's receive loop onto a new channel pair of
/// [`CHANNEL_CAPACITY`]. Returns the receiving half for the ingest task and
/// a handle the caller can `abort()` on shutdown to close the listening
/// socket and stop the receiver.
pub async fn spawn(
    address: &str,
) -> Result<(mpsc::Receiver<SyslogPart>, tokio::task::JoinHandle<()>), ExporterError> {
    let socket = bind(address).await?;
    let (tx, rx) = mpsc::channel(CHANNEL_CAPACITY);
    let handle = tokio::spawn(run(socket, tx));
    Ok((rx, handle))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn decodes_well_formed_rfc3164_nginx_message() {
        let line = b"<190>Jan  1 00:00:00 myhost nginx: time:0.123";
        let part = SyslogPart::decode(line);
        assert_eq!(part.tag, "nginx");
        assert_eq!(part.hostname, "myhost");
        assert_eq!(part.content, "time:0.123");
    }

    #[test]
    fn unparseable_datagram_falls_back_to_empty_tag_and_hostname() {
        let line = b"not a syslog message at all";
        let part = SyslogPart::decode(line);
        assert!(part.tag.is_empty());
        assert!(part.hostname.is_empty());
    }

    #[test]
    fn unix_prefixed_address_yields_the_socket_path() {
        assert_eq!(unix_socket_path("unix:/var/run/nginx.sock"), Some("/var/run/nginx.sock"));
    }

    #[test]
    fn plain_address_is_not_a_unix_path() {
        assert_eq!(unix_socket_path("127.0.0.1:9514"), None);
    }
}
