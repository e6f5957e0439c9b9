//! Forwards log lines to the syslog server named by `syslog_server_url`.

use parking_lot::Mutex;
use std::io::{self, Write};
use std::net::{SocketAddr, TcpStream, ToSocketAddrs, UdpSocket};
#[cfg(unix)]
use std::os::unix::net::UnixDatagram;
use std::sync::Arc;
use stressapi_common::SYSLOG_FACILITIES;
use tracing::{Level, Metadata};
use tracing_subscriber::fmt::MakeWriter;

use crate::config::{SyslogTarget, SyslogTransport};

pub const DEFAULT_SYSLOG_PORT: u16 = 514;

const TAG: &str = "stressapi";

enum Transport {
    Udp(UdpSocket),
    Tcp(TcpStream),
    #[cfg(unix)]
    Unix(UnixDatagram),
}

impl Transport {
    fn connect(target: &SyslogTarget) -> io::Result<Self> {
        match target.transport {
            SyslogTransport::Udp => {
                let remote = resolve(&target.address)?;
                let local: SocketAddr = if remote.is_ipv6() {
                    (std::net::Ipv6Addr::UNSPECIFIED, 0).into()
                } else {
                    (std::net::Ipv4Addr::UNSPECIFIED, 0).into()
                };
                let socket = UdpSocket::bind(local)?;
                socket.connect(remote)?;
                Ok(Transport::Udp(socket))
            }
            SyslogTransport::Tcp => Ok(Transport::Tcp(TcpStream::connect(resolve(&target.address)?)?)),
            #[cfg(unix)]
            SyslogTransport::Unix => {
                let socket = UnixDatagram::unbound()?;
                socket.connect(&target.address)?;
                Ok(Transport::Unix(socket))
            }
            #[cfg(not(unix))]
            SyslogTransport::Unix => Err(io::Error::new(
                io::ErrorKind::Unsupported,
                "unix sockets are not available on this platform",
            )),
        }
    }

    fn send(&mut self, line: &[u8]) -> io::Result<()> {
        match self {
            Transport::Udp(socket) => socket.send(line).map(drop),
            Transport::Tcp(stream) => {
                stream.write_all(line)?;
                stream.write_all(b"\n")
            }
            #[cfg(unix)]
            Transport::Unix(socket) => socket.send(line).map(drop),
        }
    }
}

/// `host` or `host:port`, defaulting to the standard syslog port.
fn resolve(address: &str) -> io::Result<SocketAddr> {
    let has_port = match address.rsplit_once(':') {
        Some((host, port)) => !host.is_empty() && !address.ends_with(']') && port.parse::<u16>().is_ok(),
        None => false,
    };
    let mut candidates = if has_port {
        address.to_socket_addrs()?
    } else {
        (address.trim_start_matches('[').trim_end_matches(']'), DEFAULT_SYSLOG_PORT).to_socket_addrs()?
    };
    candidates.next().ok_or_else(|| {
        io::Error::new(io::ErrorKind::AddrNotAvailable, format!("cannot resolve {address}"))
    })
}

/// `MakeWriter` that emits one syslog datagram per log event.
#[derive(Clone)]
pub struct SyslogSink {
    transport: Arc<Mutex<Transport>>,
    facility: u8,
}

impl SyslogSink {
    pub fn connect(target: &SyslogTarget) -> io::Result<Self> {
        let facility = SYSLOG_FACILITIES
            .iter()
            .position(|name| *name == target.facility)
            .unwrap_or(1) as u8;
        Ok(Self { transport: Arc::new(Mutex::new(Transport::connect(target)?)), facility })
    }

    fn line(&self, severity: u8) -> SyslogLine {
        SyslogLine { sink: self.clone(), severity, buf: Vec::with_capacity(256) }
    }
}

impl<'a> MakeWriter<'a> for SyslogSink {
    type Writer = SyslogLine;

    fn make_writer(&'a self) -> Self::Writer {
        self.line(severity(&Level::INFO))
    }

    fn make_writer_for(&'a self, meta: &Metadata<'_>) -> Self::Writer {
        self.line(severity(meta.level()))
    }
}

fn severity(level: &Level) -> u8 {
    match *level {
        Level::ERROR => 3,
        Level::WARN => 4,
        Level::INFO => 6,
        _ => 7,
    }
}

/// Buffers one formatted event and sends it when dropped.
pub struct SyslogLine {
    sink: SyslogSink,
    severity: u8,
    buf: Vec<u8>,
}

impl Write for SyslogLine {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.buf.extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

impl Drop for SyslogLine {
    fn drop(&mut self) {
        let message = String::from_utf8_lossy(&self.buf);
        let message = message.trim_end();
        if message.is_empty() {
            return;
        }
        let priority = u16::from(self.sink.facility) * 8 + u16::from(self.severity);
        let line = format!("<{priority}>{TAG}[{}]: {message}", std::process::id());
        // Lost log lines are not worth interrupting the run for.
        let _ = self.sink.transport.lock().send(line.as_bytes());
    }
}
