use ssh2::{ErrorCode, Session};
use std::future::Future;
use std::io;
use std::net::{SocketAddr, TcpStream, ToSocketAddrs};
use std::time::Duration;
use tokio::task::spawn_blocking;

use crate::config::{Target, Timeouts};
use crate::modules::creds::auth::{AttemptResult, AuthCapability};
use crate::modules::creds::pair::CredentialPair;

// libssh2 session error codes
const BANNER_RECV: i32 = -2;
const SOCKET_SEND: i32 = -7;
const TIMEOUT: i32 = -9;
const SOCKET_DISCONNECT: i32 = -13;
const AUTHENTICATION_FAILED: i32 = -18;
const SOCKET_TIMEOUT: i32 = -30;
const SOCKET_RECV: i32 = -43;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum Phase {
    Handshake,
    Auth,
}

/// Password authentication over SSH with libssh2. Each attempt opens its own
/// connection on the blocking pool and closes it when the attempt ends.
#[derive(Clone, Copy, Debug, Default)]
pub struct SshCapability;

impl SshCapability {
    pub fn new() -> Self {
        Self
    }
}

impl AuthCapability for SshCapability {
    fn attempt(
        &self,
        target: &Target,
        pair: &CredentialPair,
        timeouts: Timeouts,
    ) -> impl Future<Output = AttemptResult> + Send {
        let target = target.clone();
        let pair = pair.clone();
        async move {
            match spawn_blocking(move || try_ssh_login(&target, &pair, timeouts)).await {
                Ok(result) => result,
                Err(e) => AttemptResult::ProtocolFailure(format!("login task failed: {}", e)),
            }
        }
    }
}

fn try_ssh_login(target: &Target, pair: &CredentialPair, timeouts: Timeouts) -> AttemptResult {
    let tcp = match connect(target, timeouts.connect) {
        Ok(tcp) => tcp,
        Err(e) => {
            return AttemptResult::NetworkFailure(format!("Connection error to {}: {}", target, e))
        }
    };
    // Backstop for reads libssh2 does not bound itself.
    let socket_limit = Some(timeouts.banner + timeouts.auth);
    if let Err(e) = tcp
        .set_read_timeout(socket_limit)
        .and_then(|_| tcp.set_write_timeout(socket_limit))
    {
        return AttemptResult::NetworkFailure(e.to_string());
    }

    let mut sess = match Session::new() {
        Ok(sess) => sess,
        Err(e) => return AttemptResult::ProtocolFailure(e.to_string()),
    };
    sess.set_tcp_stream(tcp);

    sess.set_timeout(millis(timeouts.banner));
    if let Err(e) = sess.handshake() {
        return classify_ssh_error(e.code(), e.message(), Phase::Handshake);
    }

    sess.set_timeout(millis(timeouts.auth));
    match sess.userauth_password(&pair.username, &pair.password) {
        Ok(()) if sess.authenticated() => AttemptResult::Authenticated,
        Ok(()) => AttemptResult::Rejected,
        Err(e) => classify_ssh_error(e.code(), e.message(), Phase::Auth),
    }
}

fn connect(target: &Target, timeout: Duration) -> io::Result<TcpStream> {
    let addrs: Vec<SocketAddr> = (target.host.as_str(), target.port).to_socket_addrs()?.collect();
    let mut last = io::Error::new(io::ErrorKind::NotFound, "no address resolved");
    for addr in addrs {
        match TcpStream::connect_timeout(&addr, timeout) {
            Ok(tcp) => return Ok(tcp),
            Err(e) => last = e,
        }
    }
    Err(last)
}

fn millis(d: Duration) -> u32 {
    d.as_millis().clamp(1, u32::MAX as u128) as u32
}

/// Map a libssh2 failure to an attempt result. Socket and timeout codes are
/// network failures in either phase; an explicit refusal during auth is a
/// rejection; anything else is a protocol failure.
fn classify_ssh_error(code: ErrorCode, message: &str, phase: Phase) -> AttemptResult {
    let raw = match code {
        ErrorCode::Session(raw) => raw,
        ErrorCode::SFTP(_) => return AttemptResult::ProtocolFailure(message.to_string()),
    };
    match raw {
        SOCKET_SEND | SOCKET_RECV | SOCKET_DISCONNECT | SOCKET_TIMEOUT | TIMEOUT => {
            AttemptResult::NetworkFailure(message.to_string())
        }
        AUTHENTICATION_FAILED if phase == Phase::Auth => AttemptResult::Rejected,
        BANNER_RECV => AttemptResult::ProtocolFailure(format!(
            "Error reading SSH protocol banner: {}",
            message
        )),
        _ => AttemptResult::ProtocolFailure(message.to_string()),
    }
}
