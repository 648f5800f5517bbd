use std::fmt;

/// One username/password candidate under test.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct CredentialPair {
    pub username: String,
    pub password: String,
}

impl CredentialPair {
    pub fn new(username: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            username: username.into(),
            password: password.into(),
        }
    }
}

impl fmt::Display for CredentialPair {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.username, self.password)
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum OutcomeKind {
    Success,
    AuthRejected,
    ConnectionFailed,
    ProtocolError,
}

impl OutcomeKind {
    pub fn label(&self) -> &'static str {
        match self {
            OutcomeKind::Success => "Successful",
            OutcomeKind::AuthRejected => "Failed",
            OutcomeKind::ConnectionFailed => "Connection Failed",
            OutcomeKind::ProtocolError => "Error",
        }
    }
}

/// Classified result of a single attempt.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Outcome {
    pub pair: CredentialPair,
    pub kind: OutcomeKind,
    pub detail: String,
}

impl Outcome {
    pub fn new(pair: CredentialPair, kind: OutcomeKind, detail: impl Into<String>) -> Self {
        Self {
            pair,
            kind,
            detail: detail.into(),
        }
    }

    pub fn is_success(&self) -> bool {
        self.kind == OutcomeKind::Success
    }
}
