use std::path::{Path, PathBuf};
use std::sync::Arc;

use crate::config::RunConfig;
use crate::error::EngineError;
use crate::utils::{ensure_readable_file, open_wordlist};

/// A freshly opened, finite, single-pass sequence of candidate values.
pub type Values = Box<dyn Iterator<Item = Result<String, EngineError>> + Send>;

/// Supplies usernames and passwords. Each call opens a new pass over the
/// backing data; a returned sequence is never rewound.
pub trait CredentialSource: Send + Sync + 'static {
    fn usernames(&self) -> Result<Values, EngineError>;

    fn passwords(&self) -> Result<Values, EngineError>;

    /// Verify both backing resources are reachable without consuming them.
    fn check(&self) -> Result<(), EngineError> {
        Ok(())
    }
}

/// Wordlist files, with an optional single username replacing the users file.
#[derive(Clone, Debug)]
pub struct FileSource {
    username: Option<String>,
    users_file: Option<PathBuf>,
    passwords_file: PathBuf,
}

impl FileSource {
    pub fn new(users_file: impl Into<PathBuf>, passwords_file: impl Into<PathBuf>) -> Self {
        Self {
            username: None,
            users_file: Some(users_file.into()),
            passwords_file: passwords_file.into(),
        }
    }

    pub fn with_username(username: impl Into<String>, passwords_file: impl Into<PathBuf>) -> Self {
        Self {
            username: Some(username.into().trim().to_string()),
            users_file: None,
            passwords_file: passwords_file.into(),
        }
    }

    pub fn from_config(config: &RunConfig) -> Result<Self, EngineError> {
        let passwords_file = config
            .passwords_file
            .clone()
            .ok_or_else(|| EngineError::config("A passwords file is required"))?;
        match (&config.username, &config.users_file) {
            (Some(user), _) => Ok(Self::with_username(user.clone(), passwords_file)),
            (None, Some(users)) => Ok(Self::new(users.clone(), passwords_file)),
            (None, None) => Err(EngineError::config(
                "Either a username or a usernames file is required",
            )),
        }
    }
}

fn open_values(path: &Path) -> Result<Values, EngineError> {
    let lines = open_wordlist(path).map_err(|source| EngineError::SourceUnavailable {
        path: path.to_path_buf(),
        source,
    })?;
    let path = path.to_path_buf();
    Ok(Box::new(lines.map(move |line| {
        line.map_err(|source| EngineError::SourceRead {
            path: path.clone(),
            source,
        })
    })))
}

fn check_file(path: &Path) -> Result<(), EngineError> {
    ensure_readable_file(path).map_err(|source| EngineError::SourceUnavailable {
        path: path.to_path_buf(),
        source,
    })
}

impl CredentialSource for FileSource {
    fn usernames(&self) -> Result<Values, EngineError> {
        match (&self.username, &self.users_file) {
            (Some(user), _) => Ok(Box::new(std::iter::once(Ok(user.clone())))),
            (None, Some(path)) => open_values(path),
            (None, None) => Ok(Box::new(std::iter::empty())),
        }
    }

    fn passwords(&self) -> Result<Values, EngineError> {
        open_values(&self.passwords_file)
    }

    fn check(&self) -> Result<(), EngineError> {
        let users = match (&self.username, &self.users_file) {
            (None, Some(path)) => check_file(path),
            _ => Ok(()),
        };
        check_file(&self.passwords_file).and(users)
    }
}

/// In-memory lists; values are trimmed and blanks dropped.
#[derive(Clone, Debug, Default)]
pub struct StaticSource {
    usernames: Arc<Vec<String>>,
    passwords: Arc<Vec<String>>,
}

impl StaticSource {
    pub fn new<U, P, S1, S2>(usernames: U, passwords: P) -> Self
    where
        U: IntoIterator<Item = S1>,
        P: IntoIterator<Item = S2>,
        S1: AsRef<str>,
        S2: AsRef<str>,
    {
        Self {
            usernames: Arc::new(clean(usernames)),
            passwords: Arc::new(clean(passwords)),
        }
    }
}

fn clean<I, S>(values: I) -> Vec<String>
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    values
        .into_iter()
        .map(|v| v.as_ref().trim().to_string())
        .filter(|v| !v.is_empty())
        .collect()
}

fn replay(values: &Arc<Vec<String>>) -> Values {
    let values = Arc::clone(values);
    Box::new((0..values.len()).map(move |i| Ok(values[i].clone())))
}

impl CredentialSource for StaticSource {
    fn usernames(&self) -> Result<Values, EngineError> {
        Ok(replay(&self.usernames))
    }

    fn passwords(&self) -> Result<Values, EngineError> {
        Ok(replay(&self.passwords))
    }
}
