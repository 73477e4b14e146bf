use std::{fmt, str::FromStr};

use crate::exec::error::ExecError;

#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct RemoteTarget {
    pub user: Option<String>,
    pub host: String,
    pub port: Option<u16>,
}

impl RemoteTarget {
    /// `user@host` form passed to the ssh client; the port travels separately as `-p`.
    pub fn destination(&self) -> String {
        match &self.user {
            Some(user) => format!("{user}@{}", self.host),
            None => self.host.clone(),
        }
    }
}

impl fmt::Display for RemoteTarget {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.port {
            Some(port) => write!(f, "{}:{port}", self.destination()),
            None => f.write_str(&self.destination()),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum HostSpec {
    Local,
    Remote(RemoteTarget),
}

impl HostSpec {
    pub fn parse(spec: &str) -> Result<Self, ExecError> {
        let trimmed = spec.trim();
        if trimmed.is_empty()
            || trimmed.eq_ignore_ascii_case("local")
            || trimmed.eq_ignore_ascii_case("localhost")
        {
            return Ok(HostSpec::Local);
        }

        let invalid = |reason: &str| ExecError::InvalidHost {
            spec: spec.to_string(),
            reason: reason.to_string(),
        };

        let (user, rest) = match trimmed.rsplit_once('@') {
            Some((user, rest)) => {
                if user.is_empty() {
                    return Err(invalid("user part is empty"));
                }
                (Some(user.to_string()), rest)
            }
            None => (None, trimmed),
        };

        let (host, port) = match rest.rsplit_once(':') {
            Some((host, port)) => {
                let port = port
                    .parse::<u16>()
                    .map_err(|_| invalid("port must be a number between 0 and 65535"))?;
                (host, Some(port))
            }
            None => (rest, None),
        };

        if host.is_empty() {
            return Err(invalid("host part is empty"));
        }
        if host.chars().any(char::is_whitespace) {
            return Err(invalid("host part contains whitespace"));
        }

        Ok(HostSpec::Remote(RemoteTarget {
            user,
            host: host.to_string(),
            port,
        }))
    }

    pub fn is_local(&self) -> bool {
        matches!(self, HostSpec::Local)
    }
}

impl FromStr for HostSpec {
    type Err = ExecError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        HostSpec::parse(s)
    }
}

impl fmt::Display for HostSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            HostSpec::Local => f.write_str("local"),
            HostSpec::Remote(target) => write!(f, "{target}"),
        }
    }
}
