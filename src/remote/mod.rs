// src/remote/mod.rs

//! Remote target abstraction.
//!
//! Commands depend only on [`Target`], never on a concrete transport. The
//! production transports are [`SshTarget`] and [`LocalTarget`]; tests use the
//! scripted [`MockTarget`].

pub mod local;
pub mod mock;
pub mod ssh;

pub use local::LocalTarget;
pub use mock::MockTarget;
pub use ssh::SshTarget;

/// Output of one remote (or local) command execution.
#[derive(Debug, Clone)]
pub struct ExecOutput {
    pub stdout: String,
    pub stderr: String,
    pub success: bool,
    pub exit_code: i32,
}

impl ExecOutput {
    /// An output representing a transport-level failure (nothing ran).
    pub fn failure(message: impl Into<String>) -> Self {
        Self {
            stdout: String::new(),
            stderr: message.into(),
            success: false,
            exit_code: -1,
        }
    }

    /// Stdout and stderr merged for diagnostics.
    pub fn combined(&self) -> String {
        let mut out = self.stdout.trim_end().to_string();
        let err = self.stderr.trim_end();
        if !err.is_empty() {
            if !out.is_empty() {
                out.push('\n');
            }
            out.push_str(err);
        }
        out
    }
}

/// A host a command can be executed against.
///
/// Each job owns its own `Target`; nothing is shared between concurrently
/// running jobs except what the transport itself shares (the mock's scripted
/// state, by design).
#[derive(Debug, Clone)]
pub enum Target {
    Ssh(SshTarget),
    Local(LocalTarget),
    Mock(MockTarget),
}

impl Target {
    /// Host name for logging.
    pub fn host(&self) -> String {
        match self {
            Target::Ssh(t) => t.host.clone(),
            Target::Local(_) => "local".to_string(),
            Target::Mock(t) => t.host(),
        }
    }

    /// Execute a command line on the target, returning output + exit status.
    pub async fn execute(&self, command_line: &str, use_sudo: bool) -> ExecOutput {
        match self {
            Target::Ssh(t) => t.execute(command_line, use_sudo).await,
            Target::Local(t) => t.execute(command_line, use_sudo).await,
            Target::Mock(t) => t.execute(command_line, use_sudo).await,
        }
    }

    /// Whether a path exists on the target.
    pub async fn file_exists(&self, path: &str) -> bool {
        match self {
            Target::Ssh(t) => t.file_exists(path).await,
            Target::Local(t) => t.file_exists(path).await,
            Target::Mock(t) => t.file_exists(path).await,
        }
    }

    /// Copy a local file into a remote directory.
    pub async fn put(&self, local_path: &str, remote_dir: &str) -> ExecOutput {
        match self {
            Target::Ssh(t) => t.put(local_path, remote_dir).await,
            Target::Local(t) => t.put(local_path, remote_dir).await,
            Target::Mock(t) => t.put(local_path, remote_dir).await,
        }
    }

    /// Copy a remote file to a local path.
    pub async fn get(&self, remote_path: &str, local_path: &str) -> ExecOutput {
        match self {
            Target::Ssh(t) => t.get(remote_path, local_path).await,
            Target::Local(t) => t.get(remote_path, local_path).await,
            Target::Mock(t) => t.get(remote_path, local_path).await,
        }
    }
}

/// Quote an argument for interpolation into a remotely-executed shell line.
pub fn shell_quote(s: &str) -> String {
    if !s.is_empty()
        && s.chars()
            .all(|c| c.is_ascii_alphanumeric() || matches!(c, '/' | '.' | '-' | '_' | '+' | ':'))
    {
        return s.to_string();
    }
    format!("'{}'", s.replace('\'', r"'\''"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn plain_paths_are_not_quoted() {
        assert_eq!(shell_quote("/srv/releases/1.4.2"), "/srv/releases/1.4.2");
    }

    #[test]
    fn spaces_and_quotes_are_escaped() {
        assert_eq!(shell_quote("a b"), "'a b'");
        assert_eq!(shell_quote("it's"), r"'it'\''s'");
    }
}
