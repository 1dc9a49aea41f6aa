// src/command/fs_ops.rs

//! File-handling commands: upload, unpack, createdirectory, removefile,
//! symlink, cleanup.
//!
//! Each command logs the literal command line it executed and the output on
//! failure, so a partial deployment is always diagnosable from the log.

use globset::{Glob, GlobMatcher};
use tracing::{debug, error, info};

use crate::command::params::ParamTable;
use crate::errors::{Error, Result};
use crate::remote::{Target, shell_quote};

/// Copy a local artifact into a remote directory.
#[derive(Debug, Clone)]
pub struct Upload {
    pub source: String,
    pub destination: String,
}

impl Upload {
    pub fn from_params(p: &ParamTable) -> Result<Self> {
        p.deny_unknown(&["source", "destination"])?;
        Ok(Self {
            source: p.require_str("source")?,
            destination: p.require_str("destination")?,
        })
    }

    pub fn describe(&self) -> String {
        format!("upload {} -> {}", self.source, self.destination)
    }

    pub async fn run(&self, target: &Target) -> bool {
        if !std::path::Path::new(&self.source).is_file() {
            error!(source = %self.source, "upload source is not a local file");
            return false;
        }

        let out = target.put(&self.source, &self.destination).await;
        if !out.success {
            error!(
                source = %self.source,
                destination = %self.destination,
                host = %target.host(),
                exit_code = out.exit_code,
                output = %out.combined(),
                "upload failed"
            );
        }
        out.success
    }
}

/// Unpack a remote tarball into a directory.
#[derive(Debug, Clone)]
pub struct Unpack {
    pub source: String,
    pub destination: String,
}

impl Unpack {
    pub fn from_params(p: &ParamTable) -> Result<Self> {
        p.deny_unknown(&["source", "destination"])?;
        Ok(Self {
            source: p.require_str("source")?,
            destination: p.require_str("destination")?,
        })
    }

    pub fn describe(&self) -> String {
        format!("unpack {} -> {}", self.source, self.destination)
    }

    pub async fn run(&self, target: &Target) -> bool {
        let cmd = format!(
            "mkdir -p {dest} && tar -xzf {src} -C {dest}",
            dest = shell_quote(&self.destination),
            src = shell_quote(&self.source)
        );
        let out = target.execute(&cmd, false).await;
        if !out.success {
            error!(command = %cmd, host = %target.host(), exit_code = out.exit_code, output = %out.combined(), "unpack failed");
        }
        out.success
    }
}

/// Create a remote directory, optionally clobbering an existing one.
#[derive(Debug, Clone)]
pub struct CreateDirectory {
    pub source: String,
    pub clobber: bool,
}

impl CreateDirectory {
    pub fn from_params(p: &ParamTable) -> Result<Self> {
        p.deny_unknown(&["source", "clobber"])?;
        Ok(Self {
            source: p.require_str("source")?,
            clobber: p.opt_bool("clobber", false)?,
        })
    }

    pub fn describe(&self) -> String {
        format!("createdirectory {}", self.source)
    }

    pub async fn run(&self, target: &Target) -> bool {
        let dir = shell_quote(&self.source);
        let cmd = if self.clobber {
            format!("rm -rf {dir} && mkdir -p {dir}")
        } else {
            format!("mkdir -p {dir}")
        };
        let out = target.execute(&cmd, false).await;
        if !out.success {
            error!(command = %cmd, host = %target.host(), exit_code = out.exit_code, output = %out.combined(), "createdirectory failed");
        }
        out.success
    }
}

/// Remove a remote file. Removing an absent file succeeds.
#[derive(Debug, Clone)]
pub struct RemoveFile {
    pub source: String,
}

impl RemoveFile {
    pub fn from_params(p: &ParamTable) -> Result<Self> {
        p.deny_unknown(&["source"])?;
        Ok(Self {
            source: p.require_str("source")?,
        })
    }

    pub fn describe(&self) -> String {
        format!("removefile {}", self.source)
    }

    pub async fn run(&self, target: &Target) -> bool {
        let cmd = format!("rm -f {}", shell_quote(&self.source));
        let out = target.execute(&cmd, false).await;
        if !out.success {
            error!(command = %cmd, host = %target.host(), exit_code = out.exit_code, output = %out.combined(), "removefile failed");
        }
        out.success
    }
}

/// Point a symlink at a target path.
///
/// Idempotent: a link that already points at `source` is a success without
/// touching the remote side, so re-running a task list against a converged
/// host stays green.
#[derive(Debug, Clone)]
pub struct Symlink {
    /// Path the link should point at.
    pub source: String,
    /// Path of the link itself.
    pub destination: String,
}

impl Symlink {
    pub fn from_params(p: &ParamTable) -> Result<Self> {
        p.deny_unknown(&["source", "destination"])?;
        Ok(Self {
            source: p.require_str("source")?,
            destination: p.require_str("destination")?,
        })
    }

    pub fn describe(&self) -> String {
        format!("symlink {} -> {}", self.destination, self.source)
    }

    pub async fn run(&self, target: &Target) -> bool {
        let probe = format!("readlink {}", shell_quote(&self.destination));
        let current = target.execute(&probe, false).await;
        if current.success && current.stdout.trim() == self.source {
            debug!(
                link = %self.destination,
                target_path = %self.source,
                "symlink already points at the wanted target"
            );
            return true;
        }

        let cmd = format!(
            "ln -sfn {} {}",
            shell_quote(&self.source),
            shell_quote(&self.destination)
        );
        let out = target.execute(&cmd, false).await;
        if !out.success {
            error!(command = %cmd, host = %target.host(), exit_code = out.exit_code, output = %out.combined(), "symlink failed");
        }
        out.success
    }
}

/// Remove all but the newest `keepversions` entries matching `filespec`
/// under `path`.
#[derive(Debug, Clone)]
pub struct Cleanup {
    pub path: String,
    pub filespec: GlobMatcher,
    pub keepversions: usize,
    pub exclude: Option<GlobMatcher>,
}

impl Cleanup {
    pub fn from_params(p: &ParamTable) -> Result<Self> {
        p.deny_unknown(&["path", "filespec", "keepversions", "exclude"])?;
        let filespec = compile_glob(&p.require_str("filespec")?, "filespec")?;
        let exclude = match p.opt_str("exclude")? {
            Some(pat) => Some(compile_glob(&pat, "exclude")?),
            None => None,
        };
        Ok(Self {
            path: p.require_str("path")?,
            filespec,
            keepversions: p.require_u64("keepversions")? as usize,
            exclude,
        })
    }

    pub fn describe(&self) -> String {
        format!("cleanup {} keep {}", self.path, self.keepversions)
    }

    pub async fn run(&self, target: &Target) -> bool {
        // Newest-first listing; everything past `keepversions` goes.
        let list_cmd = format!("ls -1t {}", shell_quote(&self.path));
        let listing = target.execute(&list_cmd, false).await;
        if !listing.success {
            error!(command = %list_cmd, host = %target.host(), exit_code = listing.exit_code, output = %listing.combined(), "cleanup listing failed");
            return false;
        }

        let doomed: Vec<&str> = listing
            .stdout
            .lines()
            .map(str::trim)
            .filter(|name| !name.is_empty())
            .filter(|name| self.filespec.is_match(name))
            .filter(|name| {
                self.exclude
                    .as_ref()
                    .is_none_or(|ex| !ex.is_match(name))
            })
            .skip(self.keepversions)
            .collect();

        if doomed.is_empty() {
            info!(path = %self.path, "cleanup: nothing to remove");
            return true;
        }

        let cmd = format!(
            "cd {} && rm -rf {}",
            shell_quote(&self.path),
            doomed
                .iter()
                .map(|name| shell_quote(name))
                .collect::<Vec<_>>()
                .join(" ")
        );
        let out = target.execute(&cmd, false).await;
        if out.success {
            info!(path = %self.path, removed = doomed.len(), host = %target.host(), "cleanup removed old versions");
        } else {
            error!(command = %cmd, host = %target.host(), exit_code = out.exit_code, output = %out.combined(), "cleanup removal failed");
        }
        out.success
    }
}

fn compile_glob(pattern: &str, key: &str) -> Result<GlobMatcher> {
    Glob::new(pattern)
        .map(|g| g.compile_matcher())
        .map_err(|e| Error::CommandValidation {
            command: "cleanup".to_string(),
            reason: format!("invalid {key} pattern '{pattern}': {e}"),
        })
}
