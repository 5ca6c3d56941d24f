use crate::config::{CleanerCommand, Config};
use crate::output::{complete, write_lines};
use crate::ProgressSink;
use async_trait::async_trait;
use cidr_set::{format_cidr, parse_ipv4_cidr, CidrSet, ParseError};
use std::path::{Path, PathBuf};
use std::process::{ExitStatus, Stdio};
use thiserror::Error;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::process::{Child, Command};

#[derive(Error, Debug)]
pub enum NormalizationError {
    #[error("failed to write cache file {}: {source}", .path.display())]
    Cache {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to spawn cleaner {command}: {source}")]
    Spawn {
        command: String,
        #[source]
        source: std::io::Error,
    },
    #[error("failed reading output of cleaner {command}: {source}")]
    Io {
        command: String,
        #[source]
        source: std::io::Error,
    },
    #[error("cleaner {command} failed: {status}")]
    ExitStatus { command: String, status: ExitStatus },
    #[error("cleaner {command} produced no output for {count} blocks")]
    NoOutput { command: String, count: usize },
    #[error("cannot aggregate: {0}")]
    InvalidBlock(#[from] ParseError),
}

/// Cleans up a list of CIDR blocks.
///
/// The output order is unspecified and the output only has to consist of
/// CIDR blocks; how overlapping or adjacent blocks are treated is up to
/// the implementation.
#[async_trait]
pub trait Normalizer: Send + Sync {
    async fn normalize(
        &self,
        blocks: &[String],
        progress: &dyn ProgressSink,
    ) -> Result<Vec<String>, NormalizationError>;
}

/// Picks the normalizer described by the configuration
pub fn from_config(config: &Config) -> Box<dyn Normalizer> {
    match &config.cleaner {
        Some(command) => Box::new(ExternalNormalizer::new(
            command.clone(),
            config.paths.cache.clone(),
        )),
        None => Box::new(AggregateNormalizer::new(config.paths.cache.clone())),
    }
}

async fn write_cache(
    cache_path: &Path,
    blocks: &[String],
    progress: &dyn ProgressSink,
) -> Result<(), NormalizationError> {
    progress.report(
        &format!("Writing cidr list to file {}", cache_path.display()),
        false,
    );
    write_lines(cache_path, blocks.iter(), progress)
        .await
        .map_err(|source| NormalizationError::Cache {
            path: cache_path.to_path_buf(),
            source,
        })?;
    complete(progress);
    Ok(())
}

/// Runs an external program with the cache file as its stdin and takes
/// each non-blank line of its stdout as a cleaned block.
pub struct ExternalNormalizer {
    command: CleanerCommand,
    cache_path: PathBuf,
}

impl ExternalNormalizer {
    pub fn new(command: CleanerCommand, cache_path: PathBuf) -> Self {
        Self {
            command,
            cache_path,
        }
    }

    /// Starts the cleaner reading from the cache file, returning it along
    /// with a description of the command line for error messages
    fn spawn(&self) -> Result<(Child, String), NormalizationError> {
        let stdin = std::fs::File::open(&self.cache_path).map_err(|source| {
            NormalizationError::Cache {
                path: self.cache_path.clone(),
                source,
            }
        })?;

        let mut cmd = Command::new(&self.command.program);
        cmd.args(&self.command.args)
            .stdin(Stdio::from(stdin))
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);
        let cmd_label = format!("{cmd:?}");

        let child = cmd.spawn().map_err(|source| NormalizationError::Spawn {
            command: cmd_label.clone(),
            source,
        })?;
        Ok((child, cmd_label))
    }
}

#[async_trait]
impl Normalizer for ExternalNormalizer {
    async fn normalize(
        &self,
        blocks: &[String],
        progress: &dyn ProgressSink,
    ) -> Result<Vec<String>, NormalizationError> {
        write_cache(&self.cache_path, blocks, progress).await?;

        let (mut child, cmd_label) = self.spawn()?;
        let missing_pipe = |name: &str| NormalizationError::Io {
            command: cmd_label.clone(),
            source: std::io::Error::other(format!("{name} was not captured")),
        };
        let stdout = child.stdout.take().ok_or_else(|| missing_pipe("stdout"))?;
        let stderr = child.stderr.take().ok_or_else(|| missing_pipe("stderr"))?;

        let read_stdout = async {
            let mut cleaned = vec![];
            let mut lines = BufReader::new(stdout).lines();
            while let Some(line) = lines.next_line().await? {
                let cidr = line.trim();
                if cidr.is_empty() {
                    continue;
                }
                tracing::trace!("cleaner produced {cidr}");
                cleaned.push(cidr.to_string());
            }
            Ok::<_, std::io::Error>(cleaned)
        };

        // Drained alongside stdout so that a chatty cleaner can't stall
        // on a full stderr pipe
        let forward_stderr = async {
            let mut lines = BufReader::new(stderr).lines();
            while let Ok(Some(line)) = lines.next_line().await {
                tracing::warn!("cleaner: {line}");
            }
        };

        let (cleaned, ()) = tokio::join!(read_stdout, forward_stderr);
        let cleaned = cleaned.map_err(|source| NormalizationError::Io {
            command: cmd_label.clone(),
            source,
        })?;

        let status = child
            .wait()
            .await
            .map_err(|source| NormalizationError::Io {
                command: cmd_label.clone(),
                source,
            })?;
        if !status.success() {
            return Err(NormalizationError::ExitStatus {
                command: cmd_label,
                status,
            });
        }
        if cleaned.is_empty() && !blocks.is_empty() {
            return Err(NormalizationError::NoOutput {
                command: cmd_label,
                count: blocks.len(),
            });
        }

        Ok(cleaned)
    }
}

/// Aggregates in-process: blocks covered by a broader block are dropped
/// and the two halves of a network are merged into that network. The
/// result is in ascending address order.
pub struct AggregateNormalizer {
    cache_path: PathBuf,
}

impl AggregateNormalizer {
    pub fn new(cache_path: PathBuf) -> Self {
        Self { cache_path }
    }
}

#[async_trait]
impl Normalizer for AggregateNormalizer {
    async fn normalize(
        &self,
        blocks: &[String],
        progress: &dyn ProgressSink,
    ) -> Result<Vec<String>, NormalizationError> {
        write_cache(&self.cache_path, blocks, progress).await?;

        let mut set = CidrSet::new();
        for block in blocks {
            set.insert(&parse_ipv4_cidr(block)?);
        }
        Ok(set.iter().map(|cidr| format_cidr(&cidr)).collect())
    }
}
