//! Symmetric GPG decryption module.
//!
//! # Responsibilities
//! - Claim requests on the configured upload paths
//! - Serve a minimal upload form on GET
//! - Decrypt the uploaded `file` field with the pre-shared passphrase
//! - Store the plaintext under a fresh name in the output directory
//!
//! # Design Decisions
//! - The passphrase goes to gpg over stdin, never on the command line
//! - gpg runs with a timeout and is killed if the request future is dropped
//! - Client-facing failure messages are generic; details go to the log

use std::fmt;
use std::path::PathBuf;
use std::process::Stdio;
use std::time::Duration;

use futures_util::future::{BoxFuture, FutureExt};
use thiserror::Error;
use tokio::io::AsyncWriteExt;
use tokio::process::Command;
use uuid::Uuid;
use zeroize::Zeroizing;

use super::{FormFields, ModuleOutcome, RequestHead, UploadModule};
use crate::config::GpgModuleConfig;
use crate::http::response::HeaderSet;
use crate::routing::{AnyMatcher, ExactPathMatcher, Matcher, PathPrefixMatcher};

/// Form field carrying the encrypted upload.
pub const FILE_FIELD: &str = "file";

const UPLOAD_FORM: &str = r#"<!DOCTYPE html>
<html>
<head><title>Upload</title></head>
<body>
<form method="post" enctype="multipart/form-data">
<input type="file" name="file" required>
<button type="submit">Upload</button>
</form>
</body>
</html>
"#;

#[derive(Debug, Error)]
pub enum ModuleError {
    #[error("failed to start {program}: {source}")]
    Spawn {
        program: String,
        source: std::io::Error,
    },

    #[error("decryption did not finish within {0} seconds")]
    Timeout(u64),

    #[error("gpg exited with status {code:?}: {stderr}")]
    Exit { code: Option<i32>, stderr: String },

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Decrypts uploads with `gpg --decrypt` and a pre-shared passphrase.
pub struct GpgModule {
    passphrase: Zeroizing<String>,
    executable: String,
    output_dir: PathBuf,
    timeout: Duration,
    matcher: AnyMatcher,
    additional_headers: HeaderSet,
}

impl GpgModule {
    pub fn from_config(config: &GpgModuleConfig) -> Self {
        let mut matchers: Vec<Box<dyn Matcher>> =
            vec![Box::new(ExactPathMatcher::new(&config.paths))];
        for prefix in &config.path_prefixes {
            matchers.push(Box::new(PathPrefixMatcher::new(prefix.clone())));
        }

        Self {
            passphrase: Zeroizing::new(config.passphrase.clone()),
            executable: config.gpg_executable.clone(),
            output_dir: config.output_dir.clone(),
            timeout: Duration::from_secs(config.timeout_secs),
            matcher: AnyMatcher::new(matchers),
            additional_headers: config.additional_headers.iter().collect(),
        }
    }

    async fn decrypt(&self, ciphertext: &[u8]) -> Result<Vec<u8>, ModuleError> {
        let mut child = Command::new(&self.executable)
            .args([
                "--batch",
                "--yes",
                "--quiet",
                "--no-tty",
                "--pinentry-mode",
                "loopback",
                "--passphrase-fd",
                "0",
                "--decrypt",
            ])
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()
            .map_err(|source| ModuleError::Spawn {
                program: self.executable.clone(),
                source,
            })?;

        // The passphrase line comes first; gpg reads it byte by byte, then
        // treats the rest of stdin as the message.
        let mut input = Zeroizing::new(Vec::with_capacity(
            self.passphrase.len() + 1 + ciphertext.len(),
        ));
        input.extend_from_slice(self.passphrase.as_bytes());
        input.push(b'\n');
        input.extend_from_slice(ciphertext);

        let mut stdin = child.stdin.take().ok_or_else(|| {
            ModuleError::Io(std::io::Error::new(
                std::io::ErrorKind::BrokenPipe,
                "gpg stdin unavailable",
            ))
        })?;
        let feed = async move {
            let result = stdin.write_all(&input).await;
            drop(stdin);
            result
        };

        let (fed, output) = tokio::time::timeout(self.timeout, async {
            tokio::join!(feed, child.wait_with_output())
        })
        .await
        .map_err(|_| ModuleError::Timeout(self.timeout.as_secs()))?;

        let output = output?;
        if !output.status.success() {
            return Err(ModuleError::Exit {
                code: output.status.code(),
                stderr: String::from_utf8_lossy(&output.stderr).trim().to_string(),
            });
        }
        fed?;
        Ok(output.stdout)
    }

    async fn process_upload(&self, request: &RequestHead, fields: &FormFields) -> ModuleOutcome {
        let Some(ciphertext) = fields.get(FILE_FIELD).filter(|data| !data.is_empty()) else {
            return ModuleOutcome::Failure("No file uploaded".to_string());
        };

        let plaintext = match self.decrypt(ciphertext).await {
            Ok(plaintext) => Zeroizing::new(plaintext),
            Err(e) => {
                tracing::warn!(client = %request.source, error = %e, "Decryption failed");
                return ModuleOutcome::Failure("Decryption failed".to_string());
            }
        };

        let id = Uuid::new_v4();
        let target = self.output_dir.join(id.to_string());
        let stored = async {
            tokio::fs::create_dir_all(&self.output_dir).await?;
            tokio::fs::write(&target, plaintext.as_slice()).await
        };
        if let Err(e) = stored.await {
            tracing::warn!(path = %target.display(), error = %e, "Failed to store decrypted upload");
            return ModuleOutcome::Failure("Failed to store the decrypted file".to_string());
        }

        tracing::info!(
            client = %request.source,
            upload_id = %id,
            bytes = plaintext.len(),
            "Stored decrypted upload"
        );
        ModuleOutcome::Success(format!("Upload {} decrypted ({} bytes)", id, plaintext.len()))
    }
}

impl fmt::Debug for GpgModule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("GpgModule")
            .field("executable", &self.executable)
            .field("output_dir", &self.output_dir)
            .field("timeout", &self.timeout)
            .field("matcher", &self.matcher)
            .finish_non_exhaustive()
    }
}

impl UploadModule for GpgModule {
    fn name(&self) -> &'static str {
        "gpg"
    }

    fn additional_headers(&self) -> &HeaderSet {
        &self.additional_headers
    }

    fn handle_get<'a>(&'a self, request: &'a RequestHead) -> BoxFuture<'a, ModuleOutcome> {
        let outcome = if self.matcher.matches(request) {
            ModuleOutcome::Success(UPLOAD_FORM.to_string())
        } else {
            ModuleOutcome::NotApplicable
        };
        async move { outcome }.boxed()
    }

    fn handle_post<'a>(
        &'a self,
        request: &'a RequestHead,
        fields: &'a FormFields,
    ) -> BoxFuture<'a, ModuleOutcome> {
        async move {
            if !self.matcher.matches(request) {
                return ModuleOutcome::NotApplicable;
            }
            self.process_upload(request, fields).await
        }
        .boxed()
    }
}
