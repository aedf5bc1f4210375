//! Shared utilities for integration testing.

#![allow(dead_code)]

use std::net::SocketAddr;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use futures_util::future::{BoxFuture, FutureExt};
use secure_upload::auth::{AuthenticationChain, BasicAuthenticator};
use secure_upload::config::{BasicCredentialConfig, GatewayConfig, GpgModuleConfig, ModuleConfig};
use secure_upload::http::{Gateway, HeaderSet, HttpServer};
use secure_upload::lifecycle::{start, Shutdown};
use secure_upload::modules::{FormFields, ModuleDispatcher, ModuleOutcome, RequestHead, UploadModule};
use secure_upload::net::Listener;
use secure_upload::security::{AbuseThrottle, RequestGate};
use tokio::task::JoinHandle;

pub const USER: &str = "uploader";
pub const PASSWORD: &str = "s3cret-pass";
pub const PASSPHRASE: &str = "letmein";

/// A gateway running on an ephemeral local port.
pub struct TestServer {
    pub addr: SocketAddr,
    pub shutdown: Shutdown,
    pub handle: JoinHandle<()>,
}

impl TestServer {
    pub fn url(&self, path: &str) -> String {
        format!("http://{}{}", self.addr, path)
    }

    /// Trigger shutdown and wait for the server task to finish.
    pub async fn stop(self) {
        self.shutdown.trigger();
        tokio::time::timeout(Duration::from_secs(5), self.handle)
            .await
            .expect("server did not stop")
            .unwrap();
    }
}

/// Config with one credential, loopback listener and short timeouts.
pub fn base_config() -> GatewayConfig {
    let mut config = GatewayConfig::default();
    config.listener.bind_address = "127.0.0.1:0".to_string();
    config.timeouts.shutdown_grace_secs = 1;
    config.auth.basic.push(BasicCredentialConfig {
        username: USER.to_string(),
        password: PASSWORD.to_string(),
    });
    config
}

pub fn gpg_config(executable: &Path, output_dir: PathBuf) -> GpgModuleConfig {
    GpgModuleConfig {
        passphrase: PASSPHRASE.to_string(),
        gpg_executable: executable.display().to_string(),
        output_dir,
        timeout_secs: 5,
        ..GpgModuleConfig::default()
    }
}

pub fn scratch_dir() -> PathBuf {
    std::env::temp_dir().join(format!("secure-upload-it-{}", unique_suffix()))
}

fn unique_suffix() -> String {
    use std::sync::atomic::{AtomicU64, Ordering};
    static NEXT: AtomicU64 = AtomicU64::new(0);
    format!("{}-{}", std::process::id(), NEXT.fetch_add(1, Ordering::Relaxed))
}

/// Write a stand-in for gpg that checks the passphrase line and echoes the rest.
#[cfg(unix)]
pub fn fake_gpg(dir: &Path) -> PathBuf {
    use std::os::unix::fs::PermissionsExt;

    std::fs::create_dir_all(dir).unwrap();
    let script = dir.join("fake-gpg");
    std::fs::write(
        &script,
        format!(
            "#!/bin/sh\nIFS= read -r pass\n[ \"$pass\" = \"{}\" ] || exit 2\ncat\n",
            PASSPHRASE
        ),
    )
    .unwrap();
    std::fs::set_permissions(&script, std::fs::Permissions::from_mode(0o755)).unwrap();
    script
}

/// Start a gateway built from `config` through the normal startup path.
pub async fn spawn_from_config(config: GatewayConfig) -> TestServer {
    let (server, listener) = start(&config).await.unwrap();
    run(server, listener).await
}

/// Start a gateway whose only module is `Echo`.
pub async fn spawn_with_echo(config: GatewayConfig) -> TestServer {
    let chain = AuthenticationChain::new(
        config
            .auth
            .basic
            .iter()
            .map(|c| {
                Box::new(BasicAuthenticator::new(&c.username, &c.password).unwrap())
                    as Box<dyn secure_upload::auth::Authenticator>
            })
            .collect(),
    );
    let throttle = Arc::new(AbuseThrottle::from_config(&config.throttle));
    let dispatcher = ModuleDispatcher::new(vec![Box::new(Echo::new())]).unwrap();
    let gateway = Gateway::new(
        RequestGate::new(chain, throttle),
        dispatcher,
        config.transport.clone(),
    );

    let listener = Listener::bind(&config.listener).await.unwrap();
    run(HttpServer::new(gateway, &config), listener).await
}

async fn run(server: HttpServer, listener: Listener) -> TestServer {
    let addr = listener.local_addr().unwrap();
    let shutdown = Shutdown::new();
    let receiver = shutdown.subscribe();
    let handle = tokio::spawn(async move {
        server.run(listener, receiver).await.unwrap();
    });
    TestServer {
        addr,
        shutdown,
        handle,
    }
}

/// Client without connection reuse, so every request is a fresh connection.
pub fn client() -> reqwest::Client {
    reqwest::Client::builder()
        .pool_max_idle_per_host(0)
        .timeout(Duration::from_secs(5))
        .build()
        .unwrap()
}

/// Client with default keep-alive pooling.
pub fn pooled_client() -> reqwest::Client {
    reqwest::Client::builder()
        .timeout(Duration::from_secs(5))
        .build()
        .unwrap()
}

/// Module claiming `/echo`: GET returns "ready", POST returns field `msg`.
#[derive(Debug)]
pub struct Echo {
    headers: HeaderSet,
}

impl Echo {
    pub fn new() -> Self {
        let mut headers = HeaderSet::new();
        headers.insert("X-Module", "echo");
        headers.insert("Server", "echo-module");
        Self { headers }
    }
}

impl Default for Echo {
    fn default() -> Self {
        Self::new()
    }
}

impl UploadModule for Echo {
    fn name(&self) -> &'static str {
        "echo"
    }

    fn additional_headers(&self) -> &HeaderSet {
        &self.headers
    }

    fn handle_get<'a>(&'a self, request: &'a RequestHead) -> BoxFuture<'a, ModuleOutcome> {
        async move {
            if request.path == "/echo" {
                ModuleOutcome::Success("ready".to_string())
            } else {
                ModuleOutcome::NotApplicable
            }
        }
        .boxed()
    }

    fn handle_post<'a>(
        &'a self,
        request: &'a RequestHead,
        fields: &'a FormFields,
    ) -> BoxFuture<'a, ModuleOutcome> {
        async move {
            if request.path != "/echo" {
                return ModuleOutcome::NotApplicable;
            }
            match fields.get("msg") {
                Some(value) => ModuleOutcome::Success(String::from_utf8_lossy(value).into_owned()),
                None => ModuleOutcome::Failure("msg field missing".to_string()),
            }
        }
        .boxed()
    }
}

pub fn add_gpg_module(config: &mut GatewayConfig, module: GpgModuleConfig) {
    config.modules.push(ModuleConfig::Gpg(module));
}
