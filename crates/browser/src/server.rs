//! Site server management - spawning the server that hosts the pages and
//! waiting until it answers

use std::path::PathBuf;
use std::process::{Child, Command, Stdio};
use std::time::Duration;

use tokio::time::sleep;
use tracing::{debug, info, warn};

use crate::error::{BrowserError, BrowserResult};

/// Placeholder replaced by the chosen port in [`ServerConfig::command`]
pub const PORT_PLACEHOLDER: &str = "{port}";

/// Configuration for spawning a site server
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Shell command that serves the pages, e.g. `node server.js` or
    /// `python3 -m http.server {port}`. `PORT` is also set in its environment.
    pub command: String,

    /// Working directory for the command
    pub working_dir: Option<PathBuf>,

    /// Port to listen on (None = find free port)
    pub port: Option<u16>,

    /// Timeout for server startup
    pub startup_timeout: Duration,

    /// Delay between readiness probes
    pub poll_interval: Duration,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            command: "node server.js".to_string(),
            working_dir: None,
            port: None,
            startup_timeout: Duration::from_secs(30),
            poll_interval: Duration::from_millis(100),
        }
    }
}

impl ServerConfig {
    pub fn new(command: impl Into<String>) -> Self {
        Self {
            command: command.into(),
            ..Self::default()
        }
    }

    fn command_line(&self, port: u16) -> String {
        self.command.replace(PORT_PLACEHOLDER, &port.to_string())
    }
}

/// Handle to a running site server. The process is stopped on drop.
pub struct SiteServer {
    child: Child,
    base_url: String,
    port: u16,
}

impl SiteServer {
    /// Spawn the server and wait until it answers on its base URL
    pub async fn spawn(config: ServerConfig) -> BrowserResult<Self> {
        let port = match config.port {
            Some(port) => port,
            None => find_free_port()?,
        };
        let base_url = format!("http://127.0.0.1:{}", port);
        let command_line = config.command_line(port);

        info!("Spawning site server on port {}: {}", port, command_line);

        let mut cmd = Command::new("sh");
        cmd.arg("-c")
            .arg(&command_line)
            .env("PORT", port.to_string())
            .stdout(Stdio::null())
            .stderr(Stdio::null());
        if let Some(dir) = &config.working_dir {
            cmd.current_dir(dir);
        }

        let child = cmd
            .spawn()
            .map_err(|e| BrowserError::ServerStartup(format!("Failed to spawn '{}': {}", command_line, e)))?;

        let mut server = SiteServer {
            child,
            base_url: base_url.clone(),
            port,
        };

        server.wait_until_ready(&config).await?;

        info!("Site server is answering at {}", base_url);
        Ok(server)
    }

    /// Poll the base URL until any HTTP response comes back
    async fn wait_until_ready(&mut self, config: &ServerConfig) -> BrowserResult<()> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(2))
            .build()?;

        let start = std::time::Instant::now();
        let mut attempts = 0;

        while start.elapsed() < config.startup_timeout {
            attempts += 1;

            if let Ok(Some(status)) = self.child.try_wait() {
                return Err(BrowserError::ServerStartup(format!("server exited early with {}", status)));
            }

            match client.get(&self.base_url).send().await {
                Ok(resp) => {
                    debug!("Readiness probe answered {}", resp.status());
                    return Ok(());
                }
                Err(e) => {
                    if attempts == 1 {
                        info!("Waiting for site server to start...");
                    }
                    // connection refused is expected while the server starts
                    if !e.is_connect() {
                        warn!("Readiness probe error: {}", e);
                    }
                }
            }

            sleep(config.poll_interval).await;
        }

        Err(BrowserError::ServerHealthCheck(attempts))
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub fn port(&self) -> u16 {
        self.port
    }

    /// Stop the server
    pub fn stop(&mut self) -> BrowserResult<()> {
        if let Ok(Some(_)) = self.child.try_wait() {
            return Ok(());
        }
        info!("Stopping site server (pid: {})", self.child.id());

        // Try graceful shutdown first
        #[cfg(unix)]
        {
            use nix::sys::signal::{kill, Signal};
            use nix::unistd::Pid;

            let pid = Pid::from_raw(self.child.id() as i32);
            if kill(pid, Signal::SIGTERM).is_ok() {
                std::thread::sleep(Duration::from_millis(500));
            }
        }

        // Force kill if still running
        let _ = self.child.kill();
        let _ = self.child.wait();

        Ok(())
    }
}

impl Drop for SiteServer {
    fn drop(&mut self) {
        let _ = self.stop();
    }
}

/// Find a free port to use
pub fn find_free_port() -> BrowserResult<u16> {
    use std::net::TcpListener;

    let listener = TcpListener::bind("127.0.0.1:0")?;
    Ok(listener.local_addr()?.port())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_find_free_port() {
        let port1 = find_free_port().unwrap();
        let port2 = find_free_port().unwrap();

        assert!(port1 > 1024);
        assert!(port2 > 1024);
    }

    #[test]
    fn test_port_placeholder_is_substituted() {
        let config = ServerConfig::new("python3 -m http.server {port} --bind 127.0.0.1");
        assert_eq!(config.command_line(8123), "python3 -m http.server 8123 --bind 127.0.0.1");
        assert_eq!(ServerConfig::default().command_line(8123), "node server.js");
    }

    #[tokio::test]
    async fn test_server_that_exits_is_reported() {
        let mut config = ServerConfig::new("exit 3");
        config.startup_timeout = Duration::from_secs(5);
        let err = SiteServer::spawn(config).await.err().unwrap();
        assert!(matches!(err, BrowserError::ServerStartup(_) | BrowserError::ServerHealthCheck(_)));
    }

    #[tokio::test]
    async fn test_server_never_answering_times_out() {
        let mut config = ServerConfig::new("sleep 5");
        config.startup_timeout = Duration::from_millis(300);
        config.poll_interval = Duration::from_millis(50);
        let err = SiteServer::spawn(config).await.err().unwrap();
        assert!(matches!(err, BrowserError::ServerHealthCheck(n) if n >= 1));
    }
}
