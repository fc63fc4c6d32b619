//! Client side of the channel: spawn the tool host, handshake, request,
//! tear down.

use std::collections::HashMap;
use std::process::Stdio;
use std::sync::atomic::{AtomicI64, Ordering};
use std::time::Duration;

use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::process::{Child, Command};
use tokio::sync::Mutex;
use tokio::time::timeout;

use crate::error::{Error, Result};
use crate::protocol::{
    CallToolParams, CallToolResult, InitializeParams, InitializeResult, JsonRpcRequest,
    JsonRpcResponse, ListToolsResult, RequestId, Tool,
};

/// Default timeout for a channel round-trip.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(15);

/// Maximum accepted response frame (1MB).
pub const MAX_FRAME_SIZE: usize = 1024 * 1024;

/// How to start a tool host process.
#[derive(Debug, Clone)]
pub struct HostConfig {
    pub command: String,
    pub args: Vec<String>,
    pub env: HashMap<String, String>,
}

/// One live connection to a tool host process.
///
/// The connection covers exactly one query's lifetime: spawn, [`initialize`],
/// some requests, [`close`]. `close` is idempotent; requests after it fail
/// with [`Error::Closed`]. The child is spawned with `kill_on_drop`, so a
/// dropped or cancelled client still takes the process down.
///
/// [`initialize`]: Client::initialize
/// [`close`]: Client::close
pub struct Client {
    process: Mutex<Child>,
    stdin: Mutex<tokio::process::ChildStdin>,
    stdout: Mutex<BufReader<tokio::process::ChildStdout>>,
    next_id: AtomicI64,
    initialized: Mutex<bool>,
    closed: Mutex<bool>,
    host_info: Mutex<Option<InitializeResult>>,
}

impl Client {
    /// Spawn the tool host process and attach to its stdio.
    pub async fn spawn(config: &HostConfig) -> Result<Self> {
        let mut cmd = Command::new(&config.command);
        cmd.args(&config.args)
            .envs(&config.env)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::inherit())
            .kill_on_drop(true);

        let mut process = cmd.spawn()?;

        let stdin = process
            .stdin
            .take()
            .ok_or_else(|| Error::Spawn(std::io::Error::other("failed to capture stdin")))?;

        let stdout = process
            .stdout
            .take()
            .ok_or_else(|| Error::Spawn(std::io::Error::other("failed to capture stdout")))?;

        Ok(Self {
            process: Mutex::new(process),
            stdin: Mutex::new(stdin),
            stdout: Mutex::new(BufReader::new(stdout)),
            next_id: AtomicI64::new(1),
            initialized: Mutex::new(false),
            closed: Mutex::new(false),
            host_info: Mutex::new(None),
        })
    }

    /// Perform the initialize handshake. Must complete before any other
    /// request.
    pub async fn initialize(&self) -> Result<()> {
        let params = InitializeParams::default();
        let result: InitializeResult = self.request("initialize", Some(params)).await?;

        self.notify("notifications/initialized", None::<()>).await?;

        *self.host_info.lock().await = Some(result);
        *self.initialized.lock().await = true;

        Ok(())
    }

    /// Host identity and capabilities (after initialization).
    pub async fn host_info(&self) -> Option<InitializeResult> {
        self.host_info.lock().await.clone()
    }

    /// Fetch the host's current tool list.
    ///
    /// No caching: each call round-trips, so the listing always reflects the
    /// live host.
    pub async fn list_tools(&self) -> Result<Vec<Tool>> {
        if !*self.initialized.lock().await {
            return Err(Error::NotInitialized);
        }
        let result: ListToolsResult = self.request("tools/list", None::<()>).await?;
        Ok(result.tools)
    }

    /// Invoke a tool by name.
    ///
    /// A result with `is_error = true` is returned as-is: the tool reporting
    /// failure is an application outcome, not a channel fault.
    pub async fn call_tool(
        &self,
        name: &str,
        arguments: serde_json::Map<String, serde_json::Value>,
    ) -> Result<CallToolResult> {
        if !*self.initialized.lock().await {
            return Err(Error::NotInitialized);
        }

        let params = CallToolParams {
            name: name.to_string(),
            arguments: Some(serde_json::Value::Object(arguments)),
        };

        self.request("tools/call", Some(params)).await
    }

    /// Whether the host process is still running.
    pub async fn is_running(&self) -> bool {
        let mut process = self.process.lock().await;
        matches!(process.try_wait(), Ok(None))
    }

    /// Tear down the connection: kill the host process and mark the channel
    /// closed. Idempotent; later calls are no-ops.
    pub async fn close(&self) {
        let mut closed = self.closed.lock().await;
        if *closed {
            return;
        }
        *closed = true;
        drop(closed);

        let mut process = self.process.lock().await;
        let _ = process.kill().await;
    }

    // --- Internal methods ---

    fn next_request_id(&self) -> RequestId {
        RequestId::Number(self.next_id.fetch_add(1, Ordering::SeqCst))
    }

    async fn request<P, R>(&self, method: &str, params: Option<P>) -> Result<R>
    where
        P: serde::Serialize,
        R: serde::de::DeserializeOwned,
    {
        if *self.closed.lock().await {
            return Err(Error::Closed);
        }

        let id = self.next_request_id();
        let mut request = JsonRpcRequest::new(id.clone(), method);
        if let Some(p) = params {
            request = request.with_params(p);
        }

        self.send_frame(&request).await?;

        let response = timeout(DEFAULT_TIMEOUT, self.read_response())
            .await
            .map_err(|_| Error::Timeout)??;

        if response.id.as_ref() != Some(&id) {
            return Err(Error::InvalidResponse(format!(
                "response ID mismatch: expected {id:?}, got {:?}",
                response.id
            )));
        }

        let result_value = response.into_result()?;
        let result: R = serde_json::from_value(result_value)?;

        Ok(result)
    }

    async fn notify<P>(&self, method: &str, params: Option<P>) -> Result<()>
    where
        P: serde::Serialize,
    {
        let mut notification = JsonRpcRequest::notification(method);
        if let Some(p) = params {
            notification = notification.with_params(p);
        }
        self.send_frame(&notification).await
    }

    async fn send_frame(&self, frame: &JsonRpcRequest) -> Result<()> {
        let json = serde_json::to_string(frame)?;
        let mut stdin = self.stdin.lock().await;
        stdin.write_all(json.as_bytes()).await?;
        stdin.write_all(b"\n").await?;
        stdin.flush().await?;
        Ok(())
    }

    async fn read_response(&self) -> Result<JsonRpcResponse> {
        let mut stdout = self.stdout.lock().await;
        let mut line = String::new();

        let bytes_read = stdout.read_line(&mut line).await?;
        if bytes_read == 0 {
            return Err(Error::HostExited);
        }

        if line.len() > MAX_FRAME_SIZE {
            return Err(Error::FrameTooLarge {
                size: line.len(),
                max: MAX_FRAME_SIZE,
            });
        }

        let response: JsonRpcResponse = serde_json::from_str(&line)?;
        Ok(response)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn host_config_creation() {
        let config = HostConfig {
            command: "coxswain".to_string(),
            args: vec!["serve".to_string()],
            env: HashMap::new(),
        };
        assert_eq!(config.command, "coxswain");
    }

    #[tokio::test]
    async fn requests_fail_before_initialize() {
        // A spawn against a command that only echoes never completes the
        // handshake; the guard must reject requests up front.
        let client = Client::spawn(&HostConfig {
            command: "cat".to_string(),
            args: vec![],
            env: HashMap::new(),
        })
        .await
        .unwrap();

        let err = client.list_tools().await.unwrap_err();
        assert!(matches!(err, Error::NotInitialized));
        client.close().await;
    }

    #[tokio::test]
    async fn close_is_idempotent_and_fences_requests() {
        let client = Client::spawn(&HostConfig {
            command: "cat".to_string(),
            args: vec![],
            env: HashMap::new(),
        })
        .await
        .unwrap();

        client.close().await;
        client.close().await;

        *client.initialized.lock().await = true;
        let err = client.list_tools().await.unwrap_err();
        assert!(matches!(err, Error::Closed));
    }
}
