//! Shared harness for the binary-level tests: a loopback HTTP stub with a
//! chosen behavior and helpers to drive the `blowhole` executable.

use std::ffi::OsStr;
use std::io::{ErrorKind, Read, Write};
use std::net::{SocketAddr, TcpListener, TcpStream};
use std::process::{Child, Command, Output, Stdio};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::thread;
use std::time::{Duration, Instant};

/// How the stub treats every connection it accepts.
#[derive(Debug, Clone, Copy)]
pub enum StubReply {
    /// Answers each request with this status and an empty body.
    Status(u16),
    /// Accepts the connection and never answers.
    Silent,
}

pub struct StubServer {
    addr: SocketAddr,
    stop: Arc<AtomicBool>,
    acceptor: Option<thread::JoinHandle<()>>,
}

impl StubServer {
    pub fn url(&self) -> String {
        format!("http://{}/", self.addr)
    }
}

impl Drop for StubServer {
    fn drop(&mut self) {
        self.stop.store(true, Ordering::SeqCst);
        // Wakes the blocking accept so the loop sees the flag.
        drop(TcpStream::connect(self.addr));
        if let Some(acceptor) = self.acceptor.take() {
            drop(acceptor.join());
        }
    }
}

/// Starts a stub on an ephemeral loopback port. Returns `None` when the
/// sandbox forbids binding sockets.
///
/// # Errors
///
/// Returns an error if binding fails for any other reason.
pub fn spawn_stub(reply: StubReply) -> Result<Option<StubServer>, String> {
    let listener = match TcpListener::bind("127.0.0.1:0") {
        Ok(listener) => listener,
        Err(err) if err.kind() == ErrorKind::PermissionDenied => {
            eprintln!("Skipping e2e test: {}", err);
            return Ok(None);
        }
        Err(err) => return Err(format!("bind stub server failed: {}", err)),
    };
    let addr = listener
        .local_addr()
        .map_err(|err| format!("stub server addr failed: {}", err))?;
    let stop = Arc::new(AtomicBool::new(false));
    let acceptor = {
        let stop = Arc::clone(&stop);
        thread::spawn(move || serve(&listener, reply, &stop))
    };
    Ok(Some(StubServer {
        addr,
        stop,
        acceptor: Some(acceptor),
    }))
}

fn serve(listener: &TcpListener, reply: StubReply, stop: &AtomicBool) {
    let mut held = Vec::new();
    for stream in listener.incoming() {
        if stop.load(Ordering::SeqCst) {
            break;
        }
        let Ok(stream) = stream else {
            continue;
        };
        match reply {
            StubReply::Status(status) => {
                thread::spawn(move || answer(stream, status));
            }
            StubReply::Silent => held.push(stream),
        }
    }
}

fn answer(mut stream: TcpStream, status: u16) {
    let mut request = Vec::new();
    let mut chunk = [0u8; 1024];
    while !request.windows(4).any(|window| window == b"\r\n\r\n") {
        match stream.read(&mut chunk) {
            Ok(0) | Err(_) => return,
            Ok(read) => request.extend_from_slice(chunk.get(..read).unwrap_or_default()),
        }
    }
    let response = format!(
        "HTTP/1.1 {} Stub\r\nContent-Length: 0\r\nConnection: close\r\n\r\n",
        status
    );
    if stream.write_all(response.as_bytes()).is_ok() {
        drop(stream.flush());
    }
}

/// A loopback address nothing listens on once this returns.
///
/// # Errors
///
/// Returns an error if no local port can be reserved.
pub fn free_addr() -> Result<String, String> {
    TcpListener::bind("127.0.0.1:0")
        .and_then(|listener| listener.local_addr())
        .map(|addr| addr.to_string())
        .map_err(|err| format!("reserve port failed: {}", err))
}

/// Target URL whose connections are refused.
///
/// # Errors
///
/// Returns an error if no local port can be reserved.
pub fn refused_url() -> Result<String, String> {
    Ok(format!("http://{}/", free_addr()?))
}

fn blowhole(args: impl IntoIterator<Item = impl AsRef<OsStr>>) -> Result<Command, String> {
    let bin = option_env!("CARGO_BIN_EXE_blowhole")
        .ok_or_else(|| "CARGO_BIN_EXE_blowhole missing at compile time.".to_owned())?;
    let mut command = Command::new(bin);
    command
        .args(args)
        .env("BLOWHOLE_LOG", "error")
        .env_remove("BLOWHOLE_COORDINATOR")
        .stdin(Stdio::null());
    Ok(command)
}

/// Runs `blowhole` to completion and captures its output.
///
/// # Errors
///
/// Returns an error if the binary cannot be executed.
pub fn run_blowhole(args: impl IntoIterator<Item = impl AsRef<OsStr>>) -> Result<Output, String> {
    blowhole(args)?
        .output()
        .map_err(|err| format!("run blowhole failed: {}", err))
}

/// Starts `blowhole` in the background with piped output.
///
/// # Errors
///
/// Returns an error if the process cannot be started.
pub fn spawn_blowhole(args: impl IntoIterator<Item = impl AsRef<OsStr>>) -> Result<Child, String> {
    blowhole(args)?
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .spawn()
        .map_err(|err| format!("spawn blowhole failed: {}", err))
}

/// Waits up to `timeout` for `child` to exit and collects its output. A
/// child still running at the deadline is killed.
///
/// # Errors
///
/// Returns an error on timeout or when waiting fails.
pub fn finish(mut child: Child, timeout: Duration) -> Result<Output, String> {
    let deadline = Instant::now()
        .checked_add(timeout)
        .ok_or_else(|| "timeout overflow".to_owned())?;
    loop {
        let exited = child
            .try_wait()
            .map_err(|err| format!("wait failed: {}", err))?;
        if exited.is_some() {
            return child
                .wait_with_output()
                .map_err(|err| format!("collect output failed: {}", err));
        }
        if Instant::now() >= deadline {
            drop(child.kill());
            drop(child.wait());
            return Err(format!("blowhole still running after {:?}", timeout));
        }
        thread::sleep(Duration::from_millis(50));
    }
}

/// Delivers SIGINT to `child`, as Ctrl+C would.
///
/// # Errors
///
/// Returns an error if the signal cannot be sent.
#[cfg(unix)]
pub fn interrupt(child: &Child) -> Result<(), String> {
    let status = Command::new("kill")
        .args(["-INT", child.id().to_string().as_str()])
        .status()
        .map_err(|err| format!("kill failed: {}", err))?;
    if status.success() {
        Ok(())
    } else {
        Err(format!("kill -INT exited with {}", status))
    }
}

pub fn stdout_of(output: &Output) -> String {
    String::from_utf8_lossy(&output.stdout).into_owned()
}

pub fn stderr_of(output: &Output) -> String {
    String::from_utf8_lossy(&output.stderr).into_owned()
}

/// # Errors
///
/// Returns both streams when the process did not exit successfully.
pub fn ensure_success(output: &Output) -> Result<(), String> {
    if output.status.success() {
        return Ok(());
    }
    Err(format!(
        "status: {}\nstdout: {}\nstderr: {}",
        output.status,
        stdout_of(output),
        stderr_of(output)
    ))
}
