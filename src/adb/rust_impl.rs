// https://crates.io/crates/adb_client
use super::error::{AdbError, AdbResult};
use super::types::{AdbClient, Device, check_bounds, parse_screen_size};
use adb_client::{ADBDeviceExt, ADBServer, ADBServerDevice};
use std::net::SocketAddrV4;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Mutex;

const PNG_MAGIC: &[u8] = b"\x89PNG\r\n\x1a\n";
const INPUT_TIMEOUT: Duration = Duration::from_secs(5);
const CAPTURE_TIMEOUT: Duration = Duration::from_secs(10);

/// ADB backend speaking the server protocol directly through `adb_client`.
pub struct RustAdb {
    device: Device,
    server_device: Arc<Mutex<ADBServerDevice>>,
    screen_x: u32,
    screen_y: u32,
}

impl RustAdb {
    pub async fn list_devices() -> AdbResult<Vec<Device>> {
        let mut server = ADBServer::default();
        let device_list = tokio::task::spawn_blocking(move || server.devices())
            .await?
            .map_err(|e| AdbError::from_shell_error("devices".to_string(), e))?;
        Ok(device_list
            .into_iter()
            .map(|d| Device {
                name: d.identifier,
                state: format!("{:?}", d.state).to_lowercase(),
            })
            .collect())
    }

    /// Asks the adb server to connect to HOST:PORT, then opens the device.
    async fn open(address: &str) -> AdbResult<ADBServerDevice> {
        let socket: SocketAddrV4 = address.parse().map_err(|_| AdbError::InvalidAddress {
            address: address.to_string(),
        })?;
        let name = address.to_string();
        tokio::task::spawn_blocking(move || {
            let mut server = ADBServer::default();
            if let Err(e) = server.connect_device(socket) {
                // Already-connected devices report an error here; opening below decides
                log::debug!("RustAdb: connect {socket} reported: {e}");
            }
            server.get_device_by_name(&name)
        })
        .await?
        .map_err(|e| AdbError::ConnectionFailed {
            address: address.to_string(),
            message: e.to_string(),
        })
    }

    pub async fn connect(address: &str) -> AdbResult<Self> {
        let server_device = Self::open(address).await?;
        let mut adb = RustAdb {
            device: Device {
                name: address.to_string(),
                state: "device".to_string(),
            },
            server_device: Arc::new(Mutex::new(server_device)),
            screen_x: 0,
            screen_y: 0,
        };
        let size = adb.shell("wm size").await?;
        let (sx, sy) = parse_screen_size(&size).ok_or(AdbError::ScreenSizeParseFailed)?;
        adb.screen_x = sx;
        adb.screen_y = sy;
        log::info!("✅ Connected to {address} ({sx}x{sy}) via adb_client");
        Ok(adb)
    }

    /// Runs a blocking shell command on a worker thread so the timeout can fire.
    async fn run_shell(&self, args: Vec<String>, timeout: Duration) -> AdbResult<Vec<u8>> {
        let server_device = Arc::clone(&self.server_device);
        let command = args.join(" ");
        let task = tokio::task::spawn_blocking(move || -> AdbResult<Vec<u8>> {
            let mut out: Vec<u8> = Vec::new();
            let mut dev = server_device.blocking_lock();
            let refs: Vec<&str> = args.iter().map(|s| s.as_str()).collect();
            dev.shell_command(&refs, &mut out)
                .map_err(|e| AdbError::from_shell_error(args.join(" "), e))?;
            Ok(out)
        });
        match tokio::time::timeout(timeout, task).await {
            Ok(joined) => joined?,
            Err(_) => Err(AdbError::Timeout {
                duration: timeout,
                description: command,
            }),
        }
    }

    async fn capture_screen_bytes_internal(&self) -> AdbResult<Vec<u8>> {
        let server_device = Arc::clone(&self.server_device);
        let framebuffer = tokio::task::spawn_blocking(move || {
            let mut dev = server_device.blocking_lock();
            dev.framebuffer_bytes()
        })
        .await?;

        match framebuffer {
            Ok(bytes) if bytes.starts_with(PNG_MAGIC) => return Ok(bytes),
            Ok(bytes) => log::debug!(
                "RustAdb: framebuffer returned {} non-PNG bytes, falling back to screencap",
                bytes.len()
            ),
            Err(e) => log::debug!("RustAdb: framebuffer capture failed: {e}, falling back to screencap"),
        }

        let bytes = self
            .run_shell(vec!["screencap".into(), "-p".into()], CAPTURE_TIMEOUT)
            .await?;
        if bytes.is_empty() {
            return Err(AdbError::EmptyCapture);
        }
        Ok(bytes)
    }
}

impl AdbClient for RustAdb {
    async fn screen_capture_bytes(&self) -> AdbResult<Vec<u8>> {
        match tokio::time::timeout(CAPTURE_TIMEOUT, self.capture_screen_bytes_internal()).await {
            Ok(result) => result,
            Err(_) => Err(AdbError::Timeout {
                duration: CAPTURE_TIMEOUT,
                description: "screen capture (device may be disconnected)".to_string(),
            }),
        }
    }

    async fn tap(&self, x: u32, y: u32) -> AdbResult<()> {
        check_bounds(x, y, self.screen_dimensions())?;
        let args = vec!["input".into(), "tap".into(), x.to_string(), y.to_string()];
        self.run_shell(args, INPUT_TIMEOUT).await?;
        Ok(())
    }

    async fn swipe(&self, x1: u32, y1: u32, x2: u32, y2: u32, duration_ms: u32) -> AdbResult<()> {
        check_bounds(x1, y1, self.screen_dimensions())?;
        check_bounds(x2, y2, self.screen_dimensions())?;
        let mut args: Vec<String> = vec!["input".into(), "swipe".into()];
        args.extend([x1, y1, x2, y2, duration_ms].iter().map(|v| v.to_string()));
        // Swipes block for their own duration on the device
        let timeout = INPUT_TIMEOUT + Duration::from_millis(duration_ms as u64);
        self.run_shell(args, timeout).await?;
        Ok(())
    }

    async fn key_event(&self, code: u32) -> AdbResult<()> {
        let args = vec!["input".into(), "keyevent".into(), code.to_string()];
        self.run_shell(args, INPUT_TIMEOUT).await?;
        Ok(())
    }

    async fn shell(&self, command: &str) -> AdbResult<String> {
        let args = command.split_whitespace().map(str::to_string).collect();
        let out = self.run_shell(args, INPUT_TIMEOUT * 6).await?;
        Ok(String::from_utf8_lossy(&out).into_owned())
    }

    async fn reconnect(&self) -> AdbResult<()> {
        let fresh = Self::open(&self.device.name).await?;
        // A worker stuck on the old handle keeps the lock; give up rather than wait forever
        let mut current = tokio::time::timeout(INPUT_TIMEOUT, self.server_device.lock())
            .await
            .map_err(|_| AdbError::Timeout {
                duration: INPUT_TIMEOUT,
                description: "waiting for the previous adb handle".to_string(),
            })?;
        *current = fresh;
        log::info!("🔌 Reconnected to {} via adb_client", self.device.name);
        Ok(())
    }

    fn screen_dimensions(&self) -> (u32, u32) {
        (self.screen_x, self.screen_y)
    }

    fn device_name(&self) -> &str {
        &self.device.name
    }
}
