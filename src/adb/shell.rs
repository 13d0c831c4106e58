use super::error::{AdbError, AdbResult};
use super::types::{AdbClient, Device, check_bounds, parse_screen_size};
use std::time::Duration;
use tokio::process::Command;

const COMMAND_TIMEOUT: Duration = Duration::from_secs(30);
const CAPTURE_TIMEOUT: Duration = Duration::from_secs(10);

/// ADB backend that drives the `adb` executable.
pub struct AdbShell {
    pub device: Device,
    pub screen_x: u32,
    pub screen_y: u32,
}

impl AdbShell {
    fn ensure_adb_available() -> AdbResult<()> {
        match std::process::Command::new("adb").arg("version").output() {
            Ok(out) if out.status.success() => Ok(()),
            Ok(out) => Err(AdbError::CommandFailed {
                command: "adb version".to_string(),
                stderr: format!("exit status {}", out.status),
            }),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Err(AdbError::AdbBinaryNotFound),
            Err(source) => Err(AdbError::SpawnFailed {
                command: "adb version".to_string(),
                source,
            }),
        }
    }

    /// Runs `adb <args>` with a timeout and returns stdout.
    async fn run_adb(args: &[&str], timeout: Duration) -> AdbResult<Vec<u8>> {
        let command = format!("adb {}", args.join(" "));
        let output = tokio::time::timeout(timeout, Command::new("adb").args(args).output())
            .await
            .map_err(|_| AdbError::Timeout {
                duration: timeout,
                description: command.clone(),
            })?
            .map_err(|source| {
                if source.kind() == std::io::ErrorKind::NotFound {
                    AdbError::AdbBinaryNotFound
                } else {
                    AdbError::SpawnFailed {
                        command: command.clone(),
                        source,
                    }
                }
            })?;
        if !output.status.success() {
            return Err(AdbError::CommandFailed {
                command,
                stderr: String::from_utf8_lossy(&output.stderr).trim().to_string(),
            });
        }
        Ok(output.stdout)
    }

    async fn run_device(&self, args: &[&str], timeout: Duration) -> AdbResult<Vec<u8>> {
        let mut full = vec!["-s", self.device.name.as_str()];
        full.extend_from_slice(args);
        Self::run_adb(&full, timeout).await
    }

    pub fn parse_devices(output: &str) -> Vec<Device> {
        output
            .lines()
            .skip(1)
            .filter_map(|line| {
                let mut parts = line.split_whitespace();
                let name = parts.next()?;
                let state = parts.next()?;
                Some(Device {
                    name: name.to_string(),
                    state: state.to_string(),
                })
            })
            .collect()
    }

    pub async fn list_devices() -> AdbResult<Vec<Device>> {
        Self::ensure_adb_available()?;
        let stdout = Self::run_adb(&["devices"], COMMAND_TIMEOUT).await?;
        Ok(Self::parse_devices(&String::from_utf8_lossy(&stdout)))
    }

    /// Asks the adb server to connect to HOST:PORT and waits for it to list the device online.
    async fn attach(address: &str) -> AdbResult<Device> {
        // Make sure the server is up before asking it to connect
        Self::run_adb(&["start-server"], COMMAND_TIMEOUT).await?;

        let stdout = Self::run_adb(&["connect", address], COMMAND_TIMEOUT).await?;
        let reply = String::from_utf8_lossy(&stdout).to_lowercase();
        if !reply.contains("connected") {
            return Err(AdbError::ConnectionFailed {
                address: address.to_string(),
                message: reply.trim().to_string(),
            });
        }

        Self::list_devices()
            .await?
            .into_iter()
            .find(|d| d.name == address && d.state == "device")
            .ok_or_else(|| AdbError::DeviceNotFound {
                name: address.to_string(),
            })
    }

    /// Connects to a network device (emulators such as BlueStacks listen on HOST:PORT).
    pub async fn connect(address: &str) -> AdbResult<Self> {
        Self::ensure_adb_available()?;
        let device = Self::attach(address).await?;
        let mut shell = Self {
            device,
            screen_x: 0,
            screen_y: 0,
        };
        let size = shell.shell("wm size").await?;
        let (screen_x, screen_y) = parse_screen_size(&size).ok_or(AdbError::ScreenSizeParseFailed)?;
        shell.screen_x = screen_x;
        shell.screen_y = screen_y;
        log::info!("✅ Connected to {address} ({screen_x}x{screen_y}) via adb binary");
        Ok(shell)
    }

    pub async fn disconnect(&self) -> AdbResult<()> {
        Self::run_adb(&["disconnect", &self.device.name], COMMAND_TIMEOUT).await?;
        Ok(())
    }
}

impl AdbClient for AdbShell {
    async fn screen_capture_bytes(&self) -> AdbResult<Vec<u8>> {
        let bytes = self
            .run_device(&["exec-out", "screencap", "-p"], CAPTURE_TIMEOUT)
            .await?;
        if bytes.is_empty() {
            return Err(AdbError::EmptyCapture);
        }
        Ok(bytes)
    }

    async fn tap(&self, x: u32, y: u32) -> AdbResult<()> {
        check_bounds(x, y, self.screen_dimensions())?;
        let (xs, ys) = (x.to_string(), y.to_string());
        self.run_device(&["shell", "input", "tap", &xs, &ys], COMMAND_TIMEOUT)
            .await?;
        Ok(())
    }

    async fn swipe(&self, x1: u32, y1: u32, x2: u32, y2: u32, duration_ms: u32) -> AdbResult<()> {
        check_bounds(x1, y1, self.screen_dimensions())?;
        check_bounds(x2, y2, self.screen_dimensions())?;
        let args = [x1, y1, x2, y2, duration_ms].map(|v| v.to_string());
        let mut cmd = vec!["shell", "input", "swipe"];
        cmd.extend(args.iter().map(String::as_str));
        self.run_device(&cmd, COMMAND_TIMEOUT).await?;
        Ok(())
    }

    async fn key_event(&self, code: u32) -> AdbResult<()> {
        let code = code.to_string();
        self.run_device(&["shell", "input", "keyevent", &code], COMMAND_TIMEOUT)
            .await?;
        Ok(())
    }

    async fn shell(&self, command: &str) -> AdbResult<String> {
        let stdout = self.run_device(&["shell", command], COMMAND_TIMEOUT).await?;
        Ok(String::from_utf8_lossy(&stdout).into_owned())
    }

    async fn reconnect(&self) -> AdbResult<()> {
        // A stale entry makes `adb connect` answer "already connected" without reconnecting
        if let Err(e) = self.disconnect().await {
            log::debug!("adb disconnect {} failed: {e}", self.device.name);
        }
        Self::attach(&self.device.name).await?;
        log::info!("🔌 Reconnected to {} via adb binary", self.device.name);
        Ok(())
    }

    fn screen_dimensions(&self) -> (u32, u32) {
        (self.screen_x, self.screen_y)
    }

    fn device_name(&self) -> &str {
        &self.device.name
    }
}
