use std::collections::BTreeMap;
use std::io::Read;
use std::path::{Path, PathBuf};
use std::process::{Child, Command, Output, Stdio};
use std::sync::OnceLock;
use std::time::{Duration, Instant};

use anyhow::{anyhow, Context, Result};
use serde::Deserialize;
use tracing::debug;

use gokeep_core::{Error, Module, ModuleVersion, Vulnerability};

use crate::buildinfo::BuildInfo;
use crate::modfile::ModuleManifest;
use crate::vuln::parse_vulncheck_output;

/// Where a module's source of truth lives, as reported by the proxy.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct ModuleOrigin {
    #[serde(rename = "VCS", default)]
    pub vcs: String,
    #[serde(rename = "URL", default)]
    pub url: String,
    #[serde(rename = "Ref", default)]
    pub reference: String,
    #[serde(rename = "Hash", default)]
    pub hash: String,
}

/// The build-toolchain port. One production adapter shells out to `go`
/// and `govulncheck`; tests substitute a scripted double.
pub trait Toolchain: Send + Sync {
    fn build_info(&self, path: &Path) -> Result<BuildInfo>;
    fn latest_module_version(&self, module_path: &str) -> Result<Module>;
    fn module_file(&self, module_path: &str, version: &ModuleVersion) -> Result<ModuleManifest>;
    fn module_origin(&self, module_path: &str, version: &ModuleVersion) -> Result<ModuleOrigin>;
    fn install(&self, dest_dir: &Path, import_path: &str, version: &ModuleVersion) -> Result<()>;
    fn vuln_check(&self, path: &Path) -> Result<Vec<Vulnerability>>;
    fn go_version(&self) -> Result<String>;
    fn go_os(&self) -> Result<String>;
    fn go_arch(&self) -> Result<String>;
}

/// Subcommands report "module not found" in several phrasings; these
/// are matched against stderr to recognize the condition.
const MODULE_NOT_FOUND_PHRASES: &[&str] = &[
    "no matching versions",
    "unknown revision",
    "unrecognized import path",
    "malformed module path",
    "not a known dependency",
    "404 Not Found",
    "410 Gone",
];

pub struct GoCli {
    go_bin: PathBuf,
    vulncheck_bin: PathBuf,
    /// Cooperative deadline for every subprocess invocation.
    timeout: Option<Duration>,
    env: OnceLock<GoEnv>,
}

#[derive(Debug, Clone)]
struct GoEnv {
    version: String,
    os: String,
    arch: String,
}

#[derive(Debug, Deserialize)]
struct ListModuleJson {
    #[serde(rename = "Path", default)]
    path: String,
    #[serde(rename = "Version", default)]
    version: String,
    #[serde(rename = "Origin", default)]
    origin: Option<ModuleOrigin>,
}

#[derive(Debug, Deserialize)]
struct DownloadModuleJson {
    #[serde(rename = "GoMod", default)]
    go_mod: String,
    #[serde(rename = "Error", default)]
    error: String,
}

impl GoCli {
    pub fn new() -> Self {
        Self {
            go_bin: PathBuf::from("go"),
            vulncheck_bin: PathBuf::from("govulncheck"),
            timeout: None,
            env: OnceLock::new(),
        }
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    pub fn with_binaries(mut self, go_bin: impl Into<PathBuf>, vulncheck_bin: impl Into<PathBuf>) -> Self {
        self.go_bin = go_bin.into();
        self.vulncheck_bin = vulncheck_bin.into();
        self
    }

    fn run_go(&self, args: &[&str], envs: &BTreeMap<String, String>) -> Result<Output> {
        let mut command = Command::new(&self.go_bin);
        command.args(args);
        for (key, value) in envs {
            command.env(key, value);
        }
        debug!(args = ?args, "invoking go");
        run_with_deadline(command, self.timeout)
            .with_context(|| format!("failed to run go {}", args.join(" ")))
    }

    fn go_env(&self) -> Result<&GoEnv> {
        if let Some(env) = self.env.get() {
            return Ok(env);
        }
        let output = self.run_go(&["env", "GOVERSION", "GOOS", "GOARCH"], &BTreeMap::new())?;
        if !output.status.success() {
            return Err(anyhow!(
                "go env failed: {}",
                String::from_utf8_lossy(&output.stderr).trim()
            ));
        }
        let stdout = String::from_utf8_lossy(&output.stdout);
        let mut lines = stdout.lines();
        let env = GoEnv {
            version: lines.next().unwrap_or_default().trim().to_string(),
            os: lines.next().unwrap_or_default().trim().to_string(),
            arch: lines.next().unwrap_or_default().trim().to_string(),
        };
        if env.version.is_empty() || env.os.is_empty() || env.arch.is_empty() {
            return Err(anyhow!("go env returned an incomplete report"));
        }
        Ok(self.env.get_or_init(|| env))
    }

    fn list_module(&self, query: &str) -> Result<ListModuleJson> {
        let output = self.run_go(&["list", "-m", "-json", query], &BTreeMap::new())?;
        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            if is_not_found_stderr(&stderr) {
                return Err(Error::ModuleNotFound(query.to_string()).into());
            }
            return Err(anyhow!("go list -m {query} failed: {}", stderr.trim()));
        }
        serde_json::from_slice(&output.stdout)
            .with_context(|| format!("failed to parse go list output for {query}"))
    }
}

impl Default for GoCli {
    fn default() -> Self {
        Self::new()
    }
}

impl Toolchain for GoCli {
    fn build_info(&self, path: &Path) -> Result<BuildInfo> {
        let path_label = path.display().to_string();
        let output = self.run_go(&["version", "-m", &path_label], &BTreeMap::new())?;
        if !output.status.success() {
            return Err(Error::BinaryNotFound(path_label).into());
        }
        let stdout = String::from_utf8_lossy(&output.stdout);
        BuildInfo::parse(&path_label, &stdout)
    }

    fn latest_module_version(&self, module_path: &str) -> Result<Module> {
        let query = format!("{module_path}@latest");
        let listed = self.list_module(&query)?;
        if listed.version.is_empty() {
            return Err(Error::ModuleInfoUnavailable(module_path.to_string()).into());
        }
        Ok(Module::new(listed.path, ModuleVersion::parse(&listed.version)?))
    }

    fn module_file(&self, module_path: &str, version: &ModuleVersion) -> Result<ModuleManifest> {
        let query = format!("{module_path}@{version}");
        let output = self.run_go(&["mod", "download", "-json", &query], &BTreeMap::new())?;
        let stdout = String::from_utf8_lossy(&output.stdout);
        let downloaded: DownloadModuleJson = serde_json::from_str(&stdout)
            .with_context(|| format!("failed to parse go mod download output for {query}"))?;
        if !downloaded.error.is_empty() {
            if is_not_found_stderr(&downloaded.error) {
                return Err(Error::ModuleNotFound(query).into());
            }
            return Err(anyhow!("go mod download {query} failed: {}", downloaded.error));
        }
        if downloaded.go_mod.is_empty() {
            return Err(anyhow!("go mod download {query} reported no go.mod file"));
        }
        let raw = std::fs::read_to_string(&downloaded.go_mod)
            .with_context(|| format!("failed to read {}", downloaded.go_mod))?;
        ModuleManifest::parse(&raw)
            .with_context(|| format!("failed to parse go.mod for {query}"))
    }

    fn module_origin(&self, module_path: &str, version: &ModuleVersion) -> Result<ModuleOrigin> {
        let query = format!("{module_path}@{version}");
        let listed = self.list_module(&query)?;
        listed
            .origin
            .filter(|origin| !origin.url.is_empty())
            .ok_or_else(|| Error::OriginUnavailable(module_path.to_string()).into())
    }

    fn install(&self, dest_dir: &Path, import_path: &str, version: &ModuleVersion) -> Result<()> {
        let spec = format!("{import_path}@{version}");
        let mut envs = BTreeMap::new();
        envs.insert("GOBIN".to_string(), dest_dir.display().to_string());
        let output = self.run_go(&["install", &spec], &envs)?;
        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            if is_not_found_stderr(&stderr) {
                return Err(Error::ModuleNotFound(spec).into());
            }
            return Err(anyhow!("go install {spec} failed: {}", stderr.trim()));
        }
        Ok(())
    }

    fn vuln_check(&self, path: &Path) -> Result<Vec<Vulnerability>> {
        let path_label = path.display().to_string();
        let mut command = Command::new(&self.vulncheck_bin);
        command.args(["-mode=binary", "-json", &path_label]);
        debug!(path = %path_label, "invoking govulncheck");
        let output = run_with_deadline(command, self.timeout)
            .with_context(|| format!("failed to run govulncheck for {path_label}"))?;
        // govulncheck exits non-zero when findings exist; only treat a
        // run with unparseable output as a failure.
        let stdout = String::from_utf8_lossy(&output.stdout);
        parse_vulncheck_output(&stdout).with_context(|| {
            format!(
                "vulnerability scan failed for {path_label}: {}",
                String::from_utf8_lossy(&output.stderr).trim()
            )
        })
    }

    fn go_version(&self) -> Result<String> {
        Ok(self.go_env()?.version.clone())
    }

    fn go_os(&self) -> Result<String> {
        Ok(self.go_env()?.os.clone())
    }

    fn go_arch(&self) -> Result<String> {
        Ok(self.go_env()?.arch.clone())
    }
}

fn is_not_found_stderr(stderr: &str) -> bool {
    MODULE_NOT_FOUND_PHRASES
        .iter()
        .any(|phrase| stderr.contains(phrase))
}

/// Run a subprocess to completion, enforcing an optional deadline by
/// polling. Output pipes are drained on helper threads so a chatty
/// child cannot deadlock against a full pipe buffer.
fn run_with_deadline(mut command: Command, timeout: Option<Duration>) -> Result<Output> {
    let Some(timeout) = timeout else {
        return command.output().map_err(Into::into);
    };

    command.stdin(Stdio::null());
    command.stdout(Stdio::piped());
    command.stderr(Stdio::piped());
    let mut child = command.spawn()?;

    let stdout_reader = drain_pipe(child.stdout.take());
    let stderr_reader = drain_pipe(child.stderr.take());

    let status = wait_with_deadline(&mut child, timeout)?;
    let stdout = stdout_reader.join().unwrap_or_default();
    let stderr = stderr_reader.join().unwrap_or_default();
    Ok(Output {
        status,
        stdout,
        stderr,
    })
}

fn drain_pipe<R: Read + Send + 'static>(
    pipe: Option<R>,
) -> std::thread::JoinHandle<Vec<u8>> {
    std::thread::spawn(move || {
        let mut buffer = Vec::new();
        if let Some(mut pipe) = pipe {
            let _ = pipe.read_to_end(&mut buffer);
        }
        buffer
    })
}

fn wait_with_deadline(
    child: &mut Child,
    timeout: Duration,
) -> Result<std::process::ExitStatus> {
    let deadline = Instant::now() + timeout;
    loop {
        if let Some(status) = child.try_wait()? {
            return Ok(status);
        }
        if Instant::now() >= deadline {
            let _ = child.kill();
            let _ = child.wait();
            return Err(anyhow!("subprocess exceeded deadline of {timeout:?}"));
        }
        std::thread::sleep(Duration::from_millis(25));
    }
}
