//! Application-level configuration loading for the game checkout and launch pipeline.

use std::{env, fs, io::ErrorKind, path::PathBuf, time::Duration};

use serde::Deserialize;
use tracing::{info, warn};

/// Default location on disk where the server looks for the JSON configuration.
const DEFAULT_CONFIG_PATH: &str = "config/app.json";
/// Environment variable that overrides [`DEFAULT_CONFIG_PATH`].
const CONFIG_PATH_ENV: &str = "GAME_MANAGER_CONFIG_PATH";
const DEFAULT_APP_HTTP_PORT: u16 = 8088;

/// How the game process gets started once the checkout is ready.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LaunchMode {
    /// Spawn the startup command as a direct child process.
    #[default]
    Process,
    /// Ask a running IDE to execute a run configuration.
    Ide,
}

#[derive(Debug, Clone, Default)]
/// Immutable runtime configuration shared across the application.
pub struct AppConfig {
    /// Checkout, launch and readiness settings for the companion game.
    pub game: GameConfig,
}

/// Settings describing where the game lives and how it is started.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct GameConfig {
    /// Directory holding game checkouts.
    pub root_checkout_dir: PathBuf,
    /// Name of the checkout directory under the root.
    pub repo_dir_name: String,
    /// Explicit checkout path; derived from the root and repo dir name when unset.
    pub checkout_dir: Option<PathBuf>,
    /// Remote root; the repository URL is `<root>/<repo>.git`.
    pub git_root_url: String,
    /// Repository path under the remote root, e.g. `owner/name`.
    pub repo: String,
    /// Branch cloned and reset to.
    pub branch: String,
    /// Port the game listens on.
    pub app_http_port: u16,
    /// Command starting the game; defaults to Quarkus dev mode on `app_http_port`.
    pub app_startup_command: Option<String>,
    /// Base URL of the running game.
    pub app_base_url: Option<String>,
    /// Dev UI URL; derived from the base URL when unset.
    pub app_dev_ui_url: Option<String>,
    /// Child process or IDE run configuration.
    pub launch_mode: LaunchMode,
    /// Checkout rewriting applied after each sync.
    pub prepare: PrepareConfig,
    /// Settings used in IDE launch mode.
    pub ide: IdeConfig,
    /// Readiness timing overrides.
    pub readiness: ReadinessOverrides,
    /// Program opening a URL, given the URL as its only argument.
    pub browser_command: String,
    /// `git` executable used for sync.
    pub git_binary: String,
}

/// Files rewritten after each sync, and the markers whose lines get dropped.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct PrepareConfig {
    /// Files relative to the checkout root.
    pub files: Vec<PathBuf>,
    /// Lines containing any of these are removed.
    pub markers: Vec<String>,
}

/// IDE launcher settings.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct IdeConfig {
    /// IDE executable, given the checkout path.
    pub command: String,
    /// MCP endpoint of the running IDE.
    pub mcp_url: String,
    /// Run configuration executed once the project is open.
    pub run_configuration: String,
    /// Tool call timeout; a timed-out call counts as started.
    pub tool_timeout_ms: u64,
}

/// Optional readiness policy overrides; unset values keep the launch mode defaults.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct ReadinessOverrides {
    /// Wait between two health checks.
    pub poll_interval_ms: Option<u64>,
    /// Wait before the first health check.
    pub poll_delay_ms: Option<u64>,
    /// Total readiness budget.
    pub max_wait_ms: Option<u64>,
    /// Timeout of a single health request.
    pub probe_timeout_ms: Option<u64>,
}

impl AppConfig {
    /// Load the application configuration from disk, falling back to built-in defaults.
    pub fn load() -> Self {
        let path = resolve_config_path();
        match fs::read_to_string(&path) {
            Ok(contents) => match serde_json::from_str::<RawConfig>(&contents) {
                Ok(raw) => {
                    let app_config: Self = raw.into();
                    info!(
                        path = %path.display(),
                        repo = %app_config.game.repo_url(),
                        branch = %app_config.game.branch,
                        "loaded game configuration"
                    );
                    app_config
                }
                Err(err) => {
                    warn!(
                        path = %path.display(),
                        error = %err,
                        "failed to parse config; falling back to defaults"
                    );
                    Self::default()
                }
            },
            Err(err) if err.kind() == ErrorKind::NotFound => {
                info!(
                    path = %path.display(),
                    "config file not found; using built-in defaults"
                );
                Self::default()
            }
            Err(err) => {
                warn!(
                    path = %path.display(),
                    error = %err,
                    "failed to read config; falling back to defaults"
                );
                Self::default()
            }
        }
    }
}

impl GameConfig {
    /// Full clone URL of the game repository.
    pub fn repo_url(&self) -> String {
        format!(
            "{}/{}.git",
            self.git_root_url.trim_end_matches('/'),
            self.repo
        )
    }

    /// Where the working copy lives on disk.
    pub fn checkout_dir(&self) -> PathBuf {
        self.checkout_dir
            .clone()
            .unwrap_or_else(|| self.root_checkout_dir.join(&self.repo_dir_name))
    }

    /// Command line used to start the game in dev mode.
    pub fn app_startup_command(&self) -> String {
        self.app_startup_command.clone().unwrap_or_else(|| {
            format!(
                "./mvnw clean quarkus:dev -Dquarkus.http.port={} -Dquarkus.http.test-port=0 \
                 -Dquarkus.test.continuous-testing=enabled -Dquarkus.live-reload.instrumentation=true",
                self.app_http_port
            )
        })
    }

    /// Base URL the health probe talks to.
    pub fn app_base_url(&self) -> String {
        self.app_base_url
            .clone()
            .unwrap_or_else(|| format!("http://localhost:{}", self.app_http_port))
    }

    /// Dev UI URL opened in the browser once the game is healthy.
    pub fn app_dev_ui_url(&self) -> String {
        self.app_dev_ui_url.clone().unwrap_or_else(|| {
            format!("{}/q/dev-ui", self.app_base_url().trim_end_matches('/'))
        })
    }

    /// Per-request timeout applied by the health probe.
    pub fn probe_timeout(&self) -> Duration {
        Duration::from_millis(self.readiness.probe_timeout_ms.unwrap_or(2_000))
    }
}

impl Default for GameConfig {
    fn default() -> Self {
        Self {
            root_checkout_dir: env::temp_dir().join("game_manager").join("games"),
            repo_dir_name: "game".into(),
            checkout_dir: None,
            git_root_url: "https://github.com".into(),
            repo: "edeandrea/booth-game".into(),
            branch: "main".into(),
            app_http_port: DEFAULT_APP_HTTP_PORT,
            app_startup_command: None,
            app_base_url: None,
            app_dev_ui_url: None,
            launch_mode: LaunchMode::default(),
            prepare: PrepareConfig::default(),
            ide: IdeConfig::default(),
            readiness: ReadinessOverrides::default(),
            browser_command: default_browser_command().into(),
            git_binary: "git".into(),
        }
    }
}

impl Default for PrepareConfig {
    fn default() -> Self {
        Self {
            files: vec![
                PathBuf::from("src/main/java/io/quarkus/game/Storyteller.java"),
                PathBuf::from("src/main/java/io/quarkus/game/Tools.java"),
            ],
            markers: [
                "@ToolBox",
                "@OutputGuardrails",
                "@UserMessage",
                "@RegisterAiService",
                "@Tool",
            ]
            .into_iter()
            .map(String::from)
            .collect(),
        }
    }
}

impl Default for IdeConfig {
    fn default() -> Self {
        Self {
            command: "intellij".into(),
            mcp_url: "http://localhost:64342/mcp".into(),
            run_configuration: "booth-game".into(),
            tool_timeout_ms: 15_000,
        }
    }
}

#[derive(Debug, Deserialize)]
/// JSON representation of the configuration file located at [`DEFAULT_CONFIG_PATH`].
struct RawConfig {
    #[serde(default)]
    game: GameConfig,
}

impl From<RawConfig> for AppConfig {
    fn from(value: RawConfig) -> Self {
        Self { game: value.game }
    }
}

/// Resolve the configuration path taking the environment override into account.
fn resolve_config_path() -> PathBuf {
    env::var_os(CONFIG_PATH_ENV)
        .map(PathBuf::from)
        .filter(|path| !path.as_os_str().is_empty())
        .unwrap_or_else(|| PathBuf::from(DEFAULT_CONFIG_PATH))
}

fn default_browser_command() -> &'static str {
    if cfg!(target_os = "macos") {
        "open"
    } else {
        "xdg-open"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn derived_values_follow_port_and_repo() {
        let config = GameConfig::default();
        assert_eq!(config.repo_url(), "https://github.com/edeandrea/booth-game.git");
        assert_eq!(config.app_base_url(), "http://localhost:8088");
        assert_eq!(config.app_dev_ui_url(), "http://localhost:8088/q/dev-ui");
        assert!(config.app_startup_command().contains("-Dquarkus.http.port=8088"));
        assert_eq!(
            config.checkout_dir(),
            config.root_checkout_dir.join("game")
        );
    }

    #[test]
    fn partial_json_keeps_defaults() {
        let raw: RawConfig = serde_json::from_str(
            r#"{ "game": { "branch": "workshop", "app_http_port": 9000, "launch_mode": "ide",
                 "ide": { "run_configuration": "dev" } } }"#,
        )
        .unwrap();
        let config: AppConfig = raw.into();

        assert_eq!(config.game.branch, "workshop");
        assert_eq!(config.game.launch_mode, LaunchMode::Ide);
        assert_eq!(config.game.ide.run_configuration, "dev");
        assert_eq!(config.game.ide.command, "intellij");
        assert_eq!(config.game.repo, "edeandrea/booth-game");
        assert_eq!(config.game.app_base_url(), "http://localhost:9000");
        assert_eq!(config.game.prepare.markers.len(), 5);
    }

    #[test]
    fn explicit_checkout_dir_wins() {
        let config = GameConfig {
            checkout_dir: Some(PathBuf::from("/srv/booth")),
            ..GameConfig::default()
        };
        assert_eq!(config.checkout_dir(), PathBuf::from("/srv/booth"));
    }
}
