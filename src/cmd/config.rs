use crate::backend::{ApiEndpoints, MayaConfig, VolumeOwner};
use crate::config::{Overlay, de_duration, de_secret, parse_secret};
use crate::error::MayavolError;
use crate::logging::{Logger, LoggerArgs};
use crate::path::{AbsolutePath, MountRoot};
use crate::volume::mountpoint::MountCheck;
use clap::Args;
use secrecy::SecretString;
use serde::Deserialize;
use std::num::NonZeroU32;
use std::time::Duration;

const DEFAULT_SOCKET: &str = "/run/docker/plugins/openebs.sock";
const DEFAULT_MOUNT_ROOT: &str = "/run/docker/openebs/mnt";
const DEFAULT_API: &str = "http://localhost:7860";

#[derive(Debug, Clone)]
pub struct PluginConfig {
    pub socket: AbsolutePath,
    pub group: String,
    pub mount_root: MountRoot,
    pub api: MayaConfig,
    pub tenant: String,
    pub default_owner: VolumeOwner,
    pub mount_check: MountCheck,
    pub logger: Logger,
}

#[derive(Args, Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct PluginArgs {
    /// Path to the listening socket
    #[arg(long, env = "MAYAVOL_SOCKET")]
    pub socket: Option<AbsolutePath>,

    /// Group that owns the plugin socket
    #[arg(long, env = "MAYAVOL_SOCKET_GROUP")]
    pub group: Option<String>,

    /// Path where the OpenEBS namespace is mounted on the host.
    ///
    /// Every directory below it is reported as a volume.
    #[arg(long, env = "MAYAVOL_MOUNT_ROOT")]
    pub mount_root: Option<AbsolutePath>,

    /// Maya API server(s) in the form http(s)://host[:port][,host[:port]]
    #[arg(long, env = "MAYAVOL_API")]
    pub api: Option<ApiEndpoints>,

    /// User to authenticate against the Maya API server
    #[arg(long, env = "MAYAVOL_API_USER")]
    pub api_user: Option<String>,

    /// Password to authenticate against the Maya API server
    #[arg(long, env = "MAYAVOL_API_PASSWORD", hide_env_values = true, value_parser = parse_secret)]
    #[serde(default, deserialize_with = "de_secret")]
    pub api_password: Option<SecretString>,

    /// Timeout for a single request to the Maya API server
    #[arg(long, env = "MAYAVOL_API_TIMEOUT", value_parser = humantime::parse_duration)]
    #[serde(default, deserialize_with = "de_duration")]
    pub api_timeout: Option<Duration>,

    /// Tenant domain used when resolving volume names for removal
    #[arg(long, env = "MAYAVOL_TENANT")]
    pub tenant: Option<String>,

    /// Owner user of new volumes unless overridden with `-o user=`
    #[arg(long, env = "MAYAVOL_DEFAULT_USER")]
    pub default_user: Option<String>,

    /// Owner group of new volumes unless overridden with `-o group=`
    #[arg(long, env = "MAYAVOL_DEFAULT_GROUP")]
    pub default_group: Option<String>,

    /// Maximum number of filesystem checks when a volume is created
    #[arg(long, env = "MAYAVOL_MAX_FS_CHECKS")]
    pub max_fs_checks: Option<NonZeroU32>,

    /// Maximum wait time in seconds for filesystem checks to complete
    #[arg(long, env = "MAYAVOL_MAX_WAIT_TIME")]
    pub max_wait_time: Option<f64>,

    /// Pause between two filesystem checks
    #[arg(long, env = "MAYAVOL_FS_CHECK_INTERVAL", value_parser = humantime::parse_duration)]
    #[serde(default, deserialize_with = "de_duration")]
    pub fs_check_interval: Option<Duration>,

    #[command(flatten)]
    #[serde(flatten)]
    pub logger: LoggerArgs,
}

impl Overlay for PluginArgs {
    fn overlay(self, over: Self) -> Self {
        Self {
            socket: self.socket.overlay(over.socket),
            group: self.group.overlay(over.group),
            mount_root: self.mount_root.overlay(over.mount_root),
            api: self.api.overlay(over.api),
            api_user: self.api_user.overlay(over.api_user),
            api_password: self.api_password.overlay(over.api_password),
            api_timeout: self.api_timeout.overlay(over.api_timeout),
            tenant: self.tenant.overlay(over.tenant),
            default_user: self.default_user.overlay(over.default_user),
            default_group: self.default_group.overlay(over.default_group),
            max_fs_checks: self.max_fs_checks.overlay(over.max_fs_checks),
            max_wait_time: self.max_wait_time.overlay(over.max_wait_time),
            fs_check_interval: self.fs_check_interval.overlay(over.fs_check_interval),
            logger: self.logger.overlay(over.logger),
        }
    }
}

impl TryFrom<PluginArgs> for PluginConfig {
    type Error = MayavolError;

    fn try_from(args: PluginArgs) -> Result<Self, Self::Error> {
        let defaults = MountCheck::default();
        let max_wait = match args.max_wait_time {
            Some(secs) if !secs.is_finite() || secs < 0.0 => {
                return Err(MayavolError::Config(format!(
                    "max-wait-time must be a non-negative number of seconds, got {}",
                    secs
                )));
            }
            Some(secs) => Duration::try_from_secs_f64(secs).map_err(|e| {
                MayavolError::Config(format!("max-wait-time {} is out of range: {}", secs, e))
            })?,
            None => defaults.max_wait,
        };

        let api = match args.api {
            Some(api) => api,
            None => DEFAULT_API.parse().map_err(MayavolError::Config)?,
        };

        let owner = VolumeOwner::default();

        Ok(Self {
            socket: args
                .socket
                .unwrap_or_else(|| AbsolutePath::new(DEFAULT_SOCKET)),
            group: args.group.unwrap_or_else(|| "root".to_string()),
            mount_root: MountRoot::new(
                args.mount_root
                    .unwrap_or_else(|| AbsolutePath::new(DEFAULT_MOUNT_ROOT)),
            ),
            api: MayaConfig {
                endpoints: api,
                user: args.api_user.unwrap_or_else(|| "root".to_string()),
                password: args
                    .api_password
                    .unwrap_or_else(|| SecretString::new("openEBS".into())),
                timeout: args.api_timeout.unwrap_or(Duration::from_secs(30)),
            },
            tenant: args.tenant.unwrap_or_default(),
            default_owner: VolumeOwner {
                user: args.default_user.unwrap_or(owner.user),
                group: args.default_group.unwrap_or(owner.group),
            },
            mount_check: MountCheck {
                max_attempts: args.max_fs_checks.unwrap_or(defaults.max_attempts),
                max_wait,
                interval: args.fs_check_interval.unwrap_or(defaults.interval),
            },
            logger: args.logger.into(),
        })
    }
}
