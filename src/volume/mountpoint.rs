//! Bounded wait for a volume directory to appear under the mount root.
//!
//! The control plane acknowledges a create before the volume is visible
//! through the locally mounted namespace. [`MountCheck`] absorbs that gap by
//! polling the mount point, bounded both by a number of checks and by a total
//! wall-clock budget; whichever runs out first ends the wait.

use super::error::PluginError;
use std::io::ErrorKind;
use std::num::NonZeroU32;
use std::path::Path;
use std::time::Duration;
use tokio::time::Instant;
use tracing::debug;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MountCheck {
    pub max_attempts: NonZeroU32,
    pub max_wait: Duration,
    pub interval: Duration,
}

impl Default for MountCheck {
    fn default() -> Self {
        Self {
            max_attempts: NonZeroU32::new(5).unwrap_or(NonZeroU32::MIN),
            max_wait: Duration::from_secs(30),
            interval: Duration::from_millis(500),
        }
    }
}

impl MountCheck {
    /// Polls until `path` is an existing directory.
    ///
    /// The first check happens immediately. The last sleep is shortened so
    /// that the final check lands on the wait deadline rather than past it.
    /// A wait too large to represent as an instant leaves only the attempt cap.
    /// Symlinks are not followed.
    pub async fn wait_ready(&self, path: &Path) -> Result<(), PluginError> {
        let start = Instant::now();
        let deadline = start.checked_add(self.max_wait);
        let mut attempts: u32 = 0;

        loop {
            attempts += 1;
            match tokio::fs::symlink_metadata(path).await {
                Ok(meta) if meta.is_dir() => {
                    debug!(path = ?path, attempts, "mount point ready");
                    return Ok(());
                }
                Ok(_) => debug!(path = ?path, attempts, "mount point is not a directory"),
                Err(e) if e.kind() == ErrorKind::NotFound => {
                    debug!(path = ?path, attempts, "mount point not visible yet")
                }
                Err(e) => debug!(path = ?path, attempts, error = %e, "mount point check failed"),
            }

            let now = Instant::now();
            let expired = deadline.is_some_and(|d| now >= d);
            if attempts >= self.max_attempts.get() || expired {
                return Err(PluginError::NotReady {
                    path: path.to_path_buf(),
                    attempts,
                    waited: now - start,
                });
            }

            let pause = match deadline {
                Some(d) => self.interval.min(d - now),
                None => self.interval,
            };
            tokio::time::sleep(pause).await;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    fn check(attempts: u32, wait_ms: u64, interval_ms: u64) -> MountCheck {
        MountCheck {
            max_attempts: NonZeroU32::new(attempts).unwrap(),
            max_wait: Duration::from_millis(wait_ms),
            interval: Duration::from_millis(interval_ms),
        }
    }

    #[tokio::test]
    async fn ready_directory_passes_on_first_check() {
        let tmp = tempdir().unwrap();
        check(1, 0, 10).wait_ready(tmp.path()).await.unwrap();
    }

    #[tokio::test]
    async fn waits_for_late_directory() {
        let tmp = tempdir().unwrap();
        let target = tmp.path().join("late");

        let creator = {
            let target = target.clone();
            tokio::spawn(async move {
                tokio::time::sleep(Duration::from_millis(100)).await;
                tokio::fs::create_dir(&target).await.unwrap();
            })
        };

        check(100, 5_000, 20).wait_ready(&target).await.unwrap();
        creator.await.unwrap();
    }

    #[tokio::test]
    async fn stops_after_max_attempts() {
        let tmp = tempdir().unwrap();
        let target = tmp.path().join("never");

        let started = std::time::Instant::now();
        let err = check(3, 60_000, 10).wait_ready(&target).await.unwrap_err();

        assert!(started.elapsed() < Duration::from_secs(5));
        match err {
            PluginError::NotReady { attempts, path, .. } => {
                assert_eq!(attempts, 3);
                assert_eq!(path, target);
            }
            other => panic!("expected NotReady, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn stops_at_wait_deadline() {
        let tmp = tempdir().unwrap();
        let target = tmp.path().join("never");

        let started = std::time::Instant::now();
        let err = check(10_000, 200, 50).wait_ready(&target).await.unwrap_err();
        let elapsed = started.elapsed();

        assert!(elapsed >= Duration::from_millis(200), "{elapsed:?}");
        assert!(elapsed < Duration::from_secs(3), "{elapsed:?}");
        assert!(matches!(err, PluginError::NotReady { attempts, .. } if attempts < 10_000));
        assert!(err.to_string().contains("never"));
    }

    #[tokio::test]
    async fn huge_wait_falls_back_to_attempt_cap() {
        let tmp = tempdir().unwrap();
        let huge = MountCheck {
            max_attempts: NonZeroU32::new(2).unwrap(),
            max_wait: Duration::MAX,
            interval: Duration::from_millis(10),
        };

        huge.wait_ready(tmp.path()).await.unwrap();

        let err = huge.wait_ready(&tmp.path().join("never")).await.unwrap_err();
        assert!(matches!(err, PluginError::NotReady { attempts: 2, .. }));
    }

    #[tokio::test]
    async fn symlinked_directory_is_not_a_mount_point() {
        let tmp = tempdir().unwrap();
        let real = tmp.path().join("real");
        let link = tmp.path().join("link");
        std::fs::create_dir(&real).unwrap();
        std::os::unix::fs::symlink(&real, &link).unwrap();

        assert!(check(2, 100, 10).wait_ready(&link).await.is_err());
    }

    #[tokio::test]
    async fn regular_file_is_not_a_mount_point() {
        let tmp = tempdir().unwrap();
        let target = tmp.path().join("file");
        std::fs::write(&target, "x").unwrap();

        assert!(check(2, 100, 10).wait_ready(&target).await.is_err());
    }
}
