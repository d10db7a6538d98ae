//! Startup location: device position when available, otherwise a default city.

use crate::types::{Coordinates, LocationError, Query};
use async_trait::async_trait;
use std::time::Duration;

/// Something that can report where the device is.
#[async_trait]
pub trait LocationSource: Send + Sync {
    async fn current_position(&self) -> Result<Coordinates, LocationError>;
}

/// A position fixed in configuration.
#[derive(Debug, Clone, Copy)]
pub struct FixedLocation(pub Coordinates);

#[async_trait]
impl LocationSource for FixedLocation {
    async fn current_position(&self) -> Result<Coordinates, LocationError> {
        Ok(self.0)
    }
}

/// Used when device location is turned off or the platform has no service.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoLocation;

#[async_trait]
impl LocationSource for NoLocation {
    async fn current_position(&self) -> Result<Coordinates, LocationError> {
        Err(LocationError::ServiceUnavailable)
    }
}

/// The platform location service: GeoClue2 on Linux, unavailable elsewhere.
#[derive(Debug, Clone)]
pub struct SystemLocation {
    timeout: Duration,
}

impl SystemLocation {
    pub fn new(timeout: Duration) -> Self {
        Self { timeout }
    }
}

#[async_trait]
impl LocationSource for SystemLocation {
    async fn current_position(&self) -> Result<Coordinates, LocationError> {
        platform_position(self.timeout).await
    }
}

#[cfg(target_os = "linux")]
async fn platform_position(timeout: Duration) -> Result<Coordinates, LocationError> {
    geoclue::current_position(timeout).await
}

#[cfg(not(target_os = "linux"))]
async fn platform_position(_timeout: Duration) -> Result<Coordinates, LocationError> {
    Err(LocationError::ServiceUnavailable)
}

/// Produce the query for the first lookup: the device position if `source`
/// reports one, otherwise `default_city`.
pub async fn resolve_initial_query(source: &dyn LocationSource, default_city: &str) -> Query {
    match source.current_position().await {
        Ok(coords) => {
            tracing::info!("Got location: {}, {}", coords.latitude, coords.longitude);
            Query::Coordinates(coords)
        }
        Err(e) => {
            tracing::info!("No device location ({}), using {}", e, default_city);
            Query::City(default_city.to_string())
        }
    }
}

#[cfg(target_os = "linux")]
mod geoclue {
    use super::{Coordinates, LocationError};
    use std::future::Future;
    use std::time::Duration;
    use tokio::time::Instant;
    use zbus::zvariant::OwnedObjectPath;

    const DESKTOP_ID: &str = "wxview";
    /// GCLUE_ACCURACY_LEVEL_CITY
    const ACCURACY_CITY: u32 = 4;
    const POLL_INTERVAL: Duration = Duration::from_millis(250);
    const STOP_TIMEOUT: Duration = Duration::from_secs(1);

    #[zbus::proxy(
        interface = "org.freedesktop.GeoClue2.Manager",
        default_service = "org.freedesktop.GeoClue2",
        default_path = "/org/freedesktop/GeoClue2/Manager"
    )]
    trait Manager {
        fn get_client(&self) -> zbus::Result<OwnedObjectPath>;
    }

    #[zbus::proxy(
        interface = "org.freedesktop.GeoClue2.Client",
        default_service = "org.freedesktop.GeoClue2"
    )]
    trait Client {
        fn start(&self) -> zbus::Result<()>;

        fn stop(&self) -> zbus::Result<()>;

        #[zbus(property)]
        fn set_desktop_id(&self, id: &str) -> zbus::Result<()>;

        #[zbus(property)]
        fn set_requested_accuracy_level(&self, level: u32) -> zbus::Result<()>;

        #[zbus(property)]
        fn location(&self) -> zbus::Result<OwnedObjectPath>;
    }

    #[zbus::proxy(
        interface = "org.freedesktop.GeoClue2.Location",
        default_service = "org.freedesktop.GeoClue2"
    )]
    trait Position {
        #[zbus(property)]
        fn latitude(&self) -> zbus::Result<f64>;

        #[zbus(property)]
        fn longitude(&self) -> zbus::Result<f64>;
    }

    fn map_err(err: zbus::Error) -> LocationError {
        match &err {
            zbus::Error::MethodError(name, _, _) if name.as_str().contains("AccessDenied") => {
                LocationError::PermissionDenied
            }
            zbus::Error::MethodError(name, _, _) if name.as_str().contains("ServiceUnknown") => {
                LocationError::ServiceUnavailable
            }
            zbus::Error::InputOutput(_) | zbus::Error::Address(_) => {
                LocationError::ServiceUnavailable
            }
            _ => LocationError::Other(err.to_string()),
        }
    }

    /// Run `work` until `deadline`, then `stop` whatever the outcome.
    async fn run_then_stop<T, W, S>(deadline: Instant, work: W, stop: S) -> Result<T, LocationError>
    where
        W: Future<Output = Result<T, LocationError>>,
        S: Future<Output = zbus::Result<()>>,
    {
        let result = tokio::time::timeout_at(deadline, work)
            .await
            .unwrap_or(Err(LocationError::Timeout));

        match tokio::time::timeout(STOP_TIMEOUT, stop).await {
            Ok(Ok(())) => {}
            Ok(Err(e)) => tracing::debug!("Failed to stop GeoClue client: {}", e),
            Err(_) => tracing::debug!("Timed out stopping GeoClue client"),
        }
        result
    }

    async fn within<T>(
        deadline: Instant,
        fut: impl Future<Output = zbus::Result<T>>,
    ) -> Result<T, LocationError> {
        match tokio::time::timeout_at(deadline, fut).await {
            Ok(result) => result.map_err(map_err),
            Err(_) => Err(LocationError::Timeout),
        }
    }

    pub(super) async fn current_position(timeout: Duration) -> Result<Coordinates, LocationError> {
        let deadline = Instant::now() + timeout;

        let conn = within(deadline, zbus::Connection::system()).await?;

        let manager = within(deadline, ManagerProxy::new(&conn)).await?;
        let client_path = within(deadline, manager.get_client()).await?;

        let client = within(
            deadline,
            async {
                ClientProxy::builder(&conn)
                    .path(client_path)?
                    .cache_properties(zbus::proxy::CacheProperties::No)
                    .build()
                    .await
            },
        )
        .await?;

        within(deadline, client.set_desktop_id(DESKTOP_ID)).await?;
        within(deadline, client.set_requested_accuracy_level(ACCURACY_CITY)).await?;
        within(deadline, client.start()).await?;

        // From here on the client is running and must be stopped
        run_then_stop(deadline, read_fix(&conn, &client), client.stop()).await
    }

    async fn read_fix(
        conn: &zbus::Connection,
        client: &ClientProxy<'_>,
    ) -> Result<Coordinates, LocationError> {
        // "/" until the service has a fix
        let location_path = loop {
            let path = client.location().await.map_err(map_err)?;
            if path.as_str() != "/" {
                break path;
            }
            tokio::time::sleep(POLL_INTERVAL).await;
        };

        let position = PositionProxy::builder(conn)
            .path(location_path)
            .map_err(map_err)?
            .build()
            .await
            .map_err(map_err)?;

        Ok(Coordinates::new(
            position.latitude().await.map_err(map_err)?,
            position.longitude().await.map_err(map_err)?,
        ))
    }

    #[cfg(test)]
    mod tests {
        use super::*;
        use std::sync::atomic::{AtomicBool, Ordering};

        #[tokio::test]
        async fn test_client_stopped_after_timeout() {
            let stopped = AtomicBool::new(false);
            let deadline = Instant::now() + Duration::from_millis(20);

            let result: Result<Coordinates, _> = run_then_stop(
                deadline,
                std::future::pending(),
                async {
                    stopped.store(true, Ordering::SeqCst);
                    Ok(())
                },
            )
            .await;

            assert!(matches!(result, Err(LocationError::Timeout)));
            assert!(stopped.load(Ordering::SeqCst));
        }

        #[tokio::test]
        async fn test_client_stopped_after_error() {
            let stopped = AtomicBool::new(false);
            let deadline = Instant::now() + Duration::from_secs(5);

            let result: Result<Coordinates, _> = run_then_stop(
                deadline,
                async { Err(LocationError::PermissionDenied) },
                async {
                    stopped.store(true, Ordering::SeqCst);
                    Ok(())
                },
            )
            .await;

            assert!(matches!(result, Err(LocationError::PermissionDenied)));
            assert!(stopped.load(Ordering::SeqCst));
        }

        #[tokio::test]
        async fn test_stop_failure_keeps_position() {
            let deadline = Instant::now() + Duration::from_secs(5);

            let result = run_then_stop(
                deadline,
                async { Ok(Coordinates::new(51.5, -0.1)) },
                async { Err(zbus::Error::Failure("gone".into())) },
            )
            .await;

            assert_eq!(result.unwrap(), Coordinates::new(51.5, -0.1));
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct DeniedLocation;

    #[async_trait]
    impl LocationSource for DeniedLocation {
        async fn current_position(&self) -> Result<Coordinates, LocationError> {
            Err(LocationError::PermissionDenied)
        }
    }

    #[tokio::test]
    async fn test_denied_falls_back_to_default_city() {
        let query = resolve_initial_query(&DeniedLocation, "London").await;
        assert_eq!(query, Query::City("London".into()));
    }

    #[tokio::test]
    async fn test_unavailable_falls_back_to_default_city() {
        let query = resolve_initial_query(&NoLocation, "Oslo").await;
        assert_eq!(query, Query::City("Oslo".into()));
    }

    #[tokio::test]
    async fn test_position_becomes_coordinate_query() {
        let source = FixedLocation(Coordinates::new(48.85, 2.35));
        let query = resolve_initial_query(&source, "London").await;
        assert_eq!(query, Query::Coordinates(Coordinates::new(48.85, 2.35)));
    }
}
