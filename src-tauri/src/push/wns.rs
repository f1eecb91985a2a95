use chrono::{DateTime, Utc};

use super::PushChannelProvider;

/// 100ns ticks between 1601-01-01 and the Unix epoch.
const FILETIME_UNIX_OFFSET: i64 = 116_444_736_000_000_000;

/// Converts a WinRT `DateTime` (FILETIME ticks) to UTC.
#[cfg_attr(not(target_os = "windows"), allow(dead_code))]
fn filetime_to_utc(ticks: i64) -> Option<DateTime<Utc>> {
    let unix_100ns = ticks.checked_sub(FILETIME_UNIX_OFFSET)?;
    DateTime::<Utc>::from_timestamp(
        unix_100ns.div_euclid(10_000_000),
        (unix_100ns.rem_euclid(10_000_000) * 100) as u32,
    )
}

#[cfg(target_os = "windows")]
pub(super) fn host_providers() -> (Box<dyn PushChannelProvider>, Box<dyn PushChannelProvider>) {
    (
        Box::new(winrt::ApplicationChannelProvider),
        Box::new(winrt::UserChannelProvider),
    )
}

#[cfg(not(target_os = "windows"))]
pub(super) fn host_providers() -> (Box<dyn PushChannelProvider>, Box<dyn PushChannelProvider>) {
    (
        Box::new(unsupported::Unsupported("application channel manager")),
        Box::new(unsupported::Unsupported("user channel manager")),
    )
}

#[cfg(target_os = "windows")]
mod winrt {
    use async_trait::async_trait;
    use windows::Networking::PushNotifications::{
        PushNotificationChannel, PushNotificationChannelManager,
    };

    use super::super::{PushChannel, PushChannelError, PushChannelProvider};
    use super::filetime_to_utc;

    pub struct ApplicationChannelProvider;
    pub struct UserChannelProvider;

    fn to_channel(channel: PushNotificationChannel) -> windows::core::Result<PushChannel> {
        let uri = channel.Uri()?.to_string();
        // Expiry is informational; an unreadable one leaves it unknown.
        let expires_at = channel
            .ExpirationTime()
            .ok()
            .and_then(|time| filetime_to_utc(time.UniversalTime));
        Ok(PushChannel { uri, expires_at })
    }

    async fn blocking<F>(provider: &'static str, create: F) -> Result<PushChannel, PushChannelError>
    where
        F: FnOnce() -> windows::core::Result<PushNotificationChannel> + Send + 'static,
    {
        let failed = |message: String| PushChannelError::Provider { provider, message };
        tokio::task::spawn_blocking(move || create().and_then(to_channel))
            .await
            .map_err(|err| failed(err.to_string()))?
            .map_err(|err| failed(err.message().to_string()))
    }

    #[async_trait]
    impl PushChannelProvider for ApplicationChannelProvider {
        fn name(&self) -> &'static str {
            "application channel manager"
        }

        async fn create_channel(&self) -> Result<PushChannel, PushChannelError> {
            blocking(self.name(), || {
                PushNotificationChannelManager::CreatePushNotificationChannelForApplicationAsync()?
                    .get()
            })
            .await
        }
    }

    #[async_trait]
    impl PushChannelProvider for UserChannelProvider {
        fn name(&self) -> &'static str {
            "user channel manager"
        }

        async fn create_channel(&self) -> Result<PushChannel, PushChannelError> {
            blocking(self.name(), || {
                PushNotificationChannelManager::GetDefault()?
                    .CreatePushNotificationChannelForApplicationAsync()?
                    .get()
            })
            .await
        }
    }
}

#[cfg(not(target_os = "windows"))]
mod unsupported {
    use async_trait::async_trait;

    use super::super::{PushChannel, PushChannelError, PushChannelProvider};

    pub struct Unsupported(pub &'static str);

    #[async_trait]
    impl PushChannelProvider for Unsupported {
        fn name(&self) -> &'static str {
            self.0
        }

        async fn create_channel(&self) -> Result<PushChannel, PushChannelError> {
            Err(PushChannelError::Provider {
                provider: self.0,
                message: "WNS channels exist only on Windows".into(),
            })
        }
    }
}
