//! Native username/password resolver

use crate::auth::{DriverOptions, ResolvedAuth};
use crate::config::ConnectSettings;
use crate::credentials::CachedClusterCredentials;
use crate::error::Result;
use tracing::warn;

/// Resolve native auth: the cached embedded-password string verbatim.
///
/// Emulator targets get a short server-selection timeout so a stopped local
/// emulator fails fast instead of hanging through driver defaults. Insecure
/// TLS is permitted only when emulator security is explicitly disabled; that
/// exception is scoped to the emulator flags and never applies elsewhere.
pub fn configure_native_auth(
    record: &CachedClusterCredentials,
    settings: &ConnectSettings,
) -> Result<ResolvedAuth> {
    let mut options = DriverOptions::default();

    if let Some(emulator) = record.emulator.as_ref().filter(|e| e.is_emulator) {
        options.server_selection_timeout = Some(settings.emulator_server_selection_timeout);
        if emulator.security_disabled {
            warn!(
                "TLS verification disabled for emulator cluster {}",
                record.cluster_id
            );
            options.accept_invalid_certs = true;
        }
    }

    Ok(ResolvedAuth {
        connection_string: record.connection_string_with_password.clone(),
        options,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::credentials::{AuthMethod, EmulatorConfig, NativeAuthConfig};

    fn record(emulator: Option<EmulatorConfig>) -> CachedClusterCredentials {
        CachedClusterCredentials {
            cluster_id: "c1".to_string(),
            connection_string: "mongodb://host1:27017/?tls=true".to_string(),
            connection_string_with_password: "mongodb://u:p@host1:27017/?tls=true".to_string(),
            auth_method: AuthMethod::NativeAuth,
            native_auth: Some(NativeAuthConfig {
                connection_user: "u".to_string(),
                connection_password: Some("p".to_string()),
            }),
            entra_id: None,
            atlas: None,
            emulator,
        }
    }

    #[test]
    fn returns_embedded_password_string_verbatim() {
        let resolved = configure_native_auth(&record(None), &ConnectSettings::default()).unwrap();
        assert_eq!(
            resolved.connection_string,
            "mongodb://u:p@host1:27017/?tls=true"
        );
        assert_eq!(resolved.options, DriverOptions::default());
    }

    #[test]
    fn emulator_gets_short_selection_timeout() {
        let settings = ConnectSettings::default();
        let resolved = configure_native_auth(
            &record(Some(EmulatorConfig {
                is_emulator: true,
                security_disabled: false,
            })),
            &settings,
        )
        .unwrap();
        assert_eq!(
            resolved.options.server_selection_timeout,
            Some(settings.emulator_server_selection_timeout)
        );
        assert!(!resolved.options.accept_invalid_certs);
    }

    #[test]
    fn insecure_tls_requires_explicit_security_disable() {
        let resolved = configure_native_auth(
            &record(Some(EmulatorConfig {
                is_emulator: true,
                security_disabled: true,
            })),
            &ConnectSettings::default(),
        )
        .unwrap();
        assert!(resolved.options.accept_invalid_certs);

        // Non-emulator records never get the insecure flag
        let remote = configure_native_auth(
            &record(Some(EmulatorConfig {
                is_emulator: false,
                security_disabled: true,
            })),
            &ConnectSettings::default(),
        )
        .unwrap();
        assert!(!remote.options.accept_invalid_certs);
        assert!(remote.options.server_selection_timeout.is_none());
    }
}
