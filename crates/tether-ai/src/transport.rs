//! HTTP transport built from a settings snapshot

use std::time::Duration;

use reqwest::header::HeaderMap;
use serde::Serialize;

use crate::error::{Error, NO_ERROR_DETAILS, Result, TransportErrorKind};
use crate::settings::Settings;

/// The configuration a transport was built from
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransportProfile {
    pub connect_timeout: Duration,
    pub write_timeout: Duration,
    pub read_timeout: Duration,
    /// `http://host:port` when traffic goes through a proxy
    pub proxy: Option<String>,
}

impl TransportProfile {
    pub fn from_settings(settings: &Settings) -> Self {
        Self {
            connect_timeout: settings.connect_timeout,
            write_timeout: settings.write_timeout,
            read_timeout: settings.read_timeout,
            proxy: settings.proxy_url(),
        }
    }

    /// Upper bound for connecting, uploading the body and receiving headers
    pub fn send_timeout(&self) -> Duration {
        self.connect_timeout + self.write_timeout + self.read_timeout
    }
}

/// A configured HTTP client. Replaced, never mutated, when settings change.
#[derive(Debug, Clone)]
pub struct HttpTransport {
    client: reqwest::Client,
    profile: TransportProfile,
}

impl HttpTransport {
    /// Build a client honouring the timeouts and proxy in `settings`
    pub fn build(settings: &Settings) -> Result<Self> {
        let profile = TransportProfile::from_settings(settings);

        let mut builder = reqwest::Client::builder()
            .connect_timeout(profile.connect_timeout)
            .read_timeout(profile.read_timeout);

        builder = match profile.proxy {
            Some(ref url) => {
                let proxy = reqwest::Proxy::all(url)
                    .map_err(|e| Error::InvalidConfig(format!("invalid proxy {}: {}", url, e)))?;
                builder.proxy(proxy)
            }
            // Direct connection; ignore proxy environment variables too.
            None => builder.no_proxy(),
        };

        let client = builder
            .build()
            .map_err(|e| Error::InvalidConfig(format!("failed to build HTTP client: {}", e)))?;

        tracing::debug!(
            "Built transport: connect={:?} write={:?} read={:?} proxy={:?}",
            profile.connect_timeout,
            profile.write_timeout,
            profile.read_timeout,
            profile.proxy
        );

        Ok(Self { client, profile })
    }

    /// Settings this transport reflects
    pub fn profile(&self) -> &TransportProfile {
        &self.profile
    }

    /// POST a JSON body and return the response if its status is a success.
    ///
    /// Non-success statuses become [`Error::Protocol`] carrying the body text.
    pub async fn post_json<T: Serialize + ?Sized>(
        &self,
        url: &str,
        headers: HeaderMap,
        body: &T,
    ) -> Result<reqwest::Response> {
        let request = self.client.post(url).headers(headers).json(body);
        let send_timeout = self.profile.send_timeout();

        let response = match tokio::time::timeout(send_timeout, request.send()).await {
            Ok(Ok(response)) => response,
            Ok(Err(e)) => return Err(self.classify(e)),
            Err(_) => {
                return Err(Error::transport(
                    TransportErrorKind::Timeout,
                    format!("no response from {} within {:?}", url, send_timeout),
                ));
            }
        };

        let status = response.status();
        if !status.is_success() {
            let body = response
                .text()
                .await
                .unwrap_or_else(|_| NO_ERROR_DETAILS.to_string());
            return Err(Error::protocol(status.as_u16(), body));
        }

        Ok(response)
    }

    fn classify(&self, err: reqwest::Error) -> Error {
        match Error::from(err) {
            Error::Transport {
                kind: TransportErrorKind::Connect,
                message,
            } if self.profile.proxy.is_some() => Error::transport(TransportErrorKind::Proxy, message),
            other => other,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_build_reflects_timeouts() {
        let settings = Settings {
            connect_timeout: Duration::from_secs(3),
            write_timeout: Duration::from_secs(4),
            read_timeout: Duration::from_secs(5),
            ..Default::default()
        };
        let transport = HttpTransport::build(&settings).unwrap();
        let profile = transport.profile();
        assert_eq!(profile.connect_timeout, Duration::from_secs(3));
        assert_eq!(profile.write_timeout, Duration::from_secs(4));
        assert_eq!(profile.read_timeout, Duration::from_secs(5));
        assert_eq!(profile.send_timeout(), Duration::from_secs(12));
        assert_eq!(profile.proxy, None);
    }

    #[test]
    fn test_build_with_proxy() {
        let settings = Settings {
            use_proxy: true,
            proxy_host: "127.0.0.1".into(),
            proxy_port: 8081,
            ..Default::default()
        };
        let transport = HttpTransport::build(&settings).unwrap();
        assert_eq!(
            transport.profile().proxy.as_deref(),
            Some("http://127.0.0.1:8081")
        );
    }

    #[test]
    fn test_proxy_ignored_when_disabled_or_hostless() {
        let disabled = Settings {
            use_proxy: false,
            proxy_host: "127.0.0.1".into(),
            ..Default::default()
        };
        assert_eq!(HttpTransport::build(&disabled).unwrap().profile().proxy, None);

        let hostless = Settings {
            use_proxy: true,
            proxy_host: String::new(),
            ..Default::default()
        };
        assert_eq!(HttpTransport::build(&hostless).unwrap().profile().proxy, None);
    }

    #[tokio::test]
    async fn test_connection_refused_is_transport_error() {
        // Bind then drop to get a port nobody listens on.
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        drop(listener);

        let transport = HttpTransport::build(&Settings {
            connect_timeout: Duration::from_secs(2),
            ..Default::default()
        })
        .unwrap();
        let err = transport
            .post_json(
                &format!("http://{}/api/chat", addr),
                HeaderMap::new(),
                &serde_json::json!({}),
            )
            .await
            .unwrap_err();
        assert!(err.is_transport(), "got: {:?}", err);
    }
}
