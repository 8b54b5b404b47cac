//! Session URI scheme: `ws://host:port/`, `wss://...`, `pipe://<name>`.
//! No other schemes are accepted.

use crate::error::TransportError;

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum SessionUri {
    WebSocket { host: String, port: u16, tls: bool },
    Pipe { name: String },
}

impl SessionUri {
    pub fn parse(uri: &str) -> Result<Self, TransportError> {
        if let Some(rest) = uri.strip_prefix("wss://") {
            return parse_authority(rest, true, uri);
        }
        if let Some(rest) = uri.strip_prefix("ws://") {
            return parse_authority(rest, false, uri);
        }
        if let Some(name) = uri.strip_prefix("pipe://") {
            if name.is_empty() {
                return Err(TransportError::MissingAuthority(uri.to_string()));
            }
            return Ok(SessionUri::Pipe { name: name.trim_end_matches('/').to_string() });
        }
        Err(TransportError::UnsupportedScheme(uri.to_string()))
    }
}

fn parse_authority(rest: &str, tls: bool, original: &str) -> Result<SessionUri, TransportError> {
    let authority = rest.split('/').next().unwrap_or("");
    if authority.is_empty() {
        return Err(TransportError::MissingAuthority(original.to_string()));
    }
    let (host, port) = match authority.rsplit_once(':') {
        Some((host, port)) => {
            let port: u16 = port
                .parse()
                .map_err(|_| TransportError::MissingAuthority(original.to_string()))?;
            (host.to_string(), port)
        },
        None => (authority.to_string(), if tls { 443 } else { 80 }),
    };
    Ok(SessionUri::WebSocket { host, port, tls })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_ws_with_explicit_port() {
        assert_eq!(
            SessionUri::parse("ws://127.0.0.1:9000/").unwrap(),
            SessionUri::WebSocket { host: "127.0.0.1".into(), port: 9000, tls: false }
        );
    }

    #[test]
    fn parses_wss_defaulting_to_443() {
        assert_eq!(
            SessionUri::parse("wss://example.com").unwrap(),
            SessionUri::WebSocket { host: "example.com".into(), port: 443, tls: true }
        );
    }

    #[test]
    fn parses_pipe_name() {
        assert_eq!(
            SessionUri::parse("pipe://termalive-default").unwrap(),
            SessionUri::Pipe { name: "termalive-default".into() }
        );
    }

    #[test]
    fn rejects_unknown_schemes() {
        assert!(matches!(
            SessionUri::parse("http://example.com"),
            Err(TransportError::UnsupportedScheme(_))
        ));
    }
}
