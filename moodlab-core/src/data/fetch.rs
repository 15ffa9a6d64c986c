//! Remote table fetcher.
//!
//! Downloads a CSV body over HTTP(S) with a bounded timeout, retrying transient
//! failures (connect errors, timeouts, 429 and 5xx) with exponential backoff.
//! Anything still failing after the last retry is `LoadError::Unreachable`.

use super::provider::LoadError;
use std::time::Duration;

/// Fetch policy for remote sources.
#[derive(Debug, Clone, PartialEq)]
pub struct FetchOptions {
    pub timeout: Duration,
    pub max_retries: u32,
    pub base_delay: Duration,
}

impl Default for FetchOptions {
    fn default() -> Self {
        Self {
            timeout: Duration::from_secs(60),
            max_retries: 2,
            base_delay: Duration::from_millis(500),
        }
    }
}

/// Blocking HTTP fetcher.
pub struct HttpFetcher {
    client: reqwest::blocking::Client,
    opts: FetchOptions,
}

impl HttpFetcher {
    pub fn new(opts: FetchOptions) -> Result<Self, LoadError> {
        let client = reqwest::blocking::Client::builder()
            .timeout(opts.timeout)
            .user_agent(concat!("moodlab/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| LoadError::Unreachable {
                location: "<http client>".into(),
                reason: e.to_string(),
            })?;
        Ok(Self { client, opts })
    }

    /// Download the body at `url`, retrying transient failures.
    pub fn fetch(&self, url: &str) -> Result<Vec<u8>, LoadError> {
        let unreachable = |reason: String| LoadError::Unreachable {
            location: url.to_string(),
            reason,
        };
        let mut last_error = None;

        for attempt in 0..=self.opts.max_retries {
            if attempt > 0 {
                let delay = self.opts.base_delay * 2u32.pow(attempt - 1);
                tracing::debug!(url, attempt, ?delay, "retrying fetch");
                std::thread::sleep(delay);
            }

            match self.client.get(url).send() {
                Ok(resp) => {
                    let status = resp.status();
                    if status == reqwest::StatusCode::TOO_MANY_REQUESTS || status.is_server_error()
                    {
                        last_error = Some(format!("HTTP {status}"));
                        continue;
                    }
                    if !status.is_success() {
                        return Err(unreachable(format!("HTTP {status}")));
                    }
                    let body = resp
                        .bytes()
                        .map_err(|e| unreachable(format!("reading body: {e}")))?;
                    return Ok(body.to_vec());
                }
                Err(e) => {
                    if e.is_connect() || e.is_timeout() {
                        last_error = Some(e.to_string());
                        continue;
                    }
                    return Err(unreachable(e.to_string()));
                }
            }
        }

        Err(unreachable(
            last_error.unwrap_or_else(|| "max retries exceeded".into()),
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_timeout_is_bounded() {
        let opts = FetchOptions::default();
        assert_eq!(opts.timeout, Duration::from_secs(60));
        assert!(opts.max_retries <= 3);
    }

    #[test]
    fn unroutable_host_is_unreachable() {
        let fetcher = HttpFetcher::new(FetchOptions {
            timeout: Duration::from_millis(200),
            max_retries: 0,
            base_delay: Duration::from_millis(1),
        })
        .unwrap();
        // Reserved TLD, never resolves.
        let err = fetcher.fetch("http://moodlab.invalid/trades.csv").unwrap_err();
        assert!(matches!(err, LoadError::Unreachable { .. }));
    }

    // ── Local HTTP server ────────────────────────────────────────────

    use std::io::{Read, Write};
    use std::net::TcpListener;
    use std::thread::JoinHandle;
    use std::time::Instant;

    const OK_BODY: &str = "date,value,classification\n2024-01-01,70,Greed\n";

    fn response(status: &str, body: &str) -> String {
        format!(
            "HTTP/1.1 {status}\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{body}",
            body.len()
        )
    }

    /// Answer one connection per scripted response, in order. Joins to the
    /// number of requests served.
    fn serve(responses: Vec<String>) -> (String, JoinHandle<usize>) {
        let listener = TcpListener::bind("127.0.0.1:0").unwrap();
        let url = format!("http://{}/fear_greed_index.csv", listener.local_addr().unwrap());
        let handle = std::thread::spawn(move || {
            let mut served = 0;
            for reply in responses {
                let (mut stream, _) = listener.accept().unwrap();
                let mut request = Vec::new();
                let mut buf = [0u8; 1024];
                while !request.windows(4).any(|w| w == b"\r\n\r\n") {
                    let n = stream.read(&mut buf).unwrap();
                    if n == 0 {
                        break;
                    }
                    request.extend_from_slice(&buf[..n]);
                }
                stream.write_all(reply.as_bytes()).unwrap();
                served += 1;
            }
            served
        });
        (url, handle)
    }

    /// Same policy as `HttpFetcher::new`, minus any proxy from the environment.
    fn local_fetcher(timeout: Duration, max_retries: u32) -> HttpFetcher {
        let opts = FetchOptions {
            timeout,
            max_retries,
            base_delay: Duration::from_millis(10),
        };
        let client = reqwest::blocking::Client::builder()
            .timeout(opts.timeout)
            .no_proxy()
            .build()
            .unwrap();
        HttpFetcher { client, opts }
    }

    #[test]
    fn server_error_is_retried_until_success() {
        let (url, server) = serve(vec![
            response("503 Service Unavailable", ""),
            response("200 OK", OK_BODY),
        ]);
        let body = local_fetcher(Duration::from_secs(5), 2).fetch(&url).unwrap();

        assert_eq!(body, OK_BODY.as_bytes());
        assert_eq!(server.join().unwrap(), 2);
    }

    #[test]
    fn rate_limit_is_retried() {
        let (url, server) = serve(vec![
            response("429 Too Many Requests", ""),
            response("429 Too Many Requests", ""),
            response("200 OK", OK_BODY),
        ]);
        let body = local_fetcher(Duration::from_secs(5), 2).fetch(&url).unwrap();

        assert_eq!(body, OK_BODY.as_bytes());
        assert_eq!(server.join().unwrap(), 3);
    }

    #[test]
    fn retries_exhausted_is_unreachable() {
        let (url, server) = serve(vec![
            response("502 Bad Gateway", ""),
            response("502 Bad Gateway", ""),
        ]);
        let err = local_fetcher(Duration::from_secs(5), 1).fetch(&url).unwrap_err();

        assert!(matches!(err, LoadError::Unreachable { .. }));
        assert!(err.to_string().contains("502"));
        assert_eq!(server.join().unwrap(), 2);
    }

    #[test]
    fn client_error_is_not_retried() {
        let (url, server) = serve(vec![response("404 Not Found", "")]);
        let err = local_fetcher(Duration::from_secs(5), 3).fetch(&url).unwrap_err();

        assert!(matches!(err, LoadError::Unreachable { .. }));
        assert!(err.to_string().contains("404"));
        assert_eq!(server.join().unwrap(), 1);
    }

    #[test]
    fn silent_server_times_out_as_unreachable() {
        // Connections queue in the backlog but are never answered.
        let listener = TcpListener::bind("127.0.0.1:0").unwrap();
        let url = format!("http://{}/historical_data.csv", listener.local_addr().unwrap());

        let started = Instant::now();
        let err = local_fetcher(Duration::from_millis(200), 1)
            .fetch(&url)
            .unwrap_err();

        assert!(matches!(err, LoadError::Unreachable { .. }));
        assert!(started.elapsed() < Duration::from_secs(5));
        drop(listener);
    }
}
