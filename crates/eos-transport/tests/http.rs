//! Integration tests for the HTTP transport against a minimal loopback
//! HTTP/1.1 responder.

#[cfg(feature = "http")]
mod http {
    use std::time::Duration;

    use eos_transport::{HttpTransport, RequestTransport, TransportError};
    use tokio::io::{AsyncReadExt, AsyncWriteExt};
    use tokio::net::TcpListener;
    use tokio::task::JoinHandle;

    /// Serves exactly one request with `status` and `body`.
    ///
    /// The returned task resolves to the raw request text (head + body).
    async fn serve_once(
        status: &'static str,
        body: &'static str,
    ) -> (String, JoinHandle<String>) {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let base = format!("http://{}", listener.local_addr().unwrap());
        let handle = tokio::spawn(async move {
            let (mut stream, _) = listener.accept().await.unwrap();
            let request = read_request(&mut stream).await;
            let response = format!(
                "HTTP/1.1 {status}\r\nContent-Type: application/json\r\n\
                 Content-Length: {}\r\nConnection: close\r\n\r\n{body}",
                body.len()
            );
            stream.write_all(response.as_bytes()).await.unwrap();
            stream.shutdown().await.unwrap();
            request
        });
        (base, handle)
    }

    async fn read_request(stream: &mut tokio::net::TcpStream) -> String {
        let mut buf = Vec::new();
        let mut chunk = [0u8; 1024];
        loop {
            let n = stream.read(&mut chunk).await.unwrap();
            if n == 0 {
                break;
            }
            buf.extend_from_slice(&chunk[..n]);
            let text = String::from_utf8_lossy(&buf);
            if let Some(head_end) = text.find("\r\n\r\n") {
                let content_length = text[..head_end]
                    .lines()
                    .find_map(|line| {
                        let (name, value) = line.split_once(':')?;
                        name.eq_ignore_ascii_case("content-length")
                            .then(|| value.trim().parse::<usize>().ok())
                            .flatten()
                    })
                    .unwrap_or(0);
                if buf.len() >= head_end + 4 + content_length {
                    break;
                }
            }
        }
        String::from_utf8_lossy(&buf).into_owned()
    }

    #[tokio::test]
    async fn test_request_posts_json_to_path() {
        let (base, server) =
            serve_once("200 OK", "{\"type\":\"LOGIN_RESPONSE\"}").await;
        let transport = HttpTransport::new(base, Duration::from_secs(2)).unwrap();

        let body = transport
            .request("/api/login", b"{\"type\":\"LOGIN\",\"userId\":\"abc\"}".to_vec())
            .await
            .expect("request should succeed");
        assert_eq!(body, b"{\"type\":\"LOGIN_RESPONSE\"}");

        let request = server.await.unwrap();
        assert!(request.starts_with("POST /api/login HTTP/1.1"));
        assert!(
            request.to_ascii_lowercase().contains("content-type: application/json")
        );
        assert!(request.ends_with("{\"type\":\"LOGIN\",\"userId\":\"abc\"}"));
    }

    #[tokio::test]
    async fn test_error_status_keeps_body() {
        let (base, _server) = serve_once(
            "401 Unauthorized",
            "{\"success\":false,\"message\":\"no such user\"}",
        )
        .await;
        let transport = HttpTransport::new(base, Duration::from_secs(2)).unwrap();

        let err = transport
            .request("/api/login", b"{}".to_vec())
            .await
            .expect_err("status should be an error");

        match err {
            TransportError::Status { status, ref body } => {
                assert_eq!(status, 401);
                assert_eq!(
                    body.as_slice(),
                    b"{\"success\":false,\"message\":\"no such user\"}"
                );
            }
            other => panic!("expected Status, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_unreachable_service_is_connect_error() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let base = format!("http://{}", listener.local_addr().unwrap());
        drop(listener);
        let transport = HttpTransport::new(base, Duration::from_secs(2)).unwrap();

        let err = transport
            .request("/api/login", b"{}".to_vec())
            .await
            .expect_err("nothing is listening");

        assert!(matches!(err, TransportError::Connect(_)), "got {err:?}");
    }
}
