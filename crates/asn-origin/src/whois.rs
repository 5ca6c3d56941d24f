use crate::{parse_origin_response, Asn, LookupError, OriginLookup, OriginRoute};
use async_trait::async_trait;
use std::net::Ipv4Addr;
use std::time::Duration;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpStream;

pub const DEFAULT_WHOIS_SERVER: &str = "whois.radb.net:43";

/// Queries an IRR whois server (RADB by default) for the route objects
/// whose `origin` is a given ASN.
#[derive(Debug, Clone)]
pub struct WhoisClient {
    server: String,
    connect_timeout: Option<Duration>,
}

impl WhoisClient {
    pub fn new<S: Into<String>>(server: S) -> Self {
        Self {
            server: server.into(),
            connect_timeout: None,
        }
    }

    pub fn with_connect_timeout(mut self, timeout: Duration) -> Self {
        self.connect_timeout.replace(timeout);
        self
    }

    async fn connect(&self) -> Result<TcpStream, LookupError> {
        let connect = TcpStream::connect(&self.server);
        let result = match self.connect_timeout {
            Some(duration) => tokio::time::timeout(duration, connect)
                .await
                .map_err(|_| LookupError::ConnectTimeout {
                    server: self.server.clone(),
                    timeout: duration,
                })?,
            None => connect.await,
        };
        result.map_err(|source| LookupError::Connect {
            server: self.server.clone(),
            source,
        })
    }

    /// Sends a single query line and returns everything the server
    /// writes until it closes the connection.
    async fn query(&self, query: &str) -> Result<String, LookupError> {
        let mut stream = self.connect().await?;
        let io_err = |source| LookupError::Io {
            server: self.server.clone(),
            source,
        };

        stream
            .write_all(format!("{query}\r\n").as_bytes())
            .await
            .map_err(io_err)?;

        let mut response = vec![];
        stream.read_to_end(&mut response).await.map_err(io_err)?;
        tracing::trace!(
            "whois {} answered {query:?} with {} bytes",
            self.server,
            response.len()
        );
        Ok(String::from_utf8_lossy(&response).into_owned())
    }
}

#[async_trait]
impl OriginLookup for WhoisClient {
    async fn origin_routes(
        &self,
        asn: Asn,
        seed_ip: Ipv4Addr,
    ) -> Result<Vec<OriginRoute>, LookupError> {
        // IRR databases answer origin queries regardless of the region
        // the seed address belongs to
        tracing::debug!("querying {} for routes of {asn} (seed {seed_ip})", self.server);
        let response = self.query(&format!("-i origin {asn}")).await?;
        parse_origin_response(&response)
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::RouteFamily;
    use tokio::io::{AsyncBufReadExt, BufReader};
    use tokio::net::TcpListener;

    /// Serves exactly one whois query with a canned response, yielding
    /// the query line that was received.
    async fn serve_once(response: &'static str) -> (String, tokio::task::JoinHandle<String>) {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let handle = tokio::spawn(async move {
            let (socket, _peer) = listener.accept().await.unwrap();
            let (read, mut write) = socket.into_split();
            let mut line = String::new();
            BufReader::new(read).read_line(&mut line).await.unwrap();
            write.write_all(response.as_bytes()).await.unwrap();
            write.shutdown().await.unwrap();
            line
        });
        (addr.to_string(), handle)
    }

    #[tokio::test]
    async fn origin_query() {
        let (server, handle) = serve_once(
            "route: 10.1.0.0/16\norigin: AS64500\n\nroute6: 2001:db8::/48\norigin: AS64500\n",
        )
        .await;

        let client = WhoisClient::new(server).with_connect_timeout(Duration::from_secs(5));
        let routes = client
            .origin_routes(Asn::new(64500), Ipv4Addr::new(192, 0, 2, 1))
            .await
            .unwrap();

        k9::assert_equal!(handle.await.unwrap(), "-i origin AS64500\r\n");
        assert_eq!(routes.len(), 2);
        assert_eq!(routes[0].cidr, "10.1.0.0/16");
        assert_eq!(routes[0].family, RouteFamily::V4);
        assert_eq!(routes[1].family, RouteFamily::V6);
    }

    #[tokio::test]
    async fn server_error_is_lookup_error() {
        let (server, handle) = serve_once("%ERROR:101: no data\n").await;
        let err = WhoisClient::new(server)
            .origin_routes(Asn::new(1), Ipv4Addr::new(192, 0, 2, 1))
            .await
            .unwrap_err();
        handle.await.unwrap();
        assert!(matches!(err, LookupError::Server { .. }), "{err:?}");
    }

    #[tokio::test]
    async fn unreachable_server() {
        // bind then drop so that nothing is listening on the port
        let addr = {
            let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
            listener.local_addr().unwrap()
        };
        let err = WhoisClient::new(addr.to_string())
            .origin_routes(Asn::new(1), Ipv4Addr::new(192, 0, 2, 1))
            .await
            .unwrap_err();
        assert!(matches!(err, LookupError::Connect { .. }), "{err:?}");
    }
}
