use std::path::PathBuf;

use http_body_util::{BodyExt, Full};
use hyper::body::Bytes;
use hyper_util::rt::TokioIo;
use tokio::net::UnixStream;

use crate::db::Member;

#[derive(serde::Deserialize, serde::Serialize)]
pub struct DomainStatus {
    pub name: String,
    pub status: String,
}

pub struct DaemonClient {
    socket_path: PathBuf,
}

impl DaemonClient {
    pub fn new() -> anyhow::Result<Self> {
        Ok(Self {
            socket_path: crate::paths::socket_path()?,
        })
    }

    async fn request(
        &self,
        method: hyper::Method,
        uri: &str,
        body: Option<&str>,
    ) -> anyhow::Result<String> {
        let stream = UnixStream::connect(&self.socket_path).await.map_err(|e| {
            anyhow::anyhow!(
                "could not connect to daemon at {}: {e}\nIs the daemon running? Start it with: refcode daemon start",
                self.socket_path.display(),
            )
        })?;

        let io = TokioIo::new(stream);
        let (mut sender, conn) = hyper::client::conn::http1::handshake(io).await?;
        tokio::spawn(conn);

        let req_body = match body {
            Some(b) => Full::new(Bytes::from(b.to_owned())),
            None => Full::new(Bytes::new()),
        };

        let mut builder = hyper::Request::builder()
            .method(method)
            .uri(uri)
            .header("host", "localhost");

        if body.is_some() {
            builder = builder.header("content-type", "application/json");
        }

        let req = builder.body(req_body)?;
        let res = sender.send_request(req).await?;
        let status = res.status();
        let res_bytes = res.into_body().collect().await?.to_bytes();
        let text = String::from_utf8(res_bytes.to_vec())?;

        if !status.is_success() {
            anyhow::bail!("{}", extract_error(&text));
        }
        Ok(text)
    }

    pub async fn register_member(
        &self,
        identifier: &str,
        display_name: &str,
    ) -> anyhow::Result<Member> {
        let payload =
            serde_json::json!({"identifier": identifier, "display_name": display_name}).to_string();
        let body = self
            .request(hyper::Method::POST, "/members", Some(&payload))
            .await?;
        Ok(serde_json::from_str(&body)?)
    }

    pub async fn list_members(&self) -> anyhow::Result<Vec<Member>> {
        let body = self.request(hyper::Method::GET, "/members", None).await?;
        Ok(serde_json::from_str(&body)?)
    }

    pub async fn get_member(&self, domain_name: &str) -> anyhow::Result<Member> {
        let uri = format!("/members/{}", encode_segment(domain_name));
        let body = self.request(hyper::Method::GET, &uri, None).await?;
        Ok(serde_json::from_str(&body)?)
    }

    pub async fn remove_member(&self, domain_name: &str) -> anyhow::Result<()> {
        let uri = format!("/members/{}", encode_segment(domain_name));
        self.request(hyper::Method::DELETE, &uri, None).await?;
        Ok(())
    }

    pub async fn check_domain(&self, name: &str) -> anyhow::Result<DomainStatus> {
        let uri = format!("/domains/{}", encode_segment(name));
        let body = self.request(hyper::Method::GET, &uri, None).await?;
        Ok(serde_json::from_str(&body)?)
    }

    pub async fn allocate_domain(
        &self,
        base: &str,
        max_tries: Option<usize>,
    ) -> anyhow::Result<String> {
        let payload = serde_json::json!({"base": base, "max_tries": max_tries}).to_string();
        let body = self
            .request(hyper::Method::POST, "/domains/allocate", Some(&payload))
            .await?;
        let value: serde_json::Value = serde_json::from_str(&body)?;
        value["domain_name"]
            .as_str()
            .map(String::from)
            .ok_or_else(|| anyhow::anyhow!("daemon response missing domain_name"))
    }

    pub async fn reset_database(&self) -> anyhow::Result<()> {
        self.request(hyper::Method::POST, "/reset-database", None)
            .await?;
        Ok(())
    }
}

/// Percent-encode arbitrary user input so it survives as a single path
/// segment.
fn encode_segment(segment: &str) -> String {
    urlencoding::encode(segment).into_owned()
}

fn extract_error(body: &str) -> String {
    serde_json::from_str::<serde_json::Value>(body)
        .ok()
        .and_then(|v| v.get("error")?.as_str().map(String::from))
        .unwrap_or_else(|| body.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_encode_segment() {
        assert_eq!(encode_segment("hanoiclinic"), "hanoiclinic");
        assert_eq!(encode_segment("favicon.ico"), "favicon.ico");
        assert_eq!(encode_segment("a b/c"), "a%20b%2Fc");
        assert_eq!(encode_segment("hà"), "h%C3%A0");
    }

    #[test]
    fn test_extract_error() {
        assert_eq!(extract_error(r#"{"error":"member not found: x"}"#), "member not found: x");
        assert_eq!(extract_error("plain text"), "plain text");
    }
}
